use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("amqnotify {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: amqnotify");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("notification_version: {}", amqnotify_publisher::NOTIFICATION_VERSION);
    println!(
        "target: {}",
        option_env!("AMQNOTIFY_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "features: schema={}, publisher={}, cli=true",
        cfg!(feature = "schema"),
        cfg!(feature = "publisher")
    );

    Ok(SUCCESS)
}
