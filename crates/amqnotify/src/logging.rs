use clap::ValueEnum;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Log targets that follow `--log-level`. Everything else logs at warn or above.
const OWN_TARGETS: &[&str] = &[
    "amqnotify",
    "amqnotify_frame",
    "amqnotify_transport",
    "amqnotify_schema",
    "amqnotify_publisher",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }

    /// Level applied to third-party crates such as the TLS stack.
    fn dependency_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            _ => LevelFilter::WARN,
        }
    }
}

fn targets(level: LogLevel) -> Targets {
    OWN_TARGETS.iter().fold(
        Targets::new().with_default(level.dependency_filter()),
        |filter, target| filter.with_target(*target, level.as_filter()),
    )
}

pub fn init_logging(format: LogFormat, level: LogLevel) {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false);
    let registry = tracing_subscriber::registry().with(targets(level));

    match format {
        LogFormat::Text => {
            let _ = registry.with(layer).try_init();
        }
        LogFormat::Json => {
            let _ = registry.with(layer.json()).try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependencies_stay_quiet_below_warn() {
        assert_eq!(LogLevel::Debug.dependency_filter(), LevelFilter::WARN);
        assert_eq!(LogLevel::Error.dependency_filter(), LevelFilter::ERROR);
    }

    #[test]
    fn own_targets_follow_requested_level() {
        let filter = targets(LogLevel::Debug);
        assert!(filter.would_enable("amqnotify_publisher::session", &tracing::Level::DEBUG));
        assert!(!filter.would_enable("rustls::client", &tracing::Level::DEBUG));
        assert!(filter.would_enable("rustls::client", &tracing::Level::WARN));
    }
}
