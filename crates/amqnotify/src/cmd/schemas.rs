use crate::cmd::SchemasArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_schemas, OutputFormat, SchemaRow};

pub fn run(args: SchemasArgs, format: OutputFormat) -> CliResult<i32> {
    let registry = args.registry.registry();
    let rows: Vec<SchemaRow> = registry
        .schemas()
        .iter()
        .map(|(name, document)| SchemaRow {
            name: name.clone(),
            format: document.format_name(),
            keys: document.key_count(),
        })
        .collect();

    print_schemas(&rows, format);
    Ok(SUCCESS)
}
