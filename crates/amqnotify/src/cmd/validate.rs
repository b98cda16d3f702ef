use amqnotify_schema::SchemaValidator;
use serde_json::Value;

use crate::cmd::ValidateArgs;
use crate::exit::{schema_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_validation, OutputFormat, ValidationOutput};

pub fn run(args: ValidateArgs, format: OutputFormat) -> CliResult<i32> {
    let Value::Object(document) = args.document.read()? else {
        return Err(CliError::new(DATA_INVALID, "document must be a JSON object"));
    };

    let validator = SchemaValidator::new(args.registry.registry());
    validator
        .resolve(&args.schema)
        .map_err(|err| schema_error("cannot validate", err))?;
    let report = validator
        .validate(&document, &args.schema)
        .unwrap_or_default();

    print_validation(
        &ValidationOutput {
            schema: &args.schema,
            offending: &report.offending,
            unknown: &report.unknown,
        },
        format,
    );

    if report.is_clean() {
        Ok(SUCCESS)
    } else {
        Ok(DATA_INVALID)
    }
}
