use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use amqnotify_publisher::{
    BuildOptions, NotificationBuilder, Publisher, PublisherConfig, StompConnector,
};
use amqnotify_schema::SchemaValidator;
use amqnotify_transport::{ConnectOptions, Endpoint};
use serde_json::{Map, Value};

use crate::cmd::SendArgs;
use crate::exit::{
    publish_error, transport_error, CliError, CliResult, DATA_INVALID, SUCCESS, TRANSPORT_ERROR,
    USAGE,
};
use crate::output::{print_notifications, print_send_report, Findings, OutputFormat, SendReport};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let documents = split_documents(args.document.read()?)?;
    let extra_headers = parse_headers(&args.headers)?;

    let validator = SchemaValidator::new(args.registry.registry());
    let builder = NotificationBuilder::new(args.producer.as_str()).with_validator(Arc::new(validator));
    let options = BuildOptions {
        doc_id: args.doc_id.clone(),
        data_subfield: (!args.merge).then(|| args.data_subfield.clone()),
        schema: args.schema.clone(),
        drop_offending_keys: args.drop_offending,
        drop_unknown_keys: args.drop_unknown,
        extra_headers,
        ..BuildOptions::default()
    };

    let mut notifications = Vec::with_capacity(documents.len());
    let mut findings = Vec::new();
    for (index, mut payload) in documents.into_iter().enumerate() {
        let output = builder.build(&mut payload, &args.doc_type, &options);
        if !output.offending_keys.is_empty() || !output.unknown_keys.is_empty() {
            findings.push(Findings {
                index,
                offending: output.offending_keys,
                unknown: output.unknown_keys,
            });
        }
        notifications.push(output.notification);
    }

    if args.dry_run {
        tracing::info!(count = notifications.len(), "dry run, not connecting");
        print_notifications(&notifications, format);
        return Ok(SUCCESS);
    }

    let config = publisher_config(&args)?;
    let connector = StompConnector::new(ConnectOptions {
        connect_timeout: Some(timeout),
        read_timeout: Some(timeout),
        write_timeout: Some(timeout),
        ..ConnectOptions::default()
    });
    let publisher = Publisher::with_connector(config, connector);
    let outcome = publisher.send(notifications);
    tracing::info!(
        topic = %args.topic,
        attempted = outcome.attempted,
        delivered = outcome.delivered(),
        total = outcome.total,
        "send finished"
    );

    print_send_report(
        &SendReport {
            topic: &args.topic,
            attempted: outcome.attempted,
            total: outcome.total,
            delivered: outcome.delivered(),
            failed: outcome.failures.len(),
            findings,
            failures: outcome.failed_bodies(),
        },
        format,
    );

    if !outcome.attempted {
        return Err(CliError::new(
            TRANSPORT_ERROR,
            "could not connect to any broker endpoint",
        ));
    }
    if outcome.is_delivered() {
        Ok(SUCCESS)
    } else {
        Ok(DATA_INVALID)
    }
}

fn publisher_config(args: &SendArgs) -> CliResult<PublisherConfig> {
    let mut builder = PublisherConfig::builder(args.producer.as_str(), args.topic.as_str());

    if !args.endpoints.is_empty() {
        let endpoints = args
            .endpoints
            .iter()
            .map(|endpoint| endpoint.parse::<Endpoint>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| transport_error("invalid --endpoint", err))?;
        builder = builder.endpoints(endpoints);
    }

    match (&args.cert, &args.key) {
        (Some(cert), Some(key)) => {
            builder = builder.cert_file(cert).key_file(key);
            if let Some(ca) = &args.ca {
                builder = builder.ca_file(ca);
            }
        }
        _ => {
            if let Some(username) = &args.username {
                builder = builder.credentials(username.as_str(), args.password.clone().unwrap_or_default());
            }
        }
    }

    builder
        .build()
        .map_err(|err| publish_error("publisher configuration", err))
}

fn split_documents(document: Value) -> CliResult<Vec<Map<String, Value>>> {
    match document {
        Value::Object(payload) => Ok(vec![payload]),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(payload) => Ok(payload),
                _ => Err(CliError::new(
                    DATA_INVALID,
                    format!("document {index} is not a JSON object"),
                )),
            })
            .collect(),
        _ => Err(CliError::new(
            DATA_INVALID,
            "document must be a JSON object or an array of objects",
        )),
    }
}

fn parse_headers(headers: &[String]) -> CliResult<BTreeMap<String, String>> {
    headers
        .iter()
        .map(|header| match header.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => {
                Ok((name.trim().to_string(), value.to_string()))
            }
            _ => Err(CliError::new(
                USAGE,
                format!("invalid --header {header:?} (expected NAME=VALUE)"),
            )),
        })
        .collect()
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
