use std::io::IsTerminal;

use amqnotify_publisher::Notification;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Schema findings for one input document.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Findings {
    pub index: usize,
    pub offending: Vec<String>,
    pub unknown: Vec<String>,
}

#[derive(Serialize, Debug)]
pub struct SendReport<'a> {
    pub topic: &'a str,
    pub attempted: bool,
    pub total: usize,
    pub delivered: usize,
    pub failed: usize,
    pub findings: Vec<Findings>,
    pub failures: &'a [Value],
}

#[derive(Serialize, Debug)]
pub struct ValidationOutput<'a> {
    pub schema: &'a str,
    pub offending: &'a [String],
    pub unknown: &'a [String],
}

#[derive(Serialize, Debug)]
pub struct SchemaRow {
    pub name: String,
    pub format: &'static str,
    pub keys: usize,
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_send_report(report: &SendReport<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            let mut table = new_table(vec!["TOPIC", "CONNECTED", "TOTAL", "DELIVERED", "FAILED"]);
            table.add_row(vec![
                report.topic.to_string(),
                report.attempted.to_string(),
                report.total.to_string(),
                report.delivered.to_string(),
                report.failed.to_string(),
            ]);
            println!("{table}");
            print_findings_table(&report.findings);
        }
        OutputFormat::Pretty => {
            println!(
                "topic={} connected={} delivered={}/{} failed={}",
                report.topic, report.attempted, report.delivered, report.total, report.failed
            );
            for findings in &report.findings {
                println!(
                    "document {}: offending={} unknown={}",
                    findings.index,
                    findings.offending.join(","),
                    findings.unknown.join(",")
                );
            }
        }
    }
}

pub fn print_validation(output: &ValidationOutput<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(output),
        OutputFormat::Table => {
            let mut table = new_table(vec!["KEY", "ISSUE"]);
            for key in output.offending {
                table.add_row(vec![key.as_str(), "offending"]);
            }
            for key in output.unknown {
                table.add_row(vec![key.as_str(), "unknown"]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "schema={} offending={} unknown={}",
                output.schema,
                output.offending.join(","),
                output.unknown.join(",")
            );
        }
    }
}

pub fn print_schemas(rows: &[SchemaRow], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => {
            let mut table = new_table(vec!["NAME", "FORMAT", "KEYS"]);
            for row in rows {
                table.add_row(vec![row.name.clone(), row.format.to_string(), row.keys.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in rows {
                println!("{} ({}, {} keys)", row.name, row.format, row.keys);
            }
        }
    }
}

/// Dry-run output: one notification per line as JSON, or pretty-printed.
pub fn print_notifications(notifications: &[Notification], format: OutputFormat) {
    for notification in notifications {
        match format {
            OutputFormat::Pretty => println!(
                "{}",
                serde_json::to_string_pretty(notification).unwrap_or_else(|_| "{}".to_string())
            ),
            OutputFormat::Json | OutputFormat::Table => print_json(notification),
        }
    }
}

fn print_findings_table(findings: &[Findings]) {
    if findings.is_empty() {
        return;
    }
    let mut table = new_table(vec!["DOCUMENT", "OFFENDING", "UNKNOWN"]);
    for entry in findings {
        table.add_row(vec![
            entry.index.to_string(),
            entry.offending.join(", "),
            entry.unknown.join(", "),
        ]);
    }
    println!("{table}");
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}
