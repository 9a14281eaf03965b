//! Text rendering of tool output.

use std::fmt::Write as _;
use std::str::FromStr;

use panos_api::{FieldValue, FirewallRecord};
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::handlers::ToolOutput;

const TITLE_PREFIX: &str = "Palo Alto Networks Firewall";

/// How successful tool output is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Indented JSON: an object for a single record, an array otherwise.
    #[default]
    Json,
    Markdown,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            other => Err(format!("unknown output format '{other}' (expected json or markdown)")),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Markdown => f.write_str("markdown"),
        }
    }
}

impl OutputFormat {
    /// Render `output`. `subject` names what was retrieved, e.g.
    /// `address objects`.
    pub fn render(self, subject: &str, output: &ToolOutput) -> Result<String, ToolError> {
        match self {
            Self::Json => Ok(match output {
                ToolOutput::Record(record) => serde_json::to_string_pretty(record)?,
                ToolOutput::Records(records) => serde_json::to_string_pretty(records)?,
            }),
            Self::Markdown => Ok(match output {
                ToolOutput::Record(record) => markdown_record(subject, record),
                ToolOutput::Records(records) => markdown_records(subject, records),
            }),
        }
    }
}

fn title(subject: &str) -> String {
    let words: Vec<String> = subject.split_whitespace().map(capitalize).collect();
    format!("# {TITLE_PREFIX} {}\n\n", words.join(" "))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `source_zones` -> `Source Zones`
fn label(field: &str) -> String {
    field
        .split(['_', '-'])
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn markdown_record(subject: &str, record: &FirewallRecord) -> String {
    let mut out = title(subject);
    for (field, value) in record.iter() {
        write_field(&mut out, field, value);
    }
    out
}

fn markdown_records(subject: &str, records: &[FirewallRecord]) -> String {
    if records.is_empty() {
        return format!("No {subject} found on the firewall.");
    }
    let mut out = title(subject);
    for record in records {
        let _ = writeln!(out, "## {}", record.name().unwrap_or("(unnamed)"));
        for (field, value) in record.iter().filter(|(field, _)| *field != "name") {
            write_field(&mut out, &label(field), value);
        }
        out.push('\n');
    }
    out
}

fn write_field(out: &mut String, label: &str, value: &FieldValue) {
    match value {
        FieldValue::Scalar(text) => {
            let _ = writeln!(out, "- **{label}**: {text}");
        }
        FieldValue::List(items) if items.is_empty() => {
            let _ = writeln!(out, "- **{label}**: None");
        }
        FieldValue::List(items) => {
            let _ = writeln!(out, "- **{label}**:");
            for item in items {
                let _ = writeln!(out, "  - {item}");
            }
        }
    }
}
