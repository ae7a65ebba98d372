//! Row formats and the decode/encode strategies behind them.
//!
//! Decoding turns one raw input row into per-column field values;
//! encoding turns validated values back into the configured output
//! representation. Which strategy runs is selected by the parser's
//! configured formats, not by the row itself.

use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::errors::{ParseError, ParseResult};
use crate::value::Value;

/// Input row format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// Separator-delimited text lines
    Delimited,
    /// Fixed-width text lines; each column slices its own portion
    #[serde(rename = "fixed-width")]
    FixedWidth,
    /// JSON objects, or strings deserializing to one
    Json,
}

/// Output row format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Validated values joined with the output separator
    Delimited,
    /// The raw input line passed through unchanged, validation only
    #[serde(rename = "fixed-width")]
    FixedWidth,
    /// Key-ordered JSON text
    Json,
    /// Key-ordered mapping
    Dict,
}

/// One raw input row: a text line or an already-decoded mapping
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    Line(String),
    Record(Map<String, serde_json::Value>),
}

impl From<String> for Row {
    fn from(line: String) -> Self {
        Row::Line(line)
    }
}

impl From<&str> for Row {
    fn from(line: &str) -> Self {
        Row::Line(line.to_string())
    }
}

impl From<Map<String, serde_json::Value>> for Row {
    fn from(record: Map<String, serde_json::Value>) -> Self {
        Row::Record(record)
    }
}

/// One validated output row
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedRow {
    /// Delimited, fixed-width, or JSON text output
    Line(String),
    /// Dict output: validated values keyed by column name, in schema order
    Record(Map<String, serde_json::Value>),
}

impl ParsedRow {
    pub fn as_line(&self) -> Option<&str> {
        match self {
            ParsedRow::Line(line) => Some(line),
            ParsedRow::Record(_) => None,
        }
    }

    pub fn as_record(&self) -> Option<&Map<String, serde_json::Value>> {
        match self {
            ParsedRow::Line(_) => None,
            ParsedRow::Record(record) => Some(record),
        }
    }
}

// ============================================================================
// Decode
// ============================================================================

/// Splits a delimited line into exactly `declared` field values.
///
/// Fewer fields than declared columns is tolerated; missing trailing
/// fields arrive as empty text. More fields than columns is a row-shape
/// error.
pub(crate) fn decode_delimited(
    line: &str,
    sep: &str,
    declared: usize,
    line_no: u64,
) -> ParseResult<Vec<Value>> {
    let mut fields: Vec<Value> = line.split(sep).map(Value::from).collect();
    if fields.len() > declared {
        return Err(ParseError::RowShape {
            line: line_no,
            found: fields.len(),
            declared,
        });
    }
    fields.resize(declared, Value::Text(String::new()));
    Ok(fields)
}

/// Resolves a JSON row into its object form, deserializing text rows
/// first. The object may not carry more keys than the schema declares.
pub(crate) fn decode_json(
    row: &Row,
    declared: usize,
    line_no: u64,
) -> ParseResult<Map<String, serde_json::Value>> {
    let record = match row {
        Row::Record(record) => record.clone(),
        Row::Line(line) => object_from_line(line, line_no)?,
    };
    if record.len() > declared {
        return Err(ParseError::RowShape {
            line: line_no,
            found: record.len(),
            declared,
        });
    }
    Ok(record)
}

fn object_from_line(line: &str, line_no: u64) -> ParseResult<Map<String, serde_json::Value>> {
    let value: serde_json::Value =
        serde_json::from_str(line).map_err(|e| ParseError::JsonDecode {
            line: line_no,
            reason: e.to_string(),
        })?;
    match value {
        serde_json::Value::Object(record) => Ok(record),
        other => Err(ParseError::JsonDecode {
            line: line_no,
            reason: format!("expected a JSON object, found {}", json_kind(&other)),
        }),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

// ============================================================================
// Encode
// ============================================================================

/// Joins validated values, each stringified, with the output separator
pub(crate) fn encode_delimited(values: &[Value], sep: &str) -> String {
    values
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(sep)
}

/// Builds a key-ordered mapping of column name to validated value
pub(crate) fn encode_record(
    columns: &[(String, Value)],
) -> Map<String, serde_json::Value> {
    let mut record = Map::new();
    for (name, value) in columns {
        record.insert(name.clone(), value.to_json());
    }
    record
}
