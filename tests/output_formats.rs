//! Output Format Tests
//!
//! Encoding behavior across the format matrix:
//! - Incompatible input/output pairs fail at construction
//! - Separator overrides and defaults
//! - Stringification of typed and null values in delimited output

use rowval::{
    FieldValidator, InputFormat, OutputFormat, ParsedRow, Parser, ParserConfig, Schema,
};
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn typed_schema() -> Schema {
    Schema::new()
        .column("count", FieldValidator::integer())
        .column("ratio", FieldValidator::float())
        .column("flag", FieldValidator::boolean())
        .column("label", FieldValidator::text())
        .column(
            "seen_on",
            FieldValidator::datetime().formats(["%Y%m%d%H%M%S"]),
        )
}

// =============================================================================
// Construction Compatibility Tests
// =============================================================================

#[test]
fn test_json_output_needs_json_input() {
    let config = ParserConfig {
        parsed_row_format: OutputFormat::Json,
        ..ParserConfig::default()
    };
    assert!(Parser::new(typed_schema(), config).is_err());
}

#[test]
fn test_fixed_width_output_needs_fixed_width_input() {
    let config = ParserConfig {
        input_row_format: InputFormat::Json,
        parsed_row_format: OutputFormat::FixedWidth,
        ..ParserConfig::default()
    };
    assert!(Parser::new(typed_schema(), config).is_err());
}

#[test]
fn test_empty_input_sep_rejected_for_delimited_input() {
    let config = ParserConfig {
        input_row_sep: String::new(),
        ..ParserConfig::default()
    };
    assert!(Parser::new(typed_schema(), config).is_err());
}

// =============================================================================
// Delimited Encoding Tests
// =============================================================================

#[test]
fn test_output_sep_override() {
    let config = ParserConfig {
        parsed_row_sep: Some(";".to_string()),
        ..ParserConfig::default()
    };
    let parser = Parser::new(typed_schema(), config).unwrap();
    let rows: Vec<_> = parser
        .parse(["3|0.5|yes|tag|20200612081500"])
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        rows,
        vec![ParsedRow::Line(
            "3;0.5;true;tag;2020-06-12 08:15:00".to_string()
        )]
    );
}

#[test]
fn test_null_and_empty_fields_stringify_empty() {
    let parser = Parser::new(typed_schema(), ParserConfig::default()).unwrap();
    let rows: Vec<_> = parser
        .parse(["||||"])
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(rows, vec![ParsedRow::Line("||||".to_string())]);
}

// =============================================================================
// Dict Encoding Tests
// =============================================================================

#[test]
fn test_dict_output_carries_typed_values() {
    let config = ParserConfig {
        parsed_row_format: OutputFormat::Dict,
        ..ParserConfig::default()
    };
    let parser = Parser::new(typed_schema(), config).unwrap();
    let rows: Vec<_> = parser
        .parse(["3|0.5|0|tag|20200612081500"])
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    let record = rows[0].as_record().unwrap();
    assert_eq!(record.get("count"), Some(&json!(3)));
    assert_eq!(record.get("ratio"), Some(&json!(0.5)));
    assert_eq!(record.get("flag"), Some(&json!(false)));
    assert_eq!(record.get("label"), Some(&json!("tag")));
    // Datetimes serialize through their display format
    assert_eq!(record.get("seen_on"), Some(&json!("2020-06-12 08:15:00")));
}

#[test]
fn test_validation_only_mode_keeps_raw_text() {
    let schema = Schema::new()
        .column("count", FieldValidator::integer().enforce_type(false))
        .column("padded", FieldValidator::text());
    let parser = Parser::new(schema, ParserConfig::default()).unwrap();
    let rows: Vec<_> = parser
        .parse(["007|x"])
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    // "007" validated as an integer but emitted as written
    assert_eq!(rows, vec![ParsedRow::Line("007|x".to_string())]);
}
