//! Fixed-Width Row Tests
//!
//! Every column receives the whole raw line and cuts its own portion
//! with a 1-based inclusive slice:
//! - Positions 1-3 id, 4 gender, 5-12 date, 13-18 amount, 19-20 code
//! - Fixed-width output passes the original line through unchanged

use rowval::{
    FieldValidator, InputFormat, OutputFormat, ParseError, ParsedRow, Parser, ParserConfig,
    Schema,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn member_schema() -> Schema {
    Schema::new()
        .column("id", FieldValidator::integer().slice(1, 3).not_null())
        .column(
            "gender",
            FieldValidator::text()
                .slice(4, 4)
                .value_set(["M", "F"], false)
                .unwrap(),
        )
        .column(
            "joined_on",
            FieldValidator::datetime()
                .formats(["%Y%m%d"])
                .slice(5, 12)
                .not_null()
                .convert("%Y-%m-%d")
                .unwrap(),
        )
        .column(
            "amount",
            FieldValidator::integer().slice(13, 18).not_null_or(0).unwrap(),
        )
        .column(
            "code",
            FieldValidator::text()
                .slice(19, 20)
                .regex_match("[A-Z]{2}", false)
                .unwrap(),
        )
}

fn fixed_width_parser(output: OutputFormat, stop_on_error: i64) -> Parser {
    let config = ParserConfig {
        input_row_format: InputFormat::FixedWidth,
        parsed_row_format: output,
        parsed_row_sep: Some(",".to_string()),
        stop_on_error,
        ..ParserConfig::default()
    };
    Parser::new(member_schema(), config).unwrap()
}

const GOOD_LINE: &str = "001M20200612015000AB";
const BAD_GENDER_LINE: &str = "002X20200612015000AB";

// =============================================================================
// Slicing Tests
// =============================================================================

#[test]
fn test_columns_slice_their_own_portions() {
    let parser = fixed_width_parser(OutputFormat::Delimited, 0);
    let rows: Vec<_> = parser
        .parse([GOOD_LINE])
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        rows,
        vec![ParsedRow::Line("1,M,2020-06-12,15000,AB".to_string())]
    );
}

#[test]
fn test_unlisted_gender_fails_the_row() {
    let parser = fixed_width_parser(OutputFormat::Delimited, 0);
    let err = parser
        .parse([BAD_GENDER_LINE])
        .unwrap()
        .next()
        .unwrap()
        .unwrap_err();
    match err {
        ParseError::NotInSet { value } => assert_eq!(value, "X"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_short_line_fails_on_empty_mandatory_slice() {
    // A line ending before the date region leaves joined_on empty
    let parser = fixed_width_parser(OutputFormat::Delimited, 0);
    let err = parser.parse(["003F"]).unwrap().next().unwrap().unwrap_err();
    assert!(matches!(err, ParseError::NullViolation));
}

// =============================================================================
// Pass-Through Output Tests
// =============================================================================

#[test]
fn test_fixed_width_output_returns_original_line() {
    let parser = fixed_width_parser(OutputFormat::FixedWidth, -1);
    let rows: Vec<_> = parser
        .parse([GOOD_LINE, BAD_GENDER_LINE, GOOD_LINE])
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    // Validation still filters, but survivors are untouched
    assert_eq!(
        rows,
        vec![
            ParsedRow::Line(GOOD_LINE.to_string()),
            ParsedRow::Line(GOOD_LINE.to_string()),
        ]
    );
}

#[test]
fn test_no_column_count_check_applies() {
    // Trailing characters beyond every slice are simply ignored
    let parser = fixed_width_parser(OutputFormat::Delimited, 0);
    let long = format!("{GOOD_LINE}xxxxxxxx");
    let rows: Vec<_> = parser
        .parse([long])
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(rows.len(), 1);
}
