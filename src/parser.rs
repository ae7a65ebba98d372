//! Row processing: format dispatch, per-column validation, and the
//! stop-on-error budget.

use std::io::BufRead;

use tracing::{error, warn};

use crate::codec::{
    self, InputFormat, OutputFormat, ParsedRow, Row,
};
use crate::errors::{ParseError, ParseResult};
use crate::schema::{CompiledSchema, Schema};
use crate::value::Value;

/// Separator assumed for delimited input when none is configured
pub const DEFAULT_ROW_SEP: &str = "|";

// ============================================================================
// Configuration
// ============================================================================

/// Parser construction settings.
///
/// Validated eagerly by [`Parser::new`]; incompatible format pairs fail
/// before any row is read.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// How input rows are decoded
    pub input_row_format: InputFormat,
    /// Field separator for delimited input
    pub input_row_sep: String,
    /// How validated rows are encoded
    pub parsed_row_format: OutputFormat,
    /// Field separator for delimited output; defaults to `input_row_sep`
    /// when none is given
    pub parsed_row_sep: Option<String>,
    /// Row failure tolerance: `0` aborts on the first failed row, a
    /// negative value skips every failed row, a positive value skips up
    /// to that many failed rows and aborts on the next
    pub stop_on_error: i64,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            input_row_format: InputFormat::Delimited,
            input_row_sep: DEFAULT_ROW_SEP.to_string(),
            parsed_row_format: OutputFormat::Delimited,
            parsed_row_sep: None,
            stop_on_error: 0,
        }
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Applies a [`Schema`] to rows of tabular data.
///
/// Each call to [`parse`](Parser::parse) or
/// [`parse_reader`](Parser::parse_reader) compiles the schema and starts
/// a fresh single-pass result stream.
///
/// ```
/// use rowval::{FieldValidator, Parser, ParserConfig, Schema};
///
/// let schema = Schema::new()
///     .column("id", FieldValidator::integer().not_null())
///     .column("name", FieldValidator::text().not_null());
/// let parser = Parser::new(schema, ParserConfig::default())?;
/// let rows = parser.parse(["1|ada", "2|grace"])?;
/// let parsed: Vec<_> = rows.collect::<Result<_, _>>()?;
/// assert_eq!(parsed.len(), 2);
/// # Ok::<(), rowval::ParseError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Parser {
    schema: Schema,
    config: ParserConfig,
    output_sep: Option<String>,
}

impl Parser {
    /// Builds a parser, checking format compatibility eagerly
    pub fn new(schema: Schema, config: ParserConfig) -> ParseResult<Self> {
        if config.input_row_format == InputFormat::Delimited && config.input_row_sep.is_empty() {
            return Err(ParseError::System(
                "delimited input requires a non-empty input_row_sep".into(),
            ));
        }
        if config.parsed_row_format == OutputFormat::FixedWidth
            && config.input_row_format != InputFormat::FixedWidth
        {
            return Err(ParseError::System(
                "fixed-width output requires fixed-width input".into(),
            ));
        }
        if config.parsed_row_format == OutputFormat::Json
            && config.input_row_format != InputFormat::Json
        {
            return Err(ParseError::System(
                "json output requires json input".into(),
            ));
        }
        if config.input_row_format == InputFormat::Json
            && !matches!(
                config.parsed_row_format,
                OutputFormat::Json | OutputFormat::Dict
            )
        {
            return Err(ParseError::System(
                "json input can only produce json or dict output".into(),
            ));
        }

        let output_sep = if config.parsed_row_format == OutputFormat::Delimited {
            // Falls back to the input separator whatever the input format;
            // only both being empty is an error
            let sep = config
                .parsed_row_sep
                .clone()
                .filter(|sep| !sep.is_empty())
                .or_else(|| {
                    (!config.input_row_sep.is_empty()).then(|| config.input_row_sep.clone())
                });
            match sep {
                Some(sep) => Some(sep),
                None => {
                    return Err(ParseError::System(
                        "delimited output requires a non-empty parsed_row_sep".into(),
                    ))
                }
            }
        } else {
            None
        };

        Ok(Self {
            schema,
            config,
            output_sep,
        })
    }

    /// The declared schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Starts a pass over an in-memory sequence of rows.
    ///
    /// Rows may be text lines or already-decoded JSON objects. The
    /// returned stream is lazy and single-pass; call `parse` again for a
    /// fresh pass.
    pub fn parse<I>(&self, rows: I) -> ParseResult<RowStream<std::iter::Map<I::IntoIter, fn(I::Item) -> ParseResult<Row>>>>
    where
        I: IntoIterator,
        I::Item: Into<Row>,
    {
        fn lift<T: Into<Row>>(item: T) -> ParseResult<Row> {
            Ok(item.into())
        }
        let compiled = self.schema.compile()?;
        Ok(self.stream(compiled, rows.into_iter().map(lift as fn(I::Item) -> ParseResult<Row>)))
    }

    /// Starts a pass over a line-oriented reader
    pub fn parse_reader<R>(
        &self,
        reader: R,
    ) -> ParseResult<RowStream<impl Iterator<Item = ParseResult<Row>>>>
    where
        R: BufRead,
    {
        let compiled = self.schema.compile()?;
        let rows = reader.lines().map(|line| {
            line.map(Row::Line)
                .map_err(|e| ParseError::System(format!("row read failed: {e}")))
        });
        Ok(self.stream(compiled, rows))
    }

    fn stream<I>(&self, compiled: CompiledSchema, rows: I) -> RowStream<I>
    where
        I: Iterator<Item = ParseResult<Row>>,
    {
        RowStream {
            compiled,
            rows,
            input_format: self.config.input_row_format,
            input_sep: self.config.input_row_sep.clone(),
            output_format: self.config.parsed_row_format,
            output_sep: self.output_sep.clone(),
            stop_on_error: self.config.stop_on_error,
            line_no: 0,
            skipped: 0,
            done: false,
        }
    }
}

// ============================================================================
// Row stream
// ============================================================================

/// Lazy, single-pass stream of validated rows.
///
/// Failed rows are skipped or abort the pass per the stop-on-error
/// budget; fatal errors abort unconditionally. Once an error is yielded
/// or the input ends, the stream is exhausted.
pub struct RowStream<I> {
    compiled: CompiledSchema,
    rows: I,
    input_format: InputFormat,
    input_sep: String,
    output_format: OutputFormat,
    output_sep: Option<String>,
    stop_on_error: i64,
    line_no: u64,
    skipped: i64,
    done: bool,
}

/// A row failure plus the column it surfaced in, for log context
struct RowFailure {
    column: Option<String>,
    error: ParseError,
}

impl From<ParseError> for RowFailure {
    fn from(error: ParseError) -> Self {
        Self {
            column: None,
            error,
        }
    }
}

impl<I> RowStream<I> {
    /// Rows skipped so far in this pass
    pub fn skipped(&self) -> i64 {
        self.skipped
    }

    fn process(&self, row: &Row) -> Result<ParsedRow, RowFailure> {
        let validated = match self.input_format {
            InputFormat::Delimited => {
                let line = self.require_line(row)?;
                let fields = codec::decode_delimited(
                    line,
                    &self.input_sep,
                    self.compiled.len(),
                    self.line_no,
                )?;
                self.validate_ordered(fields)?
            }
            InputFormat::FixedWidth => {
                let line = self.require_line(row)?;
                // Every column sees the whole line; slices do the cutting
                let fields = vec![Value::Text(line.to_string()); self.compiled.len()];
                self.validate_ordered(fields)?
            }
            InputFormat::Json => {
                let record = codec::decode_json(row, self.compiled.len(), self.line_no)?;
                let mut validated = Vec::new();
                for (name, func) in self.compiled.iter() {
                    // Keys absent from the row are absent from the output
                    if let Some(raw) = record.get(name) {
                        let value = func(Value::from_json(raw)).map_err(|error| RowFailure {
                            column: Some(name.to_string()),
                            error,
                        })?;
                        validated.push((name.to_string(), value));
                    }
                }
                validated
            }
        };

        match self.output_format {
            OutputFormat::Delimited => {
                let sep = self.output_sep.as_deref().unwrap_or(DEFAULT_ROW_SEP);
                let values: Vec<Value> = validated.into_iter().map(|(_, v)| v).collect();
                Ok(ParsedRow::Line(codec::encode_delimited(&values, sep)))
            }
            OutputFormat::FixedWidth => {
                let line = self.require_line(row)?;
                Ok(ParsedRow::Line(line.to_string()))
            }
            OutputFormat::Dict => Ok(ParsedRow::Record(codec::encode_record(&validated))),
            OutputFormat::Json => {
                if !matches!(row, Row::Line(_)) {
                    return Err(ParseError::System(
                        "json output requires rows supplied as JSON text".into(),
                    )
                    .into());
                }
                let record = codec::encode_record(&validated);
                let rendered = serde_json::to_string(&record)
                    .map_err(|e| ParseError::System(format!("json encoding failed: {e}")))?;
                Ok(ParsedRow::Line(rendered))
            }
        }
    }

    fn require_line<'a>(&self, row: &'a Row) -> ParseResult<&'a str> {
        match row {
            Row::Line(line) => Ok(line),
            Row::Record(_) => Err(ParseError::System(format!(
                "line {}: this format requires text rows, found a mapping",
                self.line_no
            ))),
        }
    }

    fn validate_ordered(&self, fields: Vec<Value>) -> Result<Vec<(String, Value)>, RowFailure> {
        let mut validated = Vec::with_capacity(fields.len());
        for ((name, func), field) in self.compiled.iter().zip(fields) {
            let value = func(field).map_err(|error| RowFailure {
                column: Some(name.to_string()),
                error,
            })?;
            validated.push((name.to_string(), value));
        }
        Ok(validated)
    }

    fn may_skip(&self) -> bool {
        self.stop_on_error < 0 || self.skipped < self.stop_on_error
    }
}

impl<I> Iterator for RowStream<I>
where
    I: Iterator<Item = ParseResult<Row>>,
{
    type Item = ParseResult<ParsedRow>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            let row = match self.rows.next() {
                Some(Ok(row)) => row,
                Some(Err(e)) => {
                    // Source failure, never budgeted
                    self.done = true;
                    error!(error = %e, "row source failed");
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    return None;
                }
            };
            self.line_no += 1;
            match self.process(&row) {
                Ok(parsed) => return Some(Ok(parsed)),
                Err(failure) if !failure.error.is_fatal() && self.may_skip() => {
                    self.skipped += 1;
                    warn!(
                        line = self.line_no,
                        column = failure.column.as_deref().unwrap_or("-"),
                        error = %failure.error,
                        "row skipped"
                    );
                }
                Err(failure) => {
                    self.done = true;
                    error!(
                        line = self.line_no,
                        column = failure.column.as_deref().unwrap_or("-"),
                        severity = %failure.error.severity(),
                        error = %failure.error,
                        "parse aborted"
                    );
                    return Some(Err(failure.error));
                }
            }
        }
    }
}
