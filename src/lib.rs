//! rowval - A strict, composable column-level validation and coercion
//! library for tabular data
//!
//! Declare an ordered [`Schema`] of named [`FieldValidator`] chains, then
//! run delimited, fixed-width, or JSON rows through a [`Parser`] that
//! validates each column, re-encodes the row, and skips or aborts on
//! failures per a configurable stop-on-error budget.
//!
//! ```
//! use rowval::{FieldValidator, Parser, ParserConfig, Schema};
//!
//! let schema = Schema::new()
//!     .column("id", FieldValidator::integer().not_null())
//!     .column("amount", FieldValidator::float().min_value(0.0)?)
//!     .column("name", FieldValidator::text().not_null());
//!
//! let config = ParserConfig {
//!     stop_on_error: -1,
//!     ..ParserConfig::default()
//! };
//! let parser = Parser::new(schema, config)?;
//! let rows: Vec<_> = parser
//!     .parse(["1|9.5|ada", "2|-3.0|bad", "3|0.0|grace"])?
//!     .collect::<Result<_, _>>()?;
//! assert_eq!(rows.len(), 2);
//! # Ok::<(), rowval::ParseError>(())
//! ```

pub mod codec;
pub mod errors;
pub mod field;
pub mod parser;
pub mod schema;
pub mod value;

pub use codec::{InputFormat, OutputFormat, ParsedRow, Row};
pub use errors::{ParseError, ParseResult, Severity};
pub use field::{
    CaseMode, Check, CheckFn, CompiledField, FieldValidator, Quoting, DEFAULT_DATETIME_FORMATS,
};
pub use parser::{Parser, ParserConfig, RowStream, DEFAULT_ROW_SEP};
pub use schema::{CompiledSchema, Schema};
pub use value::{FieldType, Value};
