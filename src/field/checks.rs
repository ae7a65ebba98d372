//! Individual checks and their application semantics.
//!
//! A [`Check`] is one inspection or transformation step in a field
//! validator's chain. Chain order is significant and fixed at build time:
//! slicing, then quote stripping, then the type cast, then the configured
//! checks in registration order. Each check assumes its predecessors have
//! already normalized shape and type.

use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{ParseError, ParseResult};
use crate::value::{FieldType, Value};

/// Quoting mode for field values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quoting {
    /// Not quoted
    None,
    /// One layer of `"` quotes
    Double,
    /// One layer of `'` quotes
    Single,
}

/// Target case for the change-case check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseMode {
    /// UPPERCASE
    Upper,
    /// lowercase
    Lower,
    /// Sentence case: first character upper, the rest lower
    Sentence,
}

/// A user-supplied check closure
pub type CheckFn = Arc<dyn Fn(Value) -> ParseResult<Value> + Send + Sync>;

/// One step in a validator chain
#[derive(Clone)]
pub enum Check {
    /// Extract the 1-based inclusive `[start, end]` character range of
    /// the stringified value
    Slice {
        /// 1-based inclusive start position
        start: usize,
        /// 1-based inclusive end position
        end: usize,
    },
    /// Strip one matching layer of leading/trailing quotes
    StripQuotes(Quoting),
    /// Cast to the column's declared type (or validate only, when the
    /// chain does not enforce types)
    Cast,
    /// Fail on falsy input, or substitute the configured default
    NotNull {
        /// Replacement for falsy input; `None` means the check fails
        default: Option<Value>,
    },
    /// Fail unless the value is a member of the allow-list
    ValueSet {
        /// Allowed values, copied defensively at configuration time
        allowed: Vec<Value>,
        /// Whether falsy input is implicitly allowed
        nullable: bool,
    },
    /// Fail if the value compares below the bound
    MinValue(Value),
    /// Fail if the value compares above the bound
    MaxValue(Value),
    /// Fail unless the value matches the pattern, anchored at the start
    Pattern {
        /// Original pattern text, for error messages
        pattern: String,
        /// Compiled, start-anchored pattern
        regex: Regex,
        /// Whether falsy input is implicitly valid
        nullable: bool,
    },
    /// Re-case text values; non-text passes through unchanged
    ChangeCase(CaseMode),
    /// Reformat a datetime value into a string of the target format
    Convert {
        /// chrono `%`-style target format
        format: String,
    },
    /// Always yield the configured value
    Constant(Value),
    /// User-supplied check; its errors propagate unclassified
    Custom(CheckFn),
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::Slice { start, end } => write!(f, "Slice({start}, {end})"),
            Check::StripQuotes(q) => write!(f, "StripQuotes({q:?})"),
            Check::Cast => write!(f, "Cast"),
            Check::NotNull { default } => write!(f, "NotNull(default: {default:?})"),
            Check::ValueSet { allowed, nullable } => {
                write!(f, "ValueSet({allowed:?}, nullable: {nullable})")
            }
            Check::MinValue(v) => write!(f, "MinValue({v:?})"),
            Check::MaxValue(v) => write!(f, "MaxValue({v:?})"),
            Check::Pattern { pattern, nullable, .. } => {
                write!(f, "Pattern({pattern:?}, nullable: {nullable})")
            }
            Check::ChangeCase(mode) => write!(f, "ChangeCase({mode:?})"),
            Check::Convert { format } => write!(f, "Convert({format:?})"),
            Check::Constant(v) => write!(f, "Constant({v:?})"),
            Check::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Immutable chain configuration snapshotted into a compiled field
#[derive(Debug, Clone)]
pub(crate) struct ChainContext {
    pub ty: FieldType,
    pub enforce_type: bool,
    pub allow_white_space: bool,
    pub formats: Vec<String>,
}

/// Applies one check to a value under the chain's configuration
pub(crate) fn apply(check: &Check, ctx: &ChainContext, value: Value) -> ParseResult<Value> {
    match check {
        Check::Slice { start, end } => Ok(apply_slice(value, *start, *end)),
        Check::StripQuotes(quoting) => Ok(strip_quotes(value, *quoting)),
        Check::Cast => apply_cast(ctx, value),
        Check::NotNull { default } => apply_not_null(ctx, default, value),
        Check::ValueSet { allowed, nullable } => apply_value_set(ctx, allowed, *nullable, value),
        Check::MinValue(bound) => apply_bound(ctx, bound, true, value),
        Check::MaxValue(bound) => apply_bound(ctx, bound, false, value),
        Check::Pattern {
            pattern,
            regex,
            nullable,
        } => apply_pattern(pattern, regex, *nullable, value),
        Check::ChangeCase(mode) => Ok(change_case(value, *mode)),
        Check::Convert { format } => apply_convert(ctx, format, value),
        Check::Constant(constant) => Ok(constant.clone()),
        Check::Custom(func) => func(value),
    }
}

fn apply_slice(value: Value, start: usize, end: usize) -> Value {
    // Character-based: fixed-width positions count characters, not bytes.
    let text = value.to_string();
    let sliced: String = text
        .chars()
        .skip(start.saturating_sub(1))
        .take((end + 1).saturating_sub(start))
        .collect();
    Value::Text(sliced)
}

fn strip_quotes(value: Value, quoting: Quoting) -> Value {
    let quote = match quoting {
        Quoting::None => return value,
        Quoting::Double => '"',
        Quoting::Single => '\'',
    };
    match value {
        Value::Text(s)
            if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) =>
        {
            Value::Text(s[1..s.len() - 1].to_string())
        }
        other => other,
    }
}

fn apply_cast(ctx: &ChainContext, value: Value) -> ParseResult<Value> {
    match ctx.ty {
        FieldType::Untyped | FieldType::Constant => Ok(value),
        FieldType::Text => {
            if value.is_falsy() {
                return Ok(value);
            }
            if ctx.enforce_type {
                Ok(Value::Text(value.to_string()))
            } else {
                Ok(value)
            }
        }
        FieldType::Int => {
            if value.is_falsy() {
                return Ok(value);
            }
            let cast = match &value {
                Value::Text(s) => s.trim().parse::<i64>().map_err(|_| ParseError::TypeCast {
                    value: s.clone(),
                    target: "int",
                })?,
                Value::Int(i) => *i,
                Value::Float(f) => *f as i64,
                Value::Bool(b) => i64::from(*b),
                other => {
                    return Err(ParseError::TypeCast {
                        value: other.to_string(),
                        target: "int",
                    })
                }
            };
            if ctx.enforce_type {
                Ok(Value::Int(cast))
            } else {
                Ok(value)
            }
        }
        FieldType::Float => {
            if value.is_falsy() {
                return Ok(value);
            }
            let cast = match &value {
                Value::Text(s) => s.trim().parse::<f64>().map_err(|_| ParseError::TypeCast {
                    value: s.clone(),
                    target: "float",
                })?,
                Value::Int(i) => *i as f64,
                Value::Float(f) => *f,
                Value::Bool(b) => f64::from(u8::from(*b)),
                other => {
                    return Err(ParseError::TypeCast {
                        value: other.to_string(),
                        target: "float",
                    })
                }
            };
            if ctx.enforce_type {
                Ok(Value::Float(cast))
            } else {
                Ok(value)
            }
        }
        FieldType::Bool => cast_bool(ctx, value),
        FieldType::DateTime => {
            if value.is_falsy() || matches!(value, Value::DateTime(_)) {
                return Ok(value);
            }
            let raw = value.to_string();
            let parsed =
                parse_any_format(&raw, &ctx.formats).ok_or_else(|| ParseError::DatetimeFormat {
                    value: raw,
                    formats: ctx.formats.clone(),
                })?;
            if ctx.enforce_type {
                Ok(Value::DateTime(parsed))
            } else {
                Ok(value)
            }
        }
    }
}

fn numeric_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("numeric token pattern compiles"))
}

fn zero_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^0+(\.0+)?$").expect("zero token pattern compiles"))
}

/// Boolean token heuristic: word tokens first, then the numeric-regex
/// fallback where an all-zero numeric string is false and any other
/// numeric-looking string is true. Null and empty text pass through for
/// null handling; numeric zero and `false` themselves still cast.
fn cast_bool(ctx: &ChainContext, value: Value) -> ParseResult<Value> {
    let cast = match &value {
        Value::Null => return Ok(value),
        Value::Text(s) if s.is_empty() => return Ok(value),
        Value::Text(s) => {
            let token = s.trim();
            if token.is_empty() {
                // Whitespace-only text is truthy
                true
            } else if ["true", "t", "y", "yes"]
                .iter()
                .any(|w| token.eq_ignore_ascii_case(w))
            {
                true
            } else if ["false", "f", "n", "no"]
                .iter()
                .any(|w| token.eq_ignore_ascii_case(w))
            {
                false
            } else if numeric_token_re().is_match(token) {
                !zero_token_re().is_match(token)
            } else {
                return Err(ParseError::TypeCast {
                    value: s.clone(),
                    target: "bool",
                });
            }
        }
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::Bool(b) => *b,
        other => {
            return Err(ParseError::TypeCast {
                value: other.to_string(),
                target: "bool",
            })
        }
    };
    if ctx.enforce_type {
        Ok(Value::Bool(cast))
    } else {
        Ok(value)
    }
}

fn apply_not_null(
    ctx: &ChainContext,
    default: &Option<Value>,
    value: Value,
) -> ParseResult<Value> {
    if ctx.ty == FieldType::Text {
        let was_null = matches!(value, Value::Null);
        let value = match value {
            Value::Text(s) if !ctx.allow_white_space => Value::Text(s.trim().to_string()),
            other => other,
        };
        if value.is_falsy() {
            if ctx.allow_white_space && !was_null {
                return Ok(value);
            }
            return match default {
                // Defaults are cast like input so typed output stays typed
                Some(d) => apply_cast(ctx, d.clone()),
                None => Err(ParseError::NullViolation),
            };
        }
        return Ok(value);
    }

    if value.is_falsy() {
        match default {
            Some(d) => apply_cast(ctx, d.clone()),
            None => Err(ParseError::NullViolation),
        }
    } else {
        Ok(value)
    }
}

/// Whether a value counts as missing for nullable allow-lists. Narrower
/// than falsy: a literal `0` or `false` is present, just zero-like.
fn is_missing(value: &Value) -> bool {
    matches!(value, Value::Null) || matches!(value, Value::Text(s) if s.is_empty())
}

fn apply_value_set(
    ctx: &ChainContext,
    allowed: &[Value],
    nullable: bool,
    value: Value,
) -> ParseResult<Value> {
    if ctx.ty == FieldType::DateTime {
        if is_missing(&value) {
            if nullable {
                return Ok(value);
            }
            return Err(ParseError::NotInSet {
                value: value.to_string(),
            });
        }
        let parsed = parsed_datetime(ctx, &value)?;
        if allowed
            .iter()
            .any(|a| matches!(a, Value::DateTime(d) if *d == parsed))
        {
            return Ok(value);
        }
        return Err(ParseError::NotInSet {
            value: value.to_string(),
        });
    }

    if nullable && is_missing(&value) {
        return Ok(value);
    }
    if allowed.contains(&value) {
        Ok(value)
    } else {
        Err(ParseError::NotInSet {
            value: value.to_string(),
        })
    }
}

fn apply_bound(
    ctx: &ChainContext,
    bound: &Value,
    is_minimum: bool,
    value: Value,
) -> ParseResult<Value> {
    if value.is_falsy() {
        return Ok(value);
    }
    let ordering = if ctx.ty == FieldType::DateTime {
        let parsed = parsed_datetime(ctx, &value)?;
        Value::DateTime(parsed).compare(bound)?
    } else {
        value.compare(bound)?
    };
    if is_minimum && ordering == std::cmp::Ordering::Less {
        return Err(ParseError::BelowMinimum {
            value: value.to_string(),
            min: bound.to_string(),
        });
    }
    if !is_minimum && ordering == std::cmp::Ordering::Greater {
        return Err(ParseError::AboveMaximum {
            value: value.to_string(),
            max: bound.to_string(),
        });
    }
    Ok(value)
}

fn apply_pattern(
    pattern: &str,
    regex: &Regex,
    nullable: bool,
    value: Value,
) -> ParseResult<Value> {
    if value.is_falsy() && nullable {
        return Ok(value);
    }
    let text = value.to_string();
    if regex.is_match(&text) {
        Ok(value)
    } else {
        Err(ParseError::PatternMismatch {
            value: text,
            pattern: pattern.to_string(),
        })
    }
}

fn change_case(value: Value, mode: CaseMode) -> Value {
    match value {
        Value::Text(s) => {
            let cased = match mode {
                CaseMode::Upper => s.to_uppercase(),
                CaseMode::Lower => s.to_lowercase(),
                CaseMode::Sentence => {
                    let mut chars = s.chars();
                    match chars.next() {
                        Some(first) => {
                            first.to_uppercase().collect::<String>()
                                + &chars.as_str().to_lowercase()
                        }
                        None => String::new(),
                    }
                }
            };
            Value::Text(cased)
        }
        other => other,
    }
}

fn apply_convert(ctx: &ChainContext, format: &str, value: Value) -> ParseResult<Value> {
    if value.is_falsy() {
        return Ok(value);
    }
    let parsed = parsed_datetime(ctx, &value)?;
    Ok(Value::Text(format_datetime(&parsed, format)?))
}

/// Resolves the datetime behind a chain value: already-typed datetimes
/// pass through, anything else is parsed against the accepted formats in
/// declared order.
fn parsed_datetime(ctx: &ChainContext, value: &Value) -> ParseResult<NaiveDateTime> {
    if let Value::DateTime(d) = value {
        return Ok(*d);
    }
    let raw = value.to_string();
    parse_any_format(&raw, &ctx.formats).ok_or_else(|| ParseError::DatetimeFormat {
        value: raw,
        formats: ctx.formats.clone(),
    })
}

/// Parses a raw string with one chrono format, accepting date-only
/// formats as midnight.
pub(crate) fn parse_datetime_str(raw: &str, format: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, format).ok().or_else(|| {
        NaiveDate::parse_from_str(raw, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    })
}

/// Tries each accepted format in declared order; first match wins.
pub(crate) fn parse_any_format(raw: &str, formats: &[String]) -> Option<NaiveDateTime> {
    formats
        .iter()
        .find_map(|format| parse_datetime_str(raw, format))
}

/// Formats a datetime, surfacing invalid format strings as errors rather
/// than panicking in the chrono display path.
pub(crate) fn format_datetime(datetime: &NaiveDateTime, format: &str) -> ParseResult<String> {
    let mut rendered = String::new();
    write!(&mut rendered, "{}", datetime.format(format)).map_err(|_| {
        ParseError::System(format!("'{format}' is not a valid datetime format"))
    })?;
    Ok(rendered)
}
