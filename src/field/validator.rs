//! Per-column validator builder and chain compilation.

use std::sync::Arc;

use regex::Regex;

use crate::errors::{ParseError, ParseResult};
use crate::field::checks::{
    self, apply, CaseMode, ChainContext, Check, Quoting,
};
use crate::value::{FieldType, Value};

/// Formats tried for datetime columns when none are configured
pub const DEFAULT_DATETIME_FORMATS: [&str; 2] = ["%Y%m%d", "%Y%m%d%H%M%S"];

/// A compiled validator chain: one function from raw field value to
/// validated value
pub type CompiledField = Arc<dyn Fn(Value) -> ParseResult<Value> + Send + Sync>;

// ============================================================================
// Field Validator
// ============================================================================

/// An ordered chain of checks bound to one column.
///
/// Configuration is fluent: infallible settings consume and return `self`,
/// while settings that can conflict with the declared column type return
/// `ParseResult<Self>` and fail fast, before any row is parsed. The chain
/// runs in a fixed order once compiled: slicing, quote stripping, the type
/// cast, then the registered checks in call order.
///
/// ```
/// use rowval::{FieldValidator, Value};
///
/// let validator = FieldValidator::integer().not_null().max_value(100)?;
/// let check = validator.build()?;
/// assert_eq!(check(Value::from("42"))?, Value::Int(42));
/// assert!(check(Value::from("101")).is_err());
/// # Ok::<(), rowval::ParseError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FieldValidator {
    ty: FieldType,
    slice: (usize, usize),
    quoting: Quoting,
    enforce_type: bool,
    allow_white_space: bool,
    formats: Vec<String>,
    checks: Vec<Check>,
}

impl FieldValidator {
    fn typed(ty: FieldType) -> Self {
        Self {
            ty,
            slice: (0, 0),
            quoting: Quoting::None,
            enforce_type: true,
            allow_white_space: false,
            formats: Vec::new(),
            checks: Vec::new(),
        }
    }

    /// A validator with no target type; values flow through uncast
    pub fn untyped() -> Self {
        Self::typed(FieldType::Untyped)
    }

    /// A text column
    pub fn text() -> Self {
        Self::typed(FieldType::Text)
    }

    /// An integer column
    pub fn integer() -> Self {
        Self::typed(FieldType::Int)
    }

    /// A float column
    pub fn float() -> Self {
        Self::typed(FieldType::Float)
    }

    /// A boolean column
    pub fn boolean() -> Self {
        Self::typed(FieldType::Bool)
    }

    /// A datetime column accepting [`DEFAULT_DATETIME_FORMATS`]
    pub fn datetime() -> Self {
        let mut v = Self::typed(FieldType::DateTime);
        v.formats = DEFAULT_DATETIME_FORMATS
            .iter()
            .map(|f| (*f).to_string())
            .collect();
        v
    }

    /// A column that always yields `value`, regardless of input
    pub fn constant(value: impl Into<Value>) -> Self {
        let mut v = Self::typed(FieldType::Constant);
        v.checks.push(Check::Constant(value.into()));
        v
    }

    /// The column's declared type
    pub fn field_type(&self) -> FieldType {
        self.ty
    }

    /// The registered checks, in chain order
    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    // ------------------------------------------------------------------
    // Shape configuration
    // ------------------------------------------------------------------

    /// Extracts the 1-based inclusive `[start, end]` character range before
    /// any other check runs. A zero on either bound means no slicing.
    pub fn slice(mut self, start: usize, end: usize) -> Self {
        self.slice = (start, end);
        self
    }

    /// Strips one matching layer of quotes after slicing
    pub fn quoted(mut self, quoting: Quoting) -> Self {
        self.quoting = quoting;
        self
    }

    /// When `false`, casts validate only and the original representation
    /// flows through the rest of the chain unchanged
    pub fn enforce_type(mut self, enforce: bool) -> Self {
        self.enforce_type = enforce;
        self
    }

    /// Treat whitespace-only text as non-null in the not-null check
    pub fn allow_white_space(mut self, allow: bool) -> Self {
        self.allow_white_space = allow;
        self
    }

    /// Replaces the accepted datetime input formats. Formats are tried in
    /// the given order; the first that parses wins.
    pub fn formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.formats = formats.into_iter().map(Into::into).collect();
        self
    }

    // ------------------------------------------------------------------
    // Checks
    // ------------------------------------------------------------------

    /// Fails the field on falsy input
    pub fn not_null(mut self) -> Self {
        self.checks.push(Check::NotNull { default: None });
        self
    }

    /// Substitutes `default` for falsy input. A truthy default must match
    /// the column's declared type; a falsy one (0, 0.0, "") is exempt so
    /// it can serve as a sentinel the cast later normalizes.
    pub fn not_null_or(mut self, default: impl Into<Value>) -> ParseResult<Self> {
        let default = default.into();
        if !default.is_falsy() {
            self.ensure_role("default", &default)?;
        }
        self.checks.push(Check::NotNull {
            default: Some(default),
        });
        Ok(self)
    }

    /// Substitutes a datetime default given as a raw string with its own
    /// parse format. The format joins the accepted-formats list so the
    /// default re-parses downstream.
    pub fn not_null_or_fmt(mut self, default: &str, format: &str) -> ParseResult<Self> {
        self.ensure_datetime("default")?;
        self.parse_with(default, format)?;
        self.accept_format(format);
        self.checks.push(Check::NotNull {
            default: Some(Value::Text(default.to_string())),
        });
        Ok(self)
    }

    /// Restricts the field to an allow-list. Truthy members must match the
    /// column's declared type. When `nullable`, falsy input is implicitly
    /// allowed.
    pub fn value_set<I, V>(mut self, allowed: I, nullable: bool) -> ParseResult<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let allowed: Vec<Value> = allowed.into_iter().map(Into::into).collect();
        for member in &allowed {
            self.ensure_role("allowed value", member)?;
        }
        self.checks.push(Check::ValueSet { allowed, nullable });
        Ok(self)
    }

    /// Restricts a datetime field to an allow-list of raw strings in one
    /// explicit format
    pub fn value_set_fmt<I, S>(mut self, allowed: I, format: &str, nullable: bool) -> ParseResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ensure_datetime("allowed value")?;
        let mut members = Vec::new();
        for raw in allowed {
            members.push(Value::DateTime(self.parse_with(raw.as_ref(), format)?));
        }
        self.accept_format(format);
        self.checks.push(Check::ValueSet {
            allowed: members,
            nullable,
        });
        Ok(self)
    }

    /// Fails values comparing below `bound` (inclusive bound passes)
    pub fn min_value(mut self, bound: impl Into<Value>) -> ParseResult<Self> {
        let bound = bound.into();
        self.ensure_role("minimum", &bound)?;
        self.checks.push(Check::MinValue(bound));
        Ok(self)
    }

    /// Fails values comparing above `bound` (inclusive bound passes)
    pub fn max_value(mut self, bound: impl Into<Value>) -> ParseResult<Self> {
        let bound = bound.into();
        self.ensure_role("maximum", &bound)?;
        self.checks.push(Check::MaxValue(bound));
        Ok(self)
    }

    /// Restricts the field to `[min, max]`, both inclusive
    pub fn range(self, min: impl Into<Value>, max: impl Into<Value>) -> ParseResult<Self> {
        self.min_value(min)?.max_value(max)
    }

    /// Datetime minimum given as a raw string with its own parse format
    pub fn min_value_fmt(mut self, bound: &str, format: &str) -> ParseResult<Self> {
        self.ensure_datetime("minimum")?;
        let parsed = self.parse_with(bound, format)?;
        self.accept_format(format);
        self.checks.push(Check::MinValue(Value::DateTime(parsed)));
        Ok(self)
    }

    /// Datetime maximum given as a raw string with its own parse format
    pub fn max_value_fmt(mut self, bound: &str, format: &str) -> ParseResult<Self> {
        self.ensure_datetime("maximum")?;
        let parsed = self.parse_with(bound, format)?;
        self.accept_format(format);
        self.checks.push(Check::MaxValue(Value::DateTime(parsed)));
        Ok(self)
    }

    /// Datetime range given as raw strings in one explicit format
    pub fn range_fmt(self, min: &str, max: &str, format: &str) -> ParseResult<Self> {
        self.min_value_fmt(min, format)?.max_value_fmt(max, format)
    }

    /// Requires the stringified value to match `pattern`, anchored at the
    /// start. When `nullable`, falsy input is implicitly valid.
    pub fn regex_match(mut self, pattern: &str, nullable: bool) -> ParseResult<Self> {
        let regex = Regex::new(&format!("^(?:{pattern})"))
            .map_err(|e| ParseError::System(format!("invalid pattern '{pattern}': {e}")))?;
        self.checks.push(Check::Pattern {
            pattern: pattern.to_string(),
            regex,
            nullable,
        });
        Ok(self)
    }

    /// Re-cases text values
    pub fn change_case(mut self, mode: CaseMode) -> Self {
        self.checks.push(Check::ChangeCase(mode));
        self
    }

    /// Reformats a datetime field into a string of `format`. The format is
    /// verified here so a bad one fails before any row is parsed.
    pub fn convert(mut self, format: &str) -> ParseResult<Self> {
        self.ensure_datetime("conversion target")?;
        let sample = chrono::NaiveDate::from_ymd_opt(2000, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| ParseError::System("probe datetime construction failed".into()))?;
        checks::format_datetime(&sample, format)?;
        self.accept_format(format);
        self.checks.push(Check::Convert {
            format: format.to_string(),
        });
        Ok(self)
    }

    /// Appends a user-supplied check verbatim; its errors propagate with
    /// whatever kind the caller chose
    pub fn custom<F>(mut self, func: F) -> Self
    where
        F: Fn(Value) -> ParseResult<Value> + Send + Sync + 'static,
    {
        self.checks.push(Check::Custom(Arc::new(func)));
        self
    }

    // ------------------------------------------------------------------
    // Compilation
    // ------------------------------------------------------------------

    /// Compiles the chain into a single function.
    ///
    /// The compiled function is a snapshot: configuring this validator
    /// further does not change functions already built. An empty chain on
    /// an untyped validator compiles to the identity function.
    pub fn build(&self) -> ParseResult<CompiledField> {
        if self.ty == FieldType::DateTime && self.formats.is_empty() {
            return Err(ParseError::System(
                "datetime column has no accepted input formats".into(),
            ));
        }

        let mut chain = Vec::new();
        let (start, end) = self.slice;
        // Slicing needs both bounds; a zero on either side disables it
        if start != 0 && end != 0 {
            chain.push(Check::Slice { start, end });
        }
        if self.quoting != Quoting::None {
            chain.push(Check::StripQuotes(self.quoting));
        }
        if !matches!(self.ty, FieldType::Untyped | FieldType::Constant) {
            chain.push(Check::Cast);
        }
        chain.extend(self.checks.iter().cloned());

        let ctx = ChainContext {
            ty: self.ty,
            enforce_type: self.enforce_type,
            allow_white_space: self.allow_white_space,
            formats: self.formats.clone(),
        };
        Ok(Arc::new(move |value: Value| {
            chain
                .iter()
                .try_fold(value, |value, check| apply(check, &ctx, value))
        }))
    }

    // ------------------------------------------------------------------
    // Configuration-time guards
    // ------------------------------------------------------------------

    fn ensure_role(&self, role: &'static str, value: &Value) -> ParseResult<()> {
        if value.matches_type(self.ty) {
            Ok(())
        } else {
            Err(ParseError::UnsupportedType {
                role,
                expected: self.ty.type_name(),
                found: value.type_name().to_string(),
            })
        }
    }

    fn ensure_datetime(&self, role: &'static str) -> ParseResult<()> {
        if self.ty == FieldType::DateTime {
            Ok(())
        } else {
            Err(ParseError::UnsupportedType {
                role,
                expected: self.ty.type_name(),
                found: "datetime".to_string(),
            })
        }
    }

    fn parse_with(&self, raw: &str, format: &str) -> ParseResult<chrono::NaiveDateTime> {
        checks::parse_datetime_str(raw, format).ok_or_else(|| ParseError::DatetimeFormat {
            value: raw.to_string(),
            formats: vec![format.to_string()],
        })
    }

    fn accept_format(&mut self, format: &str) {
        if !self.formats.iter().any(|f| f == format) {
            self.formats.push(format.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untyped_empty_chain_is_identity() {
        let check = FieldValidator::untyped().build().unwrap();
        assert_eq!(check(Value::from("anything")).unwrap(), Value::from("anything"));
        assert_eq!(check(Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_chain_order_slice_quotes_cast() {
        let check = FieldValidator::integer()
            .slice(2, 5)
            .quoted(Quoting::Double)
            .build()
            .unwrap();
        assert_eq!(check(Value::from("x\"42\"y")).unwrap(), Value::Int(42));
    }

    #[test]
    fn test_slice_with_a_zero_bound_is_a_noop() {
        let lead = FieldValidator::text().slice(5, 0).build().unwrap();
        assert_eq!(lead(Value::from("ABCDE")).unwrap(), Value::from("ABCDE"));
        let trail = FieldValidator::text().slice(0, 3).build().unwrap();
        assert_eq!(trail(Value::from("ABCDE")).unwrap(), Value::from("ABCDE"));
    }

    #[test]
    fn test_build_is_a_snapshot() {
        let validator = FieldValidator::integer();
        let loose = validator.build().unwrap();
        let strict = validator.not_null().build().unwrap();
        assert_eq!(loose(Value::Null).unwrap(), Value::Null);
        assert!(strict(Value::Null).is_err());
    }

    #[test]
    fn test_build_twice_behaves_identically() {
        let validator = FieldValidator::float().range(1.0, 9.5).unwrap();
        let a = validator.build().unwrap();
        let b = validator.build().unwrap();
        for raw in ["1.0", "9.5", "0.9", "9.6", ""] {
            let va = a(Value::from(raw));
            let vb = b(Value::from(raw));
            assert_eq!(va.is_ok(), vb.is_ok(), "raw {raw:?}");
            if let (Ok(va), Ok(vb)) = (va, vb) {
                assert_eq!(va, vb);
            }
        }
    }

    #[test]
    fn test_mismatched_bound_fails_at_configuration() {
        let err = FieldValidator::integer().max_value("high").unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedType { .. }));
        assert!(err.is_fatal());
        assert_eq!(
            err.to_string(),
            "str value cannot be used as maximum of a int column"
        );
    }

    #[test]
    fn test_mismatched_set_member_fails_at_configuration() {
        let err = FieldValidator::text()
            .value_set([Value::Int(1)], false)
            .unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedType { .. }));
    }

    #[test]
    fn test_falsy_bound_still_needs_the_right_type() {
        let err = FieldValidator::text().min_value(0).unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedType { .. }));
        assert_eq!(
            err.to_string(),
            "int value cannot be used as minimum of a str column"
        );
        // Matching falsy bounds stay legal
        assert!(FieldValidator::integer().min_value(0).is_ok());
        assert!(FieldValidator::float().max_value(0.0).is_ok());
    }

    #[test]
    fn test_falsy_set_member_still_needs_the_right_type() {
        let err = FieldValidator::integer()
            .value_set([Value::Text(String::new())], false)
            .unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedType { .. }));
    }

    #[test]
    fn test_falsy_default_bypasses_type_guard() {
        let check = FieldValidator::integer().not_null_or(0).unwrap().build().unwrap();
        assert_eq!(check(Value::from("")).unwrap(), Value::Int(0));
        assert_eq!(check(Value::from("3")).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_default_cast_respects_enforcement() {
        let strict = FieldValidator::text().not_null_or("missing").unwrap();
        let check = strict.build().unwrap();
        assert_eq!(check(Value::Null).unwrap(), Value::from("missing"));
    }

    #[test]
    fn test_datetime_fmt_bound_joins_accepted_formats() {
        let check = FieldValidator::datetime()
            .formats(["%Y%m%d"])
            .max_value_fmt("2020-12-31", "%Y-%m-%d")
            .unwrap()
            .build()
            .unwrap();
        // The bound's format now parses as input too
        assert!(check(Value::from("2020-06-15")).is_ok());
        assert!(check(Value::from("20200615")).is_ok());
        assert!(matches!(
            check(Value::from("20210101")),
            Err(ParseError::AboveMaximum { .. })
        ));
    }

    #[test]
    fn test_datetime_default_reparses_downstream() {
        let check = FieldValidator::datetime()
            .formats(["%Y%m%d"])
            .not_null_or_fmt("2020-01-01", "%Y-%m-%d")
            .unwrap()
            .build()
            .unwrap();
        let defaulted = check(Value::Null).unwrap();
        assert_eq!(
            defaulted,
            Value::DateTime(
                chrono::NaiveDate::from_ymd_opt(2020, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
            )
        );
    }

    #[test]
    fn test_fmt_checks_rejected_off_datetime_columns() {
        assert!(FieldValidator::integer()
            .min_value_fmt("20200101", "%Y%m%d")
            .is_err());
        assert!(FieldValidator::text().convert("%Y").is_err());
    }

    #[test]
    fn test_datetime_without_formats_fails_to_build() {
        let validator = FieldValidator::datetime().formats(Vec::<String>::new());
        assert!(matches!(validator.build(), Err(ParseError::System(_))));
    }

    #[test]
    fn test_constant_ignores_input() {
        let check = FieldValidator::constant("Leo Messi").build().unwrap();
        assert_eq!(check(Value::from("anything")).unwrap(), Value::from("Leo Messi"));
        assert_eq!(check(Value::Null).unwrap(), Value::from("Leo Messi"));
    }

    #[test]
    fn test_regex_is_start_anchored() {
        let check = FieldValidator::text().regex_match("M[0-9]+", false).unwrap().build().unwrap();
        assert!(check(Value::from("M123x")).is_ok());
        assert!(check(Value::from("xM123")).is_err());
        assert!(FieldValidator::text().regex_match("(unclosed", false).is_err());
    }

    #[test]
    fn test_regex_nullable_admits_falsy() {
        let check = FieldValidator::text()
            .regex_match("[A-Z]{3}", true)
            .unwrap()
            .build()
            .unwrap();
        assert!(check(Value::from("")).is_ok());
        assert!(check(Value::Null).is_ok());
        assert!(check(Value::from("abc")).is_err());
    }

    #[test]
    fn test_custom_check_errors_propagate_unwrapped() {
        let check = FieldValidator::integer()
            .custom(|v| match v {
                Value::Int(i) if i % 2 == 0 => Ok(Value::Int(i)),
                other => Err(ParseError::Custom(format!("{other} is odd"))),
            })
            .build()
            .unwrap();
        assert_eq!(check(Value::from("12")).unwrap(), Value::Int(12));
        assert!(matches!(
            check(Value::from("13")),
            Err(ParseError::Custom(_))
        ));
    }

    #[test]
    fn test_validate_only_preserves_representation() {
        let check = FieldValidator::integer()
            .enforce_type(false)
            .max_value(40)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(check(Value::from("12")).unwrap(), Value::from("12"));
        assert!(check(Value::from("99")).is_err());
        assert!(check(Value::from("abc")).is_err());
    }
}
