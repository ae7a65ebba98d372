//! Field validation: the check sum type and the per-column validator
//! builder that compiles an ordered chain of checks into one function.

pub mod checks;
pub mod validator;

pub use checks::{CaseMode, Check, CheckFn, Quoting};
pub use validator::{CompiledField, FieldValidator, DEFAULT_DATETIME_FORMATS};
