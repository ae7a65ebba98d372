//! Ordered column-to-validator mapping and its compiled form.

use crate::errors::{ParseError, ParseResult};
use crate::field::{CompiledField, FieldValidator};

/// An ordered sequence of `(column name, validator)` pairs.
///
/// Position defines column order for delimited and fixed-width rows and
/// key expectations for JSON rows. Names need not be unique; for lookup
/// purposes the most recently declared validator wins.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    columns: Vec<(String, FieldValidator)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column at the end of the declared order
    pub fn column(mut self, name: impl Into<String>, validator: FieldValidator) -> Self {
        self.columns.push((name.into(), validator));
        self
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The declared columns, in order
    pub fn columns(&self) -> &[(String, FieldValidator)] {
        &self.columns
    }

    /// Compiles every validator chain.
    ///
    /// Safe to call repeatedly; each call produces a fresh, independent
    /// snapshot with the same column set. A validator that fails to
    /// compile surfaces as a schema-build error naming its column.
    pub fn compile(&self) -> ParseResult<CompiledSchema> {
        let mut compiled = Vec::with_capacity(self.columns.len());
        for (name, validator) in &self.columns {
            let func = validator
                .build()
                .map_err(|source| ParseError::SchemaBuild {
                    column: name.clone(),
                    source: Box::new(source),
                })?;
            compiled.push((name.clone(), func));
        }
        Ok(CompiledSchema { columns: compiled })
    }
}

/// A compiled schema: one validation function per declared column
#[derive(Clone)]
pub struct CompiledSchema {
    columns: Vec<(String, CompiledField)>,
}

impl CompiledSchema {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterates `(name, function)` pairs in declared order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CompiledField)> {
        self.columns.iter().map(|(name, func)| (name.as_str(), func))
    }

    /// The function for `name`; the most recent declaration wins when a
    /// name repeats
    pub fn get(&self, name: &str) -> Option<&CompiledField> {
        self.columns
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, func)| func)
    }
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema")
            .field(
                "columns",
                &self.columns.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .finish()
    }
}
