//! Named, late-bound statement parameters

use super::Span;
use crate::error::{QueryError, Result};
use crate::value::ColumnType;

/// A named parameter of a prepared statement
///
/// `?` parameters are numbered `1..n` in order of appearance, `$n` is named
/// `n` and `:name` is named `name`.
#[derive(Debug, Clone)]
pub struct Placeholder<C> {
    name: String,
    data_type: Option<ColumnType>,
    default: Option<C>,
    /// `Some(None)` is an explicit NULL binding
    value: Option<Option<C>>,
    span: Option<Span>,
}

impl<C> Placeholder<C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type inferred from the column the parameter is compared with
    pub fn data_type(&self) -> Option<ColumnType> {
        self.data_type
    }

    pub fn default(&self) -> Option<&C> {
        self.default.as_ref()
    }

    pub fn span(&self) -> Option<Span> {
        self.span
    }

    /// Bound explicitly, or carrying a default
    pub fn is_bound(&self) -> bool {
        self.value.is_some() || self.default.is_some()
    }
}

/// Placeholder map owned by a statement
///
/// Bindings persist across executions until rebound or cleared. Rebinding
/// while an execution is in progress is the caller's responsibility.
#[derive(Debug, Clone)]
pub struct Placeholders<C> {
    entries: Vec<Placeholder<C>>,
}

impl<C> Default for Placeholders<C> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<C: Clone> Placeholders<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a parameter; re-declaring keeps the first span and fills in a missing type
    pub fn declare(&mut self, name: &str, data_type: Option<ColumnType>, span: Option<Span>) {
        if let Some(existing) = self.entries.iter_mut().find(|p| p.name == name) {
            if existing.data_type.is_none() {
                existing.data_type = data_type;
            }
            return;
        }
        self.entries.push(Placeholder {
            name: name.to_string(),
            data_type,
            default: None,
            value: None,
            span,
        });
    }

    fn entry_mut(&mut self, name: &str) -> Result<&mut Placeholder<C>> {
        self.entries
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| QueryError::Bind(format!("unknown placeholder: {}", name)))
    }

    pub fn bind(&mut self, name: &str, value: C) -> Result<()> {
        self.entry_mut(name)?.value = Some(Some(value));
        Ok(())
    }

    pub fn bind_null(&mut self, name: &str) -> Result<()> {
        self.entry_mut(name)?.value = Some(None);
        Ok(())
    }

    pub fn set_default(&mut self, name: &str, value: C) -> Result<()> {
        self.entry_mut(name)?.default = Some(value);
        Ok(())
    }

    /// Drop all bindings; defaults are kept
    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            entry.value = None;
        }
    }

    /// Current value of a parameter: the binding, else the default
    pub fn value(&self, name: &str) -> Result<Option<C>> {
        let entry = self
            .entries
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| QueryError::Bind(format!("unknown placeholder: {}", name)))?;
        match (&entry.value, &entry.default) {
            (Some(bound), _) => Ok(bound.clone()),
            (None, Some(default)) => Ok(Some(default.clone())),
            (None, None) => Err(QueryError::Bind(format!("placeholder {} is not bound", name))),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Placeholder<C>> {
        self.entries.iter().find(|p| p.name == name)
    }

    pub fn unbound(&self) -> impl Iterator<Item = &Placeholder<C>> {
        self.entries.iter().filter(|p| !p.is_bound())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Placeholder<C>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_and_value() {
        let mut params: Placeholders<i64> = Placeholders::new();
        params.declare("1", Some(ColumnType::Integer), None);
        assert!(params.value("1").is_err());
        assert_eq!(params.unbound().count(), 1);

        params.bind("1", 42).unwrap();
        assert_eq!(params.value("1").unwrap(), Some(42));
        assert_eq!(params.unbound().count(), 0);

        params.bind_null("1").unwrap();
        assert_eq!(params.value("1").unwrap(), None);
    }

    #[test]
    fn test_default_and_clear() {
        let mut params: Placeholders<i64> = Placeholders::new();
        params.declare("limit", None, None);
        params.set_default("limit", 10).unwrap();
        assert_eq!(params.value("limit").unwrap(), Some(10));

        params.bind("limit", 3).unwrap();
        assert_eq!(params.value("limit").unwrap(), Some(3));
        params.clear();
        assert_eq!(params.value("limit").unwrap(), Some(10));
    }

    #[test]
    fn test_redeclare_fills_type() {
        let mut params: Placeholders<i64> = Placeholders::new();
        params.declare("x", None, None);
        params.declare("x", Some(ColumnType::Text), None);
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("x").unwrap().data_type(), Some(ColumnType::Text));
    }

    #[test]
    fn test_unknown_placeholder() {
        let mut params: Placeholders<i64> = Placeholders::new();
        assert!(params.bind("nope", 1).is_err());
    }
}
