//! Logical tables and column references
//!
//! Tables are identified by an ordinal assigned when the statement is built,
//! not by name, so that self-joins through correlation names stay distinct.
//! All per-table state in the engine lives in vectors indexed by that ordinal.

use crate::condition::ColumnCondition;
use crate::error::{QueryError, Result};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Ordinal of a table within one statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub usize);

impl TableId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reference to a column of one table in a statement
///
/// Equality (and hashing) considers only the correlation and the column
/// name, which is what de-duplicates ORDER BY keys against the select list.
#[derive(Debug, Clone, Eq)]
pub struct ColumnRef {
    pub table: TableId,
    pub correlation: Option<String>,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: TableId, correlation: Option<String>, column: impl Into<String>) -> Self {
        Self {
            table,
            correlation,
            column: column.into(),
        }
    }
}

impl PartialEq for ColumnRef {
    fn eq(&self, other: &Self) -> bool {
        self.correlation == other.correlation && self.column == other.column
    }
}

impl Hash for ColumnRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.correlation.hash(state);
        self.column.hash(state);
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.correlation {
            Some(c) => write!(f, "{}.{}", c, self.column),
            None => f.write_str(&self.column),
        }
    }
}

/// A column condition registered with a table, tagged with whether it is
/// reachable from the root predicate through AND connectives only
#[derive(Debug, Clone)]
pub struct AssociatedCondition<C> {
    pub condition: ColumnCondition<C>,
    pub and_path: bool,
}

/// A table referenced by a statement
#[derive(Debug, Clone)]
pub struct Table<C> {
    id: TableId,
    /// Name as written in the statement
    written: String,
    /// Catalog name, once resolved
    name: Option<String>,
    correlation: Option<String>,
    select_columns: Vec<String>,
    condition_columns: Vec<String>,
    and_path_columns: Vec<String>,
    conditions: Vec<AssociatedCondition<C>>,
}

impl<C> Table<C> {
    pub fn new(id: TableId, written: impl Into<String>, correlation: Option<String>) -> Self {
        Self {
            id,
            written: written.into(),
            name: None,
            correlation,
            select_columns: Vec::new(),
            condition_columns: Vec::new(),
            and_path_columns: Vec::new(),
            conditions: Vec::new(),
        }
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn written_name(&self) -> &str {
        &self.written
    }

    pub fn resolve(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn is_resolved(&self) -> bool {
        self.name.is_some()
    }

    /// Resolved catalog name; unresolved tables cannot be executed
    pub fn name(&self) -> Result<&str> {
        self.name
            .as_deref()
            .ok_or_else(|| QueryError::Execution(format!("table {} is not resolved", self.written)))
    }

    pub fn correlation(&self) -> Option<&str> {
        self.correlation.as_deref()
    }

    /// Name the table is addressed by inside the statement
    pub fn label(&self) -> &str {
        self.correlation
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or(&self.written)
    }

    pub fn add_select_column(&mut self, column: &str) {
        push_unique(&mut self.select_columns, column);
    }

    pub fn select_columns(&self) -> &[String] {
        &self.select_columns
    }

    pub fn condition_columns(&self) -> &[String] {
        &self.condition_columns
    }

    pub fn and_path_columns(&self) -> &[String] {
        &self.and_path_columns
    }

    pub fn is_and_path_column(&self, column: &str) -> bool {
        self.and_path_columns.iter().any(|c| c == column)
    }

    pub fn conditions(&self) -> &[AssociatedCondition<C>] {
        &self.conditions
    }

    /// Conditions eligible for indexing and range narrowing
    pub fn and_path_conditions(&self) -> impl Iterator<Item = &ColumnCondition<C>> {
        self.conditions
            .iter()
            .filter(|c| c.and_path)
            .map(|c| &c.condition)
    }
}

impl<C: Clone> Table<C> {
    /// Register a condition leaf that references this table
    pub fn add_condition(&mut self, condition: &ColumnCondition<C>, and_path: bool) {
        for column in condition.columns_of(self.id) {
            push_unique(&mut self.condition_columns, &column.column);
            if and_path {
                push_unique(&mut self.and_path_columns, &column.column);
            }
        }
        self.conditions.push(AssociatedCondition {
            condition: condition.clone(),
            and_path,
        });
    }
}

fn push_unique(list: &mut Vec<String>, column: &str) {
    if !list.iter().any(|c| c == column) {
        list.push(column.to_string());
    }
}

/// Arena of the tables of one statement, indexed by [`TableId`]
#[derive(Debug, Clone)]
pub struct TableSet<C> {
    tables: Vec<Table<C>>,
}

impl<C> Default for TableSet<C> {
    fn default() -> Self {
        Self { tables: Vec::new() }
    }
}

impl<C> TableSet<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, written: impl Into<String>, correlation: Option<String>) -> TableId {
        let id = TableId(self.tables.len());
        self.tables.push(Table::new(id, written, correlation));
        id
    }

    pub fn get(&self, id: TableId) -> &Table<C> {
        &self.tables[id.index()]
    }

    pub fn get_mut(&mut self, id: TableId) -> &mut Table<C> {
        &mut self.tables[id.index()]
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Table<C>> {
        self.tables.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = TableId> {
        (0..self.tables.len()).map(TableId)
    }

    /// Find a table by correlation name or, failing that, by table name
    pub fn find(&self, label: &str) -> Option<TableId> {
        self.tables
            .iter()
            .find(|t| t.correlation() == Some(label))
            .or_else(|| {
                self.tables.iter().find(|t| {
                    t.correlation().is_none()
                        && (t.written_name() == label || t.name.as_deref() == Some(label))
                })
            })
            .map(|t| t.id)
    }
}
