//! Backing-store contract
//!
//! The engine never owns row contents. It holds opaque row handles issued
//! by a [`Store`] and asks the store for cell values, comparator, metadata,
//! and for every mutation and transaction boundary:
//! - [`Store`]: the trait a storage collaborator implements
//! - [`TableMetadata`] / [`ColumnMetadata`]: estimates used for join ordering
//! - [`MemoryStore`]: an in-memory reference implementation

mod memory;

pub use memory::{ColumnDef, MemoryStore, RowId};

use crate::context::TableContext;
use crate::error::Result;
use crate::value::{ColumnType, ComparatorRef, Literal};
use hashbrown::HashSet;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Metadata for a single column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetadata {
    pub name: String,
    pub data_type: ColumnType,
    /// Declared unique; index buckets for the column hold a single row
    pub unique: bool,
    /// Estimated number of distinct non-null values
    pub distinct_estimate: Option<usize>,
}

/// Metadata for a table
#[derive(Debug, Clone, PartialEq)]
pub struct TableMetadata {
    pub name: String,
    pub columns: Vec<ColumnMetadata>,
    /// Estimated row count
    pub row_estimate: Option<usize>,
}

impl TableMetadata {
    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Case-insensitive column lookup
    pub fn column_ignore_case(&self, name: &str) -> Option<&ColumnMetadata> {
        self.column(name)
            .or_else(|| self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name)))
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// Source of table metadata for binding and checking
pub trait Catalog {
    fn table_names(&self) -> Vec<String>;

    fn metadata(&self, table: &str) -> Option<TableMetadata>;

    /// Case-insensitive table lookup, returning the catalog spelling
    fn resolve_table(&self, name: &str) -> Option<String> {
        if self.metadata(name).is_some() {
            return Some(name.to_string());
        }
        self.table_names()
            .into_iter()
            .find(|t| t.eq_ignore_ascii_case(name))
    }
}

/// A pending change of one cell
#[derive(Debug, Clone, PartialEq)]
pub struct Updateable<R, C> {
    pub row: R,
    pub column: String,
    pub current: Option<C>,
    pub new: Option<C>,
}

impl<R, C: Clone> Updateable<R, C> {
    pub fn new(row: R, column: impl Into<String>, current: Option<C>) -> Self {
        Self {
            row,
            column: column.into(),
            new: current.clone(),
            current,
        }
    }

    pub fn set(&mut self, value: Option<C>) {
        self.new = value;
    }
}

/// Storage collaborator consumed by the engine
///
/// All methods are synchronous from the engine's point of view. Errors are
/// propagated untouched; the engine never retries.
pub trait Store: Catalog {
    /// Opaque row handle
    type Row: Clone + Eq + Hash + Debug;
    /// Comparable cell value
    type Value: Clone + Debug + Display;

    /// Total order over cell values, shared across queries
    fn comparator(&self) -> ComparatorRef<Self::Value>;

    /// All rows of a table
    fn fetch(&self, table: &str) -> Result<Vec<Self::Row>>;

    /// Rows of the context's table, optionally narrowed by its column ranges
    ///
    /// The ranges are hints; returning every row is always correct.
    /// `for_update` announces that the rows are about to be mutated.
    fn fetch_context(
        &self,
        context: &TableContext<Self::Row, Self::Value>,
        for_update: bool,
    ) -> Result<Vec<Self::Row>> {
        let _ = for_update;
        self.fetch(context.table_name())
    }

    /// Cell value; `None` is SQL NULL
    fn get(&self, row: &Self::Row, column: &str) -> Result<Option<Self::Value>>;

    fn set(&mut self, row: &Self::Row, column: &str, value: Option<Self::Value>) -> Result<()>;

    fn updateable(
        &self,
        row: &Self::Row,
        column: &str,
        current: Option<Self::Value>,
    ) -> Result<Updateable<Self::Row, Self::Value>> {
        Ok(Updateable::new(row.clone(), column, current))
    }

    /// Insert one row; columns not listed are NULL
    fn insert(
        &mut self,
        table: &str,
        columns: &[String],
        values: Vec<Option<Self::Value>>,
    ) -> Result<Self::Row>;

    /// Apply pending changes, returning the number of distinct rows touched
    fn update(&mut self, changes: Vec<Updateable<Self::Row, Self::Value>>) -> Result<usize> {
        let mut touched: HashSet<Self::Row> = HashSet::with_capacity(changes.len());
        for change in changes {
            self.set(&change.row, &change.column, change.new)?;
            touched.insert(change.row);
        }
        Ok(touched.len())
    }

    fn delete(&mut self, table: &str, rows: &[Self::Row]) -> Result<usize>;

    fn begin_transaction(&mut self) -> Result<()>;

    fn commit_transaction(&mut self) -> Result<()>;

    fn rollback_transaction(&mut self) -> Result<()>;

    /// Convert a statement literal to a cell value
    fn convert(&self, literal: &Literal) -> Result<Self::Value>;

    /// Convert plain text to a cell value, used for metadata result sets
    fn text(&self, text: &str) -> Result<Self::Value> {
        self.convert(&Literal::Text(text.to_string()))
    }
}
