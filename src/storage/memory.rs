//! In-memory backing store

use super::{Catalog, ColumnMetadata, Store, TableMetadata};
use crate::context::TableContext;
use crate::error::{QueryError, Result};
use crate::value::{ColumnType, Comparator, ComparatorRef, Literal, Value, ValueComparator};
use chrono::NaiveDate;
use hashbrown::{HashMap, HashSet};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Column definition for [`MemoryStore::create_table`]
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: ColumnType,
    pub unique: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            data_type,
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Row handle of the in-memory store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId {
    table: u32,
    id: u64,
}

#[derive(Debug, Clone, Default)]
struct StatisticsOverride {
    row_estimate: Option<usize>,
    distinct: HashMap<String, usize>,
}

#[derive(Debug, Clone)]
struct MemoryTable {
    name: String,
    columns: Vec<ColumnDef>,
    rows: BTreeMap<u64, Vec<Option<Value>>>,
    statistics: StatisticsOverride,
}

impl MemoryTable {
    fn column_index(&self, column: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.name == column)
            .ok_or_else(|| {
                QueryError::Storage(format!("no column {} in table {}", column, self.name))
            })
    }

    fn distinct_count(&self, index: usize) -> usize {
        self.rows
            .values()
            .filter_map(|row| row[index].as_ref())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Fail if `value` already appears in a unique column, ignoring row `except`
    fn check_unique(&self, index: usize, value: &Option<Value>, except: Option<u64>) -> Result<()> {
        let Some(value) = value else {
            return Ok(());
        };
        let cmp = ValueComparator;
        let duplicate = self.rows.iter().any(|(id, row)| {
            Some(*id) != except && row[index].as_ref().is_some_and(|v| cmp.equal(v, value))
        });
        if duplicate {
            return Err(QueryError::Integrity(format!(
                "duplicate value {} in unique column {}.{}",
                value, self.name, self.columns[index].name
            )));
        }
        Ok(())
    }
}

/// Reference [`Store`] keeping every table in memory
///
/// Transactions snapshot all tables on `begin` and restore them on
/// `rollback`. Only one transaction may be active at a time.
#[derive(Debug)]
pub struct MemoryStore {
    tables: Vec<MemoryTable>,
    by_name: HashMap<String, usize>,
    next_id: u64,
    snapshot: Option<(Vec<MemoryTable>, u64)>,
    enforce_unique: bool,
    fetches: Cell<usize>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Vec::new(),
            by_name: HashMap::new(),
            next_id: 1,
            snapshot: None,
            enforce_unique: true,
            fetches: Cell::new(0),
        }
    }

    /// Accept duplicates in unique columns, e.g. to load data as is
    pub fn without_unique_checks(mut self) -> Self {
        self.enforce_unique = false;
        self
    }

    pub fn create_table(&mut self, name: &str, columns: Vec<ColumnDef>) -> Result<()> {
        if self.by_name.contains_key(name) {
            return Err(QueryError::Storage(format!("table already exists: {}", name)));
        }
        self.by_name.insert(name.to_string(), self.tables.len());
        self.tables.push(MemoryTable {
            name: name.to_string(),
            columns,
            rows: BTreeMap::new(),
            statistics: StatisticsOverride::default(),
        });
        Ok(())
    }

    /// Insert a full row given in column order
    pub fn insert_values(&mut self, table: &str, values: Vec<Option<Value>>) -> Result<RowId> {
        let columns: Vec<String> = self.table(table)?.columns.iter().map(|c| c.name.clone()).collect();
        self.insert(table, &columns, values)
    }

    /// Override the row-count estimate reported in metadata
    pub fn set_row_estimate(&mut self, table: &str, estimate: usize) -> Result<()> {
        self.table_mut(table)?.statistics.row_estimate = Some(estimate);
        Ok(())
    }

    /// Override the distinct-count estimate of one column
    pub fn set_distinct_estimate(&mut self, table: &str, column: &str, estimate: usize) -> Result<()> {
        let t = self.table_mut(table)?;
        t.column_index(column)?;
        t.statistics.distinct.insert(column.to_string(), estimate);
        Ok(())
    }

    /// Number of fetch calls served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.get()
    }

    pub fn row_count(&self, table: &str) -> Result<usize> {
        Ok(self.table(table)?.rows.len())
    }

    /// Full contents of a table in insertion order
    pub fn rows(&self, table: &str) -> Result<Vec<Vec<Option<Value>>>> {
        Ok(self.table(table)?.rows.values().cloned().collect())
    }

    pub fn in_transaction(&self) -> bool {
        self.snapshot.is_some()
    }

    fn table(&self, name: &str) -> Result<&MemoryTable> {
        self.by_name
            .get(name)
            .map(|&i| &self.tables[i])
            .ok_or_else(|| QueryError::Storage(format!("table not found: {}", name)))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut MemoryTable> {
        match self.by_name.get(name) {
            Some(&i) => Ok(&mut self.tables[i]),
            None => Err(QueryError::Storage(format!("table not found: {}", name))),
        }
    }

    fn row(&self, row: &RowId) -> Result<(&MemoryTable, &Vec<Option<Value>>)> {
        let table = self
            .tables
            .get(row.table as usize)
            .ok_or_else(|| QueryError::Storage(format!("invalid row handle {:?}", row)))?;
        let values = table
            .rows
            .get(&row.id)
            .ok_or_else(|| QueryError::Storage(format!("row {} of {} no longer exists", row.id, table.name)))?;
        Ok((table, values))
    }

    fn handles(index: usize, table: &MemoryTable) -> impl Iterator<Item = RowId> + '_ {
        table.rows.keys().map(move |&id| RowId {
            table: index as u32,
            id,
        })
    }

    fn check_type(table: &MemoryTable, index: usize, value: &Option<Value>) -> Result<()> {
        let column = &table.columns[index];
        match value {
            Some(v) if !v.column_type().is_comparable_with(column.data_type) => {
                Err(QueryError::Storage(format!(
                    "cannot store {} value in {} column {}.{}",
                    v.column_type(),
                    column.data_type,
                    table.name,
                    column.name
                )))
            }
            _ => Ok(()),
        }
    }
}

impl Catalog for MemoryStore {
    fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }

    fn metadata(&self, table: &str) -> Option<TableMetadata> {
        let t = self.table(table).ok()?;
        let columns = t
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| ColumnMetadata {
                name: c.name.clone(),
                data_type: c.data_type,
                unique: c.unique,
                distinct_estimate: Some(
                    t.statistics
                        .distinct
                        .get(&c.name)
                        .copied()
                        .unwrap_or_else(|| t.distinct_count(i)),
                ),
            })
            .collect();
        Some(TableMetadata {
            name: t.name.clone(),
            columns,
            row_estimate: Some(t.statistics.row_estimate.unwrap_or(t.rows.len())),
        })
    }
}

impl Store for MemoryStore {
    type Row = RowId;
    type Value = Value;

    fn comparator(&self) -> ComparatorRef<Value> {
        Arc::new(ValueComparator)
    }

    fn fetch(&self, table: &str) -> Result<Vec<RowId>> {
        self.fetches.set(self.fetches.get() + 1);
        let index = *self
            .by_name
            .get(table)
            .ok_or_else(|| QueryError::Storage(format!("table not found: {}", table)))?;
        Ok(Self::handles(index, &self.tables[index]).collect())
    }

    fn fetch_context(&self, context: &TableContext<RowId, Value>, _for_update: bool) -> Result<Vec<RowId>> {
        self.fetches.set(self.fetches.get() + 1);
        let name = context.table_name();
        let index = *self
            .by_name
            .get(name)
            .ok_or_else(|| QueryError::Storage(format!("table not found: {}", name)))?;
        let table = &self.tables[index];

        let mut filters = Vec::new();
        for (column, range) in context.column_ranges() {
            if range.is_unbounded() {
                continue;
            }
            if let Ok(i) = table.column_index(column) {
                filters.push((i, range));
            }
        }

        let cmp = ValueComparator;
        let rows = table
            .rows
            .iter()
            .filter(|(_, values)| {
                filters.iter().all(|(i, range)| {
                    values[*i]
                        .as_ref()
                        .is_some_and(|v| range.contains(v, &cmp))
                })
            })
            .map(|(&id, _)| RowId {
                table: index as u32,
                id,
            })
            .collect();
        Ok(rows)
    }

    fn get(&self, row: &RowId, column: &str) -> Result<Option<Value>> {
        let (table, values) = self.row(row)?;
        let index = table.column_index(column)?;
        Ok(values[index].clone())
    }

    fn set(&mut self, row: &RowId, column: &str, value: Option<Value>) -> Result<()> {
        let enforce = self.enforce_unique;
        let table = self
            .tables
            .get_mut(row.table as usize)
            .ok_or_else(|| QueryError::Storage(format!("invalid row handle {:?}", row)))?;
        let index = table.column_index(column)?;
        Self::check_type(table, index, &value)?;
        if enforce && table.columns[index].unique {
            table.check_unique(index, &value, Some(row.id))?;
        }
        let values = table
            .rows
            .get_mut(&row.id)
            .ok_or_else(|| QueryError::Storage(format!("row {} no longer exists", row.id)))?;
        values[index] = value;
        Ok(())
    }

    fn insert(&mut self, table: &str, columns: &[String], values: Vec<Option<Value>>) -> Result<RowId> {
        if columns.len() != values.len() {
            return Err(QueryError::Storage(format!(
                "{} columns but {} values",
                columns.len(),
                values.len()
            )));
        }
        let enforce = self.enforce_unique;
        let index = *self
            .by_name
            .get(table)
            .ok_or_else(|| QueryError::Storage(format!("table not found: {}", table)))?;
        let t = &mut self.tables[index];

        let mut row = vec![None; t.columns.len()];
        for (column, value) in columns.iter().zip(values) {
            let i = t.column_index(column)?;
            Self::check_type(t, i, &value)?;
            if enforce && t.columns[i].unique {
                t.check_unique(i, &value, None)?;
            }
            row[i] = value;
        }

        let id = self.next_id;
        self.next_id += 1;
        t.rows.insert(id, row);
        Ok(RowId {
            table: index as u32,
            id,
        })
    }

    fn delete(&mut self, table: &str, rows: &[RowId]) -> Result<usize> {
        let index = *self
            .by_name
            .get(table)
            .ok_or_else(|| QueryError::Storage(format!("table not found: {}", table)))?;
        let t = &mut self.tables[index];
        let mut deleted = 0;
        for row in rows {
            if row.table as usize == index && t.rows.remove(&row.id).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    fn begin_transaction(&mut self) -> Result<()> {
        if self.snapshot.is_some() {
            return Err(QueryError::Storage("a transaction is already active".into()));
        }
        self.snapshot = Some((self.tables.clone(), self.next_id));
        Ok(())
    }

    fn commit_transaction(&mut self) -> Result<()> {
        self.snapshot
            .take()
            .map(|_| ())
            .ok_or_else(|| QueryError::Storage("no active transaction".into()))
    }

    fn rollback_transaction(&mut self) -> Result<()> {
        let (tables, next_id) = self
            .snapshot
            .take()
            .ok_or_else(|| QueryError::Storage("no active transaction".into()))?;
        self.tables = tables;
        self.next_id = next_id;
        Ok(())
    }

    fn convert(&self, literal: &Literal) -> Result<Value> {
        match literal {
            Literal::Text(s) => Ok(Value::Text(s.clone())),
            Literal::Boolean(b) => Ok(Value::Boolean(*b)),
            Literal::Number(n) => {
                if let Ok(i) = n.parse::<i64>() {
                    Ok(Value::Integer(i))
                } else {
                    n.parse::<f64>()
                        .map(Value::from)
                        .map_err(|_| QueryError::Storage(format!("invalid number: {}", n)))
                }
            }
            Literal::Date(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(Value::Date)
                .map_err(|e| QueryError::Storage(format!("invalid date '{}': {}", s, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .create_table(
                "t",
                vec![
                    ColumnDef::new("id", ColumnType::Integer).unique(),
                    ColumnDef::new("name", ColumnType::Text),
                ],
            )
            .unwrap();
        store
            .insert_values("t", vec![Some(1.into()), Some("a".into())])
            .unwrap();
        store
            .insert_values("t", vec![Some(2.into()), Some("a".into())])
            .unwrap();
        store.insert_values("t", vec![Some(3.into()), None]).unwrap();
        store
    }

    #[test]
    fn test_metadata_estimates() {
        let mut store = store();
        let meta = store.metadata("t").unwrap();
        assert_eq!(meta.row_estimate, Some(3));
        assert_eq!(meta.column("id").unwrap().distinct_estimate, Some(3));
        assert_eq!(meta.column("name").unwrap().distinct_estimate, Some(1));
        assert!(meta.column("id").unwrap().unique);

        store.set_row_estimate("t", 1_000).unwrap();
        store.set_distinct_estimate("t", "name", 50).unwrap();
        let meta = store.metadata("t").unwrap();
        assert_eq!(meta.row_estimate, Some(1_000));
        assert_eq!(meta.column("name").unwrap().distinct_estimate, Some(50));
    }

    #[test]
    fn test_unique_enforced() {
        let mut store = store();
        let err = store.insert_values("t", vec![Some(1.into()), None]).unwrap_err();
        assert!(matches!(err, QueryError::Integrity(_)));

        let mut relaxed = MemoryStore::new().without_unique_checks();
        relaxed
            .create_table("u", vec![ColumnDef::new("id", ColumnType::Integer).unique()])
            .unwrap();
        relaxed.insert_values("u", vec![Some(1.into())]).unwrap();
        relaxed.insert_values("u", vec![Some(1.into())]).unwrap();
        assert_eq!(relaxed.row_count("u").unwrap(), 2);
    }

    #[test]
    fn test_type_checked() {
        let mut store = store();
        let err = store
            .insert_values("t", vec![Some("x".into()), None])
            .unwrap_err();
        assert!(err.to_string().contains("cannot store"));
    }

    #[test]
    fn test_rollback_restores_rows() {
        let mut store = store();
        store.begin_transaction().unwrap();
        let rows = store.fetch("t").unwrap();
        store.delete("t", &rows[..2]).unwrap();
        store.insert_values("t", vec![Some(9.into()), None]).unwrap();
        assert_eq!(store.row_count("t").unwrap(), 2);
        store.rollback_transaction().unwrap();
        assert_eq!(store.row_count("t").unwrap(), 3);
        assert!(store.rollback_transaction().is_err());
    }

    #[test]
    fn test_nested_begin_rejected() {
        let mut store = store();
        store.begin_transaction().unwrap();
        assert!(store.begin_transaction().is_err());
        store.commit_transaction().unwrap();
        assert!(!store.in_transaction());
    }

    #[test]
    fn test_get_set() {
        let mut store = store();
        let rows = store.fetch("t").unwrap();
        assert_eq!(store.get(&rows[2], "name").unwrap(), None);
        store.set(&rows[2], "name", Some("z".into())).unwrap();
        assert_eq!(store.get(&rows[2], "name").unwrap(), Some(Value::from("z")));
        assert!(store.get(&rows[0], "missing").is_err());
        assert!(store.set(&rows[0], "id", Some(2.into())).is_err());
    }

    #[test]
    fn test_update_counts_each_row_once() {
        let mut store = store();
        let rows = store.fetch("t").unwrap();
        let mut changes = Vec::new();
        for (row, name) in [(rows[0], "x"), (rows[0], "y"), (rows[2], "z")] {
            let current = store.get(&row, "name").unwrap();
            let mut change = store.updateable(&row, "name", current).unwrap();
            change.set(Some(name.into()));
            changes.push(change);
        }
        assert_eq!(store.update(changes).unwrap(), 2);
        assert_eq!(store.get(&rows[0], "name").unwrap(), Some(Value::from("y")));
        assert_eq!(store.get(&rows[2], "name").unwrap(), Some(Value::from("z")));
    }

    #[test]
    fn test_convert() {
        let store = MemoryStore::new();
        assert_eq!(store.convert(&Literal::Number("7".into())).unwrap(), Value::Integer(7));
        assert_eq!(store.convert(&Literal::Number("0.5".into())).unwrap(), Value::from(0.5));
        assert!(matches!(
            store.convert(&Literal::Date("2024-02-29".into())).unwrap(),
            Value::Date(_)
        ));
        assert!(store.convert(&Literal::Date("2023-02-29".into())).is_err());
    }

    #[test]
    fn test_fetch_counter() {
        let store = store();
        assert_eq!(store.fetch_count(), 0);
        store.fetch("t").unwrap();
        store.fetch("t").unwrap();
        assert_eq!(store.fetch_count(), 2);
    }
}
