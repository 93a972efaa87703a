//! Join planner and executor
//!
//! The [`Engine`] owns the backing store and runs bound statements against
//! it. SELECTs go through the join planner in [`select`]: tables are placed
//! in order of estimated selectivity, indexed, merge-joined against the
//! tables already placed, and the remaining candidate space is enumerated
//! depth first. UPDATE and DELETE work on a single target table and are
//! handled in [`modify`].

mod modify;
mod select;

use crate::condition::{Relation, RowSource};
use crate::config::EngineConfig;
use crate::error::{QueryError, Result};
use crate::result::OrderedFetchResult;
use crate::statement::{Statement, StatementKind};
use crate::storage::Store;
use crate::table::{ColumnRef, Table, TableId, TableSet};
use std::fmt;
use tracing::debug;

/// Transaction boundary performed by a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionEvent {
    Begin,
    Commit,
    Rollback,
}

/// What executing a statement produced
#[derive(Debug)]
pub enum Outcome<C> {
    Rows(OrderedFetchResult<C>),
    /// Number of rows inserted, updated or deleted
    Affected(usize),
    Transaction(TransactionEvent),
}

impl<C> Outcome<C> {
    pub fn rows(self) -> Option<OrderedFetchResult<C>> {
        match self {
            Outcome::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn affected(&self) -> Option<usize> {
        match self {
            Outcome::Affected(n) => Some(*n),
            _ => None,
        }
    }
}

/// Order in which the tables of a SELECT are fetched and enumerated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinPlan {
    /// Fetch order, most selective first
    pub selection_order: Vec<TableId>,
    /// Enumeration nesting, outermost first; the reverse of `selection_order`
    pub nesting: Vec<TableId>,
    /// Estimate per table ordinal
    pub estimates: Vec<usize>,
}

impl fmt::Display for JoinPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order: Vec<String> = self
            .selection_order
            .iter()
            .map(|t| format!("{}({})", t, self.estimates[t.index()]))
            .collect();
        write!(f, "{}", order.join(" -> "))
    }
}

/// Query engine over a backing store
pub struct Engine<S> {
    store: S,
    config: EngineConfig,
}

impl<S: Store> Engine<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Check and execute a statement
    pub fn execute(&mut self, statement: &Statement<S::Value>) -> Result<Outcome<S::Value>> {
        statement.execute(self)
    }

    /// Execute a statement that already passed `check`
    pub(crate) fn run(&mut self, statement: &Statement<S::Value>) -> Result<Outcome<S::Value>> {
        let placeholders = statement.placeholders();
        debug!(statement = statement.kind().name(), "executing");
        match statement.kind() {
            StatementKind::Select(select) => self.select(select, placeholders).map(Outcome::Rows),
            StatementKind::Insert(insert) => self.insert(insert, placeholders).map(Outcome::Affected),
            StatementKind::Update(update) => self.update(update, placeholders).map(Outcome::Affected),
            StatementKind::Delete(delete) => self.delete(delete, placeholders).map(Outcome::Affected),
            StatementKind::Show => self.show().map(Outcome::Rows),
            StatementKind::Describe(describe) => self.describe(&describe.tables).map(Outcome::Rows),
            StatementKind::BeginWork => {
                self.store.begin_transaction()?;
                Ok(Outcome::Transaction(TransactionEvent::Begin))
            }
            StatementKind::CommitWork => {
                self.store.commit_transaction()?;
                Ok(Outcome::Transaction(TransactionEvent::Commit))
            }
            StatementKind::RollbackWork => {
                self.store.rollback_transaction()?;
                Ok(Outcome::Transaction(TransactionEvent::Rollback))
            }
        }
    }

    /// Estimated number of rows of `table` that can take part in the result
    ///
    /// The smaller of the row count and the distinct count of every column
    /// under an AND-path equality. Missing metadata counts as unbounded.
    pub fn estimate(&self, table: &Table<S::Value>) -> usize {
        let Some(metadata) = table.name().ok().and_then(|n| self.store.metadata(n)) else {
            return usize::MAX;
        };
        let mut estimate = metadata.row_estimate.unwrap_or(usize::MAX);
        for leaf in table.and_path_conditions() {
            let is_eq = matches!(
                leaf,
                crate::condition::ColumnCondition::Comparison {
                    relation: Relation::Eq,
                    ..
                }
            );
            if !is_eq {
                continue;
            }
            for column in leaf.columns_of(table.id()) {
                let distinct = metadata
                    .column(&column.column)
                    .and_then(|c| c.distinct_estimate)
                    .unwrap_or(usize::MAX);
                estimate = estimate.min(distinct);
            }
        }
        estimate
    }

    /// Pick tables by ascending estimate, ties by ordinal
    pub fn plan(&self, tables: &TableSet<S::Value>) -> JoinPlan {
        let estimates: Vec<usize> = tables.iter().map(|t| self.estimate(t)).collect();
        let mut pending: Vec<TableId> = tables.ids().collect();
        let mut selection_order = Vec::with_capacity(pending.len());
        while !pending.is_empty() {
            let mut best = 0;
            for (i, id) in pending.iter().enumerate().skip(1) {
                if estimates[id.index()] < estimates[pending[best].index()] {
                    best = i;
                }
            }
            selection_order.push(pending.remove(best));
        }
        let nesting = selection_order.iter().rev().copied().collect();
        JoinPlan {
            selection_order,
            nesting,
            estimates,
        }
    }
}

/// Values of the rows bound so far, one slot per table ordinal
pub struct Candidate<'a, S: Store> {
    rows: &'a [Option<S::Row>],
    store: &'a S,
}

impl<S: Store> RowSource<S::Value> for Candidate<'_, S> {
    fn value(&self, column: &ColumnRef) -> Result<Option<S::Value>> {
        match self.rows.get(column.table.index()).and_then(Option::as_ref) {
            Some(row) => self.store.get(row, &column.column),
            None => Err(QueryError::Execution(format!("column {} is not bound", column))),
        }
    }
}

/// A single row of one table
pub struct SingleRow<'a, S: Store> {
    table: TableId,
    row: &'a S::Row,
    store: &'a S,
}

impl<S: Store> RowSource<S::Value> for SingleRow<'_, S> {
    fn value(&self, column: &ColumnRef) -> Result<Option<S::Value>> {
        if column.table != self.table {
            return Err(QueryError::Execution(format!(
                "column {} does not belong to the target table",
                column
            )));
        }
        self.store.get(self.row, &column.column)
    }
}
