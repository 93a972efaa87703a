//! Bound statements
//!
//! A [`Statement`] is what the front-end hands to the engine: tables are
//! resolved, the WHERE tree is built and associated with its tables, and
//! every parameter is declared in the statement's [`Placeholders`].
//! `check` reports problems through a [`Reporter`]; `execute` refuses to run
//! while any of them is fatal.

mod check;
mod placeholder;

pub use check::{Diagnostic, Diagnostics, Reporter, Severity, Span};
pub use placeholder::{Placeholder, Placeholders};

use crate::condition::{Condition, Operand};
use crate::config::EngineConfig;
use crate::engine::{Engine, Outcome};
use crate::error::{QueryError, Result};
use crate::storage::{Catalog, Store};
use crate::table::{ColumnRef, TableId, TableSet};
use std::fmt;
use tracing::debug;

/// One ORDER BY entry
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub column: ColumnRef,
    pub descending: bool,
}

#[derive(Debug, Clone)]
pub struct Select<C> {
    pub tables: TableSet<C>,
    pub projection: Vec<ColumnRef>,
    /// Output label of each projected column
    pub labels: Vec<String>,
    pub condition: Option<Condition<C>>,
    pub order_by: Vec<OrderItem>,
}

impl<C> Select<C> {
    /// Tables not connected to the first table through join conditions
    ///
    /// Join leaves link the tables they reference; every table outside the
    /// component of the first FROM entry is returned. Always empty for a
    /// single-table query.
    pub fn unjoined_tables(&self) -> Vec<TableId> {
        if self.tables.len() < 2 {
            return Vec::new();
        }
        let mut parent: Vec<usize> = (0..self.tables.len()).collect();
        fn root(parent: &mut [usize], mut i: usize) -> usize {
            while parent[i] != i {
                parent[i] = parent[parent[i]];
                i = parent[i];
            }
            i
        }
        if let Some(condition) = &self.condition {
            for leaf in condition.leaves().into_iter().filter(|l| l.is_join()) {
                let mut referenced = leaf.referenced_tables().into_iter();
                if let Some(first) = referenced.next() {
                    for other in referenced {
                        let (a, b) = (root(&mut parent, first.index()), root(&mut parent, other.index()));
                        parent[b] = a;
                    }
                }
            }
        }
        let anchor = root(&mut parent, 0);
        self.tables
            .ids()
            .filter(|t| root(&mut parent, t.index()) != anchor)
            .collect()
    }

    /// Columns materialized per result row: the projection, then ORDER BY
    /// columns not already projected
    pub fn fetched_columns(&self) -> Vec<ColumnRef> {
        let mut columns = self.projection.clone();
        for item in &self.order_by {
            if !columns.contains(&item.column) {
                columns.push(item.column.clone());
            }
        }
        columns
    }
}

#[derive(Debug, Clone)]
pub struct Insert<C> {
    /// Holds the single target table
    pub tables: TableSet<C>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Operand<C>>>,
}

#[derive(Debug, Clone)]
pub struct Assignment<C> {
    pub column: String,
    pub value: Operand<C>,
}

#[derive(Debug, Clone)]
pub struct Update<C> {
    pub tables: TableSet<C>,
    pub assignments: Vec<Assignment<C>>,
    pub condition: Option<Condition<C>>,
}

#[derive(Debug, Clone)]
pub struct Delete<C> {
    pub tables: TableSet<C>,
    pub condition: Option<Condition<C>>,
}

#[derive(Debug, Clone)]
pub struct Describe<C> {
    pub tables: TableSet<C>,
}

/// Statement variants
#[derive(Debug, Clone)]
pub enum StatementKind<C> {
    Select(Select<C>),
    Insert(Insert<C>),
    Update(Update<C>),
    Delete(Delete<C>),
    /// List the tables of the catalog
    Show,
    /// List the columns of one table
    Describe(Describe<C>),
    BeginWork,
    CommitWork,
    RollbackWork,
}

/// Target table of single-table statements
pub const TARGET: TableId = TableId(0);

impl<C> StatementKind<C> {
    pub fn name(&self) -> &'static str {
        match self {
            StatementKind::Select(_) => "SELECT",
            StatementKind::Insert(_) => "INSERT",
            StatementKind::Update(_) => "UPDATE",
            StatementKind::Delete(_) => "DELETE",
            StatementKind::Show => "SHOW",
            StatementKind::Describe(_) => "DESCRIBE",
            StatementKind::BeginWork => "BEGIN",
            StatementKind::CommitWork => "COMMIT",
            StatementKind::RollbackWork => "ROLLBACK",
        }
    }

    pub fn tables(&self) -> Option<&TableSet<C>> {
        match self {
            StatementKind::Select(s) => Some(&s.tables),
            StatementKind::Insert(s) => Some(&s.tables),
            StatementKind::Update(s) => Some(&s.tables),
            StatementKind::Delete(s) => Some(&s.tables),
            StatementKind::Describe(s) => Some(&s.tables),
            StatementKind::Show
            | StatementKind::BeginWork
            | StatementKind::CommitWork
            | StatementKind::RollbackWork => None,
        }
    }

    pub fn condition(&self) -> Option<&Condition<C>> {
        match self {
            StatementKind::Select(s) => s.condition.as_ref(),
            StatementKind::Update(s) => s.condition.as_ref(),
            StatementKind::Delete(s) => s.condition.as_ref(),
            _ => None,
        }
    }

    /// True for statements that never change data
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            StatementKind::Select(_) | StatementKind::Show | StatementKind::Describe(_)
        )
    }
}

/// A prepared statement with its parameters
#[derive(Debug, Clone)]
pub struct Statement<C> {
    kind: StatementKind<C>,
    placeholders: Placeholders<C>,
    source: String,
    diagnostics: Diagnostics,
}

impl<C: Clone> Statement<C> {
    pub fn new(kind: StatementKind<C>) -> Self {
        Self {
            kind,
            placeholders: Placeholders::new(),
            source: String::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_placeholders(mut self, placeholders: Placeholders<C>) -> Self {
        self.placeholders = placeholders;
        self
    }

    /// Keep a diagnostic found while building; replayed by every `check`
    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.report(diagnostic);
    }

    pub fn kind(&self) -> &StatementKind<C> {
        &self.kind
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Diagnostics recorded while building the statement
    pub fn build_diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn placeholders(&self) -> &Placeholders<C> {
        &self.placeholders
    }

    pub fn placeholders_mut(&mut self) -> &mut Placeholders<C> {
        &mut self.placeholders
    }

    pub fn bind(&mut self, name: &str, value: C) -> Result<()> {
        self.placeholders.bind(name, value)
    }

    pub fn bind_null(&mut self, name: &str) -> Result<()> {
        self.placeholders.bind_null(name)
    }

    /// Bind `?` parameters in order
    pub fn bind_all(&mut self, values: impl IntoIterator<Item = Option<C>>) -> Result<()> {
        for (i, value) in values.into_iter().enumerate() {
            let name = (i + 1).to_string();
            match value {
                Some(v) => self.placeholders.bind(&name, v)?,
                None => self.placeholders.bind_null(&name)?,
            }
        }
        Ok(())
    }

    fn span_of(&self, fragment: &str) -> Option<Span> {
        Span::locate(&self.source, fragment)
    }

    /// Report every problem that would make execution fail or misbehave
    pub fn check(&self, catalog: &dyn Catalog, config: &EngineConfig, reporter: &mut dyn Reporter) {
        for diagnostic in self.diagnostics.iter() {
            reporter.report(diagnostic.clone());
        }

        if let Some(tables) = self.kind.tables() {
            self.check_tables(tables, catalog, reporter);
        }

        match &self.kind {
            StatementKind::Select(select) => {
                if !config.allow_cartesian {
                    for table in select.unjoined_tables() {
                        let label = select.tables.get(table).label().to_string();
                        reporter.report(
                            Diagnostic::fatal(format!(
                                "table {} is not joined to the other tables",
                                label
                            ))
                            .with_span(self.span_of(&label)),
                        );
                    }
                }
            }
            StatementKind::Insert(insert) => {
                for (i, row) in insert.rows.iter().enumerate() {
                    if row.len() != insert.columns.len() {
                        reporter.report(Diagnostic::fatal(format!(
                            "row {} has {} values for {} columns",
                            i + 1,
                            row.len(),
                            insert.columns.len()
                        )));
                    }
                }
                self.check_columns(&insert.tables, &insert.columns, catalog, reporter);
            }
            StatementKind::Update(update) => {
                let columns: Vec<String> =
                    update.assignments.iter().map(|a| a.column.clone()).collect();
                self.check_columns(&update.tables, &columns, catalog, reporter);
            }
            _ => {}
        }

        for placeholder in self.placeholders.unbound() {
            let span = placeholder.span().or_else(|| self.span_of(placeholder.name()));
            reporter.report(
                Diagnostic::fatal(format!("placeholder {} is not bound", placeholder.name()))
                    .with_span(span),
            );
        }
    }

    fn check_tables(&self, tables: &TableSet<C>, catalog: &dyn Catalog, reporter: &mut dyn Reporter) {
        for table in tables.iter() {
            let Ok(name) = table.name() else {
                reporter.report(
                    Diagnostic::fatal(format!("unknown table {}", table.written_name()))
                        .with_span(self.span_of(table.written_name())),
                );
                continue;
            };
            let Some(metadata) = catalog.metadata(name) else {
                reporter.report(
                    Diagnostic::fatal(format!("unknown table {}", name))
                        .with_span(self.span_of(table.written_name())),
                );
                continue;
            };
            for column in table.select_columns().iter().chain(table.condition_columns()) {
                if metadata.column(column).is_none() {
                    reporter.report(
                        Diagnostic::fatal(format!("unknown column {}.{}", table.label(), column))
                            .with_span(self.span_of(column)),
                    );
                }
            }
        }
    }

    fn check_columns(
        &self,
        tables: &TableSet<C>,
        columns: &[String],
        catalog: &dyn Catalog,
        reporter: &mut dyn Reporter,
    ) {
        if tables.is_empty() {
            return;
        }
        let table = tables.get(TARGET);
        let Some(metadata) = table.name().ok().and_then(|n| catalog.metadata(n)) else {
            return;
        };
        for column in columns {
            if metadata.column(column).is_none() {
                reporter.report(
                    Diagnostic::fatal(format!("unknown column {}.{}", table.label(), column))
                        .with_span(self.span_of(column)),
                );
            }
        }
    }

    /// Check, then run against the engine
    pub fn execute<S>(&self, engine: &mut Engine<S>) -> Result<Outcome<C>>
    where
        S: Store<Value = C>,
        C: fmt::Display + fmt::Debug,
    {
        let mut diagnostics = Diagnostics::new();
        self.check(engine.store(), engine.config(), &mut diagnostics);
        if diagnostics.has_fatal() {
            debug!(statement = self.kind.name(), %diagnostics, "check failed");
            return Err(QueryError::Check(diagnostics));
        }
        engine.run(self)
    }
}

impl<C> fmt::Display for Statement<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.source.is_empty() {
            f.write_str(self.kind.name())
        } else {
            f.write_str(&self.source)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{ColumnCondition, Relation};
    use crate::storage::{ColumnDef, MemoryStore};
    use crate::value::{ColumnType, Value};

    fn catalog() -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .create_table("t", vec![ColumnDef::new("x", ColumnType::Integer)])
            .unwrap();
        store
            .create_table("u", vec![ColumnDef::new("y", ColumnType::Integer)])
            .unwrap();
        store
    }

    fn select(tables: TableSet<Value>, condition: Option<Condition<Value>>) -> Statement<Value> {
        let mut tables = tables;
        if let Some(c) = &condition {
            c.associate(&mut tables, true);
        }
        Statement::new(StatementKind::Select(Select {
            tables,
            projection: vec![],
            labels: vec![],
            condition,
            order_by: vec![],
        }))
    }

    fn check(statement: &Statement<Value>, config: EngineConfig) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        statement.check(&catalog(), &config, &mut diagnostics);
        diagnostics
    }

    #[test]
    fn test_unresolved_table_is_fatal() {
        let mut tables = TableSet::new();
        tables.add("nope", None);
        let statement = select(tables, None).with_source("SELECT * FROM nope");
        let diagnostics = check(&statement, EngineConfig::default());
        assert!(diagnostics.has_fatal());
        let first = diagnostics.iter().next().unwrap();
        assert_eq!(first.span.unwrap().offset, 14);
    }

    #[test]
    fn test_cartesian_guard() {
        let mut tables = TableSet::new();
        let t = tables.add("t", None);
        let u = tables.add("u", None);
        tables.get_mut(t).resolve("t");
        tables.get_mut(u).resolve("u");
        let statement = select(tables.clone(), None);
        let diagnostics = check(&statement, EngineConfig::default());
        assert_eq!(diagnostics.fatal().count(), 1);
        assert!(diagnostics.to_string().contains("table u is not joined"));
        assert!(!check(&statement, EngineConfig::default().with_allow_cartesian(true)).has_fatal());

        let join = Condition::Column(ColumnCondition::Comparison {
            left: ColumnRef::new(t, Some("t".into()), "x"),
            relation: Relation::Eq,
            right: Operand::Column(ColumnRef::new(u, Some("u".into()), "y")),
        });
        let statement = select(tables, Some(join));
        assert!(!check(&statement, EngineConfig::default()).has_fatal());
    }

    #[test]
    fn test_cartesian_guard_needs_one_component() {
        let mut tables: TableSet<Value> = TableSet::new();
        let ids: Vec<TableId> = ["a", "b", "c", "d"]
            .into_iter()
            .map(|name| {
                let id = tables.add("t", Some(name.into()));
                tables.get_mut(id).resolve("t");
                id
            })
            .collect();
        let eq = |l: TableId, r: TableId| {
            Condition::Column(ColumnCondition::Comparison {
                left: ColumnRef::new(l, None, "x"),
                relation: Relation::Eq,
                right: Operand::Column(ColumnRef::new(r, None, "x")),
            })
        };
        let pairs = Condition::and(eq(ids[0], ids[1]), eq(ids[2], ids[3]));
        let select_of = |condition: Condition<Value>| Select {
            tables: tables.clone(),
            projection: vec![],
            labels: vec![],
            condition: Some(condition),
            order_by: vec![],
        };

        // a-b and c-d each join, but nothing links the two pairs
        assert_eq!(select_of(pairs.clone()).unjoined_tables(), vec![ids[2], ids[3]]);

        let chained = Condition::and(pairs, eq(ids[1], ids[2]));
        assert!(select_of(chained).unjoined_tables().is_empty());
    }

    #[test]
    fn test_unbound_placeholder_is_fatal() {
        let mut tables = TableSet::new();
        let t = tables.add("t", None);
        tables.get_mut(t).resolve("t");
        let condition = Condition::Column(ColumnCondition::Comparison {
            left: ColumnRef::new(t, None, "x"),
            relation: Relation::Eq,
            right: Operand::Placeholder("1".into()),
        });
        let mut placeholders = Placeholders::new();
        placeholders.declare("1", Some(ColumnType::Integer), None);
        let mut statement = select(tables, Some(condition)).with_placeholders(placeholders);
        assert!(check(&statement, EngineConfig::default()).has_fatal());
        statement.bind("1", Value::from(3)).unwrap();
        assert!(!check(&statement, EngineConfig::default()).has_fatal());
    }

    #[test]
    fn test_unknown_column_is_fatal() {
        let mut tables = TableSet::new();
        let t = tables.add("t", None);
        tables.get_mut(t).resolve("t");
        tables.get_mut(t).add_select_column("missing");
        let diagnostics = check(&select(tables, None), EngineConfig::default());
        assert!(diagnostics.to_string().contains("unknown column t.missing"));
    }

    #[test]
    fn test_build_diagnostics_replayed() {
        let mut statement: Statement<Value> = Statement::new(StatementKind::Show);
        statement.report(Diagnostic::hint("identifier case normalized").with_suggestion("t"));
        let diagnostics = check(&statement, EngineConfig::default());
        assert_eq!(diagnostics.len(), 1);
        assert!(!diagnostics.has_fatal());
    }

    #[test]
    fn test_fetched_columns_dedup_order_by() {
        let x = ColumnRef::new(TableId(0), Some("t".into()), "x");
        let y = ColumnRef::new(TableId(0), Some("t".into()), "y");
        let select: Select<Value> = Select {
            tables: TableSet::new(),
            projection: vec![x.clone()],
            labels: vec!["x".into()],
            condition: None,
            order_by: vec![
                OrderItem {
                    column: y.clone(),
                    descending: false,
                },
                OrderItem {
                    column: x.clone(),
                    descending: true,
                },
            ],
        };
        assert_eq!(select.fetched_columns(), vec![x, y]);
    }
}
