//! Execution context - main entry point for query execution

use crate::config::EngineConfig;
use crate::engine::{Engine, Outcome};
use crate::error::{QueryError, Result};
use crate::sql::{self, Binder};
use crate::statement::{Diagnostics, Statement};
use crate::storage::{MemoryStore, Store, TableMetadata};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

/// Query execution result
#[derive(Debug)]
pub struct QueryResult<C> {
    /// What the statement produced
    pub outcome: Outcome<C>,
    /// Hints reported by the check that preceded execution
    pub diagnostics: Diagnostics,
    /// Execution metrics
    pub metrics: QueryMetrics,
}

impl<C> QueryResult<C> {
    /// Rows returned, or rows affected for INSERT/UPDATE/DELETE
    pub fn row_count(&self) -> usize {
        match &self.outcome {
            Outcome::Rows(rows) => rows.len(),
            Outcome::Affected(n) => *n,
            Outcome::Transaction(_) => 0,
        }
    }
}

/// Query execution metrics
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryMetrics {
    /// Time spent parsing
    pub parse_time: Duration,
    /// Time spent binding against the catalog
    pub bind_time: Duration,
    /// Time spent checking
    pub check_time: Duration,
    /// Time spent executing
    pub execute_time: Duration,
    /// Total time
    pub total_time: Duration,
}

impl fmt::Display for QueryMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parse={:?}, bind={:?}, check={:?}, exec={:?}, total={:?}",
            self.parse_time, self.bind_time, self.check_time, self.execute_time, self.total_time
        )
    }
}

/// Execution context - owns the engine and runs SQL text against it
pub struct ExecutionContext<S> {
    engine: Engine<S>,
}

impl Default for ExecutionContext<MemoryStore> {
    fn default() -> Self {
        Self::new(MemoryStore::new())
    }
}

impl<S: Store> ExecutionContext<S> {
    pub fn new(store: S) -> Self {
        Self {
            engine: Engine::new(store),
        }
    }

    pub fn with_config(store: S, config: EngineConfig) -> Self {
        Self {
            engine: Engine::with_config(store, config),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        self.engine.config()
    }

    pub fn set_config(&mut self, config: EngineConfig) {
        self.engine.set_config(config);
    }

    pub fn engine(&self) -> &Engine<S> {
        &self.engine
    }

    pub fn store(&self) -> &S {
        self.engine.store()
    }

    pub fn store_mut(&mut self) -> &mut S {
        self.engine.store_mut()
    }

    pub fn into_store(self) -> S {
        self.engine.into_store()
    }

    /// Parse and bind a statement without running it
    pub fn prepare(&self, query: &str) -> Result<Statement<S::Value>> {
        sql::prepare(self.engine.store(), query)
    }

    /// Every diagnostic `execute` would see for this statement
    pub fn check(&self, statement: &Statement<S::Value>) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        statement.check(self.engine.store(), self.engine.config(), &mut diagnostics);
        diagnostics
    }

    /// Check and run a prepared statement
    pub fn execute(&mut self, statement: &Statement<S::Value>) -> Result<QueryResult<S::Value>> {
        let start = Instant::now();
        let mut metrics = QueryMetrics::default();

        let check_start = Instant::now();
        let diagnostics = self.check(statement);
        metrics.check_time = check_start.elapsed();
        if diagnostics.has_fatal() {
            return Err(QueryError::Check(diagnostics));
        }

        let execute_start = Instant::now();
        let outcome = self.engine.run(statement)?;
        metrics.execute_time = execute_start.elapsed();
        metrics.total_time = start.elapsed();

        Ok(QueryResult {
            outcome,
            diagnostics,
            metrics,
        })
    }

    /// Execute a SQL statement and return results
    pub fn sql(&mut self, query: &str) -> Result<QueryResult<S::Value>> {
        let start = Instant::now();

        let parse_start = Instant::now();
        let ast = sql::parse_sql(query)?;
        let parse_time = parse_start.elapsed();

        let bind_start = Instant::now();
        let statement = Binder::new(self.engine.store(), query).bind(&ast)?;
        let bind_time = bind_start.elapsed();

        let mut result = self.execute(&statement)?;
        result.metrics.parse_time = parse_time;
        result.metrics.bind_time = bind_time;
        result.metrics.total_time = start.elapsed();
        debug!(statement = statement.kind().name(), metrics = %result.metrics, "query finished");
        Ok(result)
    }

    /// Run a `;`-separated script, stopping at the first error
    ///
    /// Statements are bound one at a time, so a script may create data that
    /// later statements read.
    pub fn sql_script(&mut self, script: &str) -> Result<Vec<QueryResult<S::Value>>> {
        let statements = sql::parse_sql_statements(script)?;
        let mut results = Vec::with_capacity(statements.len());
        for ast in &statements {
            // Spans point into the script only when it holds one statement
            let source = if statements.len() == 1 {
                script.to_string()
            } else {
                ast.to_string()
            };
            let statement = Binder::new(self.engine.store(), &source).bind(ast)?;
            results.push(self.execute(&statement)?);
        }
        Ok(results)
    }

    /// List catalog tables
    pub fn table_names(&self) -> Vec<String> {
        self.engine.store().table_names()
    }

    /// Get table metadata
    pub fn table_metadata(&self, name: &str) -> Option<TableMetadata> {
        let store = self.engine.store();
        store.resolve_table(name).and_then(|n| store.metadata(&n))
    }
}
