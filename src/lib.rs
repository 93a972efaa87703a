//! Embeddable SQL query engine with three-valued logic
//!
//! Statements are parsed with sqlparser, bound against a [`Store`]'s
//! catalog, checked, and run by the [`Engine`]: tables are placed in order
//! of estimated selectivity, indexed, pruned by pairwise merge-joins, and
//! the remaining candidate space is enumerated with the WHERE predicate
//! evaluated under SQL's TRUE/FALSE/UNKNOWN logic.

pub mod cli;
pub mod condition;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod execution;
pub mod result;
pub mod sql;
pub mod statement;
pub mod storage;
pub mod table;
pub mod value;

// Re-export main types
pub use condition::{Condition, Relation, TruthValue};
pub use config::EngineConfig;
pub use engine::{Engine, JoinPlan, Outcome, TransactionEvent};
pub use error::{QueryError, Result};
pub use execution::{ExecutionContext, QueryMetrics, QueryResult};
pub use result::{OrderedFetchResult, SortKey};
pub use sql::prepare;
pub use statement::{Diagnostic, Diagnostics, Severity, Statement, StatementKind};
pub use storage::{Catalog, ColumnDef, MemoryStore, Store};
pub use value::{ColumnType, Value};
