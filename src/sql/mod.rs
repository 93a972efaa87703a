//! SQL front-end
//!
//! Wraps sqlparser-rs and binds its AST into engine [`Statement`]s.

mod binder;

pub use binder::Binder;

use crate::error::{QueryError, Result};
use crate::statement::Statement;
use crate::storage::Store;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::{Parser, ParserError};
use sqlparser::tokenizer::{Token, Tokenizer};

/// Parse a single SQL statement
pub fn parse_sql(sql: &str) -> Result<sqlparser::ast::Statement> {
    let dialect = GenericDialect {};
    let mut statements = Parser::parse_sql(&dialect, sql)?;

    if statements.is_empty() {
        return Err(QueryError::Parse("Empty SQL statement".to_string()));
    }

    if statements.len() > 1 {
        return Err(QueryError::Parse(
            "Multiple statements not supported".to_string(),
        ));
    }

    Ok(statements.remove(0))
}

/// Parse a `;`-separated script
pub fn parse_sql_statements(sql: &str) -> Result<Vec<sqlparser::ast::Statement>> {
    let dialect = GenericDialect {};
    let statements = Parser::parse_sql(&dialect, sql)?;
    Ok(statements)
}

/// Tokens of `sql` with the byte offset each one starts at
///
/// Whitespace and comments are tokens too, so consecutive offsets cover
/// the whole input.
pub fn tokenize(sql: &str) -> Result<Vec<(Token, usize)>> {
    let dialect = GenericDialect {};
    let tokens = Tokenizer::new(&dialect, sql)
        .tokenize_with_location()
        .map_err(ParserError::from)?;
    let line_starts: Vec<usize> = std::iter::once(0)
        .chain(sql.match_indices('\n').map(|(i, _)| i + 1))
        .collect();

    let mut located = Vec::with_capacity(tokens.len());
    for t in tokens {
        let line = (t.location.line as usize).saturating_sub(1);
        let column = (t.location.column as usize).saturating_sub(1);
        let start = line_starts.get(line).copied().unwrap_or(sql.len());
        let offset = sql[start..]
            .char_indices()
            .nth(column)
            .map_or(sql.len(), |(i, _)| start + i);
        located.push((t.token, offset));
    }
    Ok(located)
}

/// Parse and bind one statement against the store's catalog
pub fn prepare<S: Store>(store: &S, sql: &str) -> Result<Statement<S::Value>> {
    let ast = parse_sql(sql)?;
    Binder::new(store, sql).bind(&ast)
}
