//! sqlparser AST to bound statement

use crate::condition::{ColumnCondition, Condition, Operand, Relation, TruthValue};
use crate::error::{QueryError, Result};
use crate::sql::tokenize;
use crate::statement::{
    Assignment, Delete, Describe, Diagnostic, Insert, OrderItem, Placeholders, Select, Span,
    Statement, StatementKind, Update,
};
use crate::storage::{Store, TableMetadata};
use crate::table::{ColumnRef, TableId, TableSet};
use crate::value::{ColumnType, Literal};
use sqlparser::ast::{
    self, AssignmentTarget, BinaryOperator, DataType, Expr as SqlExpr, FromTable, JoinConstraint,
    JoinOperator, ObjectName, SelectItem, SetExpr, TableFactor, UnaryOperator, Value,
};
use sqlparser::tokenizer::Token;

/// Right-hand side of a predicate before it is typed against its column
enum Term {
    Column(ColumnRef),
    Literal(Literal),
    Placeholder(String, Option<Span>),
    Null,
}

fn object_name(name: &ObjectName) -> String {
    name.0
        .iter()
        .map(|i| i.value.clone())
        .collect::<Vec<_>>()
        .join(".")
}

/// Byte offsets of the `?` placeholder tokens in `source`
///
/// Question marks inside literals, quoted identifiers and comments are not
/// tokens of their own and are skipped.
fn positional_offsets(source: &str) -> Vec<usize> {
    let Ok(tokens) = tokenize(source) else {
        return Vec::new();
    };
    tokens
        .into_iter()
        .filter(|(token, _)| matches!(token, Token::Placeholder(p) if p == "?"))
        .map(|(_, offset)| offset)
        .collect()
}

/// Binds one parsed statement against a store's catalog
///
/// Unresolved tables, unknown columns and unbound parameters are left for
/// `Statement::check` to report; ambiguous references and case-normalized
/// identifiers are recorded as diagnostics here. Type errors abort binding.
pub struct Binder<'a, S: Store> {
    store: &'a S,
    source: &'a str,
    tables: TableSet<S::Value>,
    /// Catalog metadata per table ordinal
    metadata: Vec<Option<TableMetadata>>,
    placeholders: Placeholders<S::Value>,
    diagnostics: Vec<Diagnostic>,
    positional: usize,
    /// Byte offset of each `?` in source order
    positional_offsets: Vec<usize>,
}

impl<'a, S: Store> Binder<'a, S> {
    pub fn new(store: &'a S, source: &'a str) -> Self {
        Self {
            store,
            source,
            tables: TableSet::new(),
            metadata: Vec::new(),
            placeholders: Placeholders::new(),
            diagnostics: Vec::new(),
            positional: 0,
            positional_offsets: positional_offsets(source),
        }
    }

    /// Bind a parsed statement
    pub fn bind(mut self, stmt: &ast::Statement) -> Result<Statement<S::Value>> {
        let kind = match stmt {
            ast::Statement::Query(query) => StatementKind::Select(self.bind_query(query)?),
            ast::Statement::Insert(insert) => StatementKind::Insert(self.bind_insert(insert)?),
            ast::Statement::Update {
                table,
                assignments,
                selection,
                ..
            } => StatementKind::Update(self.bind_update(table, assignments, selection.as_ref())?),
            ast::Statement::Delete(delete) => StatementKind::Delete(self.bind_delete(delete)?),
            ast::Statement::StartTransaction { .. } => StatementKind::BeginWork,
            ast::Statement::Commit { .. } => StatementKind::CommitWork,
            ast::Statement::Rollback { .. } => StatementKind::RollbackWork,
            ast::Statement::ShowTables { .. } => StatementKind::Show,
            ast::Statement::ExplainTable { table_name, .. } => {
                self.add_table(table_name, None);
                StatementKind::Describe(Describe {
                    tables: std::mem::take(&mut self.tables),
                })
            }
            other => {
                return Err(QueryError::Unsupported(format!(
                    "statement type not supported: {}",
                    other
                )))
            }
        };

        let mut statement = Statement::new(kind)
            .with_source(self.source)
            .with_placeholders(self.placeholders);
        for diagnostic in self.diagnostics {
            statement.report(diagnostic);
        }
        Ok(statement)
    }

    fn bind_query(&mut self, query: &ast::Query) -> Result<Select<S::Value>> {
        if query.with.is_some() {
            return Err(QueryError::Unsupported("WITH clauses".into()));
        }
        if query.limit.is_some() || query.offset.is_some() {
            return Err(QueryError::Unsupported("LIMIT/OFFSET".into()));
        }
        let select = match query.body.as_ref() {
            SetExpr::Select(select) => select,
            other => {
                return Err(QueryError::Unsupported(format!("query body: {}", other)));
            }
        };
        if select.distinct.is_some() {
            return Err(QueryError::Unsupported("SELECT DISTINCT".into()));
        }

        let on_clauses = self.bind_from(&select.from)?;
        let (projection, labels) = self.bind_projection(&select.projection)?;

        let mut condition: Option<Condition<S::Value>> = None;
        for expr in on_clauses.iter().copied().chain(select.selection.as_ref()) {
            let bound = self.bind_condition(expr)?;
            condition = Some(match condition {
                Some(existing) => Condition::and(existing, bound),
                None => bound,
            });
        }

        let mut order_by = Vec::new();
        if let Some(clause) = &query.order_by {
            for item in &clause.exprs {
                let column = self.bind_order_column(&item.expr, &projection, &labels)?;
                self.tables.get_mut(column.table).add_select_column(&column.column);
                order_by.push(OrderItem {
                    column,
                    descending: item.asc == Some(false),
                });
            }
        }

        if let Some(condition) = &condition {
            condition.associate(&mut self.tables, true);
        }

        Ok(Select {
            tables: std::mem::take(&mut self.tables),
            projection,
            labels,
            condition,
            order_by,
        })
    }

    /// Register FROM tables; returns the ON expressions of inner joins
    fn bind_from<'q>(&mut self, from: &'q [ast::TableWithJoins]) -> Result<Vec<&'q SqlExpr>> {
        if from.is_empty() {
            return Err(QueryError::Unsupported("SELECT without FROM".into()));
        }
        let mut on_clauses = Vec::new();
        for table in from {
            self.bind_table_factor(&table.relation)?;
            for join in &table.joins {
                self.bind_table_factor(&join.relation)?;
                match &join.join_operator {
                    JoinOperator::Inner(JoinConstraint::On(expr)) => on_clauses.push(expr),
                    JoinOperator::Inner(JoinConstraint::None) | JoinOperator::CrossJoin => {}
                    other => {
                        return Err(QueryError::Unsupported(format!("join type {:?}", other)));
                    }
                }
            }
        }
        self.check_duplicate_labels();
        Ok(on_clauses)
    }

    fn bind_table_factor(&mut self, factor: &TableFactor) -> Result<TableId> {
        match factor {
            TableFactor::Table { name, alias, .. } => {
                Ok(self.add_table(name, alias.as_ref().map(|a| a.name.value.clone())))
            }
            other => Err(QueryError::Unsupported(format!("table factor: {}", other))),
        }
    }

    fn add_table(&mut self, name: &ObjectName, correlation: Option<String>) -> TableId {
        let written = object_name(name);
        let id = self.tables.add(written.clone(), correlation);
        let resolved = self.store.resolve_table(&written);
        if let Some(catalog_name) = &resolved {
            if *catalog_name != written {
                self.diagnostics.push(
                    Diagnostic::hint(format!("table {} resolved as {}", written, catalog_name))
                        .with_span(Span::locate(self.source, &written))
                        .with_suggestion(catalog_name.clone()),
                );
            }
            self.tables.get_mut(id).resolve(catalog_name.clone());
        }
        let metadata = resolved.and_then(|n| self.store.metadata(&n));
        self.metadata.push(metadata);
        id
    }

    fn check_duplicate_labels(&mut self) {
        let labels: Vec<String> = self.tables.iter().map(|t| t.label().to_string()).collect();
        for (i, label) in labels.iter().enumerate() {
            if labels[..i].contains(label) {
                self.diagnostics.push(
                    Diagnostic::fatal(format!(
                        "table {} appears more than once; give each occurrence an alias",
                        label
                    ))
                    .with_span(Span::locate(self.source, label)),
                );
            }
        }
    }

    fn bind_projection(&mut self, items: &[SelectItem]) -> Result<(Vec<ColumnRef>, Vec<String>)> {
        let mut projection = Vec::new();
        let mut labels = Vec::new();
        for item in items {
            match item {
                SelectItem::Wildcard(_) => {
                    let ids: Vec<TableId> = self.tables.ids().collect();
                    for id in ids {
                        self.expand_table(id, &mut projection, &mut labels);
                    }
                }
                SelectItem::QualifiedWildcard(name, _) => {
                    let qualifier = object_name(name);
                    match self.find_table(&qualifier) {
                        Some(id) => self.expand_table(id, &mut projection, &mut labels),
                        None => self.diagnostics.push(
                            Diagnostic::fatal(format!("unknown table {} in {}.*", qualifier, qualifier))
                                .with_span(Span::locate(self.source, &qualifier)),
                        ),
                    }
                }
                SelectItem::UnnamedExpr(expr) => {
                    let column = self.column(expr)?;
                    labels.push(column.column.clone());
                    projection.push(column);
                }
                SelectItem::ExprWithAlias { expr, alias } => {
                    let column = self.column(expr)?;
                    labels.push(alias.value.clone());
                    projection.push(column);
                }
            }
        }
        for column in &projection {
            self.tables.get_mut(column.table).add_select_column(&column.column);
        }
        Ok((projection, labels))
    }

    /// Append every column of a resolved table; unresolved tables expand to
    /// nothing and are reported by `Statement::check`
    fn expand_table(&self, id: TableId, projection: &mut Vec<ColumnRef>, labels: &mut Vec<String>) {
        let Some(metadata) = &self.metadata[id.index()] else {
            return;
        };
        let label = self.tables.get(id).label().to_string();
        for column in &metadata.columns {
            labels.push(column.name.clone());
            projection.push(ColumnRef::new(id, Some(label.clone()), column.name.clone()));
        }
    }

    fn bind_order_column(
        &mut self,
        expr: &SqlExpr,
        projection: &[ColumnRef],
        labels: &[String],
    ) -> Result<ColumnRef> {
        match expr {
            SqlExpr::Value(Value::Number(n, _)) => {
                let position: usize = n
                    .parse()
                    .map_err(|_| QueryError::Bind(format!("invalid ORDER BY position {}", n)))?;
                position
                    .checked_sub(1)
                    .and_then(|i| projection.get(i))
                    .cloned()
                    .ok_or_else(|| {
                        QueryError::Bind(format!(
                            "ORDER BY position {} is out of range (1-{})",
                            position,
                            projection.len()
                        ))
                    })
            }
            SqlExpr::Identifier(ident) => {
                match labels.iter().position(|l| *l == ident.value) {
                    Some(i) => Ok(projection[i].clone()),
                    None => self.column(expr),
                }
            }
            _ => self.column(expr),
        }
    }

    fn find_table(&mut self, qualifier: &str) -> Option<TableId> {
        if let Some(id) = self.tables.find(qualifier) {
            return Some(id);
        }
        let id = self
            .tables
            .iter()
            .find(|t| t.label().eq_ignore_ascii_case(qualifier))
            .map(|t| t.id())?;
        let label = self.tables.get(id).label().to_string();
        self.diagnostics.push(
            Diagnostic::hint(format!("table {} resolved as {}", qualifier, label))
                .with_span(Span::locate(self.source, qualifier))
                .with_suggestion(label),
        );
        Some(id)
    }

    /// Resolve a column reference expression
    fn column(&mut self, expr: &SqlExpr) -> Result<ColumnRef> {
        match expr {
            SqlExpr::Identifier(ident) => Ok(self.resolve_column(None, &ident.value)),
            SqlExpr::CompoundIdentifier(parts) if parts.len() == 2 => {
                Ok(self.resolve_column(Some(&parts[0].value), &parts[1].value))
            }
            SqlExpr::Nested(inner) => self.column(inner),
            other => Err(QueryError::Unsupported(format!(
                "expected a column reference, found {}",
                other
            ))),
        }
    }

    fn column_ref(&self, id: TableId, column: String) -> ColumnRef {
        let label = self.tables.get(id).label().to_string();
        ColumnRef::new(id, Some(label), column)
    }

    /// Catalog spelling of `name` in table `id`, reporting case normalization
    fn column_name(&mut self, id: TableId, name: &str) -> Option<String> {
        let metadata = self.metadata[id.index()].as_ref()?;
        if metadata.column(name).is_some() {
            return Some(name.to_string());
        }
        let spelled = metadata.column_ignore_case(name)?.name.clone();
        self.diagnostics.push(
            Diagnostic::hint(format!("column {} resolved as {}", name, spelled))
                .with_span(Span::locate(self.source, name))
                .with_suggestion(spelled.clone()),
        );
        Some(spelled)
    }

    fn resolve_column(&mut self, qualifier: Option<&str>, name: &str) -> ColumnRef {
        if let Some(qualifier) = qualifier {
            let Some(id) = self.find_table(qualifier) else {
                self.diagnostics.push(
                    Diagnostic::fatal(format!("unknown table {} in {}.{}", qualifier, qualifier, name))
                        .with_span(Span::locate(self.source, qualifier)),
                );
                return ColumnRef::new(TableId(0), Some(qualifier.to_string()), name);
            };
            let column = self.column_name(id, name).unwrap_or_else(|| name.to_string());
            return self.column_ref(id, column);
        }

        let exact: Vec<TableId> = self
            .tables
            .ids()
            .filter(|id| {
                self.metadata[id.index()]
                    .as_ref()
                    .is_some_and(|m| m.column(name).is_some())
            })
            .collect();
        let candidates = if exact.is_empty() {
            self.tables
                .ids()
                .filter(|id| {
                    self.metadata[id.index()]
                        .as_ref()
                        .is_some_and(|m| m.column_ignore_case(name).is_some())
                })
                .collect()
        } else {
            exact
        };

        match candidates.as_slice() {
            [id] => {
                let column = self.column_name(*id, name).unwrap_or_else(|| name.to_string());
                self.column_ref(*id, column)
            }
            [first, ..] => {
                let owners: Vec<String> = candidates
                    .iter()
                    .map(|id| self.tables.get(*id).label().to_string())
                    .collect();
                self.diagnostics.push(
                    Diagnostic::fatal(format!(
                        "column {} is ambiguous, found in {}",
                        name,
                        owners.join(", ")
                    ))
                    .with_span(Span::locate(self.source, name)),
                );
                self.column_ref(*first, name.to_string())
            }
            [] => {
                // Unknown here; check reports it against the first unresolved
                // table, or the first table when all of them resolved.
                let id = self
                    .tables
                    .ids()
                    .find(|id| self.metadata[id.index()].is_none())
                    .unwrap_or(TableId(0));
                self.column_ref(id, name.to_string())
            }
        }
    }

    fn column_type(&self, column: &ColumnRef) -> Option<ColumnType> {
        self.metadata
            .get(column.table.index())?
            .as_ref()?
            .column(&column.column)
            .map(|c| c.data_type)
    }

    fn placeholder_name(&mut self, token: &str) -> (String, Option<Span>) {
        if token == "?" {
            self.positional += 1;
            let span = self
                .positional_offsets
                .get(self.positional - 1)
                .map(|&offset| Span::at(self.source, offset, 1));
            return (self.positional.to_string(), span);
        }
        let span = Span::locate(self.source, token);
        let name = token
            .strip_prefix('$')
            .or_else(|| token.strip_prefix(':'))
            .unwrap_or(token);
        (name.to_string(), span)
    }

    fn term(&mut self, expr: &SqlExpr) -> Result<Term> {
        match expr {
            SqlExpr::Identifier(_) | SqlExpr::CompoundIdentifier(_) => {
                Ok(Term::Column(self.column(expr)?))
            }
            SqlExpr::Nested(inner) => self.term(inner),
            SqlExpr::Value(value) => match value {
                Value::Number(n, _) => Ok(Term::Literal(Literal::Number(n.clone()))),
                Value::SingleQuotedString(s) => Ok(Term::Literal(Literal::Text(s.clone()))),
                Value::Boolean(b) => Ok(Term::Literal(Literal::Boolean(*b))),
                Value::Null => Ok(Term::Null),
                Value::Placeholder(token) => {
                    let (name, span) = self.placeholder_name(token);
                    Ok(Term::Placeholder(name, span))
                }
                other => Err(QueryError::Unsupported(format!("literal {}", other))),
            },
            SqlExpr::UnaryOp {
                op: UnaryOperator::Minus,
                expr: inner,
            } => match self.term(inner)? {
                Term::Literal(lit) => lit.negate().map(Term::Literal).ok_or_else(|| {
                    QueryError::Unsupported(format!("unary minus on {}", inner))
                }),
                _ => Err(QueryError::Unsupported(format!("unary minus on {}", inner))),
            },
            SqlExpr::TypedString {
                data_type: DataType::Date,
                value,
            } => Ok(Term::Literal(Literal::Date(
                value.to_string().trim_matches('\'').to_string(),
            ))),
            other => Err(QueryError::Unsupported(format!("expression {}", other))),
        }
    }

    /// Type a term against the column it is compared with
    fn operand(&mut self, term: Term, data_type: Option<ColumnType>) -> Result<Operand<S::Value>> {
        match term {
            Term::Column(column) => Ok(Operand::Column(column)),
            Term::Null => Ok(Operand::Null),
            Term::Placeholder(name, span) => {
                self.placeholders.declare(&name, data_type, span);
                Ok(Operand::Placeholder(name))
            }
            Term::Literal(literal) => {
                let literal = match data_type {
                    Some(ty) => literal.coerce_to(ty),
                    None => literal,
                };
                if let Some(ty) = data_type {
                    if !literal.column_type().is_comparable_with(ty) {
                        return Err(QueryError::Unsupported(format!(
                            "cannot compare {} column with {} literal {}",
                            ty,
                            literal.column_type(),
                            literal
                        )));
                    }
                }
                Ok(Operand::Literal(self.store.convert(&literal)?))
            }
        }
    }

    fn relation(op: &BinaryOperator) -> Option<Relation> {
        match op {
            BinaryOperator::Eq => Some(Relation::Eq),
            BinaryOperator::NotEq => Some(Relation::Ne),
            BinaryOperator::Lt => Some(Relation::Lt),
            BinaryOperator::Gt => Some(Relation::Gt),
            BinaryOperator::LtEq => Some(Relation::Le),
            BinaryOperator::GtEq => Some(Relation::Ge),
            _ => None,
        }
    }

    fn bind_condition(&mut self, expr: &SqlExpr) -> Result<Condition<S::Value>> {
        match expr {
            SqlExpr::BinaryOp {
                left,
                op: BinaryOperator::And,
                right,
            } => Ok(Condition::and(
                self.bind_condition(left)?,
                self.bind_condition(right)?,
            )),
            SqlExpr::BinaryOp {
                left,
                op: BinaryOperator::Or,
                right,
            } => Ok(Condition::or(
                self.bind_condition(left)?,
                self.bind_condition(right)?,
            )),
            SqlExpr::BinaryOp { left, op, right } => match Self::relation(op) {
                Some(relation) => self.comparison(expr, left, relation, right),
                None => Err(QueryError::Unsupported(format!("operator {}", op))),
            },
            SqlExpr::UnaryOp {
                op: UnaryOperator::Not,
                expr: inner,
            } => Ok(Condition::not(self.bind_condition(inner)?)),
            SqlExpr::Nested(inner) => self.bind_condition(inner),
            SqlExpr::IsNull(inner) => Ok(self.null_test(inner)?),
            SqlExpr::IsNotNull(inner) => Ok(Condition::not(self.null_test(inner)?)),
            SqlExpr::IsTrue(inner) => self.truth_test(inner, TruthValue::True, false),
            SqlExpr::IsNotTrue(inner) => self.truth_test(inner, TruthValue::True, true),
            SqlExpr::IsFalse(inner) => self.truth_test(inner, TruthValue::False, false),
            SqlExpr::IsNotFalse(inner) => self.truth_test(inner, TruthValue::False, true),
            SqlExpr::IsUnknown(inner) => self.truth_test(inner, TruthValue::Unknown, false),
            SqlExpr::IsNotUnknown(inner) => self.truth_test(inner, TruthValue::Unknown, true),
            SqlExpr::Like {
                negated,
                expr: inner,
                pattern,
                escape_char,
                ..
            } => {
                let escape = escape_char.as_ref().map(|c| c.to_string());
                let like = self.like(inner, pattern, escape.as_deref())?;
                Ok(if *negated { Condition::not(like) } else { like })
            }
            SqlExpr::InList {
                expr: inner,
                list,
                negated,
            } => {
                let column = self.column(inner)?;
                let data_type = self.column_type(&column);
                let mut set = Vec::with_capacity(list.len());
                for item in list {
                    let term = self.term(item)?;
                    set.push(self.operand(term, data_type)?);
                }
                let condition = Condition::Column(ColumnCondition::In { column, set });
                Ok(if *negated {
                    Condition::not(condition)
                } else {
                    condition
                })
            }
            SqlExpr::Between {
                expr: inner,
                negated,
                low,
                high,
            } => {
                let condition = Condition::and(
                    self.comparison(expr, inner, Relation::Ge, low)?,
                    self.comparison(expr, inner, Relation::Le, high)?,
                );
                Ok(if *negated {
                    Condition::not(condition)
                } else {
                    condition
                })
            }
            SqlExpr::Identifier(_) | SqlExpr::CompoundIdentifier(_) => {
                let column = self.column(expr)?;
                match self.column_type(&column) {
                    Some(ColumnType::Boolean) | None => {
                        let truth = self.store.convert(&Literal::Boolean(true))?;
                        Ok(Condition::Column(ColumnCondition::Comparison {
                            left: column,
                            relation: Relation::Eq,
                            right: Operand::Literal(truth),
                        }))
                    }
                    Some(other) => Err(QueryError::Unsupported(format!(
                        "{} column {} used as a condition",
                        other, column
                    ))),
                }
            }
            other => Err(QueryError::Unsupported(format!("condition {}", other))),
        }
    }

    fn comparison(
        &mut self,
        whole: &SqlExpr,
        left: &SqlExpr,
        relation: Relation,
        right: &SqlExpr,
    ) -> Result<Condition<S::Value>> {
        let (column, relation, other) = match (self.term(left)?, self.term(right)?) {
            (Term::Column(column), other) => (column, relation, other),
            (other, Term::Column(column)) => (column, relation.flip(), other),
            _ => {
                return Err(QueryError::Unsupported(format!(
                    "comparison between two constants: {}",
                    whole
                )))
            }
        };
        let data_type = self.column_type(&column);
        if let Term::Column(other) = &other {
            if let (Some(a), Some(b)) = (data_type, self.column_type(other)) {
                if !a.is_comparable_with(b) {
                    return Err(QueryError::Unsupported(format!(
                        "cannot compare {} column {} with {} column {}",
                        a, column, b, other
                    )));
                }
            }
        }
        let right = self.operand(other, data_type)?;
        Ok(Condition::Column(ColumnCondition::Comparison {
            left: column,
            relation,
            right,
        }))
    }

    fn null_test(&mut self, inner: &SqlExpr) -> Result<Condition<S::Value>> {
        let column = self.column(inner)?;
        Ok(Condition::Column(ColumnCondition::Null { column }))
    }

    /// `IS [NOT] <truth>`; `not` becomes the test's `negate` flag
    fn truth_test(
        &mut self,
        inner: &SqlExpr,
        truth: TruthValue,
        not: bool,
    ) -> Result<Condition<S::Value>> {
        Ok(Condition::is(self.bind_condition(inner)?, truth, not))
    }

    fn like(
        &mut self,
        inner: &SqlExpr,
        pattern: &SqlExpr,
        escape: Option<&str>,
    ) -> Result<Condition<S::Value>> {
        let column = self.column(inner)?;
        let escape = match escape {
            None => None,
            Some(e) => {
                let mut chars = e.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(c),
                    _ => {
                        return Err(QueryError::Unsupported(format!(
                            "LIKE escape must be a single character, got '{}'",
                            e
                        )))
                    }
                }
            }
        };
        let pattern = match self.term(pattern)? {
            term @ (Term::Literal(Literal::Text(_)) | Term::Placeholder(..) | Term::Null) => {
                self.operand(term, Some(ColumnType::Text))?
            }
            _ => {
                return Err(QueryError::Unsupported(format!(
                    "LIKE pattern must be a string or parameter: {}",
                    pattern
                )))
            }
        };
        Ok(Condition::Column(ColumnCondition::Like {
            column,
            pattern,
            escape,
        }))
    }

    fn single_table(&mut self, relation: &ast::TableWithJoins) -> Result<TableId> {
        if !relation.joins.is_empty() {
            return Err(QueryError::Unsupported("joins in UPDATE/DELETE".into()));
        }
        self.bind_table_factor(&relation.relation)
    }

    fn bind_insert(&mut self, insert: &ast::Insert) -> Result<Insert<S::Value>> {
        let id = self.add_table(&insert.table_name, None);
        let columns: Vec<String> = if insert.columns.is_empty() {
            self.metadata[id.index()]
                .as_ref()
                .map(|m| m.column_names())
                .unwrap_or_default()
        } else {
            insert
                .columns
                .iter()
                .map(|c| self.column_name(id, &c.value).unwrap_or_else(|| c.value.clone()))
                .collect()
        };

        let Some(source) = &insert.source else {
            return Err(QueryError::Unsupported("INSERT without VALUES".into()));
        };
        let SetExpr::Values(values) = source.body.as_ref() else {
            return Err(QueryError::Unsupported("INSERT ... SELECT".into()));
        };

        let mut rows = Vec::with_capacity(values.rows.len());
        for exprs in &values.rows {
            let mut row = Vec::with_capacity(exprs.len());
            for (i, expr) in exprs.iter().enumerate() {
                let data_type = columns.get(i).and_then(|c| {
                    self.metadata[id.index()]
                        .as_ref()
                        .and_then(|m| m.column(c))
                        .map(|c| c.data_type)
                });
                let term = self.term(expr)?;
                if matches!(term, Term::Column(_)) {
                    return Err(QueryError::Unsupported(format!(
                        "column reference {} in VALUES",
                        expr
                    )));
                }
                row.push(self.operand(term, data_type)?);
            }
            rows.push(row);
        }

        Ok(Insert {
            tables: std::mem::take(&mut self.tables),
            columns,
            rows,
        })
    }

    fn bind_update(
        &mut self,
        table: &ast::TableWithJoins,
        assignments: &[ast::Assignment],
        selection: Option<&SqlExpr>,
    ) -> Result<Update<S::Value>> {
        let id = self.single_table(table)?;
        let mut bound = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let AssignmentTarget::ColumnName(name) = &assignment.target else {
                return Err(QueryError::Unsupported("tuple assignment".into()));
            };
            let written = name.0.last().map(|i| i.value.clone()).unwrap_or_default();
            let column = self.column_name(id, &written).unwrap_or(written);
            let data_type = self.column_type(&self.column_ref(id, column.clone()));
            let term = self.term(&assignment.value)?;
            if matches!(term, Term::Column(_)) {
                return Err(QueryError::Unsupported(format!(
                    "column reference {} in SET",
                    assignment.value
                )));
            }
            bound.push(Assignment {
                column,
                value: self.operand(term, data_type)?,
            });
        }
        let condition = selection.map(|e| self.bind_condition(e)).transpose()?;
        if let Some(condition) = &condition {
            condition.associate(&mut self.tables, true);
        }
        Ok(Update {
            tables: std::mem::take(&mut self.tables),
            assignments: bound,
            condition,
        })
    }

    fn bind_delete(&mut self, delete: &ast::Delete) -> Result<Delete<S::Value>> {
        let from = match &delete.from {
            FromTable::WithFromKeyword(tables) | FromTable::WithoutKeyword(tables) => tables,
        };
        let [relation] = from.as_slice() else {
            return Err(QueryError::Unsupported("DELETE from several tables".into()));
        };
        self.single_table(relation)?;
        let condition = delete
            .selection
            .as_ref()
            .map(|e| self.bind_condition(e))
            .transpose()?;
        if let Some(condition) = &condition {
            condition.associate(&mut self.tables, true);
        }
        Ok(Delete {
            tables: std::mem::take(&mut self.tables),
            condition,
        })
    }
}
