//! Per-query table state
//!
//! A [`TableContext`] lives for one `select` or `target` call. It holds the
//! rows fetched for its table, a sorted index per AND-path column, the value
//! ranges passed to the store as fetch hints, and the join maps to sibling
//! tables. Contexts of one query sit in a vector indexed by table ordinal and
//! refer to each other by ordinal only.

mod index;

pub use index::{merge_join, ColumnIndex, MergeJoin};

use crate::condition::{EvalContext, Relation};
use crate::error::{QueryError, Result};
use crate::storage::{Store, TableMetadata};
use crate::table::{Table, TableId};
use crate::value::{Comparator, Range};
use hashbrown::{HashMap, HashSet};
use std::hash::Hash;
use tracing::trace;

/// Candidate rows of a sibling table for each row of this table
#[derive(Debug, Clone)]
pub enum JoinMap<R> {
    /// Precise result of one or more merge-joins
    Matched(HashMap<R, Vec<R>>),
    /// No usable equi-join; every sibling row is a candidate
    Cartesian,
}

impl<R: Clone + Eq + Hash> JoinMap<R> {
    /// Candidates for `row`, or `None` when every sibling row qualifies
    pub fn candidates(&self, row: &R) -> Option<&[R]> {
        match self {
            JoinMap::Matched(map) => Some(map.get(row).map_or(&[][..], Vec::as_slice)),
            JoinMap::Cartesian => None,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, JoinMap::Matched(_))
    }

    /// Combine with the map of another join between the same two tables
    fn intersect(self, other: HashMap<R, Vec<R>>) -> JoinMap<R> {
        match self {
            JoinMap::Cartesian => JoinMap::Matched(other),
            JoinMap::Matched(mut map) => {
                map.retain(|row, candidates| match other.get(row) {
                    Some(more) => {
                        candidates.retain(|c| more.contains(c));
                        !candidates.is_empty()
                    }
                    None => false,
                });
                JoinMap::Matched(map)
            }
        }
    }
}

/// Runtime state of one table for the duration of a query
#[derive(Debug)]
pub struct TableContext<R, C> {
    table: TableId,
    name: String,
    index_columns: Vec<String>,
    unique_columns: Vec<String>,
    ranges: HashMap<String, Range<C>>,
    rows: Vec<R>,
    live: HashSet<R>,
    indexes: HashMap<String, ColumnIndex<R, C>>,
    joins: Vec<Option<JoinMap<R>>>,
    loaded: bool,
}

impl<R: Clone + Eq + Hash, C: Clone + std::fmt::Display> TableContext<R, C> {
    /// Allocate the context shell and seed its ranges from AND-path conditions
    pub fn new(
        table: &Table<C>,
        metadata: Option<&TableMetadata>,
        siblings: usize,
        eval: &EvalContext<'_, C>,
    ) -> Result<Self> {
        let mut ranges = HashMap::new();
        for condition in table.and_path_conditions() {
            condition.narrow_ranges(table.id(), &mut ranges, eval);
        }
        let unique_columns = metadata
            .map(|m| {
                m.columns
                    .iter()
                    .filter(|c| c.unique)
                    .map(|c| c.name.clone())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            table: table.id(),
            name: table.name()?.to_string(),
            index_columns: table.and_path_columns().to_vec(),
            unique_columns,
            ranges,
            rows: Vec::new(),
            live: HashSet::new(),
            indexes: HashMap::new(),
            joins: vec![None; siblings],
            loaded: false,
        })
    }

    pub fn table(&self) -> TableId {
        self.table
    }

    pub fn table_name(&self) -> &str {
        &self.name
    }

    /// Narrowed ranges, keyed by column name
    pub fn column_ranges(&self) -> impl Iterator<Item = (&str, &Range<C>)> {
        self.ranges.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn range(&self, column: &str) -> Option<&Range<C>> {
        self.ranges.get(column)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Rows still eligible, in fetch order; may include rows pruned after
    /// the fact, check [`Self::is_live`]
    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn is_live(&self, row: &R) -> bool {
        self.live.contains(row)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn index(&self, column: &str) -> Option<&ColumnIndex<R, C>> {
        self.indexes.get(column)
    }

    pub fn join(&self, sibling: TableId) -> Option<&JoinMap<R>> {
        self.joins.get(sibling.index()).and_then(Option::as_ref)
    }

    /// Take the fetched rows and build one index per AND-path column
    pub fn set_data<S>(&mut self, rows: Vec<R>, store: &S, cmp: &dyn Comparator<C>) -> Result<()>
    where
        S: Store<Row = R, Value = C> + ?Sized,
    {
        for column in &self.index_columns {
            let mut pairs = Vec::with_capacity(rows.len());
            for row in &rows {
                if let Some(value) = store.get(row, column)? {
                    pairs.push((value, row.clone()));
                }
            }
            let unique = self.unique_columns.contains(column);
            let index = ColumnIndex::build(column, pairs, unique, cmp).map_err(|e| match e {
                QueryError::Integrity(msg) => QueryError::Integrity(format!("{}: {}", self.name, msg)),
                other => other,
            })?;
            self.indexes.insert(column.clone(), index);
        }
        self.live = rows.iter().cloned().collect();
        self.rows = rows;
        self.loaded = true;
        Ok(())
    }

    /// Merge-join with a sibling on `local = remote`, pruning both sides
    ///
    /// Records the bidirectional join map; a second join between the same
    /// pair intersects with the first.
    pub fn join_with(
        &mut self,
        other: &mut TableContext<R, C>,
        local: &str,
        remote: &str,
        cmp: &dyn Comparator<C>,
    ) -> Result<()> {
        let mine = self.index(local).ok_or_else(|| {
            QueryError::Execution(format!("no index on {}.{}", self.name, local))
        })?;
        let theirs = other.index(remote).ok_or_else(|| {
            QueryError::Execution(format!("no index on {}.{}", other.name, remote))
        })?;
        let before = (self.live.len(), other.live.len());
        let joined = merge_join(mine, theirs, cmp);

        self.record_join(other.table, joined.left);
        other.record_join(self.table, joined.right);

        trace!(
            left = %self.name,
            right = %other.name,
            left_pruned = before.0 - self.live.len(),
            right_pruned = before.1 - other.live.len(),
            "merge join"
        );
        Ok(())
    }

    fn record_join(&mut self, sibling: TableId, map: HashMap<R, Vec<R>>) {
        let merged = match self.joins[sibling.index()].take() {
            Some(existing) => existing.intersect(map),
            None => JoinMap::Matched(map),
        };
        if let JoinMap::Matched(map) = &merged {
            let keep: HashSet<R> = map.keys().cloned().collect();
            self.retain(&keep);
        }
        self.joins[sibling.index()] = Some(merged);
    }

    /// Mark a sibling as joined by cartesian pairing unless a map exists
    pub fn mark_cartesian(&mut self, sibling: TableId) {
        let slot = &mut self.joins[sibling.index()];
        if slot.is_none() {
            *slot = Some(JoinMap::Cartesian);
        }
    }

    fn retain(&mut self, keep: &HashSet<R>) {
        self.live.retain(|r| keep.contains(r));
        self.rows.retain(|r| keep.contains(r));
        for index in self.indexes.values_mut() {
            index.retain_rows(&self.live);
        }
    }

    /// Narrow a pending sibling's range on `remote` from this table's keys on `local`
    ///
    /// `relation` is seen from the sibling: `remote <relation> local`.
    pub fn update_hints(
        &self,
        pending: &mut TableContext<R, C>,
        local: &str,
        relation: Relation,
        remote: &str,
        cmp: &dyn Comparator<C>,
    ) {
        let Some(index) = self.index(local) else {
            return;
        };
        let (Some(min), Some(max)) = (index.min_key(), index.max_key()) else {
            return;
        };
        let range = pending.ranges.entry(remote.to_string()).or_default();
        match relation {
            Relation::Eq => {
                range.narrow_lower(min, true, cmp);
                range.narrow_upper(max, true, cmp);
            }
            Relation::Gt => range.narrow_lower(min, false, cmp),
            Relation::Ge => range.narrow_lower(min, true, cmp),
            Relation::Lt => range.narrow_upper(max, false, cmp),
            Relation::Le => range.narrow_upper(max, true, cmp),
            Relation::Ne => return,
        }
        trace!(
            from = %self.name,
            to = %pending.name,
            column = remote,
            min = %min,
            max = %max,
            "propagated range hint"
        );
    }
}

/// Mutable references to two distinct contexts of one query
pub fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> Result<(&mut T, &mut T)> {
    if a == b || a >= items.len() || b >= items.len() {
        return Err(QueryError::Execution(format!(
            "invalid table pair {} and {}",
            a, b
        )));
    }
    if a < b {
        let (head, tail) = items.split_at_mut(b);
        Ok((&mut head[a], &mut tail[0]))
    } else {
        let (head, tail) = items.split_at_mut(a);
        Ok((&mut tail[0], &mut head[b]))
    }
}
