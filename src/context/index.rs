//! Sorted column indexes and the merge-join over them

use crate::error::{QueryError, Result};
use crate::value::Comparator;
use hashbrown::{HashMap, HashSet};
use std::cmp::Ordering;
use std::hash::Hash;

/// Sorted map from column value to the rows holding it
///
/// Keys are kept in comparator order. NULL cells are not indexed.
#[derive(Debug, Clone)]
pub struct ColumnIndex<R, C> {
    entries: Vec<(C, Vec<R>)>,
}

impl<R, C> Default for ColumnIndex<R, C> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<R: Clone + Eq + Hash, C: Clone> ColumnIndex<R, C> {
    /// Build an index from `(value, row)` pairs
    ///
    /// With `unique` set, a key shared by two rows is an integrity error.
    pub fn build(
        column: &str,
        mut pairs: Vec<(C, R)>,
        unique: bool,
        cmp: &dyn Comparator<C>,
    ) -> Result<Self> {
        pairs.sort_by(|a, b| cmp.compare(&a.0, &b.0));

        let mut entries: Vec<(C, Vec<R>)> = Vec::new();
        for (value, row) in pairs {
            match entries.last_mut() {
                Some((key, bucket)) if cmp.equal(key, &value) => {
                    if unique {
                        return Err(QueryError::Integrity(format!(
                            "column {} is declared unique but holds duplicate values",
                            column
                        )));
                    }
                    bucket.push(row);
                }
                _ => entries.push((value, vec![row])),
            }
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &C> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn bucket(&self, key: &C, cmp: &dyn Comparator<C>) -> Option<&[R]> {
        self.entries
            .binary_search_by(|(k, _)| cmp.compare(k, key))
            .ok()
            .map(|i| self.entries[i].1.as_slice())
    }

    pub fn min_key(&self) -> Option<&C> {
        self.entries.first().map(|(k, _)| k)
    }

    pub fn max_key(&self) -> Option<&C> {
        self.entries.last().map(|(k, _)| k)
    }

    /// Drop rows not in `live`, then drop empty buckets
    pub fn retain_rows(&mut self, live: &HashSet<R>) {
        for (_, bucket) in &mut self.entries {
            bucket.retain(|r| live.contains(r));
        }
        self.entries.retain(|(_, bucket)| !bucket.is_empty());
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Matching rows found by a merge-join, seen from both sides
#[derive(Debug)]
pub struct MergeJoin<R> {
    /// Left row to the right rows sharing its key
    pub left: HashMap<R, Vec<R>>,
    /// Right row to the left rows sharing its key
    pub right: HashMap<R, Vec<R>>,
}

impl<R> MergeJoin<R> {
    fn empty() -> Self {
        Self {
            left: HashMap::new(),
            right: HashMap::new(),
        }
    }
}

/// Co-scan two sorted indexes on an equi-join column
///
/// Only rows sharing a key with the other side appear in the result; every
/// other bucket is dropped. Either index being empty empties both sides
/// without scanning.
pub fn merge_join<R: Clone + Eq + Hash, C: Clone>(
    left: &ColumnIndex<R, C>,
    right: &ColumnIndex<R, C>,
    cmp: &dyn Comparator<C>,
) -> MergeJoin<R> {
    let mut joined = MergeJoin::empty();
    if left.is_empty() || right.is_empty() {
        return joined;
    }

    let (mut i, mut j) = (0, 0);
    while i < left.entries.len() && j < right.entries.len() {
        let (lkey, lrows) = &left.entries[i];
        let (rkey, rrows) = &right.entries[j];
        match cmp.compare(lkey, rkey) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                for row in lrows {
                    joined.left.insert(row.clone(), rrows.clone());
                }
                for row in rrows {
                    joined.right.insert(row.clone(), lrows.clone());
                }
                i += 1;
                j += 1;
            }
        }
    }
    joined
}
