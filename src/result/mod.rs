//! Materialized query results
//!
//! [`FetchResult`] buffers projected rows column-aligned and tracks the
//! rendered width of every visible column. [`OrderedFetchResult`] adds an
//! ORDER BY that is applied on first read, not while rows are added.

use crate::value::ComparatorRef;
use std::cell::OnceCell;
use std::cmp::Ordering;
use std::fmt;

/// Rendering of SQL NULL in results
pub const NULL_TEXT: &str = "NULL";

/// Row-major buffer of projected values
///
/// Each row holds the visible columns first, followed by ORDER BY columns
/// that are not part of the select list.
#[derive(Debug, Clone)]
pub struct FetchResult<C> {
    columns: Vec<String>,
    hidden: usize,
    widths: Vec<usize>,
    rows: Vec<Vec<Option<C>>>,
}

impl<C: fmt::Display> FetchResult<C> {
    pub fn new(columns: Vec<String>, hidden: usize) -> Self {
        let widths = columns.iter().map(|c| c.chars().count()).collect();
        Self {
            columns,
            hidden,
            widths,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Option<C>>) {
        for (width, value) in self.widths.iter_mut().zip(&row) {
            let rendered = match value {
                Some(v) => v.to_string().chars().count(),
                None => NULL_TEXT.len(),
            };
            *width = (*width).max(rendered);
        }
        self.rows.push(row);
    }
}

impl<C> FetchResult<C> {
    /// Labels of the visible columns
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Max rendered width of each visible column, header included
    pub fn widths(&self) -> &[usize] {
        &self.widths
    }

    /// Number of trailing sort-only columns in each stored row
    pub fn hidden_columns(&self) -> usize {
        self.hidden
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Visible part of row `i` in insertion order
    pub fn row(&self, i: usize) -> Option<&[Option<C>]> {
        self.rows.get(i).map(|r| &r[..self.columns.len()])
    }

    pub fn iter(&self) -> impl Iterator<Item = &[Option<C>]> {
        let visible = self.columns.len();
        self.rows.iter().map(move |r| &r[..visible])
    }
}

/// One ORDER BY key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    /// Position of the key in the stored row
    pub column: usize,
    pub descending: bool,
}

impl SortKey {
    pub fn ascending(column: usize) -> Self {
        Self {
            column,
            descending: false,
        }
    }

    pub fn descending(column: usize) -> Self {
        Self {
            column,
            descending: true,
        }
    }
}

/// A [`FetchResult`] read back in ORDER BY order
///
/// NULL sorts below every value, so it comes first ascending and last
/// descending. Rows tied on every key keep their insertion order.
pub struct OrderedFetchResult<C> {
    result: FetchResult<C>,
    keys: Vec<SortKey>,
    comparator: ComparatorRef<C>,
    order: OnceCell<Vec<usize>>,
}

impl<C: fmt::Display> OrderedFetchResult<C> {
    pub fn new(
        columns: Vec<String>,
        hidden: usize,
        keys: Vec<SortKey>,
        comparator: ComparatorRef<C>,
    ) -> Self {
        Self {
            result: FetchResult::new(columns, hidden),
            keys,
            comparator,
            order: OnceCell::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Option<C>>) {
        self.order = OnceCell::new();
        self.result.push(row);
    }
}

impl<C> OrderedFetchResult<C> {
    pub fn columns(&self) -> &[String] {
        self.result.columns()
    }

    pub fn widths(&self) -> &[usize] {
        self.result.widths()
    }

    pub fn len(&self) -> usize {
        self.result.len()
    }

    pub fn is_empty(&self) -> bool {
        self.result.is_empty()
    }

    pub fn sort_keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// Whether the sort has run since the last push
    pub fn is_sorted(&self) -> bool {
        self.order.get().is_some()
    }

    /// Unsorted view in insertion order
    pub fn unordered(&self) -> &FetchResult<C> {
        &self.result
    }

    fn order(&self) -> &[usize] {
        self.order.get_or_init(|| {
            let mut order: Vec<usize> = (0..self.result.rows.len()).collect();
            if !self.keys.is_empty() {
                let rows = &self.result.rows;
                order.sort_by(|&a, &b| self.compare(&rows[a], &rows[b]));
            }
            order
        })
    }

    fn compare(&self, a: &[Option<C>], b: &[Option<C>]) -> Ordering {
        for key in &self.keys {
            let ordering = match (&a[key.column], &b[key.column]) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(x), Some(y)) => self.comparator.compare(x, y),
            };
            let ordering = if key.descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Visible rows in sorted order; sorts on first call
    pub fn iter(&self) -> impl Iterator<Item = &[Option<C>]> {
        let visible = self.result.columns.len();
        let rows = &self.result.rows;
        self.order().iter().map(move |&i| &rows[i][..visible])
    }

    pub fn row(&self, i: usize) -> Option<&[Option<C>]> {
        let visible = self.result.columns.len();
        self.order()
            .get(i)
            .map(|&r| &self.result.rows[r][..visible])
    }

    /// Values of one visible column in sorted order
    pub fn column(&self, name: &str) -> Option<Vec<Option<&C>>> {
        let index = self.result.columns.iter().position(|c| c == name)?;
        Some(self.iter().map(|row| row[index].as_ref()).collect())
    }
}

impl<C: Clone> OrderedFetchResult<C> {
    /// Visible rows in sorted order
    pub fn into_rows(self) -> Vec<Vec<Option<C>>> {
        self.iter().map(|row| row.to_vec()).collect()
    }
}

impl<C: fmt::Debug> fmt::Debug for OrderedFetchResult<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderedFetchResult")
            .field("columns", &self.result.columns)
            .field("rows", &self.result.rows.len())
            .field("keys", &self.keys)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::NaturalOrder;
    use std::sync::Arc;

    fn result(keys: Vec<SortKey>, rows: &[(Option<i64>, i64)]) -> OrderedFetchResult<i64> {
        let mut result =
            OrderedFetchResult::new(vec!["k".into(), "seq".into()], 0, keys, Arc::new(NaturalOrder));
        for (k, seq) in rows {
            result.push(vec![*k, Some(*seq)]);
        }
        result
    }

    fn seqs(result: &OrderedFetchResult<i64>) -> Vec<i64> {
        result.iter().map(|r| r[1].unwrap()).collect()
    }

    #[test]
    fn test_sort_is_stable_for_ties() {
        let result = result(
            vec![SortKey::ascending(0)],
            &[(Some(2), 0), (Some(1), 1), (Some(2), 2), (Some(1), 3), (Some(2), 4)],
        );
        assert_eq!(seqs(&result), vec![1, 3, 0, 2, 4]);
    }

    #[test]
    fn test_sort_is_lazy() {
        let mut result = result(vec![SortKey::descending(0)], &[(Some(1), 0), (Some(3), 1)]);
        assert!(!result.is_sorted());
        assert_eq!(seqs(&result), vec![1, 0]);
        assert!(result.is_sorted());
        result.push(vec![Some(2), Some(2)]);
        assert!(!result.is_sorted());
        assert_eq!(seqs(&result), vec![1, 2, 0]);
    }

    #[test]
    fn test_null_sorts_lowest() {
        let rows = [(Some(1), 0), (None, 1), (Some(0), 2)];
        assert_eq!(seqs(&result(vec![SortKey::ascending(0)], &rows)), vec![1, 2, 0]);
        assert_eq!(seqs(&result(vec![SortKey::descending(0)], &rows)), vec![0, 2, 1]);
    }

    #[test]
    fn test_ties_fall_through_to_next_key() {
        let mut result = OrderedFetchResult::new(
            vec!["a".into()],
            1,
            vec![SortKey::ascending(0), SortKey::descending(1)],
            Arc::new(NaturalOrder),
        );
        result.push(vec![Some(1), Some(10)]);
        result.push(vec![Some(1), Some(20)]);
        result.push(vec![Some(0), Some(5)]);
        let rows = result.into_rows();
        assert_eq!(rows, vec![vec![Some(0)], vec![Some(1)], vec![Some(1)]]);
    }

    #[test]
    fn test_hidden_columns_not_visible() {
        let mut result: OrderedFetchResult<i64> = OrderedFetchResult::new(
            vec!["a".into()],
            1,
            vec![SortKey::descending(1)],
            Arc::new(NaturalOrder),
        );
        result.push(vec![Some(7), Some(1)]);
        result.push(vec![Some(8), Some(2)]);
        assert_eq!(result.column("a").unwrap(), vec![Some(&8), Some(&7)]);
        assert_eq!(result.row(0).unwrap().len(), 1);
        assert_eq!(result.widths(), &[1]);
    }

    #[test]
    fn test_widths_track_rendered_values() {
        let mut result = FetchResult::new(vec!["id".into(), "name".into()], 0);
        result.push(vec![Some("12345".to_string()), None]);
        result.push(vec![Some("1".to_string()), Some("ab".to_string())]);
        assert_eq!(result.widths(), &[5, 4]);
    }
}
