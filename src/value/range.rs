//! Value ranges used as fetch-narrowing hints

use super::Comparator;
use std::cmp::Ordering;
use std::ops::Bound;

/// Mutable `[lower, upper]` bound on the values of one column
///
/// Ranges only ever shrink. A range is advisory: the backing store may use
/// it to skip rows, but the engine never relies on it for correctness.
#[derive(Debug, Clone, PartialEq)]
pub struct Range<C> {
    lower: Bound<C>,
    upper: Bound<C>,
}

impl<C> Default for Range<C> {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<C> Range<C> {
    pub fn unbounded() -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
        }
    }

    pub fn lower(&self) -> Bound<&C> {
        self.lower.as_ref()
    }

    pub fn upper(&self) -> Bound<&C> {
        self.upper.as_ref()
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(
            (&self.lower, &self.upper),
            (Bound::Unbounded, Bound::Unbounded)
        )
    }
}

impl<C: Clone> Range<C> {
    /// Restrict values to `>= value` (or `> value` when not inclusive)
    pub fn narrow_lower(&mut self, value: &C, inclusive: bool, cmp: &dyn Comparator<C>) {
        let tighter = match &self.lower {
            Bound::Unbounded => true,
            Bound::Included(current) => cmp.compare(value, current) != Ordering::Less && {
                cmp.compare(value, current) == Ordering::Greater || !inclusive
            },
            Bound::Excluded(current) => cmp.compare(value, current) == Ordering::Greater,
        };
        if tighter {
            self.lower = if inclusive {
                Bound::Included(value.clone())
            } else {
                Bound::Excluded(value.clone())
            };
        }
    }

    /// Restrict values to `<= value` (or `< value` when not inclusive)
    pub fn narrow_upper(&mut self, value: &C, inclusive: bool, cmp: &dyn Comparator<C>) {
        let tighter = match &self.upper {
            Bound::Unbounded => true,
            Bound::Included(current) => cmp.compare(value, current) != Ordering::Greater && {
                cmp.compare(value, current) == Ordering::Less || !inclusive
            },
            Bound::Excluded(current) => cmp.compare(value, current) == Ordering::Less,
        };
        if tighter {
            self.upper = if inclusive {
                Bound::Included(value.clone())
            } else {
                Bound::Excluded(value.clone())
            };
        }
    }

    /// Restrict to exactly `value`
    pub fn narrow_eq(&mut self, value: &C, cmp: &dyn Comparator<C>) {
        self.narrow_lower(value, true, cmp);
        self.narrow_upper(value, true, cmp);
    }

    pub fn contains(&self, value: &C, cmp: &dyn Comparator<C>) -> bool {
        let above = match &self.lower {
            Bound::Unbounded => true,
            Bound::Included(l) => cmp.compare(value, l) != Ordering::Less,
            Bound::Excluded(l) => cmp.compare(value, l) == Ordering::Greater,
        };
        let below = match &self.upper {
            Bound::Unbounded => true,
            Bound::Included(u) => cmp.compare(value, u) != Ordering::Greater,
            Bound::Excluded(u) => cmp.compare(value, u) == Ordering::Less,
        };
        above && below
    }

    /// True when no value can satisfy both bounds
    pub fn is_empty(&self, cmp: &dyn Comparator<C>) -> bool {
        match (&self.lower, &self.upper) {
            (Bound::Unbounded, _) | (_, Bound::Unbounded) => false,
            (Bound::Included(l), Bound::Included(u)) => cmp.compare(l, u) == Ordering::Greater,
            (Bound::Included(l), Bound::Excluded(u))
            | (Bound::Excluded(l), Bound::Included(u))
            | (Bound::Excluded(l), Bound::Excluded(u)) => cmp.compare(l, u) != Ordering::Less,
        }
    }
}
