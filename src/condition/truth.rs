//! Three-valued logic and comparison relations

use std::cmp::Ordering;
use std::fmt;

/// SQL truth value. Comparisons involving NULL yield `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TruthValue {
    True,
    False,
    Unknown,
}

impl TruthValue {
    pub fn from_bool(value: bool) -> Self {
        if value {
            TruthValue::True
        } else {
            TruthValue::False
        }
    }

    pub fn is_true(self) -> bool {
        self == TruthValue::True
    }

    pub fn and(self, other: TruthValue) -> TruthValue {
        match (self, other) {
            (TruthValue::False, _) | (_, TruthValue::False) => TruthValue::False,
            (TruthValue::True, TruthValue::True) => TruthValue::True,
            _ => TruthValue::Unknown,
        }
    }

    pub fn or(self, other: TruthValue) -> TruthValue {
        match (self, other) {
            (TruthValue::True, _) | (_, TruthValue::True) => TruthValue::True,
            (TruthValue::False, TruthValue::False) => TruthValue::False,
            _ => TruthValue::Unknown,
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> TruthValue {
        match self {
            TruthValue::True => TruthValue::False,
            TruthValue::False => TruthValue::True,
            TruthValue::Unknown => TruthValue::Unknown,
        }
    }
}

impl fmt::Display for TruthValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TruthValue::True => write!(f, "TRUE"),
            TruthValue::False => write!(f, "FALSE"),
            TruthValue::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Comparison relation between two operands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl Relation {
    /// Whether `a <relation> b` holds given `a.cmp(b)`
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            Relation::Eq => ordering == Ordering::Equal,
            Relation::Ne => ordering != Ordering::Equal,
            Relation::Lt => ordering == Ordering::Less,
            Relation::Gt => ordering == Ordering::Greater,
            Relation::Le => ordering != Ordering::Greater,
            Relation::Ge => ordering != Ordering::Less,
        }
    }

    /// Relation with operands swapped: `a < b` becomes `b > a`
    pub fn flip(self) -> Relation {
        match self {
            Relation::Eq => Relation::Eq,
            Relation::Ne => Relation::Ne,
            Relation::Lt => Relation::Gt,
            Relation::Gt => Relation::Lt,
            Relation::Le => Relation::Ge,
            Relation::Ge => Relation::Le,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Relation::Eq => "=",
            Relation::Ne => "<>",
            Relation::Lt => "<",
            Relation::Gt => ">",
            Relation::Le => "<=",
            Relation::Ge => ">=",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::TruthValue::{False as F, True as T, Unknown as U};
    use super::*;

    #[test]
    fn test_and_truth_table() {
        let table = [
            (T, T, T),
            (T, F, F),
            (T, U, U),
            (F, T, F),
            (F, F, F),
            (F, U, F),
            (U, T, U),
            (U, F, F),
            (U, U, U),
        ];
        for (p, q, expected) in table {
            assert_eq!(p.and(q), expected, "{} AND {}", p, q);
        }
    }

    #[test]
    fn test_or_truth_table() {
        let table = [
            (T, T, T),
            (T, F, T),
            (T, U, T),
            (F, T, T),
            (F, F, F),
            (F, U, U),
            (U, T, T),
            (U, F, U),
            (U, U, U),
        ];
        for (p, q, expected) in table {
            assert_eq!(p.or(q), expected, "{} OR {}", p, q);
            // De Morgan holds under three-valued logic
            assert_eq!(p.or(q), p.not().and(q.not()).not());
        }
    }

    #[test]
    fn test_not_truth_table() {
        assert_eq!(T.not(), F);
        assert_eq!(F.not(), T);
        assert_eq!(U.not(), U);
    }

    #[test]
    fn test_relation_holds() {
        assert!(Relation::Le.holds(Ordering::Equal));
        assert!(Relation::Le.holds(Ordering::Less));
        assert!(!Relation::Lt.holds(Ordering::Equal));
        assert!(Relation::Ne.holds(Ordering::Greater));
        assert!(!Relation::Eq.holds(Ordering::Less));
    }

    #[test]
    fn test_relation_flip() {
        for rel in [
            Relation::Eq,
            Relation::Ne,
            Relation::Lt,
            Relation::Gt,
            Relation::Le,
            Relation::Ge,
        ] {
            for ord in [Ordering::Less, Ordering::Equal, Ordering::Greater] {
                assert_eq!(rel.holds(ord), rel.flip().holds(ord.reverse()));
            }
        }
    }
}
