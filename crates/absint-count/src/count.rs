use std::fmt;

use absint_engine::AbstractDomain;
use absint_ir::{HasBottom, HasTop, Lattice};

/// Upper bound on the number of open resources.
///
/// The order is the chain `Bottom < Open(0) < Open(1) < ... < Unbounded`.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Count {
    Bottom,
    Open(u32),
    Unbounded,
}

impl Count {
    /// The count after one more acquire.
    pub fn increment(self) -> Self {
        self.plus(Count::Open(1))
    }

    /// The count after one release. Releasing with nothing open stays at
    /// zero.
    pub fn decrement(self) -> Self {
        match self {
            Count::Open(n) => Count::Open(n.saturating_sub(1)),
            other => other,
        }
    }

    /// Sum of two counts, e.g. a caller's count plus a callee's net effect.
    pub fn plus(self, other: Self) -> Self {
        match (self, other) {
            (Count::Bottom, _) | (_, Count::Bottom) => Count::Bottom,
            (Count::Open(a), Count::Open(b)) => a.checked_add(b).map_or(Count::Unbounded, Count::Open),
            _ => Count::Unbounded,
        }
    }

    /// Whether some resource may still be open.
    pub fn may_be_open(self) -> bool {
        matches!(self, Count::Unbounded) || matches!(self, Count::Open(n) if n > 0)
    }

    fn rank(self) -> (u8, u32) {
        match self {
            Count::Bottom => (0, 0),
            Count::Open(n) => (1, n),
            Count::Unbounded => (2, 0),
        }
    }
}

impl Lattice for Count {
    fn join(&self, other: &Self) -> Self {
        if self.rank() >= other.rank() { *self } else { *other }
    }

    fn meet(&self, other: &Self) -> Self {
        if self.rank() <= other.rank() { *self } else { *other }
    }

    fn is_subseteq(&self, other: &Self) -> bool {
        self.rank() <= other.rank()
    }
}

impl HasBottom for Count {
    fn bottom() -> Self {
        Count::Bottom
    }
}

impl HasTop for Count {
    fn top() -> Self {
        Count::Unbounded
    }
}

impl AbstractDomain for Count {
    fn is_bottom(&self) -> bool {
        matches!(self, Count::Bottom)
    }

    fn widen(&self, next: &Self) -> Self {
        match (self, next) {
            (Count::Open(a), Count::Open(b)) if b > a => Count::Unbounded,
            _ => self.join(next),
        }
    }

    fn narrow(&self, next: &Self) -> Self {
        match self {
            Count::Unbounded => *next,
            _ => *self,
        }
    }
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Count::Bottom => f.write_str("bottom"),
            Count::Open(n) => write!(f, "{n}"),
            Count::Unbounded => f.write_str("unbounded"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use absint_test_utils::lattice::{assert_domain_laws, assert_finite_lattice_laws};

    fn samples() -> Vec<Count> {
        vec![Count::Open(0), Count::Open(1), Count::Open(5)]
    }

    #[test]
    fn count_lattice_laws() {
        assert_finite_lattice_laws(&samples());
        assert_domain_laws(&samples());
    }

    #[test]
    fn acquire_and_release() {
        let c = Count::Open(0).increment().increment();
        assert_eq!(c, Count::Open(2));
        assert_eq!(c.decrement(), Count::Open(1));
        assert_eq!(Count::Open(0).decrement(), Count::Open(0));
        assert_eq!(Count::Bottom.increment(), Count::Bottom);
        assert_eq!(Count::Open(u32::MAX).increment(), Count::Unbounded);
    }

    #[test]
    fn growing_counts_widen_to_unbounded() {
        assert_eq!(Count::Open(1).widen(&Count::Open(2)), Count::Unbounded);
        assert_eq!(Count::Open(2).widen(&Count::Open(1)), Count::Open(2));
        assert_eq!(Count::Unbounded.narrow(&Count::Open(3)), Count::Open(3));
    }

    #[test]
    fn leak_detection() {
        assert!(!Count::Open(0).may_be_open());
        assert!(Count::Open(1).may_be_open());
        assert!(Count::Unbounded.may_be_open());
        assert!(!Count::Bottom.may_be_open());
        insta::assert_snapshot!(Count::Open(3), @"3");
    }
}
