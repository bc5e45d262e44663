use std::fmt;

use absint_engine::AbstractDomain;
use absint_ir::{HasBottom, HasTop, Lattice};

// ============================================================================
// Bounds
// ============================================================================

/// One end of an [`Interval`]. The derived order is the numeric order with
/// the infinities at either end.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Bound {
    NegInf,
    Finite(i64),
    PosInf,
}

impl Bound {
    /// Saturating sum. Overflow and mixed infinities go to `overflow`.
    fn add(self, other: Self, overflow: Bound) -> Self {
        match (self, other) {
            (Bound::Finite(a), Bound::Finite(b)) => a.checked_add(b).map_or(overflow, Bound::Finite),
            (Bound::NegInf, Bound::PosInf) | (Bound::PosInf, Bound::NegInf) => overflow,
            (Bound::NegInf, _) | (_, Bound::NegInf) => Bound::NegInf,
            (Bound::PosInf, _) | (_, Bound::PosInf) => Bound::PosInf,
        }
    }

    fn mul(self, other: Self) -> Self {
        let sign = |b: Bound| match b {
            Bound::NegInf => -1,
            Bound::PosInf => 1,
            Bound::Finite(v) => v.signum(),
        };
        match (self, other) {
            (Bound::Finite(a), Bound::Finite(b)) => a.checked_mul(b).map_or_else(
                || {
                    if (a < 0) == (b < 0) {
                        Bound::PosInf
                    } else {
                        Bound::NegInf
                    }
                },
                Bound::Finite,
            ),
            _ => match sign(self) * sign(other) {
                0 => Bound::Finite(0),
                s if s > 0 => Bound::PosInf,
                _ => Bound::NegInf,
            },
        }
    }

    /// Truncating division by a divisor that is never zero.
    fn div(self, divisor: Self) -> Self {
        match (self, divisor) {
            (Bound::Finite(a), Bound::Finite(d)) => a.checked_div(d).map_or(Bound::PosInf, Bound::Finite),
            (Bound::Finite(_), _) => Bound::Finite(0),
            (inf, Bound::Finite(d)) if d > 0 => inf,
            (inf, Bound::Finite(_)) => inf.negate(),
            // only reached next to a finite corner that dominates it
            _ => Bound::Finite(0),
        }
    }

    pub fn negate(self) -> Self {
        match self {
            Bound::NegInf => Bound::PosInf,
            Bound::PosInf => Bound::NegInf,
            Bound::Finite(v) => v.checked_neg().map_or(Bound::PosInf, Bound::Finite),
        }
    }

    /// `self - 1`, saturating at the infinities.
    pub fn pred(self) -> Self {
        self.add(Bound::Finite(-1), Bound::NegInf)
    }

    /// `self + 1`, saturating at the infinities.
    pub fn succ(self) -> Self {
        self.add(Bound::Finite(1), Bound::PosInf)
    }

    pub fn finite(self) -> Option<i64> {
        match self {
            Bound::Finite(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::NegInf => f.write_str("-inf"),
            Bound::Finite(v) => write!(f, "{v}"),
            Bound::PosInf => f.write_str("+inf"),
        }
    }
}

// ============================================================================
// Interval Domain
// ============================================================================

/// A closed range `[lo, hi]` of 64-bit integers.
///
/// Every empty range is stored as the canonical bottom `[+inf, -inf]`, so
/// derived equality is set equality.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interval {
    lo: Bound,
    hi: Bound,
}

/// Tri-state answer to "is this index within the array?".
///
/// `Unknown` means the check must stay; it never implies a failure.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Safety {
    Safe,
    Unsafe,
    Unknown,
}

impl Safety {
    /// Combine the verdicts of two contexts reaching the same access.
    pub fn merge(self, other: Self) -> Self {
        if self == other { self } else { Safety::Unknown }
    }
}

impl fmt::Display for Safety {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Safety::Safe => "safe",
            Safety::Unsafe => "unsafe",
            Safety::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

impl Interval {
    const BOTTOM: Interval = Interval {
        lo: Bound::PosInf,
        hi: Bound::NegInf,
    };

    /// Build from arbitrary bounds; empty ranges normalize to bottom.
    pub fn from_bounds(lo: Bound, hi: Bound) -> Self {
        if lo > hi || lo == Bound::PosInf || hi == Bound::NegInf {
            Self::BOTTOM
        } else {
            Interval { lo, hi }
        }
    }

    pub fn new(lo: i64, hi: i64) -> Self {
        Self::from_bounds(Bound::Finite(lo), Bound::Finite(hi))
    }

    pub fn constant(v: i64) -> Self {
        Self::new(v, v)
    }

    pub fn at_least(lo: i64) -> Self {
        Self::from_bounds(Bound::Finite(lo), Bound::PosInf)
    }

    pub fn at_most(hi: i64) -> Self {
        Self::from_bounds(Bound::NegInf, Bound::Finite(hi))
    }

    /// `[0, +inf)`, every possible array length.
    pub fn non_negative() -> Self {
        Self::at_least(0)
    }

    pub fn lo(&self) -> Bound {
        self.lo
    }

    pub fn hi(&self) -> Bound {
        self.hi
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::BOTTOM
    }

    pub fn is_top(&self) -> bool {
        self.lo == Bound::NegInf && self.hi == Bound::PosInf
    }

    /// The single value of a singleton range.
    pub fn as_constant(&self) -> Option<i64> {
        match (self.lo, self.hi) {
            (Bound::Finite(lo), Bound::Finite(hi)) if lo == hi => Some(lo),
            _ => None,
        }
    }

    pub fn contains(&self, v: i64) -> bool {
        self.lo <= Bound::Finite(v) && Bound::Finite(v) <= self.hi
    }

    // -- arithmetic ----------------------------------------------------------

    pub fn add(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::BOTTOM;
        }
        Self::from_bounds(
            self.lo.add(other.lo, Bound::NegInf),
            self.hi.add(other.hi, Bound::PosInf),
        )
    }

    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.neg())
    }

    pub fn neg(&self) -> Self {
        if self.is_empty() {
            return Self::BOTTOM;
        }
        let lo = match self.hi {
            Bound::Finite(i64::MIN) => Bound::Finite(i64::MAX),
            hi => hi.negate(),
        };
        Self::from_bounds(lo, self.lo.negate())
    }

    pub fn mul(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::BOTTOM;
        }
        let products = [
            self.lo.mul(other.lo),
            self.lo.mul(other.hi),
            self.hi.mul(other.lo),
            self.hi.mul(other.hi),
        ];
        Self::from_bounds(
            products.iter().copied().fold(Bound::PosInf, Bound::min),
            products.iter().copied().fold(Bound::NegInf, Bound::max),
        )
    }

    /// Truncating division. Division by zero throws, so a zero divisor
    /// contributes nothing.
    pub fn div(&self, divisor: &Self) -> Self {
        if self.is_empty() || divisor.is_empty() {
            return Self::BOTTOM;
        }
        let parts = [divisor.meet(&Self::at_most(-1)), divisor.meet(&Self::at_least(1))];
        parts
            .iter()
            .filter(|d| !d.is_empty())
            .map(|d| {
                let quotients = [
                    self.lo.div(d.lo),
                    self.lo.div(d.hi),
                    self.hi.div(d.lo),
                    self.hi.div(d.hi),
                ];
                Self::from_bounds(
                    quotients.iter().copied().fold(Bound::PosInf, Bound::min),
                    quotients.iter().copied().fold(Bound::NegInf, Bound::max),
                )
            })
            .fold(Self::BOTTOM, |acc, q| acc.join(&q))
    }

    /// Remainder with the sign of the dividend, `|x % n| < |n|`.
    pub fn rem(&self, divisor: &Self) -> Self {
        if self.is_empty() || divisor.is_empty() || *divisor == Self::constant(0) {
            return Self::BOTTOM;
        }
        let magnitude = divisor.lo.negate().max(divisor.hi).pred();
        let lo = if self.lo >= Bound::Finite(0) {
            Bound::Finite(0)
        } else {
            self.lo.max(magnitude.negate())
        };
        let hi = if self.hi <= Bound::Finite(0) {
            Bound::Finite(0)
        } else {
            self.hi.min(magnitude)
        };
        Self::from_bounds(lo, hi)
    }

    pub fn min(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::BOTTOM;
        }
        Self::from_bounds(self.lo.min(other.lo), self.hi.min(other.hi))
    }

    pub fn max(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::BOTTOM;
        }
        Self::from_bounds(self.lo.max(other.lo), self.hi.max(other.hi))
    }

    /// Bitwise and. Only a non-negative operand bounds the result.
    pub fn and(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::BOTTOM;
        }
        let zero = Bound::Finite(0);
        match (self.lo >= zero, other.lo >= zero) {
            (true, true) => Self::from_bounds(zero, self.hi.min(other.hi)),
            (true, false) => Self::from_bounds(zero, self.hi),
            (false, true) => Self::from_bounds(zero, other.hi),
            (false, false) => Self::top(),
        }
    }

    // -- guard refinement ----------------------------------------------------

    /// Values of `self` that are `< bound`.
    pub fn restrict_less(&self, bound: &Self) -> Self {
        self.meet(&Self::from_bounds(Bound::NegInf, bound.hi.pred()))
    }

    /// Values of `self` that are `<= bound`.
    pub fn restrict_less_eq(&self, bound: &Self) -> Self {
        self.meet(&Self::from_bounds(Bound::NegInf, bound.hi))
    }

    /// Values of `self` that are `> bound`.
    pub fn restrict_greater(&self, bound: &Self) -> Self {
        self.meet(&Self::from_bounds(bound.lo.succ(), Bound::PosInf))
    }

    /// Values of `self` that are `>= bound`.
    pub fn restrict_greater_or_equal(&self, bound: &Self) -> Self {
        self.meet(&Self::from_bounds(bound.lo, Bound::PosInf))
    }

    /// Values of `self` that may differ from some value of `other`.
    pub fn restrict_not_equal(&self, other: &Self) -> Self {
        match other.as_constant() {
            Some(c) if self.lo == Bound::Finite(c) => Self::from_bounds(self.lo.succ(), self.hi),
            Some(c) if self.hi == Bound::Finite(c) => Self::from_bounds(self.lo, self.hi.pred()),
            _ => *self,
        }
    }

    // -- index checks --------------------------------------------------------

    /// Whether every value is a valid index into every array whose length
    /// lies in `length`.
    pub fn contains_index_within(&self, length: &Self) -> bool {
        !self.is_empty()
            && !length.is_empty()
            && self.lo >= Bound::Finite(0)
            && self.hi < length.lo
    }

    /// Whether no value is a valid index into any array whose length lies in
    /// `length`.
    pub fn outside_index_range(&self, length: &Self) -> bool {
        !self.is_empty() && (self.hi < Bound::Finite(0) || self.lo >= length.hi)
    }

    pub fn index_safety(&self, length: &Self) -> Safety {
        if self.contains_index_within(length) {
            Safety::Safe
        } else if self.outside_index_range(length) {
            Safety::Unsafe
        } else {
            Safety::Unknown
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("bottom")
        } else {
            write!(f, "[{}, {}]", self.lo, self.hi)
        }
    }
}

// ============================================================================
// Lattice + AbstractDomain impls
// ============================================================================

impl Lattice for Interval {
    fn join(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Interval {
            lo: self.lo.min(other.lo),
            hi: self.hi.max(other.hi),
        }
    }

    fn meet(&self, other: &Self) -> Self {
        Self::from_bounds(self.lo.max(other.lo), self.hi.min(other.hi))
    }

    fn is_subseteq(&self, other: &Self) -> bool {
        if self.is_empty() {
            return true;
        }
        other.lo <= self.lo && self.hi <= other.hi
    }
}

impl HasBottom for Interval {
    fn bottom() -> Self {
        Self::BOTTOM
    }
}

impl HasTop for Interval {
    fn top() -> Self {
        Interval {
            lo: Bound::NegInf,
            hi: Bound::PosInf,
        }
    }
}

impl AbstractDomain for Interval {
    fn is_bottom(&self) -> bool {
        self.is_empty()
    }

    fn widen(&self, next: &Self) -> Self {
        if self.is_empty() {
            return *next;
        }
        if next.is_empty() {
            return *self;
        }
        let lo = if next.lo < self.lo { Bound::NegInf } else { self.lo };
        let hi = if next.hi > self.hi { Bound::PosInf } else { self.hi };
        Interval { lo, hi }
    }

    fn narrow(&self, next: &Self) -> Self {
        if self.is_empty() || next.is_empty() {
            return Self::BOTTOM;
        }
        let lo = match self.lo {
            Bound::NegInf => next.lo,
            other => other,
        };
        let hi = match self.hi {
            Bound::PosInf => next.hi,
            other => other,
        };
        Self::from_bounds(lo, hi)
    }
}
