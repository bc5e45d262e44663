use std::collections::BTreeSet;
use std::fmt;

use absint_ir::{HasBottom, Lattice};

use crate::Interval;

/// A parameter-relative symbol a return value can be bounded by.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParamSym {
    /// The value of the parameter at this position.
    Param(usize),
    /// The length of the array passed at this position.
    LengthOf(usize),
}

impl ParamSym {
    pub fn index(self) -> usize {
        match self {
            ParamSym::Param(i) | ParamSym::LengthOf(i) => i,
        }
    }
}

impl fmt::Display for ParamSym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamSym::Param(i) => write!(f, "arg{i}"),
            ParamSym::LengthOf(i) => write!(f, "len(arg{i})"),
        }
    }
}

/// What a caller learns from one analyzed callee context.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntervalSummary {
    returns: bool,
    value: Interval,
    length: Interval,
    /// The return value is strictly below each of these.
    bounds: BTreeSet<ParamSym>,
}

impl IntervalSummary {
    /// The callee never returns normally.
    pub fn unreachable() -> Self {
        Self {
            returns: false,
            value: Interval::bottom(),
            length: Interval::bottom(),
            bounds: BTreeSet::new(),
        }
    }

    pub fn returning(value: Interval, length: Interval, bounds: BTreeSet<ParamSym>) -> Self {
        Self {
            returns: true,
            value,
            length,
            bounds,
        }
    }

    pub fn returns(&self) -> bool {
        self.returns
    }

    /// Range of the returned integer; top for void methods.
    pub fn value(&self) -> Interval {
        self.value
    }

    /// Length range of a returned array.
    pub fn length(&self) -> Interval {
        self.length
    }

    pub fn bounds(&self) -> impl Iterator<Item = &ParamSym> + '_ {
        self.bounds.iter()
    }

    /// Summary covering the returns of both.
    pub fn join(&self, other: &Self) -> Self {
        match (self.returns, other.returns) {
            (false, _) => other.clone(),
            (_, false) => self.clone(),
            _ => Self {
                returns: true,
                value: self.value.join(&other.value),
                length: self.length.join(&other.length),
                bounds: self.bounds.intersection(&other.bounds).copied().collect(),
            },
        }
    }
}

impl fmt::Display for IntervalSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.returns {
            return f.write_str("never returns");
        }
        write!(f, "returns {}", self.value)?;
        for sym in &self.bounds {
            write!(f, ", < {sym}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_keeps_shared_bounds() {
        let a = IntervalSummary::returning(
            Interval::new(0, 3),
            Interval::non_negative(),
            BTreeSet::from([ParamSym::Param(1), ParamSym::LengthOf(0)]),
        );
        let b = IntervalSummary::returning(
            Interval::new(5, 9),
            Interval::non_negative(),
            BTreeSet::from([ParamSym::LengthOf(0)]),
        );
        let joined = a.join(&b);
        assert_eq!(joined.value(), Interval::new(0, 9));
        assert_eq!(joined.bounds().copied().collect::<Vec<_>>(), vec![ParamSym::LengthOf(0)]);
        assert_eq!(IntervalSummary::unreachable().join(&a), a);
        insta::assert_snapshot!(joined, @"returns [0, 9], < len(arg0)");
    }
}
