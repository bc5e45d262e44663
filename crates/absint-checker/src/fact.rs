use std::fmt;

use absint_count::Count;
use absint_interval::{Interval, Safety};
use absint_ir::{Condition, Lattice, NodeRef};

/// Outcome of a branch condition that does not depend on the execution.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Truth {
    AlwaysTrue,
    AlwaysFalse,
}

impl From<bool> for Truth {
    fn from(value: bool) -> Self {
        if value {
            Truth::AlwaysTrue
        } else {
            Truth::AlwaysFalse
        }
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FactKind {
    ConditionTruth,
    Constant,
    IndexSafety,
    ResourceLeak,
}

impl FactKind {
    /// Whether a fact of this kind speaks for every execution reaching its
    /// node. Such a fact needs every calling context that reached the node
    /// to report it; leak reports hold as soon as one context has them.
    pub fn holds_on_every_path(self) -> bool {
        !matches!(self, FactKind::ResourceLeak)
    }
}

/// A proven property of one node.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Fact {
    ConditionTruth {
        node: NodeRef,
        condition: Condition,
        truth: Truth,
    },
    /// The value defined by the node is always `value`.
    Constant { node: NodeRef, value: i64 },
    /// Verdict on an indexed access. `Unknown` means the check stays.
    IndexSafety {
        node: NodeRef,
        in_bounds: Safety,
        index_range: Interval,
        array_length: Interval,
    },
    /// A return through which acquired resources may escape unreleased.
    ResourceLeak { node: NodeRef, open: Count },
}

impl Fact {
    pub fn node(&self) -> NodeRef {
        match self {
            Fact::ConditionTruth { node, .. }
            | Fact::Constant { node, .. }
            | Fact::IndexSafety { node, .. }
            | Fact::ResourceLeak { node, .. } => *node,
        }
    }

    pub fn kind(&self) -> FactKind {
        match self {
            Fact::ConditionTruth { .. } => FactKind::ConditionTruth,
            Fact::Constant { .. } => FactKind::Constant,
            Fact::IndexSafety { .. } => FactKind::IndexSafety,
            Fact::ResourceLeak { .. } => FactKind::ResourceLeak,
        }
    }

    /// What remains true when the states this fact came from may miss
    /// some executions: safety verdicts become `Unknown`, leak reports
    /// stay, everything else is dropped.
    pub fn weaken(self) -> Option<Fact> {
        match self {
            Fact::IndexSafety {
                node,
                index_range,
                array_length,
                ..
            } => Some(Fact::IndexSafety {
                node,
                in_bounds: Safety::Unknown,
                index_range,
                array_length,
            }),
            Fact::ResourceLeak { .. } => Some(self),
            Fact::ConditionTruth { .. } | Fact::Constant { .. } => None,
        }
    }

    /// A fact covering both `self` and `other`, both about the same node.
    /// `None` when they cannot be reconciled.
    pub fn merge(&self, other: &Fact) -> Option<Fact> {
        match (self, other) {
            _ if self == other => Some(self.clone()),
            (
                Fact::IndexSafety {
                    node,
                    in_bounds: a,
                    index_range: ra,
                    array_length: la,
                },
                Fact::IndexSafety {
                    in_bounds: b,
                    index_range: rb,
                    array_length: lb,
                    ..
                },
            ) => Some(Fact::IndexSafety {
                node: *node,
                in_bounds: a.merge(*b),
                index_range: ra.join(rb),
                array_length: la.join(lb),
            }),
            (Fact::ResourceLeak { node, open: a }, Fact::ResourceLeak { open: b, .. }) => {
                Some(Fact::ResourceLeak {
                    node: *node,
                    open: a.join(b),
                })
            }
            _ => None,
        }
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fact::ConditionTruth {
                node,
                condition,
                truth,
            } => {
                let truth = match truth {
                    Truth::AlwaysTrue => "always true",
                    Truth::AlwaysFalse => "always false",
                };
                write!(f, "{node}: `{condition}` is {truth}")
            }
            Fact::Constant { node, value } => write!(f, "{node}: constant {value}"),
            Fact::IndexSafety {
                node,
                in_bounds,
                index_range,
                array_length,
            } => write!(
                f,
                "{node}: index {index_range} into length {array_length} is {in_bounds}"
            ),
            Fact::ResourceLeak { node, open } => {
                write!(f, "{node}: up to {open} resource(s) may be open at return")
            }
        }
    }
}
