use std::fmt;

use petgraph::graph::NodeIndex;

macro_rules! identifier {
    ($(#[$attr:meta])* struct $name:ident => $prefix:literal) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub fn new(raw: u32) -> Self {
                Self(raw)
            }

            /// Return the raw index.
            pub fn raw(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

identifier! {
    /// A local variable slot of a method. Parameters, node results and
    /// array references all live in the same namespace.
    struct Var => "%"
}

identifier! {
    /// A node of one method graph. Stable for the lifetime of the method.
    struct NodeId => "n"
}

identifier! {
    /// A method of a [`crate::Program`].
    struct MethodId => "@"
}

impl From<NodeIndex> for NodeId {
    fn from(ix: NodeIndex) -> Self {
        NodeId(ix.index() as u32)
    }
}

impl From<NodeId> for NodeIndex {
    fn from(id: NodeId) -> Self {
        NodeIndex::new(id.raw())
    }
}

/// A node named across the whole program.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeRef {
    pub method: MethodId,
    pub node: NodeId,
}

impl NodeRef {
    pub fn new(method: MethodId, node: NodeId) -> Self {
        Self { method, node }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.method, self.node)
    }
}
