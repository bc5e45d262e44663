use absint_ir::NodeId;
use rustc_hash::FxHashMap;

use crate::AbstractDomain;

/// Abstract state attached to one node.
///
/// `pre` is the join of every incoming edge value seen so far; `post` is the
/// node's transfer function applied to `pre`. For branch nodes `post` is the
/// join of both edge values.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeState<D> {
    pub pre: D,
    pub post: D,
}

impl<D: AbstractDomain> NodeState<D> {
    pub fn new(pre: D) -> Self {
        Self {
            pre,
            post: D::bottom(),
        }
    }
}

/// Per-node states of one analysis run. Nodes never reached have no entry.
#[derive(Debug, Clone, PartialEq)]
pub struct AbstractStateMap<D> {
    states: FxHashMap<NodeId, NodeState<D>>,
}

impl<D> Default for AbstractStateMap<D> {
    fn default() -> Self {
        Self {
            states: FxHashMap::default(),
        }
    }
}

impl<D> AbstractStateMap<D> {
    pub fn get(&self, node: NodeId) -> Option<&NodeState<D>> {
        self.states.get(&node)
    }

    pub fn pre(&self, node: NodeId) -> Option<&D> {
        self.states.get(&node).map(|s| &s.pre)
    }

    pub fn post(&self, node: NodeId) -> Option<&D> {
        self.states.get(&node).map(|s| &s.post)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// States in ascending node order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &NodeState<D>)> + '_ {
        let mut nodes: Vec<NodeId> = self.states.keys().copied().collect();
        nodes.sort_unstable();
        nodes.into_iter().map(move |n| (n, &self.states[&n]))
    }

    pub(crate) fn get_mut(&mut self, node: NodeId) -> Option<&mut NodeState<D>> {
        self.states.get_mut(&node)
    }

    pub(crate) fn insert(&mut self, node: NodeId, state: NodeState<D>) {
        self.states.insert(node, state);
    }
}

impl<D: AbstractDomain> AbstractStateMap<D> {
    /// Whether some execution may reach `node`.
    pub fn is_reachable(&self, node: NodeId) -> bool {
        self.pre(node).is_some_and(|pre| !pre.is_bottom())
    }
}
