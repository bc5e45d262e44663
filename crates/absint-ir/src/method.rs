use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{DfsEvent, EdgeRef, depth_first_search};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::{Edge, NodeId, NodeKind, Var};

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParamKind {
    Int,
    Array,
}

/// A formal parameter bound to a variable at method entry.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Param {
    pub var: Var,
    pub kind: ParamKind,
}

/// The control-flow graph of one method.
///
/// Built through [`crate::MethodBuilder`]; read-only afterwards.
#[derive(Clone, Debug)]
pub struct Method {
    pub(crate) name: String,
    pub(crate) params: Vec<Param>,
    pub(crate) graph: DiGraph<NodeKind, Edge>,
    pub(crate) entry: NodeId,
    pub(crate) external: bool,
}

impl Method {
    /// Declare a method whose body is not available as IR (library code).
    pub fn external(name: impl Into<String>, params: &[ParamKind]) -> Self {
        let mut graph = DiGraph::new();
        let entry = graph.add_node(NodeKind::Start).into();
        Self {
            name: name.into(),
            params: params
                .iter()
                .enumerate()
                .map(|(i, &kind)| Param {
                    var: Var::new(i as u32),
                    kind,
                })
                .collect(),
            graph,
            entry,
            external: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn is_external(&self) -> bool {
        self.external
    }

    pub fn entry(&self) -> NodeId {
        self.entry
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn kind(&self, node: NodeId) -> Option<&NodeKind> {
        self.graph.node_weight(NodeIndex::from(node))
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_indices().map(NodeId::from)
    }

    /// Nodes paired with their kinds, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &NodeKind)> + '_ {
        self.graph
            .node_indices()
            .map(|ix| (NodeId::from(ix), &self.graph[ix]))
    }

    /// Outgoing edges in insertion order.
    pub fn successors(&self, node: NodeId) -> SmallVec<[(Edge, NodeId); 2]> {
        let mut out: SmallVec<[(Edge, NodeId); 2]> = self
            .graph
            .edges(NodeIndex::from(node))
            .map(|e| (*e.weight(), NodeId::from(e.target())))
            .collect();
        // petgraph yields the most recently added edge first
        out.reverse();
        out
    }

    /// Incoming edges as `(edge, source)` pairs in insertion order.
    pub fn predecessors(&self, node: NodeId) -> SmallVec<[(Edge, NodeId); 2]> {
        let mut out: SmallVec<[(Edge, NodeId); 2]> = self
            .graph
            .edges_directed(NodeIndex::from(node), Direction::Incoming)
            .map(|e| (*e.weight(), NodeId::from(e.source())))
            .collect();
        out.reverse();
        out
    }

    /// The target of the outgoing edge tagged `edge`.
    pub fn successor(&self, node: NodeId, edge: Edge) -> Option<NodeId> {
        self.successors(node)
            .into_iter()
            .find(|(e, _)| *e == edge)
            .map(|(_, n)| n)
    }

    /// Whether any node of the body assigns `var`.
    pub fn defines(&self, var: Var) -> bool {
        self.graph
            .node_weights()
            .any(|kind| kind.def() == Some(var))
    }

    pub fn return_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.iter()
            .filter(|(_, kind)| matches!(kind, NodeKind::Return { .. }))
            .map(|(id, _)| id)
    }

    /// Compute reverse postorder and loop headers from the entry node.
    pub fn order(&self) -> CfgOrder {
        let mut postorder = Vec::with_capacity(self.graph.node_count());
        let mut loop_headers = FxHashSet::default();
        depth_first_search(&self.graph, Some(NodeIndex::from(self.entry)), |event| {
            match event {
                DfsEvent::BackEdge(_, header) => {
                    loop_headers.insert(NodeId::from(header));
                }
                DfsEvent::Finish(n, _) => postorder.push(NodeId::from(n)),
                _ => {}
            }
        });
        postorder.reverse();
        let index = postorder
            .iter()
            .enumerate()
            .map(|(i, n)| (*n, i))
            .collect();
        CfgOrder {
            rpo: postorder,
            index,
            loop_headers,
        }
    }
}

/// Traversal facts of a method graph, computed once per analysis.
#[derive(Clone, Debug)]
pub struct CfgOrder {
    rpo: Vec<NodeId>,
    index: FxHashMap<NodeId, usize>,
    loop_headers: FxHashSet<NodeId>,
}

impl CfgOrder {
    /// Nodes reachable from the entry, in reverse postorder.
    pub fn rpo(&self) -> &[NodeId] {
        &self.rpo
    }

    /// Position of `node` in reverse postorder, `None` if unreachable.
    pub fn position(&self, node: NodeId) -> Option<usize> {
        self.index.get(&node).copied()
    }

    /// Whether `node` is the target of a back edge.
    pub fn is_loop_header(&self, node: NodeId) -> bool {
        self.loop_headers.contains(&node)
    }

    pub fn loop_headers(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.loop_headers.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use crate::{CmpOp, Condition, MethodBuilder, NodeKind, Operand};

    use super::*;

    #[test]
    fn loop_header_is_detected() {
        let mut b = MethodBuilder::new("count");
        let i = b.var();
        let init = b.append(b.entry(), NodeKind::Const { dst: i, value: 0 });
        let header = b.append(init, NodeKind::Merge);
        let cond = b.append(
            header,
            NodeKind::If {
                condition: Condition::new(CmpOp::Lt, i, 10),
            },
        );
        let body = b.node(NodeKind::Binary {
            dst: i,
            op: crate::BinaryOp::Add,
            lhs: Operand::Var(i),
            rhs: Operand::Const(1),
        });
        let exit = b.node(NodeKind::Return { value: None });
        b.edge(cond, Edge::True, body);
        b.edge(cond, Edge::False, exit);
        b.edge(body, Edge::Next, header);
        let method = b.finish().unwrap();

        let order = method.order();
        assert!(order.is_loop_header(header));
        assert_eq!(order.loop_headers().count(), 1);
        assert_eq!(order.rpo()[0], method.entry());
        assert!(order.position(header).unwrap() < order.position(body).unwrap());
        assert_eq!(method.predecessors(header).len(), 2);
        assert_eq!(method.successor(cond, Edge::False), Some(exit));
        assert!(method.defines(i));
    }

    #[test]
    fn external_methods_bind_params() {
        let m = Method::external("hash", &[ParamKind::Array, ParamKind::Int]);
        assert!(m.is_external());
        assert_eq!(m.params()[1].var, Var::new(1));
        assert_eq!(m.node_count(), 1);
    }
}
