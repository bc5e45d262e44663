use petgraph::graph::{DiGraph, NodeIndex};

use crate::{Edge, Method, NodeId, NodeKind, Param, ParamKind, Var};

/// Structural problems detected when finishing a [`MethodBuilder`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("node {node} in `{method}` has no {edge:?} successor")]
    MissingSuccessor {
        method: String,
        node: NodeId,
        edge: Edge,
    },
    #[error("node {node} in `{method}` cannot have a {edge:?} successor")]
    UnexpectedEdge {
        method: String,
        node: NodeId,
        edge: Edge,
    },
    #[error("node {node} in `{method}` has more than one {edge:?} successor")]
    DuplicateEdge {
        method: String,
        node: NodeId,
        edge: Edge,
    },
}

/// Incremental constructor for a [`Method`].
///
/// A `Start` node is created up front and serves as the entry.
///
/// ```
/// use absint_ir::{MethodBuilder, NodeKind};
///
/// let mut b = MethodBuilder::new("answer");
/// let x = b.var();
/// let c = b.append(b.entry(), NodeKind::Const { dst: x, value: 42 });
/// b.append(c, NodeKind::Return { value: Some(x.into()) });
/// let method = b.finish().unwrap();
/// assert_eq!(method.node_count(), 3);
/// ```
#[derive(Debug)]
pub struct MethodBuilder {
    name: String,
    params: Vec<Param>,
    graph: DiGraph<NodeKind, Edge>,
    entry: NodeId,
    next_var: u32,
}

impl MethodBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        let mut graph = DiGraph::new();
        let entry = graph.add_node(NodeKind::Start).into();
        Self {
            name: name.into(),
            params: Vec::new(),
            graph,
            entry,
            next_var: 0,
        }
    }

    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// Declare the next formal parameter.
    pub fn param(&mut self, kind: ParamKind) -> Var {
        let var = self.var();
        self.params.push(Param { var, kind });
        var
    }

    /// Allocate a fresh local variable.
    pub fn var(&mut self) -> Var {
        let var = Var::new(self.next_var);
        self.next_var += 1;
        var
    }

    /// Add a node with no edges.
    pub fn node(&mut self, kind: NodeKind) -> NodeId {
        self.graph.add_node(kind).into()
    }

    pub fn edge(&mut self, from: NodeId, edge: Edge, to: NodeId) -> &mut Self {
        self.graph
            .add_edge(NodeIndex::from(from), NodeIndex::from(to), edge);
        self
    }

    /// Add a node reached from `prev` by a fall-through edge.
    pub fn append(&mut self, prev: NodeId, kind: NodeKind) -> NodeId {
        let node = self.node(kind);
        self.edge(prev, Edge::Next, node);
        node
    }

    /// Validate edge shapes and produce the method.
    pub fn finish(self) -> Result<Method, BuildError> {
        let method = Method {
            name: self.name,
            params: self.params,
            graph: self.graph,
            entry: self.entry,
            external: false,
        };
        for (node, kind) in method.iter() {
            let succs = method.successors(node);
            let count = |edge: Edge| succs.iter().filter(|(e, _)| *e == edge).count();
            let expected: &[Edge] = match kind {
                NodeKind::If { .. } => &[Edge::True, Edge::False],
                NodeKind::Return { .. } => &[],
                _ => &[Edge::Next],
            };
            for &(edge, _) in &succs {
                if !expected.contains(&edge) {
                    return Err(BuildError::UnexpectedEdge {
                        method: method.name.clone(),
                        node,
                        edge,
                    });
                }
            }
            for &edge in expected {
                match count(edge) {
                    0 => {
                        return Err(BuildError::MissingSuccessor {
                            method: method.name.clone(),
                            node,
                            edge,
                        });
                    }
                    1 => {}
                    _ => {
                        return Err(BuildError::DuplicateEdge {
                            method: method.name.clone(),
                            node,
                            edge,
                        });
                    }
                }
            }
        }
        Ok(method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CmpOp, Condition};

    #[test]
    fn if_without_false_edge_is_rejected() {
        let mut b = MethodBuilder::new("broken");
        let x = b.param(ParamKind::Int);
        let cond = b.append(
            b.entry(),
            NodeKind::If {
                condition: Condition::new(CmpOp::Lt, x, 0),
            },
        );
        let ret = b.node(NodeKind::Return { value: None });
        b.edge(cond, Edge::True, ret);
        let err = b.finish().unwrap_err();
        assert_eq!(
            err,
            BuildError::MissingSuccessor {
                method: "broken".into(),
                node: cond,
                edge: Edge::False,
            }
        );
    }

    #[test]
    fn return_cannot_fall_through() {
        let mut b = MethodBuilder::new("broken");
        let ret = b.append(b.entry(), NodeKind::Return { value: None });
        let other = b.node(NodeKind::Return { value: None });
        b.edge(ret, Edge::Next, other);
        assert!(matches!(
            b.finish(),
            Err(BuildError::UnexpectedEdge { .. })
        ));
    }
}
