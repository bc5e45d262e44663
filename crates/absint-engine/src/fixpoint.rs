use std::collections::{BTreeSet, VecDeque};

use absint_ir::{CfgOrder, HasBottom, Lattice, Method, MethodId, NodeId};
use rustc_hash::FxHashMap;

use crate::{
    AbstractDomain, AbstractStateMap, Analysis, AnalysisError, InvokeCallBack, IterationOrder,
    IteratorPolicy, NodeInterpreter, NodeState, TraceEvent, Transfer,
};

/// Per-node bookkeeping of the worklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeStatus {
    Unvisited,
    Queued,
    Stable,
}

enum Worklist {
    /// Keyed by reverse-postorder position so inner nodes of a loop settle
    /// before the loop is re-entered.
    Rpo(BTreeSet<(usize, NodeId)>),
    Fifo(VecDeque<NodeId>),
}

impl Worklist {
    fn new(order: IterationOrder) -> Self {
        match order {
            IterationOrder::ReversePostorder => Worklist::Rpo(BTreeSet::new()),
            IterationOrder::Fifo => Worklist::Fifo(VecDeque::new()),
        }
    }

    fn push(&mut self, position: usize, node: NodeId) {
        match self {
            Worklist::Rpo(set) => {
                set.insert((position, node));
            }
            Worklist::Fifo(queue) => queue.push_back(node),
        }
    }

    fn pop(&mut self) -> Option<NodeId> {
        match self {
            Worklist::Rpo(set) => set.pop_first().map(|(_, node)| node),
            Worklist::Fifo(queue) => queue.pop_front(),
        }
    }
}

/// Converged states of one method.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution<D> {
    pub states: AbstractStateMap<D>,
    /// Node visits spent, narrowing included.
    pub iterations: usize,
}

/// Worklist fixpoint over the graph of one method.
///
/// The ascending phase merges edge values into successor preconditions,
/// widening at loop headers according to [`IteratorPolicy::widening`]. A
/// successor is rescheduled only when its precondition changed. The
/// descending phase then runs [`IteratorPolicy::narrowing_passes`] sweeps in
/// reverse postorder.
pub struct FixpointIterator<'a, A: Analysis> {
    interp: NodeInterpreter<'a, A>,
    policy: &'a IteratorPolicy,
    method_id: MethodId,
    method: &'a Method,
    order: CfgOrder,
    states: AbstractStateMap<A::Domain>,
    transfers: FxHashMap<NodeId, Transfer<A::Domain>>,
    status: FxHashMap<NodeId, NodeStatus>,
    header_visits: FxHashMap<NodeId, usize>,
    worklist: Worklist,
    iterations: usize,
}

impl<'a, A: Analysis> FixpointIterator<'a, A> {
    pub fn new(
        analysis: &'a A,
        policy: &'a IteratorPolicy,
        method_id: MethodId,
        method: &'a Method,
    ) -> Self {
        Self {
            interp: NodeInterpreter::new(analysis, method_id, method),
            policy,
            method_id,
            method,
            order: method.order(),
            states: AbstractStateMap::default(),
            transfers: FxHashMap::default(),
            status: FxHashMap::default(),
            header_visits: FxHashMap::default(),
            worklist: Worklist::new(policy.order),
            iterations: 0,
        }
    }

    /// Run to convergence from `entry`, the state at the `Start` node.
    pub fn run<C>(mut self, entry: A::Domain, calls: &mut C) -> Result<Solution<A::Domain>, AnalysisError>
    where
        C: InvokeCallBack<A> + ?Sized,
    {
        calls.record(TraceEvent::AnalysisStarted {
            method: self.method_id,
            depth: calls.depth(),
        });

        let start = self.method.entry();
        self.states.insert(start, NodeState::new(entry.clone()));
        self.schedule(start);

        while let Some(node) = self.worklist.pop() {
            self.status.insert(node, NodeStatus::Stable);
            self.tick(node, calls)?;
            let pre = match self.states.pre(node) {
                Some(pre) => pre.clone(),
                None => continue,
            };
            let transfer = self.interp.interpret(node, &pre, calls)?;
            for (edge, succ) in self.method.successors(node) {
                let value = transfer.edge_value(edge);
                if value.is_bottom() {
                    continue;
                }
                if self.propagate(succ, &value, calls) {
                    self.schedule(succ);
                }
            }
            self.store(node, transfer);
        }

        for _ in 0..self.policy.narrowing_passes {
            if !self.narrow_pass(&entry, calls)? {
                break;
            }
        }

        calls.record(TraceEvent::AnalysisFinished {
            method: self.method_id,
            iterations: self.iterations,
        });
        Ok(Solution {
            states: self.states,
            iterations: self.iterations,
        })
    }

    fn tick<C>(&mut self, node: NodeId, calls: &mut C) -> Result<(), AnalysisError>
    where
        C: InvokeCallBack<A> + ?Sized,
    {
        self.iterations += 1;
        if self.iterations > self.policy.max_iterations {
            return Err(AnalysisError::IterationLimitExceeded {
                method: self.method_id,
                limit: self.policy.max_iterations,
            });
        }
        calls.record(TraceEvent::NodeVisited {
            method: self.method_id,
            node,
            iteration: self.iterations,
        });
        Ok(())
    }

    fn schedule(&mut self, node: NodeId) {
        let status = self.status.entry(node).or_insert(NodeStatus::Unvisited);
        if *status == NodeStatus::Queued {
            return;
        }
        *status = NodeStatus::Queued;
        let position = self.order.position(node).unwrap_or(usize::MAX);
        self.worklist.push(position, node);
    }

    /// Merge `value` into the precondition of `node`; `true` if it changed.
    fn propagate<C>(&mut self, node: NodeId, value: &A::Domain, calls: &mut C) -> bool
    where
        C: InvokeCallBack<A> + ?Sized,
    {
        let Some(state) = self.states.get_mut(node) else {
            self.states.insert(node, NodeState::new(value.clone()));
            calls.record(TraceEvent::StateChanged {
                method: self.method_id,
                node,
                widened: false,
            });
            return true;
        };
        let joined = state.pre.join(value);
        let merged = if self.order.is_loop_header(node) {
            let visits = self.header_visits.entry(node).or_insert(0);
            *visits += 1;
            self.policy.widening.merge(&state.pre, value, *visits)
        } else {
            joined.clone()
        };
        if merged == state.pre {
            return false;
        }
        let widened = merged != joined;
        state.pre = merged;
        calls.record(TraceEvent::StateChanged {
            method: self.method_id,
            node,
            widened,
        });
        true
    }

    fn store(&mut self, node: NodeId, transfer: Transfer<A::Domain>) {
        if let Some(state) = self.states.get_mut(node) {
            state.post = transfer.post();
        }
        self.transfers.insert(node, transfer);
    }

    /// One descending sweep; `true` if some precondition shrank. Nodes whose
    /// precondition is unchanged keep their stored transfer.
    fn narrow_pass<C>(&mut self, entry: &A::Domain, calls: &mut C) -> Result<bool, AnalysisError>
    where
        C: InvokeCallBack<A> + ?Sized,
    {
        let mut changed = false;
        let rpo = self.order.rpo().to_vec();
        for node in rpo {
            let Some(current) = self.states.pre(node).cloned() else {
                continue;
            };
            let mut incoming = if node == self.method.entry() {
                entry.clone()
            } else {
                A::Domain::bottom()
            };
            for (edge, pred) in self.method.predecessors(node) {
                if let Some(transfer) = self.transfers.get(&pred) {
                    incoming.join_with(&transfer.edge_value(edge));
                }
            }
            let narrowed = current.narrow(&incoming);
            if narrowed == current {
                continue;
            }
            changed = true;
            self.tick(node, calls)?;
            calls.record(TraceEvent::StateChanged {
                method: self.method_id,
                node,
                widened: false,
            });
            if let Some(state) = self.states.get_mut(node) {
                state.pre = narrowed.clone();
            }
            let transfer = self.interp.interpret(node, &narrowed, calls)?;
            self.store(node, transfer);
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use absint_ir::{
        BinaryOp, CmpOp, Condition, Edge, HasBottom, Lattice, MethodBuilder, NodeKind, Operand,
        ParamKind,
    };

    use super::*;
    use crate::{
        AbstractStateMap, CallSite, Intraprocedural, NullSink, RecordingSink, WideningStrategy,
    };

    /// Number of additions executed so far, a chain of infinite height.
    #[derive(Debug, Clone, PartialEq)]
    enum Steps {
        Bottom,
        At(u32),
        Any,
    }

    impl Steps {
        fn rank(&self) -> Option<u32> {
            match self {
                Steps::Bottom => None,
                Steps::At(n) => Some(*n),
                Steps::Any => Some(u32::MAX),
            }
        }
    }

    impl Lattice for Steps {
        fn join(&self, other: &Self) -> Self {
            if self.is_subseteq(other) {
                other.clone()
            } else {
                self.clone()
            }
        }

        fn meet(&self, other: &Self) -> Self {
            if self.is_subseteq(other) {
                self.clone()
            } else {
                other.clone()
            }
        }

        fn is_subseteq(&self, other: &Self) -> bool {
            self.rank() <= other.rank()
        }
    }

    impl HasBottom for Steps {
        fn bottom() -> Self {
            Steps::Bottom
        }
    }

    impl AbstractDomain for Steps {
        fn is_bottom(&self) -> bool {
            *self == Steps::Bottom
        }

        fn widen(&self, next: &Self) -> Self {
            if next.is_subseteq(self) {
                self.clone()
            } else {
                Steps::Any
            }
        }

        fn narrow(&self, next: &Self) -> Self {
            if *self == Steps::Any { next.clone() } else { self.clone() }
        }
    }

    struct StepCount;

    impl Analysis for StepCount {
        type Domain = Steps;
        type Summary = ();

        fn transfer(&self, kind: &NodeKind, pre: &Steps) -> Steps {
            match (kind, pre) {
                (NodeKind::Binary { op: BinaryOp::Add, .. }, Steps::At(n)) => Steps::At(n + 1),
                _ => pre.clone(),
            }
        }

        fn branch(&self, condition: &Condition, pre: &Steps) -> (Steps, Steps) {
            match (condition.lhs, condition.rhs) {
                (Operand::Const(l), Operand::Const(r)) if condition.op.eval(l, r) => {
                    (pre.clone(), Steps::Bottom)
                }
                (Operand::Const(_), Operand::Const(_)) => (Steps::Bottom, pre.clone()),
                _ => (pre.clone(), pre.clone()),
            }
        }

        fn callee_entry(&self, _: &CallSite<'_>, _: &Method, pre: &Steps) -> Steps {
            pre.clone()
        }

        fn summarize(&self, _: &Method, _: &AbstractStateMap<Steps>) {}

        fn apply_summary(&self, _: &CallSite<'_>, _: &(), pre: &Steps) -> Steps {
            pre.clone()
        }

        fn clobber_call(&self, _: &CallSite<'_>, _: &Steps) -> Steps {
            Steps::Any
        }
    }

    /// `i = 0; while (i < n) { i = i + 1 }; return`
    fn counting_loop() -> (Method, NodeId, NodeId, NodeId) {
        let mut b = MethodBuilder::new("count");
        let n = b.param(ParamKind::Int);
        let i = b.var();
        let init = b.append(b.entry(), NodeKind::Const { dst: i, value: 0 });
        let header = b.append(init, NodeKind::Merge);
        let cond = b.append(
            header,
            NodeKind::If {
                condition: Condition::new(CmpOp::Lt, i, n),
            },
        );
        let body = b.node(NodeKind::Binary {
            dst: i,
            op: BinaryOp::Add,
            lhs: i.into(),
            rhs: 1.into(),
        });
        let exit = b.node(NodeKind::Return { value: None });
        b.edge(cond, Edge::True, body);
        b.edge(cond, Edge::False, exit);
        b.edge(body, Edge::Next, header);
        (b.finish().unwrap(), header, body, exit)
    }

    fn run(
        method: &Method,
        policy: &IteratorPolicy,
        sink: &mut RecordingSink,
    ) -> Result<Solution<Steps>, AnalysisError> {
        let mut calls = Intraprocedural::new(sink);
        FixpointIterator::new(&StepCount, policy, MethodId::new(0), method)
            .run(Steps::At(0), &mut calls)
    }

    #[test]
    fn loop_converges_after_delayed_widening() {
        let (method, header, body, exit) = counting_loop();
        let mut sink = RecordingSink::new();
        let policy = IteratorPolicy::default().with_widening(WideningStrategy::Delayed(2));
        let solution = run(&method, &policy, &mut sink).unwrap();

        assert_eq!(solution.states.pre(header), Some(&Steps::Any));
        assert_eq!(solution.states.post(body), Some(&Steps::Any));
        assert!(solution.states.is_reachable(exit));
        assert_eq!(
            sink.count(|e| matches!(e, TraceEvent::StateChanged { widened: true, .. })),
            1
        );
        assert!(matches!(
            sink.events.last(),
            Some(TraceEvent::AnalysisFinished { .. })
        ));
    }

    #[test]
    fn join_only_hits_iteration_limit() {
        let (method, ..) = counting_loop();
        let mut sink = RecordingSink::new();
        let policy = IteratorPolicy::default()
            .with_widening(WideningStrategy::Never)
            .with_max_iterations(50);
        let err = run(&method, &policy, &mut sink).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::IterationLimitExceeded {
                method: MethodId::new(0),
                limit: 50,
            }
        );
    }

    #[test]
    fn fifo_order_reaches_same_fixpoint() {
        let (method, ..) = counting_loop();
        let rpo = run(&method, &IteratorPolicy::default(), &mut RecordingSink::new()).unwrap();
        let fifo = run(
            &method,
            &IteratorPolicy::default().with_order(IterationOrder::Fifo),
            &mut RecordingSink::new(),
        )
        .unwrap();
        assert_eq!(rpo.states, fifo.states);
    }

    #[test]
    fn infeasible_edge_leaves_target_unreached() {
        let mut b = MethodBuilder::new("dead");
        let cond = b.append(
            b.entry(),
            NodeKind::If {
                condition: Condition::new(CmpOp::Gt, 0, 1),
            },
        );
        let dead = b.node(NodeKind::Return { value: None });
        let live = b.node(NodeKind::Return { value: None });
        b.edge(cond, Edge::True, dead);
        b.edge(cond, Edge::False, live);
        let method = b.finish().unwrap();

        let mut sink = NullSink;
        let mut calls = Intraprocedural::new(&mut sink);
        let policy = IteratorPolicy::default();
        let solution = FixpointIterator::new(&StepCount, &policy, MethodId::new(0), &method)
            .run(Steps::At(0), &mut calls)
            .unwrap();
        assert!(!solution.states.is_reachable(dead));
        assert!(solution.states.get(dead).is_none());
        assert!(solution.states.is_reachable(live));
    }

    #[test]
    fn calls_are_clobbered_without_context() {
        let mut b = MethodBuilder::new("caller");
        let call = b.append(
            b.entry(),
            NodeKind::Invoke {
                dst: None,
                target: MethodId::new(7),
                args: vec![],
            },
        );
        let ret = b.append(call, NodeKind::Return { value: None });
        let method = b.finish().unwrap();

        let mut sink = RecordingSink::new();
        let solution = run(&method, &IteratorPolicy::default(), &mut sink).unwrap();
        assert_eq!(solution.states.pre(ret), Some(&Steps::Any));
        assert_eq!(
            sink.count(|e| matches!(e, TraceEvent::CallClobbered { .. })),
            1
        );
    }
}
