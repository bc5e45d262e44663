use absint_ir::{Condition, Edge, Method, MethodId, NodeId, NodeKind, Operand, Var};

use crate::{AbstractDomain, AbstractStateMap, AnalysisError, TraceEvent, TraceSink};

/// The transfer-function table of one analysis, plus the hooks the
/// interprocedural context needs to summarize callees.
///
/// The engine dispatches on [`NodeKind`]: `If` nodes go to
/// [`branch`](Self::branch), `Invoke` nodes go through the
/// [`InvokeCallBack`] and then [`apply_summary`](Self::apply_summary) or
/// [`clobber_call`](Self::clobber_call), every other kind goes to
/// [`transfer`](Self::transfer).
pub trait Analysis {
    type Domain: AbstractDomain;
    type Summary: Clone + std::fmt::Debug;

    /// Postcondition of a straight-line node.
    fn transfer(&self, kind: &NodeKind, pre: &Self::Domain) -> Self::Domain;

    /// Refine `pre` for the true and the false edge of a branch. An
    /// infeasible edge gets bottom.
    fn branch(&self, condition: &Condition, pre: &Self::Domain) -> (Self::Domain, Self::Domain);

    /// Entry state of `callee` when called from `site` under `pre`.
    ///
    /// Only parameter variables should carry information, so the result can
    /// double as the summary cache key.
    fn callee_entry(&self, site: &CallSite<'_>, callee: &Method, pre: &Self::Domain)
    -> Self::Domain;

    /// Net effect of a fully analyzed callee body.
    fn summarize(&self, callee: &Method, states: &AbstractStateMap<Self::Domain>) -> Self::Summary;

    /// Apply a callee summary to the caller's state at `site`.
    fn apply_summary(
        &self,
        site: &CallSite<'_>,
        summary: &Self::Summary,
        pre: &Self::Domain,
    ) -> Self::Domain;

    /// Conservative postcondition for a call that could not be summarized.
    fn clobber_call(&self, site: &CallSite<'_>, pre: &Self::Domain) -> Self::Domain;
}

/// A call node as seen by the interprocedural machinery.
#[derive(Debug, Clone, Copy)]
pub struct CallSite<'a> {
    pub caller: MethodId,
    pub node: NodeId,
    pub target: MethodId,
    pub dst: Option<Var>,
    pub args: &'a [Operand],
}

/// Result of asking for a callee summary: either a summary to apply, or the
/// reason none is available. Neither case aborts the caller's analysis.
#[derive(Debug, Clone)]
pub enum AnalysisOutcome<S> {
    Summary(S),
    Error(AnalysisError),
}

impl<S> AnalysisOutcome<S> {
    pub fn into_result(self) -> Result<S, AnalysisError> {
        match self {
            AnalysisOutcome::Summary(s) => Ok(s),
            AnalysisOutcome::Error(e) => Err(e),
        }
    }
}

impl<S> From<Result<S, AnalysisError>> for AnalysisOutcome<S> {
    fn from(result: Result<S, AnalysisError>) -> Self {
        match result {
            Ok(s) => AnalysisOutcome::Summary(s),
            Err(e) => AnalysisOutcome::Error(e),
        }
    }
}

/// The node interpreter's window to the outside: resolves calls and receives
/// trace events.
///
/// The outer `Result` aborts the whole run; an [`AnalysisOutcome::Error`]
/// only approximates the call.
pub trait InvokeCallBack<A: Analysis + ?Sized> {
    fn invoke(
        &mut self,
        site: &CallSite<'_>,
        pre: &A::Domain,
    ) -> Result<AnalysisOutcome<A::Summary>, AnalysisError>;

    fn record(&mut self, _event: TraceEvent) {}

    /// Current nesting depth of sub-analyses.
    fn depth(&self) -> usize {
        0
    }
}

/// Callback of an intra-procedural run: every call is approximated.
pub struct Intraprocedural<'t> {
    trace: &'t mut dyn TraceSink,
}

impl<'t> Intraprocedural<'t> {
    pub fn new(trace: &'t mut dyn TraceSink) -> Self {
        Self { trace }
    }
}

impl<A: Analysis + ?Sized> InvokeCallBack<A> for Intraprocedural<'_> {
    fn invoke(
        &mut self,
        site: &CallSite<'_>,
        _pre: &A::Domain,
    ) -> Result<AnalysisOutcome<A::Summary>, AnalysisError> {
        Ok(AnalysisOutcome::Error(AnalysisError::UnanalyzableCallee {
            method: site.target,
            reason: "intra-procedural analysis".to_string(),
        }))
    }

    fn record(&mut self, event: TraceEvent) {
        self.trace.record(event);
    }
}

/// Output of a node's transfer function, per outgoing edge.
#[derive(Debug, Clone, PartialEq)]
pub enum Transfer<D> {
    /// The same value flows along every outgoing edge.
    Flow(D),
    /// Distinct values for the true and the false edge of a branch.
    Branch { on_true: D, on_false: D },
}

impl<D: AbstractDomain> Transfer<D> {
    /// The value flowing along an edge tagged `edge`.
    pub fn edge_value(&self, edge: Edge) -> D {
        match (self, edge) {
            (Transfer::Flow(d), _) => d.clone(),
            (Transfer::Branch { on_true, .. }, Edge::True) => on_true.clone(),
            (Transfer::Branch { on_false, .. }, Edge::False) => on_false.clone(),
            (Transfer::Branch { on_true, on_false }, Edge::Next) => on_true.join(on_false),
        }
    }

    /// The node's postcondition.
    pub fn post(&self) -> D {
        match self {
            Transfer::Flow(d) => d.clone(),
            Transfer::Branch { on_true, on_false } => on_true.join(on_false),
        }
    }
}
