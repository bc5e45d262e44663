use absint_checker::{Fact, FactKind, FactSet, Safety};
use absint_engine::{AbstractStateMap, CalleeRun, Diagnostic, InterproceduralStats};
use absint_ir::{MethodId, NodeRef};
use rustc_hash::FxHashSet;

/// What one run of an [`AnalysisContext`](crate::AnalysisContext) proved.
#[derive(Debug, Clone)]
pub struct AnalysisReport<D> {
    pub root: MethodId,
    /// Converged states of the root method.
    pub states: AbstractStateMap<D>,
    /// States of every callee analysis, one per distinct calling context.
    pub callee_runs: Vec<CalleeRun<D>>,
    /// Facts over the root and every analyzed callee. Facts of incomplete
    /// methods are weakened.
    pub facts: FactSet,
    pub diagnostics: Vec<Diagnostic>,
    pub incomplete: FxHashSet<MethodId>,
    pub stats: InterproceduralStats,
    /// Node visits of the root fixpoint, narrowing included.
    pub iterations: usize,
}

impl<D> AnalysisReport<D> {
    /// Verdict for the indexed access at `node`. Accesses without a fact
    /// keep their check.
    pub fn safety(&self, node: NodeRef) -> Safety {
        match self.facts.get(node, FactKind::IndexSafety) {
            Some(Fact::IndexSafety { in_bounds, .. }) => *in_bounds,
            _ => Safety::Unknown,
        }
    }

    /// Accesses proven in bounds, in node order.
    pub fn removable_checks(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.facts
            .of_kind(FactKind::IndexSafety)
            .filter(|fact| matches!(fact, Fact::IndexSafety { in_bounds: Safety::Safe, .. }))
            .map(Fact::node)
    }

    /// Facts about nodes of `method`.
    pub fn facts_in(&self, method: MethodId) -> impl Iterator<Item = &Fact> + '_ {
        self.facts.iter().filter(move |fact| fact.node().method == method)
    }

    /// Whether every call was summarized.
    pub fn is_complete(&self) -> bool {
        self.diagnostics.is_empty()
    }
}
