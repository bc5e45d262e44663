use absint_engine::{AbstractStateMap, Analysis, CallSite};
use absint_ir::{Condition, HasBottom, HasTop, Lattice, Method, NodeKind};

use crate::Count;

/// Tracks `Acquire`/`Release` pairs. A callee's summary is its net effect
/// starting from nothing open.
#[derive(Debug, Default, Clone, Copy)]
pub struct CountAnalysis;

impl CountAnalysis {
    pub fn new() -> Self {
        Self
    }
}

impl Analysis for CountAnalysis {
    type Domain = Count;
    type Summary = Count;

    fn transfer(&self, kind: &NodeKind, pre: &Count) -> Count {
        match kind {
            NodeKind::Acquire => pre.increment(),
            NodeKind::Release => pre.decrement(),
            _ => *pre,
        }
    }

    fn branch(&self, _condition: &Condition, pre: &Count) -> (Count, Count) {
        (*pre, *pre)
    }

    fn callee_entry(&self, _site: &CallSite<'_>, _callee: &Method, _pre: &Count) -> Count {
        Count::Open(0)
    }

    fn summarize(&self, callee: &Method, states: &AbstractStateMap<Count>) -> Count {
        callee
            .return_nodes()
            .filter_map(|node| states.pre(node))
            .fold(Count::bottom(), |acc, count| acc.join(count))
    }

    fn apply_summary(&self, _site: &CallSite<'_>, summary: &Count, pre: &Count) -> Count {
        pre.plus(*summary)
    }

    fn clobber_call(&self, _site: &CallSite<'_>, _pre: &Count) -> Count {
        Count::top()
    }
}

#[cfg(test)]
mod tests {
    use absint_engine::{
        AcceptAll, FixpointIterator, InterproceduralContext, Intraprocedural, IteratorPolicy,
        NullSink,
    };
    use absint_test_utils::fixtures;

    use super::*;

    #[test]
    fn balanced_method_closes_everything() {
        let fixture = fixtures::resources();
        let balanced = fixture.id("balanced");
        let policy = IteratorPolicy::default();
        let mut sink = NullSink;
        let mut calls = Intraprocedural::new(&mut sink);
        let solution = FixpointIterator::new(&CountAnalysis, &policy, balanced, fixture.method(balanced))
            .run(Count::Open(0), &mut calls)
            .expect("run");
        let ret = fixture.returns(balanced)[0];
        assert_eq!(solution.states.pre(ret), Some(&Count::Open(0)));
    }

    #[test]
    fn callee_effects_accumulate() {
        let fixture = fixtures::resources();
        let policy = IteratorPolicy::default();
        let mut sink = NullSink;
        let run = InterproceduralContext::new(
            &fixture.program,
            &CountAnalysis,
            &policy,
            &AcceptAll,
            &mut sink,
        )
        .run(fixture.root, Count::Open(0))
        .expect("run");
        let ret = fixture.returns(fixture.root)[0];
        assert_eq!(run.solution.states.pre(ret), Some(&Count::Open(2)));
        assert_eq!(run.stats.cache_hits, 1);

        let open_file = fixture.id("open_file");
        let callee = &run.callee_runs[0];
        assert_eq!(callee.method, open_file);
        let open_at_returns: Vec<Count> = fixture
            .returns(open_file)
            .into_iter()
            .filter_map(|node| callee.states.pre(node).copied())
            .collect();
        assert_eq!(open_at_returns, vec![Count::Open(0), Count::Open(1)]);
    }
}
