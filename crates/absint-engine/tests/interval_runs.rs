use absint_engine::{
    AcceptAll, AnalysisError, FixpointIterator, InterproceduralContext, Intraprocedural,
    IterationOrder, IteratorPolicy, MethodFilter, NullSink, RecordingSink, TraceEvent,
    WideningStrategy,
};
use absint_interval::{IntervalAnalysis, IntervalEnv};
use absint_ir::{HasTop, Method, MethodId};
use absint_test_utils::fixtures::{self, Fixture};

fn intra(
    fixture: &Fixture,
    policy: &IteratorPolicy,
) -> Result<absint_engine::Solution<IntervalEnv>, AnalysisError> {
    let mut sink = NullSink;
    let mut calls = Intraprocedural::new(&mut sink);
    FixpointIterator::new(&IntervalAnalysis, policy, fixture.root, fixture.root_method())
        .run(IntervalEnv::top(), &mut calls)
}

#[test]
fn worklist_order_does_not_change_the_result() {
    for fixture in [fixtures::guarded_access(), fixtures::counted_loop()] {
        let rpo = intra(&fixture, &IteratorPolicy::default()).expect("rpo");
        let fifo = intra(
            &fixture,
            &IteratorPolicy::default().with_order(IterationOrder::Fifo),
        )
        .expect("fifo");
        assert_eq!(rpo.states, fifo.states);
    }
}

#[test]
fn reruns_are_deterministic() {
    let fixture = fixtures::counted_loop();
    let policy = IteratorPolicy::default();
    let first = intra(&fixture, &policy).expect("first");
    let second = intra(&fixture, &policy).expect("second");
    assert_eq!(first, second);
}

#[test]
fn join_only_loop_hits_the_iteration_cap() {
    let fixture = fixtures::counted_loop();
    let policy = IteratorPolicy::default()
        .with_widening(WideningStrategy::Never)
        .with_max_iterations(200);
    let err = intra(&fixture, &policy).unwrap_err();
    assert_eq!(
        err,
        AnalysisError::IterationLimitExceeded {
            method: fixture.root,
            limit: 200,
        }
    );
}

#[test]
fn immediate_widening_still_converges() {
    let fixture = fixtures::counted_loop();
    let policy = IteratorPolicy::default().with_widening(WideningStrategy::Immediate);
    let solution = intra(&fixture, &policy).expect("converges");
    assert!(solution.iterations < 50);
}

#[test]
fn recursion_is_approximated_and_reported() {
    let fixture = fixtures::recursive();
    let countdown = fixture.id("countdown");
    let policy = IteratorPolicy::default();
    let mut sink = RecordingSink::new();
    let run = InterproceduralContext::new(
        &fixture.program,
        &IntervalAnalysis,
        &policy,
        &AcceptAll,
        &mut sink,
    )
    .run(fixture.root, IntervalEnv::top())
    .expect("recursion does not fail the run");

    assert_eq!(run.diagnostics.len(), 1);
    assert_eq!(
        run.diagnostics[0].error,
        AnalysisError::UnresolvedRecursion { method: countdown }
    );
    assert_eq!(run.diagnostics[0].caller, countdown);
    assert!(run.incomplete.contains(&countdown));
    assert!(!run.incomplete.contains(&fixture.root));
    assert_eq!(run.stats.max_depth, 2);
    assert_eq!(
        sink.count(|e| matches!(e, TraceEvent::CallClobbered { .. })),
        1
    );
}

#[test]
fn depth_limit_clobbers_nested_calls() {
    let fixture = fixtures::clamp_call();
    let policy = IteratorPolicy::default().with_max_call_depth(1);
    let mut sink = NullSink;
    let run = InterproceduralContext::new(
        &fixture.program,
        &IntervalAnalysis,
        &policy,
        &AcceptAll,
        &mut sink,
    )
    .run(fixture.root, IntervalEnv::top())
    .expect("run");
    assert!(run.callee_runs.is_empty());
    assert_eq!(run.diagnostics.len(), 2);
    assert!(
        run.diagnostics
            .iter()
            .all(|d| d.error == AnalysisError::CallDepthExceeded { limit: 1 })
    );
}

struct Reject(MethodId);

impl MethodFilter for Reject {
    fn accepts(&self, id: MethodId, _method: &Method) -> bool {
        id != self.0
    }
}

#[test]
fn filtered_callees_are_clobbered() {
    let fixture = fixtures::clamp_call();
    let callee = fixture.id("clamp_get");
    let policy = IteratorPolicy::default();
    let filter = Reject(callee);
    let mut sink = NullSink;
    let run = InterproceduralContext::new(
        &fixture.program,
        &IntervalAnalysis,
        &policy,
        &filter,
        &mut sink,
    )
    .run(fixture.root, IntervalEnv::top())
    .expect("run");
    assert!(run.callee_runs.is_empty());
    assert_eq!(run.stats.clobbered_calls, 2);
    insta::assert_snapshot!(
        run.diagnostics[0].error,
        @"callee @0 cannot be analyzed: rejected by filter"
    );

    let strict = policy.with_fatal_unanalyzable(true);
    let mut sink = NullSink;
    let err = InterproceduralContext::new(
        &fixture.program,
        &IntervalAnalysis,
        &strict,
        &filter,
        &mut sink,
    )
    .run(fixture.root, IntervalEnv::top())
    .unwrap_err();
    assert!(matches!(err, AnalysisError::UnanalyzableCallee { .. }));
}

#[test]
fn unknown_root_is_an_error() {
    let fixture = fixtures::unknown_callee();
    let library = fixture.id("library_index");
    let policy = IteratorPolicy::default();
    let mut sink = NullSink;
    let err = InterproceduralContext::new(
        &fixture.program,
        &IntervalAnalysis,
        &policy,
        &AcceptAll,
        &mut sink,
    )
    .run(library, IntervalEnv::top())
    .unwrap_err();
    assert_eq!(err, AnalysisError::UnknownMethod { method: library });
}
