use absint::engine::{AnalysisError, RecordingSink, TraceEvent, WideningStrategy};
use absint::prelude::*;
use absint::{DefaultCheckers, analyze_methods};
use absint_test_utils::fixtures;

fn access(fixture: &fixtures::Fixture, method: MethodId) -> NodeRef {
    NodeRef::new(method, fixture.accesses(method)[0])
}

#[test]
fn guarded_access_check_is_removable() {
    let fixture = fixtures::guarded_access();
    let report = run_intra_procedural(
        &fixture.program,
        absint::interval::IntervalAnalysis::new(),
        fixture.root,
        IntervalEnv::top(),
        IteratorPolicy::default(),
    )
    .expect("run");
    let node = access(&fixture, fixture.root);
    assert_eq!(report.safety(node), Safety::Safe);
    assert_eq!(report.removable_checks().collect::<Vec<_>>(), vec![node]);
    assert!(report.is_complete());
}

#[test]
fn always_false_guard_and_constant_index() {
    let fixture = fixtures::constant_out_of_bounds();
    let report = bounds_analysis(&fixture.program)
        .run_intra_procedural(fixture.root, IntervalEnv::top())
        .expect("run");
    let guard = fixture.nodes_where(fixture.root, |kind| matches!(kind, NodeKind::If { .. }))[0];
    assert!(matches!(
        report.facts.get(NodeRef::new(fixture.root, guard), FactKind::ConditionTruth),
        Some(Fact::ConditionTruth {
            truth: Truth::AlwaysFalse,
            ..
        })
    ));
    let accesses = fixture.accesses(fixture.root);
    for node in accesses {
        assert_eq!(report.safety(NodeRef::new(fixture.root, node)), Safety::Unsafe);
    }
    assert_eq!(report.removable_checks().count(), 0);
}

#[test]
fn calling_context_proves_the_callee_access() {
    let fixture = fixtures::clamp_call();
    let callee = fixture.id("clamp_get");
    let mut sink = RecordingSink::new();
    let report = bounds_analysis(&fixture.program)
        .with_trace(&mut sink)
        .run_inter_procedural(fixture.root, IntervalEnv::top())
        .expect("run");

    assert_eq!(report.safety(access(&fixture, callee)), Safety::Safe);
    assert_eq!(report.stats.cache_misses, 1);
    assert_eq!(report.stats.cache_hits, 1);
    assert_eq!(report.callee_runs.len(), 1);
    assert!(report.is_complete());
    assert_eq!(
        sink.count(|event| matches!(event, TraceEvent::SummaryCacheHit { .. })),
        1
    );

    // the same callee analyzed on its own cannot rule out an empty array
    let alone = bounds_analysis(&fixture.program)
        .run_intra_procedural(callee, IntervalEnv::top())
        .expect("run");
    assert_eq!(alone.safety(access(&fixture, callee)), Safety::Unknown);
}

#[test]
fn facts_need_every_calling_context() {
    let fixture = fixtures::two_contexts();
    let callee = fixture.id("below_one");
    let report = bounds_analysis(&fixture.program)
        .run_inter_procedural(fixture.root, IntervalEnv::top())
        .expect("run");
    assert_eq!(report.callee_runs.len(), 2);

    let guard = NodeRef::new(
        callee,
        fixture.nodes_where(callee, |kind| matches!(kind, NodeKind::If { .. }))[0],
    );
    let copy = NodeRef::new(
        callee,
        fixture.nodes_where(callee, |kind| matches!(kind, NodeKind::Binary { .. }))[0],
    );
    assert_eq!(report.facts_in(callee).count(), 0);
    assert!(report.facts.is_conflicting(guard, FactKind::ConditionTruth));
    assert!(report.facts.is_conflicting(copy, FactKind::Constant));

    // the narrow context alone does decide both
    let mut main = MethodBuilder::new("narrow");
    let call = main.append(
        main.entry(),
        NodeKind::Invoke {
            dst: None,
            target: callee,
            args: vec![Operand::Const(0)],
        },
    );
    main.append(call, NodeKind::Return { value: None });
    let mut program = fixture.program.clone();
    let narrow = program.add(main.finish().expect("valid method"));
    let report = bounds_analysis(&program)
        .run_inter_procedural(narrow, IntervalEnv::top())
        .expect("run");
    let rendered: Vec<String> = report.facts_in(callee).map(ToString::to_string).collect();
    insta::assert_debug_snapshot!(rendered, @r#"
    [
        "@0:n1: `%0 < 1` is always true",
        "@0:n2: constant 0",
    ]
    "#);
}

#[test]
fn recursion_weakens_the_recursive_method() {
    let fixture = fixtures::recursive();
    let countdown = fixture.id("countdown");
    let report = bounds_analysis(&fixture.program)
        .run_inter_procedural(fixture.root, IntervalEnv::top())
        .expect("recursion does not fail the run");

    assert!(!report.is_complete());
    assert_eq!(
        report.diagnostics[0].error,
        AnalysisError::UnresolvedRecursion { method: countdown }
    );
    assert!(report.incomplete.contains(&countdown));

    let node = access(&fixture, countdown);
    assert!(matches!(
        report.facts.get(node, FactKind::IndexSafety),
        Some(Fact::IndexSafety {
            in_bounds: Safety::Unknown,
            ..
        })
    ));
    assert_eq!(
        report.facts_in(countdown).map(Fact::kind).collect::<Vec<_>>(),
        vec![FactKind::IndexSafety]
    );
}

#[test]
fn rejected_callees_keep_their_checks() {
    let fixture = fixtures::clamp_call();
    let callee = fixture.id("clamp_get");
    let report = run_inter_procedural(
        &fixture.program,
        absint::interval::IntervalAnalysis::new(),
        fixture.root,
        IntervalEnv::top(),
        IteratorPolicy::default(),
        move |id: MethodId, _method: &Method| id != callee,
    )
    .expect("run");
    assert!(report.callee_runs.is_empty());
    assert_eq!(report.stats.clobbered_calls, 2);
    assert_eq!(report.diagnostics.len(), 2);
    assert_eq!(report.safety(access(&fixture, callee)), Safety::Unknown);
}

#[test]
fn iteration_cap_fails_the_run() {
    let fixture = fixtures::counted_loop();
    let policy = IteratorPolicy::default()
        .with_widening(WideningStrategy::Never)
        .with_max_iterations(100);
    let err = bounds_analysis(&fixture.program)
        .with_policy(policy)
        .run_intra_procedural(fixture.root, IntervalEnv::top())
        .unwrap_err();
    insta::assert_snapshot!(err, @"fixpoint of @0 did not converge within 100 iterations");
}

#[test]
fn repeated_runs_agree() {
    let fixture = fixtures::clamp_call();
    let mut context = bounds_analysis(&fixture.program);
    let first = context
        .run_inter_procedural(fixture.root, IntervalEnv::top())
        .expect("first");
    let second = context
        .run_inter_procedural(fixture.root, IntervalEnv::top())
        .expect("second");
    let fresh = bounds_analysis(&fixture.program)
        .run_inter_procedural(fixture.root, IntervalEnv::top())
        .expect("fresh");
    for other in [&second, &fresh] {
        assert_eq!(first.states, other.states);
        assert_eq!(first.facts, other.facts);
        assert_eq!(first.stats, other.stats);
        assert_eq!(first.iterations, other.iterations);
    }
}

#[test]
fn open_resources_are_reported_at_returns() {
    let fixture = fixtures::resources();
    let report = resource_analysis(&fixture.program)
        .run_inter_procedural(fixture.root, Count::Open(0))
        .expect("run");
    let leaks: Vec<String> = report.facts.iter().map(ToString::to_string).collect();
    insta::assert_debug_snapshot!(leaks, @r#"
    [
        "@0:n5: up to 1 resource(s) may be open at return",
        "@2:n3: up to 2 resource(s) may be open at return",
    ]
    "#);

    let balanced = fixture.id("balanced");
    let alone = resource_analysis(&fixture.program)
        .run_intra_procedural(balanced, Count::Open(0))
        .expect("run");
    assert!(alone.facts.is_empty());
}

#[test]
fn parallel_batch_matches_sequential_runs() {
    let fixture = fixtures::clamp_call();
    let mut program = fixture.program.clone();
    let missing = program.declare("missing");
    let methods: Vec<MethodId> = program
        .methods()
        .map(|(id, _)| id)
        .chain([missing])
        .collect();

    let parallel = analyze_methods(&program, &methods, &IntervalEnv::top(), bounds_analysis);
    assert_eq!(parallel.len(), methods.len());
    for (id, result) in parallel {
        let sequential = bounds_analysis(&program).run_intra_procedural(id, IntervalEnv::top());
        match (result, sequential) {
            (Ok(a), Ok(b)) => {
                assert_eq!(a.states, b.states);
                assert_eq!(a.facts, b.facts);
            }
            (Err(a), Err(b)) => {
                assert_eq!(a, b);
                assert_eq!(a, AnalysisError::UnknownMethod { method: missing });
            }
            (a, b) => panic!("{id}: parallel {:?} vs sequential {:?}", a.is_ok(), b.is_ok()),
        }
    }
}

#[test]
fn preset_checkers_match_the_domain() {
    assert_eq!(absint::interval::IntervalAnalysis::default_checkers().len(), 3);
    assert_eq!(absint::count::CountAnalysis::default_checkers().len(), 1);
}

#[test]
fn fixed_summary_stands_in_for_library_code() {
    use absint::interval::IntervalSummary;

    let fixture = fixtures::unknown_callee();
    let library = fixture.id("library_index");
    let summary = IntervalSummary::returning(
        Interval::new(0, 3),
        Interval::non_negative(),
        Default::default(),
    );

    let without = bounds_analysis(&fixture.program)
        .run_inter_procedural(fixture.root, IntervalEnv::top())
        .expect("run");
    assert_eq!(without.safety(access(&fixture, fixture.root)), Safety::Unknown);

    let with = bounds_analysis(&fixture.program)
        .with_fixed_summary(library, summary)
        .run_inter_procedural(fixture.root, IntervalEnv::top())
        .expect("run");
    assert_eq!(with.safety(access(&fixture, fixture.root)), Safety::Safe);
    assert!(with.is_complete());
}
