use absint_engine::{
    AcceptAll, FixpointIterator, InterproceduralContext, Intraprocedural, IteratorPolicy, NullSink,
    RecordingSink, Solution, TraceEvent,
};
use absint_interval::{Interval, IntervalAnalysis, IntervalEnv, Safety};
use absint_ir::{
    BinaryOp, CmpOp, Condition, Edge, HasTop, Method, MethodBuilder, MethodId, NodeId, NodeKind,
    Operand, ParamKind, Program,
};
use absint_test_utils::fixtures::{self, Fixture};

fn solve(fixture: &Fixture, id: MethodId, entry: IntervalEnv) -> Solution<IntervalEnv> {
    let policy = IteratorPolicy::default();
    let mut sink = NullSink;
    let mut calls = Intraprocedural::new(&mut sink);
    FixpointIterator::new(&IntervalAnalysis, &policy, id, fixture.method(id))
        .run(entry, &mut calls)
        .expect("intraprocedural run")
}

fn safety_at(method: &Method, solution: &Solution<IntervalEnv>, node: NodeId) -> Safety {
    let (array, index, known) = method
        .kind(node)
        .and_then(NodeKind::access)
        .expect("indexed access");
    let pre = solution.states.pre(node).expect("reached access");
    pre.index_safety(array, index, known).0
}

#[test]
fn guard_pair_proves_access() {
    let fixture = fixtures::guarded_access();
    let solution = solve(&fixture, fixture.root, IntervalEnv::top());
    let method = fixture.root_method();
    let access = fixture.accesses(fixture.root)[0];
    let idx = method.params()[0].var;
    assert_eq!(solution.states.pre(access).map(|env| env.value(idx)), Some(Interval::new(0, 7)));
    assert_eq!(safety_at(method, &solution, access), Safety::Safe);
}

#[test]
fn loop_over_symbolic_length_is_safe() {
    let fixture = fixtures::counted_loop();
    let solution = solve(&fixture, fixture.root, IntervalEnv::top());
    let method = fixture.root_method();
    let store = fixture.accesses(fixture.root)[0];
    assert_eq!(safety_at(method, &solution, store), Safety::Safe);

    let header = method.order().loop_headers().next().expect("loop header");
    let i = match method.kind(store) {
        Some(NodeKind::StoreIndexed {
            index: Operand::Var(i),
            ..
        }) => *i,
        other => panic!("unexpected node {other:?}"),
    };
    let at_header = solution.states.pre(header).expect("header reached");
    assert_eq!(at_header.value(i), Interval::at_least(0));
}

#[test]
fn constant_indices_outside_the_array() {
    let fixture = fixtures::constant_out_of_bounds();
    let solution = solve(&fixture, fixture.root, IntervalEnv::top());
    let method = fixture.root_method();
    let accesses = fixture.accesses(fixture.root);
    let &[dead, live] = accesses.as_slice() else {
        panic!("expected two accesses");
    };
    assert!(!solution.states.is_reachable(dead));
    assert_eq!(safety_at(method, &solution, live), Safety::Unsafe);
    // nothing after a failing access is reachable
    let ret = fixture.returns(fixture.root)[0];
    assert!(!solution.states.is_reachable(ret));
}

#[test]
fn clamp_needs_the_calling_context() {
    let fixture = fixtures::clamp_call();
    let callee = fixture.id("clamp_get");
    let access = fixture.accesses(callee)[0];

    let alone = solve(&fixture, callee, IntervalEnv::top());
    assert_eq!(safety_at(fixture.method(callee), &alone, access), Safety::Unknown);

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
    .expect("interprocedural run");

    assert_eq!(run.callee_runs.len(), 1);
    let states = &run.callee_runs[0].states;
    let (array, index, known) = fixture
        .method(callee)
        .kind(access)
        .and_then(NodeKind::access)
        .expect("indexed access");
    let pre = states.pre(access).expect("reached");
    assert_eq!(pre.index_safety(array, index, known).0, Safety::Safe);

    assert_eq!(run.stats.cache_misses, 1);
    assert_eq!(run.stats.cache_hits, 1);
    assert!(run.diagnostics.is_empty());
    assert_eq!(
        sink.count(|e| matches!(e, TraceEvent::SummaryCacheHit { .. })),
        1
    );
}

/// ```text
/// below(a, i):
///   len = a.length
///   if i < len: return i
///   t = len - 1
///   return t
///
/// main(k, n):
///   arr = new int[n]
///   r = below(arr, k)
///   if r >= 0: v = arr[r]
///   return
/// ```
fn relational_summary() -> (Program, MethodId, MethodId) {
    let mut program = Program::new();

    let mut b = MethodBuilder::new("below");
    let a = b.param(ParamKind::Array);
    let i = b.param(ParamKind::Int);
    let (len, t) = (b.var(), b.var());
    let load = b.append(b.entry(), NodeKind::ArrayLength { dst: len, array: a });
    let guard = b.append(
        load,
        NodeKind::If {
            condition: Condition::new(CmpOp::Lt, i, len),
        },
    );
    let early = b.node(NodeKind::Return { value: Some(i.into()) });
    let dec = b.node(NodeKind::Binary {
        dst: t,
        op: BinaryOp::Sub,
        lhs: len.into(),
        rhs: Operand::Const(1),
    });
    b.append(dec, NodeKind::Return { value: Some(t.into()) });
    b.edge(guard, Edge::True, early).edge(guard, Edge::False, dec);
    let below = program.add(b.finish().expect("valid callee"));

    let mut b = MethodBuilder::new("main");
    let k = b.param(ParamKind::Int);
    let n = b.param(ParamKind::Int);
    let (arr, r, v) = (b.var(), b.var(), b.var());
    let alloc = b.append(
        b.entry(),
        NodeKind::NewArray {
            dst: arr,
            length: n.into(),
        },
    );
    let call = b.append(
        alloc,
        NodeKind::Invoke {
            dst: Some(r),
            target: below,
            args: vec![arr.into(), k.into()],
        },
    );
    let guard = b.append(
        call,
        NodeKind::If {
            condition: Condition::new(CmpOp::Ge, r, 0_i64),
        },
    );
    let access = b.node(NodeKind::LoadIndexed {
        dst: v,
        array: arr,
        index: r.into(),
        known_length: None,
    });
    let join = b.node(NodeKind::Merge);
    b.append(join, NodeKind::Return { value: None });
    b.edge(guard, Edge::True, access)
        .edge(guard, Edge::False, join)
        .edge(access, Edge::Next, join);
    let main = program.add(b.finish().expect("valid caller"));
    (program, main, below)
}

#[test]
fn summaries_carry_relations_to_parameters() {
    let (program, main, below) = relational_summary();
    let policy = IteratorPolicy::default();
    let mut sink = NullSink;
    let context = InterproceduralContext::new(
        &program,
        &IntervalAnalysis,
        &policy,
        &AcceptAll,
        &mut sink,
    );
    let run = context.run(main, IntervalEnv::top()).expect("run");
    assert_eq!(run.callee_runs[0].method, below);

    let method = program.method(main).expect("main");
    let access = method
        .iter()
        .find(|(_, kind)| kind.is_indexed_access())
        .map(|(id, _)| id)
        .expect("access");
    assert_eq!(safety_at(method, &run.solution, access), Safety::Safe);
}

#[test]
fn clobbered_call_result_is_unknown() {
    let fixture = fixtures::unknown_callee();
    let policy = IteratorPolicy::default();
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
    assert_eq!(run.diagnostics.len(), 1);
    let access = fixture.accesses(fixture.root)[0];
    assert_eq!(
        safety_at(fixture.root_method(), &run.solution, access),
        Safety::Unknown
    );
}

#[test]
fn decrement_near_the_minimum_keeps_no_relation() {
    use absint_engine::Analysis;
    use absint_ir::Var;

    let (x, y) = (Var::new(0), Var::new(1));
    let decrement = NodeKind::Binary {
        dst: y,
        op: BinaryOp::Sub,
        lhs: x.into(),
        rhs: Operand::Const(1),
    };
    let below = Condition::new(CmpOp::Lt, y, x);

    let mut env = IntervalEnv::top();
    env.assign(x, Interval::new(0, 10));
    let after = IntervalAnalysis.transfer(&decrement, &env);
    assert_eq!(after.decide(&below), Some(true));

    // i64::MIN - 1 wraps to the maximum
    env.assign(x, Interval::new(i64::MIN, 0));
    let after = IntervalAnalysis.transfer(&decrement, &env);
    assert_eq!(after.decide(&below), None);
}
