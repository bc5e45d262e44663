//! Small programs with known analysis results.
//!
//! Every fixture is built through [`MethodBuilder`], the way a front end
//! would lower source code into the IR.

use absint_ir::{
    BinaryOp, CmpOp, Condition, Edge, Method, MethodBuilder, MethodId, NodeId, NodeKind, Operand,
    ParamKind, Program, Var,
};

/// A program together with the method an analysis should start from.
#[derive(Clone, Debug)]
pub struct Fixture {
    pub program: Program,
    pub root: MethodId,
}

impl Fixture {
    pub fn method(&self, id: MethodId) -> &Method {
        self.program
            .method(id)
            .unwrap_or_else(|| panic!("{id} is not defined"))
    }

    pub fn root_method(&self) -> &Method {
        self.method(self.root)
    }

    pub fn id(&self, name: &str) -> MethodId {
        self.program
            .lookup(name)
            .unwrap_or_else(|| panic!("no method named `{name}`"))
    }

    /// Indexed accesses of `method`, in node order.
    pub fn accesses(&self, method: MethodId) -> Vec<NodeId> {
        self.nodes_where(method, NodeKind::is_indexed_access)
    }

    pub fn returns(&self, method: MethodId) -> Vec<NodeId> {
        self.method(method).return_nodes().collect()
    }

    pub fn nodes_where(&self, method: MethodId, pred: impl Fn(&NodeKind) -> bool) -> Vec<NodeId> {
        self.method(method)
            .iter()
            .filter(|(_, kind)| pred(*kind))
            .map(|(id, _)| id)
            .collect()
    }
}

fn branch(op: CmpOp, lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> NodeKind {
    NodeKind::If {
        condition: Condition::new(op, lhs, rhs),
    }
}

fn load(dst: Var, array: Var, index: impl Into<Operand>, known_length: Option<i64>) -> NodeKind {
    NodeKind::LoadIndexed {
        dst,
        array,
        index: index.into(),
        known_length,
    }
}

fn binary(dst: Var, op: BinaryOp, lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> NodeKind {
    NodeKind::Binary {
        dst,
        op,
        lhs: lhs.into(),
        rhs: rhs.into(),
    }
}

fn finish(b: MethodBuilder) -> Method {
    b.finish().unwrap_or_else(|e| panic!("malformed fixture: {e}"))
}

fn single(method: Method) -> Fixture {
    let mut program = Program::new();
    let root = program.add(method);
    Fixture { program, root }
}

/// ```text
/// guarded_access(idx):
///   a = new int[8]
///   if idx >= 0 && idx < 8: v = a[idx]
///   return
/// ```
pub fn guarded_access() -> Fixture {
    let mut b = MethodBuilder::new("guarded_access");
    let idx = b.param(ParamKind::Int);
    let (a, v) = (b.var(), b.var());
    let alloc = b.append(
        b.entry(),
        NodeKind::NewArray {
            dst: a,
            length: Operand::Const(8),
        },
    );
    let lower = b.append(alloc, branch(CmpOp::Ge, idx, 0_i64));
    let upper = b.node(branch(CmpOp::Lt, idx, 8_i64));
    let access = b.node(load(v, a, idx, None));
    let join = b.node(NodeKind::Merge);
    b.append(join, NodeKind::Return { value: None });
    b.edge(lower, Edge::True, upper)
        .edge(lower, Edge::False, join)
        .edge(upper, Edge::True, access)
        .edge(upper, Edge::False, join)
        .edge(access, Edge::Next, join);
    single(finish(b))
}

/// ```text
/// fill(n):
///   a = new int[n]
///   for (i = 0; i < n; i++) a[i] = i
///   return
/// ```
pub fn counted_loop() -> Fixture {
    let mut b = MethodBuilder::new("fill");
    let n = b.param(ParamKind::Int);
    let (a, i) = (b.var(), b.var());
    let alloc = b.append(
        b.entry(),
        NodeKind::NewArray {
            dst: a,
            length: n.into(),
        },
    );
    let init = b.append(alloc, NodeKind::Const { dst: i, value: 0 });
    let header = b.append(init, NodeKind::Merge);
    let cond = b.append(header, branch(CmpOp::Lt, i, n));
    let store = b.node(NodeKind::StoreIndexed {
        array: a,
        index: i.into(),
        value: i.into(),
        known_length: None,
    });
    let step = b.append(store, binary(i, BinaryOp::Add, i, 1_i64));
    let exit = b.node(NodeKind::Return { value: None });
    b.edge(cond, Edge::True, store)
        .edge(cond, Edge::False, exit)
        .edge(step, Edge::Next, header);
    single(finish(b))
}

/// ```text
/// constant_indices():
///   a = new int[5]
///   x = 0
///   if x > 1: v = a[5]
///   w = a[-1]
///   return
/// ```
pub fn constant_out_of_bounds() -> Fixture {
    let mut b = MethodBuilder::new("constant_indices");
    let (a, x, v, w) = (b.var(), b.var(), b.var(), b.var());
    let alloc = b.append(
        b.entry(),
        NodeKind::NewArray {
            dst: a,
            length: Operand::Const(5),
        },
    );
    let init = b.append(alloc, NodeKind::Const { dst: x, value: 0 });
    let guard = b.append(init, branch(CmpOp::Gt, x, 1_i64));
    let dead = b.node(load(v, a, 5_i64, Some(5)));
    let join = b.node(NodeKind::Merge);
    let live = b.append(join, load(w, a, -1_i64, Some(5)));
    b.append(live, NodeKind::Return { value: None });
    b.edge(guard, Edge::True, dead)
        .edge(guard, Edge::False, join)
        .edge(dead, Edge::Next, join);
    single(finish(b))
}

/// ```text
/// clamp_get(a, i):
///   t = a.length - 1
///   j = min(max(i, 0), t)
///   return a[j]
///
/// caller():
///   arr = new int[10]
///   x = clamp_get(arr, 3)
///   y = clamp_get(arr, 3)
///   return x
/// ```
pub fn clamp_call() -> Fixture {
    let mut program = Program::new();
    let callee = program.declare("clamp_get");

    let mut b = MethodBuilder::new("clamp_get");
    let a = b.param(ParamKind::Array);
    let i = b.param(ParamKind::Int);
    let (len, t, k, j, v) = (b.var(), b.var(), b.var(), b.var(), b.var());
    let n = b.append(b.entry(), NodeKind::ArrayLength { dst: len, array: a });
    let n = b.append(n, binary(t, BinaryOp::Sub, len, 1_i64));
    let n = b.append(n, binary(k, BinaryOp::Max, i, 0_i64));
    let n = b.append(n, binary(j, BinaryOp::Min, k, t));
    let n = b.append(n, load(v, a, j, None));
    b.append(n, NodeKind::Return { value: Some(v.into()) });
    program.define(callee, finish(b));

    let mut b = MethodBuilder::new("caller");
    let (arr, x, y) = (b.var(), b.var(), b.var());
    let n = b.append(
        b.entry(),
        NodeKind::NewArray {
            dst: arr,
            length: Operand::Const(10),
        },
    );
    let n = b.append(
        n,
        NodeKind::Invoke {
            dst: Some(x),
            target: callee,
            args: vec![arr.into(), Operand::Const(3)],
        },
    );
    let n = b.append(
        n,
        NodeKind::Invoke {
            dst: Some(y),
            target: callee,
            args: vec![arr.into(), Operand::Const(3)],
        },
    );
    b.append(n, NodeKind::Return { value: Some(x.into()) });
    let root = program.add(finish(b));
    Fixture { program, root }
}

/// ```text
/// countdown(a, n):
///   if n > 0:
///     m = n - 1
///     v = a[m]
///     countdown(a, m)
///   return
///
/// main():
///   arr = new int[4]
///   countdown(arr, 3)
///   return
/// ```
pub fn recursive() -> Fixture {
    let mut program = Program::new();
    let countdown = program.declare("countdown");

    let mut b = MethodBuilder::new("countdown");
    let a = b.param(ParamKind::Array);
    let n = b.param(ParamKind::Int);
    let (m, v) = (b.var(), b.var());
    let guard = b.append(b.entry(), branch(CmpOp::Gt, n, 0_i64));
    let dec = b.node(binary(m, BinaryOp::Sub, n, 1_i64));
    let access = b.append(dec, load(v, a, m, None));
    let call = b.append(
        access,
        NodeKind::Invoke {
            dst: None,
            target: countdown,
            args: vec![a.into(), m.into()],
        },
    );
    let join = b.append(call, NodeKind::Merge);
    b.append(join, NodeKind::Return { value: None });
    b.edge(guard, Edge::True, dec).edge(guard, Edge::False, join);
    program.define(countdown, finish(b));

    let mut b = MethodBuilder::new("main");
    let arr = b.var();
    let n = b.append(
        b.entry(),
        NodeKind::NewArray {
            dst: arr,
            length: Operand::Const(4),
        },
    );
    let n = b.append(
        n,
        NodeKind::Invoke {
            dst: None,
            target: countdown,
            args: vec![arr.into(), Operand::Const(3)],
        },
    );
    b.append(n, NodeKind::Return { value: None });
    let root = program.add(finish(b));
    Fixture { program, root }
}

/// ```text
/// below_one(x):
///   if x < 1: y = x + 0
///   return
///
/// main(k):
///   below_one(0)
///   below_one(k)
///   return
/// ```
pub fn two_contexts() -> Fixture {
    let mut program = Program::new();
    let callee = program.declare("below_one");

    let mut b = MethodBuilder::new("below_one");
    let x = b.param(ParamKind::Int);
    let y = b.var();
    let guard = b.append(b.entry(), branch(CmpOp::Lt, x, 1_i64));
    let copy = b.node(binary(y, BinaryOp::Add, x, 0_i64));
    let join = b.append(copy, NodeKind::Merge);
    b.append(join, NodeKind::Return { value: None });
    b.edge(guard, Edge::True, copy).edge(guard, Edge::False, join);
    program.define(callee, finish(b));

    let mut b = MethodBuilder::new("main");
    let k = b.param(ParamKind::Int);
    let mut n = b.entry();
    for arg in [Operand::Const(0), k.into()] {
        n = b.append(
            n,
            NodeKind::Invoke {
                dst: None,
                target: callee,
                args: vec![arg],
            },
        );
    }
    b.append(n, NodeKind::Return { value: None });
    let root = program.add(finish(b));
    Fixture { program, root }
}

/// ```text
/// lookup(i):
///   k = library_index(i)     // declared, never defined
///   a = new int[4]
///   return a[k]
/// ```
pub fn unknown_callee() -> Fixture {
    let mut program = Program::new();
    let library = program.declare("library_index");

    let mut b = MethodBuilder::new("lookup");
    let i = b.param(ParamKind::Int);
    let (k, a, v) = (b.var(), b.var(), b.var());
    let n = b.append(
        b.entry(),
        NodeKind::Invoke {
            dst: Some(k),
            target: library,
            args: vec![i.into()],
        },
    );
    let n = b.append(
        n,
        NodeKind::NewArray {
            dst: a,
            length: Operand::Const(4),
        },
    );
    let n = b.append(n, load(v, a, k, None));
    b.append(n, NodeKind::Return { value: Some(v.into()) });
    let root = program.add(finish(b));
    Fixture { program, root }
}

/// ```text
/// open_file(flag):
///   acquire
///   if flag > 0: release
///   return
///
/// balanced():
///   acquire
///   release
///   return
///
/// wrapper():
///   open_file(1)
///   open_file(0)
///   return
/// ```
///
/// The root is `wrapper`.
pub fn resources() -> Fixture {
    let mut program = Program::new();

    let mut b = MethodBuilder::new("open_file");
    let flag = b.param(ParamKind::Int);
    let open = b.append(b.entry(), NodeKind::Acquire);
    let guard = b.append(open, branch(CmpOp::Gt, flag, 0_i64));
    let close = b.node(NodeKind::Release);
    b.append(close, NodeKind::Return { value: None });
    let leaked = b.node(NodeKind::Return { value: None });
    b.edge(guard, Edge::True, close).edge(guard, Edge::False, leaked);
    let open_file = program.add(finish(b));

    let mut b = MethodBuilder::new("balanced");
    let n = b.append(b.entry(), NodeKind::Acquire);
    let n = b.append(n, NodeKind::Release);
    b.append(n, NodeKind::Return { value: None });
    program.add(finish(b));

    let mut b = MethodBuilder::new("wrapper");
    let n = b.append(
        b.entry(),
        NodeKind::Invoke {
            dst: None,
            target: open_file,
            args: vec![Operand::Const(1)],
        },
    );
    let n = b.append(
        n,
        NodeKind::Invoke {
            dst: None,
            target: open_file,
            args: vec![Operand::Const(0)],
        },
    );
    b.append(n, NodeKind::Return { value: None });
    let root = program.add(finish(b));
    Fixture { program, root }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_are_well_formed() {
        for fixture in [
            guarded_access(),
            counted_loop(),
            constant_out_of_bounds(),
            clamp_call(),
            recursive(),
            unknown_callee(),
            resources(),
            two_contexts(),
        ] {
            assert!(fixture.program.method(fixture.root).is_some());
            assert!(!fixture.returns(fixture.root).is_empty());
        }
    }

    #[test]
    fn loop_header_is_detected() {
        let fixture = counted_loop();
        let method = fixture.root_method();
        let headers: Vec<_> = method.order().loop_headers().collect();
        assert_eq!(headers.len(), 1);
        assert_eq!(method.kind(headers[0]), Some(&NodeKind::Merge));
    }
}
