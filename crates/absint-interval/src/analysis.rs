use std::collections::BTreeSet;

use absint_engine::{AbstractStateMap, Analysis, CallSite};
use absint_ir::{
    BinaryOp, Condition, HasBottom, HasTop, Method, NodeKind, Operand, ParamKind, Var,
};

use crate::{Bound, Interval, IntervalEnv, IntervalSummary, ParamSym, Sym};

/// The bounds analysis: integer intervals plus the strict upper bounds
/// needed to prove `a[i]` safe under `i < a.length`.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntervalAnalysis;

impl IntervalAnalysis {
    pub fn new() -> Self {
        Self
    }

    fn binary(&self, env: &mut IntervalEnv, dst: Var, op: BinaryOp, lhs: Operand, rhs: Operand) {
        let (l, r) = (env.operand(lhs), env.operand(rhs));
        match op {
            BinaryOp::Add => {
                let result = l.add(&r);
                // x + c with c <= 0 never exceeds x
                let mut sources = Vec::new();
                if let Operand::Var(x) = lhs {
                    push_bounded(&mut sources, x, &l, &r.neg());
                }
                if let Operand::Var(y) = rhs {
                    push_bounded(&mut sources, y, &r, &l.neg());
                }
                env.assign_bounded_by(dst, result, &sources);
            }
            BinaryOp::Sub => {
                let result = l.sub(&r);
                let mut sources = Vec::new();
                if let Operand::Var(x) = lhs {
                    push_bounded(&mut sources, x, &l, &r);
                }
                env.assign_bounded_by(dst, result, &sources);
            }
            BinaryOp::Min => {
                let sources: Vec<(Var, bool)> = [lhs, rhs]
                    .iter()
                    .filter_map(|op| op.as_var())
                    .map(|v| (v, false))
                    .collect();
                env.assign_bounded_by(dst, l.min(&r), &sources);
            }
            BinaryOp::Rem => {
                env.assign(dst, l.rem(&r));
                // x % n < n for x >= 0 and n >= 1
                if let Operand::Var(n) = rhs {
                    if n != dst && l.lo() >= Bound::Finite(0) && r.lo() >= Bound::Finite(1) {
                        env.assume_below(dst, n);
                    }
                }
            }
            BinaryOp::Mul => env.assign(dst, l.mul(&r)),
            BinaryOp::Div => env.assign(dst, l.div(&r)),
            BinaryOp::Max => env.assign(dst, l.max(&r)),
            BinaryOp::And => env.assign(dst, l.and(&r)),
        }
    }
}

/// Record `dst <= src` when `gap >= 0` and `dst < src` when `gap >= 1`,
/// where `dst = src - gap`. Nothing is recorded when the subtraction may
/// wrap below `i64::MIN`, since the wrapped result lies above `src`.
fn push_bounded(sources: &mut Vec<(Var, bool)>, src: Var, value: &Interval, gap: &Interval) {
    if gap.is_empty() || !subtracts_without_wrap(value, gap) {
        return;
    }
    if gap.lo() >= Bound::Finite(1) {
        sources.push((src, true));
    } else if gap.lo() >= Bound::Finite(0) {
        sources.push((src, false));
    }
}

fn subtracts_without_wrap(value: &Interval, gap: &Interval) -> bool {
    match (value.lo(), gap.hi()) {
        (Bound::Finite(lo), Bound::Finite(hi)) => lo.checked_sub(hi).is_some(),
        _ => false,
    }
}

impl Analysis for IntervalAnalysis {
    type Domain = IntervalEnv;
    type Summary = IntervalSummary;

    fn transfer(&self, kind: &NodeKind, pre: &IntervalEnv) -> IntervalEnv {
        let mut env = pre.clone();
        match kind {
            NodeKind::Const { dst, value } => env.assign(*dst, Interval::constant(*value)),
            NodeKind::Copy { dst, src } => match src {
                Operand::Var(src) => env.copy(*dst, *src),
                Operand::Const(c) => env.assign(*dst, Interval::constant(*c)),
            },
            NodeKind::Binary { dst, op, lhs, rhs } => self.binary(&mut env, *dst, *op, *lhs, *rhs),
            NodeKind::Opaque { dst } => env.assign(*dst, Interval::top()),
            NodeKind::NewArray { dst, length } => env.allocate(*dst, *length),
            NodeKind::ArrayLength { dst, array } => env.load_length(*dst, *array),
            NodeKind::LoadIndexed {
                dst,
                array,
                index,
                known_length,
            } => {
                env.assume_in_bounds(*array, *index, *known_length);
                env.assign(*dst, Interval::top());
            }
            NodeKind::StoreIndexed {
                array,
                index,
                known_length,
                ..
            } => env.assume_in_bounds(*array, *index, *known_length),
            NodeKind::Invoke { dst: Some(dst), .. } => env.assign(*dst, Interval::top()),
            NodeKind::Start
            | NodeKind::If { .. }
            | NodeKind::Merge
            | NodeKind::Invoke { dst: None, .. }
            | NodeKind::Acquire
            | NodeKind::Release
            | NodeKind::Return { .. } => {}
        }
        env
    }

    fn branch(&self, condition: &Condition, pre: &IntervalEnv) -> (IntervalEnv, IntervalEnv) {
        (pre.assume(condition), pre.assume(&condition.negate()))
    }

    fn callee_entry(
        &self,
        site: &CallSite<'_>,
        callee: &Method,
        pre: &IntervalEnv,
    ) -> IntervalEnv {
        let mut entry = IntervalEnv::top();
        let params = callee.params();
        for (param, arg) in params.iter().zip(site.args) {
            entry = match (param.kind, arg) {
                (ParamKind::Int, arg) => entry.with_value(param.var, pre.operand(*arg)),
                (ParamKind::Array, Operand::Var(a)) => entry.with_length(param.var, pre.length(*a)),
                (ParamKind::Array, Operand::Const(_)) => entry,
            };
        }
        // relations between arguments become relations between parameters
        for (p, arg_p) in params.iter().zip(site.args) {
            let Operand::Var(x) = *arg_p else { continue };
            for (q, arg_q) in params.iter().zip(site.args) {
                let Operand::Var(y) = *arg_q else { continue };
                if p.var == q.var {
                    continue;
                }
                if q.kind == ParamKind::Int && pre.is_below(x, Sym::Var(y)) {
                    entry = entry.with_below(p.var, Sym::Var(q.var));
                }
                if q.kind == ParamKind::Array {
                    if pre.is_below(x, Sym::LengthOf(y)) {
                        entry = entry.with_below(p.var, Sym::LengthOf(q.var));
                    }
                    if pre.length_aliases(y).any(|n| n == x) {
                        entry = entry.with_length_alias(q.var, p.var);
                    }
                }
            }
        }
        entry
    }

    fn summarize(&self, callee: &Method, states: &AbstractStateMap<IntervalEnv>) -> IntervalSummary {
        let mut summary = IntervalSummary::unreachable();
        for node in callee.return_nodes() {
            let Some(env) = states.pre(node).filter(|env| env.is_reachable()) else {
                continue;
            };
            let value = match callee.kind(node) {
                Some(NodeKind::Return { value }) => *value,
                _ => None,
            };
            let (ret, length, bounds) = match value {
                Some(Operand::Var(v)) => (
                    env.value(v),
                    env.length(v),
                    param_bounds(callee, env.upper_bounds(v)),
                ),
                Some(Operand::Const(c)) => (
                    Interval::constant(c),
                    Interval::non_negative(),
                    BTreeSet::new(),
                ),
                None => (Interval::top(), Interval::non_negative(), BTreeSet::new()),
            };
            summary = summary.join(&IntervalSummary::returning(ret, length, bounds));
        }
        summary
    }

    fn apply_summary(
        &self,
        site: &CallSite<'_>,
        summary: &IntervalSummary,
        pre: &IntervalEnv,
    ) -> IntervalEnv {
        if !summary.returns() {
            return IntervalEnv::bottom();
        }
        let mut env = pre.clone();
        let Some(dst) = site.dst else {
            return env;
        };
        env.assign(dst, summary.value());
        env.constrain_length(dst, summary.length());
        for sym in summary.bounds() {
            match (*sym, site.args.get(sym.index())) {
                (ParamSym::Param(_), Some(Operand::Var(a))) if *a != dst => env.assume_below(dst, *a),
                (ParamSym::Param(_), Some(Operand::Const(c))) => {
                    env.constrain_value(dst, Interval::at_most(c.saturating_sub(1)));
                }
                (ParamSym::LengthOf(_), Some(Operand::Var(a))) if *a != dst => {
                    env.assume_below_length(dst, *a);
                }
                _ => {}
            }
        }
        env
    }

    fn clobber_call(&self, site: &CallSite<'_>, pre: &IntervalEnv) -> IntervalEnv {
        let mut env = pre.clone();
        if let Some(dst) = site.dst {
            env.assign(dst, Interval::top());
        }
        env
    }
}

/// Upper bounds expressed over parameters that keep their entry value for
/// the whole body.
fn param_bounds(callee: &Method, bounds: impl Iterator<Item = Sym>) -> BTreeSet<ParamSym> {
    let stable = |var: Var| {
        callee
            .params()
            .iter()
            .position(|p| p.var == var)
            .filter(|_| !callee.defines(var))
    };
    bounds
        .filter_map(|sym| match sym {
            Sym::Var(v) => stable(v).map(ParamSym::Param),
            Sym::LengthOf(a) => stable(a).map(ParamSym::LengthOf),
        })
        .collect()
}
