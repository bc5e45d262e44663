use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use absint_engine::AbstractDomain;
use absint_ir::{CmpOp, Condition, HasBottom, HasTop, Lattice, Operand, Var};

use crate::{Bound, Interval, Safety};

/// Right-hand side of a strict upper bound `x < sym`.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Sym {
    Var(Var),
    /// The length of the array held by a variable.
    LengthOf(Var),
}

impl Sym {
    fn mentions(self, var: Var) -> bool {
        match self {
            Sym::Var(v) | Sym::LengthOf(v) => v == var,
        }
    }
}

impl fmt::Display for Sym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sym::Var(v) => write!(f, "{v}"),
            Sym::LengthOf(v) => write!(f, "len({v})"),
        }
    }
}

/// Abstract state of the bounds analysis at one program point.
///
/// Variables without an entry are unconstrained. Array variables without a
/// length entry have a length in `[0, +inf)`. On top of the intervals the
/// environment keeps strict upper bounds `x < s` and, per array, the
/// variables known to equal its length.
///
/// Unconstrained entries and empty relation sets are never stored, and an
/// unreachable environment stores nothing at all, so derived equality is
/// semantic equality.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntervalEnv {
    reachable: bool,
    values: BTreeMap<Var, Interval>,
    lengths: BTreeMap<Var, Interval>,
    below: BTreeMap<Var, BTreeSet<Sym>>,
    length_aliases: BTreeMap<Var, BTreeSet<Var>>,
}

impl Default for IntervalEnv {
    fn default() -> Self {
        Self::top()
    }
}

impl IntervalEnv {
    /// Builder: constrain `var` to `interval`.
    pub fn with_value(mut self, var: Var, interval: Interval) -> Self {
        self.refine_value(var, interval);
        self
    }

    /// Builder: constrain the length of the array in `array`.
    pub fn with_length(mut self, array: Var, length: Interval) -> Self {
        self.refine_length(array, length);
        self
    }

    /// Builder: record `var < sym`.
    pub fn with_below(mut self, var: Var, sym: Sym) -> Self {
        self.add_below(var, sym);
        self.tighten();
        self
    }

    /// Builder: record `var == length(array)`.
    pub fn with_length_alias(mut self, array: Var, var: Var) -> Self {
        self.add_length_alias(array, var);
        self.tighten();
        self
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    pub fn value(&self, var: Var) -> Interval {
        if !self.reachable {
            return Interval::bottom();
        }
        self.values.get(&var).copied().unwrap_or_else(Interval::top)
    }

    pub fn operand(&self, operand: Operand) -> Interval {
        match operand {
            Operand::Var(v) => self.value(v),
            Operand::Const(c) if self.reachable => Interval::constant(c),
            Operand::Const(_) => Interval::bottom(),
        }
    }

    pub fn length(&self, array: Var) -> Interval {
        if !self.reachable {
            return Interval::bottom();
        }
        self.lengths
            .get(&array)
            .copied()
            .unwrap_or_else(Interval::non_negative)
    }

    /// Symbols known to be strictly greater than `var`.
    pub fn upper_bounds(&self, var: Var) -> impl Iterator<Item = Sym> + '_ {
        self.below.get(&var).into_iter().flatten().copied()
    }

    pub fn is_below(&self, var: Var, sym: Sym) -> bool {
        self.below.get(&var).is_some_and(|set| set.contains(&sym))
    }

    /// Variables known to equal the length of `array`.
    pub fn length_aliases(&self, array: Var) -> impl Iterator<Item = Var> + '_ {
        self.length_aliases.get(&array).into_iter().flatten().copied()
    }

    // -- assignment ----------------------------------------------------------

    /// Forget everything known about `var`: its value, its length, and every
    /// relation it takes part in.
    pub fn kill(&mut self, var: Var) {
        self.values.remove(&var);
        self.lengths.remove(&var);
        self.below.remove(&var);
        self.length_aliases.remove(&var);
        self.below.retain(|_, set| {
            set.retain(|sym| !sym.mentions(var));
            !set.is_empty()
        });
        self.length_aliases.retain(|_, set| {
            set.remove(&var);
            !set.is_empty()
        });
    }

    /// `var = <value in interval>`.
    pub fn assign(&mut self, var: Var, interval: Interval) {
        if !self.reachable {
            return;
        }
        self.kill(var);
        self.refine_value(var, interval);
    }

    /// `dst = src`: `dst` takes over every fact about `src`.
    pub fn copy(&mut self, dst: Var, src: Var) {
        if !self.reachable || dst == src {
            return;
        }
        self.kill(dst);
        if let Some(v) = self.values.get(&src).copied() {
            self.values.insert(dst, v);
        }
        if let Some(len) = self.lengths.get(&src).copied() {
            self.lengths.insert(dst, len);
        }
        if let Some(set) = self.below.get(&src).cloned() {
            self.below.insert(dst, set);
        }
        if let Some(set) = self.length_aliases.get(&src).cloned() {
            self.length_aliases.insert(dst, set);
        }
        for set in self.below.values_mut() {
            if set.contains(&Sym::Var(src)) {
                set.insert(Sym::Var(dst));
            }
            if set.contains(&Sym::LengthOf(src)) {
                set.insert(Sym::LengthOf(dst));
            }
        }
        for set in self.length_aliases.values_mut() {
            if set.contains(&src) {
                set.insert(dst);
            }
        }
    }

    /// `dst = <value in interval>` where `dst <= src` (or `dst < src` when
    /// the flag is set) is known for every listed source. Bounds are read
    /// before `dst` is killed, so a source may be `dst` itself.
    pub fn assign_bounded_by(&mut self, dst: Var, interval: Interval, sources: &[(Var, bool)]) {
        if !self.reachable {
            return;
        }
        let mut inherited = BTreeSet::new();
        for &(src, strict) in sources {
            inherited.extend(self.upper_bounds(src));
            if strict {
                inherited.insert(Sym::Var(src));
                inherited.extend(self.arrays_with_alias(src).map(Sym::LengthOf));
            }
        }
        self.assign(dst, interval);
        for sym in inherited {
            if !sym.mentions(dst) {
                self.add_below(dst, sym);
            }
        }
        self.tighten();
    }

    /// `dst = new array[length]`.
    pub fn allocate(&mut self, dst: Var, length: Operand) {
        if !self.reachable {
            return;
        }
        // a negative length throws
        if let Operand::Var(n) = length {
            self.refine_value(n, Interval::non_negative());
        }
        let len = self.operand(length);
        self.kill(dst);
        self.refine_length(dst, len);
        if let Operand::Var(n) = length {
            if n != dst {
                self.add_length_alias(dst, n);
            }
        }
    }

    /// `dst = array.length`.
    pub fn load_length(&mut self, dst: Var, array: Var) {
        if !self.reachable {
            return;
        }
        if dst == array {
            self.assign(dst, Interval::non_negative());
            return;
        }
        let len = self.length(array);
        self.kill(dst);
        self.refine_value(dst, len);
        self.add_length_alias(array, dst);
        self.tighten();
    }

    /// Continue past `array[index]`: the access did not throw, so the index
    /// is within the array.
    pub fn assume_in_bounds(&mut self, array: Var, index: Operand, known_length: Option<i64>) {
        if !self.reachable {
            return;
        }
        if let Some(len) = known_length {
            self.refine_length(array, Interval::constant(len));
        }
        let len = self.length(array);
        let valid = Interval::from_bounds(Bound::Finite(0), len.hi().pred());
        match index {
            Operand::Var(i) => {
                self.refine_value(i, valid);
                self.add_below(i, Sym::LengthOf(array));
                let aliases: Vec<Var> = self.length_aliases(array).collect();
                for n in aliases {
                    if n != i {
                        self.add_below(i, Sym::Var(n));
                    }
                }
            }
            Operand::Const(c) if !valid.contains(c) => self.set_unreachable(),
            Operand::Const(c) => {
                self.refine_length(array, Interval::at_least(c.saturating_add(1)));
            }
        }
        self.tighten();
    }

    // -- guards --------------------------------------------------------------

    /// The environment restricted to executions where `condition` holds.
    /// Bottom if it never does.
    pub fn assume(&self, condition: &Condition) -> IntervalEnv {
        let mut env = self.clone();
        if !env.reachable {
            return env;
        }
        let op = condition.op;
        match (condition.lhs, condition.rhs) {
            (Operand::Const(l), Operand::Const(r)) => {
                if !op.eval(l, r) {
                    env.set_unreachable();
                }
            }
            (Operand::Var(x), Operand::Const(c)) => {
                let refined = restrict(env.value(x), op, &Interval::constant(c));
                env.refine_value(x, refined);
            }
            (Operand::Const(c), Operand::Var(y)) => {
                let refined = restrict(env.value(y), op.swap(), &Interval::constant(c));
                env.refine_value(y, refined);
            }
            (Operand::Var(x), Operand::Var(y)) => env.assume_relation(op, x, y),
        }
        env.tighten();
        env
    }

    fn assume_relation(&mut self, op: CmpOp, x: Var, y: Var) {
        if x == y {
            if matches!(op, CmpOp::Lt | CmpOp::Gt | CmpOp::Ne) {
                self.set_unreachable();
            }
            return;
        }
        let (vx, vy) = (self.value(x), self.value(y));
        self.refine_value(x, restrict(vx, op, &vy));
        self.refine_value(y, restrict(vy, op.swap(), &vx));
        match op {
            CmpOp::Lt => self.assume_less(x, y, true),
            CmpOp::Le => self.assume_less(x, y, false),
            CmpOp::Gt => self.assume_less(y, x, true),
            CmpOp::Ge => self.assume_less(y, x, false),
            CmpOp::Eq => {
                self.assume_less(x, y, false);
                self.assume_less(y, x, false);
                let arrays: Vec<Var> = self
                    .length_aliases
                    .iter()
                    .filter(|(_, set)| set.contains(&x) || set.contains(&y))
                    .map(|(a, _)| *a)
                    .collect();
                for array in arrays {
                    self.add_length_alias(array, x);
                    self.add_length_alias(array, y);
                }
            }
            CmpOp::Ne => {}
        }
    }

    /// `x < y` (or `x <= y`): `x` inherits every upper bound of `y`.
    fn assume_less(&mut self, x: Var, y: Var, strict: bool) {
        let mut inherited: BTreeSet<Sym> = self.upper_bounds(y).collect();
        if strict {
            inherited.insert(Sym::Var(y));
            inherited.extend(self.arrays_with_alias(y).map(Sym::LengthOf));
        }
        for sym in inherited {
            self.add_below(x, sym);
        }
    }

    /// Record `var < bound`.
    pub fn assume_below(&mut self, var: Var, bound: Var) {
        if var == bound {
            self.set_unreachable();
            return;
        }
        self.assume_less(var, bound, true);
        self.tighten();
    }

    /// Record `var < length(array)`.
    pub fn assume_below_length(&mut self, var: Var, array: Var) {
        self.add_below(var, Sym::LengthOf(array));
        let aliases: Vec<Var> = self.length_aliases(array).collect();
        for n in aliases {
            if n != var {
                self.add_below(var, Sym::Var(n));
            }
        }
        self.tighten();
    }

    /// Meet the value of `var` with `interval`.
    pub fn constrain_value(&mut self, var: Var, interval: Interval) {
        self.refine_value(var, interval);
        self.tighten();
    }

    /// Meet the length of the array in `array` with `length`.
    pub fn constrain_length(&mut self, array: Var, length: Interval) {
        self.refine_length(array, length);
        self.tighten();
    }

    // -- queries -------------------------------------------------------------

    /// Classify `array[index]` under this environment.
    ///
    /// Returns the verdict, the index range, and the length range
    /// (`known_length` included).
    pub fn index_safety(
        &self,
        array: Var,
        index: Operand,
        known_length: Option<i64>,
    ) -> (Safety, Interval, Interval) {
        let mut length = self.length(array);
        if let Some(len) = known_length {
            length = length.meet(&Interval::constant(len));
        }
        let range = self.operand(index);
        let mut safety = range.index_safety(&length);
        if let (Safety::Unknown, Operand::Var(i)) = (safety, index) {
            let bounded = self.is_below(i, Sym::LengthOf(array))
                || self
                    .length_aliases(array)
                    .any(|n| self.is_below(i, Sym::Var(n)));
            if bounded && range.lo() >= Bound::Finite(0) {
                safety = Safety::Safe;
            }
        }
        (safety, range, length)
    }

    /// `Some(truth)` when `condition` is decided under this environment.
    pub fn decide(&self, condition: &Condition) -> Option<bool> {
        if !self.reachable {
            return None;
        }
        match (
            self.assume(condition).reachable,
            self.assume(&condition.negate()).reachable,
        ) {
            (true, false) => Some(true),
            (false, true) => Some(false),
            _ => None,
        }
    }

    // -- internals -----------------------------------------------------------

    fn set_unreachable(&mut self) {
        *self = Self::bottom();
    }

    /// Meet the value of `var` with `interval`.
    fn refine_value(&mut self, var: Var, interval: Interval) {
        if !self.reachable {
            return;
        }
        let refined = self.value(var).meet(&interval);
        if refined.is_empty() {
            self.set_unreachable();
        } else if refined.is_top() {
            self.values.remove(&var);
        } else {
            self.values.insert(var, refined);
        }
    }

    /// Meet the length of `array` with `length`.
    fn refine_length(&mut self, array: Var, length: Interval) {
        if !self.reachable {
            return;
        }
        let refined = self.length(array).meet(&length);
        if refined.is_empty() {
            self.set_unreachable();
        } else if refined == Interval::non_negative() {
            self.lengths.remove(&array);
        } else {
            self.lengths.insert(array, refined);
        }
    }

    fn add_below(&mut self, var: Var, sym: Sym) {
        if !self.reachable {
            return;
        }
        if sym == Sym::Var(var) {
            self.set_unreachable();
            return;
        }
        if let Sym::Var(y) = sym {
            if self.is_below(y, Sym::Var(var)) {
                self.set_unreachable();
                return;
            }
        }
        self.below.entry(var).or_default().insert(sym);
    }

    fn add_length_alias(&mut self, array: Var, var: Var) {
        if !self.reachable {
            return;
        }
        self.length_aliases.entry(array).or_default().insert(var);
        for (x, set) in self.below.iter_mut() {
            if *x == var {
                continue;
            }
            if set.contains(&Sym::LengthOf(array)) {
                set.insert(Sym::Var(var));
            }
            if set.contains(&Sym::Var(var)) && *x != array {
                set.insert(Sym::LengthOf(array));
            }
        }
    }

    fn arrays_with_alias(&self, var: Var) -> impl Iterator<Item = Var> + '_ {
        self.length_aliases
            .iter()
            .filter(move |(_, set)| set.contains(&var))
            .map(|(array, _)| *array)
    }

    /// Push relations into the intervals: `x < s` caps `x` below `s` and
    /// lifts `s` above `x`; a length alias equals its array's length. Two
    /// sweeps catch short chains; the result is sound after any number.
    fn tighten(&mut self) {
        for _ in 0..2 {
            if !self.reachable {
                return;
            }
            let relations: Vec<(Var, Sym)> = self
                .below
                .iter()
                .flat_map(|(x, set)| set.iter().map(move |s| (*x, *s)))
                .collect();
            for (x, sym) in relations {
                let upper = self.sym_value(sym);
                self.refine_value(x, Interval::from_bounds(Bound::NegInf, upper.hi().pred()));
                let lower = Interval::from_bounds(self.value(x).lo().succ(), Bound::PosInf);
                match sym {
                    Sym::Var(y) => self.refine_value(y, lower),
                    Sym::LengthOf(a) => self.refine_length(a, lower),
                }
            }
            let aliases: Vec<(Var, Var)> = self
                .length_aliases
                .iter()
                .flat_map(|(a, set)| set.iter().map(move |n| (*a, *n)))
                .collect();
            for (array, n) in aliases {
                let len = self.length(array);
                self.refine_value(n, len);
                let value = self.value(n);
                self.refine_length(array, value);
            }
        }
    }

    fn sym_value(&self, sym: Sym) -> Interval {
        match sym {
            Sym::Var(v) => self.value(v),
            Sym::LengthOf(a) => self.length(a),
        }
    }
}

/// Values of `value` satisfying `value op bound`.
fn restrict(value: Interval, op: CmpOp, bound: &Interval) -> Interval {
    match op {
        CmpOp::Lt => value.restrict_less(bound),
        CmpOp::Le => value.restrict_less_eq(bound),
        CmpOp::Gt => value.restrict_greater(bound),
        CmpOp::Ge => value.restrict_greater_or_equal(bound),
        CmpOp::Eq => value.meet(bound),
        CmpOp::Ne => value.restrict_not_equal(bound),
    }
}

/// Pointwise combination of two sparse interval maps whose missing entries
/// stand for `default`. Entries equal to `default` are dropped.
fn combine(
    a: &BTreeMap<Var, Interval>,
    b: &BTreeMap<Var, Interval>,
    default: Interval,
    op: impl Fn(&Interval, &Interval) -> Interval,
) -> BTreeMap<Var, Interval> {
    let keys: BTreeSet<Var> = a.keys().chain(b.keys()).copied().collect();
    keys.into_iter()
        .filter_map(|k| {
            let x = a.get(&k).copied().unwrap_or(default);
            let y = b.get(&k).copied().unwrap_or(default);
            let r = op(&x, &y);
            (r != default).then_some((k, r))
        })
        .collect()
}

/// Keep the relations present on both sides.
fn intersect<K: Ord + Copy, V: Ord + Copy>(
    a: &BTreeMap<K, BTreeSet<V>>,
    b: &BTreeMap<K, BTreeSet<V>>,
) -> BTreeMap<K, BTreeSet<V>> {
    a.iter()
        .filter_map(|(k, set)| {
            let other = b.get(k)?;
            let common: BTreeSet<V> = set.intersection(other).copied().collect();
            (!common.is_empty()).then_some((*k, common))
        })
        .collect()
}

/// Keep the relations present on either side.
fn unite<K: Ord + Copy, V: Ord + Copy>(
    a: &BTreeMap<K, BTreeSet<V>>,
    b: &BTreeMap<K, BTreeSet<V>>,
) -> BTreeMap<K, BTreeSet<V>> {
    let mut out = a.clone();
    for (k, set) in b {
        out.entry(*k).or_default().extend(set.iter().copied());
    }
    out
}

fn is_subset<K: Ord, V: Ord>(
    small: &BTreeMap<K, BTreeSet<V>>,
    large: &BTreeMap<K, BTreeSet<V>>,
) -> bool {
    small
        .iter()
        .all(|(k, set)| large.get(k).is_some_and(|other| set.is_subset(other)))
}

impl IntervalEnv {
    /// Combine two reachable environments whose maps may now hold empty
    /// intervals; any empty interval makes the result unreachable.
    fn from_parts(
        values: BTreeMap<Var, Interval>,
        lengths: BTreeMap<Var, Interval>,
        below: BTreeMap<Var, BTreeSet<Sym>>,
        length_aliases: BTreeMap<Var, BTreeSet<Var>>,
    ) -> Self {
        if values.values().chain(lengths.values()).any(Interval::is_empty) {
            return Self::bottom();
        }
        IntervalEnv {
            reachable: true,
            values,
            lengths,
            below,
            length_aliases,
        }
    }
}

impl Lattice for IntervalEnv {
    fn join(&self, other: &Self) -> Self {
        if !self.reachable {
            return other.clone();
        }
        if !other.reachable {
            return self.clone();
        }
        Self::from_parts(
            combine(&self.values, &other.values, Interval::top(), Interval::join),
            combine(
                &self.lengths,
                &other.lengths,
                Interval::non_negative(),
                Interval::join,
            ),
            intersect(&self.below, &other.below),
            intersect(&self.length_aliases, &other.length_aliases),
        )
    }

    fn meet(&self, other: &Self) -> Self {
        if !self.reachable || !other.reachable {
            return Self::bottom();
        }
        Self::from_parts(
            combine(&self.values, &other.values, Interval::top(), Interval::meet),
            combine(
                &self.lengths,
                &other.lengths,
                Interval::non_negative(),
                Interval::meet,
            ),
            unite(&self.below, &other.below),
            unite(&self.length_aliases, &other.length_aliases),
        )
    }

    fn is_subseteq(&self, other: &Self) -> bool {
        if !self.reachable {
            return true;
        }
        if !other.reachable {
            return false;
        }
        other
            .values
            .iter()
            .all(|(v, i)| self.value(*v).is_subseteq(i))
            && other
                .lengths
                .iter()
                .all(|(a, i)| self.length(*a).is_subseteq(i))
            && is_subset(&other.below, &self.below)
            && is_subset(&other.length_aliases, &self.length_aliases)
    }
}

impl HasBottom for IntervalEnv {
    fn bottom() -> Self {
        IntervalEnv {
            reachable: false,
            values: BTreeMap::new(),
            lengths: BTreeMap::new(),
            below: BTreeMap::new(),
            length_aliases: BTreeMap::new(),
        }
    }
}

impl HasTop for IntervalEnv {
    fn top() -> Self {
        IntervalEnv {
            reachable: true,
            ..Self::bottom()
        }
    }
}

impl AbstractDomain for IntervalEnv {
    fn is_bottom(&self) -> bool {
        !self.reachable
    }

    fn widen(&self, next: &Self) -> Self {
        if !self.reachable {
            return next.clone();
        }
        if !next.reachable {
            return self.clone();
        }
        Self::from_parts(
            combine(&self.values, &next.values, Interval::top(), Interval::widen),
            combine(
                &self.lengths,
                &next.lengths,
                Interval::non_negative(),
                |a, b| a.widen(b).meet(&Interval::non_negative()),
            ),
            intersect(&self.below, &next.below),
            intersect(&self.length_aliases, &next.length_aliases),
        )
    }

    fn narrow(&self, next: &Self) -> Self {
        if !self.reachable || !next.reachable {
            return Self::bottom();
        }
        Self::from_parts(
            combine(&self.values, &next.values, Interval::top(), Interval::narrow),
            combine(
                &self.lengths,
                &next.lengths,
                Interval::non_negative(),
                Interval::narrow,
            ),
            unite(&self.below, &next.below),
            unite(&self.length_aliases, &next.length_aliases),
        )
    }
}

impl fmt::Display for IntervalEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.reachable {
            return f.write_str("unreachable");
        }
        let mut parts = Vec::new();
        for (v, i) in &self.values {
            parts.push(format!("{v} in {i}"));
        }
        for (a, i) in &self.lengths {
            parts.push(format!("len({a}) in {i}"));
        }
        for (v, set) in &self.below {
            for sym in set {
                parts.push(format!("{v} < {sym}"));
            }
        }
        for (a, set) in &self.length_aliases {
            for n in set {
                parts.push(format!("{n} == len({a})"));
            }
        }
        write!(f, "{{{}}}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use absint_ir::CmpOp;
    use absint_test_utils::lattice::{assert_domain_laws, assert_join_semilattice_laws};

    fn var(n: u32) -> Var {
        Var::new(n)
    }

    fn samples() -> Vec<IntervalEnv> {
        let (a, i, n) = (var(0), var(1), var(2));
        vec![
            IntervalEnv::top().with_value(i, Interval::new(0, 7)),
            IntervalEnv::top().with_value(i, Interval::at_least(3)),
            IntervalEnv::top().with_length(a, Interval::constant(8)),
            IntervalEnv::top().with_below(i, Sym::LengthOf(a)),
            IntervalEnv::top()
                .with_below(i, Sym::Var(n))
                .with_length_alias(a, n),
        ]
    }

    #[test]
    fn env_join_laws() {
        assert_join_semilattice_laws(&samples());
    }

    #[test]
    fn env_widen_narrow_contracts() {
        assert_domain_laws(&samples());
    }

    #[test]
    fn guards_narrow_to_valid_indices() {
        let (a, idx) = (var(0), var(1));
        let mut env = IntervalEnv::top();
        env.allocate(a, Operand::Const(8));
        let env = env
            .assume(&Condition::new(CmpOp::Ge, idx, 0_i64))
            .assume(&Condition::new(CmpOp::Lt, idx, 8_i64));
        assert_eq!(env.value(idx), Interval::new(0, 7));
        let (safety, range, length) = env.index_safety(a, idx.into(), None);
        assert_eq!(safety, Safety::Safe);
        assert_eq!(range, Interval::new(0, 7));
        assert_eq!(length, Interval::constant(8));
    }

    #[test]
    fn symbolic_bound_proves_loop_access() {
        let (a, i, n) = (var(0), var(1), var(2));
        let mut env = IntervalEnv::top();
        env.allocate(a, n.into());
        env.assign(i, Interval::at_least(0));
        let inside = env.assume(&Condition::new(CmpOp::Lt, i, n));
        assert!(inside.is_below(i, Sym::LengthOf(a)));
        assert_eq!(inside.index_safety(a, i.into(), None).0, Safety::Safe);
        // without the lower bound the access stays checked
        let mut loose = IntervalEnv::top();
        loose.allocate(a, n.into());
        let loose = loose.assume(&Condition::new(CmpOp::Lt, i, n));
        assert_eq!(loose.index_safety(a, i.into(), None).0, Safety::Unknown);
    }

    #[test]
    fn length_load_aliases_the_array() {
        let (a, len, t, j) = (var(0), var(1), var(2), var(3));
        let mut env = IntervalEnv::top().with_length(a, Interval::constant(10));
        env.load_length(len, a);
        assert_eq!(env.value(len), Interval::constant(10));
        env.assign_bounded_by(t, env.value(len).sub(&Interval::constant(1)), &[(len, true)]);
        assert!(env.is_below(t, Sym::LengthOf(a)));
        env.assign_bounded_by(j, Interval::new(0, 9), &[(t, false)]);
        assert_eq!(env.index_safety(a, j.into(), None).0, Safety::Safe);
    }

    #[test]
    fn constant_index_outside_length_is_unsafe() {
        let a = var(0);
        let mut env = IntervalEnv::top();
        env.allocate(a, Operand::Const(5));
        assert_eq!(env.index_safety(a, Operand::Const(5), None).0, Safety::Unsafe);
        assert_eq!(env.index_safety(a, Operand::Const(-1), None).0, Safety::Unsafe);
        assert_eq!(env.index_safety(a, Operand::Const(4), None).0, Safety::Safe);
        env.assume_in_bounds(a, Operand::Const(5), None);
        assert!(!env.is_reachable());
    }

    #[test]
    fn contradictory_guards_are_unreachable() {
        let (x, y) = (var(0), var(1));
        let env = IntervalEnv::top().with_value(x, Interval::constant(0));
        assert!(!env.assume(&Condition::new(CmpOp::Gt, x, 1_i64)).is_reachable());
        assert_eq!(env.decide(&Condition::new(CmpOp::Gt, x, 1_i64)), Some(false));
        assert_eq!(env.decide(&Condition::new(CmpOp::Eq, x, 0_i64)), Some(true));
        assert_eq!(env.decide(&Condition::new(CmpOp::Lt, x, y)), None);
        let ordered = env.assume(&Condition::new(CmpOp::Lt, x, y));
        assert!(!ordered.assume(&Condition::new(CmpOp::Ge, x, y)).is_reachable());
    }

    #[test]
    fn kill_drops_relations() {
        let (a, i, n) = (var(0), var(1), var(2));
        let mut env = IntervalEnv::top()
            .with_below(i, Sym::Var(n))
            .with_length_alias(a, n);
        env.assign(n, Interval::top());
        assert!(!env.is_below(i, Sym::Var(n)));
        assert_eq!(env.length_aliases(a).count(), 0);
        assert!(env.is_below(i, Sym::LengthOf(a)));
    }

    #[test]
    fn join_keeps_common_facts() {
        let (a, i) = (var(0), var(1));
        let left = IntervalEnv::top()
            .with_value(i, Interval::new(0, 3))
            .with_below(i, Sym::LengthOf(a));
        let right = IntervalEnv::top().with_value(i, Interval::new(5, 9));
        let joined = left.join(&right);
        assert_eq!(joined.value(i), Interval::new(0, 9));
        assert!(!joined.is_below(i, Sym::LengthOf(a)));
        assert_eq!(left.join(&IntervalEnv::bottom()), left);
    }

    #[test]
    fn display() {
        let (a, i, n) = (var(0), var(1), var(2));
        let env = IntervalEnv::top()
            .with_value(i, Interval::new(0, 7))
            .with_below(i, Sym::Var(n))
            .with_length_alias(a, n);
        insta::assert_snapshot!(env, @"{%1 in [0, 7], %2 in [1, +inf], len(%0) in [1, +inf], %1 < %2, %1 < len(%0), %2 == len(%0)}");
        insta::assert_snapshot!(IntervalEnv::bottom(), @"unreachable");
    }
}
