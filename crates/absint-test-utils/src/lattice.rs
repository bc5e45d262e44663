//! Law checks for lattices and abstract domains.
//!
//! Each check runs over a caller-provided sample and gathers every
//! violation before panicking, so one failing run shows the whole picture.
//!
//! ```
//! use absint_test_utils::lattice::assert_join_laws;
//! # use absint_ir::Lattice;
//! # #[derive(Debug, PartialEq, Clone, Copy)]
//! # struct Flag(bool);
//! # impl Lattice for Flag {
//! #     fn join(&self, o: &Self) -> Self { Flag(self.0 || o.0) }
//! #     fn meet(&self, o: &Self) -> Self { Flag(self.0 && o.0) }
//! #     fn is_subseteq(&self, o: &Self) -> bool { !self.0 || o.0 }
//! # }
//! assert_join_laws(&[Flag(false), Flag(true)]);
//! ```

use std::fmt::{Debug, Write};

use absint_engine::AbstractDomain;
use absint_ir::{HasBottom, HasTop, Lattice};

#[derive(Default)]
struct Violations(Vec<String>);

impl Violations {
    fn check(&mut self, holds: bool, describe: impl FnOnce() -> String) {
        if !holds {
            self.0.push(describe());
        }
    }

    fn finish(self) {
        if self.0.is_empty() {
            return;
        }
        let mut msg = format!("{} law violation(s):\n", self.0.len());
        for (i, v) in self.0.iter().enumerate() {
            let _ = writeln!(msg, "  {}. {v}", i + 1);
        }
        panic!("{msg}");
    }
}

/// `join` is commutative, associative and idempotent on `elements`.
pub fn assert_join_laws<L: Lattice + PartialEq + Debug>(elements: &[L]) {
    let mut v = Violations::default();
    join_laws(elements, &mut v);
    v.finish();
}

/// `meet` is commutative, associative and idempotent on `elements`.
pub fn assert_meet_laws<L: Lattice + PartialEq + Debug>(elements: &[L]) {
    let mut v = Violations::default();
    meet_laws(elements, &mut v);
    v.finish();
}

/// Join and meet laws, absorption, and agreement of `is_subseteq` with
/// both operations.
pub fn assert_lattice_laws<L: Lattice + PartialEq + Debug>(elements: &[L]) {
    let mut v = Violations::default();
    join_laws(elements, &mut v);
    meet_laws(elements, &mut v);
    order_laws(elements, &mut v);
    v.finish();
}

/// [`assert_lattice_laws`] plus the identities of bottom and top. Bottom and
/// top are added to the sample.
pub fn assert_finite_lattice_laws<L: HasBottom + HasTop + PartialEq + Clone + Debug>(elements: &[L]) {
    let mut v = Violations::default();
    let sample = with_extremes(elements);
    join_laws(&sample, &mut v);
    meet_laws(&sample, &mut v);
    order_laws(&sample, &mut v);
    extreme_laws(&sample, &mut v);
    v.finish();
}

/// Bottom is the identity of join and top absorbs it. Needs neither meet
/// nor the lattice order to agree with join, so it suits domains whose
/// meet is only an approximation.
pub fn assert_join_semilattice_laws<L: HasBottom + HasTop + PartialEq + Clone + Debug>(elements: &[L]) {
    let mut v = Violations::default();
    let sample = with_extremes(elements);
    join_laws(&sample, &mut v);
    let (bot, top) = (L::bottom(), L::top());
    for x in &sample {
        v.check(bot.join(x) == *x, || format!("bottom.join({x:?}) != {x:?}"));
        v.check(top.join(x) == top, || format!("top.join({x:?}) != top"));
        v.check(x.is_subseteq(&top), || format!("{x:?} not below top"));
    }
    v.finish();
}

/// Widening and narrowing contracts of an [`AbstractDomain`]:
///
/// - `a ⊑ widen(a, b)` and `b ⊑ widen(a, b)`
/// - `a ⊓ b ⊑ narrow(a, b) ⊑ a`
/// - `is_bottom` holds exactly for bottom
pub fn assert_domain_laws<D: AbstractDomain + HasTop>(elements: &[D]) {
    let mut v = Violations::default();
    let sample = with_extremes(elements);
    for a in &sample {
        v.check(a.is_bottom() == (*a == D::bottom()), || {
            format!("is_bottom disagrees with equality on {a:?}")
        });
        for b in &sample {
            let widened = a.widen(b);
            v.check(a.is_subseteq(&widened) && b.is_subseteq(&widened), || {
                format!("widen({a:?}, {b:?}) = {widened:?} is not an upper bound")
            });
            let narrowed = a.narrow(b);
            v.check(narrowed.is_subseteq(a), || {
                format!("narrow({a:?}, {b:?}) = {narrowed:?} exceeds the first operand")
            });
            let met = a.meet(b);
            v.check(met.is_subseteq(&narrowed), || {
                format!("narrow({a:?}, {b:?}) = {narrowed:?} drops part of the meet {met:?}")
            });
        }
    }
    v.finish();
}

fn with_extremes<L: HasBottom + HasTop + PartialEq + Clone>(elements: &[L]) -> Vec<L> {
    let mut sample = vec![L::bottom(), L::top()];
    for e in elements {
        if !sample.contains(e) {
            sample.push(e.clone());
        }
    }
    sample
}

fn join_laws<L: Lattice + PartialEq + Debug>(elements: &[L], v: &mut Violations) {
    for a in elements {
        v.check(a.join(a) == *a, || format!("join not idempotent on {a:?}"));
        for b in elements {
            v.check(a.join(b) == b.join(a), || {
                format!("join not commutative on {a:?}, {b:?}")
            });
            for c in elements {
                v.check(a.join(b).join(c) == a.join(&b.join(c)), || {
                    format!("join not associative on {a:?}, {b:?}, {c:?}")
                });
            }
        }
    }
}

fn meet_laws<L: Lattice + PartialEq + Debug>(elements: &[L], v: &mut Violations) {
    for a in elements {
        v.check(a.meet(a) == *a, || format!("meet not idempotent on {a:?}"));
        for b in elements {
            v.check(a.meet(b) == b.meet(a), || {
                format!("meet not commutative on {a:?}, {b:?}")
            });
            for c in elements {
                v.check(a.meet(b).meet(c) == a.meet(&b.meet(c)), || {
                    format!("meet not associative on {a:?}, {b:?}, {c:?}")
                });
            }
        }
    }
}

fn order_laws<L: Lattice + PartialEq + Debug>(elements: &[L], v: &mut Violations) {
    for a in elements {
        for b in elements {
            v.check(a.join(&a.meet(b)) == *a, || {
                format!("absorption fails: {a:?} join ({a:?} meet {b:?})")
            });
            v.check(a.meet(&a.join(b)) == *a, || {
                format!("absorption fails: {a:?} meet ({a:?} join {b:?})")
            });
            let below = a.is_subseteq(b);
            v.check(below == (a.join(b) == *b), || {
                format!("{a:?} <= {b:?} is {below} but join disagrees")
            });
            v.check(below == (a.meet(b) == *a), || {
                format!("{a:?} <= {b:?} is {below} but meet disagrees")
            });
        }
    }
}

fn extreme_laws<L: HasBottom + HasTop + PartialEq + Debug>(elements: &[L], v: &mut Violations) {
    let (bot, top) = (L::bottom(), L::top());
    for x in elements {
        v.check(bot.is_subseteq(x), || format!("bottom not below {x:?}"));
        v.check(bot.join(x) == *x, || format!("bottom.join({x:?}) != {x:?}"));
        v.check(bot.meet(x) == bot, || format!("bottom.meet({x:?}) != bottom"));
        v.check(x.is_subseteq(&top), || format!("{x:?} not below top"));
        v.check(top.join(x) == top, || format!("top.join({x:?}) != top"));
        v.check(top.meet(x) == *x, || format!("top.meet({x:?}) != {x:?}"));
    }
}
