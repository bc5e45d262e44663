use std::fmt::Debug;

use absint_ir::HasBottom;

/// The per-node state of an analysis.
///
/// `Clone` must produce an independent value and `PartialEq` must compare
/// values, since the fixpoint iterator stops once no state changes.
///
/// Implementations promise:
///
/// - `join` is commutative, associative and idempotent, and `bottom()` is
///   its neutral element.
/// - `widen(x, y)` lies above both `x` and `y`, and repeatedly widening an
///   increasing sequence reaches a value that no longer moves.
/// - `narrow(x, y)` lies between `meet(x, y)` and `x`, and repeated
///   narrowing also stops moving after finitely many steps.
pub trait AbstractDomain: HasBottom + Clone + PartialEq + Debug {
    /// Whether this value denotes no concrete state (unreachable).
    fn is_bottom(&self) -> bool;

    /// Replace `self` with the least upper bound of `self` and `other`.
    fn join_with(&mut self, other: &Self) {
        *self = self.join(other);
    }

    /// Extrapolate from `self` towards `next` so that loop iteration ends.
    fn widen(&self, next: &Self) -> Self;

    /// Recover precision lost to widening. Keeps `self` unless overridden.
    fn narrow(&self, _next: &Self) -> Self {
        self.clone()
    }
}
