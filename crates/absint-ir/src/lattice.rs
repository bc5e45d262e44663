/// A join semilattice with meet and the induced partial order.
pub trait Lattice {
    fn join(&self, other: &Self) -> Self;
    fn meet(&self, other: &Self) -> Self;
    fn is_subseteq(&self, other: &Self) -> bool;
}

/// A lattice with a least element (the empty / unreachable value).
pub trait HasBottom: Lattice {
    fn bottom() -> Self;
}

/// A lattice with a greatest element (no information).
pub trait HasTop: Lattice {
    fn top() -> Self;
}
