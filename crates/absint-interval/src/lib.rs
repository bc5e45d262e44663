//! Interval domain and the array-bounds analysis built on it.
//!
//! [`Interval`] is the per-variable value domain. [`IntervalEnv`] lifts it to
//! whole program points and adds the symbolic facts (`i < a.length`) that
//! intervals alone lose on loops with symbolic bounds. [`IntervalAnalysis`]
//! plugs both into the fixpoint engine.

mod analysis;
mod env;
mod interval;
mod summary;

pub use analysis::IntervalAnalysis;
pub use env::{IntervalEnv, Sym};
pub use interval::{Bound, Interval, Safety};
pub use summary::{IntervalSummary, ParamSym};
