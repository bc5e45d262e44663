//! Turning converged abstract states into facts about individual nodes.
//!
//! A [`Checker`] reads the state map of one analyzed method and reports
//! [`Fact`]s; the [`CheckerManager`] runs every registered checker, and a
//! [`FactSet`] merges what several calling contexts said about the same
//! node.

mod bounds;
mod checker;
mod condition;
mod constant;
mod fact;
mod fact_set;
mod leak;

pub use absint_interval::Safety;
pub use bounds::BoundsChecker;
pub use checker::{Checker, CheckerManager};
pub use condition::ConditionChecker;
pub use constant::ConstantChecker;
pub use fact::{Fact, FactKind, Truth};
pub use fact_set::FactSet;
pub use leak::ResourceLeakChecker;
