//! Resource counting: how many acquired resources may still be open.

mod analysis;
mod count;

pub use analysis::CountAnalysis;
pub use count::Count;
