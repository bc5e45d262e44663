mod call_stack;
mod context;
mod summary;

pub use call_stack::CallStack;
pub use context::{
    CalleeRun, Diagnostic, InterproceduralContext, InterproceduralRun, InterproceduralStats,
};
pub use summary::{SummaryCache, SummaryEntry};
