mod analysis;
mod domain;
mod error;
mod filter;
mod fixpoint;
mod interp;
mod interprocedural;
mod policy;
mod state;
mod trace;
mod widening;

pub use analysis::{Analysis, AnalysisOutcome, CallSite, Intraprocedural, InvokeCallBack, Transfer};
pub use domain::AbstractDomain;
pub use error::AnalysisError;
pub use filter::{AcceptAll, MethodFilter};
pub use fixpoint::{FixpointIterator, Solution};
pub use interp::NodeInterpreter;
pub use interprocedural::{
    CallStack, CalleeRun, Diagnostic, InterproceduralContext, InterproceduralRun,
    InterproceduralStats, SummaryCache, SummaryEntry,
};
pub use policy::{IterationOrder, IteratorPolicy};
pub use state::{AbstractStateMap, NodeState};
pub use trace::{NullSink, RecordingSink, TraceEvent, TraceSink, TracingSink};
pub use widening::WideningStrategy;
