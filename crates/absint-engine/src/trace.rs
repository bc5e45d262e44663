use absint_ir::{MethodId, NodeId};
use tracing::{debug, trace};

/// One observable step of an analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    AnalysisStarted {
        method: MethodId,
        depth: usize,
    },
    AnalysisFinished {
        method: MethodId,
        iterations: usize,
    },
    NodeVisited {
        method: MethodId,
        node: NodeId,
        iteration: usize,
    },
    /// The precondition of `node` grew (or shrank, while narrowing).
    StateChanged {
        method: MethodId,
        node: NodeId,
        widened: bool,
    },
    SummaryCacheHit {
        callee: MethodId,
    },
    SummaryCacheMiss {
        callee: MethodId,
    },
    /// A call was approximated because its callee could not be summarized.
    CallClobbered {
        caller: MethodId,
        node: NodeId,
        reason: String,
    },
}

/// Receiver of [`TraceEvent`]s. Purely observational: a sink never changes
/// analysis results.
pub trait TraceSink {
    fn record(&mut self, event: TraceEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TraceSink for NullSink {
    fn record(&mut self, _event: TraceEvent) {}
}

/// Forwards events to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn record(&mut self, event: TraceEvent) {
        match event {
            TraceEvent::AnalysisStarted { method, depth } => {
                debug!(%method, depth, "analysis started");
            }
            TraceEvent::AnalysisFinished { method, iterations } => {
                debug!(%method, iterations, "analysis finished");
            }
            TraceEvent::NodeVisited {
                method,
                node,
                iteration,
            } => {
                trace!(%method, %node, iteration, "visit");
            }
            TraceEvent::StateChanged {
                method,
                node,
                widened,
            } => {
                trace!(%method, %node, widened, "state changed");
            }
            TraceEvent::SummaryCacheHit { callee } => debug!(%callee, "summary cache hit"),
            TraceEvent::SummaryCacheMiss { callee } => debug!(%callee, "summary cache miss"),
            TraceEvent::CallClobbered {
                caller,
                node,
                reason,
            } => {
                debug!(%caller, %node, %reason, "call approximated");
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub events: Vec<TraceEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded events matching `pred`.
    pub fn count(&self, pred: impl Fn(&TraceEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl TraceSink for RecordingSink {
    fn record(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}

impl<T: TraceSink + ?Sized> TraceSink for &mut T {
    fn record(&mut self, event: TraceEvent) {
        (**self).record(event);
    }
}
