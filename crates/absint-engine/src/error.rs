use absint_ir::{MethodId, NodeId};

/// Error type for analysis failures.
///
/// [`UnresolvedRecursion`](Self::UnresolvedRecursion),
/// [`IterationLimitExceeded`](Self::IterationLimitExceeded),
/// [`CallDepthExceeded`](Self::CallDepthExceeded) and
/// [`UnanalyzableCallee`](Self::UnanalyzableCallee) abort only the affected
/// sub-analysis when raised below the root: the call site that triggered it
/// is approximated conservatively. Everything else fails the whole run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    /// The callee is already on the call stack.
    #[error("unresolved recursion: {method} is already under analysis")]
    UnresolvedRecursion { method: MethodId },
    /// The fixpoint did not converge within the configured bound.
    #[error("fixpoint of {method} did not converge within {limit} iterations")]
    IterationLimitExceeded { method: MethodId, limit: usize },
    /// The callee was filtered out or has no IR.
    #[error("callee {method} cannot be analyzed: {reason}")]
    UnanalyzableCallee { method: MethodId, reason: String },
    /// Nested sub-analyses exceeded the configured call depth.
    #[error("call depth exceeded maximum of {limit}")]
    CallDepthExceeded { limit: usize },
    /// The requested root method does not exist or has no body.
    #[error("unknown method {method}")]
    UnknownMethod { method: MethodId },
    /// Argument count does not match the callee's parameter count.
    #[error("arity mismatch calling {method}: expected {expected} arguments, got {got}")]
    ArityMismatch {
        method: MethodId,
        expected: usize,
        got: usize,
    },
    /// The graph violates a structural invariant the engine relies on.
    #[error("malformed graph in {method} at {node}: {reason}")]
    MalformedGraph {
        method: MethodId,
        node: NodeId,
        reason: String,
    },
}

impl AnalysisError {
    /// Whether a call site may absorb this error by approximating the call.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AnalysisError::UnresolvedRecursion { .. }
                | AnalysisError::IterationLimitExceeded { .. }
                | AnalysisError::UnanalyzableCallee { .. }
                | AnalysisError::CallDepthExceeded { .. }
        )
    }
}
