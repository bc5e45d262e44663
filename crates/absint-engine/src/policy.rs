use crate::WideningStrategy;

/// Worklist discipline of the fixpoint iterator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IterationOrder {
    /// Always pop the queued node that comes first in reverse postorder.
    #[default]
    ReversePostorder,
    /// Pop in insertion order.
    Fifo,
}

/// Knobs of one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct IteratorPolicy {
    pub order: IterationOrder,
    pub widening: WideningStrategy,
    /// Hard cap on node visits per fixpoint, narrowing included.
    pub max_iterations: usize,
    /// Descending passes run after the ascending fixpoint.
    pub narrowing_passes: usize,
    /// Maximum nesting of interprocedural sub-analyses.
    pub max_call_depth: usize,
    /// Fail the run instead of approximating calls to filtered callees.
    pub fatal_unanalyzable: bool,
}

impl Default for IteratorPolicy {
    fn default() -> Self {
        Self {
            order: IterationOrder::ReversePostorder,
            widening: WideningStrategy::default(),
            max_iterations: 10_000,
            narrowing_passes: 2,
            max_call_depth: 32,
            fatal_unanalyzable: false,
        }
    }
}

impl IteratorPolicy {
    /// Configure the worklist order.
    pub fn with_order(mut self, order: IterationOrder) -> Self {
        self.order = order;
        self
    }

    /// Configure widening behavior used at loop headers.
    pub fn with_widening(mut self, strategy: WideningStrategy) -> Self {
        self.widening = strategy;
        self
    }

    /// Configure the maximum node visits of one fixpoint.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Configure post-fixpoint narrowing passes.
    pub fn with_narrowing_passes(mut self, n: usize) -> Self {
        self.narrowing_passes = n;
        self
    }

    /// Configure maximum nesting of callee analyses.
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Make calls to filtered or external callees fail the run.
    pub fn with_fatal_unanalyzable(mut self, fatal: bool) -> Self {
        self.fatal_unanalyzable = fatal;
        self
    }
}
