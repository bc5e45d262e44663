use crate::AbstractDomain;

/// When loop headers switch from joining to widening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WideningStrategy {
    /// Widen at every revisit of a loop header.
    Immediate,
    /// Join forever. Terminates only on lattices without infinite
    /// ascending chains.
    Never,
    /// Join for the first `n` revisits of each loop header, then widen.
    Delayed(usize),
}

impl Default for WideningStrategy {
    fn default() -> Self {
        WideningStrategy::Delayed(3)
    }
}

impl WideningStrategy {
    /// New state of a loop header that held `current` and now receives
    /// `incoming`, on its `visit_count`-th revisit.
    pub fn merge<D: AbstractDomain>(&self, current: &D, incoming: &D, visit_count: usize) -> D {
        match self {
            Self::Immediate => current.widen(&current.join(incoming)),
            Self::Never => current.join(incoming),
            Self::Delayed(n) => {
                if visit_count <= *n {
                    current.join(incoming)
                } else {
                    current.widen(&current.join(incoming))
                }
            }
        }
    }
}
