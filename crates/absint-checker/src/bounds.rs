use absint_engine::AbstractStateMap;
use absint_interval::{Interval, IntervalEnv, Safety};
use absint_ir::{Method, MethodId, NodeRef, Operand};

use crate::{Checker, Fact};

/// Classifies every indexed access of a method.
///
/// Accesses the analysis never reached are only reported when a constant
/// index and a known length settle the question without any state.
#[derive(Debug, Default, Clone, Copy)]
pub struct BoundsChecker;

impl Checker<IntervalEnv> for BoundsChecker {
    fn check(
        &self,
        method_id: MethodId,
        method: &Method,
        states: &AbstractStateMap<IntervalEnv>,
    ) -> Vec<Fact> {
        method
            .iter()
            .filter_map(|(node, kind)| {
                let (array, index, known_length) = kind.access()?;
                let (in_bounds, index_range, array_length) = match states.pre(node) {
                    Some(pre) if pre.is_reachable() => pre.index_safety(array, index, known_length),
                    _ => unreached_access(index, known_length)?,
                };
                Some(Fact::IndexSafety {
                    node: NodeRef::new(method_id, node),
                    in_bounds,
                    index_range,
                    array_length,
                })
            })
            .collect()
    }
}

fn unreached_access(
    index: Operand,
    known_length: Option<i64>,
) -> Option<(Safety, Interval, Interval)> {
    let (Operand::Const(index), Some(length)) = (index, known_length) else {
        return None;
    };
    let safety = if (0..length).contains(&index) {
        Safety::Safe
    } else {
        Safety::Unsafe
    };
    Some((safety, Interval::constant(index), Interval::constant(length)))
}

