use absint_engine::AbstractStateMap;
use absint_interval::IntervalEnv;
use absint_ir::{Method, MethodId, NodeKind, NodeRef};

use crate::{Checker, Fact};

/// Reports computed values that turn out to be a single integer.
///
/// Literal `Const` nodes and array allocations are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConstantChecker;

impl Checker<IntervalEnv> for ConstantChecker {
    fn check(
        &self,
        method_id: MethodId,
        method: &Method,
        states: &AbstractStateMap<IntervalEnv>,
    ) -> Vec<Fact> {
        method
            .iter()
            .filter(|(_, kind)| !matches!(kind, NodeKind::Const { .. } | NodeKind::NewArray { .. }))
            .filter_map(|(node, kind)| {
                let dst = kind.def()?;
                let post = states.post(node).filter(|env| env.is_reachable())?;
                let value = post.value(dst).as_constant()?;
                Some(Fact::Constant {
                    node: NodeRef::new(method_id, node),
                    value,
                })
            })
            .collect()
    }
}
