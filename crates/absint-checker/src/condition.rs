use absint_engine::AbstractStateMap;
use absint_interval::IntervalEnv;
use absint_ir::{Method, MethodId, NodeKind, NodeRef};

use crate::{Checker, Fact, Truth};

/// Reports branch conditions whose outcome is fixed on every reaching path.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConditionChecker;

impl Checker<IntervalEnv> for ConditionChecker {
    fn check(
        &self,
        method_id: MethodId,
        method: &Method,
        states: &AbstractStateMap<IntervalEnv>,
    ) -> Vec<Fact> {
        method
            .iter()
            .filter_map(|(node, kind)| {
                let NodeKind::If { condition } = kind else {
                    return None;
                };
                let truth = states.pre(node)?.decide(condition)?;
                Some(Fact::ConditionTruth {
                    node: NodeRef::new(method_id, node),
                    condition: *condition,
                    truth: Truth::from(truth),
                })
            })
            .collect()
    }
}
