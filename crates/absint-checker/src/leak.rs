use absint_count::Count;
use absint_engine::AbstractStateMap;
use absint_ir::{Method, MethodId, NodeRef};

use crate::{Checker, Fact};

/// Reports returns reached while an acquired resource may still be open.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResourceLeakChecker;

impl Checker<Count> for ResourceLeakChecker {
    fn check(
        &self,
        method_id: MethodId,
        method: &Method,
        states: &AbstractStateMap<Count>,
    ) -> Vec<Fact> {
        method
            .return_nodes()
            .filter_map(|node| {
                let open = *states.pre(node)?;
                open.may_be_open().then_some(Fact::ResourceLeak {
                    node: NodeRef::new(method_id, node),
                    open,
                })
            })
            .collect()
    }
}
