use absint_ir::{HasBottom, Method, MethodId, NodeId, NodeKind};

use crate::{
    AbstractDomain, Analysis, AnalysisError, AnalysisOutcome, CallSite, InvokeCallBack,
    TraceEvent, Transfer,
};

/// Applies an [`Analysis`] to single nodes of one method.
///
/// Every [`NodeKind`] is dispatched explicitly; there is no catch-all arm,
/// so adding a kind forces a decision here.
pub struct NodeInterpreter<'a, A: Analysis> {
    analysis: &'a A,
    method_id: MethodId,
    method: &'a Method,
}

impl<'a, A: Analysis> NodeInterpreter<'a, A> {
    pub fn new(analysis: &'a A, method_id: MethodId, method: &'a Method) -> Self {
        Self {
            analysis,
            method_id,
            method,
        }
    }

    pub fn method(&self) -> &'a Method {
        self.method
    }

    /// Compute the outgoing values of `node` under `pre`.
    ///
    /// An unreachable `pre` yields bottom without consulting the analysis or
    /// resolving calls.
    pub fn interpret<C>(
        &self,
        node: NodeId,
        pre: &A::Domain,
        calls: &mut C,
    ) -> Result<Transfer<A::Domain>, AnalysisError>
    where
        C: InvokeCallBack<A> + ?Sized,
    {
        let kind = self
            .method
            .kind(node)
            .ok_or_else(|| AnalysisError::MalformedGraph {
                method: self.method_id,
                node,
                reason: "node does not exist".to_string(),
            })?;
        if pre.is_bottom() {
            return Ok(Transfer::Flow(A::Domain::bottom()));
        }
        match kind {
            NodeKind::If { condition } => {
                let (on_true, on_false) = self.analysis.branch(condition, pre);
                Ok(Transfer::Branch { on_true, on_false })
            }
            NodeKind::Invoke { dst, target, args } => {
                let site = CallSite {
                    caller: self.method_id,
                    node,
                    target: *target,
                    dst: *dst,
                    args,
                };
                let post = match calls.invoke(&site, pre)? {
                    AnalysisOutcome::Summary(summary) => {
                        self.analysis.apply_summary(&site, &summary, pre)
                    }
                    AnalysisOutcome::Error(err) => {
                        calls.record(TraceEvent::CallClobbered {
                            caller: self.method_id,
                            node,
                            reason: err.to_string(),
                        });
                        self.analysis.clobber_call(&site, pre)
                    }
                };
                Ok(Transfer::Flow(post))
            }
            NodeKind::Start
            | NodeKind::Const { .. }
            | NodeKind::Copy { .. }
            | NodeKind::Binary { .. }
            | NodeKind::Opaque { .. }
            | NodeKind::NewArray { .. }
            | NodeKind::ArrayLength { .. }
            | NodeKind::LoadIndexed { .. }
            | NodeKind::StoreIndexed { .. }
            | NodeKind::Merge
            | NodeKind::Acquire
            | NodeKind::Release
            | NodeKind::Return { .. } => Ok(Transfer::Flow(self.analysis.transfer(kind, pre))),
        }
    }
}
