use absint_ir::{Method, MethodId};

/// Decides which callees the interprocedural context may descend into.
///
/// Calls to rejected methods are approximated as if the callee were
/// external.
pub trait MethodFilter {
    fn accepts(&self, id: MethodId, method: &Method) -> bool;
}

/// Accepts every method with a body.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl MethodFilter for AcceptAll {
    fn accepts(&self, _id: MethodId, _method: &Method) -> bool {
        true
    }
}

impl<F> MethodFilter for F
where
    F: Fn(MethodId, &Method) -> bool,
{
    fn accepts(&self, id: MethodId, method: &Method) -> bool {
        self(id, method)
    }
}

#[cfg(test)]
mod tests {
    use absint_ir::ParamKind;

    use super::*;

    #[test]
    fn closures_are_filters() {
        let method = Method::external("io", &[ParamKind::Int]);
        let deny_io = |_: MethodId, m: &Method| m.name() != "io";
        assert!(!deny_io.accepts(MethodId::new(0), &method));
        assert!(AcceptAll.accepts(MethodId::new(0), &method));
    }
}
