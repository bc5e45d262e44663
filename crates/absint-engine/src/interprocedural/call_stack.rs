use absint_ir::MethodId;

use crate::AnalysisError;

/// Methods whose analysis is in progress, innermost last.
#[derive(Debug, Clone, Default)]
pub struct CallStack {
    frames: Vec<MethodId>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter `method`. A method already on the stack is unresolved recursion.
    pub fn push(&mut self, method: MethodId) -> Result<(), AnalysisError> {
        if self.contains(method) {
            return Err(AnalysisError::UnresolvedRecursion { method });
        }
        self.frames.push(method);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<MethodId> {
        self.frames.pop()
    }

    pub fn contains(&self, method: MethodId) -> bool {
        self.frames.contains(&method)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[MethodId] {
        &self.frames
    }
}
