use absint_engine::AbstractStateMap;
use absint_ir::{Method, MethodId};

use crate::Fact;

/// Reads the converged states of one method and reports facts about its
/// nodes.
pub trait Checker<D> {
    fn check(&self, method_id: MethodId, method: &Method, states: &AbstractStateMap<D>)
    -> Vec<Fact>;
}

impl<D, F> Checker<D> for F
where
    F: Fn(MethodId, &Method, &AbstractStateMap<D>) -> Vec<Fact>,
{
    fn check(
        &self,
        method_id: MethodId,
        method: &Method,
        states: &AbstractStateMap<D>,
    ) -> Vec<Fact> {
        self(method_id, method, states)
    }
}

/// Runs a list of checkers in registration order.
pub struct CheckerManager<D> {
    checkers: Vec<Box<dyn Checker<D>>>,
}

impl<D> Default for CheckerManager<D> {
    fn default() -> Self {
        Self {
            checkers: Vec::new(),
        }
    }
}

impl<D> CheckerManager<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_checker(mut self, checker: impl Checker<D> + 'static) -> Self {
        self.register(checker);
        self
    }

    pub fn register(&mut self, checker: impl Checker<D> + 'static) {
        self.checkers.push(Box::new(checker));
    }

    pub fn len(&self) -> usize {
        self.checkers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkers.is_empty()
    }

    pub fn check(
        &self,
        method_id: MethodId,
        method: &Method,
        states: &AbstractStateMap<D>,
    ) -> Vec<Fact> {
        self.checkers
            .iter()
            .flat_map(|checker| checker.check(method_id, method, states))
            .collect()
    }
}
