use indexmap::IndexMap;

use crate::{Method, MethodId};

/// A set of methods addressable by [`MethodId`] and by name.
///
/// Methods may be declared before they are defined so that call nodes can
/// refer to callees (including themselves) while the callers are built.
#[derive(Clone, Debug, Default)]
pub struct Program {
    methods: Vec<Option<Method>>,
    names: IndexMap<String, MethodId>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve an id for `name`. Declaring an existing name returns its id.
    pub fn declare(&mut self, name: impl Into<String>) -> MethodId {
        let name = name.into();
        if let Some(&id) = self.names.get(&name) {
            return id;
        }
        let id = MethodId::new(self.methods.len() as u32);
        self.methods.push(None);
        self.names.insert(name, id);
        id
    }

    /// Attach a body to a declared id, replacing any previous definition.
    pub fn define(&mut self, id: MethodId, method: Method) {
        if let Some(slot) = self.methods.get_mut(id.raw()) {
            *slot = Some(method);
        }
    }

    /// Declare and define in one step.
    pub fn add(&mut self, method: Method) -> MethodId {
        let id = self.declare(method.name().to_string());
        self.define(id, method);
        id
    }

    /// The definition of `id`, `None` when only declared or unknown.
    pub fn method(&self, id: MethodId) -> Option<&Method> {
        self.methods.get(id.raw()).and_then(Option::as_ref)
    }

    pub fn lookup(&self, name: &str) -> Option<MethodId> {
        self.names.get(name).copied()
    }

    pub fn name(&self, id: MethodId) -> Option<&str> {
        self.names.get_index(id.raw()).map(|(name, _)| name.as_str())
    }

    /// Defined methods in declaration order.
    pub fn methods(&self) -> impl Iterator<Item = (MethodId, &Method)> + '_ {
        self.methods
            .iter()
            .enumerate()
            .filter_map(|(i, m)| m.as_ref().map(|m| (MethodId::new(i as u32), m)))
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}
