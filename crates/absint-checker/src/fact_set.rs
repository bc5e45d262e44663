use std::collections::{BTreeMap, BTreeSet};

use absint_ir::NodeRef;

use crate::{Fact, FactKind};

/// Facts gathered over several runs, at most one per node and kind.
///
/// A method analyzed under more than one calling context reports once per
/// context. Safety verdicts and leak counts from different contexts are
/// merged; any other disagreement marks the slot as conflicting and no
/// fact is kept for it. A context that reaches a node without deciding it
/// also conflicts, see [`FactSet::insert_contexts`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FactSet {
    facts: BTreeMap<(NodeRef, FactKind), Option<Fact>>,
}

impl FactSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, fact: Fact) {
        let key = (fact.node(), fact.kind());
        match self.facts.get_mut(&key) {
            None => {
                self.facts.insert(key, Some(fact));
            }
            Some(slot) => {
                *slot = slot.as_ref().and_then(|existing| existing.merge(&fact));
            }
        }
    }

    /// Merge what each calling context of one method reported.
    ///
    /// `reached(i, node)` tells whether context `i` may reach `node`. A
    /// slot whose kind [holds on every path](FactKind::holds_on_every_path)
    /// conflicts when some context reached its node without reporting it.
    pub fn insert_contexts<R>(&mut self, contexts: Vec<Vec<Fact>>, reached: R)
    where
        R: Fn(usize, NodeRef) -> bool,
    {
        let reported: Vec<BTreeSet<(NodeRef, FactKind)>> = contexts
            .iter()
            .map(|facts| facts.iter().map(|f| (f.node(), f.kind())).collect())
            .collect();
        let slots: BTreeSet<(NodeRef, FactKind)> = reported
            .iter()
            .flatten()
            .copied()
            .filter(|(_, kind)| kind.holds_on_every_path())
            .collect();
        for (i, seen) in reported.iter().enumerate() {
            for &(node, kind) in slots.difference(seen) {
                if reached(i, node) {
                    self.mark_undecided(node, kind);
                }
            }
        }
        self.extend(contexts.into_iter().flatten());
    }

    /// Record that some context reached `node` without deciding `kind`.
    pub fn mark_undecided(&mut self, node: NodeRef, kind: FactKind) {
        self.facts.insert((node, kind), None);
    }

    /// Insert the weakened form of each fact; see [`Fact::weaken`].
    pub fn insert_weakened(&mut self, facts: impl IntoIterator<Item = Fact>) {
        for fact in facts.into_iter().filter_map(Fact::weaken) {
            self.insert(fact);
        }
    }

    pub fn get(&self, node: NodeRef, kind: FactKind) -> Option<&Fact> {
        self.facts.get(&(node, kind)).and_then(Option::as_ref)
    }

    /// Whether contexts disagreed about `node`.
    pub fn is_conflicting(&self, node: NodeRef, kind: FactKind) -> bool {
        matches!(self.facts.get(&(node, kind)), Some(None))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fact> + '_ {
        self.facts.values().flatten()
    }

    pub fn of_kind(&self, kind: FactKind) -> impl Iterator<Item = &Fact> + '_ {
        self.iter().filter(move |fact| fact.kind() == kind)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Extend<Fact> for FactSet {
    fn extend<T: IntoIterator<Item = Fact>>(&mut self, iter: T) {
        for fact in iter {
            self.insert(fact);
        }
    }
}

impl FromIterator<Fact> for FactSet {
    fn from_iter<T: IntoIterator<Item = Fact>>(iter: T) -> Self {
        let mut set = FactSet::new();
        set.extend(iter);
        set
    }
}
