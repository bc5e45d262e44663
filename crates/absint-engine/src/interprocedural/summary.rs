use absint_ir::Lattice;

/// One analyzed calling context of a method.
#[derive(Debug, Clone)]
pub struct SummaryEntry<D, S> {
    /// Entry state the callee was analyzed under; the cache key.
    pub entry: D,
    pub summary: S,
}

/// Summaries of one method, keyed by entry state.
///
/// A query is answered by the entry with the smallest key that still
/// contains it, since a summary computed for a weaker entry state also
/// holds for a stronger one. A summary supplied by the caller replaces
/// every computed entry.
#[derive(Debug, Clone)]
pub struct SummaryCache<D, S> {
    fixed: Option<S>,
    entries: Vec<SummaryEntry<D, S>>,
}

impl<D, S> Default for SummaryCache<D, S> {
    fn default() -> Self {
        Self {
            fixed: None,
            entries: Vec::new(),
        }
    }
}

impl<D, S> SummaryCache<D, S> {
    pub fn set_fixed(&mut self, summary: S) {
        self.fixed = Some(summary);
    }

    pub fn fixed(&self) -> Option<&S> {
        self.fixed.as_ref()
    }

    pub fn push_entry(&mut self, entry: D, summary: S) {
        self.entries.push(SummaryEntry { entry, summary });
    }

    pub fn is_empty(&self) -> bool {
        self.fixed.is_none() && self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &SummaryEntry<D, S>> {
        self.entries.iter()
    }
}

impl<D: Lattice, S> SummaryCache<D, S> {
    /// The computed entry with the smallest key containing `query`.
    pub fn find_best_match(&self, query: &D) -> Option<&SummaryEntry<D, S>> {
        self.entries
            .iter()
            .filter(|candidate| query.is_subseteq(&candidate.entry))
            .fold(None, |best: Option<&SummaryEntry<D, S>>, candidate| match best {
                Some(current) if !candidate.entry.is_subseteq(&current.entry) => Some(current),
                _ => Some(candidate),
            })
    }

    pub fn lookup(&self, query: &D) -> Option<&S> {
        self.fixed
            .as_ref()
            .or_else(|| self.find_best_match(query).map(|found| &found.summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Closed integer ranges ordered by inclusion.
    #[derive(Debug, Clone, PartialEq)]
    struct Range(i64, i64);

    impl Lattice for Range {
        fn join(&self, other: &Self) -> Self {
            Range(self.0.min(other.0), self.1.max(other.1))
        }

        fn meet(&self, other: &Self) -> Self {
            Range(self.0.max(other.0), self.1.min(other.1))
        }

        fn is_subseteq(&self, other: &Self) -> bool {
            other.0 <= self.0 && self.1 <= other.1
        }
    }

    #[test]
    fn tightest_subsuming_entry_wins() {
        let mut cache = SummaryCache::default();
        cache.push_entry(Range(0, 100), "wide");
        cache.push_entry(Range(0, 10), "narrow");
        cache.push_entry(Range(5, 6), "too narrow");

        assert_eq!(cache.lookup(&Range(1, 3)), Some(&"narrow"));
        assert_eq!(cache.lookup(&Range(50, 60)), Some(&"wide"));
        assert_eq!(cache.lookup(&Range(-1, 3)), None);
    }

    #[test]
    fn fixed_summary_overrides_entries() {
        let mut cache = SummaryCache::default();
        cache.push_entry(Range(0, 10), "computed");
        cache.set_fixed("fixed");
        assert_eq!(cache.lookup(&Range(0, 1)), Some(&"fixed"));
        assert_eq!(cache.lookup(&Range(-5, 50)), Some(&"fixed"));
    }
}
