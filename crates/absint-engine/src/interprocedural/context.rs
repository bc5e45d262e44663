use std::collections::VecDeque;
use std::fmt;

use absint_ir::{Method, MethodId, NodeId, NodeKind, Program};
use rustc_hash::{FxHashMap, FxHashSet};

use super::{CallStack, SummaryCache};
use crate::{
    AbstractStateMap, Analysis, AnalysisError, AnalysisOutcome, CallSite, FixpointIterator,
    InvokeCallBack, IteratorPolicy, MethodFilter, Solution, TraceEvent, TraceSink,
};

/// States of one completed callee analysis.
#[derive(Debug, Clone)]
pub struct CalleeRun<D> {
    pub method: MethodId,
    /// The entry state the callee was analyzed under.
    pub entry: D,
    pub states: AbstractStateMap<D>,
}

/// A call that was approximated instead of summarized.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub caller: MethodId,
    pub node: NodeId,
    pub error: AnalysisError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.caller, self.node, self.error)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterproceduralStats {
    /// Fixpoint runs started, root included.
    pub analyses: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub clobbered_calls: usize,
    /// Deepest call stack observed, root included.
    pub max_depth: usize,
}

/// Everything an interprocedural run produced.
#[derive(Debug, Clone)]
pub struct InterproceduralRun<D> {
    pub root: MethodId,
    pub solution: Solution<D>,
    /// Callee analyses in completion order.
    pub callee_runs: Vec<CalleeRun<D>>,
    pub diagnostics: Vec<Diagnostic>,
    /// Methods that may be entered under a context that was never analyzed.
    /// States recorded for them do not cover every execution.
    pub incomplete: FxHashSet<MethodId>,
    pub stats: InterproceduralStats,
}

/// Drives nested fixpoints across call boundaries.
///
/// Each `Invoke` the fixpoint iterator meets is resolved here: the callee's
/// entry state is computed, a cached summary is reused when one subsumes it,
/// and otherwise the callee is analyzed with this context as its own call
/// resolver. Recursion, excessive depth, non-convergence and filtered
/// callees do not abort the run: the call site is approximated and a
/// [`Diagnostic`] is recorded.
pub struct InterproceduralContext<'p, 't, A: Analysis> {
    program: &'p Program,
    analysis: &'p A,
    policy: &'p IteratorPolicy,
    filter: &'p dyn MethodFilter,
    trace: &'t mut dyn TraceSink,
    stack: CallStack,
    summaries: FxHashMap<MethodId, SummaryCache<A::Domain, A::Summary>>,
    callee_runs: Vec<CalleeRun<A::Domain>>,
    diagnostics: Vec<Diagnostic>,
    incomplete: FxHashSet<MethodId>,
    stats: InterproceduralStats,
}

impl<'p, 't, A: Analysis> InterproceduralContext<'p, 't, A> {
    pub fn new(
        program: &'p Program,
        analysis: &'p A,
        policy: &'p IteratorPolicy,
        filter: &'p dyn MethodFilter,
        trace: &'t mut dyn TraceSink,
    ) -> Self {
        Self {
            program,
            analysis,
            policy,
            filter,
            trace,
            stack: CallStack::new(),
            summaries: FxHashMap::default(),
            callee_runs: Vec::new(),
            diagnostics: Vec::new(),
            incomplete: FxHashSet::default(),
            stats: InterproceduralStats::default(),
        }
    }

    /// Use `summary` for every call to `method`, without analyzing it. Works
    /// for external and undefined methods too.
    pub fn with_fixed_summary(mut self, method: MethodId, summary: A::Summary) -> Self {
        self.summaries.entry(method).or_default().set_fixed(summary);
        self
    }

    pub fn summaries(&self, method: MethodId) -> Option<&SummaryCache<A::Domain, A::Summary>> {
        self.summaries.get(&method)
    }

    /// Analyze `root` from `entry`, then hand back everything collected.
    ///
    /// Every error raised by the root's own fixpoint fails the run.
    pub fn run(
        mut self,
        root: MethodId,
        entry: A::Domain,
    ) -> Result<InterproceduralRun<A::Domain>, AnalysisError> {
        let program = self.program;
        let method = program
            .method(root)
            .filter(|m| !m.is_external())
            .ok_or(AnalysisError::UnknownMethod { method: root })?;
        let solution = self.analyze(root, method, entry)?;
        Ok(InterproceduralRun {
            root,
            solution,
            callee_runs: self.callee_runs,
            diagnostics: self.diagnostics,
            incomplete: self.incomplete,
            stats: self.stats,
        })
    }

    fn analyze(
        &mut self,
        id: MethodId,
        method: &'p Method,
        entry: A::Domain,
    ) -> Result<Solution<A::Domain>, AnalysisError> {
        let (analysis, policy) = (self.analysis, self.policy);
        self.stack.push(id)?;
        self.stats.analyses += 1;
        self.stats.max_depth = self.stats.max_depth.max(self.stack.depth());
        let result = FixpointIterator::new(analysis, policy, id, method).run(entry, self);
        self.stack.pop();
        result
    }

    /// Whether a call site may absorb `error` by approximating the call.
    fn absorbs(&self, error: &AnalysisError) -> bool {
        match error {
            AnalysisError::UnanalyzableCallee { .. } => !self.policy.fatal_unanalyzable,
            other => other.is_recoverable(),
        }
    }

    /// Record a recoverable failure at `site` and mark every method the
    /// target can reach as incomplete.
    fn fail(&mut self, site: &CallSite<'_>, error: AnalysisError) -> AnalysisOutcome<A::Summary> {
        self.stats.clobbered_calls += 1;
        self.diagnostics.push(Diagnostic {
            caller: site.caller,
            node: site.node,
            error: error.clone(),
        });
        self.incomplete
            .extend(reachable_methods(self.program, site.target));
        AnalysisOutcome::Error(error)
    }

    fn unanalyzable(
        &mut self,
        site: &CallSite<'_>,
        reason: &str,
    ) -> Result<AnalysisOutcome<A::Summary>, AnalysisError> {
        let error = AnalysisError::UnanalyzableCallee {
            method: site.target,
            reason: reason.to_string(),
        };
        if !self.absorbs(&error) {
            return Err(error);
        }
        Ok(self.fail(site, error))
    }

    fn hit(&mut self, callee: MethodId, summary: A::Summary) -> AnalysisOutcome<A::Summary> {
        self.stats.cache_hits += 1;
        self.trace.record(TraceEvent::SummaryCacheHit { callee });
        AnalysisOutcome::Summary(summary)
    }
}

impl<A: Analysis> InvokeCallBack<A> for InterproceduralContext<'_, '_, A> {
    fn invoke(
        &mut self,
        site: &CallSite<'_>,
        pre: &A::Domain,
    ) -> Result<AnalysisOutcome<A::Summary>, AnalysisError> {
        let target = site.target;
        if let Some(fixed) = self.summaries.get(&target).and_then(|c| c.fixed()) {
            let fixed = fixed.clone();
            return Ok(self.hit(target, fixed));
        }

        let program = self.program;
        let callee = match program.method(target) {
            None => return self.unanalyzable(site, "method has no definition"),
            Some(m) if m.is_external() => return self.unanalyzable(site, "external method"),
            Some(m) if !self.filter.accepts(target, m) => {
                return self.unanalyzable(site, "rejected by filter");
            }
            Some(m) => m,
        };
        if callee.params().len() != site.args.len() {
            return Err(AnalysisError::ArityMismatch {
                method: target,
                expected: callee.params().len(),
                got: site.args.len(),
            });
        }

        let entry = self.analysis.callee_entry(site, callee, pre);
        if let Some(summary) = self.summaries.get(&target).and_then(|c| c.lookup(&entry)) {
            let summary = summary.clone();
            return Ok(self.hit(target, summary));
        }
        self.stats.cache_misses += 1;
        self.trace.record(TraceEvent::SummaryCacheMiss { callee: target });

        if self.stack.contains(target) {
            return Ok(self.fail(site, AnalysisError::UnresolvedRecursion { method: target }));
        }
        if self.stack.depth() >= self.policy.max_call_depth {
            let limit = self.policy.max_call_depth;
            return Ok(self.fail(site, AnalysisError::CallDepthExceeded { limit }));
        }

        match self.analyze(target, callee, entry.clone()) {
            Ok(solution) => {
                let summary = self.analysis.summarize(callee, &solution.states);
                self.summaries
                    .entry(target)
                    .or_default()
                    .push_entry(entry.clone(), summary.clone());
                self.callee_runs.push(CalleeRun {
                    method: target,
                    entry,
                    states: solution.states,
                });
                Ok(AnalysisOutcome::Summary(summary))
            }
            Err(error) if self.absorbs(&error) => Ok(self.fail(site, error)),
            Err(error) => Err(error),
        }
    }

    fn record(&mut self, event: TraceEvent) {
        self.trace.record(event);
    }

    fn depth(&self) -> usize {
        self.stack.depth()
    }
}

/// `start` plus every method reachable from it through `Invoke` nodes.
fn reachable_methods(program: &Program, start: MethodId) -> FxHashSet<MethodId> {
    let mut seen = FxHashSet::default();
    let mut queue = VecDeque::from([start]);
    while let Some(id) = queue.pop_front() {
        if !seen.insert(id) {
            continue;
        }
        let Some(method) = program.method(id) else {
            continue;
        };
        for (_, kind) in method.iter() {
            if let NodeKind::Invoke { target, .. } = kind {
                queue.push_back(*target);
            }
        }
    }
    seen
}
