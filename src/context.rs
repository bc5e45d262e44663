use absint_checker::{
    BoundsChecker, Checker, CheckerManager, ConditionChecker, ConstantChecker, Fact, FactSet,
    ResourceLeakChecker,
};
use absint_count::CountAnalysis;
use absint_engine::{
    AbstractStateMap, AcceptAll, Analysis, AnalysisError, FixpointIterator,
    InterproceduralContext, InterproceduralStats, Intraprocedural, IteratorPolicy, MethodFilter,
    TraceSink, TracingSink,
};
use absint_interval::IntervalAnalysis;
use absint_ir::{Method, MethodId, Program};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::AnalysisReport;

/// Analyses that come with a standard set of checkers.
pub trait DefaultCheckers: Analysis {
    fn default_checkers() -> CheckerManager<Self::Domain>;
}

impl DefaultCheckers for IntervalAnalysis {
    fn default_checkers() -> CheckerManager<Self::Domain> {
        CheckerManager::new()
            .with_checker(BoundsChecker)
            .with_checker(ConditionChecker)
            .with_checker(ConstantChecker)
    }
}

impl DefaultCheckers for CountAnalysis {
    fn default_checkers() -> CheckerManager<Self::Domain> {
        CheckerManager::new().with_checker(ResourceLeakChecker)
    }
}

/// Everything needed to analyze methods of one program: the analysis, the
/// iteration policy, which callees may be entered, the checkers that turn
/// states into facts, and where trace events go.
///
/// A context can be run any number of times. Each run starts from empty
/// summary caches, so repeated runs give identical reports.
pub struct AnalysisContext<'p, A: Analysis> {
    program: &'p Program,
    analysis: A,
    policy: IteratorPolicy,
    filter: Box<dyn MethodFilter + 'p>,
    checkers: CheckerManager<A::Domain>,
    trace: Box<dyn TraceSink + 'p>,
    fixed_summaries: Vec<(MethodId, A::Summary)>,
}

impl<'p, A: Analysis> AnalysisContext<'p, A> {
    /// A context with the default policy, no checkers, every callee
    /// accepted and events forwarded to `tracing`.
    pub fn new(program: &'p Program, analysis: A) -> Self {
        Self {
            program,
            analysis,
            policy: IteratorPolicy::default(),
            filter: Box::new(AcceptAll),
            checkers: CheckerManager::new(),
            trace: Box::new(TracingSink),
            fixed_summaries: Vec::new(),
        }
    }

    pub fn with_policy(mut self, policy: IteratorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_filter(mut self, filter: impl MethodFilter + 'p) -> Self {
        self.filter = Box::new(filter);
        self
    }

    pub fn with_checker(mut self, checker: impl Checker<A::Domain> + 'static) -> Self {
        self.checkers.register(checker);
        self
    }

    /// Replace the registered checkers.
    pub fn with_checkers(mut self, checkers: CheckerManager<A::Domain>) -> Self {
        self.checkers = checkers;
        self
    }

    pub fn with_trace(mut self, trace: impl TraceSink + 'p) -> Self {
        self.trace = Box::new(trace);
        self
    }

    /// Use `summary` for every call to `method` instead of analyzing it.
    pub fn with_fixed_summary(mut self, method: MethodId, summary: A::Summary) -> Self {
        self.fixed_summaries.push((method, summary));
        self
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn policy(&self) -> &IteratorPolicy {
        &self.policy
    }

    /// Analyze `root` alone. Every call is approximated by the analysis'
    /// clobber rule.
    pub fn run_intra_procedural(
        &mut self,
        root: MethodId,
        initial: A::Domain,
    ) -> Result<AnalysisReport<A::Domain>, AnalysisError> {
        let method = self.root_method(root)?;
        debug!(%root, "intra-procedural run");
        let mut calls = Intraprocedural::new(&mut *self.trace);
        let solution = FixpointIterator::new(&self.analysis, &self.policy, root, method)
            .run(initial, &mut calls)?;
        let facts = self.checkers.check(root, method, &solution.states).into_iter().collect();
        Ok(AnalysisReport {
            root,
            states: solution.states,
            callee_runs: Vec::new(),
            facts,
            diagnostics: Vec::new(),
            incomplete: FxHashSet::default(),
            stats: InterproceduralStats {
                analyses: 1,
                max_depth: 1,
                ..InterproceduralStats::default()
            },
            iterations: solution.iterations,
        })
    }

    /// Analyze `root`, descending into every callee the filter accepts.
    ///
    /// Facts are derived for the root and for every callee analysis. A
    /// method analyzed under several contexts keeps a branch or constant
    /// fact only if every context reaching the node agrees; methods left
    /// incomplete by an approximated call only keep their weakened facts.
    pub fn run_inter_procedural(
        &mut self,
        root: MethodId,
        initial: A::Domain,
    ) -> Result<AnalysisReport<A::Domain>, AnalysisError> {
        debug!(%root, "inter-procedural run");
        let mut context = InterproceduralContext::new(
            self.program,
            &self.analysis,
            &self.policy,
            &*self.filter,
            &mut *self.trace,
        );
        for (method, summary) in &self.fixed_summaries {
            context = context.with_fixed_summary(*method, summary.clone());
        }
        let run = context.run(root, initial)?;

        let mut contexts: FxHashMap<MethodId, Vec<&AbstractStateMap<A::Domain>>> =
            FxHashMap::default();
        contexts.entry(root).or_default().push(&run.solution.states);
        for callee in &run.callee_runs {
            contexts.entry(callee.method).or_default().push(&callee.states);
        }
        let mut facts = FactSet::new();
        for (&id, states) in &contexts {
            self.derive_facts(&mut facts, &run.incomplete, id, states);
        }
        debug!(
            %root,
            facts = facts.len(),
            diagnostics = run.diagnostics.len(),
            "inter-procedural run finished"
        );
        Ok(AnalysisReport {
            root,
            states: run.solution.states,
            callee_runs: run.callee_runs,
            facts,
            diagnostics: run.diagnostics,
            incomplete: run.incomplete,
            stats: run.stats,
            iterations: run.solution.iterations,
        })
    }

    fn root_method(&self, root: MethodId) -> Result<&'p Method, AnalysisError> {
        let program: &'p Program = self.program;
        program
            .method(root)
            .filter(|method| !method.is_external())
            .ok_or(AnalysisError::UnknownMethod { method: root })
    }

    fn derive_facts(
        &self,
        facts: &mut FactSet,
        incomplete: &FxHashSet<MethodId>,
        id: MethodId,
        contexts: &[&AbstractStateMap<A::Domain>],
    ) {
        let Some(method) = self.program.method(id) else {
            return;
        };
        let weaken = incomplete.contains(&id);
        let found = contexts
            .iter()
            .map(|states| {
                let found = self.checkers.check(id, method, states);
                if weaken {
                    found.into_iter().filter_map(Fact::weaken).collect()
                } else {
                    found
                }
            })
            .collect();
        facts.insert_contexts(found, |i, node| contexts[i].is_reachable(node.node));
    }
}

impl<'p, A: DefaultCheckers> AnalysisContext<'p, A> {
    /// Register the analysis' standard checkers.
    pub fn with_default_checkers(self) -> Self {
        self.with_checkers(A::default_checkers())
    }
}

/// Array bounds, decided branches and constants, over the interval domain.
pub fn bounds_analysis(program: &Program) -> AnalysisContext<'_, IntervalAnalysis> {
    AnalysisContext::new(program, IntervalAnalysis::new()).with_default_checkers()
}

/// Acquire/release balance, over the count domain.
pub fn resource_analysis(program: &Program) -> AnalysisContext<'_, CountAnalysis> {
    AnalysisContext::new(program, CountAnalysis::new()).with_default_checkers()
}

pub fn run_intra_procedural<A: DefaultCheckers>(
    program: &Program,
    analysis: A,
    root: MethodId,
    initial: A::Domain,
    policy: IteratorPolicy,
) -> Result<AnalysisReport<A::Domain>, AnalysisError> {
    AnalysisContext::new(program, analysis)
        .with_default_checkers()
        .with_policy(policy)
        .run_intra_procedural(root, initial)
}

pub fn run_inter_procedural<'p, A: DefaultCheckers>(
    program: &'p Program,
    analysis: A,
    root: MethodId,
    initial: A::Domain,
    policy: IteratorPolicy,
    filter: impl MethodFilter + 'p,
) -> Result<AnalysisReport<A::Domain>, AnalysisError> {
    AnalysisContext::new(program, analysis)
        .with_default_checkers()
        .with_policy(policy)
        .with_filter(filter)
        .run_inter_procedural(root, initial)
}
