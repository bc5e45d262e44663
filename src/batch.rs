use absint_engine::{Analysis, AnalysisError};
use absint_ir::{MethodId, Program};
use rayon::prelude::*;

use crate::{AnalysisContext, AnalysisReport};

/// Run an intra-procedural analysis of each method in parallel.
///
/// Every method gets its own context from `make_context`, so no state is
/// shared between the runs and the reports equal those of running the
/// methods one after another. Results keep the order of `methods`.
pub fn analyze_methods<'p, A, F>(
    program: &'p Program,
    methods: &[MethodId],
    initial: &A::Domain,
    make_context: F,
) -> Vec<(MethodId, Result<AnalysisReport<A::Domain>, AnalysisError>)>
where
    A: Analysis,
    A::Domain: Send + Sync,
    F: Fn(&'p Program) -> AnalysisContext<'p, A> + Sync,
{
    methods
        .par_iter()
        .map(|&method| {
            let mut context = make_context(program);
            (method, context.run_intra_procedural(method, initial.clone()))
        })
        .collect()
}
