//! Abstract interpretation of method control-flow graphs.
//!
//! The workspace is split by concern: `absint-ir` holds the graphs,
//! `absint-engine` the fixpoint and interprocedural machinery, the domain
//! crates their lattices and transfer functions, and `absint-checker` the
//! fact derivation. This crate ties them into an [`AnalysisContext`] that
//! runs an analysis and reports what it proved.
//!
//! ```
//! use absint::prelude::*;
//!
//! let mut b = MethodBuilder::new("first");
//! let (a, v) = (b.var(), b.var());
//! let alloc = b.append(b.entry(), NodeKind::NewArray { dst: a, length: Operand::Const(4) });
//! let load = b.append(alloc, NodeKind::LoadIndexed {
//!     dst: v,
//!     array: a,
//!     index: Operand::Const(0),
//!     known_length: None,
//! });
//! b.append(load, NodeKind::Return { value: Some(v.into()) });
//!
//! let mut program = Program::new();
//! let root = program.add(b.finish().unwrap());
//! let report = bounds_analysis(&program).run_intra_procedural(root, IntervalEnv::top()).unwrap();
//! assert_eq!(report.safety(NodeRef::new(root, load)), Safety::Safe);
//! ```

mod batch;
mod context;
mod report;

pub use absint_checker as checker;
pub use absint_count as count;
pub use absint_engine as engine;
pub use absint_interval as interval;
pub use absint_ir as ir;

pub use batch::analyze_methods;
pub use context::{
    AnalysisContext, DefaultCheckers, bounds_analysis, resource_analysis, run_inter_procedural,
    run_intra_procedural,
};
pub use report::AnalysisReport;

pub mod prelude {
    pub use crate::{
        AnalysisContext, AnalysisReport, bounds_analysis, resource_analysis, run_inter_procedural,
        run_intra_procedural,
    };
    pub use absint_checker::{Fact, FactKind, FactSet, Safety, Truth};
    pub use absint_count::Count;
    pub use absint_engine::{AnalysisError, IteratorPolicy, WideningStrategy};
    pub use absint_interval::{Interval, IntervalEnv};
    pub use absint_ir::*;
}
