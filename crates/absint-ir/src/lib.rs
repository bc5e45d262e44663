mod builder;
mod ids;
mod lattice;
mod method;
mod node;
mod program;

pub use builder::{BuildError, MethodBuilder};
pub use ids::{MethodId, NodeId, NodeRef, Var};
pub use lattice::{HasBottom, HasTop, Lattice};
pub use method::{CfgOrder, Method, Param, ParamKind};
pub use node::{BinaryOp, CmpOp, Condition, Edge, NodeKind, Operand};
pub use program::Program;

pub use smallvec::{self, SmallVec};
