use std::fmt;

use crate::{MethodId, Var};

/// An operand of a node: a variable or an integer literal.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operand {
    Var(Var),
    Const(i64),
}

impl Operand {
    pub fn as_var(self) -> Option<Var> {
        match self {
            Operand::Var(v) => Some(v),
            Operand::Const(_) => None,
        }
    }

    pub fn as_const(self) -> Option<i64> {
        match self {
            Operand::Const(c) => Some(c),
            Operand::Var(_) => None,
        }
    }
}

impl From<Var> for Operand {
    fn from(v: Var) -> Self {
        Operand::Var(v)
    }
}

impl From<i64> for Operand {
    fn from(c: i64) -> Self {
        Operand::Const(c)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Var(v) => write!(f, "{v}"),
            Operand::Const(c) => write!(f, "{c}"),
        }
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Min,
    Max,
    And,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Rem => "rem",
            BinaryOp::Min => "min",
            BinaryOp::Max => "max",
            BinaryOp::And => "and",
        };
        f.write_str(s)
    }
}

/// Signed integer comparison.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CmpOp {
    /// The comparison that holds exactly when `self` does not.
    pub fn negate(self) -> Self {
        match self {
            CmpOp::Lt => CmpOp::Ge,
            CmpOp::Le => CmpOp::Gt,
            CmpOp::Gt => CmpOp::Le,
            CmpOp::Ge => CmpOp::Lt,
            CmpOp::Eq => CmpOp::Ne,
            CmpOp::Ne => CmpOp::Eq,
        }
    }

    /// The comparison with its operands exchanged: `a op b == b op.swap() a`.
    pub fn swap(self) -> Self {
        match self {
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::Le => CmpOp::Ge,
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::Ge => CmpOp::Le,
            CmpOp::Eq => CmpOp::Eq,
            CmpOp::Ne => CmpOp::Ne,
        }
    }

    pub fn eval(self, lhs: i64, rhs: i64) -> bool {
        match self {
            CmpOp::Lt => lhs < rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
        };
        f.write_str(s)
    }
}

/// The condition of an `If` node: `lhs op rhs`.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Condition {
    pub op: CmpOp,
    pub lhs: Operand,
    pub rhs: Operand,
}

impl Condition {
    pub fn new(op: CmpOp, lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Self {
        Self {
            op,
            lhs: lhs.into(),
            rhs: rhs.into(),
        }
    }

    pub fn negate(self) -> Self {
        Self {
            op: self.op.negate(),
            ..self
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.op, self.rhs)
    }
}

/// Tag of a control-flow edge.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Edge {
    /// Unconditional fall-through.
    Next,
    /// Taken when the `If` condition holds.
    True,
    /// Taken when the `If` condition fails.
    False,
}

/// The closed set of node kinds the analyses understand.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeKind {
    /// Method entry. Parameters are bound here.
    Start,
    Const {
        dst: Var,
        value: i64,
    },
    Copy {
        dst: Var,
        src: Operand,
    },
    Binary {
        dst: Var,
        op: BinaryOp,
        lhs: Operand,
        rhs: Operand,
    },
    /// A value the IR knows nothing about (field read, foreign call result).
    Opaque {
        dst: Var,
    },
    NewArray {
        dst: Var,
        length: Operand,
    },
    ArrayLength {
        dst: Var,
        array: Var,
    },
    /// `dst = array[index]`. `known_length` carries a statically known
    /// array length when the compiler has one.
    LoadIndexed {
        dst: Var,
        array: Var,
        index: Operand,
        known_length: Option<i64>,
    },
    /// `array[index] = value`.
    StoreIndexed {
        array: Var,
        index: Operand,
        value: Operand,
        known_length: Option<i64>,
    },
    If {
        condition: Condition,
    },
    /// Control-flow merge; loop headers are merges with a back edge.
    Merge,
    Invoke {
        dst: Option<Var>,
        target: MethodId,
        args: Vec<Operand>,
    },
    /// Opens a resource.
    Acquire,
    /// Closes a resource.
    Release,
    Return {
        value: Option<Operand>,
    },
}

impl NodeKind {
    /// The variable this node assigns, if any.
    pub fn def(&self) -> Option<Var> {
        match self {
            NodeKind::Const { dst, .. }
            | NodeKind::Copy { dst, .. }
            | NodeKind::Binary { dst, .. }
            | NodeKind::Opaque { dst }
            | NodeKind::NewArray { dst, .. }
            | NodeKind::ArrayLength { dst, .. }
            | NodeKind::LoadIndexed { dst, .. } => Some(*dst),
            NodeKind::Invoke { dst, .. } => *dst,
            NodeKind::Start
            | NodeKind::StoreIndexed { .. }
            | NodeKind::If { .. }
            | NodeKind::Merge
            | NodeKind::Acquire
            | NodeKind::Release
            | NodeKind::Return { .. } => None,
        }
    }

    /// Whether this node reads or writes an array element.
    pub fn is_indexed_access(&self) -> bool {
        matches!(
            self,
            NodeKind::LoadIndexed { .. } | NodeKind::StoreIndexed { .. }
        )
    }

    /// `(array, index, known_length)` of an indexed access.
    pub fn access(&self) -> Option<(Var, Operand, Option<i64>)> {
        match self {
            NodeKind::LoadIndexed {
                array,
                index,
                known_length,
                ..
            }
            | NodeKind::StoreIndexed {
                array,
                index,
                known_length,
                ..
            } => Some((*array, *index, *known_length)),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Start => f.write_str("start"),
            NodeKind::Const { dst, value } => write!(f, "{dst} = const {value}"),
            NodeKind::Copy { dst, src } => write!(f, "{dst} = {src}"),
            NodeKind::Binary { dst, op, lhs, rhs } => write!(f, "{dst} = {op} {lhs}, {rhs}"),
            NodeKind::Opaque { dst } => write!(f, "{dst} = opaque"),
            NodeKind::NewArray { dst, length } => write!(f, "{dst} = new_array {length}"),
            NodeKind::ArrayLength { dst, array } => write!(f, "{dst} = length {array}"),
            NodeKind::LoadIndexed {
                dst, array, index, ..
            } => write!(f, "{dst} = load {array}[{index}]"),
            NodeKind::StoreIndexed {
                array,
                index,
                value,
                ..
            } => write!(f, "store {array}[{index}] = {value}"),
            NodeKind::If { condition } => write!(f, "if {condition}"),
            NodeKind::Merge => f.write_str("merge"),
            NodeKind::Invoke { dst, target, args } => {
                if let Some(dst) = dst {
                    write!(f, "{dst} = ")?;
                }
                write!(f, "invoke {target}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            NodeKind::Acquire => f.write_str("acquire"),
            NodeKind::Release => f.write_str("release"),
            NodeKind::Return { value: Some(v) } => write!(f, "return {v}"),
            NodeKind::Return { value: None } => f.write_str("return"),
        }
    }
}
