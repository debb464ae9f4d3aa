use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        };
        write!(f, "{}", op)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicOp {
    Less,
    LessEq,
    Eq,
    NotEq,
    GreaterEq,
    Greater,
    And,
    Or,
    In,
    NotIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expression {
    Variable(String),
    Lookup {
        map: Box<Expression>,
        key: Box<Expression>,
    },
    IntLiteral(i128),
    StringLiteral(String),
    BoolLiteral(bool),
    TimeLiteral(TimeUnit),
    Arithmetic {
        left: Box<Expression>,
        op: ArithOp,
        right: Box<Expression>,
    },
    Logical {
        left: Box<Expression>,
        op: LogicOp,
        right: Box<Expression>,
    },
    SizeOf(Box<Expression>),
}

impl Expression {
    /// True for arithmetic and logical operations, the only node kinds whose
    /// rendering may need parenthesization when nested.
    pub fn is_operation(&self) -> bool {
        matches!(
            self,
            Expression::Arithmetic { .. } | Expression::Logical { .. }
        )
    }

    /// The field or parameter name an expression ultimately reads from, if any.
    /// A mapping lookup resolves to the name of the mapping itself.
    pub fn root_name(&self) -> Option<&str> {
        match self {
            Expression::Variable(name) => Some(name),
            Expression::Lookup { map, .. } => map.root_name(),
            _ => None,
        }
    }
}

/// Subset of expressions valid as an assignment target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Assignable {
    Variable(String),
    Lookup {
        map: Box<Assignable>,
        key: Box<Expression>,
    },
}

impl Assignable {
    pub fn root_name(&self) -> &str {
        match self {
            Assignable::Variable(name) => name,
            Assignable::Lookup { map, .. } => map.root_name(),
        }
    }
}
