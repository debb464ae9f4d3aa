use crate::expression::Expression;
use serde::{Deserialize, Serialize};

/// One atomic approval condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthTerm {
    /// Caller must equal this address-valued expression.
    Identity(Expression),
    /// Caller must be a member of the named collection field.
    AnyOf(String),
    /// Every member of the named collection field must approve.
    AllOf(String),
}

impl AuthTerm {
    /// Name used to derive approval-bookkeeping variable names.
    pub fn referenced_name(&self) -> &str {
        match self {
            AuthTerm::Identity(expr) => expr.root_name().unwrap_or("identity"),
            AuthTerm::AnyOf(collection) | AuthTerm::AllOf(collection) => collection,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthExpression {
    Term(AuthTerm),
    Combined {
        left: Box<AuthExpression>,
        op: AuthOp,
        right: Box<AuthExpression>,
    },
}

impl AuthExpression {
    /// Leaf terms in left-to-right order.
    pub fn flatten(&self) -> Vec<&AuthTerm> {
        let mut terms = Vec::new();
        self.collect(&mut terms);
        terms
    }

    fn collect<'a>(&'a self, terms: &mut Vec<&'a AuthTerm>) {
        match self {
            AuthExpression::Term(term) => terms.push(term),
            AuthExpression::Combined { left, right, .. } => {
                left.collect(terms);
                right.collect(terms);
            }
        }
    }
}
