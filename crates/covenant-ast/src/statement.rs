use crate::expression::{Assignable, Expression};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Statement {
    Assign {
        target: Assignable,
        value: Expression,
    },
    /// Value transfer. Amount expressions are validated non-negative upstream.
    /// When `source` names a funding field, the amount is bound once, the field
    /// is decremented, and only then is the transfer performed.
    Send {
        destination: Expression,
        amount: Expression,
        source: Option<String>,
    },
    Append {
        sequence: Assignable,
        element: Expression,
    },
    Clear {
        sequence: Assignable,
    },
}
