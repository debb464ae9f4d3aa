use crate::auth::AuthExpression;
use crate::expression::Expression;
use crate::statement::Statement;
use crate::types::{DataType, Variable};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub name: String,
    /// Absent only on the single constructor-equivalent initial transition.
    #[serde(default)]
    pub origin: Option<String>,
    pub destination: String,
    #[serde(default)]
    pub parameters: Vec<Variable>,
    #[serde(default)]
    pub guard: Option<Expression>,
    #[serde(default)]
    pub authorization: Option<AuthExpression>,
    #[serde(default)]
    pub body: Vec<Statement>,
    /// Fires opportunistically ahead of any explicit call sharing its origin.
    /// Validated upstream to always carry a guard.
    #[serde(default)]
    pub auto: bool,
}

impl Transition {
    pub fn is_initial(&self) -> bool {
        self.origin.is_none()
    }

    pub fn is_self_loop(&self) -> bool {
        self.origin.as_deref() == Some(self.destination.as_str())
    }

    pub fn has_parameters(&self) -> bool {
        !self.parameters.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMachine {
    /// Insertion-ordered so enum emission is byte-stable across runs.
    pub states: IndexSet<String>,
    pub fields: Vec<Variable>,
    pub transitions: Vec<Transition>,
}

impl StateMachine {
    pub fn field_type(&self, name: &str) -> Option<&DataType> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.ty)
    }

    /// Auto-flagged transitions leaving `origin`, in declaration order,
    /// excluding `except` (a transition never interposes itself).
    pub fn auto_transitions_from<'a>(
        &'a self,
        origin: &'a str,
        except: &'a str,
    ) -> impl Iterator<Item = &'a Transition> {
        self.transitions.iter().filter(move |t| {
            t.auto && t.name != except && t.origin.as_deref() == Some(origin)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specification {
    pub name: String,
    pub machine: StateMachine,
    #[serde(default)]
    pub metadata: SpecificationMetadata,
}

/// Front-end metadata carried through but not consumed by code generation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpecificationMetadata {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}
