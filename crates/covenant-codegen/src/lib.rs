/*! Solidity lowering backend for Covenant protocol specifications.
 *
 * Turns a validated state-machine specification into deployable contract source:
 * type mapping, expression and statement compilation, authorization clauses with
 * persistent approval bookkeeping, auto-transition interposition, payable-field
 * inference, and on-demand helper synthesis. The input tree is trusted to be
 * type-checked; violations of upstream invariants abort generation instead of
 * producing malformed output.
 */

pub mod auth;
pub mod contract;
pub mod emitter;
pub mod expr;
pub mod helpers;
pub mod stmt;
pub mod transition;
pub mod types;

pub use contract::ContractEmitter;
pub use emitter::EmitContext;
pub use expr::{ExprRenderer, Scope};
pub use helpers::Usage;

use covenant_ast::Specification;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodegenError {
    #[error("membership operator reached the generic binary-operator renderer in '{0}'")]
    MembershipInBinaryArm(String),
    #[error("auto transition '{0}' has no guard")]
    AutoWithoutGuard(String),
    #[error("transition '{0}' has no origin, but '{1}' is already the initial transition")]
    DuplicateInitialTransition(String, String),
    #[error("membership test over unresolvable sequence '{0}'")]
    UnknownSequence(String),
    #[error("membership test over non-sequence expression '{0}'")]
    NotASequence(String),
}

pub type Result<T> = std::result::Result<T, CodegenError>;

/// Lower a validated specification to contract source text.
///
/// Total and deterministic for a given valid input: identical specifications
/// produce byte-identical output.
pub fn generate(spec: &Specification) -> Result<String> {
    tracing::debug!(contract = %spec.name, "generating contract source");
    ContractEmitter::new(spec).emit_to_string()
}
