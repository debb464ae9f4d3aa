/*! Unified interface for Covenant contract generation.
 *
 * Single import for everything you need: the validated specification tree and
 * the Solidity lowering backend. The front-end parser and validator live
 * outside this workspace; specifications cross the boundary as JSON.
 */

pub use covenant_ast as ast;
pub use covenant_codegen as codegen;

pub use covenant_ast::{
    ArithOp, Assignable, AuthExpression, AuthOp, AuthTerm, DataType, Expression, LogicOp,
    Specification, SpecificationMetadata, StateMachine, Statement, TimeUnit, Transition, Variable,
};

pub use covenant_codegen::{generate, CodegenError, ContractEmitter};
