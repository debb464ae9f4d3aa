/*! Validated protocol specification tree consumed by the Covenant generator.
 *
 * The front-end parser and static validator produce this tree; everything here is
 * immutable input from the generator's point of view. Invariants such as "only the
 * initial transition has no origin" and "auto transitions carry a guard" are
 * established upstream and trusted downstream.
 */

pub mod auth;
pub mod expression;
pub mod machine;
pub mod statement;
pub mod types;

pub use auth::{AuthExpression, AuthOp, AuthTerm};
pub use expression::{ArithOp, Assignable, Expression, LogicOp, TimeUnit};
pub use machine::{Specification, SpecificationMetadata, StateMachine, Transition};
pub use statement::Statement;
pub use types::{DataType, Variable};
