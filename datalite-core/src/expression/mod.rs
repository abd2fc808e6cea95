//! Conditions of the `WHERE` clauses the engine writes: identity comparisons, field
//! equality, null checks and raw predicates.

mod binary_op;
mod conjunction;
mod expression;
mod op_precedence;
mod operand;

pub use binary_op::*;
pub use conjunction::*;
pub use expression::*;
pub use op_precedence::*;
pub use operand::*;
