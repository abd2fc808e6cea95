use crate::{Expression, SqlWriter};

/// Leaves of an expression tree never need parentheses.
pub const LEAF_PRECEDENCE: i32 = i32::MAX;

/// Binding strength of an expression, writers parenthesize children that bind weaker than
/// their parent.
pub trait OpPrecedence {
    fn precedence(&self, writer: &dyn SqlWriter) -> i32;
}

impl<T: OpPrecedence> OpPrecedence for &T {
    fn precedence(&self, writer: &dyn SqlWriter) -> i32 {
        T::precedence(self, writer)
    }
}

impl OpPrecedence for &dyn Expression {
    fn precedence(&self, writer: &dyn SqlWriter) -> i32 {
        (**self).precedence(writer)
    }
}

impl OpPrecedence for bool {
    fn precedence(&self, _writer: &dyn SqlWriter) -> i32 {
        LEAF_PRECEDENCE
    }
}
