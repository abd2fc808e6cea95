use crate::{Expression, LEAF_PRECEDENCE, OpPrecedence, SqlWriter};

/// Leaf of an expression tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand<'a> {
    /// Quoted column identifier.
    Column(&'a str),
    /// Parameter placeholder.
    QuestionMark,
    LitInt(i64),
    Null,
    /// Caller supplied SQL, written verbatim inside parentheses.
    Raw(&'a str),
}

impl OpPrecedence for Operand<'_> {
    fn precedence(&self, _writer: &dyn SqlWriter) -> i32 {
        LEAF_PRECEDENCE
    }
}

impl Expression for Operand<'_> {
    fn write_query(&self, writer: &dyn SqlWriter, out: &mut String) {
        writer.write_expression_operand(out, self)
    }
}
