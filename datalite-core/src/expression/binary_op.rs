use crate::{Expression, OpPrecedence, SqlWriter};

/// Comparison and logical operators usable in a `WHERE` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOpType {
    Is,
    Equal,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOpType {
    /// The operator with its surrounding spaces.
    pub fn infix(&self) -> &'static str {
        match self {
            BinaryOpType::Is => " IS ",
            BinaryOpType::Equal => " = ",
            BinaryOpType::Less => " < ",
            BinaryOpType::Greater => " > ",
            BinaryOpType::LessEqual => " <= ",
            BinaryOpType::GreaterEqual => " >= ",
            BinaryOpType::And => " AND ",
            BinaryOpType::Or => " OR ",
        }
    }
}

/// `lhs <op> rhs`, for example `"obj_id" > ?`.
#[derive(Debug)]
pub struct BinaryOp<L: Expression, R: Expression> {
    pub op: BinaryOpType,
    pub lhs: L,
    pub rhs: R,
}

impl<L: Expression, R: Expression> BinaryOp<L, R> {
    pub fn new(op: BinaryOpType, lhs: L, rhs: R) -> Self {
        Self { op, lhs, rhs }
    }
}

impl<L: Expression, R: Expression> OpPrecedence for BinaryOp<L, R> {
    fn precedence(&self, writer: &dyn SqlWriter) -> i32 {
        writer.expression_binary_op_precedence(&self.op)
    }
}

impl<L: Expression, R: Expression> Expression for BinaryOp<L, R> {
    fn write_query(&self, writer: &dyn SqlWriter, out: &mut String) {
        let erased: BinaryOp<&dyn Expression, &dyn Expression> =
            BinaryOp::new(self.op, &self.lhs, &self.rhs);
        writer.write_expression_binary_op(out, &erased)
    }
}
