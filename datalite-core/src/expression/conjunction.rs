use crate::{BinaryOpType, Expression, OpPrecedence, SqlWriter, possibly_parenthesized};

/// Every expression must hold, an empty conjunction is always true.
#[derive(Debug)]
pub struct Conjunction<E: Expression>(pub Vec<E>);

impl<E: Expression> OpPrecedence for Conjunction<E> {
    fn precedence(&self, writer: &dyn SqlWriter) -> i32 {
        match self.0.as_slice() {
            [] => true.precedence(writer),
            [single] => single.precedence(writer),
            _ => writer.expression_binary_op_precedence(&BinaryOpType::And),
        }
    }
}

impl<E: Expression> Expression for Conjunction<E> {
    fn write_query(&self, writer: &dyn SqlWriter, out: &mut String) {
        if self.0.is_empty() {
            return writer.write_value_bool(out, true);
        }
        let precedence = writer.expression_binary_op_precedence(&BinaryOpType::And);
        let single = self.0.len() == 1;
        for (i, expression) in self.0.iter().enumerate() {
            if i > 0 {
                out.push_str(" AND ");
            }
            possibly_parenthesized!(
                out,
                !single && expression.precedence(writer) <= precedence,
                expression.write_query(writer, out)
            );
        }
    }
}
