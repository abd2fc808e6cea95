use crate::{OpPrecedence, SqlWriter};
use std::fmt::Debug;

/// A condition, or part of one, that a [`SqlWriter`] can print.
///
/// `true` is the condition that matches every row.
pub trait Expression: OpPrecedence + Send + Sync + Debug {
    fn write_query(&self, writer: &dyn SqlWriter, out: &mut String);
}

impl<T: Expression> Expression for &T {
    fn write_query(&self, writer: &dyn SqlWriter, out: &mut String) {
        T::write_query(self, writer, out)
    }
}

impl Expression for &dyn Expression {
    fn write_query(&self, writer: &dyn SqlWriter, out: &mut String) {
        (**self).write_query(writer, out)
    }
}

impl Expression for bool {
    fn write_query(&self, writer: &dyn SqlWriter, out: &mut String) {
        writer.write_value_bool(out, *self)
    }
}
