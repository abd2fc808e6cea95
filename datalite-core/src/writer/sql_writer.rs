use crate::{
    BinaryOp, BinaryOpType, ColumnDef, Expression, IDENTITY_COLUMN, Operand, Schema, Value,
    possibly_parenthesized, separated_by,
};
use std::fmt::Write;
use time::{Date, PrimitiveDateTime, Time};

macro_rules! write_integer {
    ($out:ident, $value:expr) => {{
        let mut buffer = itoa::Buffer::new();
        $out.push_str(buffer.format($value));
    }};
}
macro_rules! write_float {
    ($this:ident, $out:ident, $value:expr) => {{
        if $value.is_infinite() {
            $this.write_value_infinity($out, $value.is_sign_negative());
        } else if $value.is_nan() {
            $this.write_value_nan($out);
        } else {
            let mut buffer = ryu::Buffer::new();
            $out.push_str(buffer.format($value));
        }
    }};
}

/// Dialect printer converting schemas, values and expressions into SQL text.
///
/// Every statement the engine issues is written through this trait. Drivers override the
/// hooks where their dialect differs from the generic rendering.
pub trait SqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter;

    /// Escape occurrences of `search` char with `replace` while copying into buffer.
    fn write_escaped(&self, out: &mut String, value: &str, search: char, replace: &str) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    /// Quote identifiers ("name") doubling inner quotes.
    fn write_identifier_quoted(&self, out: &mut String, value: &str) {
        out.push('"');
        self.write_escaped(out, value, '"', "\"\"");
        out.push('"');
    }

    /// Render the SQL type for a `Value` prototype.
    fn write_column_type(&self, out: &mut String, value: &Value) {
        match value {
            Value::Boolean(..) => out.push_str("BOOLEAN"),
            Value::Int8(..) => out.push_str("TINYINT"),
            Value::Int16(..) => out.push_str("SMALLINT"),
            Value::Int32(..) => out.push_str("INTEGER"),
            Value::Int64(..) => out.push_str("BIGINT"),
            Value::UInt8(..) => out.push_str("UTINYINT"),
            Value::UInt16(..) => out.push_str("USMALLINT"),
            Value::UInt32(..) => out.push_str("UINTEGER"),
            Value::UInt64(..) => out.push_str("UBIGINT"),
            Value::Float32(..) => out.push_str("FLOAT"),
            Value::Float64(..) => out.push_str("DOUBLE"),
            Value::Varchar(..) => out.push_str("VARCHAR"),
            Value::Blob(..) => out.push_str("BLOB"),
            Value::Date(..) => out.push_str("DATE"),
            Value::Time(..) => out.push_str("TIME"),
            Value::Timestamp(..) => out.push_str("TIMESTAMP"),
            Value::Uuid(..) => out.push_str("UUID"),
            Value::Null => log::error!("Cannot get the column type of an untyped null"),
        };
    }

    /// Render a concrete value (including proper quoting / escaping).
    fn write_value(&self, out: &mut String, value: &Value) {
        match value {
            v if v.is_null() => self.write_value_none(out),
            Value::Boolean(Some(v)) => self.write_value_bool(out, *v),
            Value::Int8(Some(v)) => write_integer!(out, *v),
            Value::Int16(Some(v)) => write_integer!(out, *v),
            Value::Int32(Some(v)) => write_integer!(out, *v),
            Value::Int64(Some(v)) => write_integer!(out, *v),
            Value::UInt8(Some(v)) => write_integer!(out, *v),
            Value::UInt16(Some(v)) => write_integer!(out, *v),
            Value::UInt32(Some(v)) => write_integer!(out, *v),
            Value::UInt64(Some(v)) => write_integer!(out, *v),
            Value::Float32(Some(v)) => write_float!(self, out, *v),
            Value::Float64(Some(v)) => write_float!(self, out, *v),
            Value::Varchar(Some(v)) => self.write_value_string(out, v),
            Value::Blob(Some(v)) => self.write_value_blob(out, v.as_ref()),
            Value::Date(Some(v)) => self.write_value_date(out, v, false),
            Value::Time(Some(v)) => self.write_value_time(out, v, false),
            Value::Timestamp(Some(v)) => self.write_value_timestamp(out, v),
            Value::Uuid(Some(v)) => drop(write!(out, "'{}'", v)),
            _ => log::error!("Cannot write {:?}", value),
        };
    }

    /// Render NULL literal.
    fn write_value_none(&self, out: &mut String) {
        out.push_str("NULL");
    }

    /// Render boolean literal.
    fn write_value_bool(&self, out: &mut String, value: bool) {
        out.push_str(["false", "true"][value as usize]);
    }

    fn write_value_infinity(&self, out: &mut String, negative: bool) {
        out.push_str(if negative {
            "CAST('-Infinity' AS DOUBLE)"
        } else {
            "CAST('Infinity' AS DOUBLE)"
        });
    }

    fn write_value_nan(&self, out: &mut String) {
        out.push_str("CAST('NaN' AS DOUBLE)");
    }

    /// Render and escape a string literal using single quotes.
    fn write_value_string(&self, out: &mut String, value: &str) {
        out.push('\'');
        self.write_escaped(out, value, '\'', "''");
        out.push('\'');
    }

    /// Render a blob literal using hex escapes.
    fn write_value_blob(&self, out: &mut String, value: &[u8]) {
        out.push('\'');
        for b in value {
            let _ = write!(out, "\\x{:02X}", b);
        }
        out.push('\'');
    }

    /// Render a DATE literal (optionally as part of TIMESTAMP composition).
    fn write_value_date(&self, out: &mut String, value: &Date, timestamp: bool) {
        let b = if timestamp { "" } else { "'" };
        let _ = write!(
            out,
            "{b}{:04}-{:02}-{:02}{b}",
            value.year(),
            value.month() as u8,
            value.day()
        );
    }

    /// Render a TIME literal (optionally as part of TIMESTAMP composition).
    fn write_value_time(&self, out: &mut String, value: &Time, timestamp: bool) {
        let mut subsecond = value.nanosecond();
        let mut width = 9;
        while width > 1 && subsecond % 10 == 0 {
            subsecond /= 10;
            width -= 1;
        }
        let b = if timestamp { "" } else { "'" };
        let _ = write!(
            out,
            "{b}{:02}:{:02}:{:02}.{:0width$}{b}",
            value.hour(),
            value.minute(),
            value.second(),
            subsecond
        );
    }

    /// Render a TIMESTAMP literal, in the same text form values are bound with.
    fn write_value_timestamp(&self, out: &mut String, value: &PrimitiveDateTime) {
        out.push('\'');
        self.write_value_date(out, &value.date(), true);
        out.push(' ');
        self.write_value_time(out, &value.time(), true);
        out.push('\'');
    }

    /// Precedence table for binary operators.
    fn expression_binary_op_precedence(&self, value: &BinaryOpType) -> i32 {
        match value {
            BinaryOpType::Or => 100,
            BinaryOpType::And => 200,
            BinaryOpType::Equal
            | BinaryOpType::Less
            | BinaryOpType::Greater
            | BinaryOpType::LessEqual
            | BinaryOpType::GreaterEqual => 300,
            BinaryOpType::Is => 400,
        }
    }

    /// Render an operand.
    fn write_expression_operand(&self, out: &mut String, value: &Operand) {
        match value {
            Operand::Column(v) => self.write_identifier_quoted(out, v),
            Operand::QuestionMark => self.write_expression_operand_question_mark(out),
            Operand::LitInt(v) => write_integer!(out, *v),
            Operand::Null => self.write_value_none(out),
            Operand::Raw(v) => {
                out.push('(');
                out.push_str(v);
                out.push(')');
            }
        };
    }

    /// Render parameter placeholder (dialect may override).
    fn write_expression_operand_question_mark(&self, out: &mut String) {
        out.push('?');
    }

    /// Render binary operator expression handling precedence / parenthesis.
    fn write_expression_binary_op(
        &self,
        out: &mut String,
        value: &BinaryOp<&dyn Expression, &dyn Expression>,
    ) {
        let precedence = self.expression_binary_op_precedence(&value.op);
        possibly_parenthesized!(
            out,
            value.lhs.precedence(self.as_dyn()) < precedence,
            value.lhs.write_query(self.as_dyn(), out)
        );
        out.push_str(value.op.infix());
        possibly_parenthesized!(
            out,
            value.rhs.precedence(self.as_dyn()) <= precedence,
            value.rhs.write_query(self.as_dyn(), out)
        );
    }

    /// Emit BEGIN statement.
    fn write_transaction_begin(&self, out: &mut String) {
        out.push_str("BEGIN;");
    }

    /// Emit COMMIT statement.
    fn write_transaction_commit(&self, out: &mut String) {
        out.push_str("COMMIT;");
    }

    /// Emit ROLLBACK statement.
    fn write_transaction_rollback(&self, out: &mut String) {
        out.push_str("ROLLBACK;");
    }

    /// Emit CREATE TABLE for `schema` under the name `table`.
    fn write_create_table(
        &self,
        out: &mut String,
        schema: &Schema,
        table: &str,
        if_not_exists: bool,
    ) {
        out.reserve(128 + schema.columns.len() * 48);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("CREATE TABLE ");
        if if_not_exists {
            out.push_str("IF NOT EXISTS ");
        }
        self.write_identifier_quoted(out, table);
        out.push_str(" (\n");
        separated_by(
            out,
            &schema.columns,
            |out, v| self.write_create_table_column_fragment(out, v),
            ",\n",
        );
        out.push_str(");");
    }

    /// Emit single column definition fragment.
    fn write_create_table_column_fragment(&self, out: &mut String, column: &ColumnDef) {
        self.write_identifier_quoted(out, column.name);
        out.push(' ');
        if column.primary_key && column.auto_increment {
            return self.write_column_identity(out, column);
        }
        self.write_column_type(out, &column.value);
        if !column.nullable && !column.primary_key {
            out.push_str(" NOT NULL");
        }
        if let Some(default) = column.default.as_ref().filter(|v| !v.is_null()) {
            out.push_str(" DEFAULT ");
            self.write_value(out, default);
        }
        if column.primary_key {
            out.push_str(" PRIMARY KEY");
        } else if column.unique {
            out.push_str(" UNIQUE");
        }
    }

    /// Type and constraints of the auto assigned identity column.
    fn write_column_identity(&self, out: &mut String, column: &ColumnDef) {
        self.write_column_type(out, &column.value);
        out.push_str(" GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY");
    }

    /// Emit DROP TABLE statement.
    fn write_drop_table(&self, out: &mut String, table: &str, if_exists: bool) {
        out.reserve(24 + table.len());
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("DROP TABLE ");
        if if_exists {
            out.push_str("IF EXISTS ");
        }
        self.write_identifier_quoted(out, table);
        out.push(';');
    }

    /// Emit ALTER TABLE .. RENAME TO.
    fn write_rename_table(&self, out: &mut String, from: &str, to: &str) {
        out.reserve(32 + from.len() + to.len());
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("ALTER TABLE ");
        self.write_identifier_quoted(out, from);
        out.push_str(" RENAME TO ");
        self.write_identifier_quoted(out, to);
        out.push(';');
    }

    /// Emit SELECT ordered by identity, with optional LIMIT and OFFSET.
    fn write_select(
        &self,
        out: &mut String,
        columns: &[&str],
        table: &str,
        condition: &dyn Expression,
        limit: Option<u64>,
        offset: Option<u64>,
    ) {
        out.reserve(128 + columns.len() * 32);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("SELECT ");
        separated_by(
            out,
            columns,
            |out, v| self.write_identifier_quoted(out, v),
            ", ",
        );
        out.push_str("\nFROM ");
        self.write_identifier_quoted(out, table);
        out.push_str("\nWHERE ");
        condition.write_query(self.as_dyn(), out);
        out.push_str("\nORDER BY ");
        self.write_identifier_quoted(out, IDENTITY_COLUMN);
        self.write_select_limit(out, limit, offset);
        out.push(';');
    }

    fn write_select_limit(&self, out: &mut String, limit: Option<u64>, offset: Option<u64>) {
        if let Some(limit) = limit {
            out.push_str("\nLIMIT ");
            write_integer!(out, limit);
        }
        if let Some(offset) = offset.filter(|v| *v > 0) {
            out.push_str("\nOFFSET ");
            write_integer!(out, offset);
        }
    }

    /// Emit a parameterized INSERT of `rows` rows into `table`.
    ///
    /// The identity column is listed only when `with_identity` is set (migrations keep the
    /// original identities), otherwise the store assigns it.
    fn write_insert(
        &self,
        out: &mut String,
        schema: &Schema,
        table: &str,
        rows: usize,
        with_identity: bool,
    ) {
        let columns = if with_identity {
            &schema.columns[..]
        } else {
            schema.fields()
        };
        out.reserve(64 + columns.len() * 24 + rows * columns.len() * 3);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("INSERT INTO ");
        self.write_identifier_quoted(out, table);
        if columns.is_empty() {
            out.push_str(" DEFAULT VALUES;");
            return;
        }
        out.push_str(" (");
        separated_by(
            out,
            columns,
            |out, v| self.write_identifier_quoted(out, v.name),
            ", ",
        );
        out.push_str(") VALUES\n");
        separated_by(
            out,
            0..rows.max(1),
            |out, _| {
                out.push('(');
                separated_by(
                    out,
                    columns,
                    |out, _| self.write_expression_operand_question_mark(out),
                    ", ",
                );
                out.push(')');
            },
            ",\n",
        );
        out.push(';');
    }

    /// Emit an UPDATE of every declared column of the row with a given identity.
    fn write_update(&self, out: &mut String, schema: &Schema, table: &str) {
        out.reserve(64 + schema.columns.len() * 24);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("UPDATE ");
        self.write_identifier_quoted(out, table);
        out.push_str(" SET\n");
        separated_by(
            out,
            schema.fields(),
            |out, v| {
                self.write_identifier_quoted(out, v.name);
                out.push_str(" = ");
                self.write_expression_operand_question_mark(out);
            },
            ",\n",
        );
        out.push_str("\nWHERE ");
        BinaryOp::new(
            BinaryOpType::Equal,
            Operand::Column(IDENTITY_COLUMN),
            Operand::QuestionMark,
        )
        .write_query(self.as_dyn(), out);
        out.push(';');
    }

    /// Emit DELETE statement with WHERE clause.
    fn write_delete(&self, out: &mut String, table: &str, condition: &dyn Expression) {
        out.reserve(64 + table.len());
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("DELETE FROM ");
        self.write_identifier_quoted(out, table);
        out.push_str("\nWHERE ");
        condition.write_query(self.as_dyn(), out);
        out.push(';');
    }

    /// Emit a query returning the column names of `table`, one per row in the first column.
    fn write_table_columns(&self, out: &mut String, table: &str) {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("SELECT column_name FROM information_schema.columns WHERE table_name = ");
        self.write_value_string(out, table);
        out.push_str(" ORDER BY ordinal_position;");
    }

    /// Emit the statement reading (`None`) or setting the rollback journal mode.
    ///
    /// Writes nothing when the dialect has no such setting.
    fn write_journal_mode(&self, _out: &mut String, _mode: Option<&str>) {}

    /// Maximum number of parameters a single statement can bind.
    fn max_bound_parameters(&self) -> usize {
        32766
    }

    /// Maximum number of rows a multi row INSERT carries.
    fn max_rows_per_insert(&self) -> usize {
        500
    }
}

/// Fallback generic SQL writer (closest to PostgreSQL / DuckDB conventions).
#[derive(Default)]
pub struct GenericSqlWriter;

impl GenericSqlWriter {
    pub fn new() -> Self {
        Self {}
    }
}

impl SqlWriter for GenericSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Conjunction, StorageClass};
    use indoc::indoc;
    use time::macros::{date, datetime, time};

    fn schema() -> Schema {
        Schema {
            table: "order",
            type_name: "Order",
            columns: vec![
                ColumnDef::identity(),
                ColumnDef {
                    name: "code",
                    value: Value::Varchar(None),
                    storage: StorageClass::Text,
                    nullable: false,
                    unique: true,
                    primary_key: false,
                    auto_increment: false,
                    default: None,
                },
                ColumnDef {
                    name: "amount",
                    value: Value::Float64(None),
                    storage: StorageClass::Real,
                    nullable: true,
                    unique: false,
                    primary_key: false,
                    auto_increment: false,
                    default: Some(Value::Float64(Some(1.5))),
                },
            ],
        }
    }

    #[test]
    fn create_and_drop() {
        let writer = GenericSqlWriter::new();
        let mut out = String::new();
        writer.write_create_table(&mut out, &schema(), "order", true);
        assert_eq!(
            out,
            indoc! {r#"
                CREATE TABLE IF NOT EXISTS "order" (
                "obj_id" BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
                "code" VARCHAR NOT NULL UNIQUE,
                "amount" DOUBLE DEFAULT 1.5);
            "#}
            .trim()
        );
        let mut out = String::new();
        writer.write_drop_table(&mut out, "order", true);
        writer.write_rename_table(&mut out, "order__tmp", "order");
        assert_eq!(
            out,
            "DROP TABLE IF EXISTS \"order\";\nALTER TABLE \"order__tmp\" RENAME TO \"order\";"
        );
    }

    #[test]
    fn select_with_pagination() {
        let writer = GenericSqlWriter::new();
        let mut out = String::new();
        writer.write_select(
            &mut out,
            &["obj_id", "code"],
            "order",
            &BinaryOp::new(
                BinaryOpType::Equal,
                Operand::Column("code"),
                Operand::QuestionMark,
            ),
            Some(10),
            Some(20),
        );
        assert_eq!(
            out,
            indoc! {r#"
                SELECT "obj_id", "code"
                FROM "order"
                WHERE "code" = ?
                ORDER BY "obj_id"
                LIMIT 10
                OFFSET 20;
            "#}
            .trim()
        );
    }

    #[test]
    fn conditions() {
        let writer = GenericSqlWriter::new();
        let mut out = String::new();
        Conjunction(vec![
            BinaryOp::new(
                BinaryOpType::GreaterEqual,
                Operand::Column("obj_id"),
                Operand::LitInt(3),
            ),
            BinaryOp::new(
                BinaryOpType::Less,
                Operand::Column("obj_id"),
                Operand::LitInt(7),
            ),
        ])
        .write_query(&writer, &mut out);
        assert_eq!(out, r#""obj_id" >= 3 AND "obj_id" < 7"#);

        let mut out = String::new();
        BinaryOp::new(
            BinaryOpType::Or,
            Operand::Raw("a = 1 OR b = 2"),
            BinaryOp::new(BinaryOpType::Is, Operand::Column("c"), Operand::Null),
        )
        .write_query(&writer, &mut out);
        assert_eq!(out, r#"(a = 1 OR b = 2) OR "c" IS NULL"#);

        let mut out = String::new();
        Conjunction::<Operand>(vec![]).write_query(&writer, &mut out);
        assert_eq!(out, "true");
    }

    #[test]
    fn insert_update_delete() {
        let writer = GenericSqlWriter::new();
        let schema = schema();
        let mut out = String::new();
        writer.write_insert(&mut out, &schema, "order", 2, false);
        assert_eq!(
            out,
            indoc! {r#"
                INSERT INTO "order" ("code", "amount") VALUES
                (?, ?),
                (?, ?);
            "#}
            .trim()
        );
        let mut out = String::new();
        writer.write_insert(&mut out, &schema, "order__tmp", 1, true);
        assert_eq!(
            out,
            "INSERT INTO \"order__tmp\" (\"obj_id\", \"code\", \"amount\") VALUES\n(?, ?, ?);"
        );
        let mut out = String::new();
        writer.write_update(&mut out, &schema, "order");
        assert_eq!(
            out,
            indoc! {r#"
                UPDATE "order" SET
                "code" = ?,
                "amount" = ?
                WHERE "obj_id" = ?;
            "#}
            .trim()
        );
        let mut out = String::new();
        writer.write_delete(
            &mut out,
            "order",
            &BinaryOp::new(
                BinaryOpType::Equal,
                Operand::Column("obj_id"),
                Operand::QuestionMark,
            ),
        );
        assert_eq!(out, "DELETE FROM \"order\"\nWHERE \"obj_id\" = ?;");
    }

    #[test]
    fn values() {
        let writer = GenericSqlWriter::new();
        let write = |value: Value| {
            let mut out = String::new();
            writer.write_value(&mut out, &value);
            out
        };
        assert_eq!(write(Value::Int32(None)), "NULL");
        assert_eq!(write(Value::UInt64(Some(u64::MAX))), "18446744073709551615");
        assert_eq!(write(Value::Float64(Some(0.25))), "0.25");
        assert_eq!(
            write(Value::Float32(Some(f32::NEG_INFINITY))),
            "CAST('-Infinity' AS DOUBLE)"
        );
        assert_eq!(write(Value::Varchar(Some("it's".into()))), "'it''s'");
        assert_eq!(
            write(Value::Blob(Some([0x0A, 0xFF].into()))),
            "'\\x0A\\xFF'"
        );
        assert_eq!(write(Value::Date(Some(date!(2024 - 03 - 01)))), "'2024-03-01'");
        assert_eq!(write(Value::Time(Some(time!(10:20:30.5)))), "'10:20:30.5'");
        assert_eq!(
            write(Value::Timestamp(Some(datetime!(2024-03-01 10:20:30)))),
            "'2024-03-01 10:20:30.0'"
        );
    }

    #[test]
    fn quoted_identifiers() {
        let writer = GenericSqlWriter::new();
        let mut out = String::new();
        writer.write_identifier_quoted(&mut out, r#"we"ird"#);
        assert_eq!(out, r#""we""ird""#);
    }
}
