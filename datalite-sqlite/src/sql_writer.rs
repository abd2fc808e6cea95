use datalite_core::{ColumnDef, SqlWriter, StorageClass, Value};
use std::fmt::Write;

pub struct SqliteSqlWriter {}

impl SqlWriter for SqliteSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }

    fn write_column_type(&self, out: &mut String, value: &Value) {
        match value.storage_class() {
            Some(StorageClass::Integer) => out.push_str("INTEGER"),
            Some(StorageClass::Real) => out.push_str("REAL"),
            Some(StorageClass::Text) => out.push_str("TEXT"),
            Some(StorageClass::Blob) => out.push_str("BLOB"),
            None => log::error!("Cannot get the sqlite column type of {:?}", value),
        }
    }

    fn write_column_identity(&self, out: &mut String, _column: &ColumnDef) {
        out.push_str("INTEGER PRIMARY KEY AUTOINCREMENT");
    }

    fn write_value_infinity(&self, out: &mut String, negative: bool) {
        if negative {
            out.push('-');
        }
        out.push_str("1.0e+10000");
    }

    fn write_value_nan(&self, out: &mut String) {
        // Sqlite stores NaN as NULL
        out.push_str("NULL");
    }

    fn write_value_blob(&self, out: &mut String, value: &[u8]) {
        out.push_str("X'");
        for b in value {
            let _ = write!(out, "{:02X}", b);
        }
        out.push('\'');
    }

    fn write_select_limit(&self, out: &mut String, limit: Option<u64>, offset: Option<u64>) {
        let offset = offset.filter(|v| *v > 0);
        match (limit, offset) {
            (Some(limit), _) => {
                let _ = write!(out, "\nLIMIT {}", limit);
            }
            (None, Some(..)) => out.push_str("\nLIMIT -1"),
            (None, None) => {}
        }
        if let Some(offset) = offset {
            let _ = write!(out, "\nOFFSET {}", offset);
        }
    }

    fn write_table_columns(&self, out: &mut String, table: &str) {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("SELECT name FROM pragma_table_info(");
        self.write_value_string(out, table);
        out.push_str(") ORDER BY cid;");
    }

    fn write_journal_mode(&self, out: &mut String, mode: Option<&str>) {
        if !out.is_empty() {
            out.push('\n');
        }
        match mode {
            Some(mode) => {
                let _ = write!(out, "PRAGMA journal_mode = {};", mode);
            }
            None => out.push_str("PRAGMA journal_mode;"),
        }
    }

    fn max_bound_parameters(&self) -> usize {
        // SQLITE_MAX_VARIABLE_NUMBER of the bundled library
        32766
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datalite_core::{BinaryOp, BinaryOpType, IDENTITY_COLUMN, Operand, Schema};
    use indoc::indoc;

    fn schema() -> Schema {
        Schema {
            table: "reading",
            type_name: "Reading",
            columns: vec![
                ColumnDef::identity(),
                ColumnDef {
                    name: "sensor",
                    value: Value::Varchar(None),
                    storage: StorageClass::Text,
                    nullable: false,
                    unique: true,
                    primary_key: false,
                    auto_increment: false,
                    default: None,
                },
                ColumnDef {
                    name: "level",
                    value: Value::Float64(None),
                    storage: StorageClass::Real,
                    nullable: true,
                    unique: false,
                    primary_key: false,
                    auto_increment: false,
                    default: Some(Value::Float64(Some(0.5))),
                },
                ColumnDef {
                    name: "raw",
                    value: Value::Blob(None),
                    storage: StorageClass::Blob,
                    nullable: true,
                    unique: false,
                    primary_key: false,
                    auto_increment: false,
                    default: None,
                },
            ],
        }
    }

    #[test]
    fn create_table() {
        let writer = SqliteSqlWriter {};
        let mut sql = String::new();
        writer.write_create_table(&mut sql, &schema(), "reading", true);
        assert_eq!(
            sql,
            indoc! {r#"
                CREATE TABLE IF NOT EXISTS "reading" (
                "obj_id" INTEGER PRIMARY KEY AUTOINCREMENT,
                "sensor" TEXT NOT NULL UNIQUE,
                "level" REAL DEFAULT 0.5,
                "raw" BLOB);"#}
        );
    }

    #[test]
    fn pagination() {
        let writer = SqliteSqlWriter {};
        let condition = BinaryOp::new(
            BinaryOpType::Greater,
            Operand::Column(IDENTITY_COLUMN),
            Operand::QuestionMark,
        );
        let mut sql = String::new();
        writer.write_select(&mut sql, &["obj_id"], "reading", &condition, None, Some(20));
        assert_eq!(
            sql,
            indoc! {r#"
                SELECT "obj_id"
                FROM "reading"
                WHERE "obj_id" > ?
                ORDER BY "obj_id"
                LIMIT -1
                OFFSET 20;"#}
        );
        sql.clear();
        writer.write_select(&mut sql, &["obj_id"], "reading", &true, Some(10), Some(0));
        assert!(sql.ends_with("ORDER BY \"obj_id\"\nLIMIT 10;"), "{sql}");
    }

    #[test]
    fn literals_and_pragmas() {
        let writer = SqliteSqlWriter {};
        let mut sql = String::new();
        writer.write_value(&mut sql, &Value::Blob(Some([0x0a, 0xff, 0x00].into())));
        assert_eq!(sql, "X'0AFF00'");
        sql.clear();
        writer.write_value(&mut sql, &Value::Float64(Some(f64::NEG_INFINITY)));
        assert_eq!(sql, "-1.0e+10000");
        sql.clear();
        writer.write_table_columns(&mut sql, "it's");
        assert_eq!(sql, "SELECT name FROM pragma_table_info('it''s') ORDER BY cid;");
        sql.clear();
        writer.write_journal_mode(&mut sql, None);
        writer.write_journal_mode(&mut sql, Some("MEMORY"));
        assert_eq!(sql, "PRAGMA journal_mode;\nPRAGMA journal_mode = MEMORY;");
    }
}
