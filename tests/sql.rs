#[cfg(test)]
mod tests {
    use datalite::{
        BinaryOp, BinaryOpType, Entity, GenericSqlWriter, IDENTITY_COLUMN, Identity, Operand,
        SqlWriter, schema_of,
    };
    use indoc::indoc;

    #[derive(Entity)]
    struct Measurement {
        id: Identity,
        #[datalite(unique)]
        label: String,
        value: Option<f64>,
        #[datalite(default = 3)]
        samples: i32,
        taken: time::PrimitiveDateTime,
    }

    #[derive(Entity)]
    #[datalite(name = "quoted \"table\"")]
    struct Quoted {
        id: Identity,
        #[datalite(name = "it's")]
        text: String,
    }

    const WRITER: GenericSqlWriter = GenericSqlWriter {};

    #[test]
    fn create_and_drop() {
        let schema = schema_of::<Measurement>().unwrap();
        let mut sql = String::new();
        WRITER.write_create_table(&mut sql, schema, schema.table, true);
        WRITER.write_drop_table(&mut sql, schema.table, true);
        assert_eq!(
            sql,
            indoc! {r#"
                CREATE TABLE IF NOT EXISTS "measurement" (
                "obj_id" BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
                "label" VARCHAR NOT NULL UNIQUE,
                "value" DOUBLE,
                "samples" INTEGER NOT NULL DEFAULT 3,
                "taken" TIMESTAMP NOT NULL);
                DROP TABLE IF EXISTS "measurement";"#}
        );
    }

    #[test]
    fn quoting() {
        let schema = schema_of::<Quoted>().unwrap();
        let mut sql = String::new();
        WRITER.write_create_table(&mut sql, schema, schema.table, false);
        assert_eq!(
            sql,
            indoc! {r#"
                CREATE TABLE "quoted ""table""" (
                "obj_id" BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
                "it's" VARCHAR NOT NULL);"#}
        );
        sql.clear();
        WRITER.write_table_columns(&mut sql, schema.table);
        assert_eq!(
            sql,
            "SELECT column_name FROM information_schema.columns WHERE table_name = \
             'quoted \"table\"' ORDER BY ordinal_position;"
        );
    }

    #[test]
    fn insert_update_delete() {
        let schema = schema_of::<Measurement>().unwrap();
        let mut sql = String::new();
        WRITER.write_insert(&mut sql, schema, schema.table, 2, false);
        assert_eq!(
            sql,
            indoc! {r#"
                INSERT INTO "measurement" ("label", "value", "samples", "taken") VALUES
                (?, ?, ?, ?),
                (?, ?, ?, ?);"#}
        );
        sql.clear();
        WRITER.write_insert(&mut sql, schema, "measurement__copy", 1, true);
        assert_eq!(
            sql,
            indoc! {r#"
                INSERT INTO "measurement__copy" ("obj_id", "label", "value", "samples", "taken") VALUES
                (?, ?, ?, ?, ?);"#}
        );
        sql.clear();
        WRITER.write_update(&mut sql, schema, schema.table);
        assert_eq!(
            sql,
            indoc! {r#"
                UPDATE "measurement" SET
                "label" = ?,
                "value" = ?,
                "samples" = ?,
                "taken" = ?
                WHERE "obj_id" = ?;"#}
        );
        sql.clear();
        let condition = BinaryOp::new(
            BinaryOpType::Equal,
            Operand::Column(IDENTITY_COLUMN),
            Operand::QuestionMark,
        );
        WRITER.write_delete(&mut sql, schema.table, &condition);
        assert_eq!(
            sql,
            indoc! {r#"
                DELETE FROM "measurement"
                WHERE "obj_id" = ?;"#}
        );
    }

    #[test]
    fn select_pages() {
        let schema = schema_of::<Measurement>().unwrap();
        let columns = schema.column_names().collect::<Vec<_>>();
        let condition = BinaryOp::new(
            BinaryOpType::Is,
            Operand::Column("value"),
            Operand::Null,
        );
        let mut sql = String::new();
        WRITER.write_select(&mut sql, &columns, schema.table, &condition, Some(5), Some(5));
        assert_eq!(
            sql,
            indoc! {r#"
                SELECT "obj_id", "label", "value", "samples", "taken"
                FROM "measurement"
                WHERE "value" IS NULL
                ORDER BY "obj_id"
                LIMIT 5
                OFFSET 5;"#}
        );
        sql.clear();
        WRITER.write_select(&mut sql, &["obj_id"], schema.table, &true, None, None);
        assert_eq!(
            sql,
            indoc! {r#"
                SELECT "obj_id"
                FROM "measurement"
                WHERE true
                ORDER BY "obj_id";"#}
        );
    }

    #[test]
    fn transactions() {
        let mut sql = String::new();
        WRITER.write_transaction_begin(&mut sql);
        sql.push('|');
        WRITER.write_transaction_commit(&mut sql);
        sql.push('|');
        WRITER.write_transaction_rollback(&mut sql);
        assert!(sql.ends_with("COMMIT;|ROLLBACK;"), "{sql}");
        sql.clear();
        WRITER.write_journal_mode(&mut sql, Some("MEMORY"));
        assert!(sql.is_empty());
    }
}
