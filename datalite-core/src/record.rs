//! Single instance persistence: markup, create, update, remove and reconstruction.

use crate::{
    AsValue, BinaryOp, BinaryOpType, Driver, Entity, Error, Executor, IDENTITY_COLUMN, Identity,
    Operand, Result, Row, RowLabeled, RowsAffected, Schema, SqlWriter, Value, constraint,
    schema_of,
};

/// Derive the schema of `E` and create its table when it does not exist yet.
///
/// Running it again is harmless, an existing table and its rows are left as they are.
pub async fn markup<E: Entity, Exec: Executor>(executor: &mut Exec) -> Result<&'static Schema> {
    let schema = schema_of::<E>()?;
    let mut sql = String::with_capacity(256);
    executor
        .driver()
        .sql_writer()
        .write_create_table(&mut sql, schema, schema.table, true);
    log::debug!(
        "Marking up `{}` as table `{}`",
        schema.type_name,
        schema.table
    );
    executor.execute(sql).await?;
    Ok(schema)
}

pub async fn drop_table<E: Entity, Exec: Executor>(
    executor: &mut Exec,
    if_exists: bool,
) -> Result<()> {
    let schema = schema_of::<E>()?;
    let mut sql = String::with_capacity(64);
    executor
        .driver()
        .sql_writer()
        .write_drop_table(&mut sql, schema.table, if_exists);
    executor.execute(sql).await?;
    Ok(())
}

/// Values of the declared fields of `instance`, in schema column order.
pub fn serialize<E: Entity>(instance: &E) -> Row {
    instance.row()
}

/// Rebuild a fully typed instance, identity included, from a stored row.
pub fn reconstruct<E: Entity>(schema: &Schema, row: RowLabeled) -> Result<E> {
    let identity = match row.get_column(IDENTITY_COLUMN) {
        Some(v) if !v.is_null() => Identity::new(i64::try_from_value(v.clone())?),
        _ => {
            return Err(Error::msg(format!(
                "A row of `{}` has no `{}` column",
                schema.table, IDENTITY_COLUMN
            )));
        }
    };
    let mut instance = E::from_row(row)?;
    instance.set_identity(identity);
    Ok(instance)
}

/// Prepare `sql`, bind `values` in order and execute it.
pub(crate) async fn execute_prepared<Exec: Executor>(
    executor: &mut Exec,
    sql: String,
    values: Vec<Value>,
) -> Result<RowsAffected> {
    let mut query = executor.prepare(sql).await?;
    query.bind_row(values)?;
    executor.execute(&mut query).await
}

/// Condition `"obj_id" = ?`.
pub(crate) fn identity_equals() -> BinaryOp<Operand<'static>, Operand<'static>> {
    BinaryOp::new(
        BinaryOpType::Equal,
        Operand::Column(IDENTITY_COLUMN),
        Operand::QuestionMark,
    )
}

/// Insert `instance` as a new row, attach the identity assigned by the store and return it.
///
/// An instance that was already created gets a new row and a new identity.
pub async fn create<E: Entity, Exec: Executor>(
    executor: &mut Exec,
    instance: &mut E,
) -> Result<i64> {
    let schema = schema_of::<E>()?;
    let mut sql = String::with_capacity(128);
    executor
        .driver()
        .sql_writer()
        .write_insert(&mut sql, schema, schema.table, 1, false);
    let result = execute_prepared(executor, sql, serialize(&*instance).into_vec())
        .await
        .map_err(|e| constraint::normalize(schema, e))?;
    let Some(id) = result.last_affected_id else {
        return Err(Error::msg(format!(
            "The store did not report the identity of the row inserted into `{}`",
            schema.table
        )));
    };
    instance.set_identity(Identity::new(id));
    Ok(id)
}

fn require_identity<E: Entity>(schema: &Schema, instance: &E, action: &str) -> Result<i64> {
    instance.identity().get().ok_or_else(|| {
        Error::State(format!(
            "cannot {} an instance of `{}` that was never created",
            action, schema.type_name
        ))
    })
}

/// Overwrite every declared column of the row carrying the identity of `instance`.
pub async fn update<E: Entity, Exec: Executor>(executor: &mut Exec, instance: &E) -> Result<()> {
    let schema = schema_of::<E>()?;
    let id = require_identity(schema, instance, "update")?;
    if schema.fields().is_empty() {
        return Ok(());
    }
    let mut sql = String::with_capacity(128);
    executor
        .driver()
        .sql_writer()
        .write_update(&mut sql, schema, schema.table);
    let mut values = serialize(instance).into_vec();
    values.push(Value::Int64(Some(id)));
    let result = execute_prepared(executor, sql, values)
        .await
        .map_err(|e| constraint::normalize(schema, e))?;
    if result.rows_affected == 0 {
        log::info!(
            "No row of `{}` has identity {}, nothing was updated",
            schema.table,
            id
        );
    }
    Ok(())
}

/// Delete the row carrying the identity of `instance`, a missing row is not an error.
pub async fn remove<E: Entity, Exec: Executor>(executor: &mut Exec, instance: &E) -> Result<()> {
    let schema = schema_of::<E>()?;
    let id = require_identity(schema, instance, "remove")?;
    let mut sql = String::with_capacity(64);
    executor
        .driver()
        .sql_writer()
        .write_delete(&mut sql, schema.table, &identity_equals());
    let result = execute_prepared(executor, sql, vec![Value::Int64(Some(id))]).await?;
    if result.rows_affected == 0 {
        log::info!(
            "The row of `{}` with identity {} is already gone",
            schema.table,
            id
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldDef, StorageClass};
    use std::sync::{Arc, LazyLock};

    #[derive(Debug, Default, PartialEq)]
    struct Note {
        id: Identity,
        text: String,
    }

    static NOTE_FIELDS: LazyLock<Box<[FieldDef]>> =
        LazyLock::new(|| vec![FieldDef::new("text", Value::Varchar(None))].into_boxed_slice());

    impl Entity for Note {
        fn table_name() -> &'static str {
            "note"
        }
        fn fields() -> &'static [FieldDef] {
            &NOTE_FIELDS
        }
        fn identity(&self) -> Identity {
            self.id
        }
        fn set_identity(&mut self, identity: Identity) {
            self.id = identity;
        }
        fn row(&self) -> Row {
            [self.text.clone().as_value()].into()
        }
        fn from_row(row: RowLabeled) -> Result<Self> {
            let text = row
                .get_column("text")
                .cloned()
                .ok_or_else(|| Error::msg("missing text"))?;
            Ok(Note {
                id: Identity::NONE,
                text: String::try_from_value(text)?,
            })
        }
    }

    #[test]
    fn reconstruct_attaches_identity() {
        let schema = schema_of::<Note>().unwrap();
        assert_eq!(schema.columns[1].storage, StorageClass::Text);
        let labels: Arc<[String]> = ["obj_id".to_string(), "text".to_string()].into();
        let note: Note = reconstruct(
            schema,
            RowLabeled::new(
                labels.clone(),
                [Value::Int64(Some(7)), Value::Varchar(Some("hi".into()))].into(),
            ),
        )
        .unwrap();
        assert_eq!(
            note,
            Note {
                id: Identity::new(7),
                text: "hi".into()
            }
        );
        assert_eq!(serialize(&note).as_ref(), [Value::Varchar(Some("hi".into()))]);

        let missing = reconstruct::<Note>(
            schema,
            RowLabeled::new(
                ["text".to_string()].into(),
                [Value::Varchar(Some("hi".into()))].into(),
            ),
        );
        assert!(missing.is_err());
    }
}
