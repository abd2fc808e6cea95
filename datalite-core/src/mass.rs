//! Batched creates inside a single transaction.

use crate::{
    AsValue, Connection, Driver, Entity, Error, Executor, Identity, Result, Schema, SqlWriter,
    Transaction, constraint, record, schema_of,
    stream::TryStreamExt,
};

/// Persist every instance in one transaction, then attach the identities.
///
/// With `protect_memory` a single row statement is reused for each instance and the journal
/// stays where it is. Without it the journal moves to memory for the duration of the batch
/// and the rows are written with multi row inserts.
///
/// If any row fails the whole batch is rolled back and no instance receives an identity.
pub async fn create_many<E: Entity, C: Connection>(
    connection: &mut C,
    instances: &mut [E],
    protect_memory: bool,
) -> Result<()> {
    let schema = schema_of::<E>()?;
    let ids = insert_batch(connection, schema, instances, protect_memory).await?;
    for (instance, id) in instances.iter_mut().zip(ids) {
        instance.set_identity(Identity::new(id));
    }
    Ok(())
}

/// Insert copies of `instances` into the store behind `target`.
///
/// The table is marked up on the target first. Returns the identities assigned in the target,
/// the instances themselves are not touched.
pub async fn copy_many<E: Entity, C: Connection>(
    instances: &[E],
    target: &mut C,
    protect_memory: bool,
) -> Result<Vec<i64>> {
    let schema = record::markup::<E, _>(target).await?;
    insert_batch(target, schema, instances, protect_memory).await
}

async fn insert_batch<E: Entity, C: Connection>(
    connection: &mut C,
    schema: &Schema,
    instances: &[E],
    protect_memory: bool,
) -> Result<Vec<i64>> {
    if instances.is_empty() {
        return Ok(Vec::new());
    }
    let previous = if protect_memory {
        None
    } else {
        let previous = journal_mode(connection).await?;
        if previous.is_some() {
            set_journal_mode(connection, "MEMORY").await?;
        }
        previous
    };
    let result = insert_in_transaction(connection, schema, instances, protect_memory).await;
    if let Some(mode) = previous
        && let Err(e) = set_journal_mode(connection, &mode).await
    {
        log::error!("Could not restore the journal mode `{}`: {:#}", mode, e);
    }
    result
}

async fn insert_in_transaction<E: Entity, C: Connection>(
    connection: &mut C,
    schema: &Schema,
    instances: &[E],
    protect_memory: bool,
) -> Result<Vec<i64>> {
    let mut transaction = connection.begin().await?;
    match insert_rows(&mut transaction, schema, instances, protect_memory).await {
        Ok(ids) => {
            transaction
                .commit()
                .await
                .map_err(|e| constraint::normalize(schema, e))?;
            Ok(ids)
        }
        Err(e) => {
            log::warn!(
                "Rolling back the batch of {} rows into `{}`: {}",
                instances.len(),
                schema.table,
                e
            );
            if let Err(rollback) = transaction.rollback().await {
                log::error!("{:#}", rollback);
            }
            Err(e)
        }
    }
}

/// Rows written by each insert statement.
fn rows_per_statement(writer: &dyn SqlWriter, fields: usize, protect_memory: bool) -> usize {
    if protect_memory || fields == 0 {
        return 1;
    }
    (writer.max_bound_parameters() / fields)
        .min(writer.max_rows_per_insert())
        .max(1)
}

fn insert_sql<Exec: Executor>(executor: &Exec, schema: &Schema, rows: usize) -> String {
    let mut sql = String::with_capacity(64 + rows * 16);
    executor
        .driver()
        .sql_writer()
        .write_insert(&mut sql, schema, schema.table, rows, false);
    sql
}

async fn insert_rows<E: Entity, Exec: Executor>(
    executor: &mut Exec,
    schema: &Schema,
    instances: &[E],
    protect_memory: bool,
) -> Result<Vec<i64>> {
    let chunk = {
        let writer = executor.driver().sql_writer();
        rows_per_statement(writer.as_dyn(), schema.fields().len(), protect_memory)
    };
    let mut ids = Vec::with_capacity(instances.len());
    let mut statement = None;
    for batch in instances.chunks(chunk) {
        let mut query = match statement.take() {
            Some(query) if batch.len() == chunk => query,
            _ => {
                let sql = insert_sql(executor, schema, batch.len());
                executor.prepare(sql).await?
            }
        };
        query.clear_bindings()?;
        for instance in batch {
            query.bind_row(instance.row())?;
        }
        let result = executor
            .execute(&mut query)
            .await
            .map_err(|e| constraint::normalize(schema, e))?;
        let rows = batch.len() as i64;
        if result.rows_affected != rows as u64 {
            return Err(Error::msg(format!(
                "Expected to insert {} rows into `{}`, the store reported {}",
                rows, schema.table, result.rows_affected
            )));
        }
        let Some(last) = result.last_affected_id else {
            return Err(Error::msg(format!(
                "The store did not report the identity of the rows inserted into `{}`",
                schema.table
            )));
        };
        ids.extend(last - rows + 1..=last);
        statement = Some(query);
    }
    Ok(ids)
}

/// Current journal mode, `None` when the driver has no such setting.
async fn journal_mode<C: Connection>(connection: &mut C) -> Result<Option<String>> {
    let mut sql = String::new();
    connection
        .driver()
        .sql_writer()
        .write_journal_mode(&mut sql, None);
    if sql.is_empty() {
        return Ok(None);
    }
    let rows = connection.fetch(sql).try_collect::<Vec<_>>().await?;
    let value = rows
        .into_iter()
        .next()
        .and_then(|row| row.values.into_vec().into_iter().next());
    let Some(value) = value else {
        return Ok(None);
    };
    Ok(Some(String::try_from_value(value)?))
}

async fn set_journal_mode<C: Connection>(connection: &mut C, mode: &str) -> Result<()> {
    let mut sql = String::new();
    connection
        .driver()
        .sql_writer()
        .write_journal_mode(&mut sql, Some(mode));
    if sql.is_empty() {
        return Ok(());
    }
    connection.execute(sql).await?;
    log::info!("Journal mode set to `{}`", mode);
    Ok(())
}
