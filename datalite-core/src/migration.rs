//! In place schema evolution: plan, copy every row into a new table, swap the tables.

use crate::{
    AsValue, BinaryOp, BinaryOpType, ConstraintRule, Connection, Driver, Entity, Error, Executor,
    IDENTITY_COLUMN, Operand, Result, Schema, SqlWriter, Transaction, Value, constraint, record,
    schema_of,
    stream::TryStreamExt,
};
use std::{
    collections::{BTreeMap, HashMap},
    fmt::{self, Display, Formatter},
    marker::PhantomData,
};

/// Rows copied per batch while migrating.
pub const MIGRATION_BATCH: u64 = 512;

/// Progress of a [`Migration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationState {
    Planned,
    Copying,
    Swapped,
    Failed,
}

impl Display for MigrationState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MigrationState::Planned => "planned",
            MigrationState::Copying => "copying",
            MigrationState::Swapped => "swapped",
            MigrationState::Failed => "failed",
        })
    }
}

/// Where the value of a new column comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnSource {
    /// Column of the old table.
    Column(String),
    /// Constant, already converted to the type of the new column.
    Default(Value),
    Null,
}

/// How each column of the new table is filled from the old one.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationPlan {
    pub old_table: String,
    pub new_table: String,
    /// Old column name to new column name.
    pub renames: BTreeMap<String, String>,
    /// One source for each column of the new schema, identity included.
    pub sources: Vec<ColumnSource>,
}

impl MigrationPlan {
    /// Resolve the source of every column of `schema`.
    ///
    /// The order of precedence is: the renamed old column, the old column with the same name,
    /// the explicit default, the declared default, null when the column is nullable.
    pub fn new(
        schema: &Schema,
        old_table: &str,
        old_columns: &[String],
        renames: &[(String, String)],
        defaults: &HashMap<String, Value>,
    ) -> Result<Self> {
        let fail = |column: &str, reason: String| {
            Error::migration(
                old_table,
                None,
                Some(column),
                Error::schema(schema.type_name, reason),
            )
        };
        let has_old = |name: &str| old_columns.iter().any(|c| c == name);
        let mut renamed = BTreeMap::new();
        for (old, new) in renames {
            if !has_old(old) {
                return Err(fail(
                    old,
                    format!("the renamed column `{old}` does not exist in `{old_table}`"),
                ));
            }
            if schema.column(new).is_none() || new == IDENTITY_COLUMN {
                return Err(fail(
                    new,
                    format!("the rename target `{new}` is not a declared field"),
                ));
            }
            if renamed.insert(old.clone(), new.clone()).is_some() {
                return Err(fail(old, format!("the column `{old}` is renamed twice")));
            }
        }
        if !has_old(IDENTITY_COLUMN) {
            return Err(fail(
                IDENTITY_COLUMN,
                format!("`{old_table}` has no identity column"),
            ));
        }
        let mut sources = Vec::with_capacity(schema.columns.len());
        for column in &schema.columns {
            let name = column.name;
            let source = if let Some((old, _)) = renamed.iter().find(|(_, new)| *new == name) {
                ColumnSource::Column(old.clone())
            } else if has_old(name) && !renamed.contains_key(name) {
                ColumnSource::Column(name.to_owned())
            } else if let Some(value) = defaults.get(name) {
                let value = value
                    .clone()
                    .convert_to(&column.value)
                    .map_err(|e| Error::migration(old_table, None, Some(name), e))?;
                if value.is_null() && !column.nullable {
                    return Err(fail(
                        name,
                        format!("the default of the non nullable column `{name}` is null"),
                    ));
                }
                ColumnSource::Default(value)
            } else if let Some(value) = &column.default {
                ColumnSource::Default(value.clone())
            } else if column.nullable {
                ColumnSource::Null
            } else {
                return Err(fail(
                    name,
                    format!("the non nullable column `{name}` has no source and no default"),
                ));
            };
            sources.push(source);
        }
        Ok(Self {
            old_table: old_table.to_owned(),
            new_table: schema.table.to_owned(),
            renames: renamed,
            sources,
        })
    }

    /// Name of the table the rows are copied into before the swap.
    pub fn temporary_table(&self) -> String {
        format!("{}__datalite_migration", self.new_table)
    }

    /// Old columns read by the copy, identity first.
    fn read_columns(&self) -> Vec<&str> {
        let mut columns = vec![IDENTITY_COLUMN];
        for source in &self.sources {
            if let ColumnSource::Column(name) = source
                && !columns.contains(&name.as_str())
            {
                columns.push(name);
            }
        }
        columns
    }
}

/// Rewrite the table of `E` so that it matches the current schema of `E`.
///
/// ```rust,ignore
/// Migration::<Migrate2>::new()
///     .rename("ordinal", "cardinal")
///     .default_for("str_", "default".to_string())
///     .run(&mut connection)
///     .await?;
/// ```
///
/// Every row keeps its identity. The whole copy runs in a single transaction: on failure the
/// old table is left untouched.
pub struct Migration<E: Entity> {
    renames: Vec<(String, String)>,
    defaults: HashMap<String, Value>,
    from_table: Option<String>,
    state: MigrationState,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Default for Migration<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> Migration<E> {
    pub fn new() -> Self {
        Self {
            renames: Vec::new(),
            defaults: HashMap::new(),
            from_table: None,
            state: MigrationState::Planned,
            _entity: PhantomData,
        }
    }

    /// The old column `from` becomes the field `to`.
    pub fn rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.renames.push((from.into(), to.into()));
        self
    }

    /// Value for the new column `field` when the old table has no source for it.
    ///
    /// It takes precedence over the default declared on the field.
    pub fn default_for(mut self, field: impl Into<String>, value: impl AsValue) -> Self {
        self.defaults.insert(field.into(), value.as_value());
        self
    }

    /// Read the rows from `table` instead of the table of `E`.
    pub fn from_table(mut self, table: impl Into<String>) -> Self {
        self.from_table = Some(table.into());
        self
    }

    pub fn state(&self) -> MigrationState {
        self.state
    }

    fn transition(&mut self, table: &str, state: MigrationState) {
        log::info!("Migration of `{}`: {} -> {}", table, self.state, state);
        self.state = state;
    }

    /// Run the migration and return the number of rows copied.
    ///
    /// When the old table does not exist the table of `E` is simply created.
    pub async fn run<C: Connection>(&mut self, connection: &mut C) -> Result<u64> {
        let schema = schema_of::<E>()?;
        let old_table = self
            .from_table
            .clone()
            .unwrap_or_else(|| schema.table.to_owned());
        let old_columns = table_columns(connection, &old_table).await?;
        if old_columns.is_empty() {
            log::info!(
                "Migration of `{}`: there is no table `{}`, creating it",
                schema.table,
                old_table
            );
            record::markup::<E, _>(connection).await?;
            self.transition(schema.table, MigrationState::Swapped);
            return Ok(0);
        }
        let plan = MigrationPlan::new(
            schema,
            &old_table,
            &old_columns,
            &self.renames,
            &self.defaults,
        )?;
        log::debug!("Migration plan: {:?}", plan);
        self.transition(schema.table, MigrationState::Copying);
        let mut transaction = connection.begin().await?;
        match copy_and_swap(&mut transaction, schema, &plan).await {
            Ok(rows) => {
                if let Err(e) = transaction.commit().await {
                    self.transition(schema.table, MigrationState::Failed);
                    return Err(Error::migration(schema.table, None, None, e));
                }
                self.transition(schema.table, MigrationState::Swapped);
                Ok(rows)
            }
            Err(e) => {
                self.transition(schema.table, MigrationState::Failed);
                log::warn!("Rolling back the migration of `{}`: {}", schema.table, e);
                if let Err(rollback) = transaction.rollback().await {
                    log::error!("{:#}", rollback);
                }
                Err(e)
            }
        }
    }
}

/// Migrate the table of `E` applying the given `(old, new)` column renames.
pub async fn migrate<E: Entity, C: Connection>(
    connection: &mut C,
    renames: &[(&str, &str)],
) -> Result<u64> {
    let mut migration = renames
        .iter()
        .fold(Migration::<E>::new(), |m, (from, to)| m.rename(*from, *to));
    migration.run(connection).await
}

/// Column names of `table`, empty when the table does not exist.
async fn table_columns<Exec: Executor>(executor: &mut Exec, table: &str) -> Result<Vec<String>> {
    let mut sql = String::with_capacity(64);
    executor
        .driver()
        .sql_writer()
        .write_table_columns(&mut sql, table);
    executor
        .fetch(sql)
        .and_then(|row| async move {
            let value = row.values.into_vec().into_iter().next().unwrap_or_default();
            String::try_from_value(value)
        })
        .try_collect()
        .await
}

async fn copy_and_swap<Exec: Executor>(
    executor: &mut Exec,
    schema: &Schema,
    plan: &MigrationPlan,
) -> Result<u64> {
    let temporary = plan.temporary_table();
    let wrap = |row: Option<i64>, column: Option<&str>, error: Error| {
        Error::migration(schema.table, row, column, error)
    };
    let (setup, insert_sql, select_sql) = {
        let writer = executor.driver().sql_writer();
        let mut setup = String::with_capacity(256);
        writer.write_drop_table(&mut setup, &temporary, true);
        writer.write_create_table(&mut setup, schema, &temporary, false);
        let mut insert = String::with_capacity(128);
        writer.write_insert(&mut insert, schema, &temporary, 1, true);
        let mut select = String::with_capacity(128);
        writer.write_select(
            &mut select,
            &plan.read_columns(),
            &plan.old_table,
            &BinaryOp::new(
                BinaryOpType::Greater,
                Operand::Column(IDENTITY_COLUMN),
                Operand::QuestionMark,
            ),
            Some(MIGRATION_BATCH),
            None,
        );
        (setup, insert, select)
    };
    executor
        .execute(setup)
        .await
        .map_err(|e| wrap(None, None, e))?;
    let mut select = executor
        .prepare(select_sql)
        .await
        .map_err(|e| wrap(None, None, e))?;
    let mut insert = executor
        .prepare(insert_sql)
        .await
        .map_err(|e| wrap(None, None, e))?;
    let mut last = i64::MIN;
    let mut copied = 0;
    loop {
        select.clear_bindings()?.bind(last)?;
        let rows = executor
            .fetch(&mut select)
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| wrap(Some(last), None, e))?;
        if rows.is_empty() {
            break;
        }
        for row in rows {
            let id = row
                .get_column(IDENTITY_COLUMN)
                .cloned()
                .map(i64::try_from_value)
                .transpose()
                .map_err(|e| wrap(None, Some(IDENTITY_COLUMN), e))?
                .ok_or_else(|| wrap(None, Some(IDENTITY_COLUMN), Error::msg("missing identity")))?;
            insert.clear_bindings()?;
            for (column, source) in schema.columns.iter().zip(&plan.sources) {
                let value = match source {
                    ColumnSource::Column(name) => row.get_column(name).cloned().unwrap_or_default(),
                    ColumnSource::Default(value) => value.clone(),
                    ColumnSource::Null => Value::Null,
                };
                let value = value
                    .convert_to(&column.value)
                    .map_err(|e| wrap(Some(id), Some(column.name), e))?;
                if value.is_null() && !column.nullable {
                    return Err(wrap(
                        Some(id),
                        Some(column.name),
                        Error::ConstraintFailed {
                            table: schema.table.to_owned(),
                            rule: ConstraintRule::NotNull,
                            column: Some(column.name.to_owned()),
                        },
                    ));
                }
                insert.bind(value)?;
            }
            executor
                .execute(&mut insert)
                .await
                .map_err(|e| wrap(Some(id), None, constraint::normalize(schema, e)))?;
            last = id;
            copied += 1;
        }
    }
    // Finalize the statements before the old table goes away
    drop(select);
    drop(insert);
    let mut swap = String::with_capacity(128);
    {
        let writer = executor.driver().sql_writer();
        writer.write_drop_table(&mut swap, &plan.old_table, false);
        writer.write_rename_table(&mut swap, &temporary, &plan.new_table);
    }
    executor
        .execute(swap)
        .await
        .map_err(|e| wrap(None, None, e))?;
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColumnDef, StorageClass};

    fn schema() -> Schema {
        Schema {
            table: "migrate",
            type_name: "Migrate2",
            columns: vec![
                ColumnDef::identity(),
                ColumnDef {
                    name: "cardinal",
                    value: Value::Int64(None),
                    storage: StorageClass::Integer,
                    nullable: false,
                    unique: true,
                    primary_key: false,
                    auto_increment: false,
                    default: None,
                },
                ColumnDef {
                    name: "str_",
                    value: Value::Varchar(None),
                    storage: StorageClass::Text,
                    nullable: false,
                    unique: false,
                    primary_key: false,
                    auto_increment: false,
                    default: Some(Value::Varchar(Some("default".into()))),
                },
                ColumnDef {
                    name: "note",
                    value: Value::Varchar(None),
                    storage: StorageClass::Text,
                    nullable: true,
                    unique: false,
                    primary_key: false,
                    auto_increment: false,
                    default: None,
                },
            ],
        }
    }

    fn old() -> Vec<String> {
        ["obj_id", "ordinal", "conventional"]
            .into_iter()
            .map(Into::into)
            .collect()
    }

    #[test]
    fn plan_resolves_sources() {
        let plan = MigrationPlan::new(
            &schema(),
            "migrate",
            &old(),
            &[("ordinal".into(), "cardinal".into())],
            &HashMap::new(),
        )
        .unwrap();
        assert_eq!(
            plan.sources,
            [
                ColumnSource::Column("obj_id".into()),
                ColumnSource::Column("ordinal".into()),
                ColumnSource::Default(Value::Varchar(Some("default".into()))),
                ColumnSource::Null,
            ]
        );
        assert_eq!(plan.read_columns(), ["obj_id", "ordinal"]);
        assert_eq!(plan.temporary_table(), "migrate__datalite_migration");
    }

    #[test]
    fn explicit_default_wins() {
        let defaults = HashMap::from([
            ("str_".to_string(), Value::Varchar(Some("override".into()))),
            ("note".to_string(), Value::Int32(Some(5))),
        ]);
        let plan = MigrationPlan::new(
            &schema(),
            "migrate",
            &old(),
            &[("ordinal".into(), "cardinal".into())],
            &defaults,
        )
        .unwrap();
        assert_eq!(
            plan.sources[2],
            ColumnSource::Default(Value::Varchar(Some("override".into())))
        );
        assert_eq!(
            plan.sources[3],
            ColumnSource::Default(Value::Varchar(Some("5".into())))
        );
    }

    #[test]
    fn plan_failures() {
        let error = MigrationPlan::new(
            &schema(),
            "migrate",
            &old(),
            &[("missing".into(), "cardinal".into())],
            &HashMap::new(),
        )
        .unwrap_err();
        assert!(
            matches!(&error, Error::Migration { column: Some(c), .. } if c == "missing"),
            "{error}"
        );

        let error = MigrationPlan::new(
            &schema(),
            "migrate",
            &old(),
            &[("ordinal".into(), "nowhere".into())],
            &HashMap::new(),
        )
        .unwrap_err();
        assert!(
            matches!(&error, Error::Migration { column: Some(c), .. } if c == "nowhere"),
            "{error}"
        );

        // Without the rename `cardinal` has no source
        let error =
            MigrationPlan::new(&schema(), "migrate", &old(), &[], &HashMap::new()).unwrap_err();
        assert!(
            matches!(&error, Error::Migration { column: Some(c), .. } if c == "cardinal"),
            "{error}"
        );
    }
}
