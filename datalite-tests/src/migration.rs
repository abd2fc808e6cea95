use datalite::{
    AsValue, Connection, Driver, Entity, Error, Executor, Identity, Migration, MigrationState,
    MIGRATION_BATCH, SqlWriter, create_many, fetch_all, migrate, stream::TryStreamExt,
};
use std::sync::LazyLock;
use tokio::sync::Mutex;

#[derive(Entity, Debug, Clone, PartialEq)]
#[datalite(name = "migrated_item")]
struct ItemBefore {
    id: Identity,
    ordinal: i64,
    label: String,
    obsolete: Option<f64>,
}

#[derive(Entity, Debug, Clone, PartialEq)]
#[datalite(name = "migrated_item")]
struct ItemAfter {
    id: Identity,
    label: String,
    cardinal: i64,
    #[datalite(default = "default")]
    str_: String,
    extra: Option<i32>,
}

#[derive(Entity, Debug, Clone, PartialEq)]
#[datalite(name = "fragile_item")]
struct FragileBefore {
    id: Identity,
    ordinal: String,
}

#[derive(Entity, Debug, Clone, PartialEq)]
#[datalite(name = "fragile_item")]
struct FragileAfter {
    id: Identity,
    cardinal: i32,
}

#[derive(Entity, Debug, Clone, PartialEq)]
struct NeverStored {
    id: Identity,
    name: String,
}

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Column names of `table`, empty once it is gone.
async fn columns<E: Executor>(executor: &mut E, table: &str) -> Vec<String> {
    let mut sql = String::new();
    executor
        .driver()
        .sql_writer()
        .write_table_columns(&mut sql, table);
    executor
        .fetch(sql)
        .and_then(|row| async move {
            let name = row.values.into_vec().into_iter().next().unwrap_or_default();
            String::try_from_value(name)
        })
        .try_collect()
        .await
        .expect("Failed to read the table columns")
}

pub async fn migration<C: Connection>(connection: &mut C) {
    let _lock = MUTEX.lock().await;

    // Setup
    ItemBefore::drop_table(connection, true)
        .await
        .expect("Failed to drop the migrated table");
    ItemBefore::markup(connection)
        .await
        .expect("Failed to mark up ItemBefore");
    let mut before = (0..10)
        .map(|i| ItemBefore {
            id: Identity::NONE,
            ordinal: i * 3 + 1,
            label: format!("item {i}"),
            obsolete: Some(i as f64),
        })
        .collect::<Vec<_>>();
    for item in before.iter_mut() {
        item.create(connection)
            .await
            .expect("Failed to create an item");
    }

    // Migrate
    let copied = migrate::<ItemAfter, _>(connection, &[("ordinal", "cardinal")])
        .await
        .expect("Failed to migrate the items");
    assert_eq!(copied, 10);
    let after = fetch_all::<ItemAfter, _>(connection, None)
        .await
        .expect("Failed to fetch the migrated items");
    assert_eq!(after.len(), 10);
    for (before, after) in before.iter().zip(&after) {
        assert_eq!(after.identity(), before.identity());
        assert_eq!(after.cardinal, before.ordinal);
        assert_eq!(after.label, before.label);
        assert_eq!(after.str_, "default");
        assert_eq!(after.extra, None);
    }
    assert!(
        columns(connection, "migrated_item__datalite_migration")
            .await
            .is_empty()
    );
    assert_eq!(columns(connection, "migrated_item").await.len(), 5);

    // New rows continue after the migrated identities
    let mut item = ItemAfter {
        id: Identity::NONE,
        label: "new".into(),
        cardinal: 100,
        str_: "explicit".into(),
        extra: Some(1),
    };
    let id = item.create(connection).await.unwrap();
    assert!(id > before.last().unwrap().identity().get().unwrap());

    // Explicit default
    ItemBefore::drop_table(connection, true).await.unwrap();
    ItemBefore::markup(connection).await.unwrap();
    before[0].create(connection).await.unwrap();
    let mut migration = Migration::<ItemAfter>::new()
        .rename("ordinal", "cardinal")
        .default_for("str_", "override".to_string())
        .default_for("extra", 42);
    assert_eq!(migration.state(), MigrationState::Planned);
    assert_eq!(migration.run(connection).await.unwrap(), 1);
    assert_eq!(migration.state(), MigrationState::Swapped);
    let after = fetch_all::<ItemAfter, _>(connection, None).await.unwrap();
    assert_eq!(after[0].str_, "override");
    assert_eq!(after[0].extra, Some(42));

    // Missing table
    NeverStored::drop_table(connection, true).await.unwrap();
    let mut migration = Migration::<NeverStored>::new();
    assert_eq!(migration.run(connection).await.unwrap(), 0);
    assert_eq!(migration.state(), MigrationState::Swapped);
    assert!(
        fetch_all::<NeverStored, _>(connection, None)
            .await
            .expect("The table must have been created")
            .is_empty()
    );
}

pub async fn migration_batches<C: Connection>(connection: &mut C) {
    let _lock = MUTEX.lock().await;
    ItemBefore::drop_table(connection, true).await.unwrap();
    ItemBefore::markup(connection).await.unwrap();
    let total = 2 * MIGRATION_BATCH as i64 + 76;
    let mut before = (0..total)
        .map(|i| ItemBefore {
            id: Identity::NONE,
            ordinal: i,
            label: format!("row {i}"),
            obsolete: None,
        })
        .collect::<Vec<_>>();
    create_many(connection, &mut before, false)
        .await
        .expect("Failed to create the items in a batch");

    // Gaps right at the batch boundaries
    let removed = [0, MIGRATION_BATCH as usize - 1, MIGRATION_BATCH as usize];
    for i in removed {
        before[i].remove(connection).await.unwrap();
    }
    let before = before
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !removed.contains(i))
        .map(|(_, v)| v)
        .collect::<Vec<_>>();

    let copied = migrate::<ItemAfter, _>(connection, &[("ordinal", "cardinal")])
        .await
        .expect("Failed to migrate across batches");
    assert_eq!(copied, before.len() as u64);
    let after = fetch_all::<ItemAfter, _>(connection, None).await.unwrap();
    assert_eq!(after.len(), before.len());
    for (before, after) in before.iter().zip(&after) {
        assert_eq!(after.identity(), before.identity());
        assert_eq!(after.cardinal, before.ordinal);
        assert_eq!(after.label, before.label);
    }
}

pub async fn migration_failure<C: Connection>(connection: &mut C) {
    let _lock = MUTEX.lock().await;

    // Setup
    FragileBefore::drop_table(connection, true)
        .await
        .expect("Failed to drop the fragile table");
    FragileBefore::markup(connection)
        .await
        .expect("Failed to mark up FragileBefore");
    let mut before = ["1", "2", "three", "4"]
        .into_iter()
        .map(|v| FragileBefore {
            id: Identity::NONE,
            ordinal: v.into(),
        })
        .collect::<Vec<_>>();
    for item in before.iter_mut() {
        item.create(connection)
            .await
            .expect("Failed to create a fragile item");
    }

    // Conversion failure
    let mut migration = Migration::<FragileAfter>::new().rename("ordinal", "cardinal");
    let error = crate::silent_logs! {
        migration
            .run(connection)
            .await
            .expect_err("The text `three` cannot become an integer")
    };
    match error {
        Error::Migration {
            table, row, column, ..
        } => {
            assert_eq!(table, "fragile_item");
            assert_eq!(row, before[2].identity().get());
            assert_eq!(column.as_deref(), Some("cardinal"));
        }
        error => panic!("Unexpected error: {error:?}"),
    }
    assert_eq!(migration.state(), MigrationState::Failed);
    assert_eq!(
        fetch_all::<FragileBefore, _>(connection, None).await.unwrap(),
        before,
        "The old table must be intact"
    );
    assert!(
        columns(connection, "fragile_item__datalite_migration")
            .await
            .is_empty()
    );

    // Unknown rename
    let error = crate::silent_logs! {
        migrate::<FragileAfter, _>(connection, &[("missing", "cardinal")])
            .await
            .expect_err("A rename of a missing column must fail")
    };
    assert!(matches!(error, Error::Migration { .. }), "{error:?}");

    // No source for a non nullable column
    let error = crate::silent_logs! {
        migrate::<FragileAfter, _>(connection, &[])
            .await
            .expect_err("`cardinal` has no source")
    };
    match error {
        Error::Migration { column, .. } => assert_eq!(column.as_deref(), Some("cardinal")),
        error => panic!("Unexpected error: {error:?}"),
    }
    assert_eq!(
        fetch_all::<FragileBefore, _>(connection, None).await.unwrap(),
        before
    );
}
