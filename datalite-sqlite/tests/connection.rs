#[cfg(test)]
mod tests {
    use datalite::{
        Connection, Executor, Transaction,
        stream::{StreamExt, TryStreamExt},
    };
    use datalite_sqlite::SqliteConnection;
    use datalite_tests::{init_logs, silent_logs};
    use std::{path::Path, sync::Mutex};
    use tokio::fs;

    static MUTEX: Mutex<()> = Mutex::new(());

    #[tokio::test]
    async fn create_database() {
        init_logs();
        const DB_PATH: &str = "../target/debug/creation.sqlite";
        let _guard = MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        if Path::new(DB_PATH).exists() {
            fs::remove_file(DB_PATH)
                .await
                .expect("Failed to remove the test database file");
        }
        assert!(
            !Path::new(DB_PATH).exists(),
            "Database file should not exist before test"
        );
        SqliteConnection::connect(&format!("sqlite://{}?mode=rwc", DB_PATH))
            .await
            .expect("Could not open the database");
        assert!(
            Path::new(DB_PATH).exists(),
            "Database file should be created after connection"
        );
        SqliteConnection::connect(&format!("sqlite://{}?mode=ro", DB_PATH))
            .await
            .expect("Could not open the database");
        fs::remove_file(DB_PATH)
            .await
            .expect("Failed to remove the test database file");
        silent_logs! {
            assert!(
                SqliteConnection::connect(&format!("sqlite://{}?mode=ro", DB_PATH))
                    .await
                    .is_err(),
                "Should not be able to open in read only unexisting database"
            );
        }
    }

    #[tokio::test]
    async fn wrong_url() {
        silent_logs! {
            assert!(
                SqliteConnection::connect("duckdb://some_value")
                    .await
                    .is_err()
            );
        };
    }

    #[tokio::test]
    async fn multiple_statements() {
        init_logs();
        let mut connection = SqliteConnection::connect("sqlite://:memory:")
            .await
            .expect("Could not open an in memory database");
        let affected = connection
            .execute(
                "CREATE TABLE t (a INTEGER);
                -- comment between statements
                INSERT INTO t VALUES (1), (2);
                INSERT INTO t VALUES (3);",
            )
            .await
            .expect("Could not run the statements");
        assert_eq!(affected.rows_affected, 3);
        assert_eq!(affected.last_affected_id, Some(3));
        let rows = connection
            .fetch("SELECT a FROM t ORDER BY a;")
            .try_collect::<Vec<_>>()
            .await
            .expect("Could not select");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].names(), ["a"]);
        let results = connection
            .run("UPDATE t SET a = a + 1 WHERE a > 1; SELECT count(*) AS n FROM t;")
            .collect::<Vec<_>>()
            .await;
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn prepared_statements() {
        init_logs();
        let mut connection = SqliteConnection::connect("sqlite://:memory:")
            .await
            .expect("Could not open an in memory database");
        connection
            .execute("CREATE TABLE kv (k TEXT UNIQUE NOT NULL, v BLOB);")
            .await
            .expect("Could not create the table");
        let mut insert = connection
            .prepare("INSERT INTO kv (k, v) VALUES (?, ?);".into())
            .await
            .expect("Could not prepare");
        for (k, v) in [("a", vec![1u8, 2]), ("b", vec![])] {
            insert
                .clear_bindings()
                .and_then(|q| q.bind(k.to_string()))
                .and_then(|q| q.bind(v))
                .expect("Could not bind");
            let result = connection.execute(&mut insert).await.expect("Insert failed");
            assert_eq!(result.rows_affected, 1);
        }
        insert
            .clear_bindings()
            .and_then(|q| q.bind("a".to_string()))
            .expect("Could not bind");
        let error = silent_logs! {
            connection.execute(&mut insert).await.unwrap_err()
        };
        assert!(
            error
                .to_string()
                .contains("While executing the query"),
            "{error}"
        );
        assert!(
            connection
                .prepare("SELECT 1; SELECT 2;".into())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        init_logs();
        let mut connection = SqliteConnection::connect("sqlite://:memory:")
            .await
            .expect("Could not open an in memory database");
        connection
            .execute("CREATE TABLE t (a INTEGER);")
            .await
            .expect("Could not create the table");
        {
            let mut transaction = connection.begin().await.expect("Could not begin");
            transaction
                .execute("INSERT INTO t VALUES (1);")
                .await
                .expect("Could not insert");
        }
        let rows = connection
            .fetch("SELECT a FROM t;")
            .try_collect::<Vec<_>>()
            .await
            .expect("Could not select");
        assert!(rows.is_empty());
        let mut transaction = connection.begin().await.expect("Could not begin");
        transaction
            .execute("INSERT INTO t VALUES (2);")
            .await
            .expect("Could not insert");
        transaction.commit().await.expect("Could not commit");
        let rows = connection
            .fetch("SELECT a FROM t;")
            .try_collect::<Vec<_>>()
            .await
            .expect("Could not select");
        assert_eq!(rows.len(), 1);
    }
}
