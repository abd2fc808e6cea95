use crate::fetch::batch_matches_fetch;
use datalite::{
    ConstraintRule, Connection, Entity, Error, Identity, create_many, fetch_all, fetch_from,
};
use std::{collections::HashSet, sync::LazyLock};
use tokio::sync::Mutex;

#[derive(Entity, Debug, Clone, PartialEq)]
struct Ticket {
    id: Identity,
    #[datalite(unique)]
    code: String,
    seat: u16,
}

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

fn tickets(prefix: &str, count: u16) -> Vec<Ticket> {
    (0..count)
        .map(|i| Ticket {
            id: Identity::NONE,
            code: format!("{prefix}-{i}"),
            seat: i,
        })
        .collect()
}

pub async fn mass<C: Connection>(connection: &mut C) {
    let _lock = MUTEX.lock().await;

    for protect_memory in [true, false] {
        // Setup
        Ticket::drop_table(connection, true)
            .await
            .expect("Failed to drop Ticket table");
        Ticket::markup(connection)
            .await
            .expect("Failed to mark up Ticket");

        // Batch
        let mut batch = tickets("A", 1200);
        create_many(connection, &mut batch, protect_memory)
            .await
            .expect("Failed to create a batch of tickets");
        let ids = batch
            .iter()
            .map(|v| v.identity().get().expect("Every ticket must have an identity"))
            .collect::<HashSet<_>>();
        assert_eq!(ids.len(), batch.len());
        assert_eq!(fetch_all::<Ticket, _>(connection, None).await.unwrap(), batch);
        let last = batch.last().unwrap();
        assert_eq!(
            fetch_from::<Ticket, _>(connection, last.identity().get().unwrap())
                .await
                .unwrap()
                .as_ref(),
            Some(last)
        );
        create_many::<Ticket, _>(connection, &mut [], protect_memory)
            .await
            .expect("An empty batch is not an error");

        // Duplicate inside the batch
        let mut failing = tickets("B", 10);
        failing[7].code = failing[2].code.clone();
        let error = crate::silent_logs! {
            create_many(connection, &mut failing, protect_memory)
                .await
                .expect_err("The batch with a duplicate must fail")
        };
        assert!(
            matches!(
                error,
                Error::ConstraintFailed {
                    rule: ConstraintRule::Unique,
                    ..
                }
            ),
            "Unexpected error: {error:?}"
        );
        assert!(failing.iter().all(|v| v.identity() == Identity::NONE));

        // Duplicate of a stored row
        let mut failing = tickets("C", 5);
        failing[4].code = batch[0].code.clone();
        let error = crate::silent_logs! {
            create_many(connection, &mut failing, protect_memory)
                .await
                .expect_err("The batch clashing with a stored row must fail")
        };
        assert!(error.is_constraint_failed(), "Unexpected error: {error:?}");
        assert!(failing.iter().all(|v| v.identity() == Identity::NONE));
        assert_eq!(
            fetch_all::<Ticket, _>(connection, None).await.unwrap().len(),
            batch.len(),
            "No row of a failed batch can be committed"
        );
    }

    batch_matches_fetch(connection).await;
}
