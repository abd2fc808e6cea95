use datalite::{ConstraintRule, Entity, Error, Executor, Identity, fetch_all};
use std::sync::LazyLock;
use tokio::sync::Mutex;

#[derive(Entity, Debug, Clone, PartialEq)]
struct Account {
    id: Identity,
    #[datalite(unique)]
    email: Option<String>,
    #[datalite(not_null)]
    nickname: Option<String>,
    credit: i64,
}

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

fn account(email: Option<&str>, nickname: Option<&str>) -> Account {
    Account {
        id: Identity::NONE,
        email: email.map(Into::into),
        nickname: nickname.map(Into::into),
        credit: 100,
    }
}

pub async fn constraints<E: Executor>(executor: &mut E) {
    let _lock = MUTEX.lock().await;

    // Setup
    Account::drop_table(executor, true)
        .await
        .expect("Failed to drop Account table");
    Account::markup(executor)
        .await
        .expect("Failed to mark up Account");

    // Unique
    let mut first = account(Some("ada@example.com"), Some("ada"));
    first
        .create(executor)
        .await
        .expect("Failed to create the first account");
    let mut second = account(Some("ada@example.com"), Some("other"));
    let error = crate::silent_logs! {
        second.create(executor).await.expect_err("The duplicate email must be rejected")
    };
    match error {
        Error::ConstraintFailed { table, rule, .. } => {
            assert_eq!(table, "account");
            assert_eq!(rule, ConstraintRule::Unique);
        }
        error => panic!("Unexpected error: {error:?}"),
    }
    assert_eq!(second.identity(), Identity::NONE);
    assert_eq!(
        fetch_all::<Account, _>(executor, None).await.unwrap(),
        [first.clone()]
    );

    // Not null through unique
    let mut missing = account(None, Some("anonymous"));
    let error = crate::silent_logs! {
        missing.create(executor).await.expect_err("A missing email must be rejected")
    };
    assert!(
        matches!(
            error,
            Error::ConstraintFailed {
                rule: ConstraintRule::NotNull,
                ..
            }
        ),
        "Unexpected error: {error:?}"
    );

    // Not null
    let mut missing = account(Some("grace@example.com"), None);
    let error = crate::silent_logs! {
        missing.create(executor).await.expect_err("A missing nickname must be rejected")
    };
    assert!(
        matches!(
            error,
            Error::ConstraintFailed {
                rule: ConstraintRule::NotNull,
                ..
            }
        ),
        "Unexpected error: {error:?}"
    );

    // Update into a duplicate
    let mut grace = account(Some("grace@example.com"), Some("grace"));
    grace.create(executor).await.expect("Failed to create grace");
    grace.email = first.email.clone();
    let error = crate::silent_logs! {
        grace.update(executor).await.expect_err("The update must be rejected")
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
    let stored = fetch_all::<Account, _>(executor, None).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[1].email.as_deref(), Some("grace@example.com"));
}
