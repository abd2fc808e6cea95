use datalite::{Connection, Entity, Identity, copy_many, create_many, fetch_all};
use std::sync::LazyLock;
use tokio::sync::Mutex;

#[derive(Entity, Debug, Clone, PartialEq)]
struct Contact {
    id: Identity,
    #[datalite(unique)]
    name: String,
    phone: Option<String>,
    favorite: bool,
}

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub async fn copy<C: Connection>(source: &mut C, target: &mut C) {
    let _lock = MUTEX.lock().await;

    // Setup
    Contact::drop_table(source, true)
        .await
        .expect("Failed to drop Contact on the source");
    Contact::markup(source)
        .await
        .expect("Failed to mark up Contact on the source");
    let mut contacts = (0..40)
        .map(|i| Contact {
            id: Identity::NONE,
            name: format!("contact {i}"),
            phone: (i % 3 == 0).then(|| format!("555-{i:04}")),
            favorite: i % 7 == 0,
        })
        .collect::<Vec<_>>();
    create_many(source, &mut contacts, true)
        .await
        .expect("Failed to create the contacts on the source");

    for protect_memory in [true, false] {
        Contact::drop_table(target, true)
            .await
            .expect("Failed to drop Contact on the target");
        let ids = copy_many(&contacts, target, protect_memory)
            .await
            .expect("Failed to copy the contacts");
        assert_eq!(ids.len(), contacts.len());
        let copied = fetch_all::<Contact, _>(target, None)
            .await
            .expect("Failed to fetch the copied contacts");
        assert_eq!(
            copied.iter().filter_map(|v| v.identity().get()).collect::<Vec<_>>(),
            ids
        );
        for (copied, original) in copied.iter().zip(&contacts) {
            assert_eq!(copied.name, original.name);
            assert_eq!(copied.phone, original.phone);
            assert_eq!(copied.favorite, original.favorite);
        }
        assert_eq!(
            fetch_all::<Contact, _>(source, None).await.unwrap(),
            contacts,
            "The source must be unchanged"
        );
    }
}
