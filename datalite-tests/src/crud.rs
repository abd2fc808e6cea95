use datalite::{Entity, Error, Executor, Identity, fetch_all, fetch_from, is_fetchable};
use std::{collections::HashSet, sync::LazyLock};
use tokio::sync::Mutex;

#[derive(Entity, Debug, Clone, PartialEq)]
struct Bookmark {
    id: Identity,
    url: String,
    title: Option<String>,
    visits: u32,
}

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub async fn crud<E: Executor>(executor: &mut E) {
    let _lock = MUTEX.lock().await;

    // Setup
    Bookmark::drop_table(executor, true)
        .await
        .expect("Failed to drop Bookmark table");
    Bookmark::markup(executor)
        .await
        .expect("Failed to mark up Bookmark");
    Bookmark::markup(executor)
        .await
        .expect("Marking up an existing table must be harmless");

    // Create
    let mut bookmarks = (0..5)
        .map(|i| Bookmark {
            id: Identity::NONE,
            url: format!("https://example.com/{i}"),
            title: (i % 2 == 0).then(|| format!("Page {i}")),
            visits: i * 10,
        })
        .collect::<Vec<_>>();
    let mut ids = HashSet::new();
    for bookmark in bookmarks.iter_mut() {
        let id = bookmark
            .create(executor)
            .await
            .expect("Failed to create a bookmark");
        assert_eq!(bookmark.identity(), Identity::new(id));
        assert!(ids.insert(id), "Identity {id} was assigned twice");
    }
    for bookmark in &bookmarks {
        let id = bookmark.identity().get().unwrap();
        let stored = fetch_from::<Bookmark, _>(executor, id)
            .await
            .expect("Failed to fetch a bookmark")
            .expect("The created bookmark is missing");
        assert_eq!(&stored, bookmark);
        assert!(
            is_fetchable::<Bookmark, _>(executor, id)
                .await
                .expect("Failed to check a bookmark")
        );
    }
    assert_eq!(
        fetch_from::<Bookmark, _>(executor, i64::MAX).await.unwrap(),
        None
    );

    // Creating again gives a new row
    let mut copy = bookmarks[0].clone();
    let first = copy.identity().get().unwrap();
    let second = copy.create(executor).await.expect("Failed to create again");
    assert_ne!(first, second);
    assert_eq!(fetch_all::<Bookmark, _>(executor, None).await.unwrap().len(), 6);

    // Update
    bookmarks[1].title = Some("Renamed".into());
    bookmarks[1].visits += 1;
    bookmarks[1]
        .update(executor)
        .await
        .expect("Failed to update a bookmark");
    bookmarks[1]
        .update(executor)
        .await
        .expect("Updating twice must be harmless");
    let stored = fetch_from::<Bookmark, _>(executor, bookmarks[1].identity().get().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, bookmarks[1]);

    // Remove
    copy.remove(executor).await.expect("Failed to remove a bookmark");
    assert_eq!(copy.identity(), Identity::new(second));
    copy.remove(executor)
        .await
        .expect("Removing a removed bookmark must be a no-op");
    let all = fetch_all::<Bookmark, _>(executor, None).await.unwrap();
    assert_eq!(all, bookmarks);
    assert!(!is_fetchable::<Bookmark, _>(executor, second).await.unwrap());

    // Instances that were never created
    let fresh = Bookmark {
        id: Identity::NONE,
        url: "https://example.com/new".into(),
        title: None,
        visits: 0,
    };
    assert!(matches!(
        fresh.update(executor).await,
        Err(Error::State(..))
    ));
    assert!(matches!(
        fresh.remove(executor).await,
        Err(Error::State(..))
    ));
    assert_eq!(fetch_all::<Bookmark, _>(executor, None).await.unwrap().len(), 5);
}
