use datalite::{
    Connection, Entity, Error, Executor, Identity, Page, create_many, fetch_all, fetch_equals,
    fetch_if, fetch_range, fetch_where,
};
use std::sync::LazyLock;
use tokio::sync::Mutex;

#[derive(Entity, Debug, Clone, PartialEq)]
struct Reading {
    id: Identity,
    sensor: String,
    bucket: i32,
    value: f64,
    note: Option<String>,
}

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

async fn fill<E: Executor>(executor: &mut E, count: i32) -> Vec<Reading> {
    Reading::drop_table(executor, true)
        .await
        .expect("Failed to drop Reading table");
    Reading::markup(executor)
        .await
        .expect("Failed to mark up Reading");
    let mut readings = (0..count)
        .map(|i| Reading {
            id: Identity::NONE,
            sensor: format!("sensor-{}", i % 4),
            bucket: i % 3,
            value: i as f64 * 0.5,
            note: (i % 5 == 0).then(|| format!("note {i}")),
        })
        .collect::<Vec<_>>();
    for reading in readings.iter_mut() {
        reading
            .create(executor)
            .await
            .expect("Failed to create a reading");
    }
    readings
}

fn ids(readings: &[Reading]) -> Vec<i64> {
    readings.iter().filter_map(|v| v.identity().get()).collect()
}

pub async fn fetch<E: Executor>(executor: &mut E) {
    let _lock = MUTEX.lock().await;
    let readings = fill(executor, 20).await;

    // Equality
    let first = fetch_equals::<Reading, _>(executor, "sensor", "sensor-2".to_string())
        .await
        .expect("Failed to fetch by sensor");
    assert_eq!(first.as_ref(), Some(&readings[2]));
    let none = fetch_equals::<Reading, _>(executor, "sensor", "sensor-9".to_string())
        .await
        .expect("Failed to fetch a missing sensor");
    assert_eq!(none, None);
    let by_identity = fetch_equals::<Reading, _>(executor, "obj_id", readings[7].identity().0)
        .await
        .unwrap();
    assert_eq!(by_identity.as_ref(), Some(&readings[7]));

    // Where
    let sensors = fetch_where::<Reading, _>(executor, "sensor", "sensor-1".to_string(), None)
        .await
        .expect("Failed to fetch every sensor-1 reading");
    assert_eq!(
        sensors,
        readings.iter().skip(1).step_by(4).cloned().collect::<Vec<_>>()
    );
    let without_note = fetch_where::<Reading, _>(executor, "note", None::<String>, None)
        .await
        .expect("Failed to fetch the readings without a note");
    assert_eq!(without_note.len(), 16);
    assert!(without_note.iter().all(|v| v.note.is_none()));
    let empty = fetch_where::<Reading, _>(executor, "bucket", 7, None)
        .await
        .expect("A fetch without matches is not an error");
    assert!(empty.is_empty());

    // Raw predicate
    let large = fetch_if::<Reading, _>(executor, r#""value" >= 8.0 AND "bucket" = 0"#, None)
        .await
        .expect("Failed to fetch with a predicate");
    assert_eq!(ids(&large), [ids(&readings)[18]]);

    // Range
    let all = ids(&readings);
    let (a, b) = (all[3], all[8]);
    let range = fetch_range::<Reading, _>(executor, a..b).await.unwrap();
    assert_eq!(ids(&range), (a..b).collect::<Vec<_>>());
    let range = fetch_range::<Reading, _>(executor, a..=b).await.unwrap();
    assert_eq!(ids(&range), (a..=b).collect::<Vec<_>>());
    let range = fetch_range::<Reading, _>(executor, all[17]..).await.unwrap();
    assert_eq!(ids(&range), &all[17..]);
    let range = fetch_range::<Reading, _>(executor, ..all[2]).await.unwrap();
    assert_eq!(ids(&range), &all[..2]);
    assert_eq!(fetch_range::<Reading, _>(executor, ..).await.unwrap(), readings);
    assert!(fetch_range::<Reading, _>(executor, b..a).await.unwrap().is_empty());

    // Unknown column
    let error = crate::silent_logs! {
        fetch_where::<Reading, _>(executor, "missing", 1, None)
            .await
            .expect_err("An unknown column must be rejected")
    };
    assert!(matches!(error, Error::Schema { .. }), "{error:?}");
}

pub async fn pagination<E: Executor>(executor: &mut E) {
    let _lock = MUTEX.lock().await;
    let readings = fill(executor, 30).await;

    let page = fetch_all::<Reading, _>(executor, Some(Page::new(1, 10)))
        .await
        .expect("Failed to fetch page 1");
    assert_eq!(page, &readings[0..10]);
    let page = fetch_all::<Reading, _>(executor, Some(Page::new(2, 10)))
        .await
        .expect("Failed to fetch page 2");
    assert_eq!(page, &readings[10..20]);
    let page = fetch_all::<Reading, _>(executor, Some(Page::new(0, 10)))
        .await
        .expect("Failed to fetch page 0");
    assert_eq!(page, &readings[0..10]);
    let page = fetch_all::<Reading, _>(executor, Some(Page::new(4, 10)))
        .await
        .expect("Failed to fetch past the end");
    assert!(page.is_empty());
    let page = fetch_all::<Reading, _>(executor, Some(Page::new(3, 8)))
        .await
        .unwrap();
    assert_eq!(page, &readings[16..24]);

    // Oversized pages
    let page = fetch_all::<Reading, _>(executor, Some(Page::new(1, u64::MAX)))
        .await
        .expect("Failed to fetch an oversized page");
    assert_eq!(page, readings);
    let page = fetch_all::<Reading, _>(executor, Some(Page::new(u64::MAX, 10)))
        .await
        .expect("Failed to fetch the last possible page");
    assert!(page.is_empty());
    let page = fetch_where::<Reading, _>(executor, "bucket", 0, Some(Page::new(1 << 62, 4)))
        .await
        .expect("Failed to fetch a filtered page far past the end");
    assert!(page.is_empty());

    // Filtered, 10 of the 30 rows are in bucket 0
    let filtered = readings
        .iter()
        .filter(|v| v.bucket == 0)
        .cloned()
        .collect::<Vec<_>>();
    assert_eq!(filtered.len(), 10);
    let page = fetch_where::<Reading, _>(executor, "bucket", 0, Some(Page::new(2, 5)))
        .await
        .expect("Failed to fetch the filtered page 2");
    assert_eq!(page, &filtered[5..10]);
    let page = fetch_if::<Reading, _>(executor, r#""bucket" = 0"#, Some(Page::new(1, 5)))
        .await
        .unwrap();
    assert_eq!(page, &filtered[0..5]);
}

/// Rows written by a batch come back the same way as single creates.
pub(crate) async fn batch_matches_fetch<C: Connection>(connection: &mut C) {
    let _lock = MUTEX.lock().await;
    let mut readings = fill(connection, 0).await;
    readings.extend((0..3).map(|i| Reading {
        id: Identity::NONE,
        sensor: "batch".into(),
        bucket: i,
        value: 0.0,
        note: None,
    }));
    create_many(connection, &mut readings, false)
        .await
        .expect("Failed to create the readings in a batch");
    assert_eq!(
        fetch_all::<Reading, _>(connection, None).await.unwrap(),
        readings
    );
}
