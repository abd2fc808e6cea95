use datalite::{Entity, Executor, Identity, fetch_from};
use std::sync::LazyLock;
use time::macros::{date, datetime, time};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Entity, Debug, Clone, PartialEq)]
struct Sample {
    id: Identity,
    boolean: bool,
    int8: i8,
    int16: i16,
    int32: i32,
    int64: i64,
    uint8: u8,
    uint16: u16,
    uint32: u32,
    uint64: u64,
    float32: f32,
    float64: f64,
    text: String,
    bytes: Vec<u8>,
    date: time::Date,
    time: time::Time,
    timestamp: time::PrimitiveDateTime,
    uuid: Uuid,
    maybe_int: Option<i64>,
    maybe_text: Option<String>,
    maybe_bytes: Option<Box<[u8]>>,
    maybe_uuid: Option<Uuid>,
}

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub async fn round_trip<E: Executor>(executor: &mut E) {
    let _lock = MUTEX.lock().await;

    // Setup
    Sample::drop_table(executor, true)
        .await
        .expect("Failed to drop Sample table");
    Sample::markup(executor)
        .await
        .expect("Failed to mark up Sample");

    let mut samples = [
        Sample {
            id: Identity::NONE,
            boolean: true,
            int8: i8::MIN,
            int16: i16::MAX,
            int32: -2_000_000_000,
            int64: i64::MIN,
            uint8: u8::MAX,
            uint16: 40_000,
            uint32: u32::MAX,
            uint64: i64::MAX as u64,
            float32: -3.25,
            float64: 1.0e-300,
            text: "Hello, 'world' \"quoted\" ✓\nsecond line".into(),
            bytes: vec![0, 1, 2, 127, 128, 254, 255],
            date: date!(1969 - 07 - 20),
            time: time!(20:17:40.123456),
            timestamp: datetime!(2000-01-01 00:00:00),
            uuid: Uuid::parse_str("5e915574-bb30-4430-98cf-c5854f61fbbd").unwrap(),
            maybe_int: Some(-1),
            maybe_text: Some(String::new()),
            maybe_bytes: Some(Box::new([])),
            maybe_uuid: Some(Uuid::nil()),
        },
        Sample {
            id: Identity::NONE,
            boolean: false,
            int8: 0,
            int16: -1,
            int32: 0,
            int64: i64::MAX,
            uint8: 0,
            uint16: 0,
            uint32: 0,
            uint64: 0,
            float32: f32::MAX,
            float64: -0.5,
            text: String::new(),
            bytes: vec![],
            date: date!(2024 - 02 - 29),
            time: time!(00:00:00),
            timestamp: datetime!(2024-12-31 23:59:59.999),
            uuid: Uuid::from_u128(u128::MAX),
            maybe_int: None,
            maybe_text: None,
            maybe_bytes: None,
            maybe_uuid: None,
        },
    ];
    for sample in samples.iter_mut() {
        sample
            .create(executor)
            .await
            .expect("Failed to create a sample");
    }
    for sample in &samples {
        let stored = fetch_from::<Sample, _>(executor, sample.identity().get().unwrap())
            .await
            .expect("Failed to fetch a sample")
            .expect("The sample is missing");
        assert_eq!(&stored, sample);
    }
}
