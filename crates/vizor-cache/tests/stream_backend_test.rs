//! Stream backend behaviour through the trait object, as callers see it.

use std::sync::Arc;
use vizor_cache::backend::{AUTO_ID, RANGE_END, RANGE_START};
use vizor_cache::{BackendKind, InMemoryStreamBackend, StreamBackend, StreamFields};

fn data(value: &str) -> StreamFields {
    let mut fields = StreamFields::new();
    fields.insert("data".to_string(), value.to_string());
    fields
}

fn parse_id(id: &str) -> (u64, u64) {
    let (ms, seq) = id.split_once('-').expect("id has two parts");
    (ms.parse().expect("ms"), seq.parse().expect("seq"))
}

#[tokio::test]
async fn test_concurrent_appends_keep_order() {
    let backend: Arc<dyn StreamBackend> = Arc::new(InMemoryStreamBackend::new());

    let mut handles = Vec::new();
    for task in 0..8 {
        let backend = Arc::clone(&backend);
        handles.push(tokio::spawn(async move {
            for i in 0..25 {
                backend
                    .xadd("shared", &data(&format!("{}-{}", task, i)), AUTO_ID, None)
                    .await
                    .expect("xadd");
            }
        }));
    }
    for handle in handles {
        handle.await.expect("task");
    }

    let entries = backend
        .xrange("shared", RANGE_START, RANGE_END, None)
        .await
        .expect("xrange");
    assert_eq!(entries.len(), 200);
    for pair in entries.windows(2) {
        assert!(parse_id(&pair[0].id) < parse_id(&pair[1].id));
    }
}

#[tokio::test]
async fn test_trimmed_stream_keeps_newest() {
    let backend: Arc<dyn StreamBackend> = Arc::new(InMemoryStreamBackend::new());

    for i in 0..20 {
        backend
            .xadd("bounded", &data(&i.to_string()), AUTO_ID, Some(5))
            .await
            .expect("xadd");
    }

    let entries = backend
        .xrange("bounded", RANGE_START, RANGE_END, Some(100))
        .await
        .expect("xrange");
    let values: Vec<&str> = entries.iter().filter_map(|e| e.field("data")).collect();
    assert_eq!(values, vec!["15", "16", "17", "18", "19"]);
    assert_eq!(backend.kind(), BackendKind::Memory);
}

#[tokio::test]
async fn test_payload_round_trips_unchanged() {
    let backend = InMemoryStreamBackend::new();
    let payload = r#"{"channel_id":"c","errors":[{"message":"boom","extra":{"n":1}}],"result_url":null}"#;

    backend
        .xadd("s", &data(payload), AUTO_ID, None)
        .await
        .expect("xadd");
    let entries = backend
        .xrange("s", RANGE_START, RANGE_END, None)
        .await
        .expect("xrange");

    assert_eq!(entries[0].field("data"), Some(payload));
    assert_eq!(backend.stream_names(), vec!["s".to_string()]);
}
