//! Stream commands against a live Redis server.
//!
//! Run with `VIZOR_TEST_REDIS_HOST` (and optionally `VIZOR_TEST_REDIS_PORT`)
//! set and `--ignored`.

use std::time::{SystemTime, UNIX_EPOCH};
use vizor_cache::backend::{AUTO_ID, RANGE_END, RANGE_START};
use vizor_cache::{RedisBackendParams, RedisStreamBackend, StreamBackend, StreamFields};
use vizor_config::{CacheConfig, CacheType};

async fn live_backend() -> Option<RedisStreamBackend> {
    let Ok(host) = std::env::var("VIZOR_TEST_REDIS_HOST") else {
        eprintln!("VIZOR_TEST_REDIS_HOST not set, skipping");
        return None;
    };
    let port = std::env::var("VIZOR_TEST_REDIS_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(6379);

    let config = CacheConfig {
        cache_type: Some(CacheType::Redis),
        host,
        port,
        ..CacheConfig::default()
    };
    let params = RedisBackendParams::from_cache_config(&config).expect("params");
    Some(RedisStreamBackend::connect(&params).await.expect("connect"))
}

fn unique_stream(name: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    format!("vizor-test-{}-{}", name, nanos)
}

fn data(value: usize) -> StreamFields {
    let mut fields = StreamFields::new();
    fields.insert("data".to_string(), value.to_string());
    fields
}

#[tokio::test]
#[ignore = "needs a Redis server"]
async fn test_xadd_trims_to_approximate_maxlen() {
    let Some(backend) = live_backend().await else {
        return;
    };
    let stream = unique_stream("maxlen");

    for i in 0..500 {
        backend
            .xadd(&stream, &data(i), AUTO_ID, Some(10))
            .await
            .expect("xadd");
    }

    let entries = backend
        .xrange(&stream, RANGE_START, RANGE_END, Some(1000))
        .await
        .expect("xrange");
    // approximate trimming removes whole nodes, never below the limit
    assert!(entries.len() >= 10);
    assert!(entries.len() < 500);
    assert_eq!(entries.last().and_then(|e| e.field("data")), Some("499"));
}

#[tokio::test]
#[ignore = "needs a Redis server"]
async fn test_xrange_honours_count_and_bounds() {
    let Some(backend) = live_backend().await else {
        return;
    };
    let stream = unique_stream("range");

    let mut ids = Vec::new();
    for i in 0..5 {
        ids.push(
            backend
                .xadd(&stream, &data(i), AUTO_ID, None)
                .await
                .expect("xadd"),
        );
    }

    let first_three = backend
        .xrange(&stream, RANGE_START, RANGE_END, Some(3))
        .await
        .expect("xrange");
    let got: Vec<_> = first_three.iter().map(|e| e.id.clone()).collect();
    assert_eq!(got, ids[..3]);

    let tail = backend
        .xrange(&stream, &ids[3], RANGE_END, None)
        .await
        .expect("xrange");
    assert_eq!(tail.len(), 2);
    assert_eq!(tail[0].field("data"), Some("3"));
}

#[tokio::test]
#[ignore = "needs a Redis server"]
async fn test_malformed_start_is_invalid_stream_id() {
    let Some(backend) = live_backend().await else {
        return;
    };
    let stream = unique_stream("bad-id");
    backend
        .xadd(&stream, &data(0), AUTO_ID, None)
        .await
        .expect("xadd");

    let err = backend
        .xrange(&stream, "not-an-id", RANGE_END, None)
        .await
        .unwrap_err();
    assert!(matches!(err, vizor_cache::CacheError::InvalidStreamId(_)));
}
