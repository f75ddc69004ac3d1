//! End-to-end flows through the async query manager.

mod common;

use axum::{
    body::Body,
    http::{header::SET_COOKIE, Request},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use common::{TestHarness, COOKIE_NAME, SECRET};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tower::ServiceExt;
use vizor_async_queries::{
    async_channel_middleware, build_job_metadata, increment_id, AsyncQueryError,
    AsyncQueryManagerInterface, ChannelClaims, CurrentUser, JobMetadata, JobStatus, Session,
    LOAD_CHART_DATA_TASK, SESSION_CHANNEL_KEY, SESSION_USER_KEY,
};
use vizor_cache::backend::{RANGE_END, RANGE_START};
use vizor_cache::StreamBackend;
use vizor_core::{ChannelId, JobId};

fn decode_claims(token: &str) -> ChannelClaims {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    decode::<ChannelClaims>(token, &DecodingKey::from_secret(SECRET.as_bytes()), &validation)
        .expect("token decodes with the shared secret")
        .claims
}

fn router(harness: &TestHarness) -> Router {
    let manager: Arc<dyn AsyncQueryManagerInterface> = harness.manager.clone();
    Router::new()
        .route("/", get(|| async { "ok" }))
        .layer(from_fn_with_state(manager, async_channel_middleware))
}

async fn issued_cookie(harness: &TestHarness, session: &Session, user: CurrentUser) -> Cookie<'static> {
    let mut request = Request::get("/").body(Body::empty()).unwrap();
    request.extensions_mut().insert(session.clone());
    request.extensions_mut().insert(user);

    let response = router(harness).oneshot(request).await.unwrap();
    let header = response
        .headers()
        .get(SET_COOKIE)
        .expect("cookie issued")
        .to_str()
        .unwrap()
        .to_string();
    Cookie::parse(header).unwrap()
}

fn job(channel: &str, job_id: &str) -> JobMetadata {
    build_job_metadata(
        &ChannelId::from(channel),
        &JobId::from(job_id),
        None,
        JobStatus::Pending,
        vec![],
        None,
    )
}

#[tokio::test]
async fn test_token_issued_on_first_response() {
    let harness = TestHarness::new();
    let session = Session::new();

    let cookie = issued_cookie(&harness, &session, CurrentUser::user(42)).await;
    assert_eq!(cookie.name(), COOKIE_NAME);
    assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    assert_eq!(cookie.http_only(), Some(true));

    let claims = decode_claims(cookie.value());
    assert_eq!(claims.sub.as_deref(), Some("42"));
    assert!(!claims.channel.is_empty());

    assert_eq!(session.channel_id(), Some(claims.channel));
    assert_eq!(session.get(SESSION_USER_KEY), Some(json!(42)));
}

#[tokio::test]
async fn test_token_rotated_on_user_change() {
    let harness = TestHarness::new();
    let mut values = Map::new();
    values.insert(SESSION_CHANNEL_KEY.to_string(), json!("C1"));
    values.insert(SESSION_USER_KEY.to_string(), json!(42));
    let session = Session::from_map(values);

    let cookie = issued_cookie(&harness, &session, CurrentUser::user(99)).await;
    let claims = decode_claims(cookie.value());

    assert_ne!(claims.channel, "C1");
    assert_eq!(claims.sub.as_deref(), Some("99"));
    assert_eq!(session.channel_id(), Some(claims.channel));
    assert_eq!(session.get(SESSION_USER_KEY), Some(json!(99)));
}

#[tokio::test]
async fn test_issued_channels_are_fresh() {
    let harness = TestHarness::new();
    let mut seen = HashSet::new();

    for user in [None, Some(1), Some(2), None, Some(3)] {
        let cookie = harness
            .manager
            .validate_session(&Session::new(), user, false)
            .unwrap()
            .unwrap();
        let claims = decode_claims(cookie.value());
        assert_eq!(claims.sub, user.map(|id| id.to_string()));
        assert!(seen.insert(claims.channel));
    }
}

#[tokio::test]
async fn test_events_read_in_append_order() {
    let harness = TestHarness::new();
    let job = job("C", "J");

    for status in [JobStatus::Pending, JobStatus::Running, JobStatus::Done] {
        harness
            .manager
            .update_job(&job, status, Map::new())
            .await
            .unwrap();
    }

    let events = harness
        .manager
        .read_events(&ChannelId::from("C"), None)
        .await
        .unwrap();
    let statuses: Vec<JobStatus> = events.iter().map(|e| e.job.status.clone()).collect();
    assert_eq!(
        statuses,
        vec![JobStatus::Pending, JobStatus::Running, JobStatus::Done]
    );
    for event in &events {
        assert_eq!(event.job.job_id, Some(JobId::from("J")));
    }
    for pair in events.windows(2) {
        assert!(stream_order(&pair[0].id) < stream_order(&pair[1].id));
    }
}

#[tokio::test]
async fn test_firehose_mirrors_channels() {
    let harness = TestHarness::new();
    let updates = [
        ("C1", JobStatus::Pending),
        ("C2", JobStatus::Pending),
        ("C1", JobStatus::Done),
        ("C2", JobStatus::Done),
    ];
    for (channel, status) in updates.iter().cloned() {
        harness
            .manager
            .update_job(&job(channel, &format!("J-{}", channel)), status, Map::new())
            .await
            .unwrap();
    }

    for channel in ["C1", "C2"] {
        let events = harness
            .manager
            .read_events(&ChannelId::from(channel), None)
            .await
            .unwrap();
        let statuses: Vec<JobStatus> = events.iter().map(|e| e.job.status.clone()).collect();
        assert_eq!(statuses, vec![JobStatus::Pending, JobStatus::Done]);
    }

    let firehose = harness
        .backend
        .xrange("async-events-full", RANGE_START, RANGE_END, None)
        .await
        .unwrap();
    assert_eq!(firehose.len(), 4);

    let mut channel_payloads = Vec::new();
    for channel in ["async-events-C1", "async-events-C2"] {
        for entry in harness
            .backend
            .xrange(channel, RANGE_START, RANGE_END, None)
            .await
            .unwrap()
        {
            channel_payloads.push(entry.field("data").unwrap().to_string());
        }
    }
    let mut firehose_payloads: Vec<String> = firehose
        .iter()
        .map(|e| e.field("data").unwrap().to_string())
        .collect();
    channel_payloads.sort();
    firehose_payloads.sort();
    assert_eq!(channel_payloads, firehose_payloads);
}

#[tokio::test]
async fn test_guest_token_not_returned() {
    let harness = TestHarness::new();

    let job = harness
        .manager
        .submit_chart_data_job(
            &ChannelId::from("C"),
            json!({"x": 1}),
            &CurrentUser::guest(json!("GT")),
        )
        .await
        .unwrap();

    let returned = serde_json::to_value(&job).unwrap();
    assert!(returned.get("guest_token").is_none());
    assert_eq!(returned["user_id"], Value::Null);

    let sent = harness.queue.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].task, LOAD_CHART_DATA_TASK);
    assert_eq!(sent[0].args[0]["guest_token"], json!("GT"));
    assert_eq!(sent[0].args[0]["job_id"], returned["job_id"]);
    assert_eq!(sent[0].args[1], json!({"x": 1}));
}

#[tokio::test]
async fn test_update_without_channel_is_rejected() {
    let harness = TestHarness::new();
    let partial: JobMetadata = serde_json::from_value(json!({"job_id": "J"})).unwrap();

    let err = harness
        .manager
        .update_job(&partial, JobStatus::Running, Map::new())
        .await
        .unwrap_err();

    assert!(matches!(err, AsyncQueryError::InvalidJob(_)));
    assert!(harness.backend.stream_names().is_empty());
}

#[tokio::test]
async fn test_read_after_last_id_skips_seen_events() {
    let harness = TestHarness::new();
    let job = job("C", "J");
    let channel = ChannelId::from("C");

    harness
        .manager
        .update_job(&job, JobStatus::Pending, Map::new())
        .await
        .unwrap();
    let first = harness.manager.read_events(&channel, None).await.unwrap();
    assert_eq!(first.len(), 1);

    harness
        .manager
        .update_job(&job, JobStatus::Running, Map::new())
        .await
        .unwrap();
    let next = harness
        .manager
        .read_events(&channel, Some(&first[0].id))
        .await
        .unwrap();

    assert_eq!(next.len(), 1);
    assert_eq!(next[0].job.status, JobStatus::Running);
    let floor = stream_order(&increment_id(&first[0].id));
    assert!(next.iter().all(|e| stream_order(&e.id) >= floor));
}

#[tokio::test]
async fn test_worker_extras_round_trip() {
    let harness = TestHarness::new();
    let mut extras = Map::new();
    extras.insert(
        "errors".to_string(),
        json!([{"message": "Division by zero", "extra": {"line": 3}}]),
    );
    extras.insert("result_url".to_string(), Value::Null);

    harness
        .manager
        .update_job(&job("C", "J"), JobStatus::Error, extras)
        .await
        .unwrap();

    let events = harness
        .manager
        .read_events(&ChannelId::from("C"), None)
        .await
        .unwrap();
    assert_eq!(events[0].job.status, JobStatus::Error);
    assert_eq!(
        events[0].job.errors,
        vec![json!({"message": "Division by zero", "extra": {"line": 3}})]
    );
}

fn stream_order(id: &str) -> (u64, u64) {
    let (ms, seq) = id.split_once('-').unwrap();
    (ms.parse().unwrap(), seq.parse().unwrap())
}
