//! Async query manager.
//!
//! Owns the channel token codec, the stream backend and the worker queue.
//! Web handlers use it to submit jobs and read events; workers use it to
//! publish status updates.

use crate::error::{AsyncQueryError, AsyncQueryResult};
use crate::job::{build_job_metadata, Event, JobMetadata, JobStatus};
use crate::metrics::AsyncQueryMetrics;
use crate::queue::{TaskQueue, LOAD_CHART_DATA_TASK, LOAD_EXPLORE_JSON_TASK};
use crate::redis_queue::RedisTaskQueue;
use crate::session::{CurrentUser, Session, SESSION_CHANNEL_KEY, SESSION_USER_KEY};
use crate::stream_id::increment_id;
use crate::token::{ChannelClaims, ChannelTokenCodec};
use async_trait::async_trait;
use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use vizor_cache::backend::{AUTO_ID, RANGE_END, RANGE_START};
use vizor_cache::{StreamBackend, StreamBackendFactory, StreamEntry, StreamFields};
use vizor_config::{AppConfig, AsyncQueriesConfig, ConfigValidator, SameSitePolicy};
use vizor_core::{ChannelId, Interface, JobId};

/// Most events returned by one read.
pub const MAX_EVENT_COUNT: usize = 100;

/// Name of the firehose stream, after the prefix.
pub const FIREHOSE_STREAM: &str = "full";

/// Field holding the serialized job in each stream entry.
pub const DATA_FIELD: &str = "data";

/// What a manager is built from.
///
/// Unset components are built from `config` during init.
#[derive(Clone, Default)]
pub struct ManagerContext {
    /// Application configuration.
    pub config: AppConfig,
    /// Pre-built stream backend.
    pub backend: Option<Arc<dyn StreamBackend>>,
    /// Pre-built worker queue.
    pub task_queue: Option<Arc<dyn TaskQueue>>,
}

impl ManagerContext {
    /// Context that builds every component from `config`.
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            backend: None,
            task_queue: None,
        }
    }

    /// Uses `backend` instead of connecting one.
    #[must_use]
    pub fn with_backend(mut self, backend: Arc<dyn StreamBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Uses `task_queue` instead of connecting one.
    #[must_use]
    pub fn with_task_queue(mut self, task_queue: Arc<dyn TaskQueue>) -> Self {
        self.task_queue = Some(task_queue);
        self
    }
}

/// Async query manager operations.
#[async_trait]
pub trait AsyncQueryManagerInterface: Interface {
    /// Name of the channel token cookie.
    fn cookie_name(&self) -> &str;

    /// Whether the cookie-issuing middleware should be installed.
    fn register_request_handlers(&self) -> bool;

    /// Verifies the channel cookie in `headers` and returns its claims.
    fn channel_claims_from_request(&self, headers: &HeaderMap) -> AsyncQueryResult<ChannelClaims>;

    /// Channel id from the request's token cookie.
    fn parse_channel_id_from_request(&self, headers: &HeaderMap) -> AsyncQueryResult<ChannelId> {
        let claims = self.channel_claims_from_request(headers)?;
        Ok(ChannelId::from(claims.channel))
    }

    /// Fresh `pending` job for `channel_id`. Nothing is written.
    fn init_job(&self, channel_id: &ChannelId, user_id: Option<i64>) -> JobMetadata {
        build_job_metadata(
            channel_id,
            &JobId::new(),
            user_id,
            JobStatus::Pending,
            Vec::new(),
            None,
        )
    }

    /// Dispatches a chart data job.
    async fn submit_chart_data_job(
        &self,
        channel_id: &ChannelId,
        form_data: Value,
        user: &CurrentUser,
    ) -> AsyncQueryResult<JobMetadata>;

    /// Dispatches an explore JSON job.
    async fn submit_explore_json_job(
        &self,
        channel_id: &ChannelId,
        form_data: Value,
        response_type: &str,
        force: bool,
        user: &CurrentUser,
    ) -> AsyncQueryResult<JobMetadata>;

    /// Events on the channel after `last_id`, oldest first.
    async fn read_events(
        &self,
        channel_id: &ChannelId,
        last_id: Option<&str>,
    ) -> AsyncQueryResult<Vec<Event>>;

    /// Publishes `job` with `status` and `extras` to its channel and the firehose.
    async fn update_job(
        &self,
        job: &JobMetadata,
        status: JobStatus,
        extras: Map<String, Value>,
    ) -> AsyncQueryResult<()>;

    /// Issues a new channel when the session does not match the caller.
    ///
    /// Returns the cookie to set, or `None` when the session is current.
    fn validate_session(
        &self,
        session: &Session,
        user_id: Option<i64>,
        has_cookie: bool,
    ) -> AsyncQueryResult<Option<Cookie<'static>>>;
}

/// Default manager over a stream backend and a task queue.
pub struct AsyncQueryManager {
    config: AsyncQueriesConfig,
    codec: ChannelTokenCodec,
    backend: Arc<dyn StreamBackend>,
    task_queue: Arc<dyn TaskQueue>,
}

impl AsyncQueryManager {
    /// Validates configuration and builds any component `ctx` leaves unset.
    pub async fn init(ctx: ManagerContext) -> AsyncQueryResult<Self> {
        info!("Initializing async query manager...");

        check_secret(&ctx.config.async_queries)?;
        StreamBackendFactory::select(&ctx.config)?;

        let backend = match ctx.backend {
            Some(backend) => backend,
            None => StreamBackendFactory::create(&ctx.config).await?,
        };
        let task_queue: Arc<dyn TaskQueue> = match ctx.task_queue {
            Some(queue) => queue,
            None => Arc::new(RedisTaskQueue::connect(&ctx.config.async_queries.task_queue).await?),
        };

        let manager = Self::with_components(ctx.config.async_queries, backend, task_queue)?;
        info!(
            backend = %manager.backend.kind(),
            stream_prefix = %manager.config.stream_prefix,
            "Async query manager initialized"
        );
        Ok(manager)
    }

    /// Builds a manager from ready components.
    pub fn with_components(
        config: AsyncQueriesConfig,
        backend: Arc<dyn StreamBackend>,
        task_queue: Arc<dyn TaskQueue>,
    ) -> AsyncQueryResult<Self> {
        check_secret(&config)?;
        Ok(Self {
            codec: ChannelTokenCodec::new(&config.jwt_secret),
            config,
            backend,
            task_queue,
        })
    }

    /// Stream holding one channel's events.
    #[must_use]
    pub fn channel_stream(&self, channel_id: &ChannelId) -> String {
        format!("{}{}", self.config.stream_prefix, channel_id)
    }

    /// Stream mirroring every channel.
    #[must_use]
    pub fn firehose_stream(&self) -> String {
        format!("{}{}", self.config.stream_prefix, FIREHOSE_STREAM)
    }

    fn build_cookie(&self, token: String) -> Cookie<'static> {
        let mut builder = Cookie::build((self.config.jwt_cookie_name.clone(), token))
            .path("/")
            .http_only(true)
            .secure(self.config.jwt_cookie_secure);
        if let Some(policy) = self.config.jwt_cookie_samesite {
            builder = builder.same_site(match policy {
                SameSitePolicy::None => SameSite::None,
                SameSitePolicy::Lax => SameSite::Lax,
                SameSitePolicy::Strict => SameSite::Strict,
            });
        }
        if let Some(domain) = &self.config.jwt_cookie_domain {
            builder = builder.domain(domain.clone());
        }
        builder.build()
    }

    async fn dispatch(
        &self,
        task: &str,
        job: &JobMetadata,
        user: &CurrentUser,
        mut args: Vec<Value>,
    ) -> AsyncQueryResult<()> {
        // The guest token travels to the worker only.
        let mut payload = job.clone();
        if let Some(token) = &user.guest_token {
            payload
                .extra
                .insert("guest_token".to_string(), token.clone());
        }
        args.insert(0, serde_json::to_value(&payload)?);

        let task_id = self.task_queue.send_task(task, args).await?;
        AsyncQueryMetrics::job_dispatched(task);
        debug!(
            task = %task,
            task_id = %task_id,
            job_id = ?job.job_id,
            "Dispatched async query job"
        );
        Ok(())
    }
}

fn check_secret(config: &AsyncQueriesConfig) -> AsyncQueryResult<()> {
    if config.jwt_secret.len() < ConfigValidator::MIN_JWT_SECRET_LENGTH {
        return Err(AsyncQueryError::Configuration(format!(
            "Please provide a JWT secret at least {} bytes long",
            ConfigValidator::MIN_JWT_SECRET_LENGTH
        )));
    }
    Ok(())
}

/// Decodes one stream entry; entries a worker wrote in an unexpected shape
/// are logged and skipped so the rest of the channel stays readable.
fn parse_event(entry: StreamEntry) -> Option<Event> {
    let data = entry.field(DATA_FIELD).unwrap_or_default();
    match serde_json::from_str::<JobMetadata>(data) {
        Ok(job) => Some(Event { id: entry.id, job }),
        Err(e) => {
            warn!(entry_id = %entry.id, error = %e, "Skipping undecodable stream entry");
            None
        }
    }
}

#[async_trait]
impl AsyncQueryManagerInterface for AsyncQueryManager {
    fn cookie_name(&self) -> &str {
        &self.config.jwt_cookie_name
    }

    fn register_request_handlers(&self) -> bool {
        self.config.register_request_handlers
    }

    fn channel_claims_from_request(&self, headers: &HeaderMap) -> AsyncQueryResult<ChannelClaims> {
        let jar = CookieJar::from_headers(headers);
        let token = jar
            .get(&self.config.jwt_cookie_name)
            .ok_or(AsyncQueryError::TokenMissing)?;
        self.codec.decode(token.value())
    }

    async fn submit_chart_data_job(
        &self,
        channel_id: &ChannelId,
        form_data: Value,
        user: &CurrentUser,
    ) -> AsyncQueryResult<JobMetadata> {
        let job = self.init_job(channel_id, user.user_id);
        self.dispatch(LOAD_CHART_DATA_TASK, &job, user, vec![form_data])
            .await?;
        Ok(job)
    }

    async fn submit_explore_json_job(
        &self,
        channel_id: &ChannelId,
        form_data: Value,
        response_type: &str,
        force: bool,
        user: &CurrentUser,
    ) -> AsyncQueryResult<JobMetadata> {
        let job = self.init_job(channel_id, user.user_id);
        let args = vec![form_data, Value::from(response_type), Value::Bool(force)];
        self.dispatch(LOAD_EXPLORE_JSON_TASK, &job, user, args).await?;
        Ok(job)
    }

    async fn read_events(
        &self,
        channel_id: &ChannelId,
        last_id: Option<&str>,
    ) -> AsyncQueryResult<Vec<Event>> {
        let stream = self.channel_stream(channel_id);
        let start = last_id.map_or_else(|| RANGE_START.to_string(), increment_id);

        let entries = self
            .backend
            .xrange(&stream, &start, RANGE_END, Some(MAX_EVENT_COUNT))
            .await?;
        let events: Vec<Event> = entries.into_iter().filter_map(parse_event).collect();

        AsyncQueryMetrics::events_read(events.len());
        debug!(stream = %stream, start = %start, count = events.len(), "Read channel events");
        Ok(events)
    }

    async fn update_job(
        &self,
        job: &JobMetadata,
        status: JobStatus,
        extras: Map<String, Value>,
    ) -> AsyncQueryResult<()> {
        let (channel_id, job_id) = job.require_ids()?;
        let updated = job.merged(status, extras)?;

        let mut fields = StreamFields::new();
        fields.insert(DATA_FIELD.to_string(), serde_json::to_string(&updated)?);

        let channel_stream = self.channel_stream(channel_id);
        let firehose = self.firehose_stream();
        self.backend
            .xadd(&channel_stream, &fields, AUTO_ID, Some(self.config.stream_limit))
            .await?;
        self.backend
            .xadd(&firehose, &fields, AUTO_ID, Some(self.config.stream_limit_firehose))
            .await?;

        AsyncQueryMetrics::event_appended(updated.status.as_str());
        debug!(
            channel_id = %channel_id,
            job_id = %job_id,
            status = %updated.status,
            "Published job update"
        );
        Ok(())
    }

    fn validate_session(
        &self,
        session: &Session,
        user_id: Option<i64>,
        has_cookie: bool,
    ) -> AsyncQueryResult<Option<Cookie<'static>>> {
        let current_user = user_id.map_or(Value::Null, Value::from);
        let is_current = has_cookie
            && session.channel_id().is_some_and(|c| !c.is_empty())
            && session.get(SESSION_USER_KEY).as_ref() == Some(&current_user);
        if is_current {
            return Ok(None);
        }

        let channel_id = ChannelId::new();
        session.insert(SESSION_CHANNEL_KEY, Value::String(channel_id.to_string()));
        session.insert(SESSION_USER_KEY, current_user);

        let token = self.codec.encode(&ChannelClaims::new(&channel_id, user_id))?;
        AsyncQueryMetrics::token_issued();
        debug!(channel_id = %channel_id, user_id = ?user_id, "Issued new async channel");

        Ok(Some(self.build_cookie(token)))
    }
}

impl std::fmt::Debug for AsyncQueryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncQueryManager")
            .field("backend", &self.backend.kind())
            .field("stream_prefix", &self.config.stream_prefix)
            .field("cookie_name", &self.config.jwt_cookie_name)
            .finish_non_exhaustive()
    }
}
