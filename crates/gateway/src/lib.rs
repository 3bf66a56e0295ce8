//! HTTP API gateway for Papertrail.
//!
//! Exposes paper discovery and the synthesis pipeline as JSON endpoints:
//!
//! - `GET  /health`
//! - `POST /search_papers`
//! - `POST /ask_question`
//! - `POST /generate_review`
//! - `POST /future_work`
//!
//! Store and discovery failures map to `502`. A failed generation is not an
//! HTTP error: it returns `200` with empty text and `status: "generation_failed"`.
//!
//! Built on Axum.

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::{self, Next},
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info, warn};

use papertrail_config::AppConfig;
use papertrail_core::PaperRecord;
use papertrail_core::error::DiscoveryError;
use papertrail_core::provider::Provider;
use papertrail_core::store::PaperStore;
use papertrail_discovery::{ArxivSource, SearchService};
use papertrail_synthesis::{
    GenerationInvoker, GenerationSettings, PipelineError, SynthesisPipeline, SynthesisResult,
    SynthesisStatus,
};

/// Origin of the companion web frontend allowed by CORS.
const FRONTEND_ORIGIN: &str = "http://localhost:8501";

/// Shared application state: one pipeline and one search service per process.
pub struct AppState {
    pub pipeline: SynthesisPipeline,
    pub search: SearchService,
    /// Wait for discovered papers to be stored before answering a search.
    pub await_persist: bool,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Wire a state from already-built collaborators.
    pub fn from_parts(
        config: &AppConfig,
        store: Arc<dyn PaperStore>,
        provider: Arc<dyn Provider>,
        source: Arc<dyn papertrail_core::DiscoverySource>,
    ) -> Self {
        let invoker = GenerationInvoker::new(provider, GenerationSettings::from_config(config));
        Self {
            pipeline: SynthesisPipeline::new(store.clone(), invoker, config.synthesis.clone()),
            search: SearchService::new(source, store, config.discovery.max_results),
            await_persist: config.discovery.await_persist,
        }
    }

    /// Build the store, default provider and arXiv source from `config`.
    pub async fn from_config(config: &AppConfig) -> papertrail_core::Result<Self> {
        let store = papertrail_store::open_from_config(&config.store).await?;

        let router = papertrail_providers::build_from_config(config);
        let provider = router.default().ok_or_else(|| papertrail_core::Error::Config {
            message: format!(
                "no provider registered as '{}'; check default_provider in config.toml",
                router.default_name()
            ),
        })?;

        let source = Arc::new(ArxivSource::from_config(&config.discovery));
        Ok(Self::from_parts(config, store, provider, source))
    }
}

/// Build the router with all routes and layers.
///
/// Layers applied:
/// - CORS limited to the frontend origin
/// - Request body size limit (1 MB)
/// - In-memory rate limiting (`rate_limit_per_minute` per client)
/// - HTTP trace logging
pub fn build_router(state: SharedState, rate_limit_per_minute: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::exact(HeaderValue::from_static(FRONTEND_ORIGIN)))
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    let rate_limiter = Arc::new(RateLimiter::new(rate_limit_per_minute, Duration::from_secs(60)));

    Router::new()
        .route("/health", get(health_handler))
        .route("/search_papers", post(search_papers_handler))
        .route("/ask_question", post(ask_question_handler))
        .route("/generate_review", post(generate_review_handler))
        .route("/future_work", post(future_work_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(middleware::from_fn(move |req, next| {
            let limiter = rate_limiter.clone();
            rate_limit_middleware(limiter, req, next)
        }))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let state = Arc::new(AppState::from_config(&config).await?);
    let app = build_router(state, config.gateway.rate_limit_per_minute);

    info!(addr = %addr, model = %config.active_model(), "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Rate Limiter ---

/// Simple in-memory sliding-window rate limiter keyed by client.
///
/// Thread-safe via `std::sync::Mutex` (non-async, held briefly).
struct RateLimiter {
    max_requests: usize,
    window: Duration,
    clients: std::sync::Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if the client is within its limit.
    fn check(&self, client_key: &str) -> bool {
        let now = Instant::now();
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());

        if clients.len() > 10_000 {
            clients.retain(|_, timestamps| {
                timestamps
                    .last()
                    .is_some_and(|t| now.duration_since(*t) < self.window)
            });
        }

        let timestamps = clients.entry(client_key.to_string()).or_default();
        timestamps.retain(|t| now.duration_since(*t) < self.window);

        if timestamps.len() >= self.max_requests {
            return false;
        }

        timestamps.push(now);
        true
    }
}

/// Client key: first `X-Forwarded-For` hop, else "anonymous". `/health` is
/// exempt. Returns 429 when the limit is exceeded.
async fn rate_limit_middleware(
    limiter: Arc<RateLimiter>,
    req: axum::extract::Request,
    next: Next,
) -> Result<axum::response::Response, StatusCode> {
    if req.uri().path() == "/health" {
        return Ok(next.run(req).await);
    }

    let client_key = req
        .headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "anonymous".to_string());

    if !limiter.check(&client_key) {
        warn!(client = %client_key.chars().take(40).collect::<String>(), "Rate limit exceeded");
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    Ok(next.run(req).await)
}

// ── Request / response types ──────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

impl From<PipelineError> for ErrorResponse {
    fn from(e: PipelineError) -> Self {
        Self { error: e.to_string() }
    }
}

fn pipeline_error(e: PipelineError) -> ApiError {
    error!(error = %e, "Pipeline failed");
    (StatusCode::BAD_GATEWAY, Json(e.into()))
}

fn discovery_error(e: DiscoveryError) -> ApiError {
    error!(error = %e, "Discovery failed");
    api_error(StatusCode::BAD_GATEWAY, e.to_string())
}

fn require_non_blank(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, format!("'{field}' must not be empty")));
    }
    Ok(())
}

#[derive(Deserialize)]
pub struct SearchRequest {
    pub topic: String,
    #[serde(default)]
    pub start_year: Option<i32>,
    #[serde(default)]
    pub end_year: Option<i32>,
}

#[derive(Serialize, Deserialize)]
pub struct SearchResponse {
    pub papers: Vec<PaperRecord>,
}

#[derive(Deserialize)]
pub struct QuestionRequest {
    pub text: String,
    #[serde(default)]
    pub papers: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: String,
    pub status: SynthesisStatus,
    pub papers_used: usize,
}

#[derive(Deserialize)]
pub struct TopicRequest {
    pub topic: String,
}

#[derive(Serialize, Deserialize)]
pub struct ReviewResponse {
    pub review: String,
    pub status: SynthesisStatus,
    pub papers_used: usize,
}

#[derive(Serialize, Deserialize)]
pub struct FutureWorkResponse {
    pub future_work: String,
    pub status: SynthesisStatus,
    pub papers_used: usize,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

async fn search_papers_handler(
    State(state): State<SharedState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    require_non_blank("topic", &req.topic)?;

    let (default_start, default_end) = state.pipeline.review_window();
    let start_year = req.start_year.unwrap_or(default_start);
    let end_year = req.end_year.unwrap_or(default_end);
    if start_year > end_year {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("start_year {start_year} is after end_year {end_year}"),
        ));
    }

    info!(topic = %req.topic, start_year, end_year, "search_papers request");

    let discovery = state
        .search
        .search(&req.topic, start_year, end_year)
        .await
        .map_err(discovery_error)?;

    if state.await_persist {
        let report = discovery.persist.wait().await;
        if report.failed > 0 {
            warn!(failed = report.failed, "Some discovered papers were not stored");
        }
    }

    Ok(Json(SearchResponse {
        papers: discovery.papers,
    }))
}

async fn ask_question_handler(
    State(state): State<SharedState>,
    Json(req): Json<QuestionRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    require_non_blank("text", &req.text)?;
    info!(papers = req.papers.len(), "ask_question request");

    let result = state
        .pipeline
        .answer_question(&req.text, &req.papers)
        .await
        .map_err(pipeline_error)?;

    let SynthesisResult {
        text,
        status,
        papers_used,
    } = result;
    Ok(Json(AnswerResponse {
        answer: text,
        status,
        papers_used,
    }))
}

async fn generate_review_handler(
    State(state): State<SharedState>,
    Json(req): Json<TopicRequest>,
) -> Result<Json<ReviewResponse>, ApiError> {
    require_non_blank("topic", &req.topic)?;
    info!(topic = %req.topic, "generate_review request");

    let result = state
        .pipeline
        .generate_review(&req.topic)
        .await
        .map_err(pipeline_error)?;

    Ok(Json(ReviewResponse {
        review: result.text,
        status: result.status,
        papers_used: result.papers_used,
    }))
}

async fn future_work_handler(
    State(state): State<SharedState>,
    Json(req): Json<TopicRequest>,
) -> Result<Json<FutureWorkResponse>, ApiError> {
    require_non_blank("topic", &req.topic)?;
    info!(topic = %req.topic, "future_work request");

    let result = state
        .pipeline
        .suggest_future_work(&req.topic)
        .await
        .map_err(pipeline_error)?;

    Ok(Json(FutureWorkResponse {
        future_work: result.text,
        status: result.status,
        papers_used: result.papers_used,
    }))
}
