//! HTTP boundary of the minic service.
//!
//! Every lex, parse and compile runs on tokio's blocking pool, behind a
//! semaphore that bounds how many of them execute at once. The pipeline itself is
//! synchronous and keeps no state between requests.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use minic_core::report::{LexicalAnalysis, SyntaxReport};
use minic_core::samples::default_samples_root;
use minic_core::{CompileOptions, ExecutionLimits, PipelineResult, Sample};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::sync::Semaphore;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Server configuration, read from the command line.
#[derive(Parser, Debug, Clone)]
#[command(name = "minic-server", version, about = "HTTP API for the minic compiler")]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,

    /// Directory of `*.mc` sample programs (defaults to the bundled samples)
    #[arg(long, value_name = "PATH")]
    pub samples: Option<PathBuf>,

    /// Programs allowed to run at the same time
    #[arg(long, default_value_t = 8)]
    pub max_concurrent: usize,

    #[arg(long, value_name = "N", default_value_t = ExecutionLimits::default().step_budget)]
    pub step_budget: u64,

    #[arg(
        long,
        value_name = "MS",
        default_value_t = ExecutionLimits::default().timeout.as_millis() as u64
    )]
    pub timeout_ms: u64,

    #[arg(long, value_name = "N", default_value_t = ExecutionLimits::default().max_call_depth)]
    pub max_call_depth: usize,

    #[arg(
        long,
        value_name = "BYTES",
        default_value_t = ExecutionLimits::default().max_output_bytes
    )]
    pub max_output_bytes: usize,

    /// Largest string a program may build
    #[arg(
        long,
        value_name = "BYTES",
        default_value_t = ExecutionLimits::default().max_value_bytes
    )]
    pub max_value_bytes: usize,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServerConfig {
    pub fn samples_root(&self) -> PathBuf {
        self.samples.clone().unwrap_or_else(default_samples_root)
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            limits: ExecutionLimits {
                step_budget: self.step_budget,
                timeout: Duration::from_millis(self.timeout_ms),
                max_call_depth: self.max_call_depth,
                max_output_bytes: self.max_output_bytes,
                max_value_bytes: self.max_value_bytes,
            },
            include_metrics: true,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    options: CompileOptions,
    samples: Arc<Vec<Sample>>,
    permits: Arc<Semaphore>,
}

impl AppState {
    pub fn new(options: CompileOptions, samples: Vec<Sample>, max_concurrent: usize) -> Self {
        AppState {
            options,
            samples: Arc::new(samples),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request body: {0}")]
    BadRequest(#[from] serde_json::Error),
    #[error("server is shutting down")]
    Unavailable,
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct CodeRequest {
    code: String,
}

/// The body is parsed by hand so that any malformed body, whatever the
/// content type, gets the same `400 {"error": ...}` answer.
fn parse_code(body: &[u8]) -> Result<String, ApiError> {
    let request: CodeRequest = serde_json::from_slice(body)?;
    Ok(request.code)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/compile", post(compile))
        .route("/analyze/lexical", post(analyze_lexical))
        .route("/analyze/syntax", post(analyze_syntax))
        .route("/examples", get(examples))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "message": "minic compiler API is running",
        "status": "ok",
        "endpoints": ["/compile", "/analyze/lexical", "/analyze/syntax", "/examples", "/health"],
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "message": "minic compiler API is up" }))
}

/// Run `job` on the blocking pool once a permit is free.
async fn run_bounded<T, F>(state: &AppState, job: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let _permit = state
        .permits
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| ApiError::Unavailable)?;
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))
}

async fn compile(State(state): State<AppState>, body: Bytes) -> Result<Json<PipelineResult>, ApiError> {
    let code = parse_code(&body)?;
    let options = state.options;
    let result = run_bounded(&state, move || minic_core::compile(&code, &options)).await?;
    tracing::info!(
        success = result.success,
        diagnostics = result.phases.diagnostics().count(),
        "compiled program"
    );
    Ok(Json(result))
}

async fn analyze_lexical(State(state): State<AppState>, body: Bytes) -> Result<Json<LexicalAnalysis>, ApiError> {
    let code = parse_code(&body)?;
    let analysis = run_bounded(&state, move || minic_core::analyze_lexical(&code)).await?;
    Ok(Json(analysis))
}

async fn analyze_syntax(State(state): State<AppState>, body: Bytes) -> Result<Json<SyntaxReport>, ApiError> {
    let code = parse_code(&body)?;
    let report = run_bounded(&state, move || minic_core::analyze_syntax(&code)).await?;
    Ok(Json(report))
}

#[derive(Serialize)]
struct ExamplesResponse<'a> {
    examples: &'a [Sample],
}

async fn examples(State(state): State<AppState>) -> Response {
    Json(ExamplesResponse {
        examples: &state.samples,
    })
    .into_response()
}
