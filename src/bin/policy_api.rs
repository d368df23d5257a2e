use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use policybot::{
    global_cache, logging, retrieve_similar, AnswerComposer, AssistantArgs, Index, RagError,
    RetrievalResult,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "policy-api",
    about = "HTTP API that answers policy questions from the indexed corpus"
)]
struct ApiCli {
    #[command(flatten)]
    assistant: AssistantArgs,

    /// Address to bind the HTTP server to (host:port).
    #[arg(long, env = "POLICYBOT_BIND", default_value = "127.0.0.1:8080")]
    bind: String,

    /// Maximum top-k allowed per request.
    #[arg(long, default_value_t = 12)]
    max_top_k: usize,

    /// Build the index before accepting requests instead of on first use.
    #[arg(long, default_value_t = false)]
    eager_index: bool,

    /// Debug-level logging (RUST_LOG takes precedence).
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[derive(Clone)]
struct AppState {
    composer: AnswerComposer,
    corpus: Arc<PathBuf>,
    max_top_k: usize,
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
struct RetrieveResponse {
    chunks: Vec<RetrievalResult>,
    meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
struct AnswerResponse {
    answer: String,
    sources: Vec<RetrievalResult>,
    meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
struct ResponseMeta {
    top_k: usize,
    indexed_chunks: usize,
    latency_ms: f64,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

/// The blocking OpenAI clients inside `AppState` own helper runtimes, so they
/// are built here and their last owner is dropped after the server runtime
/// has returned.
fn main() -> Result<()> {
    let cli = ApiCli::parse();
    logging::init(cli.verbose);

    let composer = cli
        .assistant
        .build_composer()
        .context("failed to configure OpenAI clients")?;
    let state = AppState {
        composer,
        corpus: Arc::new(cli.assistant.corpus.clone()),
        max_top_k: cli.max_top_k.max(1),
    };
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    let served = runtime.block_on(serve(&cli, state.clone()));
    drop(runtime);
    drop(state);
    served
}

async fn serve(cli: &ApiCli, state: AppState) -> Result<()> {
    if cli.eager_index {
        let index = load_index(&state)
            .await
            .map_err(|(_, body)| anyhow!(body.0.message))?;
        info!(chunks = index.len(), "index ready");
    }

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/retrieve", post(retrieve_handler))
        .route("/v1/answer", post(answer_handler))
        .with_state(state);

    let addr: SocketAddr = cli
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", cli.bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("policy-api listening on http://{addr}");
    axum::serve(listener, app)
        .await
        .context("server shutdown")?;
    Ok(())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn retrieve_handler(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<RetrieveResponse>, ApiError> {
    let top_k = validate(&state, &request)?;
    let start = Instant::now();
    let index = load_index(&state).await?;
    let composer = state.composer.clone();
    let query = request.query;
    let worker_index = Arc::clone(&index);
    let chunks = tokio::task::spawn_blocking(move || {
        retrieve_similar(composer.embedder(), &worker_index, &query, top_k)
    })
    .await
    .map_err(join_error)?
    .map_err(rag_error)?;
    Ok(Json(RetrieveResponse {
        chunks,
        meta: meta(top_k, &index, start),
    }))
}

async fn answer_handler(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let top_k = validate(&state, &request)?;
    let start = Instant::now();
    let index = load_index(&state).await?;
    let composer = state.composer.clone().with_top_k(top_k);
    let query = request.query;
    let worker_index = Arc::clone(&index);
    let answer = tokio::task::spawn_blocking(move || composer.answer(&worker_index, &query))
        .await
        .map_err(join_error)?
        .map_err(rag_error)?;
    Ok(Json(AnswerResponse {
        answer: answer.text,
        sources: answer.sources,
        meta: meta(top_k, &index, start),
    }))
}

fn validate(state: &AppState, request: &QueryRequest) -> Result<usize, ApiError> {
    if request.query.trim().is_empty() {
        return Err(error_body(
            StatusCode::BAD_REQUEST,
            "query text must not be empty",
        ));
    }
    Ok(request
        .top_k
        .unwrap_or_else(|| state.composer.top_k())
        .min(state.max_top_k))
}

async fn load_index(state: &AppState) -> Result<Arc<Index>, ApiError> {
    if let Some(index) = global_cache().get(state.corpus.as_path()) {
        return Ok(index);
    }
    let composer = state.composer.clone();
    let corpus = Arc::clone(&state.corpus);
    tokio::task::spawn_blocking(move || {
        global_cache().get_or_build(corpus.as_path(), composer.embedder())
    })
    .await
    .map_err(join_error)?
    .map_err(rag_error)
}

fn meta(top_k: usize, index: &Index, start: Instant) -> ResponseMeta {
    ResponseMeta {
        top_k,
        indexed_chunks: index.len(),
        latency_ms: start.elapsed().as_secs_f64() * 1000.0,
    }
}

fn rag_error(err: RagError) -> ApiError {
    let status = match &err {
        RagError::EmptyQuery => StatusCode::BAD_REQUEST,
        RagError::Upstream { .. }
        | RagError::MalformedResponse { .. }
        | RagError::DimensionMismatch { .. } => StatusCode::BAD_GATEWAY,
        RagError::CorpusRead { .. } | RagError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(%status, error = %err, "request failed");
    error_body(status, err.to_string())
}

fn join_error(err: tokio::task::JoinError) -> ApiError {
    error_body(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("worker task failed: {err}"),
    )
}

fn error_body(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            message: message.into(),
        }),
    )
}
