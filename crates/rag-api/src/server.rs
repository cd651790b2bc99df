//! Axum server and routes.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rag_pipeline::{Comparator, GraphRag, VectorRag};
use rag_types::{
    CompareRequest, ErrorResponse, GenerateRequest, GenerateResponse, PipelineError,
    RagQueryRequest, TextGenerator,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub struct AppState {
    pub generator: Arc<dyn TextGenerator>,
    pub rag: Arc<VectorRag>,
    pub graph_rag: Arc<GraphRag>,
    pub comparator: Comparator,
}

impl AppState {
    /// State whose `/compare` runs `rag` against `graph_rag`.
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        rag: Arc<VectorRag>,
        graph_rag: Arc<GraphRag>,
    ) -> Self {
        let comparator = Comparator::new(rag.clone(), graph_rag.clone());
        Self {
            generator,
            rag,
            graph_rag,
            comparator,
        }
    }

    pub fn with_comparator(mut self, comparator: Comparator) -> Self {
        self.comparator = comparator;
        self
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/generate", post(handle_generate))
        .route("/compare", post(handle_compare))
        .route("/rag/query", post(handle_rag_query))
        .route("/graphrag/query", post(handle_graph_rag_query))
        .route("/health", get(handle_health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

fn pipeline_error(e: PipelineError) -> Response {
    let status = match e {
        PipelineError::BadRequest(_) => StatusCode::BAD_REQUEST,
        PipelineError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %e, "request failed");
    }
    let message = match e {
        PipelineError::BadRequest(msg) => msg,
        other => other.to_string(),
    };
    error(status, message)
}

async fn handle_generate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(req) => req,
        Err(rejection) => return error(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    let Some(prompt) = req.prompt() else {
        return error(StatusCode::BAD_REQUEST, "Prompt is required");
    };
    let params = match req.params() {
        Ok(p) => p,
        Err(e) => return error(StatusCode::BAD_REQUEST, e.to_string()),
    };
    let started = std::time::Instant::now();
    match state.generator.generate(prompt, &params).await {
        Ok(text) => {
            tracing::info!(
                prompt_chars = prompt.chars().count(),
                max_new_tokens = params.max_new_tokens,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "generated"
            );
            Json(GenerateResponse {
                response: text.trim().to_string(),
            })
            .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "generation failed");
            error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn handle_compare(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CompareRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(req) => req,
        Err(rejection) => return error(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    match state.comparator.compare(&req.query).await {
        Ok(res) => Json(res).into_response(),
        Err(e) => pipeline_error(e),
    }
}

fn valid_query(req: &RagQueryRequest) -> Result<&str, Response> {
    let query = req.query.trim();
    if query.is_empty() {
        Err(error(StatusCode::BAD_REQUEST, "Query is required"))
    } else {
        Ok(query)
    }
}

async fn handle_rag_query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RagQueryRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(req) => req,
        Err(rejection) => return error(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    let query = match valid_query(&req) {
        Ok(q) => q,
        Err(res) => return res,
    };
    match state.rag.answer_with_top_k(query, req.top_k.max(1)).await {
        Ok(answer) => Json(answer).into_response(),
        Err(e) => pipeline_error(e),
    }
}

async fn handle_graph_rag_query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RagQueryRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(req) => req,
        Err(rejection) => return error(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    let query = match valid_query(&req) {
        Ok(q) => q,
        Err(res) => return res,
    };
    match state.graph_rag.answer(query).await {
        Ok(answer) => Json(answer).into_response(),
        Err(e) => pipeline_error(e),
    }
}

async fn handle_health() -> &'static str {
    "ok"
}
