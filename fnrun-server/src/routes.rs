//! HTTP route handlers.
//!
//! Handlers translate JSON requests into store/engine calls and map
//! [`FunctionError`] variants onto status codes. Engine calls block on a child
//! process, so they run on the blocking thread pool.

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{delete, get, post};
use fnrun::FunctionError;
use fnrun::core::input::render_input;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, warn};

use crate::page;
use crate::state::AppState;

/// Build the application router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/functions", get(list_functions))
        .route("/create_function", post(create_function))
        .route("/run_function/{name}", post(run_function))
        .route("/delete_function/{name}", delete(delete_function))
}

async fn index() -> Html<&'static str> {
    Html(page::INDEX_HTML)
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Deserialize)]
struct CreateRequest {
    name: String,
    code: String,
}

#[derive(Deserialize)]
struct RunRequest {
    /// Absent means `{}`; an explicit `null` is passed through as `null`.
    #[serde(default = "empty_input")]
    input: Value,
}

impl Default for RunRequest {
    fn default() -> Self {
        Self {
            input: empty_input(),
        }
    }
}

fn empty_input() -> Value {
    json!({})
}

#[derive(Serialize)]
struct FunctionsResponse {
    functions: Vec<String>,
}

/// POST /create_function - register (or replace) a function.
async fn create_function(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let request: CreateRequest = parse_body(&body)?;
    blocking(move || {
        state
            .engine
            .store()
            .put(&request.name, request.code.as_bytes())
    })
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({"message": "Function created successfully"})),
    ))
}

/// POST /run_function/{name} - invoke a function with `{"input": ...}`.
async fn run_function(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: RunRequest = if body.is_empty() {
        RunRequest::default()
    } else {
        parse_body(&body)?
    };
    let input = render_input(Some(&request.input));
    let result = blocking(move || state.engine.invoke(&name, input.as_bytes())).await?;
    Ok(Json(json!({"result": result.stdout_text()})))
}

/// DELETE /delete_function/{name}
async fn delete_function(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    blocking(move || state.engine.store().remove(&name)).await?;
    Ok(Json(json!({"message": "Function deleted successfully"})))
}

/// GET /functions - registered names, sorted.
async fn list_functions(State(state): State<AppState>) -> Result<Json<FunctionsResponse>, ApiError> {
    let names = blocking(move || state.engine.store().list()).await?;
    Ok(Json(FunctionsResponse {
        functions: names.into_iter().map(|name| name.to_string()).collect(),
    }))
}

async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, FunctionError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(ApiError::Function),
        Err(err) => {
            error!(err = %err, "blocking task failed");
            Err(ApiError::Internal)
        }
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|err| ApiError::BadRequest(err.to_string()))
}

/// Error response with a JSON `{"error": ...}` body.
#[derive(Debug)]
pub enum ApiError {
    Function(FunctionError),
    BadRequest(String),
    Internal,
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Function(err) => match err {
                FunctionError::InvalidName { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
                FunctionError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, "Function not found".to_string())
                }
                FunctionError::ExecutionFailed { stderr, .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, stderr.clone())
                }
                FunctionError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, err.to_string()),
                FunctionError::Io { .. } => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal storage error".to_string(),
                ),
            },
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Function(err @ FunctionError::Io { .. }) = &self {
            error!(err = %err, source = ?std::error::Error::source(err), "storage failure");
        } else {
            warn!(error = ?self, "request failed");
        }
        let (status, message) = self.status_and_message();
        (status, Json(json!({"error": message, "kind": self.kind()}))).into_response()
    }
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::Function(err) => err.kind(),
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Internal => "internal",
        }
    }
}
