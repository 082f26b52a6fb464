//! HTTP API gateway for envhub.
//!
//! Exposes the environment surface over REST:
//!
//! - `POST   /environments`                      — create an environment
//! - `DELETE /environments/{id}`                 — remove it
//! - `POST   /environments/{id}/drop`            — clear files and context
//! - `POST   /environments/{id}/load-file`       — upload, replace on name clash
//! - `POST   /environments/{id}/update-file`     — upload, overwrite in place
//! - `DELETE /environments/{id}/remove-file`     — delete (outwardly idempotent)
//! - `GET    /environments/{id}/read-file`       — file content by name
//! - `GET    /environments/{id}/list-files`      — file records
//! - `POST   /environments/{id}/generate`        — templated generation
//! - `POST   /environments/{id}/send-prompt`     — free-form prompt
//! - `POST   /environments/{id}/commit-files`    — load files into context
//! - `GET    /environments/{id}/get-context`     — non-system transcript
//! - `DELETE /environments/{id}/clear-context`   — reset the conversation
//! - `GET    /health`
//!
//! Built on Axum. Uploads carry either a JSON body (`{filename, file}`,
//! written via the whole-content path) or a multipart stream (written via the
//! chunked path) — the handler picks the write path from the request shape.

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRequest, Multipart, Path, Query, Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
};
use envhub_core::error::{Error, StorageError};
use envhub_core::file::{FileContent, FileRecord};
use envhub_core::gateway::ModelGateway;
use envhub_core::message::Message;
use envhub_orchestrator::EnvironmentOrchestrator;
use envhub_conversation::ConversationStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Shared application state for the gateway.
pub struct AppState {
    pub orchestrator: Arc<EnvironmentOrchestrator>,
    pub gateway: Arc<dyn ModelGateway>,
}

pub type SharedState = Arc<AppState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/environments", post(create_environment_handler))
        .route("/environments/{id}", delete(remove_environment_handler))
        .route("/environments/{id}/drop", post(drop_handler))
        .route("/environments/{id}/load-file", post(load_file_handler))
        .route("/environments/{id}/update-file", post(update_file_handler))
        .route("/environments/{id}/remove-file", delete(remove_file_handler))
        .route("/environments/{id}/read-file", get(read_file_handler))
        .route("/environments/{id}/list-files", get(list_files_handler))
        .route("/environments/{id}/generate", post(generate_handler))
        .route("/environments/{id}/send-prompt", post(send_prompt_handler))
        .route("/environments/{id}/commit-files", post(commit_files_handler))
        .route("/environments/{id}/get-context", get(get_context_handler))
        .route("/environments/{id}/clear-context", delete(clear_context_handler))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10 MB upload limit
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
///
/// Builds the file store, conversation store, model gateway, and orchestrator
/// once from config and shares them via Arc.
pub async fn start(config: envhub_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let files = Arc::new(envhub_storage::LocalFileStore::new(&config.storage.root)?);
    let conversations = Arc::new(ConversationStore::new());
    let gateway: Arc<dyn ModelGateway> = Arc::new(envhub_providers::OpenAiGateway::new(
        "openai",
        &config.model.api_url,
        config.model.api_key.clone().unwrap_or_default(),
        &config.model.model,
    ));

    if !config.has_api_key() {
        tracing::warn!("No API key configured — model calls will fail against authenticated endpoints");
    }

    let orchestrator = Arc::new(EnvironmentOrchestrator::new(
        files,
        conversations,
        gateway.clone(),
        config.model.token_limit,
    ));

    let app = build_router(Arc::new(AppState { orchestrator, gateway }));

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ── Error mapping ─────────────────────────────────────────────────────────

/// Wrapper turning domain errors into HTTP responses with a JSON
/// `{"detail": ...}` body.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Storage(StorageError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }
        (status, Json(ErrorResponse { detail: self.0.to_string() })).into_response()
    }
}

#[derive(Serialize, Deserialize)]
struct ErrorResponse {
    detail: String,
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct CreateEnvironmentResponse {
    id: String,
}

#[derive(Deserialize)]
struct FilePayload {
    filename: String,
    file: String,
}

#[derive(Deserialize)]
struct FileNameBody {
    filename: String,
}

#[derive(Deserialize)]
struct FileNameQuery {
    filename: String,
}

#[derive(Serialize, Deserialize)]
struct ReadFileResponse {
    filename: String,
    file: String,
}

#[derive(Deserialize)]
struct GenerateRequest {
    #[serde(default)]
    prompt: Option<String>,
}

#[derive(Deserialize)]
struct PromptRequest {
    prompt: String,
}

#[derive(Serialize, Deserialize)]
struct PromptResponse {
    response: String,
}

#[derive(Serialize, Deserialize)]
struct HealthResponse {
    status: String,
    version: String,
    model_backend: String,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let model_backend = match state.gateway.health_check().await {
        Ok(true) => "ok",
        Ok(false) | Err(_) => "unreachable",
    };
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        model_backend: model_backend.into(),
    })
}

async fn create_environment_handler(
    State(state): State<SharedState>,
) -> Result<(StatusCode, Json<CreateEnvironmentResponse>), ApiError> {
    let id = uuid::Uuid::new_v4().to_string();
    state.orchestrator.create_environment(&id).await?;
    Ok((StatusCode::CREATED, Json(CreateEnvironmentResponse { id })))
}

async fn remove_environment_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.orchestrator.remove_environment(&id).await?;
    Ok(StatusCode::OK)
}

async fn drop_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.orchestrator.clear_environment(&id).await?;
    Ok(StatusCode::OK)
}

async fn load_file_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    req: Request,
) -> Result<StatusCode, ApiError> {
    let (filename, content) = extract_upload(req).await?;
    state.orchestrator.save_file(&id, content, &filename).await?;
    Ok(StatusCode::CREATED)
}

async fn update_file_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    req: Request,
) -> Result<StatusCode, ApiError> {
    let (filename, content) = extract_upload(req).await?;
    state.orchestrator.update_file(&id, content, &filename).await?;
    Ok(StatusCode::OK)
}

async fn remove_file_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(body): Json<FileNameBody>,
) -> Result<StatusCode, ApiError> {
    validate_filename(&body.filename)?;
    state.orchestrator.remove_file(&id, &body.filename).await?;
    Ok(StatusCode::OK)
}

async fn read_file_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<FileNameQuery>,
) -> Result<Json<ReadFileResponse>, ApiError> {
    validate_filename(&query.filename)?;
    let file = state.orchestrator.read_file(&id, &query.filename).await?;
    Ok(Json(ReadFileResponse {
        filename: query.filename,
        file,
    }))
}

async fn list_files_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<FileRecord>>, ApiError> {
    Ok(Json(state.orchestrator.list_files(&id).await?))
}

async fn generate_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<PromptResponse>, ApiError> {
    let prompt = body.prompt.unwrap_or_default();
    let response = state.orchestrator.generate(&id, &prompt).await?;
    Ok(Json(PromptResponse { response }))
}

async fn send_prompt_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(body): Json<PromptRequest>,
) -> Result<Json<PromptResponse>, ApiError> {
    if body.prompt.trim().is_empty() {
        return Err(Error::Validation("prompt must not be empty".into()).into());
    }
    let response = state.orchestrator.send_prompt(&id, &body.prompt).await?;
    Ok(Json(PromptResponse { response }))
}

async fn commit_files_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.orchestrator.commit_files(&id).await?;
    Ok(StatusCode::OK)
}

async fn get_context_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError> {
    Ok(Json(state.orchestrator.get_chat_context(&id).await?))
}

async fn clear_context_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.orchestrator.clear_chat_context(&id).await?;
    Ok(StatusCode::OK)
}

// ── Upload extraction ─────────────────────────────────────────────────────

/// Pull a `(filename, content)` pair out of an upload request.
///
/// Multipart bodies yield `FileContent::Chunks` with the field's chunks in
/// arrival order; JSON bodies yield `FileContent::Text`. The write path is
/// chosen here, at the boundary, by the shape of the input.
async fn extract_upload(req: Request) -> Result<(String, FileContent), ApiError> {
    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    if is_multipart {
        let mut multipart = Multipart::from_request(req, &())
            .await
            .map_err(|e| Error::Validation(format!("invalid multipart body: {e}")))?;

        while let Some(mut field) = multipart
            .next_field()
            .await
            .map_err(|e| Error::Validation(format!("invalid multipart body: {e}")))?
        {
            if field.name() != Some("file") {
                continue;
            }
            let filename = field.file_name().unwrap_or_default().to_string();
            validate_filename(&filename)?;

            let mut chunks = Vec::new();
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|e| Error::Validation(format!("upload interrupted: {e}")))?
            {
                chunks.push(chunk);
            }
            return Ok((filename, FileContent::Chunks(chunks)));
        }

        Err(Error::Validation("multipart body has no 'file' field".into()).into())
    } else {
        let Json(payload) = Json::<FilePayload>::from_request(req, &())
            .await
            .map_err(|e| Error::Validation(format!("invalid JSON body: {e}")))?;
        validate_filename(&payload.filename)?;
        Ok((payload.filename, FileContent::Text(payload.file)))
    }
}

/// Reject empty names and path traversal before anything reaches storage.
///
/// With separators rejected the name is a single path component, so only
/// the exact `.` / `..` components are traversal; `"notes..txt"` is fine.
fn validate_filename(filename: &str) -> Result<(), ApiError> {
    if filename.is_empty() {
        return Err(Error::Validation("filename must not be empty".into()).into());
    }
    if filename.contains('/') || filename.contains('\\') || filename == "." || filename == ".." {
        return Err(Error::Validation(format!("invalid filename: {filename}")).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use envhub_core::error::GatewayError;
    use envhub_core::gateway::{ChatReply, ModelGateway};
    use envhub_storage::MemoryFileStore;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    struct StubGateway;

    #[async_trait]
    impl ModelGateway for StubGateway {
        fn name(&self) -> &str {
            "stub"
        }

        async fn complete(&self, messages: &[Message]) -> Result<ChatReply, GatewayError> {
            // Echo the last user message so tests can assert on the outbound prompt
            let last_user = messages
                .iter()
                .rev()
                .find(|m| m.role == envhub_core::message::Role::User)
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Ok(ChatReply {
                content: format!("echo: {last_user}"),
                total_tokens: 7,
            })
        }
    }

    fn test_app() -> Router {
        let gateway: Arc<dyn ModelGateway> = Arc::new(StubGateway);
        let orchestrator = Arc::new(EnvironmentOrchestrator::new(
            Arc::new(MemoryFileStore::new()),
            Arc::new(ConversationStore::new()),
            gateway.clone(),
            10_000,
        ));
        build_router(Arc::new(AppState { orchestrator, gateway }))
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn create_env(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/environments")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created: CreateEnvironmentResponse = body_json(response).await;
        created.id
    }

    #[tokio::test]
    async fn health_endpoint_reports_model_backend() {
        let app = test_app();
        let response = app
            .oneshot(HttpRequest::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let health: HealthResponse = body_json(response).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.model_backend, "ok");
    }

    #[tokio::test]
    async fn json_upload_then_read_roundtrip() {
        let app = test_app();
        let id = create_env(&app).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/environments/{id}/load-file"),
                serde_json::json!({"filename": "a.txt", "file": "hello"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(
                HttpRequest::builder()
                    .uri(format!("/environments/{id}/read-file?filename=a.txt"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let read: ReadFileResponse = body_json(response).await;
        assert_eq!(read.file, "hello");
        assert_eq!(read.filename, "a.txt");
    }

    #[tokio::test]
    async fn multipart_upload_uses_chunked_path() {
        let app = test_app();
        let id = create_env(&app).await;

        let body = concat!(
            "--boundary\r\n",
            "Content-Disposition: form-data; name=\"file\"; filename=\"notes.txt\"\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "streamed content\r\n",
            "--boundary--\r\n",
        );
        let response = app
            .clone()
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri(format!("/environments/{id}/load-file"))
                    .header("Content-Type", "multipart/form-data; boundary=boundary")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(
                HttpRequest::builder()
                    .uri(format!("/environments/{id}/read-file?filename=notes.txt"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let read: ReadFileResponse = body_json(response).await;
        assert_eq!(read.file, "streamed content");
    }

    #[tokio::test]
    async fn read_missing_file_is_404() {
        let app = test_app();
        let id = create_env(&app).await;

        let response = app
            .clone()
            .oneshot(
                HttpRequest::builder()
                    .uri(format!("/environments/{id}/read-file?filename=ghost.txt"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let err: ErrorResponse = body_json(response).await;
        assert!(err.detail.contains("ghost.txt"));
    }

    #[tokio::test]
    async fn remove_missing_file_is_200() {
        let app = test_app();
        let id = create_env(&app).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "DELETE",
                &format!("/environments/{id}/remove-file"),
                serde_json::json!({"filename": "ghost.txt"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn traversal_filenames_are_rejected() {
        let app = test_app();
        let id = create_env(&app).await;

        for name in ["../escape.txt", "a/b.txt", "a\\b.txt", "..", "."] {
            let response = app
                .clone()
                .oneshot(json_request(
                    "POST",
                    &format!("/environments/{id}/load-file"),
                    serde_json::json!({"filename": name, "file": "x"}),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{name}");
        }
    }

    #[tokio::test]
    async fn inner_dots_in_filenames_are_accepted() {
        let app = test_app();
        let id = create_env(&app).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/environments/{id}/load-file"),
                serde_json::json!({"filename": "notes..txt", "file": "kept"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(
                HttpRequest::builder()
                    .uri(format!("/environments/{id}/read-file?filename=notes..txt"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let read: ReadFileResponse = body_json(response).await;
        assert_eq!(read.file, "kept");
    }

    #[tokio::test]
    async fn list_files_excludes_directories() {
        let app = test_app();
        let id = create_env(&app).await;

        for (name, content) in [("a.txt", "x"), ("sub", "dir-like")] {
            app.clone()
                .oneshot(json_request(
                    "POST",
                    &format!("/environments/{id}/update-file"),
                    serde_json::json!({"filename": name, "file": content}),
                ))
                .await
                .unwrap();
        }

        let response = app
            .clone()
            .oneshot(
                HttpRequest::builder()
                    .uri(format!("/environments/{id}/list-files"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let records: Vec<FileRecord> = body_json(response).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].filename, "a.txt");
    }

    #[tokio::test]
    async fn generate_and_context_flow() {
        let app = test_app();
        let id = create_env(&app).await;

        app.clone()
            .oneshot(json_request(
                "POST",
                &format!("/environments/{id}/load-file"),
                serde_json::json!({"filename": "notes.txt", "file": "draft"}),
            ))
            .await
            .unwrap();

        // Implicit commit + plain generate template
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/environments/{id}/generate"),
                serde_json::json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let generated: PromptResponse = body_json(response).await;
        assert_eq!(
            generated.response,
            format!("echo: {}", envhub_orchestrator::GENERATE_PROMPT)
        );

        // Context shows the exchange, no system messages
        let response = app
            .clone()
            .oneshot(
                HttpRequest::builder()
                    .uri(format!("/environments/{id}/get-context"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let context: Vec<Message> = body_json(response).await;
        assert_eq!(context.len(), 2);
        assert_eq!(context[0].content, envhub_orchestrator::GENERATE_PROMPT);

        // Clearing the context resets the transcript
        let response = app
            .clone()
            .oneshot(
                HttpRequest::builder()
                    .method("DELETE")
                    .uri(format!("/environments/{id}/clear-context"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(
                HttpRequest::builder()
                    .uri(format!("/environments/{id}/get-context"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let context: Vec<Message> = body_json(response).await;
        assert!(context.is_empty());
    }

    #[tokio::test]
    async fn empty_prompt_on_send_prompt_is_400() {
        let app = test_app();
        let id = create_env(&app).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/environments/{id}/send-prompt"),
                serde_json::json!({"prompt": "  "}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn send_prompt_dispatches_verbatim() {
        let app = test_app();
        let id = create_env(&app).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/environments/{id}/send-prompt"),
                serde_json::json!({"prompt": "what is in the files?"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let reply: PromptResponse = body_json(response).await;
        assert_eq!(reply.response, "echo: what is in the files?");
    }
}
