//! HTTP + websocket surface.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/upload_pdf` | Multipart PDF upload; extends the index |
//! | `GET`  | `/ping` | Health check |
//! | `GET`  | `/ws` | Question channel (websocket) |
//!
//! # Error contract
//!
//! HTTP errors are JSON bodies of the form `{ "error": "<reason>" }` with
//! status 400 (client input) or 500 (processing). The websocket channel never
//! fails a request: every inbound question event produces exactly one
//! `{ "answer": "..." }` reply, with failures folded into the answer text.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser clients can
//! talk to the server directly.
//!
//! # Concurrency
//!
//! The index handle is shared by the upload handler (writer) and the question
//! handlers (readers). Uploads are serialized behind a single writer lock so
//! two concurrent uploads cannot race on extending and persisting the index;
//! readers are not blocked and may observe an upload mid-append.

use anyhow::Result;
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::embedding::{create_embedder, Embedder};
use crate::generate::create_generator;
use crate::ingest;
use crate::qa::QaEngine;
use crate::store::VectorIndex;

/// Largest accepted upload body. PDFs beyond this are rejected by axum
/// before the handler runs.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    index: VectorIndex,
    embedder: Arc<dyn Embedder>,
    engine: Arc<QaEngine>,
    /// Single-writer lock for index mutations (upload path).
    write_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// Assemble shared state from already-constructed parts. `run_server`
    /// calls this with the real providers; tests inject mocks.
    pub fn new(
        config: Arc<Config>,
        index: VectorIndex,
        embedder: Arc<dyn Embedder>,
        engine: Arc<QaEngine>,
    ) -> Self {
        Self {
            config,
            index,
            embedder,
            engine,
            write_lock: Arc::new(Mutex::new(())),
        }
    }
}

/// Start the server: build providers, load or build the index, bind.
///
/// Startup is all-or-nothing. Missing configuration, a missing API key, or a
/// corrupt persisted index aborts here; the process never comes up in a
/// partially-functional state.
pub async fn run_server(config: &Config) -> Result<()> {
    let embedder: Arc<dyn Embedder> = Arc::from(create_embedder(&config.embedding)?);
    let generator = Arc::from(create_generator(&config.generation)?);
    let index = ingest::build_or_load_index(config, embedder.as_ref()).await?;

    let engine = Arc::new(QaEngine::new(
        index.clone(),
        embedder.clone(),
        generator,
        config.retrieval.top_k,
    ));

    let state = AppState::new(Arc::new(config.clone()), index, embedder, engine);

    let bind_addr = config.server.bind.clone();
    let app = build_router(state);

    println!("pdfqa listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Assemble the route table. Separate from [`run_server`] so tests can drive
/// the handlers without binding a socket.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/upload_pdf", post(handle_upload))
        .route("/ping", get(handle_ping))
        .route("/ws", get(handle_ws))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

/// JSON error body: `{ "error": "<reason>" }`.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug)]
struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

/// 400: input validation failure, no side effects.
fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        message: message.into(),
    }
}

/// 500: processing failure. The PDF folder and index may be left
/// inconsistent (file saved, index not updated) — there is no rollback.
fn processing_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: message.into(),
    }
}

// ============ GET /ping ============

#[derive(Serialize)]
struct PingResponse {
    message: String,
}

async fn handle_ping() -> Json<PingResponse> {
    Json(PingResponse {
        message: "UP AND RUNNING.".to_string(),
    })
}

// ============ POST /upload_pdf ============

#[derive(Serialize)]
struct UploadResponse {
    message: String,
}

/// Reduce a client-supplied filename to its final path component and require
/// the lowercase `.pdf` suffix. The component reduction means an upload can
/// never name a path outside the PDF folder.
fn sanitize_pdf_name(file_name: &str) -> Result<String, AppError> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default();
    if !base.ends_with(".pdf") {
        return Err(bad_request("File doesn't have .pdf extension"));
    }
    Ok(base.to_string())
}

/// Accept a multipart `file` field, save it into the PDF folder (collisions
/// overwrite silently), and extend the index with its chunks.
async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| bad_request(format!("Failed to read file field: {}", e)))?;
            upload = Some((file_name, bytes.to_vec()));
            break;
        }
    }

    let (file_name, bytes) = upload.ok_or_else(|| bad_request("No file provided"))?;
    let file_name = sanitize_pdf_name(&file_name)?;

    // One upload mutates the index at a time.
    let _guard = state.write_lock.lock().await;

    std::fs::create_dir_all(&state.config.documents.path)
        .map_err(|e| processing_error(format!("Failed to create PDF folder: {}", e)))?;
    let dest = state.config.documents.path.join(&file_name);
    std::fs::write(&dest, &bytes)
        .map_err(|e| processing_error(format!("Failed to save {}: {}", file_name, e)))?;

    ingest::update_index_with_pdf(
        &state.index,
        state.embedder.as_ref(),
        &state.config,
        &file_name,
        &bytes,
    )
    .await
    .map_err(|e| processing_error(format!("Error updating index: {}", e)))?;

    Ok(Json(UploadResponse {
        message: format!("{} uploaded and index updated.", file_name),
    }))
}

// ============ GET /ws ============

/// Inbound question event.
#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

/// Outbound answer event (also used for the welcome message).
#[derive(Serialize)]
struct BotResponse {
    answer: String,
}

async fn handle_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Per-connection loop: send a welcome, then answer each question event with
/// exactly one bot response. The channel always receives some answer payload;
/// malformed frames get an `Error: ...` answer rather than a close.
async fn handle_socket(socket: WebSocket, state: AppState) {
    println!("Client connected");

    let (mut sender, mut receiver) = socket.split();

    let welcome = BotResponse {
        answer: "Welcome! Ask me a question about your PDFs.".to_string(),
    };
    if send_response(&mut sender, &welcome).await.is_err() {
        return;
    }

    while let Some(Ok(message)) = receiver.next().await {
        match message {
            Message::Text(text) => {
                let answer = match serde_json::from_str::<AskRequest>(text.as_str()) {
                    Ok(request) => {
                        println!("Received question: {}", request.question);
                        state.engine.ask(&request.question).await
                    }
                    Err(e) => format!("Error: invalid question payload: {}", e),
                };

                let response = BotResponse { answer };
                if send_response(&mut sender, &response).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    println!("Client disconnected");
}

async fn send_response(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    response: &BotResponse,
) -> Result<(), ()> {
    let payload = serde_json::to_string(response).unwrap_or_default();
    sender
        .send(Message::Text(payload.into()))
        .await
        .map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_pdf_names_pass_through() {
        assert_eq!(sanitize_pdf_name("report.pdf").unwrap(), "report.pdf");
        assert_eq!(sanitize_pdf_name("v2 final.pdf").unwrap(), "v2 final.pdf");
    }

    #[test]
    fn path_components_are_stripped_from_upload_names() {
        assert_eq!(sanitize_pdf_name("../../etc/evil.pdf").unwrap(), "evil.pdf");
        assert_eq!(sanitize_pdf_name("..\\..\\evil.pdf").unwrap(), "evil.pdf");
        assert_eq!(sanitize_pdf_name("/abs/path/doc.pdf").unwrap(), "doc.pdf");
    }

    #[test]
    fn non_pdf_suffixes_are_rejected() {
        assert!(sanitize_pdf_name("notes.txt").is_err());
        assert!(sanitize_pdf_name("REPORT.PDF").is_err());
        assert!(sanitize_pdf_name("archive.pdf/").is_err());
        assert!(sanitize_pdf_name("..").is_err());
        assert!(sanitize_pdf_name("").is_err());
    }
}
