//! HTTP chat surface.
//!
//! Serves the chat UI and a JSON API over the ask/critique pipeline and the
//! knowledge sheet.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Embedded single-page chat UI |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/chat` | Ask a question; returns answer + selection info |
//! | `POST` | `/chat/critique` | Critique the session's last answer |
//! | `GET`  | `/chat/{session_id}/history` | Conversation so far for a session |
//! | `GET`  | `/records` | Read-only table view of stored records |
//! | `POST` | `/records` | Append a pasted JSON payload (object or array) |
//! | `POST` | `/refresh` | Invalidate the memoized sheet snapshot |
//!
//! # Error Contract
//!
//! All error responses use one JSON shape:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//! Spreadsheet and model failures are caught at the call site and surfaced
//! in this body; nothing is retried beyond the clients' own backoff.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the page can be
//! embedded or proxied freely.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::cache::SheetCache;
use crate::chat::{self, ChatMessage, Session};
use crate::config::Config;
use crate::genai::GeminiClient;
use crate::ingest;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    cache: Arc<SheetCache>,
    sessions: Arc<Mutex<HashMap<String, Session>>>,
}

/// Starts the chat server. Binds to `[server].bind` and runs until the
/// process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();

    let state = AppState {
        cache: Arc::new(SheetCache::new(config.retrieval.cache_ttl_secs)),
        config: Arc::new(config.clone()),
        sessions: Arc::new(Mutex::new(HashMap::new())),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(handle_index))
        .route("/health", get(handle_health))
        .route("/chat", post(handle_chat))
        .route("/chat/critique", post(handle_critique))
        .route("/chat/{session_id}/history", get(handle_history))
        .route("/records", get(handle_records).post(handle_append))
        .route("/refresh", post(handle_refresh))
        .layer(cors)
        .with_state(state);

    println!("Chat server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Map pipeline errors onto the most appropriate status code. Validation
/// and paste errors read as client mistakes; anything else (auth, network,
/// upstream API) is a 500 with the message surfaced verbatim.
fn classify_error(err: anyhow::Error) -> AppError {
    let msg = err.to_string();

    if msg.contains("must not be empty")
        || msg.contains("not valid JSON")
        || msg.contains("must be a JSON")
        || msg.contains("not a JSON object")
        || msg.contains("contains no records")
        || msg.contains("no answer to critique")
        || msg.contains("has no records yet")
    {
        bad_request(msg)
    } else if msg.contains("not found") {
        not_found(msg)
    } else {
        internal(msg)
    }
}

// ============ GET / ============

async fn handle_index() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /chat ============

#[derive(Deserialize)]
struct ChatRequest {
    /// Omit to start a new session; the response carries the id to reuse.
    session_id: Option<String>,
    question: String,
}

#[derive(Serialize)]
struct ChatResponse {
    session_id: String,
    answer: String,
    /// The banner line describing how the grounding was selected.
    info: String,
    matched: usize,
    fallback: bool,
}

async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let client = GeminiClient::new(&state.config.model).map_err(classify_error)?;

    let outcome = chat::ask(&state.config, &state.cache, &client, &req.question)
        .await
        .map_err(classify_error)?;

    let session_id = req
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let info = chat::banner(
        outcome.matched,
        outcome.fallback,
        state.config.retrieval.fallback_recent,
    );

    let mut sessions = state.sessions.lock().await;
    let session = sessions.entry(session_id.clone()).or_default();
    session.record_turn(req.question.trim(), &outcome);

    Ok(Json(ChatResponse {
        session_id,
        answer: outcome.answer,
        info,
        matched: outcome.matched,
        fallback: outcome.fallback,
    }))
}

// ============ POST /chat/critique ============

#[derive(Deserialize)]
struct CritiqueRequest {
    session_id: String,
}

#[derive(Serialize)]
struct CritiqueResponse {
    session_id: String,
    critique: String,
}

async fn handle_critique(
    State(state): State<AppState>,
    Json(req): Json<CritiqueRequest>,
) -> Result<Json<CritiqueResponse>, AppError> {
    let client = GeminiClient::new(&state.config.model).map_err(classify_error)?;

    // Copy what the critique needs out of the lock; the model call is slow.
    let session_view = {
        let sessions = state.sessions.lock().await;
        let session = sessions
            .get(&req.session_id)
            .ok_or_else(|| not_found(format!("session not found: {}", req.session_id)))?;
        Session {
            messages: Vec::new(),
            last_question: session.last_question.clone(),
            last_answer: session.last_answer.clone(),
            last_context: session.last_context.clone(),
        }
    };

    let critique = chat::critique(&client, &session_view)
        .await
        .map_err(classify_error)?;

    let mut sessions = state.sessions.lock().await;
    if let Some(session) = sessions.get_mut(&req.session_id) {
        session.messages.push(ChatMessage {
            role: "assistant".to_string(),
            content: critique.clone(),
        });
    }

    Ok(Json(CritiqueResponse {
        session_id: req.session_id,
        critique,
    }))
}

// ============ GET /chat/{session_id}/history ============

#[derive(Serialize)]
struct HistoryResponse {
    session_id: String,
    messages: Vec<ChatMessage>,
}

async fn handle_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<HistoryResponse>, AppError> {
    let sessions = state.sessions.lock().await;
    let session = sessions
        .get(&session_id)
        .ok_or_else(|| not_found(format!("session not found: {}", session_id)))?;

    Ok(Json(HistoryResponse {
        session_id: session_id.clone(),
        messages: session.messages.clone(),
    }))
}

// ============ GET /records ============

#[derive(Serialize)]
struct RecordsResponse {
    count: usize,
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

async fn handle_records(
    State(state): State<AppState>,
) -> Result<Json<RecordsResponse>, AppError> {
    let snapshot = state
        .cache
        .get_or_load(&state.config)
        .await
        .map_err(classify_error)?;

    Ok(Json(RecordsResponse {
        count: snapshot.rows.len(),
        header: snapshot.header,
        rows: snapshot.rows,
    }))
}

// ============ POST /records ============

#[derive(Serialize)]
struct AppendResponse {
    appended: usize,
}

/// The body is the raw paste, not a typed request, so malformed JSON is
/// reported through the same error contract as every other failure.
async fn handle_append(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<AppendResponse>, AppError> {
    let appended = ingest::append_paste(&state.config, &state.cache, &body)
        .await
        .map_err(classify_error)?;

    Ok(Json(AppendResponse { appended }))
}

// ============ POST /refresh ============

#[derive(Serialize)]
struct RefreshResponse {
    status: String,
}

async fn handle_refresh(State(state): State<AppState>) -> Json<RefreshResponse> {
    state.cache.invalidate().await;
    Json(RefreshResponse {
        status: "refreshed".to_string(),
    })
}

// ============ Embedded chat page ============

const CHAT_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Finsight — finance insight assistant</title>
<style>
  body { font-family: system-ui, sans-serif; max-width: 860px; margin: 2rem auto; padding: 0 1rem; }
  h1 { font-size: 1.4rem; }
  #log { border: 1px solid #ccc; border-radius: 6px; padding: 1rem; min-height: 240px; }
  .msg { margin: 0.5rem 0; white-space: pre-wrap; }
  .user { font-weight: 600; }
  .info { color: #666; font-size: 0.85rem; }
  .error { color: #b00; }
  form { display: flex; gap: 0.5rem; margin-top: 1rem; }
  input[type=text] { flex: 1; padding: 0.5rem; }
  textarea { width: 100%; min-height: 90px; margin-top: 0.5rem; }
  table { border-collapse: collapse; margin-top: 1rem; font-size: 0.85rem; }
  th, td { border: 1px solid #ddd; padding: 0.25rem 0.5rem; text-align: left; }
  section { margin-top: 2rem; }
  button { padding: 0.5rem 0.8rem; }
</style>
</head>
<body>
<h1>Finsight — ask about your collected analyses</h1>

<div id="log"></div>
<form id="ask">
  <input type="text" id="question" placeholder="Ask a question... (e.g. what's the won-dollar outlook?)">
  <button type="submit">Ask</button>
  <button type="button" id="critique">Critique last answer</button>
</form>

<section>
  <h2>Add analyses</h2>
  <p class="info">Paste a JSON object or an array of objects to append to the sheet.</p>
  <textarea id="paste"></textarea>
  <button id="append">Append</button>
</section>

<section>
  <h2>Stored records <button id="refresh">Refresh</button></h2>
  <div id="table"></div>
</section>

<script>
let sessionId = null;
const log = document.getElementById('log');

function addMsg(cls, text) {
  const div = document.createElement('div');
  div.className = 'msg ' + cls;
  div.textContent = text;
  log.appendChild(div);
  log.scrollTop = log.scrollHeight;
}

async function call(path, body) {
  const res = await fetch(path, {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: body,
  });
  const data = await res.json();
  if (!res.ok) throw new Error(data.error ? data.error.message : res.statusText);
  return data;
}

document.getElementById('ask').addEventListener('submit', async (e) => {
  e.preventDefault();
  const input = document.getElementById('question');
  const question = input.value.trim();
  if (!question) return;
  input.value = '';
  addMsg('user', question);
  try {
    const data = await call('/chat', JSON.stringify({ session_id: sessionId, question }));
    sessionId = data.session_id;
    addMsg('info', data.info);
    addMsg('assistant', data.answer);
  } catch (err) {
    addMsg('error', err.message);
  }
});

document.getElementById('critique').addEventListener('click', async () => {
  if (!sessionId) { addMsg('error', 'Ask a question first.'); return; }
  try {
    const data = await call('/chat/critique', JSON.stringify({ session_id: sessionId }));
    addMsg('info', 'Critique of the last answer:');
    addMsg('assistant', data.critique);
  } catch (err) {
    addMsg('error', err.message);
  }
});

document.getElementById('append').addEventListener('click', async () => {
  const paste = document.getElementById('paste');
  try {
    const data = await call('/records', paste.value);
    paste.value = '';
    addMsg('info', 'Appended ' + data.appended + ' record(s).');
    loadRecords();
  } catch (err) {
    addMsg('error', err.message);
  }
});

document.getElementById('refresh').addEventListener('click', async () => {
  await fetch('/refresh', { method: 'POST' });
  loadRecords();
});

async function loadRecords() {
  const res = await fetch('/records');
  const target = document.getElementById('table');
  if (!res.ok) {
    const data = await res.json();
    target.textContent = data.error ? data.error.message : res.statusText;
    return;
  }
  const data = await res.json();
  const table = document.createElement('table');
  const head = table.insertRow();
  for (const col of ['#', ...data.header]) {
    const th = document.createElement('th');
    th.textContent = col;
    head.appendChild(th);
  }
  data.rows.forEach((row, i) => {
    const tr = table.insertRow();
    tr.insertCell().textContent = i + 1;
    data.header.forEach((_, j) => tr.insertCell().textContent = row[j] || '');
  });
  target.replaceChildren(table);
}

loadRecords();
</script>
</body>
</html>
"#;
