//! Local web UI for the draft-and-confirm conversation.
//!
//! Messages typed in the page arrive on an mpsc channel; replies go out to
//! every open page as server-sent events.

use anyhow::{Result, anyhow};
use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::response::Html;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, error, info};

/// Events streamed to the page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiEvent {
    /// A reply from the conversation.
    Reply { message: String },
    /// Long-running work started (generation, submission).
    Busy { message: String },
    Failed { message: String },
    /// The interaction is over; the page stops accepting input.
    Closed { summary: String },
}

impl UiEvent {
    fn name(&self) -> &'static str {
        match self {
            UiEvent::Reply { .. } => "reply",
            UiEvent::Busy { .. } => "busy",
            UiEvent::Failed { .. } => "failed",
            UiEvent::Closed { .. } => "closed",
        }
    }

    fn payload(&self) -> serde_json::Value {
        match self {
            UiEvent::Reply { message }
            | UiEvent::Busy { message }
            | UiEvent::Failed { message } => json!({ "message": message }),
            UiEvent::Closed { summary } => json!({ "summary": summary }),
        }
    }

    fn to_sse_event(&self) -> Event {
        Event::default()
            .event(self.name())
            .data(self.payload().to_string())
    }
}

#[derive(Clone)]
pub struct AppState {
    pub input_tx: mpsc::Sender<String>,
    pub event_tx: broadcast::Sender<UiEvent>,
}

#[derive(Deserialize)]
struct MessagePayload {
    text: String,
}

pub struct UiHandle {
    pub port: u16,
    pub input_rx: mpsc::Receiver<String>,
    pub event_tx: broadcast::Sender<UiEvent>,
}

impl UiHandle {
    pub fn emit(&self, event: UiEvent) {
        // no open page is not an error
        let _ = self.event_tx.send(event);
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/message", post(message_handler))
        .route("/events", get(sse_handler))
        .route(
            "/favicon.ico",
            get(|| async { axum::http::StatusCode::NO_CONTENT }),
        )
        .with_state(state)
}

/// Serve the UI on the first free port in `first_port..first_port + 10`.
pub async fn start_server(first_port: u16) -> Result<UiHandle> {
    let (input_tx, input_rx) = mpsc::channel::<String>(8);
    let (event_tx, _) = broadcast::channel::<UiEvent>(64);
    let state = Arc::new(AppState {
        input_tx,
        event_tx: event_tx.clone(),
    });

    let mut bound = None;
    for port in first_port..first_port.saturating_add(10) {
        match tokio::net::TcpListener::bind(("127.0.0.1", port)).await {
            Ok(listener) => {
                bound = Some((listener, port));
                break;
            }
            Err(e) => debug!(port, error = %e, "port unavailable"),
        }
    }
    let (listener, port) = bound.ok_or_else(|| {
        anyhow!(
            "could not bind any port in {first_port}..{}",
            first_port.saturating_add(10)
        )
    })?;
    info!("web UI running at http://localhost:{port}");

    let app = router(state);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "web UI server stopped");
        }
    });

    Ok(UiHandle {
        port,
        input_rx,
        event_tx,
    })
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn message_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<MessagePayload>,
) -> &'static str {
    debug!(length = payload.text.len(), "message from web UI");
    if state.input_tx.send(payload.text).await.is_err() {
        return "closed";
    }
    "ok"
}

async fn sse_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.event_tx.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result: Result<UiEvent, _>| match result {
        Ok(event) => Some(Ok::<_, Infallible>(event.to_sse_event())),
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="id">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>AutoAbsen</title>
<style>
  * { margin: 0; padding: 0; box-sizing: border-box; }
  body {
    background: #0a0a0f;
    color: #e0e0e0;
    font-family: 'Segoe UI', system-ui, -apple-system, sans-serif;
    height: 100vh;
    display: flex;
    flex-direction: column;
  }
  header {
    padding: 24px 32px;
    border-bottom: 1px solid #1a1a2e;
    display: flex;
    align-items: center;
    gap: 12px;
  }
  header h1 { font-size: 20px; font-weight: 600; color: #fff; }
  header .dot { width: 8px; height: 8px; border-radius: 50%; background: #22c55e; }
  header .dot.busy { background: #f59e0b; }
  header .dot.closed { background: #555; }
  .main {
    flex: 1;
    display: flex;
    flex-direction: column;
    max-width: 800px;
    width: 100%;
    margin: 0 auto;
    padding: 24px 32px;
    gap: 16px;
    overflow: hidden;
  }
  #log { flex: 1; overflow-y: auto; display: flex; flex-direction: column; gap: 8px; }
  .entry {
    padding: 10px 14px;
    border-radius: 8px;
    font-size: 14px;
    line-height: 1.5;
    white-space: pre-wrap;
  }
  .entry.user { background: #1a1a2e; border-left: 3px solid #6366f1; }
  .entry.reply { background: #111118; border-left: 3px solid #3b82f6; }
  .entry.busy { background: #111118; border-left: 3px solid #f59e0b; color: #fcd34d; }
  .entry.failed { background: #1a0a0a; border-left: 3px solid #ef4444; color: #fca5a5; }
  .entry.closed { background: #0a1a0a; border-left: 3px solid #22c55e; color: #86efac; }
  .input-area { display: flex; gap: 8px; }
  #msg {
    flex: 1;
    background: #111118;
    border: 1px solid #222;
    border-radius: 8px;
    padding: 12px 16px;
    color: #fff;
    font-size: 16px;
    outline: none;
  }
  #msg:focus { border-color: #6366f1; }
  #msg:disabled { opacity: 0.5; }
  button {
    background: #6366f1;
    color: #fff;
    border: none;
    border-radius: 8px;
    padding: 12px 24px;
    font-size: 15px;
    font-weight: 600;
    cursor: pointer;
  }
  button:disabled { background: #333; cursor: not-allowed; }
</style>
</head>
<body>
  <header>
    <div class="dot" id="status-dot"></div>
    <h1>AutoAbsen - Laporan Harian</h1>
  </header>
  <div class="main">
    <div id="log"></div>
    <div class="input-area">
      <input type="text" id="msg" placeholder="Apa yang kamu kerjakan hari ini?" autofocus />
      <button id="send" onclick="send()">Send</button>
    </div>
  </div>
<script>
  const log = document.getElementById('log');
  const msg = document.getElementById('msg');
  const sendBtn = document.getElementById('send');
  const dot = document.getElementById('status-dot');
  let busy = false;
  let closed = false;

  function addEntry(cls, text) {
    const div = document.createElement('div');
    div.className = 'entry ' + cls;
    div.textContent = text;
    log.appendChild(div);
    log.scrollTop = log.scrollHeight;
  }

  function setBusy(b) {
    busy = b;
    msg.disabled = b || closed;
    sendBtn.disabled = b || closed;
    dot.className = closed ? 'dot closed' : (b ? 'dot busy' : 'dot');
    if (!b && !closed) msg.focus();
  }

  async function send() {
    const text = msg.value.trim();
    if (!text || busy || closed) return;
    msg.value = '';
    addEntry('user', text);
    setBusy(true);
    await fetch('/message', {
      method: 'POST',
      headers: {'Content-Type': 'application/json'},
      body: JSON.stringify({text}),
    });
  }

  msg.addEventListener('keydown', e => { if (e.key === 'Enter') send(); });

  const es = new EventSource('/events');
  es.addEventListener('reply', e => { addEntry('reply', JSON.parse(e.data).message); setBusy(false); });
  es.addEventListener('busy', e => { addEntry('busy', JSON.parse(e.data).message); setBusy(true); });
  es.addEventListener('failed', e => { addEntry('failed', JSON.parse(e.data).message); setBusy(false); });
  es.addEventListener('closed', e => {
    addEntry('closed', JSON.parse(e.data).summary);
    closed = true;
    setBusy(false);
    es.close();
  });

  addEntry('reply', 'Tulis aktivitas hari ini untuk membuat draft laporan.');
</script>
</body>
</html>
"##;
