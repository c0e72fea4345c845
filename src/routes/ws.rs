//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. Every request gets one immediate reply; a command
//! that starts a generation gets a second `view` once the outcome is recorded.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tokio::sync::mpsc;
use tracing::{info, error, instrument, debug, warn};

use crate::logic::{close_session, dispatch_command, export_result};
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "worksheet_wizard", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "worksheet_wizard", "WebSocket connected");
  // Late replies from finished generations.
  let (tx, mut rx) = mpsc::unbounded_channel::<ServerWsMessage>();

  loop {
    let reply_msg = tokio::select! {
      incoming = socket.recv() => match incoming {
        Some(Ok(Message::Text(txt))) => match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "worksheet_wizard", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state, &tx).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        },
        Some(Ok(Message::Ping(payload))) => {
          let _ = socket.send(Message::Pong(payload)).await;
          continue;
        }
        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
        Some(Ok(_)) => continue,
      },
      Some(late) = rx.recv() => late,
    };

    let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
      serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
    });

    if let Err(e) = socket.send(Message::Text(out)).await {
      error!(target: "worksheet_wizard", error = %e, "WS send error");
      break;
    }
  }
  info!(target: "worksheet_wizard", "WebSocket disconnected");
}

#[instrument(level = "info", skip(state, late))]
async fn handle_client_ws(
  msg: ClientWsMessage,
  state: &Arc<AppState>,
  late: &mpsc::UnboundedSender<ServerWsMessage>,
) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::OpenSession => {
      let (session_id, view) = state.open_session().await;
      ServerWsMessage::View { session_id, view }
    }

    ClientWsMessage::Resume { session_id } => match state.view(&session_id).await {
      Some(view) => ServerWsMessage::View { session_id, view },
      None => ServerWsMessage::Error { message: format!("Unknown session: {}", session_id) },
    },

    ClientWsMessage::CloseSession { session_id } => match close_session(state, &session_id).await {
      Ok(()) => ServerWsMessage::Closed { session_id },
      Err(e) => ServerWsMessage::Error { message: e.to_string() },
    },

    ClientWsMessage::Command { session_id, command } => match dispatch_command(state, &session_id, command).await {
      Ok(dispatched) => {
        info!(target: "wizard", session = %session_id, step = dispatched.view.step, loading = dispatched.view.loading, "WS command applied");
        if let Some(generation) = dispatched.generation {
          let state = state.clone();
          let late = late.clone();
          let session_id = session_id.clone();
          tokio::spawn(async move {
            if let Err(e) = generation.await {
              error!(target: "generation", session = %session_id, error = %e, "Generation task lost");
            }
            let msg = match state.view(&session_id).await {
              Some(view) => ServerWsMessage::View { session_id, view },
              None => ServerWsMessage::Error { message: format!("Unknown session: {}", session_id) },
            };
            if late.send(msg).is_err() {
              warn!(target: "worksheet_wizard", "WS closed before generation finished");
            }
          });
        }
        ServerWsMessage::View { session_id, view: dispatched.view }
      }
      Err(e) => ServerWsMessage::Error { message: e.to_string() },
    },

    ClientWsMessage::Export { session_id, format } => match export_result(state, &session_id, format).await {
      Ok(()) => ServerWsMessage::Exported { format },
      Err(e) => ServerWsMessage::Error { message: e.to_string() },
    },
  }
}
