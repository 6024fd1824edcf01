//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::logic::*;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "wordmatch_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "wordmatch_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target = "wordmatch_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "wordmatch_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "wordmatch_backend", "WebSocket disconnected");
}

#[instrument(level = "info", skip(state))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::NewRound { prompt } => {
      let round = start_round(state, &prompt).await;
      tracing::info!(target: "game", round_id = %round.id, cards = round.cards.len(), "WS new_round served");
      ServerWsMessage::Round { round }
    }

    ClientWsMessage::SelectCard { round_id, card_id } => {
      match select_card(state, &round_id, card_id).await {
        Some((outcome, round)) => {
          tracing::info!(target: "game", %round_id, ?outcome, "WS select handled");
          ServerWsMessage::SelectResult { outcome, round }
        }
        None => unknown_round(&round_id),
      }
    }

    ClientWsMessage::GetRound { round_id } => match snapshot(state, &round_id).await {
      Some(round) => ServerWsMessage::Round { round },
      None => unknown_round(&round_id),
    },

    ClientWsMessage::ResetRound { round_id } => match reset_round(state, &round_id).await {
      Some(round) => {
        tracing::info!(target: "game", %round_id, "WS round reset");
        ServerWsMessage::ResetDone { round }
      }
      None => unknown_round(&round_id),
    },
  }
}

fn unknown_round(round_id: &str) -> ServerWsMessage {
  ServerWsMessage::Error { message: format!("Unknown roundId: {}", round_id) }
}
