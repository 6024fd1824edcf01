//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
  Json,
};
use tracing::{error, info, instrument};

use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

/// Provider trigger, faithful to the original route: returns the recovered
/// pair array as-is, or a 500 error object. Fallback substitution happens
/// at round creation, not here.
#[instrument(level = "info", skip(state, body), fields(prompt_len = body.prompt.len()))]
pub async fn http_post_pairs(
  State(state): State<Arc<AppState>>,
  Json(body): Json<PairsIn>,
) -> impl IntoResponse {
  let Some(oa) = &state.openai else {
    error!(target: "wordmatch_backend", "Pairs requested but OPENAI_API_KEY not set");
    return (
      StatusCode::INTERNAL_SERVER_ERROR,
      Json(serde_json::json!(ApiError { error: "OpenAI is not configured".into() })),
    );
  };

  match oa.generate_word_pairs(&state.prompts, &body.prompt).await {
    Ok(pairs) => {
      info!(target: "wordmatch_backend", count = pairs.len(), "HTTP pairs served");
      (StatusCode::OK, Json(serde_json::json!(pairs)))
    }
    Err(e) => {
      error!(target: "wordmatch_backend", error = %e, "HTTP pairs generation failed");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!(ApiError { error: e.to_string() })),
      )
    }
  }
}

#[instrument(level = "info", skip(state, body), fields(prompt_len = body.prompt.len()))]
pub async fn http_post_round(
  State(state): State<Arc<AppState>>,
  Json(body): Json<NewRoundIn>,
) -> impl IntoResponse {
  let round = start_round(&state, &body.prompt).await;
  info!(target: "game", round_id = %round.id, cards = round.cards.len(), "HTTP round created");
  Json(round)
}

#[instrument(level = "info", skip(state), fields(%round_id))]
pub async fn http_get_round(
  State(state): State<Arc<AppState>>,
  Path(round_id): Path<String>,
) -> impl IntoResponse {
  match snapshot(&state, &round_id).await {
    Some(round) => Json(round).into_response(),
    None => unknown_round(&round_id),
  }
}

#[instrument(level = "info", skip(state, body), fields(%round_id, card_id = body.card_id))]
pub async fn http_post_select(
  State(state): State<Arc<AppState>>,
  Path(round_id): Path<String>,
  Json(body): Json<SelectIn>,
) -> impl IntoResponse {
  match select_card(&state, &round_id, body.card_id).await {
    Some((outcome, round)) => {
      info!(target: "game", %round_id, ?outcome, "HTTP select handled");
      Json(SelectOut { outcome, round }).into_response()
    }
    None => unknown_round(&round_id),
  }
}

#[instrument(level = "info", skip(state), fields(%round_id))]
pub async fn http_post_reset(
  State(state): State<Arc<AppState>>,
  Path(round_id): Path<String>,
) -> impl IntoResponse {
  match reset_round(&state, &round_id).await {
    Some(round) => Json(round).into_response(),
    None => unknown_round(&round_id),
  }
}

fn unknown_round(round_id: &str) -> axum::response::Response {
  (
    StatusCode::NOT_FOUND,
    Json(ApiError { error: format!("Unknown roundId: {round_id}") }),
  )
    .into_response()
}
