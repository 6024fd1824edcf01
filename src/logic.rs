//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Starting a round (provider with fallback substitution)
//!   - Selecting a card and scheduling the delayed resolution effects
//!   - Snapshots and reset
//!
//! The state machine itself is pure; the two timers here (match-confirm
//! delay, mismatch-reset delay) are the only suspension points. At most
//! one of each can be outstanding per round because the selection cap
//! blocks a third click until resolution clears the buffer.

use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::game::{GameRound, SelectOutcome, MATCH_DELAY_MS, MISMATCH_DELAY_MS};
use crate::protocol::{to_out, RoundOut};
use crate::state::AppState;

/// Create a round from the user's free-form text. The provider is asked
/// first; on any failure the fallback bank is substituted, so this always
/// yields a playable deck.
#[instrument(level = "info", skip(state, prompt), fields(prompt_len = prompt.len()))]
pub async fn start_round(state: &AppState, prompt: &str) -> RoundOut {
  let (pairs, source) = state.generate_pairs(prompt).await;

  let mut round = GameRound::new();
  round.initialize(&pairs);
  round.set_source(source);

  let id = state.insert_round(round).await;
  info!(target: "game", round_id = %id, pairs = pairs.len(), source = ?source, "Round started");

  // The round was just inserted; the store cannot have dropped it.
  snapshot(state, &id).await.unwrap_or_else(|| to_out(&id, &GameRound::new()))
}

/// Forward a card click into the round and schedule whatever delayed
/// effect the outcome calls for.
#[instrument(level = "info", skip(state), fields(%round_id, card_id))]
pub async fn select_card(
  state: &AppState,
  round_id: &str,
  card_id: i64,
) -> Option<(SelectOutcome, RoundOut)> {
  let outcome = state.with_round(round_id, |r| r.select(card_id)).await?;

  match outcome {
    SelectOutcome::Matched { pair_id } => {
      schedule_match(state, round_id, pair_id);
    }
    SelectOutcome::Mismatch => {
      schedule_mismatch_clear(state, round_id);
    }
    SelectOutcome::Pending | SelectOutcome::Ignored => {}
  }

  let round = state.get_round(round_id).await?;
  Some((outcome, to_out(round_id, &round)))
}

/// Read-only snapshot of a round.
#[instrument(level = "debug", skip(state), fields(%round_id))]
pub async fn snapshot(state: &AppState, round_id: &str) -> Option<RoundOut> {
  let round = state.get_round(round_id).await?;
  Some(to_out(round_id, &round))
}

/// Discard the deck and return the round to `Idle`.
#[instrument(level = "info", skip(state), fields(%round_id))]
pub async fn reset_round(state: &AppState, round_id: &str) -> Option<RoundOut> {
  state.with_round(round_id, |r| r.reset()).await?;
  info!(target: "game", %round_id, "Round reset to idle");
  snapshot(state, round_id).await
}

/// After the match delay, mark both cards of the pair matched and log the
/// one-shot completion event if this was the final pair.
fn schedule_match(state: &AppState, round_id: &str, pair_id: i64) {
  let state = state.clone();
  let round_id = round_id.to_string();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(MATCH_DELAY_MS)).await;
    let completed = state
      .with_round(&round_id, |r| {
        r.apply_match(pair_id);
        r.take_completion_event()
      })
      .await;
    match completed {
      Some(true) => {
        info!(target: "game", %round_id, pair_id, "Final pair matched; round completed");
      }
      Some(false) => {
        info!(target: "game", %round_id, pair_id, "Pair matched");
      }
      None => {
        warn!(target: "game", %round_id, "Round vanished before match apply");
      }
    }
  });
}

/// After the mismatch delay, drop the error flag and the selection.
fn schedule_mismatch_clear(state: &AppState, round_id: &str) {
  let state = state.clone();
  let round_id = round_id.to_string();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(MISMATCH_DELAY_MS)).await;
    if state.with_round(&round_id, |r| r.clear_mismatch()).await.is_none() {
      warn!(target: "game", %round_id, "Round vanished before mismatch clear");
    }
  });
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{CardLanguage, PairSource};
  use crate::game::Phase;

  fn bare_state() -> AppState {
    use crate::config::Prompts;
    use crate::seeds::fallback_pairs;
    use std::{collections::HashMap, sync::Arc};
    use tokio::sync::RwLock;

    AppState {
      rounds: Arc::new(RwLock::new(HashMap::new())),
      openai: None,
      prompts: Prompts::default(),
      fallback: fallback_pairs(),
      fallback_source: PairSource::Fallback,
    }
  }

  async fn find_card(state: &AppState, round_id: &str, pair_id: i64, language: CardLanguage) -> i64 {
    state
      .get_round(round_id)
      .await
      .expect("round")
      .cards()
      .iter()
      .find(|c| c.pair_id == pair_id && c.language == language)
      .map(|c| c.card_id)
      .expect("card")
  }

  #[tokio::test]
  async fn start_round_without_client_uses_fallback_deck() {
    let state = bare_state();
    let out = start_round(&state, "cooking words").await;
    assert_eq!(out.phase, Phase::Playing);
    assert_eq!(out.cards.len(), 20);
    assert_eq!(out.source, Some(PairSource::Fallback));
    assert!(!out.completed);
  }

  #[tokio::test(start_paused = true)]
  async fn match_applies_after_delay() {
    let state = bare_state();
    let out = start_round(&state, "x").await;
    let zh = find_card(&state, &out.id, 1, CardLanguage::Chinese).await;
    let en = find_card(&state, &out.id, 1, CardLanguage::English).await;

    select_card(&state, &out.id, zh).await.expect("pending");
    let (outcome, snap) = select_card(&state, &out.id, en).await.expect("resolved");
    assert_eq!(outcome, SelectOutcome::Matched { pair_id: 1 });
    // Not yet applied: the confirm delay has not elapsed.
    assert!(snap.cards.iter().all(|c| !c.matched));

    tokio::time::sleep(Duration::from_millis(MATCH_DELAY_MS + 50)).await;
    let snap = snapshot(&state, &out.id).await.expect("snap");
    assert_eq!(snap.cards.iter().filter(|c| c.matched).count(), 2);
    assert!(snap.selection.is_empty());
  }

  #[tokio::test(start_paused = true)]
  async fn mismatch_clears_after_delay() {
    let state = bare_state();
    let out = start_round(&state, "x").await;
    let zh1 = find_card(&state, &out.id, 1, CardLanguage::Chinese).await;
    let en2 = find_card(&state, &out.id, 2, CardLanguage::English).await;

    select_card(&state, &out.id, zh1).await.expect("pending");
    let (outcome, snap) = select_card(&state, &out.id, en2).await.expect("resolved");
    assert_eq!(outcome, SelectOutcome::Mismatch);
    assert!(snap.show_error);

    // Clicks during the error window are ignored.
    let (outcome, _) = select_card(&state, &out.id, zh1).await.expect("ignored");
    assert_eq!(outcome, SelectOutcome::Ignored);

    tokio::time::sleep(Duration::from_millis(MISMATCH_DELAY_MS + 50)).await;
    let snap = snapshot(&state, &out.id).await.expect("snap");
    assert!(!snap.show_error);
    assert!(snap.selection.is_empty());
    assert!(snap.cards.iter().all(|c| !c.matched));
  }

  #[tokio::test(start_paused = true)]
  async fn full_round_completes_once() {
    let state = bare_state();
    let out = start_round(&state, "x").await;

    for pair_id in 1..=10 {
      let zh = find_card(&state, &out.id, pair_id, CardLanguage::Chinese).await;
      let en = find_card(&state, &out.id, pair_id, CardLanguage::English).await;
      select_card(&state, &out.id, zh).await.expect("pending");
      select_card(&state, &out.id, en).await.expect("matched");
      tokio::time::sleep(Duration::from_millis(MATCH_DELAY_MS + 50)).await;
    }

    let snap = snapshot(&state, &out.id).await.expect("snap");
    assert_eq!(snap.phase, Phase::Completed);
    assert!(snap.completed);
  }

  #[tokio::test]
  async fn reset_and_unknown_round() {
    let state = bare_state();
    let out = start_round(&state, "x").await;
    let snap = reset_round(&state, &out.id).await.expect("reset");
    assert_eq!(snap.phase, Phase::Idle);
    assert!(snap.cards.is_empty());

    assert!(snapshot(&state, "missing").await.is_none());
    assert!(select_card(&state, "missing", 0).await.is_none());
    assert!(reset_round(&state, "missing").await.is_none());
  }
}
