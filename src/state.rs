//! Application state: in-memory round store, prompts, fallback bank, and
//! the OpenAI client.
//!
//! This module owns:
//!   - the uuid-keyed store of active game rounds
//!   - the prompts struct (from TOML or defaults)
//!   - the fallback pair bank (TOML override or built-in list)
//!   - optional OpenAI client
//!
//! The pair-generation policy prefers a live model reply. If OpenAI is
//! unavailable or the reply cannot be recovered, we substitute the
//! fallback bank so a round can always start.

use std::{collections::HashMap, sync::Arc, time::Instant};
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::config::{bank_to_pairs, load_game_config_from_env, Prompts};
use crate::domain::{PairSource, WordPair};
use crate::game::GameRound;
use crate::openai::OpenAI;
use crate::seeds::fallback_pairs;

/// Upper bound on stored rounds. Inserting past the cap first drops
/// completed rounds, then the oldest by creation time.
const MAX_ROUNDS: usize = 1024;

/// A stored round plus the bookkeeping eviction needs.
pub struct StoredRound {
    round: GameRound,
    created_at: Instant,
}

#[derive(Clone)]
pub struct AppState {
    pub rounds: Arc<RwLock<HashMap<String, StoredRound>>>,
    pub openai: Option<OpenAI>,
    pub prompts: Prompts,
    pub fallback: Vec<WordPair>,
    pub fallback_source: PairSource,
}

impl AppState {
    /// Build state from env: load config, resolve the fallback bank, init OpenAI.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        // Load TOML config if provided (prompts + optional fallback bank).
        let cfg_opt = load_game_config_from_env();
        let prompts = cfg_opt
            .as_ref()
            .map(|c| c.prompts.clone())
            .unwrap_or_default();

        let (fallback, fallback_source) = match cfg_opt.as_ref() {
            Some(cfg) if !cfg.fallback_pairs.is_empty() => {
                let bank = bank_to_pairs(&cfg.fallback_pairs);
                if bank.is_empty() {
                    warn!(target: "wordmatch_backend", "Config fallback bank had no usable pairs; using built-in list");
                    (fallback_pairs(), PairSource::Fallback)
                } else {
                    (bank, PairSource::LocalBank)
                }
            }
            _ => (fallback_pairs(), PairSource::Fallback),
        };
        info!(target: "wordmatch_backend", pairs = fallback.len(), source = ?fallback_source, "Fallback pair bank ready");

        // Build optional OpenAI client (if API key present).
        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "wordmatch_backend", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled.");
        } else {
            info!(target: "wordmatch_backend", "OpenAI disabled (no OPENAI_API_KEY). Rounds will use the fallback bank.");
        }

        Self {
            rounds: Arc::new(RwLock::new(HashMap::new())),
            openai,
            prompts,
            fallback,
            fallback_source,
        }
    }

    /// Pair-generation policy. Never fails: any provider error is logged
    /// and masked by the fallback bank, tagged with its origin.
    #[instrument(level = "info", skip(self, prompt), fields(prompt_len = prompt.len()))]
    pub async fn generate_pairs(&self, prompt: &str) -> (Vec<WordPair>, PairSource) {
        if let Some(oa) = &self.openai {
            match oa.generate_word_pairs(&self.prompts, prompt).await {
                Ok(pairs) => {
                    info!(target: "game", count = pairs.len(), source = "generated", "Pairs from live model reply");
                    return (pairs, PairSource::Generated);
                }
                Err(e) => {
                    error!(target: "game", error = %e, "Provider failed; substituting fallback bank");
                }
            }
        } else {
            warn!(target: "game", "OPENAI_API_KEY not set; substituting fallback bank");
        }

        (self.fallback.clone(), self.fallback_source)
    }

    /// Insert a round under a fresh uuid and return the id. At capacity,
    /// completed rounds are evicted first, then the oldest live ones.
    #[instrument(level = "debug", skip(self, round))]
    pub async fn insert_round(&self, round: GameRound) -> String {
        let id = Uuid::new_v4().to_string();
        let mut rounds = self.rounds.write().await;
        if rounds.len() >= MAX_ROUNDS {
            let before = rounds.len();
            rounds.retain(|_, s| !s.round.completed());
            while rounds.len() >= MAX_ROUNDS {
                let oldest = rounds
                    .iter()
                    .min_by_key(|(_, s)| s.created_at)
                    .map(|(k, _)| k.clone());
                match oldest {
                    Some(k) => {
                        rounds.remove(&k);
                    }
                    None => break,
                }
            }
            info!(target: "wordmatch_backend", evicted = before - rounds.len(), "Round store at capacity; evicted stale rounds");
        }
        rounds.insert(id.clone(), StoredRound { round, created_at: Instant::now() });
        id
    }

    /// Read-only snapshot of a round by id.
    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn get_round(&self, id: &str) -> Option<GameRound> {
        self.rounds.read().await.get(id).map(|s| s.round.clone())
    }

    /// Mutate a round in place. Returns None for unknown ids.
    pub async fn with_round<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut GameRound) -> T,
    ) -> Option<T> {
        let mut rounds = self.rounds.write().await;
        rounds.get_mut(id).map(|s| f(&mut s.round))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Phase, SelectOutcome};

    fn bare_state() -> AppState {
        AppState {
            rounds: Arc::new(RwLock::new(HashMap::new())),
            openai: None,
            prompts: Prompts::default(),
            fallback: fallback_pairs(),
            fallback_source: PairSource::Fallback,
        }
    }

    #[tokio::test]
    async fn no_client_substitutes_builtin_fallback() {
        let state = bare_state();
        let (pairs, source) = state.generate_pairs("cooking words").await;
        assert_eq!(source, PairSource::Fallback);
        assert_eq!(pairs, fallback_pairs());
        assert_eq!(pairs.len(), 10);
    }

    #[tokio::test]
    async fn round_store_roundtrip() {
        let state = bare_state();
        let mut round = GameRound::new();
        round.initialize(&fallback_pairs());
        let id = state.insert_round(round).await;

        let snap = state.get_round(&id).await.expect("round present");
        assert_eq!(snap.phase(), Phase::Playing);
        assert_eq!(snap.cards().len(), 20);

        let phase = state.with_round(&id, |r| { r.reset(); r.phase() }).await;
        assert_eq!(phase, Some(Phase::Idle));
        assert!(state.get_round("missing").await.is_none());
    }

    #[tokio::test]
    async fn store_at_capacity_evicts_completed_rounds_first() {
        let state = bare_state();

        // One finished round, then fill the store to the cap with live ones.
        let mut done = GameRound::new();
        done.initialize(&[WordPair { id: 1, chinese: "锅".into(), english: "pot".into() }]);
        let ids: Vec<i64> = done.cards().iter().map(|c| c.card_id).collect();
        done.select(ids[0]);
        if let SelectOutcome::Matched { pair_id } = done.select(ids[1]) {
            done.apply_match(pair_id);
        }
        assert!(done.completed());
        let done_id = state.insert_round(done).await;

        for _ in 1..MAX_ROUNDS {
            state.insert_round(GameRound::new()).await;
        }
        assert_eq!(state.rounds.read().await.len(), MAX_ROUNDS);

        let fresh_id = state.insert_round(GameRound::new()).await;
        let rounds = state.rounds.read().await;
        assert!(rounds.len() <= MAX_ROUNDS);
        assert!(!rounds.contains_key(&done_id), "completed round evicted");
        assert!(rounds.contains_key(&fresh_id));
    }
}
