//! The matching-game state machine.
//!
//! A round owns a shuffled deck of cards (two per word pair, one per
//! language), an ordered selection of at most two card ids, an error flag
//! and a completion flag. The machine is pure and synchronous: it never
//! fails and it never sleeps. Timed effects (the match-confirmation delay
//! and the mismatch-reset delay) are the caller's job — `select` reports
//! what should happen, `apply_match` / `clear_mismatch` apply it once the
//! delay has elapsed.
//!
//! The match predicate depends only on `language` and `pair_id`, never on
//! text equality, so two pairs sharing a spelling still resolve correctly.

use rand::seq::SliceRandom;
use serde::Serialize;

use crate::domain::{Card, CardLanguage, PairSource, WordPair};

/// Delay before a confirmed match flips both cards to matched.
pub const MATCH_DELAY_MS: u64 = 500;
/// Delay the error flag stays up after a mismatch.
pub const MISMATCH_DELAY_MS: u64 = 1000;

const SELECTION_CAP: usize = 2;

/// Lifecycle of a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
  Idle,
  Playing,
  Completed,
}

/// What a `select` call resolved to. `Matched` and `Mismatch` instruct the
/// caller to schedule the corresponding delayed follow-up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectOutcome {
  /// Click was a no-op (error showing, card matched, buffer full, bad id).
  Ignored,
  /// First card of a prospective pair is now selected.
  Pending,
  /// Languages differ and pair ids agree; apply after MATCH_DELAY_MS.
  Matched {
    #[serde(rename = "pairId")]
    pair_id: i64,
  },
  /// Anything else; error flag is up, clear after MISMATCH_DELAY_MS.
  Mismatch,
}

/// One play session. Built from a pair batch, reset back to `Idle`.
#[derive(Clone, Debug)]
pub struct GameRound {
  cards: Vec<Card>,
  selection: Vec<i64>,
  show_error: bool,
  completed: bool,
  completion_notified: bool,
  phase: Phase,
  source: Option<PairSource>,
}

impl Default for GameRound {
  fn default() -> Self {
    Self {
      cards: Vec::new(),
      selection: Vec::new(),
      show_error: false,
      completed: false,
      completion_notified: false,
      phase: Phase::Idle,
      source: None,
    }
  }
}

impl GameRound {
  /// An empty round in `Idle`.
  pub fn new() -> Self {
    Self::default()
  }

  /// Build and shuffle a fresh deck from a pair batch.
  /// An empty batch leaves the round in `Idle`.
  pub fn initialize(&mut self, pairs: &[WordPair]) {
    if pairs.is_empty() {
      *self = Self::new();
      return;
    }

    // Card ids are handed out by a per-deck sequential counter, so the
    // two cards of a pair can never collide whatever the pair ids are.
    let mut next_card_id: i64 = 0;
    let mut assign = |pair_id: i64, text: &str, language: CardLanguage| {
      let card = Card {
        card_id: next_card_id,
        pair_id,
        text: text.to_string(),
        language,
        matched: false,
      };
      next_card_id += 1;
      card
    };

    let mut cards: Vec<Card> = Vec::with_capacity(pairs.len() * 2);
    for p in pairs {
      cards.push(assign(p.id, &p.chinese, CardLanguage::Chinese));
    }
    for p in pairs {
      cards.push(assign(p.id, &p.english, CardLanguage::English));
    }
    cards.shuffle(&mut rand::thread_rng());

    self.cards = cards;
    self.selection.clear();
    self.show_error = false;
    self.completed = false;
    self.completion_notified = false;
    self.phase = Phase::Playing;
    self.source = None;
  }

  /// Handle a card click. Appends to the selection and resolves once two
  /// cards are buffered. A third click while two are pending is a no-op.
  pub fn select(&mut self, card_id: i64) -> SelectOutcome {
    if self.phase() != Phase::Playing || self.show_error || self.selection.len() >= SELECTION_CAP {
      return SelectOutcome::Ignored;
    }
    let card = match self.cards.iter().find(|c| c.card_id == card_id) {
      Some(c) => c.clone(),
      None => return SelectOutcome::Ignored,
    };
    if card.matched {
      return SelectOutcome::Ignored;
    }

    self.selection.push(card_id);
    if self.selection.len() < SELECTION_CAP {
      return SelectOutcome::Pending;
    }

    // Resolve. The first selected card is still present in the deck;
    // clicking the same card twice falls through to a mismatch, matching
    // the original behavior.
    let first = self
      .cards
      .iter()
      .find(|c| c.card_id == self.selection[0])
      .cloned();
    match first {
      Some(f) if f.language != card.language && f.pair_id == card.pair_id => {
        SelectOutcome::Matched { pair_id: card.pair_id }
      }
      _ => {
        self.show_error = true;
        SelectOutcome::Mismatch
      }
    }
  }

  /// Delayed follow-up of a `Matched` outcome: mark both cards of the pair
  /// matched, clear the selection, and check for completion.
  pub fn apply_match(&mut self, pair_id: i64) {
    if self.phase() != Phase::Playing {
      return;
    }
    for c in self.cards.iter_mut().filter(|c| c.pair_id == pair_id) {
      c.matched = true;
    }
    self.selection.clear();
    if !self.cards.is_empty() && self.cards.iter().all(|c| c.matched) {
      self.completed = true;
      self.phase = Phase::Completed;
    }
  }

  /// Delayed follow-up of a `Mismatch` outcome: drop the error flag and
  /// the selection. No cards change state.
  pub fn clear_mismatch(&mut self) {
    self.show_error = false;
    self.selection.clear();
  }

  /// One-shot completion event: true exactly once per round, after the
  /// final match.
  pub fn take_completion_event(&mut self) -> bool {
    if self.completed && !self.completion_notified {
      self.completion_notified = true;
      return true;
    }
    false
  }

  /// Back to `Idle`, discarding deck, selection and flags.
  pub fn reset(&mut self) {
    *self = Self::new();
  }

  pub fn phase(&self) -> Phase {
    self.phase
  }

  pub fn cards(&self) -> &[Card] {
    &self.cards
  }

  pub fn selection(&self) -> &[i64] {
    &self.selection
  }

  pub fn show_error(&self) -> bool {
    self.show_error
  }

  pub fn completed(&self) -> bool {
    self.completed
  }

  /// Provenance of the pair batch behind the current deck.
  pub fn source(&self) -> Option<PairSource> {
    self.source
  }

  pub fn set_source(&mut self, source: PairSource) {
    self.source = Some(source);
  }
}
