//! Domain models used by the backend: word pairs, cards, and their provenance.

use serde::{Deserialize, Serialize};

/// One Chinese/English word pair as produced by the provider.
/// Immutable once created; `id` is unique within a batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPair {
  pub id: i64,
  pub chinese: String,
  pub english: String,
}

/// Where did a batch of pairs come from?
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PairSource {
  Generated,  // recovered from a live model reply
  LocalBank,  // fallback bank overridden via TOML config
  Fallback,   // built-in fixed list (last resort)
}

/// Which side of a pair a card shows.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CardLanguage {
  Chinese,
  English,
}

/// One face-up card in the matching grid. Two per pair, one per language.
/// `card_id` is unique within a deck and assigned by the deck builder;
/// it never collides across languages.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Card {
  pub card_id: i64,
  pub pair_id: i64,
  pub text: String,
  pub language: CardLanguage,
  pub matched: bool,
}
