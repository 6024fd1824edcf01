//! Loading game configuration (prompts + optional fallback pair bank) from TOML.
//!
//! See `GameConfig` and `Prompts` for expected schema.

use std::collections::HashSet;

use serde::Deserialize;
use tracing::{info, error};

use crate::domain::WordPair;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct GameConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub fallback_pairs: Vec<PairCfg>,
}

/// Fallback pair entry accepted in TOML configuration.
/// Ids are optional; missing ones are assigned sequentially on load.
#[derive(Clone, Debug, Deserialize)]
pub struct PairCfg {
  #[serde(default)] pub id: Option<i64>,
  pub chinese: String,
  pub english: String,
}

/// Prompts used by the OpenAI client. Defaults reproduce the original
/// word-pair generation conversation; override them in TOML to tune tone.
#[derive(Clone, Debug, Deserialize)]
pub struct Prompts {
  /// First user turn: the fixed instruction asking for exactly 10 pairs.
  pub pair_instruction: String,
  /// Assistant acknowledgement turn inserted before the user payload.
  pub pair_ack: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      pair_instruction: "请从以下内容中提取或生成10个中文和英文单词对。返回的数据格式必须是一个包含id、chinese和english字段的JSON数组。示例：[{\"id\": 1, \"chinese\": \"苹果\", \"english\": \"apple\"}, {\"id\": 2, \"chinese\": \"书\", \"english\": \"book\"}]。如果提供的内容中没有足够的单词，请创造性地补充相关单词以达到10对。确保返回的是有效的JSON格式数组，不要包含其他文本。".into(),
      pair_ack: "我会根据您提供的内容生成10个中英文单词对，并以指定的JSON格式返回。".into(),
    }
  }
}

/// Convert config bank entries into word pairs, filling in missing ids.
/// Entries with empty word fields are skipped with an error log. Ids must
/// be unique across the bank; an entry repeating an earlier id gets a
/// fresh one assigned instead, so no two pairs ever share an id.
pub fn bank_to_pairs(bank: &[PairCfg]) -> Vec<WordPair> {
  let mut seen: HashSet<i64> = HashSet::new();
  let mut next_id: i64 = 1;
  let mut out = Vec::with_capacity(bank.len());
  for cc in bank {
    if cc.chinese.trim().is_empty() || cc.english.trim().is_empty() {
      error!(target: "wordmatch_backend", "Skipping bank pair: empty chinese or english field");
      continue;
    }
    let mut id = cc.id.unwrap_or(next_id);
    if !seen.insert(id) {
      let requested = id;
      while !seen.insert(next_id) {
        next_id += 1;
      }
      id = next_id;
      error!(target: "wordmatch_backend", requested, assigned = id, "Duplicate bank pair id; reassigned");
    }
    next_id = next_id.max(id) + 1;
    out.push(WordPair {
      id,
      chinese: cc.chinese.trim().to_string(),
      english: cc.english.trim().to_string(),
    });
  }
  out
}

/// Attempt to load `GameConfig` from GAME_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_game_config_from_env() -> Option<GameConfig> {
  let path = std::env::var("GAME_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<GameConfig>(&s) {
      Ok(cfg) => {
        info!(target: "wordmatch_backend", %path, "Loaded game config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "wordmatch_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "wordmatch_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bank_assigns_missing_ids() {
    let bank = vec![
      PairCfg { id: Some(5), chinese: "锅".into(), english: "pot".into() },
      PairCfg { id: None, chinese: "刀".into(), english: "knife".into() },
      PairCfg { id: None, chinese: "  ".into(), english: "blank".into() },
    ];
    let pairs = bank_to_pairs(&bank);
    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[0].id, 5);
    assert_eq!(pairs[1].id, 6);
  }

  #[test]
  fn bank_reassigns_duplicate_explicit_ids() {
    let bank = vec![
      PairCfg { id: Some(1), chinese: "锅".into(), english: "pot".into() },
      PairCfg { id: Some(1), chinese: "刀".into(), english: "knife".into() },
      PairCfg { id: None, chinese: "碗".into(), english: "bowl".into() },
    ];
    let pairs = bank_to_pairs(&bank);
    assert_eq!(pairs.len(), 3);
    let ids: HashSet<i64> = pairs.iter().map(|p| p.id).collect();
    assert_eq!(ids.len(), 3, "bank ids must be unique");
    assert_eq!(pairs[0].id, 1);
    assert_eq!(pairs[1].id, 2);
  }

  #[test]
  fn duplicate_bank_ids_cannot_cross_match_in_a_round() {
    let bank = vec![
      PairCfg { id: Some(1), chinese: "锅".into(), english: "pot".into() },
      PairCfg { id: Some(1), chinese: "刀".into(), english: "knife".into() },
    ];
    let pairs = bank_to_pairs(&bank);

    let mut round = crate::game::GameRound::new();
    round.initialize(&pairs);
    let zh = round
      .cards()
      .iter()
      .find(|c| c.text == "锅")
      .map(|c| c.card_id)
      .expect("card present");
    let en = round
      .cards()
      .iter()
      .find(|c| c.text == "knife")
      .map(|c| c.card_id)
      .expect("card present");

    assert_eq!(round.select(zh), crate::game::SelectOutcome::Pending);
    assert_eq!(round.select(en), crate::game::SelectOutcome::Mismatch);
    assert!(round.cards().iter().all(|c| !c.matched));
  }

  #[test]
  fn toml_schema_parses() {
    let cfg: GameConfig = toml::from_str(
      r#"
        [prompts]
        pair_instruction = "instr"
        pair_ack = "ack"

        [[fallback_pairs]]
        chinese = "锅"
        english = "pot"
      "#,
    )
    .expect("toml");
    assert_eq!(cfg.prompts.pair_ack, "ack");
    assert_eq!(cfg.fallback_pairs.len(), 1);
  }
}
