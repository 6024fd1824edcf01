//! Recovering a word-pair batch from a free-form model reply.
//!
//! Models asked for "JSON only" still wrap the payload in prose or code
//! fences often enough that we run an ordered chain of extraction
//! strategies, each returning the candidate JSON text, and parse the first
//! hit:
//!   1) the whole reply as-is
//!   2) the interior of the first code-fenced block (``` with optional tag)
//!   3) the first substring shaped like a top-level JSON array of objects
//!
//! Parsing is typed (`Vec<WordPair>`), so a non-array payload fails the
//! same way malformed JSON does.

use regex::Regex;

use crate::domain::WordPair;

const MAX_PREVIEW: usize = 120;

/// Extract and validate a batch of word pairs from raw reply text.
pub fn extract_pairs(raw: &str) -> Result<Vec<WordPair>, String> {
  let candidates = [
    Some(raw.trim().to_string()),
    fenced_block(raw),
    bracket_array(raw),
  ];

  for cand in candidates.into_iter().flatten() {
    if let Ok(pairs) = serde_json::from_str::<Vec<WordPair>>(&cand) {
      return validate_batch(pairs);
    }
  }

  Err(format!(
    "no extraction strategy recovered a pair array from reply: {}",
    crate::util::trunc_for_log(raw, MAX_PREVIEW)
  ))
}

/// Interior of the first triple-backtick block, optional language tag.
fn fenced_block(raw: &str) -> Option<String> {
  let re = Regex::new(r"(?s)```(?:[A-Za-z]+)?\s*(.*?)```").ok()?;
  re.captures(raw)
    .and_then(|c| c.get(1))
    .map(|m| m.as_str().trim().to_string())
}

/// First substring that looks like `[ { ... } ]` at top level.
/// Greedy inner match, same shape the original heuristic used.
fn bracket_array(raw: &str) -> Option<String> {
  let re = Regex::new(r"(?s)\[\s*\{.*\}\s*\]").ok()?;
  re.find(raw).map(|m| m.as_str().trim().to_string())
}

/// A recovered batch is usable when it is non-empty, ids are unique, and
/// both word fields are non-blank. Length is otherwise not enforced: a
/// 9-pair batch still makes a playable deck.
fn validate_batch(pairs: Vec<WordPair>) -> Result<Vec<WordPair>, String> {
  if pairs.is_empty() {
    return Err("recovered an empty pair array".into());
  }
  let mut seen = std::collections::HashSet::new();
  for p in &pairs {
    if !seen.insert(p.id) {
      return Err(format!("duplicate pair id {} in batch", p.id));
    }
    if p.chinese.trim().is_empty() || p.english.trim().is_empty() {
      return Err(format!("pair {} has an empty word field", p.id));
    }
  }
  Ok(pairs)
}

#[cfg(test)]
mod tests {
  use super::*;

  const ARRAY: &str = r#"[{"id":1,"chinese":"锅","english":"pot"},{"id":2,"chinese":"刀","english":"knife"}]"#;

  #[test]
  fn direct_fenced_and_prose_agree() {
    let direct = extract_pairs(ARRAY).expect("direct");
    let fenced = extract_pairs(&format!("好的，结果如下：\n```json\n{ARRAY}\n```\n希望有帮助！"))
      .expect("fenced");
    let prose = extract_pairs(&format!("这是你要的单词对：{ARRAY} 祝学习愉快。")).expect("prose");
    assert_eq!(direct, fenced);
    assert_eq!(direct, prose);
    assert_eq!(direct.len(), 2);
    assert_eq!(direct[0].chinese, "锅");
  }

  #[test]
  fn fence_without_language_tag() {
    let got = extract_pairs(&format!("```\n{ARRAY}\n```")).expect("bare fence");
    assert_eq!(got.len(), 2);
  }

  #[test]
  fn unparsable_text_is_an_error_not_a_panic() {
    assert!(extract_pairs("抱歉，我无法生成单词对。").is_err());
    assert!(extract_pairs("").is_err());
  }

  #[test]
  fn non_array_json_fails() {
    assert!(extract_pairs(r#"{"id":1,"chinese":"锅","english":"pot"}"#).is_err());
  }

  #[test]
  fn duplicate_ids_rejected() {
    let dup = r#"[{"id":1,"chinese":"锅","english":"pot"},{"id":1,"chinese":"刀","english":"knife"}]"#;
    assert!(extract_pairs(dup).is_err());
  }

  #[test]
  fn blank_word_fields_rejected() {
    let blank = r#"[{"id":1,"chinese":" ","english":"pot"}]"#;
    assert!(extract_pairs(blank).is_err());
  }

  #[test]
  fn empty_array_rejected() {
    assert!(extract_pairs("[]").is_err());
  }
}
