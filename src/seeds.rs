//! Seed data: the fixed fallback word pairs.

use crate::domain::WordPair;

fn pair(id: i64, chinese: &str, english: &str) -> WordPair {
  WordPair { id, chinese: chinese.into(), english: english.into() }
}

/// The fixed ten-pair fallback list. Substituted whenever the provider
/// fails (transport, upstream, parse) so the game can always start.
pub fn fallback_pairs() -> Vec<WordPair> {
  vec![
    pair(1, "苹果", "apple"),
    pair(2, "书", "book"),
    pair(3, "猫", "cat"),
    pair(4, "狗", "dog"),
    pair(5, "房子", "house"),
    pair(6, "水", "water"),
    pair(7, "食物", "food"),
    pair(8, "朋友", "friend"),
    pair(9, "学校", "school"),
    pair(10, "电脑", "computer"),
  ]
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;

  #[test]
  fn fallback_is_ten_unique_pairs() {
    let pairs = fallback_pairs();
    assert_eq!(pairs.len(), 10);
    let ids: HashSet<i64> = pairs.iter().map(|p| p.id).collect();
    assert_eq!(ids.len(), 10);
    for p in &pairs {
      assert!(p.chinese.chars().all(crate::util::is_cjk));
      assert!(!p.english.is_empty());
    }
  }
}
