// src/interest.rs
//! Per-user interest model: a sparse mapping from lowercase tag to an
//! integer affinity score, bumped whenever the user views a tagged post.
//!
//! Scores only ever grow (no decay, no cap). An absent tag means score 0,
//! so untouched tags need no entry.
//!
//! Legacy records sometimes persisted the model in an invalid shape (a
//! stringified object literal instead of a mapping). Loading is therefore
//! lenient: any non-mapping value repairs to an empty model instead of
//! failing the whole user document.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Score added per tag on a qualifying view. Tunable via config
/// (`interest_increment` / `INTEREST_INCREMENT`).
pub const DEFAULT_INTEREST_INCREMENT: u32 = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct InterestModel {
    scores: HashMap<String, u64>,
}

impl InterestModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Affinity for a canonical (lowercase, trimmed) tag; 0 when untouched.
    pub fn score(&self, tag: &str) -> u64 {
        self.scores.get(tag).copied().unwrap_or(0)
    }

    /// Apply one qualifying view: every tag on the post gains `increment`.
    pub fn record_view(&mut self, tags: &[String], increment: u32) {
        for tag in tags {
            *self.scores.entry(tag.clone()).or_insert(0) += u64::from(increment);
        }
    }

    /// Rebuild a model from an arbitrary persisted value.
    ///
    /// A JSON object keeps its non-negative integer entries; anything else
    /// (stringified literals, arrays, nulls) resets to empty. Junk entries
    /// inside an otherwise valid object are dropped, not propagated.
    pub fn from_value(value: &Value) -> Self {
        let Value::Object(map) = value else {
            return Self::default();
        };
        let scores = map
            .iter()
            .filter_map(|(tag, v)| v.as_u64().map(|score| (tag.clone(), score)))
            .collect();
        Self { scores }
    }

    /// Read-only view for diagnostics and tests.
    pub fn as_map(&self) -> &HashMap<String, u64> {
        &self.scores
    }
}

impl<'de> Deserialize<'de> for InterestModel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Corrupt legacy shapes repair to empty rather than failing the document.
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_tag_scores_zero() {
        let model = InterestModel::new();
        assert_eq!(model.score("go"), 0);
        assert!(model.is_empty());
    }

    #[test]
    fn record_view_increments_every_tag() {
        let mut model = InterestModel::new();
        let tags = vec!["go".to_string(), "rust".to_string()];
        model.record_view(&tags, DEFAULT_INTEREST_INCREMENT);
        assert_eq!(model.score("go"), 10);
        assert_eq!(model.score("rust"), 10);
        assert_eq!(model.len(), 2);
    }

    #[test]
    fn repeated_views_accumulate_monotonically() {
        let mut model = InterestModel::new();
        let tags = vec!["go".to_string()];
        model.record_view(&tags, DEFAULT_INTEREST_INCREMENT);
        let baseline = model.score("go");
        model.record_view(&tags, DEFAULT_INTEREST_INCREMENT);
        model.record_view(&tags, DEFAULT_INTEREST_INCREMENT);
        assert_eq!(
            model.score("go"),
            baseline + 2 * u64::from(DEFAULT_INTEREST_INCREMENT)
        );
    }

    #[test]
    fn stringified_model_repairs_to_empty() {
        let model = InterestModel::from_value(&json!("{\"go\": 30}"));
        assert!(model.is_empty());
    }

    #[test]
    fn repaired_model_accepts_new_scores() {
        // The scorer's repair path: corrupt value in, valid mapping out.
        let mut model = InterestModel::from_value(&json!("[object Object]"));
        model.record_view(&["rust".to_string()], 10);
        assert_eq!(model.len(), 1);
        assert_eq!(model.score("rust"), 10);
    }

    #[test]
    fn junk_entries_are_dropped_valid_kept() {
        let model = InterestModel::from_value(&json!({
            "go": 30,
            "rust": "lots",
            "js": -5,
            "zig": 2.5
        }));
        assert_eq!(model.score("go"), 30);
        assert_eq!(model.len(), 1);
    }

    #[test]
    fn lenient_deserialize_round_trips_valid_maps() {
        let model: InterestModel = serde_json::from_value(json!({"go": 30, "rust": 10})).unwrap();
        assert_eq!(model.score("go"), 30);
        let back = serde_json::to_value(&model).unwrap();
        let again: InterestModel = serde_json::from_value(back).unwrap();
        assert_eq!(model, again);
    }

    #[test]
    fn lenient_deserialize_never_fails_on_corrupt_input() {
        for corrupt in [json!("oops"), json!(7), json!([1, 2]), json!(null)] {
            let model: InterestModel = serde_json::from_value(corrupt).unwrap();
            assert!(model.is_empty());
        }
    }
}
