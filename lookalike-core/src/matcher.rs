//! Ranking and classification of a query hash against a store.
//!
//! Matching is two-tiered: every entry is ranked by Hamming distance and the
//! list is cut to a small inspection window (`top_k`), then entries inside
//! the window are compared with the distance threshold. The window bounds
//! diagnostic output; the threshold decides the outcome.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{LookalikeError, Result};
use crate::phash::PerceptualHash;
use crate::store::{HashStore, SkippedEntry, StoreSnapshot};

/// Entries kept after ranking.
pub const DEFAULT_TOP_K: usize = 5;

/// Maximum distance that still counts as a match (0 = identical hash only).
pub const DEFAULT_THRESHOLD: u32 = 0;

/// Matching parameters. Neither requires rebuilding the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub threshold: u32,
    pub top_k: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(LookalikeError::InvalidConfig(
                "top_k must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// A dataset item and its distance to the query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub identifier: String,
    pub distance: u32,
}

/// Ranked window plus the entries that could not be compared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    /// Ascending by distance, then identifier; at most `top_k` long
    pub ranked: Vec<RankedEntry>,
    /// Store entries excluded because their hash could not be decoded
    pub skipped: Vec<SkippedEntry>,
    /// Number of entries compared before truncation
    pub compared: usize,
}

/// Outcome of applying a threshold to a ranked window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Every windowed entry within the threshold, closest first
    Matched(Vec<RankedEntry>),
    /// Nothing qualified; the closest entry if the window was non-empty
    NotRelevant(Option<RankedEntry>),
}

impl Classification {
    pub fn is_match(&self) -> bool {
        matches!(self, Classification::Matched(_))
    }
}

/// Rank every store entry by distance to `query`, keeping the `top_k` closest.
///
/// Entries are decoded at the query's bit length; entries that fail to decode
/// are listed in [`MatchResult::skipped`] instead of failing the ranking.
/// Callers answering many queries against one store should decode it once
/// (see [`SharedStore`](crate::SharedStore)) and use [`rank_snapshot`].
pub fn rank(query: &PerceptualHash, store: &HashStore, top_k: usize) -> MatchResult {
    rank_snapshot(query, &store.get_all(query.bit_len()), top_k)
}

/// Rank an already decoded store.
///
/// Entries skipped while decoding are carried into the result. Entries of a
/// different bit length than `query` are skipped as well.
pub fn rank_snapshot(
    query: &PerceptualHash,
    snapshot: &StoreSnapshot,
    top_k: usize,
) -> MatchResult {
    let mut skipped = snapshot.skipped.clone();
    let mut ranked = Vec::with_capacity(snapshot.entries.len());

    for entry in &snapshot.entries {
        match query.hamming_distance(&entry.hash) {
            Ok(distance) => ranked.push(RankedEntry {
                identifier: entry.identifier.clone(),
                distance,
            }),
            Err(e) => {
                warn!(identifier = %entry.identifier, error = %e, "Skipping incomparable entry");
                skipped.push(SkippedEntry {
                    identifier: entry.identifier.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let compared = ranked.len();
    ranked.sort_by(|a, b| {
        a.distance
            .cmp(&b.distance)
            .then_with(|| a.identifier.cmp(&b.identifier))
    });
    ranked.truncate(top_k);

    debug!(
        compared,
        skipped = skipped.len(),
        best = ranked.first().map(|e| e.distance),
        "Ranked store entries"
    );

    MatchResult {
        ranked,
        skipped,
        compared,
    }
}

/// Select the windowed entries within `threshold`.
pub fn classify(result: &MatchResult, threshold: u32) -> Classification {
    let matches: Vec<RankedEntry> = result
        .ranked
        .iter()
        .filter(|entry| entry.distance <= threshold)
        .cloned()
        .collect();

    if matches.is_empty() {
        Classification::NotRelevant(result.ranked.first().cloned())
    } else {
        Classification::Matched(matches)
    }
}

/// Ranking and classification bound to one [`MatchConfig`].
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    config: MatchConfig,
}

impl Matcher {
    pub fn new(config: MatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn rank(&self, query: &PerceptualHash, store: &HashStore) -> MatchResult {
        rank(query, store, self.config.top_k)
    }

    pub fn rank_snapshot(&self, query: &PerceptualHash, snapshot: &StoreSnapshot) -> MatchResult {
        rank_snapshot(query, snapshot, self.config.top_k)
    }

    pub fn classify(&self, result: &MatchResult) -> Classification {
        classify(result, self.config.threshold)
    }

    /// Rank and classify in one call.
    pub fn match_hash(
        &self,
        query: &PerceptualHash,
        store: &HashStore,
    ) -> (MatchResult, Classification) {
        let result = self.rank(query, store);
        let classification = self.classify(&result);
        (result, classification)
    }

    /// Rank and classify against an already decoded store.
    pub fn match_snapshot(
        &self,
        query: &PerceptualHash,
        snapshot: &StoreSnapshot,
    ) -> (MatchResult, Classification) {
        let result = self.rank_snapshot(query, snapshot);
        let classification = self.classify(&result);
        (result, classification)
    }
}

/// Serializable match outcome handed to the presentation layer.
///
/// ```json
/// {"matched": true, "matches": [{"identifier": "a.png", "distance": 0}]}
/// {"matched": false, "nearest": {"identifier": "b.png", "distance": 7}}
/// {"matched": false, "nearest": null}
/// ```
///
/// The `matched` flag is derived from the variant. Deserializing a document
/// whose flag disagrees with its payload fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WireResponse", try_from = "WireResponse")]
pub enum MatchResponse {
    Matched {
        matches: Vec<RankedEntry>,
        diagnostic: Option<String>,
    },
    NotRelevant {
        nearest: Option<RankedEntry>,
    },
}

impl MatchResponse {
    /// Build the response; `diagnostic` is attached only to a match.
    pub fn new(classification: &Classification, diagnostic: Option<String>) -> Self {
        match classification {
            Classification::Matched(matches) => MatchResponse::Matched {
                matches: matches.clone(),
                diagnostic,
            },
            Classification::NotRelevant(nearest) => MatchResponse::NotRelevant {
                nearest: nearest.clone(),
            },
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, MatchResponse::Matched { .. })
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireResponse {
    Matched {
        matched: bool,
        matches: Vec<RankedEntry>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        diagnostic: Option<String>,
    },
    NotRelevant {
        matched: bool,
        nearest: Option<RankedEntry>,
    },
}

impl From<MatchResponse> for WireResponse {
    fn from(response: MatchResponse) -> Self {
        match response {
            MatchResponse::Matched {
                matches,
                diagnostic,
            } => WireResponse::Matched {
                matched: true,
                matches,
                diagnostic,
            },
            MatchResponse::NotRelevant { nearest } => WireResponse::NotRelevant {
                matched: false,
                nearest,
            },
        }
    }
}

impl TryFrom<WireResponse> for MatchResponse {
    type Error = String;

    fn try_from(wire: WireResponse) -> std::result::Result<Self, Self::Error> {
        match wire {
            WireResponse::Matched {
                matched: true,
                matches,
                diagnostic,
            } => Ok(MatchResponse::Matched {
                matches,
                diagnostic,
            }),
            WireResponse::Matched { matched: false, .. } => {
                Err("\"matched\": false cannot carry \"matches\"".into())
            }
            WireResponse::NotRelevant {
                matched: false,
                nearest,
            } => Ok(MatchResponse::NotRelevant { nearest }),
            WireResponse::NotRelevant { matched: true, .. } => {
                Err("\"matched\": true requires \"matches\"".into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query() -> PerceptualHash {
        PerceptualHash::from_bytes(vec![0x00; 8])
    }

    /// A hash exactly `distance` bits away from `query()`.
    fn at_distance(distance: u32) -> PerceptualHash {
        let value = if distance == 64 {
            u64::MAX
        } else {
            (1u64 << distance) - 1
        };
        PerceptualHash::from_bytes(value.to_be_bytes().to_vec())
    }

    fn store_with(entries: &[(&str, u32)]) -> HashStore {
        let mut store = HashStore::new();
        for (identifier, distance) in entries {
            store.insert(*identifier, &at_distance(*distance));
        }
        store
    }

    fn entry(identifier: &str, distance: u32) -> RankedEntry {
        RankedEntry {
            identifier: identifier.to_string(),
            distance,
        }
    }

    #[test]
    fn test_empty_store() {
        let result = rank(&query(), &HashStore::new(), DEFAULT_TOP_K);
        assert!(result.ranked.is_empty());
        assert_eq!(result.compared, 0);
        assert_eq!(classify(&result, 0), Classification::NotRelevant(None));
    }

    #[test]
    fn test_single_entry_outside_threshold() {
        let store = store_with(&[("e.png", 3)]);
        let result = rank(&query(), &store, DEFAULT_TOP_K);
        assert_eq!(
            classify(&result, 0),
            Classification::NotRelevant(Some(entry("e.png", 3)))
        );
    }

    #[test]
    fn test_single_entry_within_widened_threshold() {
        let store = store_with(&[("e.png", 3)]);
        let result = rank(&query(), &store, DEFAULT_TOP_K);
        assert_eq!(
            classify(&result, 5),
            Classification::Matched(vec![entry("e.png", 3)])
        );
    }

    #[test]
    fn test_window_truncates_before_threshold() {
        let store = store_with(&[
            ("a.png", 0),
            ("b.png", 2),
            ("c.png", 2),
            ("d.png", 7),
            ("e.png", 9),
            ("f.png", 10),
        ]);
        let result = rank(&query(), &store, 5);

        assert_eq!(result.compared, 6);
        assert_eq!(
            result.ranked,
            vec![
                entry("a.png", 0),
                entry("b.png", 2),
                entry("c.png", 2),
                entry("d.png", 7),
                entry("e.png", 9),
            ]
        );
        assert_eq!(
            classify(&result, 0),
            Classification::Matched(vec![entry("a.png", 0)])
        );

        // The distance-10 entry is outside the window even at a wide threshold
        let Classification::Matched(matches) = classify(&result, 64) else {
            panic!("expected a match");
        };
        assert_eq!(matches.len(), 5);
        assert!(matches.iter().all(|m| m.identifier != "f.png"));
    }

    #[test]
    fn test_ties_broken_by_identifier() {
        let store = store_with(&[("z.png", 4), ("m.png", 4), ("a/b.png", 4), ("k.png", 1)]);
        let result = rank(&query(), &store, DEFAULT_TOP_K);
        let order: Vec<_> = result.ranked.iter().map(|e| e.identifier.as_str()).collect();
        assert_eq!(order, vec!["k.png", "a/b.png", "m.png", "z.png"]);
    }

    #[test]
    fn test_matched_carries_all_qualifying_entries() {
        let store = store_with(&[("a.png", 0), ("b.png", 1), ("c.png", 6)]);
        let result = rank(&query(), &store, DEFAULT_TOP_K);
        assert_eq!(
            classify(&result, 1),
            Classification::Matched(vec![entry("a.png", 0), entry("b.png", 1)])
        );
    }

    #[test]
    fn test_classification_is_monotonic_in_threshold() {
        let store = store_with(&[("a.png", 1), ("b.png", 4), ("c.png", 8), ("d.png", 12)]);
        let result = rank(&query(), &store, DEFAULT_TOP_K);

        let qualifying = |t: u32| match classify(&result, t) {
            Classification::Matched(m) => m.into_iter().map(|e| e.identifier).collect(),
            Classification::NotRelevant(_) => Vec::new(),
        };

        for t1 in 0..=16 {
            for t2 in t1..=16 {
                let low = qualifying(t1);
                let high = qualifying(t2);
                assert!(low.iter().all(|id| high.contains(id)), "t1={t1} t2={t2}");
            }
        }
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let mut store = store_with(&[("good.png", 2)]);
        store.insert_raw("bad.png", "xyz");
        store.insert_raw("wide.png", "0".repeat(64));

        let result = rank(&query(), &store, DEFAULT_TOP_K);
        assert_eq!(result.ranked, vec![entry("good.png", 2)]);
        let skipped: Vec<_> = result.skipped.iter().map(|s| s.identifier.as_str()).collect();
        assert_eq!(skipped, vec!["bad.png", "wide.png"]);
    }

    #[test]
    fn test_store_of_only_malformed_entries_has_no_nearest() {
        let mut store = HashStore::new();
        store.insert_raw("bad.png", "not hex");
        let result = rank(&query(), &store, DEFAULT_TOP_K);
        assert_eq!(classify(&result, 64), Classification::NotRelevant(None));
    }

    #[test]
    fn test_matcher_uses_config() {
        let store = store_with(&[("a.png", 2), ("b.png", 3), ("c.png", 5)]);
        let matcher = Matcher::new(MatchConfig {
            threshold: 2,
            top_k: 2,
        })
        .unwrap();

        let (result, classification) = matcher.match_hash(&query(), &store);
        assert_eq!(result.ranked.len(), 2);
        assert_eq!(
            classification,
            Classification::Matched(vec![entry("a.png", 2)])
        );
        assert!(classification.is_match());
    }

    #[test]
    fn test_matcher_rejects_empty_window() {
        let err = Matcher::new(MatchConfig {
            threshold: 0,
            top_k: 0,
        })
        .unwrap_err();
        assert!(matches!(err, LookalikeError::InvalidConfig(_)));
    }

    #[test]
    fn test_default_config() {
        let config = MatchConfig::default();
        assert_eq!(config.threshold, 0);
        assert_eq!(config.top_k, 5);
    }

    #[test]
    fn test_response_json_shapes() {
        let matched = MatchResponse::new(
            &Classification::Matched(vec![entry("a.png", 0)]),
            Some("Known reference".into()),
        );
        assert_eq!(
            serde_json::to_value(&matched).unwrap(),
            json!({
                "matched": true,
                "matches": [{"identifier": "a.png", "distance": 0}],
                "diagnostic": "Known reference"
            })
        );

        let nearest = MatchResponse::new(
            &Classification::NotRelevant(Some(entry("b.png", 7))),
            Some("ignored".into()),
        );
        assert_eq!(
            serde_json::to_value(&nearest).unwrap(),
            json!({"matched": false, "nearest": {"identifier": "b.png", "distance": 7}})
        );

        let empty = MatchResponse::new(&Classification::NotRelevant(None), None);
        assert_eq!(
            serde_json::to_value(&empty).unwrap(),
            json!({"matched": false, "nearest": null})
        );
    }

    #[test]
    fn test_response_deserializes_both_shapes() {
        let matched: MatchResponse =
            serde_json::from_str(r#"{"matched":true,"matches":[{"identifier":"a.png","distance":1}]}"#)
                .unwrap();
        assert!(matched.is_match());

        let missed: MatchResponse =
            serde_json::from_str(r#"{"matched":false,"nearest":null}"#).unwrap();
        assert!(!missed.is_match());
    }

    #[test]
    fn test_response_rejects_inconsistent_matched_flag() {
        let err = serde_json::from_str::<MatchResponse>(
            r#"{"matched":false,"matches":[{"identifier":"a.png","distance":1}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("matched"), "{err}");

        assert!(serde_json::from_str::<MatchResponse>(
            r#"{"matched":true,"nearest":{"identifier":"b.png","distance":7}}"#
        )
        .is_err());
        assert!(serde_json::from_str::<MatchResponse>(r#"{"matched":true,"nearest":null}"#).is_err());
    }

    #[test]
    fn test_response_round_trips_through_json() {
        let response = MatchResponse::new(
            &Classification::Matched(vec![entry("a.png", 0), entry("b.png", 2)]),
            Some("Known reference".into()),
        );
        let text = serde_json::to_string(&response).unwrap();
        assert_eq!(serde_json::from_str::<MatchResponse>(&text).unwrap(), response);
    }

    #[test]
    fn test_rank_snapshot_reuses_decoded_store() {
        let mut store = store_with(&[("a.png", 1), ("b.png", 5)]);
        store.insert_raw("bad.png", "xyz");
        let snapshot = store.get_all(64);

        let from_snapshot = rank_snapshot(&query(), &snapshot, DEFAULT_TOP_K);
        assert_eq!(from_snapshot, rank(&query(), &store, DEFAULT_TOP_K));
        assert_eq!(from_snapshot.skipped, snapshot.skipped);

        // A second query against the same snapshot decodes nothing new
        let other = at_distance(5);
        let again = rank_snapshot(&other, &snapshot, DEFAULT_TOP_K);
        assert_eq!(again.ranked[0], entry("b.png", 0));
        assert_eq!(again.skipped.len(), 1);
    }

    #[test]
    fn test_rank_snapshot_skips_other_bit_lengths() {
        let snapshot = store_with(&[("a.png", 0)]).get_all(64);
        let wide = PerceptualHash::from_bytes(vec![0x00; 32]);

        let result = rank_snapshot(&wide, &snapshot, DEFAULT_TOP_K);
        assert!(result.ranked.is_empty());
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].identifier, "a.png");
    }

    #[test]
    fn test_matcher_match_snapshot_agrees_with_match_hash() {
        let store = store_with(&[("a.png", 2), ("b.png", 3), ("c.png", 5)]);
        let matcher = Matcher::new(MatchConfig {
            threshold: 3,
            top_k: 2,
        })
        .unwrap();

        assert_eq!(
            matcher.match_snapshot(&query(), &store.get_all(64)),
            matcher.match_hash(&query(), &store)
        );
    }
}
