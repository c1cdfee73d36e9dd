//! Candidate matching
//!
//! Queries the card catalog with progressively relaxed filters and
//! ranks whatever survives deduplication:
//!
//! 1. every name variant with the hp filter (exhaustive union, the
//!    printed number is never used as a filter),
//! 2. the bare base name with the hp filter,
//! 3. the name alone,
//! 4. hp alone when no name was extracted at all.
//!
//! Each step stops the widening as soon as it leaves a non-empty set.
//! A lookup failure at any step counts as "no results for that step";
//! only when every issued query failed does the matcher report a hard
//! transport error.

use crate::error::ScanError;
use crate::lookup::CardLookup;
use crate::normalize::{strip_known_suffix, NameVariantSet};
use crate::types::{CardRecord, MatchQuery, ScanResult};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

pub struct CandidateMatcher {
    lookup: Arc<dyn CardLookup>,
}

/// Accumulator for one widening run: records deduplicated by catalog
/// id, plus counts to tell "no rows anywhere" from "catalog down".
#[derive(Default)]
struct QueryUnion {
    records: Vec<CardRecord>,
    seen: HashSet<String>,
    issued: usize,
    failed: usize,
}

impl QueryUnion {
    fn absorb(&mut self, outcome: Result<Vec<CardRecord>, crate::error::LookupError>) {
        self.issued += 1;
        match outcome {
            Ok(records) => {
                for record in records {
                    if self.seen.insert(record.id.clone()) {
                        self.records.push(record);
                    }
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "lookup step failed, widening continues");
                self.failed += 1;
            }
        }
    }
}

impl CandidateMatcher {
    pub fn new(lookup: Arc<dyn CardLookup>) -> Self {
        Self { lookup }
    }

    /// Produce the ranked candidate list for one extraction result.
    ///
    /// An extraction with no name and no hp never reaches the catalog:
    /// the number field alone is too unreliable to query on, and an
    /// unconstrained query is never issued.
    pub async fn match_candidates(
        &self,
        scan: &ScanResult,
    ) -> Result<Vec<CardRecord>, ScanError> {
        if scan.name.is_none() && scan.hp.is_none() {
            return Ok(Vec::new());
        }

        let mut union = QueryUnion::default();

        if let Some(name) = scan.name.as_deref() {
            let variants = NameVariantSet::derive(name);

            // Step 1: union across all variants, hp-filtered
            for variant in variants.iter() {
                let query = MatchQuery {
                    name: Some(variant.to_string()),
                    hp: scan.hp.clone(),
                    number: None,
                };
                union.absorb(self.lookup.search_by_details(&query).await);
            }
            if !union.records.is_empty() {
                return Ok(self.rank(name, union.records));
            }

            // Step 2: bare base name, hp still applied
            if let Some(base) = strip_known_suffix(name) {
                let query = MatchQuery {
                    name: Some(base.to_string()),
                    hp: scan.hp.clone(),
                    number: None,
                };
                union.absorb(self.lookup.search_by_details(&query).await);
                if !union.records.is_empty() {
                    return Ok(self.rank(name, union.records));
                }
            }

            // Step 3: name only, hp dropped
            let query = MatchQuery {
                name: Some(variants.original().to_string()),
                hp: None,
                number: None,
            };
            union.absorb(self.lookup.search_by_details(&query).await);
            if !union.records.is_empty() {
                return Ok(self.rank(name, union.records));
            }
        } else if let Some(hp) = scan.hp.as_deref() {
            // Step 4: no name at all, hp is the only handle we have
            let query = MatchQuery {
                name: None,
                hp: Some(hp.to_string()),
                number: None,
            };
            union.absorb(self.lookup.search_by_details(&query).await);
            if !union.records.is_empty() {
                return Ok(union.records);
            }
        }

        if union.issued > 0 && union.failed == union.issued {
            return Err(ScanError::LookupTransport(
                "every lookup step failed".to_string(),
            ));
        }
        Ok(Vec::new())
    }

    /// Total, stable order: exact name matches first, then records
    /// containing the suffix-stripped base, then everything else;
    /// lexicographic name order inside each class.
    fn rank(&self, scanned_name: &str, mut records: Vec<CardRecord>) -> Vec<CardRecord> {
        if records.len() < 2 {
            return records;
        }
        let scanned = scanned_name.trim();
        let base = strip_known_suffix(scanned).unwrap_or(scanned);
        let base_lower = base.to_lowercase();

        let class = |record: &CardRecord| -> u8 {
            if record.name.eq_ignore_ascii_case(scanned) {
                0
            } else if record.name.to_lowercase().contains(&base_lower) {
                1
            } else {
                2
            }
        };

        records.sort_by(|a, b| match class(a).cmp(&class(b)) {
            Ordering::Equal => a.name.cmp(&b.name),
            other => other,
        });
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    fn record(id: &str, name: &str, hp: &str) -> CardRecord {
        CardRecord {
            id: id.to_string(),
            name: name.to_string(),
            hp: Some(hp.to_string()),
            ..Default::default()
        }
    }

    /// Catalog with exact-name, hp-filtered semantics
    struct MemoryLookup {
        records: Vec<CardRecord>,
        calls: AtomicUsize,
    }

    impl MemoryLookup {
        fn new(records: Vec<CardRecord>) -> Self {
            Self {
                records,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(AtomicOrdering::Relaxed)
        }
    }

    #[async_trait]
    impl CardLookup for MemoryLookup {
        async fn search_by_details(
            &self,
            query: &MatchQuery,
        ) -> Result<Vec<CardRecord>, LookupError> {
            self.calls.fetch_add(1, AtomicOrdering::Relaxed);
            assert!(!query.is_unconstrained(), "unconstrained query issued");
            Ok(self
                .records
                .iter()
                .filter(|r| match query.name.as_deref() {
                    Some(name) => r.name.eq_ignore_ascii_case(name),
                    None => true,
                })
                .filter(|r| match query.hp.as_deref() {
                    Some(hp) => r.hp.as_deref() == Some(hp),
                    None => true,
                })
                .cloned()
                .collect())
        }

        async fn search_by_free_text(&self, _: &str) -> Result<Vec<CardRecord>, LookupError> {
            Ok(Vec::new())
        }
    }

    struct FailingLookup;

    #[async_trait]
    impl CardLookup for FailingLookup {
        async fn search_by_details(
            &self,
            _: &MatchQuery,
        ) -> Result<Vec<CardRecord>, LookupError> {
            Err(LookupError::Transport("connection reset".to_string()))
        }

        async fn search_by_free_text(&self, _: &str) -> Result<Vec<CardRecord>, LookupError> {
            Err(LookupError::Transport("connection reset".to_string()))
        }
    }

    fn scan(name: Option<&str>, hp: Option<&str>, number: Option<&str>) -> ScanResult {
        ScanResult {
            name: name.map(String::from),
            hp: hp.map(String::from),
            number: number.map(String::from),
            image_ref: None,
        }
    }

    #[tokio::test]
    async fn test_empty_scan_issues_no_queries() {
        let lookup = Arc::new(MemoryLookup::new(vec![record("1", "Pikachu", "70")]));
        let matcher = CandidateMatcher::new(lookup.clone());
        let results = matcher
            .match_candidates(&scan(None, None, None))
            .await
            .unwrap();
        assert!(results.is_empty());
        assert_eq!(lookup.calls(), 0);
    }

    #[tokio::test]
    async fn test_number_only_scan_issues_no_queries() {
        // The printed number is never used as a filter
        let lookup = Arc::new(MemoryLookup::new(vec![record("1", "Pikachu", "70")]));
        let matcher = CandidateMatcher::new(lookup.clone());
        let results = matcher
            .match_candidates(&scan(None, None, Some("25/102")))
            .await
            .unwrap();
        assert!(results.is_empty());
        assert_eq!(lookup.calls(), 0);
    }

    #[tokio::test]
    async fn test_exact_name_and_hp_single_hit() {
        let lookup = Arc::new(MemoryLookup::new(vec![
            record("m1", "Mewtwo", "150"),
            record("p1", "Pikachu", "70"),
        ]));
        let matcher = CandidateMatcher::new(lookup);
        let results = matcher
            .match_candidates(&scan(Some("Mewtwo"), Some("150"), None))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "m1");
    }

    #[tokio::test]
    async fn test_variant_union_deduplicates_by_id() {
        // "Pikachu ex" variants include both "Pikachu ex" and "Pikachu";
        // the same record reached twice must appear once
        let lookup = Arc::new(MemoryLookup::new(vec![record("p1", "Pikachu ex", "70")]));
        let matcher = CandidateMatcher::new(lookup);
        let results = matcher
            .match_candidates(&scan(Some("Pikachu EX"), Some("70"), None))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "p1");
    }

    #[tokio::test]
    async fn test_widening_drops_hp_filter_last() {
        // hp misread as 999: step 1 and 2 find nothing, step 3 (name
        // only) recovers the card
        let lookup = Arc::new(MemoryLookup::new(vec![record("p1", "Pikachu ex", "70")]));
        let matcher = CandidateMatcher::new(lookup);
        let results = matcher
            .match_candidates(&scan(Some("Pikachu ex"), Some("999"), None))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "p1");
    }

    #[tokio::test]
    async fn test_hp_only_scan_queries_once() {
        let lookup = Arc::new(MemoryLookup::new(vec![
            record("a", "Abra", "40"),
            record("b", "Bulbasaur", "40"),
            record("c", "Charmander", "50"),
        ]));
        let matcher = CandidateMatcher::new(lookup.clone());
        let results = matcher
            .match_candidates(&scan(None, Some("40"), None))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(lookup.calls(), 1);
    }

    #[tokio::test]
    async fn test_ranking_exact_before_contains() {
        // Variant queries for "Pikachu ex" reach both the exact card
        // and the bare "Pikachu"; the exact match must sort first
        let lookup = Arc::new(MemoryLookup::new(vec![
            record("base", "Pikachu", "60"),
            record("ex", "Pikachu ex", "200"),
        ]));
        let matcher = CandidateMatcher::new(lookup);
        let results = matcher
            .match_candidates(&scan(Some("Pikachu ex"), None, None))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "ex");
        assert_eq!(results[1].id, "base");
    }

    #[tokio::test]
    async fn test_ranking_lexicographic_within_class() {
        let lookup = Arc::new(MemoryLookup::new(vec![
            record("upper", "PIKACHU", "60"),
            record("plain", "Pikachu", "60"),
        ]));
        let matcher = CandidateMatcher::new(lookup);
        let results = matcher
            .match_candidates(&scan(Some("Pikachu"), Some("60"), None))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        // Both exact ignoring case; lexicographic name order breaks the tie
        assert_eq!(results[0].name, "PIKACHU");
    }

    #[tokio::test]
    async fn test_ranking_is_deterministic() {
        let records = vec![
            record("1", "Pikachu VMAX", "310"),
            record("2", "Pikachu", "70"),
            record("3", "Surfing Pikachu", "80"),
        ];
        let lookup = Arc::new(MemoryLookup::new(records));
        let matcher = CandidateMatcher::new(lookup);
        let input = scan(Some("Pikachu V"), None, None);
        // "Pikachu V" variants cover "Pikachu VMAX" and bare "Pikachu"
        let first = matcher.match_candidates(&input).await.unwrap();
        let second = matcher.match_candidates(&input).await.unwrap();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[tokio::test]
    async fn test_all_steps_failing_is_hard_error() {
        let matcher = CandidateMatcher::new(Arc::new(FailingLookup));
        let result = matcher
            .match_candidates(&scan(Some("Mewtwo"), Some("150"), None))
            .await;
        assert!(matches!(result, Err(ScanError::LookupTransport(_))));
    }

    #[tokio::test]
    async fn test_no_matches_is_empty_not_error() {
        let lookup = Arc::new(MemoryLookup::new(vec![record("1", "Snorlax", "140")]));
        let matcher = CandidateMatcher::new(lookup);
        let results = matcher
            .match_candidates(&scan(Some("Mewtwo"), Some("150"), None))
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
