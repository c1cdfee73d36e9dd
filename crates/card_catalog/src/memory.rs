//! In-memory card catalog
//!
//! Backs the same `CardLookup` contract with a plain record list,
//! loadable from a JSON file. Used by the CLI's offline mode and by
//! tests; name filtering is case-insensitive substring match, the way
//! hosted catalogs treat name queries.

use async_trait::async_trait;
use scan_core::error::LookupError;
use scan_core::lookup::CardLookup;
use scan_core::{CardRecord, MatchQuery};
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    records: Vec<CardRecord>,
}

impl MemoryCatalog {
    pub fn new(records: Vec<CardRecord>) -> Self {
        Self { records }
    }

    /// Load a catalog from a JSON array of card records.
    pub fn from_json_file(path: &Path) -> Result<Self, LookupError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| LookupError::Transport(format!("{}: {e}", path.display())))?;
        let records: Vec<CardRecord> =
            serde_json::from_str(&text).map_err(|e| LookupError::Malformed(e.to_string()))?;
        tracing::info!(records = records.len(), path = %path.display(), "loaded catalog");
        Ok(Self::new(records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn name_matches(record: &CardRecord, wanted: &str) -> bool {
    record
        .name
        .to_lowercase()
        .contains(&wanted.to_lowercase())
}

#[async_trait]
impl CardLookup for MemoryCatalog {
    async fn search_by_details(&self, query: &MatchQuery) -> Result<Vec<CardRecord>, LookupError> {
        Ok(self
            .records
            .iter()
            .filter(|r| match query.name.as_deref() {
                Some(name) => name_matches(r, name),
                None => true,
            })
            .filter(|r| match query.hp.as_deref() {
                Some(hp) => r.hp.as_deref() == Some(hp),
                None => true,
            })
            .filter(|r| match query.number.as_deref() {
                Some(number) => r.number.as_deref() == Some(number),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn search_by_free_text(&self, text: &str) -> Result<Vec<CardRecord>, LookupError> {
        let needle = text.to_lowercase();
        Ok(self
            .records
            .iter()
            .filter(|r| {
                r.name.to_lowercase().contains(&needle)
                    || r.rarity
                        .as_deref()
                        .is_some_and(|rarity| rarity.to_lowercase().contains(&needle))
                    || r.edition
                        .as_ref()
                        .is_some_and(|edition| edition.name.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scan_core::CardEdition;
    use std::io::Write;

    fn record(id: &str, name: &str, hp: &str) -> CardRecord {
        CardRecord {
            id: id.to_string(),
            name: name.to_string(),
            hp: Some(hp.to_string()),
            ..Default::default()
        }
    }

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new(vec![
            record("1", "Pikachu", "70"),
            record("2", "Pikachu ex", "200"),
            record("3", "Mewtwo", "150"),
        ])
    }

    #[tokio::test]
    async fn test_name_filter_is_substring_insensitive() {
        let results = catalog()
            .search_by_details(&MatchQuery {
                name: Some("pikachu".to_string()),
                hp: None,
                number: None,
            })
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_hp_filter_is_exact() {
        let results = catalog()
            .search_by_details(&MatchQuery {
                name: Some("Pikachu".to_string()),
                hp: Some("200".to_string()),
                number: None,
            })
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "2");
    }

    #[tokio::test]
    async fn test_free_text_searches_edition() {
        let mut base = record("4", "Charmander", "50");
        base.edition = Some(CardEdition {
            name: "Base Set".to_string(),
            symbol: None,
        });
        let catalog = MemoryCatalog::new(vec![base]);
        let results = catalog.search_by_free_text("base set").await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": "base1-58", "name": "Pikachu", "hp": "40", "number": "58/102"}}]"#
        )
        .unwrap();
        let catalog = MemoryCatalog::from_json_file(file.path()).unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_from_json_file_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let result = MemoryCatalog::from_json_file(file.path());
        assert!(matches!(result, Err(LookupError::Malformed(_))));
    }
}
