//! HTTP card catalog client
//!
//! Talks to a hosted card database with a pokemontcg.io-style REST
//! surface: `GET /cards` with filter query parameters, results wrapped
//! in a `data` array. Transport and decode failures map to
//! `LookupError`; an empty `data` array is a normal result.

use async_trait::async_trait;
use scan_core::error::LookupError;
use scan_core::lookup::CardLookup;
use scan_core::{CardRecord, MatchQuery};
use serde::Deserialize;

/// Configuration for the catalog client
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Base URL of the catalog API
    pub base_url: String,
    /// Optional API key, sent as `X-Api-Key`
    pub api_key: Option<String>,
    /// Timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.pokemontcg.io/v2".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

/// HTTP-backed card catalog
pub struct HttpCardCatalog {
    config: CatalogConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CardListResponse {
    #[serde(default)]
    data: Vec<CardRecord>,
}

impl HttpCardCatalog {
    pub fn new(config: CatalogConfig) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        Ok(Self { config, client })
    }

    async fn fetch_cards(&self, params: &[(&str, String)]) -> Result<Vec<CardRecord>, LookupError> {
        let url = format!("{}/cards", self.config.base_url);
        let mut request = self.client.get(&url).query(params);
        if let Some(key) = &self.config.api_key {
            request = request.header("X-Api-Key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Transport(format!(
                "catalog returned {status}"
            )));
        }

        let body: CardListResponse = response
            .json()
            .await
            .map_err(|e| LookupError::Malformed(e.to_string()))?;

        tracing::debug!(results = body.data.len(), "catalog query complete");
        Ok(body.data)
    }
}

#[async_trait]
impl CardLookup for HttpCardCatalog {
    async fn search_by_details(&self, query: &MatchQuery) -> Result<Vec<CardRecord>, LookupError> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(name) = &query.name {
            params.push(("name", name.clone()));
        }
        if let Some(hp) = &query.hp {
            params.push(("hp", hp.clone()));
        }
        if let Some(number) = &query.number {
            params.push(("number", number.clone()));
        }
        self.fetch_cards(&params).await
    }

    async fn search_by_free_text(&self, text: &str) -> Result<Vec<CardRecord>, LookupError> {
        self.fetch_cards(&[("q", text.to_string())]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_config_default() {
        let config = CatalogConfig::default();
        assert!(config.base_url.starts_with("https://"));
        assert!(config.api_key.is_none());
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_catalog_client_creation() {
        let catalog = HttpCardCatalog::new(CatalogConfig::default());
        assert!(catalog.is_ok());
    }

    #[test]
    fn test_card_list_response_tolerates_missing_data() {
        let body: CardListResponse = serde_json::from_str("{}").unwrap();
        assert!(body.data.is_empty());

        let body: CardListResponse =
            serde_json::from_str(r#"{"data": [{"id": "x", "name": "Pikachu"}]}"#).unwrap();
        assert_eq!(body.data.len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_catalog_is_transport_error() {
        let catalog = HttpCardCatalog::new(CatalogConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            api_key: None,
            timeout_secs: 1,
        })
        .unwrap();
        let result = catalog
            .search_by_details(&MatchQuery {
                name: Some("Pikachu".to_string()),
                hp: None,
                number: None,
            })
            .await;
        assert!(matches!(result, Err(LookupError::Transport(_))));
    }
}
