//! Supabase (PostgREST) turn store implementation.
//!
//! Inserts use `Prefer: return=representation` so the generated row id can be
//! read back from the response body.

use super::{Rating, TurnRecord, TurnStore};
use crate::error::{AulaError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Default timeout for store requests.
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Supabase-backed turn store.
pub struct RestTurnStore {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    table: String,
}

impl RestTurnStore {
    /// Create a store for a Supabase project.
    pub fn new(base_url: &str, api_key: &str, table: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            table: table.to_string(),
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn row_url(&self, id: i64) -> String {
        format!("{}?id=eq.{}", self.table_url(), id)
    }

    async fn patch(&self, id: i64, body: serde_json::Value) -> Result<()> {
        let response = self
            .http
            .patch(self.row_url(id))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AulaError::Store(format!(
                "Update for turn {} failed with status {}",
                id,
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TurnStore for RestTurnStore {
    #[instrument(skip(self, record), fields(session = %record.session_id))]
    async fn insert_turn(&self, record: &TurnRecord) -> Result<i64> {
        let response = self
            .http
            .post(self.table_url())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=representation")
            .json(record)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AulaError::Store(format!(
                "Insert failed with status {}",
                response.status()
            )));
        }

        let rows: Vec<serde_json::Value> = response.json().await?;
        let id = rows
            .first()
            .and_then(|row| row.get("id"))
            .and_then(|id| id.as_i64())
            .ok_or_else(|| AulaError::Store("Insert response carried no id".to_string()))?;

        debug!("Inserted turn with id {}", id);
        Ok(id)
    }

    async fn set_rating(&self, id: i64, rating: Rating) -> Result<()> {
        self.patch(id, serde_json::json!({ "feedback": rating.as_str() }))
            .await
    }

    async fn set_comment(&self, id: i64, text: &str) -> Result<()> {
        self.patch(id, serde_json::json!({ "feedback_text": text }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let store = RestTurnStore::new(
            "https://example.supabase.co/",
            "key",
            "interacciones_investigacion",
        )
        .unwrap();
        assert_eq!(
            store.table_url(),
            "https://example.supabase.co/rest/v1/interacciones_investigacion"
        );
        assert_eq!(
            store.row_url(42),
            "https://example.supabase.co/rest/v1/interacciones_investigacion?id=eq.42"
        );
    }
}
