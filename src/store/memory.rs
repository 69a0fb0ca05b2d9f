//! In-memory turn store implementation.
//!
//! Useful for testing the turn and feedback flows without a backend.

use super::{Rating, TurnRecord, TurnStore};
use crate::error::{AulaError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// In-memory turn store.
pub struct MemoryTurnStore {
    rows: RwLock<Vec<TurnRecord>>,
    failing: AtomicBool,
}

impl MemoryTurnStore {
    /// Create a new in-memory turn store.
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every subsequent operation fail, to exercise error paths.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of all stored rows.
    pub fn rows(&self) -> Vec<TurnRecord> {
        self.rows.read().unwrap().clone()
    }

    /// Fetch one row by its assigned id.
    pub fn get(&self, id: i64) -> Option<TurnRecord> {
        self.rows
            .read()
            .unwrap()
            .iter()
            .find(|r| r.id == Some(id))
            .cloned()
    }

    fn check_failing(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AulaError::Store("simulated store failure".to_string()));
        }
        Ok(())
    }
}

impl Default for MemoryTurnStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TurnStore for MemoryTurnStore {
    async fn insert_turn(&self, record: &TurnRecord) -> Result<i64> {
        self.check_failing()?;
        let mut rows = self.rows.write().unwrap();
        let id = rows.len() as i64 + 1;
        let mut stored = record.clone();
        stored.id = Some(id);
        rows.push(stored);
        Ok(id)
    }

    async fn set_rating(&self, id: i64, rating: Rating) -> Result<()> {
        self.check_failing()?;
        let mut rows = self.rows.write().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| r.id == Some(id))
            .ok_or_else(|| AulaError::Store(format!("No turn with id {}", id)))?;
        row.feedback = Some(rating);
        Ok(())
    }

    async fn set_comment(&self, id: i64, text: &str) -> Result<()> {
        self.check_failing()?;
        let mut rows = self.rows.write().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| r.id == Some(id))
            .ok_or_else(|| AulaError::Store(format!("No turn with id {}", id)))?;
        row.feedback_text = Some(text.to_string());
        Ok(())
    }
}
