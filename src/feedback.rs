//! Feedback recording for persisted chat turns.
//!
//! Ratings and comments are idempotent against the in-memory state and
//! fire-and-forget against the store: a store failure is reported in the
//! outcome and logged for operators, never surfaced as a chat error.

use crate::store::{Rating, TurnStore};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of a feedback operation.
///
/// Per turn, the reachable states are `unrated`, `rated(up)`, `rated(down)`
/// and `rated(down, commented)`. An opposite rating overwrites the stored
/// value; nothing removes a rating or comment once set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackOutcome {
    /// State changed; fire the visible confirmation exactly once. Carries the
    /// store error when persistence failed (operator-facing only).
    Confirmed { store_error: Option<String> },
    /// No externally visible effect (repeated rating, empty or unchanged
    /// comment, comment without a negative rating).
    Unchanged,
}

impl FeedbackOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, FeedbackOutcome::Confirmed { .. })
    }
}

/// Records feedback for one session's turns.
pub struct FeedbackRecorder {
    store: Arc<dyn TurnStore>,
    ratings: HashMap<i64, Rating>,
    comments: HashMap<i64, String>,
}

impl FeedbackRecorder {
    pub fn new(store: Arc<dyn TurnStore>) -> Self {
        Self {
            store,
            ratings: HashMap::new(),
            comments: HashMap::new(),
        }
    }

    /// Current in-memory rating for a turn.
    pub fn rating(&self, turn_id: i64) -> Option<Rating> {
        self.ratings.get(&turn_id).copied()
    }

    /// Attach or overwrite a rating. Repeated calls with the same rating are
    /// no-ops; a changed rating confirms exactly once.
    pub async fn set_rating(&mut self, turn_id: i64, rating: Rating) -> FeedbackOutcome {
        if self.ratings.get(&turn_id) == Some(&rating) {
            debug!("Rating for turn {} unchanged", turn_id);
            return FeedbackOutcome::Unchanged;
        }

        self.ratings.insert(turn_id, rating);

        let store_error = match self.store.set_rating(turn_id, rating).await {
            Ok(()) => None,
            Err(e) => {
                warn!("Rating update for turn {} failed: {}", turn_id, e);
                Some(e.to_string())
            }
        };

        FeedbackOutcome::Confirmed { store_error }
    }

    /// Attach a free-text comment. Only meaningful while the stored rating is
    /// negative; empty or unchanged text is a no-op.
    pub async fn set_comment(&mut self, turn_id: i64, text: &str) -> FeedbackOutcome {
        let text = text.trim();
        if text.is_empty() {
            return FeedbackOutcome::Unchanged;
        }
        if self.ratings.get(&turn_id) != Some(&Rating::Down) {
            debug!("Ignoring comment for turn {} without negative rating", turn_id);
            return FeedbackOutcome::Unchanged;
        }
        if self.comments.get(&turn_id).map(String::as_str) == Some(text) {
            return FeedbackOutcome::Unchanged;
        }

        self.comments.insert(turn_id, text.to_string());

        let store_error = match self.store.set_comment(turn_id, text).await {
            Ok(()) => None,
            Err(e) => {
                warn!("Comment update for turn {} failed: {}", turn_id, e);
                Some(e.to_string())
            }
        };

        FeedbackOutcome::Confirmed { store_error }
    }
}
