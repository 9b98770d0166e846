//! Ledger of decisions waiting for a yes/no from the user.
//!
//! A `CONFIRM` decision is parked here under its utterance id. A later
//! confirmation reply carries that id as its pending decision and resolves
//! the entry exactly once.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use crate::types::Decision;

/// A decision parked until the user answers.
#[derive(Debug, Clone)]
pub struct PendingConfirmation {
    /// The decision awaiting an answer.
    pub decision: Decision,
    /// When it was parked.
    pub created_at: DateTime<Utc>,
    /// When it stops being answerable.
    pub expires_at: DateTime<Utc>,
}

/// Result of answering a pending confirmation.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmationResult {
    /// The user agreed; the decision may be carried out.
    Approved(Decision),
    /// The user declined.
    Denied(Decision),
    /// The answer came too late.
    Expired,
    /// Nothing is pending under that id.
    NotFound,
}

/// Pending confirmations keyed by utterance id.
///
/// Uses a sync [`Mutex`]; no lock is held across an await.
#[derive(Debug)]
pub struct ConfirmationLedger {
    pending: Mutex<HashMap<Uuid, PendingConfirmation>>,
    ttl: TimeDelta,
}

impl ConfirmationLedger {
    /// Empty ledger whose entries expire after `ttl`.
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Park a decision. Returns the id a reply must reference.
    pub fn request(&self, decision: Decision, now: DateTime<Utc>) -> Uuid {
        let id = decision.utterance_id();
        let expires_at = now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        let entry = PendingConfirmation {
            decision,
            created_at: now,
            expires_at,
        };
        if let Ok(mut map) = self.pending.lock() {
            map.insert(id, entry);
        }
        id
    }

    /// Answer a pending confirmation. The entry is consumed whatever the
    /// outcome.
    pub fn resolve(&self, id: Uuid, approved: bool, now: DateTime<Utc>) -> ConfirmationResult {
        let Ok(mut map) = self.pending.lock() else {
            return ConfirmationResult::NotFound;
        };
        let Some(entry) = map.remove(&id) else {
            return ConfirmationResult::NotFound;
        };
        if now > entry.expires_at {
            return ConfirmationResult::Expired;
        }
        if approved {
            ConfirmationResult::Approved(entry.decision)
        } else {
            ConfirmationResult::Denied(entry.decision)
        }
    }

    /// Drop every entry that expired before `now`.
    pub fn gc_expired(&self, now: DateTime<Utc>) {
        if let Ok(mut map) = self.pending.lock() {
            map.retain(|_, v| v.expires_at >= now);
        }
    }

    /// Number of parked decisions.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|map| map.len()).unwrap_or(0)
    }
}
