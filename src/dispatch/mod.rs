//! Downstream action dispatch.
//!
//! The core emits [`Decision`]s; an [`ActionDispatcher`] turns them into
//! effects. Dispatchers own the confirmation round-trip: a `CONFIRM`
//! decision is parked until a `CONFIRM_YES`/`CONFIRM_NO` decision
//! referencing it arrives.

pub mod confirmation;

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::types::{Decision, EntityKind, Intent, Verdict};

use self::confirmation::{ConfirmationLedger, ConfirmationResult};

/// What a dispatcher did with a decision.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The action was carried out.
    Executed {
        /// Intent carried out.
        intent: Intent,
    },
    /// The action waits for a yes/no from the user.
    AwaitingConfirmation {
        /// Id a confirmation reply must reference.
        pending: Uuid,
        /// Intent waiting.
        intent: Intent,
    },
    /// The decision was rejected; nothing happened.
    Rejected,
    /// A pending action was confirmed and carried out.
    Confirmed {
        /// Intent carried out.
        intent: Intent,
    },
    /// A pending action was declined.
    Cancelled {
        /// Intent dropped.
        intent: Intent,
    },
    /// The confirmation came after the pending action expired.
    Expired,
    /// The reply referenced nothing pending.
    NotFound,
}

/// Dispatch failures.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No handler is registered for the intent.
    #[error("no handler for intent {0}")]
    Unsupported(String),

    /// The handler ran and failed.
    #[error("dispatch of {intent} failed: {reason}")]
    Failed {
        /// Intent being carried out.
        intent: String,
        /// Handler-reported cause.
        reason: String,
    },
}

/// Maps decisions to effects.
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    /// Act on a decision according to its verdict.
    async fn dispatch(&self, decision: &Decision) -> Result<DispatchOutcome, DispatchError>;
}

// ---------------------------------------------------------------------------
// Dry-run dispatcher
// ---------------------------------------------------------------------------

/// Dispatcher that logs what it would do and records executed decisions.
///
/// Used by the CLI and tests; real automation plugs in through
/// [`ActionDispatcher`].
#[derive(Debug)]
pub struct DryRunDispatcher {
    ledger: ConfirmationLedger,
    executed: Mutex<Vec<Decision>>,
}

impl DryRunDispatcher {
    /// Dispatcher whose pending confirmations expire after `ttl`.
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            ledger: ConfirmationLedger::new(ttl),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Decisions carried out so far, in order.
    pub fn executed(&self) -> Vec<Decision> {
        self.executed
            .lock()
            .map(|list| list.clone())
            .unwrap_or_default()
    }

    /// Number of decisions waiting for confirmation.
    pub fn pending_count(&self) -> usize {
        self.ledger.pending_count()
    }

    fn execute(&self, decision: &Decision) {
        let target = decision
            .entity(EntityKind::Application)
            .and_then(|e| e.reference.as_deref())
            .unwrap_or("-");
        info!(
            intent = %decision.intent(),
            target,
            entities = decision.entities().len(),
            "dry-run: executing"
        );
        if let Ok(mut list) = self.executed.lock() {
            list.push(decision.clone());
        }
    }

    fn answer(&self, pending: Uuid, approved: bool) -> DispatchOutcome {
        let now = Utc::now();
        let result = self.ledger.resolve(pending, approved, now);
        self.ledger.gc_expired(now);
        match result {
            ConfirmationResult::Approved(original) => {
                self.execute(&original);
                DispatchOutcome::Confirmed {
                    intent: original.intent().clone(),
                }
            }
            ConfirmationResult::Denied(original) => {
                info!(intent = %original.intent(), "dry-run: cancelled by user");
                DispatchOutcome::Cancelled {
                    intent: original.intent().clone(),
                }
            }
            ConfirmationResult::Expired => DispatchOutcome::Expired,
            ConfirmationResult::NotFound => {
                debug!(pending = %pending, "confirmation reply with nothing pending");
                DispatchOutcome::NotFound
            }
        }
    }
}

#[async_trait]
impl ActionDispatcher for DryRunDispatcher {
    async fn dispatch(&self, decision: &Decision) -> Result<DispatchOutcome, DispatchError> {
        if decision.verdict() == Verdict::Reject {
            debug!(intent = %decision.intent(), "dry-run: rejected");
            return Ok(DispatchOutcome::Rejected);
        }

        let reply = match decision.intent() {
            Intent::ConfirmYes => Some(true),
            Intent::ConfirmNo => Some(false),
            _ => None,
        };
        if let Some(approved) = reply {
            return Ok(match decision.pending_decision() {
                Some(pending) => self.answer(pending, approved),
                None => DispatchOutcome::NotFound,
            });
        }

        match decision.verdict() {
            Verdict::Execute => {
                self.execute(decision);
                Ok(DispatchOutcome::Executed {
                    intent: decision.intent().clone(),
                })
            }
            Verdict::Confirm => {
                let pending = self.ledger.request(decision.clone(), Utc::now());
                info!(intent = %decision.intent(), pending = %pending, "dry-run: awaiting confirmation");
                Ok(DispatchOutcome::AwaitingConfirmation {
                    pending,
                    intent: decision.intent().clone(),
                })
            }
            Verdict::Reject => Ok(DispatchOutcome::Rejected),
        }
    }
}
