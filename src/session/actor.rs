//! Per-session actor: owns one [`ConversationContext`] and serializes
//! every write to it.
//!
//! Resolution of a turn races the session inbox. When a newer utterance
//! arrives first, the in-flight resolution is dropped before it can touch
//! the context and its requester receives [`Resolution::Superseded`]. The
//! context therefore only ever records complete turns, in arrival order.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::context::ConversationContext;
use crate::resolver::IntentResolver;
use crate::types::{ConversationTurn, Decision, Utterance};

/// Outcome of a submitted utterance.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The utterance was resolved and recorded.
    Decided(Decision),
    /// A newer utterance on the same session arrived before this one was
    /// resolved; nothing was recorded for it.
    Superseded,
}

impl Resolution {
    /// The decision, unless superseded.
    pub fn decision(&self) -> Option<&Decision> {
        match self {
            Self::Decided(decision) => Some(decision),
            Self::Superseded => None,
        }
    }

    /// Consume into the decision, unless superseded.
    pub fn into_decision(self) -> Option<Decision> {
        match self {
            Self::Decided(decision) => Some(decision),
            Self::Superseded => None,
        }
    }
}

/// Messages accepted by a session actor.
#[derive(Debug)]
pub(crate) enum SessionEvent {
    /// Resolve an utterance and reply with the outcome.
    Utterance {
        utterance: Utterance,
        reply: oneshot::Sender<Resolution>,
    },
    /// Copy of the recorded turns, most recent first.
    Snapshot(oneshot::Sender<Vec<ConversationTurn>>),
    /// Forget the conversation.
    Reset,
    /// Stop the actor.
    Shutdown,
}

enum Turn {
    Decided(Decision),
    Interrupted(SessionEvent),
}

/// Run a session until shutdown or until every handle is dropped.
pub(crate) async fn run_session(
    session_id: String,
    resolver: Arc<IntentResolver>,
    mut inbox: mpsc::Receiver<SessionEvent>,
) {
    info!(session_id = %session_id, "session started");
    let mut context = resolver.new_context();
    let mut queued: Option<SessionEvent> = None;

    loop {
        let event = match queued.take() {
            Some(event) => event,
            None => match inbox.recv().await {
                Some(event) => event,
                None => break,
            },
        };

        match event {
            SessionEvent::Utterance { utterance, reply } => {
                context.expire_if_stale(utterance.timestamp());

                let turn = {
                    let decide = resolver.decide(&utterance, &context);
                    tokio::pin!(decide);
                    loop {
                        tokio::select! {
                            decision = &mut decide => break Turn::Decided(decision),
                            Some(next) = inbox.recv() => match next {
                                SessionEvent::Snapshot(tx) => {
                                    let _ = tx.send(snapshot(&context));
                                }
                                other => break Turn::Interrupted(other),
                            },
                        }
                    }
                };

                match turn {
                    Turn::Decided(decision) => {
                        context.record(ConversationTurn::new(utterance, decision.clone()));
                        if reply.send(Resolution::Decided(decision)).is_err() {
                            debug!(session_id = %session_id, "requester went away before reply");
                        }
                    }
                    Turn::Interrupted(next) => {
                        debug!(
                            session_id = %session_id,
                            utterance = %utterance.id(),
                            "resolution superseded by newer event"
                        );
                        let _ = reply.send(Resolution::Superseded);
                        queued = Some(next);
                    }
                }
            }
            SessionEvent::Snapshot(tx) => {
                let _ = tx.send(snapshot(&context));
            }
            SessionEvent::Reset => {
                debug!(session_id = %session_id, turns = context.len(), "session reset");
                context.clear();
            }
            SessionEvent::Shutdown => {
                info!(session_id = %session_id, "session shutting down");
                break;
            }
        }
    }
    debug!(session_id = %session_id, "session stopped");
}

fn snapshot(context: &ConversationContext) -> Vec<ConversationTurn> {
    context.turns().cloned().collect()
}
