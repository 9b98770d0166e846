//! Verdict policy: maps a final confidence to EXECUTE, CONFIRM or REJECT.
//!
//! The gate is monotone in confidence. Intents listed as blocked in
//! configuration are never executed directly; they are at best confirmed.

use crate::config::ResolverConfig;
use crate::types::{EntityRequirement, Intent, Verdict};

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// Decide the verdict for a resolved intent.
///
/// - `EXECUTE` needs `confidence >= execute_threshold`, every requirement
///   met, a non-zero confidence and a known intent.
/// - `CONFIRM` needs `confidence >= confirm_threshold`.
/// - Everything else, and `UNKNOWN` always, is `REJECT`.
pub fn verdict(
    config: &ResolverConfig,
    intent: &Intent,
    confidence: f64,
    missing: &[EntityRequirement],
) -> Verdict {
    if *intent == Intent::Unknown || confidence <= 0.0 {
        return Verdict::Reject;
    }
    if confidence >= config.execute_threshold && missing.is_empty() {
        if config.is_blocked(intent) {
            tracing::debug!(intent = %intent, "blocked intent downgraded to confirm");
            return Verdict::Confirm;
        }
        return Verdict::Execute;
    }
    if confidence >= config.confirm_threshold {
        Verdict::Confirm
    } else {
        Verdict::Reject
    }
}

/// Confidence cap applied to candidates with unmet requirements, so that an
/// incomplete command can be confirmed but never executed.
pub fn incomplete_cap(config: &ResolverConfig, confidence: f64) -> f64 {
    confidence.min(config.confirm_threshold)
}
