//! Dry-run dispatcher: verdict handling and the confirmation round-trip.

use std::sync::Arc;
use std::time::Duration;

use aria::classifier::stub::FixedScoreModel;
use aria::config::AssistantConfig;
use aria::context::ConversationContext;
use aria::dispatch::{ActionDispatcher, DispatchOutcome, DryRunDispatcher};
use aria::resolver::IntentResolver;
use aria::types::{Decision, Intent, Utterance, Verdict};
use aria::vocabulary::Vocabulary;

fn resolver() -> IntentResolver {
    let vocabulary = Arc::new(Vocabulary::builtin().expect("builtin vocabulary"));
    IntentResolver::new(
        &AssistantConfig::default(),
        vocabulary,
        Some(Arc::new(FixedScoreModel::silent())),
    )
    .expect("valid resolver")
}

async fn say(resolver: &IntentResolver, context: &mut ConversationContext, text: &str) -> Decision {
    resolver.resolve(Utterance::typed(text), context).await
}

#[tokio::test]
async fn execute_verdict_runs_immediately() {
    let resolver = resolver();
    let mut context = resolver.new_context();
    let dispatcher = DryRunDispatcher::new(Duration::from_secs(300));

    let decision = say(&resolver, &mut context, "ouvre le bloc-notes").await;
    let outcome = dispatcher.dispatch(&decision).await.expect("dispatch");

    assert_eq!(
        outcome,
        DispatchOutcome::Executed {
            intent: Intent::OpenApplication
        }
    );
    assert_eq!(dispatcher.executed().len(), 1);
    assert_eq!(dispatcher.pending_count(), 0);
}

#[tokio::test]
async fn confirmed_action_runs_after_yes() {
    let resolver = resolver();
    let mut context = resolver.new_context();
    let dispatcher = DryRunDispatcher::new(Duration::from_secs(300));

    let risky = say(&resolver, &mut context, "supprime les fichiers temporaires").await;
    assert_eq!(risky.verdict(), Verdict::Confirm);
    let parked = dispatcher.dispatch(&risky).await.expect("dispatch");
    assert_eq!(
        parked,
        DispatchOutcome::AwaitingConfirmation {
            pending: risky.utterance_id(),
            intent: Intent::DeleteFiles,
        }
    );
    assert!(dispatcher.executed().is_empty());
    assert_eq!(dispatcher.pending_count(), 1);

    let yes = say(&resolver, &mut context, "oui").await;
    let outcome = dispatcher.dispatch(&yes).await.expect("dispatch");
    assert_eq!(
        outcome,
        DispatchOutcome::Confirmed {
            intent: Intent::DeleteFiles
        }
    );

    let executed = dispatcher.executed();
    assert_eq!(executed.len(), 1);
    assert_eq!(*executed[0].intent(), Intent::DeleteFiles);
    assert_eq!(dispatcher.pending_count(), 0);

    // The pending entry is single-use.
    let replay = dispatcher.dispatch(&yes).await.expect("dispatch");
    assert_eq!(replay, DispatchOutcome::NotFound);
}

#[tokio::test]
async fn declined_action_is_cancelled() {
    let resolver = resolver();
    let mut context = resolver.new_context();
    let dispatcher = DryRunDispatcher::new(Duration::from_secs(300));

    let risky = say(&resolver, &mut context, "supprime les fichiers temporaires").await;
    dispatcher.dispatch(&risky).await.expect("dispatch");

    let no = say(&resolver, &mut context, "non").await;
    let outcome = dispatcher.dispatch(&no).await.expect("dispatch");
    assert_eq!(
        outcome,
        DispatchOutcome::Cancelled {
            intent: Intent::DeleteFiles
        }
    );
    assert!(dispatcher.executed().is_empty());
}

#[tokio::test]
async fn rejected_decision_does_nothing() {
    let resolver = resolver();
    let dispatcher = DryRunDispatcher::new(Duration::from_secs(300));

    let decision = resolver
        .decide(&Utterance::typed("fais quelque chose"), &resolver.new_context())
        .await;
    assert_eq!(decision.verdict(), Verdict::Reject);
    let outcome = dispatcher.dispatch(&decision).await.expect("dispatch");
    assert_eq!(outcome, DispatchOutcome::Rejected);
    assert!(dispatcher.executed().is_empty());
}

#[tokio::test]
async fn yes_for_an_undispatched_confirmation_finds_nothing() {
    let resolver = resolver();
    let mut context = resolver.new_context();
    let dispatcher = DryRunDispatcher::new(Duration::from_secs(300));

    say(&resolver, &mut context, "supprime les fichiers temporaires").await;
    let yes = say(&resolver, &mut context, "oui").await;
    assert_eq!(*yes.intent(), Intent::ConfirmYes);

    let outcome = dispatcher.dispatch(&yes).await.expect("dispatch");
    assert_eq!(outcome, DispatchOutcome::NotFound);
    assert!(dispatcher.executed().is_empty());
}

#[tokio::test]
async fn late_yes_reports_expired() {
    let resolver = resolver();
    let mut context = resolver.new_context();
    let dispatcher = DryRunDispatcher::new(Duration::from_millis(1));

    let risky = say(&resolver, &mut context, "supprime les fichiers temporaires").await;
    dispatcher.dispatch(&risky).await.expect("dispatch");
    tokio::time::sleep(Duration::from_millis(20)).await;

    let yes = say(&resolver, &mut context, "oui").await;
    assert_eq!(yes.pending_decision(), Some(risky.utterance_id()));
    let outcome = dispatcher.dispatch(&yes).await.expect("dispatch");
    assert_eq!(outcome, DispatchOutcome::Expired);
    assert!(dispatcher.executed().is_empty());
    assert_eq!(dispatcher.pending_count(), 0);
}
