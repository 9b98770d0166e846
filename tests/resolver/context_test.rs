//! Multi-turn behaviour: references, confirmations, slot filling, ellipsis
//! and expiry.

use aria::types::{ContextRule, EntityKind, EntityOrigin, Intent, Recognizer, Utterance, Verdict};

use crate::support::{at, resolver};

#[tokio::test]
async fn cancel_it_inherits_the_event_time() {
    let resolver = resolver();
    let mut context = resolver.new_context();

    let created = resolver
        .resolve(
            Utterance::typed("Programme une réunion demain à 14h").at(at(0)),
            &mut context,
        )
        .await;
    assert_eq!(*created.intent(), Intent::CreateEvent);
    assert_eq!(created.verdict(), Verdict::Execute);
    assert_eq!(
        created.entity(EntityKind::Datetime).map(|e| e.value.as_str()),
        Some("demain 14h")
    );

    let cancelled = resolver
        .resolve(Utterance::typed("annule-le").at(at(30)), &mut context)
        .await;
    assert_eq!(*cancelled.intent(), Intent::CancelEvent);
    assert_eq!(cancelled.context_rule(), Some(ContextRule::Reference));
    assert!(cancelled.missing_entities().is_empty());
    assert_eq!(cancelled.verdict(), Verdict::Execute);

    let when = cancelled
        .entity(EntityKind::Datetime)
        .expect("inherited datetime");
    assert_eq!(when.value, "demain 14h");
    assert!(when.span.is_none());
    assert_eq!(
        when.origin,
        EntityOrigin::Context {
            turn: created.utterance_id()
        }
    );
}

#[tokio::test]
async fn reference_after_timeout_resolves_standalone() {
    let resolver = resolver();
    let mut context = resolver.new_context();

    resolver
        .resolve(
            Utterance::typed("programme une réunion demain à 14h").at(at(0)),
            &mut context,
        )
        .await;
    let late = resolver
        .resolve(Utterance::typed("annule-le").at(at(301)), &mut context)
        .await;

    assert_eq!(*late.intent(), Intent::CancelEvent);
    assert_eq!(late.context_rule(), None);
    assert!(late.entity(EntityKind::Datetime).is_none());
    assert_eq!(late.missing_entities().len(), 1);
    assert_eq!(late.verdict(), Verdict::Confirm);
    assert_eq!(context.len(), 1, "expired turns are dropped");
}

#[tokio::test]
async fn reference_skips_non_antecedent_turns() {
    let resolver = resolver();
    let mut context = resolver.new_context();

    resolver
        .resolve(
            Utterance::typed("programme une réunion lundi à 9h").at(at(0)),
            &mut context,
        )
        .await;
    resolver
        .resolve(Utterance::typed("quel temps fait-il demain").at(at(10)), &mut context)
        .await;
    let cancelled = resolver
        .resolve(Utterance::typed("annule-la").at(at(20)), &mut context)
        .await;

    assert_eq!(*cancelled.intent(), Intent::CancelEvent);
    assert_eq!(
        cancelled.entity(EntityKind::Datetime).map(|e| e.value.as_str()),
        Some("lundi 09h")
    );
}

#[tokio::test]
async fn yes_binds_to_the_pending_decision() {
    let resolver = resolver();
    let mut context = resolver.new_context();

    let pending = resolver
        .resolve(
            Utterance::typed("supprime les fichiers temporaires").at(at(0)),
            &mut context,
        )
        .await;
    assert_eq!(pending.verdict(), Verdict::Confirm);

    let yes = resolver
        .resolve(Utterance::typed("Oui, vas-y").at(at(5)), &mut context)
        .await;
    assert_eq!(*yes.intent(), Intent::ConfirmYes);
    assert_eq!(yes.recognizer(), Recognizer::Context);
    assert_eq!(yes.context_rule(), Some(ContextRule::Confirmation));
    assert_eq!(yes.pending_decision(), Some(pending.utterance_id()));
    assert_eq!(yes.verdict(), Verdict::Execute);
}

#[tokio::test]
async fn no_declines_and_unrelated_reply_does_not_bind() {
    let resolver = resolver();
    let mut context = resolver.new_context();

    let pending = resolver
        .resolve(
            Utterance::typed("supprime les fichiers temporaires").at(at(0)),
            &mut context,
        )
        .await;
    let no = resolver
        .resolve(Utterance::typed("non, laisse tomber").at(at(3)), &mut context)
        .await;
    assert_eq!(*no.intent(), Intent::ConfirmNo);
    assert_eq!(no.pending_decision(), Some(pending.utterance_id()));

    // The previous turn is now CONFIRM_NO, so a later "oui" has nothing to bind.
    let stray = resolver
        .resolve(Utterance::typed("oui").at(at(6)), &mut context)
        .await;
    assert_ne!(*stray.intent(), Intent::ConfirmYes);
    assert_eq!(stray.pending_decision(), None);
}

#[tokio::test]
async fn new_command_after_confirm_is_not_taken_as_consent() {
    let resolver = resolver();
    let mut context = resolver.new_context();

    let pending = resolver
        .resolve(
            Utterance::typed("supprime les fichiers temporaires").at(at(0)),
            &mut context,
        )
        .await;
    assert_eq!(pending.verdict(), Verdict::Confirm);

    let next = resolver
        .resolve(Utterance::typed("ok ouvre chrome").at(at(4)), &mut context)
        .await;
    assert_eq!(*next.intent(), Intent::OpenApplication);
    assert_eq!(next.recognizer(), Recognizer::Pattern);
    assert_eq!(next.pending_decision(), None);
    assert_eq!(next.context_rule(), None);
    assert_eq!(next.verdict(), Verdict::Execute);
}

#[tokio::test]
async fn yes_without_pending_confirmation_is_rejected() {
    let resolver = resolver();
    let mut context = resolver.new_context();
    let decision = resolver
        .resolve(Utterance::typed("oui").at(at(0)), &mut context)
        .await;
    assert_eq!(*decision.intent(), Intent::Unknown);
    assert_eq!(decision.verdict(), Verdict::Reject);
}

#[tokio::test]
async fn short_answer_fills_the_missing_slot() {
    let resolver = resolver();
    let mut context = resolver.new_context();

    let incomplete = resolver
        .resolve(Utterance::typed("envoie un mail").at(at(0)), &mut context)
        .await;
    assert_eq!(*incomplete.intent(), Intent::SendEmail);
    assert_eq!(incomplete.verdict(), Verdict::Confirm);

    let filled = resolver
        .resolve(Utterance::typed("à Marie").at(at(4)), &mut context)
        .await;
    assert_eq!(*filled.intent(), Intent::SendEmail);
    assert_eq!(filled.context_rule(), Some(ContextRule::SlotFilling));
    assert_eq!(
        filled.entity(EntityKind::Contact).map(|e| e.value.as_str()),
        Some("Marie")
    );
    assert!(filled.missing_entities().is_empty());
    assert!((filled.confidence() - 0.85).abs() < 1e-9);
    assert_eq!(filled.verdict(), Verdict::Execute);
}

#[tokio::test]
async fn elliptical_follow_up_reuses_previous_intent() {
    let resolver = resolver();
    let mut context = resolver.new_context();

    let first = resolver
        .resolve(Utterance::typed("quel temps fait-il demain").at(at(0)), &mut context)
        .await;
    assert_eq!(*first.intent(), Intent::GetWeather);

    let follow_up = resolver
        .resolve(Utterance::typed("Et samedi ?").at(at(8)), &mut context)
        .await;
    assert_eq!(*follow_up.intent(), Intent::GetWeather);
    assert_eq!(follow_up.context_rule(), Some(ContextRule::Ellipsis));
    assert_eq!(follow_up.recognizer(), Recognizer::Context);
    assert_eq!(
        follow_up.entity(EntityKind::Datetime).map(|e| e.value.as_str()),
        Some("samedi")
    );
}

#[tokio::test]
async fn sessions_do_not_share_context() {
    let resolver = resolver();
    let mut alice = resolver.new_context();
    let mut bob = resolver.new_context();

    resolver
        .resolve(
            Utterance::typed("programme une réunion demain à 14h").at(at(0)),
            &mut alice,
        )
        .await;
    let cancelled = resolver
        .resolve(Utterance::typed("annule-le").at(at(10)), &mut bob)
        .await;
    assert!(cancelled.entity(EntityKind::Datetime).is_none());
    assert_eq!(alice.len(), 1);
    assert_eq!(bob.len(), 1);
}
