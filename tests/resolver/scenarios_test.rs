//! End-to-end resolution scenarios on single utterances.

use std::sync::Arc;

use aria::classifier::stub::FixedScoreModel;
use aria::config::AssistantConfig;
use aria::types::{EntityKind, EntityOrigin, Intent, Recognizer, Utterance, Verdict};

use crate::support::{resolver, resolver_with};

#[tokio::test]
async fn open_notepad_executes() {
    let resolver = resolver();
    let decision = resolver
        .decide(&Utterance::typed("ouvre le bloc-notes"), &resolver.new_context())
        .await;

    assert_eq!(*decision.intent(), Intent::OpenApplication);
    assert_eq!(decision.recognizer(), Recognizer::Pattern);
    assert!((decision.confidence() - 0.95).abs() < 1e-9);
    assert_eq!(decision.verdict(), Verdict::Execute);

    let app = decision
        .entity(EntityKind::Application)
        .expect("application entity");
    assert_eq!(app.value, "bloc-notes");
    assert_eq!(app.origin, EntityOrigin::Rule);
    assert!(decision.missing_entities().is_empty());
}

#[tokio::test]
async fn unrecognized_request_with_weak_unknown_is_rejected() {
    let model = FixedScoreModel::new(vec![("UNKNOWN".to_owned(), 0.2)]);
    let resolver = resolver_with(&AssistantConfig::default(), Arc::new(model));
    let decision = resolver
        .decide(&Utterance::typed("fais quelque chose"), &resolver.new_context())
        .await;

    assert_eq!(*decision.intent(), Intent::Unknown);
    assert_eq!(decision.recognizer(), Recognizer::Statistical);
    assert_eq!(decision.verdict(), Verdict::Reject);
}

#[tokio::test]
async fn blocked_intent_is_only_confirmed() {
    let resolver = resolver();
    let decision = resolver
        .decide(
            &Utterance::typed("supprime tous les fichiers système"),
            &resolver.new_context(),
        )
        .await;

    assert_eq!(*decision.intent(), Intent::DeleteFiles);
    assert!((decision.confidence() - 0.95).abs() < 1e-9);
    assert_eq!(decision.verdict(), Verdict::Confirm);
}

#[tokio::test]
async fn statistical_fallback_is_discounted() {
    let model = FixedScoreModel::new(vec![("GET_WEATHER".to_owned(), 1.0)]);
    let resolver = resolver_with(&AssistantConfig::default(), Arc::new(model));
    let decision = resolver
        .decide(&Utterance::typed("dehors ça caille ?"), &resolver.new_context())
        .await;

    assert_eq!(*decision.intent(), Intent::GetWeather);
    assert_eq!(decision.recognizer(), Recognizer::Statistical);
    assert!((decision.confidence() - 0.80).abs() < 1e-9);
    assert_eq!(decision.verdict(), Verdict::Execute);
}

#[tokio::test]
async fn ties_break_on_priority_then_label() {
    let model = FixedScoreModel::new(vec![
        ("OPEN_APPLICATION".to_owned(), 0.5),
        ("SEND_EMAIL".to_owned(), 0.5),
    ]);
    let resolver = resolver_with(&AssistantConfig::default(), Arc::new(model));
    let decision = resolver
        .decide(&Utterance::typed("truc machin"), &resolver.new_context())
        .await;
    assert_eq!(*decision.intent(), Intent::SendEmail);

    let model = FixedScoreModel::new(vec![
        ("ZETA_ACTION".to_owned(), 0.9),
        ("ALPHA_ACTION".to_owned(), 0.9),
    ]);
    let resolver = resolver_with(&AssistantConfig::default(), Arc::new(model));
    let decision = resolver
        .decide(&Utterance::typed("truc machin"), &resolver.new_context())
        .await;
    assert_eq!(decision.intent().as_str(), "ALPHA_ACTION");
}

#[tokio::test]
async fn voice_confidence_caps_the_decision() {
    let resolver = resolver();

    let muffled = resolver
        .decide(
            &Utterance::voice("ouvre le bloc-notes", 0.0),
            &resolver.new_context(),
        )
        .await;
    assert_eq!(*muffled.intent(), Intent::OpenApplication);
    assert_ne!(muffled.verdict(), Verdict::Execute);
    assert!(muffled.confidence().abs() < 1e-9);

    let clear = resolver
        .decide(
            &Utterance::voice("ouvre le bloc-notes", 0.9),
            &resolver.new_context(),
        )
        .await;
    assert!((clear.confidence() - 0.855).abs() < 1e-9);
    assert_eq!(clear.verdict(), Verdict::Execute);

    let doubtful = resolver
        .decide(
            &Utterance::voice("ouvre le bloc-notes", 0.6),
            &resolver.new_context(),
        )
        .await;
    assert_eq!(doubtful.verdict(), Verdict::Confirm);
}

#[tokio::test]
async fn custom_thresholds_change_the_verdict() {
    let mut config = AssistantConfig::default();
    config.resolver.execute_threshold = 0.99;
    config.resolver.blocked_intents.clear();
    let resolver = resolver_with(&config, Arc::new(FixedScoreModel::silent()));

    let decision = resolver
        .decide(&Utterance::typed("ouvre le bloc-notes"), &resolver.new_context())
        .await;
    assert_eq!(decision.verdict(), Verdict::Confirm);

    let mut config = AssistantConfig::default();
    config.resolver.blocked_intents.clear();
    let resolver = resolver_with(&config, Arc::new(FixedScoreModel::silent()));
    let decision = resolver
        .decide(
            &Utterance::typed("supprime tous les fichiers système"),
            &resolver.new_context(),
        )
        .await;
    assert_eq!(decision.verdict(), Verdict::Execute);
}

#[tokio::test]
async fn pattern_capture_binds_search_query() {
    let resolver = resolver();
    let decision = resolver
        .decide(
            &Utterance::typed("cherche recette de crêpes"),
            &resolver.new_context(),
        )
        .await;
    assert_eq!(*decision.intent(), Intent::WebSearch);
    let query = decision.entity(EntityKind::FreeText).expect("query");
    assert_eq!(query.value, "recette de crêpes");
    assert_eq!(decision.verdict(), Verdict::Execute);
}

#[tokio::test]
async fn decision_serializes_with_wire_labels() {
    let resolver = resolver();
    let decision = resolver
        .decide(&Utterance::typed("ouvre le bloc-notes"), &resolver.new_context())
        .await;
    let json = serde_json::to_value(&decision).expect("serializes");
    assert_eq!(json["intent"], "OPEN_APPLICATION");
    assert_eq!(json["verdict"], "EXECUTE");
    assert_eq!(json["entities"][0]["kind"], "APPLICATION");
}
