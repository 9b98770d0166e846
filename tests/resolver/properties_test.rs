//! Invariants that hold for every decision, whatever the input.

use std::sync::Arc;

use aria::classifier::overlap::ExampleOverlapModel;
use aria::classifier::stub::FixedScoreModel;
use aria::config::AssistantConfig;
use aria::types::{Intent, Utterance, Verdict};
use aria::vocabulary::Vocabulary;

use crate::support::{at, resolver, resolver_with};

const UTTERANCES: &[&str] = &[
    "ouvre le bloc-notes",
    "Ouvre Chrome et lance Spotify",
    "envoie un mail à Paul Martin demain à 9h",
    "écris à paul@example.com sujet: budget 2025",
    "supprime C:\\temp\\rapport.docx",
    "programme une réunion lundi prochain à 10h30",
    "cherche les mails de Paul",
    "quel temps fait-il à Paris ?",
    "mets de la musique",
    "fais quelque chose",
    "",
    "   ",
    "€€€ ??? !!!",
    "annule-le",
    "oui",
];

#[tokio::test]
async fn confidence_is_a_probability_and_execute_respects_policy() {
    let config = AssistantConfig::default();
    let vocabulary = Vocabulary::builtin().expect("builtin vocabulary");
    let resolver = resolver_with(&config, Arc::new(ExampleOverlapModel::new(&vocabulary)));

    for text in UTTERANCES {
        let decision = resolver
            .decide(&Utterance::typed(*text), &resolver.new_context())
            .await;
        let confidence = decision.confidence();
        assert!((0.0..=1.0).contains(&confidence), "{text:?}: {confidence}");
        if decision.verdict() == Verdict::Execute {
            assert!(confidence >= config.resolver.execute_threshold, "{text:?}");
            assert!(!config.resolver.is_blocked(decision.intent()), "{text:?}");
            assert!(decision.missing_entities().is_empty(), "{text:?}");
        }
        let qualifies = confidence >= config.resolver.execute_threshold
            && *decision.intent() != Intent::Unknown
            && !config.resolver.is_blocked(decision.intent())
            && decision.missing_entities().is_empty();
        assert_eq!(
            decision.verdict() == Verdict::Execute,
            qualifies,
            "{text:?}: {confidence} {:?}",
            decision.verdict()
        );
    }
}

#[tokio::test]
async fn confident_complete_decisions_execute() {
    let resolver = resolver();
    let config = resolver.config().clone();
    for text in ["ouvre le bloc-notes", "cherche recette de crêpes", "bonjour"] {
        let decision = resolver
            .decide(&Utterance::typed(text), &resolver.new_context())
            .await;
        assert!(decision.confidence() >= config.execute_threshold, "{text:?}");
        assert!(decision.missing_entities().is_empty(), "{text:?}");
        assert!(!config.is_blocked(decision.intent()), "{text:?}");
        assert_eq!(decision.verdict(), Verdict::Execute, "{text:?}");
    }
}

#[tokio::test]
async fn entities_never_overlap() {
    let resolver = resolver();
    for text in UTTERANCES {
        let decision = resolver
            .decide(&Utterance::typed(*text), &resolver.new_context())
            .await;
        let spans: Vec<_> = decision.entities().iter().filter_map(|e| e.span).collect();
        for (i, a) in spans.iter().enumerate() {
            for b in spans.iter().skip(i.saturating_add(1)) {
                assert!(!a.overlaps(b), "{text:?}: {a:?} overlaps {b:?}");
            }
        }
    }
}

#[tokio::test]
async fn resolution_is_deterministic() {
    let model = FixedScoreModel::new(vec![
        ("GET_WEATHER".to_owned(), 0.6),
        ("WEB_SEARCH".to_owned(), 0.6),
    ]);
    let resolver = resolver_with(&AssistantConfig::default(), Arc::new(model));

    for text in UTTERANCES {
        let first = resolver
            .decide(&Utterance::typed(*text), &resolver.new_context())
            .await;
        let second = resolver
            .decide(&Utterance::typed(*text), &resolver.new_context())
            .await;
        assert_eq!(first.intent(), second.intent(), "{text:?}");
        assert_eq!(first.entities(), second.entities(), "{text:?}");
        assert_eq!(first.verdict(), second.verdict(), "{text:?}");
        assert!((first.confidence() - second.confidence()).abs() < f64::EPSILON);
    }
}

#[tokio::test]
async fn context_evicts_oldest_turns_first() {
    let mut config = AssistantConfig::default();
    config.context.capacity = 3;
    let resolver = resolver_with(&config, Arc::new(FixedScoreModel::silent()));
    let mut context = resolver.new_context();

    let texts = ["bonjour", "aide-moi", "mets de la musique", "monte le son", "au revoir"];
    for (i, text) in (0_i64..).zip(texts) {
        resolver
            .resolve(Utterance::typed(text).at(at(i)), &mut context)
            .await;
        assert!(context.len() <= 3);
    }

    let kept: Vec<&str> = context.turns().map(|t| t.utterance().text()).collect();
    assert_eq!(kept, vec!["au revoir", "monte le son", "mets de la musique"]);
}
