//! Last-utterance-wins: a newer utterance abandons the one in flight.

use std::sync::Arc;
use std::time::Duration;

use aria::classifier::stub::FixedScoreModel;
use aria::config::AssistantConfig;
use aria::resolver::IntentResolver;
use aria::session::{Resolution, SessionHandle};
use aria::types::{Intent, Utterance};
use aria::vocabulary::Vocabulary;

fn slow_resolver() -> Arc<IntentResolver> {
    let model = FixedScoreModel::new(vec![("GET_WEATHER".to_owned(), 0.9)])
        .with_delay(Duration::from_millis(500));
    let vocabulary = Arc::new(Vocabulary::builtin().expect("builtin vocabulary"));
    Arc::new(
        IntentResolver::new(&AssistantConfig::default(), vocabulary, Some(Arc::new(model)))
            .expect("valid resolver"),
    )
}

#[tokio::test(start_paused = true)]
async fn newer_utterance_supersedes_in_flight_resolution() {
    let session = SessionHandle::spawn("supersede", slow_resolver());

    // No pattern matches, so this waits on the slow classifier.
    let first = {
        let session = session.clone();
        tokio::spawn(async move { session.submit(Utterance::typed("dehors ça caille")).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Pattern match; the classifier is not consulted.
    let second = session
        .submit(Utterance::typed("bonjour"))
        .await
        .expect("session alive");

    let first = first.await.expect("task joined").expect("session alive");
    assert_eq!(first, Resolution::Superseded);

    let decision = second.into_decision().expect("decided");
    assert_eq!(*decision.intent(), Intent::Greeting);

    let history = session.history().await.expect("session alive");
    assert_eq!(history.len(), 1, "superseded turn is never recorded");
    assert_eq!(history[0].utterance().text(), "bonjour");
}

#[tokio::test(start_paused = true)]
async fn uncontested_slow_resolution_completes() {
    let session = SessionHandle::spawn("patient", slow_resolver());
    let resolution = session
        .submit(Utterance::typed("dehors ça caille"))
        .await
        .expect("session alive");
    let decision = resolution.decision().expect("decided");
    assert_eq!(*decision.intent(), Intent::GetWeather);
    assert_eq!(session.history().await.expect("session alive").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn history_is_served_while_resolving() {
    let session = SessionHandle::spawn("snapshot", slow_resolver());
    session
        .submit(Utterance::typed("bonjour"))
        .await
        .expect("session alive");

    let pending = {
        let session = session.clone();
        tokio::spawn(async move { session.submit(Utterance::typed("dehors ça caille")).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let history = session.history().await.expect("session alive");
    assert_eq!(history.len(), 1);

    let resolution = pending.await.expect("task joined").expect("session alive");
    assert!(resolution.decision().is_some(), "a snapshot does not supersede");
    assert_eq!(session.history().await.expect("session alive").len(), 2);
}

#[tokio::test(start_paused = true)]
async fn reset_supersedes_and_clears() {
    let session = SessionHandle::spawn("reset", slow_resolver());
    session
        .submit(Utterance::typed("bonjour"))
        .await
        .expect("session alive");

    let pending = {
        let session = session.clone();
        tokio::spawn(async move { session.submit(Utterance::typed("dehors ça caille")).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    session.reset().await.expect("session alive");

    let resolution = pending.await.expect("task joined").expect("session alive");
    assert_eq!(resolution, Resolution::Superseded);
    assert!(session.history().await.expect("session alive").is_empty());
}
