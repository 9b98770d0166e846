//! Session routing: on-demand creation, isolation and replacement.

use std::sync::Arc;

use aria::classifier::stub::FixedScoreModel;
use aria::config::AssistantConfig;
use aria::resolver::IntentResolver;
use aria::session::SessionRouter;
use aria::types::{Intent, Utterance, Verdict};
use aria::vocabulary::Vocabulary;

fn router() -> SessionRouter {
    let vocabulary = Arc::new(Vocabulary::builtin().expect("builtin vocabulary"));
    let resolver = IntentResolver::new(
        &AssistantConfig::default(),
        vocabulary,
        Some(Arc::new(FixedScoreModel::silent())),
    )
    .expect("valid resolver");
    SessionRouter::new(Arc::new(resolver))
}

async fn intent_of(router: &SessionRouter, session: &str, text: &str) -> Intent {
    router
        .submit(session, Utterance::typed(text))
        .await
        .expect("session alive")
        .into_decision()
        .expect("decided")
        .intent()
        .clone()
}

#[tokio::test]
async fn sessions_are_created_on_demand_and_isolated() {
    let router = router();
    assert_eq!(router.session_count().await, 0);

    let pending = router
        .submit("alice", Utterance::typed("supprime les fichiers temporaires"))
        .await
        .expect("session alive")
        .into_decision()
        .expect("decided");
    assert_eq!(pending.verdict(), Verdict::Confirm);

    assert_eq!(intent_of(&router, "bob", "oui").await, Intent::Unknown);
    assert_eq!(intent_of(&router, "alice", "oui").await, Intent::ConfirmYes);
    assert_eq!(router.session_count().await, 2);
}

#[tokio::test]
async fn same_id_reuses_the_running_session() {
    let router = router();
    let first = router.session("carol").await;
    let again = router.session("carol").await;
    assert_eq!(first.id(), again.id());
    assert_eq!(router.session_count().await, 1);

    first
        .submit(Utterance::typed("bonjour"))
        .await
        .expect("session alive");
    assert_eq!(again.history().await.expect("session alive").len(), 1);
}

#[tokio::test]
async fn dead_session_is_replaced_with_a_fresh_one() {
    let router = router();
    router
        .submit("dave", Utterance::typed("supprime les fichiers temporaires"))
        .await
        .expect("session alive");

    let handle = router.session("dave").await;
    handle.shutdown().await;
    for _ in 0..100 {
        if handle.is_closed() {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(handle.is_closed());

    // The replacement starts with an empty context, so "oui" binds nothing.
    assert_eq!(intent_of(&router, "dave", "oui").await, Intent::Unknown);
    assert_eq!(router.session_count().await, 1);
}

#[tokio::test]
async fn shutdown_all_forgets_every_session() {
    let router = router();
    intent_of(&router, "erin", "bonjour").await;
    intent_of(&router, "frank", "bonjour").await;
    router.shutdown_all().await;
    assert_eq!(router.session_count().await, 0);
}
