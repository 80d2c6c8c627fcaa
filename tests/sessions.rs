use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

use faqmatch::{EntryDraft, IntentResolver, KnowledgeStore, ResponseComposer, Role, SessionManager};

fn manager(delay_ms: u64) -> Arc<SessionManager> {
    let mut store = KnowledgeStore::new();
    store
        .add(EntryDraft::new("what are your business hours", "Mon-Fri 9-5").category("hours"))
        .unwrap();
    store
        .add(EntryDraft::new("refund policy", "30 days").category("billing"))
        .unwrap();
    Arc::new(
        SessionManager::new(
            Arc::new(RwLock::new(store)),
            IntentResolver::default(),
            ResponseComposer::default(),
        )
        .with_response_delay(Duration::from_millis(delay_ms)),
    )
}

#[tokio::test]
async fn queued_turns_keep_submission_order() {
    let mgr = manager(20);
    let id = Some("conv".to_string());
    let (a, b, c) = tokio::join!(
        mgr.turn(id.clone(), "what are your business hours"),
        mgr.turn(id.clone(), "refund policy"),
        mgr.turn(id.clone(), "asdf"),
    );
    assert_eq!(a.response.intent, "kb-1");
    assert_eq!(b.response.intent, "kb-2");
    assert_eq!(c.response.intent, "unknown");

    let history = mgr.history("conv").await.unwrap();
    let contents: Vec<(Role, &str)> = history
        .recent_messages
        .iter()
        .map(|m| (m.role, m.content.as_str()))
        .collect();
    assert_eq!(
        contents,
        vec![
            (Role::User, "what are your business hours"),
            (Role::Assistant, "Mon-Fri 9-5"),
            (Role::User, "refund policy"),
            (Role::Assistant, "30 days"),
            (Role::User, "asdf"),
            (Role::Assistant, history.recent_messages[5].content.as_str()),
        ]
    );
    assert_eq!(history.identified_intents, vec!["kb-1", "kb-2", "unknown"]);
}

#[tokio::test]
async fn conversations_are_independent() {
    let mgr = manager(0);
    mgr.turn(Some("a".to_string()), "what are your business hours").await;
    mgr.turn(Some("b".to_string()), "refund policy").await;

    let a = mgr.history("a").await.unwrap();
    let b = mgr.history("b").await.unwrap();
    assert_eq!(a.identified_intents, vec!["kb-1"]);
    assert_eq!(b.identified_intents, vec!["kb-2"]);
    assert_eq!(a.last_topic.as_deref(), Some("hours"));
    assert_eq!(b.last_topic.as_deref(), Some("billing"));
}

#[tokio::test]
async fn spawned_turns_across_conversations() {
    let mgr = manager(5);
    let mut handles = Vec::new();
    for i in 0..8 {
        let mgr = Arc::clone(&mgr);
        handles.push(tokio::spawn(async move {
            mgr.turn(Some(format!("conv-{}", i)), "refund policy").await
        }));
    }
    for handle in handles {
        let turn = handle.await.unwrap();
        assert_eq!(turn.response.text, "30 days");
    }
    assert_eq!(mgr.active_conversations(), 8);
}
