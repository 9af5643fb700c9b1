use async_trait::async_trait;
use flowchat_core::completion::fallback;
use flowchat_core::conversation::resolve_thread;
use flowchat_core::merge::{can_merge, effective_merge_count};
use flowchat_core::timeline::visible_count;
use flowchat_core::{
    CompletionError, CompletionService, Conversation, ConversationView, MergeEngine, MessageId,
    MessageRole, Selection,
};
use std::sync::atomic::{AtomicUsize, Ordering};

struct FailingService {
    calls: AtomicUsize,
}

#[async_trait]
impl CompletionService for FailingService {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CompletionError::Status {
            status_code: 502,
            message: "bad gateway".to_string(),
            is_retryable: true,
        })
    }
}

struct EchoService;

#[async_trait]
impl CompletionService for EchoService {
    fn name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        Ok(format!("synthesis of {} chars", prompt.len()))
    }
}

/// root -> (a -> a2), (b)
fn branching() -> (Conversation, [MessageId; 4]) {
    let mut conversation = Conversation::new("props");
    let root = conversation
        .add_message(None, MessageRole::User, "Where should we go?")
        .unwrap()
        .id;
    let a = conversation
        .add_message(Some(&root), MessageRole::Assistant, "The mountains.")
        .unwrap()
        .id;
    let b = conversation
        .add_message(Some(&root), MessageRole::Assistant, "The coast.")
        .unwrap()
        .id;
    let a2 = conversation
        .add_message(Some(&a), MessageRole::User, "Which ones?")
        .unwrap()
        .id;
    (conversation, [root, a, b, a2])
}

#[test]
fn root_thread_contains_only_root() {
    let (conversation, [root, ..]) = branching();
    let root_id = conversation.root_id().unwrap().clone();
    assert_eq!(root_id, root);
    let thread = resolve_thread(&conversation, Some(&root_id)).unwrap();
    assert_eq!(thread.len(), 1);
    assert_eq!(thread[0].id, root);
}

#[test]
fn add_message_touches_only_its_parent() {
    let (mut conversation, [_, a, b, a2]) = branching();
    let snapshot = conversation.clone();

    let added = conversation
        .add_message(Some(&b), MessageRole::User, "Tell me more")
        .unwrap();

    let before = snapshot.find_message(b.as_str()).unwrap().children.len();
    let after = conversation.find_message(b.as_str()).unwrap().children.len();
    assert_eq!(after, before + 1);

    for id in [&a, &a2] {
        assert_eq!(
            conversation.find_message(id.as_str()),
            snapshot.find_message(id.as_str())
        );
    }
    assert_eq!(conversation.len(), snapshot.len() + 1);
    assert_eq!(conversation.latest_message().unwrap().id, added.id);
}

#[test]
fn merge_eligibility_properties() {
    let (conversation, [root, a, b, a2]) = branching();
    assert!(!can_merge(&conversation, &[]));
    assert!(!can_merge(&conversation, &[a.clone()]));
    assert!(can_merge(&conversation, &[a.clone(), b.clone()]));

    // shared ancestry does not collapse the count
    let shared = [root, a, a2];
    assert!(can_merge(&conversation, &shared));
    assert_eq!(effective_merge_count(&shared), 3);
}

#[test]
fn timeline_reference_points() {
    assert_eq!(visible_count(10, 0.0), 0);
    assert_eq!(visible_count(10, 0.55), 5);
    assert_eq!(visible_count(10, 1.0), 10);
}

#[tokio::test]
async fn merge_round_trip() {
    let (mut conversation, [_, a, b, a2]) = branching();
    let mut selection = Selection::new();
    selection.set_focal(Some(a2.clone()));
    selection.toggle_multi(a.clone());
    selection.toggle_multi(b.clone());

    let merged = MergeEngine::new()
        .perform_merge(&mut conversation, &selection, &EchoService)
        .await
        .unwrap();

    assert_eq!(merged.merged_from, Some(vec![a, b]));
    assert!(merged.is_merge_root);
    assert!(!merged.fallback);
    let parents: Vec<_> = conversation
        .all_messages()
        .filter(|m| m.children.contains(&merged.id))
        .map(|m| m.id.clone())
        .collect();
    assert_eq!(parents, vec![a2]);
}

#[tokio::test]
async fn merge_survives_service_failure() {
    let (mut conversation, [_, a, b, _]) = branching();
    let mut selection = Selection::new();
    selection.toggle_multi(a);
    selection.toggle_multi(b);
    let service = FailingService {
        calls: AtomicUsize::new(0),
    };

    let merged = MergeEngine::new()
        .perform_merge(&mut conversation, &selection, &service)
        .await
        .unwrap();

    assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    assert!(merged.fallback);
    assert!(!merged.content.trim().is_empty());
    assert!(fallback::is_fallback_text(&merged.content));
}

#[test]
fn new_view_has_no_selection() {
    let (conversation, [_, a, b, _]) = branching();
    let mut view = ConversationView::new(&conversation);
    view.focus(&conversation, &a).unwrap();
    view.toggle_candidate(&conversation, &b).unwrap();

    let other = Conversation::new("other");
    let switched = ConversationView::new(&other);
    assert!(switched.selection.focal().is_none());
    assert!(switched.selection.multi_selected().is_empty());
}
