//! End-to-end tests for the world-info inspector.
//!
//! These drive the full host event sequence through the event bus and the
//! dispatcher: activation payloads as the host sends them, message arrival,
//! chat switches, and finally the popup.

use std::sync::Mutex;

use async_trait::async_trait;
use lorelens_config::{InspectorConfig, LoreLensConfig, UnmatchedPolicy};
use lorelens_core::{
    ChatLog, ClassificationContext, EventBus, HostEvent, MessageRecord, Position, RawEntry,
    RenderError,
};
use lorelens_inspector::{
    KnowledgeInspector, KnowledgeView, NoticeLevel, PopupOutcome, PopupSurface, Provenance,
    TriggerStatus,
};
use serde_json::json;

// ── Mock popup ───────────────────────────────────────────────────────────

#[derive(Default)]
struct ScriptedPopup {
    fail: bool,
    shown: Mutex<Vec<KnowledgeView>>,
    notices: Mutex<Vec<(NoticeLevel, String)>>,
}

#[async_trait]
impl PopupSurface for ScriptedPopup {
    async fn render(&self, view: &KnowledgeView) -> Result<(), RenderError> {
        if self.fail {
            return Err(RenderError::Surface("popup container missing".into()));
        }
        self.shown.lock().unwrap().push(view.clone());
        Ok(())
    }

    fn notify(&self, level: NoticeLevel, message: &str) {
        self.notices.lock().unwrap().push((level, message.to_string()));
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────

fn context() -> ClassificationContext {
    ClassificationContext::new()
        .with_global("Common Lore")
        .with_character_primary("Seraphina")
        .with_character_additional("Forest Spirits")
        .with_chat_source("Campaign Notes")
        .with_character_name("Seraphina")
}

/// An activation payload shaped like the host's JSON.
fn host_payload() -> Vec<RawEntry> {
    serde_json::from_value(json!([
        {
            "world": "Common Lore", "uid": 4, "comment": "Moon Calendar",
            "content": "Months are named after moons.", "key": ["month", "moon"],
            "keysecondary": [], "selectiveLogic": 0, "position": 0,
            "depth": 4, "role": null, "constant": true, "vectorized": false, "order": 20
        },
        {
            "world": "Seraphina", "uid": 1, "comment": "Glade",
            "content": "Seraphina's glade is hidden.", "key": ["glade"],
            "keysecondary": ["hidden", "secret"], "selectiveLogic": 1, "position": 0,
            "depth": 4, "role": null, "constant": false, "vectorized": false, "order": 5
        },
        {
            "world": "Campaign Notes", "uid": 9, "comment": "",
            "content": "The party owes the innkeeper.", "key": ["inn"],
            "position": 4, "depth": 1, "role": 1, "constant": false, "vectorized": true, "order": 100
        },
        {
            "world": "Forest Spirits", "uid": 2, "comment": "Dryads",
            "content": "Dryads guard old oaks.", "key": ["dryad"],
            "position": 4, "depth": 3, "role": 2, "constant": false, "vectorized": false, "order": 100
        },
        {
            "world": "Random Book", "uid": 6, "comment": "Stray",
            "content": "Not bound anywhere.", "key": ["stray"],
            "position": 7, "constant": false, "vectorized": false, "order": 100
        },
        {
            "uid": 11, "content": "No world given.", "position": 13
        }
    ]))
    .unwrap()
}

fn minimal_payload(world: &str, uid: i64) -> Vec<RawEntry> {
    serde_json::from_value(json!([{ "world": world, "uid": uid, "position": 1, "order": 1 }]))
        .unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_generation_cycle_through_the_bus() {
    let bus = EventBus::new(32);
    let mut rx = bus.subscribe();
    let mut chat = ChatLog::new();
    let user = chat.push(MessageRecord::user("Ann", "Tell me about the glade."));
    let reply = chat.push(MessageRecord::assistant("Seraphina", "The glade is hidden..."));

    bus.publish(HostEvent::WorldInfoActivated(host_payload()));
    bus.publish(HostEvent::MessageReceived(user));
    bus.publish(HostEvent::MessageReceived(reply));
    bus.publish(HostEvent::MessageRendered(reply));
    drop(bus);

    let mut inspector = KnowledgeInspector::default();
    let handled = inspector.pump(&mut rx, &mut chat, &context()).await;
    assert_eq!(handled, 4);
    assert!(!inspector.binder().is_pending());

    assert!(inspector.attached_knowledge(&chat, user).is_none());
    let groups = inspector.attached_knowledge(&chat, reply).unwrap();

    let positions: Vec<Position> = groups.iter().map(|g| g.position).collect();
    assert_eq!(
        positions,
        vec![
            Position::BeforeCharacter,
            Position::AtDepth,
            Position::Outlet,
            Position::Unknown(13),
        ]
    );

    // Before the character: order 5 (Glade) ahead of order 20 (Moon Calendar).
    let before = &groups[0].entries;
    assert_eq!(before[0].name, "Glade");
    assert_eq!(before[0].provenance, Some(Provenance::CharacterPrimary));
    assert_eq!(before[0].secondary_keys, "hidden, secret");
    assert_eq!(before[0].selective_logic.as_deref(), Some("NOT ALL"));
    assert_eq!(before[1].name, "Moon Calendar");
    assert_eq!(before[1].status, TriggerStatus::Constant);
    assert!(before[1].depth.is_none());

    // At depth: depth 3 ahead of depth 1.
    let at_depth = &groups[1].entries;
    assert_eq!(at_depth[0].name, "Dryads");
    assert_eq!(at_depth[0].provenance, Some(Provenance::CharacterAdditional));
    assert_eq!(at_depth[1].name, "Entry #9");
    assert_eq!(at_depth[1].provenance, Some(Provenance::Chat));
    assert_eq!(at_depth[1].status, TriggerStatus::Vector);

    // Unbound and malformed entries are kept, just unclassified.
    assert_eq!(groups[2].entries[0].provenance_label, "Unclassified");
    assert_eq!(groups[3].entries[0].world, "(unknown lorebook)");
    assert_eq!(groups[3].position_label, "unknown position (13)");
}

#[tokio::test]
async fn last_activation_wins_before_the_reply() {
    let bus = EventBus::default();
    let mut rx = bus.subscribe();
    let mut chat = ChatLog::new();
    let reply = chat.push(MessageRecord::assistant("Seraphina", "..."));

    bus.publish(HostEvent::WorldInfoActivated(minimal_payload("Common Lore", 1)));
    bus.publish(HostEvent::WorldInfoActivated(minimal_payload("Seraphina", 2)));
    bus.publish(HostEvent::MessageReceived(reply));
    drop(bus);

    let mut inspector = KnowledgeInspector::default();
    inspector.pump(&mut rx, &mut chat, &context()).await;

    let groups = inspector.attached_knowledge(&chat, reply).unwrap();
    let uids: Vec<i64> = groups.iter().flat_map(|g| g.entries.iter().map(|e| e.uid)).collect();
    assert_eq!(uids, vec![2]);
}

#[tokio::test]
async fn odd_entries_in_host_json_keep_the_rest_of_the_batch() {
    let event: HostEvent = serde_json::from_value(json!({
        "WorldInfoActivated": [
            { "world": "Common Lore", "uid": 1, "position": 1, "order": 1 },
            { "world": "Seraphina", "uid": 2, "position": 1, "key": "glade", "constant": 1 },
            { "world": "Forest Spirits", "uid": 3, "position": 1, "content": 42 },
            "not an entry"
        ]
    }))
    .unwrap();

    let bus = EventBus::default();
    let mut rx = bus.subscribe();
    let mut chat = ChatLog::new();
    let reply = chat.push(MessageRecord::assistant("Seraphina", "..."));
    bus.publish(event);
    bus.publish(HostEvent::MessageReceived(reply));
    drop(bus);

    let mut inspector = KnowledgeInspector::default();
    inspector.pump(&mut rx, &mut chat, &context()).await;

    let groups = inspector.attached_knowledge(&chat, reply).unwrap();
    let entries: Vec<_> = groups.iter().flat_map(|g| g.entries.iter()).collect();
    let uids: Vec<i64> = entries.iter().map(|e| e.uid).collect();
    assert_eq!(uids, vec![1, 3, 2]);
    assert_eq!(entries[2].keys, "glade");
    assert_eq!(entries[2].status, TriggerStatus::Constant);
    assert_eq!(entries[1].content, "42");
}

#[tokio::test]
async fn chat_change_discards_pending_batch() {
    let bus = EventBus::default();
    let mut rx = bus.subscribe();
    let mut chat = ChatLog::new();
    let reply = chat.push(MessageRecord::assistant("Seraphina", "..."));

    bus.publish(HostEvent::WorldInfoActivated(minimal_payload("Common Lore", 1)));
    bus.publish(HostEvent::ChatChanged);
    bus.publish(HostEvent::MessageReceived(reply));
    drop(bus);

    let mut inspector = KnowledgeInspector::default();
    inspector.pump(&mut rx, &mut chat, &context()).await;
    assert!(inspector.attached_knowledge(&chat, reply).is_none());
}

#[tokio::test]
async fn empty_activation_means_nothing_triggered() {
    let bus = EventBus::default();
    let mut rx = bus.subscribe();
    let mut chat = ChatLog::new();
    let reply = chat.push(MessageRecord::assistant("Seraphina", "..."));

    bus.publish(HostEvent::WorldInfoActivated(minimal_payload("Common Lore", 1)));
    bus.publish(HostEvent::WorldInfoActivated(Vec::new()));
    bus.publish(HostEvent::MessageReceived(reply));
    drop(bus);

    let mut inspector = KnowledgeInspector::default();
    inspector.pump(&mut rx, &mut chat, &context()).await;
    assert!(inspector.attached_knowledge(&chat, reply).is_none());
}

#[tokio::test]
async fn configuration_controls_key_and_policy() {
    let config = LoreLensConfig::from_toml_str(
        r#"
[inspector]
attachment_key = "activatedKnowledge"
unmatched = "drop"
"#,
    )
    .unwrap();
    assert_eq!(config.inspector.unmatched, UnmatchedPolicy::Drop);

    let mut chat = ChatLog::new();
    let mut inspector = KnowledgeInspector::new(config.inspector);
    inspector.handle(&HostEvent::WorldInfoActivated(host_payload()), &mut chat, &context());
    let reply = chat.push(MessageRecord::assistant("Seraphina", "..."));
    inspector.handle(&HostEvent::MessageReceived(reply), &mut chat, &context());

    let message = chat.iter().nth(reply).unwrap();
    assert!(message.has_attachment("activatedKnowledge"));
    assert!(!message.has_attachment("worldInfoViewer"));

    let groups = inspector.attached_knowledge(&chat, reply).unwrap();
    assert!(groups.iter().all(|g| g.entries.iter().all(|e| e.provenance.is_some())));
    assert_eq!(groups.iter().map(|g| g.len()).sum::<usize>(), 4);
}

#[tokio::test]
async fn popup_shows_attached_data_and_survives_failures() {
    let mut chat = ChatLog::new();
    let mut inspector = KnowledgeInspector::new(InspectorConfig::default());
    inspector.handle(&HostEvent::WorldInfoActivated(host_payload()), &mut chat, &context());
    let user = chat.push(MessageRecord::user("Ann", "hi"));
    let reply = chat.push(MessageRecord::assistant("Seraphina", "..."));
    inspector.handle(&HostEvent::MessageReceived(reply), &mut chat, &context());

    let popup = ScriptedPopup::default();
    assert_eq!(inspector.show_knowledge(&chat, reply, &popup).await, PopupOutcome::Shown);
    let shown = popup.shown.lock().unwrap().clone();
    assert_eq!(shown[0].summary.total, 6);
    assert_eq!(shown[0].summary.unclassified, 2);
    assert!(shown[0].to_string().contains("Moon Calendar"));

    assert_eq!(inspector.show_knowledge(&chat, user, &popup).await, PopupOutcome::NoData);

    let broken = ScriptedPopup {
        fail: true,
        ..ScriptedPopup::default()
    };
    assert_eq!(inspector.show_knowledge(&chat, reply, &broken).await, PopupOutcome::Failed);
    assert_eq!(broken.notices.lock().unwrap()[0].0, NoticeLevel::Error);
    assert!(inspector.attached_knowledge(&chat, reply).is_some());
}

#[tokio::test]
async fn switching_chats_lists_annotated_history() {
    let mut chat = ChatLog::new();
    let mut inspector = KnowledgeInspector::default();
    inspector.handle(&HostEvent::WorldInfoActivated(host_payload()), &mut chat, &context());
    let reply = chat.push(MessageRecord::assistant("Seraphina", "..."));
    inspector.handle(&HostEvent::MessageReceived(reply), &mut chat, &context());
    chat.push(MessageRecord::assistant("Seraphina", "no lore this time"));

    // Persisted chat reloaded by the host.
    let saved = serde_json::to_string(&chat).unwrap();
    let mut reloaded: ChatLog = serde_json::from_str(&saved).unwrap();

    let dispatch = inspector.handle(&HostEvent::ChatChanged, &mut reloaded, &context());
    match dispatch {
        lorelens_inspector::Dispatch::ChatReset { annotated, .. } => {
            assert_eq!(annotated, vec![reply]);
        }
        other => panic!("Expected ChatReset, got {other:?}"),
    }
    assert_eq!(
        inspector.attached_knowledge(&reloaded, reply),
        inspector.attached_knowledge(&chat, reply)
    );
}
