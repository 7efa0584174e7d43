//! End-to-end lifecycle tests against the in-memory messenger.
//!
//! Every test runs on a paused tokio clock, so poll intervals, readiness
//! windows and event deadlines elapse instantly and deterministically.

#![allow(clippy::unwrap_used)]

mod common;

use std::time::Duration;

use common::{ANN, BOB, fixture};
use teamup_core::content::{JOIN_CONTROL_ID, LEAVE_CONTROL_ID};
use teamup_core::registry::RegistryEntry;
use teamup_core::service::CreationError;
use teamup_types::{Acknowledgement, EventId, EventPhase, EventSummary, MessageId};
use tokio_util::sync::CancellationToken;

#[tokio::test(start_paused = true)]
async fn raid_starts_once_both_participants_confirm() {
    let f = fixture();
    f.messenger.set_auto_confirm(ANN, true);
    f.messenger.set_auto_confirm(BOB, true);

    let handle = f.service.create_event(&f.request("Raid", 2, 0)).await.unwrap();
    let id = handle.id();
    let announcement = handle.announcement().message;
    assert!(f.registry.contains(id));

    f.messenger.press(announcement, JOIN_CONTROL_ID, ANN);
    f.messenger.press(announcement, JOIN_CONTROL_ID, BOB);

    let outcome = handle.wait().await.unwrap();
    assert_eq!(outcome.phase, EventPhase::Started);
    let names: Vec<&str> = outcome
        .participants
        .iter()
        .map(|m| m.display_name.as_str())
        .collect();
    assert_eq!(names, vec!["Ann", "Bob"]);
    assert_eq!(outcome.readiness_rounds, 1);

    let notice = "The event has started! Please join the voice channel \"Voice1\".";
    for user in [ANN, BOB] {
        let texts = f.messenger.private_texts(user);
        assert_eq!(texts.last().map(String::as_str), Some(notice));
    }

    let content = f.messenger.content(announcement).unwrap();
    assert_eq!(
        content.text,
        "🎮 **Raid**\nParticipants (2/2):\n- Ann\n- Bob\nThe event has started!"
    );
    assert!(content.controls.is_empty());
    assert!(!f.registry.contains(id));
}

#[tokio::test(start_paused = true)]
async fn confirmed_participants_get_a_ready_reply() {
    let f = fixture();
    f.messenger.set_auto_confirm(ANN, true);

    let handle = f.service.create_event(&f.request("Duel", 1, 0)).await.unwrap();
    f.messenger
        .press(handle.announcement().message, JOIN_CONTROL_ID, ANN);
    let outcome = handle.wait().await.unwrap();
    assert_eq!(outcome.phase, EventPhase::Started);

    let replies: Vec<Acknowledgement> = f
        .messenger
        .acknowledgements()
        .into_iter()
        .map(|(_, ack)| ack)
        .collect();
    assert_eq!(
        replies,
        vec![
            Acknowledgement::DeferredUpdate,
            Acknowledgement::Reply("You are ready!".to_owned()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn unattended_event_expires_and_is_removed() {
    let f = fixture();
    let handle = f.service.create_event(&f.request("Raid", 5, 1)).await.unwrap();
    let id = handle.id();
    let announcement = handle.announcement().message;

    let outcome = handle.wait().await.unwrap();
    assert_eq!(outcome.phase, EventPhase::Expired);
    assert!(outcome.participants.is_empty());
    assert_eq!(
        f.messenger.content(announcement).unwrap().text,
        "Raid event time has ended. The event is now closed."
    );
    assert!(!f.registry.contains(id));
}

#[tokio::test(start_paused = true)]
async fn zero_duration_event_never_expires_on_its_own() {
    let f = fixture();
    let handle = f.service.create_event(&f.request("Raid", 3, 0)).await.unwrap();
    let id = handle.id();
    let announcement = handle.announcement().message;

    tokio::time::sleep(Duration::from_secs(2 * 60 * 60)).await;
    assert!(!handle.is_finished());
    assert!(f.registry.contains(id));
    assert_eq!(f.messenger.edit_count(announcement), 0);

    handle.cancel();
    let outcome = handle.wait().await.unwrap();
    assert_eq!(outcome.phase, EventPhase::Cancelled);
    assert_eq!(
        f.messenger.content(announcement).unwrap().text,
        "Raid event has been cancelled."
    );
    assert!(!f.registry.contains(id));
}

#[tokio::test(start_paused = true)]
async fn double_join_renders_once_but_acknowledges_twice() {
    let f = fixture();
    let handle = f.service.create_event(&f.request("Raid", 3, 0)).await.unwrap();
    let announcement = handle.announcement().message;

    f.messenger.press(announcement, JOIN_CONTROL_ID, ANN);
    f.messenger.press(announcement, JOIN_CONTROL_ID, ANN);
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(f.messenger.edit_count(announcement), 1);
    assert_eq!(
        f.messenger.content(announcement).unwrap().text,
        "🎮 **Raid**\nParticipants (1/3):\n- Ann"
    );
    assert_eq!(f.messenger.acknowledgements().len(), 2);

    handle.cancel();
    let outcome = handle.wait().await.unwrap();
    assert_eq!(outcome.participants.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn leave_removes_and_rerenders() {
    let f = fixture();
    let handle = f.service.create_event(&f.request("Raid", 3, 0)).await.unwrap();
    let announcement = handle.announcement().message;

    f.messenger.press(announcement, JOIN_CONTROL_ID, ANN);
    f.messenger.press(announcement, JOIN_CONTROL_ID, BOB);
    f.messenger.press(announcement, LEAVE_CONTROL_ID, ANN);
    f.messenger.press(announcement, LEAVE_CONTROL_ID, ANN);
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(f.messenger.edit_count(announcement), 3);
    assert_eq!(
        f.messenger.content(announcement).unwrap().text,
        "🎮 **Raid**\nParticipants (1/3):\n- Bob"
    );

    handle.cancel();
    handle.wait().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn failed_round_returns_to_collecting_and_a_fresh_round_runs_later() {
    let f = fixture();
    f.messenger.set_auto_confirm(ANN, true);

    let handle = f.service.create_event(&f.request("Raid", 2, 0)).await.unwrap();
    let id = handle.id();
    let announcement = handle.announcement().message;

    f.messenger.press(announcement, JOIN_CONTROL_ID, ANN);
    f.messenger.press(announcement, JOIN_CONTROL_ID, BOB);

    // Bob never answers: his prompt times out after the 10 s window.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(f.registry.contains(id));
    assert_eq!(
        f.messenger.content(announcement).unwrap().text,
        "🎮 **Raid**\nParticipants (1/2):\n- Ann"
    );
    let bob_notices = f
        .messenger
        .texts_in(f.channel)
        .into_iter()
        .filter(|text| text.starts_with("Bob was removed"))
        .count();
    assert_eq!(bob_notices, 1);

    f.messenger.set_auto_confirm(BOB, true);
    f.messenger.press(announcement, JOIN_CONTROL_ID, BOB);

    let outcome = handle.wait().await.unwrap();
    assert_eq!(outcome.phase, EventPhase::Started);
    assert_eq!(outcome.readiness_rounds, 2);
    let prompts = f
        .messenger
        .private_texts(ANN)
        .into_iter()
        .filter(|text| text == "Please confirm your readiness for the event!")
        .count();
    assert_eq!(prompts, 2);
}

#[tokio::test(start_paused = true)]
async fn deadline_passing_during_a_failed_round_expires_the_event() {
    let f = fixture();
    f.messenger.set_auto_confirm(ANN, true);

    let handle = f.service.create_event(&f.request("Raid", 2, 5)).await.unwrap();
    let announcement = handle.announcement().message;
    f.messenger.press(announcement, JOIN_CONTROL_ID, ANN);
    f.messenger.press(announcement, JOIN_CONTROL_ID, BOB);

    let outcome = handle.wait().await.unwrap();
    assert_eq!(outcome.phase, EventPhase::Expired);
    assert_eq!(outcome.readiness_rounds, 1);
    assert_eq!(
        f.messenger.content(announcement).unwrap().text,
        "Raid event time has ended. The event is now closed."
    );
}

#[tokio::test(start_paused = true)]
async fn unknown_users_and_controls_do_not_stop_the_loop() {
    let f = fixture();
    f.messenger.set_auto_confirm(ANN, true);

    let handle = f.service.create_event(&f.request("Raid", 1, 0)).await.unwrap();
    let announcement = handle.announcement().message;
    let stranger = teamup_types::UserId::new(99);

    f.messenger.press(announcement, JOIN_CONTROL_ID, stranger);
    f.messenger.press(announcement, "spin_wheel", ANN);
    f.messenger.press(announcement, JOIN_CONTROL_ID, ANN);

    let outcome = handle.wait().await.unwrap();
    assert_eq!(outcome.phase, EventPhase::Started);
    assert_eq!(outcome.participants.len(), 1);
    assert!(f.messenger.acknowledgements().len() >= 3);
}

#[tokio::test(start_paused = true)]
async fn failing_edits_leave_a_stale_display_but_the_event_still_starts() {
    let f = fixture();
    f.messenger.set_auto_confirm(ANN, true);
    f.messenger.set_auto_confirm(BOB, true);
    f.messenger.set_fail_edits(true);

    let handle = f.service.create_event(&f.request("Raid", 2, 0)).await.unwrap();
    let announcement = handle.announcement().message;
    f.messenger.press(announcement, JOIN_CONTROL_ID, ANN);
    f.messenger.press(announcement, JOIN_CONTROL_ID, BOB);

    let outcome = handle.wait().await.unwrap();
    assert_eq!(outcome.phase, EventPhase::Started);
    assert_eq!(f.messenger.edit_count(announcement), 0);
    assert!(
        f.messenger
            .content(announcement)
            .unwrap()
            .text
            .contains("Click the button to join!")
    );
}

#[tokio::test(start_paused = true)]
async fn registry_cancel_and_shutdown_stop_events() {
    let f = fixture();
    let first = f.service.create_event(&f.request("Raid", 3, 0)).await.unwrap();
    let second = f.service.create_event(&f.request("Dungeon", 3, 0)).await.unwrap();
    let third = f.service.create_event(&f.request("Arena", 3, 0)).await.unwrap();
    assert_eq!(f.registry.len(), 3);

    assert!(f.service.cancel_event(first.id()));
    let outcome = first.wait().await.unwrap();
    assert_eq!(outcome.phase, EventPhase::Cancelled);
    assert_eq!(f.registry.len(), 2);
    assert!(!f.service.cancel_event(outcome.id));

    f.service.shutdown();
    assert_eq!(second.wait().await.unwrap().phase, EventPhase::Cancelled);
    assert_eq!(third.wait().await.unwrap().phase, EventPhase::Cancelled);
    assert!(f.registry.is_empty());
}

#[tokio::test]
async fn missing_voice_channel_is_reported() {
    let f = fixture();
    let mut request = f.request("Raid", 2, 0);
    request.voice_channel_name = "Nowhere".to_owned();
    let result = f.service.create_event(&request).await;
    assert!(matches!(
        result,
        Err(CreationError::ChannelNotFound { ref name }) if name == "Nowhere"
    ));

    // A text channel with the right name is not a voice destination.
    request.voice_channel_name = "general".to_owned();
    let result = f.service.create_event(&request).await;
    assert!(matches!(result, Err(CreationError::ChannelNotFound { .. })));
    assert!(f.registry.is_empty());
    assert!(f.messenger.texts_in(f.channel).is_empty());
}

#[tokio::test]
async fn zero_headcount_is_rejected() {
    let f = fixture();
    let result = f.service.create_event(&f.request("Raid", 0, 0)).await;
    assert!(matches!(
        result,
        Err(CreationError::InsufficientParameters { .. })
    ));
}

#[tokio::test]
async fn duplicate_identifier_is_rejected_and_the_announcement_removed() {
    use teamup_core::messenger::Messenger as _;

    let f = fixture();
    let placeholder = f
        .messenger
        .render_message(f.channel, &teamup_types::MessageContent::text("placeholder"))
        .await
        .unwrap();
    let next = MessageId::new(placeholder.message.into_inner().checked_add(1).unwrap());
    let taken = EventId::from(next);
    let existing = RegistryEntry {
        summary: EventSummary {
            name: "Existing".to_owned(),
            required_participants: 1,
            voice_destination: teamup_types::Channel {
                id: f.voice,
                name: "Voice1".to_owned(),
                kind: teamup_types::ChannelKind::Voice,
            },
            announcement: placeholder,
            created_at: chrono::Utc::now(),
        },
        cancel: CancellationToken::new(),
    };
    assert!(f.registry.create(taken, existing));

    let result = f.service.create_event(&f.request("Raid", 2, 0)).await;
    assert!(matches!(
        result,
        Err(CreationError::DuplicateEvent { id }) if id == taken
    ));
    assert!(f.messenger.is_deleted(next));
    assert_eq!(f.registry.summary(taken).unwrap().name, "Existing");
}

#[tokio::test(start_paused = true)]
async fn cancelling_during_readiness_closes_the_prompt() {
    let f = fixture();
    let handle = f.service.create_event(&f.request("Raid", 1, 0)).await.unwrap();
    let id = handle.id();
    let announcement = handle.announcement().message;

    f.messenger.press(announcement, JOIN_CONTROL_ID, ANN);
    tokio::time::sleep(Duration::from_secs(3)).await;
    let prompt = *f.messenger.private_messages(ANN).last().unwrap();
    assert!(f.messenger.has_open_interactions(prompt));

    handle.cancel();
    let outcome = handle.wait().await.unwrap();
    assert_eq!(outcome.phase, EventPhase::Cancelled);
    assert_eq!(outcome.readiness_rounds, 1);
    assert_eq!(outcome.participants.len(), 1);
    assert!(!f.registry.contains(id));
    assert!(!f.messenger.has_open_interactions(prompt));
    assert!(!f.messenger.has_open_interactions(announcement));
    assert_eq!(
        f.messenger.content(announcement).unwrap().text,
        "Raid event has been cancelled."
    );
}

#[tokio::test(start_paused = true)]
async fn completing_join_handled_past_the_deadline_still_runs_readiness() {
    let f = fixture();
    f.messenger.set_auto_confirm(ANN, true);
    f.messenger.set_member_lookup_delay(Duration::from_millis(500));

    let handle = f.service.create_event(&f.request("Raid", 1, 1)).await.unwrap();
    let announcement = handle.announcement().message;

    // Pressed before the 1 s deadline; the lookup finishes after it.
    tokio::time::sleep(Duration::from_millis(900)).await;
    f.messenger.press(announcement, JOIN_CONTROL_ID, ANN);

    let outcome = handle.wait().await.unwrap();
    assert_eq!(outcome.phase, EventPhase::Started);
    assert_eq!(outcome.readiness_rounds, 1);
    assert_eq!(outcome.participants.len(), 1);
}
