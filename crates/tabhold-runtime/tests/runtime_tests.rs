//! End-to-end runtime tests through the builder and handle

mod test_utils;

use futures::FutureExt;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tabhold_core::{ListeningType, OutboundMessage, StorageChange, StorageChanges};
use tabhold_runtime::{ArbiterConfig, RuntimeBuilder, RuntimeHandle, Settings};
use tokio_test::assert_ok;
use test_utils::{mouse_down_json, mouse_up_json, wait_until, RecordingHost, HOST_ID};

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn change(key: &str, value: Value) -> StorageChanges {
    let mut changes = StorageChanges::new();
    changes.insert(key.to_string(), StorageChange::set(value));
    changes
}

/// Runtime with loaded settings, after its initial registration
async fn started(host: &Arc<RecordingHost>, settings: Settings) -> RuntimeHandle {
    let handle = RuntimeBuilder::new(Arc::clone(host))
        .with_config(ArbiterConfig::testing())
        .with_settings(settings)
        .build_and_start()
        .expect("runtime starts");
    wait_until(|| host.registrations().len() == 1).await;
    handle
}

async fn dispatch(handle: &RuntimeHandle, message: Value) -> bool {
    handle
        .dispatch(HOST_ID, message)
        .await
        .expect("runtime running")
        .expect("host messages are answered")
        .await
}

#[tokio::test(start_paused = true)]
async fn registers_once_settings_are_loaded() {
    let host = RecordingHost::new();
    let mut handle = RuntimeBuilder::new(Arc::clone(&host))
        .with_config(ArbiterConfig::testing())
        .build_and_start()
        .expect("runtime starts");

    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    assert_eq!(host.attempt_count(), 0);

    assert_ok!(
        handle
            .load_settings(object(json!({ "detectDragAndDrop": false })))
            .await
    );
    wait_until(|| host.registrations().len() == 1).await;

    assert!(handle.settings().is_loaded());
    assert!(!host.registrations()[0].contains(&ListeningType::NativeTabDragstart));
    assert_ok!(handle.shutdown().await);
}

#[tokio::test(start_paused = true)]
async fn foreign_senders_get_no_reply() {
    let host = RecordingHost::new();
    let mut handle = started(&host, Settings::default()).await;

    let reply = handle
        .dispatch("someone@example.com", mouse_down_json(1))
        .await
        .unwrap();
    assert!(reply.is_none());
    assert_ok!(handle.shutdown().await);
}

#[tokio::test(start_paused = true)]
async fn ready_replies_true_and_registers_again() {
    let host = RecordingHost::new();
    let mut handle = started(&host, Settings::default()).await;

    assert!(dispatch(&handle, json!({ "type": "ready" })).await);
    wait_until(|| host.registrations().len() == 2).await;
    assert_eq!(
        host.kinds(),
        vec!["unregister-self", "register-self", "unregister-self", "register-self"]
    );
    assert_ok!(handle.shutdown().await);
}

#[tokio::test(start_paused = true)]
async fn relevant_setting_change_registers_again() {
    let host = RecordingHost::new();
    let mut handle = started(&host, Settings::default()).await;

    let mut changes = change("detectLongPressedTabs", json!(true));
    changes.extend(change("preventDragAndDropAfterLongPress", json!(true)));
    changes.extend(change("preventDragAndDropAfterLongPress_Legacy", json!(true)));
    assert_ok!(handle.storage_changed(changes).await);

    wait_until(|| host.registrations().len() == 2).await;
    assert!(host.registrations()[1].contains(&ListeningType::TabDragready));
    assert_ok!(handle.shutdown().await);
}

#[tokio::test(start_paused = true)]
async fn unrelated_setting_change_keeps_registration() {
    let host = RecordingHost::new();
    let mut handle = started(&host, Settings::default()).await;

    assert_ok!(
        handle
            .storage_changed(change("preventCustomDraggedTabs", json!(false)))
            .await
    );
    tokio::time::sleep(std::time::Duration::from_secs(1)).await;

    assert_eq!(host.registrations().len(), 1);
    assert!(!handle.settings().snapshot().prevent_custom_dragged_tabs);
    assert_ok!(handle.shutdown().await);
}

#[tokio::test(start_paused = true)]
async fn settings_reload_registers_again() {
    let host = RecordingHost::new();
    let mut handle = started(&host, Settings::default()).await;

    // Same values as loaded: nothing to re-register
    assert_ok!(
        handle
            .load_settings(object(json!({ "detectDragAndDrop": true })))
            .await
    );
    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    assert_eq!(host.registrations().len(), 1);

    assert_ok!(
        handle
            .load_settings(object(json!({ "detectDragAndDrop": false })))
            .await
    );
    wait_until(|| host.registrations().len() == 2).await;
    assert!(!host.registrations()[1].contains(&ListeningType::NativeTabDragstart));
    assert_ok!(handle.shutdown().await);
}

#[tokio::test(start_paused = true)]
async fn click_and_move_between_tabs() {
    let host = RecordingHost::new();
    let mut handle = started(&host, Settings::default()).await;

    let same = handle.dispatch(HOST_ID, mouse_down_json(1)).await.unwrap().unwrap();
    assert!(!dispatch(&handle, mouse_up_json(1)).await);
    assert!(!same.await);

    let moved = handle.dispatch(HOST_ID, mouse_down_json(1)).await.unwrap().unwrap();
    assert!(dispatch(&handle, mouse_up_json(2)).await);
    assert!(moved.await);
    assert_ok!(handle.shutdown().await);
}

#[tokio::test(start_paused = true)]
async fn long_press_asks_host_for_custom_drag() {
    let host = RecordingHost::new();
    let mut handle = started(
        &host,
        Settings {
            detect_long_pressed_tabs: true,
            prevent_drag_and_drop_after_long_press: true,
            ..Settings::default()
        },
    )
    .await;

    let mut message = mouse_down_json(4);
    message["windowId"] = json!(9);
    let reply = handle.dispatch(HOST_ID, message).await.unwrap().unwrap();

    wait_until(|| host.kinds().contains(&"start-custom-drag")).await;
    let drag = host
        .attempts()
        .into_iter()
        .find(|m| matches!(m, OutboundMessage::StartCustomDrag { .. }));
    assert_eq!(drag, Some(OutboundMessage::StartCustomDrag { window_id: 9 }));

    // Long press forces prevent even for a release on the same tab
    assert!(dispatch(&handle, mouse_up_json(4)).await);
    assert!(reply.await);
    assert_ok!(handle.shutdown().await);
}

#[tokio::test(start_paused = true)]
async fn stats_count_messages_and_decisions() {
    let host = RecordingHost::new();
    let mut handle = started(&host, Settings::default()).await;

    let reply = handle
        .dispatch("someone@example.com", mouse_down_json(1))
        .await
        .unwrap();
    assert!(reply.is_none());
    let down = handle.dispatch(HOST_ID, mouse_down_json(1)).await.unwrap().unwrap();
    assert!(!dispatch(&handle, mouse_up_json(1)).await);
    assert!(!down.await);
    assert!(dispatch(&handle, json!({ "type": "ready" })).await);

    let stats = assert_ok!(handle.stats().await);
    assert_eq!(stats.foreign_messages_ignored, 1);
    assert_eq!(stats.messages_dispatched, 3);
    assert_eq!(stats.registrations_requested, 1);
    assert_eq!(stats.arbiter.decisions_opened, 1);
    assert_eq!(stats.arbiter.decisions_allowed, 1);

    assert_ok!(handle.shutdown().await);
    assert!(handle.stats().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn malformed_messages_are_answered_false() {
    let host = RecordingHost::new();
    let mut handle = started(&host, Settings::default()).await;

    assert!(!dispatch(&handle, json!({ "type": "tab-mousedown" })).await);
    assert!(!dispatch(&handle, json!("not an object")).await);
    assert_ok!(handle.shutdown().await);
}

#[tokio::test(start_paused = true)]
async fn shutdown_releases_pending_reply() {
    let host = RecordingHost::new();
    let mut handle = started(&host, Settings::default()).await;

    let mut reply = handle.dispatch(HOST_ID, mouse_down_json(1)).await.unwrap().unwrap();
    assert_eq!((&mut reply).now_or_never(), None);

    assert_ok!(handle.shutdown().await);
    assert!(!reply.await);
    assert!(!handle.is_running());
    assert!(handle.dispatch(HOST_ID, mouse_up_json(1)).await.is_err());
}
