// Property tests for the session lifecycle controller.
//
// Every test drives the controller through the scripted service, so the
// notification sequences and operation failures are fully under test control.

use std::time::Duration;

use voicelink::{
    ConnectionStatus, ScriptedHandle, ScriptedService, ServiceEvent, SessionConfig,
    SessionController, SessionSnapshot, StaticPermission,
};

fn test_config() -> SessionConfig {
    SessionConfig::new("sk-test-key", "agent-1")
}

fn controller_with(
    granted: bool,
    config: SessionConfig,
) -> (SessionController, ScriptedHandle) {
    let (service, handle) = ScriptedService::new();
    let permission = if granted {
        StaticPermission::granted()
    } else {
        StaticPermission::denied()
    };
    let controller = SessionController::new(config, Box::new(permission), Box::new(service));
    (controller, handle)
}

/// Poll the snapshot until the predicate holds; notifications are applied by
/// a spawned pump, so state changes are not synchronous with emit().
async fn wait_for<F>(controller: &SessionController, predicate: F) -> SessionSnapshot
where
    F: Fn(&SessionSnapshot) -> bool,
{
    for _ in 0..200 {
        let snapshot = controller.snapshot().await;
        if predicate(&snapshot) {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let last = controller.snapshot().await;
    panic!("Condition not reached, last snapshot: {:?}", last);
}

async fn connected_controller() -> (SessionController, ScriptedHandle) {
    let (controller, handle) = controller_with(true, test_config());
    controller.request_permission().await;
    controller.start_conversation().await.unwrap();
    handle.emit(ServiceEvent::Connected).unwrap();
    wait_for(&controller, |s| {
        s.connection_status == ConnectionStatus::Connected
    })
    .await;
    (controller, handle)
}

#[tokio::test]
async fn permission_grant_sets_flag() {
    let (controller, _handle) = controller_with(true, test_config());
    controller.request_permission().await;

    let snapshot = controller.snapshot().await;
    assert!(snapshot.permission_granted);
    assert_eq!(snapshot.last_error, None);
}

#[tokio::test]
async fn permission_denial_sets_error() {
    let (controller, _handle) = controller_with(false, test_config());
    controller.request_permission().await;

    let snapshot = controller.snapshot().await;
    assert!(!snapshot.permission_granted);
    assert_eq!(
        snapshot.last_error.as_deref(),
        Some("Microphone access denied")
    );
}

#[tokio::test]
async fn start_never_reaches_service_without_permission() {
    let (controller, handle) = controller_with(false, test_config());
    controller.request_permission().await;

    assert!(controller.start_conversation().await.is_err());

    assert_eq!(handle.start_calls(), 0, "service must not be contacted");
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.connection_status, ConnectionStatus::Idle);
}

#[tokio::test]
async fn start_never_reaches_service_without_api_key() {
    let (controller, handle) = controller_with(true, SessionConfig::new("", "agent-1"));
    controller.request_permission().await;

    assert!(controller.start_conversation().await.is_err());

    assert_eq!(handle.start_calls(), 0);
    let snapshot = controller.snapshot().await;
    assert_eq!(
        snapshot.last_error.as_deref(),
        Some("API key is not configured")
    );
    assert_eq!(snapshot.connection_status, ConnectionStatus::Idle);
}

#[tokio::test]
async fn start_never_reaches_service_without_agent_id() {
    let (controller, handle) = controller_with(true, SessionConfig::new("sk-test-key", "  "));
    controller.request_permission().await;

    assert!(controller.start_conversation().await.is_err());

    assert_eq!(handle.start_calls(), 0);
    let snapshot = controller.snapshot().await;
    assert_eq!(
        snapshot.last_error.as_deref(),
        Some("Agent ID is not configured")
    );
}

#[tokio::test]
async fn connect_is_two_phase() {
    let (controller, handle) = controller_with(true, test_config());
    controller.request_permission().await;

    let conversation_id = controller.start_conversation().await.unwrap();
    assert!(conversation_id.starts_with("conv-"));

    // Accepted but not yet confirmed: still Idle.
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.connection_status, ConnectionStatus::Idle);
    assert_eq!(snapshot.conversation_id.as_deref(), Some(&conversation_id[..]));

    handle.emit(ServiceEvent::Connected).unwrap();
    let snapshot = wait_for(&controller, |s| {
        s.connection_status == ConnectionStatus::Connected
    })
    .await;
    assert_eq!(snapshot.last_error, None);
    assert!(snapshot.connected_at.is_some());
}

#[tokio::test]
async fn start_failure_records_service_message() {
    let (controller, handle) = controller_with(true, test_config());
    controller.request_permission().await;
    handle.fail_next_start("Agent not found");

    assert!(controller.start_conversation().await.is_err());

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.last_error.as_deref(), Some("Agent not found"));
    assert_eq!(snapshot.connection_status, ConnectionStatus::Idle);
}

#[tokio::test]
async fn mute_failure_leaves_flag_unchanged() {
    let (controller, handle) = connected_controller().await;
    handle.fail_next_volume("volume rejected");

    assert!(controller.toggle_mute().await.is_err());

    let snapshot = controller.snapshot().await;
    assert!(!snapshot.is_muted, "flag must not flip speculatively");
    assert_eq!(
        snapshot.last_error.as_deref(),
        Some("Failed to change volume")
    );
    assert!(handle.volumes().is_empty());
}

#[tokio::test]
async fn mute_toggles_between_zero_and_full_volume() {
    let (controller, handle) = connected_controller().await;

    assert!(controller.toggle_mute().await.unwrap());
    assert!(controller.snapshot().await.is_muted);

    assert!(!controller.toggle_mute().await.unwrap());
    assert!(!controller.snapshot().await.is_muted);

    assert_eq!(handle.volumes(), vec![0.0, 1.0]);
}

#[tokio::test]
async fn second_failure_overwrites_first() {
    let (controller, handle) = connected_controller().await;

    handle.fail_next_volume("volume rejected");
    assert!(controller.toggle_mute().await.is_err());
    assert_eq!(
        controller.snapshot().await.last_error.as_deref(),
        Some("Failed to change volume")
    );

    handle.fail_next_end("close rejected");
    assert!(controller.end_conversation().await.is_err());

    // Only the most recent failure is retained.
    assert_eq!(
        controller.snapshot().await.last_error.as_deref(),
        Some("Failed to end conversation")
    );
}

#[tokio::test]
async fn disconnect_resets_speaking() {
    let (controller, handle) = connected_controller().await;

    handle.emit(ServiceEvent::SpeakingChange(true)).unwrap();
    wait_for(&controller, |s| s.is_speaking).await;

    handle.emit(ServiceEvent::Disconnected).unwrap();
    let snapshot = wait_for(&controller, |s| {
        s.connection_status == ConnectionStatus::Idle
    })
    .await;

    assert!(!snapshot.is_speaking);
    assert_eq!(snapshot.conversation_id, None);
    assert_eq!(snapshot.connected_at, None);
}

#[tokio::test]
async fn end_is_two_phase() {
    let (controller, handle) = connected_controller().await;

    controller.end_conversation().await.unwrap();

    // Close accepted; still Connected until the notification lands.
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.connection_status, ConnectionStatus::Connected);

    handle.emit(ServiceEvent::Disconnected).unwrap();
    wait_for(&controller, |s| {
        s.connection_status == ConnectionStatus::Idle
    })
    .await;
}

#[tokio::test]
async fn end_failure_keeps_connection() {
    let (controller, handle) = connected_controller().await;
    handle.fail_next_end("close rejected");

    assert!(controller.end_conversation().await.is_err());

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.connection_status, ConnectionStatus::Connected);
    assert_eq!(
        snapshot.last_error.as_deref(),
        Some("Failed to end conversation")
    );
}

#[tokio::test]
async fn successful_connect_clears_prior_error() {
    let (controller, handle) = controller_with(true, test_config());
    controller.request_permission().await;

    handle.fail_next_start("Agent not found");
    assert!(controller.start_conversation().await.is_err());
    assert!(controller.snapshot().await.last_error.is_some());

    controller.start_conversation().await.unwrap();
    handle.emit(ServiceEvent::Connected).unwrap();
    let snapshot = wait_for(&controller, |s| {
        s.connection_status == ConnectionStatus::Connected
    })
    .await;
    assert_eq!(snapshot.last_error, None);
}

#[tokio::test]
async fn remote_error_lands_in_last_error() {
    let (controller, handle) = connected_controller().await;

    handle
        .emit(ServiceEvent::Error("Remote hiccup".to_string()))
        .unwrap();
    let snapshot = wait_for(&controller, |s| s.last_error.is_some()).await;

    assert_eq!(snapshot.last_error.as_deref(), Some("Remote hiccup"));
    assert_eq!(snapshot.connection_status, ConnectionStatus::Connected);
}

#[tokio::test]
async fn full_conversation_scenario() {
    let (controller, handle) = controller_with(true, test_config());
    controller.request_permission().await;

    controller.start_conversation().await.unwrap();
    assert_eq!(
        controller.snapshot().await.connection_status,
        ConnectionStatus::Idle
    );

    handle.emit(ServiceEvent::Connected).unwrap();
    let snapshot = wait_for(&controller, |s| {
        s.connection_status == ConnectionStatus::Connected
    })
    .await;
    assert_eq!(snapshot.last_error, None);
    assert_eq!(snapshot.status_line(), "Listening...");

    handle.emit(ServiceEvent::SpeakingChange(true)).unwrap();
    let snapshot = wait_for(&controller, |s| s.is_speaking).await;
    assert_eq!(snapshot.status_line(), "Agent is speaking...");

    handle.emit(ServiceEvent::Disconnected).unwrap();
    let snapshot = wait_for(&controller, |s| {
        s.connection_status == ConnectionStatus::Idle
    })
    .await;
    assert!(!snapshot.is_speaking);
}

#[tokio::test]
async fn status_line_prompts_for_permission() {
    let (controller, _handle) = controller_with(true, test_config());

    // Permission not yet requested, no error recorded.
    let snapshot = controller.snapshot().await;
    assert_eq!(
        snapshot.status_line(),
        "Please allow microphone access to use voice chat"
    );
}

#[tokio::test]
async fn status_line_shows_error_text() {
    let (controller, _handle) = controller_with(false, test_config());
    controller.request_permission().await;

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.status_line(), "Microphone access denied");
}
