//! Relay Integration Tests
//!
//! Each test starts its own relay on an ephemeral local port; no external
//! services are needed.
//!
//! Run with: cargo test -p integration-tests --test relay_tests

use std::time::Duration;

use formwatch_common::JwtService;
use formwatch_core::PresenceStatus;
use formwatch_relay::protocol::{
    AllUserStatusEvent, EventName, StatusEvent, TypingEndEvent, TypingEvent, UserFormStateEvent,
};
use integration_tests::{admin, rejected_status, test_config, user, TestClient, TestRelay};
use reqwest::StatusCode;
use serde_json::json;

/// Idle window plus slack for the scheduler
const IDLE_WAIT: Duration = Duration::from_millis(integration_tests::TEST_IDLE_TIMEOUT_MS + 500);

// ============================================================================
// HTTP
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let relay = TestRelay::start().await.expect("Failed to start relay");

    let health = relay.health().await.unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["connections"], 0);
    assert_eq!(health["typing_sessions"], 0);
}

#[tokio::test]
async fn test_health_counts_connections() {
    let relay = TestRelay::start().await.expect("Failed to start relay");

    let _admin = TestClient::connect(&relay, admin()).await.unwrap();
    let _user = TestClient::connect(&relay, user()).await.unwrap();
    relay.wait_for_connections(2).await.unwrap();

    let health = relay.health().await.unwrap();
    assert_eq!(health["users"], 1);
}

// ============================================================================
// Handshake
// ============================================================================

#[tokio::test]
async fn test_handshake_without_token_rejected() {
    let relay = TestRelay::start().await.expect("Failed to start relay");

    let status = rejected_status(&relay, None).await.unwrap();
    assert_eq!(status.as_u16(), StatusCode::UNAUTHORIZED.as_u16());
}

#[tokio::test]
async fn test_handshake_with_foreign_token_rejected() {
    let relay = TestRelay::start().await.expect("Failed to start relay");

    let foreign = JwtService::new("some-other-secret-entirely-different", 60)
        .issue(user())
        .unwrap();

    for token in ["not-a-token", foreign.as_str()] {
        let status = rejected_status(&relay, Some(token)).await.unwrap();
        assert_eq!(status.as_u16(), StatusCode::UNAUTHORIZED.as_u16());
    }
}

#[tokio::test]
async fn test_query_token_accepted() {
    let relay = TestRelay::start().await.expect("Failed to start relay");

    let _client = TestClient::connect_with_query(&relay, user()).await.unwrap();
    relay.wait_for_connections(1).await.unwrap();
}

// ============================================================================
// Typing and presence
// ============================================================================

#[tokio::test]
async fn test_admin_observes_typing_lifecycle() {
    let relay = TestRelay::start().await.expect("Failed to start relay");

    let mut admin = TestClient::connect(&relay, admin()).await.unwrap();
    relay.wait_for_connections(1).await.unwrap();

    let mut user = TestClient::connect(&relay, user()).await.unwrap();
    let user_id = user.user_id();

    admin.expect(EventName::UserLogin).await.unwrap();
    let online: StatusEvent = admin.expect_data(EventName::UserStatus).await.unwrap();
    assert_eq!(online.user_id, user_id);
    assert_eq!(online.status, PresenceStatus::Online);

    user.type_into("first_name", "Jo").await.unwrap();

    let started: TypingEvent = admin.expect_data(EventName::TypingStart).await.unwrap();
    assert_eq!(started.user_id, user_id);
    assert_eq!(started.field.as_str(), "first_name");
    assert_eq!(started.value, "Jo");

    let typing: StatusEvent = admin.expect_data(EventName::UserStatus).await.unwrap();
    assert_eq!(typing.status, PresenceStatus::Typing);
    assert_eq!(typing.typing_field.unwrap().as_str(), "first_name");

    // No further input: the session expires on its own
    let ended: TypingEndEvent = admin.expect_data(EventName::TypingEnd).await.unwrap();
    assert_eq!(ended.field.as_str(), "first_name");

    let back: StatusEvent = admin.expect_data(EventName::UserStatus).await.unwrap();
    assert_eq!(back.status, PresenceStatus::Online);
}

#[tokio::test]
async fn test_update_reaches_admin_after_start() {
    let relay = TestRelay::start().await.expect("Failed to start relay");

    let mut admin = TestClient::connect(&relay, admin()).await.unwrap();
    relay.wait_for_connections(1).await.unwrap();
    let mut user = TestClient::connect(&relay, user()).await.unwrap();
    admin.expect(EventName::UserLogin).await.unwrap();
    admin.expect(EventName::UserStatus).await.unwrap();

    user.type_into("first_name", "Jo").await.unwrap();
    user.send(
        EventName::TypingUpdate,
        json!({ "userId": user.user_id(), "field": "first_name", "value": "John" }),
    )
    .await
    .unwrap();

    let started: TypingEvent = admin.expect_data(EventName::TypingStart).await.unwrap();
    assert_eq!(started.value, "Jo");
    admin.expect(EventName::UserStatus).await.unwrap();

    let updated: TypingEvent = admin.expect_data(EventName::TypingUpdate).await.unwrap();
    assert_eq!(updated.value, "John");
}

#[tokio::test]
async fn test_spoofed_and_malformed_events_are_dropped() {
    let relay = TestRelay::start().await.expect("Failed to start relay");

    let mut admin = TestClient::connect(&relay, admin()).await.unwrap();
    relay.wait_for_connections(1).await.unwrap();
    let mut user = TestClient::connect(&relay, user()).await.unwrap();
    admin.expect(EventName::UserLogin).await.unwrap();
    admin.expect(EventName::UserStatus).await.unwrap();

    let victim = integration_tests::user().user_id;
    user.send(
        EventName::TypingStart,
        json!({ "userId": victim, "field": "bio", "value": "spoofed" }),
    )
    .await
    .unwrap();
    user.send_raw("{not json").await.unwrap();
    user.send_raw(r#"{"event":"chat:message","data":{}}"#).await.unwrap();
    user.send(EventName::RequestAllUserStatus, json!(null)).await.unwrap();

    // The connection stays usable and only the genuine event is relayed
    user.type_into("bio", "genuine").await.unwrap();

    let started: TypingEvent = admin.expect_data(EventName::TypingStart).await.unwrap();
    assert_eq!(started.user_id, user.user_id());
    assert_eq!(started.value, "genuine");
}

#[tokio::test]
async fn test_last_disconnect_sets_offline() {
    let relay = TestRelay::start().await.expect("Failed to start relay");

    let mut admin = TestClient::connect(&relay, admin()).await.unwrap();
    relay.wait_for_connections(1).await.unwrap();

    let identity = user();
    let first_tab = TestClient::connect(&relay, identity).await.unwrap();
    let second_tab = TestClient::connect(&relay, identity).await.unwrap();
    relay.wait_for_connections(3).await.unwrap();
    admin.expect(EventName::UserLogin).await.unwrap();
    admin.expect(EventName::UserStatus).await.unwrap();

    first_tab.close().await.unwrap();
    relay.wait_for_connections(2).await.unwrap();
    admin.expect_silence(Duration::from_millis(100)).await.unwrap();

    second_tab.close().await.unwrap();
    let offline: StatusEvent = admin.expect_data(EventName::UserStatus).await.unwrap();
    assert_eq!(offline.user_id, identity.user_id);
    assert_eq!(offline.status, PresenceStatus::Offline);
}

#[tokio::test]
async fn test_typing_mirrors_to_other_tab() {
    let relay = TestRelay::start().await.expect("Failed to start relay");

    let identity = user();
    let mut first_tab = TestClient::connect(&relay, identity).await.unwrap();
    let mut second_tab = TestClient::connect(&relay, identity).await.unwrap();
    relay.wait_for_connections(2).await.unwrap();

    first_tab.type_into("city", "Oslo").await.unwrap();

    let mirrored: TypingEvent = second_tab.expect_data(EventName::TypingStart).await.unwrap();
    assert_eq!(mirrored.value, "Oslo");
    first_tab.expect_silence(Duration::from_millis(100)).await.unwrap();
}

// ============================================================================
// Snapshots
// ============================================================================

#[tokio::test]
async fn test_late_admin_sees_online_after_timeout() {
    let relay = TestRelay::start().await.expect("Failed to start relay");

    let mut user = TestClient::connect(&relay, user()).await.unwrap();
    relay.wait_for_connections(1).await.unwrap();
    user.type_into("email", "jo@example.com").await.unwrap();

    tokio::time::sleep(IDLE_WAIT).await;

    let mut admin = TestClient::connect(&relay, admin()).await.unwrap();
    admin
        .send(
            EventName::RequestUserFormState,
            json!({ "userId": user.user_id() }),
        )
        .await
        .unwrap();

    let snapshot: UserFormStateEvent = admin.expect_data(EventName::UserFormState).await.unwrap();
    assert_eq!(snapshot.user_id, user.user_id());
    assert_eq!(snapshot.presence.status(), PresenceStatus::Online);
    assert!(snapshot.fields.is_empty());
    assert_eq!(snapshot.drafts.len(), 1);
}

#[tokio::test]
async fn test_all_user_status_snapshot() {
    let relay = TestRelay::start().await.expect("Failed to start relay");

    let mut admin = TestClient::connect(&relay, admin()).await.unwrap();
    relay.wait_for_connections(1).await.unwrap();

    let mut typing_user = TestClient::connect(&relay, user()).await.unwrap();
    let idle_user = TestClient::connect(&relay, user()).await.unwrap();
    relay.wait_for_connections(3).await.unwrap();

    typing_user.type_into("bio", "hello").await.unwrap();
    admin.skip_until(EventName::TypingStart).await.unwrap();

    admin
        .send(EventName::RequestAllUserStatus, json!(null))
        .await
        .unwrap();

    let reply = admin.skip_until(EventName::AllUserStatus).await.unwrap();
    let all: AllUserStatusEvent = reply.data_as().unwrap();
    assert_eq!(all.users.len(), 2);

    let status_of = |id| {
        all.users
            .iter()
            .find(|s| s.user_id == id)
            .map(|s| s.status)
            .unwrap()
    };
    assert_eq!(status_of(typing_user.user_id()), PresenceStatus::Typing);
    assert_eq!(status_of(idle_user.user_id()), PresenceStatus::Online);
}

// ============================================================================
// Keepalive
// ============================================================================

#[tokio::test]
async fn test_silent_connection_times_out() {
    let config = test_config(&[
        ("KEEPALIVE_INTERVAL_MS", "100"),
        ("KEEPALIVE_TIMEOUT_MS", "400"),
    ])
    .unwrap();
    let relay = TestRelay::start_with_config(config)
        .await
        .expect("Failed to start relay");

    // The admin keeps reading, so its pings are answered
    let mut admin = TestClient::connect(&relay, admin()).await.unwrap();
    relay.wait_for_connections(1).await.unwrap();

    // Never polled until the end: pings go unanswered
    let mut silent = TestClient::connect(&relay, user()).await.unwrap();
    let silent_id = silent.user_id();

    admin.expect(EventName::UserLogin).await.unwrap();
    let online: StatusEvent = admin.expect_data(EventName::UserStatus).await.unwrap();
    assert_eq!(online.status, PresenceStatus::Online);

    let offline: StatusEvent = admin.expect_data(EventName::UserStatus).await.unwrap();
    assert_eq!(offline.user_id, silent_id);
    assert_eq!(offline.status, PresenceStatus::Offline);

    let code = silent.expect_close().await.unwrap();
    assert_eq!(code, 4009);

    let health = relay.health().await.unwrap();
    assert_eq!(health["connections"], 1);
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test]
async fn test_shutdown_sends_going_away() {
    let relay = TestRelay::start_with_config(test_config(&[]).unwrap())
        .await
        .expect("Failed to start relay");

    let mut client = TestClient::connect(&relay, user()).await.unwrap();
    relay.wait_for_connections(1).await.unwrap();

    relay.shutdown().await.unwrap();

    let code = client.expect_close().await.unwrap();
    assert_eq!(code, 1001);
}
