//! End-to-end API tests
//!
//! Drives the spawned server through the real HTTP surface: registration,
//! login, cookie-based refresh rotation, logout revocation, SSE delivery,
//! offline queuing, and the client's transparent refresh-and-retry.
//!
//! Run with: cargo test -p integration-tests --test api_tests

use std::time::Duration;

use courier_client::{EventStream, Session};
use courier_realtime::ChatEvent;
use integration_tests::{extract_cookie, unique_conversation, TestOptions, TestServer, TestUser};
use reqwest::StatusCode;
use std::sync::Arc;
use tokio::time::timeout;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

async fn next_event(stream: &mut EventStream) -> ChatEvent {
    timeout(EVENT_TIMEOUT, stream.next_event())
        .await
        .expect("timed out waiting for event")
        .expect("stream error")
        .expect("stream closed")
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server
        .raw_client()
        .get(format!("{}/health", server.base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// ============================================================================
// Registration and login
// ============================================================================

#[tokio::test]
async fn test_register_and_profile() {
    let server = TestServer::start().await.expect("Failed to start server");
    let client = server.client();
    let user = TestUser::unique();

    let registered = client
        .register(&user.username, &user.email, &user.password)
        .await
        .unwrap();
    assert_eq!(registered.username, user.username);

    // Cookies were set; the protected profile endpoint works immediately.
    let profile = client.profile().await.unwrap();
    assert_eq!(profile.id, registered.id);
    assert_eq!(profile.email, user.email);
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let server = TestServer::start().await.expect("Failed to start server");
    let user = TestUser::unique();

    server
        .client()
        .register(&user.username, &user.email, &user.password)
        .await
        .unwrap();

    let err = server
        .client()
        .register("othername", &user.email, &user.password)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(409));
}

#[tokio::test]
async fn test_register_validation_failure() {
    let server = TestServer::start().await.expect("Failed to start server");

    let err = server
        .client()
        .register("x", "not-an-email", "short")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
}

#[tokio::test]
async fn test_login_with_wrong_password_fails() {
    let server = TestServer::start().await.expect("Failed to start server");
    let user = TestUser::unique();

    server
        .client()
        .register(&user.username, &user.email, &user.password)
        .await
        .unwrap();

    let err = server
        .client()
        .login(&user.email, "WrongPass123!")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(401));

    let logged_in = server.client().login(&user.email, &user.password).await.unwrap();
    assert_eq!(logged_in.username, user.username);
}

#[tokio::test]
async fn test_profile_without_auth_is_unauthorized() {
    let server = TestServer::start().await.expect("Failed to start server");

    let err = server.client().profile().await.unwrap_err();
    assert!(err.is_unauthorized());
}

// ============================================================================
// Refresh rotation and revocation
// ============================================================================

#[tokio::test]
async fn test_refresh_rotation_invalidates_old_token() {
    let server = TestServer::start().await.expect("Failed to start server");
    let http = server.raw_client();
    let user = TestUser::unique();

    // Register with manual cookie handling to capture the raw refresh token.
    let response = http
        .post(format!("{}/api/register", server.base_url()))
        .json(&serde_json::json!({
            "username": user.username,
            "email": user.email,
            "password": user.password,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let first_refresh = extract_cookie(&response, "refresh_token").unwrap();

    // One refresh succeeds and yields a different refresh token.
    let response = http
        .post(format!("{}/api/refresh", server.base_url()))
        .header("Cookie", format!("refresh_token={first_refresh}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let second_refresh = extract_cookie(&response, "refresh_token").unwrap();
    assert_ne!(first_refresh, second_refresh);

    // Replaying the rotated-away token fails although its signature and
    // expiry are still valid.
    let response = http
        .post(format!("{}/api/refresh", server.base_url()))
        .header("Cookie", format!("refresh_token={first_refresh}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "REVOKED_TOKEN");

    // The rotated-in token still works.
    let response = http
        .post(format!("{}/api/refresh", server.base_url()))
        .header("Cookie", format!("refresh_token={second_refresh}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_without_cookie_is_missing_auth() {
    let server = TestServer::start().await.expect("Failed to start server");

    let response = server
        .raw_client()
        .post(format!("{}/api/refresh", server.base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "MISSING_AUTH");
}

#[tokio::test]
async fn test_refresh_with_garbage_token_is_invalid() {
    let server = TestServer::start().await.expect("Failed to start server");

    let response = server
        .raw_client()
        .post(format!("{}/api/refresh", server.base_url()))
        .header("Cookie", "refresh_token=not.a.jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let server = TestServer::start().await.expect("Failed to start server");
    let http = server.raw_client();
    let user = TestUser::unique();

    let response = http
        .post(format!("{}/api/register", server.base_url()))
        .json(&serde_json::json!({
            "username": user.username,
            "email": user.email,
            "password": user.password,
        }))
        .send()
        .await
        .unwrap();
    let refresh_token = extract_cookie(&response, "refresh_token").unwrap();

    // Logout always succeeds and clears cookies.
    let response = http
        .post(format!("{}/api/logout", server.base_url()))
        .header("Cookie", format!("refresh_token={refresh_token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(extract_cookie(&response, "refresh_token").as_deref(), Some(""));

    // The revoked token can no longer be used to refresh.
    let response = http
        .post(format!("{}/api/refresh", server.base_url()))
        .header("Cookie", format!("refresh_token={refresh_token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "REVOKED_TOKEN");
}

// ============================================================================
// Real-time delivery
// ============================================================================

#[tokio::test]
async fn test_message_delivered_to_live_stream() {
    let server = TestServer::start().await.expect("Failed to start server");

    let alice = TestUser::unique();
    let bob = TestUser::unique();
    let alice_client = server.client();
    let bob_client = server.client();

    let alice_user = alice_client
        .register(&alice.username, &alice.email, &alice.password)
        .await
        .unwrap();
    bob_client
        .register(&bob.username, &bob.email, &bob.password)
        .await
        .unwrap();

    // Alice opens her stream and sees the connected ack.
    let mut stream = EventStream::connect(&alice_client, alice_user.id).await.unwrap();
    assert_eq!(next_event(&mut stream).await, ChatEvent::connected(alice_user.id));

    // Bob sends a message to Alice.
    let conversation = unique_conversation();
    let sent = bob_client
        .send_message(&conversation, alice_user.id, "hello alice")
        .await
        .unwrap();
    assert_eq!(sent.content, "hello alice");

    // Alice receives exactly one matching new-message event.
    match next_event(&mut stream).await {
        ChatEvent::NewMessage { message } => {
            assert_eq!(message.id, sent.id);
            assert_eq!(message.content, "hello alice");
            assert_eq!(message.conversation_id, conversation);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_offline_messages_flushed_on_connect() {
    let server = TestServer::start().await.expect("Failed to start server");

    let alice = TestUser::unique();
    let bob = TestUser::unique();
    let alice_client = server.client();
    let bob_client = server.client();

    let alice_user = alice_client
        .register(&alice.username, &alice.email, &alice.password)
        .await
        .unwrap();
    bob_client
        .register(&bob.username, &bob.email, &bob.password)
        .await
        .unwrap();

    // Bob sends while Alice is offline.
    let conversation = unique_conversation();
    bob_client
        .send_message(&conversation, alice_user.id, "first")
        .await
        .unwrap();
    bob_client
        .send_message(&conversation, alice_user.id, "second")
        .await
        .unwrap();

    // On connect the queue is flushed FIFO, then the connected ack arrives.
    let mut stream = EventStream::connect(&alice_client, alice_user.id).await.unwrap();
    match next_event(&mut stream).await {
        ChatEvent::NewMessage { message } => assert_eq!(message.content, "first"),
        other => panic!("unexpected event: {other:?}"),
    }
    match next_event(&mut stream).await {
        ChatEvent::NewMessage { message } => assert_eq!(message.content, "second"),
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(next_event(&mut stream).await, ChatEvent::connected(alice_user.id));
}

#[tokio::test]
async fn test_events_stream_requires_user_id() {
    let server = TestServer::start().await.expect("Failed to start server");

    let response = server
        .raw_client()
        .get(format!("{}/api/chat/events", server.base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_active_users_snapshot() {
    let server = TestServer::start().await.expect("Failed to start server");

    let alice = TestUser::unique();
    let alice_client = server.client();
    let alice_user = alice_client
        .register(&alice.username, &alice.email, &alice.password)
        .await
        .unwrap();

    let stream = EventStream::connect(&alice_client, alice_user.id).await.unwrap();

    let active = alice_client.active_users().await.unwrap();
    assert!(active.user_ids.contains(&alice_user.id));

    // After the stream drops, the server eventually deregisters Alice.
    drop(stream);
    let mut gone = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let active = alice_client.active_users().await.unwrap();
        if !active.user_ids.contains(&alice_user.id) {
            gone = true;
            break;
        }
    }
    assert!(gone, "stream teardown did not deregister the connection");
}

// ============================================================================
// Message history
// ============================================================================

#[tokio::test]
async fn test_history_is_chronological() {
    let server = TestServer::start().await.expect("Failed to start server");

    let alice = TestUser::unique();
    let bob = TestUser::unique();
    let alice_client = server.client();
    let bob_client = server.client();

    let alice_user = alice_client
        .register(&alice.username, &alice.email, &alice.password)
        .await
        .unwrap();
    bob_client
        .register(&bob.username, &bob.email, &bob.password)
        .await
        .unwrap();

    let conversation = unique_conversation();
    bob_client
        .send_message(&conversation, alice_user.id, "one")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    bob_client
        .send_message(&conversation, alice_user.id, "two")
        .await
        .unwrap();

    let history = bob_client.history(&conversation).await.unwrap();
    assert_eq!(history.count, 2);
    assert_eq!(history.data[0].content, "one");
    assert_eq!(history.data[1].content, "two");
}

#[tokio::test]
async fn test_send_message_validation_failure() {
    let server = TestServer::start().await.expect("Failed to start server");

    let alice = TestUser::unique();
    let client = server.client();
    let alice_user = client
        .register(&alice.username, &alice.email, &alice.password)
        .await
        .unwrap();

    let err = client
        .send_message(&unique_conversation(), alice_user.id, "")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
}

// ============================================================================
// Token lifecycle end to end
// ============================================================================

#[tokio::test]
async fn test_transparent_refresh_after_access_expiry() {
    // 1-second access tokens, zero leeway: the profile call below runs with
    // an expired access cookie.
    let server = TestServer::start_with(TestOptions {
        access_token_expiry: 1,
        leeway: 0,
    })
    .await
    .expect("Failed to start server");

    let user = TestUser::unique();
    let client = server.client();
    let registered = client
        .register(&user.username, &user.email, &user.password)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;

    // Exactly one refresh-and-retry happens inside the client; the caller
    // sees a 200, not a 401.
    let profile = client.profile().await.unwrap();
    assert_eq!(profile.id, registered.id);
}

#[tokio::test]
async fn test_proactive_refresh_loop_keeps_session_alive() {
    let server = TestServer::start().await.expect("Failed to start server");
    let user = TestUser::unique();
    let client = Arc::new(server.client());

    let mut session = Session::register(
        Arc::clone(&client),
        &user.username,
        &user.email,
        &user.password,
    )
    .await
    .unwrap();

    session.start_proactive_refresh_with(Duration::from_millis(100));
    // Starting again must replace, not duplicate, the timer.
    session.start_proactive_refresh_with(Duration::from_millis(100));

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(session.is_authenticated());
    assert!(session.refresh_loop_running());

    session.logout().await.unwrap();
}

#[tokio::test]
async fn test_proactive_refresh_failure_logs_session_out() {
    let server = TestServer::start().await.expect("Failed to start server");
    let user = TestUser::unique();
    let client = Arc::new(server.client());

    let mut session = Session::register(
        Arc::clone(&client),
        &user.username,
        &user.email,
        &user.password,
    )
    .await
    .unwrap();
    session.start_proactive_refresh_with(Duration::from_millis(100));

    // Revoke the session out from under the loop: cookies are cleared, so
    // the next proactive refresh fails and the loop cancels itself.
    client.logout().await.unwrap();

    let mut logged_out = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if !session.is_authenticated() {
            logged_out = true;
            break;
        }
    }
    assert!(logged_out, "refresh loop did not end the session on failure");
    assert!(!session.refresh_loop_running());
}

// ============================================================================
// Google OAuth surface (unconfigured in tests)
// ============================================================================

#[tokio::test]
async fn test_google_status_reports_unconfigured() {
    let server = TestServer::start().await.expect("Failed to start server");

    let response = server
        .raw_client()
        .get(format!("{}/api/auth/google/status", server.base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["configured"], false);
}

#[tokio::test]
async fn test_google_begin_unconfigured_is_unavailable() {
    let server = TestServer::start().await.expect("Failed to start server");

    let response = server
        .raw_client()
        .get(format!("{}/api/auth/google", server.base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
