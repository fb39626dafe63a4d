//! Token lifecycle behaviour of the authenticated executor.
//!
//! Covers proactive refresh, forced refresh-and-retry, refresh coalescing,
//! forced logout and cancellation against scripted transports.

mod support;

use std::time::Duration;

use belay_domain::constants::TOKEN_REFRESH_PATH;
use belay_domain::{
    ApiRequest, AuthError, CredentialPhase, HttpMethod, LogoutReason, RequestBody, SessionEvent,
    SessionStatus, TransportErrorKind,
};
use support::{pair_expiring_in, token_response, Harness, MINUTE_MS, NOW};
use tokio_util::sync::CancellationToken;

const POSTS: &str = "/api/v1/posts";

fn refresh_succeeds(harness: &Harness, gen: &str) {
    harness.transport.respond(
        HttpMethod::Post,
        TOKEN_REFRESH_PATH,
        200,
        token_response(&format!("access-{gen}"), &format!("refresh-{gen}"), NOW + 60 * MINUTE_MS),
    );
}

fn refresh_calls(harness: &Harness) -> usize {
    harness.transport.calls_to(HttpMethod::Post, TOKEN_REFRESH_PATH)
}

/// Validates the far-from-expiry scenario.
///
/// Assertions:
/// - The stored access token is returned unchanged
/// - No network call is made
#[tokio::test]
async fn fresh_token_is_returned_without_refresh() {
    let harness = Harness::with_session(pair_expiring_in("a", 10)).await;

    let token = harness.executor.get_valid_token().await.unwrap();

    assert_eq!(token, "access-a");
    assert_eq!(harness.transport.calls(), 0);
    assert_eq!(harness.executor.phase(), CredentialPhase::Valid);
}

/// Validates the near-expiry scenario.
///
/// Assertions:
/// - Exactly one refresh call carrying the stored refresh token
/// - The new access token is returned and persisted
#[tokio::test]
async fn near_expiry_token_is_refreshed_once() {
    let harness = Harness::with_session(pair_expiring_in("a", 1)).await;
    refresh_succeeds(&harness, "b");

    let token = harness.executor.get_valid_token().await.unwrap();

    assert_eq!(token, "access-b");
    assert_eq!(refresh_calls(&harness), 1);
    assert_eq!(harness.store.pair().map(|p| p.refresh_token), Some("refresh-b".to_string()));

    let sent = harness.transport.requests_to(HttpMethod::Post, TOKEN_REFRESH_PATH);
    assert_eq!(
        sent[0].body,
        Some(RequestBody::Json(serde_json::json!({ "refreshToken": "refresh-a" })))
    );
    assert!(sent[0].header_value("Authorization").is_none());
    assert_eq!(harness.executor.phase(), CredentialPhase::Valid);
}

/// Validates the exact-threshold scenario.
///
/// Assertions:
/// - A token with exactly the threshold left is refreshed
#[tokio::test]
async fn token_at_exact_threshold_is_refreshed() {
    let harness = Harness::with_session(pair_expiring_in("a", 5)).await;
    refresh_succeeds(&harness, "b");

    let token = harness.executor.get_valid_token().await.unwrap();

    assert_eq!(token, "access-b");
    assert_eq!(refresh_calls(&harness), 1);
}

#[tokio::test]
async fn concurrent_callers_share_a_single_refresh() {
    let harness = Harness::with_session(pair_expiring_in("a", 2)).await;
    refresh_succeeds(&harness, "b");
    harness.transport.delay(HttpMethod::Post, TOKEN_REFRESH_PATH, Duration::from_millis(50));

    let mut callers = Vec::new();
    for _ in 0..8 {
        let executor = harness.executor.clone();
        callers.push(tokio::spawn(async move { executor.get_valid_token().await }));
    }

    for caller in callers {
        assert_eq!(caller.await.unwrap().unwrap(), "access-b");
    }
    assert_eq!(refresh_calls(&harness), 1);
    assert_eq!(harness.store.saves(), 1);
}

/// Validates the rejected-refresh scenario.
///
/// Assertions:
/// - The caller sees `AuthenticationExpired`
/// - The store is cleared and the session ends with `RefreshRejected`
/// - The next call fails with `AuthenticationRequired` without network
#[tokio::test]
async fn rejected_refresh_forces_logout() {
    let harness = Harness::with_session(pair_expiring_in("a", 1)).await;
    let mut events = harness.controller.events();
    harness.transport.respond(
        HttpMethod::Post,
        TOKEN_REFRESH_PATH,
        401,
        serde_json::json!({ "code": "INVALID_REFRESH_TOKEN" }),
    );

    let result = harness.executor.get_valid_token().await;

    assert!(matches!(result, Err(AuthError::AuthenticationExpired { .. })));
    assert!(harness.store.pair().is_none());
    assert_eq!(harness.executor.phase(), CredentialPhase::NoSession);
    assert_eq!(harness.controller.state().status, SessionStatus::Unauthenticated);
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::LoggedOut { reason: LogoutReason::RefreshRejected }
    );

    let calls_before = harness.transport.calls();
    assert_eq!(harness.executor.get_valid_token().await, Err(AuthError::AuthenticationRequired));
    assert_eq!(harness.transport.calls(), calls_before);
}

#[tokio::test]
async fn forbidden_refresh_is_also_unrecoverable() {
    let harness = Harness::with_session(pair_expiring_in("a", 1)).await;
    harness.transport.respond(HttpMethod::Post, TOKEN_REFRESH_PATH, 403, serde_json::json!({}));

    let result = harness.executor.get_valid_token().await;

    assert!(matches!(result, Err(AuthError::AuthenticationExpired { .. })));
    assert_eq!(harness.store.clears(), 1);
}

#[tokio::test]
async fn waiters_on_a_rejected_refresh_all_observe_logout() {
    let harness = Harness::with_session(pair_expiring_in("a", 1)).await;
    harness.transport.respond(HttpMethod::Post, TOKEN_REFRESH_PATH, 401, serde_json::json!({}));
    harness.transport.delay(HttpMethod::Post, TOKEN_REFRESH_PATH, Duration::from_millis(40));

    let (a, b, c) = tokio::join!(
        harness.executor.get_valid_token(),
        harness.executor.get_valid_token(),
        harness.executor.get_valid_token(),
    );

    for result in [a, b, c] {
        assert!(matches!(result, Err(AuthError::AuthenticationExpired { .. })));
    }
    assert_eq!(refresh_calls(&harness), 1);
    assert_eq!(harness.executor.get_valid_token().await, Err(AuthError::AuthenticationRequired));
}

#[tokio::test]
async fn transient_refresh_failure_keeps_unexpired_token() {
    let harness = Harness::with_session(pair_expiring_in("a", 1)).await;
    harness.transport.respond(HttpMethod::Post, TOKEN_REFRESH_PATH, 503, serde_json::json!({}));

    let token = harness.executor.get_valid_token().await.unwrap();

    assert_eq!(token, "access-a");
    assert_eq!(harness.store.clears(), 0);
    assert!(harness.store.pair().is_some());
    assert_eq!(harness.executor.phase(), CredentialPhase::Valid);
}

#[tokio::test]
async fn transient_refresh_failure_with_expired_token_surfaces_error() {
    let harness = Harness::with_session(pair_expiring_in("a", 1)).await;
    harness.clock.advance_ms(2 * MINUTE_MS);
    harness.transport.fail(HttpMethod::Post, TOKEN_REFRESH_PATH, TransportErrorKind::Connect);

    let result = harness.executor.get_valid_token().await;

    assert!(matches!(result, Err(AuthError::TransientFailure(_))));
    assert!(result.unwrap_err().is_retryable());
    assert!(harness.store.pair().is_some());
    assert_eq!(harness.executor.phase(), CredentialPhase::Expired);
    assert!(harness.controller.is_authenticated());
}

#[tokio::test]
async fn malformed_refresh_body_is_recoverable() {
    let harness = Harness::with_session(pair_expiring_in("a", 1)).await;
    harness.clock.advance_ms(2 * MINUTE_MS);
    harness.transport.respond(
        HttpMethod::Post,
        TOKEN_REFRESH_PATH,
        200,
        serde_json::json!({ "token": "missing fields" }),
    );

    let result = harness.executor.get_valid_token().await;

    assert!(matches!(result, Err(AuthError::TransientFailure(_))));
    assert!(harness.store.pair().is_some());
}

#[tokio::test]
async fn already_expired_pair_from_server_is_rejected() {
    let harness = Harness::with_session(pair_expiring_in("a", 1)).await;
    harness.clock.advance_ms(2 * MINUTE_MS);
    harness.transport.respond(
        HttpMethod::Post,
        TOKEN_REFRESH_PATH,
        200,
        token_response("access-b", "refresh-b", NOW),
    );

    let result = harness.executor.get_valid_token().await;

    assert!(matches!(result, Err(AuthError::TransientFailure(_))));
    assert_eq!(harness.store.pair().map(|p| p.access_token), Some("access-a".to_string()));
}

#[tokio::test]
async fn missing_session_fails_without_network() {
    let harness = Harness::new();

    let result = harness.executor.execute(ApiRequest::get(POSTS)).await;

    assert_eq!(result.unwrap_err(), AuthError::AuthenticationRequired);
    assert_eq!(harness.transport.calls(), 0);
}

/// Validates the reactive-refresh scenario with a successful retry.
///
/// Assertions:
/// - One forced refresh even though the token was far from expiry
/// - The retry carries the new token and its response is returned
#[tokio::test]
async fn rejected_request_is_retried_once_after_refresh() {
    let harness = Harness::with_session(pair_expiring_in("a", 30)).await;
    harness.transport.respond(HttpMethod::Get, POSTS, 401, serde_json::json!({}));
    harness.transport.respond(HttpMethod::Get, POSTS, 200, serde_json::json!([{ "id": "p-1" }]));
    refresh_succeeds(&harness, "b");

    let response = harness.executor.execute(ApiRequest::get(POSTS)).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(refresh_calls(&harness), 1);
    assert_eq!(harness.transport.bearers_to(HttpMethod::Get, POSTS), ["access-a", "access-b"]);
    assert_eq!(harness.executor.phase(), CredentialPhase::Valid);
}

/// Validates the reactive-refresh scenario with a rejected retry.
///
/// Assertions:
/// - Exactly one refresh and one retry
/// - `AuthenticationExpired` is returned and the session is torn down
#[tokio::test]
async fn rejected_retry_ends_session() {
    let harness = Harness::with_session(pair_expiring_in("a", 30)).await;
    let mut events = harness.controller.events();
    harness.transport.respond(HttpMethod::Get, POSTS, 403, serde_json::json!({}));
    refresh_succeeds(&harness, "b");

    let result = harness.executor.execute(ApiRequest::get(POSTS)).await;

    assert!(matches!(result, Err(AuthError::AuthenticationExpired { .. })));
    assert_eq!(refresh_calls(&harness), 1);
    assert_eq!(harness.transport.calls_to(HttpMethod::Get, POSTS), 2);
    assert!(harness.store.pair().is_none());
    assert!(!harness.controller.is_authenticated());
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::LoggedOut { reason: LogoutReason::RetryRejected }
    );
}

/// Validates the concurrent near-expiry scenario.
///
/// Assertions:
/// - Three concurrent requests trigger exactly one refresh
/// - Every request is sent with the refreshed token
#[tokio::test]
async fn concurrent_requests_near_expiry_refresh_once() {
    let harness = Harness::with_session(pair_expiring_in("a", 1)).await;
    harness.transport.respond(HttpMethod::Get, POSTS, 200, serde_json::json!([]));
    refresh_succeeds(&harness, "b");
    harness.transport.delay(HttpMethod::Post, TOKEN_REFRESH_PATH, Duration::from_millis(30));

    let (a, b, c) = tokio::join!(
        harness.executor.execute(ApiRequest::get(POSTS)),
        harness.executor.execute(ApiRequest::get(POSTS)),
        harness.executor.execute(ApiRequest::get(POSTS)),
    );

    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    assert_eq!(refresh_calls(&harness), 1);
    assert_eq!(
        harness.transport.bearers_to(HttpMethod::Get, POSTS),
        ["access-b", "access-b", "access-b"]
    );
}

#[tokio::test]
async fn concurrent_rejections_share_one_forced_refresh() {
    let harness = Harness::with_session(pair_expiring_in("a", 30)).await;
    harness.transport.respond(HttpMethod::Get, POSTS, 401, serde_json::json!({}));
    harness.transport.respond(HttpMethod::Get, POSTS, 401, serde_json::json!({}));
    harness.transport.respond(HttpMethod::Get, POSTS, 200, serde_json::json!([]));
    refresh_succeeds(&harness, "b");
    harness.transport.delay(HttpMethod::Post, TOKEN_REFRESH_PATH, Duration::from_millis(30));

    let (a, b) = tokio::join!(
        harness.executor.execute(ApiRequest::get(POSTS)),
        harness.executor.execute(ApiRequest::get(POSTS)),
    );

    assert!(a.is_ok() && b.is_ok());
    assert_eq!(refresh_calls(&harness), 1);
}

#[tokio::test]
async fn late_rejection_reuses_already_rotated_token() {
    let harness = Harness::with_session(pair_expiring_in("a", 30)).await;
    refresh_succeeds(&harness, "b");

    let first = harness.executor.force_refresh("access-a").await.unwrap();
    let second = harness.executor.force_refresh("access-a").await.unwrap();

    assert_eq!(first, "access-b");
    assert_eq!(second, "access-b");
    assert_eq!(refresh_calls(&harness), 1);
}

/// Validates the forced-joins-proactive scenario.
///
/// Assertions:
/// - A forced caller never receives the token it reported as rejected
/// - A second refresh runs when the joined flight handed it back
#[tokio::test]
async fn forced_refresh_joining_proactive_flight_rechecks_rejected_token() {
    let harness = Harness::with_session(pair_expiring_in("a", 1)).await;
    harness.transport.respond(
        HttpMethod::Post,
        TOKEN_REFRESH_PATH,
        200,
        token_response("access-a", "refresh-b", NOW + 60 * MINUTE_MS),
    );
    harness.transport.respond(
        HttpMethod::Post,
        TOKEN_REFRESH_PATH,
        200,
        token_response("access-c", "refresh-c", NOW + 60 * MINUTE_MS),
    );
    harness.transport.delay(HttpMethod::Post, TOKEN_REFRESH_PATH, Duration::from_millis(50));

    let executor = harness.executor.clone();
    let proactive = tokio::spawn(async move { executor.get_valid_token().await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    let forced = harness.executor.force_refresh("access-a").await.unwrap();

    assert_eq!(proactive.await.unwrap().unwrap(), "access-a");
    assert_eq!(forced, "access-c");
    assert_eq!(refresh_calls(&harness), 2);
    let sent = harness.transport.requests_to(HttpMethod::Post, TOKEN_REFRESH_PATH);
    assert_eq!(
        sent[1].body,
        Some(RequestBody::Json(serde_json::json!({ "refreshToken": "refresh-b" })))
    );
    assert_eq!(harness.store.pair().map(|p| p.access_token), Some("access-c".to_string()));
}

#[tokio::test]
async fn non_auth_errors_are_surfaced_without_refresh() {
    let harness = Harness::with_session(pair_expiring_in("a", 30)).await;
    harness.transport.respond(HttpMethod::Get, POSTS, 500, serde_json::json!({ "e": 1 }));

    let error = harness.executor.execute(ApiRequest::get(POSTS)).await.unwrap_err();

    match &error {
        AuthError::RequestFailed { status, body } => {
            assert_eq!(*status, 500);
            assert!(body.contains("\"e\":1"));
        }
        other => panic!("expected request failure, got {other:?}"),
    }
    assert!(error.is_retryable());
    assert_eq!(refresh_calls(&harness), 0);
    assert!(harness.controller.is_authenticated());
}

#[tokio::test]
async fn transport_failure_is_transient_and_keeps_session() {
    let harness = Harness::with_session(pair_expiring_in("a", 30)).await;
    harness.transport.fail(HttpMethod::Get, POSTS, TransportErrorKind::Timeout);

    let error = harness.executor.execute(ApiRequest::get(POSTS)).await.unwrap_err();

    assert!(matches!(error, AuthError::TransientFailure(_)));
    assert!(harness.store.pair().is_some());
    assert_eq!(harness.store.clears(), 0);
}

#[tokio::test]
async fn execute_json_decodes_success_body() {
    let harness = Harness::with_session(pair_expiring_in("a", 30)).await;
    harness.transport.respond(HttpMethod::Get, POSTS, 200, serde_json::json!({ "count": 3 }));

    let body: serde_json::Value =
        harness.executor.execute_json(ApiRequest::get(POSTS)).await.unwrap();

    assert_eq!(body["count"], 3);
}

#[tokio::test]
async fn cancelled_request_does_not_cancel_shared_refresh() {
    let harness = Harness::with_session(pair_expiring_in("a", 1)).await;
    refresh_succeeds(&harness, "b");
    harness.transport.delay(HttpMethod::Post, TOKEN_REFRESH_PATH, Duration::from_millis(60));

    let cancel = CancellationToken::new();
    let request = ApiRequest::get(POSTS).with_cancellation(cancel.clone());
    let executor = harness.executor.clone();
    let pending = tokio::spawn(async move { executor.execute(request).await });

    tokio::time::sleep(Duration::from_millis(10)).await;
    cancel.cancel();

    assert_eq!(pending.await.unwrap().unwrap_err(), AuthError::Cancelled);
    assert_eq!(harness.transport.calls_to(HttpMethod::Get, POSTS), 0);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.store.pair().map(|p| p.access_token), Some("access-b".to_string()));
    assert_eq!(refresh_calls(&harness), 1);
}

#[tokio::test]
async fn pre_cancelled_request_is_not_sent() {
    let harness = Harness::with_session(pair_expiring_in("a", 30)).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = harness.executor.execute(ApiRequest::get(POSTS).with_cancellation(cancel)).await;

    assert_eq!(result.unwrap_err(), AuthError::Cancelled);
    assert_eq!(harness.transport.calls(), 0);
}

#[tokio::test]
async fn refresh_finishing_after_logout_is_discarded() {
    let harness = Harness::with_session(pair_expiring_in("a", 1)).await;
    refresh_succeeds(&harness, "b");
    harness.transport.delay(HttpMethod::Post, TOKEN_REFRESH_PATH, Duration::from_millis(40));

    let executor = harness.executor.clone();
    let pending = tokio::spawn(async move { executor.get_valid_token().await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    harness.controller.logout().await;

    assert_eq!(pending.await.unwrap(), Err(AuthError::AuthenticationRequired));
    assert!(harness.store.pair().is_none());
    assert!(!harness.controller.is_authenticated());
}

#[tokio::test]
async fn storage_failure_during_refresh_is_reported() {
    let harness = Harness::with_session(pair_expiring_in("a", 1)).await;
    harness.clock.advance_ms(2 * MINUTE_MS);
    refresh_succeeds(&harness, "b");
    harness.store.set_fail_saves(true);

    let result = harness.executor.get_valid_token().await;

    assert!(matches!(result, Err(AuthError::Storage(_))));
    assert!(harness.controller.is_authenticated());
}
