//! Integration tests for admin login, sessions and lockout.

use gfx_studio_integration_tests::{ADMIN_IP, ADMIN_PASSWORD, TestApp};
use gfx_studio_server::services::notify::Notification;
use reqwest::StatusCode;
use serde_json::{Value, json};

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn test_login_returns_token_and_expiry() {
    let app = TestApp::spawn().await;

    let resp = app.admin_login(ADMIN_IP, ADMIN_PASSWORD).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("JSON body");
    assert_eq!(body["success"], true);
    assert_eq!(body["token"].as_str().map(str::len), Some(64));
    assert!(body["expiresAt"].is_string());
}

#[tokio::test]
async fn test_wrong_password_is_plain_unauthorized() {
    let app = TestApp::spawn().await;

    let resp = app.admin_login(ADMIN_IP, "not the password").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.expect("JSON body");
    assert_eq!(body, json!({ "error": "Unauthorized" }));
}

#[tokio::test]
async fn test_login_attempts_are_notified() {
    let app = TestApp::spawn().await;

    let _ = app
        .post_admin(
            "198.51.100.4",
            &json!({ "action": "login", "password": "nope", "discordUser": "nelly" }),
        )
        .await;
    let notification = app.next_notification().await.expect("failure notification");
    assert_eq!(
        notification,
        Notification::AdminLoginAttempt {
            identity: "198.51.100.4".to_string(),
            success: false,
            discord_user: Some("nelly".to_string()),
        }
    );

    let _ = app.admin_token().await;
    let notification = app.next_notification().await.expect("success notification");
    assert!(matches!(
        notification,
        Notification::AdminLoginAttempt { success: true, .. }
    ));
}

// ============================================================================
// Lockout
// ============================================================================

#[tokio::test]
async fn test_sixth_attempt_locked_even_with_correct_password() {
    let app = TestApp::spawn().await;
    let attacker = "198.51.100.77";

    for _ in 0..5 {
        let resp = app.admin_login(attacker, "guess-guess-guess").await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    let resp = app.admin_login(attacker, ADMIN_PASSWORD).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    let retry_after: u64 = resp
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .expect("Retry-After header");
    assert!(retry_after > 0);
    assert!(retry_after <= 15 * 60);

    // Another client is unaffected.
    let resp = app.admin_login("198.51.100.78", ADMIN_PASSWORD).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_guesses_are_locked_out() {
    let app = TestApp::spawn().await;
    let attacker = "198.51.100.77";

    let handles: Vec<_> = (0..40)
        .map(|_| {
            let request = app
                .client
                .post(app.url("/admin-data"))
                .header("x-forwarded-for", attacker)
                .json(&json!({ "action": "login", "password": "guess-guess-guess" }));
            tokio::spawn(async move { request.send().await.expect("request").status() })
        })
        .collect();

    let mut unauthorized = 0;
    let mut locked = 0;
    for handle in handles {
        match handle.await.expect("login task") {
            StatusCode::UNAUTHORIZED => unauthorized += 1,
            StatusCode::TOO_MANY_REQUESTS => locked += 1,
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(unauthorized, 5);
    assert_eq!(locked, 35);

    let resp = app.admin_login(attacker, ADMIN_PASSWORD).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_success_resets_failure_count() {
    let app = TestApp::spawn().await;
    let ip = "198.51.100.90";

    for _ in 0..4 {
        let _ = app.admin_login(ip, "wrong-wrong-wrong").await;
    }
    assert_eq!(
        app.admin_login(ip, ADMIN_PASSWORD).await.status(),
        StatusCode::OK
    );

    for _ in 0..4 {
        let _ = app.admin_login(ip, "wrong-wrong-wrong").await;
    }
    assert_eq!(
        app.admin_login(ip, ADMIN_PASSWORD).await.status(),
        StatusCode::OK
    );
}

// ============================================================================
// Sessions
// ============================================================================

#[tokio::test]
async fn test_token_transports() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;

    let via_query = app.get_admin_data(Some(&token)).await;
    assert_eq!(via_query["authenticated"], true);

    let via_header: Value = app
        .client
        .get(app.url("/admin-data"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("JSON body");
    assert_eq!(via_header["authenticated"], true);

    let resp = app
        .post_admin(
            ADMIN_IP,
            &json!({ "action": "saveData", "token": token, "servicePrices": { "logo": 22 } }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;

    let resp = app
        .post_admin(ADMIN_IP, &json!({ "action": "logout", "token": token }))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let data = app.get_admin_data(Some(&token)).await;
    assert_eq!(data["authenticated"], false);
    assert!(data.get("orders").is_none());

    let resp = app
        .post_admin(
            ADMIN_IP,
            &json!({ "action": "saveData", "token": token, "orders": [] }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_garbage_token_is_unauthenticated() {
    let app = TestApp::spawn().await;

    let data = app.get_admin_data(Some("deadbeef")).await;
    assert_eq!(data["authenticated"], false);
}

// ============================================================================
// Password change
// ============================================================================

#[tokio::test]
async fn test_change_password_revokes_other_sessions() {
    let app = TestApp::spawn().await;
    let current = app.admin_token().await;
    let other = app.admin_token().await;
    let new_password = "an even better passphrase";

    let resp = app
        .post_admin(
            ADMIN_IP,
            &json!({
                "action": "changePassword",
                "token": current,
                "currentPassword": ADMIN_PASSWORD,
                "newPassword": new_password,
            }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    assert_eq!(app.get_admin_data(Some(&current)).await["authenticated"], true);
    assert_eq!(app.get_admin_data(Some(&other)).await["authenticated"], false);

    assert_eq!(
        app.admin_login("198.51.100.1", ADMIN_PASSWORD).await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        app.admin_login("198.51.100.2", new_password).await.status(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_change_password_rejects_weak_password() {
    let app = TestApp::spawn().await;
    let token = app.admin_token().await;

    let resp = app
        .post_admin(
            ADMIN_IP,
            &json!({
                "action": "changePassword",
                "token": token,
                "currentPassword": ADMIN_PASSWORD,
                "newPassword": "short",
            }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Old password still works.
    assert_eq!(
        app.admin_login("198.51.100.3", ADMIN_PASSWORD).await.status(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_change_password_requires_session() {
    let app = TestApp::spawn().await;

    let resp = app
        .post_admin(
            ADMIN_IP,
            &json!({
                "action": "changePassword",
                "currentPassword": ADMIN_PASSWORD,
                "newPassword": "an even better passphrase",
            }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Request shape
// ============================================================================

#[tokio::test]
async fn test_unknown_action_is_bad_request() {
    let app = TestApp::spawn().await;

    let resp = app.post_admin(ADMIN_IP, &json!({ "action": "dropTables" })).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unsupported_method() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .delete(app.url("/admin-data"))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = resp.json().await.expect("JSON body");
    assert_eq!(body["error"], "Method not allowed");
}
