//! Integration tests for login, registration, token refresh and role checks

use axum::http::{Method, StatusCode};
use hr_service::models::Role;
use serde_json::json;

#[path = "test_utils/mod.rs"]
mod test_utils;

use test_utils::{ADMIN_EMAIL, ADMIN_PASSWORD, TestApp};

#[tokio::test]
async fn root_and_health_are_public() {
    let app = TestApp::new().await.unwrap();

    let (status, body) = app.request(Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "hr-service");

    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "ok");
}

#[tokio::test]
async fn login_returns_tokens_and_user() {
    let app = TestApp::new().await.unwrap();

    let (status, body) = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body["refreshToken"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["expiresIn"], 86_400);
    assert_eq!(body["user"]["email"], ADMIN_EMAIL);
    assert_eq!(body["user"]["role"], "admin");
    assert!(body["user"]["lastLogin"].is_string());
    assert!(body["user"].get("passwordHash").is_none());
    assert!(body["employee"].is_null());
}

#[tokio::test]
async fn login_failures_are_unauthorized() {
    let app = TestApp::new().await.unwrap();
    let user_id = app
        .create_user("inactive@hr.com", "secret1", Role::Employee, None)
        .await;
    let admin = app.admin_token().await;
    let (status, _) = app
        .put(
            &format!("/api/v1/admin/users/{user_id}"),
            &admin,
            json!({ "isActive": false }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let cases = [
        ("nobody@hr.com", "password", "Invalid credentials"),
        (ADMIN_EMAIL, "wrong-password", "Invalid credentials"),
        ("inactive@hr.com", "secret1", "Account is inactive"),
    ];
    for (email, password, message) in cases {
        let (status, body) = app
            .post(
                "/api/v1/auth/login",
                None,
                json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{email}");
        assert_eq!(body["message"], message);
        assert_eq!(body["code"], "UNAUTHORIZED");
    }
}

#[tokio::test]
async fn register_validates_and_rejects_duplicates() {
    let app = TestApp::new().await.unwrap();

    let (status, body) = app
        .post(
            "/api/v1/auth/register",
            None,
            json!({ "email": "new.hire@hr.com", "password": "s3cret!" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "User created successfully");
    assert_eq!(body["user"]["role"], "employee");

    let (status, body) = app
        .post(
            "/api/v1/auth/register",
            None,
            json!({ "email": "New.Hire@hr.com", "password": "s3cret!" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "User already exists");

    let (status, body) = app
        .post(
            "/api/v1/auth/register",
            None,
            json!({ "email": "not-an-email", "password": "123" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["email"].is_string());
    assert!(body["details"]["password"].is_string());

    let (status, _) = app
        .post(
            "/api/v1/auth/register",
            None,
            json!({ "email": "linked@hr.com", "password": "s3cret!", "employeeId": 999 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn refresh_issues_new_access_token() {
    let app = TestApp::new().await.unwrap();
    let (_, login) = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
        )
        .await;
    let refresh_token = login["refreshToken"].as_str().unwrap();
    let access_token = login["token"].as_str().unwrap();

    let (status, body) = app
        .post(
            "/api/v1/auth/refresh",
            None,
            json!({ "refreshToken": refresh_token }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let new_token = body["token"].as_str().unwrap();
    let (status, _) = app.get("/api/v1/auth/profile", new_token).await;
    assert_eq!(status, StatusCode::OK);

    // an access token is not a refresh token
    let (status, _) = app
        .post(
            "/api/v1/auth/refresh",
            None,
            json!({ "refreshToken": access_token }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn change_password_checks_current_and_revokes_refresh_token() {
    let app = TestApp::new().await.unwrap();
    app.create_user("jane@hr.com", "first-pass", Role::Employee, None)
        .await;
    let (_, login) = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({ "email": "jane@hr.com", "password": "first-pass" }),
        )
        .await;
    let token = login["token"].as_str().unwrap();
    let refresh_token = login["refreshToken"].as_str().unwrap();

    let (status, body) = app
        .post(
            "/api/v1/auth/change-password",
            Some(token),
            json!({ "currentPassword": "wrong", "newPassword": "second-pass" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Current password is incorrect");

    let (status, body) = app
        .post(
            "/api/v1/auth/change-password",
            Some(token),
            json!({ "currentPassword": "first-pass", "newPassword": "second-pass" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password changed successfully");

    let (status, _) = app
        .post(
            "/api/v1/auth/refresh",
            None,
            json!({ "refreshToken": refresh_token }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    app.login("jane@hr.com", "second-pass").await;
}

#[tokio::test]
async fn profile_includes_linked_employee() {
    let app = TestApp::new().await.unwrap();
    let employee_id = app.create_employee("Jane", "jane.employee@hr.com").await;
    app.create_user("jane@hr.com", "secret1", Role::Employee, Some(employee_id))
        .await;
    let token = app.login("jane@hr.com", "secret1").await;

    let (status, body) = app.get("/api/v1/auth/profile", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["employeeId"], employee_id);
    assert_eq!(body["employee"]["firstName"], "Jane");
    assert_eq!(body["employee"]["department"]["name"], "Engineering");
}

#[tokio::test]
async fn protected_routes_require_token_and_role() {
    let app = TestApp::new().await.unwrap();

    let (status, body) = app
        .request(Method::GET, "/api/v1/employees", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["trace_id"].is_string());

    let (status, _) = app.get("/api/v1/employees", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    app.create_user("staff@hr.com", "secret1", Role::Employee, None)
        .await;
    let token = app.login("staff@hr.com", "secret1").await;

    let (status, _) = app.get("/api/v1/employees", &token).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/api/v1/admin/users", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}
