use anyhow::Result;
use family_admin::app::auth::AuthService;
use family_admin::domain::forms::LoginRequest;
use family_admin::domain::ports::SessionStore;
use family_admin::{AdminError, ApiClient, FileSessionStore, Session};
use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_login_persists_token_for_next_run() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let session_path = temp_dir.path().join("session");

    let server = MockServer::start();
    let login = server.mock(|when, then| {
        when.method(POST).path("/auth/login").json_body(json!({
            "email": "admin@example.com",
            "password": "secret1"
        }));
        then.status(200).json_body(json!({
            "token": "fresh-token",
            "user": {"id": 1, "name": "Admin", "email": "admin@example.com", "role": "admin"}
        }));
    });
    let list = server.mock(|when, then| {
        when.method(GET)
            .path("/admin/users")
            .header("Authorization", "Bearer fresh-token");
        then.status(200).json_body(json!({"users": []}));
    });

    let session = Session::restore(Arc::new(FileSessionStore::new(&session_path)))?;
    assert!(!session.is_authenticated());
    let auth = AuthService::new(ApiClient::new(&server.base_url(), session)?);
    let user = auth
        .login(&LoginRequest {
            email: "admin@example.com".to_string(),
            password: "secret1".to_string(),
        })
        .await?;
    login.assert();
    assert_eq!(user.map(|u| u.id), Some(1));
    assert_eq!(std::fs::read_to_string(&session_path)?, "fresh-token");

    // 下一次執行從檔案還原 session
    let restored = Session::restore(Arc::new(FileSessionStore::new(&session_path)))?;
    let api = ApiClient::new(&server.base_url(), restored)?;
    let _: serde_json::Value = api.get("/admin/users").await?;
    list.assert();
    Ok(())
}

#[tokio::test]
async fn test_rejected_token_removes_session_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = FileSessionStore::new(temp_dir.path().join("session"));
    store.save("expired-token")?;

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/admin/families");
        then.status(401).json_body(json!({"message": "Token expired"}));
    });

    let session = Session::restore(Arc::new(store.clone()))?;
    let api = ApiClient::new(&server.base_url(), session.clone())?;
    let err = api
        .get::<serde_json::Value>("/admin/families")
        .await
        .unwrap_err();

    assert!(matches!(err, AdminError::Unauthorized { message: None }));
    assert!(!session.is_authenticated());
    assert_eq!(store.load()?, None);
    Ok(())
}

#[tokio::test]
async fn test_invalid_login_form_sends_nothing() {
    let server = MockServer::start();
    let login = server.mock(|when, then| {
        when.method(POST).path("/auth/login");
        then.status(200).json_body(json!({"token": "t"}));
    });

    let auth = AuthService::new(ApiClient::new(&server.base_url(), Session::in_memory()).unwrap());
    let err = auth
        .login(&LoginRequest {
            email: "not-an-email".to_string(),
            password: "secret1".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AdminError::ValidationError { .. }));
    assert_eq!(login.hits(), 0);
}

#[tokio::test]
async fn test_bad_credentials_message_is_shown() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/auth/login");
        then.status(400)
            .json_body(json!({"error": "Invalid email or password"}));
    });

    let session = Session::in_memory();
    let auth = AuthService::new(ApiClient::new(&server.base_url(), session.clone()).unwrap());
    let err = auth
        .login(&LoginRequest {
            email: "admin@example.com".to_string(),
            password: "wrong-password".to_string(),
        })
        .await
        .unwrap_err();

    assert_eq!(err.user_friendly_message(), "Invalid email or password");
    assert!(!session.is_authenticated());
}

#[test]
fn test_logout_clears_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("session");
    let store = Arc::new(FileSessionStore::new(&path));
    store.save("token")?;

    let session = Session::restore(store)?;
    assert!(session.is_authenticated());
    session.logout()?;
    assert!(!session.is_authenticated());
    assert!(!path.exists());
    Ok(())
}

#[tokio::test]
async fn test_rejected_credentials_show_server_message() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = FileSessionStore::new(temp_dir.path().join("session"));
    store.save("previous-token")?;

    let server = MockServer::start();
    let login = server.mock(|when, then| {
        when.method(POST).path("/auth/login");
        then.status(401)
            .json_body(json!({"message": "Invalid email or password"}));
    });

    let session = Session::restore(Arc::new(store.clone()))?;
    let auth = AuthService::new(ApiClient::new(&server.base_url(), session.clone())?);
    let err = auth
        .login(&LoginRequest {
            email: "admin@example.com".to_string(),
            password: "wrong-password".to_string(),
        })
        .await
        .unwrap_err();

    login.assert();
    assert_eq!(err.user_friendly_message(), "Invalid email or password");
    assert!(session.is_authenticated());
    assert_eq!(store.load()?.as_deref(), Some("previous-token"));
    Ok(())
}
