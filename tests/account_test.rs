use anyhow::Result;
use family_admin::app::account::AccountScreen;
use family_admin::domain::forms::ProfileForm;
use family_admin::{AdminError, ApiClient, Session};
use httpmock::prelude::*;
use serde_json::json;

fn client(server: &MockServer) -> ApiClient {
    let session = Session::in_memory();
    session.login("user-token").unwrap();
    ApiClient::new(&server.base_url(), session).unwrap()
}

fn profile_body() -> serde_json::Value {
    json!({
        "user": {
            "id": 2,
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": "ada@example.com",
            "phone": "555-0100"
        }
    })
}

#[tokio::test]
async fn test_load_profile() -> Result<()> {
    let server = MockServer::start();
    let get = server.mock(|when, then| {
        when.method(GET)
            .path("/user/profile")
            .header("Authorization", "Bearer user-token");
        then.status(200).json_body(profile_body());
    });

    let mut screen = AccountScreen::new(client(&server));
    let profile = screen.load().await?;

    get.assert();
    assert_eq!(profile.display_name(), "Ada Lovelace");
    assert_eq!(screen.profile().unwrap().phone.as_deref(), Some("555-0100"));
    Ok(())
}

#[tokio::test]
async fn test_update_sends_whole_form_and_keeps_server_copy() -> Result<()> {
    let server = MockServer::start();
    let put = server.mock(|when, then| {
        when.method(PUT).path("/user/profile").json_body(json!({
            "first_name": "Augusta",
            "last_name": "Lovelace",
            "email": "ada@example.com"
        }));
        then.status(200).json_body(json!({
            "user": {"id": 2, "first_name": "Augusta", "last_name": "Lovelace", "email": "ada@example.com"}
        }));
    });

    let mut screen = AccountScreen::new(client(&server));
    let updated = screen
        .update(ProfileForm {
            first_name: "Augusta".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: Some("".to_string()),
        })
        .await?;

    put.assert();
    assert_eq!(updated.first_name, "Augusta");
    assert_eq!(screen.profile().unwrap().first_name, "Augusta");
    assert_eq!(
        screen.banner().unwrap().message,
        "Profile updated successfully!"
    );
    Ok(())
}

#[tokio::test]
async fn test_invalid_email_is_rejected_without_request() {
    let server = MockServer::start();
    let put = server.mock(|when, then| {
        when.method(PUT).path("/user/profile");
        then.status(200).json_body(profile_body());
    });

    let mut screen = AccountScreen::new(client(&server));
    let err = screen
        .update(ProfileForm {
            email: "ada.example.com".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AdminError::ValidationError { .. }));
    assert_eq!(put.hits(), 0);
    let banner = screen.banner().unwrap();
    assert!(banner.is_error());
    assert!(banner.message.starts_with("Failed to update profile."));
}

#[tokio::test]
async fn test_home_without_family_or_subscription() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/user/profile");
        then.status(200).json_body(profile_body());
    });
    let family = server.mock(|when, then| {
        when.method(GET).path("/user/family");
        then.status(404).json_body(json!({"message": "No family found"}));
    });
    let current = server.mock(|when, then| {
        when.method(GET).path("/subscription/current");
        then.status(500);
    });

    let home = AccountScreen::new(client(&server)).home().await?;

    family.assert();
    current.assert();
    assert_eq!(home.profile.email, "ada@example.com");
    assert!(home.family.is_none());
    assert!(home.plan.is_none());
    Ok(())
}

#[tokio::test]
async fn test_home_with_family_and_plan() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/user/profile");
        then.status(200).json_body(profile_body());
    });
    server.mock(|when, then| {
        when.method(GET).path("/user/family");
        then.status(200).json_body(json!({
            "family": {"id": 7, "family_name": "Lovelace", "members": [
                {"user_id": 2, "role": "parent", "is_admin": true}
            ]}
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/subscription/current");
        then.status(200).json_body(json!({
            "subscription": {
                "plan": {"id": "basic", "tier": "Basic", "name": "Basic", "price": 10, "billing_cycle": "monthly", "renewal_date": "2025-03-21"}
            }
        }));
    });

    let home = AccountScreen::new(client(&server)).home().await?;

    assert_eq!(home.family.as_ref().unwrap().family_name, "Lovelace");
    assert_eq!(home.plan.as_ref().unwrap().name, "Basic");
    Ok(())
}

#[tokio::test]
async fn test_home_fails_when_profile_cannot_load() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/user/profile");
        then.status(500).json_body(json!({"message": "boom"}));
    });
    let family = server.mock(|when, then| {
        when.method(GET).path("/user/family");
        then.status(200).json_body(json!({"family": null}));
    });

    let mut screen = AccountScreen::new(client(&server));
    let err = screen.home().await.unwrap_err();

    assert!(matches!(err, AdminError::ApiError { status: 500, .. }));
    assert_eq!(family.hits(), 0);
    assert!(screen
        .banner()
        .unwrap()
        .message
        .starts_with("Failed to load profile data."));
}
