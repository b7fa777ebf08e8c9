use anyhow::Result;
use family_admin::app::billing::{BillingOverview, TiersScreen};
use family_admin::app::families::FamiliesScreen;
use family_admin::core::resource::{OutputFormat, ResourceTable};
use family_admin::domain::forms::{FamilyForm, MembershipForm, TierForm};
use family_admin::domain::model::{PaymentStatus, SubscriptionStatus};
use family_admin::{AdminError, ApiClient, Session};
use httpmock::prelude::*;
use rust_decimal::Decimal;
use serde_json::json;

fn client(server: &MockServer) -> ApiClient {
    let session = Session::in_memory();
    session.login("admin-token").unwrap();
    ApiClient::new(&server.base_url(), session).unwrap()
}

fn families_body() -> serde_json::Value {
    json!({
        "families": [
            {
                "id": 7,
                "family_name": "Lovelace",
                "billing_email": "billing@lovelace.example",
                "Members": [
                    {"id": 2, "name": "Ada", "role": "parent", "is_admin": true},
                    {"id": 3, "name": "Byron", "role": "child", "is_admin": false}
                ]
            }
        ]
    })
}

#[tokio::test]
async fn test_family_crud_refetches() -> Result<()> {
    let server = MockServer::start();
    let list = server.mock(|when, then| {
        when.method(GET).path("/admin/families");
        then.status(200).json_body(families_body());
    });
    let create = server.mock(|when, then| {
        when.method(POST)
            .path("/admin/families")
            .json_body(json!({"family_name": "Babbage"}));
        then.status(201)
            .json_body(json!({"family": {"id": 8, "family_name": "Babbage"}}));
    });
    let delete = server.mock(|when, then| {
        when.method(DELETE).path("/admin/families/8");
        then.status(200).json_body(json!({"message": "deleted"}));
    });

    let mut screen = FamiliesScreen::new(client(&server));
    screen
        .create(&FamilyForm {
            family_name: "Babbage".to_string(),
            ..Default::default()
        })
        .await?;
    screen.delete(8).await?;

    create.assert();
    delete.assert();
    list.assert_hits(2);
    assert_eq!(screen.families()[0].members.len(), 2);
    assert_eq!(
        screen.state().banner().unwrap().message,
        "Family deleted successfully!"
    );
    Ok(())
}

#[tokio::test]
async fn test_family_name_is_required() {
    let server = MockServer::start();
    let create = server.mock(|when, then| {
        when.method(POST).path("/admin/families");
        then.status(201);
    });

    let mut screen = FamiliesScreen::new(client(&server));
    let err = screen.create(&FamilyForm::default()).await.unwrap_err();

    assert!(matches!(err, AdminError::ValidationError { .. }));
    assert_eq!(create.hits(), 0);
    assert_eq!(
        screen.state().banner().unwrap().message,
        "Failed to save family. Family name is required"
    );
}

#[tokio::test]
async fn test_add_member_defaults_to_member_role() -> Result<()> {
    let server = MockServer::start();
    let add = server.mock(|when, then| {
        when.method(POST).path("/admin/families/7/members").json_body(json!({
            "user_id": 4,
            "role": "member",
            "is_admin": false
        }));
        then.status(201).json_body(json!({"message": "added"}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/admin/families");
        then.status(200).json_body(families_body());
    });

    let mut screen = FamiliesScreen::new(client(&server));
    screen
        .add_member(7, &MembershipForm::new(4, None, false))
        .await?;
    add.assert();
    Ok(())
}

#[tokio::test]
async fn test_family_members_table() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/admin/families/7");
        then.status(200)
            .json_body(json!({"family": families_body()["families"][0].clone()}));
    });

    let mut screen = FamiliesScreen::new(client(&server));
    let members = screen.members(7).await?;
    let csv = ResourceTable::new(&members)
        .without_actions()
        .render(OutputFormat::Csv)?;
    assert_eq!(
        csv,
        "User ID,Name,Email,Role,Admin\n2,Ada,-,parent,yes\n3,Byron,-,child,no\n"
    );
    Ok(())
}

#[tokio::test]
async fn test_tier_lifecycle() -> Result<()> {
    let server = MockServer::start();
    let list = server.mock(|when, then| {
        when.method(GET).path("/admin/subscription/tiers");
        then.status(200).json_body(json!({
            "tiers": [
                {"id": 1, "name": "Basic", "price_monthly": 10, "price_yearly": 100, "features": {"calendar": true}}
            ]
        }));
    });
    let create = server.mock(|when, then| {
        when.method(POST).path("/admin/subscription/tiers");
        then.status(201).json_body(json!({"message": "created"}));
    });

    let mut screen = TiersScreen::new(client(&server));
    let form = TierForm {
        name: "Professional".to_string(),
        description: Some("For busy families".to_string()),
        price_monthly: Decimal::new(25, 0),
        price_yearly: Decimal::new(250, 0),
        features: json!({"calendar": true, "meal_planning": true}),
        is_active: true,
        stripe_price_id_monthly: None,
        stripe_price_id_yearly: None,
    };
    screen.create(&form).await?;
    create.assert();
    list.assert_hits(1);
    assert!(screen.tiers()[0].is_active);

    let bad = TierForm {
        price_yearly: Decimal::new(-5, 0),
        ..form
    };
    assert!(screen.update(1, &bad).await.is_err());
    list.assert_hits(1);
    Ok(())
}

#[tokio::test]
async fn test_billing_overview() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/admin/subscription/active");
        then.status(200).json_body(json!({
            "subscriptions": [
                {"id": 5, "family_name": "Lovelace", "tier_name": "Basic", "status": "past_due", "cancel_at_period_end": false}
            ]
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/admin/subscription/payments");
        then.status(500).json_body(json!({"message": "Stripe unavailable"}));
    });

    let mut overview = BillingOverview::new(client(&server));
    let subscriptions = overview.load_subscriptions().await?.to_vec();
    assert_eq!(subscriptions[0].status, SubscriptionStatus::PastDue);
    let table = ResourceTable::new(&subscriptions).render(OutputFormat::Table)?;
    assert!(table.contains("Past Due"));

    let err = overview.load_payments().await.unwrap_err();
    assert!(matches!(err, AdminError::ApiError { status: 500, .. }));
    assert_eq!(
        overview.payments_state().banner().unwrap().message,
        "Failed to load payment history. Stripe unavailable"
    );
    assert_eq!(
        PaymentStatus::from("succeeded".to_string()),
        PaymentStatus::Succeeded
    );
    Ok(())
}
