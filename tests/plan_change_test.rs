use anyhow::Result;
use chrono::NaiveDate;
use family_admin::core::plan_change::FlowStage;
use family_admin::domain::forms::NewPaymentMethod;
use family_admin::domain::model::BillingCycle;
use family_admin::{AdminError, ApiClient, Session, SubscriptionService};
use httpmock::prelude::*;
use rust_decimal::Decimal;
use serde_json::json;

fn client(server: &MockServer) -> ApiClient {
    let session = Session::in_memory();
    session.login("family-token").unwrap();
    ApiClient::new(&server.base_url(), session).unwrap()
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
}

fn mock_subscription(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET).path("/subscription/current");
        then.status(200).json_body(json!({
            "success": true,
            "subscription": {
                "plan": {
                    "id": "basic",
                    "tier": "Basic",
                    "name": "Basic",
                    "price": 10,
                    "billing_cycle": "monthly",
                    "renewal_date": "2025-03-21",
                    "features": ["Calendar"]
                },
                "payment_methods": [
                    {"id": "pm_1", "brand": "visa", "last4": "4242", "exp_month": 12, "exp_year": 2027, "is_default": true},
                    {"id": "pm_2", "brand": "mastercard", "last4": "5555", "exp_month": 6, "exp_year": 2026, "is_default": false}
                ]
            }
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/subscription/plans");
        then.status(200).json_body(json!({
            "success": true,
            "plans": [
                {"id": "basic", "tier": "Basic", "name": "Basic", "price": 10, "yearlyPrice": 100, "features": ["Calendar"]},
                {"id": "professional", "tier": "Professional", "name": "Professional", "price": 25, "yearlyPrice": 250, "features": ["Calendar", "Meal Planning"]}
            ]
        }));
    });
}

#[tokio::test]
async fn test_upgrade_estimate_and_confirm() -> Result<()> {
    let server = MockServer::start();
    mock_subscription(&server);
    let change = server.mock(|when, then| {
        when.method(PUT)
            .path("/subscription/current")
            .header("Authorization", "Bearer family-token")
            .json_body(json!({
                "plan_id": "professional",
                "billing_cycle": "monthly",
                "payment_method_id": "pm_1",
                "proration_behavior": "create_prorations",
                "effective_immediately": true
            }));
        then.status(200).json_body(json!({"success": true}));
    });

    let service = SubscriptionService::new(client(&server));
    let mut flow = service.open_flow(today()).await?;
    assert_eq!(flow.stage(), FlowStage::Browsing);
    assert_eq!(flow.selected_payment_method().unwrap().id, "pm_1");

    flow.select_plan("professional")?;
    let estimate = flow.prorated_estimate().unwrap();
    assert_eq!(estimate.amount, Decimal::new(1000, 2));
    assert_eq!(estimate.label(), "$10.00 (estimate)");

    flow.continue_to_confirm()?;
    let updated = flow.confirm(&service).await?;
    assert_eq!(updated.tier, "Professional");
    assert_eq!(updated.price, Decimal::new(25, 0));

    change.assert();
    assert_eq!(flow.stage(), FlowStage::Succeeded);
    Ok(())
}

#[tokio::test]
async fn test_failed_change_keeps_current_plan() -> Result<()> {
    let server = MockServer::start();
    mock_subscription(&server);
    let change = server.mock(|when, then| {
        when.method(PUT).path("/subscription/current");
        then.status(402)
            .json_body(json!({"message": "Your card was declined"}));
    });

    let service = SubscriptionService::new(client(&server));
    let mut flow = service.open_flow(today()).await?;
    flow.select_plan("professional")?;
    flow.select_payment_method("pm_2")?;
    flow.continue_to_confirm()?;

    let err = flow.confirm(&service).await.unwrap_err();
    assert!(matches!(err, AdminError::ApiError { status: 402, .. }));
    change.assert();

    assert_eq!(flow.current().tier, "Basic");
    assert_eq!(flow.stage(), FlowStage::PlanSelected);
    assert_eq!(
        flow.error(),
        Some("Failed to update subscription. Your card was declined")
    );
    Ok(())
}

#[tokio::test]
async fn test_same_plan_offers_no_change() -> Result<()> {
    let server = MockServer::start();
    mock_subscription(&server);
    let change = server.mock(|when, then| {
        when.method(PUT).path("/subscription/current");
        then.status(200).json_body(json!({"success": true}));
    });

    let service = SubscriptionService::new(client(&server));
    let mut flow = service.open_flow(today()).await?;
    flow.select_plan("basic")?;

    assert!(!flow.is_plan_change());
    assert!(flow.prorated_estimate().is_none());
    assert!(matches!(
        flow.continue_to_confirm(),
        Err(AdminError::InvalidState { .. })
    ));
    assert!(flow.confirm(&service).await.is_err());
    assert_eq!(change.hits(), 0);
    assert_eq!(service.quote_for(&flow).await?, None);
    Ok(())
}

#[tokio::test]
async fn test_server_quote_uses_cycle_suffixed_plan_id() -> Result<()> {
    let server = MockServer::start();
    mock_subscription(&server);
    let quote = server.mock(|when, then| {
        when.method(POST).path("/subscription/proration").json_body(json!({
            "current_plan_id": "basic_yearly",
            "new_plan_id": "professional"
        }));
        then.status(200)
            .json_body(json!({"success": true, "prorated_amount": 9.68}));
    });

    let service = SubscriptionService::new(client(&server));
    let mut flow = service.open_flow(today()).await?;
    flow.set_billing_cycle(BillingCycle::Yearly)?;
    flow.select_plan("professional")?;

    let amount = service.quote_for(&flow).await?;
    quote.assert();
    assert_eq!(amount.map(|a| a.round_dp(2)), Some(Decimal::new(968, 2)));
    Ok(())
}

#[tokio::test]
async fn test_plans_are_filtered_by_app_name() -> Result<()> {
    let server = MockServer::start();
    let plans = server.mock(|when, then| {
        when.method(GET)
            .path("/subscription/plans")
            .query_param("app_name", "meal-planner");
        then.status(200).json_body(json!({"success": true, "plans": []}));
    });

    let service = SubscriptionService::new(client(&server))
        .with_app_name(Some("meal-planner".to_string()));
    assert!(service.plans().await?.is_empty());
    plans.assert();
    Ok(())
}

#[tokio::test]
async fn test_payment_method_management() -> Result<()> {
    let server = MockServer::start();
    let add = server.mock(|when, then| {
        when.method(POST).path("/subscription/payment-methods").json_body(json!({
            "payment_method_token": "tok_visa",
            "set_as_default": true
        }));
        then.status(201).json_body(json!({"success": true}));
    });
    let set_default = server.mock(|when, then| {
        when.method(PUT).path("/subscription/payment-methods/pm_2/default");
        then.status(200).json_body(json!({"success": true}));
    });
    let list = server.mock(|when, then| {
        when.method(GET).path("/subscription/payment-methods");
        then.status(200).json_body(json!({
            "success": true,
            "payment_methods": [
                {"id": "pm_2", "brand": "visa", "last4": "4242", "exp_month": 1, "exp_year": 2030, "is_default": true}
            ]
        }));
    });

    let service = SubscriptionService::new(client(&server));
    let methods = service
        .add_payment_method(&NewPaymentMethod {
            payment_method_token: "tok_visa".to_string(),
            set_as_default: true,
        })
        .await?;
    assert_eq!(methods[0].label(), "visa ending in 4242");

    service.set_default_payment_method("pm_2").await?;
    add.assert();
    set_default.assert();
    list.assert_hits(2);

    let err = service
        .add_payment_method(&NewPaymentMethod {
            payment_method_token: " ".to_string(),
            set_as_default: false,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AdminError::ValidationError { .. }));
    add.assert_hits(1);
    Ok(())
}

#[tokio::test]
async fn test_cancel_sends_flag_in_body() -> Result<()> {
    let server = MockServer::start();
    let cancel = server.mock(|when, then| {
        when.method(DELETE)
            .path("/subscription/sub_42")
            .json_body(json!({"cancelImmediately": false}));
        then.status(200).json_body(json!({"success": true}));
    });

    let service = SubscriptionService::new(client(&server));
    service.cancel("sub_42", false).await?;
    cancel.assert();
    Ok(())
}
