use anyhow::Result;
use family_admin::app::affiliate::{LinksScreen, NetworksScreen};
use family_admin::core::affiliate::LinkSortField;
use family_admin::domain::forms::{AffiliateLinkForm, NetworkForm};
use family_admin::domain::model::StatsPeriod;
use family_admin::{AdminError, ApiClient, Session};
use httpmock::prelude::*;
use rust_decimal::Decimal;
use serde_json::json;

fn client(server: &MockServer) -> ApiClient {
    let session = Session::in_memory();
    session.login("admin-token").unwrap();
    ApiClient::new(&server.base_url(), session).unwrap()
}

fn links_body() -> serde_json::Value {
    json!({
        "links": [
            {"id": 1, "name": "Kitchen Mixer", "original_url": "https://amazon.com/product/12345", "short_code": "abcd123", "network": "amazon", "clicks": 156, "conversions": 12, "commission_earned": 45.5},
            {"id": 2, "name": "Gaming Laptop", "original_url": "https://amazon.com/product/67890", "short_code": "efgh456", "network": "amazon", "clicks": 324, "conversions": 5, "commission_earned": 120},
            {"id": 3, "name": "Children's Backpack", "original_url": "https://walmart.com/ip/42", "short_code": "ijkl789", "network": "walmart", "clicks": 89, "conversions": 7, "commission_earned": 12.25}
        ]
    })
}

#[tokio::test]
async fn test_network_toggle_uses_patch() -> Result<()> {
    let server = MockServer::start();
    let toggle = server.mock(|when, then| {
        when.method("PATCH")
            .path("/admin/affiliate/networks/2")
            .json_body(json!({"is_active": false}));
        then.status(200).json_body(json!({"message": "updated"}));
    });
    let list = server.mock(|when, then| {
        when.method(GET).path("/admin/affiliate/networks");
        then.status(200).json_body(json!({
            "networks": [
                {"id": 2, "name": "walmart", "display_name": "Walmart", "affiliate_id": "wm-1", "base_commission_rate": 3.5, "is_active": false}
            ]
        }));
    });

    let mut screen = NetworksScreen::new(client(&server));
    screen.set_active(2, false).await?;

    toggle.assert();
    list.assert_hits(1);
    assert!(!screen.networks()[0].is_active);
    assert_eq!(
        screen.state().banner().unwrap().message,
        "Network deactivated successfully!"
    );
    assert!(screen.find("WALMART").is_some());
    Ok(())
}

#[tokio::test]
async fn test_network_commission_out_of_range() {
    let server = MockServer::start();
    let create = server.mock(|when, then| {
        when.method(POST).path("/admin/affiliate/networks");
        then.status(201);
    });

    let mut screen = NetworksScreen::new(client(&server));
    let err = screen
        .create(&NetworkForm {
            name: "target".to_string(),
            display_name: "Target".to_string(),
            affiliate_id: "tg-1".to_string(),
            url_pattern: None,
            tracking_param: None,
            base_commission_rate: Decimal::new(150, 0),
            is_active: true,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AdminError::ValidationError { .. }));
    assert_eq!(create.hits(), 0);
}

#[tokio::test]
async fn test_link_missing_fields_are_rejected() {
    let server = MockServer::start();
    let create = server.mock(|when, then| {
        when.method(POST).path("/admin/affiliate/links");
        then.status(201);
    });

    let mut screen = LinksScreen::new(client(&server));
    let err = screen
        .create(&AffiliateLinkForm {
            name: "Lamp".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();

    assert_eq!(err.user_friendly_message(), "Please fill in all required fields");
    assert_eq!(create.hits(), 0);
    assert_eq!(
        screen.state().banner().unwrap().message,
        "Failed to save link. Please fill in all required fields"
    );
}

#[tokio::test]
async fn test_link_search_sort_and_page() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/admin/affiliate/links");
        then.status(200).json_body(links_body());
    });

    let mut screen = LinksScreen::new(client(&server));
    screen.load().await?;

    screen.query_mut().set_search("amazon");
    screen.query_mut().sort_by(LinkSortField::Clicks);
    let page = screen.visible();
    let ids: Vec<i64> = page.items.iter().map(|l| l.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(page.total_pages, 1);

    screen.query_mut().sort_by(LinkSortField::Clicks);
    let ids: Vec<i64> = screen.visible().items.iter().map(|l| l.id).collect();
    assert_eq!(ids, vec![2, 1]);

    screen.query_mut().set_search("");
    screen.query_mut().sort_by(LinkSortField::Name);
    let names: Vec<String> = screen
        .visible()
        .items
        .iter()
        .map(|l| l.name.clone())
        .collect();
    assert_eq!(
        names,
        vec!["Children's Backpack", "Gaming Laptop", "Kitchen Mixer"]
    );
    Ok(())
}

#[tokio::test]
async fn test_link_stats_period_query() -> Result<()> {
    let server = MockServer::start();
    let stats = server.mock(|when, then| {
        when.method(GET)
            .path("/admin/affiliate/links/1/stats")
            .query_param("period", "week");
        then.status(200).json_body(json!({
            "stats": {"link_id": 1, "period": "week", "clicks": 40, "conversions": 3, "commission_earned": 9.5}
        }));
    });

    let mut screen = LinksScreen::new(client(&server));
    let result = screen.stats(1, StatsPeriod::Week).await?;
    stats.assert();
    assert_eq!(result.clicks, 40);
    assert_eq!(result.period, StatsPeriod::Week);
    Ok(())
}

#[tokio::test]
async fn test_create_link_with_generated_url() -> Result<()> {
    let server = MockServer::start();
    let create = server.mock(|when, then| {
        when.method(POST).path("/admin/affiliate/links").json_body(json!({
            "name": "Kitchen Mixer",
            "original_url": "https://amazon.com/product/12345",
            "affiliate_url": "https://amazon.com/product/12345?tag=familyapp-20",
            "network": "amazon",
            "is_active": true
        }));
        then.status(201).json_body(json!({"message": "created"}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/admin/affiliate/links");
        then.status(200).json_body(links_body());
    });
    server.mock(|when, then| {
        when.method(GET).path("/admin/affiliate/networks");
        then.status(200).json_body(json!({
            "networks": [
                {"id": 1, "name": "amazon", "display_name": "Amazon Associates", "affiliate_id": "familyapp-20", "base_commission_rate": 4}
            ]
        }));
    });

    let mut networks = NetworksScreen::new(client(&server));
    networks.load().await?;

    let mut form = AffiliateLinkForm {
        name: "Kitchen Mixer".to_string(),
        original_url: "https://amazon.com/product/12345".to_string(),
        network: "amazon".to_string(),
        is_active: true,
        ..Default::default()
    };
    LinksScreen::prepare(&mut form, networks.find("amazon"))?;

    let mut links = LinksScreen::new(client(&server));
    links.create(&form).await?;
    create.assert();
    assert_eq!(links.state().items().len(), 3);
    Ok(())
}
