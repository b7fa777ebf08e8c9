use crate::core::affiliate::{generate_affiliate_url, LinkQuery};
use crate::core::http::ApiClient;
use crate::core::resource::{or_dash, paginate, yes_no, Column, Page, Resource, RowAction};
use crate::core::screen::ListState;
use crate::domain::forms::{ActiveToggle, AffiliateLinkForm, NetworkForm};
use crate::domain::model::{AffiliateLink, AffiliateNetwork, LinkStats, StatsPeriod};
use crate::utils::error::{AdminError, Result};
use crate::utils::validation::Validate;
use serde::Deserialize;

pub const LINKS_PER_PAGE: usize = 10;

#[derive(Debug, Deserialize)]
struct NetworksEnvelope {
    #[serde(default)]
    networks: Vec<AffiliateNetwork>,
}

#[derive(Debug, Deserialize)]
struct LinksEnvelope {
    #[serde(default)]
    links: Vec<AffiliateLink>,
}

#[derive(Debug, Deserialize)]
struct StatsEnvelope {
    stats: LinkStats,
}

impl Resource for AffiliateNetwork {
    const NAME: &'static str = "affiliate_networks";

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("id", "ID"),
            Column::new("display_name", "Network"),
            Column::new("affiliate_id", "Affiliate ID"),
            Column::new("tracking_param", "Tracking Param"),
            Column::new("base_commission_rate", "Commission %"),
            Column::new("is_active", "Active"),
        ];
        COLUMNS
    }

    fn cell(&self, key: &str) -> String {
        match key {
            "id" => self.id.to_string(),
            "display_name" => self.display_name.clone(),
            "affiliate_id" => self.affiliate_id.clone(),
            "tracking_param" => or_dash(crate::core::affiliate::tracking_param(self)),
            "base_commission_rate" => format!("{}%", self.base_commission_rate),
            "is_active" => yes_no(self.is_active),
            _ => String::new(),
        }
    }

    fn actions(&self) -> Vec<RowAction> {
        vec![RowAction::Edit, RowAction::ToggleActive, RowAction::Delete]
    }
}

impl Resource for AffiliateLink {
    const NAME: &'static str = "affiliate_links";

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("id", "ID"),
            Column::new("name", "Name"),
            Column::new("short_code", "Code"),
            Column::new("network", "Network"),
            Column::new("clicks", "Clicks"),
            Column::new("conversions", "Conversions"),
            Column::new("conversion_rate", "Conv. Rate"),
            Column::new("commission_earned", "Earned"),
            Column::new("is_active", "Active"),
        ];
        COLUMNS
    }

    fn cell(&self, key: &str) -> String {
        match key {
            "id" => self.id.to_string(),
            "name" => self.name.clone(),
            "short_code" => or_dash(self.short_code.as_deref()),
            "network" => self.network.clone(),
            "clicks" => self.clicks.to_string(),
            "conversions" => self.conversions.to_string(),
            "conversion_rate" => format!("{}%", self.conversion_rate()),
            "commission_earned" => format!("${:.2}", self.commission_earned),
            "is_active" => yes_no(self.is_active),
            _ => String::new(),
        }
    }

    fn actions(&self) -> Vec<RowAction> {
        vec![
            RowAction::Stats,
            RowAction::Edit,
            RowAction::ToggleActive,
            RowAction::Delete,
        ]
    }
}

/// 聯盟網路管理畫面
pub struct NetworksScreen {
    api: ApiClient,
    state: ListState<AffiliateNetwork>,
}

impl NetworksScreen {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: ListState::default(),
        }
    }

    pub fn state(&self) -> &ListState<AffiliateNetwork> {
        &self.state
    }

    pub fn networks(&self) -> &[AffiliateNetwork] {
        self.state.items()
    }

    pub fn find(&self, name: &str) -> Option<&AffiliateNetwork> {
        self.state
            .items()
            .iter()
            .find(|n| n.name.eq_ignore_ascii_case(name))
    }

    pub async fn load(&mut self) -> Result<&[AffiliateNetwork]> {
        match self
            .api
            .get::<NetworksEnvelope>("/admin/affiliate/networks")
            .await
        {
            Ok(envelope) => {
                self.state.replace(envelope.networks);
                self.state.clear_error();
                Ok(self.state.items())
            }
            Err(e) => Err(self.state.fail("Failed to load affiliate networks.", e)),
        }
    }

    pub async fn create(&mut self, form: &NetworkForm) -> Result<()> {
        if let Err(e) = form.validate() {
            return Err(self.state.fail("Failed to save network.", e));
        }
        if let Err(e) = self
            .api
            .post::<_, serde_json::Value>("/admin/affiliate/networks", form)
            .await
        {
            return Err(self.state.fail("Failed to save network.", e));
        }
        tracing::info!("✅ Created affiliate network {}", form.name);
        self.state.succeed("Network created successfully!");
        self.refresh().await;
        Ok(())
    }

    pub async fn update(&mut self, id: i64, form: &NetworkForm) -> Result<()> {
        if let Err(e) = form.validate() {
            return Err(self.state.fail("Failed to save network.", e));
        }
        if let Err(e) = self
            .api
            .put::<_, serde_json::Value>(&format!("/admin/affiliate/networks/{}", id), form)
            .await
        {
            return Err(self.state.fail("Failed to save network.", e));
        }
        self.state.succeed("Network updated successfully!");
        self.refresh().await;
        Ok(())
    }

    pub async fn set_active(&mut self, id: i64, is_active: bool) -> Result<()> {
        if let Err(e) = self
            .api
            .patch::<_, serde_json::Value>(
                &format!("/admin/affiliate/networks/{}", id),
                &ActiveToggle { is_active },
            )
            .await
        {
            return Err(self.state.fail("Failed to update network status.", e));
        }
        let verb = if is_active { "activated" } else { "deactivated" };
        self.state.succeed(format!("Network {} successfully!", verb));
        self.refresh().await;
        Ok(())
    }

    pub async fn delete(&mut self, id: i64) -> Result<()> {
        if let Err(e) = self
            .api
            .delete::<serde_json::Value>(&format!("/admin/affiliate/networks/{}", id))
            .await
        {
            return Err(self.state.fail("Failed to delete network.", e));
        }
        self.state.succeed("Network deleted successfully!");
        self.refresh().await;
        Ok(())
    }

    /// 變更已成功；重新載入失敗只標記清單過期，不回傳錯誤
    async fn refresh(&mut self) {
        let saved = self.state.banner().cloned();
        if let Err(e) = self.load().await {
            self.state.reload_failed(saved, &e);
        }
    }
}

/// 聯盟連結管理畫面，含搜尋、排序與分頁
pub struct LinksScreen {
    api: ApiClient,
    state: ListState<AffiliateLink>,
    query: LinkQuery,
}

impl LinksScreen {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: ListState::default(),
            query: LinkQuery::default(),
        }
    }

    pub fn state(&self) -> &ListState<AffiliateLink> {
        &self.state
    }

    pub fn query(&self) -> &LinkQuery {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut LinkQuery {
        &mut self.query
    }

    /// 依目前的搜尋與排序條件取得一頁
    pub fn visible(&self) -> Page<AffiliateLink> {
        let filtered = self.query.apply(self.state.items());
        paginate(&filtered, self.query.page, LINKS_PER_PAGE)
    }

    pub async fn load(&mut self) -> Result<&[AffiliateLink]> {
        match self.api.get::<LinksEnvelope>("/admin/affiliate/links").await {
            Ok(envelope) => {
                tracing::debug!("Loaded {} affiliate links", envelope.links.len());
                self.state.replace(envelope.links);
                self.state.clear_error();
                Ok(self.state.items())
            }
            Err(e) => Err(self.state.fail("Failed to load affiliate links.", e)),
        }
    }

    /// 沒填聯盟網址時依網路設定自動產生
    pub fn prepare(form: &mut AffiliateLinkForm, network: Option<&AffiliateNetwork>) -> Result<()> {
        if !form.affiliate_url.trim().is_empty() || form.original_url.trim().is_empty() {
            return Ok(());
        }
        let network = network.ok_or_else(|| {
            AdminError::validation(
                "network",
                format!("Unknown affiliate network '{}'", form.network),
            )
        })?;
        form.affiliate_url = generate_affiliate_url(network, &form.original_url)?;
        Ok(())
    }

    pub async fn create(&mut self, form: &AffiliateLinkForm) -> Result<()> {
        if let Err(e) = form.validate() {
            return Err(self.state.fail("Failed to save link.", e));
        }
        if let Err(e) = self
            .api
            .post::<_, serde_json::Value>("/admin/affiliate/links", form)
            .await
        {
            return Err(self.state.fail("Failed to save link.", e));
        }
        tracing::info!("✅ Created affiliate link {}", form.name);
        self.state.succeed("Affiliate link created successfully!");
        self.refresh().await;
        Ok(())
    }

    pub async fn update(&mut self, id: i64, form: &AffiliateLinkForm) -> Result<()> {
        if let Err(e) = form.validate() {
            return Err(self.state.fail("Failed to save link.", e));
        }
        if let Err(e) = self
            .api
            .put::<_, serde_json::Value>(&format!("/admin/affiliate/links/{}", id), form)
            .await
        {
            return Err(self.state.fail("Failed to save link.", e));
        }
        self.state.succeed("Affiliate link updated successfully!");
        self.refresh().await;
        Ok(())
    }

    pub async fn set_active(&mut self, id: i64, is_active: bool) -> Result<()> {
        if let Err(e) = self
            .api
            .patch::<_, serde_json::Value>(
                &format!("/admin/affiliate/links/{}", id),
                &ActiveToggle { is_active },
            )
            .await
        {
            return Err(self.state.fail("Failed to update link status.", e));
        }
        let verb = if is_active { "activated" } else { "deactivated" };
        self.state.succeed(format!("Affiliate link {} successfully!", verb));
        self.refresh().await;
        Ok(())
    }

    pub async fn delete(&mut self, id: i64) -> Result<()> {
        if let Err(e) = self
            .api
            .delete::<serde_json::Value>(&format!("/admin/affiliate/links/{}", id))
            .await
        {
            return Err(self.state.fail("Failed to delete link.", e));
        }
        self.state.succeed("Affiliate link deleted successfully!");
        self.refresh().await;
        Ok(())
    }

    pub async fn stats(&mut self, id: i64, period: StatsPeriod) -> Result<LinkStats> {
        match self
            .api
            .get::<StatsEnvelope>(&format!(
                "/admin/affiliate/links/{}/stats?period={}",
                id,
                period.as_str()
            ))
            .await
        {
            Ok(envelope) => Ok(envelope.stats),
            Err(e) => Err(self.state.fail("Failed to load link statistics.", e)),
        }
    }

    async fn refresh(&mut self) -> Result<()> {
        self.load().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn amazon() -> AffiliateNetwork {
        AffiliateNetwork {
            id: 1,
            name: "amazon".to_string(),
            display_name: "Amazon Associates".to_string(),
            affiliate_id: "familyapp-20".to_string(),
            url_pattern: None,
            tracking_param: None,
            base_commission_rate: Decimal::new(4, 0),
            is_active: true,
            webhook_endpoint: None,
        }
    }

    #[test]
    fn test_prepare_generates_missing_affiliate_url() {
        let mut form = AffiliateLinkForm {
            name: "Kitchen Mixer".to_string(),
            original_url: "https://amazon.com/product/12345".to_string(),
            network: "amazon".to_string(),
            ..Default::default()
        };
        LinksScreen::prepare(&mut form, Some(&amazon())).unwrap();
        assert_eq!(
            form.affiliate_url,
            "https://amazon.com/product/12345?tag=familyapp-20"
        );
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_prepare_keeps_explicit_affiliate_url() {
        let mut form = AffiliateLinkForm {
            name: "Kitchen Mixer".to_string(),
            original_url: "https://amazon.com/product/12345".to_string(),
            affiliate_url: "https://amzn.to/abc".to_string(),
            network: "amazon".to_string(),
            ..Default::default()
        };
        LinksScreen::prepare(&mut form, None).unwrap();
        assert_eq!(form.affiliate_url, "https://amzn.to/abc");
    }

    #[test]
    fn test_prepare_requires_known_network() {
        let mut form = AffiliateLinkForm {
            name: "Lamp".to_string(),
            original_url: "https://example.com/lamp".to_string(),
            network: "mystery".to_string(),
            ..Default::default()
        };
        assert!(LinksScreen::prepare(&mut form, None).is_err());
    }
}
