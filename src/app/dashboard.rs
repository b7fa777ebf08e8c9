//! 管理後台首頁：由各清單即時彙總的數字。

use crate::app::affiliate::{LinksScreen, NetworksScreen};
use crate::app::families::FamiliesScreen;
use crate::app::users::UsersScreen;
use crate::core::affiliate::{summarize, AffiliateSummary, Totals};
use crate::core::http::ApiClient;
use crate::domain::model::{Family, User};
use crate::utils::error::Result;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserCounts {
    pub total: usize,
    pub new_this_month: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FamilyCounts {
    pub total: usize,
    /// 有訂閱方案的家庭
    pub subscribed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdminOverview {
    pub users: UserCounts,
    pub families: FamilyCounts,
    pub networks: usize,
    pub active_networks: usize,
    pub affiliate: AffiliateSummary,
}

impl AdminOverview {
    pub fn build(
        users: &[User],
        families: &[Family],
        network_counts: (usize, usize),
        summary: AffiliateSummary,
        today: NaiveDate,
    ) -> Self {
        let new_this_month = users
            .iter()
            .filter_map(|u| u.created_at)
            .filter(|created| created.year() == today.year() && created.month() == today.month())
            .count();
        let subscribed = families
            .iter()
            .filter(|f| f.subscription_tier_id.is_some())
            .count();
        Self {
            users: UserCounts {
                total: users.len(),
                new_this_month,
            },
            families: FamilyCounts {
                total: families.len(),
                subscribed,
            },
            networks: network_counts.0,
            active_networks: network_counts.1,
            affiliate: summary,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Users:       {} ({} new this month)\n",
            self.users.total, self.users.new_this_month
        ));
        out.push_str(&format!(
            "Families:    {} ({} subscribed)\n",
            self.families.total, self.families.subscribed
        ));
        out.push_str(&format!(
            "Networks:    {} ({} active)\n",
            self.networks, self.active_networks
        ));
        out.push_str(&render_totals("Links:      ", &self.affiliate.overall));
        out
    }
}

pub fn render_totals(label: &str, totals: &Totals) -> String {
    format!(
        "{} {} links, {} clicks, {} conversions ({}%), ${:.2} earned\n",
        label,
        totals.links,
        totals.clicks,
        totals.conversions,
        totals.conversion_rate(),
        totals.commission
    )
}

/// 任一清單載入失敗即回傳錯誤
pub async fn load_overview(api: &ApiClient, today: NaiveDate) -> Result<AdminOverview> {
    let mut users = UsersScreen::new(api.clone());
    let mut families = FamiliesScreen::new(api.clone());
    let mut networks = NetworksScreen::new(api.clone());
    let mut links = LinksScreen::new(api.clone());

    let users = users.load().await?.to_vec();
    let families = families.load().await?.to_vec();
    let networks = networks.load().await?;
    let network_counts = (
        networks.len(),
        networks.iter().filter(|n| n.is_active).count(),
    );
    let summary = summarize(links.load().await?);

    tracing::debug!(
        "Overview: {} users, {} families, {} links",
        users.len(),
        families.len(),
        summary.overall.links
    );
    Ok(AdminOverview::build(
        &users,
        &families,
        network_counts,
        summary,
        today,
    ))
}
