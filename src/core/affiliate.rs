use crate::domain::model::{AffiliateLink, AffiliateNetwork};
use crate::utils::error::{AdminError, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use url::Url;

/// 已知聯盟網路的追蹤參數名稱
pub fn default_tracking_param(network_name: &str) -> Option<&'static str> {
    match network_name.to_ascii_lowercase().as_str() {
        "amazon" => Some("tag"),
        "walmart" => Some("wmlspartner"),
        "target" => Some("afid"),
        _ => None,
    }
}

pub fn tracking_param(network: &AffiliateNetwork) -> Option<String> {
    network
        .tracking_param
        .clone()
        .filter(|p| !p.trim().is_empty())
        .or_else(|| default_tracking_param(&network.name).map(str::to_string))
}

/// 產生聯盟連結：把追蹤參數設為網路的 affiliate id（已存在則取代）。
/// 沒有追蹤參數的網路原樣回傳。
pub fn generate_affiliate_url(network: &AffiliateNetwork, original_url: &str) -> Result<String> {
    let mut url = Url::parse(original_url.trim()).map_err(|e| {
        AdminError::validation("original_url", format!("Invalid URL '{}': {}", original_url, e))
    })?;

    let Some(param) = tracking_param(network) else {
        tracing::debug!(
            "Network '{}' has no tracking parameter, leaving URL unchanged",
            network.name
        );
        return Ok(url.to_string());
    };

    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != param.as_str())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair(&param, &network.affiliate_id);

    Ok(url.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkSortField {
    Name,
    Network,
    Clicks,
    Conversions,
    Commission,
    #[default]
    CreatedAt,
}

impl std::str::FromStr for LinkSortField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "network" => Ok(Self::Network),
            "clicks" => Ok(Self::Clicks),
            "conversions" => Ok(Self::Conversions),
            "commission" | "commission_earned" => Ok(Self::Commission),
            "created" | "created_at" | "createdat" => Ok(Self::CreatedAt),
            other => Err(format!("unknown sort field '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// 連結清單的檢視狀態：搜尋字串、排序與頁碼
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkQuery {
    pub search: String,
    pub sort_field: LinkSortField,
    pub direction: SortDirection,
    pub page: usize,
}

impl Default for LinkQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            sort_field: LinkSortField::CreatedAt,
            direction: SortDirection::Desc,
            page: 1,
        }
    }
}

impl LinkQuery {
    pub fn set_search(&mut self, term: &str) {
        self.search = term.to_string();
        self.page = 1;
    }

    /// 同欄位再點一次反轉方向，換欄位時從遞增開始
    pub fn sort_by(&mut self, field: LinkSortField) {
        if self.sort_field == field {
            self.direction = match self.direction {
                SortDirection::Asc => SortDirection::Desc,
                SortDirection::Desc => SortDirection::Asc,
            };
        } else {
            self.sort_field = field;
            self.direction = SortDirection::Asc;
        }
    }

    pub fn matches(&self, link: &AffiliateLink) -> bool {
        let term = self.search.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        link.name.to_lowercase().contains(&term)
            || link
                .short_code
                .as_deref()
                .is_some_and(|code| code.to_lowercase().contains(&term))
            || link.network.to_lowercase().contains(&term)
    }

    pub fn apply(&self, links: &[AffiliateLink]) -> Vec<AffiliateLink> {
        let mut filtered: Vec<AffiliateLink> =
            links.iter().filter(|l| self.matches(l)).cloned().collect();
        filtered.sort_by(|a, b| {
            let ordering = compare(a, b, self.sort_field);
            match self.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
        filtered
    }
}

fn compare(a: &AffiliateLink, b: &AffiliateLink, field: LinkSortField) -> Ordering {
    match field {
        LinkSortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        LinkSortField::Network => a.network.cmp(&b.network),
        LinkSortField::Clicks => a.clicks.cmp(&b.clicks),
        LinkSortField::Conversions => a.conversions.cmp(&b.conversions),
        LinkSortField::Commission => a.commission_earned.cmp(&b.commission_earned),
        LinkSortField::CreatedAt => a.created_at.cmp(&b.created_at),
    }
}

/// 一組連結的點擊、轉換與佣金合計
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    pub links: usize,
    pub clicks: u64,
    pub conversions: u64,
    pub commission: Decimal,
}

impl Totals {
    fn add(&mut self, link: &AffiliateLink) {
        self.links += 1;
        self.clicks += link.clicks;
        self.conversions += link.conversions;
        self.commission += link.commission_earned;
    }

    /// 轉換率（百分比，兩位小數）
    pub fn conversion_rate(&self) -> Decimal {
        if self.clicks == 0 {
            return Decimal::ZERO;
        }
        (Decimal::from(self.conversions) * Decimal::ONE_HUNDRED / Decimal::from(self.clicks))
            .round_dp(2)
    }
}

/// 聯盟行銷總覽：整體合計，另依網路與分類拆分
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AffiliateSummary {
    pub overall: Totals,
    pub by_network: BTreeMap<String, Totals>,
    pub by_category: BTreeMap<String, Totals>,
}

pub fn summarize(links: &[AffiliateLink]) -> AffiliateSummary {
    let mut summary = AffiliateSummary::default();
    for link in links {
        summary.overall.add(link);
        summary
            .by_network
            .entry(link.network.clone())
            .or_default()
            .add(link);
        let category = link
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or("uncategorized");
        summary
            .by_category
            .entry(category.to_string())
            .or_default()
            .add(link);
    }
    summary
}
