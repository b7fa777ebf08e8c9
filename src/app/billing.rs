use crate::core::http::ApiClient;
use crate::core::resource::{or_dash, yes_no, Column, Resource, RowAction};
use crate::core::screen::ListState;
use crate::domain::forms::TierForm;
use crate::domain::model::{Payment, PaymentStatus, Subscription, SubscriptionStatus, SubscriptionTier};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct TiersEnvelope {
    #[serde(default)]
    tiers: Vec<SubscriptionTier>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionsEnvelope {
    #[serde(default)]
    subscriptions: Vec<Subscription>,
}

#[derive(Debug, Deserialize)]
struct PaymentsEnvelope {
    #[serde(default)]
    payments: Vec<Payment>,
}

/// 狀態徽章文字
pub fn subscription_status_label(status: SubscriptionStatus) -> &'static str {
    match status {
        SubscriptionStatus::Active => "Active",
        SubscriptionStatus::Trialing => "Trial",
        SubscriptionStatus::PastDue => "Past Due",
        SubscriptionStatus::Canceled => "Canceled",
    }
}

pub fn payment_status_label(status: &PaymentStatus) -> String {
    match status {
        PaymentStatus::Succeeded => "Paid".to_string(),
        PaymentStatus::Pending => "Pending".to_string(),
        PaymentStatus::Failed => "Failed".to_string(),
        PaymentStatus::Other(other) => other.clone(),
    }
}

/// 金額以兩位小數加上幣別顯示
pub fn format_amount(amount: rust_decimal::Decimal, currency: &str) -> String {
    format!("{:.2} {}", amount, currency.to_uppercase())
}

impl Resource for SubscriptionTier {
    const NAME: &'static str = "subscription_tiers";

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("id", "ID"),
            Column::new("name", "Name"),
            Column::new("price_monthly", "Monthly"),
            Column::new("price_yearly", "Yearly"),
            Column::new("is_active", "Active"),
            Column::new("description", "Description"),
        ];
        COLUMNS
    }

    fn cell(&self, key: &str) -> String {
        match key {
            "id" => self.id.to_string(),
            "name" => self.name.clone(),
            "price_monthly" => format!("${:.2}", self.price_monthly),
            "price_yearly" => format!("${:.2}", self.price_yearly),
            "is_active" => yes_no(self.is_active),
            "description" => or_dash(self.description.as_deref()),
            _ => String::new(),
        }
    }

    fn actions(&self) -> Vec<RowAction> {
        vec![RowAction::Edit, RowAction::Delete]
    }
}

impl Resource for Subscription {
    const NAME: &'static str = "active_subscriptions";

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("id", "ID"),
            Column::new("family_name", "Family"),
            Column::new("tier_name", "Tier"),
            Column::new("status", "Status"),
            Column::new("current_period_end", "Period Ends"),
            Column::new("cancel_at_period_end", "Cancels"),
        ];
        COLUMNS
    }

    fn cell(&self, key: &str) -> String {
        match key {
            "id" => self.id.to_string(),
            "family_name" => or_dash(self.family_name.as_deref()),
            "tier_name" => or_dash(self.tier_name.as_deref()),
            "status" => subscription_status_label(self.status).to_string(),
            "current_period_end" => {
                or_dash(self.current_period_end.map(|d| d.format("%Y-%m-%d")))
            }
            "cancel_at_period_end" => yes_no(self.cancel_at_period_end),
            _ => String::new(),
        }
    }

    fn actions(&self) -> Vec<RowAction> {
        vec![RowAction::View]
    }
}

impl Resource for Payment {
    const NAME: &'static str = "payments";

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("id", "ID"),
            Column::new("family_name", "Family"),
            Column::new("amount", "Amount"),
            Column::new("status", "Status"),
            Column::new("created_at", "Date"),
        ];
        COLUMNS
    }

    fn cell(&self, key: &str) -> String {
        match key {
            "id" => self.id.to_string(),
            "family_name" => or_dash(self.family_name.as_deref()),
            "amount" => format_amount(self.amount, &self.currency),
            "status" => payment_status_label(&self.status),
            "created_at" => or_dash(self.created_at.map(|d| d.format("%Y-%m-%d"))),
            _ => String::new(),
        }
    }

    fn actions(&self) -> Vec<RowAction> {
        vec![RowAction::View]
    }
}

/// 訂閱方案（tier）管理畫面
pub struct TiersScreen {
    api: ApiClient,
    state: ListState<SubscriptionTier>,
}

impl TiersScreen {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: ListState::default(),
        }
    }

    pub fn state(&self) -> &ListState<SubscriptionTier> {
        &self.state
    }

    pub fn tiers(&self) -> &[SubscriptionTier] {
        self.state.items()
    }

    pub async fn load(&mut self) -> Result<&[SubscriptionTier]> {
        match self
            .api
            .get::<TiersEnvelope>("/admin/subscription/tiers")
            .await
        {
            Ok(envelope) => {
                self.state.replace(envelope.tiers);
                self.state.clear_error();
                Ok(self.state.items())
            }
            Err(e) => Err(self.state.fail("Failed to load subscription tiers.", e)),
        }
    }

    pub async fn create(&mut self, form: &TierForm) -> Result<()> {
        if let Err(e) = form.validate() {
            return Err(self.state.fail("Failed to save tier.", e));
        }
        if let Err(e) = self
            .api
            .post::<_, serde_json::Value>("/admin/subscription/tiers", form)
            .await
        {
            return Err(self.state.fail("Failed to save tier.", e));
        }
        tracing::info!("✅ Created subscription tier {}", form.name);
        self.state.succeed("Subscription tier created successfully!");
        self.refresh().await;
        Ok(())
    }

    pub async fn update(&mut self, id: i64, form: &TierForm) -> Result<()> {
        if let Err(e) = form.validate() {
            return Err(self.state.fail("Failed to save tier.", e));
        }
        if let Err(e) = self
            .api
            .put::<_, serde_json::Value>(&format!("/admin/subscription/tiers/{}", id), form)
            .await
        {
            return Err(self.state.fail("Failed to save tier.", e));
        }
        self.state.succeed("Subscription tier updated successfully!");
        self.refresh().await;
        Ok(())
    }

    pub async fn delete(&mut self, id: i64) -> Result<()> {
        if let Err(e) = self
            .api
            .delete::<serde_json::Value>(&format!("/admin/subscription/tiers/{}", id))
            .await
        {
            return Err(self.state.fail("Failed to delete tier.", e));
        }
        self.state.succeed("Subscription tier deleted successfully!");
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

/// 進行中訂閱與付款紀錄（唯讀）
pub struct BillingOverview {
    api: ApiClient,
    subscriptions: ListState<Subscription>,
    payments: ListState<Payment>,
}

impl BillingOverview {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            subscriptions: ListState::default(),
            payments: ListState::default(),
        }
    }

    pub fn subscriptions_state(&self) -> &ListState<Subscription> {
        &self.subscriptions
    }

    pub fn payments_state(&self) -> &ListState<Payment> {
        &self.payments
    }

    pub async fn load_subscriptions(&mut self) -> Result<&[Subscription]> {
        match self
            .api
            .get::<SubscriptionsEnvelope>("/admin/subscription/active")
            .await
        {
            Ok(envelope) => {
                self.subscriptions.replace(envelope.subscriptions);
                self.subscriptions.clear_error();
                Ok(self.subscriptions.items())
            }
            Err(e) => Err(self
                .subscriptions
                .fail("Failed to load active subscriptions.", e)),
        }
    }

    pub async fn load_payments(&mut self) -> Result<&[Payment]> {
        match self
            .api
            .get::<PaymentsEnvelope>("/admin/subscription/payments")
            .await
        {
            Ok(envelope) => {
                self.payments.replace(envelope.payments);
                self.payments.clear_error();
                Ok(self.payments.items())
            }
            Err(e) => Err(self.payments.fail("Failed to load payment history.", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_status_labels() {
        assert_eq!(subscription_status_label(SubscriptionStatus::PastDue), "Past Due");
        assert_eq!(payment_status_label(&PaymentStatus::Succeeded), "Paid");
        assert_eq!(
            payment_status_label(&PaymentStatus::Other("refunded".to_string())),
            "refunded"
        );
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(Decimal::new(2500, 2), "usd"), "25.00 USD");
        assert_eq!(format_amount(Decimal::new(10, 0), "eur"), "10.00 EUR");
    }
}
