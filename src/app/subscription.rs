//! 使用者端的訂閱 API：目前方案、方案型錄、付款方式與方案變更。

use crate::core::http::ApiClient;
use crate::core::plan_change::PlanChangeFlow;
use crate::core::resource::{yes_no, Column, Resource, RowAction};
use crate::domain::forms::{CancelRequest, ChangePlanRequest, NewPaymentMethod, ProrationQuoteRequest};
use crate::domain::model::{CurrentPlan, PaymentMethod, PlanOption};
use crate::domain::ports::SubscriptionGateway;
use crate::utils::error::{AdminError, Result};
use crate::utils::validation::Validate;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CurrentEnvelope {
    subscription: CurrentSubscription,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentSubscription {
    pub plan: CurrentPlan,
    #[serde(default)]
    pub payment_methods: Vec<PaymentMethod>,
}

#[derive(Debug, Deserialize)]
struct PlansEnvelope {
    #[serde(default)]
    plans: Vec<PlanOption>,
}

#[derive(Debug, Deserialize)]
struct PaymentMethodsEnvelope {
    #[serde(default)]
    payment_methods: Vec<PaymentMethod>,
}

#[derive(Debug, Deserialize)]
struct ProrationEnvelope {
    prorated_amount: Decimal,
}

impl Resource for PaymentMethod {
    const NAME: &'static str = "payment_methods";

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("id", "ID"),
            Column::new("card", "Card"),
            Column::new("expiry", "Expires"),
            Column::new("is_default", "Default"),
        ];
        COLUMNS
    }

    fn cell(&self, key: &str) -> String {
        match key {
            "id" => self.id.clone(),
            "card" => self.label(),
            "expiry" => self.expiry(),
            "is_default" => yes_no(self.is_default),
            _ => String::new(),
        }
    }

    fn actions(&self) -> Vec<RowAction> {
        if self.is_default {
            Vec::new()
        } else {
            vec![RowAction::Edit]
        }
    }
}

impl Resource for PlanOption {
    const NAME: &'static str = "plans";

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("id", "ID"),
            Column::new("name", "Plan"),
            Column::new("price_monthly", "Monthly"),
            Column::new("price_yearly", "Yearly"),
            Column::new("savings", "Yearly Savings"),
        ];
        COLUMNS
    }

    fn cell(&self, key: &str) -> String {
        match key {
            "id" => self.id.clone(),
            "name" => self.name.clone(),
            "price_monthly" => format!("${}/month", self.price_monthly),
            "price_yearly" => format!("${}/year", self.price_yearly),
            "savings" => PlanChangeFlow::yearly_savings_percent(self)
                .map(|pct| format!("Save {}%", pct))
                .unwrap_or_else(|| "-".to_string()),
            _ => String::new(),
        }
    }

    fn actions(&self) -> Vec<RowAction> {
        Vec::new()
    }
}

pub struct SubscriptionService {
    api: ApiClient,
    app_name: Option<String>,
}

impl SubscriptionService {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            app_name: None,
        }
    }

    /// 只列出指定應用程式的方案
    pub fn with_app_name(mut self, app_name: Option<String>) -> Self {
        self.app_name = app_name.filter(|name| !name.trim().is_empty());
        self
    }

    pub async fn current(&self) -> Result<CurrentSubscription> {
        let envelope: CurrentEnvelope = self.api.get("/subscription/current").await?;
        tracing::debug!(
            "Current plan: {} ({})",
            envelope.subscription.plan.name,
            envelope.subscription.plan.billing_cycle
        );
        Ok(envelope.subscription)
    }

    pub async fn plans(&self) -> Result<Vec<PlanOption>> {
        let path = match &self.app_name {
            Some(app) => format!(
                "/subscription/plans?app_name={}",
                url::form_urlencoded::byte_serialize(app.as_bytes()).collect::<String>()
            ),
            None => "/subscription/plans".to_string(),
        };
        let envelope: PlansEnvelope = self.api.get(&path).await?;
        Ok(envelope.plans)
    }

    /// 載入目前方案、型錄與付款方式，建立方案變更流程
    pub async fn open_flow(&self, today: NaiveDate) -> Result<PlanChangeFlow> {
        let current = self.current().await?;
        let plans = self.plans().await?;
        if plans.is_empty() {
            tracing::warn!("⚠️ No plans available for change");
        }
        Ok(PlanChangeFlow::new(
            current.plan,
            plans,
            current.payment_methods,
            today,
        ))
    }

    /// 後端計算的按比例金額（與前端試算分開顯示）
    pub async fn quote_proration(&self, request: &ProrationQuoteRequest) -> Result<Decimal> {
        let envelope: ProrationEnvelope = self.api.post("/subscription/proration", request).await?;
        Ok(envelope.prorated_amount)
    }

    /// 沒有實際變更時不詢問後端
    pub async fn quote_for(&self, flow: &PlanChangeFlow) -> Result<Option<Decimal>> {
        if !flow.is_plan_change() {
            return Ok(None);
        }
        let Some(plan) = flow.selected_plan() else {
            return Ok(None);
        };
        let current = flow.current();
        let current_id = current.id.clone().unwrap_or_else(|| current.tier.clone());
        let request = ProrationQuoteRequest {
            current_plan_id: format!("{}_{}", current_id, flow.billing_cycle()),
            new_plan_id: plan.id.clone(),
        };
        self.quote_proration(&request).await.map(Some)
    }

    pub async fn payment_methods(&self) -> Result<Vec<PaymentMethod>> {
        let envelope: PaymentMethodsEnvelope =
            self.api.get("/subscription/payment-methods").await?;
        Ok(envelope.payment_methods)
    }

    /// token 由外部付款表單產生
    pub async fn add_payment_method(&self, method: &NewPaymentMethod) -> Result<Vec<PaymentMethod>> {
        method.validate()?;
        self.api
            .post::<_, serde_json::Value>("/subscription/payment-methods", method)
            .await?;
        tracing::info!("✅ Payment method added");
        self.payment_methods().await
    }

    pub async fn set_default_payment_method(&self, method_id: &str) -> Result<Vec<PaymentMethod>> {
        if method_id.trim().is_empty() {
            return Err(AdminError::validation(
                "payment_method",
                "Payment method id is required",
            ));
        }
        self.api
            .put::<_, serde_json::Value>(
                &format!("/subscription/payment-methods/{}/default", method_id),
                &serde_json::json!({}),
            )
            .await?;
        tracing::info!("Default payment method set to {}", method_id);
        self.payment_methods().await
    }

    pub async fn cancel(&self, subscription_id: &str, cancel_immediately: bool) -> Result<()> {
        let body = CancelRequest { cancel_immediately };
        self.api
            .delete_with_body::<_, serde_json::Value>(
                &format!("/subscription/{}", subscription_id),
                &body,
            )
            .await?;
        if cancel_immediately {
            tracing::info!("Subscription {} canceled immediately", subscription_id);
        } else {
            tracing::info!(
                "Subscription {} will cancel at the end of the period",
                subscription_id
            );
        }
        Ok(())
    }
}

#[async_trait]
impl SubscriptionGateway for SubscriptionService {
    async fn change_plan(&self, request: &ChangePlanRequest) -> Result<()> {
        self.api
            .put::<_, serde_json::Value>("/subscription/current", request)
            .await?;
        Ok(())
    }
}
