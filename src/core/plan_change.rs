//! 訂閱方案變更流程。
//!
//! 狀態轉移：`Browsing -> PlanSelected -> Confirming -> (Succeeded | 失敗回到 PlanSelected)`。
//! 確認期間流程被可變借用，因此同一流程不可能同時送出兩個變更請求。

use crate::core::proration::{self, ProrationEstimate};
use crate::domain::forms::ChangePlanRequest;
use crate::domain::model::{BillingCycle, CurrentPlan, PaymentMethod, PlanOption};
use crate::domain::ports::SubscriptionGateway;
use crate::utils::error::{AdminError, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeSet;

pub const PRORATION_BEHAVIOR: &str = "create_prorations";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStage {
    Browsing,
    PlanSelected,
    Confirming,
    Succeeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanDirection {
    Upgrade,
    Downgrade,
    Switch,
}

impl PlanDirection {
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Upgrade => "Upgrading",
            Self::Downgrade => "Downgrading",
            Self::Switch => "Switching",
        }
    }
}

/// 按下 Continue 後顯示的摘要
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanChangeSummary {
    pub plan_name: String,
    pub tier: String,
    pub billing_cycle: BillingCycle,
    pub new_price: Decimal,
    pub direction: PlanDirection,
    pub estimate: ProrationEstimate,
    pub effective: &'static str,
}

impl PlanChangeSummary {
    pub fn lines(&self) -> Vec<(String, String)> {
        vec![
            (
                "New plan".to_string(),
                format!("{} ({})", self.plan_name, self.billing_cycle),
            ),
            (
                "New price".to_string(),
                format!("${}/{}", self.new_price, self.billing_cycle.unit()),
            ),
            (
                "Estimated prorated charge".to_string(),
                self.estimate.label(),
            ),
            ("Changes effective".to_string(), self.effective.to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub feature: String,
    pub included: Vec<bool>,
}

#[derive(Debug)]
pub struct PlanChangeFlow {
    current: CurrentPlan,
    catalog: Vec<PlanOption>,
    payment_methods: Vec<PaymentMethod>,
    selected_plan: Option<usize>,
    billing_cycle: BillingCycle,
    selected_payment_method: Option<String>,
    stage: FlowStage,
    error: Option<String>,
    today: NaiveDate,
}

impl PlanChangeFlow {
    pub fn new(
        current: CurrentPlan,
        catalog: Vec<PlanOption>,
        payment_methods: Vec<PaymentMethod>,
        today: NaiveDate,
    ) -> Self {
        let selected_plan = catalog.iter().position(|p| p.tier == current.tier);
        let selected_payment_method = payment_methods
            .iter()
            .find(|pm| pm.is_default)
            .map(|pm| pm.id.clone());

        Self {
            billing_cycle: current.billing_cycle,
            current,
            catalog,
            payment_methods,
            selected_plan,
            selected_payment_method,
            stage: FlowStage::Browsing,
            error: None,
            today,
        }
    }

    pub fn current(&self) -> &CurrentPlan {
        &self.current
    }

    pub fn catalog(&self) -> &[PlanOption] {
        &self.catalog
    }

    pub fn payment_methods(&self) -> &[PaymentMethod] {
        &self.payment_methods
    }

    pub fn stage(&self) -> FlowStage {
        self.stage
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn billing_cycle(&self) -> BillingCycle {
        self.billing_cycle
    }

    pub fn selected_plan(&self) -> Option<&PlanOption> {
        self.selected_plan.and_then(|idx| self.catalog.get(idx))
    }

    pub fn selected_payment_method(&self) -> Option<&PaymentMethod> {
        let id = self.selected_payment_method.as_deref()?;
        self.payment_methods.iter().find(|pm| pm.id == id)
    }

    pub fn select_plan(&mut self, plan_id: &str) -> Result<()> {
        self.ensure_not_submitted()?;
        let idx = self
            .catalog
            .iter()
            .position(|p| p.id == plan_id)
            .ok_or_else(|| {
                AdminError::validation("plan", format!("Unknown plan '{}'", plan_id))
            })?;
        self.selected_plan = Some(idx);
        self.refresh_stage();
        Ok(())
    }

    pub fn set_billing_cycle(&mut self, cycle: BillingCycle) -> Result<()> {
        self.ensure_not_submitted()?;
        self.billing_cycle = cycle;
        self.refresh_stage();
        Ok(())
    }

    pub fn select_payment_method(&mut self, method_id: &str) -> Result<()> {
        if !self.payment_methods.iter().any(|pm| pm.id == method_id) {
            return Err(AdminError::validation(
                "payment_method",
                format!("Unknown payment method '{}'", method_id),
            ));
        }
        self.selected_payment_method = Some(method_id.to_string());
        Ok(())
    }

    /// 新增付款方式後（由外部表單取得 token）更新清單
    pub fn replace_payment_methods(&mut self, methods: Vec<PaymentMethod>) {
        let still_present = self
            .selected_payment_method
            .as_deref()
            .is_some_and(|id| methods.iter().any(|pm| pm.id == id));
        if !still_present {
            self.selected_payment_method =
                methods.iter().find(|pm| pm.is_default).map(|pm| pm.id.clone());
        }
        self.payment_methods = methods;
    }

    pub fn new_price(&self) -> Option<Decimal> {
        self.selected_plan()
            .map(|plan| plan.price_for(self.billing_cycle))
    }

    /// 同方案同週期，或價格相同且週期不變，都視為「沒有變更」
    pub fn is_plan_change(&self) -> bool {
        let Some(plan) = self.selected_plan() else {
            return false;
        };
        let cycle_changed = self.billing_cycle != self.current.billing_cycle;
        if cycle_changed {
            return true;
        }
        plan.tier != self.current.tier && plan.price_for(self.billing_cycle) != self.current.price
    }

    pub fn direction(&self) -> Option<PlanDirection> {
        let new_price = self.new_price()?;
        let current = self.current_price_in(self.billing_cycle);
        Some(if new_price > current {
            PlanDirection::Upgrade
        } else if new_price < current {
            PlanDirection::Downgrade
        } else {
            PlanDirection::Switch
        })
    }

    pub fn prorated_estimate(&self) -> Option<ProrationEstimate> {
        if !self.is_plan_change() {
            return None;
        }
        let new_price = self.new_price()?;
        match proration::estimate_for_cycle(
            self.current.price,
            new_price,
            self.current.billing_cycle,
            self.today,
            self.current.renewal_date,
        ) {
            Ok(estimate) => Some(estimate),
            Err(e) => {
                tracing::warn!("Could not estimate proration: {}", e);
                None
            }
        }
    }

    pub fn summary(&self) -> Option<PlanChangeSummary> {
        let plan = self.selected_plan()?;
        let estimate = self.prorated_estimate()?;
        Some(PlanChangeSummary {
            plan_name: plan.name.clone(),
            tier: plan.tier.clone(),
            billing_cycle: self.billing_cycle,
            new_price: plan.price_for(self.billing_cycle),
            direction: self.direction().unwrap_or(PlanDirection::Switch),
            estimate,
            effective: "Immediately",
        })
    }

    /// Continue：開啟確認對話框
    pub fn continue_to_confirm(&mut self) -> Result<PlanChangeSummary> {
        if self.stage != FlowStage::PlanSelected {
            return Err(AdminError::invalid_state(
                "Select a plan different from your current plan first",
            ));
        }
        let summary = self
            .summary()
            .ok_or_else(|| AdminError::invalid_state("No plan change to confirm"))?;
        self.stage = FlowStage::Confirming;
        Ok(summary)
    }

    pub fn cancel_confirmation(&mut self) {
        if self.stage == FlowStage::Confirming {
            self.stage = FlowStage::PlanSelected;
        }
    }

    pub fn change_request(&self) -> Option<ChangePlanRequest> {
        let plan = self.selected_plan()?;
        Some(ChangePlanRequest {
            plan_id: plan.id.clone(),
            billing_cycle: self.billing_cycle,
            payment_method_id: self.selected_payment_method.clone(),
            proration_behavior: PRORATION_BEHAVIOR.to_string(),
            effective_immediately: true,
        })
    }

    /// Confirm Change：送出唯一的變更請求。成功後才更新目前方案
    pub async fn confirm<G: SubscriptionGateway + ?Sized>(
        &mut self,
        gateway: &G,
    ) -> Result<&CurrentPlan> {
        if self.stage != FlowStage::Confirming {
            return Err(AdminError::invalid_state(
                "Press Continue and review the summary before confirming",
            ));
        }
        let request = self
            .change_request()
            .ok_or_else(|| AdminError::invalid_state("No plan selected"))?;

        tracing::info!(
            "Changing subscription to plan '{}' ({})",
            request.plan_id,
            request.billing_cycle
        );

        match gateway.change_plan(&request).await {
            Ok(()) => {
                let plan = self
                    .selected_plan()
                    .cloned()
                    .ok_or_else(|| AdminError::invalid_state("No plan selected"))?;
                self.current = CurrentPlan {
                    id: Some(plan.id.clone()),
                    tier: plan.tier.clone(),
                    name: plan.name.clone(),
                    price: plan.price_for(self.billing_cycle),
                    billing_cycle: self.billing_cycle,
                    renewal_date: self.current.renewal_date,
                    features: plan.features.clone(),
                    app_name: self.current.app_name.clone(),
                };
                self.stage = FlowStage::Succeeded;
                self.error = None;
                tracing::info!("✅ Subscription updated to {}", self.current.name);
                Ok(&self.current)
            }
            Err(e) => {
                tracing::error!("❌ Failed to update subscription: {}", e);
                self.error = Some(format!(
                    "Failed to update subscription. {}",
                    e.user_friendly_message()
                ));
                self.stage = FlowStage::PlanSelected;
                Err(e)
            }
        }
    }

    /// 年繳相對於 12 個月月繳省下的百分比（取整數）
    pub fn yearly_savings_percent(plan: &PlanOption) -> Option<Decimal> {
        let twelve_months = plan.price_monthly * Decimal::from(12);
        if twelve_months.is_zero() || plan.price_yearly >= twelve_months {
            return None;
        }
        Some(
            ((twelve_months - plan.price_yearly) * Decimal::ONE_HUNDRED / twelve_months).round(),
        )
    }

    /// 方案功能比較表，欄位順序與型錄相同
    pub fn comparison_rows(&self) -> Vec<ComparisonRow> {
        let mut seen = BTreeSet::new();
        let mut rows = Vec::new();
        for feature in self.catalog.iter().flat_map(|p| p.features.iter()) {
            if seen.insert(feature.clone()) {
                rows.push(ComparisonRow {
                    feature: feature.clone(),
                    included: self
                        .catalog
                        .iter()
                        .map(|p| p.features.contains(feature))
                        .collect(),
                });
            }
        }
        rows
    }

    fn current_price_in(&self, cycle: BillingCycle) -> Decimal {
        if cycle == self.current.billing_cycle {
            return self.current.price;
        }
        self.catalog
            .iter()
            .find(|p| p.tier == self.current.tier)
            .map(|p| p.price_for(cycle))
            .unwrap_or(self.current.price)
    }

    fn refresh_stage(&mut self) {
        self.stage = if self.is_plan_change() {
            FlowStage::PlanSelected
        } else {
            FlowStage::Browsing
        };
    }

    fn ensure_not_submitted(&self) -> Result<()> {
        if self.stage == FlowStage::Succeeded {
            return Err(AdminError::invalid_state(
                "Plan already changed; reload the subscription to make another change",
            ));
        }
        Ok(())
    }
}
