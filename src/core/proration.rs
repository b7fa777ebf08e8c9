//! 前端按比例試算。
//!
//! 這裡的金額只是估計值，實際扣款金額由計費系統在確認變更時決定，
//! 因此結果型別只提供顯示用的標籤，從不進入送往後端的請求。

use crate::domain::model::BillingCycle;
use crate::utils::error::{AdminError, Result};
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProrationEstimate {
    pub amount: Decimal,
    pub days_remaining: i64,
    pub days_in_period: i64,
}

impl ProrationEstimate {
    pub fn is_credit(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    /// 顯示用字串，永遠標示為估計值
    pub fn label(&self) -> String {
        if self.is_credit() {
            format!("-${} (estimated credit)", self.amount.abs())
        } else {
            format!("${} (estimate)", self.amount)
        }
    }
}

/// `(new_price - current_price) / days_in_period * days_remaining`，四捨五入到小數兩位
pub fn estimate(
    current_price: Decimal,
    new_price: Decimal,
    days_in_period: i64,
    days_remaining: i64,
) -> Result<ProrationEstimate> {
    if days_in_period <= 0 {
        return Err(AdminError::validation(
            "days_in_period",
            "Billing period length must be positive",
        ));
    }
    if days_remaining < 0 || days_remaining > days_in_period {
        return Err(AdminError::validation(
            "days_remaining",
            format!(
                "Remaining days must be between 0 and {}",
                days_in_period
            ),
        ));
    }

    let difference = new_price - current_price;
    let raw = difference
        .checked_mul(Decimal::from(days_remaining))
        .and_then(|scaled| scaled.checked_div(Decimal::from(days_in_period)))
        .ok_or_else(|| AdminError::invalid_state("Overflow in proration estimate"))?;

    let mut amount = raw.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    amount.rescale(2);

    Ok(ProrationEstimate {
        amount,
        days_remaining,
        days_in_period,
    })
}

/// 距續約日剩餘天數，限制在 `[0, period_days]`
pub fn days_remaining(today: NaiveDate, renewal_date: NaiveDate, cycle: BillingCycle) -> i64 {
    (renewal_date - today)
        .num_days()
        .clamp(0, cycle.period_days())
}

/// 以目前方案的計費週期試算
pub fn estimate_for_cycle(
    current_price: Decimal,
    new_price: Decimal,
    cycle: BillingCycle,
    today: NaiveDate,
    renewal_date: NaiveDate,
) -> Result<ProrationEstimate> {
    estimate(
        current_price,
        new_price,
        cycle.period_days(),
        days_remaining(today, renewal_date, cycle),
    )
}
