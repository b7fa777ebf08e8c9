//! 送往後端的請求表單與其前端驗證。
//!
//! 驗證失敗時不會發出任何網路請求。

use crate::domain::model::{default_member_role, BillingCycle, Profile, Role};
use crate::utils::error::{AdminError, Result};
use crate::utils::validation::{
    validate_email, validate_one_of, validate_password, validate_range, validate_required,
    validate_url, Validate,
};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<()> {
        validate_email("email", &self.email)?;
        validate_required("password", &self.password)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl Validate for NewUser {
    fn validate(&self) -> Result<()> {
        validate_required("name", &self.name)?;
        validate_email("email", &self.email)?;
        validate_password("password", &self.password)?;
        validate_one_of("role", self.role.as_str(), &Role::ALLOWED)
    }
}

/// 更新使用者時永遠不帶密碼
#[derive(Debug, Clone, Serialize, Default)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl Validate for UserUpdate {
    fn validate(&self) -> Result<()> {
        if self.name.is_none() && self.email.is_none() && self.role.is_none() {
            return Err(AdminError::validation("user", "Nothing to update"));
        }
        if let Some(name) = &self.name {
            validate_required("name", name)?;
        }
        if let Some(email) = &self.email {
            validate_email("email", email)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordChange {
    pub password: String,
    #[serde(skip)]
    pub confirm_password: String,
}

impl Validate for PasswordChange {
    fn validate(&self) -> Result<()> {
        if self.password != self.confirm_password {
            return Err(AdminError::validation(
                "confirm_password",
                "Passwords do not match",
            ));
        }
        validate_password("password", &self.password)
    }
}

/// 個人資料整份送出；空白電話不送
#[derive(Debug, Clone, Serialize, Default)]
pub struct ProfileForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl From<&Profile> for ProfileForm {
    fn from(profile: &Profile) -> Self {
        Self {
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            email: profile.email.clone(),
            phone: profile.phone.clone(),
        }
    }
}

impl ProfileForm {
    pub fn normalized(mut self) -> Self {
        self.phone = self
            .phone
            .map(|phone| phone.trim().to_string())
            .filter(|phone| !phone.is_empty());
        self
    }
}

impl Validate for ProfileForm {
    fn validate(&self) -> Result<()> {
        validate_email("email", &self.email)
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct FamilyForm {
    pub family_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_tier_id: Option<i64>,
}

impl Validate for FamilyForm {
    fn validate(&self) -> Result<()> {
        validate_required("family_name", &self.family_name)?;
        if let Some(email) = &self.billing_email {
            validate_email("billing_email", email)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MembershipForm {
    pub user_id: i64,
    pub role: String,
    pub is_admin: bool,
}

impl MembershipForm {
    pub fn new(user_id: i64, role: Option<String>, is_admin: bool) -> Self {
        Self {
            user_id,
            role: role
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(default_member_role),
            is_admin,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberRoleUpdate {
    pub role: String,
    pub is_admin: bool,
}

impl Validate for MemberRoleUpdate {
    fn validate(&self) -> Result<()> {
        validate_required("role", &self.role)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TierForm {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price_monthly: Decimal,
    pub price_yearly: Decimal,
    pub features: serde_json::Value,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_price_id_monthly: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_price_id_yearly: Option<String>,
}

impl Validate for TierForm {
    fn validate(&self) -> Result<()> {
        validate_required("name", &self.name)?;
        if self.price_monthly.is_sign_negative() {
            return Err(AdminError::validation(
                "price_monthly",
                "Monthly price cannot be negative",
            ));
        }
        if self.price_yearly.is_sign_negative() {
            return Err(AdminError::validation(
                "price_yearly",
                "Yearly price cannot be negative",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkForm {
    pub name: String,
    pub display_name: String,
    pub affiliate_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_param: Option<String>,
    pub base_commission_rate: Decimal,
    pub is_active: bool,
}

impl Validate for NetworkForm {
    fn validate(&self) -> Result<()> {
        validate_required("name", &self.name)?;
        validate_required("display_name", &self.display_name)?;
        validate_required("affiliate_id", &self.affiliate_id)?;
        validate_range(
            "base_commission_rate",
            self.base_commission_rate,
            Decimal::ZERO,
            Decimal::ONE_HUNDRED,
        )
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct AffiliateLinkForm {
    pub name: String,
    pub original_url: String,
    pub affiliate_url: String,
    pub network: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission_rate: Option<Decimal>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_source: Option<String>,
}

impl Validate for AffiliateLinkForm {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty()
            || self.original_url.trim().is_empty()
            || self.affiliate_url.trim().is_empty()
            || self.network.trim().is_empty()
        {
            return Err(AdminError::validation(
                "affiliate_link",
                "Please fill in all required fields",
            ));
        }
        validate_url("original_url", &self.original_url)
            .map_err(|_| AdminError::validation("original_url", "Original URL is not valid"))?;
        validate_url("affiliate_url", &self.affiliate_url)
            .map_err(|_| AdminError::validation("affiliate_url", "Affiliate URL is not valid"))?;
        match self.commission_rate {
            Some(rate) => validate_range("commission_rate", rate, Decimal::ZERO, Decimal::ONE_HUNDRED),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveToggle {
    pub is_active: bool,
}

/// 變更方案請求，不含試算金額
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangePlanRequest {
    pub plan_id: String,
    pub billing_cycle: BillingCycle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<String>,
    pub proration_behavior: String,
    pub effective_immediately: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProrationQuoteRequest {
    pub current_plan_id: String,
    pub new_plan_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPaymentMethod {
    pub payment_method_token: String,
    pub set_as_default: bool,
}

impl Validate for NewPaymentMethod {
    fn validate(&self) -> Result<()> {
        validate_required("payment_method_token", &self.payment_method_token)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelRequest {
    #[serde(rename = "cancelImmediately")]
    pub cancel_immediately: bool,
}
