//! 登入者本人的帳號頁：個人資料與使用者首頁。

use crate::app::subscription::SubscriptionService;
use crate::core::http::ApiClient;
use crate::core::screen::Banner;
use crate::domain::forms::ProfileForm;
use crate::domain::model::{CurrentPlan, Family, Profile};
use crate::utils::error::{AdminError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct ProfileEnvelope {
    user: Profile,
}

#[derive(Debug, Deserialize)]
struct FamilyEnvelope {
    #[serde(default)]
    family: Option<Family>,
}

/// 使用者首頁；家庭與訂閱可能不存在
#[derive(Debug, Clone, Serialize)]
pub struct UserHome {
    pub profile: Profile,
    pub family: Option<Family>,
    pub plan: Option<CurrentPlan>,
}

pub struct AccountScreen {
    api: ApiClient,
    profile: Option<Profile>,
    banner: Option<Banner>,
}

impl AccountScreen {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            profile: None,
            banner: None,
        }
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub async fn load(&mut self) -> Result<Profile> {
        match self.api.get::<ProfileEnvelope>("/user/profile").await {
            Ok(envelope) => {
                self.profile = Some(envelope.user.clone());
                Ok(envelope.user)
            }
            Err(e) => Err(self.fail("Failed to load profile data.", e)),
        }
    }

    /// 後端回傳的資料取代本地副本
    pub async fn update(&mut self, form: ProfileForm) -> Result<Profile> {
        let form = form.normalized();
        if let Err(e) = form.validate() {
            return Err(self.fail("Failed to update profile.", e));
        }
        match self
            .api
            .put::<_, ProfileEnvelope>("/user/profile", &form)
            .await
        {
            Ok(envelope) => {
                tracing::info!("✅ Profile updated for {}", envelope.user.email);
                self.profile = Some(envelope.user.clone());
                self.banner = Some(Banner::success("Profile updated successfully!"));
                Ok(envelope.user)
            }
            Err(e) => Err(self.fail("Failed to update profile.", e)),
        }
    }

    /// 個人資料是必要的；家庭或訂閱取不到時視為沒有
    pub async fn home(&mut self) -> Result<UserHome> {
        let profile = self.load().await?;

        let family = match self.api.get::<FamilyEnvelope>("/user/family").await {
            Ok(envelope) => envelope.family,
            Err(e) => {
                tracing::debug!("No family for current user: {}", e);
                None
            }
        };

        let plan = match SubscriptionService::new(self.api.clone()).current().await {
            Ok(current) => Some(current.plan),
            Err(e) => {
                tracing::debug!("No active subscription: {}", e);
                None
            }
        };

        Ok(UserHome {
            profile,
            family,
            plan,
        })
    }

    fn fail(&mut self, prefix: &str, error: AdminError) -> AdminError {
        let message = format!("{} {}", prefix, error.user_friendly_message());
        tracing::error!("❌ {}", message);
        self.banner = Some(Banner::error(message));
        error
    }
}
