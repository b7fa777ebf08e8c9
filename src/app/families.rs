use crate::core::http::ApiClient;
use crate::core::resource::{or_dash, yes_no, Column, Resource, RowAction};
use crate::core::screen::ListState;
use crate::domain::forms::{FamilyForm, MemberRoleUpdate, MembershipForm};
use crate::domain::model::{Family, FamilyMember};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct FamiliesEnvelope {
    #[serde(default)]
    families: Vec<Family>,
}

#[derive(Debug, Deserialize)]
struct FamilyEnvelope {
    family: Family,
}

impl Resource for Family {
    const NAME: &'static str = "families";

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("id", "ID"),
            Column::new("family_name", "Family Name"),
            Column::new("billing_email", "Billing Email"),
            Column::new("members", "Members"),
            Column::new("subscription_expiry", "Subscription Expires"),
        ];
        COLUMNS
    }

    fn cell(&self, key: &str) -> String {
        match key {
            "id" => self.id.to_string(),
            "family_name" => self.family_name.clone(),
            "billing_email" => or_dash(self.billing_email.as_deref()),
            "members" => self.members.len().to_string(),
            "subscription_expiry" => {
                or_dash(self.subscription_expiry.map(|d| d.format("%Y-%m-%d")))
            }
            _ => String::new(),
        }
    }
}

impl Resource for FamilyMember {
    const NAME: &'static str = "members";

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("user_id", "User ID"),
            Column::new("name", "Name"),
            Column::new("email", "Email"),
            Column::new("role", "Role"),
            Column::new("is_admin", "Admin"),
        ];
        COLUMNS
    }

    fn cell(&self, key: &str) -> String {
        match key {
            "user_id" => self.user_id.to_string(),
            "name" => or_dash(self.name.as_deref()),
            "email" => or_dash(self.email.as_deref()),
            "role" => self.role.clone(),
            "is_admin" => yes_no(self.is_admin),
            _ => String::new(),
        }
    }

    fn actions(&self) -> Vec<RowAction> {
        vec![RowAction::Edit, RowAction::Delete]
    }
}

/// 家庭管理畫面
pub struct FamiliesScreen {
    api: ApiClient,
    state: ListState<Family>,
}

impl FamiliesScreen {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: ListState::default(),
        }
    }

    pub fn state(&self) -> &ListState<Family> {
        &self.state
    }

    pub fn families(&self) -> &[Family] {
        self.state.items()
    }

    pub async fn load(&mut self) -> Result<&[Family]> {
        match self.api.get::<FamiliesEnvelope>("/admin/families").await {
            Ok(envelope) => {
                tracing::debug!("Loaded {} families", envelope.families.len());
                self.state.replace(envelope.families);
                self.state.clear_error();
                Ok(self.state.items())
            }
            Err(e) => Err(self.state.fail("Failed to load families.", e)),
        }
    }

    pub async fn get(&mut self, id: i64) -> Result<Family> {
        match self
            .api
            .get::<FamilyEnvelope>(&format!("/admin/families/{}", id))
            .await
        {
            Ok(envelope) => Ok(envelope.family),
            Err(e) => Err(self.state.fail("Failed to load family details.", e)),
        }
    }

    pub async fn create(&mut self, form: &FamilyForm) -> Result<()> {
        if let Err(e) = form.validate() {
            return Err(self.state.fail("Failed to save family.", e));
        }
        if let Err(e) = self
            .api
            .post::<_, serde_json::Value>("/admin/families", form)
            .await
        {
            return Err(self.state.fail("Failed to save family.", e));
        }
        tracing::info!("✅ Created family {}", form.family_name);
        self.state.succeed("Family created successfully!");
        self.refresh().await;
        Ok(())
    }

    pub async fn update(&mut self, id: i64, form: &FamilyForm) -> Result<()> {
        if let Err(e) = form.validate() {
            return Err(self.state.fail("Failed to save family.", e));
        }
        if let Err(e) = self
            .api
            .put::<_, serde_json::Value>(&format!("/admin/families/{}", id), form)
            .await
        {
            return Err(self.state.fail("Failed to save family.", e));
        }
        self.state.succeed("Family updated successfully!");
        self.refresh().await;
        Ok(())
    }

    pub async fn delete(&mut self, id: i64) -> Result<()> {
        if let Err(e) = self
            .api
            .delete::<serde_json::Value>(&format!("/admin/families/{}", id))
            .await
        {
            return Err(self.state.fail("Failed to delete family.", e));
        }
        tracing::info!("Deleted family {}", id);
        self.state.succeed("Family deleted successfully!");
        self.refresh().await;
        Ok(())
    }

    /// 成員清單隨家庭詳細資料一起回傳
    pub async fn members(&mut self, family_id: i64) -> Result<Vec<FamilyMember>> {
        self.get(family_id).await.map(|family| family.members)
    }

    pub async fn add_member(&mut self, family_id: i64, membership: &MembershipForm) -> Result<()> {
        if let Err(e) = self
            .api
            .post::<_, serde_json::Value>(
                &format!("/admin/families/{}/members", family_id),
                membership,
            )
            .await
        {
            return Err(self.state.fail("Failed to add member.", e));
        }
        self.state.succeed("Member added successfully!");
        self.refresh().await;
        Ok(())
    }

    pub async fn update_member(
        &mut self,
        family_id: i64,
        user_id: i64,
        update: &MemberRoleUpdate,
    ) -> Result<()> {
        if let Err(e) = update.validate() {
            return Err(self.state.fail("Failed to update member.", e));
        }
        if let Err(e) = self
            .api
            .put::<_, serde_json::Value>(
                &format!("/admin/families/{}/members/{}", family_id, user_id),
                update,
            )
            .await
        {
            return Err(self.state.fail("Failed to update member.", e));
        }
        self.state.succeed("Member updated successfully!");
        self.refresh().await;
        Ok(())
    }

    pub async fn remove_member(&mut self, family_id: i64, user_id: i64) -> Result<()> {
        if let Err(e) = self
            .api
            .delete::<serde_json::Value>(&format!(
                "/admin/families/{}/members/{}",
                family_id, user_id
            ))
            .await
        {
            return Err(self.state.fail("Failed to remove member.", e));
        }
        self.state.succeed("Member removed successfully!");
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
