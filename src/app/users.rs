use crate::core::http::ApiClient;
use crate::core::resource::{or_dash, yes_no, Column, Resource, RowAction};
use crate::core::screen::ListState;
use crate::domain::forms::{
    FamilyForm, MemberRoleUpdate, MembershipForm, NewUser, PasswordChange, UserUpdate,
};
use crate::domain::model::{Family, User, UserFamily, SEED_ADMIN_ID};
use crate::utils::error::{AdminError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct UsersEnvelope {
    #[serde(default)]
    users: Vec<User>,
}

#[derive(Debug, Deserialize)]
struct UserEnvelope {
    user: User,
}

#[derive(Debug, Deserialize)]
struct UserFamiliesEnvelope {
    #[serde(default)]
    families: Vec<UserFamily>,
}

#[derive(Debug, Deserialize)]
struct AvailableFamiliesEnvelope {
    #[serde(default)]
    available_families: Vec<Family>,
}

#[derive(Debug, Deserialize)]
struct FamilyEnvelope {
    family: Family,
}

#[derive(Debug, Serialize)]
struct CreateFamilyBody<'a> {
    #[serde(flatten)]
    form: &'a FamilyForm,
    created_by_user_id: i64,
}

impl Resource for User {
    const NAME: &'static str = "users";

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("id", "ID"),
            Column::new("name", "Name"),
            Column::new("email", "Email"),
            Column::new("role", "Role"),
            Column::new("created_at", "Created"),
        ];
        COLUMNS
    }

    fn cell(&self, key: &str) -> String {
        match key {
            "id" => self.id.to_string(),
            "name" => self.name.clone(),
            "email" => self.email.clone(),
            "role" => self.role.to_string(),
            "created_at" => or_dash(self.created_at.map(|d| d.format("%Y-%m-%d"))),
            _ => String::new(),
        }
    }

    fn actions(&self) -> Vec<RowAction> {
        // 種子管理員沒有刪除操作
        if self.is_seed_admin() {
            vec![RowAction::Edit, RowAction::ChangePassword]
        } else {
            vec![RowAction::Edit, RowAction::ChangePassword, RowAction::Delete]
        }
    }
}

impl Resource for UserFamily {
    const NAME: &'static str = "families";

    fn columns() -> &'static [Column] {
        const COLUMNS: &[Column] = &[
            Column::new("id", "ID"),
            Column::new("family_name", "Family"),
            Column::new("role", "Role"),
            Column::new("is_admin", "Admin"),
        ];
        COLUMNS
    }

    fn cell(&self, key: &str) -> String {
        match key {
            "id" => self.id.to_string(),
            "family_name" => self.family_name.clone(),
            "role" => self.role.clone(),
            "is_admin" => yes_no(self.is_admin),
            _ => String::new(),
        }
    }

    fn actions(&self) -> Vec<RowAction> {
        vec![RowAction::Edit, RowAction::Delete]
    }
}

/// 使用者管理畫面
pub struct UsersScreen {
    api: ApiClient,
    state: ListState<User>,
}

impl UsersScreen {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: ListState::default(),
        }
    }

    pub fn state(&self) -> &ListState<User> {
        &self.state
    }

    pub fn users(&self) -> &[User] {
        self.state.items()
    }

    pub async fn load(&mut self) -> Result<&[User]> {
        match self.api.get::<UsersEnvelope>("/admin/users").await {
            Ok(envelope) => {
                tracing::debug!("Loaded {} users", envelope.users.len());
                self.state.replace(envelope.users);
                self.state.clear_error();
                Ok(self.state.items())
            }
            Err(e) => Err(self.state.fail("Failed to load users.", e)),
        }
    }

    pub async fn get(&mut self, id: i64) -> Result<User> {
        match self
            .api
            .get::<UserEnvelope>(&format!("/admin/users/{}", id))
            .await
        {
            Ok(envelope) => Ok(envelope.user),
            Err(e) => Err(self.state.fail("Failed to load user details.", e)),
        }
    }

    pub async fn create(&mut self, user: &NewUser) -> Result<()> {
        if let Err(e) = user.validate() {
            return Err(self.state.fail("Failed to save user.", e));
        }
        if let Err(e) = self
            .api
            .post::<_, serde_json::Value>("/admin/users", user)
            .await
        {
            return Err(self.state.fail("Failed to save user.", e));
        }
        tracing::info!("✅ Created user {}", user.email);
        self.state.succeed("User created successfully!");
        self.refresh().await;
        Ok(())
    }

    pub async fn update(&mut self, id: i64, update: &UserUpdate) -> Result<()> {
        if let Err(e) = update.validate() {
            return Err(self.state.fail("Failed to save user.", e));
        }
        if let Err(e) = self
            .api
            .put::<_, serde_json::Value>(&format!("/admin/users/{}", id), update)
            .await
        {
            return Err(self.state.fail("Failed to save user.", e));
        }
        self.state.succeed("User updated successfully!");
        self.refresh().await;
        Ok(())
    }

    pub async fn delete(&mut self, id: i64) -> Result<()> {
        if id == SEED_ADMIN_ID {
            let err = AdminError::ProtectedRecord {
                resource: "user".to_string(),
                id: id.to_string(),
                reason: "The seed administrator account cannot be deleted".to_string(),
            };
            return Err(self.state.fail("Failed to delete user.", err));
        }
        if let Err(e) = self
            .api
            .delete::<serde_json::Value>(&format!("/admin/users/{}", id))
            .await
        {
            return Err(self.state.fail("Failed to delete user.", e));
        }
        tracing::info!("Deleted user {}", id);
        self.state.succeed("User deleted successfully!");
        self.refresh().await;
        Ok(())
    }

    pub async fn change_password(&mut self, id: i64, change: &PasswordChange) -> Result<()> {
        if let Err(e) = change.validate() {
            return Err(self.state.fail("Failed to update password.", e));
        }
        if let Err(e) = self
            .api
            .put::<_, serde_json::Value>(&format!("/admin/users/{}/password", id), change)
            .await
        {
            return Err(self.state.fail("Failed to update password.", e));
        }
        self.state.succeed("Password updated successfully!");
        Ok(())
    }

    pub async fn families(&mut self, user_id: i64) -> Result<Vec<UserFamily>> {
        match self
            .api
            .get::<UserFamiliesEnvelope>(&format!("/admin/users/{}/families", user_id))
            .await
        {
            Ok(envelope) => Ok(envelope.families),
            Err(e) => Err(self.state.fail("Failed to load family associations.", e)),
        }
    }

    pub async fn available_families(&mut self, user_id: i64) -> Result<Vec<Family>> {
        match self
            .api
            .get::<AvailableFamiliesEnvelope>(&format!(
                "/admin/users/{}/available-families",
                user_id
            ))
            .await
        {
            Ok(envelope) => Ok(envelope.available_families),
            Err(e) => Err(self.state.fail("Failed to load available families.", e)),
        }
    }

    pub async fn add_to_family(&mut self, family_id: i64, membership: &MembershipForm) -> Result<()> {
        if let Err(e) = self
            .api
            .post::<_, serde_json::Value>(&format!("/admin/families/{}/members", family_id), membership)
            .await
        {
            return Err(self.state.fail("Failed to add user to family.", e));
        }
        self.state.succeed("User added to family successfully");
        Ok(())
    }

    pub async fn remove_from_family(&mut self, family_id: i64, user_id: i64) -> Result<()> {
        if let Err(e) = self
            .api
            .delete::<serde_json::Value>(&format!(
                "/admin/families/{}/members/{}",
                family_id, user_id
            ))
            .await
        {
            return Err(self.state.fail("Failed to remove user from family.", e));
        }
        self.state.succeed("User removed from family");
        Ok(())
    }

    pub async fn update_family_role(
        &mut self,
        family_id: i64,
        user_id: i64,
        update: &MemberRoleUpdate,
    ) -> Result<()> {
        if let Err(e) = update.validate() {
            return Err(self.state.fail("Failed to update user role.", e));
        }
        if let Err(e) = self
            .api
            .put::<_, serde_json::Value>(
                &format!("/admin/families/{}/members/{}", family_id, user_id),
                update,
            )
            .await
        {
            return Err(self.state.fail("Failed to update user role.", e));
        }
        self.state.succeed("User role updated");
        Ok(())
    }

    /// 建立家庭並把使用者設為家長兼管理員
    pub async fn create_family_for(&mut self, user_id: i64, form: &FamilyForm) -> Result<Family> {
        if let Err(e) = form.validate() {
            return Err(self.state.fail("Failed to create family.", e));
        }
        let body = CreateFamilyBody {
            form,
            created_by_user_id: user_id,
        };
        let family = match self.api.post::<_, FamilyEnvelope>("/admin/families", &body).await {
            Ok(envelope) => envelope.family,
            Err(e) => return Err(self.state.fail("Failed to create family.", e)),
        };

        let membership = MembershipForm::new(user_id, Some("parent".to_string()), true);
        self.add_to_family(family.id, &membership).await?;
        self.state
            .succeed("Family created successfully and user added as admin");
        Ok(family)
    }

    /// 變更已成功；重新載入失敗只標記清單過期，不回傳錯誤
    async fn refresh(&mut self) {
        let saved = self.state.banner().cloned();
        if let Err(e) = self.load().await {
            self.state.reload_failed(saved, &e);
        }
    }
}
