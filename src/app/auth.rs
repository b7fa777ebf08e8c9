use crate::core::http::ApiClient;
use crate::core::session::Session;
use crate::domain::forms::LoginRequest;
use crate::domain::model::User;
use crate::utils::error::{AdminError, Result};
use crate::utils::validation::Validate;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    #[serde(default)]
    user: Option<User>,
}

pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// 登入成功後把 token 存進 session，回傳後端附帶的使用者資料
    pub async fn login(&self, request: &LoginRequest) -> Result<Option<User>> {
        request.validate()?;
        tracing::debug!("Logging in as {}", request.email);

        let response: LoginResponse = self.api.post_anonymous("/auth/login", request).await?;
        if response.token.trim().is_empty() {
            return Err(AdminError::ApiError {
                status: 200,
                message: "Login response did not include a token".to_string(),
            });
        }
        self.api.session().login(&response.token)?;
        Ok(response.user)
    }

    pub fn logout(&self) -> Result<()> {
        self.api.session().logout()
    }
}

/// 受保護的指令在送出任何請求前先檢查是否已登入
pub fn require_auth(session: &Session) -> Result<()> {
    if session.is_authenticated() {
        Ok(())
    } else {
        Err(AdminError::NotAuthenticated)
    }
}
