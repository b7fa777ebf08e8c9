use crate::core::session::Session;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{AdminError, Result};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// 後端 REST API 的薄包裝：每個請求自動帶上 Bearer token，
/// 收到 401 時清除 session。
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Session) -> Result<Self> {
        Self::with_timeout(base_url, session, DEFAULT_TIMEOUT_SECONDS)
    }

    pub fn with_timeout(base_url: &str, session: Session, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C, session: Session) -> Result<Self> {
        Self::with_timeout(config.api_url(), session, config.timeout_seconds())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request::<(), T>(Method::GET, path, None).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.request(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request::<(), T>(Method::DELETE, path, None).await
    }

    pub async fn delete_with_body<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.request(Method::DELETE, path, Some(body)).await
    }

    /// 不帶 token 的 POST（登入）。401 只代表帳密錯誤，不會清除 session
    pub async fn post_anonymous<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send(Method::POST, path, Some(body), false).await
    }

    async fn request<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T> {
        self.send(method, path, body, true).await
    }

    async fn send<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        with_token: bool,
    ) -> Result<T> {
        let url = self.url(path);
        tracing::debug!("Making API request: {} {}", method, url);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("Accept", "application/json");

        let token = if with_token { self.session.token() } else { None };
        let sent_token = token.is_some();
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("API response status: {} for {} {}", status, method, path);

        let text = response.text().await?;
        let payload: serde_json::Value = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(value) => value,
                Err(e) if status.is_success() => return Err(AdminError::SerializationError(e)),
                Err(_) => serde_json::Value::String(text),
            }
        };

        if status == StatusCode::UNAUTHORIZED {
            if !sent_token {
                return Err(AdminError::Unauthorized {
                    message: server_message(&payload),
                });
            }
            tracing::warn!("⚠️ Token rejected by the server, clearing session");
            if let Err(e) = self.session.logout() {
                tracing::warn!("Failed to clear stored session: {}", e);
            }
            return Err(AdminError::Unauthorized { message: None });
        }

        if !status.is_success() {
            let message = server_message(&payload)
                .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));
            tracing::debug!("API error {}: {}", status, message);
            return Err(AdminError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        // 部分端點以 200 回傳 {"success": false}
        if payload.get("success").and_then(|v| v.as_bool()) == Some(false) {
            return Err(AdminError::ApiError {
                status: status.as_u16(),
                message: server_message(&payload)
                    .unwrap_or_else(|| "Request was not successful".to_string()),
            });
        }

        Ok(serde_json::from_value(payload)?)
    }
}

fn server_message(payload: &serde_json::Value) -> Option<String> {
    match payload {
        serde_json::Value::Object(map) => map
            .get("message")
            .or_else(|| map.get("error"))
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string),
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}
