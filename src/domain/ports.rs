use crate::domain::forms::ChangePlanRequest;
use crate::utils::error::Result;
use async_trait::async_trait;

/// 保存登入 token 的地方（CLI 用檔案，測試用記憶體）
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

pub trait ConfigProvider: Send + Sync {
    fn api_url(&self) -> &str;
    fn session_file(&self) -> &str;
    fn timeout_seconds(&self) -> u64;
    fn app_name(&self) -> Option<&str>;
}

/// 方案變更流程唯一的寫入操作
#[async_trait]
pub trait SubscriptionGateway: Send + Sync {
    async fn change_plan(&self, request: &ChangePlanRequest) -> Result<()>;
}
