use crate::utils::error::AdminError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerKind {
    Success,
    Error,
}

/// 可關閉的訊息列
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
}

impl Banner {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == BannerKind::Error
    }
}

impl std::fmt::Display for Banner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            BannerKind::Success => write!(f, "✅ {}", self.message),
            BannerKind::Error => write!(f, "❌ {}", self.message),
        }
    }
}

/// 清單畫面的共用狀態：最後一次成功取得的資料與訊息列。
/// 變更只在請求成功後才反映（重新抓取），失敗時保留原資料。
#[derive(Debug, Clone)]
pub struct ListState<T> {
    items: Vec<T>,
    banner: Option<Banner>,
    loaded: bool,
    stale: bool,
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            banner: None,
            loaded: false,
            stale: false,
        }
    }
}

impl<T> ListState<T> {
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// 變更已送出，但之後的重新載入失敗，清單可能不是最新的
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    pub fn replace(&mut self, items: Vec<T>) {
        self.items = items;
        self.loaded = true;
        self.stale = false;
    }

    pub fn succeed(&mut self, message: impl Into<String>) {
        self.banner = Some(Banner::success(message));
    }

    /// 記錄失敗並回傳錯誤，訊息格式為「前綴 + 伺服器訊息」
    pub fn fail(&mut self, prefix: &str, error: AdminError) -> AdminError {
        let message = format!("{} {}", prefix, error.user_friendly_message());
        tracing::error!("❌ {}", message);
        self.banner = Some(Banner::error(message));
        error
    }

    /// 保留變更成功的訊息，只記錄重新載入的錯誤
    pub fn reload_failed(&mut self, banner: Option<Banner>, error: &AdminError) {
        tracing::warn!("⚠️ Change saved but the list could not be reloaded: {}", error);
        self.banner = banner;
        self.stale = true;
    }

    pub fn clear_error(&mut self) {
        if self.banner.as_ref().is_some_and(Banner::is_error) {
            self.banner = None;
        }
    }
}
