use crate::core::http::DEFAULT_TIMEOUT_SECONDS;
use crate::core::resource::OutputFormat;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{AdminError, Result};
use crate::utils::validation::{validate_path, validate_positive_number, validate_url, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_SESSION_FILE: &str = ".family-admin/session";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub output: OutputSection,
    pub app_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiSection {
    pub base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSection {
    pub token_file: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSection {
    pub format: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AdminError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| AdminError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${FAMILY_ADMIN_API_URL})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AdminError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn output_format(&self) -> Result<Option<OutputFormat>> {
        self.output
            .format
            .as_deref()
            .map(|f| {
                f.parse().map_err(|reason| AdminError::InvalidConfigValueError {
                    field: "output.format".to_string(),
                    value: f.to_string(),
                    reason,
                })
            })
            .transpose()
    }
}

/// CLI 旗標、TOML 檔與預設值合併後的最終設定（優先序依序遞減）
#[derive(Debug, Clone, PartialEq)]
pub struct AppSettings {
    pub api_url: String,
    pub session_file: String,
    pub timeout_seconds: u64,
    pub format: OutputFormat,
    pub app_name: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            session_file: DEFAULT_SESSION_FILE.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            format: OutputFormat::default(),
            app_name: None,
        }
    }
}

/// 來自命令列的覆寫值，全部可省略
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub session_file: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub format: Option<OutputFormat>,
    pub app_name: Option<String>,
}

impl AppSettings {
    pub fn merge(file: Option<&TomlConfig>, overrides: Overrides) -> Result<Self> {
        let defaults = Self::default();
        let file_format = match file {
            Some(config) => config.output_format()?,
            None => None,
        };

        Ok(Self {
            api_url: overrides
                .api_url
                .or_else(|| file.and_then(|c| c.api.base_url.clone()))
                .unwrap_or(defaults.api_url),
            session_file: overrides
                .session_file
                .or_else(|| file.and_then(|c| c.session.token_file.clone()))
                .unwrap_or(defaults.session_file),
            timeout_seconds: overrides
                .timeout_seconds
                .or_else(|| file.and_then(|c| c.api.timeout_seconds))
                .unwrap_or(defaults.timeout_seconds),
            format: overrides.format.or(file_format).unwrap_or(defaults.format),
            app_name: overrides
                .app_name
                .or_else(|| file.and_then(|c| c.app_name.clone())),
        })
    }
}

impl ConfigProvider for AppSettings {
    fn api_url(&self) -> &str {
        &self.api_url
    }

    fn session_file(&self) -> &str {
        &self.session_file
    }

    fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }

    fn app_name(&self) -> Option<&str> {
        self.app_name.as_deref()
    }
}

impl Validate for AppSettings {
    fn validate(&self) -> Result<()> {
        validate_url("api_url", &self.api_url)?;
        validate_path("session_file", &self.session_file)?;
        validate_positive_number("timeout_seconds", self.timeout_seconds, 1)?;
        Ok(())
    }
}
