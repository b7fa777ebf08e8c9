use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV rendering error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("API returned {status}: {message}")]
    ApiError { status: u16, message: String },

    /// `message` 只在請求未帶 token（例如登入）時保留伺服器訊息
    #[error("Unauthorized: {}", unauthorized_text(.message))]
    Unauthorized { message: Option<String> },

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Validation failed for '{field}': {message}")]
    ValidationError { field: String, message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("{resource} {id} is protected: {reason}")]
    ProtectedRecord {
        resource: String,
        id: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, AdminError>;

fn unauthorized_text(message: &Option<String>) -> &str {
    message
        .as_deref()
        .unwrap_or("session expired or token rejected by the server")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Server,
    Authentication,
    Validation,
    Configuration,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AdminError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::HttpError(_) => ErrorCategory::Network,
            Self::ApiError { .. } => ErrorCategory::Server,
            Self::Unauthorized { .. } | Self::NotAuthenticated => ErrorCategory::Authentication,
            Self::ValidationError { .. } | Self::ProtectedRecord { .. } => {
                ErrorCategory::Validation
            }
            Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::IoError(_)
            | Self::SerializationError(_)
            | Self::CsvError(_)
            | Self::InvalidState { .. } => ErrorCategory::Internal,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Validation => ErrorSeverity::Low,
            ErrorCategory::Network | ErrorCategory::Server => ErrorSeverity::Medium,
            ErrorCategory::Authentication | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Internal => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check the API URL and your network connection, then retry",
            ErrorCategory::Server => "Review the server message and resubmit",
            ErrorCategory::Authentication => "Run `family-admin login` to obtain a new token",
            ErrorCategory::Validation => "Correct the highlighted field and resubmit",
            ErrorCategory::Configuration => "Fix the configuration file or command-line flags",
            ErrorCategory::Internal => "Re-run with --verbose and report the log output",
        }
    }

    /// 給使用者看的訊息：伺服器訊息原樣顯示，其餘用通用字串
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ApiError { message, .. } => message.clone(),
            Self::ValidationError { message, .. } => message.clone(),
            Self::ProtectedRecord { reason, .. } => reason.clone(),
            Self::Unauthorized {
                message: Some(message),
            } => message.clone(),
            Self::Unauthorized { message: None } => {
                "Your session has expired. Please log in again.".to_string()
            }
            Self::NotAuthenticated => "You must log in first.".to_string(),
            Self::HttpError(_) => "Could not reach the server.".to_string(),
            Self::InvalidState { message } => message.clone(),
            other => other.to_string(),
        }
    }
}
