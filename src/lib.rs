pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use app::subscription::SubscriptionService;
pub use config::cli::FileSessionStore;
pub use config::toml_config::AppSettings;
pub use core::{http::ApiClient, plan_change::PlanChangeFlow, session::Session};
pub use utils::error::{AdminError, Result};
