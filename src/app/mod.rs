pub mod account;
pub mod affiliate;
pub mod auth;
pub mod billing;
#[cfg(feature = "cli")]
pub mod commands;
pub mod dashboard;
pub mod families;
pub mod subscription;
pub mod users;
