pub mod affiliate;
pub mod http;
pub mod plan_change;
pub mod proration;
pub mod resource;
pub mod screen;
pub mod session;

pub use crate::domain::ports::{ConfigProvider, SessionStore, SubscriptionGateway};
pub use crate::utils::error::Result;
