//! # Data Models
//!
//! This module contains all the data models used throughout the Standup Recap service.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod connection;
pub mod daily_recap;
pub mod recap_script;

pub use connection::Entity as Connection;
pub use daily_recap::Entity as DailyRecap;
pub use recap_script::Entity as RecapScript;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "standup-recap".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
