//! # API Handlers
//!
//! This module contains all the HTTP endpoint handlers for the Standup
//! Recap API.

use crate::models::ServiceInfo;
use axum::response::Json;

pub mod connections;
pub mod notify;
pub mod recaps;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn root_reports_the_service_name() {
        let Json(info) = root().await;
        assert_eq!(info.service, "standup-recap");
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
    }
}
