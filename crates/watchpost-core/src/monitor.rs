//! Typed helpers for the metrics, user-admin and cache-admin endpoints.
//!
//! Every call goes through `AuthGateway::request`, so the bearer token is
//! attached and an expired token is refreshed transparently. Payload shapes
//! are the backend's business; data comes back as untyped JSON and an
//! envelope code other than 200 becomes `ApiError::Application`.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::api::{ApiError, RequestDescriptor};
use crate::auth::AuthGateway;
use crate::endpoints::Endpoint;

/// Fields accepted by the user create/change endpoints.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Clone is cheap - the gateway is shared behind an Arc.
#[derive(Clone)]
pub struct MonitorClient {
    gateway: Arc<AuthGateway>,
}

impl MonitorClient {
    pub fn new(gateway: Arc<AuthGateway>) -> Self {
        Self { gateway }
    }

    async fn fetch(&self, descriptor: RequestDescriptor) -> Result<Option<Value>, ApiError> {
        let path = descriptor.path.clone();
        let data = self.gateway.request(descriptor).await?.into_result()?;
        debug!(path = %path, has_data = data.is_some(), "Fetched");
        Ok(data)
    }

    async fn get(&self, endpoint: Endpoint) -> Result<Option<Value>, ApiError> {
        self.fetch(RequestDescriptor::get(endpoint.template())).await
    }

    async fn get_for_ip(&self, endpoint: Endpoint, ip: &str) -> Result<Option<Value>, ApiError> {
        let path = endpoint.path(&[("ip", ip)])?;
        self.fetch(RequestDescriptor::get(path)).await
    }

    // ===== Metrics =====

    pub async fn latest_metrics(&self) -> Result<Option<Value>, ApiError> {
        self.get(Endpoint::MonitorLatest).await
    }

    /// Latest metrics filtered to one machine.
    pub async fn machine_detail(&self, ip: &str) -> Result<Option<Value>, ApiError> {
        self.fetch(RequestDescriptor::get(Endpoint::MonitorLatest.template()).query("ip", ip))
            .await
    }

    /// The ten most recent samples for a machine.
    pub async fn machine_history(&self, ip: &str) -> Result<Option<Value>, ApiError> {
        self.get_for_ip(Endpoint::MonitorLatestTenByIp, ip).await
    }

    pub async fn metrics_by_ip(&self, ip: &str) -> Result<Option<Value>, ApiError> {
        self.get_for_ip(Endpoint::MonitorByIp, ip).await
    }

    pub async fn latest_by_ip(&self, ip: &str) -> Result<Option<Value>, ApiError> {
        self.get_for_ip(Endpoint::MonitorLatestByIp, ip).await
    }

    pub async fn complete_by_ip(&self, ip: &str) -> Result<Option<Value>, ApiError> {
        self.get_for_ip(Endpoint::MonitorCompleteByIp, ip).await
    }

    pub async fn ips(&self) -> Result<Option<Value>, ApiError> {
        self.get(Endpoint::MonitorIps).await
    }

    pub async fn statistics(&self) -> Result<Option<Value>, ApiError> {
        self.get(Endpoint::MonitorStatistics).await
    }

    pub async fn high_cpu(&self) -> Result<Option<Value>, ApiError> {
        self.get(Endpoint::MonitorHighCpu).await
    }

    pub async fn high_memory(&self) -> Result<Option<Value>, ApiError> {
        self.get(Endpoint::MonitorHighMemory).await
    }

    pub async fn active_machines(&self) -> Result<Option<Value>, ApiError> {
        self.get(Endpoint::MonitorActiveMachines).await
    }

    pub async fn system_overview(&self) -> Result<Option<Value>, ApiError> {
        self.get(Endpoint::MonitorSystemOverview).await
    }

    pub async fn time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<Value>, ApiError> {
        if end < start {
            return Err(ApiError::InvalidRequest(
                "Time range end is before its start".to_string(),
            ));
        }
        let req = RequestDescriptor::get(Endpoint::MonitorTimeRange.template())
            .query("start_time", start.to_rfc3339_opts(SecondsFormat::Secs, true))
            .query("end_time", end.to_rfc3339_opts(SecondsFormat::Secs, true));
        self.fetch(req).await
    }

    pub async fn paginated(&self, page: u32, page_size: u32) -> Result<Option<Value>, ApiError> {
        let req = RequestDescriptor::get(Endpoint::MonitorPaginated.template())
            .query("page", page)
            .query("page_size", page_size);
        self.fetch(req).await
    }

    // ===== User administration =====

    pub async fn user(&self, user_id: i64) -> Result<Option<Value>, ApiError> {
        let id = user_id.to_string();
        let path = Endpoint::UsersGet.path(&[("user_id", id.as_str())])?;
        self.fetch(RequestDescriptor::get(path)).await
    }

    pub async fn all_users(&self) -> Result<Option<Value>, ApiError> {
        self.get(Endpoint::UsersAll).await
    }

    pub async fn create_user(&self, user: &UserUpdate) -> Result<Option<Value>, ApiError> {
        self.fetch(RequestDescriptor::post(Endpoint::UsersCreate.template()).json(user)?)
            .await
    }

    pub async fn change_user(&self, user: &UserUpdate) -> Result<Option<Value>, ApiError> {
        self.fetch(RequestDescriptor::put(Endpoint::UsersChange.template()).json(user)?)
            .await
    }

    pub async fn delete_user(&self, user_id: i64) -> Result<Option<Value>, ApiError> {
        let req = RequestDescriptor::delete(Endpoint::UsersDelete.template()).query("user_id", user_id);
        self.fetch(req).await
    }

    // ===== Cache administration =====

    pub async fn cache_stats(&self) -> Result<Option<Value>, ApiError> {
        self.get(Endpoint::CacheStats).await
    }

    pub async fn clear_cache(&self) -> Result<Option<Value>, ApiError> {
        self.fetch(RequestDescriptor::post(Endpoint::CacheClear.template()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::HttpClient;
    use crate::auth::{MemoryStore, SessionStore};
    use crate::config::Config;
    use chrono::TimeZone;

    #[test]
    fn test_user_update_skips_unset_fields() {
        let update = UserUpdate {
            user_id: Some(7),
            role: Some("admin".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({"user_id": 7, "role": "admin"})
        );
    }

    #[tokio::test]
    async fn test_inverted_time_range_fails_before_dispatch() {
        // Nothing listens on this port; a dispatched request would be a
        // transport error instead.
        let config = Config {
            proxy_origin: "http://127.0.0.1:1".to_string(),
            ..Config::default()
        };
        let session = Arc::new(SessionStore::load(Arc::new(MemoryStore::new())));
        let gateway = Arc::new(AuthGateway::new(HttpClient::new(&config).unwrap(), session));

        let start = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let err = MonitorClient::new(gateway).time_range(start, end).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)), "got {err:?}");
    }
}
