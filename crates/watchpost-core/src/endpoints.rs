//! Logical endpoint table.
//!
//! Every backend operation has a name (`monitor.latestByIp`) and a path
//! template relative to the API prefix. Templates may carry `{ip}` or
//! `{user_id}` placeholders that must all be filled before dispatch.

use crate::api::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    AuthRegister,
    AuthLogin,
    AuthMe,
    AuthProfile,
    AuthRefresh,

    MonitorLatest,
    MonitorByIp,
    MonitorLatestByIp,
    MonitorTimeRange,
    MonitorPaginated,
    MonitorIps,
    MonitorStatistics,
    MonitorHighCpu,
    MonitorHighMemory,
    MonitorActiveMachines,
    MonitorCompleteByIp,
    MonitorLatestTenByIp,
    MonitorSystemOverview,

    UsersGet,
    UsersCreate,
    UsersChange,
    UsersDelete,
    UsersAll,

    CacheStats,
    CacheClear,
}

impl Endpoint {
    pub const ALL: [Endpoint; 25] = [
        Endpoint::AuthRegister,
        Endpoint::AuthLogin,
        Endpoint::AuthMe,
        Endpoint::AuthProfile,
        Endpoint::AuthRefresh,
        Endpoint::MonitorLatest,
        Endpoint::MonitorByIp,
        Endpoint::MonitorLatestByIp,
        Endpoint::MonitorTimeRange,
        Endpoint::MonitorPaginated,
        Endpoint::MonitorIps,
        Endpoint::MonitorStatistics,
        Endpoint::MonitorHighCpu,
        Endpoint::MonitorHighMemory,
        Endpoint::MonitorActiveMachines,
        Endpoint::MonitorCompleteByIp,
        Endpoint::MonitorLatestTenByIp,
        Endpoint::MonitorSystemOverview,
        Endpoint::UsersGet,
        Endpoint::UsersCreate,
        Endpoint::UsersChange,
        Endpoint::UsersDelete,
        Endpoint::UsersAll,
        Endpoint::CacheStats,
        Endpoint::CacheClear,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Endpoint::AuthRegister => "auth.register",
            Endpoint::AuthLogin => "auth.login",
            Endpoint::AuthMe => "auth.me",
            Endpoint::AuthProfile => "auth.profile",
            Endpoint::AuthRefresh => "auth.refresh",
            Endpoint::MonitorLatest => "monitor.latest",
            Endpoint::MonitorByIp => "monitor.byIp",
            Endpoint::MonitorLatestByIp => "monitor.latestByIp",
            Endpoint::MonitorTimeRange => "monitor.timeRange",
            Endpoint::MonitorPaginated => "monitor.paginated",
            Endpoint::MonitorIps => "monitor.ips",
            Endpoint::MonitorStatistics => "monitor.statistics",
            Endpoint::MonitorHighCpu => "monitor.highCpu",
            Endpoint::MonitorHighMemory => "monitor.highMemory",
            Endpoint::MonitorActiveMachines => "monitor.activeMachines",
            Endpoint::MonitorCompleteByIp => "monitor.completeByIp",
            Endpoint::MonitorLatestTenByIp => "monitor.latestTenByIp",
            Endpoint::MonitorSystemOverview => "monitor.systemOverview",
            Endpoint::UsersGet => "users.get",
            Endpoint::UsersCreate => "users.create",
            Endpoint::UsersChange => "users.change",
            Endpoint::UsersDelete => "users.delete",
            Endpoint::UsersAll => "users.all",
            Endpoint::CacheStats => "cache.stats",
            Endpoint::CacheClear => "cache.clear",
        }
    }

    pub const fn template(self) -> &'static str {
        match self {
            Endpoint::AuthRegister => "/auth/register",
            Endpoint::AuthLogin => "/auth/login",
            Endpoint::AuthMe => "/auth/me",
            Endpoint::AuthProfile => "/auth/profile",
            Endpoint::AuthRefresh => "/auth/refresh",
            Endpoint::MonitorLatest => "/monitor-metrics/latest",
            Endpoint::MonitorByIp => "/monitor-metrics/ip/{ip}",
            Endpoint::MonitorLatestByIp => "/monitor-metrics/ip/{ip}/latest",
            Endpoint::MonitorTimeRange => "/monitor-metrics/time-range",
            Endpoint::MonitorPaginated => "/monitor-metrics/paginated",
            Endpoint::MonitorIps => "/monitor-metrics/ips",
            Endpoint::MonitorStatistics => "/monitor-metrics/statistics",
            Endpoint::MonitorHighCpu => "/monitor-metrics/high-cpu",
            Endpoint::MonitorHighMemory => "/monitor-metrics/high-memory",
            Endpoint::MonitorActiveMachines => "/monitor-metrics/active-machines",
            Endpoint::MonitorCompleteByIp => "/monitor-metrics/ip/{ip}/complete",
            Endpoint::MonitorLatestTenByIp => "/monitor-metrics/ip/{ip}/latest-ten",
            Endpoint::MonitorSystemOverview => "/monitor-metrics/system-overview",
            Endpoint::UsersGet => "/users/{user_id}",
            Endpoint::UsersCreate => "/users/create",
            Endpoint::UsersChange => "/users/change",
            Endpoint::UsersDelete => "/users/delete",
            Endpoint::UsersAll => "/admin/users",
            Endpoint::CacheStats => "/cache/stats",
            Endpoint::CacheClear => "/cache/clear",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.name() == name)
    }

    /// Fill the template's placeholders from `params`.
    pub fn path(self, params: &[(&str, &str)]) -> Result<String, ApiError> {
        render(self.template(), params)
    }
}

/// Substitute `{name}` placeholders. Values are inserted verbatim; a
/// placeholder left unfilled is an error.
pub fn render(template: &str, params: &[(&str, &str)]) -> Result<String, ApiError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let (name, tail) = after.split_once('}').unwrap_or((after, ""));
        let value = params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
            .ok_or_else(|| {
                ApiError::InvalidRequest(format!(
                    "Missing path parameter '{}' for {}",
                    name, template
                ))
            })?;
        out.push_str(value);
        rest = tail;
    }
    out.push_str(rest);
    Ok(out)
}
