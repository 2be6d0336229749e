//! Navigation guard for the dashboard views.
//!
//! Before every view transition the front-end asks the guard whether to
//! proceed. The answer depends only on whether the target needs a login and
//! whether the session currently holds a token.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::auth::SessionStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Dashboard,
    MachineDetail { ip: String },
    MachineHistory { ip: String },
    Login,
    Register,
}

impl Route {
    /// View shown after login and when a logged-in user opens login/register.
    pub const LANDING: Route = Route::Dashboard;

    pub fn requires_auth(&self) -> bool {
        matches!(
            self,
            Route::Dashboard | Route::MachineDetail { .. } | Route::MachineHistory { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Route::Dashboard => "Dashboard",
            Route::MachineDetail { .. } => "MachineDetail",
            Route::MachineHistory { .. } => "MachineHistory",
            Route::Login => "Login",
            Route::Register => "Register",
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Dashboard => "/".to_string(),
            Route::MachineDetail { ip } => format!("/machine/{}", ip),
            Route::MachineHistory { ip } => format!("/machine/{}/history", ip),
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
        }
    }

    /// Match a path against the route table. Query strings and a trailing
    /// slash are ignored.
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Some(Route::Dashboard),
            ["login"] => Some(Route::Login),
            ["register"] => Some(Route::Register),
            ["machine", ip] => Some(Route::MachineDetail { ip: ip.to_string() }),
            ["machine", ip, "history"] => Some(Route::MachineHistory { ip: ip.to_string() }),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Proceed,
    Redirect(Route),
}

/// Pure guard decision.
pub fn decide(target: &Route, authenticated: bool) -> Navigation {
    if target.requires_auth() && !authenticated {
        Navigation::Redirect(Route::Login)
    } else if matches!(target, Route::Login | Route::Register) && authenticated {
        Navigation::Redirect(Route::LANDING)
    } else {
        Navigation::Proceed
    }
}

pub struct RouteGuard {
    session: Arc<SessionStore>,
}

impl RouteGuard {
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self { session }
    }

    /// Decide a navigation against the live session state.
    pub fn check(&self, target: &Route) -> Navigation {
        let decision = decide(target, self.session.is_authenticated());
        debug!(route = %target, ?decision, "Navigation checked");
        decision
    }
}
