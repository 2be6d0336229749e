//! Login lifecycle and the authenticated request pipeline.
//!
//! `AuthGateway` is the only writer of the `SessionStore`. Its public
//! operations never return an error: every failure is turned into
//! `Outcome::Failure` with a message the views can show directly.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::api::{ApiEnvelope, ApiError, HttpClient, RequestDescriptor};
use crate::endpoints::Endpoint;

use super::session::{Session, SessionStore};

/// Paths under this prefix establish credentials and never receive the
/// bearer header automatically.
pub const AUTH_PATH_PREFIX: &str = "/auth/";

/// Result of a gateway operation, ready for display.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success { data: Option<Value> },
    Failure { message: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            Outcome::Success { data } => data.as_ref(),
            Outcome::Failure { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::Failure { message } => Some(message),
        }
    }

    /// The operation's own fallback stands in when the backend rejected the
    /// call without saying why.
    fn failure(err: &ApiError, fallback: &str) -> Self {
        let message = match err {
            ApiError::Application { message: None, .. } => fallback.to_string(),
            other => other.to_string(),
        };
        Outcome::Failure { message }
    }
}

#[derive(Debug, Deserialize)]
struct LoginData {
    token: TokenPair,
}

#[derive(Debug, Deserialize)]
struct TokenPair {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// The refresh endpoint answers with either a bare pair or one nested
/// under `token`, like login.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RefreshData {
    Nested { token: TokenPair },
    Flat(TokenPair),
}

impl RefreshData {
    fn access_token(self) -> String {
        match self {
            RefreshData::Nested { token } | RefreshData::Flat(token) => token.access_token,
        }
    }
}

pub struct AuthGateway {
    http: HttpClient,
    session: Arc<SessionStore>,
}

impl AuthGateway {
    pub fn new(http: HttpClient, session: Arc<SessionStore>) -> Self {
        Self { http, session }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    // =========================================================================
    // Lifecycle operations
    // =========================================================================

    pub async fn register(&self, username: &str, password: &str) -> Outcome {
        let result = async {
            let req = RequestDescriptor::post(Endpoint::AuthRegister.template())
                .json(&json!({ "username": username, "password": password }))?;
            self.dispatch(req).await?.into_result()
        }
        .await;

        match result {
            Ok(data) => {
                info!(username, "Registration succeeded");
                Outcome::Success { data }
            }
            Err(e) => {
                warn!(username, error = %e, "Registration failed");
                Outcome::failure(&e, "Registration failed")
            }
        }
    }

    /// Log in and store the session. The username typed by the user is what
    /// gets persisted, not any name echoed back by the backend.
    pub async fn login(&self, username: &str, password: &str) -> Outcome {
        let result = async {
            let req = RequestDescriptor::post(Endpoint::AuthLogin.template())
                .json(&json!({ "username": username, "password": password }))?;
            let data = self.dispatch(req).await?.into_result()?;
            let login: LoginData = data
                .clone()
                .ok_or_else(|| ApiError::InvalidResponse("Login response has no data".to_string()))
                .and_then(|d| {
                    serde_json::from_value(d).map_err(|e| {
                        ApiError::InvalidResponse(format!("Login response has no access token: {}", e))
                    })
                })?;
            Ok::<_, ApiError>((data, login.token))
        }
        .await;

        match result {
            Ok((data, token)) => {
                let has_refresh = token.refresh_token.is_some();
                let session =
                    Session::authenticated(token.access_token, username, token.refresh_token);
                if let Err(e) = self.session.set(session) {
                    warn!(error = %e, "Failed to persist session");
                }
                info!(username, has_refresh, "Login successful");
                Outcome::Success { data }
            }
            Err(e) => {
                warn!(username, error = %e, "Login failed");
                Outcome::failure(&e, "Login failed")
            }
        }
    }

    /// Forget the session locally. The backend is not contacted.
    pub fn logout(&self) -> Outcome {
        if let Err(e) = self.session.clear() {
            warn!(error = %e, "Failed to clear persisted session");
        }
        info!("Logged out");
        Outcome::Success { data: None }
    }

    /// Exchange the stored refresh token for a new access token. Only the
    /// access token changes.
    pub async fn refresh_access_token(&self) -> Outcome {
        match self.try_refresh().await {
            Ok(data) => Outcome::Success { data },
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                Outcome::failure(&e, "Token refresh failed")
            }
        }
    }

    pub async fn current_user_info(&self) -> Outcome {
        let req = RequestDescriptor::get(Endpoint::AuthMe.template()).authenticated();
        match self.request(req).await.and_then(ApiEnvelope::into_result) {
            Ok(data) => Outcome::Success { data },
            Err(e) => {
                warn!(error = %e, "Failed to fetch user info");
                Outcome::failure(&e, "Failed to fetch user info")
            }
        }
    }

    // =========================================================================
    // Request pipeline
    // =========================================================================

    /// Send a request with the session's bearer token attached where the
    /// header policy allows. An HTTP 401 on an authorized request triggers
    /// one refresh and one retry when a refresh token is stored.
    pub async fn request(&self, descriptor: RequestDescriptor) -> Result<ApiEnvelope, ApiError> {
        let authorized = self.wants_bearer(&descriptor) && self.session.is_authenticated();
        match self.dispatch(descriptor.clone()).await {
            Err(e) if authorized && e.is_unauthorized() && self.session.refresh_token().is_some() => {
                debug!(path = %descriptor.path, "Access token rejected, refreshing");
                match self.try_refresh().await {
                    Ok(_) => self.dispatch(descriptor).await,
                    Err(refresh_err) => {
                        warn!(error = %refresh_err, "Refresh after 401 failed");
                        Err(e)
                    }
                }
            }
            other => other,
        }
    }

    /// Whether the bearer header belongs on this request.
    pub fn wants_bearer(&self, descriptor: &RequestDescriptor) -> bool {
        descriptor.authenticated || !descriptor.path.starts_with(AUTH_PATH_PREFIX)
    }

    /// Apply the header policy to a descriptor.
    pub fn authorize(&self, mut descriptor: RequestDescriptor) -> RequestDescriptor {
        if self.wants_bearer(&descriptor) {
            if let Some(token) = self.session.access_token() {
                descriptor
                    .headers
                    .insert("Authorization".to_string(), format!("Bearer {}", token));
            }
        }
        descriptor
    }

    async fn dispatch(&self, descriptor: RequestDescriptor) -> Result<ApiEnvelope, ApiError> {
        self.http.send(self.authorize(descriptor)).await
    }

    async fn try_refresh(&self) -> Result<Option<Value>, ApiError> {
        let refresh_token = self.session.refresh_token().ok_or(ApiError::NoRefreshToken)?;

        let req = RequestDescriptor::post(Endpoint::AuthRefresh.template())
            .json(&json!({ "refresh_token": refresh_token }))?;
        let data = self.dispatch(req).await?.into_result()?;

        let access_token = data
            .clone()
            .and_then(|d| serde_json::from_value::<RefreshData>(d).ok())
            .map(RefreshData::access_token)
            .ok_or_else(|| {
                ApiError::InvalidResponse("Refresh response has no access token".to_string())
            })?;

        match self.session.replace_access_token(&access_token) {
            Ok(true) => debug!("Access token refreshed"),
            Ok(false) => warn!("Session ended before the refreshed token arrived"),
            Err(e) => warn!(error = %e, "Failed to persist refreshed token"),
        }
        Ok(data)
    }
}
