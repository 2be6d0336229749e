//! The logged-in session and its write-through store.
//!
//! A session is either anonymous or holds credentials; a token without a
//! username cannot be represented.

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::storage::KeyValueStore;

/// Storage key for the access token
pub const TOKEN_KEY: &str = "auth_token";
/// Storage key for the username
pub const USERNAME_KEY: &str = "username";
/// Storage key for the refresh token; empty when the backend issued none
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Credentials of a logged-in user. The access token and username only
/// ever exist together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
    pub username: String,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    credentials: Option<Credentials>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(
        access_token: impl Into<String>,
        username: impl Into<String>,
        refresh_token: Option<String>,
    ) -> Self {
        Self {
            credentials: Some(Credentials {
                access_token: access_token.into(),
                username: username.into(),
                refresh_token: refresh_token.filter(|t| !t.is_empty()),
            }),
        }
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.access_token.as_str())
    }

    pub fn username(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.username.as_str())
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.credentials
            .as_ref()
            .and_then(|c| c.refresh_token.as_deref())
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }
}

/// Process-wide session state, persisted on every mutation.
///
/// Shared as `Arc<SessionStore>`; the mutex makes each mutation and its
/// write-through atomic with respect to readers on other threads.
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    state: Mutex<Session>,
}

impl SessionStore {
    /// Build the store from whatever `storage` holds. Storage that cannot be
    /// read starts the process logged out.
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let session = match Self::read_persisted(storage.as_ref()) {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Failed to load persisted session, starting logged out");
                Session::anonymous()
            }
        };
        debug!(authenticated = session.is_authenticated(), "Session loaded");
        Self {
            storage,
            state: Mutex::new(session),
        }
    }

    /// All three keys must be present, otherwise nothing is restored.
    fn read_persisted(storage: &dyn KeyValueStore) -> Result<Session> {
        let token = storage.get(TOKEN_KEY)?;
        let username = storage.get(USERNAME_KEY)?;
        let refresh = storage.get(REFRESH_TOKEN_KEY)?;

        match (token, username, refresh) {
            (Some(token), Some(username), Some(refresh)) if !token.is_empty() => {
                Ok(Session::authenticated(token, username, Some(refresh)))
            }
            _ => Ok(Session::anonymous()),
        }
    }

    pub fn get(&self) -> Session {
        self.lock().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().is_authenticated()
    }

    pub fn access_token(&self) -> Option<String> {
        self.lock().access_token().map(str::to_string)
    }

    pub fn username(&self) -> Option<String> {
        self.lock().username().map(str::to_string)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.lock().refresh_token().map(str::to_string)
    }

    /// Replace the whole session and write it through. An anonymous session
    /// is the same as `clear`.
    pub fn set(&self, session: Session) -> Result<()> {
        let mut state = self.lock();
        *state = session;
        match state.credentials() {
            Some(creds) => self.persist(creds),
            None => self.remove_all(),
        }
    }

    /// Drop the session and remove all three keys.
    pub fn clear(&self) -> Result<()> {
        let mut state = self.lock();
        *state = Session::anonymous();
        self.remove_all()
    }

    /// Swap in a new access token, keeping username and refresh token.
    /// Returns `Ok(false)` when there is no session to update.
    pub fn replace_access_token(&self, access_token: &str) -> Result<bool> {
        let mut state = self.lock();
        let Some(creds) = state.credentials.as_mut() else {
            return Ok(false);
        };
        creds.access_token = access_token.to_string();
        self.storage
            .set(TOKEN_KEY, access_token)
            .context("Failed to persist access token")?;
        Ok(true)
    }

    fn persist(&self, creds: &Credentials) -> Result<()> {
        self.storage
            .set(TOKEN_KEY, &creds.access_token)
            .context("Failed to persist access token")?;
        self.storage
            .set(USERNAME_KEY, &creds.username)
            .context("Failed to persist username")?;
        self.storage
            .set(
                REFRESH_TOKEN_KEY,
                creds.refresh_token.as_deref().unwrap_or_default(),
            )
            .context("Failed to persist refresh token")?;
        Ok(())
    }

    fn remove_all(&self) -> Result<()> {
        for key in [TOKEN_KEY, USERNAME_KEY, REFRESH_TOKEN_KEY] {
            self.storage
                .remove(key)
                .with_context(|| format!("Failed to remove {}", key))?;
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::storage::{FileStore, MemoryStore};

    fn memory() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn test_starts_anonymous_on_empty_storage() {
        let store = SessionStore::load(memory());
        assert!(!store.is_authenticated());
        assert_eq!(store.get(), Session::anonymous());
    }

    #[test]
    fn test_set_persists_all_three_keys() {
        let storage = memory();
        let store = SessionStore::load(storage.clone());
        store
            .set(Session::authenticated("T", "alice", Some("R".to_string())))
            .unwrap();

        assert!(store.is_authenticated());
        assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("T"));
        assert_eq!(storage.get(USERNAME_KEY).unwrap().as_deref(), Some("alice"));
        assert_eq!(storage.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("R"));
    }

    #[test]
    fn test_clear_removes_all_keys() {
        let storage = memory();
        let store = SessionStore::load(storage.clone());
        store
            .set(Session::authenticated("T", "alice", Some("R".to_string())))
            .unwrap();
        store.clear().unwrap();

        assert!(!store.is_authenticated());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_setting_anonymous_clears_storage() {
        let storage = memory();
        let store = SessionStore::load(storage.clone());
        store.set(Session::authenticated("T", "alice", None)).unwrap();
        store.set(Session::anonymous()).unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn test_round_trip_through_storage() {
        let storage = memory();
        let original = Session::authenticated("T", "alice", Some("R".to_string()));
        SessionStore::load(storage.clone()).set(original.clone()).unwrap();

        let restored = SessionStore::load(storage);
        assert_eq!(restored.get(), original);
    }

    #[test]
    fn test_round_trip_without_refresh_token() {
        let storage = memory();
        let original = Session::authenticated("T", "alice", None);
        SessionStore::load(storage.clone()).set(original.clone()).unwrap();

        let restored = SessionStore::load(storage);
        assert_eq!(restored.get(), original);
        assert_eq!(restored.refresh_token(), None);
    }

    #[test]
    fn test_round_trip_through_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let original = Session::authenticated("T", "alice", Some("R".to_string()));
        SessionStore::load(Arc::new(FileStore::new(dir.path())))
            .set(original.clone())
            .unwrap();

        let restored = SessionStore::load(Arc::new(FileStore::new(dir.path())));
        assert_eq!(restored.get(), original);
    }

    #[test]
    fn test_partial_triplet_is_not_restored() {
        let storage = memory();
        storage.set(TOKEN_KEY, "T").unwrap();
        storage.set(USERNAME_KEY, "alice").unwrap();

        let store = SessionStore::load(storage);
        assert!(!store.is_authenticated());
        assert_eq!(store.username(), None);
    }

    #[test]
    fn test_replace_access_token_keeps_other_fields() {
        let storage = memory();
        let store = SessionStore::load(storage.clone());
        store
            .set(Session::authenticated("OLD", "alice", Some("R".to_string())))
            .unwrap();

        assert!(store.replace_access_token("NEW").unwrap());
        assert_eq!(store.access_token().as_deref(), Some("NEW"));
        assert_eq!(store.username().as_deref(), Some("alice"));
        assert_eq!(store.refresh_token().as_deref(), Some("R"));
        assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("NEW"));
        assert_eq!(storage.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("R"));
    }

    #[test]
    fn test_replace_access_token_without_session() {
        let storage = memory();
        let store = SessionStore::load(storage.clone());
        assert!(!store.replace_access_token("NEW").unwrap());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_empty_refresh_token_normalised() {
        let session = Session::authenticated("T", "alice", Some(String::new()));
        assert_eq!(session.refresh_token(), None);
    }
}
