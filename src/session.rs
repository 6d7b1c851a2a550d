use std::collections::HashMap;
use std::sync::Mutex;

use crate::types::ServiceCatalog;

/// Authentication state owned by one [`OpenStackClient`](crate::OpenStackClient).
///
/// Starts empty; a successful authentication assigns the whole struct at
/// once, so a failed attempt can never leave partial state behind. There is
/// no local expiry clock; a stale token surfaces as a transport error on a
/// later request.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub(crate) authenticated: bool,
    pub(crate) token_id: Option<String>,
    pub(crate) user_id: Option<String>,
    pub(crate) catalog: Option<ServiceCatalog>,
    /// Token validity window reported by the identity service, less a 60 s
    /// safety margin. Informational only.
    pub(crate) valid_for: Option<time::Duration>,
}

impl Session {
    /// Whether a token has been obtained and not yet seen to fail.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Bearer token for subsequent requests.
    #[must_use]
    pub fn token_id(&self) -> Option<&str> {
        self.token_id.as_deref()
    }

    /// Id of the authenticated user.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Service catalog; set only after a project-scoped authentication.
    #[must_use]
    pub fn catalog(&self) -> Option<&ServiceCatalog> {
        self.catalog.as_ref()
    }

    /// Reported validity window, less the safety margin.
    #[must_use]
    pub fn valid_for(&self) -> Option<time::Duration> {
        self.valid_for
    }
}

/// Cross-invocation session storage, keyed by connection identity
/// ([`ConnectionConfig::cache_key`](crate::ConnectionConfig::cache_key)).
///
/// Lets several short-lived clients with the same endpoint + credentials
/// share one authenticated session instead of re-issuing tokens. The client
/// consults the cache in `ensure_authenticated` and writes back after every
/// successful authentication.
pub trait SessionCache: Send + Sync {
    /// Look up a previously stored session.
    fn load(&self, key: &str) -> Option<Session>;

    /// Store a freshly authenticated session.
    fn store(&self, key: &str, session: &Session);
}

/// In-process [`SessionCache`].
#[derive(Default)]
pub struct MemorySessionCache {
    inner: Mutex<HashMap<String, Session>>,
}

impl MemorySessionCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionCache for MemorySessionCache {
    fn load(&self, key: &str) -> Option<Session> {
        self.inner.lock().expect("session cache poisoned").get(key).cloned()
    }

    fn store(&self, key: &str, session: &Session) {
        self.inner
            .lock()
            .expect("session cache poisoned")
            .insert(key.to_owned(), session.clone());
    }
}
