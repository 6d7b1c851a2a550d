use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

use crate::error::Error;

/// Which of a service's published endpoint variants to resolve from the
/// catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interface {
    #[default]
    Public,
    Private,
    Internal,
}

impl Interface {
    /// Wire label, as it appears in catalog endpoint records.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Internal => "internal",
        }
    }
}

/// Connection parameters for one provider endpoint + credential pair.
///
/// Required fields are constructor parameters — no runtime "missing field"
/// errors.
///
/// ```rust,ignore
/// use openstack_session::ConnectionConfig;
///
/// let config = ConnectionConfig::new("keystone.example.com", 5000, "admin", "secret")
///     .with_tls(true)
///     .with_project("f1d9a3d2c4b04a0f")
///     .with_region("RegionOne");
/// ```
#[derive(Clone)]
pub struct ConnectionConfig {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) username: String,
    pub(crate) password: String,
    pub(crate) domain: Option<String>,
    pub(crate) project_id: Option<String>,
    pub(crate) region: Option<String>,
    pub(crate) interface: Interface,
    pub(crate) use_tls: bool,
    pub(crate) accept_invalid_certs: bool,
    pub(crate) timeout: Duration,
}

impl ConnectionConfig {
    /// Create a configuration for a plain-HTTP endpoint with default options.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            domain: None,
            project_id: None,
            region: None,
            interface: Interface::Public,
            use_tls: false,
            accept_invalid_certs: false,
            timeout: Duration::from_secs(10),
        }
    }

    /// Set the identity domain. Defaults to `"Default"` when unset.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Scope the session to a project. Required for the compute/image/volume
    /// listings, which resolve their endpoints from the scoped catalog.
    #[must_use]
    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Restrict endpoint resolution to one region. Unset means any region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Select the endpoint interface to resolve (default: public).
    #[must_use]
    pub fn with_interface(mut self, interface: Interface) -> Self {
        self.interface = interface;
        self
    }

    /// Use `https` for the identity endpoint (default: `http`).
    #[must_use]
    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    /// Skip TLS certificate validation. Off by default; only for lab clouds
    /// with self-signed certificates.
    #[must_use]
    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Per-request timeout (default: 10 seconds).
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Identity endpoint host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Identity endpoint port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Configured project id, if the connection is project-scoped.
    #[must_use]
    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    /// Configured region filter.
    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Endpoint interface preference.
    #[must_use]
    pub fn interface(&self) -> Interface {
        self.interface
    }

    /// Base identity URL, `http(s)://host:port/`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if host/port do not form a valid URL.
    pub fn base_url(&self) -> Result<Url, Error> {
        let scheme = if self.use_tls { "https" } else { "http" };
        let raw = format!("{}://{}:{}/", scheme, self.host, self.port);
        Url::parse(&raw).map_err(|e| Error::Config(format!("bad endpoint {raw:?}: {e}")))
    }

    /// Stable identity of this endpoint + credential pair, for keying an
    /// external [`SessionCache`](crate::SessionCache).
    #[must_use]
    pub fn cache_key(&self) -> String {
        let mut hasher = Sha256::new();
        for part in [
            self.host.as_str(),
            self.username.as_str(),
            self.password.as_str(),
            self.domain.as_deref().unwrap_or_default(),
            self.project_id.as_deref().unwrap_or_default(),
        ] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        hasher.update(self.port.to_be_bytes());
        hex::encode(hasher.finalize())
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("domain", &self.domain)
            .field("project_id", &self.project_id)
            .field("region", &self.region)
            .field("interface", &self.interface)
            .field("use_tls", &self.use_tls)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("timeout", &self.timeout)
            .finish()
    }
}
