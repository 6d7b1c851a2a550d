use std::sync::Arc;

use reqwest::Response;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::ConnectionConfig;
use crate::error::Error;
use crate::pagination::Paginated;
use crate::session::{Session, SessionCache};
use crate::types::{
    Image, Project, ProjectsEnvelope, Region, RegionsEnvelope, TokenEnvelope, VersionsEnvelope,
    Vm, Volume,
};

/// Minimum identity API version accepted by [`OpenStackClient::test_connection`].
/// Version ids compare byte-wise.
const MIN_API_VERSION: &str = "v3.2";

/// Deducted from the reported token lifetime when computing the informational
/// validity window.
const TOKEN_SAFETY_MARGIN: time::Duration = time::Duration::seconds(60);

const X_AUTH_TOKEN: HeaderName = HeaderName::from_static("x-auth-token");

/// Client for an OpenStack-compatible cloud, owning one authentication
/// session.
///
/// Construction performs no network I/O. Listing operations authenticate
/// transparently on first use; there is no retry and no transparent
/// re-authentication after that. A token the backend no longer accepts
/// surfaces as [`Error::Transport`] on the failing call.
///
/// Mutating operations take `&mut self` and the client holds no internal
/// locks: one client per concurrent caller, or an external mutex.
pub struct OpenStackClient {
    config: ConnectionConfig,
    /// `http(s)://host:port/`, trailing slash included.
    auth_url: Url,
    http: reqwest::Client,
    session: Session,
    cache: Option<Arc<dyn SessionCache>>,
    cache_key: String,
}

impl OpenStackClient {
    /// Build a client from connection parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when host/port do not form a valid URL, or
    /// [`Error::Http`] if the TLS backend cannot be initialized.
    pub fn new(config: ConnectionConfig) -> Result<Self, Error> {
        let auth_url = config.base_url()?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;
        let cache_key = config.cache_key();
        Ok(Self {
            config,
            auth_url,
            http,
            session: Session::default(),
            cache: None,
            cache_key,
        })
    }

    /// Share sessions across clients with the same connection identity.
    #[must_use]
    pub fn with_session_cache(mut self, cache: Arc<dyn SessionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Current session state.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Connection parameters this client was built from.
    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Issue a password grant against the identity service and store the
    /// resulting token (and, for project-scoped connections, the service
    /// catalog).
    ///
    /// The session is assigned as a whole after every step has succeeded; a
    /// failure at any point leaves the previous session untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCredentials`] when the identity service
    /// rejects the grant, [`Error::Decode`] on an unexpected response shape,
    /// or [`Error::Http`] on connection-level failure.
    pub async fn authenticate(&mut self) -> Result<(), Error> {
        let response = self
            .http
            .post(format!("{}v3/auth/tokens", self.auth_url))
            .json(&self.auth_payload())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), %body, "authentication rejected");
            return Err(Error::InvalidCredentials);
        }

        let token_id = response
            .headers()
            .get("X-Subject-Token")
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
            .ok_or_else(|| Error::Decode {
                operation: "authenticate",
                detail: "missing X-Subject-Token header".into(),
            })?;

        let envelope: TokenEnvelope = decode_json(response, "authenticate").await?;
        let token = envelope.token;

        let valid_for = token.expires_at - token.issued_at - TOKEN_SAFETY_MARGIN;
        tracing::debug!(user = %token.user.id, ?valid_for, "token issued");

        // The catalog only travels with project-scoped tokens; an unscoped
        // session must not keep one.
        let catalog = if self.config.project_id.is_some() {
            token.catalog
        } else {
            None
        };

        self.session = Session {
            authenticated: true,
            token_id: Some(token_id),
            user_id: Some(token.user.id),
            catalog,
            valid_for: Some(valid_for),
        };

        if let Some(cache) = &self.cache {
            cache.store(&self.cache_key, &self.session);
        }
        Ok(())
    }

    /// Authenticate unless a session is already held.
    ///
    /// This is the only re-authentication trigger: nothing here notices a
    /// token the backend has since expired.
    ///
    /// # Errors
    ///
    /// Same as [`authenticate`](Self::authenticate).
    pub async fn ensure_authenticated(&mut self) -> Result<(), Error> {
        if self.session.authenticated {
            return Ok(());
        }
        if let Some(cache) = &self.cache {
            if let Some(session) = cache.load(&self.cache_key) {
                if session.authenticated {
                    self.session = session;
                    return Ok(());
                }
            }
        }
        self.authenticate().await
    }

    /// List regions known to the identity service.
    ///
    /// # Errors
    ///
    /// Authentication errors, [`Error::Transport`] on a non-2xx response,
    /// [`Error::Decode`] on an unexpected body.
    pub async fn list_regions(&mut self) -> Result<Vec<Region>, Error> {
        self.ensure_authenticated().await?;
        let response = self.get(&format!("{}v3/regions/", self.auth_url)).await?;
        let response = ensure_success(response, "list regions").await?;
        let envelope: RegionsEnvelope = decode_json(response, "list regions").await?;
        Ok(envelope.regions)
    }

    /// List projects visible to the authenticated user.
    ///
    /// # Errors
    ///
    /// Same as [`list_regions`](Self::list_regions).
    pub async fn list_projects(&mut self) -> Result<Vec<Project>, Error> {
        self.ensure_authenticated().await?;
        let Some(user_id) = self.session.user_id() else {
            return Err(Error::Config("session carries no user id".into()));
        };
        let url = format!("{}v3/users/{}/projects", self.auth_url, user_id);
        let response = self.get(&url).await?;
        let response = ensure_success(response, "list projects").await?;
        let envelope: ProjectsEnvelope = decode_json(response, "list projects").await?;
        Ok(envelope.projects)
    }

    /// List compute instances of the scoped project.
    ///
    /// # Errors
    ///
    /// [`Error::ScopeRequired`] (before any network call) when the connection
    /// has no project id, [`Error::MissingEndpoint`] when the catalog has no
    /// matching compute endpoint, plus authentication errors. Page fetch
    /// failures surface from the returned cursor.
    pub async fn list_vms(&mut self) -> Result<Paginated<'_, Vm>, Error> {
        self.require_project("list servers")?;
        self.ensure_authenticated().await?;
        let endpoint = self.endpoint_for("compute")?;
        Ok(Paginated::new(
            self,
            "list servers",
            "servers",
            format!("{endpoint}/servers"),
        ))
    }

    /// List active images of the scoped project.
    ///
    /// # Errors
    ///
    /// Same as [`list_vms`](Self::list_vms), against the `image` endpoint.
    pub async fn list_images(&mut self) -> Result<Paginated<'_, Image>, Error> {
        self.require_project("list images")?;
        self.ensure_authenticated().await?;
        let endpoint = self.endpoint_for("image")?;
        Ok(Paginated::new(
            self,
            "list images",
            "images",
            format!("{endpoint}/v2/images?status=active"),
        ))
    }

    /// List block-storage volumes of the scoped project.
    ///
    /// # Errors
    ///
    /// Same as [`list_vms`](Self::list_vms), against the `volumev2` endpoint.
    pub async fn list_volumes(&mut self) -> Result<Paginated<'_, Volume>, Error> {
        self.require_project("list volumes")?;
        self.ensure_authenticated().await?;
        let endpoint = self.endpoint_for("volumev2")?;
        Ok(Paginated::new(
            self,
            "list volumes",
            "volumes",
            format!("{endpoint}/volumes"),
        ))
    }

    /// Probe the endpoint: check that it advertises an acceptable identity
    /// API version, then attempt one authentication.
    ///
    /// Returns `false` either when no advertised version id reaches
    /// `v3.2` (no authentication is attempted) or when authentication fails.
    /// This is the one place an authentication failure is absorbed instead of
    /// propagated.
    ///
    /// # Errors
    ///
    /// Transport-level failures of the probe itself still propagate.
    pub async fn test_connection(&mut self) -> Result<bool, Error> {
        let response = self.get(self.auth_url.as_str()).await?;
        let response = ensure_success(response, "version probe").await?;
        let envelope: VersionsEnvelope = decode_json(response, "version probe").await?;

        let supported = envelope
            .versions
            .values
            .iter()
            .any(|version| version.id.as_str() >= MIN_API_VERSION);
        if !supported {
            return Ok(false);
        }

        match self.authenticate().await {
            Ok(()) => Ok(true),
            Err(error) => {
                tracing::debug!(%error, "test connection: authentication failed");
                Ok(false)
            }
        }
    }

    pub(crate) async fn get(&self, url: &str) -> Result<Response, Error> {
        Ok(self
            .http
            .get(url)
            .headers(self.request_headers())
            .send()
            .await?)
    }

    fn request_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = self
            .session
            .token_id()
            .and_then(|token| HeaderValue::from_str(token).ok())
        {
            headers.insert(X_AUTH_TOKEN, token);
        }
        headers
    }

    fn auth_payload(&self) -> serde_json::Value {
        let scope = match self.config.project_id.as_deref() {
            Some(project_id) => serde_json::json!({ "project": { "id": project_id } }),
            None => serde_json::Value::from("unscoped"),
        };
        serde_json::json!({
            "auth": {
                "identity": {
                    "methods": ["password"],
                    "password": {
                        "user": {
                            "name": self.config.username,
                            "domain": {
                                "name": self.config.domain.as_deref().unwrap_or("Default")
                            },
                            "password": self.config.password,
                        }
                    }
                },
                "scope": scope,
            }
        })
    }

    /// Local precondition for project-scoped operations, checked before any
    /// network cost.
    fn require_project(&self, operation: &'static str) -> Result<(), Error> {
        if self.config.project_id.is_none() {
            return Err(Error::ScopeRequired { operation });
        }
        Ok(())
    }

    fn endpoint_for(&self, service: &'static str) -> Result<String, Error> {
        self.session
            .catalog()
            .and_then(|catalog| {
                catalog.endpoint_for(
                    service,
                    self.config.interface,
                    self.config.region.as_deref(),
                )
            })
            .map(str::to_owned)
            .ok_or(Error::MissingEndpoint { service })
    }
}

/// Shared response validation: any non-2xx status aborts the operation with
/// the raw body attached, before any decoding is attempted.
pub(crate) async fn ensure_success(
    response: Response,
    operation: &'static str,
) -> Result<Response, Error> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    tracing::error!(operation, status, %body, "request rejected");
    Err(Error::Transport {
        operation,
        status,
        body,
    })
}

pub(crate) async fn decode_json<T: DeserializeOwned>(
    response: Response,
    operation: &'static str,
) -> Result<T, Error> {
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| Error::Decode {
        operation,
        detail: e.to_string(),
    })
}
