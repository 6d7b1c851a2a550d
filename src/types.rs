use serde::Deserialize;
use time::OffsetDateTime;

use crate::config::Interface;

/// Project (tenant) visible to the authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
}

/// Region known to the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Region {
    pub id: String,
}

/// Compute instance, as listed by the compute service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Vm {
    pub id: String,
    pub name: String,
}

/// Active image, as listed by the image service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Image {
    pub name: String,
    pub size: u64,
    pub visibility: String,
    #[serde(rename = "disk_format")]
    pub format: String,
}

/// Block-storage volume.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Volume {
    pub id: String,
    pub name: String,
}

/// One published endpoint variant of a catalog service.
///
/// `interface` and `region` stay wire strings: the backend also publishes
/// interfaces outside the client's selector set (e.g. `admin`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Endpoint {
    pub interface: String,
    #[serde(default)]
    pub region: Option<String>,
    pub url: String,
}

/// Catalog entry: one service type and its published endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceEndpoints {
    #[serde(rename = "type")]
    pub service_type: String,
    pub endpoints: Vec<Endpoint>,
}

/// Service catalog returned by a project-scoped authentication.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ServiceCatalog(pub Vec<ServiceEndpoints>);

impl ServiceCatalog {
    /// First endpoint URL in catalog order matching service type and
    /// interface, and region when one is given (wildcard otherwise).
    #[must_use]
    pub fn endpoint_for(
        &self,
        service_type: &str,
        interface: Interface,
        region: Option<&str>,
    ) -> Option<&str> {
        self.0
            .iter()
            .filter(|service| service.service_type == service_type)
            .flat_map(|service| &service.endpoints)
            .find(|endpoint| {
                endpoint.interface == interface.as_str()
                    && region.is_none_or(|r| endpoint.region.as_deref() == Some(r))
            })
            .map(|endpoint| endpoint.url.as_str())
    }
}

/// Body of a successful `v3/auth/tokens` response.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenEnvelope {
    pub token: Token,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Token {
    pub user: TokenUser,
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    /// Present only when the authentication was project-scoped.
    #[serde(default)]
    pub catalog: Option<ServiceCatalog>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenUser {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegionsEnvelope {
    pub regions: Vec<Region>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectsEnvelope {
    pub projects: Vec<Project>,
}

/// Version probe response, `GET /` on the identity endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct VersionsEnvelope {
    pub versions: Versions,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Versions {
    pub values: Vec<ApiVersion>,
}

/// One advertised identity API version.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiVersion {
    pub id: String,
}
