/// Errors surfaced by [`OpenStackClient`](crate::OpenStackClient) operations.
///
/// Every variant is fatal to the operation that raised it; the client never
/// retries and never clears session state on failure.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The identity service rejected the password grant.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A non-2xx response from any endpoint, with the raw body for diagnostics.
    #[error("{operation} failed with HTTP {status}: {body}")]
    Transport {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// A project-scoped operation was invoked on a client configured without
    /// a project id. Raised before any network call.
    #[error("{operation} requires a project-scoped connection")]
    ScopeRequired { operation: &'static str },

    /// No catalog endpoint matched the configured interface and region.
    #[error("no {service} endpoint matches the configured interface/region")]
    MissingEndpoint { service: &'static str },

    /// The response decoded, but not into the expected shape.
    #[error("unexpected {operation} response: {detail}")]
    Decode {
        operation: &'static str,
        detail: String,
    },

    /// Connection parameters that cannot form a valid endpoint URL.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Connection-level failure (refused, timed out, TLS handshake).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
