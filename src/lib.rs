#![doc = include_str!("../README.md")]

pub mod client;
pub mod config;
pub mod error;
pub mod pagination;
pub mod session;
pub mod types;

// Re-exports for convenient access
pub use client::OpenStackClient;
pub use config::{ConnectionConfig, Interface};
pub use error::Error;
pub use pagination::Paginated;
pub use session::{MemorySessionCache, Session, SessionCache};
pub use types::{
    ApiVersion, Endpoint, Image, Project, Region, ServiceCatalog, ServiceEndpoints, Vm, Volume,
};
