//! Clients for the third-party APIs the wrapper sits in front of
//!
//! Each upstream is reached through a trait so the lookup flow and the HTTP
//! handlers can be exercised without network access.

use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::types::{NormalizedAddress, PhoneNumber, RawSubscriber};
use crate::{Error, Result};

pub mod address;
pub mod incidents;
pub mod subscriber;

pub use address::HttpAddressNormalizer;
pub use incidents::HttpIncidentFeed;
pub use subscriber::HttpSubscriberLookup;

/// Resolves a phone number to subscriber records
#[async_trait]
pub trait SubscriberLookup: Send + Sync {
    /// Private-individual subscribers registered on `phone`.
    ///
    /// Fails with `NotFound` when none remain after filtering.
    async fn lookup_subscriber(&self, phone: &PhoneNumber) -> Result<Vec<RawSubscriber>>;
}

/// Canonicalizes a street address
#[async_trait]
pub trait AddressNormalizer: Send + Sync {
    async fn normalize_address(
        &self,
        street_name: Option<&str>,
        house_number: Option<&str>,
        floor: Option<&str>,
        zip_code: Option<&str>,
    ) -> Result<NormalizedAddress>;
}

/// Source of the outage list
#[async_trait]
pub trait IncidentFeed: Send + Sync {
    async fn fetch_incidents(&self) -> Result<Vec<serde_json::Value>>;
}

/// Shared HTTP client for all upstreams.
pub fn build_http_client() -> Result<Client> {
    Client::builder()
        .user_agent(concat!("botwrap/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::internal(format!("failed to create HTTP client: {}", e)))
}

pub(crate) fn url_with_query(base: &str, key: &str, value: &str) -> Result<Url> {
    Url::parse_with_params(base, &[(key, value)])
        .map_err(|e| Error::internal(format!("invalid upstream url '{}': {}", base, e)))
}

pub(crate) fn transport_error(service: &'static str, err: reqwest::Error) -> Error {
    tracing::warn!(service, error = %err, "upstream request failed");
    Error::upstream(service, err.status().map(|s| s.as_u16()))
}
