//! Error types for botwrap

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Incorrect username or password")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// An upstream API answered with a non-success status, or could not be
    /// reached at all (`status` is `None`).
    #[error("Upstream {service} unavailable (status {})", display_status(.status))]
    UpstreamUnavailable {
        service: &'static str,
        status: Option<u16>,
    },

    /// The address service did not return an exact building-level match.
    #[error("Address could not be resolved (category {category})")]
    AddressNotResolved { status: u16, category: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),


    #[error("Internal error: {0}")]
    Internal(String),
}

fn display_status(status: &Option<u16>) -> String {
    status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "none".to_string())
}

impl Error {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Error::InvalidRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    pub fn upstream(service: &'static str, status: Option<u16>) -> Self {
        Error::UpstreamUnavailable { service, status }
    }
}
