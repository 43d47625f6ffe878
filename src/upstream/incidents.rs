//! Power outage feed client

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::config::IncidentsSection;
use crate::types::IncidentType;
use crate::{Error, Result};

use super::{transport_error, IncidentFeed};

const SERVICE: &str = "incident feed";

/// HTTP client for the outage list
pub struct HttpIncidentFeed {
    http: Client,
    url: String,
}

impl HttpIncidentFeed {
    pub fn new(http: Client, config: &IncidentsSection) -> Self {
        Self {
            http,
            url: config.url.clone(),
        }
    }
}

#[async_trait]
impl IncidentFeed for HttpIncidentFeed {
    async fn fetch_incidents(&self) -> Result<Vec<Value>> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "incident feed rejected request");
            return Err(Error::upstream(SERVICE, Some(status.as_u16())));
        }

        response
            .json()
            .await
            .map_err(|e| transport_error(SERVICE, e))
    }
}

/// Keep incidents whose `incidentType` matches `kind`.
pub fn filter_incidents(incidents: Vec<Value>, kind: IncidentType) -> Vec<Value> {
    incidents
        .into_iter()
        .filter(|incident| {
            incident.get("incidentType").and_then(Value::as_str) == Some(kind.as_str())
        })
        .collect()
}
