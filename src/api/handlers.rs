//! API handlers

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::AppState;
use crate::types::{CustomerRecord, IncidentType, LookupRecord, UpsertOutcome};
use crate::upstream::incidents::filter_incidents;
use crate::{Error, Result};

/// Liveness probe
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Create or update a customer
pub async fn upsert_customer(
    State(state): State<AppState>,
    Json(payload): Json<CustomerRequest>,
) -> Result<Json<UpsertCustomerResponse>> {
    let record = CustomerRecord {
        phone: payload.phone,
        customer_id: payload.customer_id,
        customer_type: payload.customer_type,
        customer_dar: payload.customer_dar,
        timestamp: Utc::now(),
    };

    let outcome = state.store.upsert_customer(&record).await?;
    tracing::info!(phone = record.phone, ?outcome, "customer stored");

    let message = match outcome {
        UpsertOutcome::Inserted => "Phone created OK",
        UpsertOutcome::Updated => "Phone updated OK",
    };

    Ok(Json(UpsertCustomerResponse {
        message: message.to_string(),
        outcome,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRequest {
    pub phone: i64,
    pub customer_id: i64,
    pub customer_type: String,
    pub customer_dar: String,
}

#[derive(Debug, Serialize)]
pub struct UpsertCustomerResponse {
    pub message: String,
    pub outcome: UpsertOutcome,
}

/// Fetch a customer by phone
pub async fn get_customer(
    State(state): State<AppState>,
    Path(phone): Path<i64>,
) -> Result<Json<CustomerRecord>> {
    state
        .store
        .get_customer(phone)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found(format!("no customer with phone {}", phone)))
}

/// Resolve a phone number to address records
pub async fn lookup(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Result<Json<Vec<LookupRecord>>> {
    let records = state.lookup.lookup(&phone).await?;
    Ok(Json(records))
}

/// Outages of one type from the incident feed
pub async fn incidents(
    State(state): State<AppState>,
    Path(incident_type): Path<String>,
) -> Result<Json<Vec<Value>>> {
    let kind: IncidentType = incident_type.parse()?;
    let all = state.incidents.fetch_incidents().await?;
    Ok(Json(filter_incidents(all, kind)))
}
