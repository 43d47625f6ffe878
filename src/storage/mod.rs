//! Record storage layer
//!
//! Holds the customer table written by the bot and the lookup cache filled
//! by the phone lookup flow.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sea_query::Iden;

use crate::types::{CustomerRecord, LookupRecord, PhoneNumber, UpsertOutcome};
use crate::{Error, Result};

pub mod sqlite;

pub use sqlite::SqliteRecordStore;

/// Record store trait
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create tables if they do not exist yet
    async fn migrate(&self) -> Result<()>;

    /// Insert or update a customer keyed by phone
    async fn upsert_customer(&self, record: &CustomerRecord) -> Result<UpsertOutcome>;

    /// Fetch a customer by phone
    async fn get_customer(&self, phone: i64) -> Result<Option<CustomerRecord>>;

    /// Newest cached lookup for `phone` written less than `max_age` ago
    async fn find_fresh_lookup(
        &self,
        phone: &PhoneNumber,
        max_age: chrono::Duration,
    ) -> Result<Option<LookupRecord>>;

    /// Insert or replace a cached lookup by record id
    async fn store_lookup(&self, record: &LookupRecord) -> Result<()>;

    /// Insert or replace several cached lookups; either all are written or none
    async fn store_lookups(&self, records: &[LookupRecord]) -> Result<()>;
}

/// Customers table schema.
#[derive(Iden)]
pub enum Customers {
    Table,
    #[iden = "phone"]
    Phone,
    #[iden = "customer_id"]
    CustomerId,
    #[iden = "customer_type"]
    CustomerType,
    #[iden = "customer_dar"]
    CustomerDar,
    #[iden = "timestamp"]
    Timestamp,
}

/// Lookup cache table schema.
#[derive(Iden)]
pub enum Lookups {
    Table,
    #[iden = "record_id"]
    RecordId,
    #[iden = "address_id"]
    AddressId,
    #[iden = "phone"]
    Phone,
    #[iden = "street_name"]
    StreetName,
    #[iden = "house_number"]
    HouseNumber,
    #[iden = "floor"]
    Floor,
    #[iden = "door"]
    Door,
    #[iden = "zip_code"]
    ZipCode,
    #[iden = "update_date"]
    UpdateDate,
    #[iden = "timestamp"]
    Timestamp,
}

pub const CREATE_CUSTOMERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS customers (
    phone INTEGER PRIMARY KEY,
    customer_id INTEGER NOT NULL,
    customer_type TEXT NOT NULL,
    customer_dar TEXT NOT NULL,
    timestamp TEXT NOT NULL
);
"#;

pub const CREATE_LOOKUPS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS lookups (
    record_id TEXT PRIMARY KEY,
    address_id TEXT,
    phone TEXT NOT NULL,
    street_name TEXT,
    house_number TEXT,
    floor TEXT,
    door TEXT,
    zip_code TEXT,
    update_date TEXT,
    timestamp TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_lookups_phone_timestamp ON lookups(phone, timestamp);
"#;

/// Timestamps are stored as fixed-width UTC strings so that text ordering
/// matches chronological ordering.
pub(crate) fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::internal(format!("invalid stored timestamp '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_encoded_timestamps_sort_chronologically() {
        let earlier = Utc.with_ymd_and_hms(2024, 1, 9, 23, 59, 59).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();

        let a = encode_timestamp(&earlier);
        let b = encode_timestamp(&later);

        assert!(a < b);
        assert_eq!(a.len(), b.len());
        assert_eq!(decode_timestamp(&b).unwrap(), later);
    }
}
