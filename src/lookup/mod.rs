//! Phone lookup flow
//!
//! Ties together:
//! - Record store (30 day cache of resolved lookups)
//! - Subscriber search (phone -> raw subscribers)
//! - Address wash (raw address -> canonical address)
//!
//! A lookup either resolves every subscriber to a canonical address or fails
//! as a whole; nothing is cached for a failed lookup.

use std::sync::Arc;

use chrono::Utc;

use crate::storage::RecordStore;
use crate::types::{LookupRecord, NormalizedAddress, PhoneNumber, RawSubscriber};
use crate::upstream::{AddressNormalizer, SubscriberLookup};
use crate::{Error, Result};

/// Resolves phone numbers to address records, caching the results
pub struct LookupService {
    store: Arc<dyn RecordStore>,
    subscribers: Arc<dyn SubscriberLookup>,
    addresses: Arc<dyn AddressNormalizer>,
    max_age: chrono::Duration,
}

impl LookupService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        subscribers: Arc<dyn SubscriberLookup>,
        addresses: Arc<dyn AddressNormalizer>,
        max_age: chrono::Duration,
    ) -> Self {
        Self {
            store,
            subscribers,
            addresses,
            max_age,
        }
    }

    /// Look up `phone`, answering from cache when a fresh entry exists.
    pub async fn lookup(&self, phone: &str) -> Result<Vec<LookupRecord>> {
        let phone = PhoneNumber::parse(phone)?;

        if let Some(cached) = self.store.find_fresh_lookup(&phone, self.max_age).await? {
            tracing::info!(%phone, record_id = %cached.record_id, "lookup cache hit");
            return Ok(vec![cached]);
        }

        tracing::info!(%phone, "lookup cache miss");

        let subscribers = self.subscribers.lookup_subscriber(&phone).await?;

        // Resolve everything before writing anything
        let mut merged = Vec::with_capacity(subscribers.len());
        for subscriber in subscribers {
            let address = self
                .addresses
                .normalize_address(
                    subscriber.street_name.as_deref(),
                    subscriber.house_number.as_deref(),
                    subscriber.floor.as_deref(),
                    subscriber.zip_code.as_deref(),
                )
                .await?;
            merged.push(merge_record(&phone, subscriber, address));
        }

        if merged.is_empty() {
            return Err(Error::not_found(format!("no records for {}", phone)));
        }

        self.store.store_lookups(&merged).await?;

        tracing::info!(%phone, records = merged.len(), "lookup resolved and cached");
        Ok(merged)
    }
}

/// Normalized address fields win; raw subscriber fields only fill gaps.
fn merge_record(
    phone: &PhoneNumber,
    subscriber: RawSubscriber,
    address: NormalizedAddress,
) -> LookupRecord {
    LookupRecord {
        record_id: subscriber.record_id,
        address_id: Some(address.address_id),
        phone: phone.to_string(),
        street_name: address.street_name.or(subscriber.street_name),
        house_number: address.house_number.or(subscriber.house_number),
        floor: address.floor.or(subscriber.floor),
        door: address.door.or(subscriber.door),
        zip_code: address.zip_code.or(subscriber.zip_code),
        update_date: subscriber.update_date,
        timestamp: Utc::now(),
    }
}
