//! SQLite implementation of RecordStore.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sea_query::{Expr, OnConflict, Order, Query, SqliteQueryBuilder};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::types::{CustomerRecord, LookupRecord, PhoneNumber, UpsertOutcome};
use crate::{Error, Result};

use super::{
    decode_timestamp, encode_timestamp, Customers, Lookups, RecordStore, CREATE_CUSTOMERS_TABLE,
    CREATE_LOOKUPS_TABLE,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite-backed record store.
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open (creating if missing) the database file at `path`.
    pub async fn connect(path: &str, max_connections: u32) -> Result<Self> {
        let opts = SqliteConnectOptions::new()
            .filename(path)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30))
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(opts)
            .await?;

        Ok(Self::new(pool))
    }

    /// Private in-memory database, mostly useful for tests.
    pub async fn in_memory() -> Result<Self> {
        let opts = SqliteConnectOptions::new()
            .filename(":memory:")
            .create_if_missing(true);

        // Every connection to ":memory:" is its own database, so keep exactly one alive
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(CREATE_CUSTOMERS_TABLE)
            .execute(&self.pool)
            .await?;
        sqlx::raw_sql(CREATE_LOOKUPS_TABLE)
            .execute(&self.pool)
            .await?;

        tracing::debug!("record store schema ready");
        Ok(())
    }

    async fn upsert_customer(&self, record: &CustomerRecord) -> Result<UpsertOutcome> {
        let mut tx = self.pool.begin().await?;

        let existing = Query::select()
            .column(Customers::Phone)
            .from(Customers::Table)
            .and_where(Expr::col(Customers::Phone).eq(record.phone))
            .to_string(SqliteQueryBuilder);
        let exists = sqlx::query(&existing)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();

        let upsert = Query::insert()
            .into_table(Customers::Table)
            .columns([
                Customers::Phone,
                Customers::CustomerId,
                Customers::CustomerType,
                Customers::CustomerDar,
                Customers::Timestamp,
            ])
            .values_panic([
                record.phone.into(),
                record.customer_id.into(),
                record.customer_type.clone().into(),
                record.customer_dar.clone().into(),
                encode_timestamp(&record.timestamp).into(),
            ])
            .on_conflict(
                OnConflict::column(Customers::Phone)
                    .update_columns([
                        Customers::CustomerId,
                        Customers::CustomerType,
                        Customers::CustomerDar,
                        Customers::Timestamp,
                    ])
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);
        sqlx::query(&upsert).execute(&mut *tx).await?;

        tx.commit().await?;

        Ok(if exists {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        })
    }

    async fn get_customer(&self, phone: i64) -> Result<Option<CustomerRecord>> {
        let query = Query::select()
            .columns([
                Customers::Phone,
                Customers::CustomerId,
                Customers::CustomerType,
                Customers::CustomerDar,
                Customers::Timestamp,
            ])
            .from(Customers::Table)
            .and_where(Expr::col(Customers::Phone).eq(phone))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;

        match row {
            Some(row) => {
                let timestamp: String = row.try_get("timestamp")?;
                Ok(Some(CustomerRecord {
                    phone: row.try_get("phone")?,
                    customer_id: row.try_get("customer_id")?,
                    customer_type: row.try_get("customer_type")?,
                    customer_dar: row.try_get("customer_dar")?,
                    timestamp: decode_timestamp(&timestamp)?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn find_fresh_lookup(
        &self,
        phone: &PhoneNumber,
        max_age: chrono::Duration,
    ) -> Result<Option<LookupRecord>> {
        let cutoff = Utc::now().checked_sub_signed(max_age).ok_or_else(|| {
            Error::internal(format!("lookup max age {} is out of range", max_age))
        })?;
        let cutoff = encode_timestamp(&cutoff);

        let query = Query::select()
            .columns([
                Lookups::RecordId,
                Lookups::AddressId,
                Lookups::Phone,
                Lookups::StreetName,
                Lookups::HouseNumber,
                Lookups::Floor,
                Lookups::Door,
                Lookups::ZipCode,
                Lookups::UpdateDate,
                Lookups::Timestamp,
            ])
            .from(Lookups::Table)
            .and_where(Expr::col(Lookups::Phone).eq(phone.as_str()))
            .and_where(Expr::col(Lookups::Timestamp).gt(cutoff))
            .order_by(Lookups::Timestamp, Order::Desc)
            .limit(1)
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;

        row.map(|row| lookup_from_row(&row)).transpose()
    }

    async fn store_lookup(&self, record: &LookupRecord) -> Result<()> {
        sqlx::query(&lookup_upsert_query(record))
            .execute(&self.pool)
            .await?;

        tracing::debug!(record_id = %record.record_id, phone = %record.phone, "lookup cached");
        Ok(())
    }

    async fn store_lookups(&self, records: &[LookupRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for record in records {
            sqlx::query(&lookup_upsert_query(record))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::debug!(records = records.len(), "lookups cached");
        Ok(())
    }
}

/// Insert-or-replace by record id.
fn lookup_upsert_query(record: &LookupRecord) -> String {
    Query::insert()
        .into_table(Lookups::Table)
        .columns([
            Lookups::RecordId,
            Lookups::AddressId,
            Lookups::Phone,
            Lookups::StreetName,
            Lookups::HouseNumber,
            Lookups::Floor,
            Lookups::Door,
            Lookups::ZipCode,
            Lookups::UpdateDate,
            Lookups::Timestamp,
        ])
        .values_panic([
            record.record_id.clone().into(),
            record.address_id.clone().into(),
            record.phone.clone().into(),
            record.street_name.clone().into(),
            record.house_number.clone().into(),
            record.floor.clone().into(),
            record.door.clone().into(),
            record.zip_code.clone().into(),
            record
                .update_date
                .map(|d| d.format(DATE_FORMAT).to_string())
                .into(),
            encode_timestamp(&record.timestamp).into(),
        ])
        .on_conflict(
            OnConflict::column(Lookups::RecordId)
                .update_columns([
                    Lookups::AddressId,
                    Lookups::Phone,
                    Lookups::StreetName,
                    Lookups::HouseNumber,
                    Lookups::Floor,
                    Lookups::Door,
                    Lookups::ZipCode,
                    Lookups::UpdateDate,
                    Lookups::Timestamp,
                ])
                .to_owned(),
        )
        .to_string(SqliteQueryBuilder)
}

fn lookup_from_row(row: &SqliteRow) -> Result<LookupRecord> {
    let update_date: Option<String> = row.try_get("update_date")?;
    let update_date = update_date
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, DATE_FORMAT)
                .map_err(|e| Error::internal(format!("invalid stored date '{}': {}", raw, e)))
        })
        .transpose()?;
    let timestamp: String = row.try_get("timestamp")?;

    Ok(LookupRecord {
        record_id: row.try_get("record_id")?,
        address_id: row.try_get("address_id")?,
        phone: row.try_get("phone")?,
        street_name: row.try_get("street_name")?,
        house_number: row.try_get("house_number")?,
        floor: row.try_get("floor")?,
        door: row.try_get("door")?,
        zip_code: row.try_get("zip_code")?,
        update_date,
        timestamp: decode_timestamp(&timestamp)?,
    })
}
