//! Core types for botwrap

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{Error, Result};

/// Phone number reduced to its last [`PhoneNumber::DIGITS`] digits.
///
/// Anything that is not an ASCII digit (country prefix `+`, spaces, dashes)
/// is dropped first, so `+45 12 34 56 78` and `4512345678` both become
/// `12345678`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub const DIGITS: usize = 8;

    pub fn parse(input: &str) -> Result<Self> {
        let digits: Vec<char> = input.chars().filter(|c| c.is_ascii_digit()).collect();

        if digits.len() < Self::DIGITS {
            return Err(Error::invalid_request(format!(
                "phone number '{}' must contain at least {} digits",
                input,
                Self::DIGITS
            )));
        }

        Ok(Self(digits[digits.len() - Self::DIGITS..].iter().collect()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PhoneNumber {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Customer record written by the bot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRecord {
    pub phone: i64,
    pub customer_id: i64,
    pub customer_type: String,
    pub customer_dar: String,
    pub timestamp: DateTime<Utc>,
}

/// Result of writing a customer record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Cached, address-enriched subscriber record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LookupRecord {
    pub record_id: String,
    pub address_id: Option<String>,
    /// Last 8 digits of the phone number
    pub phone: String,
    pub street_name: Option<String>,
    pub house_number: Option<String>,
    pub floor: Option<String>,
    pub door: Option<String>,
    pub zip_code: Option<String>,
    pub update_date: Option<NaiveDate>,
    /// When the record was cached
    pub timestamp: DateTime<Utc>,
}

/// Subscriber category reported by the subscriber search API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum SubscriberType {
    /// Private individual
    Private,
    /// Business, unlisted and any other category we do not serve
    Other(i64),
}

impl SubscriberType {
    pub const PRIVATE_CODE: i64 = 3;
}

impl From<i64> for SubscriberType {
    fn from(code: i64) -> Self {
        match code {
            Self::PRIVATE_CODE => SubscriberType::Private,
            other => SubscriberType::Other(other),
        }
    }
}

impl From<SubscriberType> for i64 {
    fn from(kind: SubscriberType) -> Self {
        match kind {
            SubscriberType::Private => SubscriberType::PRIVATE_CODE,
            SubscriberType::Other(code) => code,
        }
    }
}

/// Subscriber record as returned by the subscriber search API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawSubscriber {
    pub record_id: String,
    pub subscriber_type: SubscriberType,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub street_name: Option<String>,
    #[serde(default)]
    pub house_number: Option<String>,
    #[serde(default)]
    pub floor: Option<String>,
    #[serde(default)]
    pub door: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub update_date: Option<NaiveDate>,
}

/// Canonical address returned by the address service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedAddress {
    pub address_id: String,
    pub street_name: Option<String>,
    pub house_number: Option<String>,
    pub zip_code: Option<String>,
    pub floor: Option<String>,
    pub door: Option<String>,
}

/// Outage category used by the incident feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncidentType {
    /// Unannounced outage
    Uvarslet,
    /// Announced (planned) outage
    Varslet,
}

impl IncidentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentType::Uvarslet => "Uvarslet",
            IncidentType::Varslet => "Varslet",
        }
    }
}

impl FromStr for IncidentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Uvarslet" => Ok(IncidentType::Uvarslet),
            "Varslet" => Ok(IncidentType::Varslet),
            other => Err(Error::invalid_request(format!(
                "unknown incident type '{}', expected 'Uvarslet' or 'Varslet'",
                other
            ))),
        }
    }
}

/// Accepts `YYYY-MM-DD` as well as full timestamps, keeping only the date.
fn lenient_date<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => {
            let date_part = value.get(..10).unwrap_or(value);
            NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
                .map(Some)
                .map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_keeps_last_eight_digits() {
        let cases = [
            ("12345678", "12345678"),
            ("+45 12345678", "12345678"),
            ("004512345678", "12345678"),
            ("4512345678", "12345678"),
            ("+45 12-34 56 78", "12345678"),
            ("9999912345678", "12345678"),
        ];

        for (input, expected) in cases {
            let phone = PhoneNumber::parse(input).unwrap();
            assert_eq!(phone.as_str(), expected, "input: {}", input);
            assert_eq!(phone.as_str().len(), PhoneNumber::DIGITS);
        }
    }

    #[test]
    fn test_phone_rejects_short_input() {
        assert!(PhoneNumber::parse("1234567").is_err());
        assert!(PhoneNumber::parse("").is_err());
        assert!(PhoneNumber::parse("+45 abc").is_err());
    }

    #[test]
    fn test_subscriber_type_codes() {
        let private: SubscriberType = serde_json::from_str("3").unwrap();
        assert_eq!(private, SubscriberType::Private);

        let business: SubscriberType = serde_json::from_str("1").unwrap();
        assert_eq!(business, SubscriberType::Other(1));
        assert_eq!(serde_json::to_string(&business).unwrap(), "1");
    }

    #[test]
    fn test_raw_subscriber_accepts_timestamp_update_date() {
        let raw: RawSubscriber = serde_json::from_value(serde_json::json!({
            "recordId": "r-1",
            "subscriberType": 3,
            "streetName": "Vestergade",
            "updateDate": "2024-03-01T12:00:00Z"
        }))
        .unwrap();

        assert_eq!(raw.update_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(raw.house_number, None);
    }

    #[test]
    fn test_incident_type_parse() {
        assert_eq!("Varslet".parse::<IncidentType>().unwrap(), IncidentType::Varslet);
        assert_eq!(IncidentType::Uvarslet.as_str(), "Uvarslet");
        assert!("varslet".parse::<IncidentType>().is_err());
    }
}
