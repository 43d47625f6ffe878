//! Subscriber search client

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, COOKIE};
use reqwest::Client;
use serde::Deserialize;

use crate::config::SubscriberSection;
use crate::types::{PhoneNumber, RawSubscriber, SubscriberType};
use crate::{Error, Result};

use super::{transport_error, url_with_query, SubscriberLookup};

const SERVICE: &str = "subscriber search";

/// The search endpoint answers either with a bare list or wrapped in `records`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SearchResponse {
    List(Vec<RawSubscriber>),
    Wrapped { records: Vec<RawSubscriber> },
}

impl SearchResponse {
    fn into_records(self) -> Vec<RawSubscriber> {
        match self {
            SearchResponse::List(records) | SearchResponse::Wrapped { records } => records,
        }
    }
}

/// HTTP client for the subscriber search API
pub struct HttpSubscriberLookup {
    http: Client,
    base_url: String,
    query_param: String,
    authorization: Option<String>,
    cookie: Option<String>,
}

impl HttpSubscriberLookup {
    pub fn new(http: Client, config: &SubscriberSection) -> Self {
        Self {
            http,
            base_url: config.base_url.clone(),
            query_param: config.query_param.clone(),
            authorization: config.authorization.clone(),
            cookie: config.cookie.clone(),
        }
    }
}

#[async_trait]
impl SubscriberLookup for HttpSubscriberLookup {
    async fn lookup_subscriber(&self, phone: &PhoneNumber) -> Result<Vec<RawSubscriber>> {
        let url = url_with_query(&self.base_url, &self.query_param, phone.as_str())?;

        let mut request = self.http.get(url);
        if let Some(authorization) = &self.authorization {
            request = request.header(AUTHORIZATION, authorization);
        }
        if let Some(cookie) = &self.cookie {
            request = request.header(COOKIE, cookie);
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%phone, status = status.as_u16(), "subscriber search rejected request");
            return Err(Error::upstream(SERVICE, Some(status.as_u16())));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        let all = body.into_records();
        let total = all.len();
        let private = retain_private(all);

        tracing::debug!(%phone, total, private = private.len(), "subscriber search answered");

        if private.is_empty() {
            return Err(Error::not_found(format!(
                "no private subscriber registered on {}",
                phone
            )));
        }

        Ok(private)
    }
}

fn retain_private(records: Vec<RawSubscriber>) -> Vec<RawSubscriber> {
    records
        .into_iter()
        .filter(|r| match r.subscriber_type {
            SubscriberType::Private => true,
            SubscriberType::Other(_) => false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::build_http_client;
    use crate::upstream::testing::serve;
    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn section(base_url: String) -> SubscriberSection {
        SubscriberSection {
            base_url,
            query_param: "phone".to_string(),
            authorization: Some("Bearer secret".to_string()),
            cookie: Some("session=abc".to_string()),
        }
    }

    async fn search(
        headers: HeaderMap,
        Query(params): Query<HashMap<String, String>>,
    ) -> std::result::Result<Json<Value>, StatusCode> {
        let authorized = headers.get("authorization").and_then(|h| h.to_str().ok())
            == Some("Bearer secret")
            && headers.get("cookie").and_then(|h| h.to_str().ok()) == Some("session=abc");
        if !authorized {
            return Err(StatusCode::FORBIDDEN);
        }

        let phone = params.get("phone").cloned().unwrap_or_default();
        if phone == "11111111" {
            return Ok(Json(json!([
                { "recordId": "biz", "subscriberType": 1, "phone": phone }
            ])));
        }

        Ok(Json(json!({
            "records": [
                { "recordId": "biz", "subscriberType": 1, "phone": phone },
                {
                    "recordId": "priv",
                    "subscriberType": 3,
                    "phone": phone,
                    "streetName": "Vestergade",
                    "houseNumber": "12",
                    "zipCode": "8000"
                }
            ]
        })))
    }

    #[tokio::test]
    async fn test_sends_normalized_phone_and_credentials() {
        let base = serve(Router::new().route("/search", get(search))).await;
        let client = HttpSubscriberLookup::new(
            build_http_client().unwrap(),
            &section(format!("{}/search", base)),
        );

        let phone = PhoneNumber::parse("+45 12345678").unwrap();
        let records = client.lookup_subscriber(&phone).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record_id, "priv");
        assert_eq!(records[0].phone.as_deref(), Some("12345678"));
        assert_eq!(records[0].street_name.as_deref(), Some("Vestergade"));
    }

    #[tokio::test]
    async fn test_only_business_subscribers_is_not_found() {
        let base = serve(Router::new().route("/search", get(search))).await;
        let client = HttpSubscriberLookup::new(
            build_http_client().unwrap(),
            &section(format!("{}/search", base)),
        );

        let phone = PhoneNumber::parse("11111111").unwrap();
        let err = client.lookup_subscriber(&phone).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_non_success_status_is_upstream_unavailable() {
        let base = serve(Router::new().route("/search", get(search))).await;
        let mut config = section(format!("{}/search", base));
        config.cookie = None;
        let client = HttpSubscriberLookup::new(build_http_client().unwrap(), &config);

        let phone = PhoneNumber::parse("12345678").unwrap();
        let err = client.lookup_subscriber(&phone).await.unwrap_err();
        assert!(matches!(
            err,
            Error::UpstreamUnavailable {
                status: Some(403),
                ..
            }
        ));
    }
}
