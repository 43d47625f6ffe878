//! Address-wash client
//!
//! Turns a free-text address into a canonical one. The service grades every
//! answer with a category; only `B` is accepted as an exact building-level
//! match, everything else fails the request.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::AddressSection;
use crate::types::NormalizedAddress;
use crate::{Error, Result};

use super::{transport_error, url_with_query, AddressNormalizer};

const SERVICE: &str = "address wash";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
enum MatchCategory {
    A,
    B,
    C,
    #[serde(other)]
    Unknown,
}

impl MatchCategory {
    fn as_str(&self) -> &'static str {
        match self {
            MatchCategory::A => "A",
            MatchCategory::B => "B",
            MatchCategory::C => "C",
            MatchCategory::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Deserialize)]
struct WashResponse {
    kategori: MatchCategory,
    #[serde(default)]
    resultater: Vec<WashCandidate>,
}

#[derive(Debug, Deserialize)]
struct WashCandidate {
    adresse: WashAddress,
}

#[derive(Debug, Deserialize)]
struct WashAddress {
    id: String,
    vejnavn: Option<String>,
    husnr: Option<String>,
    etage: Option<String>,
    #[serde(rename = "dør")]
    door: Option<String>,
    postnr: Option<String>,
}

impl From<WashAddress> for NormalizedAddress {
    fn from(address: WashAddress) -> Self {
        NormalizedAddress {
            address_id: address.id,
            street_name: address.vejnavn,
            house_number: address.husnr,
            zip_code: address.postnr,
            floor: address.etage,
            door: address.door,
        }
    }
}

/// Join the non-empty parts with single spaces: street, house number, floor, zip.
pub fn build_address_query(
    street_name: Option<&str>,
    house_number: Option<&str>,
    floor: Option<&str>,
    zip_code: Option<&str>,
) -> String {
    [street_name, house_number, floor, zip_code]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// HTTP client for the address-wash API
pub struct HttpAddressNormalizer {
    http: Client,
    base_url: String,
    query_param: String,
}

impl HttpAddressNormalizer {
    pub fn new(http: Client, config: &AddressSection) -> Self {
        Self {
            http,
            base_url: config.base_url.clone(),
            query_param: config.query_param.clone(),
        }
    }
}

#[async_trait]
impl AddressNormalizer for HttpAddressNormalizer {
    async fn normalize_address(
        &self,
        street_name: Option<&str>,
        house_number: Option<&str>,
        floor: Option<&str>,
        zip_code: Option<&str>,
    ) -> Result<NormalizedAddress> {
        let address = build_address_query(street_name, house_number, floor, zip_code);
        if address.is_empty() {
            return Err(Error::AddressNotResolved {
                status: 422,
                category: "empty address".to_string(),
            });
        }

        let url = url_with_query(&self.base_url, &self.query_param, &address)?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%address, status = status.as_u16(), "address wash rejected request");
            return Err(Error::upstream(SERVICE, Some(status.as_u16())));
        }

        let body: WashResponse = response
            .json()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        let unresolved = |category: &MatchCategory| Error::AddressNotResolved {
            status: status.as_u16(),
            category: category.as_str().to_string(),
        };

        match body.kategori {
            MatchCategory::B => {}
            MatchCategory::A | MatchCategory::C | MatchCategory::Unknown => {
                tracing::info!(%address, category = body.kategori.as_str(), "address not resolved");
                return Err(unresolved(&body.kategori));
            }
        }

        let candidate = body
            .resultater
            .into_iter()
            .next()
            .ok_or_else(|| unresolved(&MatchCategory::B))?;

        Ok(candidate.adresse.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::build_http_client;
    use crate::upstream::testing::serve;
    use axum::extract::Query;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn wash(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        let text = params.get("betegnelse").cloned().unwrap_or_default();
        let body = match text.as_str() {
            "Vestergade 12 2 8000" => json!({
                "kategori": "B",
                "resultater": [{
                    "adresse": {
                        "id": "A1",
                        "vejnavn": "Vestergade",
                        "husnr": "12",
                        "etage": "2",
                        "dør": "th",
                        "postnr": "8000"
                    }
                }]
            }),
            "Vestergade 8000" => json!({ "kategori": "C", "resultater": [] }),
            _ => json!({ "kategori": "B", "resultater": [] }),
        };
        Json(body)
    }

    fn normalizer(base: &str) -> HttpAddressNormalizer {
        HttpAddressNormalizer::new(
            build_http_client().unwrap(),
            &AddressSection {
                base_url: format!("{}/datavask/adresser", base),
                query_param: "betegnelse".to_string(),
            },
        )
    }

    #[test]
    fn test_build_address_query_skips_empty_parts() {
        assert_eq!(
            build_address_query(Some("Vestergade"), Some("12"), Some("2"), Some("8000")),
            "Vestergade 12 2 8000"
        );
        assert_eq!(
            build_address_query(Some(" Vestergade "), None, Some(""), Some("8000")),
            "Vestergade 8000"
        );
        assert_eq!(build_address_query(None, None, None, None), "");
    }

    #[tokio::test]
    async fn test_category_b_returns_first_candidate() {
        let base = serve(Router::new().route("/datavask/adresser", get(wash))).await;

        let address = normalizer(&base)
            .normalize_address(Some("Vestergade"), Some("12"), Some("2"), Some("8000"))
            .await
            .unwrap();

        assert_eq!(address.address_id, "A1");
        assert_eq!(address.street_name.as_deref(), Some("Vestergade"));
        assert_eq!(address.door.as_deref(), Some("th"));
        assert_eq!(address.zip_code.as_deref(), Some("8000"));
    }

    #[tokio::test]
    async fn test_other_category_is_not_resolved() {
        let base = serve(Router::new().route("/datavask/adresser", get(wash))).await;

        let err = normalizer(&base)
            .normalize_address(Some("Vestergade"), None, None, Some("8000"))
            .await
            .unwrap_err();

        match err {
            Error::AddressNotResolved { status, category } => {
                assert_eq!(status, 200);
                assert_eq!(category, "C");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_category_b_without_candidates_is_not_resolved() {
        let base = serve(Router::new().route("/datavask/adresser", get(wash))).await;

        let err = normalizer(&base)
            .normalize_address(Some("Nowhere"), Some("1"), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AddressNotResolved { .. }));
    }

    #[tokio::test]
    async fn test_server_error_is_upstream_unavailable() {
        let router = Router::new().route(
            "/datavask/adresser",
            get(|| async { axum::http::StatusCode::SERVICE_UNAVAILABLE }),
        );
        let base = serve(router).await;

        let err = normalizer(&base)
            .normalize_address(Some("Vestergade"), Some("12"), None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UpstreamUnavailable {
                status: Some(503),
                ..
            }
        ));
    }
}
