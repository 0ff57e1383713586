//! Azure Maps REST client for nearby search and route directions.

use super::{build_provider_http_client, map_http_error, map_status, RoutingProvider, SearchProvider};
use crate::error::ProviderError;
use crate::types::{Point, RouteSegment};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://atlas.microsoft.com";
const API_VERSION: &str = "1.0";

/// Azure Maps client backing both provider traits
pub struct AzureMapsClient {
    client: Client,
    subscription_key: String,
    base_url: String,
}

impl AzureMapsClient {
    pub fn new(
        subscription_key: String,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        if subscription_key.trim().is_empty() {
            return Err(ProviderError::NotConfigured(
                "Azure Maps subscription key is empty".to_string(),
            ));
        }
        let client = build_provider_http_client(timeout)?;
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            subscription_key,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("api-version", API_VERSION),
                ("subscription-key", self.subscription_key.as_str()),
            ])
            .query(params)
            .send()
            .await
            .map_err(map_http_error)?;

        parse_response(response).await
    }
}

async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(map_status(status.as_u16(), &error_text));
    }

    response
        .json()
        .await
        .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {}", e)))
}

#[derive(Deserialize)]
struct SearchNearbyResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct SearchResult {
    position: LatLon,
}

#[derive(Deserialize)]
struct LatLon {
    lat: f64,
    lon: f64,
}

#[derive(Deserialize)]
struct RouteDirectionsResponse {
    #[serde(default)]
    routes: Vec<RouteResult>,
}

#[derive(Deserialize)]
struct RouteResult {
    summary: RouteSummary,
    #[serde(default)]
    legs: Vec<RouteLeg>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouteSummary {
    length_in_meters: f64,
}

#[derive(Deserialize)]
struct RouteLeg {
    #[serde(default)]
    points: Vec<LatLong>,
}

#[derive(Deserialize)]
struct LatLong {
    latitude: f64,
    longitude: f64,
}

#[async_trait]
impl SearchProvider for AzureMapsClient {
    async fn search_nearby(
        &self,
        center: Point,
        radius_m: f64,
        limit: usize,
    ) -> Result<Vec<Point>, ProviderError> {
        let params = [
            ("lat", center.lat.to_string()),
            ("lon", center.lon.to_string()),
            ("radius", format!("{}", radius_m.round() as u64)),
            ("limit", limit.to_string()),
        ];
        let body: SearchNearbyResponse = self.get_json("/search/nearby/json", &params).await?;
        debug!(results = body.results.len(), "Azure Maps nearby search returned");

        Ok(body
            .results
            .into_iter()
            .map(|r| Point::new(r.position.lon, r.position.lat))
            .collect())
    }

    fn provider_name(&self) -> &str {
        "azure-maps"
    }
}

#[async_trait]
impl RoutingProvider for AzureMapsClient {
    async fn route(&self, start: Point, end: Point) -> Result<RouteSegment, ProviderError> {
        // Route directions take `lat,lon` pairs joined by a colon
        let query = format!("{},{}:{},{}", start.lat, start.lon, end.lat, end.lon);
        let body: RouteDirectionsResponse = self
            .get_json("/route/directions/json", &[("query", query)])
            .await?;

        let route = body
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No routes in response".to_string()))?;

        let path = route
            .legs
            .into_iter()
            .next()
            .map(|leg| {
                leg.points
                    .into_iter()
                    .map(|p| Point::new(p.longitude, p.latitude))
                    .collect()
            })
            .unwrap_or_default();

        Ok(RouteSegment::new(route.summary.length_in_meters, path))
    }

    fn provider_name(&self) -> &str {
        "azure-maps"
    }
}
