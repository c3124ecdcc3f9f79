//! GDS gateway HTTP client.
//!
//! The GDS is a SOAP service; we reach it through its JSON gateway, which
//! accepts each SOAP operation as `POST {base}/{operation}` with the
//! operation's parameters as a JSON object, authenticated with HTTP basic
//! auth.

use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::domain::{Provider, Route, Station};
use crate::provider::{ConnStatus, ProviderError, RouteProvider, RouteQuery};

use super::convert::{convert_points, convert_race, convert_races};
use super::error::GdsError;
use super::types::{GdsEnvelope, GdsPoint, GdsRace};

/// Default gateway URL (test cluster).
const DEFAULT_BASE_URL: &str = "https://cluster.avtovokzal.ru/gdstest/soap/json";

/// Default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration for the GDS client.
#[derive(Debug, Clone)]
pub struct GdsConfig {
    /// Basic auth user
    pub username: String,
    /// Basic auth password
    pub password: String,
    /// Gateway base URL
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl GdsConfig {
    /// Create a new config with the given credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// GDS gateway client.
#[derive(Debug, Clone)]
pub struct GdsClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl GdsClient {
    /// Create a new GDS client with the given configuration.
    pub fn new(config: GdsConfig) -> Result<Self, GdsError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username,
            password: config.password,
        })
    }

    /// Invoke one gateway operation.
    ///
    /// Returns `Ok(None)` when the operation succeeded with an empty return
    /// value.
    async fn call<T: DeserializeOwned>(
        &self,
        operation: &str,
        params: Value,
    ) -> Result<Option<T>, GdsError> {
        let url = format!("{}/{}", self.base_url, operation);
        debug!(operation, "GDS request");

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&params)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(GdsError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GdsError::ApiError {
                status: status.as_u16(),
                message: body.chars().take(500).collect(),
            });
        }

        let body = response.text().await?;

        let envelope: GdsEnvelope<T> =
            serde_json::from_str(&body).map_err(|e| GdsError::Json {
                message: e.to_string(),
                body: Some(body.chars().take(500).collect()),
            })?;

        if let Some(fault) = envelope.fault {
            if fault.is_not_found() {
                return Err(GdsError::NotFound(fault.message));
            }
            return Err(GdsError::Fault {
                code: fault.code,
                message: fault.message,
            });
        }

        Ok(envelope.value)
    }

    /// All dispatch points.
    pub async fn dispatch_points(&self) -> Result<Vec<GdsPoint>, GdsError> {
        Ok(self
            .call("getDispatchPoints", json!({}))
            .await?
            .unwrap_or_default())
    }

    /// Arrival points reachable from a dispatch point.
    pub async fn arrival_points(&self, dispatch_point_id: i64) -> Result<Vec<GdsPoint>, GdsError> {
        Ok(self
            .call(
                "getArrivalPoints",
                json!({ "dispatchPointId": dispatch_point_id }),
            )
            .await?
            .unwrap_or_default())
    }

    /// Races between two points on a date (`YYYY-MM-DD`).
    pub async fn races(
        &self,
        dispatch_point_id: i64,
        arrival_point_id: i64,
        date: &str,
    ) -> Result<Vec<GdsRace>, GdsError> {
        Ok(self
            .call(
                "getRaces",
                json!({
                    "dispatchPointId": dispatch_point_id,
                    "arrivalPointId": arrival_point_id,
                    "date": date,
                }),
            )
            .await?
            .unwrap_or_default())
    }

    /// A single race by uid.
    pub async fn race(&self, uid: &str) -> Result<GdsRace, GdsError> {
        self.call("getRace", json!({ "uid": uid }))
            .await?
            .ok_or_else(|| GdsError::NotFound(format!("race {uid}")))
    }

    /// Service version string; used as a liveness check.
    pub async fn version(&self) -> Result<String, GdsError> {
        Ok(self
            .call::<String>("getVersion", json!({}))
            .await?
            .unwrap_or_default())
    }
}

/// GDS point ids are integers; anything else cannot exist upstream.
fn point_id(native_id: &str) -> Result<i64, ProviderError> {
    native_id
        .trim()
        .parse()
        .map_err(|_| ProviderError::not_found(Provider::Gds, format!("point {native_id}")))
}

impl RouteProvider for GdsClient {
    fn provider(&self) -> Provider {
        Provider::Gds
    }

    async fn list_stations(&self) -> Result<Vec<Station>, ProviderError> {
        let points = self.dispatch_points().await?;
        Ok(convert_points(&points))
    }

    async fn list_destinations_from(&self, native_id: &str) -> Result<Vec<Station>, ProviderError> {
        let points = self.arrival_points(point_id(native_id)?).await?;
        Ok(convert_points(&points))
    }

    async fn search_routes(&self, query: &RouteQuery) -> Result<Vec<Route>, ProviderError> {
        let from = point_id(&query.from)?;
        let to = point_id(&query.to)?;
        let races = self.races(from, to, &query.date.to_iso()).await?;
        Ok(convert_races(&races))
    }

    async fn get_route_detail(&self, native_id: &str) -> Result<Route, ProviderError> {
        let race = self.race(native_id).await?;
        convert_race(&race)
            .map_err(|e| ProviderError::unavailable(Provider::Gds, format!("malformed race: {e}")))
    }

    async fn test_connection(&self) -> ConnStatus {
        let started = Instant::now();
        match self.version().await {
            Ok(_) => ConnStatus::reachable_since(started),
            Err(e) => ConnStatus::unreachable(started, e.to_string()),
        }
    }
}
