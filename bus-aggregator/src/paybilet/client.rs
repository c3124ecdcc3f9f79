//! Paybilet REST API client.

use std::time::{Duration, Instant};

use reqwest::Url;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::{Provider, Route, Station};
use crate::provider::{ConnStatus, ProviderError, RouteProvider, RouteQuery};

use super::convert::{convert_race, convert_races, convert_stations};
use super::error::PaybiletError;
use super::types::{PaybiletEnvelope, PaybiletRace, PaybiletStation};

/// Default base URL for the Paybilet API.
const DEFAULT_BASE_URL: &str = "https://api.paybilet.ru";

/// Configuration for the Paybilet client.
#[derive(Debug, Clone)]
pub struct PaybiletConfig {
    /// Token for x-access-token header authentication
    pub token: String,
    /// Base URL for the API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl PaybiletConfig {
    /// Create a new config with the given token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 10,
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

/// Client for the Paybilet API.
#[derive(Debug, Clone)]
pub struct PaybiletClient {
    http: reqwest::Client,
    base_url: Url,
}

impl PaybiletClient {
    /// Create a new Paybilet client.
    pub fn new(config: PaybiletConfig) -> Result<Self, PaybiletError> {
        let mut headers = HeaderMap::new();

        let token = HeaderValue::from_str(&config.token)
            .map_err(|_| PaybiletError::NotConfigured("invalid token format".to_string()))?;
        headers.insert(HeaderName::from_static("x-access-token"), token);

        let base_url = Url::parse(&config.base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| {
                PaybiletError::NotConfigured(format!("invalid base URL {}", config.base_url))
            })?;

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { http, base_url })
    }

    /// Append path segments to the base URL, escaping each one, so an id
    /// can never change which endpoint is called.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// GET a path and unwrap the `{success, data}` envelope.
    ///
    /// `what` names the resource for `NotFound` errors.
    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
        what: &str,
    ) -> Result<Option<T>, PaybiletError> {
        let url = self.endpoint(segments);
        debug!(path = url.path(), "Paybilet request");

        let response = self.http.get(url).query(query).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(PaybiletError::Unauthorized);
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PaybiletError::NotFound(what.to_string()));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaybiletError::Api {
                status: status.as_u16(),
                message: body.chars().take(500).collect(),
            });
        }

        let body = response.text().await?;

        let envelope: PaybiletEnvelope<T> =
            serde_json::from_str(&body).map_err(|e| PaybiletError::Json {
                message: e.to_string(),
            })?;

        if !envelope.success {
            return Err(PaybiletError::Rejected {
                message: envelope.failure_reason(),
            });
        }

        Ok(envelope.data)
    }

    /// Fetch all stations.
    pub async fn stations(&self) -> Result<Vec<PaybiletStation>, PaybiletError> {
        Ok(self
            .get(&["stations"], &[], "stations")
            .await?
            .unwrap_or_default())
    }

    /// Fetch stations reachable from a station.
    pub async fn destinations(&self, station_id: &str) -> Result<Vec<PaybiletStation>, PaybiletError> {
        let what = format!("station {station_id}");
        let station_id = native_segment(station_id, &what)?;
        Ok(self
            .get(&["stations", station_id, "destinations"], &[], &what)
            .await?
            .unwrap_or_default())
    }

    /// Search races; `date` is `DD.MM.YYYY`.
    pub async fn races(
        &self,
        from: &str,
        to: &str,
        date: &str,
    ) -> Result<Vec<PaybiletRace>, PaybiletError> {
        let query = [
            ("from", from.to_string()),
            ("to", to.to_string()),
            ("date", date.to_string()),
        ];
        Ok(self
            .get(&["races"], &query, "races")
            .await?
            .unwrap_or_default())
    }

    /// Fetch one race.
    pub async fn race(&self, id: &str) -> Result<PaybiletRace, PaybiletError> {
        let what = format!("race {id}");
        let id = native_segment(id, &what)?;
        self.get(&["races", id], &[], &what)
            .await?
            .ok_or(PaybiletError::NotFound(what))
    }
}

/// A native id usable as one path segment. Dot segments would be dropped
/// from the URL, so they name nothing.
fn native_segment<'a>(id: &'a str, what: &str) -> Result<&'a str, PaybiletError> {
    match id {
        "" | "." | ".." => Err(PaybiletError::NotFound(what.to_string())),
        id => Ok(id),
    }
}

impl RouteProvider for PaybiletClient {
    fn provider(&self) -> Provider {
        Provider::Paybilet
    }

    async fn list_stations(&self) -> Result<Vec<Station>, ProviderError> {
        let dtos = self.stations().await?;
        Ok(convert_stations(&dtos))
    }

    async fn list_destinations_from(&self, native_id: &str) -> Result<Vec<Station>, ProviderError> {
        let dtos = self.destinations(native_id).await?;
        Ok(convert_stations(&dtos))
    }

    async fn search_routes(&self, query: &RouteQuery) -> Result<Vec<Route>, ProviderError> {
        let dtos = self
            .races(&query.from, &query.to, &query.date.to_dotted())
            .await?;
        Ok(convert_races(&dtos))
    }

    async fn get_route_detail(&self, native_id: &str) -> Result<Route, ProviderError> {
        let dto = self.race(native_id).await?;
        convert_race(&dto).ok_or_else(|| {
            ProviderError::unavailable(Provider::Paybilet, format!("malformed race {native_id}"))
        })
    }

    async fn test_connection(&self) -> ConnStatus {
        let started = Instant::now();
        match self.stations().await {
            Ok(_) => ConnStatus::reachable_since(started),
            Err(e) => ConnStatus::unreachable(started, e.to_string()),
        }
    }
}
