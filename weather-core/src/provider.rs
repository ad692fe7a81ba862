use crate::{
    Config,
    error::SourceError,
    provider::{
        globalweather::GlobalWeatherClient,
        openweathermap::{Language, OpenWeatherMapClient, OwmCurrentWeather, Units},
    },
};
use async_trait::async_trait;
use reqwest::Client;
use std::{convert::TryFrom, fmt::Debug, sync::Arc, time::Duration};
use tracing::warn;

pub mod globalweather;
pub mod openweathermap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    GlobalWeather,
    OpenWeatherMap,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::GlobalWeather => "globalweather",
            ProviderId::OpenWeatherMap => "openweathermap",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::GlobalWeather, ProviderId::OpenWeatherMap]
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            ProviderId::GlobalWeather => globalweather::DEFAULT_ENDPOINT,
            ProviderId::OpenWeatherMap => openweathermap::DEFAULT_ENDPOINT,
        }
    }

    pub fn requires_api_key(&self) -> bool {
        matches!(self, ProviderId::OpenWeatherMap)
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "globalweather" => Ok(ProviderId::GlobalWeather),
            "openweathermap" => Ok(ProviderId::OpenWeatherMap),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: globalweather, openweathermap."
            )),
        }
    }
}

/// Maps a country name to the cities the directory service knows for it.
#[async_trait]
pub trait CityDirectory: Send + Sync + Debug {
    /// Raw city names in service order; may contain duplicates.
    async fn cities_by_country(&self, country: &str) -> Result<Vec<String>, SourceError>;
}

/// Reply of the primary forecast source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryReply {
    /// Raw tabular payload, still to be normalized.
    Report(String),
    /// The service answered but has no forecast for this query.
    NotFound,
}

#[async_trait]
pub trait PrimaryForecast: Send + Sync + Debug {
    async fn weather(&self, city: &str, country: &str) -> Result<PrimaryReply, SourceError>;
}

#[async_trait]
pub trait SecondaryForecast: Send + Sync + Debug {
    /// `Ok(None)` when the API does not know the city.
    async fn current_by_name(
        &self,
        city: &str,
        units: Units,
        language: Language,
    ) -> Result<Option<OwmCurrentWeather>, SourceError>;
}

/// Upstream collaborators, built once at startup and shared by all requests.
#[derive(Debug, Clone)]
pub struct Providers {
    pub directory: Arc<dyn CityDirectory>,
    pub primary: Arc<dyn PrimaryForecast>,
    pub secondary: Option<Arc<dyn SecondaryForecast>>,
}

/// Construct all providers from config. The secondary source is left out
/// when no API key is configured.
pub fn providers_from_config(config: &Config) -> anyhow::Result<Providers> {
    let http = http_client(config.request_timeout())?;

    let global = Arc::new(GlobalWeatherClient::new(
        http.clone(),
        config.provider_endpoint(ProviderId::GlobalWeather),
    ));

    let secondary: Option<Arc<dyn SecondaryForecast>> =
        match config.provider_api_key(ProviderId::OpenWeatherMap) {
            Some(api_key) => Some(Arc::new(OpenWeatherMapClient::new(
                http,
                config.provider_endpoint(ProviderId::OpenWeatherMap),
                api_key,
            ))),
            None => {
                warn!(
                    "No API key configured for provider '{}'; forecasts the primary source \
                     cannot answer will use placeholder data",
                    ProviderId::OpenWeatherMap
                );
                None
            }
        };

    Ok(Providers {
        directory: global.clone(),
        primary: global,
        secondary,
    })
}

/// Shared HTTP client; `timeout` bounds every request made with it.
pub fn http_client(timeout: Duration) -> Result<Client, SourceError> {
    Ok(Client::builder()
        .timeout(timeout)
        .user_agent(concat!("weather-gateway/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
