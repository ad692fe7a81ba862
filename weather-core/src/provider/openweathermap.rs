use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{
    error::SourceError,
    provider::{SecondaryForecast, truncate_body},
};

pub const DEFAULT_ENDPOINT: &str = "https://api.openweathermap.org/data/2.5/weather";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }

    pub fn temperature_suffix(&self) -> &'static str {
        match self {
            Units::Metric => "C",
            Units::Imperial => "F",
        }
    }

    pub fn speed_suffix(&self) -> &'static str {
        match self {
            Units::Metric => "m/s",
            Units::Imperial => "mph",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Language {
    #[default]
    English,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "en",
        }
    }
}

/// Current-weather response, reduced to the fields the gateway renders.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OwmCurrentWeather {
    pub name: String,
    /// Observation time, unix seconds.
    pub dt: i64,
    pub main: OwmMain,
    #[serde(default)]
    pub weather: Vec<OwmCondition>,
    #[serde(default)]
    pub clouds: Option<OwmClouds>,
    #[serde(default)]
    pub wind: Option<OwmWind>,
    #[serde(default)]
    pub rain: Option<OwmPrecipitation>,
    #[serde(default)]
    pub snow: Option<OwmPrecipitation>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OwmMain {
    pub temp: f64,
    /// hPa
    pub pressure: f64,
    /// Percent.
    pub humidity: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OwmCondition {
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OwmClouds {
    /// Cloud cover percent.
    pub all: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OwmWind {
    pub speed: f64,
    #[serde(default)]
    pub deg: Option<f64>,
}

/// Precipitation volume in mm.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OwmPrecipitation {
    #[serde(rename = "1h", default)]
    pub one_hour: Option<f64>,
    #[serde(rename = "3h", default)]
    pub three_hours: Option<f64>,
}

impl OwmPrecipitation {
    pub fn amount(&self) -> Option<f64> {
        self.one_hour.or(self.three_hours)
    }
}

#[derive(Clone)]
pub struct OpenWeatherMapClient {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl OpenWeatherMapClient {
    pub fn new(http: Client, endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }
}

impl std::fmt::Debug for OpenWeatherMapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenWeatherMapClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl SecondaryForecast for OpenWeatherMapClient {
    #[instrument(skip(self))]
    async fn current_by_name(
        &self,
        city: &str,
        units: Units,
        language: Language,
    ) -> Result<Option<OwmCurrentWeather>, SourceError> {
        let res = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("q", city),
                ("units", units.as_str()),
                ("lang", language.as_str()),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            debug!("OpenWeatherMap does not know this city");
            return Ok(None);
        }

        let body = res.text().await?;

        if !status.is_success() {
            return Err(SourceError::Http {
                status: status.as_u16(),
                message: truncate_body(&body),
            });
        }

        let parsed: OwmCurrentWeather = serde_json::from_str(&body)?;
        Ok(Some(parsed))
    }
}
