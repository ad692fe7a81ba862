//! Request handling: validation, city/country pairing and the forecast
//! fallback chain.
//!
//! Forecast sources are tried in order. Each [`ForecastStep`] reports
//! [`Outcome::Found`], [`Outcome::NoData`] or [`Outcome::Failed`]; the chain
//! stops at the first `Found` or `Failed` and only moves on after `NoData`.
//! When every step had no data the request is answered with a placeholder.

use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::{
    config::SecondaryFailurePolicy,
    error::{Field, RequestError, SourceError},
    model::{CityList, ForecastQuery, WeatherInfo},
    normalize,
    provider::{
        CityDirectory, PrimaryForecast, PrimaryReply, Providers, SecondaryForecast,
        openweathermap::{Language, Units},
    },
    validation::validate,
};

/// Result of asking one forecast source.
#[derive(Debug)]
pub enum Outcome {
    Found(WeatherInfo),
    NoData,
    Failed(SourceError),
}

#[async_trait]
pub trait ForecastStep: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    async fn attempt(&self, query: &ForecastQuery) -> Outcome;
}

/// GlobalWeather forecast. Its "Data Not Found" reply means no data; any
/// error is final for the request.
#[derive(Debug, Clone)]
pub struct PrimaryStep {
    source: Arc<dyn PrimaryForecast>,
}

impl PrimaryStep {
    pub fn new(source: Arc<dyn PrimaryForecast>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl ForecastStep for PrimaryStep {
    fn name(&self) -> &'static str {
        "globalweather"
    }

    async fn attempt(&self, query: &ForecastQuery) -> Outcome {
        match self.source.weather(&query.city, &query.country).await {
            Ok(PrimaryReply::NotFound) => Outcome::NoData,
            Ok(PrimaryReply::Report(payload)) => match normalize::from_global_weather(&payload) {
                Ok(info) => Outcome::Found(info),
                Err(error) => Outcome::Failed(error),
            },
            Err(error) => Outcome::Failed(error),
        }
    }
}

/// OpenWeatherMap forecast; what its failures mean is set by `policy`.
#[derive(Debug, Clone)]
pub struct SecondaryStep {
    source: Arc<dyn SecondaryForecast>,
    policy: SecondaryFailurePolicy,
}

impl SecondaryStep {
    pub fn new(source: Arc<dyn SecondaryForecast>, policy: SecondaryFailurePolicy) -> Self {
        Self { source, policy }
    }

    fn on_failure(&self, error: SourceError) -> Outcome {
        match self.policy {
            SecondaryFailurePolicy::Degrade => {
                warn!(source = self.name(), %error, "forecast source failed, treating as no data");
                Outcome::NoData
            }
            SecondaryFailurePolicy::Propagate => Outcome::Failed(error),
        }
    }
}

#[async_trait]
impl ForecastStep for SecondaryStep {
    fn name(&self) -> &'static str {
        "openweathermap"
    }

    async fn attempt(&self, query: &ForecastQuery) -> Outcome {
        let units = Units::Metric;

        match self
            .source
            .current_by_name(&query.city, units, Language::English)
            .await
        {
            Ok(None) => Outcome::NoData,
            Ok(Some(current)) => match normalize::from_open_weather_map(&current, units) {
                Ok(info) => Outcome::Found(info),
                Err(error) => self.on_failure(error),
            },
            Err(error) => self.on_failure(error),
        }
    }
}

/// Serves both gateway operations. Holds no per-request state and is shared
/// across concurrent requests.
#[derive(Debug)]
pub struct WeatherRequestHandler {
    directory: Arc<dyn CityDirectory>,
    steps: Vec<Box<dyn ForecastStep>>,
    clock: fn() -> DateTime<Utc>,
}

impl WeatherRequestHandler {
    pub fn new(directory: Arc<dyn CityDirectory>, steps: Vec<Box<dyn ForecastStep>>) -> Self {
        Self {
            directory,
            steps,
            clock: Utc::now,
        }
    }

    /// Primary source first, then the secondary one when configured.
    pub fn from_providers(providers: Providers, policy: SecondaryFailurePolicy) -> Self {
        let mut steps: Vec<Box<dyn ForecastStep>> =
            vec![Box::new(PrimaryStep::new(providers.primary))];
        if let Some(secondary) = providers.secondary {
            steps.push(Box::new(SecondaryStep::new(secondary, policy)));
        }

        Self::new(providers.directory, steps)
    }

    /// Replace the clock used to timestamp placeholder forecasts.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Sorted, deduplicated cities of `country`. An unknown country yields
    /// an empty list.
    #[instrument(skip(self))]
    pub async fn get_cities_by_country(
        &self,
        country: Option<&str>,
    ) -> Result<CityList, RequestError> {
        let country = validate(country, Field::Country)?;
        self.city_list(country).await
    }

    #[instrument(skip(self))]
    pub async fn get_weather_forecast(
        &self,
        city: Option<&str>,
        country: Option<&str>,
    ) -> Result<WeatherInfo, RequestError> {
        let country = validate(country, Field::Country)?;
        let city = validate(city, Field::City)?;

        let cities = self.city_list(country).await?;
        if !cities.contains(city) {
            return Err(RequestError::InvalidCityCountryPair {
                city: city.to_string(),
                country: country.to_string(),
            });
        }

        let query = ForecastQuery {
            city: city.to_string(),
            country: country.to_string(),
        };

        for step in &self.steps {
            match step.attempt(&query).await {
                Outcome::Found(info) => {
                    info!(source = %info.data_source, "forecast resolved");
                    return Ok(info);
                }
                Outcome::NoData => debug!(source = step.name(), "no data, trying next source"),
                Outcome::Failed(error) => return Err(upstream(step.name(), error)),
            }
        }

        info!("no forecast source had data, answering with placeholder");
        Ok(normalize::placeholder(city, (self.clock)()))
    }

    async fn city_list(&self, country: &str) -> Result<CityList, RequestError> {
        let cities = self
            .directory
            .cities_by_country(country)
            .await
            .map_err(|error| upstream("city directory", error))?;

        let list: CityList = cities.into_iter().collect();
        debug!(cities = list.len(), "city list resolved");
        Ok(list)
    }
}

fn upstream(source: &str, error: SourceError) -> RequestError {
    warn!(source, %error, "upstream request failed");
    RequestError::UpstreamUnavailable(error)
}
