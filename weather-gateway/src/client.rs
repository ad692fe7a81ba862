use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use weather_core::{WeatherInfo, is_valid, provider::http_client};

use crate::routes::{API_PREFIX, CITIES_ROUTE, FORECAST_ROUTE};

/// Client for a running gateway. Checks input with the same rule the server
/// applies before sending anything.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = http_client(timeout).context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub async fn cities(&self, country: &str) -> Result<Vec<String>> {
        if !is_valid(Some(country)) {
            bail!("Input for country name is invalid");
        }

        let res = self
            .http
            .post(self.url(CITIES_ROUTE))
            .query(&[("countryName", country)])
            .send()
            .await
            .context("Failed to send request to weather gateway (cities)")?;

        read_json(res).await
    }

    pub async fn forecast(&self, city: &str, country: &str) -> Result<WeatherInfo> {
        if !is_valid(Some(country)) || !is_valid(Some(city)) {
            bail!("Input for country name and/or city is invalid");
        }

        let res = self
            .http
            .post(self.url(FORECAST_ROUTE))
            .query(&[("cityName", city), ("countryName", country)])
            .send()
            .await
            .context("Failed to send request to weather gateway (forecast)")?;

        read_json(res).await
    }

    fn url(&self, route: &str) -> String {
        format!("{}{API_PREFIX}{route}", self.base_url)
    }
}

async fn read_json<T: DeserializeOwned>(res: Response) -> Result<T> {
    let status = res.status();

    if status == StatusCode::BAD_REQUEST {
        let message = res
            .text()
            .await
            .context("Failed to read weather gateway error body")?;
        return Err(anyhow!(message));
    }

    if !status.is_success() {
        bail!("Weather gateway request failed with status {status}");
    }

    res.json()
        .await
        .context("Failed to parse weather gateway response")
}
