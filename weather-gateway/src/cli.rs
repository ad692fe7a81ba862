use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inquire::{Password, Text};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::info;
use weather_core::{Config, ProviderId, WeatherRequestHandler, providers_from_config};

use crate::{client::GatewayClient, routes};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-gateway", version, about = "City list and weather forecast gateway")]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API.
    Serve {
        /// Listen address, e.g. "0.0.0.0:8080". Defaults to `server.bind`.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Configure endpoint and credentials for a provider.
    Configure {
        /// Provider short name: "globalweather" or "openweathermap".
        provider: String,
    },

    /// List the cities of a country.
    Cities {
        country: String,

        /// Base URL of a running gateway; queries the sources directly if absent.
        #[arg(long)]
        remote: Option<String>,
    },

    /// Show the forecast for a city.
    Forecast {
        city: String,
        country: String,

        #[arg(long)]
        remote: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config_path = match self.config {
            Some(path) => path,
            None => Config::config_file_path()?,
        };

        match self.command {
            Command::Configure { provider } => {
                let provider_id = ProviderId::try_from(provider.as_str())?;
                configure(Config::read_from(&config_path)?, &config_path, provider_id)
            }
            Command::Serve { bind } => {
                let config = Config::load_from(&config_path)?;
                let bind = bind.unwrap_or_else(|| config.server.bind.clone());
                serve(&config, &bind).await
            }
            Command::Cities { country, remote } => {
                let config = Config::load_from(&config_path)?;
                let cities = match remote {
                    Some(url) => {
                        GatewayClient::new(url, config.request_timeout())?
                            .cities(&country)
                            .await?
                    }
                    None => local_handler(&config)?
                        .get_cities_by_country(Some(&country))
                        .await?
                        .into_inner(),
                };
                print_json(&cities)
            }
            Command::Forecast { city, country, remote } => {
                let config = Config::load_from(&config_path)?;
                let info = match remote {
                    Some(url) => {
                        GatewayClient::new(url, config.request_timeout())?
                            .forecast(&city, &country)
                            .await?
                    }
                    None => {
                        local_handler(&config)?
                            .get_weather_forecast(Some(&city), Some(&country))
                            .await?
                    }
                };
                print_json(&info)
            }
        }
    }
}

fn local_handler(config: &Config) -> Result<WeatherRequestHandler> {
    let providers = providers_from_config(config)?;
    Ok(WeatherRequestHandler::from_providers(providers, config.secondary_failure))
}

async fn serve(config: &Config, bind: &str) -> Result<()> {
    let handler = Arc::new(local_handler(config)?);
    let app = routes::router(handler);

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!(addr = %listener.local_addr()?, "weather gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("weather gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}

/// `config` must be the stored file without environment overrides, since it
/// is written back as is.
fn configure(mut config: Config, path: &std::path::Path, provider_id: ProviderId) -> Result<()> {
    if provider_id.requires_api_key() {
        let api_key = Password::new(&format!("API key for {provider_id}:"))
            .without_confirmation()
            .prompt()
            .context("Failed to read API key")?;
        config.upsert_provider_api_key(provider_id, api_key.trim().to_string());
    }

    let current = config.provider_endpoint(provider_id).to_string();
    let endpoint = Text::new("Endpoint:")
        .with_default(&current)
        .prompt()
        .context("Failed to read endpoint")?;
    if endpoint != provider_id.default_endpoint() {
        config.set_provider_endpoint(provider_id, endpoint);
    }

    config.save_to(path)?;
    println!("Saved {provider_id} settings to {}", path.display());
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to render JSON")?;
    println!("{out}");
    Ok(())
}
