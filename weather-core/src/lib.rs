//! Core library of the weather gateway.
//!
//! This crate defines:
//! - Input validation shared by servers and clients
//! - Configuration & credentials handling
//! - Adapters for the GlobalWeather SOAP service and OpenWeatherMap
//! - Normalization of both sources into one [`WeatherInfo`] shape
//! - The request handler with its forecast fallback chain
//!
//! It is used by `weather-gateway`, but can also be embedded in other services.

pub mod config;
pub mod dataset;
pub mod error;
pub mod handler;
pub mod model;
pub mod normalize;
pub mod provider;
pub mod validation;

pub use config::{Config, ProviderConfig, SecondaryFailurePolicy};
pub use error::{Field, RequestError, SourceError};
pub use handler::WeatherRequestHandler;
pub use model::{CityList, DataSource, WeatherInfo};
pub use provider::{ProviderId, Providers, providers_from_config};
pub use validation::is_valid;
