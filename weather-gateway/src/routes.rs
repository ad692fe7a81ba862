//! HTTP surface of the gateway. Parameters come from the query string, as the
//! browser front-end sends them; every failure is a 400 with a plain-text
//! explanation.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use weather_core::{CityList, RequestError, WeatherInfo, WeatherRequestHandler};

pub const API_PREFIX: &str = "/api/v1/weather";
pub const CITIES_ROUTE: &str = "/GetCitiesByCountryName";
pub const FORECAST_ROUTE: &str = "/GetWeatherByCityAndCountry";

#[derive(Clone)]
pub struct AppState {
    handler: Arc<WeatherRequestHandler>,
}

pub fn router(handler: Arc<WeatherRequestHandler>) -> Router {
    let api = Router::new()
        .route(CITIES_ROUTE, post(cities_by_country))
        .route(FORECAST_ROUTE, post(weather_by_city_and_country));

    Router::new()
        .nest(API_PREFIX, api)
        .with_state(AppState { handler })
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitiesParams {
    country_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastParams {
    city_name: Option<String>,
    country_name: Option<String>,
}

/// POST /api/v1/weather/GetCitiesByCountryName?countryName=...
async fn cities_by_country(
    State(state): State<AppState>,
    Query(params): Query<CitiesParams>,
) -> Result<Json<CityList>, ApiError> {
    let cities = state
        .handler
        .get_cities_by_country(params.country_name.as_deref())
        .await?;
    Ok(Json(cities))
}

/// POST /api/v1/weather/GetWeatherByCityAndCountry?cityName=...&countryName=...
async fn weather_by_city_and_country(
    State(state): State<AppState>,
    Query(params): Query<ForecastParams>,
) -> Result<Json<WeatherInfo>, ApiError> {
    let info = state
        .handler
        .get_weather_forecast(params.city_name.as_deref(), params.country_name.as_deref())
        .await?;
    Ok(Json(info))
}

/// Renders a [`RequestError`] as `400 Bad Request`. Only the error's own
/// message is sent; upstream causes stay in the logs.
#[derive(Debug)]
pub struct ApiError(RequestError);

impl From<RequestError> for ApiError {
    fn from(error: RequestError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.0.to_string(),
        )
            .into_response()
    }
}
