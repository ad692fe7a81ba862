use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Marker used for every field a source could not supply.
pub const NO_DATA: &str = "No Data";

/// Display format of [`WeatherInfo::time`], always UTC.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone)]
pub struct ForecastQuery {
    pub city: String,
    pub country: String,
}

/// Which backend produced a [`WeatherInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataSource {
    #[serde(rename = "Global Weather")]
    GlobalWeather,
    #[serde(rename = "Open Weather Map")]
    OpenWeatherMap,
    #[serde(rename = "Fake Weather Service")]
    Placeholder,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::GlobalWeather => "Global Weather",
            DataSource::OpenWeatherMap => "Open Weather Map",
            DataSource::Placeholder => "Fake Weather Service",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Forecast returned to clients. Every field is a display string with its
/// unit already attached; fields a source lacks hold [`NO_DATA`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WeatherInfo {
    pub data_source: DataSource,
    pub location: String,
    pub time: String,
    pub temperature: String,
    pub pressure: String,
    pub sky_conditions: String,
    pub precipitation: String,
    pub weather: String,
    pub icon_uri: String,
    pub dew_point: String,
    pub relative_humidity: String,
    pub visibility: String,
    pub wind: String,
}

impl WeatherInfo {
    /// Display fields keyed by their JSON name, excluding the source tag.
    pub fn display_fields(&self) -> [(&'static str, &str); 12] {
        [
            ("Location", self.location.as_str()),
            ("Time", self.time.as_str()),
            ("Temperature", self.temperature.as_str()),
            ("Pressure", self.pressure.as_str()),
            ("SkyConditions", self.sky_conditions.as_str()),
            ("Precipitation", self.precipitation.as_str()),
            ("Weather", self.weather.as_str()),
            ("IconUri", self.icon_uri.as_str()),
            ("DewPoint", self.dew_point.as_str()),
            ("RelativeHumidity", self.relative_humidity.as_str()),
            ("Visibility", self.visibility.as_str()),
            ("Wind", self.wind.as_str()),
        ]
    }
}

/// Unique city names of one country in ordinal order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CityList(Vec<String>);

impl CityList {
    pub fn contains(&self, city: &str) -> bool {
        self.0.binary_search_by(|c| c.as_str().cmp(city)).is_ok()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl FromIterator<String> for CityList {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let unique: BTreeSet<String> = iter.into_iter().collect();
        Self(unique.into_iter().collect())
    }
}
