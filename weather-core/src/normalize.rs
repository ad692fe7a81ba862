//! Mapping of each source's payload onto [`WeatherInfo`].

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::{
    dataset::{self, Row},
    error::SourceError,
    model::{DataSource, NO_DATA, TIME_FORMAT, WeatherInfo},
    provider::openweathermap::{OwmCurrentWeather, Units},
};

const OWM_ICON_BASE: &str = "http://openweathermap.org/img/w/";

/// Typed view of one GlobalWeather forecast record.
#[derive(Debug, Clone, PartialEq, Eq)]
struct GlobalWeatherReport {
    location: String,
    time: String,
    wind: String,
    visibility: String,
    sky_conditions: String,
    temperature: String,
    dew_point: String,
    relative_humidity: String,
    pressure: String,
    weather: Option<String>,
    precipitation: Option<String>,
    icon_uri: Option<String>,
}

impl GlobalWeatherReport {
    fn from_row(mut row: Row) -> Result<Self, SourceError> {
        Ok(Self {
            location: required(&mut row, "Location")?,
            time: required(&mut row, "Time")?,
            wind: required(&mut row, "Wind")?,
            visibility: required(&mut row, "Visibility")?,
            sky_conditions: required(&mut row, "SkyConditions")?,
            temperature: required(&mut row, "Temperature")?,
            dew_point: required(&mut row, "DewPoint")?,
            relative_humidity: required(&mut row, "RelativeHumidity")?,
            pressure: required(&mut row, "Pressure")?,
            weather: row.remove("Weather"),
            precipitation: row.remove("Precipitation"),
            icon_uri: row.remove("IconUri"),
        })
    }
}

fn required(row: &mut Row, field: &'static str) -> Result<String, SourceError> {
    row.remove(field)
        .ok_or_else(|| SourceError::Malformed(format!("forecast record has no {field} field")))
}

/// Normalize a GlobalWeather `GetWeather` payload.
pub fn from_global_weather(payload: &str) -> Result<WeatherInfo, SourceError> {
    let row = dataset::first_record(payload)?
        .ok_or_else(|| SourceError::Malformed("forecast payload has no record".to_string()))?;
    let report = GlobalWeatherReport::from_row(row)?;

    Ok(WeatherInfo {
        data_source: DataSource::GlobalWeather,
        location: display(report.location),
        time: display(normalize_global_weather_time(&report.time)),
        temperature: display(report.temperature),
        pressure: display(report.pressure),
        sky_conditions: display(report.sky_conditions),
        precipitation: display(report.precipitation.unwrap_or_default()),
        weather: display(report.weather.unwrap_or_default()),
        icon_uri: display(report.icon_uri.unwrap_or_default()),
        dew_point: display(report.dew_point),
        relative_humidity: display(report.relative_humidity),
        visibility: display(report.visibility),
        wind: display(report.wind),
    })
}

/// Normalize an OpenWeatherMap current-weather response fetched in `units`.
pub fn from_open_weather_map(
    current: &OwmCurrentWeather,
    units: Units,
) -> Result<WeatherInfo, SourceError> {
    let observed = DateTime::<Utc>::from_timestamp(current.dt, 0).ok_or_else(|| {
        SourceError::Malformed(format!("observation time {} out of range", current.dt))
    })?;

    let condition = current.weather.first();

    let precipitation = current
        .rain
        .as_ref()
        .and_then(|p| p.amount())
        .or_else(|| current.snow.as_ref().and_then(|p| p.amount()))
        .unwrap_or(0.0);

    let wind = current.wind.as_ref().map(|w| {
        let speed_mps = match units {
            Units::Metric => w.speed,
            Units::Imperial => w.speed * 0.44704,
        };
        let mut text = format!("{} {}{}", beaufort_name(speed_mps), w.speed, units.speed_suffix());
        if let Some(deg) = w.deg {
            text.push_str(", ");
            text.push_str(compass_name(deg));
        }
        text
    });

    Ok(WeatherInfo {
        data_source: DataSource::OpenWeatherMap,
        location: display(current.name.clone()),
        time: observed.format(TIME_FORMAT).to_string(),
        temperature: format!("{} {}", current.main.temp, units.temperature_suffix()),
        pressure: format!("{} hPa", current.main.pressure),
        sky_conditions: current
            .clouds
            .as_ref()
            .map(|c| cloud_cover_name(c.all).to_string())
            .unwrap_or_else(|| NO_DATA.to_string()),
        precipitation: format!("{precipitation} mm"),
        weather: display(condition.map(|c| c.description.clone()).unwrap_or_default()),
        icon_uri: condition
            .filter(|c| !c.icon.is_empty())
            .map(|c| format!("{OWM_ICON_BASE}{}.png", c.icon))
            .unwrap_or_else(|| NO_DATA.to_string()),
        dew_point: NO_DATA.to_string(),
        relative_humidity: format!("{}%", current.main.humidity),
        visibility: NO_DATA.to_string(),
        wind: wind.unwrap_or_else(|| NO_DATA.to_string()),
    })
}

/// Fixed, clearly fabricated forecast used when no source has data.
pub fn placeholder(city: &str, now: DateTime<Utc>) -> WeatherInfo {
    WeatherInfo {
        data_source: DataSource::Placeholder,
        location: city.to_string(),
        time: now.format(TIME_FORMAT).to_string(),
        temperature: "23 C".to_string(),
        pressure: "1014 hpa".to_string(),
        sky_conditions: "Sunny".to_string(),
        precipitation: "0".to_string(),
        weather: "Sunny".to_string(),
        icon_uri: format!("{OWM_ICON_BASE}01d.png"),
        dew_point: NO_DATA.to_string(),
        relative_humidity: "70%".to_string(),
        visibility: NO_DATA.to_string(),
        wind: "1.5 m/s".to_string(),
    }
}

fn display(value: String) -> String {
    if value.trim().is_empty() {
        NO_DATA.to_string()
    } else {
        value
    }
}

/// GlobalWeather reports local and UTC time together, e.g.
/// `Mar 11, 2016 - 08:00 PM EST / 2016.03.12 0100 UTC`. The UTC part is
/// reformatted; anything else is returned unchanged.
fn normalize_global_weather_time(raw: &str) -> String {
    let utc_part = raw.rsplit('/').next().unwrap_or(raw).trim();

    utc_part
        .strip_suffix("UTC")
        .and_then(|stamp| NaiveDateTime::parse_from_str(stamp.trim(), "%Y.%m.%d %H%M").ok())
        .or_else(|| NaiveDateTime::parse_from_str(raw.trim(), TIME_FORMAT).ok())
        .map(|dt| dt.format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn cloud_cover_name(percent: f64) -> &'static str {
    match percent {
        p if p <= 10.0 => "clear sky",
        p if p <= 25.0 => "few clouds",
        p if p <= 50.0 => "scattered clouds",
        p if p <= 84.0 => "broken clouds",
        _ => "overcast clouds",
    }
}

fn beaufort_name(speed_mps: f64) -> &'static str {
    const SCALE: [(f64, &str); 12] = [
        (0.5, "Calm"),
        (1.6, "Light air"),
        (3.4, "Light breeze"),
        (5.5, "Gentle Breeze"),
        (8.0, "Moderate breeze"),
        (10.8, "Fresh Breeze"),
        (13.9, "Strong breeze"),
        (17.2, "High wind, near gale"),
        (20.8, "Gale"),
        (24.5, "Severe Gale"),
        (28.5, "Storm"),
        (32.7, "Violent Storm"),
    ];

    SCALE
        .iter()
        .find(|(upper, _)| speed_mps < *upper)
        .map(|(_, name)| *name)
        .unwrap_or("Hurricane")
}

fn compass_name(deg: f64) -> &'static str {
    const POINTS: [&str; 16] = [
        "North",
        "North-northeast",
        "NorthEast",
        "East-northeast",
        "East",
        "East-southeast",
        "SouthEast",
        "South-southeast",
        "South",
        "South-southwest",
        "SouthWest",
        "West-southwest",
        "West",
        "West-northwest",
        "NorthWest",
        "North-northwest",
    ];

    let index = (deg.rem_euclid(360.0) / 22.5 + 0.5).floor() as usize % POINTS.len();
    POINTS[index]
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::provider::openweathermap::tests::CANBERRA;

    const CANBERRA_REPORT: &str = "<?xml version=\"1.0\" encoding=\"utf-16\"?>\
        <NewDataSet><Table>\
        <Location>Canberra, Australia (YSCB) 35-18S 149-11E 580M</Location>\
        <Time>Mar 11, 2016 - 08:00 PM EST / 2016.03.12 0100 UTC</Time>\
        <Wind> from the NW (320 degrees) at 9 MPH (8 KT):0</Wind>\
        <Visibility> greater than 7 mile(s):0</Visibility>\
        <SkyConditions> partly cloudy</SkyConditions>\
        <Temperature> 75 F (24 C)</Temperature>\
        <DewPoint> 53 F (12 C)</DewPoint>\
        <RelativeHumidity> 46%</RelativeHumidity>\
        <Pressure> 29.97 in. Hg (1015 hPa)</Pressure>\
        <Weather>Sunny</Weather>\
        <Precipitation></Precipitation>\
        <IconUri />\
        </Table></NewDataSet>";

    fn no_field_missing(info: &WeatherInfo) {
        for (name, value) in info.display_fields() {
            assert!(!value.trim().is_empty(), "{name} should never be empty");
        }
    }

    #[test]
    fn global_weather_report_maps_every_field() {
        let info = from_global_weather(CANBERRA_REPORT).unwrap();

        assert_eq!(info.data_source, DataSource::GlobalWeather);
        assert_eq!(info.location, "Canberra, Australia (YSCB) 35-18S 149-11E 580M");
        assert_eq!(info.time, "2016-03-12 01:00:00");
        assert_eq!(info.temperature, "75 F (24 C)");
        assert_eq!(info.pressure, "29.97 in. Hg (1015 hPa)");
        assert_eq!(info.relative_humidity, "46%");
        assert_eq!(info.weather, "Sunny");
        assert_eq!(info.precipitation, NO_DATA);
        assert_eq!(info.icon_uri, NO_DATA);
        no_field_missing(&info);
    }

    #[test]
    fn global_weather_optional_fields_default_to_no_data() {
        let payload = "<CurrentWeather>\
            <Location>Perth</Location><Time>2016-03-12 01:00:00</Time><Wind>calm</Wind>\
            <Visibility /><SkyConditions>clear</SkyConditions><Temperature>30 C</Temperature>\
            <DewPoint>10 C</DewPoint><RelativeHumidity>20%</RelativeHumidity>\
            <Pressure>1010 hPa</Pressure><Status>Success</Status></CurrentWeather>";

        let info = from_global_weather(payload).unwrap();

        assert_eq!(info.time, "2016-03-12 01:00:00");
        assert_eq!(info.visibility, NO_DATA);
        assert_eq!(info.weather, NO_DATA);
        assert_eq!(info.precipitation, NO_DATA);
        no_field_missing(&info);
    }

    #[test]
    fn global_weather_missing_required_field_is_structural_error() {
        let payload = CANBERRA_REPORT.replace("<DewPoint> 53 F (12 C)</DewPoint>", "");
        let err = from_global_weather(&payload).unwrap_err();

        match err {
            SourceError::Malformed(message) => assert!(message.contains("DewPoint")),
            other => panic!("expected structural error, got {other:?}"),
        }
    }

    #[test]
    fn global_weather_payload_without_record_is_structural_error() {
        assert!(matches!(
            from_global_weather("<NewDataSet />"),
            Err(SourceError::Malformed(_))
        ));
        assert!(matches!(
            from_global_weather("Data Not Found"),
            Err(SourceError::Malformed(_))
        ));
    }

    #[test]
    fn unknown_time_format_passes_through() {
        assert_eq!(normalize_global_weather_time("yesterday"), "yesterday");
        assert_eq!(
            normalize_global_weather_time("2016.03.12 0100 UTC"),
            "2016-03-12 01:00:00"
        );
    }

    #[test]
    fn open_weather_map_response_is_composed_into_display_strings() {
        let current: OwmCurrentWeather = serde_json::from_str(CANBERRA).unwrap();
        let info = from_open_weather_map(&current, Units::Metric).unwrap();

        assert_eq!(info.data_source, DataSource::OpenWeatherMap);
        assert_eq!(info.location, "Canberra");
        assert_eq!(info.time, "2016-03-12 01:00:00");
        assert_eq!(info.temperature, "18.5 C");
        assert_eq!(info.pressure, "1016 hPa");
        assert_eq!(info.relative_humidity, "64%");
        assert_eq!(info.sky_conditions, "broken clouds");
        assert_eq!(info.precipitation, "0.25 mm");
        assert_eq!(info.weather, "broken clouds");
        assert_eq!(info.icon_uri, "http://openweathermap.org/img/w/04d.png");
        assert_eq!(info.wind, "Gentle Breeze 4.1m/s, West-northwest");
        assert_eq!(info.dew_point, NO_DATA);
        assert_eq!(info.visibility, NO_DATA);
        no_field_missing(&info);
    }

    #[test]
    fn open_weather_map_sparse_response_still_has_every_field() {
        let current: OwmCurrentWeather = serde_json::from_str(
            r#"{"name": "", "dt": 0, "main": {"temp": -2, "pressure": 990, "humidity": 90}}"#,
        )
        .unwrap();
        let info = from_open_weather_map(&current, Units::Metric).unwrap();

        assert_eq!(info.time, "1970-01-01 00:00:00");
        assert_eq!(info.location, NO_DATA);
        assert_eq!(info.temperature, "-2 C");
        assert_eq!(info.precipitation, "0 mm");
        assert_eq!(info.wind, NO_DATA);
        assert_eq!(info.sky_conditions, NO_DATA);
        no_field_missing(&info);
    }

    #[test]
    fn placeholder_is_tagged_and_names_the_city() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 5).unwrap();
        let info = placeholder("Adelaide Airport", now);

        assert_eq!(info.data_source, DataSource::Placeholder);
        assert_eq!(info.location, "Adelaide Airport");
        assert_eq!(info.time, "2024-05-01 09:30:05");
        assert_eq!(info.temperature, "23 C");
        assert_eq!(info.pressure, "1014 hpa");
        no_field_missing(&info);
    }

    #[test]
    fn wind_names_follow_scales() {
        assert_eq!(beaufort_name(0.0), "Calm");
        assert_eq!(beaufort_name(4.1), "Gentle Breeze");
        assert_eq!(beaufort_name(40.0), "Hurricane");
        assert_eq!(compass_name(0.0), "North");
        assert_eq!(compass_name(359.0), "North");
        assert_eq!(compass_name(180.0), "South");
        assert_eq!(compass_name(225.0), "SouthWest");
    }
}
