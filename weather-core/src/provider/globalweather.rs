use async_trait::async_trait;
use quick_xml::{Reader, escape::escape, events::Event};
use reqwest::{Client, header::CONTENT_TYPE};
use tracing::{debug, instrument};

use crate::{
    dataset::{self, TABLE_TAG},
    error::SourceError,
    provider::{CityDirectory, PrimaryForecast, PrimaryReply, truncate_body},
};

pub const DEFAULT_ENDPOINT: &str = "http://www.webservicex.net/globalweather.asmx";

/// Value of `GetWeatherResult` when the service has no forecast.
pub const NOT_FOUND_SENTINEL: &str = "Data Not Found";

const SOAP_NAMESPACE: &str = "http://www.webserviceX.NET";
const CITY_COLUMN: &str = "City";

/// SOAP 1.1 client for the GlobalWeather web service. Serves both the city
/// directory and the primary forecast.
#[derive(Debug, Clone)]
pub struct GlobalWeatherClient {
    http: Client,
    endpoint: String,
}

impl GlobalWeatherClient {
    pub fn new(http: Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    /// Invoke `operation` and return the text of its `<operation>Result`
    /// element, or `None` when the response has no such element.
    async fn call(
        &self,
        operation: &str,
        params: &[(&str, &str)],
    ) -> Result<Option<String>, SourceError> {
        let res = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", format!("\"{SOAP_NAMESPACE}/{operation}\""))
            .body(envelope(operation, params))
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            // Faults come back as 500 with a regular envelope.
            if let Err(fault @ SourceError::Fault(_)) = read_result(&body, operation) {
                return Err(fault);
            }
            return Err(SourceError::Http {
                status: status.as_u16(),
                message: truncate_body(&body),
            });
        }

        read_result(&body, operation)
    }
}

#[async_trait]
impl CityDirectory for GlobalWeatherClient {
    #[instrument(skip(self))]
    async fn cities_by_country(&self, country: &str) -> Result<Vec<String>, SourceError> {
        let payload = self
            .call("GetCitiesByCountry", &[("CountryName", country)])
            .await?
            .ok_or_else(|| {
                SourceError::Malformed("response has no GetCitiesByCountryResult".to_string())
            })?;

        if payload.trim().is_empty() {
            return Ok(Vec::new());
        }

        let rows = dataset::parse_rows(&payload, TABLE_TAG)?;
        debug!(rows = rows.len(), "directory rows received");

        let mut cities = Vec::with_capacity(rows.len());
        for mut row in rows {
            let city = row.remove(CITY_COLUMN).ok_or_else(|| {
                SourceError::Malformed(format!("{TABLE_TAG} row without {CITY_COLUMN} column"))
            })?;
            if !city.is_empty() {
                cities.push(city);
            }
        }

        Ok(cities)
    }
}

#[async_trait]
impl PrimaryForecast for GlobalWeatherClient {
    #[instrument(skip(self))]
    async fn weather(&self, city: &str, country: &str) -> Result<PrimaryReply, SourceError> {
        let payload = self
            .call("GetWeather", &[("CityName", city), ("CountryName", country)])
            .await?;

        Ok(match payload {
            Some(report) if !is_not_found(&report) => PrimaryReply::Report(report),
            _ => PrimaryReply::NotFound,
        })
    }
}

fn is_not_found(payload: &str) -> bool {
    let trimmed = payload.trim();
    trimmed.is_empty() || trimmed == NOT_FOUND_SENTINEL
}

fn envelope(operation: &str, params: &[(&str, &str)]) -> String {
    let params: String = params
        .iter()
        .map(|(name, value)| format!("<{name}>{}</{name}>", escape(*value)))
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <{operation} xmlns="{SOAP_NAMESPACE}">{params}</{operation}>
  </soap:Body>
</soap:Envelope>"#
    )
}

enum Capture {
    Result,
    FaultString,
}

/// Pull the unescaped `<operation>Result` text out of a SOAP envelope.
fn read_result(body: &str, operation: &str) -> Result<Option<String>, SourceError> {
    let result_tag = format!("{operation}Result");
    let mut reader = Reader::from_str(body);

    let mut capture: Option<Capture> = None;
    let mut result: Option<String> = None;
    let mut fault: Option<String> = None;
    let mut in_fault = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"Fault" => in_fault = true,
                b"faultstring" if in_fault => {
                    capture = Some(Capture::FaultString);
                    fault = Some(String::new());
                }
                name if name == result_tag.as_bytes() => {
                    capture = Some(Capture::Result);
                    result = Some(String::new());
                }
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == result_tag.as_bytes() => {
                return Ok(Some(String::new()));
            }
            Event::Text(t) => {
                let target = match capture {
                    Some(Capture::Result) => result.as_mut(),
                    Some(Capture::FaultString) => fault.as_mut(),
                    None => None,
                };
                if let Some(buf) = target {
                    buf.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let (Some(Capture::Result), Some(buf)) = (&capture, result.as_mut()) {
                    buf.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"Fault" => {
                    let message = fault.unwrap_or_default().trim().to_string();
                    return Err(SourceError::Fault(message));
                }
                b"faultstring" => capture = None,
                name if name == result_tag.as_bytes() => return Ok(result),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_string_contains, header, method, path},
    };

    use super::*;
    use crate::provider::http_client;

    fn soap_response(operation: &str, inner: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <{operation}Response xmlns="http://www.webserviceX.NET">
      <{operation}Result>{}</{operation}Result>
    </{operation}Response>
  </soap:Body>
</soap:Envelope>"#,
            escape(inner)
        )
    }

    const FAULT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <soap:Fault>
      <faultcode>soap:Server</faultcode>
      <faultstring>Server was unable to process request.</faultstring>
    </soap:Fault>
  </soap:Body>
</soap:Envelope>"#;

    async fn client_for(server: &MockServer, timeout: Duration) -> GlobalWeatherClient {
        GlobalWeatherClient::new(
            http_client(timeout).unwrap(),
            format!("{}/globalweather.asmx", server.uri()),
        )
    }

    #[tokio::test]
    async fn cities_by_country_sends_soap_request_and_reads_city_column() {
        let server = MockServer::start().await;
        let data_set = "<NewDataSet>\
            <Table><Country>Australia</Country><City>Sydney Airport</City></Table>\
            <Table><Country>Australia</Country><City>Canberra</City></Table>\
            <Table><Country>Australia</Country><City>Canberra</City></Table>\
            </NewDataSet>";

        Mock::given(method("POST"))
            .and(path("/globalweather.asmx"))
            .and(header("SOAPAction", "\"http://www.webserviceX.NET/GetCitiesByCountry\""))
            .and(body_string_contains("<CountryName>Australia</CountryName>"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(soap_response("GetCitiesByCountry", data_set)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5)).await;
        let cities = client.cities_by_country("Australia").await.unwrap();

        assert_eq!(cities, ["Sydney Airport", "Canberra", "Canberra"]);
    }

    #[tokio::test]
    async fn unknown_country_yields_empty_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(soap_response("GetCitiesByCountry", "<NewDataSet />")),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5)).await;
        assert!(client.cities_by_country("123").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn parameters_are_xml_escaped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("<CountryName>Trinidad &amp; Tobago</CountryName>"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(soap_response("GetCitiesByCountry", "<NewDataSet />")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5)).await;
        client.cities_by_country("Trinidad & Tobago").await.unwrap();
    }

    #[tokio::test]
    async fn soap_fault_is_reported_as_fault() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string(FAULT))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5)).await;
        let err = client.cities_by_country("Australia").await.unwrap_err();

        match err {
            SourceError::Fault(message) => {
                assert_eq!(message, "Server was unable to process request.")
            }
            other => panic!("expected fault, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_soap_error_page_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("<html>down</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5)).await;
        let err = client.weather("Canberra", "Australia").await.unwrap_err();
        assert!(matches!(err, SourceError::Http { status: 503, .. }));
    }

    #[tokio::test]
    async fn slow_upstream_times_out_as_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(soap_response("GetWeather", NOT_FOUND_SENTINEL))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_millis(100)).await;
        let err = client.weather("Canberra", "Australia").await.unwrap_err();
        assert!(matches!(err, SourceError::Transport(_)));
    }

    #[tokio::test]
    async fn weather_sentinel_and_empty_result_are_not_found() {
        for inner in [NOT_FOUND_SENTINEL, "", "  "] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(header("SOAPAction", "\"http://www.webserviceX.NET/GetWeather\""))
                .and(body_string_contains("<CityName>Canberra</CityName>"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_string(soap_response("GetWeather", inner)),
                )
                .mount(&server)
                .await;

            let client = client_for(&server, Duration::from_secs(5)).await;
            let reply = client.weather("Canberra", "Australia").await.unwrap();
            assert_eq!(reply, PrimaryReply::NotFound, "payload {inner:?}");
        }
    }

    #[tokio::test]
    async fn weather_report_is_returned_unescaped() {
        let server = MockServer::start().await;
        let report = "<NewDataSet><Table><Location>Canberra</Location></Table></NewDataSet>";
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(soap_response("GetWeather", report)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5)).await;
        let reply = client.weather("Canberra", "Australia").await.unwrap();
        assert_eq!(reply, PrimaryReply::Report(report.to_string()));
    }

    #[test]
    fn self_closing_result_is_empty_payload() {
        let body = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body><GetWeatherResponse xmlns="http://www.webserviceX.NET"><GetWeatherResult /></GetWeatherResponse></soap:Body></soap:Envelope>"#;
        assert_eq!(read_result(body, "GetWeather").unwrap(), Some(String::new()));
    }

    #[test]
    fn missing_result_element_is_none() {
        let body = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body /></soap:Envelope>"#;
        assert_eq!(read_result(body, "GetWeather").unwrap(), None);
    }
}
