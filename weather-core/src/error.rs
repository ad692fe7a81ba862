use std::fmt;

use thiserror::Error;

/// Message returned to clients for any upstream failure. The cause is logged,
/// never echoed.
pub const GENERIC_FAILURE: &str = "An error occurred while processing your request";

/// Failure while talking to an external source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("http error ({status}): {message}")]
    Http { status: u16, message: String },
    #[error("SOAP fault: {0}")]
    Fault(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<quick_xml::Error> for SourceError {
    fn from(error: quick_xml::Error) -> Self {
        SourceError::Malformed(error.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(error: serde_json::Error) -> Self {
        SourceError::Malformed(error.to_string())
    }
}

/// Query parameter being validated; used in client-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Country,
    City,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Country => "Country",
            Field::City => "City",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    Empty,
    TooLong,
}

/// Errors a request can end with. All of them are reported as 400-class
/// responses using their `Display` text.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("{}", invalid_input_message(*field, *reason))]
    InvalidInput { field: Field, reason: InvalidReason },

    #[error("The city {city} does not belong to country {country}")]
    InvalidCityCountryPair { city: String, country: String },

    #[error("An error occurred while processing your request")]
    UpstreamUnavailable(#[source] SourceError),
}

fn invalid_input_message(field: Field, reason: InvalidReason) -> String {
    match reason {
        InvalidReason::Empty => format!("Cannot search for {field} using empty string input"),
        InvalidReason::TooLong => format!("{field}'s name exceeds more than 100 characters"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_message_does_not_leak_cause() {
        let err = RequestError::UpstreamUnavailable(SourceError::Fault(
            "System.Web.Services.Protocols.SoapException: Server was unable".into(),
        ));

        assert_eq!(err.to_string(), GENERIC_FAILURE);
        let source = std::error::Error::source(&err).expect("cause is kept as source");
        assert!(source.to_string().contains("SoapException"));
    }

    #[test]
    fn invalid_input_messages_name_the_field() {
        let empty = RequestError::InvalidInput {
            field: Field::Country,
            reason: InvalidReason::Empty,
        };
        let long = RequestError::InvalidInput {
            field: Field::City,
            reason: InvalidReason::TooLong,
        };

        assert_eq!(empty.to_string(), "Cannot search for Country using empty string input");
        assert_eq!(long.to_string(), "City's name exceeds more than 100 characters");
    }
}
