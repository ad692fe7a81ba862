//! Input rule shared by the request handler and the gateway HTTP client.

use crate::error::{Field, InvalidReason, RequestError};

/// Longest accepted country or city name, in Unicode scalar values. Names
/// outside the Basic Multilingual Plane count one per character, not one per
/// UTF-16 code unit.
pub const MAX_NAME_LEN: usize = 100;

/// `true` when `value` is present, non-empty and at most [`MAX_NAME_LEN`]
/// characters long.
pub fn is_valid(value: Option<&str>) -> bool {
    check(value).is_ok()
}

/// Like [`is_valid`], but reports which field failed and why.
pub fn validate(value: Option<&str>, field: Field) -> Result<&str, RequestError> {
    check(value).map_err(|reason| RequestError::InvalidInput { field, reason })
}

fn check(value: Option<&str>) -> Result<&str, InvalidReason> {
    match value {
        None | Some("") => Err(InvalidReason::Empty),
        Some(s) if s.chars().count() > MAX_NAME_LEN => Err(InvalidReason::TooLong),
        Some(s) => Ok(s),
    }
}
