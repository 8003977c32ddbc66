//! URL and input validation utilities

use url::Url;

use crate::core::models::{CoreError, CoreResult};

/// Parse and validate a URL string
pub fn validate_url(url: &str) -> CoreResult<Url> {
    let parsed = Url::parse(url).map_err(|err| CoreError::InvalidUrl {
        url: url.to_string(),
        reason: err.to_string(),
    })?;

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(CoreError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme {scheme:?}"),
        });
    }
    Ok(parsed)
}

/// Check if a string is a plausible media URL
pub fn is_valid_media_url(url: &str) -> bool {
    validate_url(url).is_ok()
}
