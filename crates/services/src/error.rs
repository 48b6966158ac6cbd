//! Service errors and the backend error-message convention.
//!
//! The backend reports failures as JSON with the human-readable text at
//! one of a few conventional fields. Whatever we extract here is shown
//! to the user verbatim, so the precedence matters: `error.details`,
//! then `error.error`, then top-level `details`, then a top-level
//! `error` string, and finally a generic transport message.

use thiserror::Error;

/// Shown when the failure carries no usable message (network errors,
/// unparseable bodies, non-JSON replies).
pub const GENERIC_TRANSPORT_MESSAGE: &str =
    "Could not reach the analysis service. Please check your connection and try again.";

/// Failure of one of the two remote operations. `Display` is the
/// user-visible text the controller stores or substitutes.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The backend replied with an error payload; the message has
    /// already been extracted.
    #[error("{0}")]
    Remote(String),
    /// The request never produced a usable reply.
    #[error("{}", GENERIC_TRANSPORT_MESSAGE)]
    Transport(#[from] reqwest::Error),
}

/// Build a [`ServiceError`] from a non-success response body.
pub fn remote_error(body: &str) -> ServiceError {
    let message = extract_message(body)
        .unwrap_or_else(|| GENERIC_TRANSPORT_MESSAGE.to_string());
    ServiceError::Remote(message)
}

fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    if let Some(error) = value.get("error") {
        for key in ["details", "error"] {
            if let Some(text) = error.get(key).and_then(|v| v.as_str()) {
                return Some(text.to_string());
            }
        }
        if let Some(text) = error.as_str() {
            // Prefer a sibling `details` over a bare `error` string.
            if let Some(details) = value.get("details").and_then(|v| v.as_str()) {
                return Some(details.to_string());
            }
            return Some(text.to_string());
        }
    }
    value
        .get("details")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_details_wins() {
        let err = remote_error(r#"{"error": {"details": "corrupt file", "error": "Analysis failed"}}"#);
        assert_eq!(err.to_string(), "corrupt file");
    }

    #[test]
    fn test_nested_error_when_no_details() {
        let err = remote_error(r#"{"error": {"error": "Analysis failed"}}"#);
        assert_eq!(err.to_string(), "Analysis failed");
    }

    #[test]
    fn test_flat_backend_shape() {
        // The backend's usual shape: a terse `error` string plus the
        // exception text under `details`.
        let err = remote_error(r#"{"error": "Analysis failed", "details": "no month columns"}"#);
        assert_eq!(err.to_string(), "no month columns");
    }

    #[test]
    fn test_bare_error_string() {
        let err = remote_error(r#"{"error": "Invalid file type"}"#);
        assert_eq!(err.to_string(), "Invalid file type");
    }

    #[test]
    fn test_unparseable_body_falls_back() {
        assert_eq!(remote_error("<html>502</html>").to_string(), GENERIC_TRANSPORT_MESSAGE);
        assert_eq!(remote_error("").to_string(), GENERIC_TRANSPORT_MESSAGE);
        assert_eq!(remote_error(r#"{"status": "weird"}"#).to_string(), GENERIC_TRANSPORT_MESSAGE);
    }
}
