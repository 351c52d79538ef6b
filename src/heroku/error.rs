use http::{HeaderMap, StatusCode};
use serde::Deserialize;

const REQUEST_ID: &str = "request-id";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Missing config key {0}")]
    MissingConfig(&'static str),
    #[error("Failed to generate url {url} caused by {source:?}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    /// Error document of the platform api, e.g. `rate_limit` or `not_found`.
    #[error("Heroku api error {id} ({status}): {message}")]
    Api {
        status: StatusCode,
        id: String,
        message: String,
        request_id: Option<String>,
    },
    #[error("Received bad response with status {status:?} and body {body:?}")]
    BadResponse { status: StatusCode, body: String },
    #[error("Failed to deserialize response {content:?}")]
    Deserialization {
        content: String,
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct ErrorDocument {
    id: String,
    message: String,
}

impl Error {
    pub(super) fn from_response(status: StatusCode, headers: &HeaderMap, body: String) -> Self {
        match serde_json::from_str::<ErrorDocument>(&body) {
            Ok(document) => Error::Api {
                status,
                id: document.id,
                message: document.message,
                request_id: headers
                    .get(REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned),
            },
            Err(_) => Error::BadResponse { status, body },
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        match self {
            Error::Api { status, id, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || id == "rate_limit"
            }
            Error::BadResponse { status, .. } => *status == StatusCode::TOO_MANY_REQUESTS,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_error_document_becomes_api_error() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID, HeaderValue::from_static("01234567-89ab"));

        let error = Error::from_response(
            StatusCode::TOO_MANY_REQUESTS,
            &headers,
            r#"{"id":"rate_limit","message":"Your account reached the API rate limit"}"#.into(),
        );

        match &error {
            Error::Api {
                id,
                message,
                request_id,
                ..
            } => {
                assert_eq!("rate_limit", id);
                assert_eq!("Your account reached the API rate limit", message);
                assert_eq!(Some("01234567-89ab"), request_id.as_deref());
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(error.is_rate_limited());
        assert_eq!(
            "Heroku api error rate_limit (429 Too Many Requests): Your account reached the API rate limit",
            error.to_string()
        );
    }

    #[test]
    fn test_unstructured_body_becomes_bad_response() {
        let error = Error::from_response(
            StatusCode::BAD_GATEWAY,
            &HeaderMap::new(),
            "<html>upstream</html>".into(),
        );

        assert!(matches!(
            error,
            Error::BadResponse { status: StatusCode::BAD_GATEWAY, ref body } if body == "<html>upstream</html>"
        ));
        assert!(!error.is_rate_limited());
    }
}
