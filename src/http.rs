use axum::{
    async_trait,
    body::Bytes,
    extract::{rejection::BytesRejection, FromRequest, Request},
    http::StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use crate::error::ApiError;

/// JSON request body. An empty body is read as `{}`; the Content-Type header
/// is not required. Any failure is a validation error.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(reject_bytes)?;
        parse_body(&bytes).map(JsonBody)
    }
}

fn reject_bytes(rejection: BytesRejection) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::validation(rejection.body_text())
    }
}

pub(crate) fn parse_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    let raw: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        bytes
    };
    serde_json::from_slice(raw).map_err(|e| {
        warn!(error = %e, "rejected request body");
        ApiError::validation(format!("invalid request body: {e}"))
    })
}

/// `{"ok": true}` acknowledgement.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    pub const fn ok() -> Self {
        Self { ok: true }
    }
}

/// Answers bare `OPTIONS` requests; real preflights are handled by the CORS layer.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default)]
        name: String,
    }

    #[test]
    fn empty_body_reads_as_empty_object() {
        let p: Sample = parse_body(b"").unwrap();
        assert_eq!(p.name, "");
        let p: Sample = parse_body(b"  \n").unwrap();
        assert_eq!(p.name, "");
    }

    #[test]
    fn malformed_body_is_a_validation_error() {
        let err = parse_body::<Sample>(b"{not json").unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn wrong_types_are_rejected() {
        let err = parse_body::<Sample>(br#"{"name": 5}"#).unwrap_err();
        assert!(err.to_string().starts_with("invalid request body"));
    }
}
