//! Small helpers that turn results into HTTP responses.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

const JSON: &str = "application/json";

/// Serialize `value` as a 200 JSON response. A serialization failure becomes
/// a plain-text 500 carrying the serializer's message.
pub fn write_json<T: Serialize + ?Sized>(value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(bytes) => (StatusCode::OK, [(header::CONTENT_TYPE, JSON)], bytes).into_response(),
        Err(e) => plain_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

/// Plain-text error body: the message followed by a newline.
pub fn plain_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        format!("{message}\n"),
    )
        .into_response()
}

/// Successful HEAD: JSON content type, no body.
pub fn head_ok() -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, JSON)]).into_response()
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::json;

    async fn body_of(res: Response) -> anyhow::Result<String> {
        let bytes = to_bytes(res.into_body(), usize::MAX).await?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    fn content_type(res: &Response) -> Option<&str> {
        res.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    #[tokio::test]
    async fn json_is_written_with_200() -> anyhow::Result<()> {
        let res = write_json(&json!({"id": "1", "name": "x"}));
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(content_type(&res), Some("application/json"));
        assert_eq!(body_of(res).await?, r#"{"id":"1","name":"x"}"#);
        Ok(())
    }

    #[tokio::test]
    async fn serialization_failure_is_a_plain_500() -> anyhow::Result<()> {
        struct Unsupported;
        impl Serialize for Unsupported {
            fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
                Err(serde::ser::Error::custom("unsupported value"))
            }
        }

        let res = write_json(&Unsupported);
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(content_type(&res), Some("text/plain; charset=utf-8"));
        assert_eq!(body_of(res).await?, "unsupported value\n");
        Ok(())
    }

    #[tokio::test]
    async fn plain_error_sets_nosniff_and_newline() -> anyhow::Result<()> {
        let res = plain_error(StatusCode::BAD_REQUEST, "Invalid Id");
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            res.headers().get(header::X_CONTENT_TYPE_OPTIONS).map(|v| v.as_bytes()),
            Some(&b"nosniff"[..])
        );
        assert_eq!(body_of(res).await?, "Invalid Id\n");
        Ok(())
    }

    #[tokio::test]
    async fn head_ok_has_no_body() -> anyhow::Result<()> {
        let res = head_ok();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(content_type(&res), Some("application/json"));
        assert!(body_of(res).await?.is_empty());
        Ok(())
    }
}
