//! Query string extractor that rejects with the standard error envelope.

use crate::errors::AppError;
use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;

/// Extractor for query parameters.
///
/// Unknown enum values or unparsable fields render through
/// [`AppError::QueryExtractorRejection`] as a 400 `VALIDATION_ERROR`.
///
/// ```ignore
/// use axum_helpers::extractors::QueryParams;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Filter {
///     category: Option<String>,
/// }
///
/// async fn list(QueryParams(filter): QueryParams<Filter>) -> String {
///     filter.category.unwrap_or_default()
/// }
/// ```
pub struct QueryParams<T>(pub T);

impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::from(e).into_response())?;

        Ok(QueryParams(params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        routing::get,
    };
    use http_body_util::BodyExt;
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Deserialize)]
    #[serde(rename_all = "lowercase")]
    enum Status {
        Active,
        Closed,
    }

    #[derive(Deserialize)]
    struct Filter {
        status: Option<Status>,
    }

    async fn handler(QueryParams(filter): QueryParams<Filter>) -> &'static str {
        match filter.status {
            Some(Status::Active) => "active",
            Some(Status::Closed) => "closed",
            None => "any",
        }
    }

    async fn get_uri(uri: &str) -> (StatusCode, Vec<u8>) {
        let response = Router::new()
            .route("/", get(handler))
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn test_parses_known_values() {
        let (status, body) = get_uri("/?status=closed").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"closed");

        let (_, body) = get_uri("/").await;
        assert_eq!(body, b"any");
    }

    #[tokio::test]
    async fn test_unknown_value_renders_envelope() {
        let (status, body) = get_uri("/?status=bogus").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], 1001);
        assert_eq!(json["error"], "VALIDATION_ERROR");
        assert!(json["message"].as_str().unwrap().contains("bogus"));
    }
}
