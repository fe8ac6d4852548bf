//! Request extractors whose rejections use the error taxonomy.
//!
//! axum's own `Json`, `Query` and `Path` reject malformed input with a plain-text
//! body. These wrappers turn every rejection into [`Error::Validation`] so clients
//! always get the JSON error shape.

use crate::errors::Error;
use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts, Path, Query, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::request::Parts,
};
use serde::de::DeserializeOwned;

/// JSON request body
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

/// URL query string
#[derive(Debug)]
pub struct ApiQuery<T>(pub T);

/// Path parameters
#[derive(Debug)]
pub struct ApiPath<T>(pub T);

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation {
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation {
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation {
            message: rejection.body_text(),
        }
    }
}

impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use axum::{body::Body, http::Request as HttpRequest};

    #[derive(Debug, serde::Deserialize)]
    struct AmountBody {
        #[allow(dead_code)]
        amount: f64,
    }

    #[tokio::test]
    async fn test_malformed_json_is_validation_error() {
        let req = HttpRequest::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"amount":"lots"}"#))
            .unwrap();
        let err = ApiJson::<AmountBody>::from_request(req, &()).await.unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[tokio::test]
    async fn test_missing_content_type_is_validation_error() {
        let req = HttpRequest::builder()
            .method("POST")
            .body(Body::from(r#"{"amount":1.0}"#))
            .unwrap();
        let err = ApiJson::<AmountBody>::from_request(req, &()).await.unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }
}
