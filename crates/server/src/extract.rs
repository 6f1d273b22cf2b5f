//! Extractors whose rejections render as [`ServerError`] JSON bodies.

use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts, Path, Query, Request, rejection::PathRejection,
    },
    http::request::Parts,
};
use engine::EngineError;
use serde::de::DeserializeOwned;

use crate::ServerError;

pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// A record id taken from the path.
///
/// A segment that is not an integer cannot name any record, so it answers
/// 404 like an unknown id.
pub struct IdPath(pub i64);

impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<i64>::from_request_parts(parts, state).await {
            Ok(Path(id)) => Ok(Self(id)),
            Err(PathRejection::FailedToDeserializePathParams(err)) => {
                tracing::debug!("non-integer record id: {}", err.body_text());
                Err(EngineError::KeyNotFound("record not exists".to_string()).into())
            }
            Err(rejection) => Err(rejection.into()),
        }
    }
}
