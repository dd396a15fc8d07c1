//! Request extractors that reject in the response envelope.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use cadence_core::entry::{EntryPatch, NewEntry};
use cadence_core::report::{NewReport, ReportPatch};

use crate::error::ApiError;

/// A request body type nested under a top-level key.
pub trait BodyKey: DeserializeOwned {
    /// The top-level key, e.g. `report`.
    const KEY: &'static str;
}

impl BodyKey for NewReport {
    const KEY: &'static str = "report";
}

impl BodyKey for ReportPatch {
    const KEY: &'static str = "report";
}

impl BodyKey for NewEntry {
    const KEY: &'static str = "entry";
}

impl BodyKey for EntryPatch {
    const KEY: &'static str = "entry";
}

/// JSON body of the shape `{ "<key>": { … } }`.
///
/// Malformed JSON, a missing key or a mistyped field is a bad request.
#[derive(Debug)]
pub struct Wrapped<T>(pub T);

impl<S, T> FromRequest<S> for Wrapped<T>
where
    S: Send + Sync,
    T: BodyKey,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(mut body) = Json::<serde_json::Value>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

        let inner = body
            .get_mut(T::KEY)
            .map(serde_json::Value::take)
            .filter(serde_json::Value::is_object)
            .ok_or_else(|| ApiError::bad_request(format!("Missing `{}` object", T::KEY)))?;

        serde_json::from_value(inner)
            .map(Wrapped)
            .map_err(|e| ApiError::bad_request(format!("Malformed `{}`: {e}", T::KEY)))
    }
}

/// A single UUID path parameter.
#[derive(Debug, Clone, Copy)]
pub struct IdPath(pub Uuid);

impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<Uuid>::from_request_parts(parts, state)
            .await
            .map(|Path(id)| Self(id))
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
    }
}

/// Query string parameters.
#[derive(Debug)]
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| Self(value))
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
    }
}
