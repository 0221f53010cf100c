use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::errors::AppError;

/// A single rejected field, reported back to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    /// Dotted location of the offending value, e.g. `body.founder_inputs.problems`.
    pub loc: String,
    pub msg: String,
}

impl FieldError {
    pub fn new(loc: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            loc: loc.into(),
            msg: msg.into(),
        }
    }
}

/// Constraints that serde cannot express, checked after a body deserializes.
pub trait Validate {
    fn validate(&self) -> Result<(), Vec<FieldError>>;
}

/// JSON body extractor that rejects malformed or constraint-violating input
/// before the handler runs.
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(rejection_to_error)?;
        value.validate().map_err(AppError::Validation)?;
        Ok(ValidJson(value))
    }
}

fn rejection_to_error(rejection: JsonRejection) -> AppError {
    match rejection {
        // Well-formed JSON with the wrong shape (missing field, wrong type).
        JsonRejection::JsonDataError(e) => AppError::Validation(vec![data_error_field(&e.body_text())]),
        other => AppError::BadRequest(other.body_text()),
    }
}

const DATA_ERROR_PREFIX: &str = "Failed to deserialize the JSON body into the target type: ";

/// Splits axum's `{path}: {message}` data error into a located field error.
/// Errors at the top level carry no path and are reported against `body`.
fn data_error_field(body_text: &str) -> FieldError {
    let detail = body_text.strip_prefix(DATA_ERROR_PREFIX).unwrap_or(body_text);
    match detail.split_once(": ") {
        Some((path, msg)) if !path.is_empty() && !path.contains(char::is_whitespace) => {
            FieldError::new(format!("body.{path}"), msg)
        }
        _ => FieldError::new("body", detail),
    }
}
