//! # Validated Body Extractor
//!
//! [`Valid<T>`] hands a handler the typed form of a body its route's gate
//! has already accepted. It reads the [`ValidBody`] the gate left in the
//! request extensions and converts it with [`ValidBody::decode`], so a
//! handler can only ever receive data that passed the schema `T` is bound
//! to. A route missing its gate fails with a 500 instead of running on
//! unchecked input.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsongate_schema::{Conforming, ValidBody};

use crate::error::AppError;

/// Typed request body that passed its schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct Valid<T>(pub T);

impl<T, S> FromRequestParts<S> for Valid<T>
where
    T: Conforming + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let body = parts
            .extensions
            .remove::<ValidBody>()
            .ok_or(AppError::MissingValidatedBody(T::SCHEMA))?;
        Ok(Valid(body.decode::<T>()?))
    }
}
