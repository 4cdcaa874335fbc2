//! Caller extractor
//!
//! Authentication happens upstream; the proxy forwards the authenticated
//! user's id in the `x-user-id` header.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tuning_core::UserId;

use crate::response::{ApiError, USER_ID_HEADER};

/// Identity of the user making the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or(ApiError::MissingCaller)?
            .to_str()
            .map_err(|_| ApiError::InvalidCaller)?;

        let user_id = raw.parse::<UserId>().map_err(|_| {
            tracing::warn!(value = raw, "Malformed caller id");
            ApiError::InvalidCaller
        })?;

        Ok(Self { user_id })
    }
}
