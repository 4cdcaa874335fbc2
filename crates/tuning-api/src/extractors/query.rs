//! Page query extractor
//!
//! Parses and validates `?page=&size=&sort=` into a [`ReportQuery`].

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use tuning_core::ReportQuery;
use tuning_service::dto::ReportPageParams;
use validator::Validate;

use crate::response::ApiError;

/// Validated listing query
#[derive(Debug, Clone, Copy)]
pub struct PageQuery(pub ReportQuery);

#[async_trait]
impl<S> FromRequestParts<S> for PageQuery
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<ReportPageParams>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::invalid_query(e.to_string()))?;

        params.validate()?;

        Ok(Self(params.into_query()?))
    }
}
