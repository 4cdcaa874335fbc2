//! Data transfer objects for API requests and responses
//!
//! - Request DTOs with validation for API inputs
//! - Response DTOs for serializing API outputs
//! - Mappers from domain types to response DTOs

pub mod mappers;
pub mod requests;
pub mod responses;

pub use requests::ReportPageParams;
pub use responses::{
    ApiResponse, HealthChecks, HealthResponse, MyReactionsResponse, PageMeta,
    ReactionCountsResponse, ReadinessResponse, ReportPageResponse, ReportResponse,
    ToggleReactionResponse,
};
