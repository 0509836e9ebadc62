//! Core request model for the pipeline.
//!
//! This module contains the transient values that flow through the stages:
//! - Requests and HTTP methods
//! - Responses with status helpers
//! - The classified outcome handed to callers

mod outcome;
mod request;
mod response;

pub use outcome::ClassifiedOutcome;
pub use request::{path_without_query, ApiRequest, Method, AUTHORIZATION};
pub use response::ApiResponse;
