//! Body and path extractors that reject with the API error shape

use crate::error::ApiError;
use axum::extract::{FromRequest, FromRequestParts};

/// JSON request body; malformed input becomes `400 BAD_REQUEST`
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Path parameters; unparsable segments become `400 BAD_REQUEST`
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
