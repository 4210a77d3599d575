use axum::extract::FromRequest;

use crate::api::error::ApiError;

/// `axum::Json` whose rejections render as an [`ApiError`] body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);
