//! Request extractors shared by every REST handler.

use axum::extract::{FromRequest, FromRequestParts};

use crate::common::ApiError;

/// `axum::Json` with malformed bodies rendered as `400 {"detail": ...}`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Query` with the same JSON error rendering.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// `axum::extract::Path`; an unparseable id is a 404 like any unknown one.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
