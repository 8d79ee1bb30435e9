//! JSON request bodies

use axum::extract::FromRequest;

use crate::error::AppError;

/// `Json<T>` whose rejections render as validation errors
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
