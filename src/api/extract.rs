//! Request extractors that reject with the API error envelope.
//!
//! axum's own `Json` and `Query` answer malformed input with a plain-text body;
//! these wrappers turn the rejection into [`AppError::Validation`].

use axum::extract::{FromRequest, FromRequestParts};

use crate::errors::AppError;

/// JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

/// Query string parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct Query<T>(pub T);
