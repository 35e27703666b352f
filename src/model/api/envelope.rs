use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Successful response body: `{ "success": true, "data": ... }`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Success<T> {
    pub success: bool,
    pub data: T,
}

/// Failed response body: `{ "success": false, "error": "..." }`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Failure {
    pub success: bool,
    pub error: String,
}

impl Failure {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// What every JSON endpoint returns.
pub type Reply<T> = Result<Json<Success<T>>>;

/// Wrap `data` in a success envelope.
pub fn ok<T>(data: T) -> Reply<T> {
    Ok(Json(Success {
        success: true,
        data,
    }))
}
