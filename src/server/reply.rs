//! JSON replies and the ways a request can be turned away.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use log::error;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::common::CmsError;

/// The `{status, info, ...}` object every JSON endpoint answers with.
#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    pub status: bool,
    pub info: String,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl Reply {
    pub fn ok(info: impl Into<String>) -> Self {
        Self {
            status: true,
            info: info.into(),
            data: Map::new(),
        }
    }

    pub fn fail(info: impl Into<String>) -> Self {
        Self {
            status: false,
            info: info.into(),
            data: Map::new(),
        }
    }

    /// Add `key` to the reply. Values that fail to serialize become `null`.
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.data.insert(key.to_string(), value);
        self
    }

    /// Merge the fields of a serializable object into the reply.
    pub fn merge(mut self, value: impl Serialize) -> Self {
        if let Ok(Value::Object(fields)) = serde_json::to_value(value) {
            self.data.extend(fields);
        }
        self
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Why a handler stopped early.
#[derive(Debug)]
pub enum Rejection {
    /// `{status: false, info}` with HTTP 200
    Json(String),
    /// Error page with the given status
    Abort(StatusCode, String),
    /// See-other redirect to the location
    Redirect(String),
    /// Unexpected failure, logged and answered with 500
    Internal(CmsError),
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        match self {
            Rejection::Json(info) => Reply::fail(info).into_response(),
            Rejection::Abort(status, message) => {
                (status, Json(ErrorResponse { error: message })).into_response()
            }
            Rejection::Redirect(location) => Redirect::to(&location).into_response(),
            Rejection::Internal(e) => {
                error!("❌ Request failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "Internal server error".to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}

impl From<CmsError> for Rejection {
    fn from(e: CmsError) -> Self {
        Rejection::Internal(e)
    }
}

pub type HandlerResult<T = Reply> = std::result::Result<T, Rejection>;

/// Turn a failed store or pipeline call into a reply: problems with the submitted
/// data go back to the user, everything else is an internal error.
pub fn user_error(e: CmsError) -> HandlerResult {
    match e {
        CmsError::Validation(_)
        | CmsError::UnsupportedFileType
        | CmsError::ImageTooSmall { .. }
        | CmsError::Image(_) => Ok(Reply::fail(e.to_string())),
        other => Err(Rejection::Internal(other)),
    }
}
