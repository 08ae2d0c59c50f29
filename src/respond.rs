//! Turning linker results into responses.
//!
//! [`Respond`] owns the response shape; the linker never builds responses
//! itself. [`JsonResponder`] is the axum implementation used by
//! `LinkError`'s `IntoResponse`.
//!
//! ```rust,ignore
//! async fn attach_tags(
//!     State(linker): State<Arc<RelationLinker<i32, i32>>>,
//!     Path(id): Path<i32>,
//!     Json(body): Json<Value>,
//! ) -> Response {
//!     JsonResponder.respond(linker.attach(&id, "tags", &body).await)
//! }
//! ```

use crate::errors::{DATABASE_ERROR_MESSAGE, LinkError, NOT_FOUND_MESSAGE};
use crate::validation::ValidationErrors;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Response builder for linker outcomes
pub trait Respond {
    type Response;

    fn success<T: Serialize>(&self, payload: T) -> Self::Response;

    fn error(&self, message: &str, details: Option<&ValidationErrors>) -> Self::Response;

    fn not_found(&self) -> Self::Response;

    /// Failure outside the guarded relation call, e.g. the entity lookup
    fn server_error(&self) -> Self::Response;

    fn respond<T: Serialize>(&self, result: Result<T, LinkError>) -> Self::Response {
        match result {
            Ok(payload) => self.success(payload),
            Err(LinkError::NotFound) => self.not_found(),
            Err(err @ LinkError::Database(_)) => {
                tracing::debug!(error = %err, "Responding with server error");
                self.server_error()
            }
            Err(err) => self.error(err.user_message(), err.details()),
        }
    }
}

/// Error response sent to users (sanitized)
#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a ValidationErrors>,
}

/// JSON responses for axum handlers
///
/// | outcome          | status |
/// |------------------|--------|
/// | success          | 200    |
/// | validation error | 422    |
/// | other error      | 400    |
/// | not found        | 404    |
/// | server error     | 500    |
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonResponder;

impl Respond for JsonResponder {
    type Response = Response;

    fn success<T: Serialize>(&self, payload: T) -> Response {
        (StatusCode::OK, Json(payload)).into_response()
    }

    fn error(&self, message: &str, details: Option<&ValidationErrors>) -> Response {
        let status = if details.is_some() {
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            StatusCode::BAD_REQUEST
        };
        (
            status,
            Json(ErrorResponse {
                error: message,
                details,
            }),
        )
            .into_response()
    }

    fn not_found(&self) -> Response {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: NOT_FOUND_MESSAGE,
                details: None,
            }),
        )
            .into_response()
    }

    fn server_error(&self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: DATABASE_ERROR_MESSAGE,
                details: None,
            }),
        )
            .into_response()
    }
}

impl IntoResponse for LinkError {
    fn into_response(self) -> Response {
        JsonResponder.respond::<()>(Err(self))
    }
}
