use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// A JSON success response paired with its status code.
///
/// Payloads are serialized as-is (no envelope), so list endpoints return bare
/// arrays and mutations return small objects such as `{"message", "post_id"}`.
pub struct ApiResponse<T> {
    status: StatusCode,
    body: T,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    /// Creates a success response with data.
    /// Status code defaults to 200 OK.
    pub fn success(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            body: data,
        }
    }

    /// Overrides the status code.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Shorthand for 201 Created response.
    /// Usage: `ApiResponse::success(data).created()`
    pub fn created(self) -> Self {
        self.with_status(StatusCode::CREATED)
    }
}

/// A confirmation message, optionally followed by payload fields.
#[derive(Debug, Serialize)]
pub struct Message<T = EmptyData> {
    pub message: String,
    #[serde(flatten)]
    pub data: T,
}

/// Helper struct for responses without data (e.g., just a message)
#[derive(Debug, Serialize)]
pub struct EmptyData {}

impl ApiResponse<Message> {
    /// Creates a success response with just a message.
    pub fn ok(message: impl Into<String>) -> Self {
        Self::success(Message {
            message: message.into(),
            data: EmptyData {},
        })
    }
}

impl<T> ApiResponse<Message<T>>
where
    T: Serialize,
{
    /// Creates a success response with a message and data.
    pub fn success_with_message(message: impl Into<String>, data: T) -> Self {
        Self::success(Message {
            message: message.into(),
            data,
        })
    }
}

impl<T> IntoResponse for ApiResponse<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
