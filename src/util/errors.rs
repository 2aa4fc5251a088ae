use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

/// Error type returned by every route handler.
///
/// The public message is what the caller sees, the source is only ever logged.
#[derive(Debug)]
pub struct RouteError {
    status_code: StatusCode,
    public_error_message: Option<String>,
    source: Option<anyhow::Error>,
}

/// What an error response looks like on the wire.
#[derive(Serialize, ToSchema)]
pub struct SimpleRouteErrorOutput {
    error: String,
}

impl RouteError {
    #[must_use]
    pub const fn new(status_code: StatusCode) -> Self {
        Self {
            status_code,
            public_error_message: None,
            source: None,
        }
    }

    #[must_use]
    pub const fn new_bad_request() -> Self {
        Self::new(StatusCode::BAD_REQUEST)
    }

    #[must_use]
    pub const fn new_unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED)
    }

    #[must_use]
    pub const fn new_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    #[must_use]
    pub const fn new_conflict() -> Self {
        Self::new(StatusCode::CONFLICT)
    }

    #[must_use]
    pub const fn new_internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR)
    }

    #[must_use]
    pub fn set_public_error_message(mut self, message: &str) -> Self {
        self.public_error_message = Some(message.to_owned());
        self
    }

    #[must_use]
    pub fn set_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.status_code
    }

    fn public_message(&self) -> String {
        self.public_error_message.clone().unwrap_or_else(|| {
            self.status_code
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_owned()
        })
    }
}

// Anything that can become an anyhow::Error is an internal error unless said otherwise.
impl<E> From<E> for RouteError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::new_internal().set_source(err.into())
    }
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        if let Some(source) = &self.source {
            error!(status = %status_code, "route error: {source:?}");
        }

        let body = SimpleRouteErrorOutput {
            error: self.public_message(),
        };
        (status_code, Json(body)).into_response()
    }
}

//shamelessly stolen from https://www.reddit.com/r/rust/comments/ozc0m8/an_actixanyhow_compatible_error_helper_i_found/
pub trait IntoRouteError<T> {
    fn http_error(self, message: &str, status_code: StatusCode) -> Result<T, RouteError>;

    fn http_status_error(self, status_code: StatusCode) -> Result<T, RouteError>;

    fn http_internal_error(self, message: &str) -> Result<T, RouteError>
    where
        Self: std::marker::Sized,
    {
        self.http_error(message, StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl<T, E> IntoRouteError<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn http_error(self, message: &str, status_code: StatusCode) -> Result<T, RouteError> {
        self.map_err(|err| {
            RouteError::new(status_code)
                .set_public_error_message(message)
                .set_source(err.into())
        })
    }

    fn http_status_error(self, status_code: StatusCode) -> Result<T, RouteError> {
        self.map_err(|err| RouteError::new(status_code).set_source(err.into()))
    }
}
