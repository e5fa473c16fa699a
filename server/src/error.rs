//! Error types for the ListKeeper server.
//!
//! # Error Types
//!
//! - [`TodoError`] - Domain errors raised by validation and store operations.
//!   Their `Display` output is the message shown to the user.
//! - [`ServerError`] - Top-level server errors encompassing all failure modes
//!
//! # Example
//!
//! ```rust
//! use listkeeper_server::error::{Target, TodoError};
//!
//! let err = TodoError::invalid_length(Target::List);
//! assert_eq!(
//!     err.to_string(),
//!     "The list name must be between 1 and 100 characters."
//! );
//! ```

use std::error::Error;
use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error as ThisError;

use crate::config::ConfigError;
use crate::session::SessionError;
use crate::views::ViewError;

/// The kind of resource an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    List,
    Todo,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => f.write_str("list"),
            Self::Todo => f.write_str("todo"),
        }
    }
}

/// Errors raised while validating input or addressing lists and todos.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum TodoError {
    /// A list or todo name is empty or longer than the allowed maximum.
    #[error("The {target} name must be between 1 and 100 characters.")]
    InvalidLength {
        /// What was being named.
        target: Target,
    },

    /// Another list in the session already uses the name.
    #[error("List name must be unique.")]
    DuplicateName,

    /// A path segment did not parse, or referred to nothing.
    #[error("The {target} '{value}' could not be found.")]
    InvalidIndex {
        /// What was being addressed.
        target: Target,
        /// The raw value from the request.
        value: String,
    },
}

impl TodoError {
    pub fn invalid_length(target: Target) -> Self {
        Self::InvalidLength { target }
    }

    pub fn invalid_index(target: Target, value: impl fmt::Display) -> Self {
        Self::InvalidIndex {
            target,
            value: value.to_string(),
        }
    }

    /// Returns `true` for errors that are fixed by editing the submitted form.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidLength { .. } | Self::DuplicateName)
    }
}

/// Top-level error type for the ListKeeper server.
///
/// Handlers recover validation failures themselves by re-rendering the form;
/// everything that reaches this type ends the request with an error page.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration error during server initialization.
    Config(ConfigError),

    /// Session store failure, e.g. the store is at capacity.
    Session(SessionError),

    /// A request referenced a list or todo that does not exist.
    NotFound(TodoError),

    /// Template parsing or rendering failed.
    View(ViewError),

    /// Unexpected internal server error.
    Internal(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "configuration error: {err}"),
            Self::Session(err) => write!(f, "session error: {err}"),
            Self::NotFound(err) => write!(f, "not found: {err}"),
            Self::View(err) => write!(f, "view error: {err}"),
            Self::Internal(msg) => write!(f, "internal server error: {msg}"),
        }
    }
}

impl Error for ServerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Session(err) => Some(err),
            Self::NotFound(err) => Some(err),
            Self::View(err) => Some(err),
            Self::Internal(_) => None,
        }
    }
}

impl From<ConfigError> for ServerError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<SessionError> for ServerError {
    fn from(err: SessionError) -> Self {
        Self::Session(err)
    }
}

impl From<ViewError> for ServerError {
    fn from(err: ViewError) -> Self {
        Self::View(err)
    }
}

impl ServerError {
    /// Creates a new internal error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use listkeeper_server::error::ServerError;
    ///
    /// let err = ServerError::internal("session vanished mid-request");
    /// assert!(matches!(err, ServerError::Internal(_)));
    /// ```
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns `true` if this error indicates a client-side problem.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns `true` if this error indicates a server-side problem.
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Session(SessionError::AtCapacity { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Session(SessionError::NotFound) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Config(_) | Self::View(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Plain-text fallback; handlers prefer rendering the not-found page.
impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        }
        let body = match &self {
            Self::NotFound(err) => err.to_string(),
            Self::Session(SessionError::AtCapacity { .. }) => {
                "The server is busy, please try again later.".to_string()
            }
            _ => "Something went wrong.".to_string(),
        };
        (status, body).into_response()
    }
}

/// A specialized Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;
