use std::convert::Infallible;
use std::{fmt, io};

use rusoto_core::RusotoError;
use rusoto_ses::SendEmailError;
use thiserror::Error;

/// Raised while registering the sink, before any event is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("connection info is required")]
    MissingConnectionInfo,
    #[error("environment variable `{0}` is not set")]
    MissingEnvironment(&'static str),
    #[error("invalid template {template:?} at offset {offset}: {reason}")]
    InvalidTemplate {
        template: String,
        offset: usize,
        reason: &'static str,
    },
    #[error("`{0}` must be greater than zero")]
    ZeroLimit(&'static str),
    #[error("failed to start batching worker: {0}")]
    Runtime(#[source] io::Error),
}

/// Raised when a template cannot render an event.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("failed to render timestamp with format {0:?}")]
    Timestamp(String),
    #[error("failed to write rendered event")]
    Write(#[from] fmt::Error),
}

/// Raised by a delivery client when an email could not be sent.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("email API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("email API rejected the message with status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("{0}")]
    Rusoto(RusotoError<Infallible>),
    #[error("{0}")]
    SendEmail(SendEmailError),
}

impl From<RusotoError<SendEmailError>> for DeliveryError {
    fn from(error: RusotoError<SendEmailError>) -> Self {
        match error {
            RusotoError::Service(error) => Self::SendEmail(error),
            RusotoError::HttpDispatch(err) => Self::Rusoto(RusotoError::HttpDispatch(err)),
            RusotoError::Credentials(err) => Self::Rusoto(RusotoError::Credentials(err)),
            RusotoError::Validation(msg) => Self::Rusoto(RusotoError::Validation(msg)),
            RusotoError::ParseError(msg) => Self::Rusoto(RusotoError::ParseError(msg)),
            RusotoError::Unknown(resp) => Self::Rusoto(RusotoError::Unknown(resp)),
            RusotoError::Blocking => Self::Rusoto(RusotoError::Blocking),
        }
    }
}

/// Failure of a single flush. The inner error is passed through untouched.
#[derive(Debug, Error)]
pub enum FlushError {
    #[error("failed to format log event: {0}")]
    Format(#[from] FormatError),
    #[error("failed to deliver email: {0}")]
    Delivery(#[from] DeliveryError),
}
