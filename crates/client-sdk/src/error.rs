use std::fmt;

use gallery_core::ImportFormatError;
use reqwest::StatusCode;

pub type Result<T> = std::result::Result<T, GalleryError>;

#[derive(Debug)]
pub enum GalleryError {
    /// The request never produced a response.
    Transport {
        action: &'static str,
        source: reqwest::Error,
    },
    /// The server answered with a non-success HTTP status.
    Status {
        action: &'static str,
        status: StatusCode,
        message: Option<String>,
    },
    /// The body could not be decoded into the expected shape.
    Malformed {
        action: &'static str,
        detail: String,
    },
    /// The server answered 2xx but its status discriminator was not a success.
    Rejected {
        action: &'static str,
        status: String,
        message: Option<String>,
    },
    Validation(String),
    Format(ImportFormatError),
}

impl GalleryError {
    /// Short text suitable for an alert shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Status {
                message: Some(message),
                ..
            }
            | Self::Rejected {
                message: Some(message),
                ..
            } => message.clone(),
            Self::Validation(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for GalleryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport { action, source } => {
                write!(f, "failed to {action}: could not reach server: {source}")
            }
            Self::Status {
                action,
                status,
                message,
            } => match message {
                Some(message) => write!(f, "failed to {action}: server returned {status}: {message}"),
                None => write!(f, "failed to {action}: server returned {status}"),
            },
            Self::Malformed { action, detail } => {
                write!(f, "failed to {action}: unexpected response body: {detail}")
            }
            Self::Rejected {
                action,
                status,
                message,
            } => match message {
                Some(message) => write!(f, "failed to {action}: server reported '{status}': {message}"),
                None => write!(f, "failed to {action}: server reported '{status}'"),
            },
            Self::Validation(message) => write!(f, "{message}"),
            Self::Format(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for GalleryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport { source, .. } => Some(source),
            Self::Format(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ImportFormatError> for GalleryError {
    fn from(err: ImportFormatError) -> Self {
        Self::Format(err)
    }
}
