use std::{fmt, io};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::error::SendError as TokioSendError;
use url::ParseError as UrlParseError;

use serde_json::Error as JsonError;

use crate::event::SiteEvent;

/// Classification tag for a [`SiteError`].
///
/// Hosts decide how to present a failure from the kind alone: `InvalidInput` is a programming
/// error on the caller side, soft kinds only remove a single tile from a listing, and
/// `BackendFailure`/`ResolutionFailure` are candidates for a user-triggered retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    DanglingReference,
    NoInbound,
    MissingVizType,
    BackendFailure,
    ResolutionFailure,
    Serialization,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::DanglingReference => "DanglingReference",
            ErrorKind::NoInbound => "NoInbound",
            ErrorKind::MissingVizType => "MissingVizType",
            ErrorKind::BackendFailure => "BackendFailure",
            ErrorKind::ResolutionFailure => "ResolutionFailure",
            ErrorKind::Serialization => "Serialization",
            ErrorKind::Io => "Io",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum SiteError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("Tile '{tile_id}' references {reference} which is not part of the site")]
    DanglingReference { tile_id: String, reference: String },
    #[error("Tile '{tile_id}' references inbound '{inbound_id}' which application '{app_id}' does not define")]
    NoInbound {
        tile_id: String,
        app_id: String,
        inbound_id: String,
    },
    #[error("Tile '{tile_id}' uses visualization type '{viz_type}' which is not part of the site")]
    MissingVizType { tile_id: String, viz_type: String },
    #[error("Site service error: {0}")]
    Backend(String),
    #[error("Could not resolve tile '{tile_id}': {message}")]
    Resolution { tile_id: String, message: String },
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("File System error: {0}")]
    Io(String),
}

impl SiteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SiteError::InvalidInput(_) => ErrorKind::InvalidInput,
            SiteError::NotFound(_) => ErrorKind::NotFound,
            SiteError::DanglingReference { .. } => ErrorKind::DanglingReference,
            SiteError::NoInbound { .. } => ErrorKind::NoInbound,
            SiteError::MissingVizType { .. } => ErrorKind::MissingVizType,
            SiteError::Backend(_) => ErrorKind::BackendFailure,
            SiteError::Resolution { .. } => ErrorKind::ResolutionFailure,
            SiteError::Serialization(_) => ErrorKind::Serialization,
            SiteError::Io(_) => ErrorKind::Io,
        }
    }

    /// True for conditions that only filter the affected tile out of a listing.
    pub fn is_soft(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::DanglingReference | ErrorKind::NoInbound | ErrorKind::MissingVizType
        )
    }

    pub(crate) fn invalid<S: Into<String>>(msg: S) -> SiteError {
        SiteError::InvalidInput(msg.into())
    }
}

/// Structured data handed back alongside a failure so the host can restore its own state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum RejectionPayload {
    #[default]
    None,
    /// The title a group carried before a failed rename.
    PreviousTitle(String),
    /// Group ids (in display order) at the time of the failure.
    Groups(Vec<String>),
}

/// A failed operation together with the payload its caller needs to revert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{error}")]
pub struct Rejection {
    pub error: SiteError,
    pub payload: RejectionPayload,
}

impl Rejection {
    pub fn new(error: SiteError, payload: RejectionPayload) -> Rejection {
        Rejection { error, payload }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

impl From<SiteError> for Rejection {
    fn from(error: SiteError) -> Rejection {
        Rejection {
            error,
            payload: RejectionPayload::None,
        }
    }
}

impl From<toml::de::Error> for SiteError {
    fn from(src: toml::de::Error) -> SiteError {
        SiteError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for SiteError {
    fn from(src: toml::ser::Error) -> SiteError {
        SiteError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for SiteError {
    fn from(src: JsonError) -> SiteError {
        SiteError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<uuid::Error> for SiteError {
    fn from(src: uuid::Error) -> SiteError {
        SiteError::Serialization(format!("UUID conversion failed: {src}"))
    }
}

impl From<UrlParseError> for SiteError {
    fn from(src: UrlParseError) -> SiteError {
        SiteError::Serialization(format!("Invalid URL: {src}"))
    }
}

impl From<io::Error> for SiteError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => SiteError::NotFound(format!("{x}")),
            _ => SiteError::Io(format!("IOError: {}: {x}", x.kind())),
        }
    }
}

impl From<TokioSendError<SiteEvent>> for SiteError {
    fn from(x: TokioSendError<SiteEvent>) -> Self {
        SiteError::Io(format!(
            "Channel update send Error, could not transmit site event {}",
            x.0
        ))
    }
}
