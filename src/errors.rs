/*!
 * Error types for the narrasync library.
 *
 * Each stage of the narration pipeline has its own closed error enum so that
 * callers and tests can match on the exact failure. `NarrationError` wraps
 * them all for the caller-facing API, and `AppError` is used by the binary.
 */

use std::fmt;

use thiserror::Error;

/// Errors produced while validating or repairing narration markup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarkupError {
    /// Input was empty or contained only whitespace
    #[error("Markup is empty")]
    Empty,

    /// Input could not be parsed into a well-formed single-root document
    #[error("Malformed markup: {detail}")]
    Malformed {
        /// Parser diagnostic
        detail: String,
    },

    /// Root tags are present but cannot be balanced by the bounded repairs
    #[error("Root <speak> tags cannot be repaired")]
    UnrepairedRoot,
}

impl MarkupError {
    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        Self::Malformed { detail: detail.into() }
    }
}

/// Errors produced while building synthesis requests
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// The voice identifier was empty
    #[error("A voice id is required to build a synthesis request")]
    MissingVoice,
}

/// Errors produced while parsing a timing-event stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventParseError {
    /// A record in the stream is not a valid timing event
    #[error("Invalid timing event on line {line_number}: {detail}")]
    InvalidRecord {
        /// 1-based line number in the raw stream
        line_number: usize,
        /// What was wrong with the record
        detail: String,
    },
}

/// The kind of text boundary an index error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    Sentence,
    Word,
}

impl fmt::Display for BoundaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sentence => write!(f, "sentence"),
            Self::Word => write!(f, "word"),
        }
    }
}

/// Errors produced while building a synchronization index
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// The event stream and the document disagree on the number of boundaries
    #[error("{boundary} boundary mismatch: document has {expected}, events have {found}")]
    BoundaryMismatch {
        boundary: BoundaryKind,
        /// Boundaries found in the document
        expected: usize,
        /// Events found in the stream
        found: usize,
    },

    /// An event is earlier than the previous event of the same kind
    #[error("Timing event {at_index} is out of order")]
    OutOfOrder {
        /// Position of the offending event in the stream
        at_index: usize,
    },
}

/// Category of a backend failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// The request could not be sent or the connection failed
    Transport,
    /// The backend rejected the request because of rate limiting
    Throttled,
    /// Credentials were missing or rejected
    Authentication,
    /// The backend answered with an error status
    Api { status: u16 },
    /// The backend answered, but the payload was unusable
    InvalidResponse,
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => write!(f, "transport"),
            Self::Throttled => write!(f, "throttled"),
            Self::Authentication => write!(f, "authentication"),
            Self::Api { status } => write!(f, "api ({})", status),
            Self::InvalidResponse => write!(f, "invalid response"),
        }
    }
}

/// Opaque failure of an external backend (text generation or speech synthesis)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Backend {kind} error: {message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    /// Create a backend error of the given kind
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Transport, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::InvalidResponse, message)
    }

    /// Classify an HTTP error status returned by a backend
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            401 | 403 => BackendErrorKind::Authentication,
            429 => BackendErrorKind::Throttled,
            _ => BackendErrorKind::Api { status },
        };
        Self::new(kind, message)
    }

    /// Whether a retry could succeed (server-side or transport trouble)
    pub fn is_transient(&self) -> bool {
        match self.kind {
            BackendErrorKind::Transport | BackendErrorKind::Throttled => true,
            BackendErrorKind::Api { status } => status >= 500,
            _ => false,
        }
    }
}

/// Errors surfaced by the caller-facing narration API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NarrationError {
    #[error("Markup error: {0}")]
    Markup(#[from] MarkupError),

    #[error("Request error: {0}")]
    Build(#[from] BuildError),

    #[error("Timing event error: {0}")]
    EventParse(#[from] EventParseError),

    #[error("Synchronization error: {0}")]
    Index(#[from] IndexError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from the narration pipeline
    #[error("Narration error: {0}")]
    Narration(#[from] NarrationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
