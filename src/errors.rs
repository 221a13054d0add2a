//! Crate-wide error taxonomy.
//! One enum for every fallible path, plus stable numeric codes for process exit.

use thiserror::Error;

// ------------------------------------------------------------------
// 1. Stable numeric codes (used as CLI exit status)
// ------------------------------------------------------------------
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VqErrorCode {
    Ok = 0,
    Precondition = 1,
    UnsupportedFormat = 2,
    NotImplemented = 3,
    InvalidConfig = 4,
    Cancelled = 5,
    Io = 6,
}

// ------------------------------------------------------------------
// 2. Detailed Rust-side error
// ------------------------------------------------------------------
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum VqError {
    /// Caller handed in data the algorithms cannot work on.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// Unknown extension, malformed header or truncated payload.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("compression cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl VqError {
    #[inline]
    pub fn code(&self) -> VqErrorCode {
        match self {
            Self::Precondition(_) => VqErrorCode::Precondition,
            Self::UnsupportedFormat(_) => VqErrorCode::UnsupportedFormat,
            Self::NotImplemented(_) => VqErrorCode::NotImplemented,
            Self::InvalidConfig(_) | Self::ConfigParse(_) => VqErrorCode::InvalidConfig,
            Self::Cancelled => VqErrorCode::Cancelled,
            Self::Io(_) => VqErrorCode::Io,
        }
    }

    pub(crate) fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, VqError>;
