//! The crate's single public error type.
//!
//! Only *recoverable* failures live here: bad configuration and I/O. State
//! invariant violations (a photon outside the medium box, a boundary
//! resolution with no flagged axis) are programming bugs, not data errors,
//! and are reported with `panic!`/`debug_assert!` at the point of
//! violation rather than threaded through `Result` -- see the walker
//! module for where those live.

use std::path::PathBuf;

/// Errors produced while loading configuration, building a [`crate::medium::Medium`],
/// or reading field frames from disk.
#[derive(Debug, thiserror::Error)]
pub enum McError {
    /// A scenario failed validation: invalid geometry, an unsupported
    /// detector plane, or an out-of-range numeric knob.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// An I/O failure reading or writing a file at `path`.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A field frame file held the wrong number of samples for the grid it
    /// was loaded into.
    #[error("frame {path} has {found} samples, expected {expected}")]
    FrameShapeMismatch {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    /// A TOML scenario document failed to parse.
    #[error("failed to parse scenario: {0}")]
    Toml(#[from] toml::de::Error),
}

impl McError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        McError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, McError>;
