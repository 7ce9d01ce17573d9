use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by player commands
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("no recitation loaded")]
    NoTrackLoaded,

    #[error("cannot seek while the recitation is loading")]
    SeekWhileLoading,

    #[error("invalid seek position: {0}")]
    InvalidSeekPosition(f64),

    #[error("unknown recitation: {0}")]
    UnknownRecitation(String),
}

/// Errors from the playback handle
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("playback backend unavailable: {0}")]
    Unavailable(String),

    #[error("playback rejected: {0}")]
    Rejected(String),
}

/// Errors from download / share / clipboard
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("no share command configured")]
    ShareUnavailable,

    #[error("share command failed: {0}")]
    ShareFailed(String),

    #[error("no clipboard tool found (tried pbcopy, wl-copy, xclip, xsel)")]
    ClipboardUnavailable,

    #[error("clipboard write failed: {0}")]
    ClipboardWrite(String),

    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse catalog {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("catalog is empty")]
    Empty,

    #[error("duplicate recitation id: {0}")]
    DuplicateId(String),

    #[error("recitation {id}: {field} does not match the embedded record")]
    Inconsistent { id: String, field: &'static str },
}
