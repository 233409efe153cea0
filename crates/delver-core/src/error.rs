//! Error types for the floor cache.
//!
//! Only startup and configuration surface errors to the caller. Persist and
//! restore errors are consumed by the transition controller, which degrades
//! to a no-return transition or a dead-end room instead of failing.

use std::io;
use std::path::PathBuf;

use delver_logic::ids::FloorId;
use thiserror::Error;

/// Errors from the level serializer collaborator.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("serialization error: {0}")]
    Bincode(#[from] Box<bincode::ErrorKind>),

    #[error("level format version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("invalid level data: {0}")]
    Invalid(String),
}

/// Writing a floor to its backing file failed.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("could not encode level: {0}")]
    Encode(#[from] CodecError),

    #[error("could not write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not write floor header: {0}")]
    Header(Box<bincode::ErrorKind>),
}

/// Reading a floor back from its backing file failed.
#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("backing file {path} is missing")]
    Missing { path: PathBuf },

    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("backing file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: Box<bincode::ErrorKind>,
    },

    #[error("backing file {path} is not a floor file")]
    BadMagic { path: PathBuf },

    #[error("floor file version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("floor file belongs to another process (sign {found}, ours {expected})")]
    ForeignProcess { expected: u64, found: u64 },

    #[error("floor file holds {found}, expected {expected}")]
    WrongFloor { expected: FloorId, found: FloorId },

    #[error("could not decode level: {0}")]
    Decode(#[from] CodecError),
}

/// Errors returned to the caller of the cache's startup hooks.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("invalid cache configuration: {0}")]
    Config(String),

    #[error("stale floor file {path}; is another instance running?")]
    StaleBackingFile { path: PathBuf },

    #[error("could not prepare {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
