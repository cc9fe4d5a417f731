//! Errors returned by the collection layers

use std::fmt;

use crate::codec::CodecError;
use crate::io::{ArenaError, StoreError};

/// Errors that can occur in collection operations
#[derive(Debug)]
pub enum CollectionError {
    /// Bad size, position or option, rejected before any round trip
    InvalidArgument(String),

    /// Position past the end of the list
    IndexOutOfRange { position: usize, count: usize },

    /// The named component was disposed
    UseAfterDispose(&'static str),

    /// The codec failed
    Serialization(CodecError),

    /// Associative keys and remote values are out of step
    Desync { keys: usize, values: usize },

    /// Connecting or a round trip failed
    Connection(StoreError),
}

impl fmt::Display for CollectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            Self::IndexOutOfRange { position, count } => {
                write!(f, "Position {position} is out of range for a list of {count}")
            }
            Self::UseAfterDispose(what) => write!(f, "The {what} was used after dispose"),
            Self::Serialization(e) => write!(f, "Serialization error: {e}"),
            Self::Desync { keys, values } => write!(
                f,
                "Position table is out of sync: {keys} keys but {values} values"
            ),
            Self::Connection(e) => write!(f, "Connection error: {e}"),
        }
    }
}

impl std::error::Error for CollectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Serialization(e) => Some(e),
            Self::Connection(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for CollectionError {
    fn from(err: StoreError) -> Self {
        Self::Connection(err)
    }
}

impl From<CodecError> for CollectionError {
    fn from(err: CodecError) -> Self {
        Self::Serialization(err)
    }
}

impl From<ArenaError> for CollectionError {
    fn from(err: ArenaError) -> Self {
        match err {
            ArenaError::UseAfterDispose => Self::UseAfterDispose("buffer arena"),
            other => Self::InvalidArgument(other.to_string()),
        }
    }
}
