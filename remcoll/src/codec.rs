//! Payload codecs
//!
//! A codec turns a typed value into the bytes stored in a remote list and
//! back. Encoding writes straight into a [`BufferArena`] so no intermediate
//! vector is allocated per call.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

use crate::io::BufferArena;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Codec failure, carrying the underlying error unchanged
#[derive(Debug)]
pub enum CodecError {
    Encode(BoxError),
    Decode(BoxError),
}

impl CodecError {
    pub fn encode(err: impl Into<BoxError>) -> Self {
        Self::Encode(err.into())
    }

    pub fn decode(err: impl Into<BoxError>) -> Self {
        Self::Decode(err.into())
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode(e) => write!(f, "Failed to encode value: {e}"),
            Self::Decode(e) => write!(f, "Failed to decode value: {e}"),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Encode(e) | Self::Decode(e) => Some(e.as_ref()),
        }
    }
}

/// Serialization capability injected into a remote list
pub trait Codec<T>: Send + Sync {
    /// Append the encoded form of `value` to `arena`.
    ///
    /// # Errors
    /// Any encoder failure, wrapped in `CodecError::Encode`
    fn serialize_into(&self, arena: &mut BufferArena, value: &T) -> Result<(), CodecError>;

    /// Decode one payload.
    ///
    /// # Errors
    /// Any decoder failure, wrapped in `CodecError::Decode`
    fn deserialize(&self, bytes: &[u8]) -> Result<T, CodecError>;
}

/// JSON codec for any serde type
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<T> Codec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn serialize_into(&self, arena: &mut BufferArena, value: &T) -> Result<(), CodecError> {
        serde_json::to_writer(arena, value).map_err(CodecError::encode)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(bytes).map_err(CodecError::decode)
    }
}

/// Pass-through codec for raw byte payloads
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl Codec<Vec<u8>> for RawCodec {
    fn serialize_into(&self, arena: &mut BufferArena, value: &Vec<u8>) -> Result<(), CodecError> {
        arena.write_slice(value).map_err(CodecError::encode)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(bytes.to_vec())
    }
}
