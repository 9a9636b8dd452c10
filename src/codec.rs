//! Payload codecs.
//!
//! Each collection binds one codec that converts its payload type to and
//! from bytes. Codecs must round-trip: `decode(encode(x)) == x`.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors produced while encoding or decoding payloads.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Failed to encode payload: {0}")]
    Encode(String),

    #[error("Failed to decode payload: {0}")]
    Decode(String),
}

/// Encode a typed payload to bytes and decode it back.
pub trait Codec<T>: Send + Sync {
    fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError>;
}

/// Byte-level view of a codec: can this payload be decoded at all?
///
/// The collection engine validates incoming peer payloads through this
/// before persisting them, without needing to know the payload type.
pub trait PayloadCheck: Send + Sync {
    fn check(&self, bytes: &[u8]) -> Result<(), CodecError>;
}

/// Adapts a typed [`Codec`] into a [`PayloadCheck`] by decoding and
/// discarding the value.
pub struct CodecCheck<T, C> {
    codec: C,
    _payload: PhantomData<fn() -> T>,
}

impl<T, C: Codec<T>> CodecCheck<T, C> {
    pub fn new(codec: C) -> Self {
        Self {
            codec,
            _payload: PhantomData,
        }
    }
}

impl<T, C: Codec<T>> PayloadCheck for CodecCheck<T, C> {
    fn check(&self, bytes: &[u8]) -> Result<(), CodecError> {
        self.codec.decode(bytes).map(|_| ())
    }
}

/// JSON codec for any serde-serializable payload type.
#[derive(Debug)]
pub struct JsonCodec<T> {
    _payload: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            _payload: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> Codec<T> for JsonCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}
