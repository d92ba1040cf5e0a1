//! Error types for text decoding/encoding and policy name parsing.

use thiserror::Error;

use crate::policy::Codec;

/// Errors produced while converting between bytes and text.
///
/// Only raised under [`ErrorMode::Strict`](crate::policy::ErrorMode::Strict),
/// and under [`ErrorMode::Lossless`](crate::policy::ErrorMode::Lossless) for
/// characters that are neither mappable nor reserved byte placeholders. Every
/// other mode resolves problems locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A run of bytes has no mapping in the codec.
    #[error("{codec} cannot decode bytes {bytes:02x?} at offset {offset}")]
    Undecodable {
        codec: Codec,
        offset: usize,
        bytes: Vec<u8>,
    },
    /// A character has no mapping in the codec.
    #[error("{codec} cannot encode {character:?} at position {index}")]
    Unencodable {
        codec: Codec,
        character: char,
        index: usize,
    },
    /// Text destined for a null-terminated field encodes to a zero byte
    /// before its end, so it could never be read back.
    #[error("text encodes to a zero byte at offset {offset} inside a null-terminated field")]
    EmbeddedNul { offset: usize },
}

/// Errors produced when parsing codec or error-mode names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("unsupported codec {0:?}")]
    UnknownCodec(String),
    #[error("unsupported error mode {0:?}")]
    UnknownErrorMode(String),
}
