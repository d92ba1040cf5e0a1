//! # astruct-codec
//!
//! Text codecs and error-resolution policies for fixed-width string fields.
//!
//! Game records frequently embed text that is *almost* valid in its codec:
//! escape bytes for inline icons, stray bytes after a terminator, and so on.
//! An [`EncodingPolicy`] decides what happens to those bytes, from failing
//! outright ([`ErrorMode::Strict`]) to preserving them exactly
//! ([`ErrorMode::Lossless`]).
//!
//! ## Example
//!
//! ```
//! use astruct_codec::{Codec, EncodingPolicy, ErrorMode};
//!
//! let strict = EncodingPolicy::new(Codec::ShiftJis, ErrorMode::Strict);
//! assert!(strict.decode(b"icon \x87\xff").is_err());
//!
//! let lossless = EncodingPolicy::new(Codec::ShiftJis, ErrorMode::Lossless);
//! let text = lossless.decode(b"icon \x87\xff").unwrap();
//! assert_eq!(lossless.encode(&text).unwrap(), b"icon \x87\xff");
//! ```

mod decode;
mod encode;
pub mod error;
pub mod policy;
pub mod wide;

pub use error::{CodecError, NameError};
pub use policy::{Codec, EncodingPolicy, ErrorMode};

/// First of the 256 code points reserved by [`ErrorMode::Lossless`]. Byte `b`
/// decodes to `LOSSLESS_BASE + b`; the block is the tail of Supplementary
/// Private Use Area-B, which none of the supported codecs can produce.
pub const LOSSLESS_BASE: u32 = 0x10_FF00;

/// The reserved code point standing in for the undecodable byte `b`.
pub fn lossless_char(b: u8) -> char {
    char::from_u32(LOSSLESS_BASE + u32::from(b)).unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// The byte a reserved code point stands in for, if `c` is one.
pub fn lossless_byte(c: char) -> Option<u8> {
    u32::from(c)
        .checked_sub(LOSSLESS_BASE)
        .and_then(|offset| u8::try_from(offset).ok())
}
