//! An [`EncodingPolicy`] pairs a [`Codec`] with an [`ErrorMode`]:
//! - **Codec**: the byte↔text mapping (ASCII, Latin-1, UTF-8, Shift-JIS or
//!   the full-width Shift-JIS variant used by some titles).
//! - **Error mode**: what to do with byte runs (or characters) the codec has
//!   no mapping for.
//!
//! Policies are immutable and meant to be shared by reference across every
//! string field that uses them.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use crate::error::{CodecError, NameError};

/// A named byte↔text mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    /// 7-bit ASCII. Bytes above 0x7F are undecodable.
    Ascii,
    /// ISO-8859-1. Every byte maps to the code point of the same value.
    Latin1,
    /// UTF-8.
    Utf8,
    /// Shift-JIS as specified by the WHATWG Encoding Standard.
    ShiftJis,
    /// Shift-JIS with printable ASCII widened to full-width forms (and space
    /// to U+3000) before encoding, and narrowed back after decoding.
    WideShiftJis,
}

impl Codec {
    /// Canonical name, as accepted by [`FromStr`].
    pub fn name(&self) -> &'static str {
        match self {
            Codec::Ascii => "ascii",
            Codec::Latin1 => "latin-1",
            Codec::Utf8 => "utf-8",
            Codec::ShiftJis => "shift_jis",
            Codec::WideShiftJis => "wide_shift_jis",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Codec {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");

        match normalized.as_str() {
            "ascii" | "us_ascii" => Ok(Codec::Ascii),
            "latin_1" | "latin1" | "iso_8859_1" | "iso8859_1" => Ok(Codec::Latin1),
            "utf_8" | "utf8" => Ok(Codec::Utf8),
            "shift_jis" | "shiftjis" | "sjis" | "s_jis" => Ok(Codec::ShiftJis),
            "wide_shift_jis" | "wide_shiftjis" | "wide_sjis" => Ok(Codec::WideShiftJis),
            _ => Err(NameError::UnknownCodec(s.to_string())),
        }
    }
}

/// How undecodable bytes and unencodable characters are resolved.
///
/// Each maximal run of invalid bytes is one resolution unit: `Replace`
/// yields a single U+FFFD for the whole run, while the per-byte modes
/// (`Lossless`, `BackslashReplace`) expand the run byte by byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorMode {
    /// Fail with a [`CodecError`].
    #[default]
    Strict,
    /// Drop the offending run.
    Ignore,
    /// Decode to U+FFFD, encode to `?`.
    Replace,
    /// Map each undecodable byte to a reserved code point (see
    /// [`crate::lossless_char`]) and back again on encode.
    Lossless,
    /// Decode to `\xNN` escapes; encode to `\xNN`, `\uNNNN` or `\UNNNNNNNN`.
    BackslashReplace,
}

impl ErrorMode {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorMode::Strict => "strict",
            ErrorMode::Ignore => "ignore",
            ErrorMode::Replace => "replace",
            ErrorMode::Lossless => "surrogateescape",
            ErrorMode::BackslashReplace => "backslashreplace",
        }
    }
}

impl fmt::Display for ErrorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ErrorMode {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "strict" => Ok(ErrorMode::Strict),
            "ignore" => Ok(ErrorMode::Ignore),
            "replace" => Ok(ErrorMode::Replace),
            "surrogateescape" | "lossless" | "lossless_byte_preserving" => Ok(ErrorMode::Lossless),
            "backslashreplace" => Ok(ErrorMode::BackslashReplace),
            _ => Err(NameError::UnknownErrorMode(s.to_string())),
        }
    }
}

/// Codec plus error mode for one or more string fields.
///
/// # Example
///
/// ```
/// use astruct_codec::{Codec, EncodingPolicy, ErrorMode};
///
/// let policy = EncodingPolicy::new(Codec::Ascii, ErrorMode::Lossless);
/// let text = policy.decode(b"AB\xff").unwrap();
/// assert_eq!(policy.encode(&text).unwrap(), b"AB\xff");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodingPolicy {
    codec: Codec,
    errors: ErrorMode,
}

impl Default for EncodingPolicy {
    fn default() -> Self {
        EncodingPolicy::new(Codec::ShiftJis, ErrorMode::Strict)
    }
}

impl EncodingPolicy {
    pub const fn new(codec: Codec, errors: ErrorMode) -> Self {
        Self { codec, errors }
    }

    /// Builds a policy from textual names, e.g. `("shift-jis", "replace")`.
    pub fn parse(codec: &str, errors: &str) -> Result<Self, NameError> {
        Ok(Self::new(codec.parse()?, errors.parse()?))
    }

    /// The process-wide default policy (Shift-JIS, strict), shared by every
    /// string field that does not declare its own.
    pub fn shared_default() -> Arc<EncodingPolicy> {
        static DEFAULT: OnceLock<Arc<EncodingPolicy>> = OnceLock::new();
        DEFAULT
            .get_or_init(|| Arc::new(EncodingPolicy::default()))
            .clone()
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn errors(&self) -> ErrorMode {
        self.errors
    }

    /// Decodes `bytes` in full; no null-termination handling happens here.
    pub fn decode(&self, bytes: &[u8]) -> Result<String, CodecError> {
        crate::decode::decode(self, bytes)
    }

    /// Encodes `text` in full.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>, CodecError> {
        crate::encode::encode(self, text)
    }
}

impl fmt::Display for EncodingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.codec, self.errors)
    }
}
