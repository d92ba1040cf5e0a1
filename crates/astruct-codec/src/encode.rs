//! Text → bytes.

use std::io::Write as _;

use encoding_rs::SHIFT_JIS;

use crate::decode::shift_jis_unit;
use crate::error::CodecError;
use crate::policy::{Codec, EncodingPolicy, ErrorMode};
use crate::wide::widen;

pub(crate) fn encode(policy: &EncodingPolicy, text: &str) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(text.len());
    // Replace resolves a whole run of unencodable characters to a single `?`.
    let mut in_run = false;

    for (index, c) in text.chars().enumerate() {
        if policy.errors() == ErrorMode::Lossless {
            if let Some(b) = crate::lossless_byte(c) {
                out.push(b);
                in_run = false;
                continue;
            }
        }

        if encode_char(policy.codec(), c, &mut out) {
            in_run = false;
            continue;
        }

        match policy.errors() {
            ErrorMode::Strict | ErrorMode::Lossless => {
                return Err(CodecError::Unencodable {
                    codec: policy.codec(),
                    character: c,
                    index,
                });
            }
            ErrorMode::Ignore => {}
            ErrorMode::Replace => {
                if !in_run {
                    out.push(b'?');
                }
            }
            ErrorMode::BackslashReplace => {
                let code = c as u32;
                let _ = if code <= 0xFF {
                    write!(out, "\\x{code:02x}")
                } else if code <= 0xFFFF {
                    write!(out, "\\u{code:04x}")
                } else {
                    write!(out, "\\U{code:08x}")
                };
            }
        }

        if !in_run {
            tracing::trace!(
                codec = %policy.codec(),
                errors = %policy.errors(),
                index,
                character = ?c,
                "resolved unencodable character"
            );
        }
        in_run = true;
    }

    Ok(out)
}

/// Appends the encoding of `c` to `out`; returns false when `codec` has no
/// mapping for it.
fn encode_char(codec: Codec, c: char, out: &mut Vec<u8>) -> bool {
    match codec {
        Codec::Ascii => {
            if c.is_ascii() {
                out.push(c as u8);
                true
            } else {
                false
            }
        }
        Codec::Latin1 => match u8::try_from(u32::from(c)) {
            Ok(b) => {
                out.push(b);
                true
            }
            Err(_) => false,
        },
        Codec::Utf8 => {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            true
        }
        Codec::ShiftJis => encode_shift_jis(c, out),
        Codec::WideShiftJis => encode_shift_jis(widen(c), out),
    }
}

/// Encodes `c` only when its bytes decode back to `c`. The WHATWG table
/// maps some characters onto bytes that read as a different one, such as
/// U+00A5 onto 0x5C.
fn encode_shift_jis(c: char, out: &mut Vec<u8>) -> bool {
    match shift_jis_bytes(c) {
        Some(bytes) if shift_jis_unit(&bytes) == Some(c) => {
            out.extend_from_slice(&bytes);
            true
        }
        _ => false,
    }
}

/// Raw table lookup, without the round-trip check.
pub(crate) fn shift_jis_bytes(c: char) -> Option<Vec<u8>> {
    let mut buf = [0u8; 4];
    let (bytes, _, had_errors) = SHIFT_JIS.encode(c.encode_utf8(&mut buf));
    (!had_errors).then(|| bytes.into_owned())
}
