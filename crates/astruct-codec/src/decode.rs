//! Bytes → text.
//!
//! Each codec walks its input and reports decoded text and undecodable byte
//! ranges to a [`Resolver`], which merges adjacent ranges into maximal runs
//! and resolves every run according to the policy's [`ErrorMode`].

use std::fmt::Write as _;
use std::ops::Range;

use encoding_rs::SHIFT_JIS;

use crate::encode::shift_jis_bytes;
use crate::error::CodecError;
use crate::policy::{Codec, EncodingPolicy, ErrorMode};
use crate::wide::narrow;

pub(crate) fn decode(policy: &EncodingPolicy, src: &[u8]) -> Result<String, CodecError> {
    let mut resolver = Resolver::new(policy, src);

    match policy.codec() {
        Codec::Ascii => {
            for (i, &b) in src.iter().enumerate() {
                if b.is_ascii() {
                    resolver.push_char(b as char, i..i + 1)?;
                } else {
                    resolver.invalid(i..i + 1)?;
                }
            }
        }
        Codec::Latin1 => {
            for (i, &b) in src.iter().enumerate() {
                resolver.push_char(char::from(b), i..i + 1)?;
            }
        }
        Codec::Utf8 => decode_utf8(src, &mut resolver)?,
        Codec::ShiftJis | Codec::WideShiftJis => decode_shift_jis(src, &mut resolver)?,
    }

    resolver.finish()
}

fn decode_utf8(src: &[u8], resolver: &mut Resolver<'_>) -> Result<(), CodecError> {
    let mut pos = 0;

    while pos < src.len() {
        let (valid_len, bad_len) = match std::str::from_utf8(&src[pos..]) {
            Ok(_) => (src.len() - pos, 0),
            Err(e) => (
                e.valid_up_to(),
                e.error_len().unwrap_or(src.len() - pos - e.valid_up_to()),
            ),
        };

        if let Ok(valid) = std::str::from_utf8(&src[pos..pos + valid_len]) {
            for (i, c) in valid.char_indices() {
                let start = pos + i;
                resolver.push_char(c, start..start + c.len_utf8())?;
            }
        }

        let bad_start = pos + valid_len;
        resolver.invalid(bad_start..bad_start + bad_len)?;
        pos = bad_start + bad_len;
    }

    Ok(())
}

/// Decodes one character unit at a time. A unit only counts as valid when
/// it encodes back to exactly the same bytes, which excludes the duplicate
/// NEC/IBM rows and the private-use rows of the WHATWG table. When a
/// two-byte unit is rejected only its lead byte is undecodable; the trail
/// byte is examined again on its own.
fn decode_shift_jis(src: &[u8], resolver: &mut Resolver<'_>) -> Result<(), CodecError> {
    let mut pos = 0;

    while pos < src.len() {
        let lead = src[pos];
        let unit_len = match src.get(pos + 1) {
            Some(&trail) if is_shift_jis_lead(lead) && is_shift_jis_trail(trail) => 2,
            _ => 1,
        };

        match shift_jis_unit(&src[pos..pos + unit_len]) {
            Some(c) => {
                resolver.push_char(c, pos..pos + unit_len)?;
                pos += unit_len;
            }
            None => {
                resolver.invalid(pos..pos + 1)?;
                pos += 1;
            }
        }
    }

    Ok(())
}

fn is_shift_jis_lead(b: u8) -> bool {
    matches!(b, 0x81..=0x9F | 0xE0..=0xFC)
}

fn is_shift_jis_trail(b: u8) -> bool {
    matches!(b, 0x40..=0x7E | 0x80..=0xFC)
}

/// Decodes one Shift-JIS unit, accepting it only if the character encodes
/// back to exactly these bytes.
pub(crate) fn shift_jis_unit(unit: &[u8]) -> Option<char> {
    let decoded = SHIFT_JIS.decode_without_bom_handling_and_without_replacement(unit)?;
    let mut chars = decoded.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }

    (shift_jis_bytes(c).as_deref() == Some(unit)).then_some(c)
}

/// Accumulates decoded text and resolves undecodable runs.
struct Resolver<'a> {
    policy: &'a EncodingPolicy,
    src: &'a [u8],
    out: String,
    pending: Option<Range<usize>>,
}

impl<'a> Resolver<'a> {
    fn new(policy: &'a EncodingPolicy, src: &'a [u8]) -> Self {
        Self {
            policy,
            src,
            out: String::with_capacity(src.len()),
            pending: None,
        }
    }

    /// Appends a decoded character that came from `source`. Under
    /// `Lossless`, a decoded character that collides with the reserved block
    /// is kept as raw bytes so encoding cannot mistake it for a placeholder.
    fn push_char(&mut self, c: char, source: Range<usize>) -> Result<(), CodecError> {
        if self.policy.errors() == ErrorMode::Lossless && crate::lossless_byte(c).is_some() {
            return self.invalid(source);
        }

        self.flush()?;
        if self.policy.codec() == Codec::WideShiftJis {
            self.out.push(narrow(c));
        } else {
            self.out.push(c);
        }
        Ok(())
    }

    fn invalid(&mut self, range: Range<usize>) -> Result<(), CodecError> {
        if range.is_empty() {
            return Ok(());
        }

        if let Some(run) = self.pending.as_mut() {
            if run.end == range.start {
                run.end = range.end;
                return Ok(());
            }
        }

        self.flush()?;
        self.pending = Some(range);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), CodecError> {
        let Some(run) = self.pending.take() else {
            return Ok(());
        };

        let src = self.src;
        let bytes = &src[run.clone()];
        match self.policy.errors() {
            ErrorMode::Strict => {
                return Err(CodecError::Undecodable {
                    codec: self.policy.codec(),
                    offset: run.start,
                    bytes: bytes.to_vec(),
                });
            }
            ErrorMode::Ignore => {}
            ErrorMode::Replace => self.out.push(char::REPLACEMENT_CHARACTER),
            ErrorMode::Lossless => self.out.extend(bytes.iter().map(|&b| crate::lossless_char(b))),
            ErrorMode::BackslashReplace => {
                for b in bytes {
                    let _ = write!(self.out, "\\x{b:02x}");
                }
            }
        }

        tracing::trace!(
            codec = %self.policy.codec(),
            errors = %self.policy.errors(),
            offset = run.start,
            len = run.len(),
            "resolved undecodable byte run"
        );

        Ok(())
    }

    fn finish(mut self) -> Result<String, CodecError> {
        self.flush()?;
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(codec: Codec, errors: ErrorMode) -> EncodingPolicy {
        EncodingPolicy::new(codec, errors)
    }

    #[test]
    fn test_shift_jis() {
        let p = policy(Codec::ShiftJis, ErrorMode::Strict);
        assert_eq!(p.decode(&[0x8C, 0x95, b'A']).unwrap(), "剣A");
    }

    #[test]
    fn test_strict_reports_run() {
        let p = policy(Codec::ShiftJis, ErrorMode::Strict);
        assert_eq!(
            p.decode(b"AB\xff").unwrap_err(),
            CodecError::Undecodable {
                codec: Codec::ShiftJis,
                offset: 2,
                bytes: vec![0xff],
            }
        );
    }

    #[test]
    fn test_ignore() {
        let p = policy(Codec::ShiftJis, ErrorMode::Ignore);
        assert_eq!(p.decode(b"A\xff\xfeB").unwrap(), "AB");
    }

    #[test]
    fn test_replace_one_placeholder_per_run() {
        let p = policy(Codec::ShiftJis, ErrorMode::Replace);
        assert_eq!(p.decode(b"A\xff\xfeB").unwrap(), "A\u{FFFD}B");
        assert_eq!(p.decode(b"\xffA\xff").unwrap(), "\u{FFFD}A\u{FFFD}");
    }

    #[test]
    fn test_backslash_replace() {
        let p = policy(Codec::ShiftJis, ErrorMode::BackslashReplace);
        assert_eq!(p.decode(b"A\xffB").unwrap(), "A\\xffB");
    }

    #[test]
    fn test_lossless_maps_each_byte() {
        let p = policy(Codec::Ascii, ErrorMode::Lossless);
        let text = p.decode(b"A\x80\xff").unwrap();
        let chars: Vec<char> = text.chars().collect();
        assert_eq!(
            chars,
            vec!['A', crate::lossless_char(0x80), crate::lossless_char(0xff)]
        );
    }

    #[test]
    fn test_utf8_truncated_tail() {
        let p = policy(Codec::Utf8, ErrorMode::Replace);
        assert_eq!(p.decode(&[b'A', 0xE3, 0x81]).unwrap(), "A\u{FFFD}");

        let strict = policy(Codec::Utf8, ErrorMode::Strict);
        assert!(matches!(
            strict.decode(&[b'A', 0xE3, 0x81]),
            Err(CodecError::Undecodable { offset: 1, .. })
        ));
    }

    #[test]
    fn test_latin1_never_fails() {
        let p = policy(Codec::Latin1, ErrorMode::Strict);
        assert_eq!(p.decode(&[0x41, 0xE9, 0xFF]).unwrap(), "Aéÿ");
    }

    #[test]
    fn test_wide_shift_jis_narrows() {
        let p = policy(Codec::WideShiftJis, ErrorMode::Strict);
        // "Ａ！　ｂ"
        let bytes = [0x82, 0x60, 0x81, 0x49, 0x81, 0x40, 0x82, 0x82];
        assert_eq!(p.decode(&bytes).unwrap(), "A! b");
    }

    #[test]
    fn test_empty_input() {
        let p = policy(Codec::ShiftJis, ErrorMode::Strict);
        assert_eq!(p.decode(&[]).unwrap(), "");
    }
}
