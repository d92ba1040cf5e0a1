//! Full-width ↔ ASCII folding used by [`Codec::WideShiftJis`](crate::Codec::WideShiftJis).
//!
//! Printable ASCII `'!'..='~'` corresponds to U+FF01..=U+FF5E and space
//! corresponds to U+3000 IDEOGRAPHIC SPACE.

const FULLWIDTH_OFFSET: u32 = 0xFF01 - '!' as u32;
const IDEOGRAPHIC_SPACE: char = '\u{3000}';

/// Maps printable ASCII (and space) to its full-width form.
pub fn widen(c: char) -> char {
    match c {
        ' ' => IDEOGRAPHIC_SPACE,
        '!'..='~' => char::from_u32(c as u32 + FULLWIDTH_OFFSET).unwrap_or(c),
        _ => c,
    }
}

/// Maps full-width forms (and U+3000) back to printable ASCII.
pub fn narrow(c: char) -> char {
    match c {
        IDEOGRAPHIC_SPACE => ' ',
        '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - FULLWIDTH_OFFSET).unwrap_or(c),
        _ => c,
    }
}
