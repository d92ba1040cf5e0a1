//! Static checks shared by schema parsing and layout synthesis.
//!
//! Everything here depends only on the declaration, never on record bytes,
//! so a schema that passes once stays valid for the life of the process.

use std::collections::HashSet;

use astruct_codec::{Codec, EncodingPolicy, ErrorMode};

use crate::errors::SchemaError;
use crate::field::{StrSpec, Termination};
use crate::layout::Packing;

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => {}
        _ => return false,
    }

    chars.all(|c| c == '_' || c.is_alphanumeric())
}

pub fn check_type_name(name: &str) -> Result<(), SchemaError> {
    if !is_identifier(name) {
        return Err(SchemaError::InvalidTypeName(name.to_string()));
    }
    Ok(())
}

/// Rejects names that are not identifiers and names already in `seen`.
pub fn check_field_name<'a>(
    seen: &mut HashSet<&'a str>,
    name: &'a str,
) -> Result<(), SchemaError> {
    if !is_identifier(name) {
        return Err(SchemaError::InvalidFieldName(name.to_string()));
    }

    if !seen.insert(name) {
        return Err(SchemaError::DuplicateField(name.to_string()));
    }

    Ok(())
}

pub fn check_string(field: &str, spec: &StrSpec) -> Result<(), SchemaError> {
    if spec.len == 0 {
        return Err(SchemaError::ZeroLengthString(field.to_string()));
    }

    if spec.len == 1 && spec.termination == Termination::Terminated {
        tracing::warn!(
            field,
            "terminated string of length 1 can only hold the empty string"
        );
    }

    Ok(())
}

/// Builds a policy from codec and error-mode names given for `field`.
pub fn resolve_policy(field: &str, codec: &str, errors: &str) -> Result<EncodingPolicy, SchemaError> {
    let codec = codec
        .parse::<Codec>()
        .map_err(|_| SchemaError::UnsupportedCodec {
            field: field.to_string(),
            name: codec.to_string(),
        })?;
    let errors = errors
        .parse::<ErrorMode>()
        .map_err(|_| SchemaError::UnsupportedErrorMode {
            field: field.to_string(),
            name: errors.to_string(),
        })?;
    Ok(EncodingPolicy::new(codec, errors))
}

pub fn check_bytes(field: &str, len: usize) -> Result<(), SchemaError> {
    if len == 0 {
        return Err(SchemaError::ZeroLengthBytes(field.to_string()));
    }
    Ok(())
}

pub fn check_array_count(field: &str, count: usize) -> Result<(), SchemaError> {
    if count == 0 {
        return Err(SchemaError::InvalidArrayCount(field.to_string()));
    }
    Ok(())
}

pub fn check_packing(packing: Packing) -> Result<(), SchemaError> {
    if let Packing::Limit(n) = packing {
        if !n.is_power_of_two() || n > 16 {
            return Err(SchemaError::InvalidPacking(n));
        }
    }
    Ok(())
}

pub fn checked_mul(field: &str, a: usize, b: usize) -> Result<usize, SchemaError> {
    a.checked_mul(b)
        .ok_or_else(|| SchemaError::SizeOverflow(field.to_string()))
}

pub fn checked_add(field: &str, a: usize, b: usize) -> Result<usize, SchemaError> {
    a.checked_add(b)
        .ok_or_else(|| SchemaError::SizeOverflow(field.to_string()))
}

/// Rounds `offset` up to a multiple of `align` (a power of two).
pub fn round_up(field: &str, offset: usize, align: usize) -> Result<usize, SchemaError> {
    let mask = align - 1;
    checked_add(field, offset, mask).map(|end| end & !mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names() {
        let mut seen = HashSet::new();
        assert!(check_field_name(&mut seen, "mastery_level").is_ok());
        assert!(check_field_name(&mut seen, "_unk1").is_ok());
        assert_eq!(
            check_field_name(&mut seen, "mastery_level"),
            Err(SchemaError::DuplicateField("mastery_level".to_string()))
        );
        assert_eq!(
            check_field_name(&mut seen, ""),
            Err(SchemaError::InvalidFieldName(String::new()))
        );
        assert_eq!(
            check_field_name(&mut seen, "1st"),
            Err(SchemaError::InvalidFieldName("1st".to_string()))
        );
    }

    #[test]
    fn test_packing() {
        assert!(check_packing(Packing::Packed).is_ok());
        assert!(check_packing(Packing::Aligned).is_ok());
        assert!(check_packing(Packing::Limit(4)).is_ok());
        assert_eq!(check_packing(Packing::Limit(3)), Err(SchemaError::InvalidPacking(3)));
        assert_eq!(check_packing(Packing::Limit(0)), Err(SchemaError::InvalidPacking(0)));
        assert_eq!(check_packing(Packing::Limit(32)), Err(SchemaError::InvalidPacking(32)));
    }

    #[test]
    fn test_round_up() {
        assert_eq!(round_up("f", 0, 4), Ok(0));
        assert_eq!(round_up("f", 5, 4), Ok(8));
        assert_eq!(round_up("f", 8, 4), Ok(8));
        assert_eq!(round_up("f", 3, 1), Ok(3));
        assert_eq!(
            round_up("f", usize::MAX, 2),
            Err(SchemaError::SizeOverflow("f".to_string()))
        );
    }

    #[test]
    fn test_resolve_policy() {
        assert_eq!(
            resolve_policy("name", "Shift-JIS", "replace"),
            Ok(EncodingPolicy::new(Codec::ShiftJis, ErrorMode::Replace))
        );
        assert_eq!(
            resolve_policy("name", "ascii", "xmlcharrefreplace"),
            Err(SchemaError::UnsupportedErrorMode {
                field: "name".to_string(),
                name: "xmlcharrefreplace".to_string(),
            })
        );
    }

    #[test]
    fn test_string_length() {
        assert_eq!(
            check_string("name", &StrSpec::new(0)),
            Err(SchemaError::ZeroLengthString("name".to_string()))
        );
        assert!(check_string("name", &StrSpec::new(1)).is_ok());
    }
}
