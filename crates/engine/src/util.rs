//! Internal helpers for input normalization and conversion.
//!
//! These utilities are **not** part of the public API.

use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Trim a free-text field, mapping blank values to `None`.
pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Trim a required identifier and reject blank values.
pub(crate) fn normalize_required(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidAmount(format!(
            "{label} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::KeyNotFound(format!("invalid {label} id")))
}

/// Narrow a count or weight to the `INTEGER` column type.
pub(crate) fn to_i32<T: TryInto<i32>>(value: T, label: &str) -> ResultEngine<i32> {
    value
        .try_into()
        .map_err(|_| EngineError::InvalidAmount(format!("{label} is too large")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_text_drops_blank_values() {
        assert_eq!(normalize_optional_text(Some("  ")), None);
        assert_eq!(
            normalize_optional_text(Some(" food ")),
            Some("food".to_string())
        );
        assert_eq!(normalize_optional_text(None), None);
    }

    #[test]
    fn required_rejects_blank() {
        assert!(normalize_required(" ", "username").is_err());
        assert_eq!(normalize_required(" bob ", "username").unwrap(), "bob");
    }

    #[test]
    fn to_i32_rejects_values_out_of_range() {
        assert_eq!(to_i32(7_u32, "shares").unwrap(), 7);
        assert!(matches!(
            to_i32(u32::MAX, "shares").unwrap_err(),
            EngineError::InvalidAmount(_)
        ));
        assert!(to_i32(usize::MAX, "position").is_err());
    }
}
