//! Shared-secret check for the rebuild trigger.

use crate::error::{Result, StoreError};

/// Verify a caller-supplied secret against the configured one.
///
/// Fails with [`StoreError::Forbidden`] when no secret is configured, none
/// was supplied, or the two differ.
pub fn verify_secret(expected: Option<&str>, supplied: Option<&str>) -> Result<()> {
    match (expected, supplied) {
        (Some(expected), Some(supplied)) if constant_time_eq(expected.as_bytes(), supplied.as_bytes()) => {
            Ok(())
        }
        _ => Err(StoreError::Forbidden),
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_secret() {
        assert!(verify_secret(Some("hunter2"), Some("hunter2")).is_ok());
    }

    #[test]
    fn test_rejections() {
        assert!(matches!(
            verify_secret(Some("hunter2"), Some("hunter3")),
            Err(StoreError::Forbidden)
        ));
        assert!(verify_secret(Some("hunter2"), None).is_err());
        assert!(verify_secret(Some("hunter2"), Some("hunter")).is_err());
        assert!(verify_secret(None, Some("anything")).is_err());
        assert!(verify_secret(None, None).is_err());
    }
}
