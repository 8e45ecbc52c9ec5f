//! SQLite helper utilities for type conversion
//!
//! SQLite has no array or boolean columns. Lists are stored as JSON text and
//! booleans as 0/1 integers.

use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};

// ============================================================================
// Array/Vec Helpers (stored as JSON strings in SQLite)
// ============================================================================

/// Serialize a Vec to a JSON string for SQLite storage
#[inline]
pub fn vec_to_json<T: Serialize>(v: &[T]) -> String {
    serde_json::to_string(v).unwrap_or_else(|_| "[]".to_string())
}

/// Deserialize a JSON string from SQLite to a Vec
#[inline]
pub fn json_to_vec<T: DeserializeOwned>(s: &str) -> Vec<T> {
    serde_json::from_str(s).unwrap_or_default()
}

// ============================================================================
// Timestamp Helpers (stored as ISO8601 TEXT in SQLite)
// ============================================================================

/// Get current UTC timestamp as ISO8601 string for SQLite
#[inline]
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339()
}

// ============================================================================
// Boolean Helpers (SQLite uses 0/1 integers)
// ============================================================================

/// Convert bool to SQLite integer (0 or 1)
#[inline]
pub fn bool_to_int(b: bool) -> i32 {
    if b { 1 } else { 0 }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_json_roundtrip() {
        let v = vec!["Drama".to_string(), "Sci-Fi & Fantasy".to_string()];
        let json = vec_to_json(&v);
        let parsed: Vec<String> = json_to_vec(&json);
        assert_eq!(v, parsed);
    }

    #[test]
    fn test_json_to_vec_tolerates_garbage() {
        let parsed: Vec<String> = json_to_vec("not json");
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_bool_conversion() {
        assert_eq!(bool_to_int(true), 1);
        assert_eq!(bool_to_int(false), 0);
    }

    #[test]
    fn test_now_is_rfc3339() {
        let now = now_iso8601();
        assert!(chrono::DateTime::parse_from_rfc3339(&now).is_ok());
    }
}
