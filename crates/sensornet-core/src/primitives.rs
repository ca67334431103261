//! # Engine Primitives
//!
//! Hardcoded runtime constants for the sensor network engine.
//!
//! These are compiled into the binary and are immutable at runtime.

/// Default field delimiter of the backing files.
pub const DEFAULT_DELIMITER: u8 = b',';

/// Default directory holding the four backing files.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Maximum size of a single backing file.
///
/// Larger files are treated as malformed at load time and replaced.
pub const MAX_TABLE_FILE_SIZE: u64 = 256 * 1024 * 1024;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of a text value accepted from the API boundary.
pub const MAX_VALUE_LENGTH: usize = 65536;

/// Maximum number of values in a set predicate.
pub const MAX_SET_VALUES: usize = 10000;

/// Maximum number of ids in a single delete batch.
pub const MAX_DELETE_BATCH: usize = 10000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_delimiter_is_comma() {
        assert_eq!(DEFAULT_DELIMITER, b',');
    }

    #[test]
    fn file_limit_is_positive() {
        assert!(MAX_TABLE_FILE_SIZE > 0);
    }
}
