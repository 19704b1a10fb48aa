//! Result classification
//!
//! Maps a finished job's exit code to the result taxonomy exposed to API
//! clients. This table is the single source of truth for that mapping;
//! reason strings are fixed templates so they stay stable for clients.

use sbomgen_core::domain::request::ResultCode;

/// Classifies a generation tool exit code
///
/// Unknown exit codes are treated as system errors.
pub fn classify(exit_code: i32) -> (ResultCode, &'static str) {
    match exit_code {
        0 => (ResultCode::Success, "Generation finished successfully"),
        1 => (
            ResultCode::ErrGeneral,
            "General error occurred while generating the manifest",
        ),
        2 => (ResultCode::ErrConfigInvalid, "Configuration validation failed"),
        3 => (
            ResultCode::ErrConfigMissing,
            "Could not obtain configuration for the requested target",
        ),
        4 => (
            ResultCode::ErrIndexInvalid,
            "Requested product index is out of range",
        ),
        5 => (ResultCode::ErrGeneration, "Generation process failed"),
        99 => (ResultCode::ErrSystem, "A system error occurred"),
        _ => (ResultCode::ErrSystem, "Unexpected generation exit code"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_exit_codes() {
        assert_eq!(classify(0).0, ResultCode::Success);
        assert_eq!(classify(1).0, ResultCode::ErrGeneral);
        assert_eq!(classify(2).0, ResultCode::ErrConfigInvalid);
        assert_eq!(classify(3).0, ResultCode::ErrConfigMissing);
        assert_eq!(classify(4).0, ResultCode::ErrIndexInvalid);
        assert_eq!(classify(5).0, ResultCode::ErrGeneration);
        assert_eq!(classify(99).0, ResultCode::ErrSystem);
    }

    #[test]
    fn test_unknown_exit_code_is_system_error() {
        let (code, reason) = classify(7);
        assert_eq!(code, ResultCode::ErrSystem);
        assert_eq!(reason, "Unexpected generation exit code");

        assert_eq!(classify(-1).0, ResultCode::ErrSystem);
        assert_eq!(classify(137).0, ResultCode::ErrSystem);
    }

    #[test]
    fn test_reasons_are_fixed_templates() {
        // Same code, same reason, every time
        assert_eq!(classify(5).1, classify(5).1);
        assert_eq!(classify(99).1, "A system error occurred");
    }
}
