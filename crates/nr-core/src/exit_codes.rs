//! Exit codes for the nightly-report CLI.
//!
//! Exit codes communicate the run outcome to the scheduler without
//! requiring log parsing.
//!
//! Exit code ranges:
//! - 0-9: Operational outcomes (the batch ran)
//! - 10-19: User/environment errors (fixable by changing config or setup)
//! - 20-29: Internal errors

/// Exit codes for nightly-report runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    // ========================================================================
    // Operational Outcomes (0-9)
    // ========================================================================
    /// Every stage ran; some sections may be empty.
    Clean = 0,

    /// Reports were built and written, but the email was not delivered.
    DeliveryFailed = 3,

    // ========================================================================
    // User / Environment Errors (10-19)
    // ========================================================================
    /// Invalid arguments
    ArgsError = 10,

    /// Config file missing, unreadable, or invalid
    ConfigError = 11,

    /// Data source unreachable or rejected the credentials
    ConnectionError = 12,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O error (output directory, log file)
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Check if this exit code indicates the batch ran (codes 0-9).
    pub fn is_operational(self) -> bool {
        (self as i32) < 10
    }

    /// Check if this exit code indicates any error requiring attention.
    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }

    /// Get the code name as a string constant (for structured logs).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::DeliveryFailed => "ERR_DELIVERY",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::ConnectionError => "ERR_CONNECTION",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(ExitCode::ConnectionError.to_string(), "ERR_CONNECTION (12)");
    }

    #[test]
    fn test_delivery_failure_is_operational() {
        assert!(ExitCode::DeliveryFailed.is_operational());
        assert!(!ExitCode::DeliveryFailed.is_error());
        assert!(ExitCode::ConfigError.is_error());
    }
}
