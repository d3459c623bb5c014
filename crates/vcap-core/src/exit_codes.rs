//! Exit codes for the vcap CLI.
//!
//! Exit code ranges:
//! - 0-9: Success/operational outcomes
//! - 10-19: User/environment errors (recoverable by user action)
//! - 20-29: Internal errors (bugs, should be reported)

use crate::refresh::RefreshReport;

/// Exit codes for vcap operations.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    // ========================================================================
    // Success / Operational Outcomes (0-9)
    // ========================================================================
    /// Snapshot produced with at least one usable model
    Clean = 0,

    /// Snapshot produced, but the node exposes no usable model
    NoUsableModels = 1,

    /// Snapshot produced, some usable models lacked feature data
    Degraded = 2,

    // ========================================================================
    // User / Environment Errors (10-19)
    // ========================================================================
    /// Invalid arguments
    ArgsError = 10,

    /// Configuration missing or invalid
    ConfigError = 11,

    /// Capability document could not be read
    DocumentUnavailable = 12,

    /// Capability document is malformed
    DocumentMalformed = 13,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report)
    InternalError = 20,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Check if this exit code indicates an operational outcome (codes 0-9).
    pub fn is_operational(self) -> bool {
        (self as i32) < 10
    }

    /// Check if this exit code is a user/environment error (codes 10-19).
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    /// Check if this exit code is an internal error (codes 20-29).
    pub fn is_internal_error(self) -> bool {
        (self as i32) >= 20
    }

    /// Get the code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::NoUsableModels => "OK_NO_USABLE_MODELS",
            ExitCode::Degraded => "OK_DEGRADED",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::DocumentUnavailable => "ERR_DOCUMENT_UNAVAILABLE",
            ExitCode::DocumentMalformed => "ERR_DOCUMENT_MALFORMED",
            ExitCode::InternalError => "ERR_INTERNAL",
        }
    }

    /// Exit code for a completed refresh.
    ///
    /// Degraded takes precedence: usable models whose feature data all
    /// failed still count as usable models.
    pub fn from_report(report: &RefreshReport) -> Self {
        if report.is_degraded() {
            ExitCode::Degraded
        } else if report.candidates.is_empty() {
            ExitCode::NoUsableModels
        } else {
            ExitCode::Clean
        }
    }

    /// Exit code for a workspace error.
    pub fn from_error(err: &vcap_common::Error) -> Self {
        match err {
            vcap_common::Error::Config(_) | vcap_common::Error::InvalidSettings(_) => {
                ExitCode::ConfigError
            }
            vcap_common::Error::DocumentUnavailable { .. } => ExitCode::DocumentUnavailable,
            vcap_common::Error::MalformedDocument { .. } => ExitCode::DocumentMalformed,
            vcap_common::Error::Json(_) => ExitCode::InternalError,
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.as_i32() as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::CapabilityAggregator;
    use crate::refresh::refresh;
    use crate::source::StaticSource;

    #[test]
    fn test_ranges() {
        assert!(ExitCode::Clean.is_operational());
        assert!(ExitCode::Degraded.is_operational());
        assert!(ExitCode::DocumentMalformed.is_user_error());
        assert!(!ExitCode::DocumentMalformed.is_internal_error());
        assert!(ExitCode::InternalError.is_internal_error());
    }

    #[test]
    fn test_code_values_are_stable() {
        assert_eq!(ExitCode::Clean.as_i32(), 0);
        assert_eq!(ExitCode::NoUsableModels.as_i32(), 1);
        assert_eq!(ExitCode::ConfigError.as_i32(), 11);
        assert_eq!(ExitCode::DocumentMalformed.as_i32(), 13);
        assert_eq!(ExitCode::InternalError.as_i32(), 20);
    }

    #[test]
    fn test_from_error() {
        let err = vcap_common::Error::MalformedDocument {
            document: "caps".to_string(),
            reason: "eof".to_string(),
        };
        assert_eq!(ExitCode::from_error(&err), ExitCode::DocumentMalformed);
        assert_eq!(
            ExitCode::from_error(&vcap_common::Error::InvalidSettings("x".into())),
            ExitCode::ConfigError
        );
    }

    fn report(caps: &str, features: &[(&str, &str)]) -> RefreshReport {
        let mut source = StaticSource::new(caps);
        for (model, doc) in features {
            source = source.with_feature(*model, *doc);
        }
        refresh(&source, &CapabilityAggregator::default()).unwrap()
    }

    const ONE_USABLE: &str = "<domainCapabilities><cpu><mode name='custom'>\
<model usable='yes'>Haswell</model></mode></cpu></domainCapabilities>";

    #[test]
    fn test_from_report_clean() {
        let report = report(
            ONE_USABLE,
            &[("Haswell", "<cpu><feature policy='require' name='vmx'/></cpu>")],
        );
        assert_eq!(ExitCode::from_report(&report), ExitCode::Clean);
    }

    #[test]
    fn test_from_report_all_models_degraded() {
        // Haswell is usable but has no feature document.
        let report = report(ONE_USABLE, &[]);
        assert!(report.snapshot.is_empty());
        assert_eq!(ExitCode::from_report(&report), ExitCode::Degraded);
    }

    #[test]
    fn test_from_report_no_usable_models() {
        let report = report(
            "<domainCapabilities><cpu><mode name='custom'>\
<model usable='no'>Haswell</model></mode></cpu></domainCapabilities>",
            &[],
        );
        assert_eq!(ExitCode::from_report(&report), ExitCode::NoUsableModels);
    }

    #[test]
    fn test_code_names() {
        assert_eq!(ExitCode::Clean.code_name(), "OK_CLEAN");
        assert_eq!(ExitCode::DocumentUnavailable.code_name(), "ERR_DOCUMENT_UNAVAILABLE");
    }
}
