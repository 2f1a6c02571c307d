//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: MDM scripts branch on them.
//!
//! | Code | Meaning                                               |
//! |------|-------------------------------------------------------|
//! | 0    | Every expected payload and the onboarding info are OK |
//! | 1    | General error (unspecified)                           |
//! | 2    | Usage error (bad arguments, invalid config file)      |
//! | 3    | Reconciliation finished with warnings                 |
//! | 4    | Reconciliation finished with errors                   |
//! | 5    | A document could not be parsed                        |
//! | 6    | A source could not be acquired                        |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use mdmcheck_recon::Severity;

/// Success - command completed, nothing to report.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unreadable or invalid config.
pub const EXIT_USAGE: u8 = 2;

/// Value/override mismatches, duplicates, or warning diagnostics.
pub const EXIT_CHECK_WARNINGS: u8 = 3;

/// Missing payloads, missing onboarding info, or malformed items.
pub const EXIT_CHECK_ERRORS: u8 = 4;

/// A whole document (profiles, template, overrides) failed to parse.
pub const EXIT_PARSE: u8 = 5;

/// `profiles` command failed, template download failed, or a named file is unreadable.
pub const EXIT_SOURCE: u8 = 6;

/// Map the overall severity of a run to its exit code.
pub fn severity_exit_code(severity: Severity) -> u8 {
    match severity {
        Severity::Success => EXIT_SUCCESS,
        Severity::Warning => EXIT_CHECK_WARNINGS,
        Severity::Error => EXIT_CHECK_ERRORS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severities_map_to_distinct_codes() {
        assert_eq!(severity_exit_code(Severity::Success), 0);
        assert_eq!(severity_exit_code(Severity::Warning), 3);
        assert_eq!(severity_exit_code(Severity::Error), 4);
    }
}
