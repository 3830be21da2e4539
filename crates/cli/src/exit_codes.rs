//! CLI Exit Code Registry
//!
//! Single source of truth for `revcohort` exit codes. Scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain    | Description                              |
//! |---------|-----------|------------------------------------------|
//! | 0       | Universal | Success                                  |
//! | 1       | Universal | General error (unspecified)              |
//! | 2       | Universal | CLI usage error (bad args, unknown unit) |
//! | 60-69   | revenue   | Pipeline config, ledger and runtime codes |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `revenue_exit_code`

use revcohort_revenue::RevenueError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unknown `--unit`.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Revenue (60-69)
// =============================================================================

/// Config or rule set failed to parse or validate.
pub const EXIT_REVENUE_INVALID_CONFIG: u8 = 60;

/// A ledger file named by the config does not exist.
pub const EXIT_REVENUE_MISSING_LEDGER: u8 = 61;

/// IO or CSV failure while loading ledgers or writing output.
pub const EXIT_REVENUE_RUNTIME: u8 = 62;

/// Map a library error to its exit code.
pub fn revenue_exit_code(err: &RevenueError) -> u8 {
    match err {
        RevenueError::ConfigParse(_)
        | RevenueError::ConfigValidation(_)
        | RevenueError::RuleSet(_)
        | RevenueError::InvalidCoverageFraction(_) => EXIT_REVENUE_INVALID_CONFIG,
        RevenueError::MissingLedger { .. } => EXIT_REVENUE_MISSING_LEDGER,
        RevenueError::MissingColumn { .. } | RevenueError::Csv { .. } | RevenueError::Io(_) => {
            EXIT_REVENUE_RUNTIME
        }
    }
}
