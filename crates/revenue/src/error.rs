use thiserror::Error;

use crate::model::LedgerKind;

#[derive(Error, Debug)]
pub enum RevenueError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Config validation error (bad fraction, duplicate unit, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),

    /// Classifier rule set failed to parse or validate.
    #[error("rule set error: {0}")]
    RuleSet(String),

    #[error("coverage fraction must be in (0, 1], got {0}")]
    InvalidCoverageFraction(f64),

    /// A ledger section is structurally absent from the input.
    #[error("{ledger} ledger is missing from the input")]
    MissingLedger { ledger: LedgerKind },

    /// Mapped column not present in the ledger header.
    #[error("{ledger} ledger: missing column '{column}'")]
    MissingColumn { ledger: LedgerKind, column: String },

    #[error("{ledger} ledger: CSV error: {message}")]
    Csv { ledger: LedgerKind, message: String },

    /// IO error (file read, etc.).
    #[error("IO error: {0}")]
    Io(String),
}

pub type RevenueResult<T> = Result<T, RevenueError>;
