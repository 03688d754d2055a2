use std::process::ExitStatus;
use thiserror::Error;

/// Malformed input text. Always user-correctable, never retried automatically.
#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum ParseError {
    #[error("cannot parse amount '{0}'")]
    Amount(String),
}

/// A resolved transaction failed a precondition before printing.
///
/// The variants are checked in declaration order, which is part of the
/// contract with callers rendering user-facing messages.
#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum ValidationError {
    #[error("narration cannot be empty")]
    EmptyNarration,
    #[error("category account cannot be empty")]
    EmptyCategory,
    #[error("source account cannot be empty")]
    EmptySource,
    #[error("amount cannot be zero")]
    ZeroAmount,
    #[error("amount cannot be negative")]
    NegativeAmount,
}

/// The ledger engine could not produce a usable snapshot.
///
/// An `Ok` with no accounts always means "no accounts", never a failed load.
#[derive(Debug, Error)]
pub(crate) enum LedgerError {
    #[error("cannot read ledger: {0}")]
    Io(#[from] std::io::Error),
    #[error("ledger parse failed with {count} errors:\n{report}")]
    Parse { count: usize, report: String },
    #[error("ledger invalid: {}", errors.join("; "))]
    Invalid { errors: Vec<String> },
}

/// Stale or unknown selection state. The state is unrecoverable and has
/// already been discarded; the user gets a generic retry message.
#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum SelectorError {
    #[error("no selection in progress for message {0}")]
    UnknownState(String),
    #[error("choice {index} out of range for {len} options")]
    ChoiceOutOfRange { index: usize, len: usize },
}

/// Remote pull/push failure, uniform across sync backends.
#[derive(Debug, Error)]
pub(crate) enum SyncError {
    #[error("sync failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("{command} exited with {status}")]
    Command { command: String, status: ExitStatus },
}

/// Failure while committing a rendered transaction to the ledger file.
///
/// `Rejected` means the appended entry was rolled back and the file on disk
/// equals its pre-append content.
#[derive(Debug, Error)]
pub(crate) enum CommitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("ledger rejected the new entry (rolled back): {0}")]
    Rejected(LedgerError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error("cannot update ledger file: {0}")]
    Io(#[from] std::io::Error),
}

/// Narration memory snapshot could not be read or written.
#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("configuration error: {name} is invalid ({reason})")]
pub(crate) struct ConfigError {
    pub(crate) name: &'static str,
    pub(crate) reason: &'static str,
}
