//! Crate-level error aggregation.
//!
//! Per-subsystem `thiserror` enums (`cart::Error`, `mapper::Error`, `fs::Error`) report their own
//! configuration-error variants; this top-level `Error` aggregates them for callers that load ROMs
//! or persist state through more than one of those subsystems at once. Recoverable construction
//! failures return through this `Result`; the fatal `panic!`/`assert!`/`unreachable!` class is
//! reserved for logic errors, not configuration errors.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
#[must_use]
pub enum Error {
    #[error(transparent)]
    Cart(#[from] crate::cart::Error),
    #[error(transparent)]
    Mapper(#[from] crate::mapper::Error),
    #[error(transparent)]
    Fs(#[from] crate::fs::Error),
}
