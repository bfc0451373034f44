//! Crate-wide error type for the boundary concerns (I/O, parsing,
//! usage) — see SPEC_FULL.md §7. Structural contract violations and
//! analyzer-inconsistency bugs are *not* represented here; those stay
//! `panic!`/`assert!` at the detection site because they are
//! programmer errors, not recoverable conditions.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed AIGER input: {0}")]
    AigerParse(String),

    #[error("malformed pattern file: {0}")]
    PatternParse(String),

    #[error("bad CLI usage: {0}")]
    Usage(String),

    #[error("unsupported node type: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, Error>;
