//! The transformation engine: fixed-point graph rewriting under a rule
//! set.
//!
//! Two modes share the machinery. The standardiser applies rules
//! exhaustively and keeps only the final product along a convergent path;
//! the enumerator collects every distinct product reachable through the
//! rules. Both deduplicate by canonical SMILES, never by object identity.

pub mod enumerate;
pub mod standardise;
pub mod stereo;

pub use enumerate::{enumerate, EnumerateOptions};
pub use standardise::{standardise, Standardised, StandardiseOptions};

use crate::core::error::{EngineError, TooManyTautomers};
use thiserror::Error;

/// Outcome channel for one enumeration pass, split so orchestration code
/// can pattern-match the recoverable output-cap overflow apart from fatal
/// failures.
#[derive(Debug, Error)]
pub enum EnumerateError {
    /// The per-molecule output cap was exceeded; the partial set has been
    /// discarded.
    #[error(transparent)]
    OverLimit(#[from] TooManyTautomers),
    /// A fatal failure, e.g. a rule that would not compile.
    #[error(transparent)]
    Engine(#[from] EngineError),
}
