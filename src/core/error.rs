//! Error types describing the failure modes of rule loading, pattern
//! compilation, molecule parsing, and the transformation engine.
//!
//! A single `EngineError` covers every fatal condition so that library
//! consumers can bubble one type up while still inspecting fine-grained
//! context when needed. The per-molecule output cap is the only recoverable
//! condition and is modeled separately so orchestration code can match on it.

use thiserror::Error;

/// Root error emitted by every fallible operation in the crate.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A rule or vector-binding file could not be opened or read.
    #[error("failed to read rule file '{path}'")]
    RuleFile {
        /// Path of the file that could not be read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Two vector bindings share a name but carry different definitions.
    #[error(
        "duplicate names for different vector bindings: '{name}' defined as '{first}' and '{second}'"
    )]
    ConflictingBinding {
        /// The shared binding name.
        name: String,
        /// Definition seen first.
        first: String,
        /// Conflicting definition seen second.
        second: String,
    },

    /// A rule's pattern failed to compile into an applier.
    #[error("failed to compile rule '{rule}' (expanded to '{expanded}'): {reason}")]
    PatternCompile {
        /// Name of the offending rule.
        rule: String,
        /// Pattern text after vector-binding expansion.
        expanded: String,
        /// Parser or builder diagnostic.
        reason: String,
    },

    /// A SMILES string from the input stream could not be parsed.
    #[error("failed to parse SMILES '{input}': {reason}")]
    SmilesParse {
        /// The offending input text.
        input: String,
        /// Parser diagnostic with position information.
        reason: String,
    },

    /// The run configuration is inconsistent or incomplete.
    #[error("{0}")]
    Config(String),

    /// An input or output molecule stream failed.
    #[error("molecule stream error on '{path}'")]
    Stream {
        /// Path of the stream that failed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Recoverable per-molecule condition: enumeration exceeded the configured
/// output cap. The partial tautomer set is discarded and the caller falls
/// back to the standardised molecule.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("maximum number of output molecules exceeded for '{title}'")]
pub struct TooManyTautomers {
    /// Title of the input molecule whose enumeration overflowed.
    pub title: String,
}
