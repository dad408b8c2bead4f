/* src/error.rs */
//! Error type shared by the matrix engine, the network and the driver.
//!
//! Contract violations (bad shapes, mismatched multiply dimensions) are
//! asserted in debug builds and never reach this type. Everything here is a
//! recoverable resource or data failure that unwinds a forward pass back to
//! the caller through `?`.
/*▫~•◦────────────────────────────────────────────────────────────────────────────────────‣
 * © 2025 ArcMoon Studios ◦ SPDX-License-Identifier MIT OR Apache-2.0 ◦ Author: Lord Xyn ✶
 *///◦────────────────────────────────────────────────────────────────────────────────────‣

use thiserror::Error;

/// Unified error type for the squiggler engine.
#[derive(Error, Debug)]
pub enum SquiggleError {
    /// A matrix was requested with a zero row or column count.
    #[error("Matrix dimensions must be positive (got {nr} x {nc})")]
    ZeroDimension {
        /// Requested logical row count
        nr: usize,
        /// Requested column count
        nc: usize,
    },

    /// The padded byte size of a matrix does not fit in memory addressing.
    #[error("Padded size of a {nr} x {nc} matrix overflows")]
    SizeOverflow {
        /// Requested logical row count
        nr: usize,
        /// Requested column count
        nc: usize,
    },

    /// The allocator refused a request.
    #[error("Failed to allocate {bytes} bytes")]
    Allocation {
        /// Size of the refused request
        bytes: usize,
    },

    /// A flat buffer does not hold the expected number of elements.
    #[error("Expected {expected} elements, found {actual}")]
    LengthMismatch {
        /// Element count implied by the shape
        expected: usize,
        /// Element count supplied
        actual: usize,
    },

    /// A sequence with no bases was submitted for prediction.
    #[error("Sequence is empty")]
    EmptySequence,

    /// A character outside the ACGT alphabet was found while encoding.
    #[error("Unrecognised base {base:?} at position {position}")]
    InvalidBase {
        /// Zero-based offset of the offending character
        position: usize,
        /// The offending character
        base: char,
    },

    /// A weight table is malformed or inconsistent with the network topology.
    #[error("Weights Error: {message}")]
    Weights {
        /// Description of the inconsistency
        message: String,
    },

    /// A configuration file could not be interpreted.
    #[error("Configuration Error: {message}")]
    Config {
        /// Description of the configuration failure
        message: String,
    },

    /// Malformed sequence input.
    #[error("Parse Error (line {line}): {message}")]
    Parse {
        /// One-based line number in the input
        line: usize,
        /// Description of the malformed content
        message: String,
    },

    /// An error related to system I/O.
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized `Result` type for squiggler operations.
pub type Result<T> = std::result::Result<T, SquiggleError>;
