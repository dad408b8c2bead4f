/* src/lib.rs */
#![warn(missing_docs)]
#![allow(clippy::too_many_arguments, clippy::module_name_repetitions)]
//! # Squiggler: Padded SIMD Matrix Engine
//!
//! Predicts nanopore current traces ("squiggles") from DNA sequence with a
//! small inference network built on lane-padded, column-major matrices.
//!
//! ## Core Features
//!
//! - 16-byte aligned padded matrices with scalar and lane views of one buffer
//! - Debug-gated contract validator for bounds, finiteness and padding masks
//! - Affine kernels delegating the multiply to `faer`
//! - Masked SIMD column normalisation, extrema and tolerance equality
//! - FASTA / FASTQ input and tab-separated or JSON reports
//!
/*▫~•◦────────────────────────────────────────────────────────────────────────────────────‣
 * © 2025 ArcMoon Studios ◦ SPDX-License-Identifier MIT OR Apache-2.0 ◦ Author: Lord Xyn ✶
 *///◦────────────────────────────────────────────────────────────────────────────────────‣

pub mod config;
pub mod convert;
pub mod error;
pub mod fasta;
pub mod gemm;
pub mod linalg;
pub mod matrix;
pub mod network;
pub mod reduce;
pub mod squiggle;
pub mod validate;

pub use config::{load_config, AppConfig, ReportFormat};
pub use convert::{format_matrix, from_flat_array, to_flat_array};
pub use error::{Result, SquiggleError};
pub use fasta::{FastaReader, FastaRecord};
pub use gemm::{FaerGemm, Gemm};
pub use linalg::{affine_map, affine_map2};
pub use matrix::{IMatrix, Matrix, PaddedMatrix, LANE_WIDTH};
pub use network::{ModelWeights, SquiggleModel};
pub use reduce::{
    argmax_matrix, argmin_matrix, equality, max_matrix, min_matrix, row_normalise_inplace,
};
pub use squiggle::{
    encode_bases, predict_files, predict_records, sequence_to_squiggle, write_json_record,
    write_tsv_record, PredictCounts, PredictSettings,
};
