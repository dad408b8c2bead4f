/* src/squiggle.rs */
//! Sequence-to-squiggle driver: base encoding, prediction and the per-position
//! report writers.
/*▫~•◦────────────────────────────────────────────────────────────────────────────────────‣
 * © 2025 ArcMoon Studios ◦ SPDX-License-Identifier MIT OR Apache-2.0 ◦ Author: Lord Xyn ✶
 *///◦────────────────────────────────────────────────────────────────────────────────────‣

use std::io::{self, BufRead, Write};
use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ReportFormat;
use crate::convert::from_flat_array;
use crate::error::{Result, SquiggleError};
use crate::fasta::{FastaReader, FastaRecord};
use crate::gemm::Gemm;
use crate::matrix::{IMatrix, Matrix};
use crate::network::{SquiggleModel, NPARAM};

/// Alphabet index of `base` (A=0, C=1, G=2, T=3), ignoring case.
pub fn base_to_index(base: u8) -> Option<i32> {
    match base.to_ascii_uppercase() {
        b'A' => Some(0),
        b'C' => Some(1),
        b'G' => Some(2),
        b'T' => Some(3),
        _ => None,
    }
}

/// Encodes `sequence` as a `[1, n]` index matrix.
///
/// The first character outside the alphabet aborts the whole encoding.
pub fn encode_bases(sequence: &[u8]) -> Result<IMatrix> {
    if sequence.is_empty() {
        return Err(SquiggleError::EmptySequence);
    }
    let codes = sequence
        .iter()
        .enumerate()
        .map(|(position, &base)| {
            base_to_index(base).ok_or(SquiggleError::InvalidBase {
                position,
                base: base as char,
            })
        })
        .collect::<Result<Vec<i32>>>()?;
    from_flat_array(&codes, 1, codes.len())
}

/// Predicts a `[3, n]` squiggle for `sequence`: rows are the current level, the
/// spread and the dwell of each position.
pub fn sequence_to_squiggle<G: Gemm>(model: &SquiggleModel<G>, sequence: &[u8], rescale: bool) -> Result<Matrix> {
    let bases = encode_bases(sequence)?;
    let squiggle = model.forward(&bases, rescale)?;
    debug!(bases = sequence.len(), rescale, "Predicted squiggle");
    Ok(squiggle)
}

/// Writes `#<prefix><name>` and then `index, base, level, spread, dwell` per
/// position, tab separated.
pub fn write_tsv_record<W: Write>(
    out: &mut W,
    prefix: &str,
    name: &str,
    sequence: &[u8],
    squiggle: &Matrix,
) -> Result<()> {
    debug_assert!(squiggle.nr() >= NPARAM);
    debug_assert_eq!(squiggle.nc(), sequence.len());

    writeln!(out, "#{prefix}{name}")?;
    for (i, (column, &base)) in squiggle.columns().zip(sequence).enumerate() {
        writeln!(
            out,
            "{i}\t{}\t{:3.6}\t{:3.6}\t{:3.6}",
            base as char, column[0], column[1], column[2]
        )?;
    }
    Ok(())
}

/// Predicted parameters of one position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SquigglePosition {
    /// Zero-based position in the sequence
    pub index: usize,
    /// Base at this position, as read
    pub base: char,
    /// Expected current level
    pub current: f32,
    /// Spread of the current level
    pub spread: f32,
    /// Dwell parameter
    pub dwell: f32,
}

/// Serialized form of one predicted record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SquiggleRecord {
    /// Prefixed record name
    pub name: String,
    /// One entry per base
    pub positions: Vec<SquigglePosition>,
}

impl SquiggleRecord {
    /// Collects the logical parameters of `squiggle`.
    pub fn new(prefix: &str, name: &str, sequence: &[u8], squiggle: &Matrix) -> Self {
        let positions = squiggle
            .columns()
            .zip(sequence)
            .enumerate()
            .map(|(index, (column, &base))| SquigglePosition {
                index,
                base: base as char,
                current: column[0],
                spread: column[1],
                dwell: column[2],
            })
            .collect();
        Self {
            name: format!("{prefix}{name}"),
            positions,
        }
    }
}

/// Writes the record as one line of JSON.
pub fn write_json_record<W: Write>(
    out: &mut W,
    prefix: &str,
    name: &str,
    sequence: &[u8],
    squiggle: &Matrix,
) -> Result<()> {
    let record = SquiggleRecord::new(prefix, name, sequence, squiggle);
    serde_json::to_writer(&mut *out, &record).map_err(io::Error::from)?;
    writeln!(out)?;
    Ok(())
}

// =====================================================================================
// RECORD LOOP
// =====================================================================================

/// Settings of one prediction run.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictSettings {
    /// Maximum number of records to start; 0 is unlimited
    pub limit: usize,
    /// Text prepended to every record name
    pub prefix: String,
    /// Apply the exponential rescale
    pub rescale: bool,
    /// Report layout
    pub format: ReportFormat,
}

/// Running totals of a prediction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PredictCounts {
    /// Well-formed records taken from the input, including failed predictions
    pub started: usize,
    /// Records written to the report
    pub written: usize,
}

impl PredictCounts {
    fn limit_reached(&self, limit: usize) -> bool {
        limit > 0 && self.started >= limit
    }
}

fn write_record<W: Write>(out: &mut W, settings: &PredictSettings, record: &FastaRecord, squiggle: &Matrix) -> Result<()> {
    match settings.format {
        ReportFormat::Tsv => write_tsv_record(out, &settings.prefix, &record.name, &record.sequence, squiggle),
        ReportFormat::Json => write_json_record(out, &settings.prefix, &record.name, &record.sequence, squiggle),
    }
}

/// Predicts every record of `records` into `out`, adding to `counts`.
///
/// Malformed records and failed predictions are logged and skipped. A read
/// failure ends this input only. Write failures are returned.
pub fn predict_records<G: Gemm, R: BufRead, W: Write>(
    model: &SquiggleModel<G>,
    mut records: FastaReader<R>,
    out: &mut W,
    settings: &PredictSettings,
    counts: &mut PredictCounts,
) -> Result<()> {
    while !counts.limit_reached(settings.limit) {
        let record = match records.next() {
            None => break,
            Some(Ok(record)) => record,
            Some(Err(SquiggleError::Io(e))) => {
                warn!(error = %e, "Read failed, abandoning input");
                break;
            }
            Some(Err(e)) => {
                warn!(error = %e, "Skipping malformed record");
                continue;
            }
        };
        counts.started += 1;

        let squiggle = match sequence_to_squiggle(model, &record.sequence, settings.rescale) {
            Ok(squiggle) => squiggle,
            Err(e) => {
                warn!(read = %record.name, error = %e, "Skipping read");
                continue;
            }
        };
        write_record(out, settings, &record, &squiggle)?;
        counts.written += 1;
    }
    Ok(())
}

/// Predicts every record of every file in `paths`; unreadable files are
/// logged and skipped.
pub fn predict_files<G: Gemm, P: AsRef<Path>, W: Write>(
    model: &SquiggleModel<G>,
    paths: &[P],
    out: &mut W,
    settings: &PredictSettings,
) -> Result<PredictCounts> {
    let mut counts = PredictCounts::default();
    for path in paths.iter().map(AsRef::as_ref) {
        if counts.limit_reached(settings.limit) {
            break;
        }
        let reader = match FastaReader::open(path) {
            Ok(reader) => reader,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to open input, skipping");
                continue;
            }
        };
        debug!(path = %path.display(), "Reading input");
        predict_records(model, reader, out, settings, &mut counts)?;
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::to_flat_array;
    use crate::network::ModelWeights;
    use std::io::Cursor;

    fn model() -> SquiggleModel {
        SquiggleModel::from_weights(&ModelWeights::seeded(5, 8, 3).unwrap()).unwrap()
    }

    #[test]
    fn test_encode_bases_case_insensitive() {
        let encoded = encode_bases(b"ACGTacgt").unwrap();
        assert_eq!(encoded.shape(), (1, 8));
        assert_eq!(to_flat_array(&encoded).unwrap(), vec![0, 1, 2, 3, 0, 1, 2, 3]);
    }

    #[test]
    fn test_encode_rejects_unknown_base() {
        let err = encode_bases(b"ACGX").unwrap_err();
        assert!(matches!(err, SquiggleError::InvalidBase { position: 3, base: 'X' }));
        assert!(matches!(encode_bases(b"NACG"), Err(SquiggleError::InvalidBase { position: 0, .. })));
    }

    #[test]
    fn test_encode_rejects_empty_sequence() {
        assert!(matches!(encode_bases(b""), Err(SquiggleError::EmptySequence)));
    }

    #[test]
    fn test_sequence_to_squiggle_shapes() {
        let model = model();
        let squiggle = sequence_to_squiggle(&model, b"ACGT", true).unwrap();
        assert_eq!(squiggle.nc(), 4);
        assert_eq!(squiggle.nr(), NPARAM);

        assert!(sequence_to_squiggle(&model, b"ACGX", true).is_err());
        assert!(sequence_to_squiggle(&model, b"acgt", false).is_ok());
    }

    #[test]
    fn test_lowercase_predicts_like_uppercase() {
        let model = model();
        let upper = sequence_to_squiggle(&model, b"GATTACA", true).unwrap();
        let lower = sequence_to_squiggle(&model, b"gattaca", true).unwrap();
        assert_eq!(upper.as_slice(), lower.as_slice());
    }

    #[test]
    fn test_tsv_record_layout() {
        let squiggle: Matrix = from_flat_array(&[1.0, 0.5, 2.0, -0.25, 0.125, 3.0], 3, 2).unwrap();
        let mut buffer = Vec::new();
        write_tsv_record(&mut buffer, "run1_", "read7", b"AC", &squiggle).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(
            text,
            "#run1_read7\n0\tA\t1.000000\t0.500000\t2.000000\n1\tC\t-0.250000\t0.125000\t3.000000\n"
        );
    }

    #[test]
    fn test_json_record_layout() {
        let squiggle: Matrix = from_flat_array(&[1.0, 0.5, 2.0], 3, 1).unwrap();
        let mut buffer = Vec::new();
        write_json_record(&mut buffer, "", "r", b"G", &squiggle).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value["name"], "r");
        assert_eq!(value["positions"][0]["base"], "G");
        assert_eq!(value["positions"][0]["spread"], 0.5);
        assert!(buffer.ends_with(b"\n"));
    }

    fn settings(limit: usize) -> PredictSettings {
        PredictSettings {
            limit,
            prefix: String::new(),
            rescale: true,
            format: ReportFormat::Tsv,
        }
    }

    fn predict_text(text: &[u8], settings: &PredictSettings) -> (PredictCounts, String) {
        let mut out = Vec::new();
        let mut counts = PredictCounts::default();
        let reader = FastaReader::new(Cursor::new(text.to_vec()));
        predict_records(&model(), reader, &mut out, settings, &mut counts).unwrap();
        (counts, String::from_utf8(out).unwrap())
    }

    fn headers(report: &str) -> Vec<&str> {
        report.lines().filter(|l| l.starts_with('#')).collect()
    }

    #[test]
    fn test_invalid_base_record_is_skipped() {
        let (counts, report) = predict_text(b">a\nACGT\n>bad\nACGX\n>c\nGG\n", &settings(0));
        assert_eq!(counts, PredictCounts { started: 3, written: 2 });
        assert_eq!(headers(&report), ["#a", "#c"]);
        assert_eq!(report.lines().count(), 2 + 4 + 2);
    }

    #[test]
    fn test_limit_counts_records_started() {
        let (counts, report) = predict_text(b">a\nAC\n>b\nGT\n>c\nTT\n", &settings(2));
        assert_eq!(counts, PredictCounts { started: 2, written: 2 });
        assert_eq!(headers(&report), ["#a", "#b"]);

        let (counts, report) = predict_text(b">a\nAC\n>bad\nNN\n>c\nTT\n", &settings(2));
        assert_eq!(counts, PredictCounts { started: 2, written: 1 });
        assert_eq!(headers(&report), ["#a"]);
    }

    #[test]
    fn test_non_utf8_sequence_does_not_end_the_input() {
        let (counts, report) = predict_text(b">a\nAC\xffGT\n>b\nGG\n>c\nTTTT\n", &settings(0));
        assert_eq!(counts, PredictCounts { started: 3, written: 2 });
        assert_eq!(headers(&report), ["#b", "#c"]);
    }

    #[test]
    fn test_malformed_and_empty_records_are_skipped() {
        let (counts, report) = predict_text(b"ACGT\n>empty\n>ok\nCA\n", &settings(0));
        assert_eq!(counts, PredictCounts { started: 2, written: 1 });
        assert_eq!(headers(&report), ["#ok"]);
    }

    #[test]
    fn test_json_records_one_per_line() {
        let json = PredictSettings {
            prefix: "run_".to_string(),
            format: ReportFormat::Json,
            ..settings(0)
        };
        let (counts, report) = predict_text(b">a\nACG\n>b\nT\n", &json);
        assert_eq!(counts.written, 2);
        let names: Vec<String> = report
            .lines()
            .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap()["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["run_a", "run_b"]);
    }

    #[test]
    fn test_unreadable_file_is_skipped_and_limit_spans_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.fa");
        let second = dir.path().join("second.fq");
        std::fs::write(&first, ">a\nACGT\n>b\nGG\n").unwrap();
        std::fs::write(&second, "@c\nTT\n+\nII\n@d\nCC\n+\nII\n").unwrap();
        let paths = [first, dir.path().join("absent.fa"), second];

        let mut out = Vec::new();
        let counts = predict_files(&model(), &paths, &mut out, &settings(0)).unwrap();
        assert_eq!(counts, PredictCounts { started: 4, written: 4 });
        assert_eq!(headers(&String::from_utf8(out).unwrap()), ["#a", "#b", "#c", "#d"]);

        let mut out = Vec::new();
        let counts = predict_files(&model(), &paths, &mut out, &settings(3)).unwrap();
        assert_eq!(counts, PredictCounts { started: 3, written: 3 });
        assert_eq!(headers(&String::from_utf8(out).unwrap()), ["#a", "#b", "#c"]);
    }
}
