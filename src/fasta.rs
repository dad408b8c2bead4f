/* src/fasta.rs */
//! Streaming FASTA / FASTQ reader.
//!
//! Records may be mixed in one stream. FASTA sequences can span several lines;
//! FASTQ records carry a quality string of the same length as the sequence.
//! The record name is the first whitespace-delimited token of the header.
/*▫~•◦────────────────────────────────────────────────────────────────────────────────────‣
 * © 2025 ArcMoon Studios ◦ SPDX-License-Identifier MIT OR Apache-2.0 ◦ Author: Lord Xyn ✶
 *///◦────────────────────────────────────────────────────────────────────────────────────‣

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Result, SquiggleError};

/// One sequence record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    /// First token of the header line, with invalid UTF-8 replaced
    pub name: String,
    /// Bases with line breaks removed
    pub sequence: Vec<u8>,
    /// Per-base quality for FASTQ input
    pub quality: Option<Vec<u8>>,
}

/// Iterator over the records of a FASTA or FASTQ stream.
///
/// Lines are read as raw bytes, so an `Io` error always comes from the
/// underlying reader and never from the content.
pub struct FastaReader<R: BufRead> {
    reader: R,
    pending: Option<Vec<u8>>,
    line: usize,
}

impl FastaReader<BufReader<File>> {
    /// Opens `path` for reading.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

fn is_header(line: &[u8]) -> bool {
    matches!(line.first(), Some(&(b'>' | b'@')))
}

fn record_name(header: &[u8]) -> String {
    String::from_utf8_lossy(header)
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string()
}

impl<R: BufRead> FastaReader<R> {
    /// Wraps a buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: None,
            line: 0,
        }
    }

    fn next_line(&mut self) -> Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        if self.reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(None);
        }
        self.line += 1;
        let end = line.iter().rposition(|b| !b.is_ascii_whitespace()).map_or(0, |i| i + 1);
        line.truncate(end);
        Ok(Some(line))
    }

    fn parse_error(&self, message: impl Into<String>) -> SquiggleError {
        SquiggleError::Parse {
            line: self.line,
            message: message.into(),
        }
    }

    fn next_header(&mut self) -> Result<Option<Vec<u8>>> {
        if let Some(header) = self.pending.take() {
            return Ok(Some(header));
        }
        while let Some(line) = self.next_line()? {
            if !line.is_empty() {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }

    fn read_fasta(&mut self, name: String) -> Result<FastaRecord> {
        let mut sequence = Vec::new();
        while let Some(line) = self.next_line()? {
            if is_header(&line) {
                self.pending = Some(line);
                break;
            }
            sequence.extend(line.iter().filter(|b| !b.is_ascii_whitespace()));
        }
        Ok(FastaRecord {
            name,
            sequence,
            quality: None,
        })
    }

    fn read_fastq(&mut self, name: String) -> Result<FastaRecord> {
        let mut sequence = Vec::new();
        loop {
            let Some(line) = self.next_line()? else {
                return Err(self.parse_error(format!("record {name} ends before its '+' separator")));
            };
            if line.first() == Some(&b'+') {
                break;
            }
            sequence.extend(line.iter().filter(|b| !b.is_ascii_whitespace()));
        }

        let mut quality = Vec::with_capacity(sequence.len());
        while quality.len() < sequence.len() {
            let Some(line) = self.next_line()? else {
                break;
            };
            quality.extend_from_slice(&line);
        }
        if quality.len() != sequence.len() {
            return Err(self.parse_error(format!(
                "record {name} has {} bases but {} quality values",
                sequence.len(),
                quality.len()
            )));
        }
        Ok(FastaRecord {
            name,
            sequence,
            quality: Some(quality),
        })
    }

    fn read_record(&mut self) -> Result<Option<FastaRecord>> {
        let Some(header) = self.next_header()? else {
            return Ok(None);
        };
        match header.split_first() {
            Some((&b'>', rest)) => self.read_fasta(record_name(rest)).map(Some),
            Some((&b'@', rest)) => self.read_fastq(record_name(rest)).map(Some),
            _ => Err(self.parse_error("expected a '>' or '@' record header")),
        }
    }
}

impl<R: BufRead> Iterator for FastaReader<R> {
    type Item = Result<FastaRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}
