/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Minimal FASTA reader: `>`-headers (first word is the record name) and
//! multi-line sequences.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};

#[derive(Clone, Debug)]
pub struct FastaRecord {
    pub name: String,
    pub seq: Vec<u8>,
}

pub struct FastaReader<R: BufRead> {
    reader: R,
    pending_header: Option<String>,
    done: bool,
}

impl FastaReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("could not open {}", path.display()))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending_header: None,
            done: false,
        }
    }

    fn next_record(&mut self) -> Result<Option<FastaRecord>> {
        if self.done {
            return Ok(None);
        }
        let header = match self.pending_header.take() {
            Some(h) => h,
            None => loop {
                let mut line = String::new();
                if self.reader.read_line(&mut line).context("read failed")? == 0 {
                    self.done = true;
                    return Ok(None);
                }
                let line = line.trim_end();
                if let Some(h) = line.strip_prefix('>') {
                    break h.to_string();
                }
            },
        };
        let name = header.split_whitespace().next().unwrap_or("").to_string();
        let mut seq = Vec::new();
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line).context("read failed")? == 0 {
                self.done = true;
                break;
            }
            let line = line.trim_end();
            if let Some(h) = line.strip_prefix('>') {
                self.pending_header = Some(h.to_string());
                break;
            }
            seq.extend_from_slice(line.as_bytes());
        }
        Ok(Some(FastaRecord { name, seq }))
    }
}

impl<R: BufRead> Iterator for FastaReader<R> {
    type Item = Result<FastaRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_line_records() {
        let data = b">r0 some description\nACGT\nACGT\n>r1\nTTTT\n";
        let records: Vec<_> = FastaReader::new(&data[..])
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "r0");
        assert_eq!(records[0].seq, b"ACGTACGT");
        assert_eq!(records[1].name, "r1");
        assert_eq!(records[1].seq, b"TTTT");
    }
}
