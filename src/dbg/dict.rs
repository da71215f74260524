/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! k-mer → unitig dictionary. Maps every k-mer occurring in the unitig
//! collection to its unitig id and offset, in either orientation, and
//! supports streaming queries that amortise work over consecutive k-mers
//! of one sequence by first trying to extend the previous hit.
//!
//! The backend is a hash table over packed k-mer codes plus a 2-bit
//! arena of the unitig bases; the arena doubles as the store the
//! permutation pipelines re-extract unitig sequences from.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{ensure, Context, Result};

use super::fasta::FastaReader;
use super::kmer;
use crate::bits::{CompactVector, CompactVectorBuilder, EliasFano};
use crate::serialize::{Visit, Visitor};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Orientation {
    Forward,
    Backward,
}

/// Result of a positive k-mer lookup.
#[derive(Clone, Copy, Debug)]
pub struct KmerLookup {
    /// Rank of the k-mer over all unitigs, in unitig order.
    pub kmer_id: u64,
    pub unitig_id: u32,
    pub kmer_id_in_unitig: u32,
    /// Number of k-mers of the unitig.
    pub unitig_size: u32,
    pub orientation: Orientation,
}

#[derive(Clone, Default, Debug)]
pub struct KmerDict {
    k: u64,
    m: u64,
    arena: CompactVector,
    offsets: EliasFano,
    // forward k-mer code -> (unitig id, offset in unitig); rebuilt on load
    map: HashMap<u64, (u32, u32)>,
}

impl KmerDict {
    #[inline]
    pub fn k(&self) -> usize {
        self.k as usize
    }

    #[inline]
    pub fn m(&self) -> usize {
        self.m as usize
    }

    pub fn num_unitigs(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.num_unitigs() == 0
    }

    pub fn num_kmers(&self) -> u64 {
        self.kmers_before(self.num_unitigs())
    }

    /// Number of bases of unitig `u`.
    pub fn unitig_len(&self, u: usize) -> usize {
        (self.offsets.access(u + 1) - self.offsets.access(u)) as usize
    }

    /// Number of k-mers of unitig `u`.
    pub fn unitig_num_kmers(&self, u: usize) -> usize {
        self.unitig_len(u) - self.k() + 1
    }

    fn kmers_before(&self, u: usize) -> u64 {
        self.offsets.access(u) - (u as u64) * (self.k - 1)
    }

    /// ASCII sequence of unitig `u`.
    pub fn unitig_seq(&self, u: usize) -> Vec<u8> {
        let begin = self.offsets.access(u) as usize;
        let len = self.unitig_len(u);
        (0..len)
            .map(|i| kmer::decode_base(self.arena.get(begin + i)))
            .collect()
    }

    /// Packed code of the k-mer of unitig `u` at offset `pos`.
    pub fn kmer_code_at(&self, u: usize, pos: usize) -> u64 {
        let begin = self.offsets.access(u) as usize + pos;
        let mut code = 0u64;
        for i in 0..self.k() {
            code |= self.arena.get(begin + i) << (2 * i);
        }
        code
    }

    /// Look up one k-mer given as ASCII; `None` for malformed or absent
    /// k-mers.
    pub fn lookup_advanced(&self, kmer: &[u8]) -> Option<KmerLookup> {
        if kmer.len() < self.k() {
            return None;
        }
        let fwd = kmer::encode_kmer(kmer, self.k())?;
        self.lookup_code(fwd)
    }

    fn lookup_code(&self, fwd: u64) -> Option<KmerLookup> {
        if let Some(&(unitig_id, pos)) = self.map.get(&fwd) {
            return Some(self.lookup_at(unitig_id, pos, Orientation::Forward));
        }
        let rc = kmer::revcomp(fwd, self.k());
        if let Some(&(unitig_id, pos)) = self.map.get(&rc) {
            return Some(self.lookup_at(unitig_id, pos, Orientation::Backward));
        }
        None
    }

    fn lookup_at(&self, unitig_id: u32, pos: u32, orientation: Orientation) -> KmerLookup {
        KmerLookup {
            kmer_id: self.kmers_before(unitig_id as usize) + pos as u64,
            unitig_id,
            kmer_id_in_unitig: pos,
            unitig_size: self.unitig_num_kmers(unitig_id as usize) as u32,
            orientation,
        }
    }

    /// Start a streaming query over the k-mers of one sequence.
    pub fn streaming_query(&self) -> StreamingQuery<'_> {
        StreamingQuery {
            dict: self,
            prev: None,
        }
    }

    /// Build over the records of a unitig FASTA file, in file order.
    pub fn from_unitig_file(path: impl AsRef<Path>, k: usize, m: usize) -> Result<Self> {
        let mut builder = KmerDictBuilder::new(k, m);
        for record in FastaReader::open(path)? {
            builder.push_unitig(&record?.seq)?;
        }
        Ok(builder.finish())
    }

    /// Rebuild the hash table from the arena; must be called after the
    /// visitor fills a deserialized dictionary.
    pub fn rebuild_map(&mut self) {
        self.map.clear();
        self.map.reserve(self.num_kmers() as usize);
        let k = self.k();
        for u in 0..self.num_unitigs() {
            let begin = self.offsets.access(u) as usize;
            let len = self.unitig_len(u);
            let mut code = 0u64;
            for i in 0..len {
                let base = self.arena.get(begin + i);
                if i < k - 1 {
                    code |= base << (2 * i);
                    continue;
                }
                code = if i == k - 1 {
                    code | base << (2 * i)
                } else {
                    kmer::roll(code, base, k)
                };
                self.map
                    .entry(code)
                    .or_insert((u as u32, (i + 1 - k) as u32));
            }
        }
    }

    pub fn num_bytes(&self) -> usize {
        16 + self.arena.num_bytes() + self.offsets.num_bytes()
    }
}

impl Visit for KmerDict {
    fn visit<V: Visitor>(&mut self, visitor: &mut V) -> Result<()> {
        visitor.u64(&mut self.k)?;
        visitor.u64(&mut self.m)?;
        self.arena.visit(visitor)?;
        self.offsets.visit(visitor)
    }
}

pub struct KmerDictBuilder {
    k: usize,
    m: usize,
    arena: CompactVectorBuilder,
    offsets: Vec<u64>,
    map: HashMap<u64, (u32, u32)>,
}

impl KmerDictBuilder {
    pub fn new(k: usize, m: usize) -> Self {
        Self {
            k,
            m,
            arena: CompactVectorBuilder::new(0, 2),
            offsets: vec![0],
            map: HashMap::new(),
        }
    }

    pub fn push_unitig(&mut self, seq: &[u8]) -> Result<()> {
        ensure!(
            seq.len() >= self.k,
            "unitig shorter than k = {}: {} bases",
            self.k,
            seq.len()
        );
        let unitig_id = (self.offsets.len() - 1) as u32;
        let mut code = 0u64;
        for (i, &c) in seq.iter().enumerate() {
            let base = kmer::encode_base(c)
                .with_context(|| format!("invalid base {:?} in unitig {}", c as char, unitig_id))?;
            self.arena.push(base);
            code = if i < self.k {
                code | base << (2 * i)
            } else {
                kmer::roll(code, base, self.k)
            };
            if i + 1 >= self.k {
                self.map
                    .entry(code)
                    .or_insert((unitig_id, (i + 1 - self.k) as u32));
            }
        }
        self.offsets.push(self.arena.len() as u64);
        Ok(())
    }

    pub fn finish(self) -> KmerDict {
        let universe = *self.offsets.last().unwrap();
        KmerDict {
            k: self.k as u64,
            m: self.m as u64,
            arena: self.arena.build(),
            offsets: EliasFano::encode(&self.offsets, universe),
            map: self.map,
        }
    }
}

/// Streaming lookup over consecutive k-mers of one sequence: before
/// hashing, try to extend the previous positive hit one position within
/// its unitig, in the orientation of that hit.
pub struct StreamingQuery<'a> {
    dict: &'a KmerDict,
    prev: Option<KmerLookup>,
}

impl StreamingQuery<'_> {
    pub fn lookup_advanced(&mut self, kmer: &[u8]) -> Option<KmerLookup> {
        let k = self.dict.k();
        if kmer.len() < k {
            self.prev = None;
            return None;
        }
        let fwd = match kmer::encode_kmer(kmer, k) {
            Some(code) => code,
            None => {
                self.prev = None;
                return None;
            }
        };
        if let Some(prev) = self.prev {
            let u = prev.unitig_id as usize;
            match prev.orientation {
                Orientation::Forward if prev.kmer_id_in_unitig + 1 < prev.unitig_size => {
                    let pos = prev.kmer_id_in_unitig + 1;
                    if self.dict.kmer_code_at(u, pos as usize) == fwd {
                        let hit = self.dict.lookup_at(prev.unitig_id, pos, Orientation::Forward);
                        self.prev = Some(hit);
                        return Some(hit);
                    }
                }
                Orientation::Backward if prev.kmer_id_in_unitig > 0 => {
                    let pos = prev.kmer_id_in_unitig - 1;
                    let rc = kmer::revcomp(fwd, k);
                    if self.dict.kmer_code_at(u, pos as usize) == rc {
                        let hit = self.dict.lookup_at(prev.unitig_id, pos, Orientation::Backward);
                        self.prev = Some(hit);
                        return Some(hit);
                    }
                }
                _ => {}
            }
        }
        let hit = self.dict.lookup_code(fwd);
        self.prev = hit;
        hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_and_streaming() {
        let mut builder = KmerDictBuilder::new(3, 2);
        builder.push_unitig(b"ACGTAC").unwrap();
        builder.push_unitig(b"TTTT").unwrap();
        let dict = builder.finish();

        assert_eq!(dict.num_unitigs(), 2);
        assert_eq!(dict.num_kmers(), 6);
        assert_eq!(dict.unitig_seq(0), b"ACGTAC");

        let hit = dict.lookup_advanced(b"CGT").unwrap();
        assert_eq!(hit.unitig_id, 0);
        assert_eq!(hit.kmer_id_in_unitig, 1);
        assert_eq!(hit.orientation, Orientation::Forward);

        // reverse complement of GTA
        let hit = dict.lookup_advanced(b"TAC").unwrap();
        assert_eq!(hit.unitig_id, 0);

        assert!(dict.lookup_advanced(b"GGG").is_none());
        assert!(dict.lookup_advanced(b"GNG").is_none());

        let mut query = dict.streaming_query();
        let seq = b"ACGTAC";
        for (i, w) in seq.windows(3).enumerate() {
            let hit = query.lookup_advanced(w).unwrap();
            assert_eq!(hit.unitig_id, 0);
            assert_eq!(hit.kmer_id_in_unitig as usize, i);
        }
    }

    #[test]
    fn rebuild_matches() {
        let mut builder = KmerDictBuilder::new(3, 2);
        builder.push_unitig(b"ACGTACGG").unwrap();
        let mut dict = builder.finish();
        let before = dict.lookup_advanced(b"TAC").unwrap();
        dict.rebuild_map();
        let after = dict.lookup_advanced(b"TAC").unwrap();
        assert_eq!(before.kmer_id, after.kmer_id);
        assert_eq!(before.unitig_id, after.unitig_id);
    }
}
