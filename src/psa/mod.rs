/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Pseudoalignment: stream the k-mers of a query through the dictionary,
//! deduplicate the touched unitigs and color sets, and combine the color
//! sets with the encoding-specific intersection or threshold merge.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use itertools::Itertools;
use log::info;
use rayon::prelude::*;

pub mod full_intersection;
pub mod threshold_union;

use crate::color_sets::{ColorSetStore, ColorSets};
use crate::dbg::FastaReader;
use crate::index::Index;

/// An item carrying a hit-count score through the dedup stages.
#[derive(Clone, Copy, Debug)]
pub struct Scored<T> {
    pub item: T,
    pub score: u32,
}

/// Ids of the distinct unitigs touched by the positive k-mers of
/// `sequence`, in order of first appearance of each run.
fn stream_through(index: &Index, sequence: &[u8]) -> Vec<u32> {
    let mut unitig_ids = Vec::new();
    let k = index.k();
    if sequence.len() < k {
        return unitig_ids;
    }
    let mut query = index.k2u_dict().streaming_query();
    let mut prev_unitig_id = u32::MAX;
    for window in sequence.windows(k) {
        if let Some(hit) = query.lookup_advanced(window) {
            if hit.unitig_id != prev_unitig_id {
                unitig_ids.push(hit.unitig_id);
                prev_unitig_id = hit.unitig_id;
            }
        }
    }
    unitig_ids
}

/// As [`stream_through`], but each run carries its k-mer hit count;
/// also returns the number of positive k-mers.
fn stream_through_with_multiplicities(
    index: &Index,
    sequence: &[u8],
) -> (Vec<Scored<u32>>, u64) {
    let mut unitig_ids: Vec<Scored<u32>> = Vec::new();
    let k = index.k();
    if sequence.len() < k {
        return (unitig_ids, 0);
    }
    let mut query = index.k2u_dict().streaming_query();
    let mut num_positive = 0u64;
    let mut prev_unitig_id = u32::MAX;
    for window in sequence.windows(k) {
        if let Some(hit) = query.lookup_advanced(window) {
            num_positive += 1;
            if hit.unitig_id != prev_unitig_id {
                unitig_ids.push(Scored {
                    item: hit.unitig_id,
                    score: 1,
                });
                prev_unitig_id = hit.unitig_id;
            } else {
                unitig_ids.last_mut().unwrap().score += 1;
            }
        }
    }
    (unitig_ids, num_positive)
}

/// Sort by item and merge duplicates, summing scores.
fn dedup_scored(mut items: Vec<Scored<u32>>) -> Vec<Scored<u32>> {
    items.sort_by_key(|s| s.item);
    items
        .into_iter()
        .coalesce(|a, b| {
            if a.item == b.item {
                Ok(Scored {
                    item: a.item,
                    score: a.score + b.score,
                })
            } else {
                Err((a, b))
            }
        })
        .collect()
}

impl Index {
    /// References containing *every* positive k-mer of `sequence`.
    pub fn pseudoalign_full_intersection(&self, sequence: &[u8]) -> Vec<u32> {
        let mut unitig_ids = stream_through(self, sequence);
        self.intersect_unitigs(&mut unitig_ids)
    }

    /// Intersection of the color sets of the given unitigs.
    pub fn intersect_unitigs(&self, unitig_ids: &mut Vec<u32>) -> Vec<u32> {
        unitig_ids.sort_unstable();
        unitig_ids.dedup();
        let mut color_set_ids: Vec<u32> =
            unitig_ids.iter().map(|&u| self.u2c(u as usize) as u32).collect();
        color_set_ids.sort_unstable();
        color_set_ids.dedup();

        let mut colors = Vec::new();
        match self.color_sets_store() {
            ColorSets::Hybrid(cs) => {
                let mut iterators: Vec<_> = color_set_ids
                    .iter()
                    .map(|&id| cs.color_set(id as usize))
                    .collect();
                full_intersection::intersect(&mut iterators, &mut colors);
            }
            ColorSets::Differential(cs) => {
                let mut iterators: Vec<_> = color_set_ids
                    .iter()
                    .map(|&id| cs.color_set(id as usize))
                    .collect();
                full_intersection::diff_intersect(&mut iterators, &mut colors, 0);
            }
            ColorSets::Meta(cs) => {
                let mut iterators: Vec<_> = color_set_ids
                    .iter()
                    .map(|&id| cs.color_set(id as usize))
                    .collect();
                full_intersection::meta_intersect(&mut iterators, &mut colors);
            }
            ColorSets::MetaDifferential(cs) => {
                let mut iterators: Vec<_> = color_set_ids
                    .iter()
                    .map(|&id| cs.color_set(id as usize))
                    .collect();
                full_intersection::meta_diff_intersect(&mut iterators, &mut colors);
            }
        }
        colors
    }

    /// References whose summed hit count reaches
    /// `⌈threshold · positive_kmers⌉`, with `threshold ∈ (0, 1]`.
    pub fn pseudoalign_threshold_union(&self, sequence: &[u8], threshold: f64) -> Vec<u32> {
        debug_assert!(threshold > 0.0 && threshold <= 1.0);
        let (unitig_ids, num_positive) = stream_through_with_multiplicities(self, sequence);
        if num_positive == 0 {
            return Vec::new();
        }

        let color_set_ids = dedup_scored(
            unitig_ids
                .into_iter()
                .map(|s| Scored {
                    item: self.u2c(s.item as usize) as u32,
                    score: s.score,
                })
                .collect(),
        );

        let min_score = (threshold * num_positive as f64).ceil() as u64;
        let mut colors = Vec::new();
        match self.color_sets_store() {
            ColorSets::Hybrid(cs) => {
                let mut iterators: Vec<_> = color_set_ids
                    .iter()
                    .map(|s| Scored {
                        item: cs.color_set(s.item as usize),
                        score: s.score,
                    })
                    .collect();
                threshold_union::merge(&mut iterators, &mut colors, min_score as i64);
            }
            ColorSets::Differential(cs) => {
                let mut iterators: Vec<_> = color_set_ids
                    .iter()
                    .map(|s| Scored {
                        item: cs.color_set(s.item as usize),
                        score: s.score,
                    })
                    .collect();
                threshold_union::merge_diff(&mut iterators, &mut colors, min_score);
            }
            ColorSets::Meta(cs) => {
                let mut iterators: Vec<_> = color_set_ids
                    .iter()
                    .map(|s| Scored {
                        item: cs.color_set(s.item as usize),
                        score: s.score,
                    })
                    .collect();
                threshold_union::merge_meta(&mut iterators, &mut colors, min_score);
            }
            ColorSets::MetaDifferential(cs) => {
                let mut iterators: Vec<_> = color_set_ids
                    .iter()
                    .map(|s| Scored {
                        item: cs.color_set(s.item as usize),
                        score: s.score,
                    })
                    .collect();
                threshold_union::merge_meta_diff(&mut iterators, &mut colors, min_score);
            }
        }
        colors
    }
}

/// Map every record of a query FASTA file over `num_threads` threads and
/// write one line per record, in input order:
/// `NAME\tN\tr_0\t…\tr_{N-1}`; returns `(mapped, total)` record counts.
pub fn map_sequences<W: Write>(
    index: &Index,
    query_path: impl AsRef<Path>,
    threshold: Option<f64>,
    num_threads: usize,
    out: &mut W,
) -> Result<(u64, u64)> {
    let records = FastaReader::open(&query_path)?
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("while reading {}", query_path.as_ref().display()))?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .context("cannot build the mapping thread pool")?;
    let results: Vec<Vec<u32>> = pool.install(|| {
        records
            .par_iter()
            .map(|record| match threshold {
                Some(tau) => index.pseudoalign_threshold_union(&record.seq, tau),
                None => index.pseudoalign_full_intersection(&record.seq),
            })
            .collect()
    });

    let mut num_mapped = 0u64;
    for (record, results) in records.iter().zip(&results) {
        if !results.is_empty() {
            num_mapped += 1;
        }
        write!(out, "{}\t{}", record.name, results.len())?;
        for r in results {
            write!(out, "\t{}", r)?;
        }
        writeln!(out)?;
    }
    let num_total = records.len() as u64;
    info!("mapped {num_mapped}/{num_total} sequences");
    Ok((num_mapped, num_total))
}
