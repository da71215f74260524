/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Builders: from reference files to a hybrid index, and from an
//! existing index to the meta, differential, and meta-differential
//! flavours via the permutation pipelines.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread::{Scope, ScopedJoinHandle};

use anyhow::{ensure, Context, Result};
use dsi_progress_logger::prelude::*;
use log::{info, warn};

pub mod differential;
pub mod meta;
pub mod meta_differential;
pub mod sketches;

pub use differential::build_differential_index;
pub use meta::build_meta_index;
pub use meta_differential::build_meta_differential_index;

use crate::bits::{BitVectorBuilder, RankedBitVector};
use crate::color_sets::{ColorSets, HybridColorSetsBuilder, SetIterator};
use crate::dbg::{ColoredCompactedDbg, KmerDict};
use crate::filenames::FilenameTable;
use crate::index::Index;

/// Per-thread color-set batches hold at most this many integers.
const MAX_BUFFER_SIZE: usize = 1 << 28;

#[derive(Clone, Debug)]
pub struct BuildConfig {
    /// k-mer length.
    pub k: usize,
    /// Minimizer length of the k-mer dictionary.
    pub m: usize,
    pub num_threads: usize,
    pub ram_limit_gib: usize,
    pub tmp_dir: PathBuf,
    pub verbose: bool,
    /// Re-check every color set and k-mer after construction.
    pub check: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            k: 31,
            m: 20,
            num_threads: 1,
            ram_limit_gib: 8,
            tmp_dir: PathBuf::from("."),
            verbose: false,
            check: false,
        }
    }
}

impl BuildConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.k >= 2 && self.k <= crate::MAX_K,
            "k must be in [2, {}], got {}",
            crate::MAX_K,
            self.k
        );
        ensure!(self.m >= 2, "minimizer length m must be at least 2, got {}", self.m);
        ensure!(self.m < self.k, "m must be smaller than k, got m = {} and k = {}", self.m, self.k);
        ensure!(self.num_threads >= 1, "at least one thread is needed");
        Ok(())
    }
}

/// Encode one batch of color sets in a worker; the append into the main
/// builder waits for this slot's turn, so batches land in stream order.
fn spawn_encode<'scope, 'env>(
    scope: &'scope Scope<'scope, 'env>,
    slot: usize,
    num_slots: usize,
    num_colors: u32,
    batch: Vec<Vec<u32>>,
    main_builder: &'env Mutex<HybridColorSetsBuilder>,
    appending_thread: &'env AtomicUsize,
) -> ScopedJoinHandle<'scope, ()> {
    scope.spawn(move || {
        let mut local = HybridColorSetsBuilder::new(num_colors);
        for set in &batch {
            local.process(set);
        }
        while appending_thread.load(Ordering::Acquire) != slot {
            std::thread::yield_now();
        }
        main_builder.lock().unwrap().append(&local);
        appending_thread.store((slot + 1) % num_slots, Ordering::Release);
    })
}

fn write_fasta_record<W: Write>(out: &mut W, seq: &[u8]) -> std::io::Result<()> {
    out.write_all(b">\n")?;
    out.write_all(seq)?;
    out.write_all(b"\n")
}

/// Build a hybrid index from the reference files listed in `ref_paths`.
pub fn build_index(config: &BuildConfig, ref_paths: &[String]) -> Result<Index> {
    config.validate()?;
    let num_threads = config.num_threads;

    info!("step 1. build colored compacted dBG");
    let ccdbg = ColoredCompactedDbg::build(ref_paths, config.k)?;
    let num_colors = ccdbg.num_colors();

    info!("step 2. build u2c and color sets");
    let tmp = tempfile::Builder::new()
        .prefix("fulgor")
        .tempdir_in(&config.tmp_dir)
        .with_context(|| format!("cannot use temp directory {}", config.tmp_dir.display()))?;
    let unitig_file = tmp.path().join("unitigs.fa");

    let mut u2c_builder = BitVectorBuilder::new();
    let mut num_unitigs = 0usize;
    let mut num_distinct_color_sets = 0usize;

    let main_builder = Mutex::new(HybridColorSetsBuilder::new(num_colors));
    // a worker may append its batch only when this counter holds its slot
    let appending_thread = AtomicUsize::new(0);
    let buffer_capacity = (num_colors as usize * 10_000).min(MAX_BUFFER_SIZE);

    {
        let mut out = BufWriter::new(
            File::create(&unitig_file)
                .with_context(|| format!("cannot create {}", unitig_file.display()))?,
        );
        let mut io_error: Option<anyhow::Error> = None;

        std::thread::scope(|scope| {
            let mut handles: Vec<Option<ScopedJoinHandle<'_, ()>>> =
                (0..num_threads).map(|_| None).collect();
            let mut curr_thread = 0usize;
            let mut batch: Vec<Vec<u32>> = Vec::new();
            let mut batch_ints = 0usize;

            ccdbg.for_each_unitig(|unitig, colors, same_color_set| {
                if io_error.is_some() {
                    return;
                }
                if !same_color_set {
                    num_distinct_color_sets += 1;
                    if num_unitigs > 0 {
                        u2c_builder.set(num_unitigs - 1, true);
                    }
                    if batch_ints + colors.len() + 1 > buffer_capacity && !batch.is_empty() {
                        let full = std::mem::take(&mut batch);
                        batch_ints = 0;
                        handles[curr_thread] = Some(spawn_encode(
                            scope,
                            curr_thread,
                            num_threads,
                            num_colors,
                            full,
                            &main_builder,
                            &appending_thread,
                        ));
                        let next_thread = (curr_thread + 1) % num_threads;
                        if let Some(prev) = handles[next_thread].take() {
                            prev.join().expect("encoder thread panicked");
                        }
                        curr_thread = next_thread;
                    }
                    batch.push(colors.to_vec());
                    batch_ints += colors.len() + 1;
                }
                u2c_builder.push(false);

                // unitigs are rewritten in color-set order for the
                // dictionary, not in construction order
                if let Err(e) = write_fasta_record(&mut out, unitig) {
                    io_error = Some(anyhow::Error::new(e).context("cannot write unitig file"));
                    return;
                }
                num_unitigs += 1;
            });

            if !batch.is_empty() {
                handles[curr_thread] = Some(spawn_encode(
                    scope,
                    curr_thread,
                    num_threads,
                    num_colors,
                    batch,
                    &main_builder,
                    &appending_thread,
                ));
            }
            for handle in handles.iter_mut().filter_map(Option::take) {
                handle.join().expect("encoder thread panicked");
            }
        });

        if let Some(e) = io_error {
            return Err(e);
        }
        out.flush().context("cannot flush unitig file")?;
    }

    ensure!(num_unitigs > 0, "the ccdBG has no unitigs");
    u2c_builder.set(num_unitigs - 1, true);
    let u2c = RankedBitVector::new(u2c_builder.build());
    debug_assert!(u2c.num_ones() as usize == num_distinct_color_sets);
    info!("num_unitigs {num_unitigs}");
    info!("num_distinct_color_sets {num_distinct_color_sets}");

    let color_sets = main_builder.into_inner().unwrap().build();

    info!("step 3. build k2u");
    let k2u = KmerDict::from_unitig_file(&unitig_file, config.k, config.m)?;

    info!("step 4. write filenames");
    let filenames = FilenameTable::build(ccdbg.filenames());

    let index = Index::new(k2u, u2c, ColorSets::Hybrid(color_sets), filenames);

    if config.check {
        info!("step 5. check correctness");
        check_against_ccdbg(&index, &ccdbg);
    }
    Ok(index)
}

/// Re-look-up every k-mer of every unitig and re-decode every color set,
/// reporting mismatches without aborting.
fn check_against_ccdbg(index: &Index, ccdbg: &ColoredCompactedDbg) {
    let k = index.k();
    let mut pl = ProgressLogger::default();
    pl.item_name("unitig");
    pl.start("checking colors and k-mers");
    ccdbg.for_each_unitig(|unitig, colors, _same| {
        pl.update();
        let Some(first) = index.k2u_dict().lookup_advanced(&unitig[..k]) else {
            warn!("a unitig k-mer is absent from the dictionary");
            return;
        };
        let unitig_id = first.unitig_id;
        for window in unitig.windows(k).skip(1) {
            let got = index
                .k2u_dict()
                .lookup_advanced(window)
                .map(|hit| hit.unitig_id);
            if got != Some(unitig_id) {
                warn!("got unitig {:?} but expected {}", got, unitig_id);
                return;
            }
        }
        let color_set_id = index.u2c(unitig_id as usize);
        let mut it = index.color_set(color_set_id);
        if it.size() as usize != colors.len() {
            warn!(
                "got a color set of size {} but expected {}",
                it.size(),
                colors.len()
            );
            return;
        }
        for &expected in colors {
            if it.value() != expected {
                warn!("got color {} but expected {}", it.value(), expected);
                return;
            }
            it.next();
        }
    });
    pl.done();
}

/// Unitig range `[begin, end)` of one color set in the unitig order.
pub(crate) fn unitig_range(u2c: &RankedBitVector, color_set_id: usize) -> (usize, usize) {
    let begin = if color_set_id == 0 {
        0
    } else {
        u2c.select1(color_set_id as u64 - 1) + 1
    };
    let end = u2c.select1(color_set_id as u64) + 1;
    (begin, end)
}

/// Rewrite the unitigs in a new color-set order and rebuild both the
/// dictionary and the run-end `u2c` bit vector over the new order.
/// `old_of_new` yields, for each new color-set id in order, the old
/// color-set id placed there.
pub(crate) fn repermute_unitigs(
    config: &BuildConfig,
    old_dict: &KmerDict,
    old_u2c: &RankedBitVector,
    old_of_new: impl Iterator<Item = usize>,
) -> Result<(KmerDict, RankedBitVector)> {
    let tmp = tempfile::Builder::new()
        .prefix("fulgor")
        .tempdir_in(&config.tmp_dir)
        .with_context(|| format!("cannot use temp directory {}", config.tmp_dir.display()))?;
    let permuted_file = tmp.path().join("permuted_unitigs.fa");

    let num_unitigs = old_u2c.num_bits();
    let mut u2c_builder = BitVectorBuilder::with_len(num_unitigs, false);
    {
        let mut out = BufWriter::new(
            File::create(&permuted_file)
                .with_context(|| format!("cannot create {}", permuted_file.display()))?,
        );
        let mut pos = 0usize;
        for old_color_set_id in old_of_new {
            let (begin, end) = unitig_range(old_u2c, old_color_set_id);
            pos += end - begin;
            u2c_builder.set(pos - 1, true);
            for unitig_id in begin..end {
                write_fasta_record(&mut out, &old_dict.unitig_seq(unitig_id))?;
            }
        }
        ensure!(pos == num_unitigs, "unitig permutation does not cover all unitigs");
        out.flush().context("cannot flush permuted unitig file")?;
    }

    let dict = KmerDict::from_unitig_file(&permuted_file, old_dict.k(), old_dict.m())?;
    debug_assert!(dict.num_kmers() == old_dict.num_kmers());
    Ok((dict, RankedBitVector::new(u2c_builder.build())))
}
