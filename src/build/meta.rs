/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Reference permuter and meta-index builder: cluster the references by
//! sketch similarity, place similar references contiguously, and
//! re-encode every color set as a list of per-partition partial sets,
//! interned so that a partial set shared by many color sets is stored
//! once.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{bail, ensure, Context, Result};
use log::{info, warn};

use super::sketches::{build_reference_sketches, load_reference_sketches, SKETCH_P};
use super::BuildConfig;
use crate::color_sets::{
    ColorSetStore, ColorSets, HybridColorSets, HybridColorSetsBuilder, MetaColorSetsBuilder,
    SetIterator,
};
use crate::filenames::FilenameTable;
use crate::index::Index;
use crate::sketch::{kmeans_divisive, ClusteringParams};

pub struct ReferencePermuter {
    pub num_partitions: usize,
    pub max_partition_size: u32,
    /// Old reference id → new reference id.
    pub permutation: Vec<u32>,
    /// First reference id of each partition; `num_partitions + 1` entries.
    pub partition_boundaries: Vec<u32>,
    /// Reference names in the new order.
    pub filenames: Vec<String>,
}

/// Sketch every reference over the unitigs containing it, cluster the
/// sketches, and derive the permutation that places the references of
/// one cluster contiguously.
pub fn permute_references(
    config: &BuildConfig,
    store: &HybridColorSets,
    u2c: &crate::bits::RankedBitVector,
    filenames: &FilenameTable,
) -> Result<ReferencePermuter> {
    let num_colors = store.num_colors() as usize;

    info!("building reference sketches");
    let tmp = tempfile::Builder::new()
        .prefix("fulgor")
        .tempdir_in(&config.tmp_dir)
        .with_context(|| format!("cannot use temp directory {}", config.tmp_dir.display()))?;
    let sketches_path = tmp.path().join("sketches.bin");
    build_reference_sketches(store, u2c, SKETCH_P, &sketches_path)?;
    let points = load_reference_sketches(&sketches_path)?;

    info!("clustering reference sketches");
    let params = ClusteringParams {
        min_delta: 1e-4,
        max_iterations: 10,
        min_cluster_size: 50,
        seed: 0,
    };
    let clustering = kmeans_divisive(&points, &params);
    ensure!(
        clustering.num_clusters > 0,
        "clustering produced zero clusters; try reducing the number of threads"
    );
    info!("found {} partitions", clustering.num_clusters);

    let num_partitions = clustering.num_clusters;
    let mut partition_boundaries = vec![0u32; num_partitions + 1];
    for &c in &clustering.labels {
        partition_boundaries[c as usize + 1] += 1;
    }
    let mut max_partition_size = 0;
    for i in 0..num_partitions {
        max_partition_size = max_partition_size.max(partition_boundaries[i + 1]);
        partition_boundaries[i + 1] += partition_boundaries[i];
    }

    let mut counts = partition_boundaries[..num_partitions].to_vec();
    let mut permutation = vec![0u32; num_colors];
    for (i, &c) in clustering.labels.iter().enumerate() {
        permutation[i] = counts[c as usize];
        counts[c as usize] += 1;
    }

    let mut permuted_names = vec![String::new(); num_colors];
    for i in 0..num_colors {
        permuted_names[permutation[i] as usize] = filenames.get(i).to_string();
    }

    Ok(ReferencePermuter {
        num_partitions,
        max_partition_size,
        permutation,
        partition_boundaries,
        filenames: permuted_names,
    })
}

struct PartitionInterner {
    map: HashMap<Vec<u32>, u32>,
    builder: HybridColorSetsBuilder,
}

/// Re-encode a hybrid index under the meta encoding.
pub fn build_meta_index(config: &BuildConfig, index: Index) -> Result<Index> {
    config.validate()?;
    let Index {
        k2u,
        u2c,
        color_sets,
        filenames,
    } = index;
    let ColorSets::Hybrid(store) = &color_sets else {
        bail!("the meta builder requires a hybrid index (.fur)")
    };

    let permuter = permute_references(config, store, &u2c, &filenames)?;
    let num_colors = store.num_colors();
    let num_color_sets = store.num_color_sets();
    let num_partitions = permuter.num_partitions;
    let boundaries = &permuter.partition_boundaries;
    let permutation = &permuter.permutation;

    info!("building partial/meta color sets over {num_partitions} partitions");
    let interners: Vec<RwLock<PartitionInterner>> = (0..num_partitions)
        .map(|p| {
            RwLock::new(PartitionInterner {
                map: HashMap::new(),
                builder: HybridColorSetsBuilder::new(boundaries[p + 1] - boundaries[p]),
            })
        })
        .collect();

    let num_threads = config.num_threads;
    let mut thread_slices = Vec::with_capacity(num_threads + 1);
    for i in 0..num_threads {
        thread_slices.push(num_color_sets / num_threads * i);
    }
    thread_slices.push(num_color_sets);

    // per-thread lists of (partition id, partition-relative partial id)
    let meta_lists: Vec<Vec<Vec<(u32, u32)>>> = std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(num_threads);
        for thread_id in 0..num_threads {
            let (begin, end) = (thread_slices[thread_id], thread_slices[thread_id + 1]);
            let interners = &interners;
            handles.push(scope.spawn(move || {
                let mut lists = Vec::with_capacity(end - begin);
                let mut permuted_set = Vec::with_capacity(num_colors as usize);
                for color_set_id in begin..end {
                    permuted_set.clear();
                    let mut it = store.color_set(color_set_id);
                    while !it.is_end() {
                        permuted_set.push(permutation[it.value() as usize]);
                        it.next();
                    }
                    permuted_set.sort_unstable();

                    let mut meta_list: Vec<(u32, u32)> = Vec::new();
                    let mut partition_id = 0usize;
                    let mut partial: Vec<u32> = Vec::new();
                    let mut intern = |partition_id: usize, partial: &mut Vec<u32>| {
                        let id = intern_partial(&interners[partition_id], partial);
                        meta_list.push((partition_id as u32, id));
                        partial.clear();
                    };
                    for &ref_id in &permuted_set {
                        while ref_id >= boundaries[partition_id + 1] {
                            if !partial.is_empty() {
                                intern(partition_id, &mut partial);
                            }
                            partition_id += 1;
                        }
                        partial.push(ref_id - boundaries[partition_id]);
                    }
                    if !partial.is_empty() {
                        intern(partition_id, &mut partial);
                    }
                    lists.push(meta_list);
                }
                lists
            }));
        }
        handles
            .into_iter()
            .map(|h| h.join().expect("meta encoder thread panicked"))
            .collect()
    });

    // globalize the partial ids and lay out the meta-color lists
    let mut num_sets_in_partitions = Vec::with_capacity(num_partitions);
    let mut num_before = Vec::with_capacity(num_partitions);
    let mut total_partial_sets = 0u64;
    let mut partial_builders = Vec::with_capacity(num_partitions);
    for interner in interners {
        let interner = interner.into_inner().unwrap();
        num_before.push(total_partial_sets);
        num_sets_in_partitions.push(interner.map.len() as u32);
        total_partial_sets += interner.map.len() as u64;
        partial_builders.push(interner.builder);
    }
    info!("total num. partial color sets = {total_partial_sets}");

    let num_integers: u64 = meta_lists
        .iter()
        .flatten()
        .map(|list| list.len() as u64 + 1)
        .sum();

    let mut builder = MetaColorSetsBuilder::new(num_colors, num_partitions);
    builder.install_partial_builders(partial_builders);
    builder.init_meta_color_sets(
        num_integers,
        total_partial_sets,
        boundaries,
        &num_sets_in_partitions,
    );
    let mut meta_colors = Vec::new();
    for list in meta_lists.iter().flatten() {
        meta_colors.clear();
        meta_colors.extend(
            list.iter()
                .map(|&(pid, partial_id)| partial_id + num_before[pid as usize] as u32),
        );
        builder.encode_meta_color_set(&meta_colors);
    }
    let meta = builder.build();

    if config.check {
        info!("checking the meta color sets");
        let mut permuted_set = Vec::new();
        for color_set_id in 0..num_color_sets {
            permuted_set.clear();
            let mut expected = store.color_set(color_set_id);
            while !expected.is_end() {
                permuted_set.push(permutation[expected.value() as usize]);
                expected.next();
            }
            permuted_set.sort_unstable();
            let mut got = meta.color_set(color_set_id);
            if got.size() as usize != permuted_set.len() {
                warn!(
                    "got a color set of size {} but expected {} (color set {})",
                    got.size(),
                    permuted_set.len(),
                    color_set_id
                );
                continue;
            }
            for &expected_ref in &permuted_set {
                if got.value() != expected_ref {
                    warn!(
                        "got ref {} but expected {} (color set {})",
                        got.value(),
                        expected_ref,
                        color_set_id
                    );
                    break;
                }
                got.next();
            }
        }
    }

    Ok(Index::new(
        k2u,
        u2c,
        ColorSets::Meta(meta),
        FilenameTable::build(&permuter.filenames),
    ))
}

/// Return the partial set's id within the partition, interning it on
/// first sight. Lookups share a read lock; only a miss takes the write
/// lock, re-checking under it.
fn intern_partial(interner: &RwLock<PartitionInterner>, partial: &[u32]) -> u32 {
    if let Some(&id) = interner.read().unwrap().map.get(partial) {
        return id;
    }
    let mut w = interner.write().unwrap();
    if let Some(&id) = w.map.get(partial) {
        return id;
    }
    let id = w.map.len() as u32;
    w.builder.process(partial);
    w.map.insert(partial.to_vec(), id);
    id
}
