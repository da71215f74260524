/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Color-set permuter and differential-index builder: cluster the color
//! sets by sketch similarity, compute a majority-vote representative per
//! cluster, and re-encode every set as the symmetric difference with its
//! representative. The unitigs are rewritten in the new color-set order
//! and the dictionary is rebuilt over them.

use anyhow::{bail, ensure, Context, Result};
use log::{info, warn};

use super::sketches::{build_color_set_sketches, load_color_set_sketches, SKETCH_P};
use super::BuildConfig;
use crate::color_sets::{
    ColorSetStore, ColorSets, DifferentialColorSets, DifferentialColorSetsBuilder,
    HybridColorSets, SetIterator,
};
use crate::index::Index;
use crate::sketch::{kmeans_divisive, ClusteringParams};

/// Density slices: color sets are sketched and clustered per size
/// quartile of the universe.
const SLICES: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

pub struct ColorSetPermuter {
    pub num_partitions: usize,
    /// For each new color-set position, its cluster id and the old
    /// color-set id placed there; cluster ids are non-decreasing.
    pub permutation: Vec<(u32, u32)>,
}

/// Sketch the color sets per density slice, cluster each slice, and
/// derive the cluster-grouped order of the color sets.
pub fn permute_color_sets(
    config: &BuildConfig,
    store: &HybridColorSets,
) -> Result<ColorSetPermuter> {
    let num_color_sets = store.num_color_sets();
    let tmp = tempfile::Builder::new()
        .prefix("fulgor")
        .tempdir_in(&config.tmp_dir)
        .with_context(|| format!("cannot use temp directory {}", config.tmp_dir.display()))?;

    let params = ClusteringParams {
        min_delta: 1e-4,
        max_iterations: 10,
        min_cluster_size: 0,
        seed: 0,
    };

    let mut color_set_ids: Vec<u64> = Vec::new();
    let mut clusterings = Vec::new();
    let mut slice_sizes = Vec::new();
    for slice_id in 0..SLICES.len() - 1 {
        let path = tmp.path().join(format!("sketches{slice_id}.bin"));
        info!("building sketches for density slice {slice_id}");
        build_color_set_sketches(store, SKETCH_P, SLICES[slice_id], SLICES[slice_id + 1], &path)?;
        let (ids, points) = load_color_set_sketches(&path)?;
        if points.is_empty() {
            info!("found empty slice");
        }
        let clustering = kmeans_divisive(&points, &params);
        color_set_ids.extend(ids);
        slice_sizes.push(points.len());
        clusterings.push(clustering);
    }
    ensure!(
        color_set_ids.len() == num_color_sets,
        "the density slices must cover every color set"
    );

    let mut num_partitions = 0usize;
    for (clustering, &n) in clusterings.iter().zip(&slice_sizes) {
        if n > 0 {
            num_partitions += clustering.num_clusters;
        }
    }
    ensure!(
        num_partitions > 0,
        "clustering produced zero clusters; try reducing the number of threads"
    );
    info!("computed {num_partitions} partitions");

    // cluster sizes, then prefix sums to partition start positions
    let mut partition_size = vec![0u64; num_partitions + 1];
    let mut prev_num_clusters = 0usize;
    for (clustering, &n) in clusterings.iter().zip(&slice_sizes) {
        if n == 0 {
            continue;
        }
        for &c in &clustering.labels {
            partition_size[c as usize + prev_num_clusters] += 1;
        }
        prev_num_clusters += clustering.num_clusters;
    }
    let mut val = 0u64;
    for size in partition_size.iter_mut() {
        let tmp = *size;
        *size = val;
        val += tmp;
    }

    // position of each sketched point in the cluster-grouped order
    let mut clusters_pos = partition_size.clone();
    let mut positions = vec![0u64; num_color_sets];
    let mut prev_num_clusters = 0usize;
    let mut prev_num_sets = 0usize;
    for (clustering, &n) in clusterings.iter().zip(&slice_sizes) {
        for (i, &c) in clustering.labels.iter().enumerate() {
            let cluster = c as usize + prev_num_clusters;
            positions[i + prev_num_sets] = clusters_pos[cluster];
            clusters_pos[cluster] += 1;
        }
        if n > 0 {
            prev_num_clusters += clustering.num_clusters;
            prev_num_sets += n;
        }
    }

    let mut ids_in_new_order = vec![0u32; num_color_sets];
    for i in 0..num_color_sets {
        ids_in_new_order[positions[i] as usize] = color_set_ids[i] as u32;
    }

    let mut permutation = Vec::with_capacity(num_color_sets);
    let mut cluster_id = 0u32;
    for (i, &old_id) in ids_in_new_order.iter().enumerate() {
        while i as u64 == partition_size[cluster_id as usize + 1] {
            cluster_id += 1;
        }
        permutation.push((cluster_id, old_id));
    }

    Ok(ColorSetPermuter {
        num_partitions,
        permutation,
    })
}

/// Slice `[0, n)` at cluster boundaries so that every slice carries
/// roughly the same total decoded size.
fn cluster_balanced_slices(
    permutation: &[(u32, u32)],
    set_size: impl Fn(usize) -> u64,
    num_threads: usize,
) -> Vec<(usize, usize)> {
    let load: u64 = permutation.iter().map(|&(_, id)| set_size(id as usize)).sum();
    let load_per_thread = load / num_threads as u64;

    let mut slices = Vec::with_capacity(num_threads);
    let mut begin = 0usize;
    let mut curr_load = 0u64;
    let mut prev_cluster = permutation[0].0;
    for (i, &(cluster_id, color_set_id)) in permutation.iter().enumerate() {
        if cluster_id != prev_cluster {
            prev_cluster = cluster_id;
            if curr_load >= load_per_thread {
                slices.push((begin, i));
                begin = i;
                curr_load = 0;
            }
        }
        curr_load += set_size(color_set_id as usize);
    }
    slices.push((begin, permutation.len()));
    slices
}

/// Encode the color sets of `permutation[begin..end)` into a
/// differential builder, one cluster at a time, with the majority-vote
/// representative of each cluster.
pub(crate) fn encode_differential_slice(
    store: &HybridColorSets,
    permutation: &[(u32, u32)],
    begin: usize,
    end: usize,
) -> DifferentialColorSetsBuilder {
    let num_colors = store.num_colors();
    let mut builder = DifferentialColorSetsBuilder::new(num_colors);

    let mut group_endpoints = Vec::new();
    let mut curr_group = permutation[begin].0.wrapping_add(1); // differ from the first group
    for (i, &(group_id, _)) in permutation.iter().enumerate().take(end).skip(begin) {
        if group_id != curr_group {
            group_endpoints.push(i);
            curr_group = group_id;
        }
    }
    group_endpoints.push(end);

    let mut distribution = vec![0u32; num_colors as usize];
    for window in group_endpoints.windows(2) {
        let (g_begin, g_end) = (window[0], window[1]);
        for &(_, color_set_id) in &permutation[g_begin..g_end] {
            let mut it = store.color_set(color_set_id as usize);
            while !it.is_end() {
                distribution[it.value() as usize] += 1;
                it.next();
            }
        }
        let g_size = (g_end - g_begin) as u32;
        let mut representative = Vec::new();
        for (color, &count) in distribution.iter().enumerate() {
            if count >= g_size.div_ceil(2) {
                representative.push(color as u32);
            }
        }
        builder.process_partition(representative);

        for &(_, color_set_id) in &permutation[g_begin..g_end] {
            let mut it = store.color_set(color_set_id as usize);
            builder.process_color_set(&mut it);
        }
        distribution.fill(0);
    }
    builder
}

/// Build the differential color sets of a permuted hybrid store, slicing
/// the work at cluster boundaries across threads.
pub(crate) fn build_differential_color_sets(
    store: &HybridColorSets,
    permutation: &[(u32, u32)],
    num_threads: usize,
) -> DifferentialColorSets {
    let slices = cluster_balanced_slices(
        permutation,
        |id| store.color_set(id).size() as u64,
        num_threads,
    );

    let mut builders: Vec<DifferentialColorSetsBuilder> = std::thread::scope(|scope| {
        let handles: Vec<_> = slices
            .iter()
            .map(|&(begin, end)| {
                scope.spawn(move || encode_differential_slice(store, permutation, begin, end))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("differential encoder thread panicked"))
            .collect()
    });

    let mut main = builders.remove(0);
    for other in &builders {
        main.append(other);
    }
    main.build()
}

/// Re-encode a hybrid index under the differential encoding.
pub fn build_differential_index(config: &BuildConfig, index: Index) -> Result<Index> {
    config.validate()?;
    let Index {
        k2u,
        u2c,
        color_sets,
        filenames,
    } = index;
    let ColorSets::Hybrid(store) = &color_sets else {
        bail!("the differential builder requires a hybrid index (.fur)")
    };

    let permuter = permute_color_sets(config, store)?;
    let permutation = &permuter.permutation;
    info!("num_partitions = {}", permuter.num_partitions);

    info!("building differential color sets");
    let diff = build_differential_color_sets(store, permutation, config.num_threads);

    info!("permuting unitigs and rebuilding k2u");
    let (new_k2u, new_u2c) = super::repermute_unitigs(
        config,
        &k2u,
        &u2c,
        permutation.iter().map(|&(_, old)| old as usize),
    )?;

    if config.check {
        info!("checking the differential color sets");
        for (new_id, &(_, old_id)) in permutation.iter().enumerate() {
            let mut expected = store.color_set(old_id as usize);
            let mut got = diff.color_set(new_id);
            if got.size() != expected.size() {
                warn!(
                    "got a color set of size {} but expected {} (color set {})",
                    got.size(),
                    expected.size(),
                    new_id
                );
                continue;
            }
            while !expected.is_end() {
                if got.value() != expected.value() {
                    warn!(
                        "got ref {} but expected {} (color set {})",
                        got.value(),
                        expected.value(),
                        new_id
                    );
                    break;
                }
                expected.next();
                got.next();
            }
        }
    }

    Ok(Index::new(
        new_k2u,
        new_u2c,
        ColorSets::Differential(diff),
        filenames,
    ))
}
