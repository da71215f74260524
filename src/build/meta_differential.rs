/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Meta-differential builder: re-encode every partition of a meta index
//! under the differential encoding, then compress the meta level by
//! storing each distinct partition-id list once and keeping only
//! bit-packed partition-relative partial ids per color set.

use anyhow::{bail, Context, Result};
use log::{info, warn};

use super::differential::{build_differential_color_sets, permute_color_sets};
use super::BuildConfig;
use crate::color_sets::{
    ColorSetStore, ColorSets, MetaDifferentialColorSetsBuilder, SetIterator,
};
use crate::index::Index;

/// Re-encode a meta index under the meta-differential encoding.
pub fn build_meta_differential_index(config: &BuildConfig, index: Index) -> Result<Index> {
    config.validate()?;
    let Index {
        k2u,
        u2c,
        color_sets,
        filenames,
    } = index;
    let ColorSets::Meta(meta_store) = &color_sets else {
        bail!("the meta-differential builder requires a meta index (.mfur)")
    };

    let num_partitions = meta_store.num_partitions();
    let num_color_sets = meta_store.num_color_sets();
    let num_colors = meta_store.num_colors();

    let mut builder = MetaDifferentialColorSetsBuilder::new(num_colors, num_partitions);

    info!("step 1. building differential partial color sets");
    // for each partition, the map from old partial-set id to its
    // position in the cluster-grouped order
    let mut partial_permutations: Vec<Vec<u32>> = Vec::with_capacity(num_partitions);
    for (partition_id, partial_store) in meta_store.partial_color_sets().iter().enumerate() {
        info!("partition {} / {}", partition_id, num_partitions - 1);
        let permuter = permute_color_sets(config, partial_store)?;
        let diff =
            build_differential_color_sets(partial_store, &permuter.permutation, config.num_threads);

        let mut positions = vec![0u32; partial_store.num_color_sets()];
        for (i, &(_, old_id)) in permuter.permutation.iter().enumerate() {
            positions[old_id as usize] = i as u32;
        }
        partial_permutations.push(positions);
        builder.process_partition(diff);
    }

    info!("step 2. building meta color sets");
    // group the color sets by identical partition-id lists
    let partition_id_lists: Vec<Vec<u32>> = (0..num_color_sets)
        .map(|color_set_id| {
            let mut it = meta_store.color_set(color_set_id);
            let n = it.meta_color_set_size();
            let mut list = Vec::with_capacity(n as usize);
            for _ in 0..n {
                list.push(it.partition_id());
                it.next_partition_id();
            }
            list
        })
        .collect();
    let mut permutation: Vec<u32> = (0..num_color_sets as u32).collect();
    permutation.sort_by(|&a, &b| partition_id_lists[a as usize].cmp(&partition_id_lists[b as usize]));

    let mut num_partition_sets = 0u64;
    {
        let mut prev: Option<&[u32]> = None;
        for &old_id in &permutation {
            let list = partition_id_lists[old_id as usize].as_slice();
            if prev != Some(list) {
                num_partition_sets += 1;
                prev = Some(list);
            }
        }
    }
    info!("num. partition sets = {num_partition_sets}");
    builder.init_partition_sets(num_partition_sets);

    let mut partition_set_id = 0u64;
    let mut prev_list: Option<&[u32]> = None;
    let mut relative_colors = Vec::with_capacity(num_partitions);
    for &old_id in &permutation {
        let list = partition_id_lists[old_id as usize].as_slice();
        if prev_list != Some(list) {
            if prev_list.is_some() {
                partition_set_id += 1;
            }
            builder.process_partition_set(list);
            prev_list = Some(list);
        }

        relative_colors.clear();
        let mut it = meta_store.color_set(old_id as usize);
        for _ in 0..it.meta_color_set_size() {
            let partition_id = it.partition_id() as usize;
            let old_relative = it.meta_color() - it.num_color_sets_before();
            relative_colors
                .push(partial_permutations[partition_id][old_relative as usize] as u64);
            it.next_partition_id();
        }
        builder.process_meta_color_set(partition_set_id, list, &relative_colors);
    }
    let meta_diff = builder.build();

    info!("step 3. permuting unitigs and rebuilding k2u");
    let (new_k2u, new_u2c) = super::repermute_unitigs(
        config,
        &k2u,
        &u2c,
        permutation.iter().map(|&old| old as usize),
    )
    .context("while permuting the unitigs")?;

    if config.check {
        info!("step 4. checking the meta-differential color sets");
        for (new_id, &old_id) in permutation.iter().enumerate() {
            let mut expected = meta_store.color_set(old_id as usize);
            let mut got = meta_diff.color_set(new_id);
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
        ColorSets::MetaDifferential(meta_diff),
        filenames,
    ))
}
