/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Encoding-specific intersection of a family of color-set iterators.

use crate::color_sets::{
    DifferentialIterator, HybridIterator, ListType, MetaDifferentialIterator, MetaIterator,
    SetIterator,
};

/// Leap-frog intersection of sorted iterators, all over `[0, num_colors)`.
pub fn next_geq_intersect<I: SetIterator>(
    iterators: &mut [I],
    colors: &mut Vec<u32>,
    num_colors: u32,
) {
    if iterators.is_empty() {
        return;
    }
    let mut candidate = iterators[0].value();
    let mut i = 1;
    while candidate < num_colors {
        while i != iterators.len() {
            iterators[i].next_geq(candidate);
            let val = iterators[i].value();
            if val != candidate {
                candidate = val;
                i = 0;
                break;
            }
            i += 1;
        }
        if i == iterators.len() {
            colors.push(candidate);
            iterators[0].next();
            candidate = iterators[0].value();
            i = 1;
        }
    }
}

/// Intersection of hybrid iterators. Very dense sets take part through
/// the union of their complements, kept as a presence mask; if *all*
/// sets are complemented, the union of complements is complemented
/// directly.
pub fn intersect(iterators: &mut [HybridIterator], colors: &mut Vec<u32>) {
    debug_assert!(colors.is_empty());
    if iterators.is_empty() {
        return;
    }
    iterators.sort_by_key(|it| it.size());

    let num_colors = iterators[0].num_colors();
    let mut num_sparse = 0;
    while num_sparse != iterators.len()
        && iterators[num_sparse].kind() != ListType::ComplementDeltaGaps
    {
        num_sparse += 1;
    }

    if num_sparse == 0 {
        // step 1: take the union of the complement sets
        for it in iterators.iter_mut() {
            it.reinit_for_complemented_set_iteration();
        }
        let mut complement_set = Vec::with_capacity(num_colors as usize);
        let mut candidate = iterators.iter().map(|it| it.comp_value()).min().unwrap();
        while candidate < num_colors {
            let mut next_candidate = num_colors;
            for it in iterators.iter_mut() {
                if it.comp_value() == candidate {
                    it.next_comp();
                }
                if it.comp_value() < next_candidate {
                    next_candidate = it.comp_value();
                }
            }
            complement_set.push(candidate);
            debug_assert!(next_candidate > candidate);
            candidate = next_candidate;
        }

        // step 2: emit the complement of the union
        let mut candidate = 0;
        for &c in &complement_set {
            while candidate < c {
                colors.push(candidate);
                candidate += 1;
            }
            candidate += 1; // skip c itself
        }
        while candidate < num_colors {
            colors.push(candidate);
            candidate += 1;
        }
        return;
    }

    // presence mask: false iff some very dense set lacks the color
    let mut complement_union = vec![true; num_colors as usize];
    for i in num_sparse..iterators.len() {
        let mut it = iterators[i].clone();
        it.reinit_for_complemented_set_iteration();
        while it.comp_value() < num_colors {
            complement_union[it.comp_value() as usize] = false;
            it.next_comp();
        }
    }

    // leap-frog over the non-complemented iterators, masked
    let sparse = &mut iterators[..num_sparse];
    let mut candidate = sparse[0].value();
    let mut i = 1;
    while candidate < num_colors {
        while i != sparse.len() {
            sparse[i].next_geq(candidate);
            let val = sparse[i].value();
            if val != candidate {
                candidate = val;
                i = 0;
                break;
            }
            i += 1;
        }
        if i == sparse.len() {
            if complement_union[candidate as usize] {
                colors.push(candidate);
            }
            sparse[0].next();
            candidate = sparse[0].value();
            i = 1;
        }
    }
}

/// Intersection of differential iterators by per-cluster voting: within a
/// cluster with representative R, a color is in the intersection iff all
/// members list it in their differences and it is outside R, or no member
/// lists it and it is inside R. The per-cluster results are then
/// intersected by leap-frog. Emitted values are shifted by `lower_bound`.
pub fn diff_intersect(
    iterators: &mut [DifferentialIterator],
    colors: &mut Vec<u32>,
    lower_bound: u32,
) {
    if iterators.is_empty() {
        return;
    }
    let num_colors = iterators[0].num_colors();
    iterators.sort_by_key(|it| it.representative_begin());

    let num_iterators = iterators.len();
    let mut num_partitions = 1;
    let mut prev_partition = iterators[0].representative_begin();
    for it in iterators.iter() {
        if it.representative_begin() != prev_partition {
            prev_partition = it.representative_begin();
            num_partitions += 1;
        }
    }

    let mut partitions: Vec<Vec<u32>> = vec![Vec::new(); num_partitions];
    {
        let mut counts = vec![0u32; num_colors as usize];
        let mut partition_id = 0;
        let mut partition_size = 0u32;

        for iterator_id in 0..num_iterators {
            let mut it = iterators[iterator_id].clone();
            partition_size += 1;

            let is_last_in_partition = iterator_id + 1 == num_iterators
                || iterators[iterator_id + 1].representative_begin() != it.representative_begin();

            if partition_size == 1 && is_last_in_partition {
                // a single member decodes directly
                for _ in 0..it.size() {
                    partitions[partition_id].push(it.value());
                    it.next();
                }
                partition_id += 1;
                partition_size = 0;
                continue;
            }

            it.full_rewind();
            let mut val = it.differential_val();
            while val != num_colors {
                counts[val as usize] += 1;
                it.next_differential_val();
                val = it.differential_val();
            }

            if is_last_in_partition {
                it.full_rewind();
                let mut val = it.representative_val();
                for color in 0..num_colors {
                    if val < color {
                        it.next_representative_val();
                        val = it.representative_val();
                    }
                    if (counts[color as usize] == partition_size && val != color)
                        || (counts[color as usize] == 0 && val == color)
                    {
                        partitions[partition_id].push(color);
                    }
                }
                partition_id += 1;
                partition_size = 0;
                counts.fill(0);
            }
        }
    }

    partitions.sort_by_key(|p| p.len());
    let mut cursors = vec![0usize; num_partitions];
    for p in &partitions {
        if p.is_empty() {
            return;
        }
    }

    let mut candidate = partitions[0][0];
    let mut i = 1;
    while candidate < num_colors {
        while i != num_partitions {
            while cursors[i] != partitions[i].len() && partitions[i][cursors[i]] < candidate {
                cursors[i] += 1;
            }
            if cursors[i] == partitions[i].len() {
                candidate = num_colors;
                break;
            }
            let val = partitions[i][cursors[i]];
            if val != candidate {
                candidate = val;
                i = 0;
                break;
            }
            i += 1;
        }
        if i == num_partitions {
            colors.push(candidate + lower_bound);
            cursors[0] += 1;
            if cursors[0] == partitions[0].len() {
                break;
            }
            candidate = partitions[0][cursors[0]];
            i = 1;
        }
    }
}

/// Partition-level operations shared by the two two-level encodings.
pub trait MetaLevelIterator: SetIterator + Clone {
    fn meta_color_set_size(&self) -> u64;
    fn partition_id(&self) -> u32;
    fn next_partition_id(&mut self);
    fn next_geq_partition_id(&mut self, lower_bound: u32);
    fn update_partition(&mut self);
    fn meta_color(&self) -> u32;
    fn has_next(&self) -> bool;
    fn next_in_partition(&mut self);
    fn num_partitions(&self) -> u32;
    fn partial_set_size(&self) -> u32;
    fn partition_min_color(&self) -> u32;
    fn partition_max_color(&self) -> u32;
}

impl MetaLevelIterator for MetaIterator<'_> {
    fn meta_color_set_size(&self) -> u64 {
        MetaIterator::meta_color_set_size(self) as u64
    }
    fn partition_id(&self) -> u32 {
        MetaIterator::partition_id(self)
    }
    fn next_partition_id(&mut self) {
        MetaIterator::next_partition_id(self)
    }
    fn next_geq_partition_id(&mut self, lower_bound: u32) {
        MetaIterator::next_geq_partition_id(self, lower_bound)
    }
    fn update_partition(&mut self) {
        MetaIterator::update_partition(self)
    }
    fn meta_color(&self) -> u32 {
        MetaIterator::meta_color(self)
    }
    fn has_next(&self) -> bool {
        MetaIterator::has_next(self)
    }
    fn next_in_partition(&mut self) {
        MetaIterator::next_in_partition(self)
    }
    fn num_partitions(&self) -> u32 {
        MetaIterator::num_partitions(self)
    }
    fn partial_set_size(&self) -> u32 {
        MetaIterator::partial_set_size(self)
    }
    fn partition_min_color(&self) -> u32 {
        MetaIterator::partition_min_color(self)
    }
    fn partition_max_color(&self) -> u32 {
        MetaIterator::partition_max_color(self)
    }
}

impl MetaLevelIterator for MetaDifferentialIterator<'_> {
    fn meta_color_set_size(&self) -> u64 {
        MetaDifferentialIterator::meta_color_set_size(self)
    }
    fn partition_id(&self) -> u32 {
        MetaDifferentialIterator::partition_id(self)
    }
    fn next_partition_id(&mut self) {
        MetaDifferentialIterator::next_partition_id(self)
    }
    fn next_geq_partition_id(&mut self, lower_bound: u32) {
        MetaDifferentialIterator::next_geq_partition_id(self, lower_bound)
    }
    fn update_partition(&mut self) {
        MetaDifferentialIterator::update_partition(self)
    }
    fn meta_color(&self) -> u32 {
        MetaDifferentialIterator::meta_color(self)
    }
    fn has_next(&self) -> bool {
        MetaDifferentialIterator::has_next(self)
    }
    fn next_in_partition(&mut self) {
        MetaDifferentialIterator::next_in_partition(self)
    }
    fn num_partitions(&self) -> u32 {
        MetaDifferentialIterator::num_partitions(self)
    }
    fn partial_set_size(&self) -> u32 {
        MetaDifferentialIterator::partial_set_size(self)
    }
    fn partition_min_color(&self) -> u32 {
        MetaDifferentialIterator::partition_min_color(self)
    }
    fn partition_max_color(&self) -> u32 {
        MetaDifferentialIterator::partition_max_color(self)
    }
}

/// Partitions common to all iterators, by leap-frog at the meta level.
fn common_partitions<I: MetaLevelIterator>(iterators: &mut [I]) -> Vec<u32> {
    let num_partitions = iterators[0].num_partitions();
    let mut partition_ids = Vec::with_capacity(num_partitions as usize);
    let mut candidate = iterators[0].partition_id();
    let mut i = 1;
    while candidate < num_partitions {
        while i != iterators.len() {
            iterators[i].next_geq_partition_id(candidate);
            let val = iterators[i].partition_id();
            if val != candidate {
                candidate = val;
                i = 0;
                break;
            }
            i += 1;
        }
        if i == iterators.len() {
            partition_ids.push(candidate);
            iterators[0].next_partition_id();
            candidate = iterators[0].partition_id();
            i = 1;
        }
    }
    partition_ids
}

/// Intersection of two-level iterators: intersect the partition-id
/// sequences first, then, within each common partition, either emit the
/// whole partial set once (when every iterator carries the same meta
/// color) or intersect the deduplicated partial sets with `inner`.
fn meta_intersect_with<I, F>(iterators: &mut [I], colors: &mut Vec<u32>, mut inner: F)
where
    I: MetaLevelIterator,
    F: FnMut(&mut [I], &mut Vec<u32>),
{
    debug_assert!(colors.is_empty());
    if iterators.is_empty() {
        return;
    }

    iterators.sort_by_key(|it| it.meta_color_set_size());
    let partition_ids = common_partitions(iterators);

    for it in iterators.iter_mut() {
        it.rewind();
    }
    for partition_id in partition_ids {
        let mut same_meta_color = true;
        iterators[0].next_geq_partition_id(partition_id);
        iterators[0].update_partition();
        let meta_color = iterators[0].meta_color();

        for it in iterators[1..].iter_mut() {
            it.next_geq_partition_id(partition_id);
            it.update_partition();
            if it.meta_color() != meta_color {
                same_meta_color = false;
            }
        }

        if same_meta_color {
            // do not intersect: write the whole partial set once
            let front = &mut iterators[0];
            while front.has_next() {
                colors.push(front.value());
                front.next_in_partition();
            }
        } else {
            // deduplicate by meta color, then intersect inside the partition
            iterators.sort_by_key(|it| (it.partial_set_size(), it.meta_color()));
            let mut back_pos = 0;
            for curr_pos in 1..iterators.len() {
                if iterators[curr_pos].meta_color() != iterators[back_pos].meta_color() {
                    back_pos += 1;
                    iterators.swap(back_pos, curr_pos);
                }
            }
            inner(&mut iterators[..back_pos + 1], colors);
        }
    }
}

/// Intersection of meta (hybrid-inner) iterators.
pub fn meta_intersect(iterators: &mut [MetaIterator<'_>], colors: &mut Vec<u32>) {
    meta_intersect_with(iterators, colors, |deduped, colors| {
        let num_colors = deduped[0].partition_max_color();
        next_geq_intersect(deduped, colors, num_colors);
    });
}

/// Intersection of meta-differential iterators: the deduplicated partial
/// sets are intersected with the differential voting algorithm, shifted
/// by the partition's first color.
pub fn meta_diff_intersect(iterators: &mut [MetaDifferentialIterator<'_>], colors: &mut Vec<u32>) {
    meta_intersect_with(iterators, colors, |deduped, colors| {
        let lower_bound = deduped[0].partition_min_color();
        let mut diff_iterators: Vec<_> = deduped.iter().map(|it| it.partition_it()).collect();
        diff_intersect(&mut diff_iterators, colors, lower_bound);
    });
}
