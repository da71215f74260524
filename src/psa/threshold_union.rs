/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Encoding-specific threshold merges: accumulate per-reference scores
//! from a family of color-set iterators, each carrying a hit count, and
//! keep the references whose score reaches the minimum.

use super::Scored;
use crate::color_sets::{
    DifferentialIterator, HybridIterator, ListType, MetaDifferentialIterator, MetaIterator,
    SetIterator,
};
use crate::psa::full_intersection::MetaLevelIterator;

/// Score merge of hybrid iterators. A complemented set contains every
/// color but its complement, so its score is folded into the minimum and
/// subtracted back along the complement chain.
pub fn merge(
    iterators: &mut [Scored<HybridIterator<'_>>],
    colors: &mut Vec<u32>,
    mut min_score: i64,
) {
    if iterators.is_empty() {
        return;
    }
    let num_colors = iterators[0].item.num_colors();
    let mut scores = vec![0i64; num_colors as usize];
    for s in iterators.iter_mut() {
        if s.item.kind() == ListType::ComplementDeltaGaps {
            s.item.reinit_for_complemented_set_iteration();
            min_score -= s.score as i64;
            while s.item.comp_value() < num_colors {
                scores[s.item.comp_value() as usize] -= s.score as i64;
                s.item.next_comp();
            }
        } else {
            for _ in 0..s.item.size() {
                scores[s.item.value() as usize] += s.score as i64;
                s.item.next();
            }
        }
    }
    for color in 0..num_colors {
        if scores[color as usize] >= min_score {
            colors.push(color);
        }
    }
}

/// Partitions whose summed score reaches the minimum; advances the
/// partition cursors of all iterators to the end.
fn candidate_partitions<I: MetaLevelIterator>(
    iterators: &mut [Scored<I>],
    min_score: u64,
) -> Vec<u32> {
    let num_partitions = iterators[0].item.num_partitions();
    let mut partition_ids = Vec::with_capacity(num_partitions as usize);
    let mut candidate = iterators
        .iter()
        .map(|s| s.item.partition_id())
        .min()
        .unwrap();
    while candidate < num_partitions {
        let mut next_partition = num_partitions;
        let mut score = 0u64;
        for s in iterators.iter_mut() {
            if s.item.partition_id() == candidate {
                score += s.score as u64;
                s.item.next_partition_id();
            }
            if s.item.partition_id() < next_partition {
                next_partition = s.item.partition_id();
            }
        }
        if score >= min_score {
            partition_ids.push(candidate);
        }
        debug_assert!(next_partition > candidate);
        candidate = next_partition;
    }
    partition_ids
}

/// Score merge of meta iterators: only partitions that can reach the
/// minimum are decoded, and a partial set shared by several iterators is
/// decoded once with their summed score.
pub fn merge_meta(
    iterators: &mut [Scored<MetaIterator<'_>>],
    colors: &mut Vec<u32>,
    min_score: u64,
) {
    if iterators.is_empty() {
        return;
    }
    let num_colors = iterators[0].item.num_colors();
    let partition_ids = candidate_partitions(iterators, min_score);

    let mut scores = vec![0u64; num_colors as usize];
    for s in iterators.iter_mut() {
        s.item.rewind();
    }
    for partition_id in partition_ids {
        let mut upper_bound = 0;
        for s in iterators.iter_mut() {
            s.item.next_geq_partition_id(partition_id);
            if s.item.partition_id() == partition_id {
                s.item.update_partition();
                upper_bound = s.item.partition_max_color();
            }
        }

        iterators.sort_by_key(|s| (s.item.partition_id(), s.item.meta_color()));

        fn process_meta(
            s: &mut Scored<MetaIterator<'_>>,
            meta_score: u64,
            upper_bound: u32,
            scores: &mut [u64],
        ) {
            while s.item.value() < upper_bound {
                scores[s.item.value() as usize] += meta_score;
                s.item.next();
            }
        }

        let mut meta_score = iterators[0].score as u64;
        let mut i = 1;
        while i < iterators.len() {
            if iterators[i].item.partition_id() != partition_id {
                break;
            }
            if iterators[i].item.meta_color() != iterators[i - 1].item.meta_color() {
                process_meta(&mut iterators[i - 1], meta_score, upper_bound, &mut scores);
                meta_score = 0;
            }
            meta_score += iterators[i].score as u64;
            i += 1;
        }
        process_meta(&mut iterators[i - 1], meta_score, upper_bound, &mut scores);
    }

    for color in 0..num_colors {
        if scores[color as usize] >= min_score {
            colors.push(color);
        }
    }
}

/// Score merge of differential iterators by per-cluster voting: a color
/// in the representative receives the cluster score minus the votes of
/// the differences listing it; a color outside receives the votes.
pub fn merge_diff(
    iterators: &mut [Scored<DifferentialIterator<'_>>],
    colors: &mut Vec<u32>,
    min_score: u64,
) {
    if iterators.is_empty() {
        return;
    }
    let num_colors = iterators[0].item.num_colors();
    let num_iterators = iterators.len();

    iterators.sort_by_key(|s| s.item.representative_begin());

    let mut partition_scores = vec![0u64; num_colors as usize];
    let mut scores = vec![0u64; num_colors as usize];
    let mut score = 0u64;
    let mut partition_size = 0u32;
    for iterator_id in 0..num_iterators {
        let mut s = iterators[iterator_id].clone();
        partition_size += 1;
        score += s.score as u64;

        let is_last_in_partition = iterator_id + 1 == num_iterators
            || iterators[iterator_id + 1].item.representative_begin()
                != s.item.representative_begin();

        if partition_size == 1 && is_last_in_partition {
            for _ in 0..s.item.size() {
                scores[s.item.value() as usize] += s.score as u64;
                s.item.next();
            }
            score = 0;
            partition_size = 0;
            continue;
        }

        s.item.full_rewind();
        let mut val = s.item.differential_val();
        while val != num_colors {
            partition_scores[val as usize] += s.score as u64;
            s.item.next_differential_val();
            val = s.item.differential_val();
        }

        if is_last_in_partition {
            s.item.full_rewind();
            let mut val = s.item.representative_val();
            for color in 0..num_colors {
                if val == color {
                    scores[color as usize] += score - partition_scores[color as usize];
                    s.item.next_representative_val();
                    val = s.item.representative_val();
                } else {
                    scores[color as usize] += partition_scores[color as usize];
                }
            }
            score = 0;
            partition_size = 0;
            partition_scores.fill(0);
        }
    }

    for color in 0..num_colors {
        if scores[color as usize] >= min_score {
            colors.push(color);
        }
    }
}

/// Score merge of meta-differential iterators: candidate partitions as in
/// [`merge_meta`], duplicate meta colors folded together, and the
/// differential voting of [`merge_diff`] applied inside each partition.
pub fn merge_meta_diff(
    iterators: &mut [Scored<MetaDifferentialIterator<'_>>],
    colors: &mut Vec<u32>,
    min_score: u64,
) {
    if iterators.is_empty() {
        return;
    }
    let num_colors = iterators[0].item.num_colors();
    let num_iterators = iterators.len();
    let partition_ids = candidate_partitions(iterators, min_score);

    let mut scores = vec![0u64; num_colors as usize];
    let mut partition_scores = vec![0u64; num_colors as usize];
    for s in iterators.iter_mut() {
        s.item.rewind();
    }
    for partition_id in partition_ids {
        let mut num_sets = 0u32;
        for s in iterators.iter_mut() {
            s.item.next_geq_partition_id(partition_id);
            if s.item.partition_id() == partition_id {
                s.item.update_partition();
                num_sets += 1;
            }
        }

        iterators.sort_by(|a, b| {
            let (a_part, b_part) = (a.item.partition_id(), b.item.partition_id());
            if a_part == partition_id && b_part == partition_id {
                let a_key = (a.item.meta_color(), a.item.partition_it().representative_begin());
                let b_key = (b.item.meta_color(), b.item.partition_it().representative_begin());
                a_key.cmp(&b_key)
            } else {
                a_part.cmp(&b_part)
            }
        });

        let lower_bound = iterators[0].item.partition_min_color() as usize;
        let num_partition_colors = iterators[0].item.partition_it().num_colors();

        let mut partition_score = 0u64;
        let mut partition_size = 0u32;
        let mut meta_score = 0u64;
        for iterator_id in 0..num_iterators {
            if iterators[iterator_id].item.partition_id() != partition_id {
                break;
            }
            meta_score += iterators[iterator_id].score as u64;
            num_sets -= 1;
            partition_size += 1;

            // fold duplicated meta colors into one decode
            if num_sets != 0
                && iterators[iterator_id + 1].item.meta_color()
                    == iterators[iterator_id].item.meta_color()
            {
                continue;
            }

            let mut diff_it = iterators[iterator_id].item.partition_it();
            partition_score += meta_score;

            let is_last_in_partition = num_sets == 0
                || iterators[iterator_id + 1].item.partition_it().representative_begin()
                    != diff_it.representative_begin();

            if is_last_in_partition && partition_size == 1 {
                for _ in 0..diff_it.size() {
                    scores[lower_bound + diff_it.value() as usize] += meta_score;
                    diff_it.next();
                }
                partition_score = 0;
                partition_size = 0;
                meta_score = 0;
                continue;
            }

            diff_it.full_rewind();
            let mut val = diff_it.differential_val();
            while val != num_partition_colors {
                partition_scores[val as usize] += meta_score;
                diff_it.next_differential_val();
                val = diff_it.differential_val();
            }
            meta_score = 0;

            if is_last_in_partition {
                diff_it.full_rewind();
                let mut val = diff_it.representative_val();
                for color in 0..num_partition_colors {
                    if val == color {
                        scores[lower_bound + color as usize] +=
                            partition_score - partition_scores[color as usize];
                        diff_it.next_representative_val();
                        val = diff_it.representative_val();
                    } else {
                        scores[lower_bound + color as usize] +=
                            partition_scores[color as usize];
                    }
                }
                partition_score = 0;
                partition_size = 0;
                partition_scores[..num_partition_colors as usize].fill(0);
            }
        }
    }

    for color in 0..num_colors {
        if scores[color as usize] >= min_score {
            colors.push(color);
        }
    }
}
