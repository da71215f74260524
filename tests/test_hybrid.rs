/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use fulgor::bits::BitVectorBuilder;
use fulgor::color_sets::{
    ColorSetStore, HybridColorSets, HybridColorSetsBuilder, ListType, SetIterator,
};
use fulgor::psa::full_intersection::intersect;
use fulgor::psa::threshold_union::merge;
use fulgor::psa::Scored;

const C: u32 = 100;

fn sample_set(size: u32, stride: u32) -> Vec<u32> {
    // `size` distinct values over [0, C), spread by `stride`
    let mut set: Vec<u32> = (0..size).map(|i| (i * stride) % C).collect();
    set.sort_unstable();
    set.dedup();
    let mut next = 0;
    while set.len() < size as usize {
        if !set.contains(&next) {
            set.push(next);
        }
        next += 1;
    }
    set.sort_unstable();
    set
}

fn build_store(sets: &[Vec<u32>]) -> HybridColorSets {
    let mut builder = HybridColorSetsBuilder::new(C);
    for set in sets {
        builder.process(set);
    }
    builder.build()
}

#[test]
fn layouts_follow_density_thresholds() {
    let sets = vec![sample_set(10, 7), sample_set(40, 3), sample_set(90, 1)];
    let store = build_store(&sets);

    assert_eq!(store.sparse_threshold(), 25);
    assert_eq!(store.very_dense_threshold(), 75);
    assert_eq!(store.color_set(0).kind(), ListType::DeltaGaps);
    assert_eq!(store.color_set(1).kind(), ListType::Bitmap);
    assert_eq!(store.color_set(2).kind(), ListType::ComplementDeltaGaps);
    assert_eq!(store.layout_census(), [1, 1, 1]);

    for (id, expected) in sets.iter().enumerate() {
        let mut it = store.color_set(id);
        assert_eq!(it.size() as usize, expected.len());
        assert_eq!(&it.collect_set(), expected);
    }
}

#[test]
fn bitmap_layout_occupies_exactly_universe_bits() {
    let set = sample_set(40, 3);
    let store = build_store(&[set]);
    let mut header = BitVectorBuilder::new();
    header.write_delta(40);
    assert_eq!(store.set_num_bits(0), header.num_bits() + C as usize);
}

#[test]
fn next_geq_skips_over_all_layouts() {
    let sets = vec![sample_set(10, 7), sample_set(40, 3), sample_set(90, 1)];
    let store = build_store(&sets);
    for (id, expected) in sets.iter().enumerate() {
        for lower_bound in 0..C {
            let mut it = store.color_set(id);
            it.next_geq(lower_bound);
            let answer = expected.iter().copied().find(|&v| v >= lower_bound);
            match answer {
                Some(v) => assert_eq!(it.value(), v, "set {id} next_geq({lower_bound})"),
                None => assert!(it.is_end(), "set {id} next_geq({lower_bound})"),
            }
        }
    }
}

#[test]
fn complement_iteration() {
    let dense = sample_set(90, 1);
    let store = build_store(&[dense.clone()]);
    let mut it = store.color_set(0);
    assert_eq!(it.kind(), ListType::ComplementDeltaGaps);
    it.reinit_for_complemented_set_iteration();
    let mut complement = Vec::new();
    while it.comp_value() < C {
        complement.push(it.comp_value());
        it.next_comp();
    }
    let expected: Vec<u32> = (0..C).filter(|v| !dense.contains(v)).collect();
    assert_eq!(complement, expected);
}

fn expected_intersection(sets: &[Vec<u32>]) -> Vec<u32> {
    (0..C)
        .filter(|v| sets.iter().all(|s| s.contains(v)))
        .collect()
}

#[test]
fn sparse_with_complemented_set() {
    // intersecting a sparse set with a very dense one removes exactly
    // the elements of the dense set's complement
    let sets = vec![sample_set(10, 7), sample_set(90, 1)];
    let store = build_store(&sets);
    let mut iterators: Vec<_> = (0..2).map(|id| store.color_set(id)).collect();
    let mut colors = Vec::new();
    intersect(&mut iterators, &mut colors);
    assert_eq!(colors, expected_intersection(&sets));
}

#[test]
fn all_iterators_complemented() {
    let sets = vec![sample_set(90, 1), sample_set(80, 9), sample_set(95, 11)];
    let store = build_store(&sets);
    let mut iterators: Vec<_> = (0..3).map(|id| store.color_set(id)).collect();
    let mut colors = Vec::new();
    intersect(&mut iterators, &mut colors);
    assert_eq!(colors, expected_intersection(&sets));
}

#[test]
fn mixed_layout_intersections() {
    let sets = vec![
        sample_set(10, 7),
        sample_set(40, 3),
        sample_set(90, 1),
        sample_set(24, 13),
    ];
    let store = build_store(&sets);
    let mut iterators: Vec<_> = (0..sets.len()).map(|id| store.color_set(id)).collect();
    let mut colors = Vec::new();
    intersect(&mut iterators, &mut colors);
    assert_eq!(colors, expected_intersection(&sets));
}

#[test]
fn threshold_merge_counts_scores() {
    let sets = vec![sample_set(10, 7), sample_set(40, 3), sample_set(90, 1)];
    let store = build_store(&sets);
    let scores = [3u32, 2, 1];
    let mut iterators: Vec<_> = (0..3)
        .map(|id| Scored {
            item: store.color_set(id),
            score: scores[id],
        })
        .collect();
    let min_score = 4;
    let mut colors = Vec::new();
    merge(&mut iterators, &mut colors, min_score);
    let expected: Vec<u32> = (0..C)
        .filter(|v| {
            let score: u32 = sets
                .iter()
                .zip(&scores)
                .filter(|(s, _)| s.contains(v))
                .map(|(_, &w)| w)
                .sum();
            score as i64 >= min_score
        })
        .collect();
    assert_eq!(colors, expected);
}
