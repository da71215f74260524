/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use fulgor::color_sets::{
    ColorSetStore, HybridColorSetsBuilder, MetaColorSets, MetaColorSetsBuilder, SetIterator,
};
use fulgor::psa::full_intersection::meta_intersect;
use fulgor::psa::threshold_union::merge_meta;
use fulgor::psa::Scored;

const C: u32 = 16;

/// Two partitions over [0, 8) and [8, 16); partial sets
/// p0 = {{0,1,2}, {5}} and p1 = {{0,3}, {1}}; three full sets.
fn sample_store() -> (MetaColorSets, Vec<Vec<u32>>) {
    let mut p0 = HybridColorSetsBuilder::new(8);
    p0.process(&[0, 1, 2]);
    p0.process(&[5]);
    let mut p1 = HybridColorSetsBuilder::new(8);
    p1.process(&[0, 3]);
    p1.process(&[1]);

    let mut builder = MetaColorSetsBuilder::new(C, 2);
    builder.install_partial_builders(vec![p0, p1]);
    builder.init_meta_color_sets(8, 4, &[0, 8, 16], &[2, 2]);
    builder.encode_meta_color_set(&[0, 2]);
    builder.encode_meta_color_set(&[0, 3]);
    builder.encode_meta_color_set(&[1]);
    let expected = vec![vec![0, 1, 2, 8, 11], vec![0, 1, 2, 9], vec![5]];
    (builder.build(), expected)
}

#[test]
fn full_sets_decode_back() {
    let (store, expected) = sample_store();
    assert_eq!(store.num_color_sets(), 3);
    assert_eq!(store.num_partitions(), 2);
    for (id, set) in expected.iter().enumerate() {
        let mut it = store.color_set(id);
        assert_eq!(it.size() as usize, set.len());
        assert_eq!(&it.collect_set(), set);
    }
}

#[test]
fn partition_level_cursor() {
    let (store, _) = sample_store();
    let mut it = store.color_set(0);
    assert_eq!(it.meta_color_set_size(), 2);
    assert_eq!(it.partition_id(), 0);
    assert_eq!(it.meta_color(), 0);
    it.next_partition_id();
    assert_eq!(it.partition_id(), 1);
    assert_eq!(it.meta_color(), 2);
    it.update_partition();
    assert_eq!(it.partition_min_color(), 8);
    assert_eq!(it.partition_max_color(), 16);
    assert_eq!(it.value(), 8);
    it.next_partition_id();
    assert_eq!(it.partition_id(), 2); // past the end

    let mut it = store.color_set(1);
    it.next_geq_partition_id(1);
    assert_eq!(it.partition_id(), 1);
    it.update_partition();
    assert_eq!(it.value(), 9);
}

#[test]
fn shared_meta_color_short_circuits() {
    // sets 0 and 1 carry the same meta color in partition 0, so the
    // partial set {0,1,2} is emitted as a whole; partition 1 differs and
    // its partial sets intersect to nothing
    let (store, _) = sample_store();
    let mut iterators = vec![store.color_set(0), store.color_set(1)];
    let mut colors = Vec::new();
    meta_intersect(&mut iterators, &mut colors);
    assert_eq!(colors, vec![0, 1, 2]);
}

#[test]
fn disjoint_partial_sets_intersect_to_nothing() {
    let (store, _) = sample_store();
    let mut iterators = vec![store.color_set(0), store.color_set(2)];
    let mut colors = Vec::new();
    meta_intersect(&mut iterators, &mut colors);
    assert!(colors.is_empty());
}

#[test]
fn threshold_merge_over_partitions() {
    let (store, expected) = sample_store();
    let scores = [2u32, 1, 3];
    let mut iterators: Vec<_> = (0..3)
        .map(|id| Scored {
            item: store.color_set(id),
            score: scores[id],
        })
        .collect();
    let min_score = 3u64;
    let mut colors = Vec::new();
    merge_meta(&mut iterators, &mut colors, min_score);
    let answer: Vec<u32> = (0..C)
        .filter(|v| {
            let score: u32 = expected
                .iter()
                .zip(&scores)
                .filter(|(s, _)| s.contains(v))
                .map(|(_, &w)| w)
                .sum();
            score as u64 >= min_score
        })
        .collect();
    assert_eq!(colors, answer);
}
