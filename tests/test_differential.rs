/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use fulgor::color_sets::{
    ColorSetStore, DifferentialColorSets, DifferentialColorSetsBuilder, SetIterator,
};
use fulgor::psa::full_intersection::diff_intersect;
use fulgor::psa::threshold_union::merge_diff;
use fulgor::psa::Scored;

const C: u32 = 16;

/// Sorted in-memory set exposed through the iterator interface the
/// differential builder consumes.
struct VecIter {
    values: Vec<u32>,
    pos: usize,
    num_colors: u32,
}

impl VecIter {
    fn new(values: Vec<u32>, num_colors: u32) -> Self {
        Self {
            values,
            pos: 0,
            num_colors,
        }
    }
}

impl SetIterator for VecIter {
    fn value(&self) -> u32 {
        self.values
            .get(self.pos)
            .copied()
            .unwrap_or(self.num_colors)
    }
    fn next(&mut self) {
        self.pos += 1;
    }
    fn next_geq(&mut self, lower_bound: u32) {
        while self.value() < lower_bound {
            self.next();
        }
    }
    fn size(&self) -> u32 {
        self.values.len() as u32
    }
    fn num_colors(&self) -> u32 {
        self.num_colors
    }
    fn rewind(&mut self) {
        self.pos = 0;
    }
}

/// One cluster with the majority-vote representative {0, 2, 5}.
fn sample_store() -> (DifferentialColorSets, Vec<Vec<u32>>) {
    let sets = vec![vec![0u32, 2, 5], vec![0, 2, 3, 5], vec![0, 2, 5, 7]];
    let mut builder = DifferentialColorSetsBuilder::new(C);
    builder.process_partition(vec![0, 2, 5]);
    for set in &sets {
        builder.process_color_set(&mut VecIter::new(set.clone(), C));
    }
    (builder.build(), sets)
}

#[test]
fn members_decode_back() {
    let (store, sets) = sample_store();
    assert_eq!(store.num_color_sets(), 3);
    assert_eq!(store.num_partitions(), 1);
    for (id, expected) in sets.iter().enumerate() {
        let mut it = store.color_set(id);
        assert_eq!(it.size() as usize, expected.len());
        assert_eq!(&it.collect_set(), expected);
    }
}

#[test]
fn set_equal_to_representative_has_empty_difference() {
    let (store, _) = sample_store();
    // the first member is the representative itself
    assert_eq!(store.color_set(0).differential_list_size(), 0);
    assert_eq!(store.color_set(1).differential_list_size(), 1);
    assert_eq!(store.color_set(2).differential_list_size(), 1);
}

#[test]
fn intersection_within_one_cluster() {
    let (store, _) = sample_store();
    let mut iterators: Vec<_> = (0..3).map(|id| store.color_set(id)).collect();
    let mut colors = Vec::new();
    diff_intersect(&mut iterators, &mut colors, 0);
    assert_eq!(colors, vec![0, 2, 5]);
}

#[test]
fn intersection_across_clusters() {
    let mut builder = DifferentialColorSetsBuilder::new(C);
    builder.process_partition(vec![1, 2, 3]);
    builder.process_color_set(&mut VecIter::new(vec![1, 2, 3], C));
    builder.process_color_set(&mut VecIter::new(vec![1, 2, 4], C));
    builder.process_partition(vec![2, 3, 9]);
    builder.process_color_set(&mut VecIter::new(vec![2, 3, 9], C));
    builder.process_color_set(&mut VecIter::new(vec![1, 2, 9], C));
    let store = builder.build();
    assert_eq!(store.num_partitions(), 2);

    let mut iterators: Vec<_> = (0..4).map(|id| store.color_set(id)).collect();
    let mut colors = Vec::new();
    diff_intersect(&mut iterators, &mut colors, 0);
    // {1,2,3} ∩ {1,2,4} ∩ {2,3,9} ∩ {1,2,9} = {2}
    assert_eq!(colors, vec![2]);

    // a singleton bucket decodes directly
    let mut iterators = vec![store.color_set(1), store.color_set(2)];
    let mut colors = Vec::new();
    diff_intersect(&mut iterators, &mut colors, 0);
    assert_eq!(colors, vec![2]);
}

#[test]
fn threshold_merge_by_voting() {
    let (store, sets) = sample_store();
    let scores = [2u32, 1, 1];
    let mut iterators: Vec<_> = (0..3)
        .map(|id| Scored {
            item: store.color_set(id),
            score: scores[id],
        })
        .collect();
    let min_score = 3u64;
    let mut colors = Vec::new();
    merge_diff(&mut iterators, &mut colors, min_score);
    let expected: Vec<u32> = (0..C)
        .filter(|v| {
            let score: u32 = sets
                .iter()
                .zip(&scores)
                .filter(|(s, _)| s.contains(v))
                .map(|(_, &w)| w)
                .sum();
            score as u64 >= min_score
        })
        .collect();
    assert_eq!(colors, expected);
}
