/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Two-level encoding with differential partial stores and an extra
//! compression step at the meta level: the distinct partition-id lists
//! (partition sets) are stored once, δ-coded, and every color set keeps
//! only bit-packed indices of its partial sets relative to each
//! partition (`msb(N_p) + 1` bits per entry).

use anyhow::Result;

use crate::bits::{msb, BitIterator, BitVector, BitVectorBuilder, EliasFano, RankedBitVector};
use crate::color_sets::{ColorSetStore, DifferentialColorSets, DifferentialIterator, SetIterator};
use crate::serialize::{Visit, Visitor};

/// One partition of the reference range: the first reference id it covers
/// and the number of partial sets of its differential store.
#[derive(Clone, Copy, Default, Debug)]
pub struct PartitionInfo {
    pub min_color: u64,
    pub num_color_sets: u64,
}

impl Visit for PartitionInfo {
    fn visit<V: Visitor>(&mut self, visitor: &mut V) -> Result<()> {
        visitor.u64(&mut self.min_color)?;
        visitor.u64(&mut self.num_color_sets)
    }
}

#[derive(Clone, Default, Debug)]
pub struct MetaDifferentialColorSets {
    num_colors: u32,
    num_partition_sets: u64,
    partition_sets_offsets: EliasFano,
    relative_colors_offsets: EliasFano,
    partition_endpoints: Vec<PartitionInfo>,
    partial_color_sets: Vec<DifferentialColorSets>,
    relative_colors: BitVector,
    partition_sets: BitVector,
    // bit i set iff color-set i is the last using its partition set
    partition_sets_partitions: RankedBitVector,
}

impl MetaDifferentialColorSets {
    pub fn num_partitions(&self) -> usize {
        self.partition_endpoints.len()
    }

    pub fn num_partition_sets(&self) -> u64 {
        self.num_partition_sets
    }

    pub fn partial_color_sets(&self) -> &[DifferentialColorSets] {
        &self.partial_color_sets
    }
}

impl ColorSetStore for MetaDifferentialColorSets {
    type SetIter<'a> = MetaDifferentialIterator<'a>;

    fn color_set(&self, color_set_id: usize) -> MetaDifferentialIterator<'_> {
        debug_assert!(color_set_id < self.num_color_sets());
        let partition_set_id = self.partition_sets_partitions.rank1(color_set_id) as usize;
        let begin_partition_set = self.partition_sets_offsets.access(partition_set_id) as usize;
        let begin_rel = self.relative_colors_offsets.access(color_set_id) as usize;
        MetaDifferentialIterator::new(self, begin_partition_set, begin_rel)
    }

    fn num_colors(&self) -> u32 {
        self.num_colors
    }

    fn num_color_sets(&self) -> usize {
        self.relative_colors_offsets.len().saturating_sub(1)
    }

    fn num_bytes(&self) -> usize {
        4 + 8
            + self.partition_sets_offsets.num_bytes()
            + self.relative_colors_offsets.num_bytes()
            + self.partition_endpoints.len() * 16
            + self
                .partial_color_sets
                .iter()
                .map(|c| c.num_bytes())
                .sum::<usize>()
            + self.relative_colors.num_bytes()
            + self.partition_sets.num_bytes()
            + self.partition_sets_partitions.num_bytes()
    }
}

impl Visit for MetaDifferentialColorSets {
    fn visit<V: Visitor>(&mut self, visitor: &mut V) -> Result<()> {
        visitor.u32(&mut self.num_colors)?;
        visitor.u64(&mut self.num_partition_sets)?;
        self.partition_sets_offsets.visit(visitor)?;
        self.relative_colors_offsets.visit(visitor)?;
        visitor.vec(&mut self.partition_endpoints)?;
        visitor.vec(&mut self.partial_color_sets)?;
        self.relative_colors.visit(visitor)?;
        self.partition_sets.visit(visitor)?;
        self.partition_sets_partitions.visit(visitor)
    }
}

pub struct MetaDifferentialColorSetsBuilder {
    num_colors: u32,
    num_partition_sets: u64,
    partial_color_sets: Vec<DifferentialColorSets>,
    relative_colors: BitVectorBuilder,
    partition_sets: BitVectorBuilder,
    partition_sets_partitions: BitVectorBuilder,
    partition_sets_offsets: Vec<u64>,
    relative_colors_offsets: Vec<u64>,
    partition_endpoints: Vec<PartitionInfo>,
    prev_docs: u64,
    prev_partition_set_id: u64,
}

impl MetaDifferentialColorSetsBuilder {
    pub fn new(num_colors: u32, num_partitions: usize) -> Self {
        Self {
            num_colors,
            num_partition_sets: 0,
            partial_color_sets: Vec::with_capacity(num_partitions),
            relative_colors: BitVectorBuilder::new(),
            partition_sets: BitVectorBuilder::new(),
            partition_sets_partitions: BitVectorBuilder::new(),
            partition_sets_offsets: vec![0],
            relative_colors_offsets: vec![0],
            partition_endpoints: Vec::with_capacity(num_partitions),
            prev_docs: 0,
            prev_partition_set_id: 0,
        }
    }

    /// Install the differential store of the next partition.
    pub fn process_partition(&mut self, store: DifferentialColorSets) {
        self.partition_endpoints.push(PartitionInfo {
            min_color: self.prev_docs,
            num_color_sets: store.num_color_sets() as u64,
        });
        self.prev_docs += store.num_colors() as u64;
        self.partial_color_sets.push(store);
    }

    pub fn init_partition_sets(&mut self, num_sets: u64) {
        self.num_partition_sets = num_sets;
        self.partition_sets_offsets.reserve(num_sets as usize);
    }

    /// Store one distinct partition-id list, δ-coded.
    pub fn process_partition_set(&mut self, partition_set: &[u32]) {
        debug_assert!(!partition_set.is_empty());
        self.partition_sets
            .write_delta(partition_set.len() as u64);
        let mut prev = partition_set[0];
        self.partition_sets.write_delta(prev as u64);
        for &p in &partition_set[1..] {
            debug_assert!(prev < p);
            self.partition_sets.write_delta((p - prev) as u64);
            prev = p;
        }
        self.partition_sets_offsets
            .push(self.partition_sets.num_bits() as u64);
    }

    /// Encode one color set: the id of its partition set, the partition
    /// ids it spans, and the partial-set index within each partition.
    pub fn process_meta_color_set(
        &mut self,
        partition_set_id: u64,
        partition_set: &[u32],
        relative_colors: &[u64],
    ) {
        debug_assert!(partition_set.len() == relative_colors.len());
        if partition_set_id != self.prev_partition_set_id {
            self.prev_partition_set_id = partition_set_id;
            let last = self.partition_sets_partitions.num_bits() - 1;
            self.partition_sets_partitions.set(last, true);
        }
        self.partition_sets_partitions.push(false);

        for (&partition_id, &relative_id) in partition_set.iter().zip(relative_colors) {
            let partition_size =
                self.partition_endpoints[partition_id as usize].num_color_sets;
            self.relative_colors
                .append_bits(relative_id, msb(partition_size) as usize + 1);
        }
        self.relative_colors_offsets
            .push(self.relative_colors.num_bits() as u64);
    }

    pub fn build(self) -> MetaDifferentialColorSets {
        MetaDifferentialColorSets {
            num_colors: self.num_colors,
            num_partition_sets: self.num_partition_sets,
            partition_sets_offsets: EliasFano::encode(
                &self.partition_sets_offsets,
                *self.partition_sets_offsets.last().unwrap(),
            ),
            relative_colors_offsets: EliasFano::encode(
                &self.relative_colors_offsets,
                *self.relative_colors_offsets.last().unwrap(),
            ),
            partition_endpoints: self.partition_endpoints,
            partial_color_sets: self.partial_color_sets,
            relative_colors: self.relative_colors.build(),
            partition_sets: self.partition_sets.build(),
            partition_sets_partitions: RankedBitVector::new(
                self.partition_sets_partitions.build(),
            ),
        }
    }
}

#[derive(Clone)]
pub struct MetaDifferentialIterator<'a> {
    parent: &'a MetaDifferentialColorSets,
    begin_partition_set: usize,
    begin_rel: usize,
    partition_set_it: BitIterator<'a>,
    relative_colors_it: BitIterator<'a>,
    meta_color_set_size: u64,
    pos_in_meta_color: u64,
    pos_in_partial_color: u64,
    curr_partition_id: u64,
    num_color_sets_before: u64,
    curr_relative_color: u64,
    curr_partition_it: DifferentialIterator<'a>,
    curr_partition_size: u64,
    partition_min_color: u64,
    curr_val: u32,
}

impl<'a> MetaDifferentialIterator<'a> {
    fn new(
        parent: &'a MetaDifferentialColorSets,
        begin_partition_set: usize,
        begin_rel: usize,
    ) -> Self {
        let mut partition_set_it = parent.partition_sets.iter_at(begin_partition_set);
        let relative_colors_it = parent.relative_colors.iter_at(begin_rel);
        let meta_color_set_size = partition_set_it.read_delta();
        debug_assert!(meta_color_set_size > 0);
        // placeholder inner iterator; read_partition_id + update_partition
        // below install the real one
        let curr_partition_it = parent.partial_color_sets[0].color_set(0);
        let mut iter = Self {
            parent,
            begin_partition_set,
            begin_rel,
            partition_set_it,
            relative_colors_it,
            meta_color_set_size,
            pos_in_meta_color: 0,
            pos_in_partial_color: 0,
            curr_partition_id: 0,
            num_color_sets_before: 0,
            curr_relative_color: 0,
            curr_partition_it,
            curr_partition_size: 0,
            partition_min_color: 0,
            curr_val: 0,
        };
        iter.read_partition_id();
        iter.update_partition();
        iter
    }

    #[inline]
    pub fn meta_color_set_size(&self) -> u64 {
        self.meta_color_set_size
    }

    #[inline]
    pub fn partition_id(&self) -> u32 {
        self.curr_partition_id as u32
    }

    #[inline]
    pub fn meta_color(&self) -> u32 {
        (self.num_color_sets_before + self.curr_relative_color) as u32
    }

    #[inline]
    pub fn partition_min_color(&self) -> u32 {
        self.partition_min_color as u32
    }

    #[inline]
    pub fn partition_max_color(&self) -> u32 {
        self.partition_min_color as u32 + self.curr_partition_it.num_colors()
    }

    #[inline]
    pub fn num_partitions(&self) -> u32 {
        self.parent.num_partitions() as u32
    }

    #[inline]
    pub fn partial_set_size(&self) -> u32 {
        self.curr_partition_size as u32
    }

    /// The inner differential iterator of the current partition.
    pub fn partition_it(&self) -> DifferentialIterator<'a> {
        self.curr_partition_it.clone()
    }

    #[inline]
    pub fn has_next(&self) -> bool {
        self.pos_in_partial_color != self.curr_partition_size
    }

    pub fn next_in_partition(&mut self) {
        self.pos_in_partial_color += 1;
        self.curr_partition_it.next();
        self.update_curr_val();
    }

    pub fn next_partition_id(&mut self) {
        self.pos_in_meta_color += 1;
        if self.pos_in_meta_color == self.meta_color_set_size {
            self.curr_partition_id = self.num_partitions() as u64; // saturate
            return;
        }
        self.read_partition_id();
    }

    pub fn next_geq_partition_id(&mut self, lower_bound: u32) {
        debug_assert!(lower_bound <= self.num_partitions());
        while self.partition_id() < lower_bound {
            self.next_partition_id();
        }
    }

    pub fn update_partition(&mut self) {
        let pid = self.curr_partition_id as usize;
        self.partition_min_color = self.parent.partition_endpoints[pid].min_color;
        self.pos_in_partial_color = 0;
        self.curr_partition_it =
            self.parent.partial_color_sets[pid].color_set(self.curr_relative_color as usize);
        self.curr_partition_size = self.curr_partition_it.size() as u64;
        self.update_curr_val();
    }

    fn read_partition_id(&mut self) {
        let delta = self.partition_set_it.read_delta();
        for i in 0..delta {
            self.num_color_sets_before += self.parent.partition_endpoints
                [(self.curr_partition_id + i) as usize]
                .num_color_sets;
        }
        self.curr_partition_id += delta;
        let width = msb(
            self.parent.partition_endpoints[self.curr_partition_id as usize].num_color_sets,
        ) as usize
            + 1;
        self.curr_relative_color = self.relative_colors_it.take(width);
    }

    #[inline]
    fn update_curr_val(&mut self) {
        self.curr_val = self.partition_min_color as u32 + self.curr_partition_it.value();
    }
}

impl SetIterator for MetaDifferentialIterator<'_> {
    #[inline]
    fn value(&self) -> u32 {
        self.curr_val
    }

    fn next(&mut self) {
        if self.pos_in_partial_color == self.curr_partition_size - 1 {
            if self.pos_in_meta_color == self.meta_color_set_size - 1 {
                self.curr_val = self.num_colors(); // saturate
                return;
            }
            self.pos_in_meta_color += 1;
            self.read_partition_id();
            self.update_partition();
        } else {
            self.next_in_partition();
        }
    }

    fn next_geq(&mut self, lower_bound: u32) {
        debug_assert!(lower_bound <= self.num_colors());
        while self.value() < lower_bound {
            self.next();
        }
    }

    /// Total size of the full set; walks the whole meta-color list.
    fn size(&self) -> u32 {
        let parent = self.parent;
        let mut partition_set_it = parent.partition_sets.iter_at(self.begin_partition_set);
        let mut rel_it = parent.relative_colors.iter_at(self.begin_rel);
        let mut partition_id = 0usize;
        let mut size = 0;
        let n = partition_set_it.read_delta();
        for _ in 0..n {
            partition_id += partition_set_it.read_delta() as usize;
            let width =
                msb(parent.partition_endpoints[partition_id].num_color_sets) as usize + 1;
            let relative_color = rel_it.take(width);
            size += parent.partial_color_sets[partition_id]
                .color_set(relative_color as usize)
                .size();
        }
        size
    }

    #[inline]
    fn num_colors(&self) -> u32 {
        self.parent.num_colors
    }

    fn rewind(&mut self) {
        *self = MetaDifferentialIterator::new(
            self.parent,
            self.begin_partition_set,
            self.begin_rel,
        );
    }
}
