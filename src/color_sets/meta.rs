/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Two-level color-set encoding: references are partitioned into
//! contiguous ranges, each range owns a hybrid store of *partial* sets,
//! and every full set is a list of meta colors, i.e. global indices of
//! partial sets, packed in a fixed-width integer vector.

use anyhow::Result;

use crate::bits::{CompactVector, CompactVectorBuilder, EliasFano};
use crate::color_sets::{ColorSetStore, HybridColorSets, HybridColorSetsBuilder, HybridIterator, SetIterator};
use crate::serialize::{Visit, Visitor};

/// Boundary of one partition: the first reference id of its range and the
/// number of partial sets stored in all previous partitions.
#[derive(Clone, Copy, Default, Debug)]
pub struct PartitionEndpoint {
    pub min_color: u32,
    pub num_color_sets_before: u32,
}

impl Visit for PartitionEndpoint {
    fn visit<V: Visitor>(&mut self, visitor: &mut V) -> Result<()> {
        visitor.u32(&mut self.min_color)?;
        visitor.u32(&mut self.num_color_sets_before)
    }
}

#[derive(Clone, Default, Debug)]
pub struct MetaColorSets {
    num_colors: u32,
    meta_color_sets: CompactVector,
    meta_color_sets_offsets: EliasFano,
    partial_color_sets: Vec<HybridColorSets>,
    partition_endpoints: Vec<PartitionEndpoint>,
}

impl MetaColorSets {
    pub fn num_partitions(&self) -> usize {
        self.partition_endpoints.len() - 1
    }

    pub fn partial_color_sets(&self) -> &[HybridColorSets] {
        &self.partial_color_sets
    }

    pub fn partition_endpoints(&self) -> &[PartitionEndpoint] {
        &self.partition_endpoints
    }

    /// Partition owning the partial set named by `meta_color`, starting
    /// the search at `hint`.
    fn partition_of(&self, meta_color: u32, hint: u32) -> u32 {
        let endpoints = &self.partition_endpoints;
        let mut partition_id = hint as usize;
        while partition_id + 1 < endpoints.len()
            && meta_color >= endpoints[partition_id + 1].num_color_sets_before
        {
            partition_id += 1;
        }
        debug_assert!(partition_id < self.num_partitions());
        partition_id as u32
    }
}

impl ColorSetStore for MetaColorSets {
    type SetIter<'a> = MetaIterator<'a>;

    fn color_set(&self, color_set_id: usize) -> MetaIterator<'_> {
        debug_assert!(color_set_id < self.num_color_sets());
        let begin = self.meta_color_sets_offsets.access(color_set_id) as usize;
        MetaIterator::new(self, begin)
    }

    fn num_colors(&self) -> u32 {
        self.num_colors
    }

    fn num_color_sets(&self) -> usize {
        self.meta_color_sets_offsets.len().saturating_sub(1)
    }

    fn num_bytes(&self) -> usize {
        4 + self.meta_color_sets.num_bytes()
            + self.meta_color_sets_offsets.num_bytes()
            + self
                .partial_color_sets
                .iter()
                .map(|c| c.num_bytes())
                .sum::<usize>()
            + self.partition_endpoints.len() * 8
    }
}

impl Visit for MetaColorSets {
    fn visit<V: Visitor>(&mut self, visitor: &mut V) -> Result<()> {
        visitor.u32(&mut self.num_colors)?;
        self.meta_color_sets.visit(visitor)?;
        self.meta_color_sets_offsets.visit(visitor)?;
        visitor.vec(&mut self.partial_color_sets)?;
        visitor.vec(&mut self.partition_endpoints)
    }
}

pub struct MetaColorSetsBuilder {
    num_colors: u32,
    partial_builders: Vec<HybridColorSetsBuilder>,
    meta: Option<CompactVectorBuilder>,
    meta_offsets: Vec<u64>,
    offset: u64,
    partition_endpoints: Vec<PartitionEndpoint>,
}

impl MetaColorSetsBuilder {
    pub fn new(num_colors: u32, num_partitions: usize) -> Self {
        Self {
            num_colors,
            partial_builders: Vec::with_capacity(num_partitions),
            meta: None,
            meta_offsets: vec![0],
            offset: 0,
            partition_endpoints: Vec::with_capacity(num_partitions + 1),
        }
    }

    /// Install the partial stores, one builder per partition, in
    /// partition order.
    pub fn install_partial_builders(&mut self, builders: Vec<HybridColorSetsBuilder>) {
        self.partial_builders = builders;
    }

    /// Fix the meta-level layout: `num_integers` is the total number of
    /// integers of all meta-color lists (sizes included),
    /// `num_partial_sets` the total number of partial sets, and
    /// `partition_min_colors` the `P + 1` partition range boundaries.
    pub fn init_meta_color_sets(
        &mut self,
        num_integers: u64,
        num_partial_sets: u64,
        partition_min_colors: &[u32],
        num_sets_in_partitions: &[u32],
    ) {
        debug_assert!(partition_min_colors.len() == num_sets_in_partitions.len() + 1);
        let width = CompactVectorBuilder::width_for(num_partial_sets.max(1));
        self.meta = Some(CompactVectorBuilder::new(num_integers as usize, width));
        self.partition_endpoints.push(PartitionEndpoint {
            min_color: partition_min_colors[0],
            num_color_sets_before: 0,
        });
        let mut before = 0;
        for (i, &n) in num_sets_in_partitions.iter().enumerate() {
            before += n;
            self.partition_endpoints.push(PartitionEndpoint {
                min_color: partition_min_colors[i + 1],
                num_color_sets_before: before,
            });
        }
    }

    /// Encode one meta-color list; ids are global partial-set indices.
    pub fn encode_meta_color_set(&mut self, meta_colors: &[u32]) {
        let meta = self
            .meta
            .as_mut()
            .expect("init_meta_color_sets must be called first");
        meta.push(meta_colors.len() as u64);
        for &m in meta_colors {
            meta.push(m as u64);
        }
        self.offset += meta_colors.len() as u64 + 1;
        self.meta_offsets.push(self.offset);
    }

    pub fn build(self) -> MetaColorSets {
        let meta = self
            .meta
            .expect("init_meta_color_sets must be called first");
        MetaColorSets {
            num_colors: self.num_colors,
            meta_color_sets: meta.build(),
            meta_color_sets_offsets: EliasFano::encode(
                &self.meta_offsets,
                *self.meta_offsets.last().unwrap(),
            ),
            partial_color_sets: self
                .partial_builders
                .into_iter()
                .map(|b| b.build())
                .collect(),
            partition_endpoints: self.partition_endpoints,
        }
    }
}

#[derive(Clone)]
pub struct MetaIterator<'a> {
    parent: &'a MetaColorSets,
    begin: usize,
    meta_color_set_size: u32,
    pos_in_meta_color_list: u32,
    partition_id: u32,
    partition_min_color: u32,
    partition_max_color: u32,
    curr_meta_color: u32,
    curr_partition_it: HybridIterator<'a>,
    curr_partition_size: u32,
    pos_in_curr_partition: u32,
    curr_val: u32,
}

impl<'a> MetaIterator<'a> {
    fn new(parent: &'a MetaColorSets, begin: usize) -> Self {
        let meta_color_set_size = parent.meta_color_sets.get(begin) as u32;
        debug_assert!(meta_color_set_size > 0);
        let curr_meta_color = parent.meta_color_sets.get(begin + 1) as u32;
        let partition_id = parent.partition_of(curr_meta_color, 0);
        let endpoints = &parent.partition_endpoints;
        let pid = partition_id as usize;
        let before = endpoints[pid].num_color_sets_before;
        let curr_partition_it =
            parent.partial_color_sets[pid].color_set((curr_meta_color - before) as usize);
        let curr_partition_size = curr_partition_it.size();
        debug_assert!(curr_partition_size > 0);
        let partition_min_color = endpoints[pid].min_color;
        let curr_val = curr_partition_it.value() + partition_min_color;
        Self {
            parent,
            begin,
            meta_color_set_size,
            pos_in_meta_color_list: 0,
            partition_id,
            partition_min_color,
            partition_max_color: endpoints[pid + 1].min_color,
            curr_meta_color,
            curr_partition_it,
            curr_partition_size,
            pos_in_curr_partition: 0,
            curr_val,
        }
    }

    #[inline]
    pub fn meta_color_set_size(&self) -> u32 {
        self.meta_color_set_size
    }

    #[inline]
    pub fn partition_id(&self) -> u32 {
        self.partition_id
    }

    #[inline]
    pub fn meta_color(&self) -> u32 {
        self.curr_meta_color
    }

    #[inline]
    pub fn partition_min_color(&self) -> u32 {
        self.partition_min_color
    }

    #[inline]
    pub fn partition_max_color(&self) -> u32 {
        self.partition_max_color
    }

    #[inline]
    pub fn num_partitions(&self) -> u32 {
        self.parent.num_partitions() as u32
    }

    #[inline]
    pub fn num_color_sets_before(&self) -> u32 {
        self.parent.partition_endpoints[self.partition_id as usize].num_color_sets_before
    }

    /// Size of the current partial set.
    #[inline]
    pub fn partial_set_size(&self) -> u32 {
        self.curr_partition_size
    }

    /// The current partial set has elements left.
    #[inline]
    pub fn has_next(&self) -> bool {
        self.pos_in_curr_partition != self.curr_partition_size
    }

    pub fn next_in_partition(&mut self) {
        self.pos_in_curr_partition += 1;
        self.curr_partition_it.next();
        self.update_curr_val();
    }

    /// Advance to the next meta color of the list, tracking the partition
    /// id only; the partial set is not decoded until
    /// [`Self::update_partition`].
    pub fn next_partition_id(&mut self) {
        self.pos_in_meta_color_list += 1;
        if self.pos_in_meta_color_list == self.meta_color_set_size {
            self.partition_id = self.num_partitions(); // saturate
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

    /// Decode the partial set of the current meta color.
    pub fn update_partition(&mut self) {
        let endpoints = &self.parent.partition_endpoints;
        let pid = self.partition_id as usize;
        self.partition_min_color = endpoints[pid].min_color;
        self.partition_max_color = endpoints[pid + 1].min_color;

        let before = endpoints[pid].num_color_sets_before;
        self.curr_partition_it = self.parent.partial_color_sets[pid]
            .color_set((self.curr_meta_color - before) as usize);
        self.curr_partition_size = self.curr_partition_it.size();
        debug_assert!(self.curr_partition_size > 0);
        self.pos_in_curr_partition = 0;
        self.update_curr_val();
    }

    fn read_partition_id(&mut self) {
        self.curr_meta_color = self
            .parent
            .meta_color_sets
            .get(self.begin + 1 + self.pos_in_meta_color_list as usize) as u32;
        self.partition_id = self
            .parent
            .partition_of(self.curr_meta_color, self.partition_id);
    }

    #[inline]
    fn update_curr_val(&mut self) {
        self.curr_val = self.curr_partition_it.value() + self.partition_min_color;
    }
}

impl SetIterator for MetaIterator<'_> {
    #[inline]
    fn value(&self) -> u32 {
        self.curr_val
    }

    fn next(&mut self) {
        if self.pos_in_curr_partition == self.curr_partition_size - 1 {
            if self.pos_in_meta_color_list == self.meta_color_set_size - 1 {
                self.curr_val = self.num_colors(); // saturate
                return;
            }
            self.pos_in_meta_color_list += 1;
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
        let mut n = 0;
        let mut partition_id = 0;
        for i in 0..self.meta_color_set_size as usize {
            let meta_color = parent.meta_color_sets.get(self.begin + 1 + i) as u32;
            partition_id = parent.partition_of(meta_color, partition_id);
            let before =
                parent.partition_endpoints[partition_id as usize].num_color_sets_before;
            n += parent.partial_color_sets[partition_id as usize]
                .color_set((meta_color - before) as usize)
                .size();
        }
        n
    }

    #[inline]
    fn num_colors(&self) -> u32 {
        self.parent.num_colors
    }

    fn rewind(&mut self) {
        *self = MetaIterator::new(self.parent, self.begin);
    }
}
