/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Differential color-set encoding: sets are grouped into clusters, each
//! cluster owns a representative sorted set, and every member is stored
//! as the δ-coded symmetric difference with its representative. Decoding
//! merges the two sorted chains, cancelling values that appear in both.

use anyhow::Result;

use crate::bits::codes::write_delta_gaps;
use crate::bits::{BitIterator, BitVector, BitVectorBuilder, EliasFano, RankedBitVector};
use crate::color_sets::{ColorSetStore, SetIterator};
use crate::serialize::{Visit, Visitor};

#[derive(Clone, Default, Debug)]
pub struct DifferentialColorSets {
    num_colors: u32,
    representative_offsets: EliasFano,
    list_offsets: EliasFano,
    color_sets: BitVector,
    // bit i set iff color-set i is the last of its cluster, except for the
    // final cluster; cluster_of(i) = rank1(i)
    clusters: RankedBitVector,
}

impl DifferentialColorSets {
    pub fn num_partitions(&self) -> usize {
        self.clusters.num_ones() as usize + 1
    }

    fn representative_region_end(&self) -> usize {
        self.representative_offsets.access(self.num_partitions()) as usize
    }
}

impl ColorSetStore for DifferentialColorSets {
    type SetIter<'a> = DifferentialIterator<'a>;

    fn color_set(&self, color_set_id: usize) -> DifferentialIterator<'_> {
        debug_assert!(color_set_id < self.num_color_sets());
        let list_begin =
            self.list_offsets.access(color_set_id) as usize + self.representative_region_end();
        let cluster = self.clusters.rank1(color_set_id) as usize;
        let representative_begin = self.representative_offsets.access(cluster) as usize;
        DifferentialIterator::new(self, list_begin, representative_begin)
    }

    fn num_colors(&self) -> u32 {
        self.num_colors
    }

    fn num_color_sets(&self) -> usize {
        self.list_offsets.len().saturating_sub(1)
    }

    fn num_bytes(&self) -> usize {
        4 + self.representative_offsets.num_bytes()
            + self.list_offsets.num_bytes()
            + self.color_sets.num_bytes()
            + self.clusters.num_bytes()
    }
}

impl Visit for DifferentialColorSets {
    fn visit<V: Visitor>(&mut self, visitor: &mut V) -> Result<()> {
        visitor.u32(&mut self.num_colors)?;
        self.representative_offsets.visit(visitor)?;
        self.list_offsets.visit(visitor)?;
        self.color_sets.visit(visitor)?;
        self.clusters.visit(visitor)
    }
}

#[derive(Clone, Debug)]
pub struct DifferentialColorSetsBuilder {
    num_colors: u32,
    representatives: BitVectorBuilder,
    lists: BitVectorBuilder,
    clusters: BitVectorBuilder,
    representative_offsets: Vec<u64>,
    list_offsets: Vec<u64>,
    curr_representative: Vec<u32>,
    num_sets: u64,
    num_total_integers: u64,
}

impl DifferentialColorSetsBuilder {
    pub fn new(num_colors: u32) -> Self {
        Self {
            num_colors,
            representatives: BitVectorBuilder::new(),
            lists: BitVectorBuilder::new(),
            clusters: BitVectorBuilder::new(),
            representative_offsets: vec![0],
            list_offsets: vec![0],
            curr_representative: Vec::new(),
            num_sets: 0,
            num_total_integers: 0,
        }
    }

    pub fn reserve_num_bits(&mut self, num_bits: usize) {
        self.lists.reserve(num_bits);
    }

    /// Open a new cluster with the given representative; members must
    /// follow through [`Self::process_color_set`].
    pub fn process_partition(&mut self, representative: Vec<u32>) {
        if self.clusters.num_bits() > 0 {
            let last = self.clusters.num_bits() - 1;
            self.clusters.set(last, true);
        }
        self.representatives
            .write_delta(representative.len() as u64);
        write_delta_gaps(&mut self.representatives, &representative);
        self.representative_offsets
            .push(self.representatives.num_bits() as u64);
        self.num_total_integers += representative.len() as u64 + 1;
        self.curr_representative = representative;
    }

    /// Encode one member of the current cluster as the symmetric
    /// difference with the representative.
    pub fn process_color_set<I: SetIterator>(&mut self, it: &mut I) {
        let it_size = it.size() as u64;
        let rep = &self.curr_representative;
        let mut diff = Vec::with_capacity(rep.len() + it_size as usize);

        self.clusters.push(false);

        let mut j = 0;
        while !it.is_end() && j < rep.len() {
            let val = it.value();
            if val == rep[j] {
                j += 1;
                it.next();
            } else if val < rep[j] {
                diff.push(val);
                it.next();
            } else {
                diff.push(rep[j]);
                j += 1;
            }
        }
        while !it.is_end() {
            diff.push(it.value());
            it.next();
        }
        while j < rep.len() {
            diff.push(rep[j]);
            j += 1;
        }

        self.lists.write_delta(diff.len() as u64);
        self.lists.write_delta(it_size);
        write_delta_gaps(&mut self.lists, &diff);
        self.list_offsets.push(self.lists.num_bits() as u64);
        self.num_total_integers += diff.len() as u64 + 2;
        self.num_sets += 1;
    }

    /// Concatenate another builder's clusters after this builder's.
    pub fn append(&mut self, other: &DifferentialColorSetsBuilder) {
        if other.num_sets == 0 {
            return;
        }
        if self.clusters.num_bits() > 0 {
            let last = self.clusters.num_bits() - 1;
            self.clusters.set(last, true);
        }
        self.clusters.append(&other.clusters);

        let rep_delta = *self.representative_offsets.last().unwrap();
        self.representatives.append(&other.representatives);
        self.representative_offsets
            .extend(other.representative_offsets[1..].iter().map(|&o| o + rep_delta));

        let list_delta = *self.list_offsets.last().unwrap();
        self.lists.append(&other.lists);
        self.list_offsets
            .extend(other.list_offsets[1..].iter().map(|&o| o + list_delta));

        self.num_sets += other.num_sets;
        self.num_total_integers += other.num_total_integers;
    }

    pub fn build(self) -> DifferentialColorSets {
        let mut bvb = self.representatives;
        bvb.append(&self.lists);
        DifferentialColorSets {
            num_colors: self.num_colors,
            representative_offsets: EliasFano::encode(
                &self.representative_offsets,
                *self.representative_offsets.last().unwrap(),
            ),
            list_offsets: EliasFano::encode(
                &self.list_offsets,
                *self.list_offsets.last().unwrap(),
            ),
            color_sets: bvb.build(),
            clusters: RankedBitVector::new(self.clusters.build()),
        }
    }
}

#[derive(Clone)]
pub struct DifferentialIterator<'a> {
    parent: &'a DifferentialColorSets,
    list_begin: usize,
    representative_begin: usize,
    representative_size: u64,
    differential_list_size: u64,
    pos_in_representative: u64,
    pos_in_differential_list: u64,
    curr_representative_val: u32,
    curr_differential_val: u32,
    prev_representative_val: u32,
    prev_differential_val: u32,
    curr_val: u32,
    size: u32,
    representative_it: BitIterator<'a>,
    differential_list_it: BitIterator<'a>,
}

impl<'a> DifferentialIterator<'a> {
    fn new(parent: &'a DifferentialColorSets, list_begin: usize, representative_begin: usize) -> Self {
        let mut iter = Self {
            parent,
            list_begin,
            representative_begin,
            representative_size: 0,
            differential_list_size: 0,
            pos_in_representative: 0,
            pos_in_differential_list: 0,
            curr_representative_val: 0,
            curr_differential_val: 0,
            prev_representative_val: 0,
            prev_differential_val: 0,
            curr_val: 0,
            size: 0,
            representative_it: parent.color_sets.iter_at(representative_begin),
            differential_list_it: parent.color_sets.iter_at(list_begin),
        };
        iter.rewind();
        iter
    }

    /// Bit offset of this set's cluster representative; equal for all
    /// members of one cluster, it identifies the cluster in queries.
    #[inline]
    pub fn representative_begin(&self) -> usize {
        self.representative_begin
    }

    #[inline]
    pub fn differential_list_size(&self) -> u64 {
        self.differential_list_size
    }

    /// Reposition at the raw chains without merging the first value; used
    /// by the voting queries that walk the chains separately.
    pub fn full_rewind(&mut self) {
        self.init();
    }

    #[inline]
    pub fn representative_val(&self) -> u32 {
        self.curr_representative_val
    }

    pub fn next_representative_val(&mut self) {
        self.pos_in_representative += 1;
        self.prev_representative_val = self.curr_representative_val;
        if self.pos_in_representative < self.representative_size {
            self.curr_representative_val =
                self.prev_representative_val + self.representative_it.read_delta() as u32 + 1;
        } else {
            self.curr_representative_val = self.num_colors();
        }
    }

    #[inline]
    pub fn differential_val(&self) -> u32 {
        self.curr_differential_val
    }

    pub fn next_differential_val(&mut self) {
        self.pos_in_differential_list += 1;
        self.prev_differential_val = self.curr_differential_val;
        if self.pos_in_differential_list < self.differential_list_size {
            self.curr_differential_val =
                self.prev_differential_val + self.differential_list_it.read_delta() as u32 + 1;
        } else {
            self.curr_differential_val = self.num_colors();
        }
    }

    fn init(&mut self) {
        self.differential_list_it = self.parent.color_sets.iter_at(self.list_begin);
        self.representative_it = self.parent.color_sets.iter_at(self.representative_begin);

        self.differential_list_size = self.differential_list_it.read_delta();
        self.representative_size = self.representative_it.read_delta();
        self.size = self.differential_list_it.read_delta() as u32;

        self.curr_differential_val = if self.differential_list_size == 0 {
            self.num_colors()
        } else {
            self.differential_list_it.read_delta() as u32
        };
        self.prev_differential_val = 0;
        self.curr_representative_val = if self.representative_size == 0 {
            self.num_colors()
        } else {
            self.representative_it.read_delta() as u32
        };
        self.prev_representative_val = 0;

        self.pos_in_differential_list = 0;
        self.pos_in_representative = 0;
    }

    // values present in both chains cancel out: the merged stream is the
    // symmetric difference R Δ L, which is the original set
    fn update_curr_val(&mut self) {
        while self.curr_representative_val == self.curr_differential_val
            && self.pos_in_representative <= self.representative_size
            && self.pos_in_differential_list <= self.differential_list_size
        {
            self.next_differential_val();
            self.next_representative_val();
        }
        self.curr_val = self.curr_differential_val.min(self.curr_representative_val);
    }
}

impl SetIterator for DifferentialIterator<'_> {
    #[inline]
    fn value(&self) -> u32 {
        self.curr_val
    }

    fn next(&mut self) {
        if self.pos_in_representative >= self.representative_size
            && self.pos_in_differential_list >= self.differential_list_size
        {
            self.curr_val = self.num_colors(); // saturate
            return;
        }
        if self.pos_in_representative >= self.representative_size
            || self.curr_differential_val < self.curr_representative_val
        {
            self.next_differential_val();
        } else if self.pos_in_differential_list >= self.differential_list_size
            || self.curr_representative_val < self.curr_differential_val
        {
            self.next_representative_val();
        }
        self.update_curr_val();
    }

    fn next_geq(&mut self, lower_bound: u32) {
        debug_assert!(lower_bound <= self.num_colors());
        while self.value() < lower_bound {
            self.next();
        }
    }

    #[inline]
    fn size(&self) -> u32 {
        self.size
    }

    #[inline]
    fn num_colors(&self) -> u32 {
        self.parent.num_colors
    }

    fn rewind(&mut self) {
        self.init();
        self.update_curr_val();
    }
}
