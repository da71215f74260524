/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Hybrid color-set encoding: each set is stored, after a δ-coded size
//! header, in one of three layouts chosen by its density. Sets below
//! ⌈0.25·C⌉ elements use δ-coded gaps, sets below ⌈0.75·C⌉ a C-bit
//! bitmap, and the rest δ-coded gaps of the *absent* elements.

use anyhow::Result;

use crate::bits::codes::write_delta_gaps;
use crate::bits::{BitIterator, BitVector, BitVectorBuilder, EliasFano};
use crate::color_sets::{ColorSetStore, SetIterator};
use crate::serialize::{Visit, Visitor};

/// Storage layout of one set.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ListType {
    DeltaGaps,
    Bitmap,
    ComplementDeltaGaps,
}

#[derive(Clone, Default, Debug)]
pub struct HybridColorSets {
    num_colors: u32,
    sparse_threshold: u32,
    very_dense_threshold: u32,
    offsets: EliasFano,
    color_sets: BitVector,
}

impl HybridColorSets {
    #[inline]
    pub fn sparse_threshold(&self) -> u32 {
        self.sparse_threshold
    }

    #[inline]
    pub fn very_dense_threshold(&self) -> u32 {
        self.very_dense_threshold
    }

    /// Number of bits the set occupies, size header included.
    pub fn set_num_bits(&self, color_set_id: usize) -> usize {
        (self.offsets.access(color_set_id + 1) - self.offsets.access(color_set_id)) as usize
    }

    /// Count the sets stored in each layout.
    pub fn layout_census(&self) -> [u64; 3] {
        let mut census = [0u64; 3];
        for id in 0..self.num_color_sets() {
            match self.color_set(id).kind() {
                ListType::DeltaGaps => census[0] += 1,
                ListType::Bitmap => census[1] += 1,
                ListType::ComplementDeltaGaps => census[2] += 1,
            }
        }
        census
    }
}

impl ColorSetStore for HybridColorSets {
    type SetIter<'a> = HybridIterator<'a>;

    fn color_set(&self, color_set_id: usize) -> HybridIterator<'_> {
        debug_assert!(color_set_id < self.num_color_sets());
        let begin = self.offsets.access(color_set_id) as usize;
        HybridIterator::new(self, begin)
    }

    fn num_colors(&self) -> u32 {
        self.num_colors
    }

    fn num_color_sets(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    fn num_bytes(&self) -> usize {
        12 + self.offsets.num_bytes() + self.color_sets.num_bytes()
    }
}

impl Visit for HybridColorSets {
    fn visit<V: Visitor>(&mut self, visitor: &mut V) -> Result<()> {
        visitor.u32(&mut self.num_colors)?;
        visitor.u32(&mut self.sparse_threshold)?;
        visitor.u32(&mut self.very_dense_threshold)?;
        self.offsets.visit(visitor)?;
        self.color_sets.visit(visitor)
    }
}

#[derive(Clone, Debug)]
pub struct HybridColorSetsBuilder {
    num_colors: u32,
    sparse_threshold: u32,
    very_dense_threshold: u32,
    bvb: BitVectorBuilder,
    offsets: Vec<u64>,
    num_sets: u64,
    num_total_integers: u64,
}

impl HybridColorSetsBuilder {
    pub fn new(num_colors: u32) -> Self {
        Self {
            num_colors,
            sparse_threshold: num_colors.div_ceil(4),
            very_dense_threshold: (3 * num_colors as u64).div_ceil(4) as u32,
            bvb: BitVectorBuilder::new(),
            offsets: vec![0],
            num_sets: 0,
            num_total_integers: 0,
        }
    }

    pub fn reserve_num_bits(&mut self, num_bits: usize) {
        self.bvb.reserve(num_bits);
    }

    #[inline]
    pub fn num_sets(&self) -> u64 {
        self.num_sets
    }

    /// Encode one sorted set of reference ids.
    pub fn process(&mut self, colors: &[u32]) {
        let n = colors.len() as u32;
        self.bvb.write_delta(n as u64);
        if n < self.sparse_threshold {
            write_delta_gaps(&mut self.bvb, colors);
        } else if n < self.very_dense_threshold {
            let mut bitmap = BitVectorBuilder::with_len(self.num_colors as usize, false);
            for &c in colors {
                bitmap.set(c as usize, true);
            }
            self.bvb.append(&bitmap);
        } else {
            // gaps of the absent elements; their count is known from n and C
            let mut first = true;
            let mut prev_val = 0u32;
            let mut val = 0u32;
            for &x in colors {
                while val < x {
                    if first {
                        self.bvb.write_delta(val as u64);
                        first = false;
                    } else {
                        self.bvb.write_delta((val - prev_val - 1) as u64);
                    }
                    prev_val = val;
                    val += 1;
                }
                val += 1; // skip x
            }
            while val < self.num_colors {
                if first {
                    self.bvb.write_delta(val as u64);
                    first = false;
                } else {
                    self.bvb.write_delta((val - prev_val - 1) as u64);
                }
                prev_val = val;
                val += 1;
            }
        }
        self.offsets.push(self.bvb.num_bits() as u64);
        self.num_total_integers += n as u64;
        self.num_sets += 1;
    }

    /// Concatenate another builder's sets after this builder's, in order.
    pub fn append(&mut self, other: &HybridColorSetsBuilder) {
        if other.num_sets == 0 {
            return;
        }
        self.bvb.append(&other.bvb);
        let delta = *self.offsets.last().unwrap();
        self.offsets
            .extend(other.offsets[1..].iter().map(|&o| o + delta));
        self.num_sets += other.num_sets;
        self.num_total_integers += other.num_total_integers;
        debug_assert!(self.num_sets as usize == self.offsets.len() - 1);
    }

    pub fn clear(&mut self) {
        self.bvb.clear();
        self.offsets.clear();
        self.offsets.push(0);
        self.num_sets = 0;
        self.num_total_integers = 0;
    }

    pub fn build(self) -> HybridColorSets {
        let universe = *self.offsets.last().unwrap();
        HybridColorSets {
            num_colors: self.num_colors,
            sparse_threshold: self.sparse_threshold,
            very_dense_threshold: self.very_dense_threshold,
            offsets: EliasFano::encode(&self.offsets, universe),
            color_sets: self.bvb.build(),
        }
    }
}

#[derive(Clone)]
pub struct HybridIterator<'a> {
    parent: &'a HybridColorSets,
    begin: usize,
    num_colors: u32,
    kind: ListType,
    it: BitIterator<'a>,
    size: u32,
    pos_in_list: u32,
    bitmap_begin: usize,
    comp_list_size: u32,
    pos_in_comp_list: u32,
    comp_val: u32,
    prev_val: u32,
    curr_val: u32,
}

impl<'a> HybridIterator<'a> {
    fn new(parent: &'a HybridColorSets, begin: usize) -> Self {
        let mut iter = Self {
            parent,
            begin,
            num_colors: parent.num_colors,
            kind: ListType::DeltaGaps,
            it: parent.color_sets.iter_at(begin),
            size: 0,
            pos_in_list: 0,
            bitmap_begin: begin,
            comp_list_size: 0,
            pos_in_comp_list: 0,
            comp_val: 0,
            prev_val: 0,
            curr_val: 0,
        };
        iter.rewind();
        iter
    }

    #[inline]
    pub fn kind(&self) -> ListType {
        self.kind
    }

    /// Current element of the *complement* chain; only meaningful for the
    /// complemented layout.
    #[inline]
    pub fn comp_value(&self) -> u32 {
        self.comp_val
    }

    /// Restart the iterator to walk the complement chain itself, undoing
    /// the first-value positioning done by `rewind`.
    pub fn reinit_for_complemented_set_iteration(&mut self) {
        debug_assert!(self.kind == ListType::ComplementDeltaGaps);
        self.pos_in_comp_list = 0;
        self.prev_val = 0;
        self.curr_val = 0;
        self.it = self.parent.color_sets.iter_at(self.begin);
        self.it.read_delta(); // skip the size header
        self.comp_val = if self.comp_list_size > 0 {
            self.it.read_delta() as u32
        } else {
            self.num_colors
        };
    }

    /// Advance the complement chain by one.
    pub fn next_comp(&mut self) {
        self.pos_in_comp_list += 1;
        if self.pos_in_comp_list >= self.comp_list_size {
            self.comp_val = self.num_colors;
            return;
        }
        self.prev_val = self.comp_val;
        self.comp_val = self.it.read_delta() as u32 + self.prev_val + 1;
    }

    fn skip_comp_run(&mut self) {
        while self.curr_val == self.comp_val {
            self.curr_val += 1;
            self.pos_in_comp_list += 1;
            if self.pos_in_comp_list >= self.comp_list_size {
                break;
            }
            self.prev_val = self.comp_val;
            self.comp_val = self.it.read_delta() as u32 + self.prev_val + 1;
        }
    }

    fn next_geq_comp_val(&mut self, lower_bound: u32) {
        while self.comp_val < lower_bound {
            self.pos_in_comp_list += 1;
            if self.pos_in_comp_list >= self.comp_list_size {
                break;
            }
            self.prev_val = self.comp_val;
            self.comp_val = self.it.read_delta() as u32 + self.prev_val + 1;
        }
    }
}

impl SetIterator for HybridIterator<'_> {
    #[inline]
    fn value(&self) -> u32 {
        self.curr_val
    }

    fn next(&mut self) {
        match self.kind {
            ListType::ComplementDeltaGaps => {
                self.curr_val += 1;
                if self.curr_val >= self.num_colors {
                    self.curr_val = self.num_colors; // saturate
                    return;
                }
                self.skip_comp_run();
            }
            ListType::DeltaGaps => {
                self.pos_in_list += 1;
                if self.pos_in_list >= self.size {
                    self.curr_val = self.num_colors; // saturate
                    return;
                }
                self.prev_val = self.curr_val;
                self.curr_val = self.it.read_delta() as u32 + self.prev_val + 1;
            }
            ListType::Bitmap => {
                self.pos_in_list += 1;
                if self.pos_in_list >= self.size {
                    self.curr_val = self.num_colors; // saturate
                    return;
                }
                let pos = self.it.next_one();
                debug_assert!(pos >= self.bitmap_begin);
                self.curr_val = (pos - self.bitmap_begin) as u32;
            }
        }
    }

    fn next_geq(&mut self, lower_bound: u32) {
        debug_assert!(lower_bound <= self.num_colors);
        if self.kind == ListType::ComplementDeltaGaps {
            if self.value() > lower_bound {
                return;
            }
            self.next_geq_comp_val(lower_bound);
            self.curr_val = lower_bound + (self.comp_val == lower_bound) as u32;
        } else {
            while self.value() < lower_bound {
                self.next();
            }
        }
        debug_assert!(self.value() >= lower_bound);
    }

    #[inline]
    fn size(&self) -> u32 {
        self.size
    }

    #[inline]
    fn num_colors(&self) -> u32 {
        self.num_colors
    }

    fn rewind(&mut self) {
        self.pos_in_list = 0;
        self.pos_in_comp_list = 0;
        self.comp_list_size = 0;
        self.comp_val = self.num_colors;
        self.prev_val = 0;
        self.curr_val = 0;
        self.it = self.parent.color_sets.iter_at(self.begin);
        self.size = self.it.read_delta() as u32;
        if self.size < self.parent.sparse_threshold {
            self.kind = ListType::DeltaGaps;
            if self.size > 0 {
                self.curr_val = self.it.read_delta() as u32;
            } else {
                self.curr_val = self.num_colors;
            }
        } else if self.size < self.parent.very_dense_threshold {
            self.kind = ListType::Bitmap;
            self.bitmap_begin = self.it.position();
            let pos = self.it.next_one();
            debug_assert!(pos >= self.bitmap_begin);
            self.curr_val = (pos - self.bitmap_begin) as u32;
        } else {
            self.kind = ListType::ComplementDeltaGaps;
            self.comp_list_size = self.num_colors - self.size;
            if self.comp_list_size > 0 {
                self.comp_val = self.it.read_delta() as u32;
            }
            self.skip_comp_run();
        }
    }
}
