/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Color-set storage: four interchangeable encodings of collections of
//! sorted reference-id sets over a fixed universe `[0, C)`.
//!
//! Every encoding exposes a forward iterator that decodes one set in
//! sorted order and supports `next_geq` skipping; the iterators borrow
//! the store they were created from.

use anyhow::Result;

pub mod differential;
pub mod hybrid;
pub mod meta;
pub mod meta_differential;

pub use differential::{DifferentialColorSets, DifferentialColorSetsBuilder, DifferentialIterator};
pub use hybrid::{HybridColorSets, HybridColorSetsBuilder, HybridIterator, ListType};
pub use meta::{MetaColorSets, MetaColorSetsBuilder, MetaIterator, PartitionEndpoint};
pub use meta_differential::{
    MetaDifferentialColorSets, MetaDifferentialColorSetsBuilder, MetaDifferentialIterator,
};

use crate::serialize::{Visit, Visitor};

/// Forward decoding iterator over one color set. `value()` yields the
/// current reference id in strictly increasing order and saturates at
/// `num_colors()` once the set is exhausted; `is_end()` makes the
/// past-the-end state explicit.
pub trait SetIterator {
    fn value(&self) -> u32;
    fn next(&mut self);
    /// Advance to the first element `≥ lower_bound`.
    fn next_geq(&mut self, lower_bound: u32);
    /// Number of elements in the set.
    fn size(&self) -> u32;
    /// Universe size `C`.
    fn num_colors(&self) -> u32;
    /// Restart decoding from the first element.
    fn rewind(&mut self);

    #[inline]
    fn is_end(&self) -> bool {
        self.value() >= self.num_colors()
    }

    /// Decode the remaining elements into a vector.
    fn collect_set(&mut self) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.size() as usize);
        while !self.is_end() {
            out.push(self.value());
            self.next();
        }
        out
    }
}

/// Store-level interface shared by the four encodings.
pub trait ColorSetStore {
    type SetIter<'a>: SetIterator
    where
        Self: 'a;

    fn color_set(&self, color_set_id: usize) -> Self::SetIter<'_>;
    fn num_colors(&self) -> u32;
    fn num_color_sets(&self) -> usize;
    fn num_bytes(&self) -> usize;
}

/// Variant type over the four encodings; which one an index carries is
/// tagged by its filename extension.
#[derive(Clone, Debug)]
pub enum ColorSets {
    Hybrid(HybridColorSets),
    Meta(MetaColorSets),
    Differential(DifferentialColorSets),
    MetaDifferential(MetaDifferentialColorSets),
}

/// Iterator counterpart of [`ColorSets`].
#[derive(Clone)]
pub enum ColorSetIter<'a> {
    Hybrid(HybridIterator<'a>),
    Meta(MetaIterator<'a>),
    Differential(DifferentialIterator<'a>),
    MetaDifferential(MetaDifferentialIterator<'a>),
}

macro_rules! dispatch {
    ($self:expr, $inner:pat => $body:expr) => {
        match $self {
            ColorSets::Hybrid($inner) => $body,
            ColorSets::Meta($inner) => $body,
            ColorSets::Differential($inner) => $body,
            ColorSets::MetaDifferential($inner) => $body,
        }
    };
}

macro_rules! dispatch_iter {
    ($self:expr, $inner:pat => $body:expr) => {
        match $self {
            ColorSetIter::Hybrid($inner) => $body,
            ColorSetIter::Meta($inner) => $body,
            ColorSetIter::Differential($inner) => $body,
            ColorSetIter::MetaDifferential($inner) => $body,
        }
    };
}

impl ColorSets {
    pub fn color_set(&self, color_set_id: usize) -> ColorSetIter<'_> {
        match self {
            ColorSets::Hybrid(cs) => ColorSetIter::Hybrid(cs.color_set(color_set_id)),
            ColorSets::Meta(cs) => ColorSetIter::Meta(cs.color_set(color_set_id)),
            ColorSets::Differential(cs) => ColorSetIter::Differential(cs.color_set(color_set_id)),
            ColorSets::MetaDifferential(cs) => {
                ColorSetIter::MetaDifferential(cs.color_set(color_set_id))
            }
        }
    }

    pub fn num_colors(&self) -> u32 {
        dispatch!(self, cs => cs.num_colors())
    }

    pub fn num_color_sets(&self) -> usize {
        dispatch!(self, cs => cs.num_color_sets())
    }

    pub fn num_bytes(&self) -> usize {
        dispatch!(self, cs => cs.num_bytes())
    }

    pub fn encoding_name(&self) -> &'static str {
        match self {
            ColorSets::Hybrid(_) => "hybrid",
            ColorSets::Meta(_) => "meta",
            ColorSets::Differential(_) => "differential",
            ColorSets::MetaDifferential(_) => "meta-differential",
        }
    }
}

impl Visit for ColorSets {
    fn visit<V: Visitor>(&mut self, visitor: &mut V) -> Result<()> {
        dispatch!(self, cs => cs.visit(visitor))
    }
}

impl SetIterator for ColorSetIter<'_> {
    fn value(&self) -> u32 {
        dispatch_iter!(self, it => it.value())
    }

    fn next(&mut self) {
        dispatch_iter!(self, it => it.next())
    }

    fn next_geq(&mut self, lower_bound: u32) {
        dispatch_iter!(self, it => it.next_geq(lower_bound))
    }

    fn size(&self) -> u32 {
        dispatch_iter!(self, it => it.size())
    }

    fn num_colors(&self) -> u32 {
        dispatch_iter!(self, it => it.num_colors())
    }

    fn rewind(&mut self) {
        dispatch_iter!(self, it => it.rewind())
    }
}
