/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Bit vector with constant-time `rank1` via two-level cached popcounts:
//! one absolute count per 8-word block plus seven 9-bit sub-block ranks
//! packed in a single word.

use anyhow::Result;

use super::{BitIterator, BitVector};
use crate::serialize::{Visit, Visitor};

/// Words per rank block.
const BLOCK_SIZE: usize = 8;

#[derive(Clone, Default, Debug)]
pub struct RankedBitVector {
    bits: BitVector,
    // interleaved: [rank(block 0), subranks(block 0), rank(block 1), ...]
    block_rank_pairs: Vec<u64>,
}

impl RankedBitVector {
    pub fn new(bits: BitVector) -> Self {
        let mut v = Self {
            bits,
            block_rank_pairs: Vec::new(),
        };
        v.build_index();
        v
    }

    #[inline]
    pub fn bits(&self) -> &BitVector {
        &self.bits
    }

    #[inline]
    pub fn num_bits(&self) -> usize {
        self.bits.num_bits()
    }

    #[inline]
    pub fn num_ones(&self) -> u64 {
        self.block_rank_pairs[self.block_rank_pairs.len() - 2]
    }

    /// Number of ones in positions `[0, pos)`.
    #[inline]
    pub fn rank1(&self, pos: usize) -> u64 {
        debug_assert!(pos <= self.num_bits());
        if pos == self.num_bits() {
            return self.num_ones();
        }
        let sub_block = pos / 64;
        let mut r = self.sub_block_rank(sub_block);
        let sub_left = pos & 63;
        if sub_left != 0 {
            r += (self.bits.words()[sub_block] << (64 - sub_left)).count_ones() as u64;
        }
        r
    }

    /// Position of the `j`-th one, 0-indexed. `j` must be below
    /// [`Self::num_ones`].
    pub fn select1(&self, j: u64) -> usize {
        debug_assert!(j < self.num_ones());
        // find the block by scanning the absolute ranks
        let num_blocks = self.block_rank_pairs.len() / 2 - 1;
        let mut block = 0;
        while block + 1 < num_blocks && self.block_rank(block + 1) <= j {
            block += 1;
        }
        let mut cur_rank = self.block_rank(block);
        let words = self.bits.words();
        let word_begin = block * BLOCK_SIZE;
        for (i, &word) in words
            .iter()
            .enumerate()
            .skip(word_begin)
            .take(BLOCK_SIZE.min(words.len() - word_begin))
        {
            let pop = word.count_ones() as u64;
            if cur_rank + pop > j {
                return i * 64 + select_in_word(word, j - cur_rank);
            }
            cur_rank += pop;
        }
        unreachable!("select1 out of bounds");
    }

    #[inline]
    pub fn iter_at(&self, pos: usize) -> BitIterator<'_> {
        self.bits.iter_at(pos)
    }

    pub fn num_bytes(&self) -> usize {
        self.bits.num_bytes() + self.block_rank_pairs.len() * 8
    }

    #[inline]
    fn block_rank(&self, block: usize) -> u64 {
        self.block_rank_pairs[block * 2]
    }

    #[inline]
    fn sub_block_rank(&self, sub_block: usize) -> u64 {
        let block = sub_block / BLOCK_SIZE;
        let left = sub_block % BLOCK_SIZE;
        self.block_rank(block) + (self.sub_block_ranks(block) >> ((7 - left) * 9) & 0x1FF)
    }

    #[inline]
    fn sub_block_ranks(&self, block: usize) -> u64 {
        self.block_rank_pairs[block * 2 + 1]
    }

    fn build_index(&mut self) {
        let words = self.bits.words();
        let mut pairs = Vec::with_capacity(2 * words.len() / BLOCK_SIZE + 4);
        let mut next_rank = 0u64;
        let mut cur_subrank = 0u64;
        let mut subranks = 0u64;
        pairs.push(0);
        for (i, &word) in words.iter().enumerate() {
            let word_pop = word.count_ones() as u64;
            let shift = i % BLOCK_SIZE;
            if shift != 0 {
                subranks <<= 9;
                subranks |= cur_subrank;
            }
            next_rank += word_pop;
            cur_subrank += word_pop;
            if shift == BLOCK_SIZE - 1 {
                pairs.push(subranks);
                pairs.push(next_rank);
                subranks = 0;
                cur_subrank = 0;
            }
        }
        let left = BLOCK_SIZE - words.len() % BLOCK_SIZE;
        for _ in 0..left {
            subranks <<= 9;
            subranks |= cur_subrank;
        }
        pairs.push(subranks);
        if words.len() % BLOCK_SIZE != 0 {
            pairs.push(next_rank);
            pairs.push(0);
        }
        self.block_rank_pairs = pairs;
    }
}

/// Position of the `j`-th set bit of `word`, 0-indexed.
#[inline]
fn select_in_word(mut word: u64, j: u64) -> usize {
    for _ in 0..j {
        word &= word - 1;
    }
    word.trailing_zeros() as usize
}

impl Visit for RankedBitVector {
    fn visit<V: Visitor>(&mut self, visitor: &mut V) -> Result<()> {
        self.bits.visit(visitor)?;
        visitor.vec_u64(&mut self.block_rank_pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::BitVectorBuilder;

    #[test]
    fn rank_select_small() {
        let mut b = BitVectorBuilder::new();
        let pattern = [true, false, false, true, true, false, true, false];
        for round in 0..200 {
            b.push(pattern[round % pattern.len()]);
        }
        let v = RankedBitVector::new(b.build());
        let mut ones = 0;
        let mut positions = Vec::new();
        for i in 0..200 {
            assert_eq!(v.rank1(i), ones);
            if pattern[i % pattern.len()] {
                positions.push(i);
                ones += 1;
            }
        }
        assert_eq!(v.rank1(200), ones);
        assert_eq!(v.num_ones(), ones);
        for (j, &pos) in positions.iter().enumerate() {
            assert_eq!(v.select1(j as u64), pos);
        }
    }
}
