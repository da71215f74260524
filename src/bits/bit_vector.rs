/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Append-only bit-vector builder and a random-access bit cursor over a
//! finished vector.

use anyhow::Result;

use super::words_for;
use crate::serialize::{Visit, Visitor};

/// Append-only producer of a [`BitVector`].
#[derive(Clone, Default, Debug)]
pub struct BitVectorBuilder {
    num_bits: usize,
    words: Vec<u64>,
}

impl BitVectorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder holding `num_bits` bits, all set to `init`.
    pub fn with_len(num_bits: usize, init: bool) -> Self {
        let fill = if init { u64::MAX } else { 0 };
        let mut b = Self {
            num_bits,
            words: vec![fill; words_for(num_bits)],
        };
        b.clear_padding();
        b
    }

    #[inline]
    pub fn num_bits(&self) -> usize {
        self.num_bits
    }

    pub fn reserve(&mut self, num_bits: usize) {
        self.words.reserve(words_for(num_bits));
    }

    pub fn resize(&mut self, num_bits: usize) {
        self.num_bits = num_bits;
        self.words.resize(words_for(num_bits), 0);
    }

    /// Set the bit at `pos`, which must already be within the vector.
    #[inline]
    pub fn set(&mut self, pos: usize, b: bool) {
        debug_assert!(pos < self.num_bits);
        let word = pos >> 6;
        let bit = pos & 63;
        self.words[word] &= !(1u64 << bit);
        self.words[word] |= (b as u64) << bit;
    }

    #[inline]
    pub fn push(&mut self, b: bool) {
        self.append_bits(b as u64, 1);
    }

    /// Append the `len` low bits of `x`; any higher bit of `x` must be zero.
    #[inline]
    pub fn append_bits(&mut self, x: u64, len: usize) {
        debug_assert!(len <= 64);
        debug_assert!(len == 64 || (x >> len) == 0);
        if len == 0 {
            return;
        }
        let pos_in_word = self.num_bits & 63;
        self.num_bits += len;
        if pos_in_word == 0 {
            self.words.push(x);
        } else {
            let last = self.words.last_mut().unwrap();
            *last |= x << pos_in_word;
            if len > 64 - pos_in_word {
                self.words.push(x >> (64 - pos_in_word));
            }
        }
    }

    /// Append the whole content of another builder.
    pub fn append(&mut self, other: &BitVectorBuilder) {
        if other.num_bits == 0 {
            return;
        }
        let shift = self.num_bits & 63;
        if shift == 0 {
            self.words.extend_from_slice(&other.words);
            self.num_bits += other.num_bits;
            self.words.truncate(words_for(self.num_bits));
            return;
        }
        let mut remaining = other.num_bits;
        for &w in &other.words {
            let take = remaining.min(64);
            self.append_bits(w & mask(take), take);
            remaining -= take;
        }
    }

    pub fn clear(&mut self) {
        self.num_bits = 0;
        self.words.clear();
    }

    pub fn build(mut self) -> BitVector {
        self.clear_padding();
        BitVector {
            num_bits: self.num_bits as u64,
            words: self.words,
        }
    }

    fn clear_padding(&mut self) {
        let tail = self.num_bits & 63;
        if tail != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= mask(tail);
            }
        }
    }
}

#[inline]
fn mask(len: usize) -> u64 {
    if len == 64 {
        u64::MAX
    } else {
        (1u64 << len) - 1
    }
}

/// An immutable bit vector; padding bits beyond `num_bits` are zero.
#[derive(Clone, Default, Debug)]
pub struct BitVector {
    num_bits: u64,
    words: Vec<u64>,
}

impl BitVector {
    #[inline]
    pub fn num_bits(&self) -> usize {
        self.num_bits as usize
    }

    #[inline]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    #[inline]
    pub fn get(&self, pos: usize) -> bool {
        debug_assert!(pos < self.num_bits());
        (self.words[pos >> 6] >> (pos & 63)) & 1 != 0
    }

    /// A cursor positioned at bit `pos`.
    #[inline]
    pub fn iter_at(&self, pos: usize) -> BitIterator<'_> {
        BitIterator::new(&self.words, self.num_bits(), pos)
    }

    pub fn num_bytes(&self) -> usize {
        8 + self.words.len() * 8
    }
}

impl Visit for BitVector {
    fn visit<V: Visitor>(&mut self, visitor: &mut V) -> Result<()> {
        visitor.u64(&mut self.num_bits)?;
        visitor.vec_u64(&mut self.words)
    }
}

/// A cursor over the words of a [`BitVector`], reading forward from an
/// arbitrary bit position. Borrows the underlying words; must not outlive
/// the vector it was created from.
#[derive(Clone, Debug)]
pub struct BitIterator<'a> {
    words: &'a [u64],
    num_bits: usize,
    pos: usize,
    buf: u64,
    avail: usize,
}

impl<'a> BitIterator<'a> {
    pub fn new(words: &'a [u64], num_bits: usize, pos: usize) -> Self {
        Self {
            words,
            num_bits,
            pos,
            buf: 0,
            avail: 0,
        }
    }

    /// Current position in bits.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Reposition the cursor; the read buffer is discarded.
    #[inline]
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos;
        self.buf = 0;
        self.avail = 0;
    }

    /// Return the next `len` bits and advance by `len`.
    #[inline]
    pub fn take(&mut self, len: usize) -> u64 {
        debug_assert!(len <= 64);
        if self.avail < len {
            self.fill_buf();
        }
        let val = if len == 64 { self.buf } else { self.buf & mask(len) };
        self.buf = if len == 64 { 0 } else { self.buf >> len };
        self.avail -= len;
        self.pos += len;
        val
    }

    /// Skip all zeros from the current position, consume the terminating
    /// one bit, and return the number of zeros skipped.
    #[inline]
    pub fn skip_zeros(&mut self) -> u64 {
        let mut zeros = 0;
        while self.buf == 0 {
            self.pos += self.avail;
            zeros += self.avail as u64;
            self.fill_buf();
        }
        let l = self.buf.trailing_zeros() as usize;
        self.buf >>= l;
        self.buf >>= 1;
        self.avail -= l + 1;
        self.pos += l + 1;
        zeros + l as u64
    }

    /// Position of the first set bit at or after the current position,
    /// or `num_bits` if there is none. Advances just past the bit found.
    pub fn next_one(&mut self) -> usize {
        let mut word_idx = self.pos >> 6;
        if word_idx >= self.words.len() {
            self.set_position(self.num_bits);
            return self.num_bits;
        }
        let mut word = self.words[word_idx] & !mask(self.pos & 63);
        loop {
            if word != 0 {
                let p = (word_idx << 6) + word.trailing_zeros() as usize;
                if p >= self.num_bits {
                    self.set_position(self.num_bits);
                    return self.num_bits;
                }
                self.set_position(p + 1);
                return p;
            }
            word_idx += 1;
            if word_idx == self.words.len() {
                self.set_position(self.num_bits);
                return self.num_bits;
            }
            word = self.words[word_idx];
        }
    }

    #[inline]
    fn fill_buf(&mut self) {
        let block = self.pos >> 6;
        let shift = self.pos & 63;
        let mut word = self.words.get(block).copied().unwrap_or(0) >> shift;
        if shift != 0 && block + 1 < self.words.len() {
            word |= self.words[block + 1] << (64 - shift);
        }
        self.buf = word;
        self.avail = 64;
    }
}
