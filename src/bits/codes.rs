/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Instantaneous codes over [`BitVectorBuilder`] / [`BitIterator`]:
//! unary, minimal binary, Elias γ and δ, and Rice.
//!
//! γ(x) writes ⌊log₂(x+1)⌋ in unary followed by the low bits of x+1;
//! δ(x) writes the same length in γ instead. Strictly increasing
//! sequences are coded as δ(x₀), δ(xᵢ − xᵢ₋₁ − 1).

use super::msb;
use super::{BitIterator, BitVectorBuilder};

impl BitVectorBuilder {
    /// Unary code: `x` zeros followed by a one. `x` must be below 64.
    #[inline]
    pub fn write_unary(&mut self, x: u64) {
        debug_assert!(x < 64);
        self.append_bits(1u64 << x, x as usize + 1);
    }

    /// Minimal binary code of `x ≤ r` on ⌈log₂(r+1)⌉ bits.
    #[inline]
    pub fn write_binary(&mut self, x: u64, r: u64) {
        debug_assert!(r > 0);
        debug_assert!(x <= r);
        self.append_bits(x, msb(r) as usize + 1);
    }

    /// Elias γ code.
    #[inline]
    pub fn write_gamma(&mut self, x: u64) {
        let xx = x + 1;
        let b = msb(xx);
        self.write_unary(b as u64);
        self.append_bits(xx & ((1u64 << b) - 1), b as usize);
    }

    /// Elias δ code.
    #[inline]
    pub fn write_delta(&mut self, x: u64) {
        let xx = x + 1;
        let b = msb(xx);
        self.write_gamma(b as u64);
        self.append_bits(xx & ((1u64 << b) - 1), b as usize);
    }

    /// Rice code with parameter `k`: γ of the quotient, `k` fixed bits of
    /// the remainder.
    #[inline]
    pub fn write_rice(&mut self, x: u64, k: u64) {
        debug_assert!(k > 0);
        let q = x >> k;
        self.write_gamma(q);
        self.append_bits(x & ((1u64 << k) - 1), k as usize);
    }
}

impl BitIterator<'_> {
    #[inline]
    pub fn read_unary(&mut self) -> u64 {
        self.skip_zeros()
    }

    #[inline]
    pub fn read_binary(&mut self, r: u64) -> u64 {
        debug_assert!(r > 0);
        self.take(msb(r) as usize + 1)
    }

    #[inline]
    pub fn read_gamma(&mut self) -> u64 {
        let b = self.read_unary();
        (self.take(b as usize) | (1u64 << b)) - 1
    }

    #[inline]
    pub fn read_delta(&mut self) -> u64 {
        let b = self.read_gamma();
        (self.take(b as usize) | (1u64 << b)) - 1
    }

    #[inline]
    pub fn read_rice(&mut self, k: u64) -> u64 {
        debug_assert!(k > 0);
        let q = self.read_gamma();
        let r = self.take(k as usize);
        r + (q << k)
    }
}

/// Write a strictly increasing sequence as δ-coded gaps minus one.
pub fn write_delta_gaps(builder: &mut BitVectorBuilder, values: &[u32]) {
    if values.is_empty() {
        return;
    }
    let mut prev = values[0];
    builder.write_delta(prev as u64);
    for &val in &values[1..] {
        debug_assert!(val > prev);
        builder.write_delta((val - prev - 1) as u64);
        prev = val;
    }
}

/// Decode `n` values written by [`write_delta_gaps`].
pub fn read_delta_gaps(it: &mut BitIterator<'_>, n: usize, out: &mut Vec<u32>) {
    if n == 0 {
        return;
    }
    let mut prev = it.read_delta() as u32;
    out.push(prev);
    for _ in 1..n {
        prev += it.read_delta() as u32 + 1;
        out.push(prev);
    }
}
