/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use fulgor::bits::codes::{read_delta_gaps, write_delta_gaps};
use fulgor::bits::{BitVectorBuilder, CompactVectorBuilder, EliasFano, RankedBitVector};

#[test]
fn unary_gamma_delta_rice_roundtrip() {
    let values: Vec<u64> = (0..200)
        .map(|i| (i * i * 2654435761u64) % 100_000)
        .collect();

    let mut b = BitVectorBuilder::new();
    for &v in &values {
        b.write_unary(v % 60);
        b.write_gamma(v);
        b.write_delta(v);
        b.write_rice(v, 5);
        b.write_binary(v.min(100_000), 100_000);
        b.append_bits(v & 0xFFFF, 16);
    }
    let bv = b.build();
    let mut it = bv.iter_at(0);
    for &v in &values {
        assert_eq!(it.read_unary(), v % 60);
        assert_eq!(it.read_gamma(), v);
        assert_eq!(it.read_delta(), v);
        assert_eq!(it.read_rice(5), v);
        assert_eq!(it.read_binary(100_000), v.min(100_000));
        assert_eq!(it.take(16), v & 0xFFFF);
    }
    assert_eq!(it.position(), bv.num_bits());
}

#[test]
fn strictly_increasing_gap_coding() {
    let values: Vec<u32> = (0..500).map(|i| 3 * i + (i % 7)).collect();
    let mut b = BitVectorBuilder::new();
    b.write_delta(values.len() as u64);
    write_delta_gaps(&mut b, &values);
    let bv = b.build();

    let mut it = bv.iter_at(0);
    let n = it.read_delta() as usize;
    assert_eq!(n, values.len());
    let mut decoded = Vec::new();
    read_delta_gaps(&mut it, n, &mut decoded);
    assert_eq!(decoded, values);
}

#[test]
fn cross_builder_append_preserves_bits() {
    let mut a = BitVectorBuilder::new();
    a.append_bits(0b1011, 4);
    a.write_gamma(77);

    let mut b = BitVectorBuilder::new();
    b.write_delta(12345);
    b.append_bits(0x5A5A, 16);

    a.append(&b);
    let bv = a.build();
    let mut it = bv.iter_at(0);
    assert_eq!(it.take(4), 0b1011);
    assert_eq!(it.read_gamma(), 77);
    assert_eq!(it.read_delta(), 12345);
    assert_eq!(it.take(16), 0x5A5A);
}

#[test]
fn next_one_scans_set_bits() {
    let mut b = BitVectorBuilder::with_len(300, false);
    let positions = [0usize, 1, 63, 64, 65, 128, 299];
    for &p in &positions {
        b.set(p, true);
    }
    let bv = b.build();
    let mut it = bv.iter_at(0);
    for &p in &positions {
        assert_eq!(it.next_one(), p);
    }
    assert_eq!(it.next_one(), 300);
}

#[test]
fn rank_and_select_on_sparse_vector() {
    let num_bits = 10_000;
    let mut b = BitVectorBuilder::with_len(num_bits, false);
    let ones: Vec<usize> = (0..num_bits).filter(|i| i % 97 == 13).collect();
    for &p in &ones {
        b.set(p, true);
    }
    let v = RankedBitVector::new(b.build());

    assert_eq!(v.num_ones() as usize, ones.len());
    assert_eq!(v.rank1(num_bits) as usize, ones.len());
    for (j, &p) in ones.iter().enumerate() {
        assert_eq!(v.rank1(p) as usize, j);
        assert_eq!(v.rank1(p + 1) as usize, j + 1);
        assert_eq!(v.select1(j as u64), p);
    }
}

#[test]
fn elias_fano_offsets() {
    let mut offsets = vec![0u64];
    let mut acc = 0;
    for i in 0..3000u64 {
        acc += (i * 37) % 113;
        offsets.push(acc);
    }
    let ef = EliasFano::encode(&offsets, *offsets.last().unwrap());
    assert_eq!(ef.len(), offsets.len());
    for (i, &o) in offsets.iter().enumerate() {
        assert_eq!(ef.access(i), o);
    }
}

#[test]
fn compact_vector_widths() {
    for width in [1usize, 2, 7, 9, 31, 33, 64] {
        let mask = if width == 64 { u64::MAX } else { (1 << width) - 1 };
        let values: Vec<u64> = (0..200u64).map(|i| (i * 0x9E3779B97F4A7C15) & mask).collect();
        let mut b = CompactVectorBuilder::new(values.len(), width);
        for &v in &values {
            b.push(v);
        }
        let cv = b.build();
        assert_eq!(cv.len(), values.len());
        assert_eq!(cv.width(), width);
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(cv.get(i), v);
        }
    }
}
