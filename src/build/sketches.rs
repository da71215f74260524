/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Sketch construction for the permuters. Sketches are written to a
//! temporary file and read back by the clustering stage.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::bits::RankedBitVector;
use crate::color_sets::{ColorSetStore, HybridColorSets, SetIterator};
use crate::sketch::HllSketch;

/// 2^p bytes per HLL sketch.
pub const SKETCH_P: u32 = 10;

/// One HLL sketch per reference, fed with the ids of the unitigs whose
/// color set contains the reference. Layout of the output file:
/// `[bytes_per_point][num_points][registers…]`, all lengths 64-bit.
pub fn build_reference_sketches(
    store: &HybridColorSets,
    u2c: &RankedBitVector,
    p: u32,
    path: impl AsRef<Path>,
) -> Result<()> {
    let num_colors = store.num_colors() as usize;
    let merge = |mut a: Vec<HllSketch>, b: Vec<HllSketch>| {
        for (x, y) in a.iter_mut().zip(&b) {
            x.union_with(y);
        }
        a
    };
    let sketches = (0..store.num_color_sets())
        .into_par_iter()
        .fold(
            || vec![HllSketch::new(p); num_colors],
            |mut acc, color_set_id| {
                let (begin, end) = super::unitig_range(u2c, color_set_id);
                let mut it = store.color_set(color_set_id);
                while !it.is_end() {
                    let sketch = &mut acc[it.value() as usize];
                    for unitig_id in begin..end {
                        sketch.add(unitig_id as u64);
                    }
                    it.next();
                }
                acc
            },
        )
        .reduce(|| vec![HllSketch::new(p); num_colors], merge);

    let path = path.as_ref();
    let mut out = BufWriter::new(
        File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
    );
    out.write_all(&(1u64 << p).to_le_bytes())?;
    out.write_all(&(num_colors as u64).to_le_bytes())?;
    for sketch in &sketches {
        out.write_all(sketch.registers())?;
    }
    out.flush().context("cannot flush sketch file")?;
    Ok(())
}

pub fn load_reference_sketches(path: impl AsRef<Path>) -> Result<Vec<Vec<u8>>> {
    let path = path.as_ref();
    let mut input = BufReader::new(
        File::open(path).with_context(|| format!("cannot open {}", path.display()))?,
    );
    let bytes_per_point = read_u64(&mut input)? as usize;
    let num_points = read_u64(&mut input)? as usize;
    let mut points = Vec::with_capacity(num_points);
    for _ in 0..num_points {
        let mut registers = vec![0u8; bytes_per_point];
        input.read_exact(&mut registers).context("truncated sketch file")?;
        points.push(registers);
    }
    Ok(points)
}

/// One HLL sketch per color set whose size falls in the density slice
/// `[lo·C, hi·C)` (the last slice is closed at C), fed with the set
/// members. Layout: `[bytes_per_point][num_points][ids…][registers…]`.
pub fn build_color_set_sketches(
    store: &HybridColorSets,
    p: u32,
    lo: f64,
    hi: f64,
    path: impl AsRef<Path>,
) -> Result<u64> {
    let num_colors = store.num_colors() as f64;
    let ids: Vec<u64> = (0..store.num_color_sets())
        .filter(|&id| {
            let size = store.color_set(id).size() as f64;
            size >= lo * num_colors && (size < hi * num_colors || hi >= 1.0)
        })
        .map(|id| id as u64)
        .collect();

    let points: Vec<Vec<u8>> = ids
        .par_iter()
        .map(|&id| {
            let mut sketch = HllSketch::new(p);
            let mut it = store.color_set(id as usize);
            while !it.is_end() {
                sketch.add(it.value() as u64);
                it.next();
            }
            sketch.registers().to_vec()
        })
        .collect();

    let path = path.as_ref();
    let mut out = BufWriter::new(
        File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
    );
    out.write_all(&(1u64 << p).to_le_bytes())?;
    out.write_all(&(ids.len() as u64).to_le_bytes())?;
    for &id in &ids {
        out.write_all(&id.to_le_bytes())?;
    }
    for registers in &points {
        out.write_all(registers)?;
    }
    out.flush().context("cannot flush sketch file")?;
    Ok(ids.len() as u64)
}

pub fn load_color_set_sketches(path: impl AsRef<Path>) -> Result<(Vec<u64>, Vec<Vec<u8>>)> {
    let path = path.as_ref();
    let mut input = BufReader::new(
        File::open(path).with_context(|| format!("cannot open {}", path.display()))?,
    );
    let bytes_per_point = read_u64(&mut input)? as usize;
    let num_points = read_u64(&mut input)? as usize;
    let mut ids = Vec::with_capacity(num_points);
    for _ in 0..num_points {
        ids.push(read_u64(&mut input)?);
    }
    let mut points = Vec::with_capacity(num_points);
    for _ in 0..num_points {
        let mut registers = vec![0u8; bytes_per_point];
        input.read_exact(&mut registers).context("truncated sketch file")?;
        points.push(registers);
    }
    Ok((ids, points))
}

fn read_u64<R: Read>(input: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    input.read_exact(&mut buf).context("truncated sketch file")?;
    Ok(u64::from_le_bytes(buf))
}
