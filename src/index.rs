/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The index: a k-mer dictionary, the unitig → color-set-id map, one
//! color-set store, and the reference names. Serialized as a single
//! binary blob whose filename extension tags the color-set encoding.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::bits::RankedBitVector;
use crate::color_sets::{ColorSetIter, ColorSets, SetIterator};
use crate::dbg::KmerDict;
use crate::extensions;
use crate::filenames::FilenameTable;
use crate::serialize::{Loader, Saver, Visit, Visitor};

pub struct Index {
    pub(crate) k2u: KmerDict,
    pub(crate) u2c: RankedBitVector,
    pub(crate) color_sets: ColorSets,
    pub(crate) filenames: FilenameTable,
}

impl Index {
    pub fn new(
        k2u: KmerDict,
        u2c: RankedBitVector,
        color_sets: ColorSets,
        filenames: FilenameTable,
    ) -> Self {
        Self {
            k2u,
            u2c,
            color_sets,
            filenames,
        }
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.k2u.k()
    }

    #[inline]
    pub fn num_colors(&self) -> u32 {
        self.color_sets.num_colors()
    }

    #[inline]
    pub fn num_unitigs(&self) -> usize {
        self.k2u.num_unitigs()
    }

    #[inline]
    pub fn num_color_sets(&self) -> usize {
        self.color_sets.num_color_sets()
    }

    /// Color-set id of a unitig.
    #[inline]
    pub fn u2c(&self, unitig_id: usize) -> usize {
        self.u2c.rank1(unitig_id) as usize
    }

    pub fn color_set(&self, color_set_id: usize) -> ColorSetIter<'_> {
        debug_assert!(color_set_id < self.num_color_sets());
        self.color_sets.color_set(color_set_id)
    }

    pub fn filename(&self, color: u32) -> &str {
        debug_assert!(color < self.num_colors());
        self.filenames.get(color as usize)
    }

    #[inline]
    pub fn k2u_dict(&self) -> &KmerDict {
        &self.k2u
    }

    #[inline]
    pub fn u2c_bits(&self) -> &RankedBitVector {
        &self.u2c
    }

    #[inline]
    pub fn color_sets_store(&self) -> &ColorSets {
        &self.color_sets
    }

    #[inline]
    pub fn filename_table(&self) -> &FilenameTable {
        &self.filenames
    }

    /// The extension this index must be serialized under.
    pub fn extension(&self) -> &'static str {
        match self.color_sets {
            ColorSets::Hybrid(_) => extensions::HYBRID,
            ColorSets::Meta(_) => extensions::META,
            ColorSets::Differential(_) => extensions::DIFF,
            ColorSets::MetaDifferential(_) => extensions::META_DIFF,
        }
    }

    /// Serialize to `path`, whose extension must match the encoding.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if ext != self.extension() {
            bail!(
                "a {} index must be saved with extension .{}, got {}",
                self.color_sets.encoding_name(),
                self.extension(),
                path.display()
            );
        }
        let file = File::create(path)
            .with_context(|| format!("could not create {}", path.display()))?;
        let mut saver = Saver::new(BufWriter::new(file));
        self.visit(&mut saver)?;
        saver.into_inner().flush().context("flush failed")?;
        Ok(())
    }

    /// Deserialize from `path`; the extension selects the encoding.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let color_sets = match ext {
            e if e == extensions::HYBRID => ColorSets::Hybrid(Default::default()),
            e if e == extensions::META => ColorSets::Meta(Default::default()),
            e if e == extensions::DIFF => ColorSets::Differential(Default::default()),
            e if e == extensions::META_DIFF => ColorSets::MetaDifferential(Default::default()),
            other => bail!(
                "unknown index extension {:?}; expected one of .{}, .{}, .{}, .{}",
                other,
                extensions::HYBRID,
                extensions::META,
                extensions::DIFF,
                extensions::META_DIFF
            ),
        };
        let file =
            File::open(path).with_context(|| format!("could not open {}", path.display()))?;
        let mut loader = Loader::new(BufReader::new(file));
        let mut index = Self {
            k2u: KmerDict::default(),
            u2c: RankedBitVector::default(),
            color_sets,
            filenames: FilenameTable::default(),
        };
        index
            .visit(&mut loader)
            .with_context(|| format!("while loading {}", path.display()))?;
        index.k2u.rebuild_map();
        Ok(index)
    }

    pub fn num_bytes(&self) -> usize {
        self.k2u.num_bytes()
            + self.u2c.num_bytes()
            + self.color_sets.num_bytes()
            + self.filenames.num_bytes()
    }

    pub fn print_stats(&self) {
        let total = self.num_bytes() as f64;
        println!("encoding: {}", self.color_sets.encoding_name());
        println!("k = {}", self.k());
        println!("m = {}", self.k2u.m());
        println!("num. colors = {}", self.num_colors());
        println!("num. unitigs = {}", self.num_unitigs());
        println!("num. color sets = {}", self.num_color_sets());
        println!("num. k-mers = {}", self.k2u.num_kmers());
        println!("total index size: {} bytes", self.num_bytes());
        let component = |name: &str, bytes: usize| {
            println!(
                "  {}: {} bytes ({:.2}%)",
                name,
                bytes,
                bytes as f64 / total * 100.0
            );
        };
        component("k2u", self.k2u.num_bytes());
        component("u2c", self.u2c.num_bytes());
        component("color sets", self.color_sets.num_bytes());
        component("filenames", self.filenames.num_bytes());
        if let ColorSets::Hybrid(cs) = &self.color_sets {
            let [sparse, bitmap, complement] = cs.layout_census();
            println!("  sparse sets = {sparse}, bitmap sets = {bitmap}, complement sets = {complement}");
        }
    }

    /// Write one line per color set: `id size v_0 … v_{size-1}`.
    pub fn dump_colors<W: Write>(&self, out: &mut W) -> Result<()> {
        for color_set_id in 0..self.num_color_sets() {
            let mut it = self.color_set(color_set_id);
            write!(out, "{} {}", color_set_id, it.size())?;
            while !it.is_end() {
                write!(out, " {}", it.value())?;
                it.next();
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

impl Visit for Index {
    fn visit<V: Visitor>(&mut self, visitor: &mut V) -> Result<()> {
        self.k2u.visit(visitor)?;
        self.u2c.visit(visitor)?;
        self.color_sets.visit(visitor)?;
        self.filenames.visit(visitor)
    }
}
