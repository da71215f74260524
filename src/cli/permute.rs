/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

use crate::build::meta::permute_references;
use crate::build::BuildConfig;
use crate::color_sets::ColorSets;
use crate::extensions;
use crate::index::Index;

#[derive(Parser, Debug, Clone)]
#[command(about = "Permutes the reference names of an index by sketch similarity.", long_about = None)]
pub struct CliArgs {
    /// The hybrid index whose reference names are permuted (.fur).
    #[arg(short = 'i', long = "index")]
    pub index: PathBuf,
    /// Output file for the permuted names, one per line.
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    /// Temporary directory used during construction.
    #[arg(short = 'd', long = "tmp-dir", default_value = ".")]
    pub tmp_dir: PathBuf,
}

pub fn main(args: CliArgs) -> Result<()> {
    if args.index.extension().and_then(|e| e.to_str()) != Some(extensions::HYBRID) {
        bail!(
            "the index to permute must have extension .{}; build one first with \"build\"",
            extensions::HYBRID
        );
    }
    let config = BuildConfig {
        tmp_dir: args.tmp_dir.clone(),
        ..Default::default()
    };

    info!("loading index {}", args.index.display());
    let index = Index::load(&args.index)?;
    let ColorSets::Hybrid(store) = index.color_sets_store() else {
        bail!("the index is not hybrid-encoded")
    };
    let permuter = permute_references(&config, store, index.u2c_bits(), index.filename_table())?;

    let mut out = BufWriter::new(
        File::create(&args.output)
            .with_context(|| format!("cannot create {}", args.output.display()))?,
    );
    for name in &permuter.filenames {
        writeln!(out, "{}", name)?;
    }
    out.flush().context("cannot flush the output file")?;
    info!("permuted names saved to {}", args.output.display());
    Ok(())
}
