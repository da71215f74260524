/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use std::path::PathBuf;

use anyhow::{ensure, Result};
use clap::Parser;
use log::info;

use crate::build::{build_meta_differential_index, BuildConfig};
use crate::extensions;
use crate::index::Index;

#[derive(Parser, Debug, Clone)]
#[command(about = "Re-encodes a meta index under the meta-differential encoding.", long_about = None)]
pub struct CliArgs {
    /// The meta index to differentiate (.mfur).
    #[arg(short = 'i', long = "index")]
    pub index: PathBuf,
    /// Temporary directory used during construction.
    #[arg(short = 'd', long = "tmp-dir", default_value = ".")]
    pub tmp_dir: PathBuf,
    /// Number of threads.
    #[arg(short = 't', long = "threads", default_value_t = num_cpus::get())]
    pub num_threads: usize,
    /// Check correctness after construction.
    #[arg(long)]
    pub check: bool,
}

pub fn main(args: CliArgs) -> Result<()> {
    ensure!(
        args.index.extension().and_then(|e| e.to_str()) == Some(extensions::META),
        "the index to differentiate must have extension .{}; build one first with \"partition\"",
        extensions::META
    );
    let config = BuildConfig {
        num_threads: args.num_threads,
        tmp_dir: args.tmp_dir.clone(),
        check: args.check,
        ..Default::default()
    };

    info!("loading index {}", args.index.display());
    let index = Index::load(&args.index)?;
    let mut meta_diff = build_meta_differential_index(&config, index)?;
    let output = args.index.with_extension(extensions::META_DIFF);
    meta_diff.save(&output)?;
    info!("index saved to {}", output.display());
    Ok(())
}
