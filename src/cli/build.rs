/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

use crate::build::{
    build_differential_index, build_index, build_meta_differential_index, build_meta_index,
    BuildConfig,
};
use crate::extensions;

#[derive(Parser, Debug, Clone)]
#[command(about = "Builds an index from a list of reference files.", long_about = None)]
pub struct CliArgs {
    /// File with one reference FASTA path per line, in color order.
    #[arg(short = 'l', long = "list")]
    pub filenames_list: PathBuf,
    /// Output basename; the encoding extension is appended.
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    /// k-mer length.
    #[arg(short, default_value_t = 31)]
    pub k: usize,
    /// Minimizer length of the k-mer dictionary.
    #[arg(short, default_value_t = 20)]
    pub m: usize,
    /// Temporary directory used during construction.
    #[arg(short = 'd', long = "tmp-dir", default_value = ".")]
    pub tmp_dir: PathBuf,
    /// RAM budget in GiB.
    #[arg(short = 'g', long = "ram", default_value_t = 8)]
    pub ram_limit_gib: usize,
    /// Number of threads.
    #[arg(short = 't', long = "threads", default_value_t = num_cpus::get())]
    pub num_threads: usize,
    #[arg(long)]
    pub verbose: bool,
    /// Check correctness after construction.
    #[arg(long)]
    pub check: bool,
    /// Overwrite a pre-existing output.
    #[arg(long)]
    pub force: bool,
    /// Build a meta index.
    #[arg(long)]
    pub meta: bool,
    /// Build a differential index.
    #[arg(long)]
    pub diff: bool,
}

pub fn main(args: CliArgs) -> Result<()> {
    let config = BuildConfig {
        k: args.k,
        m: args.m,
        num_threads: args.num_threads,
        ram_limit_gib: args.ram_limit_gib,
        tmp_dir: args.tmp_dir.clone(),
        verbose: args.verbose,
        check: args.check,
    };
    config.validate()?;

    let extension = match (args.meta, args.diff) {
        (false, false) => extensions::HYBRID,
        (true, false) => extensions::META,
        (false, true) => extensions::DIFF,
        (true, true) => extensions::META_DIFF,
    };
    let output = args.output.with_extension(extension);
    if output.exists() && !args.force {
        bail!(
            "output {} already exists; pass --force to overwrite it",
            output.display()
        );
    }

    let file = File::open(&args.filenames_list)
        .with_context(|| format!("could not open {}", args.filenames_list.display()))?;
    let ref_paths: Vec<String> = BufReader::new(file)
        .lines()
        .collect::<std::io::Result<Vec<_>>>()
        .context("could not read the filenames list")?
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .collect();

    let mut index = build_index(&config, &ref_paths)?;
    if args.meta {
        index = build_meta_index(&config, index)?;
    }
    if args.diff {
        index = if args.meta {
            build_meta_differential_index(&config, index)?
        } else {
            build_differential_index(&config, index)?
        };
    }

    index.save(&output)?;
    info!("index saved to {}", output.display());
    Ok(())
}
