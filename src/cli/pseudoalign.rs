/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use log::info;

use crate::index::Index;
use crate::psa::map_sequences;

#[derive(Parser, Debug, Clone)]
#[command(about = "Maps the sequences of a FASTA file against an index.", long_about = None)]
pub struct CliArgs {
    /// The index to query.
    #[arg(short = 'i', long = "index")]
    pub index: PathBuf,
    /// Query sequences in FASTA format.
    #[arg(short = 'q', long = "query")]
    pub query: PathBuf,
    /// Output file; standard output if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Number of threads.
    #[arg(short = 't', long = "threads", default_value_t = num_cpus::get())]
    pub num_threads: usize,
    /// Threshold-union parameter in (0, 1]; full intersection if omitted.
    #[arg(short = 'r', long = "threshold")]
    pub threshold: Option<f64>,
    #[arg(long)]
    pub verbose: bool,
}

pub fn main(args: CliArgs) -> Result<()> {
    if let Some(tau) = args.threshold {
        ensure!(
            tau > 0.0 && tau <= 1.0,
            "the threshold must be in (0, 1], got {tau}"
        );
    }

    info!("loading index {}", args.index.display());
    let index = Index::load(&args.index)?;

    let (num_mapped, num_total) = match &args.output {
        Some(path) => {
            let mut out = BufWriter::new(
                File::create(path)
                    .with_context(|| format!("cannot create {}", path.display()))?,
            );
            let counts = map_sequences(&index, &args.query, args.threshold, args.num_threads, &mut out)?;
            out.flush().context("cannot flush the output file")?;
            counts
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            map_sequences(&index, &args.query, args.threshold, args.num_threads, &mut out)?
        }
    };
    info!("mapped {num_mapped} out of {num_total} sequences");
    Ok(())
}
