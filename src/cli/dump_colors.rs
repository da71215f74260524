/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use crate::index::Index;

#[derive(Parser, Debug, Clone)]
#[command(about = "Dumps the color sets of an index as text.", long_about = None)]
pub struct CliArgs {
    /// The index to dump.
    #[arg(short = 'i', long = "index")]
    pub index: PathBuf,
    /// Output file, one line per color set: `id size v_0 … v_{size-1}`.
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
}

pub fn main(args: CliArgs) -> Result<()> {
    let index = Index::load(&args.index)?;
    let mut out = BufWriter::new(
        File::create(&args.output)
            .with_context(|| format!("cannot create {}", args.output.display()))?,
    );
    index.dump_colors(&mut out)?;
    out.flush().context("cannot flush the output file")?;
    info!("colors dumped to {}", args.output.display());
    Ok(())
}
