/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::index::Index;

#[derive(Parser, Debug, Clone)]
#[command(about = "Prints the reference names of an index, in order.", long_about = None)]
pub struct CliArgs {
    /// The index whose reference names are printed.
    #[arg(short = 'i', long = "index")]
    pub index: PathBuf,
}

pub fn main(args: CliArgs) -> Result<()> {
    let index = Index::load(&args.index)?;
    for name in index.filename_table().iter() {
        println!("{}", name);
    }
    Ok(())
}
