/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Command-line interface of the `fulgor` binary.

use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod build;
pub mod differential;
pub mod dump_colors;
pub mod meta_differential;
pub mod partition;
pub mod permute;
pub mod print_filenames;
pub mod pseudoalign;
pub mod stats;

#[derive(Parser, Debug)]
#[command(
    name = "fulgor",
    about = "Tools to build and query a colored compacted de Bruijn graph index.",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build an index from a list of reference files.
    Build(build::CliArgs),
    /// Permute the reference names of an index by sketch similarity.
    Permute(permute::CliArgs),
    /// Re-encode a hybrid index under the meta encoding.
    Partition(partition::CliArgs),
    /// Re-encode a hybrid index under the differential encoding.
    Differential(differential::CliArgs),
    /// Re-encode a meta index under the meta-differential encoding.
    MetaDifferential(meta_differential::CliArgs),
    /// Map the sequences of a FASTA file against an index.
    Pseudoalign(pseudoalign::CliArgs),
    /// Print index statistics.
    Stats(stats::CliArgs),
    /// Print the reference names of an index, in order.
    PrintFilenames(print_filenames::CliArgs),
    /// Dump the color sets of an index as text.
    DumpColors(dump_colors::CliArgs),
}

pub fn main(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Build(args) => build::main(args),
        Commands::Permute(args) => permute::main(args),
        Commands::Partition(args) => partition::main(args),
        Commands::Differential(args) => differential::main(args),
        Commands::MetaDifferential(args) => meta_differential::main(args),
        Commands::Pseudoalign(args) => pseudoalign::main(args),
        Commands::Stats(args) => stats::main(args),
        Commands::PrintFilenames(args) => print_filenames::main(args),
        Commands::DumpColors(args) => dump_colors::main(args),
    }
}
