/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! De Bruijn graph collaborators: the k-mer codec, the k-mer → unitig
//! dictionary, the colored compacted dBG construction, and a minimal
//! FASTA reader. The dictionary and the graph construction implement the
//! interfaces the index consumes; external tools may replace them.

pub mod ccdbg;
pub mod dict;
pub mod fasta;
pub mod kmer;

pub use ccdbg::ColoredCompactedDbg;
pub use dict::{KmerDict, KmerLookup, Orientation, StreamingQuery};
pub use fasta::{FastaReader, FastaRecord};
