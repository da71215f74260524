/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![doc = include_str!("../README.md")]
#![deny(unstable_features)]
#![deny(trivial_casts)]
#![deny(unconditional_recursion)]
#![deny(clippy::empty_loop)]
#![deny(unreachable_code)]
#![deny(unreachable_patterns)]
#![deny(unused_macro_rules)]
#![deny(unused_doc_comments)]

pub mod bits;
pub mod build;
#[cfg(feature = "cli")]
pub mod cli;
pub mod color_sets;
pub mod dbg;
pub mod filenames;
pub mod index;
pub mod psa;
pub mod serialize;
pub mod sketch;

/// Longest supported k-mer length: a k-mer must fit a single 64-bit word.
pub const MAX_K: usize = 31;

/// Filename extensions tagging the color-set encoding of a serialized index.
pub mod extensions {
    pub const HYBRID: &str = "fur";
    pub const META: &str = "mfur";
    pub const DIFF: &str = "dfur";
    pub const META_DIFF: &str = "mdfur";
}

/// Prelude module to import everything from this crate
pub mod prelude {
    pub use crate::bits::*;
    pub use crate::build::*;
    pub use crate::color_sets::*;
    pub use crate::dbg::*;
    pub use crate::filenames::*;
    pub use crate::index::*;
    pub use crate::psa::*;
    pub use crate::serialize::*;
    pub use crate::sketch::*;
    pub use crate::MAX_K;
}
