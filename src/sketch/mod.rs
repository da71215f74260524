/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Cardinality sketches and clustering used by the permutation
//! pipelines: HyperLogLog sketches with pairwise Jaccard estimation, and
//! divisive k-means over sketches.

pub mod hll;
pub mod kmeans;

pub use hll::HllSketch;
pub use kmeans::{kmeans_divisive, Clustering, ClusteringParams};
