/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Colored compacted de Bruijn graph construction: collect the distinct
//! k-mers of the references with their color sets, compact maximal
//! non-branching same-color paths into unitigs, and stream the unitigs
//! grouped by color set.
//!
//! This is an in-memory baseline of the external unitig-builder
//! interface; it works on forward strands and is meant for collections
//! that fit in memory.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use log::info;

use super::fasta::FastaReader;
use super::kmer;

#[derive(Clone, Debug)]
struct Unitig {
    seq: Vec<u8>,
    color_set_id: u32,
}

#[derive(Clone, Debug)]
pub struct ColoredCompactedDbg {
    k: usize,
    num_colors: u32,
    filenames: Vec<String>,
    // distinct color sets in stream order; unitigs of one set are contiguous
    color_sets: Vec<Vec<u32>>,
    unitigs: Vec<Unitig>,
}

impl ColoredCompactedDbg {
    /// Build from the reference files listed in `filenames`, which also
    /// provide the reference names, in order.
    pub fn build<P: AsRef<Path>>(filenames: &[P], k: usize) -> Result<Self> {
        ensure!(!filenames.is_empty(), "no reference files given");
        ensure!(k >= 2 && k <= crate::MAX_K, "k must be in [2, {}]", crate::MAX_K);

        // k-mer -> sorted color set; reference files are processed in
        // increasing id order, so plain dedup keeps the sets sorted
        let mut kmer_colors: HashMap<u64, Vec<u32>> = HashMap::new();
        for (ref_id, path) in filenames.iter().enumerate() {
            for record in FastaReader::open(path)? {
                let record = record
                    .with_context(|| format!("while reading {}", path.as_ref().display()))?;
                if record.seq.len() < k {
                    continue;
                }
                for window in record.seq.windows(k) {
                    if let Some(code) = kmer::encode_kmer(window, k) {
                        let colors = kmer_colors.entry(code).or_default();
                        if colors.last() != Some(&(ref_id as u32)) {
                            colors.push(ref_id as u32);
                        }
                    }
                }
            }
        }
        ensure!(!kmer_colors.is_empty(), "no valid k-mer found in the references");
        info!("{} distinct k-mers over {} references", kmer_colors.len(), filenames.len());

        let dbg = Self::compact(k, kmer_colors, filenames.len() as u32)?;
        Ok(Self {
            filenames: filenames
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect(),
            ..dbg
        })
    }

    fn compact(
        k: usize,
        kmer_colors: HashMap<u64, Vec<u32>>,
        num_colors: u32,
    ) -> Result<Self> {
        let mut nodes: Vec<u64> = kmer_colors.keys().copied().collect();
        nodes.sort_unstable();
        let node_id: HashMap<u64, u32> = nodes
            .iter()
            .enumerate()
            .map(|(i, &code)| (code, i as u32))
            .collect();

        let successors = |code: u64| -> Vec<u64> {
            (0..4)
                .map(|b| kmer::roll(code, b, k))
                .filter(|succ| node_id.contains_key(succ))
                .collect()
        };
        let low_mask = (1u64 << (2 * (k - 1))) - 1;
        let predecessors = |code: u64| -> Vec<u64> {
            (0..4)
                .map(|b| b | (code & low_mask) << 2)
                .filter(|pred| node_id.contains_key(pred))
                .collect()
        };

        let colors_of = |code: u64| -> &Vec<u32> { &kmer_colors[&code] };
        let mut visited = vec![false; nodes.len()];
        let mut paths: Vec<Vec<u64>> = Vec::new();

        // paths start where the graph branches or the color set changes
        for &code in &nodes {
            let preds = predecessors(code);
            let is_start = match preds.as_slice() {
                [pred] => successors(*pred).len() != 1 || colors_of(*pred) != colors_of(code),
                _ => true,
            };
            if !is_start {
                continue;
            }
            let mut path = vec![code];
            visited[node_id[&code] as usize] = true;
            let mut curr = code;
            loop {
                let succs = successors(curr);
                let &[next] = succs.as_slice() else { break };
                if predecessors(next).len() != 1
                    || colors_of(next) != colors_of(curr)
                    || visited[node_id[&next] as usize]
                {
                    break;
                }
                visited[node_id[&next] as usize] = true;
                path.push(next);
                curr = next;
            }
            paths.push(path);
        }

        // what remains are color-constant non-branching cycles
        for &code in &nodes {
            if visited[node_id[&code] as usize] {
                continue;
            }
            let mut path = vec![code];
            visited[node_id[&code] as usize] = true;
            let mut curr = code;
            loop {
                let succs = successors(curr);
                let &[next] = succs.as_slice() else { break };
                if visited[node_id[&next] as usize] {
                    break;
                }
                visited[node_id[&next] as usize] = true;
                path.push(next);
                curr = next;
            }
            paths.push(path);
        }

        // group unitigs by color set
        let mut keyed: Vec<(Vec<u32>, Vec<u64>)> = paths
            .into_iter()
            .map(|path| (kmer_colors[&path[0]].clone(), path))
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));

        let mut color_sets: Vec<Vec<u32>> = Vec::new();
        let mut unitigs = Vec::with_capacity(keyed.len());
        for (colors, path) in keyed {
            if color_sets.last() != Some(&colors) {
                color_sets.push(colors);
            }
            let mut seq = kmer::to_string(path[0], k).into_bytes();
            for &code in &path[1..] {
                seq.push(kmer::decode_base(code >> (2 * (k - 1)) & 3));
            }
            unitigs.push(Unitig {
                seq,
                color_set_id: color_sets.len() as u32 - 1,
            });
        }
        info!("{} unitigs, {} distinct color sets", unitigs.len(), color_sets.len());

        Ok(Self {
            k,
            num_colors,
            filenames: Vec::new(),
            color_sets,
            unitigs,
        })
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    #[inline]
    pub fn num_colors(&self) -> u32 {
        self.num_colors
    }

    pub fn num_unitigs(&self) -> usize {
        self.unitigs.len()
    }

    pub fn filenames(&self) -> &[String] {
        &self.filenames
    }

    /// Stream the unitigs with their color sets; the last argument is
    /// true iff the color set is identical to that of the previous call.
    pub fn for_each_unitig<F: FnMut(&[u8], &[u32], bool)>(&self, mut f: F) {
        let mut prev_color_set_id = u32::MAX;
        for unitig in &self.unitigs {
            let same = unitig.color_set_id == prev_color_set_id;
            prev_color_set_id = unitig.color_set_id;
            f(&unitig.seq, &self.color_sets[unitig.color_set_id as usize], same);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_ref(dir: &tempfile::TempDir, name: &str, seq: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, ">{}", name).unwrap();
        writeln!(f, "{}", seq).unwrap();
        path
    }

    #[test]
    fn cycle_is_one_unitig() {
        let dir = tempfile::tempdir().unwrap();
        let r0 = write_ref(&dir, "r0.fna", "ACGTAC");
        let r1 = write_ref(&dir, "r1.fna", "CGTACG");
        let dbg = ColoredCompactedDbg::build(&[r0, r1], 3).unwrap();
        assert_eq!(dbg.num_unitigs(), 1);
        let mut seen = Vec::new();
        dbg.for_each_unitig(|seq, colors, same| {
            seen.push((seq.to_vec(), colors.to_vec(), same));
        });
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, vec![0, 1]);
        assert!(!seen[0].2);
        // all four k-mers of the cycle are on the unitig
        assert_eq!(seen[0].0.len(), 6);
    }

    #[test]
    fn color_change_breaks_unitigs() {
        let dir = tempfile::tempdir().unwrap();
        let r0 = write_ref(&dir, "r0.fna", "AAAT");
        let r1 = write_ref(&dir, "r1.fna", "AATT");
        let dbg = ColoredCompactedDbg::build(&[r0, r1], 3).unwrap();
        // AAA has color {0}, AAT {0,1}, ATT {1}: three unitigs
        assert_eq!(dbg.num_unitigs(), 3);
        let mut sets = Vec::new();
        dbg.for_each_unitig(|_, colors, _| sets.push(colors.to_vec()));
        sets.sort();
        assert_eq!(sets, vec![vec![0], vec![0, 1], vec![1]]);
    }
}
