/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The four encodings must answer every query identically, up to the
//! reference permutation applied by the meta builders; results are
//! compared by reference name.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use fulgor::build::{
    build_differential_index, build_index, build_meta_differential_index, build_meta_index,
    BuildConfig,
};
use fulgor::color_sets::{ColorSets, SetIterator};
use fulgor::dbg::kmer;
use fulgor::index::Index;

const K: usize = 7;

struct Fixture {
    dir: tempfile::TempDir,
    ref_paths: Vec<String>,
    ref_seqs: Vec<Vec<u8>>,
    hybrid_path: PathBuf,
}

fn make_fixture() -> Result<Fixture> {
    let mut rng = SmallRng::seed_from_u64(0xF0190);
    let blocks: Vec<Vec<u8>> = (0..5)
        .map(|_| {
            (0..30)
                .map(|_| b"ACGT"[rng.random_range(0..4)])
                .collect::<Vec<u8>>()
        })
        .collect();
    let layouts: [&[usize]; 6] = [
        &[0, 1],
        &[1, 2],
        &[2, 3],
        &[3, 4],
        &[0, 2, 4],
        &[1, 3],
    ];
    let dir = tempfile::tempdir()?;
    let mut ref_paths = Vec::new();
    let mut ref_seqs = Vec::new();
    for (i, layout) in layouts.iter().enumerate() {
        let seq: Vec<u8> = layout.iter().flat_map(|&b| blocks[b].clone()).collect();
        let path = dir.path().join(format!("r{i}.fna"));
        let mut f = File::create(&path)?;
        writeln!(f, ">r{i}")?;
        f.write_all(&seq)?;
        writeln!(f)?;
        ref_paths.push(path.display().to_string());
        ref_seqs.push(seq);
    }

    let config = build_config(dir.path());
    let mut hybrid = build_index(&config, &ref_paths)?;
    let hybrid_path = dir.path().join("index.fur");
    hybrid.save(&hybrid_path)?;

    Ok(Fixture {
        dir,
        ref_paths,
        ref_seqs,
        hybrid_path,
    })
}

fn build_config(tmp: &Path) -> BuildConfig {
    BuildConfig {
        k: K,
        m: 3,
        num_threads: 3,
        tmp_dir: tmp.to_path_buf(),
        check: true,
        ..Default::default()
    }
}

fn queries(fixture: &Fixture) -> Vec<Vec<u8>> {
    let mut queries: Vec<Vec<u8>> = Vec::new();
    for seq in &fixture.ref_seqs {
        queries.push(seq.clone());
        queries.push(seq[5..40.min(seq.len())].to_vec());
    }
    queries.push(b"GGGGGGGGGGGG".to_vec());
    queries.push(b"ACGTNNNACGTACGT".to_vec());
    queries.push(b"ACG".to_vec()); // shorter than k
    queries
}

/// Forward k-mer → color set, mirroring the forward-strand graph
/// construction; lookups fall back to the reverse complement.
fn kmer_color_map(ref_seqs: &[Vec<u8>]) -> HashMap<u64, Vec<u32>> {
    let mut map: HashMap<u64, Vec<u32>> = HashMap::new();
    for (ref_id, seq) in ref_seqs.iter().enumerate() {
        for window in seq.windows(K) {
            if let Some(code) = kmer::encode_kmer(window, K) {
                let colors = map.entry(code).or_default();
                if colors.last() != Some(&(ref_id as u32)) {
                    colors.push(ref_id as u32);
                }
            }
        }
    }
    map
}

fn positive_kmers<'a>(map: &'a HashMap<u64, Vec<u32>>, seq: &[u8]) -> Vec<&'a Vec<u32>> {
    if seq.len() < K {
        return Vec::new();
    }
    seq.windows(K)
        .filter_map(|w| kmer::encode_kmer(w, K))
        .filter_map(|code| {
            map.get(&code)
                .or_else(|| map.get(&kmer::revcomp(code, K)))
        })
        .collect()
}

fn brute_full_intersection(map: &HashMap<u64, Vec<u32>>, seq: &[u8], num_colors: u32) -> Vec<u32> {
    let hits = positive_kmers(map, seq);
    if hits.is_empty() {
        return Vec::new();
    }
    (0..num_colors)
        .filter(|c| hits.iter().all(|colors| colors.contains(c)))
        .collect()
}

fn brute_threshold_union(
    map: &HashMap<u64, Vec<u32>>,
    seq: &[u8],
    num_colors: u32,
    tau: f64,
) -> Vec<u32> {
    let hits = positive_kmers(map, seq);
    if hits.is_empty() {
        return Vec::new();
    }
    let min_score = (tau * hits.len() as f64).ceil() as u64;
    (0..num_colors)
        .filter(|c| {
            let score = hits.iter().filter(|colors| colors.contains(c)).count() as u64;
            score >= min_score
        })
        .collect()
}

fn names(index: &Index, ids: &[u32]) -> Vec<String> {
    let mut names: Vec<String> = ids.iter().map(|&id| index.filename(id).to_string()).collect();
    names.sort();
    names
}

fn names_by_id(ref_paths: &[String], ids: &[u32]) -> Vec<String> {
    let mut names: Vec<String> = ids.iter().map(|&id| ref_paths[id as usize].clone()).collect();
    names.sort();
    names
}

fn check_index_against_brute_force(index: &Index, fixture: &Fixture) {
    let map = kmer_color_map(&fixture.ref_seqs);
    let num_colors = fixture.ref_paths.len() as u32;
    for query in queries(fixture) {
        let expected = brute_full_intersection(&map, &query, num_colors);
        let got = index.pseudoalign_full_intersection(&query);
        assert!(got.windows(2).all(|w| w[0] < w[1]), "results must be sorted");
        assert_eq!(
            names(index, &got),
            names_by_id(&fixture.ref_paths, &expected),
            "full intersection mismatch"
        );
        for tau in [0.4, 1.0] {
            let expected = brute_threshold_union(&map, &query, num_colors, tau);
            let got = index.pseudoalign_threshold_union(&query, tau);
            assert_eq!(
                names(index, &got),
                names_by_id(&fixture.ref_paths, &expected),
                "threshold union mismatch at tau = {tau}"
            );
        }
    }
}

/// All color sets of a store, as a multiset of sorted vectors.
fn all_sets(index: &Index) -> Vec<Vec<u32>> {
    let mut sets: Vec<Vec<u32>> = (0..index.num_color_sets())
        .map(|id| index.color_set(id).collect_set())
        .collect();
    sets.sort();
    sets
}

#[test]
fn hybrid_matches_brute_force() -> Result<()> {
    let fixture = make_fixture()?;
    let index = Index::load(&fixture.hybrid_path)?;
    assert!(matches!(index.color_sets_store(), ColorSets::Hybrid(_)));
    check_index_against_brute_force(&index, &fixture);
    Ok(())
}

#[test]
fn differential_preserves_semantics() -> Result<()> {
    let fixture = make_fixture()?;
    let config = build_config(fixture.dir.path());
    let hybrid = Index::load(&fixture.hybrid_path)?;
    let hybrid_sets = all_sets(&hybrid);

    let mut diff = build_differential_index(&config, hybrid)?;
    assert!(matches!(diff.color_sets_store(), ColorSets::Differential(_)));
    assert_eq!(diff.extension(), "dfur");

    // same color sets, in a permuted order
    assert_eq!(all_sets(&diff), hybrid_sets);
    check_index_against_brute_force(&diff, &fixture);

    let path = fixture.dir.path().join("index.dfur");
    diff.save(&path)?;
    let reloaded = Index::load(&path)?;
    check_index_against_brute_force(&reloaded, &fixture);
    Ok(())
}

#[test]
fn meta_preserves_semantics() -> Result<()> {
    let fixture = make_fixture()?;
    let config = build_config(fixture.dir.path());
    let hybrid = Index::load(&fixture.hybrid_path)?;

    let mut meta = build_meta_index(&config, hybrid)?;
    assert!(matches!(meta.color_sets_store(), ColorSets::Meta(_)));
    assert_eq!(meta.extension(), "mfur");
    check_index_against_brute_force(&meta, &fixture);

    let path = fixture.dir.path().join("index.mfur");
    meta.save(&path)?;
    let reloaded = Index::load(&path)?;
    check_index_against_brute_force(&reloaded, &fixture);
    Ok(())
}

#[test]
fn meta_differential_preserves_semantics() -> Result<()> {
    let fixture = make_fixture()?;
    let config = build_config(fixture.dir.path());
    let hybrid = Index::load(&fixture.hybrid_path)?;

    let meta = build_meta_index(&config, hybrid)?;
    let mut meta_diff = build_meta_differential_index(&config, meta)?;
    assert!(matches!(
        meta_diff.color_sets_store(),
        ColorSets::MetaDifferential(_)
    ));
    assert_eq!(meta_diff.extension(), "mdfur");
    check_index_against_brute_force(&meta_diff, &fixture);

    let path = fixture.dir.path().join("index.mdfur");
    meta_diff.save(&path)?;
    let reloaded = Index::load(&path)?;
    check_index_against_brute_force(&reloaded, &fixture);
    Ok(())
}

#[test]
fn threshold_one_on_a_single_unitig_equals_full_intersection() -> Result<()> {
    let fixture = make_fixture()?;
    let index = Index::load(&fixture.hybrid_path)?;
    // a query fully inside one unitig touches a single color set, so
    // threshold union at τ = 1.0 equals the full intersection
    let dict = index.k2u_dict();
    let seq = dict.unitig_seq(0);
    let full = index.pseudoalign_full_intersection(&seq);
    let union = index.pseudoalign_threshold_union(&seq, 1.0);
    assert!(!full.is_empty());
    assert_eq!(full, union);
    Ok(())
}

#[test]
fn transforms_keep_the_reference_set() -> Result<()> {
    let fixture = make_fixture()?;
    let config = build_config(fixture.dir.path());
    let hybrid = Index::load(&fixture.hybrid_path)?;
    let meta = build_meta_index(&config, hybrid)?;

    let original: HashSet<String> = fixture.ref_paths.iter().cloned().collect();
    let permuted: HashSet<String> = meta
        .filename_table()
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(original, permuted);
    Ok(())
}
