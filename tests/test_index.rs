/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use fulgor::build::{build_index, BuildConfig};
use fulgor::index::Index;

fn write_ref(dir: &std::path::Path, name: &str, seq: &str) -> PathBuf {
    let path = dir.join(name);
    let mut f = File::create(&path).unwrap();
    writeln!(f, ">{}", name).unwrap();
    writeln!(f, "{}", seq).unwrap();
    path
}

fn config(k: usize, m: usize, tmp: &std::path::Path) -> BuildConfig {
    BuildConfig {
        k,
        m,
        num_threads: 2,
        tmp_dir: tmp.to_path_buf(),
        check: true,
        ..Default::default()
    }
}

#[test]
fn one_cyclic_unitig_shared_by_both_references() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let paths = vec![
        write_ref(dir.path(), "r0.fna", "ACGTAC"),
        write_ref(dir.path(), "r1.fna", "CGTACG"),
    ];
    let ref_paths: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    let index = build_index(&config(3, 2, dir.path()), &ref_paths)?;

    assert_eq!(index.num_colors(), 2);
    assert_eq!(index.num_unitigs(), 1);
    assert_eq!(index.num_color_sets(), 1);
    assert_eq!(index.u2c_bits().num_ones(), 1);
    assert_eq!(index.u2c(0), 0);

    assert_eq!(index.pseudoalign_full_intersection(b"ACGTACG"), vec![0, 1]);
    assert_eq!(index.pseudoalign_threshold_union(b"ACGTACG", 1.0), vec![0, 1]);
    Ok(())
}

#[test]
fn shared_kmer_bridges_colors_only_through_scores() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let paths = vec![
        write_ref(dir.path(), "r0.fna", "AAAT"),
        write_ref(dir.path(), "r1.fna", "AATT"),
    ];
    let ref_paths: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    let index = build_index(&config(3, 2, dir.path()), &ref_paths)?;

    // AAA has color {0}, ATT {1}, and the shared AAT {0,1}
    assert_eq!(index.num_unitigs(), 3);
    assert_eq!(index.num_color_sets(), 3);

    // the query has k-mers {AAA, AAT, ATT}: the intersection is empty,
    // but at τ = 0.34 both references reach ⌈0.34 · 3⌉ = 2 votes
    assert!(index.pseudoalign_full_intersection(b"AAATT").is_empty());
    assert_eq!(index.pseudoalign_threshold_union(b"AAATT", 0.34), vec![0, 1]);
    Ok(())
}

#[test]
fn boundary_queries_are_empty() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let paths = vec![write_ref(dir.path(), "r0.fna", "ACGTACGT")];
    let ref_paths: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    let index = build_index(&config(4, 2, dir.path()), &ref_paths)?;

    // shorter than k
    assert!(index.pseudoalign_full_intersection(b"ACG").is_empty());
    assert!(index.pseudoalign_threshold_union(b"ACG", 0.5).is_empty());
    // no positive k-mer
    assert!(index.pseudoalign_full_intersection(b"NNNNNNNN").is_empty());
    assert!(index.pseudoalign_full_intersection(b"GGGGGGGG").is_empty());
    assert!(index.pseudoalign_threshold_union(b"GGGGGGGG", 0.5).is_empty());
    Ok(())
}

#[test]
fn u2c_invariants_and_kmer_roundtrip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let paths = vec![
        write_ref(dir.path(), "r0.fna", "ACGTACGTTTACGGA"),
        write_ref(dir.path(), "r1.fna", "ACGTACGTAACCGTA"),
        write_ref(dir.path(), "r2.fna", "TTACGGACCACGTAC"),
    ];
    let ref_paths: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    let index = build_index(&config(4, 2, dir.path()), &ref_paths)?;

    let num_unitigs = index.num_unitigs();
    let num_color_sets = index.num_color_sets();
    assert_eq!(index.u2c_bits().rank1(num_unitigs) as usize, num_color_sets);
    assert_eq!(
        index.u2c_bits().select1(num_color_sets as u64 - 1),
        num_unitigs - 1
    );

    let dict = index.k2u_dict();
    for unitig_id in 0..num_unitigs {
        let seq = dict.unitig_seq(unitig_id);
        for (pos, window) in seq.windows(index.k()).enumerate() {
            let hit = dict.lookup_advanced(window).expect("k-mer must be present");
            assert_eq!(hit.unitig_id as usize, unitig_id);
            assert_eq!(hit.kmer_id_in_unitig as usize, pos);
        }
    }
    Ok(())
}

#[test]
fn serialization_roundtrips_byte_identically() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let paths = vec![
        write_ref(dir.path(), "r0.fna", "ACGTACGTTTACGGA"),
        write_ref(dir.path(), "r1.fna", "ACGTACGTAACCGTA"),
    ];
    let ref_paths: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    let mut index = build_index(&config(4, 2, dir.path()), &ref_paths)?;

    let first = dir.path().join("index.fur");
    index.save(&first)?;
    let mut reloaded = Index::load(&first)?;
    let second = dir.path().join("again.fur");
    reloaded.save(&second)?;
    assert_eq!(std::fs::read(&first)?, std::fs::read(&second)?);

    // the reloaded index answers like the original
    assert_eq!(
        index.pseudoalign_full_intersection(b"ACGTACGT"),
        reloaded.pseudoalign_full_intersection(b"ACGTACGT")
    );

    // a wrong extension is rejected
    assert!(index.save(dir.path().join("index.mfur")).is_err());
    assert!(Index::load(dir.path().join("index.unknown")).is_err());
    Ok(())
}

#[test]
fn filename_table_roundtrip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::create_dir(dir.path().join("a"))?;
    let paths = vec![
        write_ref(dir.path(), "a/b.fna", "ACGTACGT"),
        write_ref(dir.path(), "c.fna", "CCGTACGG"),
    ];
    let ref_paths: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    let mut index = build_index(&config(4, 2, dir.path()), &ref_paths)?;

    let saved = dir.path().join("index.fur");
    index.save(&saved)?;
    let reloaded = Index::load(&saved)?;
    let names: Vec<String> = reloaded
        .filename_table()
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(names, ref_paths);
    assert_eq!(reloaded.filename(0), ref_paths[0]);
    Ok(())
}

#[test]
fn dump_colors_lists_every_set() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let paths = vec![
        write_ref(dir.path(), "r0.fna", "AAAT"),
        write_ref(dir.path(), "r1.fna", "AATT"),
    ];
    let ref_paths: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    let index = build_index(&config(3, 2, dir.path()), &ref_paths)?;

    let mut out = Vec::new();
    index.dump_colors(&mut out)?;
    let text = String::from_utf8(out)?;
    assert_eq!(text.lines().count(), index.num_color_sets());
    // ids are 0, 1, 2 for the color sets {0}, {0,1}, {1}, in some order
    let mut sets: Vec<Vec<u32>> = text
        .lines()
        .map(|line| {
            line.split_whitespace()
                .skip(2)
                .map(|v| v.parse().unwrap())
                .collect()
        })
        .collect();
    sets.sort();
    assert_eq!(sets, vec![vec![0], vec![0, 1], vec![1]]);
    Ok(())
}

#[test]
fn invalid_configurations_are_rejected() {
    let bad_k = BuildConfig {
        k: 33,
        ..Default::default()
    };
    assert!(bad_k.validate().is_err());
    let bad_m = BuildConfig {
        k: 15,
        m: 15,
        ..Default::default()
    };
    assert!(bad_m.validate().is_err());
    let tiny_m = BuildConfig {
        k: 15,
        m: 1,
        ..Default::default()
    };
    assert!(tiny_m.validate().is_err());
}
