use std::fs;

use tempfile::TempDir;

use passagedb_core::error::Error;
use passagedb_index::{l2_normalize, snapshot, VectorIndex};

fn one_hot(dim: usize, axis: usize) -> Vec<f32> {
    let mut v = vec![0.0; dim];
    v[axis] = 1.0;
    v
}

#[test]
fn search_orders_by_score_then_chunk_id() {
    let mut index = VectorIndex::new(3).expect("index");
    index.add("c_low".to_string(), &[0.1, 0.0, 0.0]).expect("add");
    index.add("c_high".to_string(), &[0.9, 0.0, 0.0]).expect("add");
    index.add("c_mid".to_string(), &[0.5, 0.0, 0.0]).expect("add");

    let hits = index.search(&[1.0, 0.0, 0.0], 10).expect("search");
    let ids: Vec<&str> = hits.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["c_high", "c_mid", "c_low"]);
    assert!(hits[0].1 > hits[1].1 && hits[1].1 > hits[2].1);
}

#[test]
fn equal_scores_tie_break_ascending_id() {
    let mut index = VectorIndex::new(2).expect("index");
    index.add("b".to_string(), &[1.0, 0.0]).expect("add");
    index.add("a".to_string(), &[1.0, 0.0]).expect("add");
    index.add("c".to_string(), &[1.0, 0.0]).expect("add");

    let hits = index.search(&[1.0, 0.0], 3).expect("search");
    let ids: Vec<&str> = hits.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[test]
fn top_n_truncates_and_empty_index_returns_nothing() {
    let mut index = VectorIndex::new(2).expect("index");
    for i in 0..5 {
        index.add(format!("c{i}"), &one_hot(2, i % 2)).expect("add");
    }
    assert_eq!(index.search(&[1.0, 0.0], 2).expect("search").len(), 2);

    let empty = VectorIndex::new(2).expect("index");
    assert!(empty.search(&[1.0, 0.0], 5).expect("search").is_empty());
}

#[test]
fn dimension_violations_fail_loudly() {
    let mut index = VectorIndex::new(4).expect("index");
    assert!(matches!(
        index.add("c0".to_string(), &[1.0, 2.0]),
        Err(Error::DimensionMismatch { expected: 4, got: 2 })
    ));

    index.add("c0".to_string(), &one_hot(4, 0)).expect("add");
    assert!(matches!(
        index.search(&[1.0, 0.0], 3),
        Err(Error::DimensionMismatch { expected: 4, got: 2 })
    ));

    // duplicate id breaks the id<->row bijection
    assert!(matches!(
        index.add("c0".to_string(), &one_hot(4, 1)),
        Err(Error::Integrity(_))
    ));
}

#[test]
fn snapshot_roundtrip() {
    let tmp = TempDir::new().expect("tempdir");
    let mut index = VectorIndex::new(3).expect("index");
    index.add("a".to_string(), &[0.1, 0.2, 0.3]).expect("add");
    index.add("b".to_string(), &[0.4, 0.5, 0.6]).expect("add");
    snapshot::save(&index, tmp.path()).expect("save");

    let loaded = snapshot::load_dir(tmp.path()).expect("load");
    assert_eq!(loaded.dim(), 3);
    assert_eq!(loaded.len(), 2);

    let hits = loaded.search(&[0.0, 0.0, 1.0], 2).expect("search");
    assert_eq!(hits[0].0, "b");
    assert!((hits[0].1 - 0.6).abs() < 1e-6);
}

#[test]
fn snapshot_load_validates_alignment() {
    let tmp = TempDir::new().expect("tempdir");
    let mut index = VectorIndex::new(3).expect("index");
    index.add("a".to_string(), &[0.1, 0.2, 0.3]).expect("add");
    index.add("b".to_string(), &[0.4, 0.5, 0.6]).expect("add");
    snapshot::save(&index, tmp.path()).expect("save");

    // truncating the matrix must not load as a smaller, wrong index
    let vectors = snapshot::vectors_path(tmp.path());
    let bytes = fs::read(&vectors).expect("read");
    fs::write(&vectors, &bytes[..bytes.len() - 4]).expect("write");
    assert!(matches!(snapshot::load_dir(tmp.path()), Err(Error::Integrity(_))));

    // and a missing artifact is fatal
    fs::remove_file(&vectors).expect("remove");
    assert!(matches!(snapshot::load_dir(tmp.path()), Err(Error::Integrity(_))));
}

#[test]
fn snapshot_load_rejects_duplicate_ids() {
    let tmp = TempDir::new().expect("tempdir");
    let ids = snapshot::ids_path(tmp.path());
    let vectors = snapshot::vectors_path(tmp.path());
    fs::write(&ids, r#"["a","a"]"#).expect("write ids");
    let mut bytes = Vec::new();
    for v in [1.0f32, 0.0, 0.0, 1.0] {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    fs::write(&vectors, &bytes).expect("write vectors");
    assert!(matches!(snapshot::load(&ids, &vectors), Err(Error::Integrity(_))));
}

#[test]
fn l2_normalize_scales_to_unit_norm() {
    let mut v = vec![3.0, 4.0];
    l2_normalize(&mut v);
    assert!((v[0] - 0.6).abs() < 1e-6);
    assert!((v[1] - 0.8).abs() < 1e-6);

    let mut zero = vec![0.0, 0.0];
    l2_normalize(&mut zero);
    assert_eq!(zero, vec![0.0, 0.0]);
}
