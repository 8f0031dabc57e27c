//! Exact-duplicate removal after the merge pass.
//!
//! Unioning two overlapping cycles can legitimately introduce coincidental
//! repeats; both reducers are stable, keeping the first occurrence.

use std::collections::HashSet;

use crate::types::{Point, Record};

fn micro(value: f64) -> i64 {
    (value * 1_000_000.0).round() as i64
}

/// Dedupe points by name plus coordinates rounded to six decimals.
pub(crate) fn remove_duplicate_points(points: Vec<Point>) -> Vec<Point> {
    let mut seen: HashSet<(String, i64, i64)> = HashSet::new();
    points
        .into_iter()
        .filter(|p| seen.insert((p.name.clone(), micro(p.lat), micro(p.lon))))
        .collect()
}

/// Dedupe structured records by a content hash over all fields.
pub(crate) fn remove_duplicate_records<R: Record>(records: Vec<R>) -> Vec<R> {
    let mut seen: HashSet<[u8; 32]> = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.fingerprint()))
        .collect()
}
