//! The persistent-store merge: three key shapes, one supersession policy.
//!
//! Nothing here deletes an entry. An entry absent from the incoming
//! snapshot is carried forward unchanged; an entry whose content genuinely
//! changed is retired under a versioned name before the replacement takes
//! the primary name. Downstream consumers therefore never lose a
//! definition they may still reference.

use std::collections::{HashMap, HashSet};

use crate::types::{DataSet, Point, Record, RouteEntry};

/// Coordinate drift below this is floating-point noise, not a relocation.
pub(crate) const COORD_TOLERANCE_DEG: f64 = 0.0001;

/// Change descriptions retained per entity class.
const MAX_CHANGE_NOTES: usize = 200;

// ── Tallies ─────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
pub(crate) struct ClassTally {
    pub(crate) added: usize,
    pub(crate) modified: usize,
    pub(crate) preserved: usize,
    pub(crate) renamed: usize,
    pub(crate) changes: Vec<String>,
}

impl ClassTally {
    fn note(&mut self, message: String) {
        if self.changes.len() < MAX_CHANGE_NOTES {
            self.changes.push(message);
        }
    }
}

// ── Supersession naming ─────────────────────────────────────────────────

/// Versioned form of `name` for an entry superseded by `cycle`. An empty
/// cycle produces the bare legacy marker.
pub(crate) fn versioned_name(name: &str, cycle: &str) -> String {
    if cycle.is_empty() {
        format!("{name}_old")
    } else {
        format!("{name}_old{cycle}")
    }
}

// ── Point merge ─────────────────────────────────────────────────────────

fn within_tolerance(a: &Point, b: &Point) -> bool {
    (a.lat - b.lat).abs() <= COORD_TOLERANCE_DEG && (a.lon - b.lon).abs() <= COORD_TOLERANCE_DEG
}

/// Merge incoming points into the existing collection.
///
/// New name: inserted. Known name within tolerance: existing entry kept
/// byte-for-byte. Known name beyond tolerance: the existing entry is
/// retired under its versioned name and the incoming point takes the
/// primary name.
pub(crate) fn merge_points(
    existing: Vec<Point>,
    incoming: Vec<Point>,
    cycle: &str,
    tally: &mut ClassTally,
) -> Vec<Point> {
    let mut merged = existing;
    let mut index: HashMap<String, usize> = HashMap::new();
    for (i, point) in merged.iter().enumerate() {
        index.entry(point.name.clone()).or_insert(i);
    }
    let prior_names: HashSet<String> = index.keys().cloned().collect();
    let mut touched: HashSet<String> = HashSet::new();

    for point in incoming {
        match index.get(&point.name).copied() {
            None => {
                tally.added += 1;
                tally.note(format!(
                    "added {} ({:.6}, {:.6})",
                    point.name, point.lat, point.lon
                ));
                index.insert(point.name.clone(), merged.len());
                merged.push(point);
            }
            Some(slot) => {
                touched.insert(point.name.clone());
                if within_tolerance(&merged[slot], &point) {
                    tally.preserved += 1;
                } else {
                    let prior = merged[slot].clone();
                    let retired_as = retire_point(&mut merged, &mut index, &prior, cycle);
                    tally.note(format!(
                        "{} moved ({:.6}, {:.6}) -> ({:.6}, {:.6}), prior kept as {}",
                        point.name, prior.lat, prior.lon, point.lat, point.lon, retired_as
                    ));
                    merged[slot] = point;
                    tally.modified += 1;
                    tally.renamed += 1;
                }
            }
        }
    }

    tally.preserved += prior_names.iter().filter(|n| !touched.contains(*n)).count();
    merged
}

/// Install `prior` under its versioned name, stacking markers until a free
/// name is found so no earlier generation is overwritten. If an identical
/// copy is already retained under a candidate name, nothing is inserted.
fn retire_point(
    merged: &mut Vec<Point>,
    index: &mut HashMap<String, usize>,
    prior: &Point,
    cycle: &str,
) -> String {
    let mut name = versioned_name(&prior.name, cycle);
    loop {
        match index.get(&name).copied() {
            None => break,
            Some(slot) if merged[slot].lat == prior.lat && merged[slot].lon == prior.lon => {
                return name;
            }
            Some(_) => name = versioned_name(&name, cycle),
        }
    }
    index.insert(name.clone(), merged.len());
    merged.push(Point {
        name: name.clone(),
        lat: prior.lat,
        lon: prior.lon,
    });
    name
}

// ── Map merge ───────────────────────────────────────────────────────────

/// Merge keyed route strings (airways, CDRs) under the same supersession
/// policy as points, with exact value equality in place of the coordinate
/// tolerance.
pub(crate) fn merge_map(
    existing: Vec<RouteEntry>,
    incoming: Vec<RouteEntry>,
    cycle: &str,
    tally: &mut ClassTally,
) -> Vec<RouteEntry> {
    let mut merged = existing;
    let mut index: HashMap<String, usize> = HashMap::new();
    for (i, entry) in merged.iter().enumerate() {
        index.entry(entry.id.clone()).or_insert(i);
    }
    let prior_ids: HashSet<String> = index.keys().cloned().collect();
    let mut touched: HashSet<String> = HashSet::new();

    for entry in incoming {
        match index.get(&entry.id).copied() {
            None => {
                tally.added += 1;
                tally.note(format!("added {}", entry.id));
                index.insert(entry.id.clone(), merged.len());
                merged.push(entry);
            }
            Some(slot) => {
                touched.insert(entry.id.clone());
                if merged[slot].route == entry.route {
                    tally.preserved += 1;
                } else {
                    let prior = merged[slot].clone();
                    let retired_as = retire_entry(&mut merged, &mut index, &prior, cycle);
                    tally.note(format!(
                        "{} rerouted, prior kept as {}",
                        entry.id, retired_as
                    ));
                    merged[slot] = entry;
                    tally.modified += 1;
                    tally.renamed += 1;
                }
            }
        }
    }

    tally.preserved += prior_ids.iter().filter(|n| !touched.contains(*n)).count();
    merged
}

fn retire_entry(
    merged: &mut Vec<RouteEntry>,
    index: &mut HashMap<String, usize>,
    prior: &RouteEntry,
    cycle: &str,
) -> String {
    let mut id = versioned_name(&prior.id, cycle);
    loop {
        match index.get(&id).copied() {
            None => break,
            Some(slot) if merged[slot].route == prior.route => return id,
            Some(_) => id = versioned_name(&id, cycle),
        }
    }
    index.insert(id.clone(), merged.len());
    merged.push(RouteEntry {
        id: id.clone(),
        route: prior.route.clone(),
    });
    id
}

// ── Structured-record merge ─────────────────────────────────────────────

/// Merge structured records (airports, procedure routes) by composite key.
/// A changed record is replaced in place with no versioned copy: these
/// keys already disambiguate variants, so the rename convention does not
/// apply here.
pub(crate) fn merge_records<R: Record>(
    existing: Vec<R>,
    incoming: Vec<R>,
    tally: &mut ClassTally,
) -> Vec<R> {
    let mut merged = existing;
    let mut index: HashMap<String, usize> = HashMap::new();
    for (i, record) in merged.iter().enumerate() {
        index.entry(record.key()).or_insert(i);
    }
    let prior_keys: HashSet<String> = index.keys().cloned().collect();
    let mut touched: HashSet<String> = HashSet::new();

    for record in incoming {
        let key = record.key();
        match index.get(&key).copied() {
            None => {
                tally.added += 1;
                tally.note(format!("added {key}"));
                index.insert(key, merged.len());
                merged.push(record);
            }
            Some(slot) => {
                touched.insert(key.clone());
                if merged[slot] == record {
                    tally.preserved += 1;
                } else {
                    merged[slot] = record;
                    tally.modified += 1;
                    tally.note(format!("updated {key} in place"));
                }
            }
        }
    }

    tally.preserved += prior_keys.iter().filter(|k| !touched.contains(*k)).count();
    merged
}

// ── Whole-store merge ───────────────────────────────────────────────────

/// Run every collection through its merge and collect per-class tallies in
/// a fixed reporting order.
pub(crate) fn merge_datasets(
    existing: DataSet,
    incoming: DataSet,
    cycle: &str,
) -> (DataSet, Vec<(String, ClassTally)>) {
    let mut out = DataSet::default();
    let mut tallies = Vec::new();

    let mut tally = ClassTally::default();
    out.fixes = merge_points(existing.fixes, incoming.fixes, cycle, &mut tally);
    tallies.push(("fixes".to_string(), tally));

    let mut tally = ClassTally::default();
    out.navaids = merge_points(existing.navaids, incoming.navaids, cycle, &mut tally);
    tallies.push(("navaids".to_string(), tally));

    let mut tally = ClassTally::default();
    out.airports = merge_records(existing.airports, incoming.airports, &mut tally);
    tallies.push(("airports".to_string(), tally));

    let mut tally = ClassTally::default();
    out.airways = merge_map(existing.airways, incoming.airways, cycle, &mut tally);
    tallies.push(("airways".to_string(), tally));

    let mut tally = ClassTally::default();
    out.cdrs = merge_map(existing.cdrs, incoming.cdrs, cycle, &mut tally);
    tallies.push(("cdrs".to_string(), tally));

    let mut tally = ClassTally::default();
    out.departures = merge_records(existing.departures, incoming.departures, &mut tally);
    tallies.push(("departures".to_string(), tally));

    let mut tally = ClassTally::default();
    out.arrivals = merge_records(existing.arrivals, incoming.arrivals, &mut tally);
    tallies.push(("arrivals".to_string(), tally));

    (out, tallies)
}
