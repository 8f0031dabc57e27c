//! Durable store layout, backups, and retention.
//!
//! Point collections persist one `NAME LAT LON` line per entry; keyed
//! route collections persist `KEY VALUE...` lines; airports and procedure
//! routes persist as header-bearing CSV. A missing file reads as an empty
//! collection so a first run starts from nothing.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{Result, SyncError};
use crate::types::{Airport, DataSet, Point, ProcedureRoute, RouteEntry};

pub(crate) const FIXES_FILE: &str = "fixes.txt";
pub(crate) const NAVAIDS_FILE: &str = "navaids.txt";
pub(crate) const AIRWAYS_FILE: &str = "airways.txt";
pub(crate) const CDRS_FILE: &str = "cdrs.txt";
pub(crate) const AIRPORTS_FILE: &str = "airports.csv";
pub(crate) const DP_FILE: &str = "dp_routes.csv";
pub(crate) const STAR_FILE: &str = "star_routes.csv";

pub(crate) const STORE_FILES: &[&str] = &[
    FIXES_FILE,
    NAVAIDS_FILE,
    AIRWAYS_FILE,
    CDRS_FILE,
    AIRPORTS_FILE,
    DP_FILE,
    STAR_FILE,
];

pub(crate) const BACKUP_STAMP_FMT: &str = "%Y%m%d_%H%M%S";

const AIRPORT_HEADER: [&str; 9] = [
    "ARPT_ID",
    "ICAO_ID",
    "ARPT_NAME",
    "LAT_DECIMAL",
    "LONG_DECIMAL",
    "ELEV",
    "RESP_ARTCC_ID",
    "OWNERSHIP_TYPE_CODE",
    "MIL_CODE",
];

const PROCEDURE_HEADER: [&str; 7] = [
    "COMPUTER_CODE",
    "TRANSITION_COMPUTER_CODE",
    "PROCEDURE_NAME",
    "ARTCC",
    "ROUTE_STRING",
    "TRANSITION_NAME",
    "AIRPORT_RWY_GROUP",
];

// ── Point files ─────────────────────────────────────────────────────────

pub(crate) fn read_points(path: &Path) -> Result<Vec<Point>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = fs::read_to_string(path).map_err(|e| SyncError::io(e, path))?;
    let mut points = Vec::new();
    let mut skipped = 0usize;
    for line in contents.lines() {
        let mut parts = line.split_whitespace();
        let (Some(name), Some(lat), Some(lon)) = (parts.next(), parts.next(), parts.next()) else {
            if !line.trim().is_empty() {
                skipped += 1;
            }
            continue;
        };
        let (Ok(lat), Ok(lon)) = (lat.parse::<f64>(), lon.parse::<f64>()) else {
            skipped += 1;
            continue;
        };
        points.push(Point {
            name: name.to_string(),
            lat,
            lon,
        });
    }
    if skipped > 0 {
        debug!("{}: {skipped} malformed lines ignored", path.display());
    }
    Ok(points)
}

pub(crate) fn write_points(path: &Path, points: &[Point]) -> Result<()> {
    let mut out = String::new();
    for p in points {
        let _ = writeln!(out, "{} {:.6} {:.6}", p.name, p.lat, p.lon);
    }
    fs::write(path, out).map_err(|e| SyncError::io(e, path))
}

// ── Keyed route files ───────────────────────────────────────────────────

pub(crate) fn read_map(path: &Path) -> Result<Vec<RouteEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = fs::read_to_string(path).map_err(|e| SyncError::io(e, path))?;
    let mut entries = Vec::new();
    for line in contents.lines() {
        let Some((id, route)) = line.trim_end().split_once(' ') else {
            continue;
        };
        if id.is_empty() || route.trim().is_empty() {
            continue;
        }
        entries.push(RouteEntry {
            id: id.to_string(),
            route: route.trim().to_string(),
        });
    }
    Ok(entries)
}

pub(crate) fn write_map(path: &Path, entries: &[RouteEntry]) -> Result<()> {
    let mut out = String::new();
    for e in entries {
        let _ = writeln!(out, "{} {}", e.id, e.route);
    }
    fs::write(path, out).map_err(|e| SyncError::io(e, path))
}

// ── Structured CSV files ────────────────────────────────────────────────

pub(crate) fn read_airports(path: &Path) -> Result<Vec<Airport>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut rdr = csv::Reader::from_path(path)
        .map_err(|e| SyncError::data(path, e.to_string()))?;
    let mut airports = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| SyncError::data(path, e.to_string()))?;
        let get = |i: usize| record.get(i).unwrap_or("").to_string();
        let parse = |i: usize| {
            record
                .get(i)
                .and_then(|s| s.parse::<f64>().ok())
                .ok_or_else(|| SyncError::data(path, format!("bad numeric field in {record:?}")))
        };
        airports.push(Airport {
            id: get(0),
            icao: get(1),
            name: get(2),
            lat: parse(3)?,
            lon: parse(4)?,
            elevation: parse(5)?,
            artcc: get(6),
            ownership: get(7),
            military: get(8),
        });
    }
    Ok(airports)
}

pub(crate) fn write_airports(path: &Path, airports: &[Airport]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|e| SyncError::data(path, e.to_string()))?;
    wtr.write_record(AIRPORT_HEADER)
        .map_err(|e| SyncError::data(path, e.to_string()))?;
    for a in airports {
        let row = [
            a.id.clone(),
            a.icao.clone(),
            a.name.clone(),
            format!("{:.6}", a.lat),
            format!("{:.6}", a.lon),
            format!("{:.1}", a.elevation),
            a.artcc.clone(),
            a.ownership.clone(),
            a.military.clone(),
        ];
        wtr.write_record(&row)
            .map_err(|e| SyncError::data(path, e.to_string()))?;
    }
    wtr.flush().map_err(|e| SyncError::io(e, path))
}

pub(crate) fn read_procedures(path: &Path) -> Result<Vec<ProcedureRoute>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut rdr = csv::Reader::from_path(path)
        .map_err(|e| SyncError::data(path, e.to_string()))?;
    let mut routes = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| SyncError::data(path, e.to_string()))?;
        let get = |i: usize| record.get(i).unwrap_or("").to_string();
        routes.push(ProcedureRoute {
            computer_code: get(0),
            transition_computer_code: get(1),
            name: get(2),
            artcc: get(3),
            route: get(4),
            transition_name: get(5),
            airport_rwy_group: get(6),
        });
    }
    Ok(routes)
}

pub(crate) fn write_procedures(path: &Path, routes: &[ProcedureRoute]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|e| SyncError::data(path, e.to_string()))?;
    wtr.write_record(PROCEDURE_HEADER)
        .map_err(|e| SyncError::data(path, e.to_string()))?;
    for r in routes {
        let row = [
            r.computer_code.as_str(),
            r.transition_computer_code.as_str(),
            r.name.as_str(),
            r.artcc.as_str(),
            r.route.as_str(),
            r.transition_name.as_str(),
            r.airport_rwy_group.as_str(),
        ];
        wtr.write_record(row)
            .map_err(|e| SyncError::data(path, e.to_string()))?;
    }
    wtr.flush().map_err(|e| SyncError::io(e, path))
}

// ── Whole store ─────────────────────────────────────────────────────────

pub(crate) fn load_store(data_dir: &Path) -> Result<DataSet> {
    Ok(DataSet {
        fixes: read_points(&data_dir.join(FIXES_FILE))?,
        navaids: read_points(&data_dir.join(NAVAIDS_FILE))?,
        airports: read_airports(&data_dir.join(AIRPORTS_FILE))?,
        airways: read_map(&data_dir.join(AIRWAYS_FILE))?,
        cdrs: read_map(&data_dir.join(CDRS_FILE))?,
        departures: read_procedures(&data_dir.join(DP_FILE))?,
        arrivals: read_procedures(&data_dir.join(STAR_FILE))?,
    })
}

pub(crate) fn write_store(data_dir: &Path, data: &DataSet) -> Result<()> {
    fs::create_dir_all(data_dir).map_err(|e| SyncError::io(e, data_dir))?;
    write_points(&data_dir.join(FIXES_FILE), &data.fixes)?;
    write_points(&data_dir.join(NAVAIDS_FILE), &data.navaids)?;
    write_airports(&data_dir.join(AIRPORTS_FILE), &data.airports)?;
    write_map(&data_dir.join(AIRWAYS_FILE), &data.airways)?;
    write_map(&data_dir.join(CDRS_FILE), &data.cdrs)?;
    write_procedures(&data_dir.join(DP_FILE), &data.departures)?;
    write_procedures(&data_dir.join(STAR_FILE), &data.arrivals)?;
    Ok(())
}

// ── Backups ─────────────────────────────────────────────────────────────

/// Copy every existing store file into the backup directory under a
/// timestamp suffix. Files that do not exist yet are skipped. Returns the
/// number of files backed up.
pub(crate) fn backup_store(data_dir: &Path, backup_dir: &Path, stamp: &str) -> Result<usize> {
    fs::create_dir_all(backup_dir).map_err(|e| SyncError::io(e, backup_dir))?;
    let mut saved = 0usize;
    for name in STORE_FILES {
        let source = data_dir.join(name);
        if !source.exists() {
            continue;
        }
        let target = backup_dir.join(format!("{name}.{stamp}"));
        fs::copy(&source, &target).map_err(|e| SyncError::io(e, &target))?;
        saved += 1;
    }
    if saved > 0 {
        info!("backed up {saved} store files to {}", backup_dir.display());
    }
    Ok(saved)
}

/// `true` for a 15-character `YYYYMMDD_HHMMSS` stamp.
fn is_backup_stamp(suffix: &str) -> bool {
    let bytes = suffix.as_bytes();
    bytes.len() == 15
        && bytes[8] == b'_'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 8 || b.is_ascii_digit())
}

/// Group backups by their stripped base name and delete everything beyond
/// the `keep` newest per group. Runs after the current run's backups are
/// taken, so the newest generation is never pruned. Returns the number of
/// files removed.
pub(crate) fn prune_backups(backup_dir: &Path, keep: usize) -> Result<usize> {
    if !backup_dir.is_dir() {
        return Ok(0);
    }
    let mut groups: HashMap<String, Vec<(String, PathBuf)>> = HashMap::new();
    for entry in WalkDir::new(backup_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .flatten()
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        let Some((base, stamp)) = name.rsplit_once('.') else {
            continue;
        };
        if !is_backup_stamp(stamp) {
            continue;
        }
        groups
            .entry(base.to_string())
            .or_default()
            .push((stamp.to_string(), entry.into_path()));
    }

    let mut removed = 0usize;
    for (base, mut generations) in groups {
        // Stamps sort lexicographically in time order.
        generations.sort_by(|a, b| b.0.cmp(&a.0));
        for (stamp, path) in generations.into_iter().skip(keep) {
            fs::remove_file(&path).map_err(|e| SyncError::io(e, &path))?;
            debug!("pruned backup {base}.{stamp}");
            removed += 1;
        }
    }
    Ok(removed)
}
