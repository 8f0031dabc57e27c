//! One parse operation per tabular file kind.
//!
//! Each file carries a fixed header row; columns are located by name so
//! reordered or trailing extra columns do not break a release. A row with
//! an unparsable numeric field or an all-zero coordinate is dropped
//! without aborting the file, and a missing file parses as zero records.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::types::{Airport, Point, ProcedureLeg, RouteEntry};

pub(crate) const FIX_INPUT: &str = "FIX.csv";
pub(crate) const NAV_INPUT: &str = "NAV.csv";
pub(crate) const APT_INPUT: &str = "APT.csv";
pub(crate) const AWY_INPUT: &str = "AWY.csv";
pub(crate) const CDR_INPUT: &str = "CDR.csv";
pub(crate) const DP_INPUT: &str = "DP.csv";
pub(crate) const STAR_INPUT: &str = "STAR.csv";

fn open_csv(path: &Path) -> Option<csv::Reader<fs::File>> {
    match fs::File::open(path) {
        Ok(file) => Some(
            csv::ReaderBuilder::new()
                .flexible(true)
                .from_reader(file),
        ),
        Err(_) => {
            warn!("input file {} missing, treating as empty", path.display());
            None
        }
    }
}

/// Header lookup tolerant of a UTF-8 byte-order mark on the first cell.
fn column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
}

fn read_headers(rdr: &mut csv::Reader<fs::File>, path: &Path) -> Option<csv::StringRecord> {
    match rdr.headers() {
        Ok(headers) => Some(headers.clone()),
        Err(err) => {
            warn!("unreadable header in {}: {err}", path.display());
            None
        }
    }
}

pub(crate) fn parse_fixes(dir: &Path) -> Vec<Point> {
    parse_points(&dir.join(FIX_INPUT), "FIX_ID")
}

pub(crate) fn parse_navaids(dir: &Path) -> Vec<Point> {
    parse_points(&dir.join(NAV_INPUT), "NAV_ID")
}

fn parse_points(path: &Path, id_column: &str) -> Vec<Point> {
    let Some(mut rdr) = open_csv(path) else {
        return Vec::new();
    };
    let Some(headers) = read_headers(&mut rdr, path) else {
        return Vec::new();
    };
    let (Some(i_id), Some(i_lat), Some(i_lon)) = (
        column(&headers, id_column),
        column(&headers, "LAT_DECIMAL"),
        column(&headers, "LONG_DECIMAL"),
    ) else {
        warn!("{} is missing expected columns", path.display());
        return Vec::new();
    };

    let mut points = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.records() {
        let Ok(record) = result else {
            skipped += 1;
            continue;
        };
        let name = record.get(i_id).unwrap_or("").trim().to_string();
        let lat = record.get(i_lat).and_then(|s| s.trim().parse::<f64>().ok());
        let lon = record.get(i_lon).and_then(|s| s.trim().parse::<f64>().ok());
        let (Some(lat), Some(lon)) = (lat, lon) else {
            skipped += 1;
            continue;
        };
        if name.is_empty() || (lat == 0.0 && lon == 0.0) {
            skipped += 1;
            continue;
        }
        points.push(Point { name, lat, lon });
    }
    if skipped > 0 {
        debug!("{}: {skipped} rows skipped", path.display());
    }
    points
}

pub(crate) fn parse_airports(dir: &Path) -> Vec<Airport> {
    let path = dir.join(APT_INPUT);
    let Some(mut rdr) = open_csv(&path) else {
        return Vec::new();
    };
    let Some(headers) = read_headers(&mut rdr, &path) else {
        return Vec::new();
    };
    let wanted = [
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
    let mut idx = [0usize; 9];
    for (slot, name) in idx.iter_mut().zip(wanted) {
        match column(&headers, name) {
            Some(i) => *slot = i,
            None => {
                warn!("{} is missing column {name}", path.display());
                return Vec::new();
            }
        }
    }

    let mut airports = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.records() {
        let Ok(record) = result else {
            skipped += 1;
            continue;
        };
        let field = |i: usize| record.get(idx[i]).unwrap_or("").trim().to_string();
        let id = field(0);
        let lat = record.get(idx[3]).and_then(|s| s.trim().parse::<f64>().ok());
        let lon = record.get(idx[4]).and_then(|s| s.trim().parse::<f64>().ok());
        let elevation = record.get(idx[5]).and_then(|s| s.trim().parse::<f64>().ok());
        let (Some(lat), Some(lon), Some(elevation)) = (lat, lon, elevation) else {
            skipped += 1;
            continue;
        };
        if id.is_empty() || (lat == 0.0 && lon == 0.0) {
            skipped += 1;
            continue;
        }
        airports.push(Airport {
            id,
            icao: field(1),
            name: field(2),
            lat,
            lon,
            elevation,
            artcc: field(6),
            ownership: field(7),
            military: field(8),
        });
    }
    if skipped > 0 {
        debug!("{}: {skipped} rows skipped", path.display());
    }
    airports
}

/// Airway rows arrive one point per row. Group by airway id, order by
/// sequence number, and join into a single point string with consecutive
/// duplicates collapsed.
pub(crate) fn parse_airways(dir: &Path) -> Vec<RouteEntry> {
    let path = dir.join(AWY_INPUT);
    let Some(mut rdr) = open_csv(&path) else {
        return Vec::new();
    };
    let Some(headers) = read_headers(&mut rdr, &path) else {
        return Vec::new();
    };
    let (Some(i_id), Some(i_seq), Some(i_point)) = (
        column(&headers, "AWY_ID"),
        column(&headers, "POINT_SEQ"),
        column(&headers, "POINT"),
    ) else {
        warn!("{} is missing expected columns", path.display());
        return Vec::new();
    };

    let mut grouped: BTreeMap<String, Vec<(i64, String)>> = BTreeMap::new();
    let mut skipped = 0usize;
    for result in rdr.records() {
        let Ok(record) = result else {
            skipped += 1;
            continue;
        };
        let id = record.get(i_id).unwrap_or("").trim().to_string();
        let point = record.get(i_point).unwrap_or("").trim().to_string();
        let seq = record.get(i_seq).and_then(|s| s.trim().parse::<i64>().ok());
        let Some(seq) = seq else {
            skipped += 1;
            continue;
        };
        if id.is_empty() || point.is_empty() {
            skipped += 1;
            continue;
        }
        grouped.entry(id).or_default().push((seq, point));
    }
    if skipped > 0 {
        debug!("{}: {skipped} rows skipped", path.display());
    }

    grouped
        .into_iter()
        .map(|(id, mut rows)| {
            rows.sort_by_key(|(seq, _)| *seq);
            let route = collapse_consecutive(rows.into_iter().map(|(_, p)| p)).join(" ");
            RouteEntry { id, route }
        })
        .collect()
}

pub(crate) fn parse_cdrs(dir: &Path) -> Vec<RouteEntry> {
    let path = dir.join(CDR_INPUT);
    let Some(mut rdr) = open_csv(&path) else {
        return Vec::new();
    };
    let Some(headers) = read_headers(&mut rdr, &path) else {
        return Vec::new();
    };
    let (Some(i_code), Some(i_route)) = (
        column(&headers, "RCODE"),
        column(&headers, "ROUTE_STRING"),
    ) else {
        warn!("{} is missing expected columns", path.display());
        return Vec::new();
    };

    let mut seen = std::collections::HashSet::new();
    let mut cdrs = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.records() {
        let Ok(record) = result else {
            skipped += 1;
            continue;
        };
        let id = record.get(i_code).unwrap_or("").trim().to_string();
        let route = record.get(i_route).unwrap_or("").trim().to_string();
        if id.is_empty() || route.is_empty() || !seen.insert(id.clone()) {
            skipped += 1;
            continue;
        }
        cdrs.push(RouteEntry { id, route });
    }
    if skipped > 0 {
        debug!("{}: {skipped} rows skipped", path.display());
    }
    cdrs
}

/// Procedure rows arrive one point per row, keyed by computer code plus
/// transition computer code (empty for the shared body). Metadata fields
/// come from the first row of each group.
pub(crate) fn parse_procedures(dir: &Path, file: &str) -> Vec<ProcedureLeg> {
    let path = dir.join(file);
    let Some(mut rdr) = open_csv(&path) else {
        return Vec::new();
    };
    let Some(headers) = read_headers(&mut rdr, &path) else {
        return Vec::new();
    };
    let wanted = [
        "COMPUTER_CODE",
        "TRANSITION_COMPUTER_CODE",
        "PROCEDURE_NAME",
        "ARTCC",
        "POINT_SEQ",
        "POINT",
        "TRANSITION_NAME",
        "AIRPORT_RWY_GROUP",
    ];
    let mut idx = [0usize; 8];
    for (slot, name) in idx.iter_mut().zip(wanted) {
        match column(&headers, name) {
            Some(i) => *slot = i,
            None => {
                warn!("{} is missing column {name}", path.display());
                return Vec::new();
            }
        }
    }

    struct LegRows {
        leg: ProcedureLeg,
        rows: Vec<(i64, String)>,
    }

    let mut grouped: BTreeMap<(String, String), LegRows> = BTreeMap::new();
    let mut skipped = 0usize;
    for result in rdr.records() {
        let Ok(record) = result else {
            skipped += 1;
            continue;
        };
        let field = |i: usize| record.get(idx[i]).unwrap_or("").trim().to_string();
        let computer_code = field(0);
        let transition_code = field(1);
        let point = field(5);
        let seq = record.get(idx[4]).and_then(|s| s.trim().parse::<i64>().ok());
        let Some(seq) = seq else {
            skipped += 1;
            continue;
        };
        if computer_code.is_empty() || point.is_empty() {
            skipped += 1;
            continue;
        }
        grouped
            .entry((computer_code.clone(), transition_code.clone()))
            .or_insert_with(|| LegRows {
                leg: ProcedureLeg {
                    computer_code,
                    transition_code,
                    name: field(2),
                    artcc: field(3),
                    points: Vec::new(),
                    transition_name: field(6),
                    airport_rwy_group: field(7),
                },
                rows: Vec::new(),
            })
            .rows
            .push((seq, point));
    }
    if skipped > 0 {
        debug!("{}: {skipped} rows skipped", path.display());
    }

    grouped
        .into_values()
        .map(|mut group| {
            group.rows.sort_by_key(|(seq, _)| *seq);
            group.leg.points = collapse_consecutive(group.rows.into_iter().map(|(_, p)| p));
            group.leg
        })
        .collect()
}

/// Drop immediately repeated points while preserving order.
pub(crate) fn collapse_consecutive(points: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for point in points {
        if out.last().map(String::as_str) != Some(point.as_str()) {
            out.push(point);
        }
    }
    out
}
