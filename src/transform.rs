//! Snapshot shaping between parse and merge: procedure assembly, the
//! airway border filter, and the cross-cycle union.

use std::collections::HashMap;

use tracing::warn;

use crate::types::{DataSet, ProcedureLeg, ProcedureRoute, Record, RouteEntry};

/// International-border placeholder points, optionally carrying a numeric
/// suffix (CANUS, CANUS1, MEXUS12, ...). They mark where an airway crosses
/// out of domestic airspace and have no place in output route strings.
pub(crate) const BORDER_TOKENS: &[&str] = &["CANUS", "MEXUS"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RouteOrientation {
    /// Airport first: body then transition.
    Departure,
    /// Airport last: transition then body.
    Arrival,
}

/// Which cycle's value survives a key collision when snapshots are
/// unioned before the merge pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CyclePrecedence {
    PreferLater,
    PreferEarlier,
}

fn is_border_token(token: &str) -> bool {
    let base = token.trim_end_matches(|c: char| c.is_ascii_digit());
    !base.is_empty() && BORDER_TOKENS.contains(&base)
}

/// Strip border placeholders from an airway's point string. Returns `None`
/// when fewer than two real points remain: a one-point airway routes
/// nothing and is dropped entirely.
pub(crate) fn border_filter(route: &str) -> Option<String> {
    let kept: Vec<&str> = route
        .split_whitespace()
        .filter(|token| !is_border_token(token))
        .collect();
    if kept.len() < 2 {
        None
    } else {
        Some(kept.join(" "))
    }
}

pub(crate) fn filter_airways(airways: Vec<RouteEntry>) -> Vec<RouteEntry> {
    airways
        .into_iter()
        .filter_map(|entry| {
            border_filter(&entry.route).map(|route| RouteEntry {
                id: entry.id,
                route,
            })
        })
        .collect()
}

/// Combine one procedure's shared body with each of its named transitions
/// into full ordered waypoint sequences. A procedure with no transitions
/// emits exactly one record built from the body alone.
pub(crate) fn format_route(
    body: &ProcedureLeg,
    transitions: &[ProcedureLeg],
    orientation: RouteOrientation,
) -> Vec<ProcedureRoute> {
    if transitions.is_empty() {
        return vec![assembled(body, body, body.points.clone())];
    }
    transitions
        .iter()
        .map(|transition| {
            let points = match orientation {
                RouteOrientation::Arrival => chain(&transition.points, &body.points),
                RouteOrientation::Departure => chain(&body.points, &transition.points),
            };
            assembled(body, transition, points)
        })
        .collect()
}

fn assembled(body: &ProcedureLeg, transition: &ProcedureLeg, points: Vec<String>) -> ProcedureRoute {
    ProcedureRoute {
        computer_code: body.computer_code.clone(),
        transition_computer_code: transition.transition_code.clone(),
        name: body.name.clone(),
        artcc: body.artcc.clone(),
        route: points.join(" "),
        transition_name: transition.transition_name.clone(),
        airport_rwy_group: body.airport_rwy_group.clone(),
    }
}

/// Concatenate two point sequences, collapsing a duplicated point at the
/// seam (a transition usually ends on the fix the body starts with).
fn chain(first: &[String], second: &[String]) -> Vec<String> {
    let mut points = first.to_vec();
    for point in second {
        if points.last() != Some(point) {
            points.push(point.clone());
        }
    }
    points
}

/// Group parsed legs by computer code and assemble each procedure. A group
/// without a body row cannot be assembled and is dropped with a warning.
pub(crate) fn assemble_procedures(
    legs: Vec<ProcedureLeg>,
    orientation: RouteOrientation,
) -> Vec<ProcedureRoute> {
    let mut grouped: std::collections::BTreeMap<String, (Option<ProcedureLeg>, Vec<ProcedureLeg>)> =
        std::collections::BTreeMap::new();
    for leg in legs {
        let slot = grouped.entry(leg.computer_code.clone()).or_default();
        if leg.transition_code.is_empty() {
            slot.0 = Some(leg);
        } else {
            slot.1.push(leg);
        }
    }

    let mut routes = Vec::new();
    for (code, (body, transitions)) in grouped {
        match body {
            Some(body) => routes.extend(format_route(&body, &transitions, orientation)),
            None => warn!("procedure {code} has transitions but no body, dropping"),
        }
    }
    routes
}

/// Fold per-cycle snapshots into the single incoming data set consumed by
/// the merge. Collision handling is governed by `precedence`; the update
/// pipeline passes `PreferLater`, so the newer cycle's value wins.
pub(crate) fn union_snapshots(snapshots: Vec<DataSet>, precedence: CyclePrecedence) -> DataSet {
    let mut union = DataSet::default();
    for snapshot in snapshots {
        union.fixes = union_keyed(union.fixes, snapshot.fixes, |p| p.name.clone(), precedence);
        union.navaids = union_keyed(union.navaids, snapshot.navaids, |p| p.name.clone(), precedence);
        union.airports = union_keyed(union.airports, snapshot.airports, |a| a.key(), precedence);
        union.airways = union_keyed(union.airways, snapshot.airways, |r| r.id.clone(), precedence);
        union.cdrs = union_keyed(union.cdrs, snapshot.cdrs, |r| r.id.clone(), precedence);
        union.departures = union_keyed(union.departures, snapshot.departures, |p| p.key(), precedence);
        union.arrivals = union_keyed(union.arrivals, snapshot.arrivals, |p| p.key(), precedence);
    }
    union
}

fn union_keyed<T>(
    mut acc: Vec<T>,
    incoming: Vec<T>,
    key: impl Fn(&T) -> String,
    precedence: CyclePrecedence,
) -> Vec<T> {
    let mut index: HashMap<String, usize> = HashMap::new();
    for (i, item) in acc.iter().enumerate() {
        index.entry(key(item)).or_insert(i);
    }
    for item in incoming {
        match index.get(&key(&item)).copied() {
            Some(slot) => {
                if precedence == CyclePrecedence::PreferLater {
                    acc[slot] = item;
                }
            }
            None => {
                index.insert(key(&item), acc.len());
                acc.push(item);
            }
        }
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point;

    fn leg(code: &str, transition: &str, points: &[&str]) -> ProcedureLeg {
        ProcedureLeg {
            computer_code: code.to_string(),
            transition_code: transition.to_string(),
            name: format!("{code} PROC"),
            artcc: "ZAU".to_string(),
            points: points.iter().map(|p| p.to_string()).collect(),
            transition_name: if transition.is_empty() {
                String::new()
            } else {
                format!("{transition} TRANS")
            },
            airport_rwy_group: "ORD".to_string(),
        }
    }

    #[test]
    fn test_border_filter_drops_all_border_airway() {
        assert_eq!(border_filter("CANUS CANUS1 CANUS22"), None);
        assert_eq!(border_filter("MEXUS3 AAA"), None);
    }

    #[test]
    fn test_border_filter_keeps_real_points_in_order() {
        assert_eq!(
            border_filter("AAA CANUS2 BBB MEXUS CCC").as_deref(),
            Some("AAA BBB CCC")
        );
    }

    #[test]
    fn test_border_filter_does_not_touch_lookalike_names() {
        // CANUSA is a real fix name shape, not a border token.
        assert_eq!(
            border_filter("CANUSA BBB").as_deref(),
            Some("CANUSA BBB")
        );
    }

    #[test]
    fn test_format_route_departure_appends_transition() {
        let body = leg("GLAND5", "", &["ORD", "GLAND"]);
        let transitions = vec![leg("GLAND5", "GLAND5.JOT", &["GLAND", "JOT"])];
        let routes = format_route(&body, &transitions, RouteOrientation::Departure);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].route, "ORD GLAND JOT");
        assert_eq!(routes[0].transition_computer_code, "GLAND5.JOT");
    }

    #[test]
    fn test_format_route_arrival_prepends_transition() {
        let body = leg("WYNDE8", "", &["WYNDE", "ORD"]);
        let transitions = vec![leg("WYNDE8", "WYNDE8.FWA", &["FWA", "WYNDE"])];
        let routes = format_route(&body, &transitions, RouteOrientation::Arrival);
        assert_eq!(routes[0].route, "FWA WYNDE ORD");
    }

    #[test]
    fn test_format_route_without_transitions_emits_body_alone() {
        let body = leg("ODESSA2", "", &["ODE", "SSA"]);
        let routes = format_route(&body, &[], RouteOrientation::Departure);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].route, "ODE SSA");
        assert_eq!(routes[0].transition_computer_code, "");
    }

    #[test]
    fn test_assemble_procedures_drops_bodyless_group() {
        let legs = vec![
            leg("GLAND5", "", &["ORD", "GLAND"]),
            leg("GLAND5", "GLAND5.JOT", &["GLAND", "JOT"]),
            leg("ORPHN1", "ORPHN1.XXX", &["AAA", "BBB"]),
        ];
        let routes = assemble_procedures(legs, RouteOrientation::Departure);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].computer_code, "GLAND5");
    }

    #[test]
    fn test_union_prefer_later_takes_newer_value() {
        let older = DataSet {
            fixes: vec![Point { name: "FOO".to_string(), lat: 1.0, lon: 2.0 }],
            ..DataSet::default()
        };
        let newer = DataSet {
            fixes: vec![
                Point { name: "FOO".to_string(), lat: 1.5, lon: 2.0 },
                Point { name: "BAR".to_string(), lat: 3.0, lon: 4.0 },
            ],
            ..DataSet::default()
        };
        let union = union_snapshots(vec![older, newer], CyclePrecedence::PreferLater);
        assert_eq!(union.fixes.len(), 2);
        assert!((union.fixes[0].lat - 1.5).abs() < 1e-9);
        assert_eq!(union.fixes[1].name, "BAR");
    }

    #[test]
    fn test_union_prefer_earlier_keeps_first_value() {
        let older = DataSet {
            fixes: vec![Point { name: "FOO".to_string(), lat: 1.0, lon: 2.0 }],
            ..DataSet::default()
        };
        let newer = DataSet {
            fixes: vec![Point { name: "FOO".to_string(), lat: 1.5, lon: 2.0 }],
            ..DataSet::default()
        };
        let union = union_snapshots(vec![older, newer], CyclePrecedence::PreferEarlier);
        assert_eq!(union.fixes.len(), 1);
        assert!((union.fixes[0].lat - 1.0).abs() < 1e-9);
    }
}
