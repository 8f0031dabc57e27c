//! Typed records for each entity kind plus the data-set bundle carried
//! between pipeline stages.
//!
//! Parsing is the typing boundary: nothing downstream of `parse` touches
//! raw rows.

/// A named navigation point (fix or navaid).
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Point {
    pub(crate) name: String,
    pub(crate) lat: f64,
    pub(crate) lon: f64,
}

/// An airport record from APT.csv.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Airport {
    pub(crate) id: String,
    pub(crate) icao: String,
    pub(crate) name: String,
    pub(crate) lat: f64,
    pub(crate) lon: f64,
    pub(crate) elevation: f64,
    pub(crate) artcc: String,
    pub(crate) ownership: String,
    pub(crate) military: String,
}

/// A keyed route line: an airway's space-joined point sequence, or a coded
/// departure route's route string.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RouteEntry {
    pub(crate) id: String,
    pub(crate) route: String,
}

/// One parsed procedure segment: the shared body (empty transition code)
/// or one named transition.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ProcedureLeg {
    pub(crate) computer_code: String,
    pub(crate) transition_code: String,
    pub(crate) name: String,
    pub(crate) artcc: String,
    pub(crate) points: Vec<String>,
    pub(crate) transition_name: String,
    pub(crate) airport_rwy_group: String,
}

/// A fully assembled procedure route in the output schema.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ProcedureRoute {
    pub(crate) computer_code: String,
    pub(crate) transition_computer_code: String,
    pub(crate) name: String,
    pub(crate) artcc: String,
    pub(crate) route: String,
    pub(crate) transition_name: String,
    pub(crate) airport_rwy_group: String,
}

/// Structured records that merge by key and dedupe by a full-content
/// fingerprint.
pub(crate) trait Record: Clone + PartialEq {
    fn key(&self) -> String;
    fn fingerprint(&self) -> [u8; 32];
}

impl Record for Airport {
    fn key(&self) -> String {
        self.id.clone()
    }

    fn fingerprint(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        for field in [
            &self.id,
            &self.icao,
            &self.name,
            &self.artcc,
            &self.ownership,
            &self.military,
        ] {
            hasher.update(field.as_bytes());
            hasher.update(b"\x1f");
        }
        hasher.update(&self.lat.to_le_bytes());
        hasher.update(&self.lon.to_le_bytes());
        hasher.update(&self.elevation.to_le_bytes());
        *hasher.finalize().as_bytes()
    }
}

impl Record for ProcedureRoute {
    fn key(&self) -> String {
        format!("{}:{}", self.computer_code, self.transition_computer_code)
    }

    fn fingerprint(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        for field in [
            &self.computer_code,
            &self.transition_computer_code,
            &self.name,
            &self.artcc,
            &self.route,
            &self.transition_name,
            &self.airport_rwy_group,
        ] {
            hasher.update(field.as_bytes());
            hasher.update(b"\x1f");
        }
        *hasher.finalize().as_bytes()
    }
}

/// Every collection the pipeline carries. Used both for one parsed cycle
/// snapshot and for the persisted store.
#[derive(Debug, Clone, Default)]
pub(crate) struct DataSet {
    pub(crate) fixes: Vec<Point>,
    pub(crate) navaids: Vec<Point>,
    pub(crate) airports: Vec<Airport>,
    pub(crate) airways: Vec<RouteEntry>,
    pub(crate) cdrs: Vec<RouteEntry>,
    pub(crate) departures: Vec<ProcedureRoute>,
    pub(crate) arrivals: Vec<ProcedureRoute>,
}
