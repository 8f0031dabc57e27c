//! Pure 28-day cycle arithmetic.
//!
//! Published reference data is effective for fixed 28-day periods counted
//! from the 2020-01-02 epoch. Identifiers are four digits: a rolling
//! 2-digit year plus a 2-digit sequence in a repeating 13-cycles-per-year
//! scheme, so the epoch cycle is `2001`.

use chrono::{Duration, NaiveDate};

pub(crate) const CYCLE_LENGTH_DAYS: i64 = 28;
const CYCLES_PER_YEAR: i64 = 13;
const EPOCH_YEAR: i64 = 20;

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 2).expect("fixed epoch date")
}

/// One effective period of published reference data. Computed, never
/// stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cycle {
    pub(crate) effective: NaiveDate,
}

impl Cycle {
    /// The cycle whose effective period contains `date`.
    pub(crate) fn containing(date: NaiveDate) -> Self {
        let elapsed = (date - epoch()).num_days();
        let index = elapsed.div_euclid(CYCLE_LENGTH_DAYS);
        Self {
            effective: epoch() + Duration::days(index * CYCLE_LENGTH_DAYS),
        }
    }

    /// The cycle immediately following this one.
    pub(crate) fn next(&self) -> Self {
        Self {
            effective: self.effective + Duration::days(CYCLE_LENGTH_DAYS),
        }
    }

    /// Four-digit identifier, e.g. `2001` for the epoch cycle.
    pub(crate) fn identifier(&self) -> String {
        let index = (self.effective - epoch())
            .num_days()
            .div_euclid(CYCLE_LENGTH_DAYS);
        let year = (EPOCH_YEAR + index.div_euclid(CYCLES_PER_YEAR)).rem_euclid(100);
        let seq = index.rem_euclid(CYCLES_PER_YEAR) + 1;
        format!("{year:02}{seq:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_epoch_yields_reference_identifier() {
        let cycle = Cycle::containing(date(2020, 1, 2));
        assert_eq!(cycle.effective, date(2020, 1, 2));
        assert_eq!(cycle.identifier(), "2001");
    }

    #[test]
    fn test_mid_cycle_date_maps_to_cycle_start() {
        // The first cycle runs 2020-01-02 through 2020-01-29.
        assert_eq!(Cycle::containing(date(2020, 1, 15)).effective, date(2020, 1, 2));
        assert_eq!(Cycle::containing(date(2020, 1, 29)).effective, date(2020, 1, 2));
        assert_eq!(Cycle::containing(date(2020, 1, 30)).effective, date(2020, 1, 30));
    }

    #[test]
    fn test_identifier_sequence_rolls_into_next_year() {
        assert_eq!(Cycle::containing(date(2020, 1, 30)).identifier(), "2002");
        // Cycle index 12 is the 13th and last of the epoch year.
        assert_eq!(Cycle::containing(date(2020, 12, 3)).identifier(), "2013");
        // Index 13 wraps into the next identifier year.
        assert_eq!(Cycle::containing(date(2020, 12, 31)).identifier(), "2101");
    }

    #[test]
    fn test_next_cycle_starts_exactly_28_days_later() {
        let mut cycle = Cycle::containing(date(2023, 6, 1));
        for _ in 0..10 {
            let next = cycle.next();
            assert_eq!((next.effective - cycle.effective).num_days(), CYCLE_LENGTH_DAYS);
            cycle = next;
        }
    }

    #[test]
    fn test_identifiers_monotonic_with_increasing_dates() {
        let mut previous = Cycle::containing(date(2020, 1, 2)).identifier();
        let mut day = date(2020, 1, 2);
        while day < date(2025, 1, 1) {
            let id = Cycle::containing(day).identifier();
            assert!(id >= previous, "{id} < {previous} at {day}");
            previous = id;
            day = day + Duration::days(7);
        }
    }
}
