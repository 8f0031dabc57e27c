//! navsync keeps an accumulated store of aeronautical reference data
//! (fixes, navaids, airports, airways, CDRs, DP/STAR procedures) in sync
//! with 28-day cycle snapshots. Superseded definitions are retained under
//! versioned names; an update never silently destroys prior data.

mod cli;
mod config;
mod cycle;
mod dedupe;
mod error;
mod fetch;
mod merge;
mod parse;
mod report;
mod store;
mod transform;
mod types;

use std::path::Path;

use chrono::Utc;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::config::UpdateOptions;
use crate::cycle::Cycle;
use crate::error::{Result, SyncError};
use crate::merge::ClassTally;
use crate::transform::{CyclePrecedence, RouteOrientation};
use crate::types::DataSet;

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "navsync=debug" } else { "navsync=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Cycle { date } => {
            init_logging(false);
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let current = Cycle::containing(date);
            let next = current.next();
            println!("cycle {} effective {}", current.identifier(), current.effective);
            println!("next  {} effective {}", next.identifier(), next.effective);
            Ok(())
        }

        Command::Update(args) => {
            init_logging(args.verbose);
            let options = UpdateOptions::from_args(args);
            run_update(&options)?;
            Ok(())
        }
    }
}

/// The whole pipeline: fetch, extract, parse, transform, union, merge,
/// dedupe, persist, report. Per-cycle failures are logged and skipped;
/// only losing every cycle aborts the run, before anything is written.
fn run_update(options: &UpdateOptions) -> Result<()> {
    let today = options.date.unwrap_or_else(|| Utc::now().date_naive());
    let current = Cycle::containing(today);
    let mut cycles = vec![current];
    if !options.current_only {
        cycles.push(current.next());
    }

    let mut processed: Vec<(Cycle, DataSet)> = Vec::new();
    for cyc in &cycles {
        match load_cycle(cyc, options) {
            Ok(data) => processed.push((*cyc, data)),
            Err(err) => warn!("skipping cycle {}: {err}", cyc.identifier()),
        }
    }
    if processed.is_empty() {
        return Err(SyncError::NoCyclesAvailable);
    }

    // The union collapses both snapshots before the single merge pass, so
    // supersessions are stamped with the newest cycle that contributed.
    let stamp_cycle = processed
        .last()
        .map(|(c, _)| c.identifier())
        .unwrap_or_default();
    let cycle_ids: Vec<String> = processed.iter().map(|(c, _)| c.identifier()).collect();
    let snapshots: Vec<DataSet> = processed.into_iter().map(|(_, d)| d).collect();
    let incoming = transform::union_snapshots(snapshots, CyclePrecedence::PreferLater);

    let existing = store::load_store(&options.data_dir)?;
    let (merged, tallies) = merge::merge_datasets(existing, incoming, &stamp_cycle);
    let merged = dedupe_dataset(merged);

    print_summary(&merged, &tallies);

    if options.dry_run {
        info!("dry run: backups, store writes, and reports skipped");
        return Ok(());
    }

    if !options.skip_backups {
        let stamp = Utc::now().format(store::BACKUP_STAMP_FMT).to_string();
        let saved = store::backup_store(&options.data_dir, &options.backup_dir, &stamp)?;
        let pruned = store::prune_backups(&options.backup_dir, options.keep_backups)?;
        info!("backup pass complete ({saved} saved, {pruned} pruned)");
    }

    store::write_store(&options.data_dir, &merged)?;
    info!("store updated in {}", options.data_dir.display());

    match report::write_reports(&options.report_dir, &cycle_ids, &tallies, Utc::now()) {
        Ok((text, json)) => {
            info!("change reports written: {} / {}", text.display(), json.display());
        }
        Err(err) => warn!("change report failed: {err}"),
    }
    Ok(())
}

fn load_cycle(cyc: &Cycle, options: &UpdateOptions) -> Result<DataSet> {
    let archive = fetch::fetch(cyc, &options.base_url, &options.cache_dir, options.force)?;
    let dir = fetch::extract(&archive)?;
    info!("cycle {} parsed from {}", cyc.identifier(), dir.display());
    Ok(build_snapshot(&dir))
}

fn build_snapshot(dir: &Path) -> DataSet {
    DataSet {
        fixes: parse::parse_fixes(dir),
        navaids: parse::parse_navaids(dir),
        airports: parse::parse_airports(dir),
        airways: transform::filter_airways(parse::parse_airways(dir)),
        cdrs: parse::parse_cdrs(dir),
        departures: transform::assemble_procedures(
            parse::parse_procedures(dir, parse::DP_INPUT),
            RouteOrientation::Departure,
        ),
        arrivals: transform::assemble_procedures(
            parse::parse_procedures(dir, parse::STAR_INPUT),
            RouteOrientation::Arrival,
        ),
    }
}

fn dedupe_dataset(mut data: DataSet) -> DataSet {
    data.fixes = dedupe::remove_duplicate_points(data.fixes);
    data.navaids = dedupe::remove_duplicate_points(data.navaids);
    data.airports = dedupe::remove_duplicate_records(data.airports);
    data.departures = dedupe::remove_duplicate_records(data.departures);
    data.arrivals = dedupe::remove_duplicate_records(data.arrivals);
    data
}

fn print_summary(data: &DataSet, tallies: &[(String, ClassTally)]) {
    let counts = [
        ("fixes", data.fixes.len()),
        ("navaids", data.navaids.len()),
        ("airports", data.airports.len()),
        ("airways", data.airways.len()),
        ("cdrs", data.cdrs.len()),
        ("departures", data.departures.len()),
        ("arrivals", data.arrivals.len()),
    ];
    for (name, len) in counts {
        match tallies.iter().find(|(n, _)| n.as_str() == name) {
            Some((_, t)) => println!(
                "{name}: {len} records ({} added, {} modified, {} renamed, {} preserved)",
                t.added, t.modified, t.renamed, t.preserved
            ),
            None => println!("{name}: {len} records"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;
    use std::io::{Cursor, Write};
    use std::path::PathBuf;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const RUN_DATE: &str = "2026-08-06";

    fn run_date() -> NaiveDate {
        RUN_DATE.parse().unwrap()
    }

    fn options(root: &Path) -> UpdateOptions {
        UpdateOptions {
            data_dir: root.join("data"),
            cache_dir: root.join("cache"),
            backup_dir: root.join("backups"),
            report_dir: root.join("reports"),
            // Unroutable: every test must be served from the cache.
            base_url: "http://127.0.0.1:1".to_string(),
            keep_backups: 2,
            force: false,
            skip_backups: false,
            current_only: false,
            dry_run: false,
            date: Some(run_date()),
        }
    }

    fn build_archive(path: &Path, files: &[(&str, &str)]) {
        let mut inner_buf = Cursor::new(Vec::new());
        let mut inner = ZipWriter::new(&mut inner_buf);
        for (name, contents) in files {
            inner.start_file(*name, SimpleFileOptions::default()).unwrap();
            inner.write_all(contents.as_bytes()).unwrap();
        }
        inner.finish().unwrap();
        let bytes = inner_buf.into_inner();

        let file = fs::File::create(path).unwrap();
        let mut outer = ZipWriter::new(file);
        outer
            .start_file("CSV_Data/cycle_CSV.zip", SimpleFileOptions::default())
            .unwrap();
        outer.write_all(&bytes).unwrap();
        outer.finish().unwrap();
    }

    fn seed_cache(cache_dir: &Path) -> (PathBuf, PathBuf) {
        fs::create_dir_all(cache_dir).unwrap();
        let current = Cycle::containing(run_date());
        let next = current.next();

        let current_path = cache_dir.join(fetch::archive_name(&current));
        build_archive(
            &current_path,
            &[
                (
                    "FIX.csv",
                    "FIX_ID,LAT_DECIMAL,LONG_DECIMAL\nBOSOX,42.3581,-71.0064\nWAVEY,10.000000,-20.000000\n",
                ),
                (
                    "AWY.csv",
                    "AWY_ID,POINT_SEQ,POINT\nV1,10,AAA\nV1,20,CANUS1\nV1,30,BBB\n",
                ),
                (
                    "DP.csv",
                    "COMPUTER_CODE,TRANSITION_COMPUTER_CODE,PROCEDURE_NAME,ARTCC,POINT_SEQ,POINT,TRANSITION_NAME,AIRPORT_RWY_GROUP\n\
                     GLAND5,,GLAND FIVE,ZAU,10,ORD,,ORD\n\
                     GLAND5,,GLAND FIVE,ZAU,20,GLAND,,ORD\n\
                     GLAND5,GLAND5.JOT,GLAND FIVE,ZAU,10,GLAND,JOLIET,ORD\n\
                     GLAND5,GLAND5.JOT,GLAND FIVE,ZAU,20,JOT,JOLIET,ORD\n",
                ),
            ],
        );

        let next_path = cache_dir.join(fetch::archive_name(&next));
        build_archive(
            &next_path,
            &[(
                "FIX.csv",
                "FIX_ID,LAT_DECIMAL,LONG_DECIMAL\nWAVEY,10.500000,-20.000000\nNEWFX,5.000000,6.000000\n",
            )],
        );
        (current_path, next_path)
    }

    #[test]
    fn test_run_update_end_to_end_from_cache() {
        let root = tempfile::tempdir().unwrap();
        let opts = options(root.path());
        seed_cache(&opts.cache_dir);

        run_update(&opts).unwrap();

        let fixes = store::read_points(&opts.data_dir.join(store::FIXES_FILE)).unwrap();
        let names: Vec<&str> = fixes.iter().map(|p| p.name.as_str()).collect();
        assert!(names.contains(&"BOSOX"));
        assert!(names.contains(&"NEWFX"));
        // The later cycle wins the union collision on WAVEY.
        let wavey = fixes.iter().find(|p| p.name == "WAVEY").unwrap();
        assert!((wavey.lat - 10.5).abs() < 1e-9);

        // Border placeholder stripped from the airway.
        let airways = store::read_map(&opts.data_dir.join(store::AIRWAYS_FILE)).unwrap();
        assert_eq!(airways[0].route, "AAA BBB");

        // One record per named transition, body points leading.
        let departures = store::read_procedures(&opts.data_dir.join(store::DP_FILE)).unwrap();
        assert_eq!(departures.len(), 1);
        assert_eq!(departures[0].route, "ORD GLAND JOT");

        // Change reports exist.
        let reports: Vec<_> = fs::read_dir(&opts.report_dir).unwrap().flatten().collect();
        assert_eq!(reports.len(), 2);
    }

    #[test]
    fn test_run_update_is_idempotent_across_runs() {
        let root = tempfile::tempdir().unwrap();
        let opts = options(root.path());
        seed_cache(&opts.cache_dir);

        run_update(&opts).unwrap();
        let first = fs::read_to_string(opts.data_dir.join(store::FIXES_FILE)).unwrap();
        run_update(&opts).unwrap();
        let second = fs::read_to_string(opts.data_dir.join(store::FIXES_FILE)).unwrap();
        assert_eq!(first, second);

        // The second run backed up the store written by the first.
        let backups: Vec<_> = fs::read_dir(&opts.backup_dir).unwrap().flatten().collect();
        assert!(!backups.is_empty());
    }

    #[test]
    fn test_run_update_dry_run_writes_nothing() {
        let root = tempfile::tempdir().unwrap();
        let mut opts = options(root.path());
        opts.dry_run = true;
        seed_cache(&opts.cache_dir);

        run_update(&opts).unwrap();
        assert!(!opts.data_dir.exists());
        assert!(!opts.backup_dir.exists());
        assert!(!opts.report_dir.exists());
    }

    #[test]
    fn test_run_update_without_any_cycle_aborts_before_writing() {
        let root = tempfile::tempdir().unwrap();
        let opts = options(root.path());
        // Empty cache and an unroutable base URL: both cycles fail.
        let err = run_update(&opts).unwrap_err();
        assert!(matches!(err, SyncError::NoCyclesAvailable));
        assert!(!opts.data_dir.exists());
    }

    #[test]
    fn test_run_update_survives_one_bad_cycle() {
        let root = tempfile::tempdir().unwrap();
        let opts = options(root.path());
        let (_, next_path) = seed_cache(&opts.cache_dir);
        // Corrupt the next cycle's archive; the run continues on the
        // current cycle alone.
        fs::write(&next_path, b"not a zip").unwrap();

        run_update(&opts).unwrap();
        let fixes = store::read_points(&opts.data_dir.join(store::FIXES_FILE)).unwrap();
        assert!(fixes.iter().any(|p| p.name == "BOSOX"));
        assert!(!fixes.iter().any(|p| p.name == "NEWFX"));
    }
}
