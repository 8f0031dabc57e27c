//! Snapshot retrieval: cached archive download plus nested-archive
//! extraction into a flat directory of tabular files.
//!
//! Both operations are idempotent per cycle. A cached archive short
//! circuits the download without touching the network, and an already
//! populated extraction directory is reused as-is.

use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::cycle::Cycle;
use crate::error::{Result, SyncError};

pub(crate) const DEFAULT_BASE_URL: &str = "https://nfdc.faa.gov/webContent/28DaySub";

/// Inner path that holds the nested tabular-data archive.
const NESTED_ARCHIVE_DIR: &str = "CSV_Data/";

const CONNECT_TIMEOUT_SECS: u64 = 30;
const READ_TIMEOUT_SECS: u64 = 600;
const DOWNLOAD_CHUNK: usize = 64 * 1024;
const PROGRESS_EVERY_BYTES: u64 = 8 * 1024 * 1024;

/// Canonical archive name for a cycle, derived from its effective date.
pub(crate) fn archive_name(cycle: &Cycle) -> String {
    format!(
        "28DaySubscription_Effective_{}.zip",
        cycle.effective.format("%Y-%m-%d")
    )
}

/// Download the cycle's archive into the cache, or return the cached copy.
pub(crate) fn fetch(cycle: &Cycle, base_url: &str, cache_dir: &Path, force: bool) -> Result<PathBuf> {
    fs::create_dir_all(cache_dir).map_err(|e| SyncError::io(e, cache_dir))?;
    let target = cache_dir.join(archive_name(cycle));
    if target.exists() && !force {
        info!("cycle {} archive already cached", cycle.identifier());
        return Ok(target);
    }

    let url = format!("{}/{}", base_url.trim_end_matches('/'), archive_name(cycle));
    info!("downloading cycle {} from {url}", cycle.identifier());
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout_read(Duration::from_secs(READ_TIMEOUT_SECS))
        .build();
    let response = match agent.get(&url).call() {
        Ok(resp) => resp,
        Err(ureq::Error::Status(code, _)) => {
            return Err(SyncError::FetchFailed {
                cycle: cycle.identifier(),
                reason: format!("HTTP {code}"),
            });
        }
        Err(err) => {
            return Err(SyncError::FetchFailed {
                cycle: cycle.identifier(),
                reason: err.to_string(),
            });
        }
    };

    let total = response
        .header("content-length")
        .and_then(|v| v.parse::<u64>().ok());
    let mut reader = response.into_reader();
    let mut file = fs::File::create(&target).map_err(|e| SyncError::io(e, &target))?;
    let mut buf = [0u8; DOWNLOAD_CHUNK];
    let mut written: u64 = 0;
    let mut last_logged: u64 = 0;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) => {
                drop(file);
                let _ = fs::remove_file(&target);
                return Err(SyncError::FetchFailed {
                    cycle: cycle.identifier(),
                    reason: format!("transfer interrupted: {err}"),
                });
            }
        };
        if let Err(err) = file.write_all(&buf[..n]) {
            drop(file);
            let _ = fs::remove_file(&target);
            return Err(SyncError::io(err, &target));
        }
        written += n as u64;
        if written - last_logged >= PROGRESS_EVERY_BYTES {
            match total {
                Some(total) => debug!(
                    "cycle {}: {} / {} MiB",
                    cycle.identifier(),
                    written / (1024 * 1024),
                    total / (1024 * 1024)
                ),
                None => debug!("cycle {}: {} MiB", cycle.identifier(), written / (1024 * 1024)),
            }
            last_logged = written;
        }
    }
    info!(
        "cycle {} downloaded ({} bytes)",
        cycle.identifier(),
        written
    );
    Ok(target)
}

fn extraction_failed(archive: &Path, reason: impl Into<String>) -> SyncError {
    SyncError::ExtractionFailed {
        archive: archive.to_path_buf(),
        reason: reason.into(),
    }
}

/// Unpack the nested tabular-data archive into a flat directory next to
/// the outer archive and return that directory.
pub(crate) fn extract(archive: &Path) -> Result<PathBuf> {
    let stem = archive
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("archive");
    let out_dir = archive.parent().unwrap_or(Path::new(".")).join(stem);
    let already_populated = out_dir.is_dir()
        && WalkDir::new(&out_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .flatten()
            .any(|e| e.file_type().is_file());
    if already_populated {
        info!("{} already extracted", out_dir.display());
        return Ok(out_dir);
    }

    let file = fs::File::open(archive).map_err(|e| SyncError::io(e, archive))?;
    let mut outer =
        zip::ZipArchive::new(file).map_err(|e| extraction_failed(archive, e.to_string()))?;

    let nested_name = outer
        .file_names()
        .find(|name| name.starts_with(NESTED_ARCHIVE_DIR) && name.ends_with(".zip"))
        .map(str::to_string)
        .ok_or_else(|| {
            extraction_failed(archive, format!("no nested archive under {NESTED_ARCHIVE_DIR}"))
        })?;

    let mut nested_bytes = Vec::new();
    outer
        .by_name(&nested_name)
        .map_err(|e| extraction_failed(archive, e.to_string()))?
        .read_to_end(&mut nested_bytes)
        .map_err(|e| extraction_failed(archive, e.to_string()))?;

    let mut inner = zip::ZipArchive::new(Cursor::new(nested_bytes))
        .map_err(|e| extraction_failed(archive, format!("{nested_name}: {e}")))?;

    fs::create_dir_all(&out_dir).map_err(|e| SyncError::io(e, &out_dir))?;
    let mut extracted = 0usize;
    for i in 0..inner.len() {
        let mut entry = inner
            .by_index(i)
            .map_err(|e| extraction_failed(archive, e.to_string()))?;
        if !entry.is_file() {
            continue;
        }
        // Flatten: keep only the base file name.
        let Some(base) = Path::new(entry.name())
            .file_name()
            .map(|n| n.to_os_string())
        else {
            continue;
        };
        let out_path = out_dir.join(base);
        let mut out = fs::File::create(&out_path).map_err(|e| SyncError::io(e, &out_path))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| SyncError::io(e, &out_path))?;
        extracted += 1;
    }
    info!("extracted {extracted} files into {}", out_dir.display());
    Ok(out_dir)
}
