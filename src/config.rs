//! Runtime configuration for an update run: CLI flags first, then
//! environment, then built-in defaults.

use std::env;
use std::path::PathBuf;

use chrono::NaiveDate;

use crate::cli::UpdateArgs;
use crate::fetch::DEFAULT_BASE_URL;

pub(crate) const DEFAULT_DATA_DIR: &str = "navdata";

pub(crate) fn env_optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[derive(Debug, Clone)]
pub(crate) struct UpdateOptions {
    pub(crate) data_dir: PathBuf,
    pub(crate) cache_dir: PathBuf,
    pub(crate) backup_dir: PathBuf,
    pub(crate) report_dir: PathBuf,
    pub(crate) base_url: String,
    pub(crate) keep_backups: usize,
    pub(crate) force: bool,
    pub(crate) skip_backups: bool,
    pub(crate) current_only: bool,
    pub(crate) dry_run: bool,
    pub(crate) date: Option<NaiveDate>,
}

impl UpdateOptions {
    pub(crate) fn from_args(args: UpdateArgs) -> Self {
        let data_dir = args
            .data_dir
            .or_else(|| env_optional("NAVSYNC_DATA_DIR").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let cache_dir = args.cache_dir.unwrap_or_else(|| data_dir.join("cache"));
        let backup_dir = args.backup_dir.unwrap_or_else(|| data_dir.join("backups"));
        let report_dir = args.report_dir.unwrap_or_else(|| data_dir.join("reports"));
        let base_url = args
            .base_url
            .or_else(|| env_optional("NAVSYNC_BASE_URL"))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            data_dir,
            cache_dir,
            backup_dir,
            report_dir,
            base_url,
            keep_backups: args.keep,
            force: args.force,
            skip_backups: args.no_backup,
            current_only: args.current_only,
            dry_run: args.dry_run,
            date: args.date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> UpdateArgs {
        UpdateArgs {
            data_dir: None,
            cache_dir: None,
            backup_dir: None,
            report_dir: None,
            base_url: None,
            date: None,
            force: false,
            no_backup: false,
            current_only: false,
            keep: 2,
            dry_run: false,
            verbose: false,
        }
    }

    #[test]
    fn test_directories_nest_under_data_dir_by_default() {
        let mut a = args();
        a.data_dir = Some(PathBuf::from("/srv/nav"));
        let options = UpdateOptions::from_args(a);
        assert_eq!(options.cache_dir, PathBuf::from("/srv/nav/cache"));
        assert_eq!(options.backup_dir, PathBuf::from("/srv/nav/backups"));
        assert_eq!(options.report_dir, PathBuf::from("/srv/nav/reports"));
        assert_eq!(options.keep_backups, 2);
    }

    #[test]
    fn test_explicit_directories_override_nesting() {
        let mut a = args();
        a.data_dir = Some(PathBuf::from("/srv/nav"));
        a.cache_dir = Some(PathBuf::from("/var/cache/navsync"));
        let options = UpdateOptions::from_args(a);
        assert_eq!(options.cache_dir, PathBuf::from("/var/cache/navsync"));
        assert_eq!(options.backup_dir, PathBuf::from("/srv/nav/backups"));
    }
}
