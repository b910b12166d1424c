use clap::Parser;
use std::path::PathBuf;

/// Lays out a storage snapshot and prints the resolved bubbles as JSON.
#[derive(Debug, Parser)]
#[command(name = "lifemap_cli", version, about = "Resolve a life map layout")]
pub struct CliArgs {
    /// Storage snapshot (JSON) to hydrate
    #[arg(value_name = "SNAPSHOT")]
    pub snapshot: PathBuf,

    /// Override cache database; overrides are neither restored nor saved without it
    #[arg(long, value_name = "PATH", env = "LIFEMAP_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Absolute directory for rolling log files; logging stays off without it
    #[arg(long, value_name = "PATH", env = "LIFEMAP_LOG_DIR")]
    pub log_dir: Option<String>,

    /// Log level (trace|debug|info|warn|error); build default when unset
    #[arg(long, env = "LIFEMAP_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Owner scope for persisted overrides
    #[arg(long, env = "LIFEMAP_OWNER", default_value = "local")]
    pub owner: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_required() {
        assert!(CliArgs::try_parse_from(["lifemap_cli"]).is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let args = CliArgs::try_parse_from([
            "lifemap_cli",
            "snapshot.json",
            "--db-path",
            "/tmp/overrides.sqlite3",
            "--owner",
            "alice",
            "--log-level",
            "warn",
        ])
        .expect("flags should parse");
        assert_eq!(args.snapshot, PathBuf::from("snapshot.json"));
        assert_eq!(args.db_path, Some(PathBuf::from("/tmp/overrides.sqlite3")));
        assert_eq!(args.owner, "alice");
        assert_eq!(args.log_level.as_deref(), Some("warn"));
    }
}
