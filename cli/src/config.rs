use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the database location.
pub const DB_ENV: &str = "MAKAN_DB";

pub struct Config {
    pub db_path: PathBuf,
}

impl Config {
    /// Resolve the database path: `--db` first, then `MAKAN_DB`, then the
    /// platform data directory.
    pub fn load(db_override: Option<&Path>) -> Result<Self> {
        let explicit = db_override
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(DB_ENV).map(PathBuf::from));

        let db_path = match explicit {
            Some(path) => path,
            None => {
                let proj_dirs = ProjectDirs::from("", "", "makan")
                    .context("Could not determine home directory")?;
                proj_dirs.data_dir().join("makan.db")
            }
        };

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create data directory: {}", parent.display())
            })?;
        }

        Ok(Config { db_path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins_and_parent_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("makan.db");
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.db_path, path);
        assert!(dir.path().join("nested").is_dir());
    }

    #[test]
    fn test_bare_file_name_is_accepted() {
        let config = Config::load(Some(Path::new("makan.db"))).unwrap();
        assert_eq!(config.db_path, PathBuf::from("makan.db"));
    }
}
