//! XDG-compliant path resolution for cspscope.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

/// Errors from path resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum PathError {
    #[error("cannot determine home directory")]
    #[diagnostic(
        code(cspscope::paths::no_home),
        help("Set the HOME (or USERPROFILE) environment variable or ensure a valid user profile exists.")
    )]
    NoHome,

    #[error("failed to create directory: {path}")]
    #[diagnostic(
        code(cspscope::paths::create_dir),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type PathResult<T> = std::result::Result<T, PathError>;

/// File name used when exporting to a directory.
pub const EXPORT_FILE_NAME: &str = "csp-export.json";

/// Global directories for cspscope.
#[derive(Debug, Clone)]
pub struct ProbePaths {
    /// `$XDG_CONFIG_HOME/cspscope/`
    pub config_dir: PathBuf,
    /// `$XDG_DATA_HOME/cspscope/`, default export location.
    pub data_dir: PathBuf,
}

impl ProbePaths {
    /// Resolve directories from environment variables with standard fallbacks.
    pub fn resolve() -> PathResult<Self> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map(PathBuf::from)
            .map_err(|_| PathError::NoHome)?;

        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".config"))
            .join("cspscope");

        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".local/share"))
            .join("cspscope");

        Ok(Self {
            config_dir,
            data_dir,
        })
    }

    /// Create the base directories. Idempotent.
    pub fn ensure_dirs(&self) -> PathResult<()> {
        for dir in [&self.config_dir, &self.data_dir] {
            std::fs::create_dir_all(dir).map_err(|e| PathError::CreateDir {
                path: dir.display().to_string(),
                source: e,
            })?;
        }
        Ok(())
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Default JSON export target.
    pub fn default_export_file(&self) -> PathBuf {
        self.data_dir.join(EXPORT_FILE_NAME)
    }

    /// Resolve where an export goes.
    ///
    /// An empty target means the default export file, and its directory is
    /// created. An existing directory gets [`EXPORT_FILE_NAME`] appended. Any
    /// other path is used as-is.
    pub fn export_target(&self, target: &Path) -> PathResult<PathBuf> {
        if target.as_os_str().is_empty() {
            self.ensure_dirs()?;
            Ok(self.default_export_file())
        } else if target.is_dir() {
            Ok(target.join(EXPORT_FILE_NAME))
        } else {
            Ok(target.to_path_buf())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolved_paths_are_namespaced() {
        let paths = ProbePaths::resolve().unwrap();
        assert!(paths.config_dir.ends_with("cspscope"));
        assert!(paths.data_dir.ends_with("cspscope"));
        assert!(paths.config_file().starts_with(&paths.config_dir));
    }

    #[test]
    fn ensure_dirs_is_idempotent() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths = ProbePaths {
            config_dir: tmp.path().join("cfg/cspscope"),
            data_dir: tmp.path().join("data/cspscope"),
        };
        paths.ensure_dirs().unwrap();
        paths.ensure_dirs().unwrap();
        assert!(paths.config_dir.is_dir());
        assert_eq!(
            paths.default_export_file(),
            tmp.path().join("data/cspscope/csp-export.json")
        );
    }

    #[test]
    fn default_export_target_creates_data_dir() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths = ProbePaths {
            config_dir: tmp.path().join("cfg/cspscope"),
            data_dir: tmp.path().join("data/cspscope"),
        };
        assert!(!paths.data_dir.exists());

        let file = paths.export_target(Path::new("")).unwrap();
        assert_eq!(file, paths.default_export_file());
        assert!(paths.data_dir.is_dir());
        std::fs::write(&file, "[]").unwrap();
    }

    #[test]
    fn export_target_into_directory_or_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths = ProbePaths {
            config_dir: tmp.path().join("cfg"),
            data_dir: tmp.path().join("data"),
        };
        assert_eq!(
            paths.export_target(tmp.path()).unwrap(),
            tmp.path().join(EXPORT_FILE_NAME)
        );
        let explicit = tmp.path().join("out.json");
        assert_eq!(paths.export_target(&explicit).unwrap(), explicit);
        assert!(!paths.data_dir.exists());
    }
}
