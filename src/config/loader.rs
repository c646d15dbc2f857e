//! Manifest discovery and loading.
//!
//! The project manifest lives at `.passflow/config.yml`. An optional
//! `.passflow/config.local.yml` is merged on top of it.

use crate::config::merger::merge_configs;
use crate::config::schema::PassflowConfig;
use crate::error::{PassflowError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory holding the manifest, relative to the project root.
pub const CONFIG_DIR: &str = ".passflow";

/// Manifest files of a project, in merge order.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Project manifest: .passflow/config.yml
    pub project: Option<PathBuf>,

    /// Local overrides: .passflow/config.local.yml
    pub project_local: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover manifest files for the given project root.
    pub fn discover(project_root: &Path) -> Self {
        let existing = |name: &str| {
            let path = project_root.join(CONFIG_DIR).join(name);
            path.exists().then_some(path)
        };

        Self {
            project: existing("config.yml"),
            project_local: existing("config.local.yml"),
        }
    }

    /// Where the project manifest is expected.
    pub fn expected(project_root: &Path) -> PathBuf {
        project_root.join(CONFIG_DIR).join("config.yml")
    }

    /// Returns all existing paths in merge order.
    pub fn all_existing(&self) -> Vec<&PathBuf> {
        self.project.iter().chain(self.project_local.iter()).collect()
    }

    /// Check if the project manifest exists.
    pub fn has_project_config(&self) -> bool {
        self.project.is_some()
    }
}

/// Find the project root by walking up from `start`.
///
/// The first directory containing `.passflow` wins, then the first
/// containing `.git`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut git_root = None;

    for dir in start.ancestors() {
        if dir.join(CONFIG_DIR).is_dir() {
            return Some(dir.to_path_buf());
        }
        if git_root.is_none() && dir.join(".git").exists() {
            git_root = Some(dir.to_path_buf());
        }
    }

    git_root
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PassflowError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            PassflowError::Io(e)
        }
    })
}

/// Load and parse a single manifest file.
///
/// # Errors
///
/// Returns `ConfigNotFound` if the file doesn't exist.
/// Returns `ConfigParseError` if the YAML is invalid.
pub fn load_config_file(path: &Path) -> Result<PassflowConfig> {
    parse_config(&read(path)?, path)
}

/// Parse YAML content into a [`PassflowConfig`].
///
/// `source_path` is only used for error reporting.
pub fn parse_config(content: &str, source_path: &Path) -> Result<PassflowConfig> {
    if content.trim().is_empty() {
        return Ok(PassflowConfig::default());
    }
    serde_yaml::from_str(content).map_err(|e| PassflowError::ConfigParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load a manifest file as a raw YAML value, for merging.
pub fn load_config_value(path: &Path) -> Result<serde_yaml::Value> {
    serde_yaml::from_str(&read(path)?).map_err(|e| PassflowError::ConfigParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load the project manifest with local overrides merged on top.
///
/// # Errors
///
/// Returns `ConfigNotFound` if no project manifest exists.
/// Returns `ConfigParseError` if any file is invalid.
pub fn load_merged_config(project_root: &Path) -> Result<PassflowConfig> {
    let paths = ConfigPaths::discover(project_root);

    if !paths.has_project_config() {
        return Err(PassflowError::ConfigNotFound {
            path: ConfigPaths::expected(project_root),
        });
    }

    let values = paths
        .all_existing()
        .into_iter()
        .map(|path| load_config_value(path))
        .collect::<Result<Vec<_>>>()?;

    serde_yaml::from_value(merge_configs(&values)).map_err(|e| {
        PassflowError::ConfigParseError {
            path: ConfigPaths::expected(project_root),
            message: format!("Failed to parse merged config: {}", e),
        }
    })
}

/// Load the manifest, honouring an explicit path.
///
/// An explicit path is loaded alone, without local overrides.
pub fn load_config(project_root: &Path, config_override: Option<&Path>) -> Result<PassflowConfig> {
    match config_override {
        Some(path) => load_config_file(path),
        None => load_merged_config(project_root),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::FailurePolicy;
    use tempfile::TempDir;

    fn project(config: &str) -> TempDir {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(CONFIG_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.yml"), config).unwrap();
        temp
    }

    #[test]
    fn discover_finds_project_and_local_files() {
        let temp = project("");
        fs::write(temp.path().join(CONFIG_DIR).join("config.local.yml"), "").unwrap();

        let paths = ConfigPaths::discover(temp.path());
        assert!(paths.has_project_config());
        assert!(paths.project_local.is_some());
        assert_eq!(paths.all_existing().len(), 2);
    }

    #[test]
    fn discover_returns_none_for_missing_files() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::discover(temp.path());
        assert!(!paths.has_project_config());
        assert!(paths.all_existing().is_empty());
    }

    #[test]
    fn find_project_root_prefers_passflow_dir_over_git() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::create_dir_all(temp.path().join(".git")).unwrap();
        fs::create_dir_all(temp.path().join("a").join(CONFIG_DIR)).unwrap();

        assert_eq!(
            find_project_root(&nested),
            Some(temp.path().join("a"))
        );
    }

    #[test]
    fn find_project_root_falls_back_to_git() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("src");
        fs::create_dir_all(&nested).unwrap();
        fs::create_dir_all(temp.path().join(".git")).unwrap();

        assert_eq!(find_project_root(&nested), Some(temp.path().to_path_buf()));
    }

    #[test]
    fn load_config_file_returns_not_found_error() {
        let result = load_config_file(Path::new("/nonexistent/config.yml"));
        assert!(matches!(result, Err(PassflowError::ConfigNotFound { .. })));
    }

    #[test]
    fn parse_config_returns_parse_error_for_invalid_yaml() {
        let result = parse_config("units: [", Path::new("test.yml"));
        assert!(matches!(result, Err(PassflowError::ConfigParseError { .. })));
    }

    #[test]
    fn empty_file_is_an_empty_manifest() {
        let config = parse_config("", Path::new("config.yml")).unwrap();
        assert!(config.units.is_empty());
    }

    #[test]
    fn load_merged_config_requires_project_file() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            load_merged_config(temp.path()),
            Err(PassflowError::ConfigNotFound { .. })
        ));
    }

    #[test]
    fn local_overrides_win() {
        let temp = project("settings:\n  failure_policy: abort\nunits:\n  - id: a\n");
        fs::write(
            temp.path().join(CONFIG_DIR).join("config.local.yml"),
            "settings:\n  failure_policy: continue\n",
        )
        .unwrap();

        let config = load_merged_config(temp.path()).unwrap();
        assert_eq!(
            config.settings.failure_policy,
            FailurePolicy::ContinueOnError
        );
        assert_eq!(config.units.len(), 1);
    }

    #[test]
    fn empty_local_file_changes_nothing() {
        let temp = project("subject: scene\n");
        fs::write(temp.path().join(CONFIG_DIR).join("config.local.yml"), "").unwrap();

        let config = load_merged_config(temp.path()).unwrap();
        assert_eq!(config.subject.as_deref(), Some("scene"));
    }

    #[test]
    fn explicit_path_skips_merging() {
        let temp = project("subject: project\n");
        let other = temp.path().join("other.yml");
        fs::write(&other, "subject: other\n").unwrap();

        let config = load_config(temp.path(), Some(&other)).unwrap();
        assert_eq!(config.subject.as_deref(), Some("other"));
    }
}
