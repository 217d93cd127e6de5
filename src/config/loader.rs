//! Configuration loading and discovery for `cuebuild.toml`
//!
//! The loader never consults environment variables; callers decide where to look.

use super::schema::{BuildOptions, CuebuildConfig};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "cuebuild.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse cuebuild.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// Find cuebuild.toml by walking up from a directory.
///
/// # Returns
/// - `Some(path)` for the nearest `cuebuild.toml` at or above `start`
/// - `None` if the filesystem root is reached without finding one
pub fn find_config_from(start: impl Into<PathBuf>) -> Option<PathBuf> {
    let mut current = start.into();

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.is_file() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a specific file path.
pub fn load_config(path: &Path) -> Result<CuebuildConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    config_from_str(&contents)
}

/// Parse and validate configuration from TOML text.
pub fn config_from_str(contents: &str) -> Result<CuebuildConfig, ConfigError> {
    let mut config: CuebuildConfig = toml::from_str(contents)?;
    config.normalize();

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(config)
}

/// Load build options for a source directory.
///
/// Uses the nearest `cuebuild.toml` at or above `src`; defaults apply when there is none.
///
/// # Example
/// ```ignore
/// let options = load_options_for(Path::new("plans/web"))?;
/// let compiler = Compiler::new(NativeEngine::new()).with_options(options);
/// ```
pub fn load_options_for(src: &Path) -> Result<BuildOptions, ConfigError> {
    match find_config_from(src) {
        Some(path) => Ok(load_config(&path)?.build),
        None => Ok(BuildOptions::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CollisionPolicy;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&config_path, "[build]\n").unwrap();

        let subdir = temp.path().join("plans").join("web");
        fs::create_dir_all(&subdir).unwrap();

        assert_eq!(find_config_from(&subdir), Some(config_path));
    }

    #[test]
    fn test_find_config_ignores_directories_with_config_name() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a");
        fs::create_dir_all(nested.join(CONFIG_FILE_NAME)).unwrap();
        let found = find_config_from(&nested);
        assert_ne!(found, Some(nested.join(CONFIG_FILE_NAME)));
    }

    #[test]
    fn test_config_from_str_full() {
        let config = config_from_str(
            r#"
            [build]
            extension = ".json"
            collisions = "reject"
            parallel-overlays = true
            "#,
        )
        .unwrap();
        assert_eq!(config.build.extension, "json");
        assert_eq!(config.build.collisions, CollisionPolicy::Reject);
        assert!(config.build.parallel_overlays);
    }

    #[test]
    fn test_config_from_str_empty_uses_defaults() {
        let config = config_from_str("").unwrap();
        assert_eq!(config.build, BuildOptions::default());
    }

    #[test]
    fn test_config_parse_error() {
        let err = config_from_str("[build\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_config_validation_error() {
        let err = config_from_str("[build]\nextension = \"\"").unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].contains("build.extension"));
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_config_unknown_policy() {
        let err = config_from_str("[build]\ncollisions = \"merge\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_options_for_without_config() {
        let temp = TempDir::new().unwrap();
        // A stray cuebuild.toml above the temp dir would change this, so only check the type.
        let options = load_options_for(temp.path());
        assert!(options.is_ok());
    }

    #[test]
    fn test_load_options_for_with_config() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE_NAME), "[build]\nextension = \"conf\"").unwrap();
        let options = load_options_for(temp.path()).unwrap();
        assert_eq!(options.extension, "conf");
    }
}
