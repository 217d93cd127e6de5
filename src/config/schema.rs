//! Configuration schema types for `cuebuild.toml`
//!
//! Defines the structure and validation rules for build options.

use serde::{Deserialize, Serialize};

/// What to do when two overlays project a file onto the same path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// The overlay mounted later replaces the earlier file
    #[default]
    LastWins,
    /// Fail the build
    Reject,
}

/// Options controlling how a build assembles its sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildOptions {
    /// Extension of configuration source files, without the dot
    pub extension: String,
    /// Overlay collision handling
    pub collisions: CollisionPolicy,
    /// Walk overlays on the rayon thread pool
    pub parallel_overlays: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            extension: "cue".to_string(),
            collisions: CollisionPolicy::LastWins,
            parallel_overlays: false,
        }
    }
}

impl BuildOptions {
    /// Set the source file extension. A leading dot is dropped.
    ///
    /// The value is checked by [`validate`](Self::validate) when a build starts.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        self.extension = extension.strip_prefix('.').map(str::to_string).unwrap_or(extension);
        self
    }

    /// Set the collision policy.
    pub fn with_collisions(mut self, collisions: CollisionPolicy) -> Self {
        self.collisions = collisions;
        self
    }

    /// Enable or disable parallel overlay projection.
    pub fn with_parallel_overlays(mut self, parallel: bool) -> Self {
        self.parallel_overlays = parallel;
        self
    }

    /// Check option values that serde and the setters accept but a build cannot use.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let ext = &self.extension;

        if ext.is_empty() {
            errors.push(ConfigValidationError {
                field: "build.extension".to_string(),
                message: "must be a non-empty string".to_string(),
            });
        } else if ext.contains(['/', '\\', '.']) || ext.chars().any(char::is_whitespace) {
            errors.push(ConfigValidationError {
                field: "build.extension".to_string(),
                message: format!("must be a single extension without separators, got '{}'", ext),
            });
        }

        errors
    }

    /// Whether the text after the last dot of `name` is the configured extension.
    pub fn matches_extension(&self, name: &str) -> bool {
        name.rsplit_once('.').is_some_and(|(_, ext)| ext == self.extension)
    }
}

/// Root of `cuebuild.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CuebuildConfig {
    /// `[build]` section
    pub build: BuildOptions,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "build.extension")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cuebuild.toml: '{}' {}", self.field, self.message)
    }
}

impl CuebuildConfig {
    /// Normalize values that have more than one accepted spelling.
    pub fn normalize(&mut self) {
        if let Some(stripped) = self.build.extension.strip_prefix('.') {
            self.build.extension = stripped.to_string();
        }
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        self.build.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = BuildOptions::default();
        assert_eq!(opts.extension, "cue");
        assert_eq!(opts.collisions, CollisionPolicy::LastWins);
        assert!(!opts.parallel_overlays);
    }

    #[test]
    fn test_with_extension_strips_dot() {
        let opts = BuildOptions::default().with_extension(".json");
        assert_eq!(opts.extension, "json");
    }

    #[test]
    fn test_matches_extension() {
        let opts = BuildOptions::default();
        assert!(opts.matches_extension("main.cue"));
        assert!(!opts.matches_extension("main.cue.bak"));
        assert!(!opts.matches_extension("main.CUE"));
        assert!(!opts.matches_extension("cue"));
        assert!(opts.matches_extension(".cue"));
    }

    #[test]
    fn test_validate_rejects_separators() {
        let mut config = CuebuildConfig::default();
        config.build.extension = "a/b".to_string();
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "build.extension");
    }

    #[test]
    fn test_validate_rejects_empty() {
        let mut config = CuebuildConfig::default();
        config.build.extension = String::new();
        assert_eq!(config.validate().len(), 1);
    }

    #[test]
    fn test_with_extension_dot_only_fails_validation() {
        let opts = BuildOptions::default().with_extension(".");
        assert_eq!(opts.extension, "");
        let errors = opts.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "must be a non-empty string");
    }

    #[test]
    fn test_collision_policy_serde() {
        let config: CuebuildConfig = toml::from_str("[build]\ncollisions = \"reject\"").unwrap();
        assert_eq!(config.build.collisions, CollisionPolicy::Reject);
    }
}
