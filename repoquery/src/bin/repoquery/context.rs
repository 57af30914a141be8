use anyhow::{Context, Result};
use repoquery::ParserConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project the CLI scans for entity declarations.
pub struct ProjectContext {
    /// Root directory of the project (where Cargo.toml is)
    pub project_root: PathBuf,
    /// Configuration file that was loaded, if any
    pub config_path: Option<PathBuf>,
    pub config: RepoqueryConfig,
}

/// Configuration stored in .repoquery/config.toml
///
/// ```toml
/// [scan]
/// sources = ["src", "crates/domain/src"]
///
/// [parser]
/// terminal_types = ["Money"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoqueryConfig {
    #[serde(default)]
    pub parser: ParserConfig,
    #[serde(default)]
    pub scan: ScanSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Directories, relative to the project root, searched for struct declarations
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            sources: default_sources(),
        }
    }
}

fn default_sources() -> Vec<String> {
    vec!["src".to_string()]
}

impl RepoqueryConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let config: RepoqueryConfig =
            toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
        config.parser.validate()?;
        Ok(config)
    }
}

impl ProjectContext {
    /// Locate the project from the current directory. An explicit config file
    /// replaces `.repoquery/config.toml`.
    pub fn find(config_override: Option<&Path>) -> Result<Self> {
        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        let project_root = match Self::find_project_root(&current_dir) {
            Some(root) => root,
            None => {
                log::debug!("no Cargo.toml above {}, using it as project root", current_dir.display());
                current_dir
            }
        };
        Self::from_root(project_root, config_override)
    }

    /// Create context from a known project root
    pub fn from_root(project_root: PathBuf, config_override: Option<&Path>) -> Result<Self> {
        let config_path = match config_override {
            Some(path) => path.to_path_buf(),
            None => project_root.join(".repoquery").join("config.toml"),
        };

        let (config, config_path) = if config_path.exists() {
            log::debug!("loading configuration from {}", config_path.display());
            (RepoqueryConfig::load(&config_path)?, Some(config_path))
        } else if config_override.is_some() {
            anyhow::bail!("Configuration file {} does not exist", config_path.display());
        } else {
            (RepoqueryConfig::default(), None)
        };

        Ok(Self {
            project_root,
            config_path,
            config,
        })
    }

    /// Where the active configuration came from, for verbose output.
    pub fn config_source(&self) -> String {
        match &self.config_path {
            Some(path) => path.display().to_string(),
            None => "built-in defaults".to_string(),
        }
    }

    /// Source directories to scan; explicit directories replace the configured ones.
    pub fn source_dirs(&self, explicit: &[PathBuf]) -> Vec<PathBuf> {
        if explicit.is_empty() {
            self.config
                .scan
                .sources
                .iter()
                .map(|dir| self.project_root.join(dir))
                .collect()
        } else {
            explicit
                .iter()
                .map(|dir| {
                    if dir.is_absolute() {
                        dir.clone()
                    } else {
                        self.project_root.join(dir)
                    }
                })
                .collect()
        }
    }

    fn find_project_root(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .find(|dir| dir.join("Cargo.toml").exists())
            .map(Path::to_path_buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RepoqueryConfig::default();
        assert_eq!(config.scan.sources, vec!["src".to_string()]);
        assert_eq!(config.parser, ParserConfig::default());
    }

    #[test]
    fn test_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".repoquery")).unwrap();
        std::fs::write(
            dir.path().join(".repoquery/config.toml"),
            "[scan]\nsources = [\"domain\"]\n\n[parser]\nterminal_types = [\"Money\"]\n",
        )
        .unwrap();

        let ctx = ProjectContext::from_root(dir.path().to_path_buf(), None).unwrap();
        assert_eq!(ctx.config_path, Some(dir.path().join(".repoquery/config.toml")));
        assert_eq!(ctx.config.scan.sources, vec!["domain".to_string()]);
        assert!(ctx.config.parser.terminal().contains("Money"));
        assert_eq!(ctx.source_dirs(&[]), vec![dir.path().join("domain")]);
        assert_eq!(
            ctx.source_dirs(&[PathBuf::from("other")]),
            vec![dir.path().join("other")]
        );
    }

    #[test]
    fn test_missing_override_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(ProjectContext::from_root(dir.path().to_path_buf(), Some(&missing)).is_err());
        let ctx = ProjectContext::from_root(dir.path().to_path_buf(), None).unwrap();
        assert!(ctx.config_path.is_none());
        assert_eq!(ctx.config_source(), "built-in defaults");
    }

    #[test]
    fn test_invalid_parser_section_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[parser]\nseparator = \"x\"\n").unwrap();
        assert!(RepoqueryConfig::load(&path).is_err());
    }
}
