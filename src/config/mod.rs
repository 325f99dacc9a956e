//! Site configuration management for `quire.toml`.
//!
//! # Sections
//!
//! | Section     | Purpose                                          |
//! |-------------|--------------------------------------------------|
//! | `[site]`    | Site identity, locales, date formats             |
//! | `[build]`   | Paths, URL policy, feed, css, highlighting       |
//! | `[serve]`   | Development server (port, interface, watch)      |
//! | `[extra]`   | User-defined fields exposed to templates         |
//!
//! # Example
//!
//! ```toml
//! [site]
//! title = "meblog"
//! description = "A DIY blog engine"
//! url = "https://alice.github.io"
//! locales = ["en", "vi"]
//!
//! [build]
//! url_style = "POSTS_YEAR_MONTH_SLUG"
//!
//! [serve]
//! port = 3000
//!
//! [extra]
//! github = "https://github.com/alice"
//! ```

mod build;
pub mod defaults;
mod error;
mod handle;
mod serve;
mod site;

pub use error::ConfigError;
pub use handle::{cfg, init_config, reload_config};

use build::BuildConfig;
use serve::ServeConfig;
use site::SiteSection;

use crate::cli::{Cli, Commands};
use crate::content::is_valid_tag;
use anyhow::{Context, Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing quire.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// CLI arguments reference
    #[serde(skip)]
    pub cli: Option<&'static Cli>,

    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub site: SiteSection,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub serve: ServeConfig,

    /// User-defined extra fields
    #[serde(default)]
    pub extra: BTreeMap<String, toml::Value>,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Load, apply CLI overrides and validate.
    pub fn load(cli: &'static Cli) -> Result<Self> {
        let root = cli.root.as_deref().unwrap_or(Path::new("./"));
        let config_path = root.join(&cli.config);

        if !config_path.exists() {
            bail!(ConfigError::Validation(format!(
                "config file `{}` not found",
                config_path.display()
            )));
        }

        let mut config = Self::from_path(&config_path)?;
        config.update_with_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        self.build.root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.build.root = Some(path.to_path_buf())
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &'static Cli) {
        self.cli = Some(cli);

        let root = cli
            .root
            .as_ref()
            .cloned()
            .unwrap_or_else(|| self.get_root().to_owned());
        self.config_path = Self::normalize_path(&root.join(&cli.config));

        match &cli.command {
            Commands::Build { outdir, minify } => {
                self.build.outdir.clone_from(outdir);
                Self::update_option(&mut self.build.minify, minify.as_ref());
            }
            Commands::Serve {
                outdir,
                interface,
                port,
                watch,
            } => {
                self.build.outdir.clone_from(outdir);
                Self::update_option(&mut self.serve.interface, interface.as_ref());
                Self::update_option(&mut self.serve.port, port.as_ref());
                Self::update_option(&mut self.serve.watch, watch.as_ref());
            }
            Commands::CleanCache | Commands::Draft | Commands::Sample { .. } => {}
        }

        self.resolve_paths(&root);
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Resolve every directory against `root` and normalize to absolute paths.
    pub fn resolve_paths(&mut self, root: &Path) {
        let root = Self::normalize_path(root);
        self.set_root(&root);

        let build = &mut self.build;
        for dir in [
            &mut build.content,
            &mut build.templates,
            &mut build.assets,
            &mut build.locales,
            &mut build.cache,
            &mut build.output,
            &mut build.dev_output,
        ] {
            *dir = Self::normalize_path(&root.join(&*dir));
        }

        if let Some(outdir) = build.outdir.as_ref() {
            build.outdir = Some(Self::normalize_path(&root.join(outdir)));
        }
        if let Some(input) = build.css.input.as_ref() {
            build.css.input = Some(Self::normalize_path(&root.join(input)));
        }
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    pub fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate configuration. Every failure here is fatal.
    pub fn validate(&self) -> Result<()> {
        if !self.build.content.is_dir() {
            bail!(ConfigError::Validation(format!(
                "content directory `{}` not found",
                self.build.content.display()
            )));
        }

        if self.site.locales.is_empty() {
            bail!(ConfigError::Validation("[site.locales] must not be empty".into()));
        }

        if !self.site.locales.contains(&self.site.default_locale) {
            bail!(ConfigError::Validation(format!(
                "[site.default_locale] `{}` is not listed in [site.locales]",
                self.site.default_locale
            )));
        }

        if let Some(url) = &self.site.url
            && !url.starts_with("http")
        {
            bail!(ConfigError::Validation(
                "[site.url] must start with http:// or https://".into()
            ));
        }

        if let Some(tag) = self.site.predefined_tags.iter().find(|tag| !is_valid_tag(tag)) {
            bail!(ConfigError::Validation(format!(
                "[site.predefined_tags] `{tag}` is not a valid tag"
            )));
        }

        let production = self.cli.is_some_and(Cli::is_build);
        if production && self.build.feed.enable && self.site.url.is_none() {
            bail!(ConfigError::Validation(
                "[site.url] is required for feed generation".into()
            ));
        }

        if self.build.css.enable {
            Self::check_command_installed("[build.css.command]", &self.build.css.command)?;

            match &self.build.css.input {
                None => bail!(ConfigError::Validation(
                    "[build.css.enable] = true requires [build.css.input] to be set".into()
                )),
                Some(path) if !path.is_file() => bail!(ConfigError::Validation(format!(
                    "[build.css.input] `{}` is not a file",
                    path.display()
                ))),
                _ => {}
            }
        }

        Ok(())
    }

    /// Check if a command is installed and available
    fn check_command_installed(field: &str, command: &[String]) -> Result<()> {
        let Some(cmd) = command.first() else {
            bail!(ConfigError::Validation(format!(
                "{field} must have at least one element"
            )));
        };

        which::which(cmd)
            .with_context(|| format!("`{cmd}` not found. Please install it first."))?;

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn site_with_content() -> (TempDir, SiteConfig) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("posts")).unwrap();
        let mut config = SiteConfig::default();
        config.resolve_paths(dir.path());
        (dir, config)
    }

    #[test]
    fn test_from_str() {
        let config = SiteConfig::from_str("[site]\ntitle = \"My Blog\"\nauthor = \"Alice\"").unwrap();
        assert_eq!(config.site.title, "My Blog");
        assert_eq!(config.site.author, "Alice");
    }

    #[test]
    fn test_from_str_invalid_toml() {
        assert!(SiteConfig::from_str("[site\ntitle = \"x\"").is_err());
    }

    #[test]
    fn test_extra_fields() {
        let config = r#"
            [extra]
            github = "https://github.com/alice"
            answer = 42
        "#;
        let config = SiteConfig::from_str(config).unwrap();

        assert_eq!(
            config.extra.get("github").and_then(|v| v.as_str()),
            Some("https://github.com/alice")
        );
        assert_eq!(config.extra.get("answer").and_then(|v| v.as_integer()), Some(42));
    }

    #[test]
    fn test_resolve_paths_makes_absolute() {
        let (dir, config) = site_with_content();
        let root = dir.path().canonicalize().unwrap();

        assert_eq!(config.get_root(), root);
        assert_eq!(config.build.content, root.join("posts"));
        assert_eq!(config.build.output, root.join("docs"));
        assert_eq!(config.build.dev_output, root.join("dev"));
        assert!(config.build.cache.is_absolute());
    }

    #[test]
    fn test_validate_ok() {
        let (_dir, config) = site_with_content();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_missing_content_dir() {
        let dir = TempDir::new().unwrap();
        let mut config = SiteConfig::default();
        config.resolve_paths(dir.path());

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("content directory"));
    }

    #[test]
    fn test_validate_default_locale_not_listed() {
        let (_dir, mut config) = site_with_content();
        config.site.locales = vec!["fr".into()];

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_url_scheme() {
        let (_dir, mut config) = site_with_content();
        config.site.url = Some("example.com".into());

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_predefined_tag_path() {
        let (_dir, mut config) = site_with_content();
        config.site.predefined_tags = vec!["rust".into(), "../up".into()];

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("../up"));
    }

    #[test]
    fn test_validate_css_without_input() {
        let (_dir, mut config) = site_with_content();
        config.build.css.enable = true;
        config.build.css.command = vec!["sh".into()];

        assert!(config.validate().is_err());
    }
}
