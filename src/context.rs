//! Immutable build-wide settings.
//!
//! A `BuildContext` is derived from a `SiteConfig` plus the run [`Mode`].
//! Components receive it as `Arc<BuildContext>` and never mutate it; switching
//! to dev mode or reloading `quire.toml` builds a new context and drops the old.

use crate::config::SiteConfig;
use crate::router::UrlStyle;
use std::{net::SocketAddr, path::PathBuf};

/// Which kind of build is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Production,
    /// Development server bound to `addr`; `reload_port` carries the
    /// live-reload socket when one is listening.
    Dev {
        addr: SocketAddr,
        reload_port: Option<u16>,
    },
}

/// External CSS build step.
#[derive(Debug, Clone)]
pub struct CssStep {
    pub input: PathBuf,
    /// Relative to the output root.
    pub output: PathBuf,
    pub command: Vec<String>,
}

/// Stylesheet for highlighted code blocks.
#[derive(Debug, Clone)]
pub struct HighlightStep {
    pub theme: String,
    /// Relative to the output root.
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct BuildContext {
    pub mode: Mode,

    pub site_name: String,
    pub site_description: String,
    pub author: String,
    pub email: String,
    /// Absolute base URL without trailing slash, empty when unset.
    pub base_url: String,
    /// Base context path without surrounding slashes.
    pub base_path: String,

    pub locales: Vec<String>,
    pub default_locale: String,
    pub url_style: UrlStyle,
    pub date_format: String,
    pub datetime_format: String,
    pub predefined_tags: Vec<String>,
    pub latest_posts: usize,

    pub root: PathBuf,
    pub config_path: PathBuf,
    pub content_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub locales_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub output_root: PathBuf,

    pub separator: String,
    pub draft_marker: String,
    pub minify: bool,
    /// Feed path relative to the output root, `None` when disabled.
    pub feed: Option<PathBuf>,
    pub css: Option<CssStep>,
    pub highlight: Option<HighlightStep>,

    /// `[extra]` table, converted for templates.
    pub extra: serde_json::Value,
}

impl BuildContext {
    pub fn new(config: &SiteConfig, mode: Mode) -> Self {
        let site = &config.site;
        let build = &config.build;

        let (base_url, base_path, default_output) = match mode {
            Mode::Production => (
                site.url.as_deref().unwrap_or_default().trim_end_matches('/').to_string(),
                site.base_path.trim_matches('/').to_string(),
                &build.output,
            ),
            Mode::Dev { addr, .. } => (format!("http://{addr}"), String::new(), &build.dev_output),
        };

        let css = build
            .css
            .input
            .as_ref()
            .filter(|_| build.css.enable)
            .map(|input| CssStep {
                input: input.clone(),
                output: build.css.output.clone(),
                command: build.css.command.clone(),
            });

        Self {
            mode,
            site_name: site.title.clone(),
            site_description: site.description.clone(),
            author: site.author.clone(),
            email: site.email.clone(),
            base_url,
            base_path,
            locales: site.locales.clone(),
            default_locale: site.default_locale.clone(),
            url_style: build.url_style,
            date_format: site.date_format.clone(),
            datetime_format: site.datetime_format.clone(),
            predefined_tags: site.predefined_tags.clone(),
            latest_posts: site.latest_posts,
            root: config.get_root().to_path_buf(),
            config_path: config.config_path.clone(),
            content_dir: build.content.clone(),
            templates_dir: build.templates.clone(),
            assets_dir: build.assets.clone(),
            locales_dir: build.locales.clone(),
            cache_dir: build.cache.clone(),
            output_root: build.outdir.clone().unwrap_or_else(|| default_output.clone()),
            separator: build.separator.clone(),
            draft_marker: build.draft_marker.clone(),
            minify: build.minify && mode == Mode::Production,
            feed: build.feed.enable.then(|| build.feed.path.clone()),
            css,
            highlight: build.highlight.enable.then(|| HighlightStep {
                theme: build.highlight.theme.clone(),
                path: build.highlight.path.clone(),
            }),
            extra: serde_json::to_value(&config.extra).unwrap_or_default(),
        }
    }

    pub const fn is_dev(&self) -> bool {
        matches!(self.mode, Mode::Dev { .. })
    }

    pub const fn reload_port(&self) -> Option<u16> {
        match self.mode {
            Mode::Dev { reload_port, .. } => reload_port,
            Mode::Production => None,
        }
    }

    /// Locale a document without an explicit locale belongs to.
    pub fn effective_locale<'a>(&'a self, locale: Option<&'a str>) -> &'a str {
        locale.unwrap_or(&self.default_locale)
    }

    pub fn is_default_locale(&self, locale: Option<&str>) -> bool {
        locale.is_none_or(|l| l.is_empty() || l == self.default_locale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn config() -> SiteConfig {
        let mut config = SiteConfig::from_str(
            r#"
            [site]
            url = "https://alice.github.io/"
            base_path = "/blog/"
            locales = ["en", "fr"]
            "#,
        )
        .unwrap();
        config.resolve_paths(Path::new("/srv/site"));
        config
    }

    #[test]
    fn test_production_context() {
        let ctx = BuildContext::new(&config(), Mode::Production);

        assert_eq!(ctx.base_url, "https://alice.github.io");
        assert_eq!(ctx.base_path, "blog");
        assert_eq!(ctx.output_root, Path::new("/srv/site/docs"));
        assert!(ctx.minify);
        assert!(!ctx.is_dev());
        assert_eq!(ctx.feed.as_deref(), Some(Path::new("rss.xml")));
    }

    #[test]
    fn test_dev_context_overrides_urls() {
        let addr = "127.0.0.1:3000".parse().unwrap();
        let ctx = BuildContext::new(
            &config(),
            Mode::Dev {
                addr,
                reload_port: Some(35729),
            },
        );

        assert_eq!(ctx.base_url, "http://127.0.0.1:3000");
        assert_eq!(ctx.base_path, "");
        assert_eq!(ctx.output_root, Path::new("/srv/site/dev"));
        assert!(!ctx.minify);
        assert_eq!(ctx.reload_port(), Some(35729));
    }

    #[test]
    fn test_outdir_overrides_output_root() {
        let mut config = config();
        config.build.outdir = Some("/tmp/out".into());

        let ctx = BuildContext::new(&config, Mode::Production);
        assert_eq!(ctx.output_root, Path::new("/tmp/out"));
    }

    #[test]
    fn test_default_locale_detection() {
        let ctx = BuildContext::new(&config(), Mode::Production);

        assert!(ctx.is_default_locale(None));
        assert!(ctx.is_default_locale(Some("en")));
        assert!(!ctx.is_default_locale(Some("fr")));
        assert_eq!(ctx.effective_locale(None), "en");
        assert_eq!(ctx.effective_locale(Some("fr")), "fr");
    }
}
