//! `[build]` section configuration.
//!
//! Directory layout, URL policy, front-matter parsing and output options.

use super::defaults;
use crate::router::UrlStyle;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[build]` section in quire.toml - build pipeline configuration.
///
/// # Example
/// ```toml
/// [build]
/// content = "posts"
/// output = "docs"
/// url_style = "POSTS_YEAR_MONTH_SLUG"
///
/// [build.feed]
/// path = "rss.xml"
///
/// [build.css]
/// enable = true
/// input = "assets/css/main.css"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Project root directory (usually set via CLI `--root`).
    #[serde(default = "defaults::build::root")]
    #[educe(Default = defaults::build::root())]
    pub root: Option<PathBuf>,

    /// Markdown sources.
    #[serde(default = "defaults::build::content")]
    #[educe(Default = defaults::build::content())]
    pub content: PathBuf,

    /// Template tree with `pages/`, `posts/`, `tags/` and `partials/`.
    #[serde(default = "defaults::build::templates")]
    #[educe(Default = defaults::build::templates())]
    pub templates: PathBuf,

    /// Static files copied verbatim into the output root.
    #[serde(default = "defaults::build::assets")]
    #[educe(Default = defaults::build::assets())]
    pub assets: PathBuf,

    /// Translation tables, one `<locale>.toml` per locale.
    #[serde(default = "defaults::build::locales")]
    #[educe(Default = defaults::build::locales())]
    pub locales: PathBuf,

    /// Parsed-content cache snapshot directory.
    #[serde(default = "defaults::build::cache")]
    #[educe(Default = defaults::build::cache())]
    pub cache: PathBuf,

    /// Production output directory.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// Development output directory.
    #[serde(default = "defaults::build::dev_output")]
    #[educe(Default = defaults::build::dev_output())]
    pub dev_output: PathBuf,

    /// Overrides both output directories (CLI `--outdir`).
    #[serde(skip)]
    pub outdir: Option<PathBuf>,

    /// Document URL policy.
    #[serde(default = "defaults::build::url_style")]
    #[educe(Default = defaults::build::url_style())]
    pub url_style: UrlStyle,

    /// Front-matter separator line.
    #[serde(default = "defaults::build::separator")]
    #[educe(Default = defaults::build::separator())]
    pub separator: String,

    /// File name prefix marking drafts; drafts are skipped by incremental parsing.
    #[serde(default = "defaults::build::draft_marker")]
    #[educe(Default = defaults::build::draft_marker())]
    pub draft_marker: String,

    /// Minify HTML output in production.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub minify: bool,

    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub css: CssConfig,

    #[serde(default)]
    pub highlight: HighlightConfig,
}

// ============================================================================
// Sub-configurations
// ============================================================================

/// `[build.feed]` section - RSS 2.0 feed.
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct FeedConfig {
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub enable: bool,

    /// Feed path relative to the output root.
    #[serde(default = "defaults::build::feed::path")]
    #[educe(Default = defaults::build::feed::path())]
    pub path: PathBuf,
}

/// `[build.css]` section - external CSS build step (tailwind-compatible CLI).
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct CssConfig {
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub enable: bool,

    #[serde(default = "defaults::build::css::input")]
    #[educe(Default = defaults::build::css::input())]
    pub input: Option<PathBuf>,

    /// Stylesheet path relative to the output root.
    #[serde(default = "defaults::build::css::output")]
    #[educe(Default = defaults::build::css::output())]
    pub output: PathBuf,

    #[serde(default = "defaults::build::css::command")]
    #[educe(Default = defaults::build::css::command())]
    pub command: Vec<String>,
}

/// `[build.highlight]` section - stylesheet for highlighted code blocks.
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct HighlightConfig {
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub enable: bool,

    /// Name of a bundled syntect theme.
    #[serde(default = "defaults::build::highlight::theme")]
    #[educe(Default = defaults::build::highlight::theme())]
    pub theme: String,

    /// Stylesheet path relative to the output root.
    #[serde(default = "defaults::build::highlight::path")]
    #[educe(Default = defaults::build::highlight::path())]
    pub path: PathBuf,
}
