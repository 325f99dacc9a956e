//! URL routing for documents, tags and pages.
//!
//! Every URL is built the same way:
//!
//! ```text
//!   [base_url] / [base_path] / [locale] / <policy path>
//!   └─ root only ┘             └ omitted for the default locale
//! ```
//!
//! Output files use the same shape without `base_url` and `base_path`, since
//! the output root is what gets mounted under the base path.

use crate::content::Document;
use crate::context::BuildContext;
use crate::template::i18n::Translator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Write, path::PathBuf, sync::Arc};

// ============================================================================
// URL Style
// ============================================================================

/// Document URL policy, chosen by `[build] url_style`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UrlStyle {
    /// `/posts/<slug>.html`
    #[default]
    PostsSlug,
    /// `/posts/<yyyy>/<mm>/<slug>.html`
    PostsYearMonthSlug,
    /// `/posts/<yyyy>/<slug>.html`
    PostsYearSlug,
    /// `/<yyyy>/<mm>/<slug>.html`
    YearMonthSlug,
    /// `/<yyyy>/<slug>.html`
    YearSlug,
    /// `/<slug>.html`
    Slug,
}

impl UrlStyle {
    /// Locale-free path for a document.
    pub fn path(self, slug: &str, date: &DateTime<Utc>) -> String {
        let year = date.format("%Y");
        let month = date.format("%m");

        match self {
            Self::PostsSlug => format!("/posts/{slug}.html"),
            Self::PostsYearMonthSlug => format!("/posts/{year}/{month}/{slug}.html"),
            Self::PostsYearSlug => format!("/posts/{year}/{slug}.html"),
            Self::YearMonthSlug => format!("/{year}/{month}/{slug}.html"),
            Self::YearSlug => format!("/{year}/{slug}.html"),
            Self::Slug => format!("/{slug}.html"),
        }
    }
}

// ============================================================================
// Router
// ============================================================================

/// Maps documents, tags and page paths to URLs and output files.
///
/// Holds no state besides the context it was built from, so it is cheap to
/// clone into template helper closures.
#[derive(Debug, Clone)]
pub struct UrlRouter {
    context: Arc<BuildContext>,
    translator: Arc<Translator>,
}

impl UrlRouter {
    pub fn new(context: Arc<BuildContext>, translator: Arc<Translator>) -> Self {
        Self {
            context,
            translator,
        }
    }

    pub fn context(&self) -> &Arc<BuildContext> {
        &self.context
    }

    pub fn translator(&self) -> &Arc<Translator> {
        &self.translator
    }

    /// Path segment for `locale`, empty for the default locale.
    fn locale_segment<'a>(&self, locale: Option<&'a str>) -> &'a str {
        match locale {
            Some(locale) if !self.context.is_default_locale(Some(locale)) => locale,
            _ => "",
        }
    }

    /// Site-relative URL for `path`, with base path and locale prepended.
    pub fn url(&self, path: &str, locale: Option<&str>) -> String {
        join_url(&[&self.context.base_path, self.locale_segment(locale), path])
    }

    /// Absolute URL for `path`.
    pub fn root_url(&self, path: &str, locale: Option<&str>) -> String {
        format!("{}{}", self.context.base_url, self.url(path, locale))
    }

    /// Policy path of a document, without locale or base path.
    pub fn partial_path(&self, doc: &Document) -> String {
        let date = doc.published().unwrap_or_default();
        self.context.url_style.path(&doc.slug, &date)
    }

    /// URL of `doc` in `locale`, defaulting to the document's own locale.
    pub fn document_path(&self, doc: &Document, locale: Option<&str>) -> String {
        self.url(&self.partial_path(doc), locale.or(doc.locale.as_deref()))
    }

    pub fn document_root_path(&self, doc: &Document, locale: Option<&str>) -> String {
        self.root_url(&self.partial_path(doc), locale.or(doc.locale.as_deref()))
    }

    /// Tag URLs are percent-encoded. The file on disk keeps the raw name.
    pub fn tag_path(&self, tag: &str, locale: Option<&str>) -> String {
        self.url(&tag_partial_path("tags", &urlencoding::encode(tag)), locale)
    }

    pub fn tag_root_path(&self, tag: &str, locale: Option<&str>) -> String {
        self.root_url(&tag_partial_path("tags", &urlencoding::encode(tag)), locale)
    }

    /// Output file for `path`, relative to the output root.
    pub fn output_path(&self, path: &str, locale: Option<&str>) -> PathBuf {
        let mut out = PathBuf::new();
        let segments = self.locale_segment(locale).split('/').chain(path.split('/'));
        for segment in segments.filter(|s| !matches!(*s, "" | "." | "..")) {
            out.push(segment);
        }
        out
    }

    pub fn document_output(&self, doc: &Document) -> PathBuf {
        self.output_path(&self.partial_path(doc), doc.locale.as_deref())
    }

    /// Format with the locale's `date_format`, else the site-wide one.
    pub fn format_date(&self, date: &DateTime<Utc>, locale: Option<&str>) -> String {
        self.format_with("date_format", &self.context.date_format, date, locale)
    }

    /// Format with the locale's `datetime_format`, else the site-wide one.
    pub fn format_datetime(&self, date: &DateTime<Utc>, locale: Option<&str>) -> String {
        self.format_with("datetime_format", &self.context.datetime_format, date, locale)
    }

    fn format_with(
        &self,
        key: &str,
        fallback: &str,
        date: &DateTime<Utc>,
        locale: Option<&str>,
    ) -> String {
        let locale = self.context.effective_locale(locale);
        let format = self.translator.lookup(key, locale).unwrap_or(fallback);

        // chrono reports bad strftime patterns through fmt::Error
        let mut out = String::new();
        match write!(out, "{}", date.format(format)) {
            Ok(()) => out,
            Err(_) => date.to_rfc3339(),
        }
    }
}

/// `/<dir>/<tag>.html`
pub fn tag_partial_path(dir: &str, tag: &str) -> String {
    format!("/{dir}/{tag}.html")
}

/// Join URL segments with single slashes. Keeps a trailing slash on the last segment.
fn join_url(segments: &[&str]) -> String {
    let joined = segments
        .iter()
        .map(|s| s.trim_matches('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    let trailing = segments.last().is_some_and(|s| s.len() > 1 && s.ends_with('/'));
    match (joined.is_empty(), trailing) {
        (true, _) => "/".to_owned(),
        (false, true) => format!("/{joined}/"),
        (false, false) => format!("/{joined}"),
    }
}
