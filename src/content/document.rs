//! Parsed content items.

use super::error::ContentWarning;
use chrono::{DateTime, Utc};
use regex::Regex;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
    sync::LazyLock,
};

/// Layout used when the front matter doesn't name one.
pub const DEFAULT_LAYOUT: &str = "post";

static SLUG_STRIP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_-]").unwrap());

/// A `publishedAt` value. Unparseable input is kept verbatim for the warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PublishedAt {
    Valid(DateTime<Utc>),
    Invalid(String),
}

/// One parsed content file. Never modified after parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Empty when the front matter has no title.
    pub title: String,
    /// Matches `[A-Za-z0-9_-]*`.
    pub slug: String,
    pub published_at: Option<PublishedAt>,
    /// Deduplicated, first-seen order.
    pub tags: Vec<String>,
    /// Plain front-matter excerpt or the rendered text above `<!-- more -->`.
    pub excerpt: String,
    /// Rendered HTML.
    pub body: String,
    /// Raw Markdown body.
    pub markdown: String,
    pub layout: String,
    /// Front-matter locale. `None` means the default locale.
    pub locale: Option<String>,
    /// Front-matter keys without a dedicated field.
    pub extra: BTreeMap<String, String>,
    pub source: PathBuf,
}

impl Document {
    pub fn published(&self) -> Option<DateTime<Utc>> {
        match &self.published_at {
            Some(PublishedAt::Valid(date)) => Some(*date),
            _ => None,
        }
    }

    /// Reasons a document is left out of the collection, first match only.
    pub fn check(&self, layouts: &BTreeSet<String>, locales: &[String]) -> Result<(), ContentWarning> {
        let path = self.source.clone();

        if self.title.trim().is_empty() {
            return Err(ContentWarning::MissingField { path, field: "title" });
        }
        match &self.published_at {
            None => return Err(ContentWarning::MissingField { path, field: "publishedAt" }),
            Some(PublishedAt::Invalid(value)) => {
                return Err(ContentWarning::InvalidDate { path, value: value.clone() });
            }
            Some(PublishedAt::Valid(_)) => {}
        }
        if self.slug.is_empty() {
            return Err(ContentWarning::MissingField { path, field: "slug" });
        }
        if !layouts.contains(&self.layout) {
            return Err(ContentWarning::UnknownLayout { path, layout: self.layout.clone() });
        }
        if let Some(locale) = &self.locale
            && !locales.contains(locale)
        {
            return Err(ContentWarning::UnknownLocale { path, locale: locale.clone() });
        }
        if let Some(tag) = self.tags.iter().find(|tag| !is_valid_tag(tag)) {
            return Err(ContentWarning::InvalidTag { path, tag: tag.clone() });
        }

        Ok(())
    }
}

/// Tags become file names under `tags/`, so they can't step outside it.
pub fn is_valid_tag(tag: &str) -> bool {
    !matches!(tag, "" | "." | "..") && !tag.contains(['/', '\\'])
}

/// Newest first. Equal or missing dates compare equal, so a stable sort
/// keeps discovery order.
pub fn compare_by_date(a: &Document, b: &Document) -> Ordering {
    b.published().cmp(&a.published())
}

/// `documents` with `overlay` swapped in by source path, newest first.
pub fn with_overlay<'a>(mut documents: Vec<&'a Document>, overlay: &'a [Document]) -> Vec<&'a Document> {
    for doc in overlay {
        match documents.iter().position(|d| d.source == doc.source) {
            Some(index) => documents[index] = doc,
            None => documents.push(doc),
        }
    }
    documents.sort_by(|a, b| compare_by_date(a, b));
    documents
}

/// Strip everything outside `[A-Za-z0-9_-]`.
pub fn slugify(raw: &str) -> String {
    SLUG_STRIP.replace_all(raw, "").into_owned()
}

/// Split a front-matter tag list on commas and whitespace.
pub fn split_tags(raw: &str) -> Vec<String> {
    dedup(raw.split([',', ' ', '\t']).filter(|t| !t.is_empty()))
}

/// Union of all document tags in first-seen order.
pub fn collect_tags<'a>(documents: impl IntoIterator<Item = &'a Document>) -> Vec<String> {
    dedup(documents.into_iter().flat_map(|doc| doc.tags.iter().map(String::as_str)))
}

/// Deduplicate `items`, keeping the first occurrence.
pub fn dedup<'a>(items: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = FxHashSet::default();
    items
        .into_iter()
        .filter(|item| seen.insert(*item))
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dated(day: u32) -> Document {
        Document {
            title: format!("day {day}"),
            slug: format!("day-{day}"),
            published_at: Some(PublishedAt::Valid(Utc.with_ymd_and_hms(2021, 1, day, 0, 0, 0).unwrap())),
            layout: DEFAULT_LAYOUT.into(),
            ..Document::default()
        }
    }

    fn layouts() -> BTreeSet<String> {
        BTreeSet::from([DEFAULT_LAYOUT.to_string()])
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("this is a test!!"), "thisisatest");
        assert_eq!(slugify("hello-world_2"), "hello-world_2");
        assert_eq!(slugify("ünïcödé"), "ncd");
    }

    #[test]
    fn test_tags_dedup_first_seen() {
        let mut a = dated(1);
        a.tags = split_tags("a, b");
        let mut b = dated(2);
        b.tags = split_tags("b,c");

        assert_eq!(a.tags, ["a", "b"]);
        assert_eq!(collect_tags([&a, &b]), ["a", "b", "c"]);
    }

    #[test]
    fn test_split_tags_drops_duplicates_and_empties() {
        assert_eq!(split_tags(" rust,, rust  web "), ["rust", "web"]);
        assert!(split_tags("").is_empty());
    }

    #[test]
    fn test_compare_by_date_newest_first() {
        let mut docs = vec![dated(2), dated(5)];
        docs.sort_by(compare_by_date);
        assert_eq!(docs[0].slug, "day-5");
    }

    #[test]
    fn test_compare_by_date_is_stable_for_ties() {
        let mut first = dated(3);
        first.slug = "first".into();
        let mut second = dated(3);
        second.slug = "second".into();

        let mut docs = vec![first, second, dated(4)];
        docs.sort_by(compare_by_date);

        let slugs: Vec<_> = docs.iter().map(|d| d.slug.as_str()).collect();
        assert_eq!(slugs, ["day-4", "first", "second"]);
    }

    #[test]
    fn test_check_accepts_complete_document() {
        assert!(dated(1).check(&layouts(), &["en".into()]).is_ok());
    }

    #[test]
    fn test_check_reports_first_problem() {
        let mut doc = dated(1);
        doc.published_at = Some(PublishedAt::Invalid("not-a-date".into()));
        doc.layout = "nonexistent".into();

        assert!(matches!(
            doc.check(&layouts(), &["en".into()]),
            Err(ContentWarning::InvalidDate { value, .. }) if value == "not-a-date"
        ));
    }

    #[test]
    fn test_check_unknown_layout_and_locale() {
        let mut doc = dated(1);
        doc.layout = "nonexistent".into();
        assert!(matches!(
            doc.check(&layouts(), &["en".into()]),
            Err(ContentWarning::UnknownLayout { .. })
        ));

        let mut doc = dated(1);
        doc.locale = Some("de".into());
        assert!(matches!(
            doc.check(&layouts(), &["en".into()]),
            Err(ContentWarning::UnknownLocale { .. })
        ));
    }

    #[test]
    fn test_check_rejects_path_like_tags() {
        for raw in ["rust, ../../x", "a/b", "..", "win\\dir"] {
            let mut doc = dated(1);
            doc.tags = split_tags(raw);
            assert!(
                matches!(doc.check(&layouts(), &["en".into()]), Err(ContentWarning::InvalidTag { .. })),
                "{raw}"
            );
        }

        let mut doc = dated(1);
        doc.tags = split_tags("c#, c++, café");
        assert!(doc.check(&layouts(), &["en".into()]).is_ok());
    }

    #[test]
    fn test_published_at_untagged_serde() {
        let valid: PublishedAt = serde_json::from_str("\"2021-05-02T00:00:00Z\"").unwrap();
        assert!(matches!(valid, PublishedAt::Valid(_)));

        let invalid: PublishedAt = serde_json::from_str("\"not-a-date\"").unwrap();
        assert_eq!(invalid, PublishedAt::Invalid("not-a-date".into()));
    }
}
