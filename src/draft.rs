//! `quire draft`: write an empty post skeleton.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// File stem of new drafts. Starts with the default draft marker, so
/// incremental renders skip it until renamed.
const DRAFT_STEM: &str = "draft";

/// Write `<content>/<YYYY>/<MM>/draft.md`, or `draft-N.md` when taken.
pub fn new_draft(content: &Path, separator: &str, now: DateTime<Utc>) -> Result<PathBuf> {
    let dir = month_dir(content, now)?;
    let path = free_path(&dir);
    write_post(&path, &post_source(separator, "", now, &[], "", ""))?;
    Ok(path)
}

/// Create and return `<content>/<YYYY>/<MM>` for `date`.
pub(crate) fn month_dir(content: &Path, date: DateTime<Utc>) -> Result<PathBuf> {
    let dir = content.join(date.format("%Y/%m").to_string());
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    Ok(dir)
}

pub(crate) fn write_post(path: &Path, source: &str) -> Result<()> {
    fs::write(path, source).with_context(|| format!("Failed to write {}", path.display()))
}

/// A post file as the parser reads it: front matter, then the body.
pub(crate) fn post_source(
    separator: &str,
    title: &str,
    published: DateTime<Utc>,
    tags: &[&str],
    excerpt: &str,
    body: &str,
) -> String {
    format!(
        "{separator}\ntitle: {title}\npublishedAt: {}\ntags: {}\nexcerpt: {excerpt}\n{separator}\n\n{body}",
        published.to_rfc3339_opts(SecondsFormat::Secs, true),
        tags.join(", "),
    )
}

fn free_path(dir: &Path) -> PathBuf {
    let first = dir.join(format!("{DRAFT_STEM}.md"));
    if !first.exists() {
        return first;
    }
    (1..)
        .map(|n| dir.join(format!("{DRAFT_STEM}-{n}.md")))
        .find(|path| !path.exists())
        .unwrap_or(first)
}
