//! Single-file parsing: front matter plus Markdown body.
//!
//! ```text
//! ignored preamble
//! ---                      ◄── first separator
//! title: Hello World       ◄── `key: value`, split on the first colon
//! publishedAt: 2021-05-02
//! ---                      ◄── second separator
//! Markdown body...
//! ```

use super::document::{DEFAULT_LAYOUT, Document, PublishedAt, slugify, split_tags};
use super::error::ContentWarning;
use super::markdown::MarkdownRenderer;
use crate::utils::date::parse_datetime;
use std::{fs, path::Path, sync::Arc};

/// Excerpt boundary used when the front matter has no `excerpt`.
const MORE_MARKER: &str = "<!-- more -->";

pub struct PostParser {
    separator: String,
    renderer: Arc<MarkdownRenderer>,
}

struct FrontMatter<'a> {
    fields: Vec<(&'a str, &'a str)>,
    body: &'a str,
}

impl PostParser {
    pub fn new(separator: impl Into<String>, renderer: Arc<MarkdownRenderer>) -> Self {
        Self {
            separator: separator.into(),
            renderer,
        }
    }

    /// Parse the file at `path`.
    ///
    /// Only I/O and rendering failures are errors. A file without front
    /// matter still yields a document, which then fails validation.
    pub fn parse(&self, path: &Path) -> Result<Document, ContentWarning> {
        let source = fs::read_to_string(path).map_err(|e| ContentWarning::Unreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        self.parse_str(path, &source)
    }

    pub fn parse_str(&self, path: &Path, source: &str) -> Result<Document, ContentWarning> {
        let FrontMatter { fields, body } = split_front_matter(source, &self.separator);

        let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
        let mut doc = Document {
            slug: slugify(&stem),
            layout: DEFAULT_LAYOUT.to_owned(),
            markdown: body.to_owned(),
            source: path.to_path_buf(),
            ..Document::default()
        };

        let mut excerpt = None;
        for (key, value) in fields {
            match key {
                "title" => doc.title = value.to_owned(),
                "publishedAt" | "published_at" | "date" => {
                    doc.published_at = Some(match parse_datetime(value) {
                        Some(date) => PublishedAt::Valid(date),
                        None => PublishedAt::Invalid(value.to_owned()),
                    });
                }
                "tags" => doc.tags = split_tags(value),
                "excerpt" => excerpt = Some(value.to_owned()),
                "layout" if !value.is_empty() => doc.layout = value.to_owned(),
                "locale" | "language" => doc.locale = (!value.is_empty()).then(|| value.to_owned()),
                "slug" if !value.is_empty() => doc.slug = slugify(value),
                _ => {
                    doc.extra.insert(key.to_owned(), value.to_owned());
                }
            }
        }

        let render = |markdown: &str| {
            self.renderer.render(markdown).map_err(|e| ContentWarning::Unreadable {
                path: path.to_path_buf(),
                message: format!("cannot render markdown: {e:#}"),
            })
        };

        doc.body = render(body)?;
        doc.excerpt = match (excerpt, body.split_once(MORE_MARKER)) {
            (Some(excerpt), _) => excerpt,
            (None, Some((head, _))) => render(head)?,
            (None, None) => String::new(),
        };

        Ok(doc)
    }
}

fn split_front_matter<'a>(source: &'a str, separator: &str) -> FrontMatter<'a> {
    let mut seen = 0;
    let mut offset = 0;
    let mut fields = Vec::new();

    for line in source.split_inclusive('\n') {
        offset += line.len();

        if line.trim() == separator {
            seen += 1;
            if seen == 2 {
                return FrontMatter {
                    fields,
                    body: &source[offset..],
                };
            }
            continue;
        }

        if seen == 1
            && let Some((key, value)) = line.split_once(':')
            && !key.trim().is_empty()
        {
            fields.push((key.trim(), value.trim()));
        }
    }

    FrontMatter { fields, body: "" }
}
