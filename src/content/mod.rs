//! Content store: scanning, caching and querying parsed documents.
//!
//! ```text
//! posts/**/*.md ──► PostParser ──► check ──► sort ──► documents + tags
//!                   (rayon)        │                       │
//!                                  └─► ContentWarning      └─► data/*.json
//! ```
//!
//! The in-memory collection is only ever replaced as a whole, by `load_all`.
//! `parse_subset` returns fresh documents without touching it.

mod cache;
mod document;
mod error;
mod markdown;
mod parser;

pub use cache::{CacheSnapshot, clear as clear_cache};
pub use document::{
    DEFAULT_LAYOUT, Document, PublishedAt, collect_tags, compare_by_date, dedup, is_valid_tag, with_overlay,
};
pub use error::{ContentError, ContentWarning};
pub use markdown::{CLASS_STYLE, MarkdownRenderer};
pub use parser::PostParser;

use crate::context::BuildContext;
use crate::router::UrlRouter;
use crate::utils::watch::is_temp_file;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use walkdir::WalkDir;

const CONTENT_EXTENSION: &str = "md";

/// Result of a parse: accepted documents plus one warning per rejected file.
#[derive(Debug, Default)]
pub struct ParsedContent {
    pub documents: Vec<Document>,
    pub tags: Vec<String>,
    pub warnings: Vec<ContentWarning>,
}

/// What `load_all` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Sources were parsed and the snapshot rewritten.
    Parsed,
    /// The snapshot was fresh and loaded as is.
    Cached,
}

pub struct ContentStore {
    router: UrlRouter,
    parser: PostParser,
    cache: CacheSnapshot,
    layouts: BTreeSet<String>,
    documents: Vec<Document>,
    tags: Vec<String>,
    warnings: Vec<ContentWarning>,
}

impl ContentStore {
    /// Fails when the content directory doesn't exist.
    pub fn new(
        router: UrlRouter,
        renderer: Arc<MarkdownRenderer>,
        layouts: BTreeSet<String>,
    ) -> Result<Self, ContentError> {
        let ctx = router.context();
        if !ctx.content_dir.is_dir() {
            return Err(ContentError::MissingContentDir(ctx.content_dir.clone()));
        }

        Ok(Self {
            parser: PostParser::new(ctx.separator.clone(), renderer),
            cache: CacheSnapshot::new(&ctx.cache_dir, ctx.is_dev()),
            router,
            layouts,
            documents: Vec::new(),
            tags: Vec::new(),
            warnings: Vec::new(),
        })
    }

    pub fn context(&self) -> &BuildContext {
        self.router.context()
    }

    pub fn router(&self) -> &UrlRouter {
        &self.router
    }

    pub fn cache(&self) -> &CacheSnapshot {
        &self.cache
    }

    /// Layout names documents may bind to. Takes effect on the next load.
    pub fn set_layouts(&mut self, layouts: BTreeSet<String>) {
        self.layouts = layouts;
    }

    pub fn layouts(&self) -> &BTreeSet<String> {
        &self.layouts
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Parse everything when forced or stale, else load the snapshot.
    /// Either way the previous collection is replaced.
    pub fn load_all(&mut self, force: bool) -> Result<LoadOutcome, ContentError> {
        if force || self.has_changes() {
            let ParsedContent {
                documents,
                tags,
                warnings,
            } = self.parse_all()?;
            self.cache.save(&documents, &tags)?;

            self.documents = documents;
            self.tags = tags;
            self.warnings = warnings;
            return Ok(LoadOutcome::Parsed);
        }

        let (documents, tags) = self.cache.load()?;
        let ctx = self.router.context();
        self.documents = documents
            .into_iter()
            .filter(|doc| doc.check(&self.layouts, &ctx.locales).is_ok())
            .collect();
        self.tags = tags;
        self.warnings.clear();
        Ok(LoadOutcome::Cached)
    }

    /// True when there is no snapshot or a source file is newer than it.
    pub fn has_changes(&self) -> bool {
        let Some(snapshot) = self.cache.modified() else {
            return true;
        };

        self.discover().iter().any(|path| {
            fs::metadata(path)
                .and_then(|m| m.modified())
                .map_or(true, |modified| modified > snapshot)
        })
    }

    /// Parse every content file.
    ///
    /// Documents come back newest first; equal dates keep discovery order,
    /// which walks the tree sorted by file name.
    pub fn parse_all(&self) -> Result<ParsedContent, ContentError> {
        let paths = self.discover();
        let parsed = self.accept(&paths);
        self.check_duplicate_urls(&parsed.documents)?;
        Ok(parsed)
    }

    /// Parse only `paths`, skipping drafts and non-content files.
    pub fn parse_subset(&self, paths: &[PathBuf]) -> ParsedContent {
        let marker = &self.router.context().draft_marker;
        let paths: Vec<PathBuf> = paths
            .iter()
            .filter(|path| is_content_file(path))
            .filter(|path| !is_draft(path, marker))
            .cloned()
            .collect();

        self.accept(&paths)
    }

    fn discover(&self) -> Vec<PathBuf> {
        WalkDir::new(&self.router.context().content_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|path| is_content_file(path))
            .collect()
    }

    /// Parse `paths` in parallel, keeping their order, then validate and sort.
    fn accept(&self, paths: &[PathBuf]) -> ParsedContent {
        let results: Vec<_> = paths.par_iter().map(|path| self.parser.parse(path)).collect();
        let locales = &self.router.context().locales;

        let mut content = ParsedContent::default();
        for result in results {
            match result.and_then(|doc| doc.check(&self.layouts, locales).map(|()| doc)) {
                Ok(doc) => content.documents.push(doc),
                Err(warning) => content.warnings.push(warning),
            }
        }

        content.documents.sort_by(compare_by_date);
        content.tags = collect_tags(&content.documents);
        content
    }

    /// The clash, if `doc` would be written to the same URL as one of
    /// `others`. Documents sharing its source path are the same post.
    pub fn url_conflict<'a>(
        &self,
        doc: &Document,
        others: impl IntoIterator<Item = &'a Document>,
    ) -> Option<ContentError> {
        let url = self.router.document_path(doc, None);
        others
            .into_iter()
            .filter(|other| other.source != doc.source)
            .find(|other| self.router.document_path(other, None) == url)
            .map(|other| ContentError::DuplicateUrl {
                url,
                first: other.source.clone(),
                second: doc.source.clone(),
            })
    }

    fn check_duplicate_urls(&self, documents: &[Document]) -> Result<(), ContentError> {
        let mut seen: FxHashMap<String, &Path> = FxHashMap::default();
        for doc in documents {
            let url = self.router.document_path(doc, None);
            if let Some(first) = seen.insert(url.clone(), &doc.source) {
                return Err(ContentError::DuplicateUrl {
                    url,
                    first: first.to_path_buf(),
                    second: doc.source.clone(),
                });
            }
        }
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Documents in `locale`, or all of them for `None`.
    pub fn get_documents(&self, locale: Option<&str>) -> Vec<&Document> {
        filter_locale(&self.documents, locale, self.context())
    }

    pub fn get_documents_by_tag(&self, tag: &str, locale: Option<&str>) -> Vec<&Document> {
        self.get_documents(locale)
            .into_iter()
            .filter(|doc| doc.tags.iter().any(|t| t == tag))
            .collect()
    }

    pub fn get_tags(&self) -> &[String] {
        &self.tags
    }

    /// Warnings from the last full parse.
    pub fn warnings(&self) -> &[ContentWarning] {
        &self.warnings
    }
}

/// Keep documents whose effective locale is `locale`.
pub fn filter_locale<'a>(
    documents: impl IntoIterator<Item = &'a Document>,
    locale: Option<&str>,
    ctx: &BuildContext,
) -> Vec<&'a Document> {
    documents
        .into_iter()
        .filter(|doc| locale.is_none_or(|l| ctx.effective_locale(doc.locale.as_deref()) == l))
        .collect()
}

fn is_content_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == CONTENT_EXTENSION) && !is_temp_file(path)
}

fn is_draft(path: &Path, marker: &str) -> bool {
    !marker.is_empty()
        && path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with(marker))
}
