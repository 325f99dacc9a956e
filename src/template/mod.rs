//! Template rendering.
//!
//! Templates live under `templates/` and are grouped by directory:
//!
//! ```text
//! templates/
//! ├── pages/**      Page      one output per locale          index.html
//! ├── posts/*       Document  one output per bound document  post.html ◄── layout "post"
//! ├── tags/*        Tag       one output per tag and locale  tag.html
//! └── partials/**   include / extend only
//! ```
//!
//! Every variant implements [`Renderable`] and shares [`Compiler`] for the
//! actual tera call, so the three differ only in fan-out and context.

mod compile;
pub mod i18n;
mod page;
mod post;
mod tag;

#[cfg(test)]
pub(crate) mod fixture;

pub use compile::Compiler;
pub use page::PageTemplate;
pub use post::DocumentTemplate;
pub use tag::TagTemplate;

use crate::content::{ContentStore, Document, collect_tags, dedup, with_overlay};
use crate::context::BuildContext;
use crate::reload;
use crate::router::UrlRouter;
use crate::utils::minify::{MinifyType, minify};
use crate::utils::watch::is_temp_file;
use serde::Serialize;
use std::{
    collections::BTreeSet,
    fs,
    path::{Component, Path, PathBuf},
};
use tera::{Context, Value};
use thiserror::Error;
use walkdir::WalkDir;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template `{name}`: {message}")]
    Template { name: String, message: String },

    #[error("IO error at `{0}`")]
    Io(PathBuf, #[source] std::io::Error),
}

impl RenderError {
    /// Flatten tera's error chain, which carries the useful part in `source`.
    pub fn template(name: &str, err: &tera::Error) -> Self {
        let mut message = err.to_string();
        let mut source = std::error::Error::source(err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::Template {
            name: name.to_owned(),
            message,
        }
    }
}

// ============================================================================
// Template Discovery
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    Page,
    Document,
    Tag,
}

impl TemplateKind {
    pub const ALL: [Self; 3] = [Self::Page, Self::Document, Self::Tag];

    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Page => "pages",
            Self::Document => "posts",
            Self::Tag => "tags",
        }
    }

    pub fn from_dir_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.dir_name() == name)
    }
}

/// One template file, registered in tera under `name`.
#[derive(Debug, Clone)]
pub struct TemplateSource {
    /// Path relative to `templates/`, `/`-separated.
    pub name: String,
    /// `None` for partials and other include-only files.
    pub kind: Option<TemplateKind>,
    pub source: String,
}

impl TemplateSource {
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
    }

    /// `name` without the leading kind directory.
    pub fn relative_name(&self) -> &str {
        self.kind
            .and_then(|kind| self.name.strip_prefix(kind.dir_name()))
            .unwrap_or(&self.name)
            .trim_start_matches('/')
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: Vec<TemplateSource>,
}

impl TemplateSet {
    /// Read every template under `dir`, sorted by path. A missing directory is empty.
    pub fn discover(dir: &Path) -> Result<Self, RenderError> {
        if !dir.is_dir() {
            return Ok(Self::default());
        }

        let mut templates = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name().into_iter().filter_map(Result::ok) {
            let path = entry.path();
            if !entry.file_type().is_file() || is_temp_file(path) {
                continue;
            }

            let relative = path.strip_prefix(dir).unwrap_or(path);
            let components: Vec<_> = relative
                .components()
                .filter_map(|c| match c {
                    Component::Normal(part) => Some(part.to_string_lossy()),
                    _ => None,
                })
                .collect();

            let kind = match components.as_slice() {
                [dir, _, ..] => TemplateKind::from_dir_name(dir),
                _ => None,
            };
            let source = fs::read_to_string(path).map_err(|e| RenderError::Io(path.to_path_buf(), e))?;

            templates.push(TemplateSource {
                name: components.join("/"),
                kind,
                source,
            });
        }

        Ok(Self { templates })
    }

    pub fn all(&self) -> &[TemplateSource] {
        &self.templates
    }

    pub fn by_kind(&self, kind: TemplateKind) -> impl Iterator<Item = &TemplateSource> {
        self.templates.iter().filter(move |t| t.kind == Some(kind))
    }

    /// Layout names documents can bind to: stems of document templates.
    pub fn layouts(&self) -> BTreeSet<String> {
        self.by_kind(TemplateKind::Document)
            .map(|t| t.stem().to_owned())
            .collect()
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// A rendered file, relative to the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub contents: String,
}

/// A template bound to its inputs, ready to produce output files.
pub trait Renderable {
    fn render(&self) -> Result<Vec<OutputFile>, RenderError>;
}

#[derive(Serialize)]
struct DocumentView<'a> {
    #[serde(flatten)]
    document: &'a Document,
    url: String,
    root_url: String,
}

#[derive(Serialize)]
struct SiteView<'a> {
    title: &'a str,
    description: &'a str,
    url: &'a str,
    base_path: &'a str,
    author: &'a str,
    email: &'a str,
}

/// Everything a render pass reads: the compiled templates and a consistent
/// view of the document collection.
pub struct RenderEnv<'a> {
    compiler: &'a Compiler,
    router: &'a UrlRouter,
    documents: Vec<&'a Document>,
    views: Vec<Value>,
    tags: Vec<String>,
}

impl<'a> RenderEnv<'a> {
    /// The store's collection with `overlay` documents swapped in by source
    /// path, so freshly parsed documents see the same site as a full build.
    pub fn new(compiler: &'a Compiler, store: &'a ContentStore, overlay: &'a [Document]) -> Self {
        let router = store.router();
        let documents = with_overlay(store.get_documents(None), overlay);

        let views = documents.iter().map(|doc| document_view(doc, router)).collect();
        let tags = collect_tags(documents.iter().copied());

        Self {
            compiler,
            router,
            documents,
            views,
            tags,
        }
    }

    pub fn compiler(&self) -> &Compiler {
        self.compiler
    }

    pub fn router(&self) -> &UrlRouter {
        self.router
    }

    pub fn context(&self) -> &BuildContext {
        self.router.context()
    }

    pub fn documents(&self) -> &[&'a Document] {
        &self.documents
    }

    /// Predefined tags followed by discovered ones, deduplicated.
    pub fn tag_list(&self) -> Vec<String> {
        let predefined = &self.context().predefined_tags;
        dedup(predefined.iter().chain(&self.tags).map(String::as_str))
    }

    /// Serialized documents in `locale`, optionally restricted to `tag`.
    fn views_in(&self, locale: &str, tag: Option<&str>) -> Vec<&Value> {
        let ctx = self.context();
        self.documents
            .iter()
            .zip(&self.views)
            .filter(|(doc, _)| ctx.effective_locale(doc.locale.as_deref()) == locale)
            .filter(|(doc, _)| tag.is_none_or(|tag| doc.tags.iter().any(|t| t == tag)))
            .map(|(_, view)| view)
            .collect()
    }

    /// Context shared by every variant.
    pub fn base_context(&self, template: &TemplateSource, locale: &str) -> Context {
        let ctx = self.context();
        let posts = self.views_in(locale, None);
        let latest: Vec<_> = posts.iter().take(ctx.latest_posts).collect();

        let mut context = Context::new();
        context.insert(
            "site",
            &SiteView {
                title: &ctx.site_name,
                description: &ctx.site_description,
                url: &ctx.base_url,
                base_path: &ctx.base_path,
                author: &ctx.author,
                email: &ctx.email,
            },
        );
        context.insert("extra", &ctx.extra);
        context.insert("all_posts", &self.views);
        context.insert("latest_posts", &latest);
        context.insert("posts", &posts);
        context.insert("tags", &self.tags);
        context.insert("template_name", &template.name);
        context.insert("locale", locale);
        context.insert("locales", &ctx.locales);
        context.insert("default_locale", &ctx.default_locale);
        context.insert("dev_mode", &ctx.is_dev());
        context
    }

    fn posts_by_tag(&self, tag: &str, locale: &str) -> Vec<&Value> {
        self.views_in(locale, Some(tag))
    }
}

/// A document as templates see it, with its URLs attached.
pub fn document_view(doc: &Document, router: &UrlRouter) -> Value {
    serde_json::to_value(DocumentView {
        document: doc,
        url: router.document_path(doc, None),
        root_url: router.document_root_path(doc, None),
    })
    .unwrap_or_default()
}

/// Every renderable of `kind`, fanned out across locales where it applies.
pub fn renderables<'e>(
    env: &'e RenderEnv<'e>,
    templates: &'e TemplateSet,
    kind: TemplateKind,
) -> Vec<Box<dyn Renderable + 'e>> {
    let locales = &env.context().locales;
    let mut out: Vec<Box<dyn Renderable + 'e>> = Vec::new();

    for template in templates.by_kind(kind) {
        match kind {
            TemplateKind::Page => {
                out.extend(locales.iter().map(|locale| {
                    Box::new(PageTemplate::new(template, locale, env)) as Box<dyn Renderable + 'e>
                }));
            }
            TemplateKind::Tag => {
                out.extend(locales.iter().map(|locale| {
                    Box::new(TagTemplate::new(template, locale, env)) as Box<dyn Renderable + 'e>
                }));
            }
            TemplateKind::Document => out.push(Box::new(DocumentTemplate::new(template, env))),
        }
    }
    out
}

/// Render every template of the given kinds.
pub fn render_kinds(
    env: &RenderEnv<'_>,
    templates: &TemplateSet,
    kinds: &[TemplateKind],
) -> Result<Vec<OutputFile>, RenderError> {
    let mut outputs = Vec::new();
    for &kind in kinds {
        for renderable in renderables(env, templates, kind) {
            outputs.extend(renderable.render()?);
        }
    }
    Ok(outputs)
}

// ============================================================================
// Output
// ============================================================================

/// Write `outputs` under the output root.
///
/// HTML gets the live-reload client in dev mode and is minified when the
/// context asks for it.
pub fn write_outputs(outputs: &[OutputFile], ctx: &BuildContext) -> Result<usize, RenderError> {
    for output in outputs {
        let path = ctx.output_root.join(&output.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| RenderError::Io(parent.to_path_buf(), e))?;
        }

        let is_html = output
            .path
            .extension()
            .is_some_and(|ext| ext == "html" || ext == "htm");
        let contents = match (is_html, ctx.reload_port()) {
            (true, Some(port)) => reload::inject_client(&output.contents, port),
            _ => output.contents.clone(),
        };
        let bytes = if is_html {
            minify(MinifyType::Html(contents.as_bytes()), ctx).into_owned()
        } else {
            contents.into_bytes()
        };

        fs::write(&path, bytes).map_err(|e| RenderError::Io(path.clone(), e))?;
    }
    Ok(outputs.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_discover_classifies_templates() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "pages/index.html", "index");
        write(dir.path(), "pages/about/index.html", "about");
        write(dir.path(), "posts/post.html", "post");
        write(dir.path(), "posts/note.html", "note");
        write(dir.path(), "tags/tag.html", "tag");
        write(dir.path(), "partials/head.html", "head");
        write(dir.path(), "base.html", "base");
        write(dir.path(), "posts/.post.html.swp", "swap");

        let set = TemplateSet::discover(dir.path()).unwrap();

        let pages: Vec<_> = set.by_kind(TemplateKind::Page).map(|t| t.name.as_str()).collect();
        assert_eq!(pages, ["pages/about/index.html", "pages/index.html"]);
        assert_eq!(set.layouts(), BTreeSet::from(["note".to_string(), "post".to_string()]));
        assert_eq!(set.by_kind(TemplateKind::Tag).count(), 1);
        assert_eq!(set.all().len(), 7);

        let base = set.all().iter().find(|t| t.name == "base.html").unwrap();
        assert!(base.kind.is_none());
    }

    #[test]
    fn test_discover_missing_dir() {
        let dir = TempDir::new().unwrap();
        let set = TemplateSet::discover(&dir.path().join("templates")).unwrap();
        assert!(set.all().is_empty());
    }

    #[test]
    fn test_relative_name_and_stem() {
        let template = TemplateSource {
            name: "pages/about/index.html".into(),
            kind: Some(TemplateKind::Page),
            source: String::new(),
        };
        assert_eq!(template.relative_name(), "about/index.html");
        assert_eq!(template.stem(), "index");
    }

    #[test]
    fn test_kind_dir_names() {
        for kind in TemplateKind::ALL {
            assert_eq!(TemplateKind::from_dir_name(kind.dir_name()), Some(kind));
        }
        assert_eq!(TemplateKind::from_dir_name("partials"), None);
    }
}
