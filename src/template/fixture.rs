//! A throwaway site on disk for render tests.

use super::TemplateSet;
use crate::config::SiteConfig;
use crate::content::{ContentStore, MarkdownRenderer};
use crate::context::{BuildContext, Mode};
use crate::router::UrlRouter;
use crate::template::i18n::Translator;
use std::{fs, path::PathBuf, sync::Arc};
use tempfile::TempDir;

pub struct Fixture {
    _dir: TempDir,
    pub config: SiteConfig,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("posts")).unwrap();

        let mut config = SiteConfig::default();
        config.site.title = "Fixture".into();
        config.site.url = Some("https://blog.example.com".into());
        config.site.locales = vec!["en".into(), "fr".into()];
        config.resolve_paths(dir.path());

        let site = Self { _dir: dir, config };
        site.template("posts/post.html", "{{ post.title }}");
        site
    }

    pub fn post(&self, rel: &str, front: &str) -> PathBuf {
        let path = self.config.build.content.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, format!("---\n{front}\n---\nBody of {rel}.\n")).unwrap();
        path
    }

    pub fn template(&self, rel: &str, source: &str) {
        let path = self.config.build.templates.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, source).unwrap();
    }

    pub fn router(&self) -> UrlRouter {
        let ctx = Arc::new(BuildContext::new(&self.config, Mode::Production));
        UrlRouter::new(ctx, Arc::new(Translator::default()))
    }

    /// Discover templates, then parse content against their layouts.
    pub fn load(&self) -> (ContentStore, TemplateSet) {
        let templates = TemplateSet::discover(&self.config.build.templates).unwrap();
        let mut store = ContentStore::new(
            self.router(),
            Arc::new(MarkdownRenderer::new()),
            templates.layouts(),
        )
        .unwrap();
        store.load_all(true).unwrap();
        (store, templates)
    }
}
