//! Document templates: one output per document bound to the layout.

use super::{OutputFile, RenderEnv, RenderError, Renderable, TemplateSource, document_view};
use crate::content::Document;
use rayon::prelude::*;
use std::path::PathBuf;

pub struct DocumentTemplate<'a> {
    template: &'a TemplateSource,
    env: &'a RenderEnv<'a>,
}

impl<'a> DocumentTemplate<'a> {
    pub const fn new(template: &'a TemplateSource, env: &'a RenderEnv<'a>) -> Self {
        Self { template, env }
    }

    /// The layout name this template serves.
    pub fn layout(&self) -> &str {
        self.template.stem()
    }

    fn binds(&self, doc: &Document) -> bool {
        doc.layout == self.layout()
    }

    /// Render the bound documents among `docs`, one result per document so
    /// a failure doesn't hide the others.
    pub fn render_subset(&self, docs: &[&Document]) -> Vec<(PathBuf, Result<OutputFile, RenderError>)> {
        docs.par_iter()
            .filter(|doc| self.binds(doc))
            .map(|doc| (doc.source.clone(), self.render_one(doc)))
            .collect()
    }

    fn render_one(&self, doc: &Document) -> Result<OutputFile, RenderError> {
        let router = self.env.router();
        let locale = self.env.context().effective_locale(doc.locale.as_deref());

        let mut context = self.env.base_context(self.template, locale);
        context.insert("post", &document_view(doc, router));

        Ok(OutputFile {
            path: router.document_output(doc),
            contents: self.env.compiler().compile(self.template, &context)?,
        })
    }
}

impl Renderable for DocumentTemplate<'_> {
    fn render(&self) -> Result<Vec<OutputFile>, RenderError> {
        self.env
            .documents()
            .par_iter()
            .filter(|doc| self.binds(doc))
            .map(|doc| self.render_one(doc))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::fixture::Fixture;
    use crate::template::{Compiler, TemplateKind};

    #[test]
    fn test_documents_bind_by_layout() {
        let site = Fixture::new();
        site.template("posts/note.html", "note:{{ post.title }}");
        site.post("a.md", "title: A\npublishedAt: 2021-01-02\nslug: a");
        site.post("b.md", "title: B\npublishedAt: 2021-01-03\nslug: b\nlayout: note");
        site.post("c.md", "title: C\npublishedAt: 2021-01-04\nslug: c\nlocale: fr");

        let (store, templates) = site.load();
        let compiler = Compiler::new(&templates, store.router()).unwrap();
        let env = RenderEnv::new(&compiler, &store, &[]);

        let mut outputs: Vec<_> = templates
            .by_kind(TemplateKind::Document)
            .flat_map(|t| DocumentTemplate::new(t, &env).render().unwrap())
            .map(|o| (o.path, o.contents))
            .collect();
        outputs.sort();

        assert_eq!(
            outputs,
            [
                (PathBuf::from("fr/posts/c.html"), "C".to_string()),
                (PathBuf::from("posts/a.html"), "A".to_string()),
                (PathBuf::from("posts/b.html"), "note:B".to_string()),
            ]
        );
    }

    #[test]
    fn test_render_subset_sees_fresh_document() {
        let site = Fixture::new();
        site.template(
            "posts/post.html",
            "{{ post.title }}:{% for p in all_posts %}{{ p.title }},{% endfor %}",
        );
        let a = site.post("a.md", "title: A\npublishedAt: 2021-01-02\nslug: a");
        site.post("b.md", "title: B\npublishedAt: 2021-01-03\nslug: b");

        let (store, templates) = site.load();
        site.post("a.md", "title: A2\npublishedAt: 2021-01-09\nslug: a");
        let fresh = store.parse_subset(&[a.clone()]).documents;

        let compiler = Compiler::new(&templates, store.router()).unwrap();
        let env = RenderEnv::new(&compiler, &store, &fresh);
        let template = templates.by_kind(TemplateKind::Document).next().unwrap();

        let docs: Vec<_> = fresh.iter().collect();
        let results = DocumentTemplate::new(template, &env).render_subset(&docs);

        assert_eq!(results.len(), 1);
        let (source, output) = &results[0];
        assert_eq!(source, &a);
        assert_eq!(output.as_ref().unwrap().contents, "A2:A2,B,");
    }
}
