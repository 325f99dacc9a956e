//! Page templates: one output per template and locale.

use super::{OutputFile, RenderEnv, RenderError, Renderable, TemplateSource};
use std::path::{Path, PathBuf};

pub struct PageTemplate<'a> {
    template: &'a TemplateSource,
    locale: &'a str,
    env: &'a RenderEnv<'a>,
}

impl<'a> PageTemplate<'a> {
    pub const fn new(template: &'a TemplateSource, locale: &'a str, env: &'a RenderEnv<'a>) -> Self {
        Self { template, locale, env }
    }

    /// `pages/about/index.html` renders to `about/index.html`, under the
    /// locale directory for non-default locales.
    pub fn output_path(&self) -> PathBuf {
        let relative = Path::new(self.template.relative_name()).with_extension("html");
        self.env
            .router()
            .output_path(&relative.to_string_lossy(), Some(self.locale))
    }
}

impl Renderable for PageTemplate<'_> {
    fn render(&self) -> Result<Vec<OutputFile>, RenderError> {
        let context = self.env.base_context(self.template, self.locale);
        let contents = self.env.compiler().compile(self.template, &context)?;

        Ok(vec![OutputFile {
            path: self.output_path(),
            contents,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::fixture::Fixture;
    use crate::template::{Compiler, TemplateKind};

    #[test]
    fn test_page_per_locale() {
        let site = Fixture::new();
        site.template(
            "pages/index.html",
            "{{ locale }}:{% for p in posts %}{{ p.title }},{% endfor %}",
        );
        site.post("a.md", "title: A\npublishedAt: 2021-01-02");
        site.post("b.md", "title: B\npublishedAt: 2021-01-03\nlocale: fr");
        site.post("c.md", "title: C\npublishedAt: 2021-01-04");

        let (store, templates) = site.load();
        let compiler = Compiler::new(&templates, store.router()).unwrap();
        let env = RenderEnv::new(&compiler, &store, &[]);
        let template = templates.by_kind(TemplateKind::Page).next().unwrap();

        let en = PageTemplate::new(template, "en", &env).render().unwrap();
        let fr = PageTemplate::new(template, "fr", &env).render().unwrap();

        assert_eq!(en[0].path, PathBuf::from("index.html"));
        assert_eq!(en[0].contents, "en:C,A,");
        assert_eq!(fr[0].path, PathBuf::from("fr/index.html"));
        assert_eq!(fr[0].contents, "fr:B,");
    }

    #[test]
    fn test_nested_page_and_site_context() {
        let site = Fixture::new();
        site.template(
            "pages/about/index.htm",
            "{{ site.title }}|{{ site.url | safe }}|{{ template_name | safe }}|{{ latest_posts | length }}",
        );
        for day in 1..=7 {
            site.post(&format!("p{day}.md"), &format!("title: P{day}\npublishedAt: 2021-01-0{day}"));
        }

        let (store, templates) = site.load();
        let compiler = Compiler::new(&templates, store.router()).unwrap();
        let env = RenderEnv::new(&compiler, &store, &[]);
        let template = templates.by_kind(TemplateKind::Page).next().unwrap();

        let out = PageTemplate::new(template, "en", &env).render().unwrap();
        assert_eq!(out[0].path, PathBuf::from("about/index.html"));
        assert_eq!(
            out[0].contents,
            "Fixture|https://blog.example.com|pages/about/index.htm|5"
        );
    }
}
