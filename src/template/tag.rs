//! Tag templates: one output per known tag and locale.

use super::{OutputFile, RenderEnv, RenderError, Renderable, TemplateSource};
use crate::router::tag_partial_path;

pub struct TagTemplate<'a> {
    template: &'a TemplateSource,
    locale: &'a str,
    env: &'a RenderEnv<'a>,
}

impl<'a> TagTemplate<'a> {
    pub const fn new(template: &'a TemplateSource, locale: &'a str, env: &'a RenderEnv<'a>) -> Self {
        Self { template, locale, env }
    }

    /// `tags/tag.html` writes `tags/<tag>.html`; any other stem names its
    /// own directory.
    fn directory(&self) -> &str {
        match self.template.stem() {
            "tag" => "tags",
            stem => stem,
        }
    }
}

impl Renderable for TagTemplate<'_> {
    fn render(&self) -> Result<Vec<OutputFile>, RenderError> {
        let router = self.env.router();
        let base = self.env.base_context(self.template, self.locale);

        self.env
            .tag_list()
            .into_iter()
            .map(|tag| -> Result<OutputFile, RenderError> {
                let mut context = base.clone();
                context.insert("posts_by_tag", &self.env.posts_by_tag(&tag, self.locale));
                context.insert("tag", &tag);

                Ok(OutputFile {
                    path: router.output_path(&tag_partial_path(self.directory(), &tag), Some(self.locale)),
                    contents: self.env.compiler().compile(self.template, &context)?,
                })
            })
            .collect()
    }
}
