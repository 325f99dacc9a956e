//! Tera environment with the site's URL, date and translation helpers.
//!
//! | helper           | arguments                 | returns                    |
//! |------------------|---------------------------|----------------------------|
//! | `url`            | `path`, `locale?`         | site-relative URL          |
//! | `root_url`       | `path`, `locale?`         | absolute URL               |
//! | `post_url`       | `post`, `locale?`         | document URL               |
//! | `post_root_url`  | `post`, `locale?`         | absolute document URL      |
//! | `tag_url`        | `tag`, `locale?`          | tag page URL               |
//! | `tag_root_url`   | `tag`, `locale?`          | absolute tag page URL      |
//! | `format_date`    | `date`, `locale?`         | date in the locale format  |
//! | `format_datetime`| `date`, `locale?`         | timestamp                  |
//! | `t`              | `key`, `locale?`          | translated string          |

use super::{RenderError, TemplateSet, TemplateSource};
use crate::content::{Document, PublishedAt};
use crate::router::UrlRouter;
use crate::utils::date::parse_datetime;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tera::{Context, Tera, Value};

type Args = HashMap<String, Value>;

pub struct Compiler {
    tera: Tera,
}

impl Compiler {
    /// Register every template at once so `extends` and `include` resolve
    /// regardless of discovery order.
    pub fn new(templates: &TemplateSet, router: &UrlRouter) -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        register_helpers(&mut tera, router);

        tera.add_raw_templates(
            templates
                .all()
                .iter()
                .map(|t| (t.name.as_str(), t.source.as_str())),
        )
        .map_err(|e| RenderError::template("templates", &e))?;

        Ok(Self { tera })
    }

    pub fn compile(&self, template: &TemplateSource, context: &Context) -> Result<String, RenderError> {
        self.tera
            .render(&template.name, context)
            .map_err(|e| RenderError::template(&template.name, &e))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn register_helpers(tera: &mut Tera, router: &UrlRouter) {
    tera.register_function("url", path_helper(router, "path", UrlRouter::url));
    tera.register_function("root_url", path_helper(router, "path", UrlRouter::root_url));
    tera.register_function("tag_url", path_helper(router, "tag", UrlRouter::tag_path));
    tera.register_function("tag_root_url", path_helper(router, "tag", UrlRouter::tag_root_path));
    tera.register_function("post_url", post_helper(router, UrlRouter::document_path));
    tera.register_function("post_root_url", post_helper(router, UrlRouter::document_root_path));
    tera.register_function("format_date", date_helper(router, UrlRouter::format_date));
    tera.register_function("format_datetime", date_helper(router, UrlRouter::format_datetime));

    let r = router.clone();
    tera.register_function("t", move |args: &Args| -> tera::Result<Value> {
        let key = required_str(args, "key")?;
        let locale = r.context().effective_locale(optional_str(args, "locale"));
        Ok(Value::String(r.translator().translate(key, locale)))
    });
}

fn path_helper(
    router: &UrlRouter,
    arg: &'static str,
    f: fn(&UrlRouter, &str, Option<&str>) -> String,
) -> impl Fn(&Args) -> tera::Result<Value> + Send + Sync + 'static {
    let router = router.clone();
    move |args: &Args| {
        let value = required_str(args, arg)?;
        Ok(Value::String(f(&router, value, optional_str(args, "locale"))))
    }
}

fn post_helper(
    router: &UrlRouter,
    f: fn(&UrlRouter, &Document, Option<&str>) -> String,
) -> impl Fn(&Args) -> tera::Result<Value> + Send + Sync + 'static {
    let router = router.clone();
    move |args: &Args| {
        let doc = post_arg(args)?;
        Ok(Value::String(f(&router, &doc, optional_str(args, "locale"))))
    }
}

fn date_helper(
    router: &UrlRouter,
    f: fn(&UrlRouter, &DateTime<Utc>, Option<&str>) -> String,
) -> impl Fn(&Args) -> tera::Result<Value> + Send + Sync + 'static {
    let router = router.clone();
    move |args: &Args| {
        let raw = required_str(args, "date")?;
        let date = parse_datetime(raw).ok_or_else(|| tera::Error::msg(format!("invalid date `{raw}`")))?;
        Ok(Value::String(f(&router, &date, optional_str(args, "locale"))))
    }
}

/// Rebuild the routing-relevant part of a document from its template view.
fn post_arg(args: &Args) -> tera::Result<Document> {
    let post = args
        .get("post")
        .and_then(Value::as_object)
        .ok_or_else(|| tera::Error::msg("`post` must be a document"))?;
    let field = |name: &str| post.get(name).and_then(Value::as_str);

    Ok(Document {
        slug: field("slug").unwrap_or_default().to_owned(),
        published_at: field("published_at")
            .and_then(parse_datetime)
            .map(PublishedAt::Valid),
        locale: field("locale").map(str::to_owned),
        ..Document::default()
    })
}

fn required_str<'a>(args: &'a Args, name: &str) -> tera::Result<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| tera::Error::msg(format!("missing string argument `{name}`")))
}

fn optional_str<'a>(args: &'a Args, name: &str) -> Option<&'a str> {
    args.get(name).and_then(Value::as_str).filter(|s| !s.is_empty())
}
