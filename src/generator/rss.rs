//! RSS feed generation.
//!
//! One channel for the whole site, one item per published document,
//! newest first, written to `[build.feed] path` under the output root.

use crate::{
    content::{ContentStore, Document},
    context::BuildContext,
    log,
    router::UrlRouter,
    utils::{
        date::to_rfc822,
        minify::{MinifyType, minify},
    },
};
use anyhow::{Result, anyhow};
use regex::Regex;
use rss::{CategoryBuilder, ChannelBuilder, GuidBuilder, ItemBuilder, validation::Validate};
use std::{fs, path::PathBuf, sync::LazyLock};

// ============================================================================
// Public API
// ============================================================================

/// Write the feed if enabled. Returns the written path.
pub fn build_feed(store: &ContentStore) -> Result<Option<PathBuf>> {
    let ctx = store.context();
    let Some(feed) = ctx.feed.as_ref() else {
        return Ok(None);
    };

    let xml = RssFeed::new(store).into_xml()?;
    let xml = minify(MinifyType::Xml(xml.as_bytes()), ctx);
    let path = ctx.output_root.join(feed);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, &*xml)?;

    log!("feed"; "{}", path.file_name().unwrap_or_default().to_string_lossy());
    Ok(Some(path))
}

// ============================================================================
// RssFeed Implementation
// ============================================================================

struct RssFeed<'a> {
    router: &'a UrlRouter,
    documents: Vec<&'a Document>,
}

impl<'a> RssFeed<'a> {
    fn new(store: &'a ContentStore) -> Self {
        Self {
            router: store.router(),
            documents: store.get_documents(None),
        }
    }

    fn into_xml(self) -> Result<String> {
        let ctx = self.router.context();
        let items: Vec<_> = self
            .documents
            .iter()
            .map(|doc| document_to_item(doc, self.router))
            .collect();

        let channel = ChannelBuilder::default()
            .title(&ctx.site_name)
            .link(self.router.root_url("/", None))
            .description(&ctx.site_description)
            .language(Some(ctx.default_locale.clone()))
            .managing_editor(channel_author(ctx))
            .generator(Some(env!("CARGO_PKG_NAME").to_string()))
            .items(items)
            .build();

        channel
            .validate()
            .map_err(|e| anyhow!("rss validation failed: {e}"))?;
        Ok(channel.to_string())
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn document_to_item(doc: &Document, router: &UrlRouter) -> rss::Item {
    let link = router.document_root_path(doc, None);
    let categories: Vec<_> = doc
        .tags
        .iter()
        .map(|tag| CategoryBuilder::default().name(tag.clone()).build())
        .collect();

    ItemBuilder::default()
        .title(Some(doc.title.clone()))
        .link(Some(link.clone()))
        .guid(Some(GuidBuilder::default().permalink(true).value(link).build()))
        .description(Some(doc.excerpt.clone()))
        .pub_date(doc.published().as_ref().map(to_rfc822))
        .categories(categories)
        .build()
}

/// RSS wants `email (Name)`. Use the configured author when it already has
/// that shape, else combine author and email. Nothing without an email.
fn channel_author(ctx: &BuildContext) -> Option<String> {
    static RE_VALID_AUTHOR: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}[ \t]*\([^)]+\)$").unwrap()
    });

    if RE_VALID_AUTHOR.is_match(&ctx.author) {
        return Some(ctx.author.clone());
    }
    match (ctx.email.is_empty(), ctx.author.is_empty()) {
        (true, _) => None,
        (false, true) => Some(ctx.email.clone()),
        (false, false) => Some(format!("{} ({})", ctx.email, ctx.author)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::fixture::Fixture;

    #[test]
    fn test_feed_items_newest_first() {
        let mut site = Fixture::new();
        site.config.build.feed.enable = true;
        site.post("a.md", "title: Older\npublishedAt: 2021-01-02\nslug: older\ntags: rust, web\nexcerpt: First one");
        site.post("b.md", "title: Newer\npublishedAt: 2021-03-04 10:30\nslug: newer");

        let (store, _) = site.load();
        let path = build_feed(&store).unwrap().unwrap();
        let channel = rss::Channel::read_from(&fs::read(&path).unwrap()[..]).unwrap();

        let titles: Vec<_> = channel.items().iter().map(|i| i.title().unwrap()).collect();
        assert_eq!(titles, ["Newer", "Older"]);

        let older = &channel.items()[1];
        assert_eq!(older.link(), Some("https://blog.example.com/posts/older.html"));
        assert_eq!(older.pub_date(), Some("Sat, 02 Jan 2021 00:00:00 GMT"));
        assert_eq!(older.description(), Some("First one"));
        let tags: Vec<_> = older.categories().iter().map(|c| c.name()).collect();
        assert_eq!(tags, ["rust", "web"]);

        assert_eq!(channel.link(), "https://blog.example.com/");
    }

    #[test]
    fn test_item_without_excerpt_keeps_description() {
        let mut site = Fixture::new();
        site.config.build.feed.enable = true;
        site.post("a.md", "title: Bare\npublishedAt: 2021-01-02\nslug: bare");

        let (store, _) = site.load();
        let item = document_to_item(store.get_documents(None)[0], store.router());
        assert_eq!(item.description(), Some(""));

        assert!(RssFeed::new(&store).into_xml().is_ok());
    }

    #[test]
    fn test_feed_disabled() {
        let mut site = Fixture::new();
        site.config.build.feed.enable = false;
        let (store, _) = site.load();
        assert!(build_feed(&store).unwrap().is_none());
    }

    #[test]
    fn test_channel_author() {
        let site = Fixture::new();
        let mut ctx = BuildContext::new(&site.config, crate::context::Mode::Production);

        ctx.author = "Alice".into();
        ctx.email = "alice@example.com".into();
        assert_eq!(channel_author(&ctx).as_deref(), Some("alice@example.com (Alice)"));

        ctx.author = "bob@example.com (Bob)".into();
        assert_eq!(channel_author(&ctx).as_deref(), Some("bob@example.com (Bob)"));

        ctx.author = "Carol".into();
        ctx.email.clear();
        assert_eq!(channel_author(&ctx), None);
    }
}
