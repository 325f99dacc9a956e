//! Minification for rendered HTML and the XML feed.
//!
//! `minify` is a no-op unless the active `BuildContext` asks for it, which
//! only happens for production builds with `[build] minify = true`.

use crate::context::BuildContext;
use std::borrow::Cow;

// ============================================================================
// Types
// ============================================================================

/// Content type for minification.
pub enum MinifyType<'a> {
    Html(&'a [u8]),
    Xml(&'a [u8]),
}

// ============================================================================
// Unified Minify Function
// ============================================================================

/// Minify content when the context enables it.
///
/// Returns `Cow::Borrowed` if minify disabled, `Cow::Owned` if minified.
pub fn minify<'a>(content: MinifyType<'a>, ctx: &BuildContext) -> Cow<'a, [u8]> {
    match (ctx.minify, content) {
        (false, MinifyType::Html(bytes) | MinifyType::Xml(bytes)) => Cow::Borrowed(bytes),
        (true, MinifyType::Html(html)) => Cow::Owned(minify_html_inner(html)),
        (true, MinifyType::Xml(xml)) => Cow::Owned(minify_xml_inner(xml)),
    }
}

// ============================================================================
// Internal Implementation
// ============================================================================

fn minify_html_inner(html: &[u8]) -> Vec<u8> {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = false;
    cfg.minify_css = true;
    cfg.minify_js = true;
    cfg.remove_bangs = true;
    cfg.remove_processing_instructions = true;
    minify_html::minify(html, &cfg)
}

/// Strip indentation and blank lines. Text inside elements is kept as is.
fn minify_xml_inner(xml: &[u8]) -> Vec<u8> {
    String::from_utf8_lossy(xml)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<String>()
        .into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::context::Mode;

    fn ctx(minify: bool) -> BuildContext {
        let mut config = SiteConfig::default();
        config.build.minify = minify;
        BuildContext::new(&config, Mode::Production)
    }

    #[test]
    fn test_minify_html() {
        let html = b"<html>\n  <body>\n    <p>Hello World</p>\n  </body>\n</html>";

        let minified = minify(MinifyType::Html(html), &ctx(true));
        let text = String::from_utf8_lossy(&minified);

        assert!(!text.contains("\n  "));
        assert!(text.contains("<p>Hello World</p>"));
    }

    #[test]
    fn test_minify_disabled_borrows() {
        let html = b"<html>\n  <body>\n  </body>\n</html>";
        let result = minify(MinifyType::Html(html), &ctx(false));

        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(&*result, html);
    }

    #[test]
    fn test_dev_mode_never_minifies() {
        let config = SiteConfig::default();
        let addr = "127.0.0.1:3000".parse().unwrap();
        let ctx = BuildContext::new(&config, Mode::Dev { addr, reload_port: None });

        let xml = b"<rss>\n  <channel/>\n</rss>";
        assert_eq!(&*minify(MinifyType::Xml(xml), &ctx), xml.as_slice());
    }

    #[test]
    fn test_minify_feed_xml() {
        let xml = br#"<?xml version="1.0" encoding="utf-8"?>
<rss version="2.0">
  <channel>
    <title>Test</title>

    <item>
      <title>Post</title>
    </item>
  </channel>
</rss>"#;
        let result = minify(MinifyType::Xml(xml), &ctx(true));

        assert_eq!(
            &*result,
            br#"<?xml version="1.0" encoding="utf-8"?><rss version="2.0"><channel><title>Test</title><item><title>Post</title></item></channel></rss>"#
        );
    }
}
