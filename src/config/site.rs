//! `[site]` section configuration.
//!
//! Site identity, locales and date formats.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[site]` section in quire.toml.
///
/// # Example
/// ```toml
/// [site]
/// title = "meblog"
/// description = "A DIY blog"
/// url = "https://alice.github.io"
/// base_path = "blog"
/// locales = ["en", "fr"]
/// default_locale = "en"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteSection {
    /// Site name shown in headers and the feed channel.
    #[serde(default = "defaults::site::title")]
    #[educe(Default = defaults::site::title())]
    pub title: String,

    #[serde(default = "defaults::site::description")]
    #[educe(Default = defaults::site::description())]
    pub description: String,

    /// Absolute base URL, e.g. "https://example.com".
    /// Required for feed generation in production.
    #[serde(default = "defaults::site::url")]
    #[educe(Default = defaults::site::url())]
    pub url: Option<String>,

    /// Base context path prepended to every URL, e.g. "blog".
    #[serde(default = "defaults::site::base_path")]
    #[educe(Default = defaults::site::base_path())]
    pub base_path: String,

    #[serde(default = "defaults::site::author")]
    #[educe(Default = defaults::site::author())]
    pub author: String,

    #[serde(default = "defaults::site::email")]
    #[educe(Default = defaults::site::email())]
    pub email: String,

    /// Every locale pages are rendered for.
    #[serde(default = "defaults::site::locales")]
    #[educe(Default = defaults::site::locales())]
    pub locales: Vec<String>,

    /// Locale whose URLs carry no locale segment.
    #[serde(default = "defaults::site::default_locale")]
    #[educe(Default = defaults::site::default_locale())]
    pub default_locale: String,

    /// chrono strftime pattern used by `format_date`.
    #[serde(default = "defaults::site::date_format")]
    #[educe(Default = defaults::site::date_format())]
    pub date_format: String,

    /// chrono strftime pattern used by `format_datetime`.
    #[serde(default = "defaults::site::datetime_format")]
    #[educe(Default = defaults::site::datetime_format())]
    pub datetime_format: String,

    /// Tags that always get a tag page, even with no documents.
    #[serde(default)]
    pub predefined_tags: Vec<String>,

    /// Size of the `latest_posts` template list.
    #[serde(default = "defaults::site::latest_posts")]
    #[educe(Default = defaults::site::latest_posts())]
    pub latest_posts: usize,
}

#[cfg(test)]
mod tests {
    use super::super::SiteConfig;

    #[test]
    fn test_site_section_full() {
        let config = r#"
            [site]
            title = "meblog"
            description = "A DIY blog engine"
            url = "https://alice.github.io"
            base_path = "blog"
            locales = ["en", "fr"]
            default_locale = "en"
            date_format = "%Y-%m-%d"
            predefined_tags = ["rust", "life"]
            latest_posts = 3
        "#;
        let config: SiteConfig = toml::from_str(config).unwrap();

        assert_eq!(config.site.title, "meblog");
        assert_eq!(config.site.url.as_deref(), Some("https://alice.github.io"));
        assert_eq!(config.site.base_path, "blog");
        assert_eq!(config.site.locales, vec!["en", "fr"]);
        assert_eq!(config.site.date_format, "%Y-%m-%d");
        assert_eq!(config.site.predefined_tags, vec!["rust", "life"]);
        assert_eq!(config.site.latest_posts, 3);
    }

    #[test]
    fn test_site_section_defaults() {
        let config: SiteConfig = toml::from_str("[site]\ntitle = \"Test\"").unwrap();

        assert_eq!(config.site.description, "A markdown blog");
        assert_eq!(config.site.url, None);
        assert_eq!(config.site.base_path, "");
        assert_eq!(config.site.locales, vec!["en"]);
        assert_eq!(config.site.default_locale, "en");
        assert_eq!(config.site.date_format, "%d/%m/%Y");
        assert_eq!(config.site.datetime_format, "%d/%m/%Y - %H:%M");
        assert!(config.site.predefined_tags.is_empty());
        assert_eq!(config.site.latest_posts, 5);
    }

    #[test]
    fn test_unknown_field_rejection() {
        let config = r#"
            [site]
            title = "Test"
            site_name = "legacy key"
        "#;
        let result: Result<SiteConfig, _> = toml::from_str(config);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("unknown field"));
    }
}
