//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// Common Defaults
// ============================================================================

pub fn r#true() -> bool {
    true
}

pub fn r#false() -> bool {
    false
}

// ============================================================================
// [site] Section Defaults
// ============================================================================

pub mod site {
    pub fn title() -> String {
        "quire".into()
    }

    pub fn description() -> String {
        "A markdown blog".into()
    }

    pub fn url() -> Option<String> {
        None
    }

    pub fn base_path() -> String {
        "".into()
    }

    pub fn author() -> String {
        "<YOUR_NAME>".into()
    }

    pub fn email() -> String {
        "user@noreply.quire".into()
    }

    pub fn locales() -> Vec<String> {
        vec!["en".into()]
    }

    pub fn default_locale() -> String {
        "en".into()
    }

    pub fn date_format() -> String {
        "%d/%m/%Y".into()
    }

    pub fn datetime_format() -> String {
        "%d/%m/%Y - %H:%M".into()
    }

    pub fn latest_posts() -> usize {
        5
    }
}

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    use std::path::PathBuf;

    pub fn root() -> Option<PathBuf> {
        None
    }

    pub fn content() -> PathBuf {
        "posts".into()
    }

    pub fn templates() -> PathBuf {
        "templates".into()
    }

    pub fn assets() -> PathBuf {
        "assets".into()
    }

    pub fn locales() -> PathBuf {
        "locales".into()
    }

    pub fn cache() -> PathBuf {
        "data".into()
    }

    pub fn output() -> PathBuf {
        "docs".into()
    }

    pub fn dev_output() -> PathBuf {
        "dev".into()
    }

    pub fn url_style() -> crate::router::UrlStyle {
        crate::router::UrlStyle::default()
    }

    pub fn separator() -> String {
        "---".into()
    }

    pub fn draft_marker() -> String {
        "draft".into()
    }

    pub mod feed {
        use std::path::PathBuf;

        pub fn path() -> PathBuf {
            "rss.xml".into()
        }
    }

    pub mod css {
        use std::path::PathBuf;

        pub fn input() -> Option<PathBuf> {
            None
        }

        pub fn output() -> PathBuf {
            "css/style.css".into()
        }

        pub fn command() -> Vec<String> {
            vec!["tailwindcss".into()]
        }
    }

    pub mod highlight {
        use std::path::PathBuf;

        pub fn theme() -> String {
            "InspiredGitHub".into()
        }

        pub fn path() -> PathBuf {
            "css/highlight.css".into()
        }
    }
}

// ============================================================================
// [serve] Section Defaults
// ============================================================================

pub mod serve {
    pub fn interface() -> String {
        "127.0.0.1".into()
    }

    pub fn port() -> u16 {
        3000
    }
}
