//! Content errors and per-document warnings.

use std::{fmt, path::PathBuf};
use thiserror::Error;

/// Failures that abort loading the content collection.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content directory `{0}` not found")]
    MissingContentDir(PathBuf),

    #[error("IO error at `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("cache snapshot `{0}` is unreadable")]
    Cache(PathBuf, #[source] serde_json::Error),

    #[error("`{}` and `{}` both resolve to `{url}`", first.display(), second.display())]
    DuplicateUrl {
        url: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Why a single document was left out. The scan always continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentWarning {
    Unreadable { path: PathBuf, message: String },
    MissingField { path: PathBuf, field: &'static str },
    InvalidDate { path: PathBuf, value: String },
    UnknownLayout { path: PathBuf, layout: String },
    UnknownLocale { path: PathBuf, locale: String },
    InvalidTag { path: PathBuf, tag: String },
}

impl ContentWarning {
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Unreadable { path, .. }
            | Self::MissingField { path, .. }
            | Self::InvalidDate { path, .. }
            | Self::UnknownLayout { path, .. }
            | Self::UnknownLocale { path, .. }
            | Self::InvalidTag { path, .. } => path,
        }
    }
}

impl fmt::Display for ContentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.path().display();
        match self {
            Self::Unreadable { message, .. } => write!(f, "{path}: {message}"),
            Self::MissingField { field, .. } => write!(f, "{path}: missing `{field}`"),
            Self::InvalidDate { value, .. } => write!(f, "{path}: invalid date `{value}`"),
            Self::UnknownLayout { layout, .. } => write!(f, "{path}: unknown layout `{layout}`"),
            Self::UnknownLocale { locale, .. } => write!(f, "{path}: unsupported locale `{locale}`"),
            Self::InvalidTag { tag, .. } => write!(f, "{path}: invalid tag `{tag}`"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_url_names_both_files() {
        let err = ContentError::DuplicateUrl {
            url: "/posts/a.html".into(),
            first: "posts/a.md".into(),
            second: "posts/2021/a.md".into(),
        };
        let msg = err.to_string();

        assert!(msg.contains("posts/a.md"));
        assert!(msg.contains("posts/2021/a.md"));
        assert!(msg.contains("/posts/a.html"));
    }

    #[test]
    fn test_warning_display() {
        let warning = ContentWarning::UnknownLayout {
            path: "posts/a.md".into(),
            layout: "nonexistent".into(),
        };
        assert_eq!(warning.to_string(), "posts/a.md: unknown layout `nonexistent`");
    }
}
