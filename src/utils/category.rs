//! File category classification for watch mode.
//!
//! | Category          | Reaction                                    | Example                 |
//! |-------------------|---------------------------------------------|-------------------------|
//! | Content           | re-render the touched documents only        | `posts/2021/hello.md`   |
//! | Template(kind)    | re-render that template category            | `templates/posts/*`     |
//! | Partial           | re-render every template                    | `templates/partials/*`  |
//! | Asset             | copy assets, then reload                    | `assets/img/logo.png`   |
//! | Config / Locale   | reload config and re-render everything      | `quire.toml`, `locales/`|
//! | Unknown           | ignored                                     |                         |

use crate::context::BuildContext;
use crate::template::TemplateKind;
use std::{
    env,
    path::{Component, Path, PathBuf},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileCategory {
    Content,
    Template(TemplateKind),
    Partial,
    Asset,
    Config,
    Locale,
    Unknown,
}

/// Watched roots: directories recursively, the config file on its own.
pub fn watched_paths(ctx: &BuildContext) -> Vec<(PathBuf, bool)> {
    vec![
        (ctx.content_dir.clone(), true),
        (ctx.templates_dir.clone(), true),
        (ctx.assets_dir.clone(), true),
        (ctx.locales_dir.clone(), true),
        (ctx.config_path.clone(), false),
    ]
}

/// Categorize a file path to determine how changes should be handled.
pub fn categorize_path(path: &Path, ctx: &BuildContext) -> FileCategory {
    let path = normalize_path(path);

    if path == ctx.config_path {
        FileCategory::Config
    } else if path.starts_with(&ctx.locales_dir) {
        FileCategory::Locale
    } else if let Ok(rel) = path.strip_prefix(&ctx.templates_dir) {
        match rel.components().next() {
            Some(Component::Normal(dir)) => TemplateKind::from_dir_name(&dir.to_string_lossy())
                .map_or(FileCategory::Partial, FileCategory::Template),
            _ => FileCategory::Partial,
        }
    } else if path.starts_with(&ctx.content_dir) {
        FileCategory::Content
    } else if path.starts_with(&ctx.assets_dir) {
        FileCategory::Asset
    } else {
        FileCategory::Unknown
    }
}

/// Normalize a path to absolute form for reliable comparison.
///
/// Config paths are already canonicalized, so we need to canonicalize
/// incoming paths (e.g., from file watcher) before comparison.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}
