//! Named build tasks and the sequences composed from them.

use crate::template::TemplateKind;
use std::{fmt, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    LogOutputDir,
    CleanOutput,
    CleanCache,
    SetDevMode,
    CopyAssets,
    LoadContent,
    RenderTemplates,
    /// Re-render one template category across all locales.
    RenderCategory(TemplateKind),
    /// Parse and render only these content files.
    RenderDocuments(Vec<PathBuf>),
    GenerateFeed,
    BuildCss,
    ReloadConfig,
    NotifyReload,
    Serve,
}

impl Task {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LogOutputDir => "log-output-dir",
            Self::CleanOutput => "clean-output",
            Self::CleanCache => "clean-cache",
            Self::SetDevMode => "set-dev-mode",
            Self::CopyAssets => "copy-assets",
            Self::LoadContent => "load-content",
            Self::RenderTemplates => "render-templates",
            Self::RenderCategory(_) => "render-category",
            Self::RenderDocuments(_) => "render-documents",
            Self::GenerateFeed => "generate-feed",
            Self::BuildCss => "build-css",
            Self::ReloadConfig => "reload-config",
            Self::NotifyReload => "notify-reload",
            Self::Serve => "serve",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RenderCategory(kind) => write!(f, "{}({})", self.name(), kind.dir_name()),
            Self::RenderDocuments(paths) => write!(f, "{}({})", self.name(), paths.len()),
            _ => f.write_str(self.name()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sequence {
    /// Full production build.
    Build,
    /// Dev build, then start serving.
    Serve,
    /// Rebuild everything after `quire.toml` or a locale table changed.
    ConfigReload,
}

impl Sequence {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Serve => "serve",
            Self::ConfigReload => "config-reload",
        }
    }

    pub fn tasks(self) -> Vec<Task> {
        match self {
            Self::Build => vec![
                Task::LogOutputDir,
                Task::CleanOutput,
                Task::CopyAssets,
                Task::LoadContent,
                Task::RenderTemplates,
                Task::GenerateFeed,
                Task::BuildCss,
            ],
            Self::Serve => {
                let mut tasks = vec![Task::SetDevMode];
                tasks.extend(Self::Build.tasks());
                tasks.push(Task::Serve);
                tasks
            }
            Self::ConfigReload => vec![
                Task::ReloadConfig,
                Task::SetDevMode,
                Task::LoadContent,
                Task::RenderTemplates,
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Idle,
    Running(Sequence),
    Failed,
    Serving,
}

/// A task failed; the rest of its sequence was skipped.
#[derive(Debug, Error)]
#[error("task `{task}` failed: {source:#}")]
pub struct TaskError {
    pub task: &'static str,
    #[source]
    pub source: anyhow::Error,
}
