//! File system watcher for dev mode.
//!
//! Watches content, templates, assets, locales and the config file, and maps
//! each batch of changes to the smallest set of build tasks.
//!
//! ```text
//! ┌──────────┐    ┌───────────┐    ┌──────────────┐    ┌──────────────┐
//! │ notify   │───▶│ Debouncer │───▶│ plan_changes │───▶│ Orchestrator │
//! │ events   │    │ (300ms)   │    │  → [Task]    │    │  run_task    │
//! └──────────┘    └───────────┘    └──────────────┘    └──────────────┘
//! ```
//!
//! A failed batch is reported and the session keeps running.

use crate::{
    build::{Orchestrator, Sequence, Task},
    context::BuildContext,
    log,
    logger::WatchStatus,
    serve::shutdown_requested,
    utils::{
        category::{FileCategory, categorize_path, watched_paths},
        watch::{is_temp_file, wait_until_stable},
    },
};
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use std::{
    path::{Path, PathBuf},
    sync::mpsc::{RecvTimeoutError, channel},
    time::{Duration, Instant},
};

// =============================================================================
// Constants
// =============================================================================

const DEBOUNCE_MS: u64 = 300;
const REBUILD_COOLDOWN_MS: u64 = 800;
/// How often the loop wakes up to check for Ctrl+C.
const IDLE_POLL_MS: u64 = 500;
const STABLE_RETRIES: usize = 10;

// =============================================================================
// Debounce State
// =============================================================================

/// Batches rapid file events with debouncing and rebuild cooldown.
struct Debouncer {
    pending: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
    last_rebuild: Option<Instant>,
}

impl Debouncer {
    fn new() -> Self {
        Self {
            pending: FxHashSet::default(),
            last_event: None,
            last_rebuild: None,
        }
    }

    fn in_cooldown(&self) -> bool {
        self.last_rebuild
            .is_some_and(|t| t.elapsed() < Duration::from_millis(REBUILD_COOLDOWN_MS))
    }

    fn add(&mut self, event: Event) {
        for path in event.paths {
            if !is_temp_file(&path) {
                self.pending.insert(path);
            }
        }
        self.last_event = Some(Instant::now());
    }

    /// Events seen during the cooldown stay queued until it ends.
    fn ready(&self) -> bool {
        !self.pending.is_empty()
            && !self.in_cooldown()
            && self
                .last_event
                .is_some_and(|t| t.elapsed() >= Duration::from_millis(DEBOUNCE_MS))
    }

    fn take(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        let mut paths: Vec<_> = self.pending.drain().collect();
        paths.sort();
        paths
    }

    fn mark_rebuild(&mut self) {
        self.last_rebuild = Some(Instant::now());
    }

    fn timeout(&self) -> Duration {
        if self.pending.is_empty() {
            Duration::from_millis(IDLE_POLL_MS)
        } else {
            Duration::from_millis(DEBOUNCE_MS)
        }
    }
}

// =============================================================================
// Change Planning
// =============================================================================

/// What a batch of changed paths requires.
#[derive(Debug, PartialEq, Eq)]
enum Plan {
    /// Config or locale tables changed: rebuild everything.
    Reload,
    Tasks(Vec<Task>),
}

fn plan_changes(paths: &[PathBuf], ctx: &BuildContext) -> Plan {
    let mut categories = FxHashSet::default();
    let mut documents = Vec::new();

    for path in paths {
        let category = categorize_path(path, ctx);
        match category {
            FileCategory::Config | FileCategory::Locale => return Plan::Reload,
            FileCategory::Content if path.is_file() => documents.push(path.clone()),
            FileCategory::Content | FileCategory::Unknown => continue,
            _ => {}
        }
        categories.insert(category);
    }

    let mut tasks = Vec::new();
    if categories.contains(&FileCategory::Partial) {
        tasks.push(Task::RenderTemplates);
    } else {
        for kind in crate::template::TemplateKind::ALL {
            if categories.contains(&FileCategory::Template(kind)) {
                tasks.push(Task::RenderCategory(kind));
            }
        }
    }
    if !documents.is_empty() {
        tasks.push(Task::RenderDocuments(documents));
    }
    if categories.contains(&FileCategory::Asset) {
        tasks.push(Task::CopyAssets);
    }
    if !tasks.is_empty() {
        tasks.push(Task::NotifyReload);
    }
    Plan::Tasks(tasks)
}

/// Format path as relative to the site root for display.
fn rel_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

/// Run whatever `paths` require. Returns true when something was rebuilt.
fn handle_changes(orch: &mut Orchestrator, paths: &[PathBuf], status: &mut WatchStatus) -> bool {
    let root = orch.context().root.clone();
    let trigger = paths.iter().map(|p| rel_path(p, &root)).collect::<Vec<_>>().join(", ");

    let result = match plan_changes(paths, orch.context()) {
        Plan::Reload => orch
            .run_sequence(Sequence::ConfigReload)
            .and_then(|()| orch.run_task(&Task::NotifyReload)),
        Plan::Tasks(tasks) if tasks.is_empty() => return false,
        Plan::Tasks(tasks) => tasks.iter().try_for_each(|task| orch.run_task(task)),
    };

    match result {
        Ok(()) => {
            status.success(&format!("rebuilt: {trigger}"));
            true
        }
        Err(e) => {
            status.error(&format!("rebuild failed: {trigger}"), &format!("{e}"));
            false
        }
    }
}

// =============================================================================
// Watcher Setup
// =============================================================================

fn setup_watchers(watcher: &mut impl Watcher, ctx: &BuildContext) -> Result<()> {
    let mut watched = Vec::new();

    for (path, recursive) in watched_paths(ctx) {
        if !path.exists() {
            continue;
        }
        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(&path, mode)
            .with_context(|| format!("Failed to watch {}", path.display()))?;
        watched.push(rel_path(&path, &ctx.root));
    }

    log!("watch"; "{}", watched.join(", "));
    Ok(())
}

const fn is_relevant(event: &Event) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
}

// =============================================================================
// Public API
// =============================================================================

/// Watch and rebuild until Ctrl+C.
pub fn watch_for_changes_blocking(orch: &mut Orchestrator) -> Result<()> {
    let (tx, rx) = channel();
    let mut watcher = notify::recommended_watcher(tx).context("Failed to create file watcher")?;
    setup_watchers(&mut watcher, orch.context())?;

    let mut debouncer = Debouncer::new();
    let mut status = WatchStatus::new();

    while !shutdown_requested() {
        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) if is_relevant(&event) => {
                debouncer.add(event);
            }
            Ok(Err(e)) => log!("watch"; "error: {e}"),
            Err(RecvTimeoutError::Timeout) if debouncer.ready() => {
                let paths = debouncer.take();
                for path in paths.iter().filter(|p| p.is_file()) {
                    if let Err(e) = wait_until_stable(path, STABLE_RETRIES) {
                        log!("watch"; "{}: {e}", path.display());
                    }
                }
                if handle_changes(orch, &paths, &mut status) {
                    debouncer.mark_rebuild();
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Mode;
    use crate::reload::ReloadNotifier;
    use crate::template::{TemplateKind, fixture::Fixture};
    use std::{
        fs,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };

    #[derive(Default)]
    struct CountingNotifier(AtomicUsize);

    impl ReloadNotifier for CountingNotifier {
        fn reload(&self) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn ctx(site: &Fixture) -> BuildContext {
        BuildContext::new(&site.config, Mode::Production)
    }

    #[test]
    fn test_plan_by_category() {
        let site = Fixture::new();
        let post = site.post("a.md", "title: A\npublishedAt: 2021-01-02");
        let ctx = ctx(&site);
        let templates = &ctx.templates_dir;

        let plan = plan_changes(
            &[templates.join("tags/tag.html"), templates.join("pages/index.html"), post.clone()],
            &ctx,
        );
        assert_eq!(
            plan,
            Plan::Tasks(vec![
                Task::RenderCategory(TemplateKind::Page),
                Task::RenderCategory(TemplateKind::Tag),
                Task::RenderDocuments(vec![post]),
                Task::NotifyReload,
            ])
        );

        let plan = plan_changes(
            &[templates.join("partials/head.html"), templates.join("posts/post.html")],
            &ctx,
        );
        assert_eq!(plan, Plan::Tasks(vec![Task::RenderTemplates, Task::NotifyReload]));

        assert_eq!(plan_changes(&[ctx.locales_dir.join("fr.toml")], &ctx), Plan::Reload);
        assert_eq!(plan_changes(&[ctx.output_root.join("index.html")], &ctx), Plan::Tasks(vec![]));
    }

    #[test]
    fn test_deleted_content_is_ignored() {
        let site = Fixture::new();
        let ctx = ctx(&site);
        let gone = ctx.content_dir.join("gone.md");
        assert_eq!(plan_changes(&[gone], &ctx), Plan::Tasks(vec![]));
    }

    #[test]
    fn test_asset_change_copies_and_reloads_once() {
        let site = Fixture::new();
        site.post("a.md", "title: A\npublishedAt: 2021-01-02");
        let mut orch = Orchestrator::new(Arc::new(site.config.clone()), Mode::Production).unwrap();
        let notifier = Arc::new(CountingNotifier::default());
        orch.set_notifier(notifier.clone());

        let asset = site.config.build.assets.join("css/site.css");
        fs::create_dir_all(asset.parent().unwrap()).unwrap();
        fs::write(&asset, "body{}").unwrap();

        let mut status = WatchStatus::new();
        assert!(handle_changes(&mut orch, &[asset], &mut status));

        assert_eq!(notifier.0.load(Ordering::Relaxed), 1);
        assert!(orch.context().output_root.join("css/site.css").is_file());
        assert!(!orch.context().output_root.join("index.html").exists());
    }

    #[test]
    fn test_failed_batch_skips_reload() {
        let site = Fixture::new();
        site.template("posts/post.html", "{{ post.title | no_such_filter }}");
        let mut orch = Orchestrator::new(Arc::new(site.config.clone()), Mode::Production).unwrap();
        let notifier = Arc::new(CountingNotifier::default());
        orch.set_notifier(notifier.clone());

        let post = site.post("a.md", "title: A2\npublishedAt: 2021-01-02");

        let mut status = WatchStatus::new();
        assert!(!handle_changes(&mut orch, &[post], &mut status));
        assert_eq!(notifier.0.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_debouncer_batches() {
        let mut debouncer = Debouncer::new();
        assert!(!debouncer.ready());

        let event = Event::new(EventKind::Create(notify::event::CreateKind::File))
            .add_path(PathBuf::from("/srv/site/posts/a.md"))
            .add_path(PathBuf::from("/srv/site/posts/.a.md.swp"));
        debouncer.add(event);
        debouncer.last_event = Some(Instant::now() - Duration::from_millis(DEBOUNCE_MS));

        assert!(debouncer.ready());
        assert_eq!(debouncer.take(), [PathBuf::from("/srv/site/posts/a.md")]);
        assert!(!debouncer.ready());
    }

    #[test]
    fn test_cooldown_holds_events_back() {
        let mut debouncer = Debouncer::new();
        debouncer.mark_rebuild();

        let event = Event::new(EventKind::Create(notify::event::CreateKind::File))
            .add_path(PathBuf::from("/srv/site/posts/b.md"));
        debouncer.add(event);
        debouncer.last_event = Some(Instant::now() - Duration::from_millis(DEBOUNCE_MS));
        assert!(!debouncer.ready());

        debouncer.last_rebuild = Some(Instant::now() - Duration::from_millis(REBUILD_COOLDOWN_MS));
        assert!(debouncer.ready());
        assert_eq!(debouncer.take(), [PathBuf::from("/srv/site/posts/b.md")]);
    }
}
