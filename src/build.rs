//! Build orchestration.
//!
//! Every step of a build is a named [`Task`]; sequences run tasks strictly
//! one after another and stop at the first failure.
//!
//! ```text
//! build  = log-output-dir → clean-output → copy-assets → load-content
//!          → render-templates → generate-feed → build-css
//! serve  = set-dev-mode → build → serve
//! config-reload = reload-config → set-dev-mode → load-content → render-templates
//! ```
//!
//! A config change never patches the running site: [`Orchestrator::rebuild`]
//! assembles a new context, router, template set and content store and drops
//! the old ones.

mod observer;
mod task;

pub use observer::{LogObserver, TaskObserver};
pub use task::{BuildState, Sequence, Task, TaskError};

use crate::{
    config::{SiteConfig, cfg, reload_config},
    content::{ContentStore, Document, LoadOutcome, MarkdownRenderer, clear_cache, with_overlay},
    context::{BuildContext, Mode},
    generator::build_feed,
    log,
    reload::{LiveReload, ReloadNotifier},
    router::UrlRouter,
    serve::{self, ServeRoot},
    template::{
        Compiler, DocumentTemplate, RenderEnv, TemplateKind, TemplateSet, i18n::Translator,
        render_kinds, write_outputs,
    },
    utils::{assets::copy_assets, css},
};
use anyhow::{Context, Result, bail};
use arc_swap::ArcSwap;
use std::{
    fs,
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    sync::Arc,
    thread::JoinHandle,
};
use tiny_http::Server;

// ============================================================================
// Site
// ============================================================================

/// Everything derived from one config snapshot.
struct Site {
    context: Arc<BuildContext>,
    router: UrlRouter,
    templates: TemplateSet,
    store: ContentStore,
    /// Documents re-parsed by `render-documents` since the store last loaded.
    edits: Vec<Document>,
}

impl Site {
    fn assemble(config: &SiteConfig, mode: Mode, renderer: &Arc<MarkdownRenderer>) -> Result<Self> {
        let context = Arc::new(BuildContext::new(config, mode));
        let translator = Translator::load(&context.locales_dir, &context.locales)?;
        let router = UrlRouter::new(Arc::clone(&context), Arc::new(translator));
        let templates = TemplateSet::discover(&context.templates_dir)?;
        let store = ContentStore::new(router.clone(), Arc::clone(renderer), templates.layouts())?;

        Ok(Self {
            context,
            router,
            templates,
            store,
            edits: Vec::new(),
        })
    }
}

/// Dev server state, created once by the first `set-dev-mode`.
struct DevSession {
    server: Arc<Server>,
    addr: SocketAddr,
    reload: Arc<LiveReload>,
    root: ServeRoot,
    handle: Option<JoinHandle<()>>,
}

// ============================================================================
// Orchestrator
// ============================================================================

pub struct Orchestrator {
    config: Arc<SiteConfig>,
    renderer: Arc<MarkdownRenderer>,
    site: Site,
    observers: Vec<Box<dyn TaskObserver>>,
    state: BuildState,
    notifier: Option<Arc<dyn ReloadNotifier>>,
    dev: Option<DevSession>,
}

impl Orchestrator {
    /// Fails on a missing content directory or unreadable templates/locales.
    pub fn new(config: Arc<SiteConfig>, mode: Mode) -> Result<Self> {
        let renderer = Arc::new(MarkdownRenderer::new());
        let site = Site::assemble(&config, mode, &renderer)?;

        Ok(Self {
            config,
            renderer,
            site,
            observers: vec![Box::new(LogObserver::default())],
            state: BuildState::Idle,
            notifier: None,
            dev: None,
        })
    }

    /// Replace the whole site with one built from `config` in `mode`.
    pub fn rebuild(&mut self, config: Arc<SiteConfig>, mode: Mode) -> Result<()> {
        self.site = Site::assemble(&config, mode, &self.renderer)?;
        self.config = config;
        Ok(())
    }

    pub fn context(&self) -> &BuildContext {
        &self.site.context
    }

    pub fn store(&self) -> &ContentStore {
        &self.site.store
    }

    pub const fn state(&self) -> BuildState {
        self.state
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// The observer list, in notification order. Replace or extend freely.
    pub fn observers_mut(&mut self) -> &mut Vec<Box<dyn TaskObserver>> {
        &mut self.observers
    }

    pub fn set_notifier(&mut self, notifier: Arc<dyn ReloadNotifier>) {
        self.notifier = Some(notifier);
    }

    // ========================================================================
    // Running
    // ========================================================================

    /// Run `sequence` to completion or to its first failing task.
    pub fn run_sequence(&mut self, sequence: Sequence) -> Result<(), TaskError> {
        self.run_tasks(sequence, &sequence.tasks())
    }

    fn run_tasks(&mut self, sequence: Sequence, tasks: &[Task]) -> Result<(), TaskError> {
        self.state = BuildState::Running(sequence);

        for task in tasks {
            if let Err(e) = self.run_task(task) {
                self.state = BuildState::Failed;
                return Err(e);
            }
        }

        self.state = if self.dev.as_ref().is_some_and(|d| d.handle.is_some()) {
            BuildState::Serving
        } else {
            BuildState::Idle
        };
        Ok(())
    }

    /// Run one task between its observer notifications.
    pub fn run_task(&mut self, task: &Task) -> Result<(), TaskError> {
        for observer in &self.observers {
            observer.before(task);
        }

        let result = self.execute(task);

        for observer in &self.observers {
            observer.after(task, result.as_ref().map(|_| ()));
        }

        result.map_err(|source| TaskError {
            task: task.name(),
            source,
        })
    }

    fn execute(&mut self, task: &Task) -> Result<()> {
        let ctx = Arc::clone(&self.site.context);

        match task {
            Task::LogOutputDir => {
                log!("build"; "output: {}", ctx.output_root.display());
            }
            Task::CleanOutput => {
                if ctx.output_root.exists() {
                    fs::remove_dir_all(&ctx.output_root).with_context(|| {
                        format!("Failed to clear output directory: {}", ctx.output_root.display())
                    })?;
                }
                fs::create_dir_all(&ctx.output_root)?;
            }
            Task::CleanCache => {
                if clear_cache(&ctx.cache_dir)? {
                    log!("cache"; "cleared {}", ctx.cache_dir.display());
                }
            }
            Task::SetDevMode => self.enter_dev_mode()?,
            Task::CopyAssets => {
                let count = copy_assets(&ctx.assets_dir, &ctx.output_root)?;
                log!("assets"; "copied {count} files");
            }
            Task::LoadContent => self.load_content()?,
            Task::RenderTemplates => {
                self.refresh_templates()?;
                self.render(&TemplateKind::ALL)?;
            }
            Task::RenderCategory(kind) => {
                self.refresh_templates()?;
                self.render(&[*kind])?;
            }
            Task::RenderDocuments(paths) => self.render_documents(paths)?,
            Task::GenerateFeed => {
                build_feed(&self.site.store)?;
            }
            Task::BuildCss => {
                if let Some(step) = &ctx.css {
                    css::run_css_command(step, &ctx)?;
                }
                if let Some(step) = &ctx.highlight {
                    css::write_highlight_css(step, &ctx)?;
                }
            }
            Task::ReloadConfig => {
                if reload_config()? {
                    log!("config"; "reloaded");
                }
                self.rebuild(cfg(), Mode::Production)?;
            }
            Task::NotifyReload => {
                if let Some(notifier) = &self.notifier {
                    notifier.reload();
                }
            }
            Task::Serve => self.start_server()?,
        }

        Ok(())
    }

    // ========================================================================
    // Task Bodies
    // ========================================================================

    fn load_content(&mut self) -> Result<()> {
        let force = !self.site.edits.is_empty();
        self.site.edits.clear();
        let store = &mut self.site.store;
        let outcome = store.load_all(force)?;

        for warning in store.warnings() {
            log!("warn"; "{warning}");
        }
        let source = match outcome {
            LoadOutcome::Parsed => "parsed",
            LoadOutcome::Cached => "cached",
        };
        log!("content"; "{} documents, {} tags ({source})", store.get_documents(None).len(), store.get_tags().len());
        Ok(())
    }

    /// Pick up added or removed templates and content edited since the
    /// last load. A changed layout set re-checks every document against it.
    fn refresh_templates(&mut self) -> Result<()> {
        let templates = TemplateSet::discover(&self.site.context.templates_dir)?;
        let layouts = templates.layouts();
        let site = &mut self.site;

        let mut force = !site.edits.is_empty();
        if &layouts != site.store.layouts() {
            site.store.set_layouts(layouts);
            force = true;
        }
        if force || site.store.has_changes() {
            site.store.load_all(true)?;
            for warning in site.store.warnings() {
                log!("warn"; "{warning}");
            }
        }
        site.edits.clear();
        site.templates = templates;
        Ok(())
    }

    fn render(&self, kinds: &[TemplateKind]) -> Result<()> {
        let site = &self.site;
        let compiler = Compiler::new(&site.templates, &site.router)?;
        let env = RenderEnv::new(&compiler, &site.store, &site.edits);

        let outputs = render_kinds(&env, &site.templates, kinds)?;
        let count = write_outputs(&outputs, &site.context)?;
        log!("render"; "{count} files");
        Ok(())
    }

    /// Render only the documents parsed from `paths`. One failing document
    /// doesn't keep the others from being written.
    ///
    /// Accepted documents join the edit overlay, so later batches and
    /// category renders see them too.
    fn render_documents(&mut self, paths: &[PathBuf]) -> Result<()> {
        let parsed = self.site.store.parse_subset(paths);
        for warning in &parsed.warnings {
            log!("warn"; "{warning}");
        }

        let mut failed = 0;
        let mut accepted: Vec<Document> = Vec::new();
        {
            let current = with_overlay(self.site.store.get_documents(None), &self.site.edits);
            for doc in parsed.documents {
                let others = current.iter().copied().chain(&accepted);
                match self.site.store.url_conflict(&doc, others) {
                    Some(conflict) => {
                        log!("error"; "{conflict}");
                        failed += 1;
                    }
                    None => accepted.push(doc),
                }
            }
        }
        for doc in &accepted {
            match self.site.edits.iter_mut().find(|d| d.source == doc.source) {
                Some(slot) => *slot = doc.clone(),
                None => self.site.edits.push(doc.clone()),
            }
        }

        let site = &self.site;
        let compiler = Compiler::new(&site.templates, &site.router)?;
        let env = RenderEnv::new(&compiler, &site.store, &site.edits);
        let documents: Vec<_> = accepted.iter().collect();

        let mut outputs = Vec::new();
        for template in site.templates.by_kind(TemplateKind::Document) {
            for (source, result) in DocumentTemplate::new(template, &env).render_subset(&documents) {
                match result {
                    Ok(output) => outputs.push(output),
                    Err(e) => {
                        log!("error"; "{}: {e}", source.display());
                        failed += 1;
                    }
                }
            }
        }

        let count = write_outputs(&outputs, &site.context)?;
        log!("render"; "{count} files");

        if failed > 0 {
            bail!("{failed} document(s) failed to render");
        }
        Ok(())
    }

    /// Bind the server and live reload on first use, then switch the site
    /// to dev mode on the bound address.
    fn enter_dev_mode(&mut self) -> Result<()> {
        if self.dev.is_none() {
            let interface: IpAddr = self
                .config
                .serve
                .interface
                .parse()
                .with_context(|| format!("invalid interface `{}`", self.config.serve.interface))?;
            let (server, addr) = serve::bind(interface, self.config.serve.port)?;
            let reload = LiveReload::bind(interface)?;

            self.dev = Some(DevSession {
                server,
                addr,
                reload,
                root: Arc::new(ArcSwap::from_pointee(PathBuf::new())),
                handle: None,
            });
        }

        let Some(session) = self.dev.as_ref() else {
            bail!("dev session missing");
        };
        let mode = Mode::Dev {
            addr: session.addr,
            reload_port: Some(session.reload.port()),
        };
        let reload: Arc<dyn ReloadNotifier> = session.reload.clone();
        let root = Arc::clone(&session.root);

        self.rebuild(Arc::clone(&self.config), mode)?;
        root.store(Arc::new(self.site.context.output_root.clone()));
        self.notifier.get_or_insert(reload);
        Ok(())
    }

    fn start_server(&mut self) -> Result<()> {
        let Some(session) = self.dev.as_mut() else {
            bail!("the dev server needs set-dev-mode first");
        };

        if session.handle.is_none() {
            serve::install_shutdown_handler(&session.server)?;
            session.handle = Some(serve::start(Arc::clone(&session.server), Arc::clone(&session.root)));
            log!("serve"; "http://{}", session.addr);
        }
        Ok(())
    }

    /// Block until the dev server stops.
    pub fn wait_for_server(&mut self) {
        if let Some(handle) = self.dev.as_mut().and_then(|d| d.handle.take()) {
            handle.join().ok();
        }
        self.state = BuildState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::fixture::Fixture;
    use std::{cell::RefCell, rc::Rc};

    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl TaskObserver for Recorder {
        fn before(&self, task: &Task) {
            self.0.borrow_mut().push(format!("before {task}"));
        }
        fn after(&self, task: &Task, result: Result<(), &anyhow::Error>) {
            let status = if result.is_ok() { "ok" } else { "err" };
            self.0.borrow_mut().push(format!("after {task} {status}"));
        }
    }

    fn site() -> Fixture {
        let site = Fixture::new();
        site.template("pages/index.html", "{% for p in posts %}{{ p.title }},{% endfor %}");
        site.template("tags/tag.html", "{{ tag }}");
        site.post("a.md", "title: A\npublishedAt: 2021-01-02\nslug: a\ntags: x");
        site.post("b.md", "title: B\npublishedAt: 2021-01-05\nslug: b");
        site
    }

    fn orchestrator(site: &Fixture) -> (Orchestrator, Rc<RefCell<Vec<String>>>) {
        let mut orch = Orchestrator::new(Arc::new(site.config.clone()), Mode::Production).unwrap();
        let events = Rc::new(RefCell::new(Vec::new()));
        *orch.observers_mut() = vec![Box::new(Recorder(Rc::clone(&events)))];
        (orch, events)
    }

    /// Production build without the CSS step, which shells out.
    fn build(orch: &mut Orchestrator) {
        for task in [
            Task::CleanCache,
            Task::CleanOutput,
            Task::CopyAssets,
            Task::LoadContent,
            Task::RenderTemplates,
            Task::GenerateFeed,
        ] {
            orch.run_task(&task).unwrap();
        }
    }

    fn read(orch: &Orchestrator, rel: &str) -> String {
        fs::read_to_string(orch.context().output_root.join(rel)).unwrap()
    }

    #[test]
    fn test_observers_wrap_each_task() {
        let site = site();
        let (mut orch, events) = orchestrator(&site);

        orch.run_task(&Task::LogOutputDir).unwrap();
        orch.run_task(&Task::LoadContent).unwrap();

        assert_eq!(
            *events.borrow(),
            [
                "before log-output-dir",
                "after log-output-dir ok",
                "before load-content",
                "after load-content ok"
            ]
        );
    }

    #[test]
    fn test_failure_aborts_sequence() {
        let site = site();
        site.post("dup.md", "title: Dup\npublishedAt: 2021-02-01\nslug: a");
        let (mut orch, events) = orchestrator(&site);

        let err = orch.run_sequence(Sequence::Build).unwrap_err();

        assert_eq!(err.task, "load-content");
        assert_eq!(orch.state(), BuildState::Failed);
        let events = events.borrow();
        assert_eq!(events.last().map(String::as_str), Some("after load-content err"));
        assert!(!events.iter().any(|e| e.contains("render-templates")));
    }

    #[test]
    fn test_full_build_outputs() {
        let site = site();
        let (mut orch, _) = orchestrator(&site);
        build(&mut orch);

        assert_eq!(read(&orch, "index.html"), "B,A,");
        assert_eq!(read(&orch, "posts/a.html"), "A");
        assert_eq!(read(&orch, "tags/x.html"), "x");
        assert!(read(&orch, "rss.xml").contains("<item>"));
        assert_eq!(orch.state(), BuildState::Idle);
    }

    #[test]
    fn test_incremental_matches_full_build() {
        let site = site();
        let (mut orch, _) = orchestrator(&site);
        build(&mut orch);

        let output = orch.context().output_root.clone();
        let untouched = ["index.html", "posts/b.html", "tags/x.html"];
        let before: Vec<_> = untouched
            .iter()
            .map(|rel| fs::metadata(output.join(rel)).unwrap().modified().unwrap())
            .collect();

        let a = site.post("a.md", "title: A edited\npublishedAt: 2021-01-02\nslug: a\ntags: x");
        orch.run_task(&Task::RenderDocuments(vec![a])).unwrap();
        let incremental = read(&orch, "posts/a.html");

        for (rel, modified) in untouched.iter().zip(before) {
            assert_eq!(fs::metadata(output.join(rel)).unwrap().modified().unwrap(), modified, "{rel}");
        }
        assert_eq!(read(&orch, "index.html"), "B,A,");

        let (mut full, _) = orchestrator(&site);
        build(&mut full);
        assert_eq!(incremental, read(&full, "posts/a.html"));
        assert_eq!(incremental, "A edited");
    }

    #[test]
    fn test_unknown_layout_never_rendered() {
        let site = site();
        site.post("ghost.md", "title: Ghost\npublishedAt: 2021-01-03\nslug: ghost\nlayout: nonexistent");
        let (mut orch, _) = orchestrator(&site);
        build(&mut orch);

        assert_eq!(orch.store().warnings().len(), 1);
        assert!(!orch.context().output_root.join("posts/ghost.html").exists());
        assert_eq!(read(&orch, "index.html"), "B,A,");

        let ghost = site.config.build.content.join("ghost.md");
        orch.run_task(&Task::RenderDocuments(vec![ghost])).unwrap();
        assert!(!orch.context().output_root.join("posts/ghost.html").exists());
    }

    #[test]
    fn test_new_layout_template_is_picked_up() {
        let site = site();
        site.post("n.md", "title: N\npublishedAt: 2021-01-03\nslug: n\nlayout: note");
        let (mut orch, _) = orchestrator(&site);
        build(&mut orch);
        assert!(!orch.context().output_root.join("posts/n.html").exists());

        site.template("posts/note.html", "note {{ post.title }}");
        orch.run_task(&Task::RenderCategory(TemplateKind::Document)).unwrap();
        assert_eq!(read(&orch, "posts/n.html"), "note N");
    }
    #[test]
    fn test_category_render_after_edit_matches_full_build() {
        let site = site();
        let (mut orch, _) = orchestrator(&site);
        build(&mut orch);

        let a = site.post("a.md", "title: A edited\npublishedAt: 2021-01-02\nslug: a\ntags: x");
        orch.run_task(&Task::RenderDocuments(vec![a])).unwrap();
        site.template("pages/index.html", "{% for p in posts %}[{{ p.title }}]{% endfor %}");
        orch.run_task(&Task::RenderCategory(TemplateKind::Page)).unwrap();

        let (mut full, _) = orchestrator(&site);
        build(&mut full);
        assert_eq!(read(&orch, "index.html"), "[B][A edited]");
        assert_eq!(read(&orch, "index.html"), read(&full, "index.html"));
    }

    #[test]
    fn test_successive_edits_see_each_other() {
        let site = site();
        site.template("posts/post.html", "{{ post.title }}:{% for p in all_posts %}{{ p.title }},{% endfor %}");
        let (mut orch, _) = orchestrator(&site);
        build(&mut orch);

        let a = site.post("a.md", "title: A2\npublishedAt: 2021-01-02\nslug: a\ntags: x");
        orch.run_task(&Task::RenderDocuments(vec![a])).unwrap();
        let b = site.post("b.md", "title: B2\npublishedAt: 2021-01-05\nslug: b");
        orch.run_task(&Task::RenderDocuments(vec![b])).unwrap();

        let (mut full, _) = orchestrator(&site);
        build(&mut full);
        assert_eq!(read(&orch, "posts/b.html"), "B2:B2,A2,");
        assert_eq!(read(&orch, "posts/b.html"), read(&full, "posts/b.html"));
    }

    #[test]
    fn test_incremental_url_clash_is_rejected() {
        let site = site();
        let (mut orch, _) = orchestrator(&site);
        build(&mut orch);

        let impostor = site.post("2021/a.md", "title: Impostor\npublishedAt: 2021-03-01\nslug: a");
        let err = orch.run_task(&Task::RenderDocuments(vec![impostor])).unwrap_err();

        assert_eq!(err.task, "render-documents");
        assert_eq!(read(&orch, "posts/a.html"), "A");
    }

    #[test]
    fn test_clash_within_one_batch_keeps_first() {
        let site = site();
        let (mut orch, _) = orchestrator(&site);
        build(&mut orch);

        let c = site.post("c.md", "title: C\npublishedAt: 2021-03-01\nslug: c");
        let d = site.post("d.md", "title: D\npublishedAt: 2021-03-01\nslug: c");
        assert!(orch.run_task(&Task::RenderDocuments(vec![c, d])).is_err());
        assert_eq!(read(&orch, "posts/c.html"), "C");
    }
}
