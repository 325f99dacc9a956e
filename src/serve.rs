//! Development HTTP server.
//!
//! Serves the dev output root with `tiny_http` on a background thread
//! while the main thread runs the watch loop.
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐
//! │   Main Thread   │     │  Server Thread   │
//! │  (watch loop)   │     │  (HTTP requests) │
//! └────────┬────────┘     └────────┬─────────┘
//!          │                       │
//!          ▼                       ▼
//!    Rebuild outputs         Serve files
//!          └───────────┬───────────┘
//!                      ▼
//!                 output root
//! ```
//!
//! Ctrl+C unblocks the server and flags [`shutdown_requested`] so the watch
//! loop can return.

use crate::log;
use anyhow::{Context, Result, anyhow};
use arc_swap::ArcSwap;
use std::{
    fs,
    io::Cursor,
    net::{IpAddr, SocketAddr},
    path::{Component, Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};
use tiny_http::{Header, Request, Response, Server, StatusCode};

/// Try binding to port, retry with incremented port if in use
const MAX_PORT_RETRIES: u16 = 10;

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Directory the server reads from. Swapped when a config reload moves it.
pub type ServeRoot = Arc<ArcSwap<PathBuf>>;

// ============================================================================
// Server Entry Point
// ============================================================================

pub fn shutdown_requested() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

/// Bind to `interface:port`, trying the next ports when taken.
pub fn bind(interface: IpAddr, port: u16) -> Result<(Arc<Server>, SocketAddr)> {
    let (server, addr) = try_bind_port(interface, port, MAX_PORT_RETRIES)?;
    Ok((Arc::new(server), addr))
}

/// Ctrl+C stops the server and the watch loop.
pub fn install_shutdown_handler(server: &Arc<Server>) -> Result<()> {
    let server = Arc::clone(server);
    ctrlc::set_handler(move || {
        log!("serve"; "shutting down...");
        SHUTDOWN.store(true, Ordering::Relaxed);
        server.unblock();
    })
    .context("Failed to set Ctrl+C handler")
}

/// Handle requests on a background thread until the server is unblocked.
pub fn start(server: Arc<Server>, root: ServeRoot) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for request in server.incoming_requests() {
            if let Err(e) = handle_request(request, &root.load()) {
                log!("serve"; "request error: {e}");
            }
        }
    })
}

/// Try to bind to a port, retrying with incremented port numbers if in use.
fn try_bind_port(interface: IpAddr, base_port: u16, max_retries: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                // Port 0 asks the OS; report what it picked.
                let addr = server.server_addr().to_ip().unwrap_or(addr);
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        max_retries,
        base_port,
        base_port.saturating_add(max_retries - 1),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

// ============================================================================
// Request Handling
// ============================================================================

#[derive(Debug, PartialEq, Eq)]
enum Resolved {
    File(PathBuf),
    /// Carries the site's own 404 page when it has one.
    NotFound(Option<PathBuf>),
}

/// Map a request URL to a file under `root`.
///
/// Resolution order: exact file, then `index.html` inside a directory,
/// then not found. Query strings are ignored and `..` never resolves.
fn resolve(root: &Path, url: &str) -> Resolved {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let decoded = urlencoding::decode(path)
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default();
    let relative = Path::new(decoded.trim_matches('/'));

    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if !escapes {
        let local = root.join(relative);
        if local.is_file() {
            return Resolved::File(local);
        }
        let index = local.join("index.html");
        if local.is_dir() && index.is_file() {
            return Resolved::File(index);
        }
    }

    let page = root.join("404.html");
    Resolved::NotFound(page.is_file().then_some(page))
}

fn handle_request(request: Request, root: &Path) -> Result<()> {
    match resolve(root, request.url()) {
        Resolved::File(path) => serve_file(request, &path, StatusCode(200)),
        Resolved::NotFound(Some(page)) => serve_file(request, &page, StatusCode(404)),
        Resolved::NotFound(None) => serve_not_found(request),
    }
}

// ============================================================================
// Response Helpers
// ============================================================================

fn content_type_header(value: &str) -> Result<Header> {
    Header::from_bytes("Content-Type", value).map_err(|()| anyhow!("invalid header value `{value}`"))
}

/// Serve a file with appropriate content type.
fn serve_file(request: Request, path: &Path, status: StatusCode) -> Result<()> {
    let content = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let response = Response::from_data(content)
        .with_status_code(status)
        .with_header(content_type_header(guess_content_type(path))?);

    request.respond(response)?;
    Ok(())
}

fn serve_not_found(request: Request) -> Result<()> {
    let body = "404 Not Found";
    let response = Response::new(
        StatusCode(404),
        vec![content_type_header("text/plain; charset=utf-8")?],
        Cursor::new(body),
        Some(body.len()),
        None,
    );
    request.respond(response)?;
    Ok(())
}

// ============================================================================
// Content Type Detection
// ============================================================================

/// Guess MIME content type from file extension.
///
/// Returns `application/octet-stream` for unknown extensions.
fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        // Web content
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("xml") => "application/xml; charset=utf-8",

        // Images
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",

        // Fonts
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",

        Some("txt") => "text/plain; charset=utf-8",

        _ => "application/octet-stream",
    }
}
