//! Live reload over WebSocket.
//!
//! ```text
//! browser ──ws://host:<port>──► accept thread ──► clients
//!                                                   ▲
//! watch ──► Orchestrator ──► NotifyReload ──────────┘ "reload"
//! ```
//!
//! Dev pages carry a small client script (see [`inject_client`]) that
//! reloads the page when it receives the `reload` message.

use crate::log;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::{
    net::{IpAddr, TcpListener, TcpStream},
    sync::Arc,
    thread,
};
use tungstenite::{Message, WebSocket};

const RELOAD_MESSAGE: &str = "reload";

/// Something that can tell connected browsers to reload.
pub trait ReloadNotifier: Send + Sync {
    fn reload(&self);
}

pub struct LiveReload {
    clients: Mutex<Vec<WebSocket<TcpStream>>>,
    port: u16,
}

impl LiveReload {
    /// Listen on an ephemeral port of `interface` and accept clients in
    /// the background for the rest of the process.
    pub fn bind(interface: IpAddr) -> Result<Arc<Self>> {
        let listener = TcpListener::bind((interface, 0)).context("Failed to bind live reload socket")?;
        let port = listener.local_addr()?.port();

        let reload = Arc::new(Self {
            clients: Mutex::new(Vec::new()),
            port,
        });

        let accepting = Arc::clone(&reload);
        thread::spawn(move || {
            for stream in listener.incoming().filter_map(Result::ok) {
                match tungstenite::accept(stream) {
                    Ok(ws) => accepting.clients.lock().push(ws),
                    Err(e) => log!("reload"; "handshake failed: {e}"),
                }
            }
        });

        Ok(reload)
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }
}

impl ReloadNotifier for LiveReload {
    /// Clients that fail to receive are dropped.
    fn reload(&self) {
        let mut clients = self.clients.lock();
        clients.retain_mut(|ws| ws.send(Message::text(RELOAD_MESSAGE)).is_ok());
    }
}

// ============================================================================
// Client Script
// ============================================================================

pub fn client_script(port: u16) -> String {
    format!(
        r#"<script>(() => {{
  const ws = new WebSocket(`ws://${{location.hostname}}:{port}`);
  ws.onmessage = (e) => {{ if (e.data === "{RELOAD_MESSAGE}") location.reload(); }};
}})();</script>"#
    )
}

/// Insert the client script before the last `</body>`, or append it.
pub fn inject_client(html: &str, port: u16) -> String {
    let script = client_script(port);
    match html.rfind("</body>") {
        Some(at) => format!("{}{script}{}", &html[..at], &html[at..]),
        None => format!("{html}{script}"),
    }
}
