// src/serve/mod.rs

//! Development server with live reload.
//!
//! Serves the destination root over a local TCP address and pushes a reload
//! signal to connected clients over a server-sent-events endpoint whenever
//! a pipeline reports a successful write. Served HTML gets a small reload
//! client injected; everything else is returned as-is.
//!
//! The reload channel is a `tokio::sync::broadcast`; notifying is a
//! non-blocking send, so pipelines never wait on the server or on slow
//! clients.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Path the injected client connects to for reload events.
const EVENTS_PATH: &str = "/__sitegear/events";

const RELOAD_SNIPPET: &str = concat!(
    "<script>new EventSource('/__sitegear/events')",
    ".addEventListener('reload',()=>location.reload());</script>"
);

/// Handle pipelines use to signal a successful write.
///
/// A disabled notifier (no server running, e.g. `--once` builds) swallows
/// notifications.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: Option<broadcast::Sender<String>>,
}

impl Notifier {
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Push a reload signal for the given scope. Never blocks; a send with
    /// no connected clients is not an error.
    pub fn notify(&self, scope: &str) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(scope.to_string());
        }
    }
}

/// Server listen address configuration.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub host: String,
    pub port: u16,
}

/// Bind the listen address and spawn the accept loop.
///
/// Returns the [`Notifier`] pipelines use for refresh signals. The server
/// runs until process shutdown.
pub async fn spawn_server(root: PathBuf, options: ServeOptions) -> Result<Notifier> {
    let addr = format!("{}:{}", options.host, options.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding dev server to {addr}"))?;

    let (tx, _) = broadcast::channel::<String>(16);
    let notifier = Notifier {
        tx: Some(tx.clone()),
    };

    info!("dev server listening on http://{addr}/");

    let root = Arc::new(root);
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(%peer, "dev server connection accepted");
                    let root = Arc::clone(&root);
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, &root, tx).await {
                            debug!("dev server connection ended: {e}");
                        }
                    });
                }
                Err(e) => {
                    warn!("dev server accept failed: {e}");
                }
            }
        }
    });

    Ok(notifier)
}

async fn handle_connection(
    mut stream: TcpStream,
    root: &Path,
    tx: broadcast::Sender<String>,
) -> Result<()> {
    let request_path = match read_request_path(&mut stream).await? {
        Some(path) => path,
        None => {
            write_simple(&mut stream, 405, "method not allowed").await?;
            return Ok(());
        }
    };

    if request_path == EVENTS_PATH {
        return serve_events(stream, tx.subscribe()).await;
    }

    serve_file(stream, root, &request_path).await
}

/// Read the request head and return the target path for GET/HEAD requests.
async fn read_request_path(stream: &mut TcpStream) -> Result<Option<String>> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 512];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") || buf.len() > 8192 {
            break;
        }
    }

    let head = String::from_utf8_lossy(&buf);
    let mut parts = head.lines().next().unwrap_or_default().split_whitespace();
    let method = parts.next().unwrap_or_default();
    let target = parts.next().unwrap_or("/");

    if method != "GET" && method != "HEAD" {
        return Ok(None);
    }

    let path = target.split('?').next().unwrap_or("/").to_string();
    Ok(Some(path))
}

async fn serve_events(stream: TcpStream, mut rx: broadcast::Receiver<String>) -> Result<()> {
    let mut writer = BufWriter::new(stream);
    writer
        .write_all(
            b"HTTP/1.1 200 OK\r\n\
              Content-Type: text/event-stream\r\n\
              Cache-Control: no-cache\r\n\
              Connection: keep-alive\r\n\r\n",
        )
        .await?;
    writer.flush().await?;

    loop {
        match rx.recv().await {
            Ok(scope) => {
                let frame = format!("event: reload\ndata: {scope}\n\n");
                writer.write_all(frame.as_bytes()).await?;
                writer.flush().await?;
            }
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => return Ok(()),
        }
    }
}

async fn serve_file(mut stream: TcpStream, root: &Path, request_path: &str) -> Result<()> {
    let Some(mut target) = sanitize(root, request_path) else {
        write_simple(&mut stream, 404, "not found").await?;
        return Ok(());
    };

    if target.is_dir() {
        target = target.join("index.html");
    }

    let contents = match tokio::fs::read(&target).await {
        Ok(contents) => contents,
        Err(_) => {
            write_simple(&mut stream, 404, "not found").await?;
            return Ok(());
        }
    };

    let content_type = content_type_for(&target);
    let body = if content_type == "text/html" {
        inject_reload_client(contents)
    } else {
        contents
    };

    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        content_type,
        body.len()
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(&body).await?;
    stream.flush().await?;
    Ok(())
}

/// Map a request path onto the destination root, rejecting traversal.
fn sanitize(root: &Path, request_path: &str) -> Option<PathBuf> {
    let rel = request_path.trim_start_matches('/');
    let rel = Path::new(rel);

    if rel
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }

    Some(root.join(rel))
}

fn inject_reload_client(html: Vec<u8>) -> Vec<u8> {
    let text = match String::from_utf8(html) {
        Ok(text) => text,
        Err(e) => return e.into_bytes(),
    };

    let injected = match text.rfind("</body>") {
        Some(idx) => {
            let mut s = String::with_capacity(text.len() + RELOAD_SNIPPET.len());
            s.push_str(&text[..idx]);
            s.push_str(RELOAD_SNIPPET);
            s.push_str(&text[idx..]);
            s
        }
        None => {
            let mut s = text;
            s.push_str(RELOAD_SNIPPET);
            s
        }
    };

    injected.into_bytes()
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") | Some("map") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}

async fn write_simple(stream: &mut TcpStream, status: u16, message: &str) -> Result<()> {
    let reason = match status {
        404 => "Not Found",
        405 => "Method Not Allowed",
        _ => "Error",
    };
    let head = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{message}",
        message.len()
    );
    stream.write_all(head.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}
