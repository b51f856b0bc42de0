//! Shared test harness: a scripted HTTP backend and a recording notifier.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use frontdesk_core::monitor::LogoutNotifier;

pub const T0: i64 = 1_700_000_000_000;

/// How the stub answers a route.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(u16, Value),
    /// Accept the request and never answer.
    Hang,
    /// Close the connection without answering.
    Drop,
    /// Send a 200 header promising more body than is sent, then close.
    Truncated,
}

/// One request seen by the stub.
#[derive(Debug, Clone)]
pub struct Hit {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

/// Minimal HTTP/1.1 backend answering canned replies keyed by
/// `"METHOD /path"`. Unknown routes get a 404.
#[derive(Clone)]
pub struct StubServer {
    addr: SocketAddr,
    routes: Arc<Mutex<HashMap<String, Reply>>>,
    hits: Arc<Mutex<Vec<Hit>>>,
}

impl StubServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Self {
            addr,
            routes: Arc::new(Mutex::new(HashMap::new())),
            hits: Arc::new(Mutex::new(Vec::new())),
        };

        let accept = server.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let server = accept.clone();
                tokio::spawn(async move {
                    server.handle_connection(stream).await;
                });
            }
        });
        server
    }

    /// Base URL including the `/api` prefix.
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn route(&self, route: &str, reply: Reply) {
        self.routes.lock().unwrap().insert(route.to_string(), reply);
    }

    pub fn json(&self, route: &str, status: u16, body: Value) {
        self.route(route, Reply::Json(status, body));
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }

    pub fn hits_for(&self, method: &str, path: &str) -> Vec<Hit> {
        self.hits()
            .into_iter()
            .filter(|h| h.method == method && h.path == path)
            .collect()
    }

    /// Wait until `count` requests to the route have arrived.
    pub async fn wait_for(&self, method: &str, path: &str, count: usize) {
        for _ in 0..200 {
            if self.hits_for(method, path).len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for {} {}", method, path);
    }

    async fn handle_connection(&self, mut stream: TcpStream) {
        let Some(hit) = read_request(&mut stream).await else {
            return;
        };
        let key = format!("{} {}", hit.method, hit.path);
        self.hits.lock().unwrap().push(hit);

        let reply = self.routes.lock().unwrap().get(&key).cloned();
        match reply {
            Some(Reply::Json(status, body)) => send_response(&mut stream, status, &body).await,
            Some(Reply::Hang) => {
                // Hold the connection open until the client gives up
                let mut buf = [0u8; 64];
                let _ = stream.read(&mut buf).await;
            }
            Some(Reply::Drop) => {}
            Some(Reply::Truncated) => {
                let partial = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 1000\r\nConnection: close\r\n\r\n{\"success\": tr";
                let _ = stream.write_all(partial.as_bytes()).await;
                let _ = stream.flush().await;
            }
            None => {
                send_response(&mut stream, 404, &serde_json::json!({"detail": "Not Found"})).await
            }
        }
    }
}

async fn read_request(stream: &mut TcpStream) -> Option<Hit> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let mut authorization = None;
    let mut content_length = 0usize;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        match name.trim().to_ascii_lowercase().as_str() {
            "authorization" => authorization = Some(value.trim().to_string()),
            "content-length" => content_length = value.trim().parse().unwrap_or(0),
            _ => {}
        }
    }

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).into_owned();

    Some(Hit {
        method,
        path,
        authorization,
        body,
    })
}

async fn send_response(stream: &mut TcpStream, status: u16, body: &Value) {
    let body = body.to_string();
    let reason = match status {
        200 => "OK",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.flush().await;
}

/// Notifier that only records which credentials were logged out.
#[derive(Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl LogoutNotifier for RecordingNotifier {
    fn notify_logout(&self, credential: String) {
        self.calls.lock().unwrap().push(credential);
    }
}

/// An address nothing listens on.
pub async fn dead_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/api", addr)
}
