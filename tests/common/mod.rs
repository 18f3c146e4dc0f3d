#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use portsy::scanner::{OpenPort, ProcessResolver};

/// How a [`TestServer`] answers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    /// 200 for the configured routes, 404 otherwise, one request per connection.
    Routes,
    /// Like `Routes`, but connections stay open for further requests.
    KeepAlive,
    /// 200 with the same page for every path.
    CatchAll,
    /// Reads the request and never answers.
    Silent,
}

const CATCH_ALL_PAGE: &str = "<!doctype html><html><head><title>app</title></head><body><div id=\"root\"></div></body></html>";

/// Minimal HTTP/1.1 responder. Every requested path is recorded and open
/// connections are counted.
pub struct TestServer {
    pub port: u16,
    requested: Arc<Mutex<Vec<String>>>,
    live: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    fn new(live: Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self(live)
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl TestServer {
    pub async fn start(routes: &[&str]) -> Self {
        Self::start_with(Behavior::Routes, routes).await
    }

    pub async fn start_with(behavior: Behavior, routes: &[&str]) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        Self::serve(listener, behavior, routes)
    }

    pub async fn start_on(port: u16, routes: &[&str]) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .unwrap_or_else(|e| panic!("port {port} must be free for this test: {e}"));
        Self::serve(listener, Behavior::Routes, routes)
    }

    fn serve(listener: TcpListener, behavior: Behavior, routes: &[&str]) -> Self {
        let port = listener.local_addr().unwrap().port();
        let routes: Arc<HashSet<String>> = Arc::new(routes.iter().map(|r| r.to_string()).collect());
        let requested = Arc::new(Mutex::new(Vec::new()));
        let live = Arc::new(AtomicUsize::new(0));

        let log = requested.clone();
        let counter = live.clone();
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let routes = routes.clone();
                let log = log.clone();
                let guard = LiveGuard::new(counter.clone());
                tokio::spawn(async move {
                    let _guard = guard;
                    let (read, mut write) = stream.into_split();
                    let mut reader = BufReader::new(read);

                    loop {
                        // Bare TCP connects hang up without a request
                        let Some(path) = read_request(&mut reader).await else {
                            return;
                        };
                        log.lock().unwrap().push(path.clone());

                        let (status, body) = match behavior {
                            Behavior::Silent => {
                                drain(reader).await;
                                return;
                            }
                            Behavior::CatchAll => ("200 OK", CATCH_ALL_PAGE),
                            Behavior::Routes | Behavior::KeepAlive if routes.contains(&path) => {
                                ("200 OK", "{\"ok\":true}")
                            }
                            Behavior::Routes | Behavior::KeepAlive => {
                                ("404 Not Found", "{\"detail\":\"Not Found\"}")
                            }
                        };
                        let keep_alive = behavior == Behavior::KeepAlive;
                        let response = format!(
                            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: {}\r\n\r\n{body}",
                            body.len(),
                            if keep_alive { "keep-alive" } else { "close" },
                        );
                        if write.write_all(response.as_bytes()).await.is_err() {
                            return;
                        }
                        if !keep_alive {
                            let _ = write.shutdown().await;
                            return;
                        }
                    }
                });
            }
        });

        Self {
            port,
            requested,
            live,
            handle,
        }
    }

    pub fn requested_paths(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    /// Connections the client has not closed yet.
    pub fn live_connections(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Waits up to `within` for every client connection to close.
    pub async fn wait_for_idle(&self, within: Duration) -> usize {
        let deadline = tokio::time::Instant::now() + within;
        while self.live_connections() > 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.live_connections()
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Reads one request head and returns its path, or `None` once the client
/// has gone.
async fn read_request(reader: &mut BufReader<OwnedReadHalf>) -> Option<String> {
    let mut request_line = String::new();
    match reader.read_line(&mut request_line).await {
        Ok(0) | Err(_) => return None,
        Ok(_) => {}
    }
    loop {
        let mut header = String::new();
        match reader.read_line(&mut header).await {
            Ok(0) | Err(_) => return None,
            Ok(_) if header == "\r\n" => break,
            Ok(_) => {}
        }
    }
    Some(
        request_line
            .split_whitespace()
            .nth(1)
            .unwrap_or("/")
            .to_string(),
    )
}

async fn drain(mut reader: BufReader<OwnedReadHalf>) {
    let mut buf = [0u8; 512];
    while let Ok(n) = reader.read(&mut buf).await {
        if n == 0 {
            break;
        }
    }
}

/// Reports `name` as the owner of the listed ports and nothing for the rest.
pub struct FakeResolver {
    pub name: &'static str,
    pub ports: Vec<u16>,
}

#[async_trait]
impl ProcessResolver for FakeResolver {
    async fn resolve(&self, port: u16) -> OpenPort {
        if self.ports.contains(&port) {
            OpenPort {
                port,
                pid: Some(40_000 + port as u32),
                process_name: Some(self.name.to_string()),
                command: Some(format!("{} -m uvicorn app:app --port {port}", self.name)),
            }
        } else {
            OpenPort::unresolved(port)
        }
    }
}
