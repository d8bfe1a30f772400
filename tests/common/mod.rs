//! Helpers compartidos por los tests de integración
//!
//! Cada test levanta su propio servidor en un puerto efímero con una raíz
//! web temporal.

#![allow(dead_code)]

use static_server::cache::ResponseCache;
use static_server::config::Config;
use static_server::dispatch::DispatchQueue;
use static_server::error::Result;
use static_server::metrics::MetricsCollector;
use static_server::server::{PendingConnection, Server, ShutdownHandle};
use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tempfile::TempDir;

pub struct TestServer {
    pub addr: SocketAddr,
    pub cache: Arc<ResponseCache>,
    pub metrics: Arc<MetricsCollector>,
    pub queue: DispatchQueue<PendingConnection>,
    handle: ShutdownHandle,
    runner: Option<JoinHandle<Result<()>>>,
    root: TempDir,
}

impl TestServer {
    /// Levanta un servidor con `files` en la raíz web
    pub fn start(files: &[(&str, &[u8])], configure: impl FnOnce(&mut Config)) -> Self {
        let root = tempfile::tempdir().expect("tempdir");
        for (name, contents) in files {
            let path = root.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, contents).unwrap();
        }

        let mut config = Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            web_root: root.path().to_path_buf(),
            workers: 2,
            queue_capacity: 16,
            no_log_file: true,
            ..Config::default()
        };
        configure(&mut config);

        let server = Server::bind(config).expect("bind");
        let addr = server.local_addr();
        let cache = Arc::clone(server.cache());
        let metrics = Arc::clone(server.metrics());
        let queue = server.queue().clone();
        let handle = server.shutdown_handle();
        let runner = thread::spawn(move || server.run());

        Self {
            addr,
            cache,
            metrics,
            queue,
            handle,
            runner: Some(runner),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Clave de caché de un archivo de la raíz web
    pub fn key(&self, name: &str) -> String {
        self.root.path().join(name).to_string_lossy().into_owned()
    }

    pub fn connect(&self) -> TcpStream {
        let stream = TcpStream::connect(self.addr).expect("connect");
        stream.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
        stream
    }

    /// Request único con `Connection: close`
    pub fn get(&self, path: &str) -> HttpResponse {
        let mut stream = self.connect();
        write!(stream, "GET {} HTTP/1.1\r\nHost: test\r\n\r\n", path).unwrap();
        let mut reader = BufReader::new(stream);
        read_response(&mut reader).expect("response")
    }

    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        self.handle.shutdown();
        if let Some(runner) = self.runner.take() {
            runner.join().expect("server thread").expect("server run");
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.runner.is_some() && !thread::panicking() {
            self.shutdown_and_join();
        }
    }
}

#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Lee una response usando `Content-Length`; `None` si la conexión se cerró
pub fn read_response<R: Read>(reader: &mut BufReader<R>) -> Option<HttpResponse> {
    let mut status_line = String::new();
    if reader.read_line(&mut status_line).ok()? == 0 {
        return None;
    }
    let status = status_line.split_whitespace().nth(1)?.parse().ok()?;

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        let (name, value) = line.split_once(':')?;
        headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
    }

    let len: usize = headers.get("content-length")?.parse().ok()?;
    let mut body = vec![0; len];
    reader.read_exact(&mut body).ok()?;

    Some(HttpResponse {
        status,
        headers,
        body,
    })
}

/// Espera (con límite) a que `condition` se cumpla
pub fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(5));
    }
}

/// Verifica que el servidor cerró la conexión sin responder
pub fn assert_closed_without_response(stream: &mut TcpStream) {
    let mut buf = [0u8; 64];
    match stream.read(&mut buf) {
        Ok(n) => assert_eq!(n, 0, "expected the server to close the connection"),
        Err(e) => assert!(
            matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::ConnectionAborted
            ),
            "unexpected error: {}",
            e
        ),
    }
}
