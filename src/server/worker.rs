//! # Pool de Workers
//! src/server/worker.rs
//!
//! N threads de larga vida creados una sola vez al arrancar. Cada uno:
//!
//! 1. Espera una conexión en la cola (`dequeue` bloqueante)
//! 2. Atiende la sesión completa
//! 3. Vuelve a esperar
//!
//! El loop termina cuando la cola se cierra y queda vacía. Un panic dentro
//! de una sesión se contiene y el worker sigue corriendo.

use super::connection::PendingConnection;
use super::shutdown::SessionRegistry;
use crate::dispatch::DispatchQueue;
use crate::error::{Result, ServerError};
use crate::handler::StaticFileHandler;
use crate::metrics::MetricsCollector;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info};

/// Estado compartido (solo lectura) por todos los workers
pub struct WorkerContext {
    pub handler: StaticFileHandler,
    pub metrics: Arc<MetricsCollector>,
    pub sessions: Arc<SessionRegistry>,
    pub keep_alive_timeout: Option<Duration>,
}

pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Crea `size` workers consumiendo de `queue`
    ///
    /// Si algún thread no se puede crear, cierra la cola, espera a los ya
    /// creados y retorna el error.
    pub fn spawn(
        size: usize,
        queue: DispatchQueue<PendingConnection>,
        context: Arc<WorkerContext>,
    ) -> Result<Self> {
        let mut handles = Vec::with_capacity(size);

        for id in 0..size {
            let name = format!("worker-{}", id);
            let queue_for_worker = queue.clone();
            let context = Arc::clone(&context);

            let spawned = thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker_loop(id, queue_for_worker, context));

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    error!(worker = id, error = %source, "failed to spawn worker thread");
                    queue.close();
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(ServerError::ThreadSpawn { name, source });
                }
            }
        }

        info!(workers = size, "worker pool started");
        Ok(Self { handles })
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Espera a que todos los workers terminen (la cola debe estar cerrada)
    pub fn join(self) {
        for handle in self.handles {
            if handle.join().is_err() {
                error!("worker thread terminated abnormally");
            }
        }
    }
}

fn worker_loop(id: usize, queue: DispatchQueue<PendingConnection>, context: Arc<WorkerContext>) {
    debug!(worker = id, "worker started");

    while let Some(connection) = queue.dequeue() {
        let peer = connection.peer();
        debug!(worker = id, %peer, waited_us = connection.waited().as_micros() as u64, "picked up connection");
        context.metrics.connection_opened();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            connection.serve(
                id,
                &context.handler,
                &context.metrics,
                &context.sessions,
                context.keep_alive_timeout,
            )
        }));

        match outcome {
            Ok(Ok(served)) => debug!(worker = id, %peer, served, "connection finished"),
            Ok(Err(e)) => debug!(worker = id, %peer, error = %e, "connection abandoned"),
            Err(_) => {
                context.metrics.record_worker_panic();
                error!(worker = id, %peer, "panic while handling connection");
            }
        }

        context.metrics.connection_closed();
    }

    debug!(worker = id, "worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResponseCache;
    use std::fs;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};

    fn context(dir: &std::path::Path) -> Arc<WorkerContext> {
        let cache = Arc::new(ResponseCache::new(4, Duration::from_secs(60)));
        Arc::new(WorkerContext {
            handler: StaticFileHandler::new(dir.to_path_buf(), cache, true),
            metrics: Arc::new(MetricsCollector::new()),
            sessions: Arc::new(SessionRegistry::new()),
            keep_alive_timeout: Some(Duration::from_secs(5)),
        })
    }

    #[test]
    fn test_pool_serves_queued_connections() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"alpha").unwrap();
        let ctx = context(dir.path());

        let queue = DispatchQueue::new(8);
        let pool = WorkerPool::spawn(3, queue.clone(), Arc::clone(&ctx)).unwrap();
        assert_eq!(pool.len(), 3);

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let clients: Vec<_> = (0..5)
            .map(|_| {
                thread::spawn(move || {
                    let mut stream = TcpStream::connect(addr).unwrap();
                    stream.write_all(b"GET /a.txt HTTP/1.1\r\n\r\n").unwrap();
                    let mut response = String::new();
                    stream.read_to_string(&mut response).unwrap();
                    response
                })
            })
            .collect();

        for _ in 0..5 {
            let (stream, peer) = listener.accept().unwrap();
            queue
                .try_enqueue(PendingConnection::new(stream, peer, None))
                .unwrap();
        }

        for client in clients {
            assert!(client.join().unwrap().ends_with("alpha"));
        }

        queue.close();
        pool.join();

        let snapshot = ctx.metrics.snapshot();
        assert_eq!(snapshot.requests.total, 5);
        assert_eq!(snapshot.connections.active, 0);
    }

    #[test]
    fn test_pool_exits_when_queue_closed() {
        let dir = tempfile::tempdir().unwrap();
        let queue: DispatchQueue<PendingConnection> = DispatchQueue::new(1);
        let pool = WorkerPool::spawn(2, queue.clone(), context(dir.path())).unwrap();

        queue.close();
        pool.join();
    }
}
