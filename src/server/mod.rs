//! # Servidor HTTP
//! src/server/mod.rs
//!
//! Un único thread acceptor alimenta la cola de despacho; un pool fijo de
//! workers la consume:
//!
//! ```text
//! accept() ──> [admisión] ──> DispatchQueue ──> worker 0..N ──> ResponseCache
//!                                                                 │ (miss)
//!                                                                 └─> disco
//! ```
//!
//! Si la cola está llena o se alcanzó el techo de admisión, la conexión se
//! cierra en el acto y se registra; el acceptor nunca bloquea por la cola.

pub mod connection;
pub mod shutdown;
pub mod worker;

pub use connection::PendingConnection;
pub use shutdown::{SessionRegistry, Shutdown};
pub use worker::{WorkerContext, WorkerPool};

use crate::cache::{spawn_sweeper, ResponseCache};
use crate::config::Config;
use crate::dispatch::{AdmissionGate, AdmissionMode, AdmissionPermit, DispatchQueue};
use crate::error::{Result, ServerError};
use crate::handler::StaticFileHandler;
use crate::metrics::MetricsCollector;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Pausa tras un error de `accept()` (por ejemplo, sin descriptores libres)
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Servidor de archivos estáticos ya ligado a su puerto
pub struct Server {
    config: Config,
    listener: TcpListener,
    local_addr: SocketAddr,
    cache: Arc<ResponseCache>,
    queue: DispatchQueue<PendingConnection>,
    gate: Option<Arc<AdmissionGate>>,
    metrics: Arc<MetricsCollector>,
    shutdown: Arc<Shutdown>,
    sessions: Arc<SessionRegistry>,
}

impl Server {
    /// Valida la configuración, construye los componentes y hace bind
    ///
    /// Ningún thread se crea aquí; eso ocurre en `run`.
    pub fn bind(config: Config) -> Result<Self> {
        config.validate()?;

        let address = config.address();
        let listener = TcpListener::bind(&address).map_err(|e| ServerError::bind(&address, e))?;
        let local_addr = listener.local_addr()?;

        let cache = Arc::new(ResponseCache::new(config.cache_capacity, config.cache_ttl()));
        let queue = DispatchQueue::new(config.queue_capacity);
        let gate = config.admission_limit().map(|limit| AdmissionGate::new(Some(limit)));

        Ok(Self {
            config,
            listener,
            local_addr,
            cache,
            queue,
            gate,
            metrics: Arc::new(MetricsCollector::new()),
            shutdown: Arc::new(Shutdown::new()),
            sessions: Arc::new(SessionRegistry::new()),
        })
    }

    /// Dirección real en la que escucha (útil con puerto 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Configuración ya validada
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    pub fn queue(&self) -> &DispatchQueue<PendingConnection> {
        &self.queue
    }

    /// Handle para pedir el apagado desde otro thread (Ctrl-C, tests)
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            shutdown: Arc::clone(&self.shutdown),
            sessions: Arc::clone(&self.sessions),
            gate: self.gate.clone(),
            wake_addr: wake_address(self.local_addr),
        }
    }

    /// Arranca workers y sweeper y corre el loop de accept hasta el apagado
    ///
    /// Al volver, todas las conexiones encoladas fueron atendidas, los
    /// workers terminaron y la caché quedó vacía.
    pub fn run(self) -> Result<()> {
        let sweep_interval = self.config.sweep_interval();

        let sweeper = match sweep_interval {
            Some(interval) => Some(
                spawn_sweeper(Arc::clone(&self.cache), interval, Arc::clone(&self.shutdown))
                    .map_err(|source| ServerError::ThreadSpawn {
                        name: "cache-sweeper".to_string(),
                        source,
                    })?,
            ),
            None => None,
        };

        let context = Arc::new(WorkerContext {
            handler: StaticFileHandler::new(
                self.config.web_root.clone(),
                Arc::clone(&self.cache),
                sweep_interval.is_none(),
            ),
            metrics: Arc::clone(&self.metrics),
            sessions: Arc::clone(&self.sessions),
            keep_alive_timeout: self.config.keep_alive_timeout(),
        });

        let pool = match WorkerPool::spawn(self.config.workers, self.queue.clone(), context) {
            Ok(pool) => pool,
            Err(e) => {
                self.shutdown.trigger();
                if let Some(handle) = sweeper {
                    let _ = handle.join();
                }
                return Err(e);
            }
        };

        info!(
            addr = %self.local_addr,
            workers = pool.len(),
            queue_capacity = self.queue.capacity(),
            "server listening"
        );

        self.accept_loop();

        info!("shutting down, draining queued connections");
        self.queue.close();
        pool.join();

        if let Some(handle) = sweeper {
            if handle.join().is_err() {
                error!("cache sweeper terminated abnormally");
            }
        }

        let cache_stats = serde_json::to_string(&self.cache.stats()).unwrap_or_default();
        let queue_stats = serde_json::to_string(&self.queue.stats()).unwrap_or_default();
        let released = self.cache.release_all();

        info!(released, "cache released");
        info!(cache = %cache_stats, queue = %queue_stats, "final cache and queue stats");
        info!(metrics = %self.metrics.to_json(), "final metrics");

        Ok(())
    }

    fn accept_loop(&self) {
        let wait_for_room = self.config.admission_mode == AdmissionMode::Wait;

        loop {
            if self.shutdown.is_triggered() {
                break;
            }

            // En modo `wait` el lugar se reserva antes de aceptar
            let reserved = match &self.gate {
                Some(gate) if wait_for_room => match gate.acquire() {
                    Some(permit) => Some(permit),
                    None => break,
                },
                _ => None,
            };

            let (stream, peer) = match self.listener.accept() {
                Ok(accepted) => accepted,
                Err(e) => {
                    if self.shutdown.is_triggered() {
                        break;
                    }
                    self.metrics.record_accept_error();
                    warn!(error = %e, "accept failed");
                    thread::sleep(ACCEPT_ERROR_BACKOFF);
                    continue;
                }
            };

            if self.shutdown.is_triggered() {
                debug!(%peer, "connection accepted during shutdown, closing");
                break;
            }

            let Some(permit) = self.admit(reserved, peer) else {
                continue;
            };

            match self.queue.try_enqueue(PendingConnection::new(stream, peer, permit)) {
                Ok(()) => {
                    self.metrics.record_accepted();
                    debug!(%peer, queued = self.queue.len(), "connection queued");
                }
                Err(rejected) => {
                    self.metrics.record_queue_full();
                    warn!(%peer, reason = %rejected.reason, "closing connection");
                    drop(rejected.into_inner());
                }
            }
        }
    }

    /// Aplica el techo de admisión en modo `reject`
    ///
    /// Retorna `None` si la conexión debe cerrarse; `Some(None)` si no hay
    /// techo configurado.
    fn admit(
        &self,
        reserved: Option<AdmissionPermit>,
        peer: SocketAddr,
    ) -> Option<Option<AdmissionPermit>> {
        if reserved.is_some() {
            return Some(reserved);
        }

        let Some(gate) = &self.gate else {
            return Some(None);
        };

        match gate.try_acquire() {
            Some(permit) => Some(Some(permit)),
            None => {
                self.metrics.record_admission_rejected();
                warn!(
                    %peer,
                    in_flight = gate.in_flight(),
                    limit = ?gate.limit(),
                    "admission ceiling reached, closing connection"
                );
                None
            }
        }
    }
}

/// Pide el apagado ordenado del servidor
#[derive(Clone)]
pub struct ShutdownHandle {
    shutdown: Arc<Shutdown>,
    sessions: Arc<SessionRegistry>,
    gate: Option<Arc<AdmissionGate>>,
    wake_addr: SocketAddr,
}

impl ShutdownHandle {
    /// Dispara el apagado, corta las sesiones en curso y despierta al acceptor
    ///
    /// Las conexiones que ya están en cola se atienden igual (un request
    /// cada una). Llamarlo más de una vez no tiene efecto.
    pub fn shutdown(&self) {
        if !self.shutdown.trigger() {
            return;
        }
        info!("shutdown requested");

        if let Some(gate) = &self.gate {
            gate.close();
        }

        let cut = self.sessions.close_all();
        debug!(sessions = cut, "in-flight sessions closed for reading");

        // `accept()` no tiene timeout: una conexión propia lo desbloquea
        if let Err(e) = TcpStream::connect_timeout(&self.wake_addr, Duration::from_secs(1)) {
            debug!(error = %e, "wake-up connection failed");
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.shutdown.is_triggered()
    }
}

/// Dirección a la que conectarse para despertar al acceptor
fn wake_address(local: SocketAddr) -> SocketAddr {
    let ip = match local.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, local.port())
}
