//! # Conexión Pendiente y Sesión Keep-Alive
//! src/server/connection.rs
//!
//! Una `PendingConnection` viaja acceptor → cola → exactamente un worker.
//! El worker la consume con `serve`, que atiende requests en secuencia
//! mientras el cliente pida `Connection: keep-alive`.

use super::shutdown::SessionRegistry;
use crate::dispatch::AdmissionPermit;
use crate::handler::StaticFileHandler;
use crate::http::{read_head, Request, Response};
use crate::metrics::{CacheOutcome, MetricsCollector};
use std::io::{self, BufReader};
use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Espera máxima por el request de una conexión atendida durante el apagado
const DRAIN_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Socket aceptado que todavía no atendió ningún worker
#[derive(Debug)]
pub struct PendingConnection {
    stream: TcpStream,
    peer: SocketAddr,
    accepted_at: Instant,
    /// Se libera al soltar la conexión
    _permit: Option<AdmissionPermit>,
}

impl PendingConnection {
    pub fn new(stream: TcpStream, peer: SocketAddr, permit: Option<AdmissionPermit>) -> Self {
        Self {
            stream,
            peer,
            accepted_at: Instant::now(),
            _permit: permit,
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Tiempo que la conexión lleva aceptada (incluye la espera en cola)
    pub fn waited(&self) -> Duration {
        self.accepted_at.elapsed()
    }

    /// Atiende la sesión completa y cierra el socket al terminar
    ///
    /// Retorna la cantidad de responses enviadas. Los errores de I/O
    /// abandonan la conexión; nunca afectan a otras.
    ///
    /// La sesión queda en `sessions` mientras dura. Una conexión que empieza
    /// con el apagado en curso atiende a lo sumo un request y espera por él
    /// como mucho `DRAIN_READ_TIMEOUT`.
    pub fn serve(
        self,
        worker: usize,
        handler: &StaticFileHandler,
        metrics: &MetricsCollector,
        sessions: &SessionRegistry,
        idle_timeout: Option<Duration>,
    ) -> io::Result<usize> {
        let session = sessions.register(&self.stream)?;
        let read_timeout = if session.is_draining() {
            Some(idle_timeout.map_or(DRAIN_READ_TIMEOUT, |t| t.min(DRAIN_READ_TIMEOUT)))
        } else {
            idle_timeout
        };

        self.stream.set_read_timeout(read_timeout)?;
        self.stream.set_write_timeout(idle_timeout)?;

        let peer = self.peer;
        let mut reader = BufReader::new(&self.stream);
        let mut writer = &self.stream;
        let mut served = 0;

        loop {
            let head = match read_head(&mut reader) {
                Ok(Some(head)) => head,
                Ok(None) => {
                    debug!(worker, %peer, served, "client closed connection");
                    break;
                }
                Err(e) if is_timeout(&e) => {
                    debug!(worker, %peer, served, "keep-alive idle timeout");
                    break;
                }
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    let start = Instant::now();
                    warn!(worker, %peer, error = %e, "rejecting request head");
                    send_bad_request(&mut writer, metrics, start)?;
                    served += 1;
                    break;
                }
                Err(e) => return Err(e),
            };

            let start = Instant::now();
            let request = match Request::parse(&head) {
                Ok(request) => request,
                Err(e) => {
                    warn!(worker, %peer, error = %e, "malformed request");
                    send_bad_request(&mut writer, metrics, start)?;
                    served += 1;
                    break;
                }
            };

            // Tras el apagado no se mantiene ninguna conexión abierta
            let keep_alive = request.keep_alive() && !sessions.is_closed();
            let handled = handler.handle(&request, keep_alive);
            handled.response.write_to(&mut writer)?;
            served += 1;

            let latency = start.elapsed();
            let status = handled.response.status();
            metrics.record_request(status.as_u16(), handled.cache, latency);

            info!(
                worker,
                %peer,
                method = request.method().as_str(),
                path = request.path(),
                status = status.as_u16(),
                cache = ?handled.cache,
                latency_us = latency.as_micros() as u64,
                "request served"
            );

            if !keep_alive {
                break;
            }
        }

        Ok(served)
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

fn send_bad_request(
    writer: &mut &TcpStream,
    metrics: &MetricsCollector,
    start: Instant,
) -> io::Result<()> {
    let response = Response::bad_request().with_header("Connection", "close");
    response.write_to(writer)?;
    metrics.record_request(
        response.status().as_u16(),
        CacheOutcome::NotApplicable,
        start.elapsed(),
    );
    Ok(())
}
