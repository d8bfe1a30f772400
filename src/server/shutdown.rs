//! # Señal de Apagado
//! src/server/shutdown.rs
//!
//! Bandera compartida que se dispara una sola vez (Ctrl-C o
//! `ShutdownHandle::shutdown`). Los threads de fondo esperan sobre ella con
//! timeout en lugar de dormir.
//!
//! `SessionRegistry` guarda un clon del socket de cada sesión en curso. Al
//! apagar se cierra su lado de lectura, así ningún worker queda bloqueado
//! esperando a un cliente inactivo.

use std::collections::HashMap;
use std::io;
use std::net::{self, TcpStream};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Default)]
pub struct Shutdown {
    triggered: Mutex<bool>,
    cond: Condvar,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.triggered.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Dispara la señal y despierta a todos los que esperan
    ///
    /// Retorna `true` solo la primera vez.
    pub fn trigger(&self) -> bool {
        let mut triggered = self.lock();
        let first = !*triggered;
        *triggered = true;
        self.cond.notify_all();
        first
    }

    pub fn is_triggered(&self) -> bool {
        *self.lock()
    }

    /// Espera hasta `timeout` o hasta que se dispare la señal
    ///
    /// Retorna `true` si la señal está disparada.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .cond
            .wait_timeout_while(guard, timeout, |triggered| !*triggered)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

/// Sockets de las sesiones que un worker está atendiendo
#[derive(Debug, Default)]
pub struct SessionRegistry {
    inner: Mutex<Sessions>,
}

#[derive(Debug, Default)]
struct Sessions {
    next_id: u64,
    closed: bool,
    streams: HashMap<u64, TcpStream>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Sessions> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registra la sesión de `stream` hasta que se suelte el guard
    ///
    /// Después de `close_all` la sesión no se registra: el guard queda en
    /// modo drenaje (ver `SessionGuard::is_draining`).
    pub fn register(&self, stream: &TcpStream) -> io::Result<SessionGuard<'_>> {
        let mut sessions = self.lock();
        if sessions.closed {
            return Ok(SessionGuard {
                registry: self,
                id: None,
            });
        }

        let clone = stream.try_clone()?;
        let id = sessions.next_id;
        sessions.next_id += 1;
        sessions.streams.insert(id, clone);

        Ok(SessionGuard {
            registry: self,
            id: Some(id),
        })
    }

    /// Cierra la lectura de todas las sesiones registradas
    ///
    /// Retorna cuántas se cortaron. Las sesiones que se registren después
    /// ya no se guardan.
    pub fn close_all(&self) -> usize {
        let mut sessions = self.lock();
        sessions.closed = true;

        for stream in sessions.streams.values() {
            if let Err(e) = stream.shutdown(net::Shutdown::Read) {
                debug!(error = %e, "failed to shut down session socket");
            }
        }
        sessions.streams.len()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().streams.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mantiene una sesión registrada; al soltarse la quita del registro
#[derive(Debug)]
pub struct SessionGuard<'a> {
    registry: &'a SessionRegistry,
    id: Option<u64>,
}

impl SessionGuard<'_> {
    /// La sesión empezó con el apagado en curso
    pub fn is_draining(&self) -> bool {
        self.id.is_none()
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        if let Some(id) = self.id {
            self.registry.lock().streams.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    fn connected_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    #[test]
    fn test_wait_times_out_when_not_triggered() {
        let shutdown = Shutdown::new();
        let start = Instant::now();
        assert!(!shutdown.wait_timeout(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_trigger_wakes_waiter() {
        let shutdown = Arc::new(Shutdown::new());
        let waiter = {
            let shutdown = Arc::clone(&shutdown);
            thread::spawn(move || shutdown.wait_timeout(Duration::from_secs(3600)))
        };

        thread::sleep(Duration::from_millis(20));
        assert!(shutdown.trigger());
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_trigger_is_idempotent() {
        let shutdown = Shutdown::new();
        assert!(shutdown.trigger());
        assert!(!shutdown.trigger());
        assert!(shutdown.is_triggered());
        assert!(shutdown.wait_timeout(Duration::ZERO));
    }

    #[test]
    fn test_close_all_unblocks_idle_reader() {
        let registry = Arc::new(SessionRegistry::new());
        let (_client, server) = connected_pair();

        let reader = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let guard = registry.register(&server).unwrap();
                assert!(!guard.is_draining());
                let mut buf = [0u8; 16];
                (&server).read(&mut buf).unwrap()
            })
        };

        let deadline = Instant::now() + Duration::from_secs(5);
        while registry.is_empty() {
            assert!(Instant::now() < deadline, "session never registered");
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(registry.close_all(), 1);
        assert_eq!(reader.join().unwrap(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_after_close_is_draining() {
        let registry = SessionRegistry::new();
        let (_client, server) = connected_pair();

        assert_eq!(registry.close_all(), 0);
        assert!(registry.is_closed());

        let guard = registry.register(&server).unwrap();
        assert!(guard.is_draining());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_guard_drop_unregisters() {
        let registry = SessionRegistry::new();
        let (_client, server) = connected_pair();

        let guard = registry.register(&server).unwrap();
        assert_eq!(registry.len(), 1);
        drop(guard);
        assert!(registry.is_empty());
    }
}
