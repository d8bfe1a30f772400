//! # Barrido Periódico de la Caché
//! src/cache/sweeper.rs
//!
//! Thread opcional que elimina entradas expiradas cada `interval`. Si no se
//! configura, el barrido ocurre en cada request (ver `handler`).

use super::ResponseCache;
use crate::server::Shutdown;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Inicia el thread de barrido
///
/// El thread termina en cuanto se dispara `shutdown`.
pub fn spawn_sweeper(
    cache: Arc<ResponseCache>,
    interval: Duration,
    shutdown: Arc<Shutdown>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("cache-sweeper".to_string())
        .spawn(move || {
            info!(interval_secs = interval.as_secs(), "cache sweeper started");

            while !shutdown.wait_timeout(interval) {
                let removed = cache.sweep(Instant::now());
                if removed > 0 {
                    info!(removed, remaining = cache.len(), "TTL sweep removed expired entries");
                } else {
                    debug!("TTL sweep: no expired entries");
                }
            }

            debug!("cache sweeper stopped");
        })
}
