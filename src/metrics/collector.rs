//! # Collector de Métricas
//! src/metrics/collector.rs
//!
//! Contadores del servidor compartidos entre el acceptor y los workers:
//! conexiones aceptadas y rechazadas, requests por código de estado,
//! aciertos de caché y latencias de respuesta.

use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Máximo de latencias guardadas para calcular percentiles
const MAX_LATENCY_SAMPLES: usize = 10_000;

/// Resultado de la consulta a la caché para un request atendido
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Servido desde la caché
    Hit,
    /// Leído de disco e insertado
    Miss,
    /// Leído de disco sin poder insertarlo
    Bypass,
    /// No llegó a consultar la caché (404, 400)
    NotApplicable,
}

/// Collector de métricas thread-safe
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsData>>,
    start_time: Instant,
}

#[derive(Default)]
struct MetricsData {
    accepted: u64,
    rejected_queue_full: u64,
    rejected_admission: u64,
    accept_errors: u64,
    active_connections: u64,
    worker_panics: u64,

    total_requests: u64,
    status_codes: BTreeMap<u16, u64>,

    cache_hits: u64,
    cache_misses: u64,
    cache_bypasses: u64,

    /// Ventana de latencias en microsegundos
    latencies: VecDeque<u64>,
}

impl MetricsCollector {
    /// Crea un nuevo collector de métricas
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsData {
                latencies: VecDeque::with_capacity(1024),
                ..MetricsData::default()
            })),
            start_time: Instant::now(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MetricsData> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Conexión aceptada y encolada
    pub fn record_accepted(&self) {
        self.lock().accepted += 1;
    }

    /// Conexión cerrada porque la cola estaba llena
    pub fn record_queue_full(&self) {
        self.lock().rejected_queue_full += 1;
    }

    /// Conexión cerrada por el techo de admisión
    pub fn record_admission_rejected(&self) {
        self.lock().rejected_admission += 1;
    }

    /// Error transitorio de `accept()`
    pub fn record_accept_error(&self) {
        self.lock().accept_errors += 1;
    }

    /// Panic contenido dentro de un worker
    pub fn record_worker_panic(&self) {
        self.lock().worker_panics += 1;
    }

    /// Un worker tomó una conexión
    pub fn connection_opened(&self) {
        self.lock().active_connections += 1;
    }

    /// Un worker terminó con una conexión
    pub fn connection_closed(&self) {
        let mut data = self.lock();
        data.active_connections = data.active_connections.saturating_sub(1);
    }

    /// Conexiones siendo atendidas por workers
    pub fn active_connections(&self) -> u64 {
        self.lock().active_connections
    }

    /// Registra un request respondido
    pub fn record_request(&self, status_code: u16, cache: CacheOutcome, latency: Duration) {
        let mut data = self.lock();

        data.total_requests += 1;
        *data.status_codes.entry(status_code).or_insert(0) += 1;

        match cache {
            CacheOutcome::Hit => data.cache_hits += 1,
            CacheOutcome::Miss => data.cache_misses += 1,
            CacheOutcome::Bypass => {
                data.cache_misses += 1;
                data.cache_bypasses += 1;
            }
            CacheOutcome::NotApplicable => {}
        }

        if data.latencies.len() >= MAX_LATENCY_SAMPLES {
            data.latencies.pop_front();
        }
        let latency_us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        data.latencies.push_back(latency_us);
    }

    /// Obtiene un snapshot de las métricas
    pub fn snapshot(&self) -> MetricsSnapshot {
        let data = self.lock();
        let latency = LatencySummary::from_samples(data.latencies.iter().copied());

        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            connections: ConnectionCounters {
                accepted: data.accepted,
                rejected_queue_full: data.rejected_queue_full,
                rejected_admission: data.rejected_admission,
                accept_errors: data.accept_errors,
                active: data.active_connections,
                worker_panics: data.worker_panics,
            },
            requests: RequestCounters {
                total: data.total_requests,
                status_codes: data.status_codes.clone(),
                cache_hits: data.cache_hits,
                cache_misses: data.cache_misses,
                cache_bypasses: data.cache_bypasses,
            },
            latency_us: latency,
        }
    }

    /// Snapshot serializado como JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot de métricas (para logs y tests)
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub connections: ConnectionCounters,
    pub requests: RequestCounters,
    pub latency_us: LatencySummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionCounters {
    pub accepted: u64,
    pub rejected_queue_full: u64,
    pub rejected_admission: u64,
    pub accept_errors: u64,
    pub active: u64,
    pub worker_panics: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestCounters {
    pub total: u64,
    pub status_codes: BTreeMap<u16, u64>,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_bypasses: u64,
}

/// Percentiles sobre la ventana de latencias
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LatencySummary {
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub avg: u64,
    pub samples: usize,
}

impl LatencySummary {
    fn from_samples(samples: impl Iterator<Item = u64>) -> Self {
        let mut sorted: Vec<u64> = samples.collect();
        if sorted.is_empty() {
            return Self::default();
        }
        sorted.sort_unstable();

        let len = sorted.len();
        let sum: u128 = sorted.iter().map(|&v| u128::from(v)).sum();

        Self {
            p50: sorted[len * 50 / 100],
            p95: sorted[len * 95 / 100],
            p99: sorted[len * 99 / 100],
            avg: (sum / len as u128) as u64,
            samples: len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_requests_by_status() {
        let collector = MetricsCollector::new();

        collector.record_request(200, CacheOutcome::Miss, Duration::from_millis(10));
        collector.record_request(200, CacheOutcome::Hit, Duration::from_millis(2));
        collector.record_request(404, CacheOutcome::NotApplicable, Duration::from_millis(1));

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.requests.total, 3);
        assert_eq!(snapshot.requests.status_codes.get(&200), Some(&2));
        assert_eq!(snapshot.requests.status_codes.get(&404), Some(&1));
        assert_eq!(snapshot.requests.cache_hits, 1);
        assert_eq!(snapshot.requests.cache_misses, 1);
    }

    #[test]
    fn test_bypass_counts_as_miss() {
        let collector = MetricsCollector::new();
        collector.record_request(200, CacheOutcome::Bypass, Duration::ZERO);

        let requests = collector.snapshot().requests;
        assert_eq!(requests.cache_misses, 1);
        assert_eq!(requests.cache_bypasses, 1);
    }

    #[test]
    fn test_percentiles() {
        let collector = MetricsCollector::new();
        for i in 1..=100 {
            collector.record_request(200, CacheOutcome::Hit, Duration::from_micros(i));
        }

        let latency = collector.snapshot().latency_us;
        assert_eq!(latency.samples, 100);
        assert!(latency.p50 > 0);
        assert!(latency.p95 > latency.p50);
        assert!(latency.p99 > latency.p95);
    }

    #[test]
    fn test_latency_window_is_bounded() {
        let collector = MetricsCollector::new();
        for i in 0..(MAX_LATENCY_SAMPLES as u64 + 500) {
            collector.record_request(200, CacheOutcome::Hit, Duration::from_micros(i));
        }

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.requests.total, MAX_LATENCY_SAMPLES as u64 + 500);
        assert_eq!(snapshot.latency_us.samples, MAX_LATENCY_SAMPLES);
    }

    #[test]
    fn test_connection_counters() {
        let collector = MetricsCollector::new();

        collector.record_accepted();
        collector.record_accepted();
        collector.record_queue_full();
        collector.record_admission_rejected();
        collector.record_accept_error();

        collector.connection_opened();
        assert_eq!(collector.active_connections(), 1);
        collector.connection_closed();
        collector.connection_closed();
        assert_eq!(collector.active_connections(), 0);

        let connections = collector.snapshot().connections;
        assert_eq!(connections.accepted, 2);
        assert_eq!(connections.rejected_queue_full, 1);
        assert_eq!(connections.rejected_admission, 1);
        assert_eq!(connections.accept_errors, 1);
    }

    #[test]
    fn test_json_format() {
        let collector = MetricsCollector::new();
        collector.record_request(200, CacheOutcome::Miss, Duration::from_millis(5));

        let value: serde_json::Value = serde_json::from_str(&collector.to_json()).unwrap();
        assert_eq!(value["requests"]["total"], 1);
        assert_eq!(value["requests"]["status_codes"]["200"], 1);
        assert_eq!(value["latency_us"]["samples"], 1);
    }
}
