//! # Sistema de Métricas
//! src/metrics/mod.rs
//!
//! Contadores de conexiones y requests, aciertos de caché y latencias
//! (p50, p95, p99). El servidor registra el snapshot al apagarse.

pub mod collector;

pub use collector::{CacheOutcome, LatencySummary, MetricsCollector, MetricsSnapshot};
