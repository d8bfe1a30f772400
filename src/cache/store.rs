//! # Caché de Respuestas
//! src/cache/store.rs
//!
//! Almacén acotado ruta → contenido, con timestamps de último acceso.
//!
//! ## Invariantes
//!
//! - `len() <= capacity()` después de cualquier operación
//! - A lo sumo una entrada por clave (insertar una clave existente la
//!   actualiza en el lugar)
//! - Tras `sweep(now)` ninguna entrada tiene edad mayor que el TTL
//!
//! Todo el estado interno vive detrás de un único `Mutex`. Las operaciones
//! son O(C), suficiente para capacidades del orden de cientos de entradas.

use super::entry::{CacheEntry, CachedPayload};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// Longitud máxima de una clave (ruta normalizada) en bytes
pub const MAX_KEY_LENGTH: usize = 512;

/// Errores al insertar en la caché
///
/// Ninguno es fatal: quien llama sirve el archivo igual, sin cachearlo.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// La clave supera `MAX_KEY_LENGTH`
    #[error("Key exceeds maximum length of {max} bytes (got {len})")]
    KeyTooLong { len: usize, max: usize },

    /// No se pudo reservar memoria para copiar el payload
    #[error("Failed to allocate {size} bytes for cached payload")]
    Allocation { size: usize },
}

/// Resultado de una inserción exitosa
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Se agregó una entrada nueva sin desalojar
    Inserted,

    /// La clave ya existía y se actualizó en el lugar
    Updated,

    /// La caché estaba llena; se desalojó la entrada con esta clave
    Evicted(String),
}

/// Estadísticas de la caché
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub ttl_secs: u64,
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub updates: u64,
    pub evictions: u64,
    pub expirations: u64,
}

/// Estado protegido por el mutex
#[derive(Debug, Default)]
struct CacheInner {
    entries: Vec<CacheEntry>,
    hits: u64,
    misses: u64,
    inserts: u64,
    updates: u64,
    evictions: u64,
    expirations: u64,
}

impl CacheInner {
    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.key() == key)
    }

    /// Índice de la entrada con menor `last_accessed` (el primero en caso de empate)
    fn oldest(&self) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .min_by_key(|(_, entry)| entry.last_accessed())
            .map(|(idx, _)| idx)
    }
}

/// Caché de respuestas acotada y con TTL
#[derive(Debug)]
pub struct ResponseCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
    ttl: Duration,
}

impl ResponseCache {
    /// Crea una caché vacía con capacidad `capacity` (C) y TTL `ttl` (T)
    ///
    /// Una capacidad de cero se trata como uno.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(CacheInner {
                entries: Vec::with_capacity(capacity),
                ..CacheInner::default()
            }),
            capacity,
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        // Ninguna operación deja el estado a medias, así que un lock
        // envenenado sigue siendo consistente
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Busca `key` y, si hay hit, refresca su último acceso a ahora
    pub fn lookup(&self, key: &str) -> Option<CachedPayload> {
        self.lookup_at(key, Instant::now())
    }

    /// Igual que `lookup`, con el instante explícito
    ///
    /// Una entrada que ya superó el TTL cuenta como miss y se elimina.
    pub fn lookup_at(&self, key: &str, now: Instant) -> Option<CachedPayload> {
        let mut inner = self.lock();

        let Some(idx) = inner.position(key) else {
            inner.misses += 1;
            return None;
        };

        if inner.entries[idx].is_expired(now, self.ttl) {
            inner.entries.swap_remove(idx);
            inner.expirations += 1;
            inner.misses += 1;
            debug!(key, "cache entry expired on lookup");
            return None;
        }

        inner.hits += 1;
        Some(inner.entries[idx].touch(now))
    }

    /// Inserta (o actualiza) el contenido de `key`
    ///
    /// El payload se copia: la caché es dueña exclusiva de su buffer. Si la
    /// caché está llena se desaloja la entrada con menor último acceso.
    pub fn insert(&self, key: &str, payload: &[u8]) -> Result<InsertOutcome, CacheError> {
        self.insert_at(key, payload, Instant::now())
    }

    /// Igual que `insert`, con el instante explícito
    pub fn insert_at(
        &self,
        key: &str,
        payload: &[u8],
        now: Instant,
    ) -> Result<InsertOutcome, CacheError> {
        if key.len() > MAX_KEY_LENGTH {
            return Err(CacheError::KeyTooLong {
                len: key.len(),
                max: MAX_KEY_LENGTH,
            });
        }

        // La copia se hace fuera del lock
        let buffer = copy_payload(payload)?;

        let mut inner = self.lock();

        if let Some(idx) = inner.position(key) {
            inner.entries[idx].replace(buffer, now);
            inner.updates += 1;
            return Ok(InsertOutcome::Updated);
        }

        inner.inserts += 1;

        if inner.entries.len() < self.capacity {
            inner.entries.push(CacheEntry::new(key.to_string(), buffer, now));
            return Ok(InsertOutcome::Inserted);
        }

        // La caché está llena y `capacity >= 1`, así que hay un candidato
        let idx = inner.oldest().unwrap_or_default();
        let evicted = std::mem::replace(
            &mut inner.entries[idx],
            CacheEntry::new(key.to_string(), buffer, now),
        );
        inner.evictions += 1;
        debug!(evicted = evicted.key(), inserted = key, "cache entry evicted");

        Ok(InsertOutcome::Evicted(evicted.key().to_string()))
    }

    /// Elimina toda entrada con edad mayor que el TTL respecto a `now`
    ///
    /// Retorna cuántas entradas se eliminaron.
    pub fn sweep(&self, now: Instant) -> usize {
        let ttl = self.ttl;
        let mut inner = self.lock();

        let before = inner.entries.len();
        inner.entries.retain(|entry| !entry.is_expired(now, ttl));
        let removed = before - inner.entries.len();

        inner.expirations += removed as u64;
        removed
    }

    /// Libera todos los payloads y vacía la caché (apagado)
    pub fn release_all(&self) -> usize {
        let mut inner = self.lock();
        let released = inner.entries.len();
        inner.entries.clear();
        inner.entries.shrink_to_fit();
        released
    }

    /// Número de entradas actuales
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Verifica si la caché está vacía
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capacidad máxima (C)
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Verifica si hay una entrada para `key`, sin tocar su último acceso
    pub fn contains(&self, key: &str) -> bool {
        self.lock().position(key).is_some()
    }

    /// Último acceso de `key`, sin modificarlo
    pub fn last_accessed(&self, key: &str) -> Option<Instant> {
        let inner = self.lock();
        inner.position(key).map(|idx| inner.entries[idx].last_accessed())
    }

    /// Claves presentes, en orden de almacenamiento
    pub fn keys(&self) -> Vec<String> {
        self.lock()
            .entries
            .iter()
            .map(|entry| entry.key().to_string())
            .collect()
    }

    /// Obtiene estadísticas de la caché
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            entries: inner.entries.len(),
            capacity: self.capacity,
            ttl_secs: self.ttl.as_secs(),
            hits: inner.hits,
            misses: inner.misses,
            inserts: inner.inserts,
            updates: inner.updates,
            evictions: inner.evictions,
            expirations: inner.expirations,
        }
    }
}

/// Copia el payload sin abortar si no hay memoria
fn copy_payload(payload: &[u8]) -> Result<Vec<u8>, CacheError> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(payload.len())
        .map_err(|_| CacheError::Allocation { size: payload.len() })?;
    buffer.extend_from_slice(payload);
    Ok(buffer)
}
