//! # Entrada de la Caché
//! src/cache/entry.rs
//!
//! Una entrada guarda el contenido de un archivo, su tamaño y el instante del
//! último acceso. El payload pertenece exclusivamente a la caché: hacia afuera
//! solo se entrega como `CachedPayload`, una vista de solo lectura.

use std::ops::Deref;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Vista de solo lectura sobre el contenido cacheado
///
/// No expone ninguna forma de mutar los bytes. Sigue siendo válida aunque la
/// entrada sea desalojada mientras se escribe la respuesta.
#[derive(Debug, Clone)]
pub struct CachedPayload(Arc<[u8]>);

impl CachedPayload {
    /// Tamaño en bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Verifica si el payload está vacío
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Bytes del payload
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for CachedPayload {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for CachedPayload {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Entrada individual de la caché
#[derive(Debug)]
pub struct CacheEntry {
    /// Ruta normalizada del archivo
    key: String,

    /// Contenido del archivo
    payload: Arc<[u8]>,

    /// Instante del último acceso (inserción o hit)
    last_accessed: Instant,
}

impl CacheEntry {
    /// Crea una entrada a partir de un buffer ya copiado
    pub(crate) fn new(key: String, payload: Vec<u8>, now: Instant) -> Self {
        Self {
            key,
            payload: payload.into(),
            last_accessed: now,
        }
    }

    /// Ruta normalizada del archivo
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Tamaño del payload en bytes
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// Instante del último acceso
    pub fn last_accessed(&self) -> Instant {
        self.last_accessed
    }

    /// Edad de la entrada respecto a `now`
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_accessed)
    }

    /// Una entrada expira cuando su edad supera estrictamente el TTL
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        self.age(now) > ttl
    }

    /// Refresca el último acceso y devuelve la vista de lectura
    pub(crate) fn touch(&mut self, now: Instant) -> CachedPayload {
        self.last_accessed = now;
        CachedPayload(Arc::clone(&self.payload))
    }

    /// Reemplaza el contenido (actualización en el lugar)
    pub(crate) fn replace(&mut self, payload: Vec<u8>, now: Instant) {
        self.payload = payload.into();
        self.last_accessed = now;
    }
}
