//! # Handler de Archivos Estáticos
//! src/handler/mod.rs
//!
//! Atiende un request ya parseado:
//!
//! 1. Solo GET; cualquier otro método responde 404
//! 2. Resuelve la ruta bajo la raíz web
//! 3. Barre la caché (si el barrido es por request)
//! 4. Consulta la caché; en un fallo lee el archivo y lo inserta
//!
//! Si la caché no puede guardar el archivo (clave demasiado larga o falta de
//! memoria), el request se responde igual desde el buffer ya leído.

pub mod files;

use crate::cache::{InsertOutcome, ResponseCache};
use crate::http::{Method, Request, Response, StatusCode};
use crate::metrics::CacheOutcome;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Valor de `Cache-Control` en las respuestas 200
pub const CACHE_CONTROL: &str = "max-age=3600";

/// Respuesta producida por el handler junto con el resultado de la caché
#[derive(Debug)]
pub struct Handled {
    pub response: Response,
    pub cache: CacheOutcome,
}

/// Sirve archivos de `web_root` a través de la caché compartida
pub struct StaticFileHandler {
    web_root: PathBuf,
    cache: Arc<ResponseCache>,
    sweep_per_request: bool,
}

impl StaticFileHandler {
    pub fn new(web_root: PathBuf, cache: Arc<ResponseCache>, sweep_per_request: bool) -> Self {
        Self {
            web_root,
            cache,
            sweep_per_request,
        }
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Construye la respuesta para `request`
    ///
    /// Nunca falla: los errores del cliente o del disco terminan en 404.
    pub fn handle(&self, request: &Request, keep_alive: bool) -> Handled {
        if *request.method() != Method::GET {
            debug!(method = request.method().as_str(), "method not served");
            return not_found(keep_alive);
        }

        let Some(path) = files::resolve(&self.web_root, request.path()) else {
            debug!(path = request.path(), "path escapes web root");
            return not_found(keep_alive);
        };

        if self.sweep_per_request {
            let removed = self.cache.sweep(Instant::now());
            if removed > 0 {
                debug!(removed, "TTL sweep removed expired entries");
            }
        }

        let key = files::cache_key(&path);

        if let Some(payload) = self.cache.lookup(&key) {
            debug!(key = %key, size = payload.len(), "cache hit");
            let response = Response::new(StatusCode::Ok).with_cached_body(payload);
            return Handled {
                response: finish_ok(response, keep_alive, "HIT"),
                cache: CacheOutcome::Hit,
            };
        }

        let bytes = match files::read_file(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "file not readable");
                return not_found(keep_alive);
            }
        };

        let outcome = match self.cache.insert(&key, &bytes) {
            Ok(InsertOutcome::Evicted(victim)) => {
                info!(key = %key, evicted = %victim, "cache full, evicted least recently used entry");
                CacheOutcome::Miss
            }
            Ok(_) => {
                debug!(key = %key, size = bytes.len(), "cached file");
                CacheOutcome::Miss
            }
            Err(e) => {
                warn!(key = %key, error = %e, "serving without caching");
                CacheOutcome::Bypass
            }
        };

        let response = Response::new(StatusCode::Ok).with_body_bytes(bytes);
        Handled {
            response: finish_ok(response, keep_alive, "MISS"),
            cache: outcome,
        }
    }
}

fn connection_value(keep_alive: bool) -> &'static str {
    if keep_alive {
        "keep-alive"
    } else {
        "close"
    }
}

/// Completa una respuesta 200 que ya tiene body (y `Content-Length`)
fn finish_ok(response: Response, keep_alive: bool, x_cache: &str) -> Response {
    response
        .with_header("Cache-Control", CACHE_CONTROL)
        .with_header("Connection", connection_value(keep_alive))
        .with_header("X-Cache", x_cache)
}

fn not_found(keep_alive: bool) -> Handled {
    Handled {
        response: Response::not_found().with_header("Connection", connection_value(keep_alive)),
        cache: CacheOutcome::NotApplicable,
    }
}
