//! # Static File Server
//! src/lib.rs
//!
//! Servidor HTTP/1.1 concurrente de archivos estáticos con caché en memoria.
//! Un thread acepta conexiones y las deja en una cola acotada; un pool fijo
//! de workers las atiende consultando primero la caché.
//!
//! ## Arquitectura
//!
//! - `cache`: caché acotada con expiración por TTL y desalojo del entry
//!   menos recientemente usado
//! - `dispatch`: cola de conexiones pendientes y techo de admisión
//! - `server`: acceptor, pool de workers, sesiones keep-alive y apagado
//! - `handler`: resolución de rutas y lectura de archivos
//! - `http`: parsing de requests y construcción de responses
//! - `metrics`: contadores y latencias
//! - `config`, `error`, `logging`: configuración, errores fatales y logs
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use static_server::config::Config;
//! use static_server::server::Server;
//!
//! let config = Config::default();
//! let server = Server::bind(config).expect("bind");
//! server.run().expect("Error al correr el servidor");
//! ```

pub mod cache;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod server;
