//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración inmutable del servidor con soporte para argumentos CLI y
//! variables de entorno. Se resuelve una sola vez al arrancar, antes de
//! construir la caché, la cola o cualquier worker.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./static_server --port 8080 \
//!   --threads 10 \
//!   --queues 500 \
//!   --webroot ./public \
//!   --cache-capacity 128 \
//!   --cache-ttl 1800
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 WEB_ROOT=./public ./static_server
//! ```

use crate::dispatch::AdmissionMode;
use crate::error::{Result, ServerError};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuración del servidor de archivos estáticos
#[derive(Debug, Clone, Parser)]
#[command(name = "static_server")]
#[command(about = "Servidor HTTP/1.1 concurrente de archivos estáticos con caché en memoria")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "0.0.0.0", env = "HTTP_HOST")]
    pub host: String,

    /// Directorio raíz desde el que se sirven los archivos
    #[arg(short = 'w', long = "webroot", default_value = ".", env = "WEB_ROOT")]
    pub web_root: PathBuf,

    // === Pool y cola ===

    /// Número de workers del pool (N)
    #[arg(short = 't', long = "threads", default_value = "10", env = "WORKERS")]
    pub workers: usize,

    /// Capacidad de la cola de despacho (Q)
    #[arg(short = 'q', long = "queues", default_value = "500", env = "QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    // === Admisión ===

    /// Máximo de conexiones simultáneas en vuelo (0 = sin límite)
    #[arg(long = "max-connections", default_value = "0", env = "MAX_CONNECTIONS")]
    pub max_connections: usize,

    /// Qué hacer al llegar al límite: rechazar o esperar antes de accept()
    #[arg(long = "admission-mode", value_enum, default_value = "reject", env = "ADMISSION_MODE")]
    pub admission_mode: AdmissionMode,

    // === Caché ===

    /// Máximo de entradas en la caché (C)
    #[arg(long = "cache-capacity", default_value = "128", env = "CACHE_CAPACITY")]
    pub cache_capacity: usize,

    /// Tiempo de vida de una entrada en segundos (T)
    #[arg(long = "cache-ttl", default_value = "1800", env = "CACHE_TTL")]
    pub cache_ttl_secs: u64,

    /// Intervalo del barrido de expirados en segundos (0 = en cada request)
    #[arg(long = "sweep-interval", default_value = "0", env = "SWEEP_INTERVAL")]
    pub sweep_interval_secs: u64,

    // === Conexiones ===

    /// Timeout de lectura en keep-alive, en segundos (0 = sin timeout)
    #[arg(long = "keep-alive-timeout", default_value = "5", env = "KEEP_ALIVE_TIMEOUT")]
    pub keep_alive_timeout_secs: u64,

    // === Logging ===

    /// Directorio donde se escriben los archivos server_YYYY-MM-DD.log
    #[arg(long = "log-dir", default_value = "./logs", env = "LOG_DIR")]
    pub log_dir: PathBuf,

    /// Desactiva el archivo de log (solo consola)
    #[arg(long = "no-log-file", default_value_t = false)]
    pub no_log_file: bool,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use static_server::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "0.0.0.0:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// TTL de la caché como `Duration`
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Intervalo del sweeper; `None` significa barrido en cada request
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }

    /// Timeout de lectura/escritura por conexión; `None` si está desactivado
    pub fn keep_alive_timeout(&self) -> Option<Duration> {
        (self.keep_alive_timeout_secs > 0).then(|| Duration::from_secs(self.keep_alive_timeout_secs))
    }

    /// Límite de admisión; `None` si no hay techo
    pub fn admission_limit(&self) -> Option<usize> {
        (self.max_connections > 0).then_some(self.max_connections)
    }

    /// Directorio de logs, o `None` si el archivo está desactivado
    pub fn log_dir(&self) -> Option<&Path> {
        (!self.no_log_file).then_some(self.log_dir.as_path())
    }

    /// Valida la configuración
    ///
    /// Retorna error si hay valores inválidos. Se llama antes de construir
    /// cualquier componente: un error aquí es fatal.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(ServerError::InvalidConfig("Workers must be >= 1".to_string()));
        }
        if self.queue_capacity == 0 {
            return Err(ServerError::InvalidConfig("Queue capacity must be >= 1".to_string()));
        }
        if self.cache_capacity == 0 {
            return Err(ServerError::InvalidConfig("Cache capacity must be >= 1".to_string()));
        }
        if self.cache_ttl_secs == 0 {
            return Err(ServerError::InvalidConfig("Cache TTL must be > 0".to_string()));
        }
        if !self.web_root.is_dir() {
            return Err(ServerError::InvalidConfig(format!(
                "Web root {} is not a directory",
                self.web_root.display()
            )));
        }

        Ok(())
    }

    /// Imprime un resumen de la configuración
    pub fn print_summary(&self) {
        println!("╔══════════════════════════════════════════════════════════════╗");
        println!("║            Static File Server Configuration                 ║");
        println!("╚══════════════════════════════════════════════════════════════╝");
        println!();
        println!("🌐 Network:");
        println!("   Address:      {}", self.address());
        println!("   Web root:     {}", self.web_root.display());
        match self.keep_alive_timeout() {
            Some(t) => println!("   Keep-alive:   {} s idle timeout", t.as_secs()),
            None => println!("   Keep-alive:   no idle timeout"),
        }
        println!();
        println!("👷 Dispatch:");
        println!("   Workers:      {}", self.workers);
        println!("   Queue cap:    {}", self.queue_capacity);
        match self.admission_limit() {
            Some(limit) => println!("   Admission:    {} connections ({:?})", limit, self.admission_mode),
            None => println!("   Admission:    disabled"),
        }
        println!();
        println!("🗄️  Cache:");
        println!("   Capacity:     {} entries", self.cache_capacity);
        println!("   TTL:          {} s", self.cache_ttl_secs);
        match self.sweep_interval() {
            Some(i) => println!("   Sweep:        every {} s", i.as_secs()),
            None => println!("   Sweep:        on every request"),
        }
        println!();
        println!("═══════════════════════════════════════════════════════════════");
        println!();
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
            web_root: PathBuf::from("."),
            workers: 10,
            queue_capacity: 500,
            max_connections: 0,
            admission_mode: AdmissionMode::Reject,
            cache_capacity: 128,
            cache_ttl_secs: 1800,
            sweep_interval_secs: 0,
            keep_alive_timeout_secs: 5,
            log_dir: PathBuf::from("./logs"),
            no_log_file: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.workers, 10);
        assert_eq!(config.queue_capacity, 500);
        assert_eq!(config.cache_capacity, 128);
        assert_eq!(config.cache_ttl(), Duration::from_secs(1800));
    }

    #[test]
    fn test_address_custom() {
        let mut config = Config::default();
        config.host = "127.0.0.1".to_string();
        config.port = 3000;
        assert_eq!(config.address(), "127.0.0.1:3000");
    }

    #[test]
    fn test_validate_success() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    // ==================== Validation ====================

    #[test]
    fn test_validate_invalid_workers() {
        let mut config = Config::default();
        config.workers = 0;
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("Workers"));
    }

    #[test]
    fn test_validate_invalid_queue_capacity() {
        let mut config = Config::default();
        config.queue_capacity = 0;
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("Queue capacity"));
    }

    #[test]
    fn test_validate_invalid_cache() {
        let mut config = Config::default();
        config.cache_capacity = 0;
        assert!(config.validate().unwrap_err().to_string().contains("Cache capacity"));

        let mut config = Config::default();
        config.cache_ttl_secs = 0;
        assert!(config.validate().unwrap_err().to_string().contains("Cache TTL"));
    }

    #[test]
    fn test_validate_missing_web_root() {
        let mut config = Config::default();
        config.web_root = PathBuf::from("/definitely/not/here");
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ServerError::InvalidConfig(_)));
        assert!(err.to_string().contains("not a directory"));
    }

    // ==================== Optional limits ====================

    #[test]
    fn test_optional_limits_disabled_by_zero() {
        let mut config = Config::default();
        config.max_connections = 0;
        config.sweep_interval_secs = 0;
        config.keep_alive_timeout_secs = 0;
        assert_eq!(config.admission_limit(), None);
        assert_eq!(config.sweep_interval(), None);
        assert_eq!(config.keep_alive_timeout(), None);
    }

    #[test]
    fn test_optional_limits_enabled() {
        let mut config = Config::default();
        config.max_connections = 64;
        config.sweep_interval_secs = 30;
        assert_eq!(config.admission_limit(), Some(64));
        assert_eq!(config.sweep_interval(), Some(Duration::from_secs(30)));
        assert_eq!(config.keep_alive_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_log_dir_disabled() {
        let mut config = Config::default();
        assert!(config.log_dir().is_some());
        config.no_log_file = true;
        assert!(config.log_dir().is_none());
    }

    #[test]
    fn test_parse_cli_flags() {
        let config = Config::try_parse_from([
            "static_server",
            "-p", "9000",
            "-t", "4",
            "-q", "16",
            "--cache-capacity", "2",
            "--admission-mode", "wait",
            "--max-connections", "8",
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.workers, 4);
        assert_eq!(config.queue_capacity, 16);
        assert_eq!(config.cache_capacity, 2);
        assert_eq!(config.admission_mode, AdmissionMode::Wait);
        assert_eq!(config.admission_limit(), Some(8));
    }

    #[test]
    fn test_config_print_summary() {
        let config = Config::default();
        // Should not panic
        config.print_summary();
    }
}
