//! # Errores del Servidor
//! src/error.rs
//!
//! Errores fatales de arranque. Son las únicas condiciones que terminan el
//! proceso: una vez que el acceptor está corriendo, ningún error de una
//! conexión individual sube hasta aquí.

use thiserror::Error;

/// Error fatal del servidor
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuración inválida (detectada antes de construir componentes)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No se pudo hacer bind/listen en la dirección pedida
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// No se pudo crear un thread del pool (o el sweeper)
    #[error("Failed to spawn thread '{name}': {source}")]
    ThreadSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// No se pudo abrir el archivo de log
    #[error("Failed to open log file {path}: {source}")]
    LogFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// No se pudo instalar el suscriptor de logs
    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    /// Otro error de I/O durante el arranque
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Construye un error de bind
    pub fn bind(addr: impl Into<String>, source: std::io::Error) -> Self {
        Self::Bind {
            addr: addr.into(),
            source,
        }
    }

    /// Código de salida del proceso para este error
    pub fn exit_code(&self) -> i32 {
        match self {
            ServerError::InvalidConfig(_) => exit_code::INVALID_CONFIG,
            ServerError::Bind { .. } => exit_code::BIND_FAILED,
            _ => exit_code::GENERAL_ERROR,
        }
    }
}

/// Códigos de salida del binario
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INVALID_CONFIG: i32 = 2;
    pub const BIND_FAILED: i32 = 3;
}

/// Alias de Result para errores de arranque
pub type Result<T> = std::result::Result<T, ServerError>;
