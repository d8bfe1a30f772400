//! # Logging
//! src/logging.rs
//!
//! Suscriptor de `tracing` con dos salidas:
//!
//! - consola (stdout), con colores
//! - archivo diario `<log_dir>/server_YYYY-MM-DD.log`, en modo append y sin
//!   ANSI; cambia de archivo cuando cambia la fecha local
//!
//! El nivel se controla con `RUST_LOG` (por defecto `static_server=info`).

use crate::error::{Result, ServerError};
use chrono::{Local, NaiveDate};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Filtro usado cuando `RUST_LOG` no está definido
pub const DEFAULT_FILTER: &str = "static_server=info";

/// Instala el suscriptor global
///
/// Con `log_dir = None` solo se loguea a consola. No poder abrir el archivo
/// de log es un error fatal de arranque.
pub fn init(log_dir: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let file_layer = match log_dir {
        Some(dir) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_thread_names(true)
                .with_writer(DailyLogFile::open(dir)?),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_thread_names(true))
        .with(file_layer)
        .try_init()
        .map_err(|e| ServerError::Logging(e.to_string()))
}

/// Archivo de log que rota por fecha local
pub struct DailyLogFile {
    dir: PathBuf,
    current: Mutex<(NaiveDate, File)>,
}

impl DailyLogFile {
    /// Crea el directorio si hace falta y abre el archivo de hoy
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|source| ServerError::LogFile {
            path: dir.display().to_string(),
            source,
        })?;

        let today = Local::now().date_naive();
        let path = Self::path_for(dir, today);
        let file = open_append(&path).map_err(|source| ServerError::LogFile {
            path: path.display().to_string(),
            source,
        })?;

        Ok(Self {
            dir: dir.to_path_buf(),
            current: Mutex::new((today, file)),
        })
    }

    /// Ruta del archivo correspondiente a `date`
    pub fn path_for(dir: &Path, date: NaiveDate) -> PathBuf {
        dir.join(format!("server_{}.log", date.format("%Y-%m-%d")))
    }

    fn write_on(&self, date: NaiveDate, buf: &[u8]) -> io::Result<()> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current.0 != date {
            let file = open_append(&Self::path_for(&self.dir, date))?;
            *current = (date, file);
        }
        current.1.write_all(buf)
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Writer entregado a `tracing-subscriber` por cada evento
pub struct DailyLogWriter<'a> {
    target: &'a DailyLogFile,
}

impl Write for DailyLogWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.target.write_on(Local::now().date_naive(), buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for DailyLogFile {
    type Writer = DailyLogWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        DailyLogWriter { target: self }
    }
}
