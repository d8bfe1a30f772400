//! # Acceso al Sistema de Archivos
//! src/handler/files.rs
//!
//! Traduce la ruta de un request a un archivo bajo la raíz web y lo lee.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Archivo servido cuando la ruta termina en `/`
pub const INDEX_FILE: &str = "index.html";

/// Resuelve la ruta (ya decodificada y sin query) a un archivo bajo `web_root`
///
/// Retorna `None` si la ruta intenta salir de la raíz con `..`.
pub fn resolve(web_root: &Path, request_path: &str) -> Option<PathBuf> {
    let mut relative = request_path.trim_start_matches('/').to_string();
    if relative.is_empty() || relative.ends_with('/') {
        relative.push_str(INDEX_FILE);
    }

    let relative = Path::new(&relative);
    let mut resolved = web_root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    Some(resolved)
}

/// Clave de caché para un archivo resuelto
pub fn cache_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Lee el archivo completo
///
/// Los directorios y archivos inexistentes son errores de I/O y terminan
/// en 404.
pub fn read_file(path: &Path) -> io::Result<Vec<u8>> {
    let metadata = fs::metadata(path)?;
    if !metadata.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a regular file", path.display()),
        ));
    }
    fs::read(path)
}
