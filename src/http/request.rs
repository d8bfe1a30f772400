//! # Parsing de Requests HTTP
//! src/http/request.rs
//!
//! Parser mínimo de la cabecera de un request HTTP/1.x.
//!
//! ## Formato de un Request
//!
//! ```text
//! GET /docs/index.html?v=2 HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! Connection: keep-alive\r\n
//! \r\n
//! ```
//!
//! ## Componentes
//!
//! 1. **Request Line**: `METHOD /path?query VERSION`
//! 2. **Headers**: Pares `Name: Value` (uno por línea)
//! 3. **Empty Line**: `\r\n` que marca el fin de la cabecera
//!
//! El path se decodifica (`%XX` y `+`) y después se corta en el primer `?`,
//! así un `%3F` también termina el path.

use std::collections::HashMap;
use std::io::{self, BufRead, Read};

/// Tamaño máximo de la cabecera de un request
pub const MAX_HEAD_SIZE: usize = 8192;

/// Método HTTP del request
///
/// Solo `GET` se sirve; cualquier otro se conserva para el log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// GET - Obtener un recurso
    GET,

    /// Cualquier otro método
    Other(String),
}

impl Method {
    fn parse(s: &str) -> Self {
        match s {
            "GET" => Method::GET,
            other => Method::Other(other.to_string()),
        }
    }

    /// Convierte el método a string
    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::Other(m) => m,
        }
    }
}

/// Representa un request HTTP parseado
#[derive(Debug, Clone)]
pub struct Request {
    /// Método HTTP
    method: Method,

    /// Path decodificado y sin query string (ej: "/docs/index.html")
    path: String,

    /// Query string cruda, si la hay (ej: "v=2")
    query: Option<String>,

    /// Headers HTTP tal como llegaron
    headers: HashMap<String, String>,

    /// Versión HTTP ("HTTP/1.0" o "HTTP/1.1")
    version: String,
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Request vacío
    #[error("Empty request")]
    EmptyRequest,

    /// Formato inválido de la request line
    #[error("Invalid request line format")]
    InvalidRequestLine,

    /// Versión HTTP no soportada
    #[error("Invalid HTTP version: {0}")]
    InvalidHttpVersion(String),

    /// Header malformado
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
}

impl Request {
    /// Parsea la cabecera de un request desde bytes
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use static_server::http::Request;
    ///
    /// let raw = b"GET /hello%20world.txt?x=1 HTTP/1.1\r\nConnection: keep-alive\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.path(), "/hello world.txt");
    /// assert!(request.keep_alive());
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        let request_str = std::str::from_utf8(buffer)
            .map_err(|_| ParseError::InvalidRequestLine)?;

        if request_str.trim().is_empty() {
            return Err(ParseError::EmptyRequest);
        }

        let mut lines = request_str.lines();

        // 1. Request line
        let first = lines.next().ok_or(ParseError::EmptyRequest)?;
        let (method, path, query, version) = Self::parse_request_line(first)?;

        // 2. Headers hasta la línea vacía
        let headers = Self::parse_headers(lines)?;

        Ok(Request {
            method,
            path,
            query,
            headers,
            version,
        })
    }

    /// Parsea la request line
    ///
    /// Formato: `GET /path?query HTTP/1.1`
    fn parse_request_line(
        line: &str,
    ) -> Result<(Method, String, Option<String>, String), ParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        // Debe tener exactamente 3 partes: METHOD PATH VERSION
        if parts.len() != 3 {
            return Err(ParseError::InvalidRequestLine);
        }

        let method = Method::parse(parts[0]);

        let version = parts[2].to_string();
        if version != "HTTP/1.0" && version != "HTTP/1.1" {
            return Err(ParseError::InvalidHttpVersion(version));
        }

        let query = parts[1].split_once('?').map(|(_, query)| query.to_string());

        let mut path = percent_decode(parts[1]);
        if let Some(end) = path.find('?') {
            path.truncate(end);
        }

        Ok((method, path, query, version))
    }

    /// Parsea los headers HTTP
    fn parse_headers<'a>(
        lines: impl Iterator<Item = &'a str>,
    ) -> Result<HashMap<String, String>, ParseError> {
        let mut headers = HashMap::new();

        for line in lines {
            // La línea vacía marca el fin de los headers
            if line.trim().is_empty() {
                break;
            }

            match line.split_once(':') {
                Some((name, value)) => {
                    headers.insert(name.trim().to_string(), value.trim().to_string());
                }
                None => return Err(ParseError::InvalidHeader(line.to_string())),
            }
        }

        Ok(headers)
    }

    // === Métodos públicos para acceder a los campos ===

    /// Obtiene el método HTTP del request
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Obtiene el path decodificado
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Obtiene la query string cruda
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Obtiene un header (sin distinguir mayúsculas en el nombre)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Obtiene la versión HTTP
    pub fn version(&self) -> &str {
        &self.version
    }

    /// El cliente pidió mantener la conexión abierta
    ///
    /// Solo cuenta un `Connection: keep-alive` explícito.
    pub fn keep_alive(&self) -> bool {
        self.header("Connection").map_or(false, |value| {
            value
                .split(',')
                .any(|token| token.trim().eq_ignore_ascii_case("keep-alive"))
        })
    }
}

/// Lee la cabecera de un request (hasta la línea vacía)
///
/// Retorna `Ok(None)` si el cliente cerró la conexión antes de mandar nada.
/// Una cabecera mayor que `MAX_HEAD_SIZE` es un error `InvalidData`.
pub fn read_head<R: BufRead>(reader: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut head = Vec::new();
    // Las líneas vacías descartadas también consumen el límite
    let mut skipped = 0;

    loop {
        let start = head.len();
        let budget = (MAX_HEAD_SIZE + 1 - skipped - start) as u64;
        let n = reader.by_ref().take(budget).read_until(b'\n', &mut head)?;

        if n == 0 {
            if head.is_empty() {
                return Ok(None);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed mid-request",
            ));
        }

        if skipped + head.len() > MAX_HEAD_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "request head too large",
            ));
        }

        let line = &head[start..];
        if line == b"\r\n" || line == b"\n" {
            // Líneas vacías antes de la request line se ignoran
            if start == 0 {
                skipped += head.len();
                head.clear();
                continue;
            }
            return Ok(Some(head));
        }
    }
}

/// Decodifica `%XX` y `+` de un path
///
/// Secuencias `%` inválidas se dejan tal cual.
pub fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi << 4 | lo);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
