//! # Construcción de Respuestas HTTP
//!
//! API para construir respuestas HTTP/1.1 y escribirlas en el socket.
//!
//! ## Formato de una respuesta
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Length: 13\r\n
//! Cache-Control: max-age=3600\r\n
//! Connection: keep-alive\r\n
//! \r\n
//! <bytes del archivo>
//! ```
//!
//! Los headers conservan el orden de inserción. El body puede ser un buffer
//! propio o una vista de la caché; en ese caso se escribe directamente desde
//! la caché, sin copiarlo.
//!
//! ## Ejemplo de uso
//!
//! ```
//! use static_server::http::{Response, StatusCode};
//!
//! let response = Response::new(StatusCode::Ok)
//!     .with_header("Connection", "close")
//!     .with_body_bytes(b"hello".to_vec());
//!
//! let bytes = response.to_bytes();
//! assert!(bytes.starts_with(b"HTTP/1.1 200 OK\r\n"));
//! ```

use super::StatusCode;
use crate::cache::CachedPayload;
use std::io::{self, Write};

/// Cuerpo HTML fijo de las respuestas 404
pub const NOT_FOUND_BODY: &str = "<html><body><h1>404 Not Found</h1></body></html>";

/// Cuerpo HTML fijo de las respuestas 400
pub const BAD_REQUEST_BODY: &str = "<html><body><h1>400 Bad Request</h1></body></html>";

/// Cuerpo de una respuesta
#[derive(Debug, Clone, Default)]
pub enum Body {
    /// Sin cuerpo
    #[default]
    Empty,

    /// Buffer propio (archivo recién leído, páginas de error)
    Owned(Vec<u8>),

    /// Vista de solo lectura de una entrada de la caché
    Cached(CachedPayload),
}

impl Body {
    /// Bytes del cuerpo
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Body::Empty => &[],
            Body::Owned(bytes) => bytes,
            Body::Cached(payload) => payload.as_bytes(),
        }
    }

    /// Tamaño en bytes
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Verifica si el cuerpo está vacío
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Representa una respuesta HTTP/1.1 completa
#[derive(Debug, Clone)]
pub struct Response {
    /// Código de estado HTTP
    status: StatusCode,

    /// Headers en orden de inserción, sin duplicados
    headers: Vec<(String, String)>,

    /// Cuerpo de la respuesta
    body: Body,
}

impl Response {
    /// Crea una nueva respuesta sin headers ni body
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Body::Empty,
        }
    }

    /// Respuesta 404 con el cuerpo HTML fijo
    pub fn not_found() -> Self {
        Self::new(StatusCode::NotFound)
            .with_header("Content-Type", "text/html")
            .with_body_bytes(NOT_FOUND_BODY.as_bytes().to_vec())
    }

    /// Respuesta 400 para cabeceras que no se pudieron parsear
    pub fn bad_request() -> Self {
        Self::new(StatusCode::BadRequest)
            .with_header("Content-Type", "text/html")
            .with_body_bytes(BAD_REQUEST_BODY.as_bytes().to_vec())
    }

    /// Agrega un header a la respuesta
    ///
    /// Si el header ya existe, se sobrescribe en su posición original.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    /// Agrega un header a una respuesta existente (versión mutable)
    pub fn add_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some(slot) => slot.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    /// Establece el cuerpo desde un buffer propio
    ///
    /// Automáticamente calcula y agrega el header `Content-Length`.
    pub fn with_body_bytes(self, body: Vec<u8>) -> Self {
        self.with_body(Body::Owned(body))
    }

    /// Establece el cuerpo desde una entrada de la caché
    pub fn with_cached_body(self, payload: CachedPayload) -> Self {
        self.with_body(Body::Cached(payload))
    }

    fn with_body(mut self, body: Body) -> Self {
        let len = body.len().to_string();
        self.body = body;
        self.add_header("Content-Length", &len);
        self
    }

    /// Genera la status line y los headers, terminando en la línea vacía
    pub fn head_bytes(&self) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {}\r\n", self.status);
        for (name, value) in &self.headers {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str("\r\n");
        head.into_bytes()
    }

    /// Escribe la respuesta completa en `writer`
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.head_bytes())?;
        writer.write_all(self.body.as_bytes())?;
        writer.flush()
    }

    /// Convierte la respuesta a bytes (copia el body)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = self.head_bytes();
        result.extend_from_slice(self.body.as_bytes());
        result
    }

    /// Obtiene el código de estado de la respuesta
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Obtiene un header por nombre
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Obtiene los headers en orden
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Obtiene el body
    pub fn body(&self) -> &Body {
        &self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_response() {
        let response = Response::new(StatusCode::Ok);
        assert_eq!(response.status(), StatusCode::Ok);
        assert!(response.headers().is_empty());
        assert!(response.body().is_empty());
    }

    #[test]
    fn test_headers_keep_order_and_overwrite() {
        let response = Response::new(StatusCode::Ok)
            .with_header("Content-Length", "0")
            .with_header("Connection", "close")
            .with_header("connection", "keep-alive");

        assert_eq!(response.headers().len(), 2);
        assert_eq!(response.headers()[1].0, "Connection");
        assert_eq!(response.header("Connection"), Some("keep-alive"));
    }

    #[test]
    fn test_body_sets_content_length() {
        let response = Response::new(StatusCode::Ok).with_body_bytes(b"Hello World".to_vec());

        assert_eq!(response.body().as_bytes(), b"Hello World");
        assert_eq!(response.header("Content-Length"), Some("11"));
    }

    #[test]
    fn test_not_found_framing() {
        let bytes = Response::not_found()
            .with_header("Connection", "close")
            .to_bytes();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.contains("Content-Type: text/html\r\n"));
        assert!(text.contains(&format!("Content-Length: {}\r\n", NOT_FOUND_BODY.len())));
        assert!(text.ends_with(&format!("\r\n\r\n{}", NOT_FOUND_BODY)));
    }

    #[test]
    fn test_to_bytes_layout() {
        let response = Response::new(StatusCode::Ok)
            .with_body_bytes(b"Test".to_vec())
            .with_header("Connection", "close");

        let text = String::from_utf8(response.to_bytes()).unwrap();
        assert_eq!(
            text,
            "HTTP/1.1 200 OK\r\nContent-Length: 4\r\nConnection: close\r\n\r\nTest"
        );
    }

    #[test]
    fn test_write_to_matches_to_bytes() {
        let response = Response::bad_request().with_header("Connection", "close");
        let mut out = Vec::new();
        response.write_to(&mut out).unwrap();
        assert_eq!(out, response.to_bytes());
    }

    #[test]
    fn test_empty_body_response() {
        let text = String::from_utf8(Response::new(StatusCode::Ok).to_bytes()).unwrap();
        assert!(text.ends_with("\r\n\r\n"));
    }
}
