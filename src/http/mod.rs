//! # Módulo HTTP
//!
//! Subconjunto mínimo de HTTP/1.1 escrito a mano sobre `std::io`:
//!
//! - Lectura acotada de la cabecera de un request (`read_head`)
//! - Parsing de la línea de request y los headers
//! - Construcción y escritura de responses con `Content-Length`
//!
//! No hay chunked transfer encoding ni lectura de bodies: el servidor solo
//! atiende GET.
//!
//! ### Formato de Request
//!
//! ```text
//! GET /index.html HTTP/1.1\r\n
//! Host: localhost\r\n
//! Connection: keep-alive\r\n
//! \r\n
//! ```

pub mod request;
pub mod response;
pub mod status;

pub use request::{percent_decode, read_head, Method, ParseError, Request, MAX_HEAD_SIZE};
pub use response::{Body, Response, BAD_REQUEST_BODY, NOT_FOUND_BODY};
pub use status::StatusCode;
