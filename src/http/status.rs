//! # Códigos de Estado HTTP
//!
//! El servidor de archivos estáticos solo emite tres códigos:
//!
//! - **200**: el archivo existe y se envía (desde disco o desde la caché)
//! - **400**: la cabecera del request no se pudo interpretar
//! - **404**: método distinto de GET, ruta inválida o archivo inexistente

/// Códigos de estado que produce el servidor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// 200 OK
    Ok = 200,

    /// 400 Bad Request
    BadRequest = 400,

    /// 404 Not Found
    NotFound = 404,
}

impl StatusCode {
    /// Valor numérico del código
    ///
    /// ```
    /// use static_server::http::StatusCode;
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Texto de razón de la status line
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
        }
    }

    /// Verifica si el código indica éxito (2xx)
    pub fn is_success(&self) -> bool {
        matches!(self, StatusCode::Ok)
    }
}

impl std::fmt::Display for StatusCode {
    /// Formato: "200 OK"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}
