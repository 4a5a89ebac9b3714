use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::TransportError;

pub const STATUS_PATH: &str = "/";
pub const HTTP_OK: u16 = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_ok(&self) -> bool {
        self.status == HTTP_OK
    }
}

/// One authenticated GET per call against the thermostat endpoint.
///
/// Implementations open and release their connection inside `get`, on every
/// return path. Retrying is the caller's job.
pub trait Transport {
    fn get(&mut self, path: &str) -> Result<HttpResponse, TransportError>;
}

/// `Authorization` header value for HTTP Basic auth.
pub fn basic_auth_value(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_user_credential_encodes_leading_colon() {
        assert_eq!(basic_auth_value("", "199312"), "Basic OjE5OTMxMg==");
    }

    #[test]
    fn only_200_counts_as_ok() {
        let ok = HttpResponse {
            status: 200,
            body: String::new(),
        };
        let created = HttpResponse {
            status: 201,
            body: String::new(),
        };

        assert!(ok.is_ok());
        assert!(!created.is_ok());
    }
}
