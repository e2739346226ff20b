//! Proxy-synthesized status responses.
//!
//! These are only ever sent when the proxy itself fails an exchange; upstream
//! status lines are relayed untouched and never mapped onto this type.

use std::fmt;

use crate::http::constants::HTTP_VERSION;

/// Status codes the proxy can answer with on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    BadRequest,
    RequestTimeout,
    LengthRequired,
    RequestHeaderFieldsTooLarge,
    BadGateway,
    ServiceUnavailable,
    GatewayTimeout,
}

impl StatusCode {
    pub fn code(self) -> u16 {
        match self {
            StatusCode::BadRequest => 400,
            StatusCode::RequestTimeout => 408,
            StatusCode::LengthRequired => 411,
            StatusCode::RequestHeaderFieldsTooLarge => 431,
            StatusCode::BadGateway => 502,
            StatusCode::ServiceUnavailable => 503,
            StatusCode::GatewayTimeout => 504,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            StatusCode::BadRequest => "Bad Request",
            StatusCode::RequestTimeout => "Request Timeout",
            StatusCode::LengthRequired => "Length Required",
            StatusCode::RequestHeaderFieldsTooLarge => "Request Header Fields Too Large",
            StatusCode::BadGateway => "Bad Gateway",
            StatusCode::ServiceUnavailable => "Service Unavailable",
            StatusCode::GatewayTimeout => "Gateway Timeout",
        }
    }

    /// The complete response: status line and empty header, no body.
    pub fn to_response(self) -> Vec<u8> {
        format!("{} {} {}\r\n\r\n", HTTP_VERSION, self.code(), self.reason()).into_bytes()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_is_bare_status_line() {
        assert_eq!(
            StatusCode::RequestHeaderFieldsTooLarge.to_response(),
            b"HTTP/1.1 431 Request Header Fields Too Large\r\n\r\n"
        );
        assert_eq!(StatusCode::GatewayTimeout.to_response(), b"HTTP/1.1 504 Gateway Timeout\r\n\r\n");
    }

    #[test]
    fn display_includes_code_and_reason() {
        assert_eq!(StatusCode::LengthRequired.to_string(), "411 Length Required");
    }
}
