//! Status codes and their reason phrases.
//!
//! The catalog is a `static` table built at compile time and only ever read.

use std::fmt;

/// Reason phrase reported for codes missing from the catalog.
pub const UNKNOWN_REASON: &str = "Unknown Status Code";

static CATALOG: &[(u16, &str)] = &[
    (200, "OK"),
    (201, "Created"),
    (202, "Accepted"),
    (204, "No Content"),
    (301, "Moved Permanently"),
    (302, "Moved Temporarily"),
    (304, "Not Modified"),
    (400, "Bad Request"),
    (401, "Unauthorized"),
    (403, "Forbidden"),
    (404, "Not Found"),
    (500, "Internal Server Error"),
    (501, "Not Implemented"),
    (502, "Bad Gateway"),
    (503, "Service Unavailable"),
];

/// An HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const FORBIDDEN: StatusCode = StatusCode(403);
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    pub const NOT_IMPLEMENTED: StatusCode = StatusCode(501);

    /// Wrap a raw numeric code. Codes outside the catalog are allowed and
    /// report [`UNKNOWN_REASON`].
    pub const fn from_u16(code: u16) -> Self {
        Self(code)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Reason phrase from the catalog.
    pub fn reason(&self) -> &'static str {
        CATALOG
            .iter()
            .find(|(code, _)| *code == self.0)
            .map(|(_, reason)| *reason)
            .unwrap_or(UNKNOWN_REASON)
    }

    pub fn is_success(&self) -> bool {
        *self == Self::OK
    }

    /// HTML page sent after the status line for every code except 200.
    pub fn error_body(&self) -> Option<String> {
        if self.is_success() {
            return None;
        }
        Some(format!(
            "<html><body>\n<h1>{} {}</h1>\n</body></html>\n",
            self.0,
            self.reason()
        ))
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0, self.reason())
    }
}
