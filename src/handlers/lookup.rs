//! Lookup page: search form plus the backend's rows as an HTML table.
//!
//! # Responsibilities
//! - Always answer 200 with the search form
//! - Forward the literal key after `?key=` to the backend
//! - Render each result row, alternating shading by position
//! - Close the page whether or not a table was produced
//!
//! # Design Decisions
//! - The key is not URL-decoded and is forwarded byte for byte
//! - A backend failure truncates the page; there is no retry
//! - A client failure mid-table leaves the reply pending on the backend
//!   channel, which the next lookup drains

use std::sync::Arc;

use tokio::io::AsyncWrite;

use crate::backend::{BackendConnection, BackendError};
use crate::config::LookupConfig;
use crate::http::response::{ResponseError, ResponseWriter};
use crate::http::status::StatusCode;

pub const TABLE_START: &str = "<p><table border>";
pub const TABLE_END: &str = "\n</table>\n";
pub const PAGE_END: &str = "</body></html>\n";

const ODD_ROW: &str = "\n<tr><td>";
const EVEN_ROW: &str = "\n<tr><td bgcolor=yellow>";

/// Search form markup for a lookup route.
pub fn render_form(path_prefix: &str, key_param: &str) -> String {
    format!(
        "<html><body>\n\
         <h1>mdb-lookup</h1>\n\
         <p>\n\
         <form method=GET action={}>\n\
         lookup: <input type=text name={}>\n\
         <input type=submit>\n\
         </form>\n\
         <p>\n",
        path_prefix, key_param
    )
}

/// Opening markup for the 1-indexed row `index`.
pub fn row_open(index: usize) -> &'static str {
    if index % 2 == 1 {
        ODD_ROW
    } else {
        EVEN_ROW
    }
}

#[derive(Debug, thiserror::Error)]
enum LookupError {
    #[error(transparent)]
    Client(#[from] ResponseError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Bridges lookup requests to the shared backend connection.
#[derive(Debug, Clone)]
pub struct LookupHandler {
    backend: Arc<BackendConnection>,
    key_prefix: String,
    form: String,
}

impl LookupHandler {
    pub fn new(backend: Arc<BackendConnection>, config: &LookupConfig) -> Self {
        Self {
            backend,
            key_prefix: config.key_prefix(),
            form: render_form(&config.path_prefix, &config.key_param),
        }
    }

    /// Literal key bytes carried by `uri`, if it uses the key prefix.
    pub fn extract_key<'u>(&self, uri: &'u [u8]) -> Option<&'u [u8]> {
        uri.strip_prefix(self.key_prefix.as_bytes())
    }

    /// Render the lookup page for `uri`. Always reports 200.
    pub async fn serve<W>(&self, uri: &[u8], out: &mut ResponseWriter<W>) -> StatusCode
    where
        W: AsyncWrite + Unpin,
    {
        let status = StatusCode::OK;
        match self.render(uri, out).await {
            Ok(rows) => tracing::trace!(rows, "Lookup page sent"),
            Err(LookupError::Client(e)) => {
                tracing::warn!(error = %e, "Client write failed during lookup page");
            }
            Err(LookupError::Backend(e)) => {
                tracing::error!(backend = %self.backend.peer(), error = %e, "Lookup backend failed");
            }
        }
        status
    }

    async fn render<W>(&self, uri: &[u8], out: &mut ResponseWriter<W>) -> Result<usize, LookupError>
    where
        W: AsyncWrite + Unpin,
    {
        out.send_status(StatusCode::OK).await?;
        out.write_html(&self.form).await?;

        let mut rows = 0;
        if let Some(key) = self.extract_key(uri) {
            tracing::debug!(key = %String::from_utf8_lossy(key), "Looking up");
            let mut session = self.backend.lookup(key).await?;

            out.write_html(TABLE_START).await?;
            while let Some(row) = session.next_row().await? {
                rows += 1;
                out.write_html(row_open(rows)).await?;
                out.write_body(&row).await?;
            }
            drop(session);
            out.write_html(TABLE_END).await?;
        }

        out.write_html(PAGE_END).await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_alternate_by_position() {
        assert_eq!(row_open(1), "\n<tr><td>");
        assert_eq!(row_open(2), "\n<tr><td bgcolor=yellow>");
        assert_eq!(row_open(3), "\n<tr><td>");
        assert_eq!(row_open(4), "\n<tr><td bgcolor=yellow>");
    }

    #[test]
    fn form_targets_lookup_route() {
        let form = render_form("/mdb-lookup", "key");
        assert!(form.starts_with("<html><body>\n<h1>mdb-lookup</h1>\n"));
        assert!(form.contains("<form method=GET action=/mdb-lookup>\n"));
        assert!(form.contains("lookup: <input type=text name=key>\n"));
        assert!(form.ends_with("</form>\n<p>\n"));
    }
}
