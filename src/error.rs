//! The error taxonomy shared by the directory tree, storage-node client,
//! node registry, and coordinator, plus its conversion into the single
//! HTTP-facing response shape the wire protocol expects.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors raised while resolving or mutating the directory tree.
///
/// `NoSuchDirectory` and `NoSuchFile` are conceptually subtypes of
/// `InvalidPath` (§7): every caller that only cares about "this path
/// didn't work" can match on the outer `CoordinatorError::Tree(_)` without
/// caring which variant fired.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("no such directory: {0}")]
    NoSuchDirectory(String),
    #[error("no such file: {0}")]
    NoSuchFile(String),
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

/// Errors raised by a single storage-node remote call. The bulk-transfer
/// protocol (FTP) only ever surfaces one kind of failure worth
/// distinguishing from the coordinator's point of view: it didn't work.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("storage node transport error: {0}")]
    Failed(String),
}

impl From<suppaftp::FtpError> for TransportError {
    fn from(err: suppaftp::FtpError) -> Self {
        TransportError::Failed(err.to_string())
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Failed(err.to_string())
    }
}

/// Placement could not find any live storage node to host a new file.
#[derive(Debug, thiserror::Error)]
#[error("no storage servers are available")]
pub struct NoServersAvailable;

/// The coordinator-level error surface: every public coordinator operation
/// returns one of these. The HTTP layer converts any of them into the
/// single wire-compatible error string (§6.1).
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    NoServers(#[from] NoServersAvailable),
    #[error("bad request: {0}")]
    BadRequest(String),
}

/// The literal wire-compatible error response (§6.1): existing clients
/// expect this exact body with a 200 status on any failure. Preserved
/// bit-for-bit; diagnostics go to `tracing`, not to the response body.
pub const QUERY_FAILED_BODY: &str = "The query can not be executed!";

impl IntoResponse for CoordinatorError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "command failed");
        (StatusCode::OK, QUERY_FAILED_BODY).into_response()
    }
}
