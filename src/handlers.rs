//! HTTP handlers for `/command/` and `/connect/` (§6.1), grounded on
//! `views.py::send_request` and `views.py::connect_storage_server`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Extension, Multipart};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};

use crate::command::{decode_positional_args, Command};
use crate::coordinator::Coordinator;
use crate::error::{CoordinatorError, QUERY_FAILED_BODY};
use crate::http::resolve_client_ip;

/// `GET /command/`: every operation except `write` (which needs a request
/// body) is reachable here, matching the original's GET branch.
pub async fn command_get(uri: Uri, Extension(coordinator): Extension<Arc<Coordinator>>) -> Response {
    let args = decode_positional_args(uri.query().unwrap_or(""));
    match Command::parse(&args) {
        Ok(command) => execute(command, &coordinator, None).await,
        Err(err) => {
            tracing::warn!(%err, "failed to parse command");
            (StatusCode::OK, QUERY_FAILED_BODY).into_response()
        }
    }
}

/// `POST /command/`: same positional-argument query string, plus (for
/// `write`) a multipart body carrying the file under field name `file`.
pub async fn command_post(
    uri: Uri,
    Extension(coordinator): Extension<Arc<Coordinator>>,
    mut multipart: Multipart,
) -> Response {
    let args = decode_positional_args(uri.query().unwrap_or(""));
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(err) => {
            tracing::warn!(%err, "failed to parse command");
            return (StatusCode::OK, QUERY_FAILED_BODY).into_response();
        }
    };

    if matches!(command, Command::Write { .. }) {
        let mut file_bytes = None;
        while let Ok(Some(field)) = multipart.next_field().await {
            if field.name() == Some("file") {
                file_bytes = field.bytes().await.ok().map(|bytes| bytes.to_vec());
                break;
            }
        }
        return execute(command, &coordinator, file_bytes).await;
    }

    execute(command, &coordinator, None).await
}

/// Run a parsed command against the coordinator and render its result the
/// way §6.1's response table specifies. `file` carries the uploaded bytes
/// for `write`; every other command ignores it.
async fn execute(command: Command, coordinator: &Coordinator, file: Option<Vec<u8>>) -> Response {
    let result = match command {
        Command::Init => {
            coordinator.clear().await;
            Ok("OK".to_string())
        }
        Command::Create { path, filename } => coordinator
            .create_file(&path, &filename)
            .await
            .map(|()| "OK".to_string()),
        Command::Delete { path, filename } => coordinator
            .delete_file(&path, &filename)
            .await
            .map(|()| "OK".to_string()),
        Command::Info { path, filename } => coordinator
            .get_file_size(&path, &filename)
            .await
            .map(|size| size.to_string()),
        Command::Copy { path, filename, new_path, new_filename } => coordinator
            .copy_file(&path, &filename, &new_path, new_filename.as_deref())
            .await
            .map(|()| "OK".to_string()),
        Command::Move { path, filename, new_path, new_filename } => coordinator
            .move_file(&path, &filename, &new_path, new_filename.as_deref())
            .await
            .map(|()| "OK".to_string()),
        Command::ReadDir { path } => match coordinator.read_dir(&path).await {
            Ok(entries) => Ok(serde_json::to_string(&entries).unwrap_or_else(|_| "[]".to_string())),
            Err(err) => Err(CoordinatorError::from(err)),
        },
        Command::MakeDir { path, dirname } => coordinator
            .make_dir(&path, &dirname)
            .await
            .map(|()| "OK".to_string()),
        Command::DeleteDir { path, dirname } => coordinator
            .delete_dir(&path, &dirname)
            .await
            .map(|()| "OK".to_string()),
        Command::Read { path, filename } => {
            return match coordinator.read_file(&path, &filename).await {
                Ok(bytes) => bytes.into_response(),
                Err(err) => err.into_response(),
            };
        }
        Command::Write { path, filename } => {
            let Some(bytes) = file else {
                return CoordinatorError::BadRequest("missing file part".to_string()).into_response();
            };
            coordinator
                .write_file(&path, &filename, bytes)
                .await
                .map(|()| "OK".to_string())
        }
    };

    match result {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(err) => err.into_response(),
    }
}

/// `POST /connect/`: register the sender as a storage node.
pub async fn connect_storage_server(
    headers: HeaderMap,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Extension(coordinator): Extension<Arc<Coordinator>>,
) -> StatusCode {
    match resolve_client_ip(&headers, Some(peer.ip())) {
        Some(ip) => {
            coordinator.add_storage_server(ip).await;
            tracing::info!(%ip, "a new storage server has been added");
            StatusCode::ACCEPTED
        }
        None => StatusCode::BAD_REQUEST,
    }
}
