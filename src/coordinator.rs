//! Coordinator (Component E): the single object every HTTP handler talks
//! to. Owns the directory tree, the node registry, and FTP credentials, and
//! implements the placement policy and replicated fan-out/fallback-read
//! protocol, grounded directly on `storage.py`'s `Storage` class.
//!
//! One instance is built in `main` and shared via an `Arc`, the same
//! singleton-by-construction shape the teacher uses for `Arc<Storage>` —
//! `storage.py`'s own `__new__`-based singleton becomes unnecessary once
//! ownership is explicit.

use std::io::{Cursor, Seek};
use std::time::Duration;

use rand::seq::SliceRandom;

use crate::error::{CoordinatorError, NoServersAvailable, TransportError, TreeError};
use crate::node_client::NodeClient;
use crate::registry::NodeRegistry;
use crate::tree::{DirEntry, DirectoryTree};

/// FTP credentials and side-channel port shared by every storage node:
/// the fleet is homogeneous, so these are not per-node.
pub struct NodeCredentials {
    pub ftp_username: String,
    pub ftp_password: String,
    pub ftp_tls: bool,
    pub storage_node_root: String,
}

pub struct Coordinator {
    tree: DirectoryTree,
    registry: NodeRegistry,
    credentials: NodeCredentials,
}

/// Run a blocking `NodeClient` call off the async runtime, the way the
/// teacher's `atomic.rs::sync_dir` wraps a blocking `fsync`. A panic inside
/// the closure (which `suppaftp` never raises deliberately) surfaces as a
/// `TransportError` rather than poisoning the caller.
async fn run_blocking<F, T>(f: F) -> Result<T, TransportError>
where
    F: FnOnce() -> Result<T, TransportError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(err) => Err(TransportError::Failed(format!(
            "storage node task did not complete: {err}"
        ))),
    }
}

impl Coordinator {
    pub async fn new(
        credentials: NodeCredentials,
        storage_node_port: u16,
        request_timeout: Duration,
    ) -> Self {
        Self {
            tree: DirectoryTree::new().await,
            registry: NodeRegistry::new(storage_node_port, request_timeout),
            credentials,
        }
    }

    fn client_for(&self, host: &str) -> NodeClient {
        NodeClient::new(
            host,
            self.ftp_port(),
            &self.credentials.ftp_username,
            &self.credentials.ftp_password,
            self.credentials.ftp_tls,
            &self.credentials.storage_node_root,
        )
    }

    /// Storage nodes speak FTP on the standard control port; only the
    /// HTTP side-channel (`ping`/`info/space`) uses a configurable port.
    fn ftp_port(&self) -> u16 {
        21
    }

    /// `_choose_storage_servers`: 0 live nodes is an error, more than 2
    /// live nodes gets sampled down to 2, otherwise every live node is used.
    async fn choose_storage_servers(&self) -> Result<Vec<String>, NoServersAvailable> {
        let mut available = self.registry.available().await;
        if available.is_empty() {
            return Err(NoServersAvailable);
        }
        if available.len() > 2 {
            let mut rng = rand::thread_rng();
            available.shuffle(&mut rng);
            available.truncate(2);
        }
        Ok(available)
    }

    /// Register a newly connected storage node (deduped), then
    /// unconditionally wipe whatever it already has and seed it with every
    /// directory the tree currently knows about
    /// (`add_storage_server`/`create_dirs`). The clear-and-replay runs on
    /// every call, not just the first: a node that crashes, loses its
    /// local disk, and reconnects still has the same address, so dedup
    /// must only guard the registry append, never the bootstrap itself.
    pub async fn add_storage_server(&self, addr: std::net::IpAddr) {
        self.registry.register(addr).await;
        let host = addr.to_string();

        let client = self.client_for(&host);
        if let Err(err) = run_blocking(move || client.clear()).await {
            tracing::error!(%host, %err, "failed to clear storage on newly connected node");
        }

        for (path, dirname) in self.tree.as_list().await {
            let client = self.client_for(&host);
            let (path_owned, dirname_owned) = (path, dirname);
            let name_for_log = dirname_owned.clone();
            let result = run_blocking(move || client.make_dir(&path_owned, &dirname_owned)).await;
            if let Err(err) = result {
                tracing::error!(%host, dirname = %name_for_log, %err, "failed to replay directory onto newly connected node");
            }
        }
    }

    /// Sum of `info/space` across every live node, halved — mirrors
    /// `get_available_space`'s `total // 2`, a deliberately conservative
    /// estimate given files are written to two replicas.
    pub async fn get_available_space(&self) -> u64 {
        let mut total: u64 = 0;
        for host in self.registry.available().await {
            total += self.registry.space_available(&host).await;
        }
        total / 2
    }

    /// Wipe the directory tree and every storage node's contents.
    pub async fn clear(&self) {
        self.tree.clear().await;
        for host in self.registry.all().await {
            let client = self.client_for(&host);
            if let Err(err) = run_blocking(move || client.clear()).await {
                tracing::error!(%host, %err, "failed to clear storage node");
            }
        }
    }

    pub async fn create_file(&self, path: &str, filename: &str) -> Result<(), CoordinatorError> {
        let servers = self.choose_storage_servers().await?;
        self.tree
            .create_file(path, filename, servers.clone())
            .await?;
        for host in servers {
            let client = self.client_for(&host);
            let (path_owned, name_owned) = (path.to_string(), filename.to_string());
            let result = run_blocking(move || client.create_file(&path_owned, &name_owned)).await;
            if let Err(err) = result {
                tracing::error!(%host, %filename, %err, "failed to create file on storage node");
            }
        }
        Ok(())
    }

    /// Write `contents` to a freshly placed replica set. The tree entry is
    /// created first (so a later read can discover the replica set even if
    /// an upload to one node fails), then each node is written in turn,
    /// rewinding the buffer between uploads the way the original rewinds
    /// the file handle after every `write_file` call.
    pub async fn write_file(
        &self,
        path: &str,
        filename: &str,
        contents: Vec<u8>,
    ) -> Result<(), CoordinatorError> {
        let servers = self.choose_storage_servers().await?;
        self.tree
            .create_file(path, filename, servers.clone())
            .await?;

        for host in servers {
            let client = self.client_for(&host);
            let (path_owned, name_owned, data) =
                (path.to_string(), filename.to_string(), contents.clone());
            let result = run_blocking(move || {
                let mut cursor = Cursor::new(data);
                client.write_file(&path_owned, &name_owned, &mut cursor)
            })
            .await;
            if let Err(err) = result {
                tracing::error!(%host, %filename, %err, "failed to write file to storage node");
            }
        }
        Ok(())
    }

    /// Try every replica in order, returning the bytes from the first one
    /// that answers. Mirrors `read_file`'s fallback loop, which tries each
    /// server in turn and logs (rather than fails) on a dead replica.
    pub async fn read_file(&self, path: &str, filename: &str) -> Result<Vec<u8>, CoordinatorError> {
        let servers = self.tree.get_file_servers(path, filename).await?;
        for host in servers {
            let client = self.client_for(&host);
            let (path_owned, name_owned) = (path.to_string(), filename.to_string());
            let result = run_blocking(move || {
                let mut sink = Cursor::new(Vec::new());
                client.read_file(&path_owned, &name_owned, &mut sink)?;
                sink.rewind()?;
                Ok(sink.into_inner())
            })
            .await;
            match result {
                Ok(bytes) => return Ok(bytes),
                Err(err) => {
                    tracing::error!(%host, %filename, %err, "failed to read file from storage node");
                }
            }
        }
        tracing::error!(%filename, "failed to read file from any replica");
        Err(CoordinatorError::BadRequest(format!(
            "no live replica could serve {filename}"
        )))
    }

    pub async fn delete_file(&self, path: &str, filename: &str) -> Result<(), CoordinatorError> {
        let servers = self.tree.get_file_servers(path, filename).await?;
        self.tree.delete_file(path, filename).await?;
        for host in servers {
            let client = self.client_for(&host);
            let (path_owned, name_owned) = (path.to_string(), filename.to_string());
            let result = run_blocking(move || client.delete_file(&path_owned, &name_owned)).await;
            if let Err(err) = result {
                tracing::error!(%host, %filename, %err, "failed to delete file on storage node");
            }
        }
        Ok(())
    }

    /// Returns -1 if no live replica could answer, matching the original's
    /// `get_file_size`'s explicit `-1` sentinel.
    pub async fn get_file_size(&self, path: &str, filename: &str) -> Result<i64, CoordinatorError> {
        let servers = self.tree.get_file_servers(path, filename).await?;
        for host in servers {
            let client = self.client_for(&host);
            let (path_owned, name_owned) = (path.to_string(), filename.to_string());
            let result = run_blocking(move || client.get_file_size(&path_owned, &name_owned)).await;
            match result {
                Ok(size) => return Ok(size as i64),
                Err(err) => {
                    tracing::error!(%host, %filename, %err, "failed to get file size from storage node");
                }
            }
        }
        tracing::error!(%filename, "failed to get size of file from any replica");
        Ok(-1)
    }

    pub async fn copy_file(
        &self,
        path: &str,
        filename: &str,
        new_path: &str,
        new_filename: Option<&str>,
    ) -> Result<(), CoordinatorError> {
        let servers = self.tree.get_file_servers(path, filename).await?;
        self.tree
            .copy_file(path, filename, new_path, new_filename)
            .await?;
        let target_name = new_filename.unwrap_or(filename).to_string();
        for host in servers {
            let client = self.client_for(&host);
            let (path_owned, name_owned, new_path_owned, target_owned) = (
                path.to_string(),
                filename.to_string(),
                new_path.to_string(),
                target_name.clone(),
            );
            let result = run_blocking(move || {
                client.copy_file(&path_owned, &name_owned, &new_path_owned, &target_owned)
            })
            .await;
            if let Err(err) = result {
                tracing::error!(%host, %filename, %err, "failed to copy file on storage node");
            }
        }
        Ok(())
    }

    pub async fn move_file(
        &self,
        path: &str,
        filename: &str,
        new_path: &str,
        new_filename: Option<&str>,
    ) -> Result<(), CoordinatorError> {
        let servers = self.tree.get_file_servers(path, filename).await?;
        self.tree
            .move_file(path, filename, new_path, new_filename)
            .await?;
        let target_name = new_filename.unwrap_or(filename).to_string();
        for host in servers {
            let client = self.client_for(&host);
            let (path_owned, name_owned, new_path_owned, target_owned) = (
                path.to_string(),
                filename.to_string(),
                new_path.to_string(),
                target_name.clone(),
            );
            let result = run_blocking(move || {
                client.move_file(&path_owned, &name_owned, &new_path_owned, &target_owned)
            })
            .await;
            if let Err(err) = result {
                tracing::error!(%host, %filename, %err, "failed to move file on storage node");
            }
        }
        Ok(())
    }

    pub async fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, TreeError> {
        self.tree.read_dir(path).await
    }

    pub async fn make_dir(&self, path: &str, dirname: &str) -> Result<(), CoordinatorError> {
        self.tree.make_dir(path, dirname).await?;
        for host in self.registry.all().await {
            let client = self.client_for(&host);
            let (path_owned, name_owned) = (path.to_string(), dirname.to_string());
            let result = run_blocking(move || client.make_dir(&path_owned, &name_owned)).await;
            if let Err(err) = result {
                tracing::error!(%host, %dirname, %err, "failed to make directory on storage node");
            }
        }
        Ok(())
    }

    pub async fn delete_dir(&self, path: &str, dirname: &str) -> Result<(), CoordinatorError> {
        self.tree.delete_dir(path, dirname).await?;
        for host in self.registry.all().await {
            let client = self.client_for(&host);
            let (path_owned, name_owned) = (path.to_string(), dirname.to_string());
            let result = run_blocking(move || client.delete_dir(&path_owned, &name_owned)).await;
            if let Err(err) = result {
                tracing::error!(%host, %dirname, %err, "failed to delete directory on storage node");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> NodeCredentials {
        NodeCredentials {
            ftp_username: "ftpuser".to_string(),
            ftp_password: "ftp-pass".to_string(),
            ftp_tls: false,
            storage_node_root: "/".to_string(),
        }
    }

    #[tokio::test]
    async fn create_file_with_no_live_nodes_fails_no_servers_available() {
        let coordinator = Coordinator::new(credentials(), 8090, Duration::from_millis(50)).await;
        let err = coordinator.create_file("", "f").await.unwrap_err();
        assert!(matches!(err, CoordinatorError::NoServers(_)));
    }

    #[tokio::test]
    async fn get_available_space_with_no_nodes_is_zero() {
        let coordinator = Coordinator::new(credentials(), 8090, Duration::from_millis(50)).await;
        assert_eq!(coordinator.get_available_space().await, 0);
    }

    /// `add_storage_server` dedupes the registry entry even when called
    /// twice for the same unreachable address, and the repeated
    /// clear/bootstrap fan-out (which runs on every call, not just the
    /// first) fails and is logged rather than panicking or blocking
    /// registration of the address itself.
    #[tokio::test]
    async fn add_storage_server_is_idempotent_for_unreachable_node() {
        let coordinator = Coordinator::new(credentials(), 8090, Duration::from_millis(50)).await;
        let addr: std::net::IpAddr = "127.0.0.1".parse().unwrap();

        coordinator.add_storage_server(addr).await;
        coordinator.add_storage_server(addr).await;

        assert_eq!(coordinator.registry.all().await, vec!["127.0.0.1".to_string()]);
    }

    #[tokio::test]
    async fn read_file_of_unknown_path_propagates_tree_error() {
        let coordinator = Coordinator::new(credentials(), 8090, Duration::from_millis(50)).await;
        let err = coordinator.read_file("", "missing").await.unwrap_err();
        assert!(matches!(err, CoordinatorError::Tree(TreeError::NoSuchFile(_))));
    }
}
