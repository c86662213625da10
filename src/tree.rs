//! Directory Tree (component B): the persistent metadata model for
//! directories, files, and the replica sets backing each file.
//!
//! The collection itself (`Store`) is a small in-process stand-in for the
//! document database the original implementation drove over `pymongo` —
//! `insert`/`find_child`/`children`/`remove` mirror `insert_one`/`find_one`/
//! `find`/`delete_one` closely enough that swapping in a networked document
//! store later would only touch this file.

use std::collections::HashMap;

use bson::oid::ObjectId;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::TreeError;
use crate::path;

pub type NodeId = ObjectId;

/// A single document in the tree collection.
#[derive(Clone, Debug)]
enum Node {
    Root,
    Dir {
        name: String,
        parent: NodeId,
    },
    File {
        name: String,
        parent: NodeId,
        servers: Vec<String>,
    },
}

impl Node {
    fn parent(&self) -> Option<NodeId> {
        match self {
            Node::Root => None,
            Node::Dir { parent, .. } | Node::File { parent, .. } => Some(*parent),
        }
    }

    fn name(&self) -> Option<&str> {
        match self {
            Node::Root => None,
            Node::Dir { name, .. } | Node::File { name, .. } => Some(name),
        }
    }
}

/// An in-process document collection, guarded by a single `RwLock` so reads
/// (path resolution, `read_dir`) run concurrently and writes are
/// serialized — the same atomicity guarantee §3/§5 require of the real
/// metadata store.
#[derive(Default)]
struct Store {
    nodes: RwLock<HashMap<NodeId, Node>>,
}

impl Store {
    async fn insert(&self, node: Node) -> NodeId {
        let id = NodeId::new();
        self.nodes.write().await.insert(id, node);
        id
    }

    async fn find_child(&self, parent: NodeId, name: &str) -> Option<(NodeId, Node)> {
        let nodes = self.nodes.read().await;
        nodes
            .iter()
            .find(|(_, node)| node.parent() == Some(parent) && node.name() == Some(name))
            .map(|(id, node)| (*id, node.clone()))
    }

    async fn children(&self, parent: NodeId) -> Vec<(NodeId, Node)> {
        let nodes = self.nodes.read().await;
        nodes
            .iter()
            .filter(|(_, node)| node.parent() == Some(parent))
            .map(|(id, node)| (*id, node.clone()))
            .collect()
    }

    async fn remove(&self, id: &NodeId) -> Option<Node> {
        self.nodes.write().await.remove(id)
    }

    async fn retain_only(&self, id: NodeId) {
        self.nodes.write().await.retain(|existing, _| *existing == id);
    }
}

/// An entry returned by `read_dir`: `{"type": "dir"|"file", "name": ...}`.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct DirEntry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: String,
}

impl From<Node> for DirEntry {
    fn from(node: Node) -> Self {
        match node {
            Node::Dir { name, .. } => DirEntry { kind: "dir", name },
            Node::File { name, .. } => DirEntry { kind: "file", name },
            Node::Root => unreachable!("root is never listed as a directory entry"),
        }
    }
}

/// The persistent directory tree. One instance lives for the lifetime of
/// the coordinator process; the root marker is created once, at
/// construction, and is never removed.
pub struct DirectoryTree {
    store: Store,
    root_id: NodeId,
}

impl DirectoryTree {
    /// Create a fresh tree with a single root marker.
    pub async fn new() -> Self {
        let store = Store::default();
        let root_id = store.insert(Node::Root).await;
        Self { store, root_id }
    }

    /// Walk `path` segment by segment, returning the id of the resolved
    /// directory (or root, for the empty path).
    async fn resolve_dir(&self, path: &str) -> Result<NodeId, TreeError> {
        let mut current = self.root_id;
        for segment in path::split_segments(path) {
            match self.store.find_child(current, segment).await {
                Some((id, Node::Dir { .. })) => current = id,
                _ => return Err(TreeError::NoSuchDirectory(path.to_string())),
            }
        }
        Ok(current)
    }

    /// Delete every non-root node; root survives.
    pub async fn clear(&self) {
        self.store.retain_only(self.root_id).await;
    }

    /// Insert a file node under `path` with the given filename and replica
    /// set. Rejects a pre-existing `(parent, name)` with `InvalidPath`
    /// (§9 redesign flag — the original never checked this).
    pub async fn create_file(
        &self,
        path: &str,
        filename: &str,
        servers: Vec<String>,
    ) -> Result<(), TreeError> {
        let parent = self.resolve_dir(path).await?;
        if self.store.find_child(parent, filename).await.is_some() {
            return Err(TreeError::InvalidPath(path::join(path, filename)));
        }
        self.store
            .insert(Node::File {
                name: filename.to_string(),
                parent,
                servers,
            })
            .await;
        Ok(())
    }

    /// Return the replica set storing the named file.
    pub async fn get_file_servers(
        &self,
        path: &str,
        filename: &str,
    ) -> Result<Vec<String>, TreeError> {
        let parent = self.resolve_dir(path).await?;
        match self.store.find_child(parent, filename).await {
            Some((_, Node::File { servers, .. })) => Ok(servers),
            _ => Err(TreeError::NoSuchFile(path::join(path, filename))),
        }
    }

    /// Remove the matching file node.
    pub async fn delete_file(&self, path: &str, filename: &str) -> Result<(), TreeError> {
        let parent = self.resolve_dir(path).await?;
        match self.store.find_child(parent, filename).await {
            Some((id, Node::File { .. })) => {
                self.store.remove(&id).await;
                Ok(())
            }
            _ => Err(TreeError::NoSuchFile(path::join(path, filename))),
        }
    }

    /// Create a new file node at `new_path`/`new_name` (default: the source
    /// name) carrying the source file's replica set. The source is
    /// untouched.
    pub async fn copy_file(
        &self,
        path: &str,
        filename: &str,
        new_path: &str,
        new_filename: Option<&str>,
    ) -> Result<(), TreeError> {
        let servers = self.get_file_servers(path, filename).await?;
        let new_name = new_filename.unwrap_or(filename);
        self.create_file(new_path, new_name, servers).await
    }

    /// `copy_file` followed by `delete_file` on the source. Not atomic: if
    /// the delete fails after the copy has already committed, a duplicate
    /// file node remains at the destination and the source is still
    /// present too (§4.B, §9).
    pub async fn move_file(
        &self,
        path: &str,
        filename: &str,
        new_path: &str,
        new_filename: Option<&str>,
    ) -> Result<(), TreeError> {
        self.copy_file(path, filename, new_path, new_filename)
            .await?;
        self.delete_file(path, filename).await
    }

    /// Insert a directory node. Rejects a pre-existing `(parent, name)`.
    pub async fn make_dir(&self, path: &str, dirname: &str) -> Result<(), TreeError> {
        let parent = self.resolve_dir(path).await?;
        if self.store.find_child(parent, dirname).await.is_some() {
            return Err(TreeError::InvalidPath(path::join(path, dirname)));
        }
        self.store
            .insert(Node::Dir {
                name: dirname.to_string(),
                parent,
            })
            .await;
        Ok(())
    }

    /// List every child (directory or file) of the resolved directory.
    /// Order is unspecified.
    pub async fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, TreeError> {
        let parent = self.resolve_dir(path).await?;
        Ok(self
            .store
            .children(parent)
            .await
            .into_iter()
            .map(|(_, node)| node.into())
            .collect())
    }

    /// Recursively delete a directory: every descendant file is removed via
    /// `delete_file`, every descendant directory bottom-up, then the
    /// directory itself.
    pub async fn delete_dir(&self, path: &str, dirname: &str) -> Result<(), TreeError> {
        let parent = self.resolve_dir(path).await?;
        let target_path = path::join(path, dirname);
        let (dir_id, node) = self
            .store
            .find_child(parent, dirname)
            .await
            .ok_or_else(|| TreeError::NoSuchDirectory(target_path.clone()))?;
        if !matches!(node, Node::Dir { .. }) {
            return Err(TreeError::NoSuchDirectory(target_path));
        }

        // Pre-order walk to collect the target directory and every
        // descendant directory, then undo it (bottom-up) to delete.
        let mut dirs = Vec::new();
        let mut stack = vec![(dir_id, target_path)];
        while let Some((id, cur_path)) = stack.pop() {
            dirs.push((id, cur_path.clone()));
            for (child_id, child) in self.store.children(id).await {
                if let Node::Dir { name, .. } = child {
                    stack.push((child_id, path::join(&cur_path, &name)));
                }
            }
        }

        for (id, cur_path) in dirs.into_iter().rev() {
            for (_, child) in self.store.children(id).await {
                if let Node::File { name, .. } = child {
                    self.delete_file(&cur_path, &name).await?;
                }
            }
            self.store.remove(&id).await;
        }
        Ok(())
    }

    /// Pre-order list of every directory in the tree, as `(path, dirname)`
    /// pairs — used to replay `make_dir` onto a newly joined storage node.
    pub async fn as_list(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        let mut stack = vec![(self.root_id, String::new())];
        while let Some((id, cur_path)) = stack.pop() {
            for (child_id, child) in self.store.children(id).await {
                if let Node::Dir { name, .. } = child {
                    out.push((cur_path.clone(), name.clone()));
                    stack.push((child_id, path::join(&cur_path, &name)));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn make_dir_then_read_dir_contains_it() {
        let tree = DirectoryTree::new().await;
        tree.make_dir("", "a").await.unwrap();
        let entries = tree.read_dir("").await.unwrap();
        assert!(entries.contains(&DirEntry {
            kind: "dir",
            name: "a".to_string()
        }));
    }

    #[tokio::test]
    async fn create_file_then_get_servers_round_trips() {
        let tree = DirectoryTree::new().await;
        let servers = vec!["n1".to_string(), "n2".to_string()];
        tree.create_file("", "f", servers.clone()).await.unwrap();
        assert_eq!(tree.get_file_servers("", "f").await.unwrap(), servers);
    }

    #[tokio::test]
    async fn get_file_servers_missing_is_no_such_file() {
        let tree = DirectoryTree::new().await;
        let err = tree.get_file_servers("", "missing").await.unwrap_err();
        assert!(matches!(err, TreeError::NoSuchFile(_)));
    }

    #[tokio::test]
    async fn resolve_missing_directory_segment_fails() {
        let tree = DirectoryTree::new().await;
        let err = tree.read_dir("nope").await.unwrap_err();
        assert!(matches!(err, TreeError::NoSuchDirectory(_)));
    }

    #[tokio::test]
    async fn duplicate_name_in_same_directory_is_rejected() {
        let tree = DirectoryTree::new().await;
        tree.make_dir("", "a").await.unwrap();
        let err = tree.make_dir("", "a").await.unwrap_err();
        assert!(matches!(err, TreeError::InvalidPath(_)));

        tree.create_file("", "f", vec!["n1".to_string()])
            .await
            .unwrap();
        let err = tree
            .create_file("", "f", vec!["n2".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, TreeError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn copy_file_preserves_servers_and_keeps_source() {
        let tree = DirectoryTree::new().await;
        let servers = vec!["n1".to_string()];
        tree.make_dir("", "copies").await.unwrap();
        tree.create_file("", "f", servers.clone()).await.unwrap();
        tree.copy_file("", "f", "copies", Some("g")).await.unwrap();

        assert_eq!(tree.get_file_servers("", "f").await.unwrap(), servers);
        assert_eq!(
            tree.get_file_servers("copies", "g").await.unwrap(),
            servers
        );
    }

    #[tokio::test]
    async fn move_file_preserves_servers_and_removes_source() {
        let tree = DirectoryTree::new().await;
        let servers = vec!["n1".to_string()];
        tree.make_dir("", "copies").await.unwrap();
        tree.create_file("", "f", servers.clone()).await.unwrap();
        tree.move_file("", "f", "copies", Some("g")).await.unwrap();

        assert_eq!(
            tree.get_file_servers("copies", "g").await.unwrap(),
            servers
        );
        assert!(matches!(
            tree.get_file_servers("", "f").await.unwrap_err(),
            TreeError::NoSuchFile(_)
        ));
    }

    #[tokio::test]
    async fn as_list_is_pre_order() {
        let tree = DirectoryTree::new().await;
        tree.make_dir("", "a").await.unwrap();
        tree.make_dir("a", "b").await.unwrap();
        tree.make_dir("", "c").await.unwrap();

        let list = tree.as_list().await;
        let pos = |path: &str, name: &str| {
            list.iter()
                .position(|(p, n)| p == path && n == name)
                .unwrap_or_else(|| panic!("{path}/{name} missing from as_list"))
        };
        assert!(pos("", "a") < pos("a", "b"));
        assert!(list.len() == 3);
    }

    #[tokio::test]
    async fn delete_dir_removes_every_descendant() {
        let tree = DirectoryTree::new().await;
        tree.make_dir("", "a").await.unwrap();
        tree.make_dir("a", "b").await.unwrap();
        tree.make_dir("", "c").await.unwrap();
        tree.create_file("a/b", "x", vec!["n1".to_string()])
            .await
            .unwrap();

        tree.delete_dir("", "a").await.unwrap();

        let entries = tree.read_dir("").await.unwrap();
        assert_eq!(entries, vec![DirEntry {
            kind: "dir",
            name: "c".to_string()
        }]);
        assert!(matches!(
            tree.read_dir("a").await.unwrap_err(),
            TreeError::NoSuchDirectory(_)
        ));
    }

    #[tokio::test]
    async fn clear_preserves_root_only() {
        let tree = DirectoryTree::new().await;
        tree.make_dir("", "a").await.unwrap();
        tree.make_dir("a", "b").await.unwrap();

        tree.clear().await;

        assert_eq!(tree.read_dir("").await.unwrap(), Vec::new());
    }
}
