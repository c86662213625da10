//! Storage-Node Client (Component C).
//!
//! Talks to a single storage node over FTP: the bulk-transfer side-channel
//! used for every file's actual bytes, as opposed to the HTTP side-channel
//! used for health/space queries (`registry.rs`) and the `/connect/`
//! handshake. Grounded on the original `storage_server.py`, which wraps
//! `ftplib.FTP` the same way this wraps `suppaftp::FtpStream`.
//!
//! `suppaftp`'s client is blocking and synchronous, so every method here is
//! a plain blocking call. Callers (the coordinator) run them inside
//! `tokio::task::spawn_blocking`, the same way the teacher's
//! `atomic.rs::sync_dir` wraps a blocking `File::sync_all` off the async
//! runtime.
//!
//! Every public method opens its own control connection, logs in, does the
//! one thing it was asked to do, and lets the connection drop. There is no
//! connection pool: storage nodes in this system are commodity boxes that
//! come and go, and a short-lived FTP session is cheap next to the cost of
//! the file transfer itself.

use std::io::{Cursor, Seek};

use suppaftp::FtpStream;

use crate::bytes::{ByteSink, ByteSource};
use crate::error::TransportError;

use suppaftp::{native_tls::TlsConnector, NativeTlsConnector, NativeTlsFtpStream};

/// A client bound to one storage node's FTP endpoint.
#[derive(Debug, Clone)]
pub struct NodeClient {
    host: String,
    port: u16,
    username: String,
    password: String,
    tls: bool,
    storage_root: String,
}

impl NodeClient {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
        tls: bool,
        storage_root: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            tls,
            storage_root: storage_root.into(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Open and authenticate a fresh control connection.
    fn connect(&self) -> Result<Session, TransportError> {
        let addr = format!("{}:{}", self.host, self.port);
        if self.tls {
            let stream = FtpStream::connect(&addr)?;
            let connector = TlsConnector::new().map_err(|err| TransportError::Failed(err.to_string()))?;
            let mut stream = stream.into_secure(NativeTlsConnector::from(connector), &self.host)?;
            stream.login(&self.username, &self.password)?;
            return Ok(Session::Tls(Box::new(stream)));
        }
        let mut stream = FtpStream::connect(&addr)?;
        stream.login(&self.username, &self.password)?;
        Ok(Session::Plain(stream))
    }

    /// Create an empty file at `path/name`. Used to seed a freshly
    /// registered storage node with the existing directory tree's empty
    /// files, and by `create_file` before the first write.
    pub fn create_file(&self, path: &str, name: &str) -> Result<(), TransportError> {
        let mut session = self.connect()?;
        session.cwd(&self.full_path(path))?;
        session.put_file(name, &mut std::io::empty())?;
        Ok(())
    }

    /// Download `path/name` into `sink`, starting at whatever position the
    /// sink is currently at. Callers rewind the sink themselves afterward.
    pub fn read_file(&self, path: &str, name: &str, sink: &mut dyn ByteSink) -> Result<(), TransportError> {
        let mut session = self.connect()?;
        session.cwd(&self.full_path(path))?;
        session.retr(name, sink)?;
        Ok(())
    }

    /// Upload the full contents of `source` to `path/name`, overwriting
    /// whatever is already there.
    pub fn write_file(&self, path: &str, name: &str, source: &mut dyn ByteSource) -> Result<(), TransportError> {
        source.rewind()?;
        let mut session = self.connect()?;
        session.cwd(&self.full_path(path))?;
        session.put_file(name, source)?;
        Ok(())
    }

    pub fn delete_file(&self, path: &str, name: &str) -> Result<(), TransportError> {
        let mut session = self.connect()?;
        session.cwd(&self.full_path(path))?;
        session.rm(name)?;
        Ok(())
    }

    pub fn get_file_size(&self, path: &str, name: &str) -> Result<usize, TransportError> {
        let mut session = self.connect()?;
        session.cwd(&self.full_path(path))?;
        session.size(name)
    }

    /// Emulated via a temporary in-memory buffer, the way the Python client
    /// emulates `COPY` over plain FTP (which has no such command): read the
    /// whole file down, then write it back up under the new name.
    pub fn copy_file(&self, path: &str, name: &str, new_path: &str, new_name: &str) -> Result<(), TransportError> {
        let mut buffer = Cursor::new(Vec::new());
        self.read_file(path, name, &mut buffer)?;
        self.write_file(new_path, new_name, &mut buffer)
    }

    pub fn move_file(&self, path: &str, name: &str, new_path: &str, new_name: &str) -> Result<(), TransportError> {
        self.copy_file(path, name, new_path, new_name)?;
        self.delete_file(path, name)
    }

    pub fn make_dir(&self, path: &str, name: &str) -> Result<(), TransportError> {
        let mut session = self.connect()?;
        session.cwd(&self.full_path(path))?;
        session.mkdir(name)?;
        Ok(())
    }

    /// List the entries directly inside `path`, by name (not full paths).
    pub fn read_dir(&self, path: &str) -> Result<Vec<String>, TransportError> {
        let mut session = self.connect()?;
        let full = self.full_path(path);
        let entries = session.nlst(&full)?;
        Ok(entries.into_iter().map(|entry| basename(&entry).to_string()).collect())
    }

    /// Recursively delete the directory at `path/name` and everything
    /// inside it.
    ///
    /// FTP's `NLST` gives back a flat list of names with no indication of
    /// which are files and which are directories, and plain FTP has no
    /// `STAT`-style entry-type query every server reliably supports. The
    /// original implementation tells them apart with a probe: try `CWD`
    /// into the entry, and treat success as "it's a directory" (recursing
    /// into it) and failure as "it's a file" (deleting it directly). The
    /// probe leaves the session's working directory wherever the last
    /// recursive call left it, which is harmless since every subsequent
    /// command here addresses paths explicitly rather than relying on cwd.
    pub fn delete_dir(&self, path: &str, name: &str) -> Result<(), TransportError> {
        let mut session = self.connect()?;
        let target = self.full_path(&crate::path::join(path, name));
        delete_dir_recursive(&mut session, &target)
    }

    /// Remove everything under the storage root, leaving the root itself.
    pub fn clear(&self) -> Result<(), TransportError> {
        let mut session = self.connect()?;
        let entries = session.nlst(&self.storage_root)?;
        for entry in entries {
            match session.cwd(&entry) {
                Ok(()) => delete_dir_recursive(&mut session, &entry)?,
                Err(_) => session.rm(&entry)?,
            }
        }
        Ok(())
    }

    fn full_path(&self, path: &str) -> String {
        crate::path::join(&self.storage_root, path)
    }
}

fn delete_dir_recursive(session: &mut Session, path: &str) -> Result<(), TransportError> {
    let entries = session.nlst(path)?;
    for entry in entries {
        match session.cwd(&entry) {
            Ok(()) => delete_dir_recursive(session, &entry)?,
            Err(_) => session.rm(&entry)?,
        }
    }
    session.rmdir(path)?;
    Ok(())
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Thin dispatch over the two connection flavors `suppaftp` hands back:
/// a plain `FtpStream` or, once `into_secure` has run, a differently typed
/// TLS-wrapped stream. Both expose the same method names; this just picks
/// which concrete type to call them on.
enum Session {
    Plain(FtpStream),
    Tls(Box<NativeTlsFtpStream>),
}

impl Session {
    fn cwd(&mut self, path: &str) -> Result<(), suppaftp::FtpError> {
        match self {
            Session::Plain(stream) => stream.cwd(path),
            Session::Tls(stream) => stream.cwd(path),
        }
    }

    fn mkdir(&mut self, path: &str) -> Result<(), suppaftp::FtpError> {
        match self {
            Session::Plain(stream) => stream.mkdir(path),
            Session::Tls(stream) => stream.mkdir(path),
        }
    }

    fn rmdir(&mut self, path: &str) -> Result<(), suppaftp::FtpError> {
        match self {
            Session::Plain(stream) => stream.rmdir(path),
            Session::Tls(stream) => stream.rmdir(path),
        }
    }

    fn rm(&mut self, filename: &str) -> Result<(), suppaftp::FtpError> {
        match self {
            Session::Plain(stream) => stream.rm(filename),
            Session::Tls(stream) => stream.rm(filename),
        }
    }

    fn put_file<R: std::io::Read>(&mut self, filename: &str, reader: &mut R) -> Result<u64, suppaftp::FtpError> {
        match self {
            Session::Plain(stream) => stream.put_file(filename, reader),
            Session::Tls(stream) => stream.put_file(filename, reader),
        }
    }

    fn retr(&mut self, filename: &str, sink: &mut dyn ByteSink) -> Result<(), suppaftp::FtpError> {
        match self {
            Session::Plain(stream) => stream.retr(filename, |reader| {
                std::io::copy(reader, sink).map_err(suppaftp::FtpError::ConnectionError)?;
                Ok(())
            }),
            Session::Tls(stream) => stream.retr(filename, |reader| {
                std::io::copy(reader, sink).map_err(suppaftp::FtpError::ConnectionError)?;
                Ok(())
            }),
        }
    }

    fn size(&mut self, filename: &str) -> Result<usize, TransportError> {
        let size = match self {
            Session::Plain(stream) => stream.size(filename),
            Session::Tls(stream) => stream.size(filename),
        }?;
        Ok(size)
    }

    fn nlst(&mut self, path: &str) -> Result<Vec<String>, suppaftp::FtpError> {
        match self {
            Session::Plain(stream) => stream.nlst(Some(path)),
            Session::Tls(stream) => stream.nlst(Some(path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_path_joins_under_storage_root() {
        let client = NodeClient::new("h", 21, "u", "p", false, "/");
        assert_eq!(client.full_path(""), "/");
        assert_eq!(client.full_path("a/b"), "/a/b");
    }

    #[test]
    fn basename_takes_last_segment() {
        assert_eq!(basename("/a/b/c"), "c");
        assert_eq!(basename("c"), "c");
    }
}
