//! Capability interfaces for whole-file transfer (§9).
//!
//! The original implementation treats file parameters as anything with
//! `read`/`write`/`seek` (Python's duck typing). Here that becomes two
//! narrow traits over the standard I/O traits, with a blanket impl so any
//! `Read + Seek` (or `Write + Seek`) type — in practice
//! `std::io::Cursor<Vec<u8>>`, since writes and reads are whole-file only,
//! never streamed — satisfies them for free.

use std::io::{Read, Seek, Write};

/// A rewindable byte source: something the storage-node client can upload
/// from, and re-read from the start for the next replica.
pub trait ByteSource: Read + Seek {}
impl<T: Read + Seek> ByteSource for T {}

/// A rewindable byte sink: something the storage-node client can download
/// into, and whose caller rewinds to hand the bytes onward (e.g. into the
/// HTTP response body).
pub trait ByteSink: Write + Seek {}
impl<T: Write + Seek> ByteSink for T {}
