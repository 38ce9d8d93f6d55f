//! External collaborators of the sync engine.
//!
//! The engine only talks to the outside world through three narrow seams:
//! - [`FileStore`] - a directory tree of Markdown files
//! - [`RecordStore`] - the host application's folders and journal records
//! - [`Codec`] - conversion between record content and Markdown
//!
//! Concrete adapters live in the submodules.

pub mod codec;
pub mod local;
pub mod memory;
pub mod sqlite;

use std::future::Future;

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use serde_json::Value;

use crate::model::{Folder, NewRecord, Record};
use crate::sync::{DirCreate, SyncResult};

pub use codec::IdentityCodec;
pub use local::LocalFileStore;
pub use memory::MemoryFileStore;
pub use sqlite::SqliteRecordStore;

/// A file reported by [`FileStore::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFile {
    /// Store-relative path; segments may be percent-encoded.
    pub path: String,
    /// Modification time in whole seconds, if the store tracks one.
    pub modified: Option<i64>,
}

/// Immediate contents of a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub files: Vec<ListedFile>,
    /// Store-relative subdirectory paths, without trailing slash.
    pub dirs: Vec<String>,
}

/// Filesystem-like store holding the Markdown tree.
///
/// All paths are store-relative and `/`-separated.
pub trait FileStore: Send + Sync {
    /// List the immediate files and subdirectories of `dir`.
    ///
    /// Fails with `NotFound` or `PermissionDenied` rather than returning an empty listing.
    fn list(&self, dir: &str) -> impl Future<Output = SyncResult<Listing>> + Send;

    /// Read a whole file as text.
    fn fetch_text(&self, path: &str) -> impl Future<Output = SyncResult<String>> + Send;

    /// Create one directory. The parent must exist.
    fn create_directory(&self, path: &str) -> impl Future<Output = SyncResult<DirCreate>> + Send;

    /// Write `bytes` to `dir/file_name`, replacing any existing file.
    fn upload(
        &self,
        dir: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> impl Future<Output = SyncResult<()>> + Send;
}

/// Host-side store of folders and journal records.
pub trait RecordStore: Send + Sync {
    /// All folders of `kind`, with their direct records, in host order.
    fn list_folders(&self, kind: &str) -> impl Future<Output = SyncResult<Vec<Folder>>> + Send;

    /// Records of `kind` that are not inside any folder.
    fn list_top_level_records(
        &self,
        kind: &str,
    ) -> impl Future<Output = SyncResult<Vec<Record>>> + Send;

    fn create_folder(
        &self,
        name: &str,
        parent_id: Option<&str>,
        kind: &str,
    ) -> impl Future<Output = SyncResult<Folder>> + Send;

    fn create_record(&self, record: NewRecord) -> impl Future<Output = SyncResult<Record>> + Send;

    /// Replace content. Does not touch sync flags.
    fn update_record_content(
        &self,
        id: &str,
        content: &str,
    ) -> impl Future<Output = SyncResult<()>> + Send;

    fn set_flag(
        &self,
        id: &str,
        namespace: &str,
        key: &str,
        value: Value,
    ) -> impl Future<Output = SyncResult<()>> + Send;
}

/// Conversion between record content and the portable disk format.
pub trait Codec: Send + Sync {
    /// Record content to Markdown.
    fn to_portable(&self, content: &str) -> String;

    /// Markdown to record content.
    fn from_portable(&self, text: &str) -> String;
}

/// Characters escaped in a path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-encode a single path segment.
#[must_use]
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// Decode a percent-encoded path. Invalid UTF-8 is replaced.
#[must_use]
pub fn decode_path(path: &str) -> String {
    percent_decode_str(path).decode_utf8_lossy().into_owned()
}

/// Join a directory and a child name with exactly one `/`.
#[must_use]
pub fn join_path(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}
