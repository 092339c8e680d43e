//! Capability contract every storage backend implements.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

use crate::error::{PathError, Result};
use crate::path::PurePath;

/// Lazy, finite sequence of path values produced by `ls` and `glob`.
///
/// Each poll performs at most the backend I/O needed for the next item.
/// Calling `ls`/`glob` again starts a fresh listing.
pub type PathStream<P> = BoxStream<'static, Result<P>>;

/// Incremental reader returned by [`StoragePath::read_stream`].
pub type ByteReader = Pin<Box<dyn AsyncRead + Send>>;

/// Options for [`StoragePath::mkdir`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MkdirOptions {
    /// Create missing intermediate directories.
    pub parents: bool,
}

/// Options for [`StoragePath::rm`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RmOptions {
    /// Delete a non-empty directory or prefix with everything under it.
    pub recursive: bool,
}

/// Sink returned by [`StoragePath::write_stream`].
///
/// Nothing is visible at the destination until [`WriteSink::close`] returns.
#[async_trait]
pub trait WriteSink: Send {
    async fn write(&mut self, buf: &[u8]) -> Result<()>;

    /// Commit everything written so far.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// I/O capabilities of a path value.
///
/// Every operation resolves exactly once. Missing entities are reported as
/// `false` by the queries and ignored by `rm`; concepts a backend does not
/// have fail with [`PathError::Unsupported`].
#[async_trait]
pub trait StoragePath: PurePath + Clone + Send + Sync + 'static {
    /// Short backend name used in errors and logs.
    fn backend(&self) -> &'static str;

    async fn exists(&self) -> Result<bool>;

    async fn is_file(&self) -> Result<bool>;

    async fn is_dir(&self) -> Result<bool>;

    /// Immediate children, one level deep. Order is backend-defined.
    fn ls(&self) -> PathStream<Self>;

    /// Descendants whose path relative to `self` matches `pattern`
    /// (default `*`).
    fn glob(&self, pattern: Option<&str>) -> PathStream<Self>;

    /// Create an empty entity if nothing is there yet.
    async fn touch(&self) -> Result<()>;

    async fn mkdir(&self, options: MkdirOptions) -> Result<()>;

    async fn rm(&self, options: RmOptions) -> Result<()>;

    /// Move the entity to `destination` and return it.
    async fn mv(&self, destination: &Self) -> Result<Self>;

    async fn read(&self) -> Result<Bytes>;

    async fn read_stream(&self) -> Result<ByteReader>;

    /// Feed the contents to `callback` chunk by chunk.
    async fn read_callback<F>(&self, mut callback: F) -> Result<()>
    where
        F: FnMut(Bytes) + Send,
    {
        let mut chunks = ReaderStream::new(self.read_stream().await?);
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(|e| PathError::io("read", self.full_path(), e))?;
            callback(chunk);
        }
        Ok(())
    }

    /// Replace the contents, creating the entity if needed.
    async fn write(&self, buf: &[u8]) -> Result<()>;

    async fn write_stream(&self) -> Result<Box<dyn WriteSink>>;
}
