//! Local filesystem backend.

use std::io::ErrorKind;
use std::path::{MAIN_SEPARATOR, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, warn};
use tokio::fs::{self, File, OpenOptions, ReadDir};
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::error::{PathError, Result};
use crate::path::glob::DEFAULT_PATTERN;
use crate::path::{PathState, Pattern, PurePath};
use crate::storage::{ByteReader, MkdirOptions, PathStream, RmOptions, StoragePath, WriteSink};

const BACKEND: &str = "local";

/// A path on the local filesystem.
///
/// Relative paths resolve against the process working directory at the time
/// of each operation. Scheme anchors such as `file://` address the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPath {
    state: PathState,
}

impl LocalPath {
    pub fn new(raw: &str) -> Self {
        LocalPath {
            state: PathState::parse(MAIN_SEPARATOR, raw),
        }
    }

    pub fn from_state(state: PathState) -> Self {
        LocalPath { state }
    }

    /// The native path handed to the OS.
    pub fn to_native(&self) -> PathBuf {
        let sep = MAIN_SEPARATOR.to_string();
        let joined = self.state.segments().collect::<Vec<_>>().join(&sep);
        let anchor = self.state.anchor();

        if anchor.is_empty() {
            if joined.is_empty() {
                return PathBuf::from(".");
            }
            return PathBuf::from(joined);
        }
        // both `/` and `file://` land on the root
        PathBuf::from(format!("{sep}{joined}"))
    }

    fn io_err(&self, operation: &'static str, err: std::io::Error) -> PathError {
        PathError::io(operation, self.full_path(), err)
    }

    /// Sibling file that collects a streamed write until it is committed.
    fn staging_path(&self) -> LocalPath {
        self.with_name(&format!(".{}.partial", self.name()))
    }
}

impl Default for LocalPath {
    fn default() -> Self {
        LocalPath::new(".")
    }
}

impl std::fmt::Display for LocalPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.state)
    }
}

impl PurePath for LocalPath {
    fn state(&self) -> &PathState {
        &self.state
    }

    fn create_new(&self, state: PathState) -> Self {
        LocalPath { state }
    }
}

/// Depth-first walk state for [`LocalPath::glob`].
struct Walk {
    pattern: Pattern,
    pending: Vec<(LocalPath, Vec<String>)>,
    current: Option<(ReadDir, LocalPath, Vec<String>)>,
}

#[async_trait]
impl StoragePath for LocalPath {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn exists(&self) -> Result<bool> {
        debug!("exists {}", self);
        fs::try_exists(self.to_native())
            .await
            .map_err(|e| self.io_err("exists", e))
    }

    async fn is_file(&self) -> Result<bool> {
        match fs::symlink_metadata(self.to_native()).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(self.io_err("is_file", e)),
        }
    }

    async fn is_dir(&self) -> Result<bool> {
        match fs::symlink_metadata(self.to_native()).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(self.io_err("is_dir", e)),
        }
    }

    fn ls(&self) -> PathStream<Self> {
        debug!("ls {}", self);
        stream::try_unfold((self.clone(), None::<ReadDir>), |(base, dir)| async move {
            let mut dir = match dir {
                Some(dir) => dir,
                None => fs::read_dir(base.to_native())
                    .await
                    .map_err(|e| base.io_err("ls", e))?,
            };
            loop {
                let Some(entry) = dir.next_entry().await.map_err(|e| base.io_err("ls", e))? else {
                    return Ok::<_, PathError>(None);
                };
                match entry.file_name().into_string() {
                    Ok(name) => {
                        let child = base.join([name]);
                        return Ok(Some((child, (base, Some(dir)))));
                    }
                    Err(raw) => warn!("skipping non-UTF-8 entry {:?} in {}", raw, base),
                }
            }
        })
        .boxed()
    }

    fn glob(&self, pattern: Option<&str>) -> PathStream<Self> {
        let pattern = Pattern::new(self.separator(), pattern.unwrap_or(DEFAULT_PATTERN));
        debug!("glob {} {:?}", self, pattern.segments());

        let prefix = pattern.literal_prefix().to_vec();
        if prefix.len() == pattern.segments().len() {
            let target = self.join(&prefix);
            return stream::once(async move {
                target.exists().await.map(|found| found.then_some(target))
            })
            .try_filter_map(|found| async move { Ok::<_, PathError>(found) })
            .boxed();
        }

        let walk = Walk {
            pattern,
            pending: vec![(self.join(&prefix), prefix)],
            current: None,
        };

        stream::try_unfold(walk, |mut walk| async move {
            loop {
                let Some((dir, base, rel)) = walk.current.as_mut() else {
                    let Some((base, rel)) = walk.pending.pop() else {
                        return Ok::<_, PathError>(None);
                    };
                    match fs::read_dir(base.to_native()).await {
                        Ok(dir) => walk.current = Some((dir, base, rel)),
                        // missing literal prefix, or removed mid-walk
                        Err(e) if e.kind() == ErrorKind::NotFound => {}
                        Err(e) => return Err(base.io_err("glob", e)),
                    }
                    continue;
                };

                let Some(entry) = dir.next_entry().await.map_err(|e| base.io_err("glob", e))? else {
                    walk.current = None;
                    continue;
                };

                let name = match entry.file_name().into_string() {
                    Ok(name) => name,
                    Err(raw) => {
                        warn!("skipping non-UTF-8 entry {:?} in {}", raw, base);
                        continue;
                    }
                };
                let child = base.join([name.as_str()]);
                let mut child_rel = rel.clone();
                child_rel.push(name);

                let room = walk
                    .pattern
                    .max_depth()
                    .is_none_or(|max| child_rel.len() < max);
                if room && entry.file_type().await.is_ok_and(|t| t.is_dir()) {
                    walk.pending.push((child.clone(), child_rel.clone()));
                }

                if walk.pattern.matches(&child_rel) {
                    log::trace!("glob match {}", child);
                    return Ok(Some((child, walk)));
                }
            }
        })
        .boxed()
    }

    async fn touch(&self) -> Result<()> {
        debug!("touch {}", self);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.to_native())
            .await
            .map_err(|e| self.io_err("touch", e))?;
        Ok(())
    }

    async fn mkdir(&self, options: MkdirOptions) -> Result<()> {
        debug!("mkdir {} {:?}", self, options);
        let native = self.to_native();
        let created = if options.parents {
            fs::create_dir_all(&native).await
        } else {
            fs::create_dir(&native).await
        };

        match created {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if self.is_dir().await? {
                    return Ok(());
                }
                Err(PathError::Conflict {
                    path: self.full_path(),
                    operation: "mkdir",
                    reason: "a non-directory entity exists".to_string(),
                })
            }
            Err(e) => Err(self.io_err("mkdir", e)),
        }
    }

    async fn rm(&self, options: RmOptions) -> Result<()> {
        debug!("rm {} {:?}", self, options);
        let native = self.to_native();
        let meta = match fs::symlink_metadata(&native).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(self.io_err("rm", e)),
        };

        if !meta.is_dir() {
            return fs::remove_file(&native)
                .await
                .map_err(|e| self.io_err("rm", e));
        }

        if options.recursive {
            return fs::remove_dir_all(&native)
                .await
                .map_err(|e| self.io_err("rm", e));
        }

        let mut entries = fs::read_dir(&native)
            .await
            .map_err(|e| self.io_err("rm", e))?;
        if entries
            .next_entry()
            .await
            .map_err(|e| self.io_err("rm", e))?
            .is_some()
        {
            return Err(PathError::NotEmpty {
                path: self.full_path(),
            });
        }
        fs::remove_dir(&native)
            .await
            .map_err(|e| self.io_err("rm", e))
    }

    async fn mv(&self, destination: &Self) -> Result<Self> {
        debug!("mv {} -> {}", self, destination);
        fs::rename(self.to_native(), destination.to_native())
            .await
            .map_err(|e| self.io_err("mv", e))?;
        Ok(destination.clone())
    }

    async fn read(&self) -> Result<Bytes> {
        debug!("read {}", self);
        let data = fs::read(self.to_native())
            .await
            .map_err(|e| self.io_err("read", e))?;
        Ok(Bytes::from(data))
    }

    async fn read_stream(&self) -> Result<ByteReader> {
        let file = File::open(self.to_native())
            .await
            .map_err(|e| self.io_err("read", e))?;
        Ok(Box::pin(file))
    }

    async fn write(&self, buf: &[u8]) -> Result<()> {
        debug!("write {} ({} bytes)", self, buf.len());
        fs::write(self.to_native(), buf)
            .await
            .map_err(|e| self.io_err("write", e))
    }

    async fn write_stream(&self) -> Result<Box<dyn WriteSink>> {
        let staging = self.staging_path();
        let file = File::create(staging.to_native())
            .await
            .map_err(|e| staging.io_err("write", e))?;
        Ok(Box::new(LocalSink {
            writer: BufWriter::new(file),
            staging,
            target: self.clone(),
            committed: false,
        }))
    }
}

/// Writes into a staging sibling and renames it over the target on close.
///
/// Dropping the sink without a successful `close` removes the staging file.
struct LocalSink {
    writer: BufWriter<File>,
    staging: LocalPath,
    target: LocalPath,
    committed: bool,
}

#[async_trait]
impl WriteSink for LocalSink {
    async fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.writer
            .write_all(buf)
            .await
            .map_err(|e| self.staging.io_err("write", e))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let mut sink = self;
        sink.writer
            .shutdown()
            .await
            .map_err(|e| sink.staging.io_err("write", e))?;
        debug!("commit {} -> {}", sink.staging, sink.target);
        fs::rename(sink.staging.to_native(), sink.target.to_native())
            .await
            .map_err(|e| sink.target.io_err("write", e))?;
        sink.committed = true;
        Ok(())
    }
}

impl Drop for LocalSink {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        debug!("discard {}", self.staging);
        match std::fs::remove_file(self.staging.to_native()) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("failed to remove staging file {}: {}", self.staging, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_native() {
        let sep = MAIN_SEPARATOR;
        assert_eq!(LocalPath::new("").to_native(), PathBuf::from("."));
        assert_eq!(LocalPath::default().to_native(), PathBuf::from("."));
        assert_eq!(
            LocalPath::new(&format!("a{sep}b")).to_native(),
            PathBuf::from(format!("a{sep}b"))
        );
        assert_eq!(
            LocalPath::new(&format!("{sep}x{sep}y")).to_native(),
            PathBuf::from(format!("{sep}x{sep}y"))
        );
        assert_eq!(
            LocalPath::new(&format!("file://tmp{sep}f")).to_native(),
            PathBuf::from(format!("{sep}tmp{sep}f"))
        );
    }

    #[test]
    fn test_staging_path_is_hidden_sibling() {
        let p = LocalPath::new("dir/out.csv");
        let staging = p.staging_path();
        assert_eq!(staging.parents(), p.parents());
        assert_eq!(staging.name(), ".out.csv.partial");
    }
}
