//! Backend selection by anchor.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};

use crate::error::{PathError, Result};
use crate::local::LocalPath;
use crate::path::{PathState, PurePath};
use crate::s3::{S3Client, S3Path};
use crate::storage::{ByteReader, MkdirOptions, PathStream, RmOptions, StoragePath, WriteSink};

/// Anchor routed to the S3 backend.
pub const S3_ANCHOR: &str = "s3://";
/// Anchor routed to the local backend as an absolute path.
pub const FILE_ANCHOR: &str = "file://";

/// Clients available for turning raw strings into paths.
#[derive(Debug, Clone, Default)]
pub struct Backends {
    s3: Option<Arc<S3Client>>,
}

impl Backends {
    /// Local filesystem only.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_s3(mut self, client: Arc<S3Client>) -> Self {
        self.s3 = Some(client);
        self
    }

    /// Parse `raw` and bind it to the backend its anchor names.
    pub fn path(&self, raw: &str) -> Result<AnyPath> {
        let anchor = PathState::parse('/', raw).anchor().to_string();
        match anchor.as_str() {
            S3_ANCHOR => match &self.s3 {
                Some(client) => Ok(AnyPath::S3(S3Path::new(Arc::clone(client), raw))),
                None => Err(PathError::NoBackend {
                    anchor,
                    path: raw.to_string(),
                }),
            },
            a if a.ends_with("://") && a != FILE_ANCHOR => Err(PathError::NoBackend {
                anchor,
                path: raw.to_string(),
            }),
            _ => Ok(AnyPath::Local(LocalPath::new(raw))),
        }
    }
}

/// A path on any supported backend.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyPath {
    Local(LocalPath),
    S3(S3Path),
}

impl AnyPath {
    pub fn as_local(&self) -> Option<&LocalPath> {
        match self {
            AnyPath::Local(p) => Some(p),
            AnyPath::S3(_) => None,
        }
    }

    pub fn as_s3(&self) -> Option<&S3Path> {
        match self {
            AnyPath::S3(p) => Some(p),
            AnyPath::Local(_) => None,
        }
    }
}

impl From<LocalPath> for AnyPath {
    fn from(p: LocalPath) -> Self {
        AnyPath::Local(p)
    }
}

impl From<S3Path> for AnyPath {
    fn from(p: S3Path) -> Self {
        AnyPath::S3(p)
    }
}

impl fmt::Display for AnyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnyPath::Local(p) => fmt::Display::fmt(p, f),
            AnyPath::S3(p) => fmt::Display::fmt(p, f),
        }
    }
}

impl PurePath for AnyPath {
    fn state(&self) -> &PathState {
        match self {
            AnyPath::Local(p) => p.state(),
            AnyPath::S3(p) => p.state(),
        }
    }

    fn create_new(&self, state: PathState) -> Self {
        match self {
            AnyPath::Local(p) => AnyPath::Local(p.create_new(state)),
            AnyPath::S3(p) => AnyPath::S3(p.create_new(state)),
        }
    }
}

#[async_trait]
impl StoragePath for AnyPath {
    fn backend(&self) -> &'static str {
        match self {
            AnyPath::Local(p) => p.backend(),
            AnyPath::S3(p) => p.backend(),
        }
    }

    async fn exists(&self) -> Result<bool> {
        match self {
            AnyPath::Local(p) => p.exists().await,
            AnyPath::S3(p) => p.exists().await,
        }
    }

    async fn is_file(&self) -> Result<bool> {
        match self {
            AnyPath::Local(p) => p.is_file().await,
            AnyPath::S3(p) => p.is_file().await,
        }
    }

    async fn is_dir(&self) -> Result<bool> {
        match self {
            AnyPath::Local(p) => p.is_dir().await,
            AnyPath::S3(p) => p.is_dir().await,
        }
    }

    fn ls(&self) -> PathStream<Self> {
        match self {
            AnyPath::Local(p) => p.ls().map_ok(AnyPath::Local).boxed(),
            AnyPath::S3(p) => p.ls().map_ok(AnyPath::S3).boxed(),
        }
    }

    fn glob(&self, pattern: Option<&str>) -> PathStream<Self> {
        match self {
            AnyPath::Local(p) => p.glob(pattern).map_ok(AnyPath::Local).boxed(),
            AnyPath::S3(p) => p.glob(pattern).map_ok(AnyPath::S3).boxed(),
        }
    }

    async fn touch(&self) -> Result<()> {
        match self {
            AnyPath::Local(p) => p.touch().await,
            AnyPath::S3(p) => p.touch().await,
        }
    }

    async fn mkdir(&self, options: MkdirOptions) -> Result<()> {
        match self {
            AnyPath::Local(p) => p.mkdir(options).await,
            AnyPath::S3(p) => p.mkdir(options).await,
        }
    }

    async fn rm(&self, options: RmOptions) -> Result<()> {
        match self {
            AnyPath::Local(p) => p.rm(options).await,
            AnyPath::S3(p) => p.rm(options).await,
        }
    }

    /// Same-backend moves delegate; across backends the contents are copied
    /// and the source removed.
    async fn mv(&self, destination: &Self) -> Result<Self> {
        match (self, destination) {
            (AnyPath::Local(from), AnyPath::Local(to)) => from.mv(to).await.map(AnyPath::Local),
            (AnyPath::S3(from), AnyPath::S3(to)) => from.mv(to).await.map(AnyPath::S3),
            _ => {
                if !self.is_file().await? {
                    return Err(PathError::CrossBackend {
                        operation: "mv",
                        from: self.full_path(),
                        to: destination.full_path(),
                    });
                }
                log::debug!("mv {} -> {} by copy", self, destination);
                let data = self.read().await?;
                destination.write(&data).await?;
                self.rm(RmOptions::default()).await?;
                Ok(destination.clone())
            }
        }
    }

    async fn read(&self) -> Result<Bytes> {
        match self {
            AnyPath::Local(p) => p.read().await,
            AnyPath::S3(p) => p.read().await,
        }
    }

    async fn read_stream(&self) -> Result<ByteReader> {
        match self {
            AnyPath::Local(p) => p.read_stream().await,
            AnyPath::S3(p) => p.read_stream().await,
        }
    }

    async fn write(&self, buf: &[u8]) -> Result<()> {
        match self {
            AnyPath::Local(p) => p.write(buf).await,
            AnyPath::S3(p) => p.write(buf).await,
        }
    }

    async fn write_stream(&self) -> Result<Box<dyn WriteSink>> {
        match self {
            AnyPath::Local(p) => p.write_stream().await,
            AnyPath::S3(p) => p.write_stream().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_by_default() {
        let backends = Backends::new();
        for raw in ["a/b", "/abs/path", "./rel", "file://tmp/x"] {
            let p = backends.path(raw).unwrap();
            assert!(p.as_local().is_some(), "{raw}");
            assert_eq!(p.backend(), "local");
        }
    }

    #[test]
    fn test_s3_without_client() {
        let err = Backends::new().path("s3://bucket/key").unwrap_err();
        assert!(matches!(err, PathError::NoBackend { ref anchor, .. } if anchor == "s3://"));
    }

    #[test]
    fn test_unknown_scheme() {
        let err = Backends::new().path("gs://bucket/key").unwrap_err();
        assert!(matches!(err, PathError::NoBackend { ref anchor, .. } if anchor == "gs://"));
    }

    #[test]
    fn test_edits_keep_variant() {
        let p = Backends::new().path("/data/in.csv").unwrap();
        let q = p.with_ext("json").join(["nested"]);
        assert!(q.as_local().is_some());
        assert_eq!(q.name(), "nested");
        assert_eq!(q.parents(), &["data", "in.json"]);
    }
}
