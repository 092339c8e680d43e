use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};

use super::client::{ListObjectsResult, uri};
use super::sink::S3Sink;
use super::S3Client;
use crate::error::{PathError, Result};
use crate::path::glob::DEFAULT_PATTERN;
use crate::path::{PathState, Pattern, PurePath};
use crate::storage::{ByteReader, MkdirOptions, PathStream, RmOptions, StoragePath, WriteSink};

const BACKEND: &str = "s3";
const SEPARATOR: char = '/';

/// A bucket bound to the client that reaches it.
///
/// Shared by every path derived from the one that created it.
#[derive(Debug)]
pub struct S3Bucket {
    client: Arc<S3Client>,
    name: String,
}

impl S3Bucket {
    pub fn new(client: Arc<S3Client>, name: impl Into<String>) -> Self {
        S3Bucket {
            client,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client(&self) -> &Arc<S3Client> {
        &self.client
    }
}

/// A path to an S3 object or prefix, e.g. `s3://bucket/dir/file.txt`.
///
/// The first segment after the anchor names the bucket; the rest form the
/// object key. S3 has no directories, so [`StoragePath::is_dir`] and
/// [`StoragePath::mkdir`] fail with [`PathError::Unsupported`].
#[derive(Debug, Clone)]
pub struct S3Path {
    state: PathState,
    bucket: Arc<S3Bucket>,
}

impl S3Path {
    /// Parse `raw` and bind the bucket named by its first segment.
    pub fn new(client: Arc<S3Client>, raw: &str) -> Self {
        Self::from_state(client, PathState::parse(SEPARATOR, raw))
    }

    pub fn from_state(client: Arc<S3Client>, state: PathState) -> Self {
        let name = state
            .parents()
            .first()
            .map(String::as_str)
            .unwrap_or(state.name())
            .to_string();
        Self::with_bucket(state, Arc::new(S3Bucket::new(client, name)))
    }

    pub fn with_bucket(state: PathState, bucket: Arc<S3Bucket>) -> Self {
        S3Path { state, bucket }
    }

    pub fn bucket(&self) -> &Arc<S3Bucket> {
        &self.bucket
    }

    /// Object key: every segment after the bucket.
    pub fn key(&self) -> String {
        if self.state.parents().is_empty() {
            return String::new();
        }
        self.state
            .segments()
            .skip(1)
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Listing prefix for everything below this path.
    fn dir_prefix(&self) -> String {
        let key = self.key();
        if key.is_empty() { key } else { format!("{key}/") }
    }

    fn uri(&self) -> String {
        uri(&self.bucket.name, &self.key())
    }

    fn client(&self) -> &S3Client {
        &self.bucket.client
    }

    /// Lazily fetch listing pages, following continuation tokens.
    fn pages(
        &self,
        prefix: String,
        delimiter: Option<&'static str>,
    ) -> BoxStream<'static, Result<ListObjectsResult>> {
        let bucket = Arc::clone(&self.bucket);
        stream::try_unfold(Some(None::<String>), move |token| {
            let bucket = Arc::clone(&bucket);
            let prefix = prefix.clone();
            async move {
                let Some(token) = token else {
                    return Ok::<_, PathError>(None);
                };
                let page = bucket
                    .client
                    .list_objects(&bucket.name, &prefix, delimiter, token, None)
                    .await?;
                let next = page.next_token.clone().map(Some);
                Ok(Some((page, next)))
            }
        })
        .boxed()
    }

    /// Every key under `prefix`, all pages.
    async fn keys_under(&self, prefix: &str) -> Result<Vec<String>> {
        let mut pages = self.pages(prefix.to_string(), None);
        let mut keys = Vec::new();
        while let Some(page) = pages.try_next().await? {
            keys.extend(page.objects.into_iter().map(|o| o.key));
        }
        Ok(keys)
    }

    fn root_unsupported(&self, operation: &'static str) -> Result<String> {
        let key = self.key();
        if key.is_empty() {
            return Err(PathError::unsupported(BACKEND, operation));
        }
        Ok(key)
    }
}

/// Matches of `pattern` among one listing page, relative to `base_prefix`.
///
/// Each key stands for itself and for every implied prefix deeper than the
/// `literal` leading segments of the pattern. Anything already in `seen` from
/// an earlier page is dropped.
fn glob_page<'a>(
    pattern: &Pattern,
    base_prefix: &str,
    literal: usize,
    keys: impl IntoIterator<Item = &'a str>,
    seen: &mut HashSet<String>,
) -> Vec<String> {
    let mut found = Vec::new();
    for key in keys {
        let Some(rel) = key.strip_prefix(base_prefix) else {
            continue;
        };
        let parts: Vec<&str> = rel.split('/').filter(|s| !s.is_empty()).collect();
        for depth in literal + 1..=parts.len() {
            let candidate = &parts[..depth];
            let joined = candidate.join("/");
            if seen.contains(&joined) || !pattern.matches(candidate) {
                continue;
            }
            log::trace!("glob match {joined}");
            seen.insert(joined.clone());
            found.push(joined);
        }
    }
    found
}

impl PartialEq for S3Path {
    fn eq(&self, other: &Self) -> bool {
        self.state == other.state && self.bucket.name == other.bucket.name
    }
}

impl fmt::Display for S3Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.state)
    }
}

impl PurePath for S3Path {
    fn state(&self) -> &PathState {
        &self.state
    }

    fn create_new(&self, state: PathState) -> Self {
        S3Path::with_bucket(state, Arc::clone(&self.bucket))
    }
}

#[async_trait]
impl StoragePath for S3Path {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn exists(&self) -> Result<bool> {
        let key = self.key();
        if key.is_empty() {
            return self.client().bucket_exists(&self.bucket.name).await;
        }
        if self.client().head_object(&self.bucket.name, &key).await?.is_some() {
            return Ok(true);
        }
        self.client()
            .has_objects_under(&self.bucket.name, &self.dir_prefix())
            .await
    }

    async fn is_file(&self) -> Result<bool> {
        let key = self.key();
        if key.is_empty() {
            return Ok(false);
        }
        Ok(self
            .client()
            .head_object(&self.bucket.name, &key)
            .await?
            .is_some())
    }

    async fn is_dir(&self) -> Result<bool> {
        Err(PathError::unsupported(BACKEND, "is_dir"))
    }

    fn ls(&self) -> PathStream<Self> {
        let prefix = self.dir_prefix();
        let base = self.clone();
        self.pages(prefix.clone(), Some("/"))
            .map_ok(move |page| {
                let children: Vec<Result<S3Path>> = page
                    .prefixes
                    .iter()
                    .map(String::as_str)
                    .chain(page.objects.iter().map(|o| o.key.as_str()))
                    .filter_map(|key| key.strip_prefix(prefix.as_str()))
                    .map(|rest| rest.trim_end_matches('/'))
                    .filter(|rest| !rest.is_empty())
                    .map(|rest| Ok(base.join([rest])))
                    .collect();
                stream::iter(children)
            })
            .try_flatten()
            .boxed()
    }

    fn glob(&self, pattern: Option<&str>) -> PathStream<Self> {
        let pattern = Pattern::new(SEPARATOR, pattern.unwrap_or(DEFAULT_PATTERN));
        let literal = pattern.literal_prefix().to_vec();

        if literal.len() == pattern.segments().len() {
            let target = self.join(&literal);
            return stream::once(async move {
                target.exists().await.map(|found| found.then_some(target))
            })
            .try_filter_map(|found| async move { Ok::<_, PathError>(found) })
            .boxed();
        }

        // S3 cannot match patterns: list under the literal part, filter here
        let base = self.clone();
        let base_prefix = self.dir_prefix();
        let mut list_prefix = base_prefix.clone();
        for segment in &literal {
            list_prefix.push_str(segment);
            list_prefix.push('/');
        }

        let mut seen: HashSet<String> = HashSet::new();
        self.pages(list_prefix, None)
            .map_ok(move |page| {
                let keys = page.objects.iter().map(|o| o.key.as_str());
                let found: Vec<Result<S3Path>> =
                    glob_page(&pattern, &base_prefix, literal.len(), keys, &mut seen)
                        .into_iter()
                        .map(|rel| Ok(base.join([rel])))
                        .collect();
                stream::iter(found)
            })
            .try_flatten()
            .boxed()
    }

    async fn touch(&self) -> Result<()> {
        let key = self.root_unsupported("touch on a bucket root")?;
        if self.client().head_object(&self.bucket.name, &key).await?.is_some() {
            return Ok(());
        }
        self.client()
            .put_object(&self.bucket.name, &key, Bytes::new())
            .await
    }

    async fn mkdir(&self, _options: MkdirOptions) -> Result<()> {
        Err(PathError::unsupported(BACKEND, "mkdir"))
    }

    async fn rm(&self, options: RmOptions) -> Result<()> {
        let key = self.root_unsupported("rm on a bucket root")?;
        let children = self.keys_under(&self.dir_prefix()).await?;
        if !children.is_empty() && !options.recursive {
            return Err(PathError::NotEmpty { path: self.uri() });
        }

        self.client().delete_object(&self.bucket.name, &key).await?;
        for child in children {
            self.client().delete_object(&self.bucket.name, &child).await?;
        }
        Ok(())
    }

    async fn mv(&self, destination: &Self) -> Result<Self> {
        let from_key = self.root_unsupported("mv on a bucket root")?;
        let to_key = destination.root_unsupported("mv on a bucket root")?;
        let (from_bucket, to_bucket) = (&self.bucket.name, &destination.bucket.name);

        if self.client().head_object(from_bucket, &from_key).await?.is_some() {
            self.client()
                .copy_object(from_bucket, &from_key, to_bucket, &to_key)
                .await?;
            self.client().delete_object(from_bucket, &from_key).await?;
            return Ok(destination.clone());
        }

        let prefix = self.dir_prefix();
        let keys = self.keys_under(&prefix).await?;
        if keys.is_empty() {
            return Err(PathError::NotFound { path: self.uri() });
        }
        for key in keys {
            let rel = key.strip_prefix(prefix.as_str()).unwrap_or(&key);
            let target = format!("{to_key}/{rel}");
            self.client()
                .copy_object(from_bucket, &key, to_bucket, &target)
                .await?;
            self.client().delete_object(from_bucket, &key).await?;
        }
        Ok(destination.clone())
    }

    async fn read(&self) -> Result<Bytes> {
        let key = self.root_unsupported("read on a bucket root")?;
        self.client().get_object(&self.bucket.name, &key).await
    }

    async fn read_stream(&self) -> Result<ByteReader> {
        let key = self.root_unsupported("read on a bucket root")?;
        let body = self
            .client()
            .get_object_stream(&self.bucket.name, &key)
            .await?;
        Ok(Box::pin(body.into_async_read()))
    }

    async fn write(&self, buf: &[u8]) -> Result<()> {
        let key = self.root_unsupported("write on a bucket root")?;
        self.client()
            .put_object(&self.bucket.name, &key, Bytes::copy_from_slice(buf))
            .await
    }

    async fn write_stream(&self) -> Result<Box<dyn WriteSink>> {
        let key = self.root_unsupported("write on a bucket root")?;
        Ok(Box::new(S3Sink {
            client: Arc::clone(&self.bucket.client),
            bucket: self.bucket.name.clone(),
            key,
            buffer: BytesMut::new(),
        }))
    }
}
