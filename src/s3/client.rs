use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use log::debug;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::error::{PathError, Result};

/// Escaped in `x-amz-copy-source`; `/` stays literal between key segments.
const COPY_SOURCE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Wrapper around the AWS S3 client
#[derive(Debug, Clone)]
pub struct S3Client {
    client: Client,
}

impl S3Client {
    /// Wrap an already configured SDK client
    pub fn from_client(client: Client) -> Self {
        S3Client { client }
    }

    /// Check that a bucket exists and is reachable
    pub async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        debug!("head_bucket {bucket}");
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(err) => Err(PathError::object_store("head_bucket", uri(bucket, ""), err)),
        }
    }

    /// List one page of objects under `prefix`
    pub async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
        continuation: Option<String>,
        max_keys: Option<i32>,
    ) -> Result<ListObjectsResult> {
        debug!("list_objects_v2 {} delimiter={delimiter:?}", uri(bucket, prefix));
        let mut req = self.client.list_objects_v2().bucket(bucket);

        if !prefix.is_empty() {
            req = req.prefix(prefix);
        }

        if let Some(delim) = delimiter {
            req = req.delimiter(delim);
        }

        if let Some(token) = continuation {
            req = req.continuation_token(token);
        }

        if let Some(max) = max_keys {
            req = req.max_keys(max);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| PathError::object_store("list", uri(bucket, prefix), e))?;

        let prefixes = resp
            .common_prefixes()
            .iter()
            .filter_map(|p| p.prefix())
            .map(String::from)
            .collect();

        let objects = resp
            .contents()
            .iter()
            .map(|obj| ObjectInfo {
                key: obj.key().unwrap_or("").to_string(),
            })
            .collect();

        let next_token = if resp.is_truncated().unwrap_or(false) {
            resp.next_continuation_token().map(String::from)
        } else {
            None
        };

        Ok(ListObjectsResult {
            prefixes,
            objects,
            next_token,
        })
    }

    /// Whether at least one object lives under `prefix`
    pub async fn has_objects_under(&self, bucket: &str, prefix: &str) -> Result<bool> {
        let page = self.list_objects(bucket, prefix, None, None, Some(1)).await?;
        Ok(!page.objects.is_empty())
    }

    /// Get an object's metadata, `None` when there is no such key
    pub async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<ObjectMetadata>> {
        debug!("head_object {}", uri(bucket, key));
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(resp) => Ok(Some(ObjectMetadata {
                size: resp.content_length().unwrap_or(0) as u64,
                content_type: resp.content_type().map(String::from),
            })),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(None),
            Err(err) => Err(PathError::object_store("head_object", uri(bucket, key), err)),
        }
    }

    /// Open an object's body for streaming
    pub async fn get_object_stream(&self, bucket: &str, key: &str) -> Result<ByteStream> {
        debug!("get_object {}", uri(bucket, key));
        match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(resp) => Ok(resp.body),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_no_such_key()) => {
                Err(PathError::NotFound {
                    path: uri(bucket, key),
                })
            }
            Err(err) => Err(PathError::object_store("get_object", uri(bucket, key), err)),
        }
    }

    /// Get an entire object's contents
    pub async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let body = self.get_object_stream(bucket, key).await?;
        let bytes = body
            .collect()
            .await
            .map_err(|e| PathError::object_store("get_object", uri(bucket, key), e))?
            .into_bytes();
        Ok(bytes)
    }

    /// Upload an object, replacing any existing one
    pub async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<()> {
        debug!("put_object {} ({} bytes)", uri(bucket, key), body.len());
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| PathError::object_store("put_object", uri(bucket, key), e))?;
        Ok(())
    }

    /// Delete an object. Deleting a missing key succeeds.
    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        debug!("delete_object {}", uri(bucket, key));
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| PathError::object_store("delete_object", uri(bucket, key), e))?;
        Ok(())
    }

    /// Server-side copy between two keys, possibly across buckets
    pub async fn copy_object(
        &self,
        from_bucket: &str,
        from_key: &str,
        to_bucket: &str,
        to_key: &str,
    ) -> Result<()> {
        debug!(
            "copy_object {} -> {}",
            uri(from_bucket, from_key),
            uri(to_bucket, to_key)
        );
        self.client
            .copy_object()
            .copy_source(copy_source(from_bucket, from_key))
            .bucket(to_bucket)
            .key(to_key)
            .send()
            .await
            .map_err(|e| PathError::object_store("copy_object", uri(from_bucket, from_key), e))?;
        Ok(())
    }
}

/// URL-encoded `bucket/key` as `CopyObject` expects it
fn copy_source(bucket: &str, key: &str) -> String {
    format!("{bucket}/{}", utf8_percent_encode(key, COPY_SOURCE))
}

/// `s3://bucket/key` for messages
pub fn uri(bucket: &str, key: &str) -> String {
    format!("s3://{bucket}/{key}")
}

/// Result of listing one page of objects in a bucket
#[derive(Debug, Clone, Default)]
pub struct ListObjectsResult {
    pub prefixes: Vec<String>,
    pub objects: Vec<ObjectInfo>,
    /// Token for the next page, `None` on the last one
    pub next_token: Option<String>,
}

/// Information about an S3 object
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    pub key: String,
}

/// Metadata about an S3 object
#[derive(Debug, Clone)]
pub struct ObjectMetadata {
    pub size: u64,
    pub content_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_source_escapes_key() {
        assert_eq!(copy_source("b", "dir/plain-file_1.txt"), "b/dir/plain-file_1.txt");
        assert_eq!(copy_source("b", "dir/a b+c.txt"), "b/dir/a%20b%2Bc.txt");
        assert_eq!(copy_source("b", "100%?#"), "b/100%25%3F%23");
        assert_eq!(copy_source("b", "ü"), "b/%C3%BC");
    }
}
