use std::sync::Arc;

use async_trait::async_trait;
use bytes::BytesMut;

use super::S3Client;
use crate::error::Result;
use crate::storage::WriteSink;

/// Buffers writes in memory and uploads them as one object on close.
pub(crate) struct S3Sink {
    pub(crate) client: Arc<S3Client>,
    pub(crate) bucket: String,
    pub(crate) key: String,
    pub(crate) buffer: BytesMut,
}

#[async_trait]
impl WriteSink for S3Sink {
    async fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.buffer.extend_from_slice(buf);
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let S3Sink {
            client,
            bucket,
            key,
            buffer,
        } = *self;
        client.put_object(&bucket, &key, buffer.freeze()).await
    }
}
