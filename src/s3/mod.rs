pub mod client;
pub mod path;
mod sink;

pub use client::S3Client;
pub use path::{S3Bucket, S3Path};
