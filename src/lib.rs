//! One path type for local files and S3 objects.
//!
//! A raw location such as `a/b/c`, `/abs/path` or `s3://bucket/key` is parsed
//! into a [`PathState`]. Backend path values ([`LocalPath`], [`S3Path`], or
//! [`AnyPath`] to pick one by anchor) wrap that state together with their
//! backend binding. Edits through [`PurePath`] never mutate a value; they
//! return a new one bound to the same backend. I/O goes through the async
//! [`StoragePath`] contract.
//!
//! ```no_run
//! use pathy::{LocalPath, PurePath, StoragePath};
//!
//! # async fn demo() -> pathy::Result<()> {
//! let dir = LocalPath::new("out/reports");
//! let report = dir.join(["2024", "summary"]).with_ext("csv");
//! report.write(b"total,3\n").await?;
//! assert_eq!(report.name(), "summary.csv");
//! # Ok(())
//! # }
//! ```

pub mod any;
pub mod error;
pub mod local;
pub mod path;
pub mod providers;
pub mod s3;
pub mod storage;

pub use any::{AnyPath, Backends};
pub use error::{PathError, Result};
pub use local::LocalPath;
pub use path::{PathState, Pattern, PurePath};
pub use s3::{S3Client, S3Path};
pub use storage::{ByteReader, MkdirOptions, PathStream, RmOptions, StoragePath, WriteSink};
