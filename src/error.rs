//! Error type shared by every storage backend.

use std::error::Error as StdError;

/// Failure raised by a storage capability.
///
/// Missing entities are reported as `false` by the query operations and are a
/// no-op for `rm`; they only become [`PathError::NotFound`] when content is
/// requested from something that is not there.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// Content was requested from a path with nothing behind it.
    #[error("not found: {path}")]
    NotFound {
        /// The rendered path.
        path: String,
    },

    /// The backend has no notion of the requested concept.
    #[error("{backend} does not support {operation}")]
    Unsupported {
        /// Backend name, e.g. `"s3"`.
        backend: &'static str,
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// Another entity already occupies the path in an incompatible way.
    #[error("{operation}: conflicting entity at {path}: {reason}")]
    Conflict {
        /// The rendered path.
        path: String,
        /// The operation that was blocked.
        operation: &'static str,
        /// What is in the way.
        reason: String,
    },

    /// A directory or prefix has children and `recursive` was not requested.
    #[error("not empty: {path}")]
    NotEmpty {
        /// The rendered path.
        path: String,
    },

    /// An operation needed two paths on the same backend.
    #[error("{operation}: {from} and {to} live on different backends")]
    CrossBackend {
        /// The operation that was attempted.
        operation: &'static str,
        /// Source path.
        from: String,
        /// Destination path.
        to: String,
    },

    /// No backend is configured for the anchor of a raw path.
    #[error("no backend configured for {anchor:?} ({path})")]
    NoBackend {
        /// The anchor that selected the backend.
        anchor: String,
        /// The raw path.
        path: String,
    },

    /// Local filesystem failure.
    #[error("{operation} {path}: {source}")]
    Io {
        /// The rendered path.
        path: String,
        /// The operation that failed.
        operation: &'static str,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Object-store transport or service failure.
    #[error("{operation} {path}: {source}")]
    ObjectStore {
        /// The rendered path.
        path: String,
        /// The operation that failed.
        operation: &'static str,
        /// Underlying SDK error.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl PathError {
    pub(crate) fn io(operation: &'static str, path: impl Into<String>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            return PathError::NotFound { path: path.into() };
        }
        PathError::Io {
            path: path.into(),
            operation,
            source,
        }
    }

    pub(crate) fn object_store<E>(operation: &'static str, path: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        PathError::ObjectStore {
            path: path.into(),
            operation,
            source: Box::new(source),
        }
    }

    pub(crate) fn unsupported(backend: &'static str, operation: &'static str) -> Self {
        PathError::Unsupported { backend, operation }
    }

    /// True for [`PathError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, PathError::NotFound { .. })
    }

    /// True for [`PathError::Unsupported`].
    pub fn is_unsupported(&self) -> bool {
        matches!(self, PathError::Unsupported { .. })
    }

    /// True when something already at the path blocked the operation:
    /// [`PathError::Conflict`] and [`PathError::NotEmpty`].
    pub fn is_conflict(&self) -> bool {
        matches!(self, PathError::Conflict { .. } | PathError::NotEmpty { .. })
    }
}

/// Result alias for storage operations.
pub type Result<T> = std::result::Result<T, PathError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_not_found_becomes_not_found() {
        let err = PathError::io("read", "a/b", io::Error::from(io::ErrorKind::NotFound));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "not found: a/b");
    }

    #[test]
    fn test_io_keeps_other_kinds() {
        let err = PathError::io(
            "write",
            "/etc/x",
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(err, PathError::Io { operation: "write", .. }));
        assert!(err.to_string().starts_with("write /etc/x"));
    }

    #[test]
    fn test_predicates() {
        assert!(PathError::unsupported("s3", "is_dir").is_unsupported());
        assert!(
            PathError::NotEmpty {
                path: "d".to_string()
            }
            .is_conflict()
        );
        assert_eq!(
            PathError::unsupported("s3", "mkdir").to_string(),
            "s3 does not support mkdir"
        );
    }
}
