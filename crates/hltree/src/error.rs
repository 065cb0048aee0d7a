//! Error types for the node tree.

use hltree_format::datatype::TypeClass;
use hltree_format::FormatError;

use crate::format::FormatSpecifier;

/// Broad class of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The tree shape or a node name is wrong.
    Structural,
    /// A type or format could not be translated.
    Type,
    /// The container or the filesystem failed.
    Io,
    /// A buffer could not be allocated.
    Resource,
}

/// Errors produced by node lists, the reader, the fetcher and the writer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("a node named {0} already exists")]
    DuplicateNode(String),
    #[error("parent of {0} is missing or cannot hold it")]
    InvalidParent(String),
    #[error("malformed node name {0:?}")]
    MalformedName(String),
    #[error("rank {0} exceeds the maximum of 4")]
    RankTooLarge(usize),
    #[error("no node named {0}")]
    NotFound(String),
    #[error("{0} is neither a group nor a dataset")]
    NotGroupOrDataset(String),
    #[error("{0} has a null dataspace")]
    NullDataspace(String),
    #[error("{name} is {actual:?}, which cannot hold this value")]
    WrongKind { name: String, actual: crate::NodeKind },
    #[error("{0} has no datatype to write")]
    MissingType(String),
    #[error("node list has no filename")]
    NoFilename,
    #[error("invalid sidecar: {0}")]
    Sidecar(String),

    #[error("unrecognized format specifier {0:?}")]
    UnknownFormat(String),
    #[error("format {0} has no scalar type of its own")]
    NoScalarType(FormatSpecifier),
    #[error("no format specifier matches this {0} type")]
    UnrecognizedType(TypeClass),
    #[error("{0} types cannot be fixed to a native type")]
    UnsupportedClass(TypeClass),
    #[error("string type uses an unsupported character set")]
    UnsupportedCharset,
    #[error("compound member {name}: {reason}")]
    CompoundMember { name: String, reason: String },
    #[error("value holds {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("node {name} does not hold {requested} values")]
    ValueType { name: String, requested: FormatSpecifier },

    #[error(transparent)]
    Store(#[from] FormatError),
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to allocate {0} bytes")]
    Allocation(usize),
    #[error("{dims:?} elements of {element_size} bytes do not fit in memory")]
    TooLarge { dims: Vec<u64>, element_size: usize },
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::DuplicateNode(_)
            | Error::InvalidParent(_)
            | Error::MalformedName(_)
            | Error::RankTooLarge(_)
            | Error::NotFound(_)
            | Error::NotGroupOrDataset(_)
            | Error::NullDataspace(_)
            | Error::WrongKind { .. }
            | Error::MissingType(_)
            | Error::NoFilename
            | Error::Sidecar(_) => ErrorCategory::Structural,
            Error::UnknownFormat(_)
            | Error::NoScalarType(_)
            | Error::UnrecognizedType(_)
            | Error::UnsupportedClass(_)
            | Error::UnsupportedCharset
            | Error::CompoundMember { .. }
            | Error::SizeMismatch { .. }
            | Error::ValueType { .. } => ErrorCategory::Type,
            Error::Store(_) | Error::Io(_) => ErrorCategory::Io,
            Error::Allocation(_) | Error::TooLarge { .. } => ErrorCategory::Resource,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Bytes held by an array of `dims` elements of `element_size` bytes each.
/// Empty `dims` is a single element.
pub(crate) fn byte_len(dims: &[u64], element_size: usize) -> Result<usize> {
    dims.iter()
        .try_fold(1u64, |acc, &d| acc.checked_mul(d))
        .and_then(|count| usize::try_from(count).ok())
        .and_then(|count| count.checked_mul(element_size))
        .ok_or_else(|| Error::TooLarge {
            dims: dims.to_vec(),
            element_size,
        })
}

/// Copy `src` into a freshly reserved buffer, failing instead of aborting
/// when the allocation cannot be satisfied.
pub(crate) fn copy_bytes(src: &[u8]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(src.len())
        .map_err(|_| Error::Allocation(src.len()))?;
    buf.extend_from_slice(src);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories() {
        assert_eq!(
            Error::DuplicateNode("/a".into()).category(),
            ErrorCategory::Structural
        );
        assert_eq!(
            Error::UnsupportedClass(TypeClass::Enum).category(),
            ErrorCategory::Type
        );
        assert_eq!(
            Error::from(FormatError::ReadOnly).category(),
            ErrorCategory::Io
        );
        assert_eq!(Error::Allocation(8).category(), ErrorCategory::Resource);
    }

    #[test]
    fn byte_lengths_are_checked() {
        assert_eq!(byte_len(&[], 8).unwrap(), 8);
        assert_eq!(byte_len(&[2, 3], 4).unwrap(), 24);
        assert_eq!(byte_len(&[0, u64::MAX], 8).unwrap(), 0);
        let err = byte_len(&[1 << 32, 1 << 32, 1 << 32], 1).unwrap_err();
        assert!(matches!(err, Error::TooLarge { .. }));
        assert_eq!(err.category(), ErrorCategory::Resource);
        assert!(byte_len(&[u64::MAX], 2).is_err());
    }

    #[test]
    fn copy_bytes_copies() {
        assert_eq!(copy_bytes(b"abc").unwrap(), b"abc");
        assert!(copy_bytes(&[]).unwrap().is_empty());
    }
}
