//! Error types for the container format and store operations.

use thiserror::Error;

/// Errors raised while parsing, converting or accessing a container.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The container signature was not found at any valid offset.
    #[error("container signature not found at any valid offset")]
    SignatureNotFound,
    /// The container version is not supported.
    #[error("unsupported container version: {0}")]
    UnsupportedVersion(u8),
    /// Unexpected end of data.
    #[error("unexpected EOF: need {expected} bytes, have {available}")]
    UnexpectedEof {
        /// Number of bytes expected.
        expected: usize,
        /// Number of bytes actually available.
        available: usize,
    },
    /// Unknown datatype class tag.
    #[error("invalid datatype class: {0}")]
    InvalidDatatypeClass(u8),
    /// Unknown string padding tag.
    #[error("invalid string padding: {0}")]
    InvalidStringPadding(u8),
    /// Unknown reference type tag.
    #[error("invalid reference type: {0}")]
    InvalidReferenceType(u8),
    /// Unknown dataspace type tag.
    #[error("invalid dataspace type: {0}")]
    InvalidDataspaceType(u8),
    /// Unknown object record tag.
    #[error("invalid object kind tag: {0}")]
    InvalidObjectKind(u8),
    /// Unknown storage layout tag.
    #[error("invalid storage layout tag: {0}")]
    InvalidLayout(u8),
    /// A stored name is not valid UTF-8.
    #[error("stored name is not valid UTF-8")]
    InvalidName,
    /// The path is syntactically unusable.
    #[error("invalid path: '{0}'")]
    InvalidPath(String),
    /// Nothing is linked at the given path.
    #[error("object not found: {0}")]
    NotFound(String),
    /// The object at the given path is not a group.
    #[error("not a group: {0}")]
    NotAGroup(String),
    /// The object at the given path is not a dataset.
    #[error("not a dataset: {0}")]
    NotADataset(String),
    /// The object at the given path is not a named datatype.
    #[error("not a named datatype: {0}")]
    NotANamedType(String),
    /// A link with the same name already exists.
    #[error("link already exists: {0}")]
    AlreadyExists(String),
    /// The attribute does not exist on the object.
    #[error("attribute '{name}' not found on {object}")]
    AttributeNotFound {
        /// Path of the owning object.
        object: String,
        /// Attribute name.
        name: String,
    },
    /// The attribute already exists on the object.
    #[error("attribute '{name}' already exists on {object}")]
    AttributeExists {
        /// Path of the owning object.
        object: String,
        /// Attribute name.
        name: String,
    },
    /// A soft link points at nothing.
    #[error("dangling link {path} -> {target}")]
    DanglingLink {
        /// Path of the link itself.
        path: String,
        /// Path the link points at.
        target: String,
    },
    /// A write was attempted on a read-only container.
    #[error("container is open read-only")]
    ReadOnly,
    /// Payload length does not match datatype and dataspace.
    #[error("data size mismatch: expected {expected} bytes, got {actual}")]
    DataSizeMismatch {
        /// Bytes required.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },
    /// The byte size of a payload does not fit in memory.
    #[error("{dimensions:?} elements of {element_size} bytes overflow the address space")]
    SizeOverflow {
        /// Extent of each dimension.
        dimensions: Vec<u64>,
        /// Bytes per element.
        element_size: usize,
    },
    /// No conversion path exists between the two datatypes.
    #[error("cannot convert {from} to {to}")]
    UnsupportedConversion {
        /// Source type class.
        from: String,
        /// Destination type class.
        to: String,
    },
    /// A compound member does not fit its parent type.
    #[error("invalid compound member '{name}': {reason}")]
    InvalidCompoundMember {
        /// Member name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },
    /// The requested filter is not available in this store.
    #[error("unsupported filter: {0}")]
    UnsupportedFilter(String),
    /// Deflate encoding or decoding failed.
    #[error("compression error: {0}")]
    Compression(String),
    /// User block sizes must be 0 or a power of two of at least 512.
    #[error("invalid user block size: {0}")]
    InvalidUserBlock(u64),
    /// A reference does not have the stored reference size.
    #[error("invalid object reference of {0} bytes")]
    InvalidReference(usize),
    /// I/O error from the filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
