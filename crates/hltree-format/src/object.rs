//! In-memory object graph of an open container.

use std::collections::BTreeMap;

use crate::dataspace::Dataspace;
use crate::datatype::Datatype;

/// Object number, unique within one container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

/// Two-word identity of a stored object: the container's file number and
/// the object number inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ObjectIdentity {
    pub file_number: u64,
    pub object_number: u64,
}

/// Kind of a stored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Group,
    Dataset,
    NamedType,
}

/// Where a group entry points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// A hard link to an object. An object may have several.
    Hard(ObjectId),
    /// A symbolic link holding an absolute path.
    Soft(String),
}

/// Storage layout of a dataset payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Stored as-is.
    Contiguous,
    /// Stored zlib-compressed at the given level.
    Deflate { level: u32 },
}

/// An attribute attached to a group or dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub datatype: Datatype,
    pub dataspace: Dataspace,
    /// Payload in the attribute's own datatype.
    pub data: Vec<u8>,
    /// Committed datatype this attribute was written with, if any.
    pub named_type: Option<ObjectId>,
}

/// Dataset metadata and decoded payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetBody {
    pub datatype: Datatype,
    pub dataspace: Dataspace,
    pub layout: Layout,
    /// Payload in the dataset's own datatype, uncompressed.
    pub data: Vec<u8>,
    /// Committed datatype this dataset was written with, if any.
    pub named_type: Option<ObjectId>,
}

/// Kind-specific part of an object.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectBody {
    Group { links: BTreeMap<String, LinkTarget> },
    Dataset(DatasetBody),
    NamedType { datatype: Datatype },
}

/// A stored object with its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub body: ObjectBody,
    /// Attributes in creation order.
    pub attributes: Vec<Attribute>,
}

impl Object {
    /// An empty group.
    pub fn group() -> Self {
        Object {
            body: ObjectBody::Group {
                links: BTreeMap::new(),
            },
            attributes: Vec::new(),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self.body {
            ObjectBody::Group { .. } => ObjectKind::Group,
            ObjectBody::Dataset(_) => ObjectKind::Dataset,
            ObjectBody::NamedType { .. } => ObjectKind::NamedType,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Group links, or `None` for non-groups.
    pub fn links(&self) -> Option<&BTreeMap<String, LinkTarget>> {
        match &self.body {
            ObjectBody::Group { links } => Some(links),
            _ => None,
        }
    }
}
