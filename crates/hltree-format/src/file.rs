//! The container file API: open, navigate, read, write, close.
//!
//! A [`File`] holds the whole object graph in memory. Opening parses the
//! file once; writes mutate the graph and are persisted by [`File::flush`]
//! or [`File::close`]. Dropping a writable file without flushing discards
//! its pending changes.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::codec::{self, Container, Header};
use crate::convert::convert;
use crate::dataspace::Dataspace;
use crate::datatype::Datatype;
use crate::diagnostics::Diagnostics;
use crate::error::FormatError;
use crate::io::FileData;
use crate::object::{
    Attribute, DatasetBody, Layout, LinkTarget, Object, ObjectBody, ObjectId, ObjectIdentity,
    ObjectKind,
};
use crate::reference::ObjectReference;

const MAX_LINK_DEPTH: usize = 16;

/// How a container is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

/// Properties applied when a container is created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreationProperties {
    /// Bytes reserved before the signature: 0 or a power of two >= 512.
    pub userblock: u64,
}

impl CreationProperties {
    fn validate(&self) -> Result<(), FormatError> {
        let ub = self.userblock;
        if ub == 0 || (ub >= 512 && ub.is_power_of_two()) {
            Ok(())
        } else {
            Err(FormatError::InvalidUserBlock(ub))
        }
    }
}

/// What a group entry leads to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// A hard link to an object.
    Object { kind: ObjectKind, id: ObjectId },
    /// A soft link; not an object of its own.
    SoftLink(String),
}

/// One entry produced by [`File::children`] or [`File::walk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub kind: EntryKind,
}

/// Owned handle to a committed datatype.
///
/// The handle does not borrow the file it came from; it is closed when
/// dropped.
#[derive(Debug, PartialEq)]
pub struct TypeHandle {
    path: String,
    identity: ObjectIdentity,
    datatype: Datatype,
}

impl TypeHandle {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn identity(&self) -> ObjectIdentity {
        self.identity
    }

    pub fn datatype(&self) -> &Datatype {
        &self.datatype
    }
}

impl Drop for TypeHandle {
    fn drop(&mut self) {
        tracing::trace!(path = %self.path, "closing named datatype handle");
    }
}

/// An open container.
pub struct File {
    path: PathBuf,
    access: Access,
    container: Container,
    dirty: bool,
    diagnostics: Diagnostics,
}

impl std::fmt::Debug for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File")
            .field("path", &self.path)
            .field("access", &self.access)
            .field("objects", &self.container.objects.len())
            .field("dirty", &self.dirty)
            .finish()
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty() && *s != ".")
}

fn fresh_file_number() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    nanos ^ (u64::from(std::process::id()) << 32)
}

impl File {
    /// Open an existing container.
    pub fn open<P: AsRef<Path>>(path: P, access: Access) -> Result<Self, FormatError> {
        Self::open_with(path, access, Diagnostics::new())
    }

    /// Open an existing container, reporting failures through `diagnostics`.
    pub fn open_with<P: AsRef<Path>>(
        path: P,
        access: Access,
        diagnostics: Diagnostics,
    ) -> Result<Self, FormatError> {
        let path = path.as_ref();
        let loaded = FileData::load(path, access == Access::ReadOnly)
            .map_err(FormatError::from)
            .and_then(|data| codec::decode(data.as_bytes()));
        match loaded {
            Ok(container) => {
                tracing::debug!(path = %path.display(), ?access, objects = container.objects.len(), "opened container");
                Ok(File {
                    path: path.to_path_buf(),
                    access,
                    container,
                    dirty: false,
                    diagnostics,
                })
            }
            Err(e) => {
                diagnostics.report("open", &e);
                Err(e)
            }
        }
    }

    /// Create a new container, truncating any existing file.
    pub fn create<P: AsRef<Path>>(
        path: P,
        properties: &CreationProperties,
    ) -> Result<Self, FormatError> {
        Self::create_with(path, properties, Diagnostics::new())
    }

    /// Create a new container, reporting failures through `diagnostics`.
    pub fn create_with<P: AsRef<Path>>(
        path: P,
        properties: &CreationProperties,
        diagnostics: Diagnostics,
    ) -> Result<Self, FormatError> {
        let root = ObjectId(1);
        let mut objects = BTreeMap::new();
        objects.insert(root, Object::group());
        let mut file = File {
            path: path.as_ref().to_path_buf(),
            access: Access::ReadWrite,
            container: Container {
                header: Header {
                    file_number: fresh_file_number(),
                    root,
                    next_id: 2,
                    userblock: properties.userblock,
                },
                objects,
            },
            dirty: true,
            diagnostics,
        };
        let created = properties.validate().and_then(|_| file.flush());
        file.reported("create", created)?;
        tracing::debug!(path = %file.path.display(), "created container");
        Ok(file)
    }

    /// True when `path` is a readable container file.
    pub fn is_container<P: AsRef<Path>>(path: P) -> bool {
        std::fs::read(path)
            .map(|data| codec::find_signature(&data).is_ok())
            .unwrap_or(false)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Persist pending changes.
    pub fn flush(&mut self) -> Result<(), FormatError> {
        if !self.dirty {
            return Ok(());
        }
        let written = codec::encode(&self.container)
            .and_then(|bytes| std::fs::write(&self.path, bytes).map_err(FormatError::from));
        self.reported("flush", written)?;
        self.dirty = false;
        Ok(())
    }

    /// Flush and close.
    pub fn close(mut self) -> Result<(), FormatError> {
        self.flush()
    }

    fn reported<T>(&self, operation: &str, result: Result<T, FormatError>) -> Result<T, FormatError> {
        if let Err(e) = &result {
            self.diagnostics.report(operation, e);
        }
        result
    }

    // ---------------------------------------------------------------------
    // Navigation
    // ---------------------------------------------------------------------

    fn object(&self, id: ObjectId) -> Result<&Object, FormatError> {
        self.container
            .objects
            .get(&id)
            .ok_or_else(|| FormatError::NotFound(format!("object #{}", id.0)))
    }

    fn object_mut(&mut self, id: ObjectId) -> Result<&mut Object, FormatError> {
        self.container
            .objects
            .get_mut(&id)
            .ok_or_else(|| FormatError::NotFound(format!("object #{}", id.0)))
    }

    fn resolve(&self, path: &str) -> Result<ObjectId, FormatError> {
        self.resolve_depth(path, 0)
    }

    fn resolve_depth(&self, path: &str, depth: usize) -> Result<ObjectId, FormatError> {
        let mut current = self.container.header.root;
        let mut walked = String::new();
        for segment in split_path(path) {
            walked.push('/');
            walked.push_str(segment);
            let links = self
                .object(current)?
                .links()
                .ok_or_else(|| FormatError::NotFound(path.to_string()))?;
            current = match links.get(segment) {
                Some(LinkTarget::Hard(id)) => *id,
                Some(LinkTarget::Soft(target)) => {
                    if depth >= MAX_LINK_DEPTH {
                        return Err(FormatError::DanglingLink {
                            path: walked,
                            target: target.clone(),
                        });
                    }
                    self.resolve_depth(target, depth + 1).map_err(|_| {
                        FormatError::DanglingLink {
                            path: walked.clone(),
                            target: target.clone(),
                        }
                    })?
                }
                None => return Err(FormatError::NotFound(path.to_string())),
            };
        }
        Ok(current)
    }

    /// Kind of the object at `path`.
    pub fn object_kind(&self, path: &str) -> Result<ObjectKind, FormatError> {
        let kind = self.resolve(path).and_then(|id| Ok(self.object(id)?.kind()));
        self.reported("object_kind", kind)
    }

    /// Identity of the object at `path`.
    pub fn identity(&self, path: &str) -> Result<ObjectIdentity, FormatError> {
        let id = self.resolve(path);
        self.reported("identity", id).map(|id| self.identity_of(id))
    }

    /// Identity of an object known by id.
    pub fn identity_of(&self, id: ObjectId) -> ObjectIdentity {
        ObjectIdentity {
            file_number: self.container.header.file_number,
            object_number: id.0,
        }
    }

    /// Verify that `path` is a group.
    pub fn open_group(&self, path: &str) -> Result<ObjectId, FormatError> {
        let group = self.group_id(path);
        self.reported("open_group", group)
    }

    fn group_id(&self, path: &str) -> Result<ObjectId, FormatError> {
        let id = self.resolve(path)?;
        match self.object(id)?.kind() {
            ObjectKind::Group => Ok(id),
            _ => Err(FormatError::NotAGroup(path.to_string())),
        }
    }

    /// Entries of the group at `path`, in name order.
    pub fn children(&self, path: &str) -> Result<Vec<Entry>, FormatError> {
        let children = self.group_id(path).and_then(|id| self.entries_of(id));
        self.reported("children", children)
    }

    fn entries_of(&self, group: ObjectId) -> Result<Vec<Entry>, FormatError> {
        let Some(links) = self.object(group)?.links() else {
            return Ok(Vec::new());
        };
        links
            .iter()
            .map(|(name, target)| {
                let kind = match target {
                    LinkTarget::Hard(id) => EntryKind::Object {
                        kind: self.object(*id)?.kind(),
                        id: *id,
                    },
                    LinkTarget::Soft(t) => EntryKind::SoftLink(t.clone()),
                };
                Ok(Entry {
                    name: name.clone(),
                    kind,
                })
            })
            .collect()
    }

    /// Depth-first visit of everything below `from`, in name order.
    ///
    /// The first entry is `from` itself, named `"."`; the others are named
    /// relative to `from`. Every object is listed once, under the first path
    /// that reaches it. Soft links are listed but not followed.
    pub fn walk(&self, from: &str) -> Result<Vec<Entry>, FormatError> {
        let walked = self.resolve(from).and_then(|start| {
            let mut out = vec![Entry {
                name: ".".to_string(),
                kind: EntryKind::Object {
                    kind: self.object(start)?.kind(),
                    id: start,
                },
            }];
            let mut visited = HashSet::from([start]);
            self.walk_group(start, "", &mut visited, &mut out)?;
            Ok(out)
        });
        self.reported("walk", walked)
    }

    fn walk_group(
        &self,
        group: ObjectId,
        prefix: &str,
        visited: &mut HashSet<ObjectId>,
        out: &mut Vec<Entry>,
    ) -> Result<(), FormatError> {
        for entry in self.entries_of(group)? {
            let name = if prefix.is_empty() {
                entry.name
            } else {
                format!("{prefix}/{}", entry.name)
            };
            match entry.kind {
                EntryKind::Object { kind, id } => {
                    if !visited.insert(id) {
                        continue;
                    }
                    out.push(Entry {
                        name: name.clone(),
                        kind: EntryKind::Object { kind, id },
                    });
                    if kind == ObjectKind::Group {
                        self.walk_group(id, &name, visited, out)?;
                    }
                }
                EntryKind::SoftLink(target) => out.push(Entry {
                    name,
                    kind: EntryKind::SoftLink(target),
                }),
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Reading
    // ---------------------------------------------------------------------

    /// Attribute names of the object at `path`, in name order.
    pub fn attribute_names(&self, path: &str) -> Result<Vec<String>, FormatError> {
        let names = self.resolve(path).and_then(|id| {
            let mut names: Vec<String> = self
                .object(id)?
                .attributes
                .iter()
                .map(|a| a.name.clone())
                .collect();
            names.sort();
            Ok(names)
        });
        self.reported("attribute_names", names)
    }

    /// The attribute `name` of the object at `path`, as stored.
    pub fn attribute(&self, path: &str, name: &str) -> Result<&Attribute, FormatError> {
        let attr = self.resolve(path).and_then(|id| {
            self.object(id)?
                .attribute(name)
                .ok_or_else(|| FormatError::AttributeNotFound {
                    object: path.to_string(),
                    name: name.to_string(),
                })
        });
        self.reported("attribute", attr)
    }

    /// Read an attribute payload converted to `mem_type`.
    pub fn read_attribute(
        &self,
        path: &str,
        name: &str,
        mem_type: &Datatype,
    ) -> Result<Vec<u8>, FormatError> {
        let attr = self.attribute(path, name)?;
        let data = attr
            .dataspace
            .element_count()
            .and_then(|count| convert(&attr.data, &attr.datatype, mem_type, count));
        self.reported("read_attribute", data)
    }

    /// The dataset at `path`, as stored.
    pub fn dataset(&self, path: &str) -> Result<&DatasetBody, FormatError> {
        let ds = self.resolve(path).and_then(|id| match &self.object(id)?.body {
            ObjectBody::Dataset(ds) => Ok(ds),
            _ => Err(FormatError::NotADataset(path.to_string())),
        });
        self.reported("dataset", ds)
    }

    /// Read a whole dataset converted to `mem_type`.
    pub fn read_dataset(&self, path: &str, mem_type: &Datatype) -> Result<Vec<u8>, FormatError> {
        let ds = self.dataset(path)?;
        let data = ds
            .dataspace
            .element_count()
            .and_then(|count| convert(&ds.data, &ds.datatype, mem_type, count));
        self.reported("read_dataset", data)
    }

    /// Open the committed datatype at `path`.
    pub fn open_named_type(&self, path: &str) -> Result<TypeHandle, FormatError> {
        let handle = self.resolve(path).and_then(|id| match &self.object(id)?.body {
            ObjectBody::NamedType { datatype } => Ok(TypeHandle {
                path: path.to_string(),
                identity: self.identity_of(id),
                datatype: datatype.clone(),
            }),
            _ => Err(FormatError::NotANamedType(path.to_string())),
        });
        self.reported("open_named_type", handle)
    }

    /// Create a reference to the object at `path`.
    pub fn create_reference(&self, path: &str) -> Result<ObjectReference, FormatError> {
        let id = self.resolve(path);
        self.reported("create_reference", id)
            .map(ObjectReference::to_object)
    }

    // ---------------------------------------------------------------------
    // Writing
    // ---------------------------------------------------------------------

    fn ensure_writable(&self) -> Result<(), FormatError> {
        match self.access {
            Access::ReadWrite => Ok(()),
            Access::ReadOnly => Err(FormatError::ReadOnly),
        }
    }

    /// Add a link named by the last segment of `path` to its parent group.
    fn insert_link(&mut self, path: &str, target: LinkTarget) -> Result<(), FormatError> {
        self.ensure_writable()?;
        let (parent, name) = match path.trim_end_matches('/').rsplit_once('/') {
            Some((parent, name)) if !name.is_empty() && name != "." => (parent, name),
            _ => return Err(FormatError::InvalidPath(path.to_string())),
        };
        let parent_id = self.resolve(parent)?;
        let parent_obj = self.object_mut(parent_id)?;
        let ObjectBody::Group { links } = &mut parent_obj.body else {
            return Err(FormatError::NotAGroup(parent.to_string()));
        };
        if links.contains_key(name) {
            return Err(FormatError::AlreadyExists(path.to_string()));
        }
        links.insert(name.to_string(), target);
        self.dirty = true;
        Ok(())
    }

    fn insert_object(&mut self, path: &str, object: Object) -> Result<ObjectId, FormatError> {
        let id = ObjectId(self.container.header.next_id);
        self.insert_link(path, LinkTarget::Hard(id))?;
        self.container.header.next_id += 1;
        self.container.objects.insert(id, object);
        Ok(id)
    }

    /// Create an empty group.
    pub fn create_group(&mut self, path: &str) -> Result<(), FormatError> {
        let created = self.insert_object(path, Object::group()).map(|_| ());
        self.reported("create_group", created)
    }

    fn check_payload(
        datatype: &Datatype,
        dataspace: &Dataspace,
        data: &[u8],
    ) -> Result<(), FormatError> {
        let expected = dataspace.data_size(datatype.type_size())?;
        if data.len() != expected {
            return Err(FormatError::DataSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(())
    }

    fn check_named_type(&self, named_type: Option<ObjectId>) -> Result<(), FormatError> {
        match named_type {
            Some(id) if self.object(id)?.kind() != ObjectKind::NamedType => {
                Err(FormatError::NotANamedType(format!("object #{}", id.0)))
            }
            _ => Ok(()),
        }
    }

    /// Create a dataset.
    pub fn create_dataset(&mut self, path: &str, body: DatasetBody) -> Result<(), FormatError> {
        let created = Self::check_payload(&body.datatype, &body.dataspace, &body.data)
            .and_then(|_| self.check_named_type(body.named_type))
            .and_then(|_| match body.layout {
                Layout::Deflate { level } if level > 9 => {
                    Err(FormatError::Compression(format!("invalid level {level}")))
                }
                _ => Ok(()),
            })
            .and_then(|_| {
                self.insert_object(
                    path,
                    Object {
                        body: ObjectBody::Dataset(body),
                        attributes: Vec::new(),
                    },
                )
            })
            .map(|_| ());
        self.reported("create_dataset", created)
    }

    /// Replace the type, shape and payload of an existing dataset.
    pub fn replace_dataset(&mut self, path: &str, body: DatasetBody) -> Result<(), FormatError> {
        let replaced = self
            .ensure_writable()
            .and_then(|_| Self::check_payload(&body.datatype, &body.dataspace, &body.data))
            .and_then(|_| self.check_named_type(body.named_type))
            .and_then(|_| self.resolve(path))
            .and_then(|id| {
                let obj = self.object_mut(id)?;
                match &mut obj.body {
                    ObjectBody::Dataset(ds) => {
                        *ds = body;
                        Ok(())
                    }
                    _ => Err(FormatError::NotADataset(path.to_string())),
                }
            });
        if replaced.is_ok() {
            self.dirty = true;
        }
        self.reported("replace_dataset", replaced)
    }

    /// Attach an attribute to the object at `path`.
    ///
    /// With `replace` set an existing attribute of the same name is
    /// overwritten; otherwise it is an error.
    pub fn write_attribute(
        &mut self,
        path: &str,
        attribute: Attribute,
        replace: bool,
    ) -> Result<(), FormatError> {
        let written = self
            .ensure_writable()
            .and_then(|_| {
                Self::check_payload(&attribute.datatype, &attribute.dataspace, &attribute.data)
            })
            .and_then(|_| self.check_named_type(attribute.named_type))
            .and_then(|_| self.resolve(path))
            .and_then(|id| {
                let obj = self.object_mut(id)?;
                if obj.kind() == ObjectKind::NamedType {
                    return Err(FormatError::NotADataset(path.to_string()));
                }
                match obj.attributes.iter_mut().find(|a| a.name == attribute.name) {
                    Some(existing) if replace => *existing = attribute,
                    Some(_) => {
                        return Err(FormatError::AttributeExists {
                            object: path.to_string(),
                            name: attribute.name,
                        })
                    }
                    None => obj.attributes.push(attribute),
                }
                Ok(())
            });
        if written.is_ok() {
            self.dirty = true;
        }
        self.reported("write_attribute", written)
    }

    /// Commit `datatype` as a named type at `path`.
    pub fn commit_type(
        &mut self,
        path: &str,
        datatype: Datatype,
    ) -> Result<ObjectIdentity, FormatError> {
        let committed = self.insert_object(
            path,
            Object {
                body: ObjectBody::NamedType { datatype },
                attributes: Vec::new(),
            },
        );
        self.reported("commit_type", committed)
            .map(|id| self.identity_of(id))
    }

    /// Object id of a committed datatype from its identity, if it belongs to
    /// this container.
    pub fn named_type_id(&self, identity: ObjectIdentity) -> Option<ObjectId> {
        let id = ObjectId(identity.object_number);
        (identity.file_number == self.container.header.file_number
            && matches!(
                self.container.objects.get(&id).map(Object::kind),
                Some(ObjectKind::NamedType)
            ))
        .then_some(id)
    }

    /// Add a second name for the object at `target`.
    pub fn link_hard(&mut self, path: &str, target: &str) -> Result<(), FormatError> {
        let linked = self
            .resolve(target)
            .and_then(|id| self.insert_link(path, LinkTarget::Hard(id)));
        self.reported("link_hard", linked)
    }

    /// Add a symbolic link to the absolute path `target`.
    pub fn link_soft(&mut self, path: &str, target: &str) -> Result<(), FormatError> {
        let linked = self.insert_link(path, LinkTarget::Soft(target.to_string()));
        self.reported("link_soft", linked)
    }
}

impl Drop for File {
    fn drop(&mut self) {
        if self.dirty {
            tracing::debug!(path = %self.path.display(), "discarding unflushed container changes");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::DatatypeByteOrder;
    use crate::native::NativeType;

    fn int_attr(name: &str, v: i32) -> Attribute {
        Attribute {
            name: name.into(),
            datatype: Datatype::integer(4, true, DatatypeByteOrder::BigEndian),
            dataspace: Dataspace::scalar(),
            data: v.to_be_bytes().to_vec(),
            named_type: None,
        }
    }

    #[test]
    fn create_write_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.hlt");
        let mut f = File::create(&path, &CreationProperties::default()).unwrap();
        f.create_group("/g").unwrap();
        f.write_attribute("/g", int_attr("n", -7), false).unwrap();
        f.close().unwrap();

        let f = File::open(&path, Access::ReadOnly).unwrap();
        assert_eq!(f.object_kind("/g").unwrap(), ObjectKind::Group);
        let native = NativeType::Int.datatype();
        let bytes = f.read_attribute("/g", "n", &native).unwrap();
        assert_eq!(i32::from_ne_bytes(bytes.try_into().unwrap()), -7);
    }

    #[test]
    fn read_only_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ro.hlt");
        File::create(&path, &CreationProperties::default())
            .unwrap()
            .close()
            .unwrap();
        let mut f = File::open(&path, Access::ReadOnly).unwrap();
        f.diagnostics().set_enabled(false);
        assert!(matches!(f.create_group("/g"), Err(FormatError::ReadOnly)));
    }

    #[test]
    fn walk_lists_each_object_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = File::create(dir.path().join("w.hlt"), &CreationProperties::default()).unwrap();
        f.create_group("/a").unwrap();
        f.create_group("/b").unwrap();
        f.create_group("/a/x").unwrap();
        f.link_hard("/b/again", "/a/x").unwrap();
        f.link_soft("/b/soft", "/a").unwrap();

        let names: Vec<String> = f.walk("/").unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec![".", "a", "a/x", "b", "b/soft"]);

        let children = f.children("/b").unwrap();
        assert_eq!(children.len(), 2);
        assert!(matches!(children[1].kind, EntryKind::SoftLink(ref t) if t == "/a"));
    }

    #[test]
    fn references_ignore_the_path_used() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = File::create(dir.path().join("r.hlt"), &CreationProperties::default()).unwrap();
        f.create_group("/a").unwrap();
        f.link_hard("/alias", "/a").unwrap();
        assert_eq!(
            f.create_reference("/a").unwrap(),
            f.create_reference("/alias").unwrap()
        );
        assert_ne!(
            f.create_reference("/a").unwrap(),
            f.create_reference("/").unwrap()
        );
    }

    #[test]
    fn soft_links_resolve_for_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = File::create(dir.path().join("s.hlt"), &CreationProperties::default()).unwrap();
        f.create_group("/real").unwrap();
        f.link_soft("/link", "/real").unwrap();
        f.link_soft("/dangling", "/nowhere").unwrap();
        assert_eq!(f.object_kind("/link").unwrap(), ObjectKind::Group);
        f.diagnostics().set_enabled(false);
        assert!(matches!(
            f.object_kind("/dangling/x"),
            Err(FormatError::DanglingLink { .. })
        ));
    }

    #[test]
    fn dataset_payload_size_is_checked() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = File::create(dir.path().join("d.hlt"), &CreationProperties::default()).unwrap();
        let body = DatasetBody {
            datatype: Datatype::float64(DatatypeByteOrder::LittleEndian),
            dataspace: Dataspace::simple(&[3]),
            layout: Layout::Contiguous,
            data: vec![0u8; 16],
            named_type: None,
        };
        f.diagnostics().set_enabled(false);
        assert!(matches!(
            f.create_dataset("/d", body),
            Err(FormatError::DataSizeMismatch {
                expected: 24,
                actual: 16
            })
        ));
    }

    #[test]
    fn duplicate_names_and_missing_parents() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = File::create(dir.path().join("n.hlt"), &CreationProperties::default()).unwrap();
        f.diagnostics().set_enabled(false);
        f.create_group("/g").unwrap();
        assert!(matches!(
            f.create_group("/g"),
            Err(FormatError::AlreadyExists(_))
        ));
        assert!(matches!(
            f.create_group("/missing/g"),
            Err(FormatError::NotFound(_))
        ));
        assert!(matches!(f.create_group("/"), Err(FormatError::InvalidPath(_))));
    }

    #[test]
    fn named_type_handle() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = File::create(dir.path().join("t.hlt"), &CreationProperties::default()).unwrap();
        let identity = f.commit_type("/t", NativeType::Double.datatype()).unwrap();
        let handle = f.open_named_type("/t").unwrap();
        assert_eq!(handle.identity(), identity);
        assert_eq!(handle.datatype(), &NativeType::Double.datatype());
        assert!(f.named_type_id(identity).is_some());
        f.diagnostics().set_enabled(false);
        assert!(matches!(
            f.open_named_type("/"),
            Err(FormatError::NotANamedType(_))
        ));
    }

    #[test]
    fn user_block_must_be_power_of_two() {
        let dir = tempfile::tempdir().unwrap();
        let props = CreationProperties { userblock: 100 };
        let diag = Diagnostics::new();
        diag.set_enabled(false);
        assert!(matches!(
            File::create_with(dir.path().join("u.hlt"), &props, diag),
            Err(FormatError::InvalidUserBlock(100))
        ));
    }
}
