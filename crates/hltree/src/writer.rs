//! Writing node lists to containers.

use std::path::Path;

use hltree_format::dataspace::Dataspace;
use hltree_format::datatype::Datatype;
use hltree_format::{
    Access, Attribute, CreationProperties, DatasetBody, File, FormatError, Layout, ObjectId,
};

use crate::config::Config;
use crate::error::{copy_bytes, Error, Result};
use crate::node::{Compression, DataShape, Mark, Node, NodeKind};
use crate::nodelist::NodeList;
use crate::path;
use crate::probe;

/// Create the list's file and write every node, in order.
pub fn write_nodelist(
    list: &mut NodeList,
    properties: &CreationProperties,
    compression: &Compression,
) -> Result<()> {
    let config = Config {
        creation: properties.clone(),
        compression: *compression,
        ..Config::default()
    };
    Writer::new(config).write(list)
}

/// Write the Created and Changed nodes of `list` into its existing file.
pub fn update_nodelist(list: &mut NodeList, compression: &Compression) -> Result<()> {
    Writer::new(Config::default().with_compression(*compression)).update(list)
}

/// Writes node lists with one configuration.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    config: Config,
}

/// Named types committed so far in a session, by object id.
type Committed = Vec<(ObjectId, Datatype)>;

impl Writer {
    pub fn new(config: Config) -> Self {
        Writer { config }
    }

    /// Create the list's file, truncating it, and write every node.
    ///
    /// Named type nodes must come before the values that use their type.
    /// On success every node is marked [`Mark::Original`].
    pub fn write(&self, list: &mut NodeList) -> Result<()> {
        let filename = list.require_filename()?.to_path_buf();
        tracing::debug!(file = %filename.display(), nodes = list.len(), "writing node list");
        let mut file = File::create_with(
            &filename,
            &self.config.creation,
            self.config.diagnostics(),
        )?;
        let mut committed = Committed::new();
        for node in list.iter() {
            self.create_node(&mut file, node, &mut committed)?;
        }
        file.close()?;
        list.mark_all(Mark::Original);
        Ok(())
    }

    /// Open the list's file read-write and write what changed.
    ///
    /// Created nodes are created; Changed datasets have their payload
    /// replaced and Changed attributes are overwritten. Written nodes are
    /// marked [`Mark::Original`].
    pub fn update(&self, list: &mut NodeList) -> Result<()> {
        let filename = list.require_filename()?.to_path_buf();
        let mut file = self.open(&filename)?;
        let mut committed: Committed = list
            .iter()
            .filter_map(Node::type_handle)
            .filter_map(|h| Some((file.named_type_id(h.identity())?, h.datatype().clone())))
            .collect();
        let mut written = Vec::new();
        for (i, node) in list.iter().enumerate() {
            match node.mark() {
                Mark::Created => self.create_node(&mut file, node, &mut committed)?,
                Mark::Changed => self.replace_node(&mut file, node, &committed)?,
                Mark::Original | Mark::Select => continue,
            }
            written.push(i);
        }
        file.close()?;
        tracing::debug!(file = %filename.display(), written = written.len(), "node list updated");
        for i in written {
            if let Some(node) = list.node_at_mut(i) {
                node.set_mark(Mark::Original);
            }
        }
        Ok(())
    }

    fn open(&self, filename: &Path) -> Result<File> {
        Ok(File::open_with(
            filename,
            Access::ReadWrite,
            self.config.diagnostics(),
        )?)
    }

    fn create_node(&self, file: &mut File, node: &Node, committed: &mut Committed) -> Result<()> {
        let name = node.name();
        tracing::trace!(name, kind = %node.kind(), "writing");
        match node.kind() {
            NodeKind::Group if name == "/" => Ok(()),
            NodeKind::Group => Ok(file.create_group(name)?),
            NodeKind::NamedType => {
                let datatype = required_type(node)?.clone();
                let identity = file.commit_type(name, datatype.clone())?;
                if let Some(id) = file.named_type_id(identity) {
                    committed.push((id, datatype));
                }
                Ok(())
            }
            NodeKind::Dataset => {
                let body = self.dataset_body(node, committed)?;
                Ok(file.create_dataset(name, body)?)
            }
            NodeKind::Attribute | NodeKind::Reference => write_attribute(file, node, committed, false),
        }
    }

    fn replace_node(&self, file: &mut File, node: &Node, committed: &Committed) -> Result<()> {
        tracing::trace!(name = node.name(), kind = %node.kind(), "replacing");
        match node.kind() {
            NodeKind::Dataset => {
                let body = self.dataset_body(node, committed)?;
                Ok(file.replace_dataset(node.name(), body)?)
            }
            NodeKind::Attribute | NodeKind::Reference => write_attribute(file, node, committed, true),
            kind => Err(Error::WrongKind {
                name: node.name().to_string(),
                actual: kind,
            }),
        }
    }

    fn dataset_body(&self, node: &Node, committed: &Committed) -> Result<DatasetBody> {
        let datatype = required_type(node)?.clone();
        let layout = match node.compression().unwrap_or(self.config.compression) {
            Compression::None => Layout::Contiguous,
            Compression::Zlib { level } => Layout::Deflate { level },
            Compression::Szlib { .. } => {
                return Err(FormatError::UnsupportedFilter("szip".to_string()).into())
            }
        };
        Ok(DatasetBody {
            named_type: named_type_of(&datatype, committed),
            dataspace: dataspace_of(node),
            data: copy_bytes(node.data())?,
            datatype,
            layout,
        })
    }
}

fn required_type(node: &Node) -> Result<&Datatype> {
    node.datatype()
        .ok_or_else(|| Error::MissingType(node.name().to_string()))
}

fn dataspace_of(node: &Node) -> Dataspace {
    match node.shape() {
        DataShape::Array => Dataspace::simple(node.dims()),
        DataShape::Simple | DataShape::Undefined => Dataspace::scalar(),
    }
}

fn named_type_of(datatype: &Datatype, committed: &Committed) -> Option<ObjectId> {
    probe::first_equal(&datatype, committed.iter().map(|(id, dt)| (*id, dt)))
}

/// Write an attribute or reference node onto its parent object.
///
/// A reference node holds the path of its target as a string.
fn write_attribute(file: &mut File, node: &Node, committed: &Committed, replace: bool) -> Result<()> {
    let (parent, name) = path::split_name(node.name());
    let owner = path::store_path(parent);
    let attribute = if node.kind() == NodeKind::Reference {
        let target = file.create_reference(&node.string_value()?)?;
        Attribute {
            name: name.to_string(),
            datatype: Datatype::object_reference(),
            dataspace: Dataspace::scalar(),
            data: target.as_bytes().to_vec(),
            named_type: None,
        }
    } else {
        let datatype = required_type(node)?.clone();
        Attribute {
            name: name.to_string(),
            named_type: named_type_of(&datatype, committed),
            dataspace: dataspace_of(node),
            data: copy_bytes(node.data())?,
            datatype,
        }
    };
    Ok(file.write_attribute(owner, attribute, replace)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hltree_format::native::NativeType;

    fn list_in(dir: &tempfile::TempDir) -> NodeList {
        NodeList::with_filename(dir.path().join("w.hlt"))
    }

    #[test]
    fn writes_groups_datasets_and_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = list_in(&dir);
        list.add_node(Node::group("/g")).unwrap();
        let mut d = Node::dataset("/g/d");
        d.set_array(&[2], &[7i32, 8]).unwrap();
        list.add_node(d).unwrap();
        let mut a = Node::attribute("/g/d/unit");
        a.set_string("m").unwrap();
        list.add_node(a).unwrap();
        write_nodelist(&mut list, &CreationProperties::default(), &Compression::None).unwrap();
        assert!(list.iter().all(|n| n.mark() == Mark::Original));

        let file = File::open(list.filename().unwrap(), Access::ReadOnly).unwrap();
        let ds = file.dataset("/g/d").unwrap();
        assert_eq!(ds.layout, Layout::Contiguous);
        assert_eq!(ds.dataspace, Dataspace::simple(&[2]));
        assert_eq!(file.attribute("/g/d", "unit").unwrap().data, b"m\0");
    }

    #[test]
    fn datasets_fall_back_to_the_default_compression() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = list_in(&dir);
        let mut d = Node::dataset("/d");
        d.set_scalar(1.5f64).unwrap();
        list.add_node(d).unwrap();
        let mut e = Node::dataset("/e");
        e.set_scalar(2.5f64).unwrap();
        e.set_compression(Compression::None).unwrap();
        list.add_node(e).unwrap();
        Writer::default().write(&mut list).unwrap();

        let file = File::open(list.filename().unwrap(), Access::ReadOnly).unwrap();
        assert_eq!(file.dataset("/d").unwrap().layout, Layout::Deflate { level: 6 });
        assert_eq!(file.dataset("/e").unwrap().layout, Layout::Contiguous);
    }

    #[test]
    fn szip_is_rejected_by_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = list_in(&dir);
        let mut d = Node::dataset("/d");
        d.set_scalar(1u8).unwrap();
        list.add_node(d).unwrap();
        let writer = Writer::new(
            Config::default()
                .with_compression(Compression::szlib())
                .with_store_errors(false),
        );
        assert!(matches!(
            writer.write(&mut list),
            Err(Error::Store(FormatError::UnsupportedFilter(_)))
        ));
        assert_eq!(list.node("/d").unwrap().mark(), Mark::Created);
    }

    #[test]
    fn values_of_a_committed_type_link_to_it() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = list_in(&dir);
        let mut t = Node::named_type("/t");
        t.commit_datatype(NativeType::Double.datatype()).unwrap();
        list.add_node(t).unwrap();
        let mut d = Node::dataset("/d");
        d.set_scalar(3.0f64).unwrap();
        list.add_node(d).unwrap();
        Writer::default().write(&mut list).unwrap();

        let file = File::open(list.filename().unwrap(), Access::ReadOnly).unwrap();
        let id = file.dataset("/d").unwrap().named_type.unwrap();
        assert_eq!(file.identity_of(id), file.identity("/t").unwrap());
    }

    #[test]
    fn references_store_their_target() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = list_in(&dir);
        list.add_node(Node::group("/g")).unwrap();
        let mut r = Node::reference("/link");
        r.set_string("/g").unwrap();
        list.add_node(r).unwrap();
        Writer::default().write(&mut list).unwrap();

        let file = File::open(list.filename().unwrap(), Access::ReadOnly).unwrap();
        let attr = file.attribute("/", "link").unwrap();
        assert_eq!(attr.datatype, Datatype::object_reference());
        assert_eq!(attr.data, file.create_reference("/g").unwrap().as_bytes());
    }

    #[test]
    fn values_are_required() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = list_in(&dir);
        list.add_node(Node::dataset("/d")).unwrap();
        assert!(matches!(
            Writer::default().write(&mut list),
            Err(Error::MissingType(_))
        ));
    }
}
