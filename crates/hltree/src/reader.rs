//! Structural discovery: container hierarchy to node skeleton.

use std::path::Path;

use hltree_format::datatype::TypeClass;
use hltree_format::{Access, EntryKind, File, ObjectKind};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::node::{Mark, Node, NodeKind};
use crate::nodelist::NodeList;
use crate::path;

/// Builds node lists from containers.
#[derive(Debug, Clone, Default)]
pub struct Reader {
    config: Config,
}

impl Reader {
    pub fn new(config: Config) -> Self {
        Reader { config }
    }

    /// Read the structure of the whole file.
    pub fn read<P: AsRef<Path>>(&self, filename: P) -> Result<NodeList> {
        self.read_from(filename, "/")
    }

    /// Read the structure below `from`, which must be a group or dataset.
    ///
    /// Nodes carry names and kinds only; every node ends up
    /// [`Mark::Original`]. Soft links are skipped. Any failure discards the
    /// whole list.
    pub fn read_from<P: AsRef<Path>>(&self, filename: P, from: &str) -> Result<NodeList> {
        let filename = filename.as_ref();
        tracing::debug!(file = %filename.display(), from, "reading structure");
        let file = File::open_with(filename, Access::ReadOnly, self.config.diagnostics())?;
        let start = {
            let _quiet = file.diagnostics().suppress();
            file.object_kind(from)
        };
        if !matches!(start, Ok(ObjectKind::Group | ObjectKind::Dataset)) {
            return Err(Error::NotGroupOrDataset(from.to_string()));
        }

        let root = path::walk_root(from);
        let mut list = NodeList::with_filename(filename);
        for entry in file.walk(from)? {
            let name = path::join(root, &entry.name);
            match entry.kind {
                EntryKind::Object { kind, .. } => {
                    let node_kind = match kind {
                        ObjectKind::Group => NodeKind::Group,
                        ObjectKind::Dataset => NodeKind::Dataset,
                        ObjectKind::NamedType => NodeKind::NamedType,
                    };
                    tracing::trace!(name, kind = %node_kind, "discovered");
                    if !add_discovered(&mut list, node_kind, &name) {
                        continue;
                    }
                    if kind != ObjectKind::NamedType {
                        add_attributes(&file, &mut list, &name)?;
                    }
                }
                EntryKind::SoftLink(target) => {
                    tracing::warn!(name, target, "skipping soft link");
                }
            }
        }
        list.mark_all(Mark::Original);
        tracing::debug!(nodes = list.len(), "structure read");
        Ok(list)
    }
}

/// Nodes the tree rejects, such as the start of a walk below the top
/// level whose parent lies outside the walk, are skipped.
fn add_discovered(list: &mut NodeList, kind: NodeKind, name: &str) -> bool {
    match list.add_node(Node::discovered(kind, name)) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(name, error = %e, "skipping object outside the node tree");
            false
        }
    }
}

fn add_attributes(file: &File, list: &mut NodeList, owner: &str) -> Result<()> {
    for attr_name in file.attribute_names(owner)? {
        let attr = file.attribute(owner, &attr_name)?;
        let kind = if attr.datatype.class() == TypeClass::Reference {
            NodeKind::Reference
        } else {
            NodeKind::Attribute
        };
        add_discovered(list, kind, &path::join(owner, &attr_name));
    }
    Ok(())
}

/// Read the structure of a whole file with default settings.
pub fn read_structure<P: AsRef<Path>>(filename: P) -> Result<NodeList> {
    Reader::default().read(filename)
}

/// Read the structure below `from` with default settings.
pub fn read_structure_from<P: AsRef<Path>>(filename: P, from: &str) -> Result<NodeList> {
    Reader::default().read_from(filename, from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hltree_format::dataspace::Dataspace;
    use hltree_format::datatype::Datatype;
    use hltree_format::native::NativeType;
    use hltree_format::{Attribute, CreationProperties, DatasetBody, Layout};

    fn attr(name: &str, datatype: Datatype, data: Vec<u8>) -> Attribute {
        Attribute {
            name: name.into(),
            datatype,
            dataspace: Dataspace::scalar(),
            data,
            named_type: None,
        }
    }

    fn sample(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("s.hlt");
        let mut f = File::create(&path, &CreationProperties::default()).unwrap();
        f.create_group("/g").unwrap();
        f.create_dataset(
            "/g/d",
            DatasetBody {
                datatype: NativeType::Int.datatype(),
                dataspace: Dataspace::simple(&[2]),
                layout: Layout::Contiguous,
                data: vec![0; 8],
                named_type: None,
            },
        )
        .unwrap();
        f.commit_type("/t", NativeType::Double.datatype()).unwrap();
        let r = f.create_reference("/g").unwrap();
        f.write_attribute(
            "/",
            attr("version", NativeType::Int.datatype(), vec![0; 4]),
            false,
        )
        .unwrap();
        f.write_attribute(
            "/g/d",
            attr("ref", Datatype::object_reference(), r.as_bytes().to_vec()),
            false,
        )
        .unwrap();
        f.link_soft("/g/link", "/t").unwrap();
        f.create_dataset(
            "/top",
            DatasetBody {
                datatype: NativeType::Double.datatype(),
                dataspace: Dataspace::scalar(),
                layout: Layout::Contiguous,
                data: vec![0; 8],
                named_type: None,
            },
        )
        .unwrap();
        f.write_attribute(
            "/top",
            attr("unit", hltree_format::native::c_string(2), b"m\0".to_vec()),
            false,
        )
        .unwrap();
        f.close().unwrap();
        path
    }

    #[test]
    fn whole_file_walk() {
        let dir = tempfile::tempdir().unwrap();
        let list = read_structure(sample(&dir)).unwrap();
        let found: Vec<(&str, NodeKind)> = list.iter().map(|n| (n.name(), n.kind())).collect();
        assert_eq!(
            found,
            vec![
                ("/", NodeKind::Group),
                ("/version", NodeKind::Attribute),
                ("/g", NodeKind::Group),
                ("/g/d", NodeKind::Dataset),
                ("/g/d/ref", NodeKind::Reference),
                ("/t", NodeKind::NamedType),
                ("/top", NodeKind::Dataset),
                ("/top/unit", NodeKind::Attribute),
            ]
        );
        assert!(list.iter().all(|n| n.mark() == Mark::Original));
        assert!(list.iter().all(|n| n.data().is_empty()));
    }

    #[test]
    fn walk_from_a_subgroup() {
        let dir = tempfile::tempdir().unwrap();
        let list = read_structure_from(sample(&dir), "/g/").unwrap();
        let names: Vec<&str> = list.iter().map(Node::name).collect();
        assert_eq!(names, vec!["/g", "/g/d", "/g/d/ref"]);
    }

    #[test]
    fn walk_from_a_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let list = read_structure_from(sample(&dir), "/top").unwrap();
        let names: Vec<&str> = list.iter().map(Node::name).collect();
        assert_eq!(names, vec!["/top", "/top/unit"]);
    }

    #[test]
    fn nested_starts_cannot_be_rooted() {
        let dir = tempfile::tempdir().unwrap();
        let list = read_structure_from(sample(&dir), "/g/d").unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn named_types_and_missing_paths_cannot_start_a_walk() {
        let dir = tempfile::tempdir().unwrap();
        let file = sample(&dir);
        assert!(matches!(
            read_structure_from(&file, "/t"),
            Err(Error::NotGroupOrDataset(_))
        ));
        assert!(matches!(
            read_structure_from(&file, "/nope"),
            Err(Error::NotGroupOrDataset(_))
        ));
    }

    #[test]
    fn unreadable_files_fail() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus.hlt");
        std::fs::write(&bogus, b"plain text").unwrap();
        let reader = Reader::new(Config::default().with_store_errors(false));
        assert!(matches!(reader.read(&bogus), Err(Error::Store(_))));
    }
}
