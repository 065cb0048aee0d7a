//! The owning, ordered collection of nodes for one container.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use hltree_format::ObjectIdentity;

use crate::compound::CompoundTypeDescription;
use crate::error::{Error, Result};
use crate::node::{Mark, Node, NodeKind};
use crate::path::{parent_of, validate_name};

/// Nodes in insertion order, with unique names.
///
/// A node is accepted only when its parent is the root or an existing
/// group; attributes and references may also hang off a dataset.
#[derive(Debug, Default)]
pub struct NodeList {
    filename: Option<PathBuf>,
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
}

impl NodeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filename<P: AsRef<Path>>(filename: P) -> Self {
        NodeList {
            filename: Some(filename.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    pub fn set_filename<P: AsRef<Path>>(&mut self, filename: P) {
        self.filename = Some(filename.as_ref().to_path_buf());
    }

    pub(crate) fn require_filename(&self) -> Result<&Path> {
        self.filename().ok_or(Error::NoFilename)
    }

    /// Append `node`, taking ownership.
    ///
    /// Fails without touching the list when the name is taken, malformed,
    /// or its parent cannot hold it.
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        let name = node.name();
        if self.index.contains_key(name) {
            return Err(Error::DuplicateNode(name.to_string()));
        }
        validate_name(name)?;
        let parent = parent_of(name);
        if !parent.is_empty() {
            let parent_ok = match self.get(parent).map(Node::kind) {
                Some(NodeKind::Group) => true,
                Some(NodeKind::Dataset) => {
                    matches!(node.kind(), NodeKind::Attribute | NodeKind::Reference)
                }
                _ => false,
            };
            if !parent_ok {
                return Err(Error::InvalidParent(name.to_string()));
            }
        }
        self.index.insert(name.to_string(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.index.get(name).map(|&i| &self.nodes[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.index.get(name).map(|&i| &mut self.nodes[i])
    }

    /// The node called `name`.
    pub fn node(&self, name: &str) -> Result<&Node> {
        self.get(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn node_mut(&mut self, name: &str) -> Result<&mut Node> {
        self.get_mut(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn node_at(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub(crate) fn node_at_mut(&mut self, index: usize) -> Option<&mut Node> {
        self.nodes.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Node> {
        self.nodes.iter_mut()
    }

    pub fn mark_all(&mut self, mark: Mark) {
        for node in &mut self.nodes {
            node.set_mark(mark);
        }
    }

    /// Description built earlier for the committed type `identity`.
    pub fn find_compound_description(
        &self,
        identity: ObjectIdentity,
    ) -> Option<&CompoundTypeDescription> {
        self.nodes
            .iter()
            .filter(|n| n.kind() == NodeKind::NamedType)
            .filter_map(Node::compound_description)
            .find(|d| d.identity == Some(identity))
    }
}

impl<'a> IntoIterator for &'a NodeList {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> NodeList {
        let mut list = NodeList::with_filename("t.hlt");
        list.add_node(Node::group("/g")).unwrap();
        list.add_node(Node::dataset("/g/d")).unwrap();
        list
    }

    #[test]
    fn names_are_unique() {
        let mut list = tree();
        assert!(matches!(
            list.add_node(Node::group("/g")),
            Err(Error::DuplicateNode(_))
        ));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn parents_must_exist() {
        let mut list = tree();
        assert!(matches!(
            list.add_node(Node::group("/missing/x")),
            Err(Error::InvalidParent(_))
        ));
        assert!(list.add_node(Node::group("/top")).is_ok());
        assert!(list.add_node(Node::attribute("/top/a")).is_ok());
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn datasets_only_hold_attributes_and_references() {
        let mut list = tree();
        assert!(list.add_node(Node::attribute("/g/d/a")).is_ok());
        assert!(list.add_node(Node::reference("/g/d/r")).is_ok());
        assert!(matches!(
            list.add_node(Node::group("/g/d/sub")),
            Err(Error::InvalidParent(_))
        ));
        assert!(matches!(
            list.add_node(Node::attribute("/g/d/a/deeper")),
            Err(Error::InvalidParent(_))
        ));
    }

    #[test]
    fn malformed_names_are_rejected() {
        let mut list = tree();
        for bad in ["g", "/g//x", "/g/"] {
            assert!(
                matches!(list.add_node(Node::group(bad)), Err(Error::MalformedName(_))),
                "{bad}"
            );
        }
        assert!(list.add_node(Node::group("/")).is_ok());
    }

    #[test]
    fn lookup_and_marks() {
        let mut list = tree();
        assert_eq!(list.node("/g/d").unwrap().kind(), NodeKind::Dataset);
        assert!(matches!(list.node("/nope"), Err(Error::NotFound(_))));
        list.mark_all(Mark::Select);
        assert!(list.iter().all(|n| n.mark() == Mark::Select));
        let names: Vec<&str> = list.iter().map(Node::name).collect();
        assert_eq!(names, vec!["/g", "/g/d"]);
        assert_eq!(list.node_at(1).unwrap().name(), "/g/d");
        assert_eq!(list.filename(), Some(Path::new("t.hlt")));
        list.set_filename("u.hlt");
        assert_eq!(list.filename(), Some(Path::new("u.hlt")));
    }

    #[test]
    fn descriptions_are_found_by_identity() {
        let mut list = NodeList::new();
        let mut t = Node::named_type("/t");
        t.commit_datatype(hltree_format::native::NativeType::Int.datatype())
            .unwrap();
        list.add_node(t).unwrap();
        let identity = ObjectIdentity {
            file_number: 1,
            object_number: 2,
        };
        assert!(list.find_compound_description(identity).is_none());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn no_two_nodes_share_a_name(names in proptest::collection::vec("[a-c]{1,2}", 1..20)) {
                let mut list = NodeList::new();
                for name in &names {
                    let before = list.len();
                    let path = format!("/{name}");
                    let fresh = !list.contains(&path);
                    let added = list.add_node(Node::group(&path)).is_ok();
                    prop_assert_eq!(added, fresh);
                    prop_assert_eq!(list.len(), before + usize::from(added));
                }
                let mut seen = std::collections::HashSet::new();
                for node in &list {
                    prop_assert!(seen.insert(node.name().to_string()));
                }
            }
        }
    }
}
