//! Selective fetching: filling marked nodes with their payloads.
//!
//! A node read by [`Reader`](crate::Reader) carries only its name and kind.
//! Marking it [`Mark::Select`] and running a fetch fills in the value and
//! returns it to [`Mark::Original`]. Created and Changed nodes belong to the
//! caller and are never touched here.

use std::path::Path;

use hltree_format::dataspace::DataspaceType;
use hltree_format::datatype::Datatype;
use hltree_format::native::c_string;
use hltree_format::reference::REFERENCE_SIZE;
use hltree_format::{Access, File, Layout, ObjectId, ObjectKind, ObjectReference, TypeHandle};

use crate::compound::{build_description, CompoundTypeDescription};
use crate::config::Config;
use crate::error::{copy_bytes, Error, Result};
use crate::format::{fix_type, format_of, FormatSpecifier};
use crate::node::{Compression, DataShape, Mark, Node, NodeKind, Value, MAX_RANK};
use crate::nodelist::NodeList;
use crate::path;
use crate::reference::{resolve_reference, PathIndex, UNRESOLVED};

/// Mark `name` for fetching. Only Original nodes change.
pub fn select_node(list: &mut NodeList, name: &str) -> Result<()> {
    let node = list.node_mut(name)?;
    if node.mark() == Mark::Original {
        node.set_mark(Mark::Select);
    }
    Ok(())
}

/// Undo [`select_node`].
pub fn deselect_node(list: &mut NodeList, name: &str) -> Result<()> {
    let node = list.node_mut(name)?;
    if node.mark() == Mark::Select {
        node.set_mark(Mark::Original);
    }
    Ok(())
}

pub fn select_all(list: &mut NodeList) {
    select_where(list, |_| true);
}

/// Select everything cheap to fetch: datasets and nodes already known to
/// hold arrays are left alone.
pub fn select_metadata_only(list: &mut NodeList) {
    select_where(list, |n| n.kind() != NodeKind::Dataset && !n.is_array_valued());
}

fn select_where(list: &mut NodeList, wanted: impl Fn(&Node) -> bool) {
    for node in list.iter_mut() {
        if node.mark() == Mark::Original && wanted(node) {
            node.set_mark(Mark::Select);
        }
    }
}

/// Fill every selected node of `list` with default settings.
pub fn fetch_marked(list: &mut NodeList) -> Result<()> {
    Fetcher::default().fetch_marked(list)
}

/// Fetch and return one node with default settings.
pub fn fetch_node<'a>(list: &'a mut NodeList, name: &str) -> Result<&'a Node> {
    Fetcher::default().fetch_node(list, name)
}

/// What a filler produced for one node.
enum Filled {
    Value(Value),
    Dataset(Value, Compression),
    NamedType(Value, TypeHandle),
}

fn install(node: &mut Node, filled: Filled) {
    match filled {
        Filled::Value(value) => node.fill(value),
        Filled::Dataset(value, compression) => {
            node.fill_compression(Some(compression));
            node.fill(value);
        }
        Filled::NamedType(value, handle) => node.fill_named_type(value, handle),
    }
}

/// Fills selected nodes from the list's container.
#[derive(Debug, Clone, Default)]
pub struct Fetcher {
    config: Config,
}

impl Fetcher {
    pub fn new(config: Config) -> Self {
        Fetcher { config }
    }

    /// Fill every node marked [`Mark::Select`], in list order.
    ///
    /// The container is opened once for the whole batch. The first failure
    /// stops the batch; nodes filled before it keep their values.
    pub fn fetch_marked(&self, list: &mut NodeList) -> Result<()> {
        let filename = list.require_filename()?.to_path_buf();
        let file = self.open(&filename)?;
        let mut session = Session::new(&file, self.config.reference_index);
        let mut filled = 0usize;
        for i in 0..list.len() {
            let Some(node) = list.node_at(i) else { break };
            if node.mark() != Mark::Select {
                continue;
            }
            tracing::trace!(name = node.name(), kind = %node.kind(), "fetching");
            let result = session.fill(list, node)?;
            let Some(node) = list.node_at_mut(i) else { break };
            install(node, result);
            filled += 1;
        }
        tracing::debug!(file = %filename.display(), filled, "fetch batch done");
        Ok(())
    }

    /// Fill `name` alone and return it.
    ///
    /// Marks of other nodes are left as they are. Created and Changed nodes
    /// are returned untouched.
    pub fn fetch_node<'a>(&self, list: &'a mut NodeList, name: &str) -> Result<&'a Node> {
        if matches!(list.node(name)?.mark(), Mark::Created | Mark::Changed) {
            return list.node(name);
        }
        let filename = list.require_filename()?.to_path_buf();
        let file = self.open(&filename)?;
        let mut session = Session::new(&file, self.config.reference_index);
        let result = session.fill(list, list.node(name)?)?;
        let node = list.node_mut(name)?;
        install(node, result);
        tracing::debug!(file = %filename.display(), name, "fetched node");
        Ok(node)
    }

    fn open(&self, filename: &Path) -> Result<File> {
        Ok(File::open_with(
            filename,
            Access::ReadOnly,
            self.config.diagnostics(),
        )?)
    }
}

/// State of one fetch batch.
struct Session<'f> {
    file: &'f File,
    index: Option<PathIndex>,
    use_index: bool,
}

impl<'f> Session<'f> {
    fn new(file: &'f File, use_index: bool) -> Self {
        Session {
            file,
            index: None,
            use_index,
        }
    }

    fn fill(&mut self, list: &NodeList, node: &Node) -> Result<Filled> {
        let name = node.name();
        match node.kind() {
            NodeKind::Attribute => self.attribute(list, name).map(Filled::Value),
            NodeKind::Dataset => self.dataset(list, name),
            NodeKind::Group => {
                self.file.open_group(name)?;
                Ok(Filled::Value(Value::default()))
            }
            NodeKind::NamedType => self.named_type(name),
            NodeKind::Reference => self.reference(name).map(Filled::Value),
        }
    }

    /// Store path of the object owning the attribute `name`, and the
    /// attribute's own name.
    fn owner<'n>(&self, name: &'n str) -> Result<(&'n str, &'n str)> {
        let (parent, attr) = path::split_name(name);
        let owner = path::store_path(parent);
        let kind = {
            let _quiet = self.file.diagnostics().suppress();
            self.file.object_kind(owner)
        };
        match kind {
            Ok(ObjectKind::Group | ObjectKind::Dataset) => Ok((owner, attr)),
            _ => Err(Error::NotGroupOrDataset(owner.to_string())),
        }
    }

    /// Description of a compound value; a committed type already in `list`
    /// is reused.
    fn compound(
        &self,
        list: &NodeList,
        fixed: &Datatype,
        named_type: Option<ObjectId>,
    ) -> Result<CompoundTypeDescription> {
        let identity = named_type.map(|id| self.file.identity_of(id));
        if let Some(known) = identity.and_then(|i| list.find_compound_description(i)) {
            return Ok(known.clone());
        }
        let mut description = build_description(fixed)?;
        description.identity = identity;
        Ok(description)
    }

    fn attribute(&self, list: &NodeList, name: &str) -> Result<Value> {
        let (owner, attr_name) = self.owner(name)?;
        let attr = self.file.attribute(owner, attr_name)?;
        let fixed = fix_type(&attr.datatype)?;
        let format = format_of(&fixed)?;
        let (dims, shape) = match attr.dataspace.space_type {
            DataspaceType::Scalar => (Vec::new(), DataShape::Simple),
            _ => (attr.dataspace.dimensions.clone(), DataShape::Array),
        };
        if dims.len() > MAX_RANK {
            return Err(Error::RankTooLarge(dims.len()));
        }
        let (data, rawdata) = if attr.dataspace.space_type == DataspaceType::Null {
            (Vec::new(), Vec::new())
        } else {
            (
                self.file.read_attribute(owner, attr_name, &fixed)?,
                copy_bytes(&attr.data)?,
            )
        };
        let compound = match format {
            FormatSpecifier::Compound => Some(self.compound(list, &fixed, attr.named_type)?),
            _ => None,
        };
        Ok(Value {
            dims,
            data,
            rawdata: Some(rawdata),
            format: Some(format),
            element_size: fixed.type_size(),
            raw_element_size: attr.datatype.type_size(),
            datatype: Some(fixed),
            shape,
            compound,
        })
    }

    fn dataset(&self, list: &NodeList, name: &str) -> Result<Filled> {
        let ds = self.file.dataset(name)?;
        let (dims, shape) = match ds.dataspace.space_type {
            DataspaceType::Null => return Err(Error::NullDataspace(name.to_string())),
            DataspaceType::Scalar => (Vec::new(), DataShape::Simple),
            DataspaceType::Simple => (ds.dataspace.dimensions.clone(), DataShape::Array),
        };
        if dims.len() > MAX_RANK {
            return Err(Error::RankTooLarge(dims.len()));
        }
        let fixed = fix_type(&ds.datatype)?;
        let format = format_of(&fixed)?;
        let data = self.file.read_dataset(name, &fixed)?;
        let compound = match format {
            FormatSpecifier::Compound => Some(self.compound(list, &fixed, ds.named_type)?),
            _ => None,
        };
        let compression = match ds.layout {
            Layout::Contiguous => Compression::None,
            Layout::Deflate { level } => Compression::Zlib { level },
        };
        let value = Value {
            dims,
            data,
            rawdata: None,
            format: Some(format),
            element_size: fixed.type_size(),
            raw_element_size: ds.datatype.type_size(),
            datatype: Some(fixed),
            shape,
            compound,
        };
        Ok(Filled::Dataset(value, compression))
    }

    fn named_type(&self, name: &str) -> Result<Filled> {
        let handle = self.file.open_named_type(name)?;
        let description = build_description(handle.datatype())?.named(name, handle.identity());
        let value = Value {
            element_size: handle.datatype().type_size(),
            datatype: Some(handle.datatype().clone()),
            compound: Some(description),
            ..Value::default()
        };
        Ok(Filled::NamedType(value, handle))
    }

    fn reference(&mut self, name: &str) -> Result<Value> {
        let (owner, attr_name) = self.owner(name)?;
        let attr = self.file.attribute(owner, attr_name)?;
        let bytes = attr.data.get(..REFERENCE_SIZE).unwrap_or(&attr.data);
        let target = ObjectReference::from_bytes(bytes)?;
        let resolved = if self.use_index {
            if self.index.is_none() {
                self.index = Some(PathIndex::build(self.file)?);
            }
            self.index
                .as_ref()
                .and_then(|index| index.resolve(&target))
                .map(str::to_string)
        } else {
            resolve_reference(self.file, &target)
        };
        let path = resolved.unwrap_or_else(|| {
            tracing::warn!(name, "reference does not resolve");
            UNRESOLVED.to_string()
        });
        let mut data = path.into_bytes();
        data.push(0);
        let size = data.len();
        let datatype = c_string(u32::try_from(size).map_err(|_| Error::SizeMismatch {
            expected: u32::MAX as usize,
            actual: size,
        })?);
        Ok(Value {
            dims: Vec::new(),
            rawdata: Some(data.clone()),
            data,
            format: Some(FormatSpecifier::String),
            datatype: Some(datatype),
            element_size: size,
            raw_element_size: size,
            shape: DataShape::Simple,
            compound: None,
        })
    }
}
