//! In-memory node trees over hierarchical typed containers.
//!
//! A container is read into a [`NodeList`]: a flat, insertion-ordered list
//! of named [`Node`]s (groups, datasets, attributes, named types and object
//! references) whose names encode the hierarchy. Reading brings in names
//! and kinds only; payloads are pulled in on demand by selecting nodes and
//! fetching them in one batch.
//!
//! ```no_run
//! use hltree::{fetch_node, read_structure, select_metadata_only, fetch_marked};
//!
//! let mut list = read_structure("data.hlt")?;
//! select_metadata_only(&mut list);
//! fetch_marked(&mut list)?;
//! let d = fetch_node(&mut list, "/g/d")?;
//! println!("{} {:?} {}", d.name(), d.dims(), d.format_name());
//! # Ok::<(), hltree::Error>(())
//! ```
//!
//! New trees are built by adding nodes with values and writing the list:
//!
//! ```no_run
//! use hltree::{write_nodelist, Compression, Node, NodeList};
//! use hltree_format::CreationProperties;
//!
//! let mut list = NodeList::with_filename("out.hlt");
//! list.add_node(Node::group("/g"))?;
//! let mut d = Node::dataset("/g/d");
//! d.set_array(&[2, 2], &[1.0f64, 2.0, 3.0, 4.0])?;
//! list.add_node(d)?;
//! write_nodelist(&mut list, &CreationProperties::default(), &Compression::default())?;
//! # Ok::<(), hltree::Error>(())
//! ```

pub mod compound;
pub mod config;
pub mod error;
pub mod fetch;
pub mod format;
pub mod node;
pub mod nodelist;
pub mod path;
mod probe;
pub mod reader;
pub mod reference;
pub mod sidecar;
pub mod writer;

pub use compound::{CompoundTypeAttribute, CompoundTypeDescription};
pub use config::Config;
pub use error::{Error, ErrorCategory, Result};
pub use fetch::{
    deselect_node, fetch_marked, fetch_node, select_all, select_metadata_only, select_node,
    Fetcher,
};
pub use format::{format_size, is_format_supported, FormatSpecifier};
pub use node::{Compression, DataShape, Mark, Node, NodeKind, Scalar, MAX_RANK};
pub use nodelist::NodeList;
pub use reader::{read_structure, read_structure_from, Reader};
pub use reference::{resolve_reference, PathIndex, UNRESOLVED};
pub use sidecar::{FieldKind, SidecarInfo};
pub use writer::{update_nodelist, write_nodelist, Writer};

/// True when `path` names a container file.
pub fn is_container_file<P: AsRef<std::path::Path>>(path: P) -> bool {
    hltree_format::File::is_container(path)
}
