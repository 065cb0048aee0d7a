//! Backing store for hierarchical typed trees.
//!
//! A container is a single file holding groups, datasets, attributes and
//! committed (named) datatypes. Every value is self-describing: it carries
//! a [`Datatype`](datatype::Datatype) and a [`Dataspace`](dataspace::Dataspace),
//! and reads convert from the stored encoding to any compatible in-memory
//! one.
//!
//! ```no_run
//! use hltree_format::{Access, File};
//! use hltree_format::native::NativeType;
//!
//! let file = File::open("data.hlt", Access::ReadOnly)?;
//! for entry in file.walk("/")? {
//!     println!("{}", entry.name);
//! }
//! let values = file.read_dataset("/g/d", &NativeType::Double.datatype())?;
//! # let _ = values;
//! # Ok::<(), hltree_format::FormatError>(())
//! ```

pub mod codec;
pub mod convert;
pub mod dataspace;
pub mod datatype;
pub mod diagnostics;
pub mod error;
pub mod file;
pub mod filters;
mod io;
pub mod native;
pub mod object;
pub mod reference;
pub mod type_builders;

pub use diagnostics::{Diagnostics, ErrorHandler, SuppressGuard};
pub use error::FormatError;
pub use file::{Access, CreationProperties, Entry, EntryKind, File, TypeHandle};
pub use object::{Attribute, DatasetBody, Layout, ObjectId, ObjectIdentity, ObjectKind};
pub use reference::ObjectReference;
