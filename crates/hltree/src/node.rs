//! Nodes: one group, dataset, attribute, named type or reference each.

use std::fmt;
use std::mem::size_of;

use hltree_format::datatype::Datatype;
use hltree_format::native::c_string;
use hltree_format::TypeHandle;

use crate::compound::{build_description, CompoundTypeDescription};
use crate::error::{byte_len, copy_bytes, Error, Result};
use crate::format::{format_of, FormatSpecifier};

/// Highest rank a node value may have.
pub const MAX_RANK: usize = 4;

/// Option mask selecting nearest-neighbour szip coding.
pub const SZIP_NN_OPTION_MASK: u32 = 32;

/// What a node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Attribute,
    Group,
    Dataset,
    NamedType,
    Reference,
}

impl NodeKind {
    /// Code used where a kind must be stored as an integer and no kind
    /// applies.
    pub const UNDEFINED_CODE: i32 = -1;

    /// Stable integer code.
    pub fn code(self) -> i32 {
        match self {
            NodeKind::Attribute => 0,
            NodeKind::Group => 1,
            NodeKind::Dataset => 2,
            NodeKind::NamedType => 3,
            NodeKind::Reference => 4,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(NodeKind::Attribute),
            1 => Some(NodeKind::Group),
            2 => Some(NodeKind::Dataset),
            3 => Some(NodeKind::NamedType),
            4 => Some(NodeKind::Reference),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NodeKind::Attribute => "attribute",
            NodeKind::Group => "group",
            NodeKind::Dataset => "dataset",
            NodeKind::NamedType => "type",
            NodeKind::Reference => "reference",
        })
    }
}

/// Lifecycle tag driving selective fetching and updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    /// In sync with the container.
    Original,
    /// Authored and not yet written.
    Created,
    /// Read from the container, then modified.
    Changed,
    /// Waiting to be fetched.
    Select,
}

/// How a value was set or fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataShape {
    #[default]
    Undefined,
    Simple,
    Array,
}

/// Dataset compression settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Zlib { level: u32 },
    Szlib { mask: u32, pixels_per_block: u32 },
}

impl Default for Compression {
    fn default() -> Self {
        Compression::Zlib { level: 6 }
    }
}

impl Compression {
    /// Szip with its usual defaults.
    pub fn szlib() -> Self {
        Compression::Szlib {
            mask: SZIP_NN_OPTION_MASK,
            pixels_per_block: 16,
        }
    }
}

/// Element types with a scalar format.
pub trait Scalar: bytemuck::Pod {
    const FORMAT: FormatSpecifier;
}

macro_rules! scalar {
    ($($t:ty => $f:ident),* $(,)?) => {
        $(impl Scalar for $t {
            const FORMAT: FormatSpecifier = FormatSpecifier::$f;
        })*
    };
}

scalar! {
    i8 => Schar,
    u8 => Uchar,
    i16 => Short,
    u16 => Ushort,
    i32 => Int,
    u32 => Uint,
    i64 => Llong,
    u64 => Ullong,
    f32 => Float,
    f64 => Double,
}

#[derive(Debug)]
enum Body {
    Attribute,
    Group,
    Dataset { compression: Option<Compression> },
    NamedType { handle: Option<TypeHandle> },
    Reference,
}

impl Body {
    fn new(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Attribute => Body::Attribute,
            NodeKind::Group => Body::Group,
            NodeKind::Dataset => Body::Dataset { compression: None },
            NodeKind::NamedType => Body::NamedType { handle: None },
            NodeKind::Reference => Body::Reference,
        }
    }
}

/// Value part of a node, as set by a caller or filled by a fetch.
#[derive(Debug, Clone, Default)]
pub(crate) struct Value {
    pub dims: Vec<u64>,
    pub data: Vec<u8>,
    pub rawdata: Option<Vec<u8>>,
    pub format: Option<FormatSpecifier>,
    pub datatype: Option<Datatype>,
    pub element_size: usize,
    pub raw_element_size: usize,
    pub shape: DataShape,
    pub compound: Option<CompoundTypeDescription>,
}

/// One entry of a [`NodeList`](crate::NodeList).
#[derive(Debug)]
pub struct Node {
    name: String,
    mark: Mark,
    body: Body,
    value: Value,
}

impl Node {
    /// A new, empty node authored by the caller.
    pub fn new(kind: NodeKind, name: &str) -> Self {
        Node {
            name: name.to_string(),
            mark: Mark::Created,
            body: Body::new(kind),
            value: Value::default(),
        }
    }

    pub fn attribute(name: &str) -> Self {
        Self::new(NodeKind::Attribute, name)
    }

    pub fn group(name: &str) -> Self {
        Self::new(NodeKind::Group, name)
    }

    pub fn dataset(name: &str) -> Self {
        Self::new(NodeKind::Dataset, name)
    }

    pub fn named_type(name: &str) -> Self {
        Self::new(NodeKind::NamedType, name)
    }

    pub fn reference(name: &str) -> Self {
        Self::new(NodeKind::Reference, name)
    }

    /// A node found in a container, without payload.
    pub(crate) fn discovered(kind: NodeKind, name: &str) -> Self {
        Node {
            mark: Mark::Original,
            ..Self::new(kind, name)
        }
    }

    /// Deep copy. A named type handle is not copied; the type itself is.
    pub fn copy(&self) -> Self {
        let body = match &self.body {
            Body::Attribute => Body::Attribute,
            Body::Group => Body::Group,
            Body::Dataset { compression } => Body::Dataset {
                compression: *compression,
            },
            Body::NamedType { .. } => Body::NamedType { handle: None },
            Body::Reference => Body::Reference,
        };
        Node {
            name: self.name.clone(),
            mark: self.mark,
            body,
            value: self.value.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        match self.body {
            Body::Attribute => NodeKind::Attribute,
            Body::Group => NodeKind::Group,
            Body::Dataset { .. } => NodeKind::Dataset,
            Body::NamedType { .. } => NodeKind::NamedType,
            Body::Reference => NodeKind::Reference,
        }
    }

    pub fn mark(&self) -> Mark {
        self.mark
    }

    pub fn set_mark(&mut self, mark: Mark) {
        self.mark = mark;
    }

    pub fn rank(&self) -> usize {
        self.value.dims.len()
    }

    pub fn dims(&self) -> &[u64] {
        &self.value.dims
    }

    /// Payload in native encoding.
    pub fn data(&self) -> &[u8] {
        &self.value.data
    }

    /// Payload as stored, when it was fetched that way.
    pub fn rawdata(&self) -> Option<&[u8]> {
        self.value.rawdata.as_deref()
    }

    pub fn format(&self) -> Option<FormatSpecifier> {
        self.value.format
    }

    /// Format name, `UNDEFINED` while no value is set.
    pub fn format_name(&self) -> &'static str {
        self.value.format.map_or("UNDEFINED", FormatSpecifier::as_str)
    }

    /// Native datatype of [`data`](Self::data), or the type of a named type.
    pub fn datatype(&self) -> Option<&Datatype> {
        self.value.datatype.as_ref()
    }

    /// Bytes per element of [`data`](Self::data).
    pub fn element_size(&self) -> usize {
        self.value.element_size
    }

    /// Bytes per element of [`rawdata`](Self::rawdata).
    pub fn raw_element_size(&self) -> usize {
        self.value.raw_element_size
    }

    pub fn shape(&self) -> DataShape {
        self.value.shape
    }

    /// True when the value is known to be an array.
    pub fn is_array_valued(&self) -> bool {
        self.value.shape == DataShape::Array
    }

    pub fn compound_description(&self) -> Option<&CompoundTypeDescription> {
        self.value.compound.as_ref()
    }

    /// Dataset compression; `None` for other kinds or when unset.
    pub fn compression(&self) -> Option<Compression> {
        match self.body {
            Body::Dataset { compression } => compression,
            _ => None,
        }
    }

    pub fn set_compression(&mut self, compression: Compression) -> Result<()> {
        match &mut self.body {
            Body::Dataset { compression: c } => {
                *c = Some(compression);
                Ok(())
            }
            _ => Err(self.wrong_kind()),
        }
    }

    /// Handle of a fetched named type.
    pub fn type_handle(&self) -> Option<&TypeHandle> {
        match &self.body {
            Body::NamedType { handle } => handle.as_ref(),
            _ => None,
        }
    }

    fn wrong_kind(&self) -> Error {
        Error::WrongKind {
            name: self.name.clone(),
            actual: self.kind(),
        }
    }

    fn touch(&mut self) {
        if self.mark != Mark::Created {
            self.mark = Mark::Changed;
        }
    }

    fn scalar_type(format: FormatSpecifier, size: usize) -> Result<Datatype> {
        if format == FormatSpecifier::String {
            let size = u32::try_from(size).map_err(|_| Error::SizeMismatch {
                expected: u32::MAX as usize,
                actual: size,
            })?;
            return Ok(c_string(size));
        }
        let datatype = format.native().ok_or(Error::NoScalarType(format))?.datatype();
        if datatype.type_size() != size {
            return Err(Error::SizeMismatch {
                expected: datatype.type_size(),
                actual: size,
            });
        }
        Ok(datatype)
    }

    fn store_value(
        &mut self,
        format: FormatSpecifier,
        datatype: Datatype,
        dims: Option<&[u64]>,
        data: &[u8],
    ) -> Result<()> {
        if matches!(self.body, Body::Group | Body::NamedType { .. }) {
            return Err(self.wrong_kind());
        }
        if let Some(dims) = dims {
            if dims.len() > MAX_RANK {
                return Err(Error::RankTooLarge(dims.len()));
            }
        }
        let element_size = datatype.type_size();
        let expected = byte_len(dims.unwrap_or_default(), element_size)?;
        if data.len() != expected {
            return Err(Error::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        let compound = match format {
            FormatSpecifier::Compound => Some(build_description(&datatype)?),
            _ => None,
        };
        self.value = Value {
            dims: dims.map(<[u64]>::to_vec).unwrap_or_default(),
            data: copy_bytes(data)?,
            rawdata: None,
            format: Some(format),
            datatype: Some(datatype),
            element_size,
            raw_element_size: 0,
            shape: if dims.is_some() {
                DataShape::Array
            } else {
                DataShape::Simple
            },
            compound,
        };
        self.touch();
        Ok(())
    }

    /// Set a scalar value of `size` bytes.
    ///
    /// For `string` a null-terminated string type of `size` bytes is
    /// created; other formats must match their native size.
    pub fn set_scalar_value(&mut self, format: &str, size: usize, data: &[u8]) -> Result<()> {
        let format: FormatSpecifier = format.parse()?;
        let datatype = Self::scalar_type(format, size)?;
        self.store_value(format, datatype, None, data)
    }

    /// Set an array value of `size`-byte elements.
    pub fn set_array_value(
        &mut self,
        format: &str,
        size: usize,
        dims: &[u64],
        data: &[u8],
    ) -> Result<()> {
        let format: FormatSpecifier = format.parse()?;
        let datatype = Self::scalar_type(format, size)?;
        self.store_value(format, datatype, Some(dims), data)
    }

    /// Set a value of an explicit native type, such as a compound.
    ///
    /// `dims` of `None` sets a scalar.
    pub fn set_typed_value(
        &mut self,
        datatype: Datatype,
        dims: Option<&[u64]>,
        data: &[u8],
    ) -> Result<()> {
        let format = format_of(&datatype)?;
        self.store_value(format, datatype, dims, data)
    }

    pub fn set_scalar<T: Scalar>(&mut self, value: T) -> Result<()> {
        self.set_scalar_value(T::FORMAT.as_str(), size_of::<T>(), bytemuck::bytes_of(&value))
    }

    pub fn set_array<T: Scalar>(&mut self, dims: &[u64], values: &[T]) -> Result<()> {
        self.set_array_value(
            T::FORMAT.as_str(),
            size_of::<T>(),
            dims,
            bytemuck::cast_slice(values),
        )
    }

    /// Set a null-terminated string scalar.
    pub fn set_string(&mut self, value: &str) -> Result<()> {
        let mut bytes = value.as_bytes().to_vec();
        bytes.push(0);
        self.set_scalar_value("string", bytes.len(), &bytes)
    }

    /// Bind a caller-built type to an authored named type node.
    pub fn commit_datatype(&mut self, datatype: Datatype) -> Result<()> {
        if self.kind() != NodeKind::NamedType {
            return Err(self.wrong_kind());
        }
        let mut description = build_description(&datatype)?;
        description.type_name = self.name.clone();
        self.value.compound = Some(description);
        self.value.datatype = Some(datatype);
        self.touch();
        Ok(())
    }

    fn check_scalar<T: Scalar>(&self) -> Result<()> {
        let wanted = T::FORMAT.native().map(|n| n.datatype());
        let held = self
            .value
            .format
            .and_then(FormatSpecifier::native)
            .map(|n| n.datatype());
        if wanted.is_none() || wanted != held {
            return Err(Error::ValueType {
                name: self.name.clone(),
                requested: T::FORMAT,
            });
        }
        Ok(())
    }

    /// First element of the value as `T`.
    pub fn scalar<T: Scalar>(&self) -> Result<T> {
        self.check_scalar::<T>()?;
        let bytes = self
            .value
            .data
            .get(..size_of::<T>())
            .ok_or(Error::SizeMismatch {
                expected: size_of::<T>(),
                actual: self.value.data.len(),
            })?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    /// Every element of the value as `T`.
    pub fn values<T: Scalar>(&self) -> Result<Vec<T>> {
        self.check_scalar::<T>()?;
        if self.value.data.len() % size_of::<T>() != 0 {
            return Err(Error::SizeMismatch {
                expected: self.value.data.len().next_multiple_of(size_of::<T>()),
                actual: self.value.data.len(),
            });
        }
        Ok(bytemuck::pod_collect_to_vec(&self.value.data))
    }

    /// A string value up to its first NUL.
    pub fn string_value(&self) -> Result<String> {
        if self.value.format != Some(FormatSpecifier::String) {
            return Err(Error::ValueType {
                name: self.name.clone(),
                requested: FormatSpecifier::String,
            });
        }
        let data = &self.value.data;
        let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
        Ok(String::from_utf8_lossy(&data[..end]).into_owned())
    }

    /// Install a fetched value and mark the node Original.
    pub(crate) fn fill(&mut self, value: Value) {
        self.value = value;
        self.mark = Mark::Original;
    }

    /// Install a fetched named type and its handle.
    pub(crate) fn fill_named_type(&mut self, value: Value, type_handle: TypeHandle) {
        if let Body::NamedType { handle } = &mut self.body {
            *handle = Some(type_handle);
        }
        self.fill(value);
    }

    pub(crate) fn fill_compression(&mut self, stored: Option<Compression>) {
        if let Body::Dataset { compression } = &mut self.body {
            *compression = stored;
        }
    }
}
