//! Member-by-member descriptions of compound (struct) types.

use hltree_format::datatype::Datatype;
use hltree_format::native::c_string;
use hltree_format::type_builders::CompoundTypeBuilder;
use hltree_format::ObjectIdentity;

use crate::error::{Error, Result};
use crate::format::{fix_type, format_of, type_of_format, FormatSpecifier};
use crate::node::MAX_RANK;

/// One member of a compound type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundTypeAttribute {
    pub name: String,
    /// Byte offset inside the compound.
    pub offset: u64,
    /// Format of one element of the member.
    pub format: FormatSpecifier,
    /// Bytes per element.
    pub element_size: usize,
    /// 1 with `dims == [1]` for plain members; the array rank otherwise.
    pub rank: usize,
    pub dims: Vec<u64>,
}

impl CompoundTypeAttribute {
    /// Number of elements in the member.
    pub fn element_count(&self) -> u64 {
        self.dims.iter().fold(1, |acc, &d| acc.saturating_mul(d))
    }

    fn is_array(&self) -> bool {
        self.dims != [1]
    }
}

/// Description of a compound type, named when it was committed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompoundTypeDescription {
    /// Path of the committed type; empty for anonymous types.
    pub type_name: String,
    /// Identity of the committed type in its container.
    pub identity: Option<ObjectIdentity>,
    /// Total size in bytes.
    pub size: usize,
    pub members: Vec<CompoundTypeAttribute>,
}

/// Describe `datatype`.
///
/// Member offsets and the total size are those of `datatype` itself; member
/// formats and element sizes are those of the fixed member types. A type
/// that is not a compound gets an empty member list.
pub fn build_description(datatype: &Datatype) -> Result<CompoundTypeDescription> {
    let mut description = CompoundTypeDescription {
        size: datatype.type_size(),
        ..Default::default()
    };
    let Datatype::Compound { members, .. } = datatype else {
        return Ok(description);
    };
    for member in members {
        let member_error = |reason: String| Error::CompoundMember {
            name: member.name.clone(),
            reason,
        };
        let fixed = fix_type(&member.datatype).map_err(|e| member_error(e.to_string()))?;
        let (element, dims) = match &fixed {
            Datatype::Array {
                base_type,
                dimensions,
            } => {
                if dimensions.len() > MAX_RANK {
                    return Err(member_error(format!(
                        "array rank {} exceeds {MAX_RANK}",
                        dimensions.len()
                    )));
                }
                (
                    base_type.as_ref(),
                    dimensions.iter().map(|&d| u64::from(d)).collect(),
                )
            }
            other => (other, vec![1]),
        };
        let format = format_of(element).map_err(|e| member_error(e.to_string()))?;
        description.members.push(CompoundTypeAttribute {
            name: member.name.clone(),
            offset: member.byte_offset,
            format,
            element_size: element.type_size(),
            rank: dims.len(),
            dims,
        });
    }
    tracing::trace!(
        members = description.members.len(),
        size = description.size,
        "built compound description"
    );
    Ok(description)
}

impl CompoundTypeDescription {
    /// Record the committed type this description was built from.
    pub fn named(mut self, type_name: &str, identity: ObjectIdentity) -> Self {
        self.type_name = type_name.to_string();
        self.identity = Some(identity);
        self
    }

    pub fn member(&self, name: &str) -> Option<&CompoundTypeAttribute> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Rebuild the native compound type this description describes.
    ///
    /// Nested compound members carry no description of their own and
    /// cannot be rebuilt.
    pub fn to_datatype(&self) -> Result<Datatype> {
        let size = u32::try_from(self.size).map_err(|_| Error::CompoundMember {
            name: self.type_name.clone(),
            reason: format!("size {} is too large", self.size),
        })?;
        let mut builder = CompoundTypeBuilder::with_size(size);
        for member in &self.members {
            let member_error = |reason: String| Error::CompoundMember {
                name: member.name.clone(),
                reason,
            };
            let element = match member.format {
                FormatSpecifier::String => c_string(member.element_size as u32),
                FormatSpecifier::Compound | FormatSpecifier::Array => {
                    return Err(member_error(format!(
                        "{} members cannot be rebuilt",
                        member.format
                    )))
                }
                scalar => type_of_format(scalar.as_str())?,
            };
            let datatype = if member.is_array() {
                let dims = member
                    .dims
                    .iter()
                    .map(|&d| u32::try_from(d))
                    .collect::<std::result::Result<Vec<u32>, _>>()
                    .map_err(|e| member_error(e.to_string()))?;
                Datatype::array(element, dims)
            } else {
                element
            };
            builder = builder
                .insert(&member.name, member.offset, datatype)
                .map_err(|e| member_error(e.to_string()))?;
        }
        Ok(builder.build())
    }
}
