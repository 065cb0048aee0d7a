//! Builder for compound datatypes.

use crate::datatype::{CompoundMember, Datatype};
use crate::error::FormatError;

/// Builds a compound datatype member by member.
///
/// Members are either placed at an explicit offset with [`insert`] or
/// packed after the previous one with [`field`].
///
/// [`insert`]: CompoundTypeBuilder::insert
/// [`field`]: CompoundTypeBuilder::field
#[derive(Debug, Clone, Default)]
pub struct CompoundTypeBuilder {
    size: Option<u32>,
    members: Vec<CompoundMember>,
}

impl CompoundTypeBuilder {
    /// A builder whose total size follows the members.
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder with a fixed total size.
    pub fn with_size(size: u32) -> Self {
        CompoundTypeBuilder {
            size: Some(size),
            members: Vec::new(),
        }
    }

    fn end(&self) -> u64 {
        self.members
            .iter()
            .map(|m| m.byte_offset + m.datatype.type_size() as u64)
            .max()
            .unwrap_or(0)
    }

    /// Place `datatype` at `offset`.
    ///
    /// Fails on a duplicate name, on overlap with an earlier member, or
    /// when the member does not fit in a fixed total size.
    pub fn insert(
        mut self,
        name: &str,
        offset: u64,
        datatype: Datatype,
    ) -> Result<Self, FormatError> {
        let invalid = |reason: &str| FormatError::InvalidCompoundMember {
            name: name.to_string(),
            reason: reason.to_string(),
        };
        if name.is_empty() {
            return Err(invalid("empty name"));
        }
        if self.members.iter().any(|m| m.name == name) {
            return Err(invalid("duplicate name"));
        }
        let end = offset + datatype.type_size() as u64;
        if let Some(size) = self.size {
            if end > u64::from(size) {
                return Err(invalid("extends past the end of the compound"));
            }
        }
        let overlaps = self.members.iter().any(|m| {
            let m_end = m.byte_offset + m.datatype.type_size() as u64;
            offset < m_end && m.byte_offset < end
        });
        if overlaps {
            return Err(invalid("overlaps another member"));
        }
        self.members.push(CompoundMember {
            name: name.to_string(),
            byte_offset: offset,
            datatype,
        });
        Ok(self)
    }

    /// Append `datatype` right after the furthest member.
    pub fn field(self, name: &str, datatype: Datatype) -> Result<Self, FormatError> {
        let offset = self.end();
        self.insert(name, offset, datatype)
    }

    pub fn build(self) -> Datatype {
        let size = self.size.unwrap_or(self.end() as u32);
        Datatype::Compound {
            size,
            members: self.members,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::DatatypeByteOrder;

    #[test]
    fn packed_fields() {
        let dt = CompoundTypeBuilder::new()
            .field("a", Datatype::integer(4, true, DatatypeByteOrder::LittleEndian))
            .unwrap()
            .field("b", Datatype::float64(DatatypeByteOrder::LittleEndian))
            .unwrap()
            .build();
        let Datatype::Compound { size, members } = dt else {
            panic!("not a compound");
        };
        assert_eq!(size, 12);
        assert_eq!(members[1].byte_offset, 4);
    }

    #[test]
    fn explicit_offsets_and_padding() {
        let dt = CompoundTypeBuilder::with_size(16)
            .insert("a", 0, Datatype::integer(4, true, DatatypeByteOrder::LittleEndian))
            .unwrap()
            .insert("b", 8, Datatype::float64(DatatypeByteOrder::LittleEndian))
            .unwrap()
            .build();
        assert_eq!(dt.type_size(), 16);
    }

    #[test]
    fn rejects_overlap_and_overflow() {
        let b = CompoundTypeBuilder::with_size(8)
            .insert("a", 0, Datatype::integer(4, true, DatatypeByteOrder::LittleEndian))
            .unwrap();
        assert!(b
            .clone()
            .insert("b", 2, Datatype::integer(4, true, DatatypeByteOrder::LittleEndian))
            .is_err());
        assert!(b
            .clone()
            .insert("c", 4, Datatype::float64(DatatypeByteOrder::LittleEndian))
            .is_err());
        assert!(b
            .insert("a", 4, Datatype::integer(4, true, DatatypeByteOrder::LittleEndian))
            .is_err());
    }
}
