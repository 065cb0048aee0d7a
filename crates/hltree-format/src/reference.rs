//! Object references.
//!
//! A reference is the little-endian object number of its target. Two
//! references to the same object are byte-for-byte identical no matter
//! which path was used to create them.

use crate::error::FormatError;
use crate::object::ObjectId;

/// Size in bytes of a stored object reference.
pub const REFERENCE_SIZE: usize = 8;

/// An object reference as stored in a reference-class attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectReference([u8; REFERENCE_SIZE]);

impl ObjectReference {
    /// Reference to the object with the given id.
    pub fn to_object(id: ObjectId) -> Self {
        ObjectReference(id.0.to_le_bytes())
    }

    /// Reinterpret stored bytes as a reference.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        let arr: [u8; REFERENCE_SIZE] = bytes
            .try_into()
            .map_err(|_| FormatError::InvalidReference(bytes.len()))?;
        Ok(ObjectReference(arr))
    }

    /// The stored bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Object id the reference points at.
    pub fn object_id(&self) -> ObjectId {
        ObjectId(u64::from_le_bytes(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_are_little_endian_object_number() {
        let r = ObjectReference::to_object(ObjectId(0x0102));
        assert_eq!(r.as_bytes(), &[0x02, 0x01, 0, 0, 0, 0, 0, 0]);
        assert_eq!(r.object_id(), ObjectId(0x0102));
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert!(matches!(
            ObjectReference::from_bytes(&[1, 2, 3]),
            Err(FormatError::InvalidReference(3))
        ));
    }
}
