//! Dataspace descriptions: the shape of a dataset or attribute payload.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::FormatError;

const DATASPACE_VERSION: u8 = 1;

/// Type of dataspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataspaceType {
    /// Scalar (single element).
    Scalar,
    /// Simple (N-dimensional array).
    Simple,
    /// Null (no data).
    Null,
}

/// The shape of a stored payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataspace {
    /// The type of this dataspace.
    pub space_type: DataspaceType,
    /// Current dimension sizes (empty unless simple).
    pub dimensions: Vec<u64>,
}

impl Dataspace {
    /// A single-element dataspace.
    pub fn scalar() -> Self {
        Dataspace {
            space_type: DataspaceType::Scalar,
            dimensions: Vec::new(),
        }
    }

    /// An N-dimensional dataspace.
    pub fn simple(dimensions: &[u64]) -> Self {
        Dataspace {
            space_type: DataspaceType::Simple,
            dimensions: dimensions.to_vec(),
        }
    }

    /// A dataspace with no elements at all.
    pub fn null() -> Self {
        Dataspace {
            space_type: DataspaceType::Null,
            dimensions: Vec::new(),
        }
    }

    /// Number of dimensions (0 for scalar and null).
    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }

    /// Scalar and N-dimensional dataspaces are simple; null ones are not.
    pub fn is_simple(&self) -> bool {
        self.space_type != DataspaceType::Null
    }

    /// Total number of elements, or `None` when the product overflows.
    pub fn num_elements(&self) -> Option<u64> {
        match self.space_type {
            DataspaceType::Scalar => Some(1),
            DataspaceType::Null => Some(0),
            DataspaceType::Simple => self
                .dimensions
                .iter()
                .try_fold(1u64, |acc, &d| acc.checked_mul(d)),
        }
    }

    /// Number of elements as an in-memory count.
    pub fn element_count(&self) -> Result<usize, FormatError> {
        self.num_elements()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| self.overflow(1))
    }

    /// Payload bytes for elements of `element_size` bytes.
    pub fn data_size(&self, element_size: usize) -> Result<usize, FormatError> {
        self.element_count()?
            .checked_mul(element_size)
            .ok_or_else(|| self.overflow(element_size))
    }

    fn overflow(&self, element_size: usize) -> FormatError {
        FormatError::SizeOverflow {
            dimensions: self.dimensions.clone(),
            element_size,
        }
    }

    /// Parse a dataspace from its encoded bytes.
    ///
    /// Returns `(Dataspace, bytes_consumed)`.
    pub fn parse(data: &[u8]) -> Result<(Dataspace, usize), FormatError> {
        if data.len() < 4 {
            return Err(FormatError::UnexpectedEof {
                expected: 4,
                available: data.len(),
            });
        }
        let rank = data[1] as usize;
        let space_type = match data[2] {
            0 => DataspaceType::Scalar,
            1 => DataspaceType::Simple,
            2 => DataspaceType::Null,
            other => return Err(FormatError::InvalidDataspaceType(other)),
        };
        let needed = 4 + rank * 8;
        if data.len() < needed {
            return Err(FormatError::UnexpectedEof {
                expected: needed,
                available: data.len(),
            });
        }
        let dimensions = (0..rank)
            .map(|i| LittleEndian::read_u64(&data[4 + i * 8..12 + i * 8]))
            .collect();
        Ok((
            Dataspace {
                space_type,
                dimensions,
            },
            needed,
        ))
    }

    /// Serialize the dataspace to its encoded bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let type_byte = match self.space_type {
            DataspaceType::Scalar => 0,
            DataspaceType::Simple => 1,
            DataspaceType::Null => 2,
        };
        let mut buf = vec![DATASPACE_VERSION, self.rank() as u8, type_byte, 0];
        for d in &self.dimensions {
            buf.extend_from_slice(&d.to_le_bytes());
        }
        buf
    }
}
