//! Datatype descriptions and their binary encoding.
//!
//! Every stored value carries one of these descriptions. The encoding is an
//! 8-byte header (class/version, a 24-bit class bit field, element size)
//! followed by class-specific properties, recursively for compound,
//! enumeration and array types.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::FormatError;

const DATATYPE_VERSION: u8 = 1;

/// Byte order of numeric data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatatypeByteOrder {
    LittleEndian,
    BigEndian,
    Vax,
}

impl DatatypeByteOrder {
    /// Byte order of the running platform.
    pub const fn native() -> Self {
        if cfg!(target_endian = "little") {
            DatatypeByteOrder::LittleEndian
        } else {
            DatatypeByteOrder::BigEndian
        }
    }
}

/// String padding type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringPadding {
    NullTerminate,
    NullPad,
    SpacePad,
}

/// Character set encoding.
///
/// Tags other than ASCII and UTF-8 are preserved as `Reserved` so that a
/// stored type round-trips even when nothing can interpret it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacterSet {
    Ascii,
    Utf8,
    Reserved(u8),
}

/// Reference type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceType {
    Object,
    DatasetRegion,
}

/// Coarse classification of a [`Datatype`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeClass {
    Integer,
    Float,
    Time,
    String,
    BitField,
    Opaque,
    Compound,
    Reference,
    Enum,
    Array,
}

impl fmt::Display for TypeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeClass::Integer => "integer",
            TypeClass::Float => "float",
            TypeClass::Time => "time",
            TypeClass::String => "string",
            TypeClass::BitField => "bitfield",
            TypeClass::Opaque => "opaque",
            TypeClass::Compound => "compound",
            TypeClass::Reference => "reference",
            TypeClass::Enum => "enum",
            TypeClass::Array => "array",
        };
        f.write_str(name)
    }
}

/// A member of a compound datatype.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundMember {
    /// Member name.
    pub name: String,
    /// Byte offset within the compound.
    pub byte_offset: u64,
    /// Member datatype.
    pub datatype: Datatype,
}

/// A member of an enumeration datatype.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    /// Member name.
    pub name: String,
    /// Raw value bytes (length = base type size).
    pub value: Vec<u8>,
}

/// A stored or in-memory datatype.
///
/// Equality is structural: two datatypes are equal when every property,
/// including byte order and bit layout, is equal.
#[derive(Debug, Clone, PartialEq)]
pub enum Datatype {
    /// Class 0: Fixed-point (integer) types.
    FixedPoint {
        size: u32,
        byte_order: DatatypeByteOrder,
        signed: bool,
        bit_offset: u16,
        bit_precision: u16,
    },
    /// Class 1: Floating-point types.
    FloatingPoint {
        size: u32,
        byte_order: DatatypeByteOrder,
        bit_offset: u16,
        bit_precision: u16,
        exponent_location: u8,
        exponent_size: u8,
        mantissa_location: u8,
        mantissa_size: u8,
        exponent_bias: u32,
    },
    /// Class 2: Time type.
    Time { size: u32, bit_precision: u16 },
    /// Class 3: Fixed-length string.
    String {
        size: u32,
        padding: StringPadding,
        charset: CharacterSet,
    },
    /// Class 4: Bit field.
    BitField {
        size: u32,
        byte_order: DatatypeByteOrder,
        bit_offset: u16,
        bit_precision: u16,
    },
    /// Class 5: Opaque data.
    Opaque { size: u32, tag: Vec<u8> },
    /// Class 6: Compound type.
    Compound { size: u32, members: Vec<CompoundMember> },
    /// Class 7: Reference type.
    Reference { size: u32, ref_type: ReferenceType },
    /// Class 8: Enumeration type.
    Enumeration {
        size: u32,
        base_type: Box<Datatype>,
        members: Vec<EnumMember>,
    },
    /// Class 10: Array type.
    Array {
        base_type: Box<Datatype>,
        dimensions: Vec<u32>,
    },
}

fn ensure_len(data: &[u8], offset: usize, needed: usize) -> Result<(), FormatError> {
    if offset + needed > data.len() {
        Err(FormatError::UnexpectedEof {
            expected: offset + needed,
            available: data.len(),
        })
    } else {
        Ok(())
    }
}

fn parse_byte_order(bf0: u8) -> DatatypeByteOrder {
    match (bf0 >> 6 & 0x01, bf0 & 0x01) {
        (1, _) => DatatypeByteOrder::Vax,
        (_, 0) => DatatypeByteOrder::LittleEndian,
        _ => DatatypeByteOrder::BigEndian,
    }
}

fn byte_order_bits(order: DatatypeByteOrder) -> u8 {
    match order {
        DatatypeByteOrder::LittleEndian => 0x00,
        DatatypeByteOrder::BigEndian => 0x01,
        DatatypeByteOrder::Vax => 0x40,
    }
}

fn parse_string_padding(val: u8) -> Result<StringPadding, FormatError> {
    match val {
        0 => Ok(StringPadding::NullTerminate),
        1 => Ok(StringPadding::NullPad),
        2 => Ok(StringPadding::SpacePad),
        _ => Err(FormatError::InvalidStringPadding(val)),
    }
}

fn padding_bits(padding: StringPadding) -> u8 {
    match padding {
        StringPadding::NullTerminate => 0,
        StringPadding::NullPad => 1,
        StringPadding::SpacePad => 2,
    }
}

fn parse_charset(val: u8) -> CharacterSet {
    match val {
        0 => CharacterSet::Ascii,
        1 => CharacterSet::Utf8,
        other => CharacterSet::Reserved(other),
    }
}

fn charset_bits(charset: CharacterSet) -> u8 {
    match charset {
        CharacterSet::Ascii => 0,
        CharacterSet::Utf8 => 1,
        CharacterSet::Reserved(v) => v & 0x0F,
    }
}

/// Read a null-terminated name from `data` starting at `offset`.
/// Returns (name, bytes consumed including the terminator).
pub(crate) fn read_null_terminated_string(
    data: &[u8],
    offset: usize,
) -> Result<(String, usize), FormatError> {
    ensure_len(data, offset, 1)?;
    let remaining = &data[offset..];
    let null_pos = remaining
        .iter()
        .position(|&b| b == 0)
        .ok_or(FormatError::UnexpectedEof {
            expected: data.len() + 1,
            available: data.len(),
        })?;
    let name = std::str::from_utf8(&remaining[..null_pos])
        .map_err(|_| FormatError::InvalidName)?
        .to_string();
    Ok((name, null_pos + 1))
}

impl Datatype {
    /// An integer type of `size` bytes using every bit.
    pub fn integer(size: u32, signed: bool, byte_order: DatatypeByteOrder) -> Self {
        Datatype::FixedPoint {
            size,
            byte_order,
            signed,
            bit_offset: 0,
            bit_precision: (size * 8) as u16,
        }
    }

    /// IEEE 754 single precision.
    pub fn float32(byte_order: DatatypeByteOrder) -> Self {
        Datatype::FloatingPoint {
            size: 4,
            byte_order,
            bit_offset: 0,
            bit_precision: 32,
            exponent_location: 23,
            exponent_size: 8,
            mantissa_location: 0,
            mantissa_size: 23,
            exponent_bias: 127,
        }
    }

    /// IEEE 754 double precision.
    pub fn float64(byte_order: DatatypeByteOrder) -> Self {
        Datatype::FloatingPoint {
            size: 8,
            byte_order,
            bit_offset: 0,
            bit_precision: 64,
            exponent_location: 52,
            exponent_size: 11,
            mantissa_location: 0,
            mantissa_size: 52,
            exponent_bias: 1023,
        }
    }

    /// x87 80-bit extended precision stored in 16 bytes.
    pub fn float_extended(byte_order: DatatypeByteOrder) -> Self {
        Datatype::FloatingPoint {
            size: 16,
            byte_order,
            bit_offset: 0,
            bit_precision: 80,
            exponent_location: 64,
            exponent_size: 15,
            mantissa_location: 0,
            mantissa_size: 64,
            exponent_bias: 16383,
        }
    }

    /// A fixed-length string type.
    pub fn string(size: u32, padding: StringPadding, charset: CharacterSet) -> Self {
        Datatype::String {
            size,
            padding,
            charset,
        }
    }

    /// The object reference type (8 bytes).
    pub fn object_reference() -> Self {
        Datatype::Reference {
            size: crate::reference::REFERENCE_SIZE as u32,
            ref_type: ReferenceType::Object,
        }
    }

    /// Array of `base` with the given dimensions.
    pub fn array(base: Datatype, dimensions: Vec<u32>) -> Self {
        Datatype::Array {
            base_type: Box::new(base),
            dimensions,
        }
    }

    /// Return the class of this datatype.
    pub fn class(&self) -> TypeClass {
        match self {
            Datatype::FixedPoint { .. } => TypeClass::Integer,
            Datatype::FloatingPoint { .. } => TypeClass::Float,
            Datatype::Time { .. } => TypeClass::Time,
            Datatype::String { .. } => TypeClass::String,
            Datatype::BitField { .. } => TypeClass::BitField,
            Datatype::Opaque { .. } => TypeClass::Opaque,
            Datatype::Compound { .. } => TypeClass::Compound,
            Datatype::Reference { .. } => TypeClass::Reference,
            Datatype::Enumeration { .. } => TypeClass::Enum,
            Datatype::Array { .. } => TypeClass::Array,
        }
    }

    /// Return the size in bytes of one element of this type.
    pub fn type_size(&self) -> usize {
        match self {
            Datatype::FixedPoint { size, .. }
            | Datatype::FloatingPoint { size, .. }
            | Datatype::Time { size, .. }
            | Datatype::String { size, .. }
            | Datatype::BitField { size, .. }
            | Datatype::Opaque { size, .. }
            | Datatype::Compound { size, .. }
            | Datatype::Reference { size, .. }
            | Datatype::Enumeration { size, .. } => *size as usize,
            Datatype::Array {
                base_type,
                dimensions,
            } => {
                // Saturates; payload length checks then reject the type.
                dimensions
                    .iter()
                    .fold(base_type.type_size(), |acc, &d| acc.saturating_mul(d as usize))
            }
        }
    }

    /// Byte order for the classes that have one.
    pub fn byte_order(&self) -> Option<DatatypeByteOrder> {
        match self {
            Datatype::FixedPoint { byte_order, .. }
            | Datatype::FloatingPoint { byte_order, .. }
            | Datatype::BitField { byte_order, .. } => Some(*byte_order),
            _ => None,
        }
    }

    /// Parse a datatype from its encoded bytes.
    ///
    /// Returns `(Datatype, bytes_consumed)` for recursive parsing.
    pub fn parse(data: &[u8]) -> Result<(Datatype, usize), FormatError> {
        ensure_len(data, 0, 8)?;

        let class_id = data[0] & 0x0F;
        let bf0 = data[1];
        let bf1 = data[2];
        let size = LittleEndian::read_u32(&data[4..8]);
        let mut pos = 8;

        let dt = match class_id {
            0 => {
                ensure_len(data, pos, 4)?;
                let dt = Datatype::FixedPoint {
                    size,
                    byte_order: parse_byte_order(bf0),
                    signed: (bf0 >> 3) & 0x01 == 1,
                    bit_offset: LittleEndian::read_u16(&data[pos..pos + 2]),
                    bit_precision: LittleEndian::read_u16(&data[pos + 2..pos + 4]),
                };
                pos += 4;
                dt
            }
            1 => {
                ensure_len(data, pos, 12)?;
                let dt = Datatype::FloatingPoint {
                    size,
                    byte_order: parse_byte_order(bf0),
                    bit_offset: LittleEndian::read_u16(&data[pos..pos + 2]),
                    bit_precision: LittleEndian::read_u16(&data[pos + 2..pos + 4]),
                    exponent_location: data[pos + 4],
                    exponent_size: data[pos + 5],
                    mantissa_location: data[pos + 6],
                    mantissa_size: data[pos + 7],
                    exponent_bias: LittleEndian::read_u32(&data[pos + 8..pos + 12]),
                };
                pos += 12;
                dt
            }
            2 => {
                ensure_len(data, pos, 2)?;
                let bit_precision = LittleEndian::read_u16(&data[pos..pos + 2]);
                pos += 2;
                Datatype::Time {
                    size,
                    bit_precision,
                }
            }
            3 => Datatype::String {
                size,
                padding: parse_string_padding(bf0 & 0x0F)?,
                charset: parse_charset((bf0 >> 4) & 0x0F),
            },
            4 => {
                ensure_len(data, pos, 4)?;
                let dt = Datatype::BitField {
                    size,
                    byte_order: parse_byte_order(bf0),
                    bit_offset: LittleEndian::read_u16(&data[pos..pos + 2]),
                    bit_precision: LittleEndian::read_u16(&data[pos + 2..pos + 4]),
                };
                pos += 4;
                dt
            }
            5 => {
                let tag_len = bf0 as usize;
                ensure_len(data, pos, tag_len)?;
                let tag = data[pos..pos + tag_len].to_vec();
                // Tags are padded to a multiple of 8 bytes
                pos += (tag_len + 7) & !7;
                Datatype::Opaque { size, tag }
            }
            6 => {
                let num_members = (bf0 as usize) | ((bf1 as usize) << 8);
                let mut members = Vec::with_capacity(num_members);
                for _ in 0..num_members {
                    let (name, name_len) = read_null_terminated_string(data, pos)?;
                    pos += name_len;
                    ensure_len(data, pos, 4)?;
                    let byte_offset = LittleEndian::read_u32(&data[pos..pos + 4]) as u64;
                    pos += 4;
                    let (datatype, consumed) = Datatype::parse(&data[pos..])?;
                    pos += consumed;
                    members.push(CompoundMember {
                        name,
                        byte_offset,
                        datatype,
                    });
                }
                Datatype::Compound { size, members }
            }
            7 => {
                let ref_type = match bf0 & 0x0F {
                    0 => ReferenceType::Object,
                    1 => ReferenceType::DatasetRegion,
                    other => return Err(FormatError::InvalidReferenceType(other)),
                };
                Datatype::Reference { size, ref_type }
            }
            8 => {
                let num_members = (bf0 as usize) | ((bf1 as usize) << 8);
                let (base_type, consumed) = Datatype::parse(&data[pos..])?;
                pos += consumed;
                let base_size = base_type.type_size();
                // Layout: base type, then all names, then all values
                let mut names = Vec::with_capacity(num_members);
                for _ in 0..num_members {
                    let (name, name_len) = read_null_terminated_string(data, pos)?;
                    pos += name_len;
                    names.push(name);
                }
                let mut members = Vec::with_capacity(num_members);
                for name in names {
                    ensure_len(data, pos, base_size)?;
                    members.push(EnumMember {
                        name,
                        value: data[pos..pos + base_size].to_vec(),
                    });
                    pos += base_size;
                }
                Datatype::Enumeration {
                    size,
                    base_type: Box::new(base_type),
                    members,
                }
            }
            10 => {
                ensure_len(data, pos, 1)?;
                let ndims = data[pos] as usize;
                pos += 1;
                ensure_len(data, pos, ndims * 4)?;
                let dimensions = (0..ndims)
                    .map(|i| LittleEndian::read_u32(&data[pos + i * 4..pos + i * 4 + 4]))
                    .collect();
                pos += ndims * 4;
                let (base_type, consumed) = Datatype::parse(&data[pos..])?;
                pos += consumed;
                Datatype::Array {
                    base_type: Box::new(base_type),
                    dimensions,
                }
            }
            _ => return Err(FormatError::InvalidDatatypeClass(class_id)),
        };
        Ok((dt, pos))
    }

    /// Serialize the datatype to its encoded bytes.
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Datatype::FixedPoint {
                size,
                byte_order,
                signed,
                bit_offset,
                bit_precision,
            } => {
                let mut bf0 = byte_order_bits(*byte_order);
                if *signed {
                    bf0 |= 0x08;
                }
                let mut buf = Self::build_header(0, [bf0, 0, 0], *size);
                buf.extend_from_slice(&bit_offset.to_le_bytes());
                buf.extend_from_slice(&bit_precision.to_le_bytes());
                buf
            }
            Datatype::FloatingPoint {
                size,
                byte_order,
                bit_offset,
                bit_precision,
                exponent_location,
                exponent_size,
                mantissa_location,
                mantissa_size,
                exponent_bias,
            } => {
                let bf0 = byte_order_bits(*byte_order) | 0x20;
                let mut buf = Self::build_header(1, [bf0, 0, 0], *size);
                buf.extend_from_slice(&bit_offset.to_le_bytes());
                buf.extend_from_slice(&bit_precision.to_le_bytes());
                buf.push(*exponent_location);
                buf.push(*exponent_size);
                buf.push(*mantissa_location);
                buf.push(*mantissa_size);
                buf.extend_from_slice(&exponent_bias.to_le_bytes());
                buf
            }
            Datatype::Time {
                size,
                bit_precision,
            } => {
                let mut buf = Self::build_header(2, [0, 0, 0], *size);
                buf.extend_from_slice(&bit_precision.to_le_bytes());
                buf
            }
            Datatype::String {
                size,
                padding,
                charset,
            } => {
                let bf0 = padding_bits(*padding) | (charset_bits(*charset) << 4);
                Self::build_header(3, [bf0, 0, 0], *size)
            }
            Datatype::BitField {
                size,
                byte_order,
                bit_offset,
                bit_precision,
            } => {
                let mut buf = Self::build_header(4, [byte_order_bits(*byte_order), 0, 0], *size);
                buf.extend_from_slice(&bit_offset.to_le_bytes());
                buf.extend_from_slice(&bit_precision.to_le_bytes());
                buf
            }
            Datatype::Opaque { size, tag } => {
                let tag_len = tag.len().min(u8::MAX as usize);
                let mut buf = Self::build_header(5, [tag_len as u8, 0, 0], *size);
                buf.extend_from_slice(&tag[..tag_len]);
                buf.resize(buf.len() + (((tag_len + 7) & !7) - tag_len), 0);
                buf
            }
            Datatype::Compound { size, members } => {
                let n = members.len() as u16;
                let mut buf = Self::build_header(6, [n as u8, (n >> 8) as u8, 0], *size);
                for m in members {
                    buf.extend_from_slice(m.name.as_bytes());
                    buf.push(0);
                    buf.extend_from_slice(&(m.byte_offset as u32).to_le_bytes());
                    buf.extend_from_slice(&m.datatype.serialize());
                }
                buf
            }
            Datatype::Reference { size, ref_type } => {
                let bf0 = match ref_type {
                    ReferenceType::Object => 0,
                    ReferenceType::DatasetRegion => 1,
                };
                Self::build_header(7, [bf0, 0, 0], *size)
            }
            Datatype::Enumeration {
                size,
                base_type,
                members,
            } => {
                let n = members.len() as u16;
                let mut buf = Self::build_header(8, [n as u8, (n >> 8) as u8, 0], *size);
                buf.extend_from_slice(&base_type.serialize());
                for m in members {
                    buf.extend_from_slice(m.name.as_bytes());
                    buf.push(0);
                }
                for m in members {
                    buf.extend_from_slice(&m.value);
                }
                buf
            }
            Datatype::Array {
                base_type,
                dimensions,
            } => {
                let mut buf = Self::build_header(10, [0, 0, 0], self.type_size() as u32);
                buf.push(dimensions.len() as u8);
                for d in dimensions {
                    buf.extend_from_slice(&d.to_le_bytes());
                }
                buf.extend_from_slice(&base_type.serialize());
                buf
            }
        }
    }

    fn build_header(class: u8, bf: [u8; 3], size: u32) -> Vec<u8> {
        let mut buf = vec![0u8; 8];
        buf[0] = (class & 0x0F) | (DATATYPE_VERSION << 4);
        buf[1] = bf[0];
        buf[2] = bf[1];
        buf[3] = bf[2];
        LittleEndian::write_u32(&mut buf[4..8], size);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(dt: &Datatype) -> Datatype {
        let bytes = dt.serialize();
        let (parsed, consumed) = Datatype::parse(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        parsed
    }

    #[test]
    fn test_fixed_point_header_bits() {
        let dt = Datatype::integer(4, true, DatatypeByteOrder::BigEndian);
        let bytes = dt.serialize();
        assert_eq!(bytes[0] & 0x0F, 0);
        assert_eq!(bytes[1] & 0x01, 1);
        assert_eq!(bytes[1] & 0x08, 0x08);
        assert_eq!(LittleEndian::read_u32(&bytes[4..8]), 4);
        assert_eq!(roundtrip(&dt), dt);
    }

    #[test]
    fn test_vax_float_order() {
        let mut dt = Datatype::float32(DatatypeByteOrder::LittleEndian);
        if let Datatype::FloatingPoint { byte_order, .. } = &mut dt {
            *byte_order = DatatypeByteOrder::Vax;
        }
        assert_eq!(roundtrip(&dt).byte_order(), Some(DatatypeByteOrder::Vax));
    }

    #[test]
    fn test_nested_compound_with_array_member() {
        let inner = Datatype::Compound {
            size: 12,
            members: vec![
                CompoundMember {
                    name: "x".into(),
                    byte_offset: 0,
                    datatype: Datatype::integer(4, true, DatatypeByteOrder::LittleEndian),
                },
                CompoundMember {
                    name: "v".into(),
                    byte_offset: 4,
                    datatype: Datatype::array(
                        Datatype::integer(2, false, DatatypeByteOrder::BigEndian),
                        vec![2, 2],
                    ),
                },
            ],
        };
        let outer = Datatype::Compound {
            size: 20,
            members: vec![
                CompoundMember {
                    name: "inner".into(),
                    byte_offset: 0,
                    datatype: inner,
                },
                CompoundMember {
                    name: "d".into(),
                    byte_offset: 12,
                    datatype: Datatype::float64(DatatypeByteOrder::LittleEndian),
                },
            ],
        };
        assert_eq!(roundtrip(&outer), outer);
    }

    #[test]
    fn test_enum_and_opaque() {
        let en = Datatype::Enumeration {
            size: 1,
            base_type: Box::new(Datatype::integer(1, false, DatatypeByteOrder::LittleEndian)),
            members: vec![
                EnumMember {
                    name: "OFF".into(),
                    value: vec![0],
                },
                EnumMember {
                    name: "ON".into(),
                    value: vec![1],
                },
            ],
        };
        assert_eq!(roundtrip(&en), en);

        let op = Datatype::Opaque {
            size: 3,
            tag: b"rgb".to_vec(),
        };
        assert_eq!(op.serialize().len(), 16);
        assert_eq!(roundtrip(&op), op);
    }

    #[test]
    fn test_reserved_charset_is_preserved() {
        let dt = Datatype::string(5, StringPadding::SpacePad, CharacterSet::Reserved(7));
        assert_eq!(roundtrip(&dt), dt);
    }

    #[test]
    fn test_array_size() {
        let dt = Datatype::array(Datatype::float64(DatatypeByteOrder::native()), vec![3, 4]);
        assert_eq!(dt.type_size(), 96);
        assert_eq!(dt.class(), TypeClass::Array);
    }

    #[test]
    fn test_invalid_class() {
        let mut bytes = Datatype::integer(4, true, DatatypeByteOrder::LittleEndian).serialize();
        bytes[0] = 0x1F;
        assert!(matches!(
            Datatype::parse(&bytes),
            Err(FormatError::InvalidDatatypeClass(15))
        ));
    }

    #[test]
    fn test_truncated() {
        let bytes = Datatype::float64(DatatypeByteOrder::LittleEndian).serialize();
        assert!(matches!(
            Datatype::parse(&bytes[..10]),
            Err(FormatError::UnexpectedEof { .. })
        ));
    }
}
