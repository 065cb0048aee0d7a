//! On-disk encoding of a whole container.
//!
//! Layout: optional zero-filled user block, the 8-byte signature, a fixed
//! header, then one record per object. All integers are little-endian and
//! names are null-terminated UTF-8.

use std::collections::BTreeMap;

use byteorder::{ByteOrder, LittleEndian};

use crate::dataspace::Dataspace;
use crate::datatype::{read_null_terminated_string, Datatype};
use crate::error::FormatError;
use crate::filters::{deflate_compress, deflate_decompress};
use crate::object::{Attribute, DatasetBody, Layout, LinkTarget, Object, ObjectBody, ObjectId};

/// The 8-byte container signature.
pub const SIGNATURE: [u8; 8] = [0x89, b'H', b'L', b'T', b'\r', b'\n', 0x1A, b'\n'];

/// Current encoding version.
pub const FORMAT_VERSION: u8 = 1;

/// Fixed container header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Random-ish number distinguishing this container from others.
    pub file_number: u64,
    /// Object id of the root group.
    pub root: ObjectId,
    /// Next object id to hand out.
    pub next_id: u64,
    /// Bytes reserved before the signature.
    pub userblock: u64,
}

/// A decoded container: header plus every object keyed by id.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub header: Header,
    pub objects: BTreeMap<ObjectId, Object>,
}

/// Search for the signature at offset 0 and at powers of two from 512.
///
/// Returns the byte offset where the signature was found.
pub fn find_signature(data: &[u8]) -> Result<usize, FormatError> {
    if data.len() >= 8 && data[..8] == SIGNATURE {
        return Ok(0);
    }
    let mut offset = 512;
    while offset + 8 <= data.len() {
        if data[offset..offset + 8] == SIGNATURE {
            return Ok(offset);
        }
        offset *= 2;
    }
    Err(FormatError::SignatureNotFound)
}

const KIND_GROUP: u8 = 0;
const KIND_DATASET: u8 = 1;
const KIND_NAMED_TYPE: u8 = 2;

const LINK_HARD: u8 = 0;
const LINK_SOFT: u8 = 1;

const LAYOUT_CONTIGUOUS: u8 = 0;
const LAYOUT_DEFLATE: u8 = 1;

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], FormatError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or(FormatError::UnexpectedEof {
                expected: self.pos.saturating_add(n),
                available: self.data.len(),
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// A length field, as an in-memory size.
    fn length(&mut self) -> Result<usize, FormatError> {
        let len = self.u64()?;
        usize::try_from(len).map_err(|_| FormatError::UnexpectedEof {
            expected: usize::MAX,
            available: self.data.len(),
        })
    }

    fn u8(&mut self) -> Result<u8, FormatError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, FormatError> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    fn u64(&mut self) -> Result<u64, FormatError> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    fn name(&mut self) -> Result<String, FormatError> {
        let (name, used) = read_null_terminated_string(self.data, self.pos)?;
        self.pos += used;
        Ok(name)
    }

    fn datatype(&mut self) -> Result<Datatype, FormatError> {
        let (dt, used) = Datatype::parse(&self.data[self.pos..])?;
        self.pos += used;
        Ok(dt)
    }

    fn dataspace(&mut self) -> Result<Dataspace, FormatError> {
        let (ds, used) = Dataspace::parse(&self.data[self.pos..])?;
        self.pos += used;
        Ok(ds)
    }

    fn named_type(&mut self) -> Result<Option<ObjectId>, FormatError> {
        match self.u8()? {
            0 => Ok(None),
            _ => Ok(Some(ObjectId(self.u64()?))),
        }
    }
}

/// Decode a container from its file bytes.
pub fn decode(data: &[u8]) -> Result<Container, FormatError> {
    let start = find_signature(data)?;
    let mut cur = Cursor {
        data,
        pos: start + SIGNATURE.len(),
    };
    let version = cur.u8()?;
    if version != FORMAT_VERSION {
        return Err(FormatError::UnsupportedVersion(version));
    }
    cur.take(3)?;
    let header = Header {
        file_number: cur.u64()?,
        root: ObjectId(cur.u64()?),
        next_id: cur.u64()?,
        userblock: start as u64,
    };
    let count = cur.u32()?;
    let mut objects = BTreeMap::new();
    for _ in 0..count {
        let id = ObjectId(cur.u64()?);
        let object = decode_object(&mut cur)?;
        objects.insert(id, object);
    }
    Ok(Container { header, objects })
}

fn decode_object(cur: &mut Cursor<'_>) -> Result<Object, FormatError> {
    let body = match cur.u8()? {
        KIND_GROUP => {
            let n = cur.u32()?;
            let mut links = BTreeMap::new();
            for _ in 0..n {
                let name = cur.name()?;
                let target = match cur.u8()? {
                    LINK_HARD => LinkTarget::Hard(ObjectId(cur.u64()?)),
                    LINK_SOFT => LinkTarget::Soft(cur.name()?),
                    other => return Err(FormatError::InvalidObjectKind(other)),
                };
                links.insert(name, target);
            }
            ObjectBody::Group { links }
        }
        KIND_DATASET => {
            let datatype = cur.datatype()?;
            let dataspace = cur.dataspace()?;
            let named_type = cur.named_type()?;
            let layout = match cur.u8()? {
                LAYOUT_CONTIGUOUS => Layout::Contiguous,
                LAYOUT_DEFLATE => Layout::Deflate {
                    level: u32::from(cur.u8()?),
                },
                other => return Err(FormatError::InvalidLayout(other)),
            };
            let stored_len = cur.length()?;
            let stored = cur.take(stored_len)?;
            let expected = dataspace.data_size(datatype.type_size())?;
            let data = match layout {
                Layout::Contiguous => stored.to_vec(),
                Layout::Deflate { .. } => deflate_decompress(stored, expected)?,
            };
            if data.len() != expected {
                return Err(FormatError::DataSizeMismatch {
                    expected,
                    actual: data.len(),
                });
            }
            ObjectBody::Dataset(DatasetBody {
                datatype,
                dataspace,
                layout,
                data,
                named_type,
            })
        }
        KIND_NAMED_TYPE => ObjectBody::NamedType {
            datatype: cur.datatype()?,
        },
        other => return Err(FormatError::InvalidObjectKind(other)),
    };

    let n_attrs = cur.u32()?;
    let mut attributes = Vec::new();
    for _ in 0..n_attrs {
        let name = cur.name()?;
        let named_type = cur.named_type()?;
        let datatype = cur.datatype()?;
        let dataspace = cur.dataspace()?;
        let len = cur.u32()? as usize;
        let data = cur.take(len)?.to_vec();
        attributes.push(Attribute {
            name,
            datatype,
            dataspace,
            data,
            named_type,
        });
    }
    Ok(Object { body, attributes })
}

fn push_name(buf: &mut Vec<u8>, name: &str) {
    buf.extend_from_slice(name.as_bytes());
    buf.push(0);
}

fn push_named_type(buf: &mut Vec<u8>, named_type: Option<ObjectId>) {
    match named_type {
        None => buf.push(0),
        Some(id) => {
            buf.push(1);
            buf.extend_from_slice(&id.0.to_le_bytes());
        }
    }
}

/// Encode a container into file bytes, including its user block.
pub fn encode(container: &Container) -> Result<Vec<u8>, FormatError> {
    let header = &container.header;
    let mut buf = vec![0u8; header.userblock as usize];
    buf.extend_from_slice(&SIGNATURE);
    buf.extend_from_slice(&[FORMAT_VERSION, 0, 0, 0]);
    buf.extend_from_slice(&header.file_number.to_le_bytes());
    buf.extend_from_slice(&header.root.0.to_le_bytes());
    buf.extend_from_slice(&header.next_id.to_le_bytes());
    buf.extend_from_slice(&(container.objects.len() as u32).to_le_bytes());

    for (id, object) in &container.objects {
        buf.extend_from_slice(&id.0.to_le_bytes());
        encode_object(&mut buf, object)?;
    }
    Ok(buf)
}

fn encode_object(buf: &mut Vec<u8>, object: &Object) -> Result<(), FormatError> {
    match &object.body {
        ObjectBody::Group { links } => {
            buf.push(KIND_GROUP);
            buf.extend_from_slice(&(links.len() as u32).to_le_bytes());
            for (name, target) in links {
                push_name(buf, name);
                match target {
                    LinkTarget::Hard(id) => {
                        buf.push(LINK_HARD);
                        buf.extend_from_slice(&id.0.to_le_bytes());
                    }
                    LinkTarget::Soft(path) => {
                        buf.push(LINK_SOFT);
                        push_name(buf, path);
                    }
                }
            }
        }
        ObjectBody::Dataset(ds) => {
            buf.push(KIND_DATASET);
            buf.extend_from_slice(&ds.datatype.serialize());
            buf.extend_from_slice(&ds.dataspace.serialize());
            push_named_type(buf, ds.named_type);
            let stored = match ds.layout {
                Layout::Contiguous => {
                    buf.push(LAYOUT_CONTIGUOUS);
                    ds.data.clone()
                }
                Layout::Deflate { level } => {
                    buf.push(LAYOUT_DEFLATE);
                    buf.push(level.min(9) as u8);
                    deflate_compress(&ds.data, level)?
                }
            };
            buf.extend_from_slice(&(stored.len() as u64).to_le_bytes());
            buf.extend_from_slice(&stored);
        }
        ObjectBody::NamedType { datatype } => {
            buf.push(KIND_NAMED_TYPE);
            buf.extend_from_slice(&datatype.serialize());
        }
    }

    buf.extend_from_slice(&(object.attributes.len() as u32).to_le_bytes());
    for attr in &object.attributes {
        push_name(buf, &attr.name);
        push_named_type(buf, attr.named_type);
        buf.extend_from_slice(&attr.datatype.serialize());
        buf.extend_from_slice(&attr.dataspace.serialize());
        buf.extend_from_slice(&(attr.data.len() as u32).to_le_bytes());
        buf.extend_from_slice(&attr.data);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::DatatypeByteOrder;

    fn sample() -> Container {
        let mut root = Object::group();
        root.attributes.push(Attribute {
            name: "version".into(),
            datatype: Datatype::integer(4, true, DatatypeByteOrder::LittleEndian),
            dataspace: Dataspace::scalar(),
            data: 3i32.to_le_bytes().to_vec(),
            named_type: None,
        });
        if let ObjectBody::Group { links } = &mut root.body {
            links.insert("values".into(), LinkTarget::Hard(ObjectId(2)));
            links.insert("alias".into(), LinkTarget::Soft("/values".into()));
        }
        let values = Object {
            body: ObjectBody::Dataset(DatasetBody {
                datatype: Datatype::float64(DatatypeByteOrder::LittleEndian),
                dataspace: Dataspace::simple(&[64]),
                layout: Layout::Deflate { level: 6 },
                data: vec![0u8; 512],
                named_type: None,
            }),
            attributes: Vec::new(),
        };
        let mut objects = BTreeMap::new();
        objects.insert(ObjectId(1), root);
        objects.insert(ObjectId(2), values);
        Container {
            header: Header {
                file_number: 42,
                root: ObjectId(1),
                next_id: 3,
                userblock: 0,
            },
            objects,
        }
    }

    #[test]
    fn signature_at_offset_0() {
        let mut data = vec![0u8; 64];
        data[..8].copy_from_slice(&SIGNATURE);
        assert_eq!(find_signature(&data).unwrap(), 0);
    }

    #[test]
    fn signature_at_offset_1024() {
        let mut data = vec![0u8; 2048];
        data[1024..1032].copy_from_slice(&SIGNATURE);
        assert_eq!(find_signature(&data).unwrap(), 1024);
    }

    #[test]
    fn signature_not_at_odd_offset() {
        let mut data = vec![0u8; 1024];
        data[100..108].copy_from_slice(&SIGNATURE);
        assert!(matches!(
            find_signature(&data),
            Err(FormatError::SignatureNotFound)
        ));
    }

    #[test]
    fn decode_encoded_container() {
        let container = sample();
        let bytes = encode(&container).unwrap();
        assert!(bytes.len() < 512, "deflate layout should shrink zeros");
        assert_eq!(decode(&bytes).unwrap(), container);
    }

    #[test]
    fn user_block_is_skipped() {
        let mut container = sample();
        container.header.userblock = 512;
        let bytes = encode(&container).unwrap();
        assert_eq!(find_signature(&bytes).unwrap(), 512);
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.header.userblock, 512);
    }

    #[test]
    fn overflowing_extents_are_rejected() {
        let mut container = sample();
        if let Some(Object {
            body: ObjectBody::Dataset(ds),
            ..
        }) = container.objects.get_mut(&ObjectId(2))
        {
            ds.dataspace = Dataspace::simple(&[u64::MAX, 4]);
            ds.layout = Layout::Contiguous;
            ds.data.clear();
        }
        let bytes = encode(&container).unwrap();
        assert!(matches!(
            decode(&bytes),
            Err(FormatError::SizeOverflow { .. })
        ));
    }

    #[test]
    fn lengths_past_the_end_are_eof() {
        let mut cur = Cursor {
            data: &[1, 2, 3],
            pos: 2,
        };
        assert!(matches!(
            cur.take(usize::MAX),
            Err(FormatError::UnexpectedEof { expected: usize::MAX, available: 3 })
        ));
        assert_eq!(cur.take(1).unwrap(), &[3]);
    }

    #[test]
    fn future_version_is_rejected() {
        let mut bytes = encode(&sample()).unwrap();
        bytes[8] = 9;
        assert!(matches!(
            decode(&bytes),
            Err(FormatError::UnsupportedVersion(9))
        ));
    }
}
