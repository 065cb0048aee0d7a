//! Element-wise conversion between datatypes.
//!
//! Used by every typed read and write: the caller names a source and a
//! destination datatype and receives a freshly allocated buffer in the
//! destination encoding. Integers saturate at the destination range, floats
//! are converted through `f64`, strings are re-padded, compounds are matched
//! by member name and arrays are converted element by element.

use crate::datatype::{Datatype, DatatypeByteOrder, StringPadding};
use crate::error::FormatError;

/// Convert `count` elements of `src` from `from` into `to`.
pub fn convert(
    src: &[u8],
    from: &Datatype,
    to: &Datatype,
    count: usize,
) -> Result<Vec<u8>, FormatError> {
    let src_size = from.type_size();
    let dst_size = to.type_size();
    if src_size.checked_mul(count) != Some(src.len()) {
        return Err(FormatError::DataSizeMismatch {
            expected: src_size.saturating_mul(count),
            actual: src.len(),
        });
    }
    if from == to {
        return Ok(src.to_vec());
    }
    let out_len = dst_size
        .checked_mul(count)
        .ok_or_else(|| FormatError::SizeOverflow {
            dimensions: vec![count as u64],
            element_size: dst_size,
        })?;
    let mut out = vec![0u8; out_len];
    for i in 0..count {
        convert_element(
            &src[i * src_size..(i + 1) * src_size],
            from,
            &mut out[i * dst_size..(i + 1) * dst_size],
            to,
        )?;
    }
    Ok(out)
}

fn unsupported(from: &Datatype, to: &Datatype) -> FormatError {
    FormatError::UnsupportedConversion {
        from: from.class().to_string(),
        to: to.class().to_string(),
    }
}

fn convert_element(
    src: &[u8],
    from: &Datatype,
    dst: &mut [u8],
    to: &Datatype,
) -> Result<(), FormatError> {
    if from == to {
        dst.copy_from_slice(src);
        return Ok(());
    }
    match (from, to) {
        (Datatype::FixedPoint { .. }, Datatype::FixedPoint { .. }) => {
            let v = read_integer(src, from).ok_or_else(|| unsupported(from, to))?;
            write_integer(dst, to, v).ok_or_else(|| unsupported(from, to))
        }
        (Datatype::FloatingPoint { .. }, Datatype::FloatingPoint { .. }) => {
            let v = read_float(src, from).ok_or_else(|| unsupported(from, to))?;
            write_float(dst, to, v).ok_or_else(|| unsupported(from, to))
        }
        (Datatype::FixedPoint { .. }, Datatype::FloatingPoint { .. }) => {
            let v = read_integer(src, from).ok_or_else(|| unsupported(from, to))?;
            write_float(dst, to, v as f64).ok_or_else(|| unsupported(from, to))
        }
        (Datatype::FloatingPoint { .. }, Datatype::FixedPoint { .. }) => {
            let v = read_float(src, from).ok_or_else(|| unsupported(from, to))?;
            // `as` truncates toward zero and saturates; NaN becomes 0
            write_integer(dst, to, v as i128).ok_or_else(|| unsupported(from, to))
        }
        (Datatype::String { padding: src_pad, .. }, Datatype::String { padding: dst_pad, .. }) => {
            write_string(dst, *dst_pad, string_content(src, *src_pad));
            Ok(())
        }
        (
            Datatype::Compound {
                members: src_members,
                ..
            },
            Datatype::Compound {
                members: dst_members,
                ..
            },
        ) => {
            for dm in dst_members {
                let Some(sm) = src_members.iter().find(|m| m.name == dm.name) else {
                    continue;
                };
                let s_off = sm.byte_offset as usize;
                let d_off = dm.byte_offset as usize;
                let s_end = s_off + sm.datatype.type_size();
                let d_end = d_off + dm.datatype.type_size();
                if s_end > src.len() || d_end > dst.len() {
                    return Err(FormatError::InvalidCompoundMember {
                        name: dm.name.clone(),
                        reason: "member extends past the end of its compound".into(),
                    });
                }
                convert_element(
                    &src[s_off..s_end],
                    &sm.datatype,
                    &mut dst[d_off..d_end],
                    &dm.datatype,
                )?;
            }
            Ok(())
        }
        (
            Datatype::Array {
                base_type: src_base,
                ..
            },
            Datatype::Array {
                base_type: dst_base,
                ..
            },
        ) => {
            let src_elem = src_base.type_size();
            let dst_elem = dst_base.type_size();
            if src_elem == 0 || dst_elem == 0 || src.len() / src_elem != dst.len() / dst_elem {
                return Err(unsupported(from, to));
            }
            for (s, d) in src.chunks_exact(src_elem).zip(dst.chunks_exact_mut(dst_elem)) {
                convert_element(s, src_base, d, dst_base)?;
            }
            Ok(())
        }
        (
            Datatype::BitField {
                byte_order: src_order,
                ..
            },
            Datatype::BitField {
                byte_order: dst_order,
                ..
            },
        ) if src.len() == dst.len() => {
            dst.copy_from_slice(src);
            if is_swapped(*src_order, *dst_order) {
                dst.reverse();
            }
            Ok(())
        }
        (Datatype::Opaque { .. }, Datatype::Opaque { .. })
        | (Datatype::Reference { .. }, Datatype::Reference { .. })
        | (Datatype::Enumeration { .. }, Datatype::Enumeration { .. })
        | (Datatype::Time { .. }, Datatype::Time { .. })
            if src.len() == dst.len() =>
        {
            dst.copy_from_slice(src);
            Ok(())
        }
        _ => Err(unsupported(from, to)),
    }
}

fn is_swapped(a: DatatypeByteOrder, b: DatatypeByteOrder) -> bool {
    matches!(
        (a, b),
        (DatatypeByteOrder::LittleEndian, DatatypeByteOrder::BigEndian)
            | (DatatypeByteOrder::BigEndian, DatatypeByteOrder::LittleEndian)
    )
}

/// Copy up to eight bytes into little-endian order.
fn reorder_bytes(bytes: &[u8], order: DatatypeByteOrder) -> Option<[u8; 8]> {
    let len = bytes.len();
    if len > 8 {
        return None;
    }
    let mut buf = [0u8; 8];
    match order {
        DatatypeByteOrder::LittleEndian => buf[..len].copy_from_slice(bytes),
        DatatypeByteOrder::BigEndian => {
            for i in 0..len {
                buf[i] = bytes[len - 1 - i];
            }
        }
        DatatypeByteOrder::Vax => return None,
    }
    Some(buf)
}

fn store_bytes(dst: &mut [u8], le: [u8; 8], order: DatatypeByteOrder) -> Option<()> {
    let len = dst.len();
    if len > 8 {
        return None;
    }
    match order {
        DatatypeByteOrder::LittleEndian => dst.copy_from_slice(&le[..len]),
        DatatypeByteOrder::BigEndian => {
            for i in 0..len {
                dst[i] = le[len - 1 - i];
            }
        }
        DatatypeByteOrder::Vax => return None,
    }
    Some(())
}

fn read_integer(bytes: &[u8], dt: &Datatype) -> Option<i128> {
    let Datatype::FixedPoint {
        byte_order,
        signed,
        bit_offset,
        bit_precision,
        ..
    } = dt
    else {
        return None;
    };
    let raw = u64::from_le_bytes(reorder_bytes(bytes, *byte_order)?);
    let precision = u32::from(*bit_precision).clamp(1, 64);
    let shifted = raw.checked_shr(u32::from(*bit_offset)).unwrap_or(0);
    let mask = if precision == 64 { u64::MAX } else { (1u64 << precision) - 1 };
    let value = shifted & mask;
    if *signed && precision < 64 && value >> (precision - 1) & 1 == 1 {
        Some(value as i128 - (1i128 << precision))
    } else if *signed && precision == 64 {
        Some(value as i64 as i128)
    } else {
        Some(value as i128)
    }
}

fn write_integer(dst: &mut [u8], dt: &Datatype, value: i128) -> Option<()> {
    let Datatype::FixedPoint {
        byte_order,
        signed,
        bit_offset,
        bit_precision,
        ..
    } = dt
    else {
        return None;
    };
    let precision = u32::from(*bit_precision).clamp(1, 64);
    let (min, max) = if *signed {
        (-(1i128 << (precision - 1)), (1i128 << (precision - 1)) - 1)
    } else {
        (0, (1i128 << precision) - 1)
    };
    let clamped = value.clamp(min, max);
    let mask = if precision == 64 { u64::MAX } else { (1u64 << precision) - 1 };
    let raw = ((clamped as u64) & mask)
        .checked_shl(u32::from(*bit_offset))
        .unwrap_or(0);
    store_bytes(dst, raw.to_le_bytes(), *byte_order)
}

fn read_float(bytes: &[u8], dt: &Datatype) -> Option<f64> {
    let order = dt.byte_order()?;
    let buf = reorder_bytes(bytes, order)?;
    match bytes.len() {
        4 => Some(f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64),
        8 => Some(f64::from_le_bytes(buf)),
        _ => None,
    }
}

fn write_float(dst: &mut [u8], dt: &Datatype, value: f64) -> Option<()> {
    let order = dt.byte_order()?;
    let mut le = [0u8; 8];
    match dst.len() {
        4 => le[..4].copy_from_slice(&(value as f32).to_le_bytes()),
        8 => le = value.to_le_bytes(),
        _ => return None,
    }
    store_bytes(dst, le, order)
}

/// The meaningful bytes of a stored string, without its padding.
pub fn string_content(bytes: &[u8], padding: StringPadding) -> &[u8] {
    match padding {
        StringPadding::NullTerminate | StringPadding::NullPad => {
            let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
            &bytes[..end]
        }
        StringPadding::SpacePad => {
            let end = bytes
                .iter()
                .rposition(|&b| b != b' ')
                .map_or(0, |p| p + 1);
            &bytes[..end]
        }
    }
}

fn write_string(dst: &mut [u8], padding: StringPadding, content: &[u8]) {
    let capacity = match padding {
        StringPadding::NullTerminate => dst.len().saturating_sub(1),
        StringPadding::NullPad | StringPadding::SpacePad => dst.len(),
    };
    let n = content.len().min(capacity);
    dst[..n].copy_from_slice(&content[..n]);
    let fill = if padding == StringPadding::SpacePad { b' ' } else { 0 };
    dst[n..].fill(fill);
}
