//! Translation between stored datatypes and portable format specifiers.
//!
//! Stored values may use any byte order, width or string convention. Before
//! a value lands in a [`Node`](crate::Node) its type is *fixed*: replaced by
//! the equivalent native type of the running platform. The fixed type is then
//! named by one of a small set of [`FormatSpecifier`]s.

use std::fmt;
use std::str::FromStr;

use hltree_format::datatype::{Datatype, DatatypeByteOrder, TypeClass};
use hltree_format::native::{c_string, utf8_string, NativeType};
use hltree_format::type_builders::CompoundTypeBuilder;

use crate::error::{Error, Result};
use crate::node::MAX_RANK;
use crate::probe;

/// Portable name of a value's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatSpecifier {
    Char,
    Schar,
    Uchar,
    Short,
    Ushort,
    Int,
    Uint,
    Long,
    Ulong,
    Llong,
    Ullong,
    Float,
    Double,
    Hsize,
    Hssize,
    Herr,
    Hbool,
    String,
    Compound,
    Array,
}

/// Lookup order of [`format_of`]. When native types alias each other the
/// earlier name wins.
const SCALAR_ORDER: [FormatSpecifier; 17] = [
    FormatSpecifier::Schar,
    FormatSpecifier::Uchar,
    FormatSpecifier::Char,
    FormatSpecifier::Short,
    FormatSpecifier::Ushort,
    FormatSpecifier::Int,
    FormatSpecifier::Uint,
    FormatSpecifier::Long,
    FormatSpecifier::Ulong,
    FormatSpecifier::Llong,
    FormatSpecifier::Ullong,
    FormatSpecifier::Float,
    FormatSpecifier::Double,
    FormatSpecifier::Hsize,
    FormatSpecifier::Hssize,
    FormatSpecifier::Herr,
    FormatSpecifier::Hbool,
];

impl FormatSpecifier {
    /// Every specifier, in vocabulary order.
    pub const ALL: [FormatSpecifier; 20] = [
        FormatSpecifier::Char,
        FormatSpecifier::Schar,
        FormatSpecifier::Uchar,
        FormatSpecifier::Short,
        FormatSpecifier::Ushort,
        FormatSpecifier::Int,
        FormatSpecifier::Uint,
        FormatSpecifier::Long,
        FormatSpecifier::Ulong,
        FormatSpecifier::Llong,
        FormatSpecifier::Ullong,
        FormatSpecifier::Float,
        FormatSpecifier::Double,
        FormatSpecifier::Hsize,
        FormatSpecifier::Hssize,
        FormatSpecifier::Herr,
        FormatSpecifier::Hbool,
        FormatSpecifier::String,
        FormatSpecifier::Compound,
        FormatSpecifier::Array,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FormatSpecifier::Char => "char",
            FormatSpecifier::Schar => "schar",
            FormatSpecifier::Uchar => "uchar",
            FormatSpecifier::Short => "short",
            FormatSpecifier::Ushort => "ushort",
            FormatSpecifier::Int => "int",
            FormatSpecifier::Uint => "uint",
            FormatSpecifier::Long => "long",
            FormatSpecifier::Ulong => "ulong",
            FormatSpecifier::Llong => "llong",
            FormatSpecifier::Ullong => "ullong",
            FormatSpecifier::Float => "float",
            FormatSpecifier::Double => "double",
            FormatSpecifier::Hsize => "hsize",
            FormatSpecifier::Hssize => "hssize",
            FormatSpecifier::Herr => "herr",
            FormatSpecifier::Hbool => "hbool",
            FormatSpecifier::String => "string",
            FormatSpecifier::Compound => "compound",
            FormatSpecifier::Array => "array",
        }
    }

    /// The native type behind a scalar specifier; `None` for the
    /// structural ones.
    pub fn native(self) -> Option<NativeType> {
        Some(match self {
            FormatSpecifier::Char => NativeType::Char,
            FormatSpecifier::Schar => NativeType::Schar,
            FormatSpecifier::Uchar => NativeType::Uchar,
            FormatSpecifier::Short => NativeType::Short,
            FormatSpecifier::Ushort => NativeType::Ushort,
            FormatSpecifier::Int => NativeType::Int,
            FormatSpecifier::Uint => NativeType::Uint,
            FormatSpecifier::Long => NativeType::Long,
            FormatSpecifier::Ulong => NativeType::Ulong,
            FormatSpecifier::Llong => NativeType::Llong,
            FormatSpecifier::Ullong => NativeType::Ullong,
            FormatSpecifier::Float => NativeType::Float,
            FormatSpecifier::Double => NativeType::Double,
            FormatSpecifier::Hsize => NativeType::Hsize,
            FormatSpecifier::Hssize => NativeType::Hssize,
            FormatSpecifier::Herr => NativeType::Herr,
            FormatSpecifier::Hbool => NativeType::Hbool,
            FormatSpecifier::String | FormatSpecifier::Compound | FormatSpecifier::Array => {
                return None
            }
        })
    }
}

impl fmt::Display for FormatSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatSpecifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FormatSpecifier::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| Error::UnknownFormat(s.to_string()))
    }
}

fn align_up(offset: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        offset
    } else {
        offset.div_ceil(alignment).saturating_mul(alignment)
    }
}

/// Native equivalent of a stored datatype.
///
/// Integers and floats take the smallest native type wide enough for the
/// stored size, strings keep their size and padding, compounds are rebuilt
/// member by member with aligned offsets. Enumeration, time and reference
/// types have no native equivalent.
pub fn fix_type(stored: &Datatype) -> Result<Datatype> {
    match stored {
        Datatype::FixedPoint { size, signed, .. } => {
            Ok(NativeType::integer_for_size(*size as usize, *signed).datatype())
        }
        Datatype::FloatingPoint { size, .. } => {
            Ok(NativeType::float_for_size(*size as usize).datatype())
        }
        Datatype::String { size, padding, .. } => {
            let candidates = [c_string(*size), utf8_string(*size)].map(|c| match c {
                Datatype::String { size, charset, .. } => Datatype::String {
                    size,
                    padding: *padding,
                    charset,
                },
                other => other,
            });
            probe::first_equal(stored, candidates.into_iter().map(|c| (c.clone(), c)))
                .ok_or(Error::UnsupportedCharset)
        }
        Datatype::Compound { members, .. } => fix_compound(members),
        Datatype::Array {
            base_type,
            dimensions,
        } => Ok(Datatype::array(fix_type(base_type)?, dimensions.clone())),
        Datatype::Opaque { .. } => Ok(stored.clone()),
        Datatype::BitField {
            size,
            bit_precision,
            ..
        } => Ok(Datatype::BitField {
            size: *size,
            byte_order: DatatypeByteOrder::LittleEndian,
            bit_offset: 0,
            bit_precision: *bit_precision,
        }),
        Datatype::Enumeration { .. } | Datatype::Time { .. } | Datatype::Reference { .. } => {
            Err(Error::UnsupportedClass(stored.class()))
        }
    }
}

fn fix_compound(members: &[hltree_format::datatype::CompoundMember]) -> Result<Datatype> {
    let mut builder = CompoundTypeBuilder::new();
    let mut running = 0u64;
    for member in members {
        let member_error = |reason: String| Error::CompoundMember {
            name: member.name.clone(),
            reason,
        };
        let fixed = fix_type(&member.datatype).map_err(|e| member_error(e.to_string()))?;
        let (element_size, count) = match &fixed {
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
                let count = dimensions
                    .iter()
                    .fold(1u64, |acc, &d| acc.saturating_mul(u64::from(d)));
                (base_type.type_size() as u64, count)
            }
            other => (other.type_size() as u64, 1),
        };
        let offset = align_up(running, element_size);
        running = offset.saturating_add(count.saturating_mul(element_size));
        builder = builder
            .insert(&member.name, offset, fixed)
            .map_err(|e| member_error(e.to_string()))?;
    }
    Ok(builder.build())
}

/// Format specifier naming a fixed datatype.
pub fn format_of(fixed: &Datatype) -> Result<FormatSpecifier> {
    match fixed.class() {
        TypeClass::String => Ok(FormatSpecifier::String),
        TypeClass::Compound => Ok(FormatSpecifier::Compound),
        TypeClass::Array => Ok(FormatSpecifier::Array),
        class => probe::first_equal(
            fixed,
            SCALAR_ORDER
                .into_iter()
                .filter_map(|f| f.native().map(|n| (f, n.datatype()))),
        )
        .ok_or(Error::UnrecognizedType(class)),
    }
}

/// Native datatype of a scalar format name.
///
/// The structural names (`string`, `compound`, `array`) have dedicated
/// constructors and are rejected here.
pub fn type_of_format(name: &str) -> Result<Datatype> {
    let format: FormatSpecifier = name.parse()?;
    format
        .native()
        .map(NativeType::datatype)
        .ok_or(Error::NoScalarType(format))
}

/// Native byte size of a scalar format; `None` for structural or unknown
/// names.
pub fn format_size(name: &str) -> Option<usize> {
    name.parse::<FormatSpecifier>()
        .ok()
        .and_then(FormatSpecifier::native)
        .map(NativeType::size)
}

/// True for every name in the format vocabulary.
pub fn is_format_supported(name: &str) -> bool {
    name.parse::<FormatSpecifier>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hltree_format::datatype::{CharacterSet, StringPadding};
    use proptest::prelude::*;

    #[test]
    fn integers_widen_to_native() {
        let be3 = Datatype::integer(3, true, DatatypeByteOrder::BigEndian);
        assert_eq!(fix_type(&be3).unwrap(), NativeType::Int.datatype());
        let u1 = Datatype::integer(1, false, DatatypeByteOrder::BigEndian);
        assert_eq!(fix_type(&u1).unwrap(), NativeType::Uchar.datatype());
        assert_eq!(
            format_of(&fix_type(&u1).unwrap()).unwrap(),
            FormatSpecifier::Uchar
        );
    }

    #[test]
    fn floats_pick_by_size() {
        let be = Datatype::float32(DatatypeByteOrder::BigEndian);
        assert_eq!(fix_type(&be).unwrap(), NativeType::Float.datatype());
        let wide = Datatype::float_extended(DatatypeByteOrder::LittleEndian);
        assert_eq!(fix_type(&wide).unwrap(), NativeType::Ldouble.datatype());
    }

    #[test]
    fn strings_keep_size_and_padding() {
        let s = Datatype::string(12, StringPadding::SpacePad, CharacterSet::Utf8);
        assert_eq!(fix_type(&s).unwrap(), s);
        let odd = Datatype::string(12, StringPadding::NullPad, CharacterSet::Reserved(5));
        assert!(matches!(fix_type(&odd), Err(Error::UnsupportedCharset)));
    }

    #[test]
    fn unsupported_classes() {
        assert!(matches!(
            fix_type(&Datatype::object_reference()),
            Err(Error::UnsupportedClass(TypeClass::Reference))
        ));
        let time = Datatype::Time {
            size: 4,
            bit_precision: 32,
        };
        assert!(fix_type(&time).is_err());
    }

    #[test]
    fn bitfields_become_little_endian() {
        let bits = Datatype::BitField {
            size: 2,
            byte_order: DatatypeByteOrder::BigEndian,
            bit_offset: 3,
            bit_precision: 9,
        };
        assert_eq!(
            fix_type(&bits).unwrap(),
            Datatype::BitField {
                size: 2,
                byte_order: DatatypeByteOrder::LittleEndian,
                bit_offset: 0,
                bit_precision: 9,
            }
        );
    }

    #[test]
    fn compound_offsets_are_realigned() {
        let stored = CompoundTypeBuilder::new()
            .field("c", Datatype::integer(1, true, DatatypeByteOrder::BigEndian))
            .unwrap()
            .field("d", Datatype::float64(DatatypeByteOrder::BigEndian))
            .unwrap()
            .field(
                "v",
                Datatype::array(
                    Datatype::integer(2, false, DatatypeByteOrder::BigEndian),
                    vec![3],
                ),
            )
            .unwrap()
            .build();
        let Datatype::Compound { size, members } = fix_type(&stored).unwrap() else {
            panic!("expected a compound");
        };
        let offsets: Vec<u64> = members.iter().map(|m| m.byte_offset).collect();
        assert_eq!(offsets, vec![0, 8, 16]);
        assert_eq!(size, 22);
    }

    #[test]
    fn compound_with_reference_member_fails() {
        let stored = CompoundTypeBuilder::new()
            .field("r", Datatype::object_reference())
            .unwrap()
            .build();
        assert!(matches!(
            fix_type(&stored),
            Err(Error::CompoundMember { ref name, .. }) if name == "r"
        ));
    }

    #[test]
    fn first_alias_wins() {
        let long = NativeType::Long.datatype();
        assert_eq!(format_of(&long).unwrap(), FormatSpecifier::Long);
        let llong = NativeType::Llong.datatype();
        if llong == long {
            assert_eq!(format_of(&llong).unwrap(), FormatSpecifier::Long);
        }
        assert_eq!(
            format_of(&NativeType::Herr.datatype()).unwrap(),
            FormatSpecifier::Int
        );
    }

    #[test]
    fn extended_float_has_no_name() {
        assert!(matches!(
            format_of(&NativeType::Ldouble.datatype()),
            Err(Error::UnrecognizedType(TypeClass::Float))
        ));
    }

    #[test]
    fn vocabulary_lookups() {
        for f in FormatSpecifier::ALL {
            assert_eq!(f.as_str().parse::<FormatSpecifier>().unwrap(), f);
            assert!(is_format_supported(f.as_str()));
        }
        assert!(!is_format_supported("quad"));
        assert_eq!(format_size("int"), Some(std::mem::size_of::<i32>()));
        assert_eq!(format_size("string"), None);
        assert_eq!(type_of_format("double").unwrap(), NativeType::Double.datatype());
        assert!(matches!(
            type_of_format("compound"),
            Err(Error::NoScalarType(FormatSpecifier::Compound))
        ));
        assert!(matches!(
            type_of_format("bogus"),
            Err(Error::UnknownFormat(_))
        ));
    }

    fn byte_order() -> impl Strategy<Value = DatatypeByteOrder> {
        prop_oneof![
            Just(DatatypeByteOrder::LittleEndian),
            Just(DatatypeByteOrder::BigEndian)
        ]
    }

    fn padding() -> impl Strategy<Value = StringPadding> {
        prop_oneof![
            Just(StringPadding::NullTerminate),
            Just(StringPadding::NullPad),
            Just(StringPadding::SpacePad)
        ]
    }

    proptest! {
        #[test]
        fn fixing_integers_is_idempotent(size in 1u32..=16, signed: bool, order in byte_order()) {
            let once = fix_type(&Datatype::integer(size, signed, order)).unwrap();
            prop_assert_eq!(fix_type(&once).unwrap(), once);
        }

        #[test]
        fn fixing_floats_is_idempotent(wide in 0usize..3, order in byte_order()) {
            let stored = match wide {
                0 => Datatype::float32(order),
                1 => Datatype::float64(order),
                _ => Datatype::float_extended(order),
            };
            let once = fix_type(&stored).unwrap();
            prop_assert_eq!(fix_type(&once).unwrap(), once);
        }

        #[test]
        fn fixing_strings_is_idempotent(size in 1u32..512, pad in padding(), utf8: bool) {
            let charset = if utf8 { CharacterSet::Utf8 } else { CharacterSet::Ascii };
            let once = fix_type(&Datatype::string(size, pad, charset)).unwrap();
            prop_assert_eq!(fix_type(&once).unwrap(), once);
        }
    }
}
