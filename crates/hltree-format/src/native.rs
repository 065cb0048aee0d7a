//! Datatypes matching the running platform's C types.
//!
//! Sizes and signedness come from `core::ffi`, so `Long` is 8 bytes on LP64
//! targets and 4 bytes on Windows, and `Char` follows the platform's `char`
//! signedness.

use core::ffi::{c_char, c_int, c_long, c_longlong, c_short};
use std::mem::size_of;

use crate::datatype::{CharacterSet, Datatype, DatatypeByteOrder, StringPadding};

/// A native in-memory type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeType {
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
    Ldouble,
    /// Unsigned size type used for dimensions.
    Hsize,
    /// Signed counterpart of `Hsize`.
    Hssize,
    /// Status return type.
    Herr,
    /// Boolean type.
    Hbool,
}

fn int_type(size: usize, signed: bool) -> Datatype {
    Datatype::integer(size as u32, signed, DatatypeByteOrder::native())
}

impl NativeType {
    /// The datatype describing this native type.
    pub fn datatype(self) -> Datatype {
        match self {
            NativeType::Char => int_type(size_of::<c_char>(), c_char::MIN != 0),
            NativeType::Schar => int_type(1, true),
            NativeType::Uchar => int_type(1, false),
            NativeType::Short => int_type(size_of::<c_short>(), true),
            NativeType::Ushort => int_type(size_of::<c_short>(), false),
            NativeType::Int => int_type(size_of::<c_int>(), true),
            NativeType::Uint => int_type(size_of::<c_int>(), false),
            NativeType::Long => int_type(size_of::<c_long>(), true),
            NativeType::Ulong => int_type(size_of::<c_long>(), false),
            NativeType::Llong => int_type(size_of::<c_longlong>(), true),
            NativeType::Ullong => int_type(size_of::<c_longlong>(), false),
            NativeType::Float => Datatype::float32(DatatypeByteOrder::native()),
            NativeType::Double => Datatype::float64(DatatypeByteOrder::native()),
            NativeType::Ldouble => Datatype::float_extended(DatatypeByteOrder::native()),
            NativeType::Hsize => int_type(size_of::<u64>(), false),
            NativeType::Hssize => int_type(size_of::<i64>(), true),
            NativeType::Herr => int_type(size_of::<c_int>(), true),
            NativeType::Hbool => int_type(size_of::<bool>(), false),
        }
    }

    /// Size in bytes of one element.
    pub fn size(self) -> usize {
        self.datatype().type_size()
    }

    /// Smallest native integer at least `size` bytes wide with the given sign.
    pub fn integer_for_size(size: usize, signed: bool) -> NativeType {
        let pick = |s, u| if signed { s } else { u };
        if size <= size_of::<i8>() {
            pick(NativeType::Schar, NativeType::Uchar)
        } else if size <= size_of::<c_short>() {
            pick(NativeType::Short, NativeType::Ushort)
        } else if size <= size_of::<c_int>() {
            pick(NativeType::Int, NativeType::Uint)
        } else if size <= size_of::<c_long>() {
            pick(NativeType::Long, NativeType::Ulong)
        } else {
            pick(NativeType::Llong, NativeType::Ullong)
        }
    }

    /// Smallest native float at least `size` bytes wide.
    pub fn float_for_size(size: usize) -> NativeType {
        if size <= size_of::<f32>() {
            NativeType::Float
        } else if size <= size_of::<f64>() {
            NativeType::Double
        } else {
            NativeType::Ldouble
        }
    }
}

/// C-style string type: ASCII, null terminated.
pub fn c_string(size: u32) -> Datatype {
    Datatype::string(size, StringPadding::NullTerminate, CharacterSet::Ascii)
}

/// UTF-8 string type, null terminated.
pub fn utf8_string(size: u32) -> Datatype {
    Datatype::string(size, StringPadding::NullTerminate, CharacterSet::Utf8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_widths() {
        assert_eq!(NativeType::integer_for_size(1, true), NativeType::Schar);
        assert_eq!(NativeType::integer_for_size(2, false), NativeType::Ushort);
        assert_eq!(NativeType::integer_for_size(3, true), NativeType::Int);
        assert_eq!(NativeType::integer_for_size(4, false), NativeType::Uint);
        assert_eq!(NativeType::Llong.size(), 8);
        assert!(NativeType::integer_for_size(16, true) == NativeType::Llong);
    }

    #[test]
    fn float_widths() {
        assert_eq!(NativeType::float_for_size(2), NativeType::Float);
        assert_eq!(NativeType::float_for_size(8), NativeType::Double);
        assert_eq!(NativeType::float_for_size(10), NativeType::Ldouble);
    }

    #[test]
    fn native_byte_order() {
        let dt = NativeType::Int.datatype();
        assert_eq!(dt.byte_order(), Some(DatatypeByteOrder::native()));
        assert_eq!(NativeType::Hbool.size(), 1);
    }
}
