// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Precision tags and the static type maps that tie them to native memory.
//!
//! ## Why This Module Exists
//!
//! Three vocabularies describe the same element kind:
//!
//! 1. **Native element tags**: the C type names the native module reports
//!    (`uint8_t`, `float`, ...)
//! 2. **Precision tags**: the names JavaScript callers use (`uint8`, `float32`, ...)
//! 3. **Typed array kinds / heap segments**: the JS array class holding the
//!    buffer and the typed view over linear memory used to read or write it
//!
//! Address arithmetic depends on picking the right segment, so every lookup
//! goes through this module rather than being repeated at call sites.
//!
//! ## Design Decisions
//!
//! - **Const tables**: the maps are `const` arrays fixed at compile time. There
//!   is no registration and no locking on reads.
//! - **Total mapping**: every [`Precision`] has an [`ArrayKind`] and every
//!   [`ArrayKind`] has a [`HeapSegment`], so `segment()` never fails.

use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Numeric element kind of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Precision {
    /// Signed 8-bit integer.
    Int8,
    /// Unsigned 8-bit integer.
    Uint8,
    /// Unsigned 8-bit integer with clamping conversion (canvas pixel data).
    Uint8Clamped,
    /// Signed 16-bit integer.
    Int16,
    /// Unsigned 16-bit integer.
    Uint16,
    /// Signed 32-bit integer.
    Int32,
    /// Unsigned 32-bit integer.
    Uint32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 64-bit integer.
    Uint64,
    /// IEEE 754 single precision.
    Float32,
    /// IEEE 754 double precision.
    Float64,
}

/// JavaScript typed array class backing a tensor buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayKind {
    /// `Int8Array`
    Int8Array,
    /// `Uint8Array`
    Uint8Array,
    /// `Uint8ClampedArray`
    Uint8ClampedArray,
    /// `Int16Array`
    Int16Array,
    /// `Uint16Array`
    Uint16Array,
    /// `Int32Array`
    Int32Array,
    /// `Uint32Array`
    Uint32Array,
    /// `BigInt64Array`
    BigInt64Array,
    /// `BigUint64Array`
    BigUint64Array,
    /// `Float32Array`
    Float32Array,
    /// `Float64Array`
    Float64Array,
}

/// Typed view over the native module's linear memory.
///
/// A segment is addressed in elements of its own width: byte address `p`
/// is element `p >> shift()` of the segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeapSegment {
    /// `HEAP8` (i8)
    Heap8,
    /// `HEAPU8` (u8)
    HeapU8,
    /// `HEAP16` (i16)
    Heap16,
    /// `HEAPU16` (u16)
    HeapU16,
    /// `HEAP32` (i32)
    Heap32,
    /// `HEAPU32` (u32)
    HeapU32,
    /// `HEAP64` (i64)
    Heap64,
    /// `HEAPU64` (u64)
    HeapU64,
    /// `HEAPF32` (f32)
    HeapF32,
    /// `HEAPF64` (f64)
    HeapF64,
}

/// Native element tag to precision.
const NATIVE_TYPES: [(&str, Precision); 10] = [
    ("uint8_t", Precision::Uint8),
    ("int8_t", Precision::Int8),
    ("uint16_t", Precision::Uint16),
    ("int16_t", Precision::Int16),
    ("uint32_t", Precision::Uint32),
    ("int32_t", Precision::Int32),
    ("uint64_t", Precision::Uint64),
    ("int64_t", Precision::Int64),
    ("float", Precision::Float32),
    ("double", Precision::Float64),
];

/// Every precision, in declaration order.
pub const ALL_PRECISIONS: [Precision; 11] = [
    Precision::Int8,
    Precision::Uint8,
    Precision::Uint8Clamped,
    Precision::Int16,
    Precision::Uint16,
    Precision::Int32,
    Precision::Uint32,
    Precision::Int64,
    Precision::Uint64,
    Precision::Float32,
    Precision::Float64,
];

/// Precision used when `infer` receives a raw numeric array.
pub const DEFAULT_PRECISION: Precision = Precision::Uint8;

impl Precision {
    /// Look up the precision for a native element tag.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownType`] if the tag is not in the table.
    ///
    /// # Example
    ///
    /// ```rust
    /// use openvinojs_core::Precision;
    ///
    /// assert_eq!(Precision::from_native_tag("float").unwrap(), Precision::Float32);
    /// assert!(Precision::from_native_tag("bfloat16").is_err());
    /// ```
    pub fn from_native_tag(tag: &str) -> Result<Self> {
        NATIVE_TYPES
            .iter()
            .find(|(native, _)| *native == tag)
            .map(|&(_, precision)| precision)
            .ok_or_else(|| CoreError::unknown_type(format!("native element type '{tag}'")))
    }

    /// Native element tag reported for this precision.
    ///
    /// `Uint8Clamped` only differs on the JS side; natively it is `uint8_t`.
    #[must_use]
    pub fn native_tag(self) -> &'static str {
        match self {
            Self::Int8 => "int8_t",
            Self::Uint8 | Self::Uint8Clamped => "uint8_t",
            Self::Int16 => "int16_t",
            Self::Uint16 => "uint16_t",
            Self::Int32 => "int32_t",
            Self::Uint32 => "uint32_t",
            Self::Int64 => "int64_t",
            Self::Uint64 => "uint64_t",
            Self::Float32 => "float",
            Self::Float64 => "double",
        }
    }

    /// JS-facing name, e.g. `"float32"`.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Uint8 => "uint8",
            Self::Uint8Clamped => "uint8c",
            Self::Int16 => "int16",
            Self::Uint16 => "uint16",
            Self::Int32 => "int32",
            Self::Uint32 => "uint32",
            Self::Int64 => "int64",
            Self::Uint64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Typed array kind holding data of this precision.
    #[must_use]
    pub fn array_kind(self) -> ArrayKind {
        match self {
            Self::Int8 => ArrayKind::Int8Array,
            Self::Uint8 => ArrayKind::Uint8Array,
            Self::Uint8Clamped => ArrayKind::Uint8ClampedArray,
            Self::Int16 => ArrayKind::Int16Array,
            Self::Uint16 => ArrayKind::Uint16Array,
            Self::Int32 => ArrayKind::Int32Array,
            Self::Uint32 => ArrayKind::Uint32Array,
            Self::Int64 => ArrayKind::BigInt64Array,
            Self::Uint64 => ArrayKind::BigUint64Array,
            Self::Float32 => ArrayKind::Float32Array,
            Self::Float64 => ArrayKind::Float64Array,
        }
    }

    /// Heap segment used to marshal data of this precision.
    #[must_use]
    pub fn segment(self) -> HeapSegment {
        self.array_kind().segment()
    }

    /// Size in bytes of one element.
    #[must_use]
    pub fn bytes_per_element(self) -> usize {
        self.array_kind().bytes_per_element()
    }

    /// Check if this precision is a floating-point type.
    #[must_use]
    pub fn is_floating_point(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }
}

impl FromStr for Precision {
    type Err = CoreError;

    /// Parse a JS precision name. Short aliases (`f32`, `u8`, ...) are accepted.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "int8" | "i8" => Ok(Self::Int8),
            "uint8" | "u8" => Ok(Self::Uint8),
            "uint8c" | "u8c" => Ok(Self::Uint8Clamped),
            "int16" | "i16" => Ok(Self::Int16),
            "uint16" | "u16" => Ok(Self::Uint16),
            "int32" | "i32" => Ok(Self::Int32),
            "uint32" | "u32" => Ok(Self::Uint32),
            "int64" | "i64" => Ok(Self::Int64),
            "uint64" | "u64" => Ok(Self::Uint64),
            "float32" | "f32" | "float" => Ok(Self::Float32),
            "float64" | "f64" | "double" => Ok(Self::Float64),
            _ => Err(CoreError::unknown_type(format!(
                "precision '{s}'. Supported: {}",
                supported_precisions().join(", ")
            ))),
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl ArrayKind {
    /// `BYTES_PER_ELEMENT` of the typed array class.
    #[must_use]
    pub fn bytes_per_element(self) -> usize {
        self.segment().element_size()
    }

    /// Heap segment whose view matches this array kind.
    #[must_use]
    pub fn segment(self) -> HeapSegment {
        match self {
            Self::Int8Array => HeapSegment::Heap8,
            Self::Uint8Array | Self::Uint8ClampedArray => HeapSegment::HeapU8,
            Self::Int16Array => HeapSegment::Heap16,
            Self::Uint16Array => HeapSegment::HeapU16,
            Self::Int32Array => HeapSegment::Heap32,
            Self::Uint32Array => HeapSegment::HeapU32,
            Self::BigInt64Array => HeapSegment::Heap64,
            Self::BigUint64Array => HeapSegment::HeapU64,
            Self::Float32Array => HeapSegment::HeapF32,
            Self::Float64Array => HeapSegment::HeapF64,
        }
    }

    /// JS class name, e.g. `"Float32Array"`.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Int8Array => "Int8Array",
            Self::Uint8Array => "Uint8Array",
            Self::Uint8ClampedArray => "Uint8ClampedArray",
            Self::Int16Array => "Int16Array",
            Self::Uint16Array => "Uint16Array",
            Self::Int32Array => "Int32Array",
            Self::Uint32Array => "Uint32Array",
            Self::BigInt64Array => "BigInt64Array",
            Self::BigUint64Array => "BigUint64Array",
            Self::Float32Array => "Float32Array",
            Self::Float64Array => "Float64Array",
        }
    }
}

impl HeapSegment {
    /// Width in bytes of one segment element.
    #[must_use]
    pub fn element_size(self) -> usize {
        match self {
            Self::Heap8 | Self::HeapU8 => 1,
            Self::Heap16 | Self::HeapU16 => 2,
            Self::Heap32 | Self::HeapU32 | Self::HeapF32 => 4,
            Self::Heap64 | Self::HeapU64 | Self::HeapF64 => 8,
        }
    }

    /// Right shift converting a byte address into a segment index.
    ///
    /// Equal to `log2(element_size())`.
    #[must_use]
    pub fn shift(self) -> u32 {
        self.element_size().trailing_zeros()
    }

    /// Segment index of a byte address.
    #[must_use]
    pub fn index_of(self, ptr: usize) -> usize {
        ptr >> self.shift()
    }

    /// Segment label as exposed by the native module, e.g. `"HEAPF32"`.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Heap8 => "HEAP8",
            Self::HeapU8 => "HEAPU8",
            Self::Heap16 => "HEAP16",
            Self::HeapU16 => "HEAPU16",
            Self::Heap32 => "HEAP32",
            Self::HeapU32 => "HEAPU32",
            Self::Heap64 => "HEAP64",
            Self::HeapU64 => "HEAPU64",
            Self::HeapF32 => "HEAPF32",
            Self::HeapF64 => "HEAPF64",
        }
    }
}

impl fmt::Display for HeapSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Get all supported precision names.
#[must_use]
pub fn supported_precisions() -> Vec<&'static str> {
    ALL_PRECISIONS.iter().map(|p| p.name()).collect()
}

/// Native element tags understood by [`Precision::from_native_tag`].
#[must_use]
pub fn native_tags() -> Vec<&'static str> {
    NATIVE_TYPES.iter().map(|&(tag, _)| tag).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_lookup() {
        assert_eq!(Precision::from_native_tag("uint8_t").unwrap(), Precision::Uint8);
        assert_eq!(Precision::from_native_tag("int16_t").unwrap(), Precision::Int16);
        assert_eq!(Precision::from_native_tag("double").unwrap(), Precision::Float64);
        assert!(matches!(
            Precision::from_native_tag("half"),
            Err(CoreError::UnknownType(_))
        ));
    }

    #[test]
    fn test_maps_are_consistent() {
        // Every native tag resolves all the way to a segment whose width matches
        for tag in native_tags() {
            let precision = Precision::from_native_tag(tag).unwrap();
            let kind = precision.array_kind();
            assert_eq!(kind.segment().element_size(), kind.bytes_per_element());
            assert_eq!(precision.native_tag(), tag);
        }
    }

    #[test]
    fn test_segment_shift() {
        assert_eq!(HeapSegment::HeapU8.shift(), 0);
        assert_eq!(HeapSegment::Heap16.shift(), 1);
        assert_eq!(HeapSegment::HeapU32.shift(), 2);
        assert_eq!(HeapSegment::HeapF64.shift(), 3);
        assert_eq!(HeapSegment::HeapF32.index_of(64), 16);
        assert_eq!(HeapSegment::HeapF64.index_of(64), 8);
    }

    #[test]
    fn test_clamped_shares_u8_segment() {
        assert_eq!(Precision::Uint8Clamped.segment(), HeapSegment::HeapU8);
        assert_eq!(Precision::Uint8Clamped.native_tag(), "uint8_t");
        assert_eq!(Precision::Uint8Clamped.array_kind().name(), "Uint8ClampedArray");
    }

    #[test]
    fn test_parse_precision() {
        assert_eq!("float32".parse::<Precision>().unwrap(), Precision::Float32);
        assert_eq!("F32".parse::<Precision>().unwrap(), Precision::Float32);
        assert_eq!("uint8c".parse::<Precision>().unwrap(), Precision::Uint8Clamped);
        assert!("bf16".parse::<Precision>().is_err());

        for name in supported_precisions() {
            let precision: Precision = name.parse().unwrap();
            assert_eq!(precision.name(), name);
        }
    }
}
