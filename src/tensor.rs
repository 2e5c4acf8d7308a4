// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Tensor data model: a precision, a flat buffer and a shape.
//!
//! ## Why This Module Exists
//!
//! Callers build tensors from whatever they have: plain JS numbers from a
//! pixel loop, or a typed array already produced elsewhere. [`Tensor::new`]
//! normalizes both into a buffer of the precision's element kind and checks
//! it against the shape once, so the marshaling layer can trust every
//! [`Tensor`] it receives.
//!
//! ## Conversion Semantics
//!
//! Input values are converted the way JavaScript typed array constructors do:
//!
//! - integer kinds truncate toward zero and wrap modulo 2^N; NaN and
//!   infinities become 0
//! - `uint8c` clamps to `[0, 255]` and rounds half to even
//! - `float32` rounds to the nearest `f32`
//!
//! The buffer is always a fresh copy, so a tensor never aliases caller memory.

use crate::error::{CoreError, Result};
use crate::precision::{ArrayKind, Precision};
use crate::shape::Shape;

/// Flat tensor buffer, one variant per typed array kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    /// `Int8Array`
    Int8(Vec<i8>),
    /// `Uint8Array`
    Uint8(Vec<u8>),
    /// `Uint8ClampedArray`
    Uint8Clamped(Vec<u8>),
    /// `Int16Array`
    Int16(Vec<i16>),
    /// `Uint16Array`
    Uint16(Vec<u16>),
    /// `Int32Array`
    Int32(Vec<i32>),
    /// `Uint32Array`
    Uint32(Vec<u32>),
    /// `BigInt64Array`
    Int64(Vec<i64>),
    /// `BigUint64Array`
    Uint64(Vec<u64>),
    /// `Float32Array`
    Float32(Vec<f32>),
    /// `Float64Array`
    Float64(Vec<f64>),
}

/// Apply `$body` to the inner vector of any [`TensorData`] variant.
macro_rules! with_buffer {
    ($data:expr, $buf:ident => $body:expr) => {
        match $data {
            TensorData::Int8($buf) => $body,
            TensorData::Uint8($buf) => $body,
            TensorData::Uint8Clamped($buf) => $body,
            TensorData::Int16($buf) => $body,
            TensorData::Uint16($buf) => $body,
            TensorData::Int32($buf) => $body,
            TensorData::Uint32($buf) => $body,
            TensorData::Int64($buf) => $body,
            TensorData::Uint64($buf) => $body,
            TensorData::Float32($buf) => $body,
            TensorData::Float64($buf) => $body,
        }
    };
}
pub(crate) use with_buffer;

const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn wrap_unsigned(value: f64, modulus: f64) -> u64 {
    if !value.is_finite() {
        return 0;
    }
    value.trunc().rem_euclid(modulus) as u64
}

#[allow(clippy::cast_possible_truncation)]
fn to_int8(v: f64) -> i8 {
    wrap_unsigned(v, 256.0) as u8 as i8
}

#[allow(clippy::cast_possible_truncation)]
fn to_uint8(v: f64) -> u8 {
    wrap_unsigned(v, 256.0) as u8
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_uint8_clamped(v: f64) -> u8 {
    if v.is_nan() {
        return 0;
    }
    v.clamp(0.0, 255.0).round_ties_even() as u8
}

#[allow(clippy::cast_possible_truncation)]
fn to_int16(v: f64) -> i16 {
    wrap_unsigned(v, 65_536.0) as u16 as i16
}

#[allow(clippy::cast_possible_truncation)]
fn to_uint16(v: f64) -> u16 {
    wrap_unsigned(v, 65_536.0) as u16
}

#[allow(clippy::cast_possible_truncation)]
fn to_int32(v: f64) -> i32 {
    wrap_unsigned(v, 4_294_967_296.0) as u32 as i32
}

#[allow(clippy::cast_possible_truncation)]
fn to_uint32(v: f64) -> u32 {
    wrap_unsigned(v, 4_294_967_296.0) as u32
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn to_int64(v: f64) -> i64 {
    if !v.is_finite() {
        return 0;
    }
    let t = v.trunc();
    if (-TWO_POW_63..TWO_POW_63).contains(&t) {
        t as i64
    } else {
        wrap_unsigned(t, TWO_POW_64) as i64
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_uint64(v: f64) -> u64 {
    if !v.is_finite() {
        return 0;
    }
    let t = v.trunc();
    if (0.0..TWO_POW_64).contains(&t) {
        t as u64
    } else if (-TWO_POW_63..0.0).contains(&t) {
        (t as i64) as u64
    } else {
        wrap_unsigned(t, TWO_POW_64)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_float32(v: f64) -> f32 {
    v as f32
}

impl TensorData {
    /// Convert JS numbers into a buffer of the given array kind.
    #[must_use]
    pub fn from_numbers(kind: ArrayKind, values: &[f64]) -> Self {
        fn map<T>(values: &[f64], f: fn(f64) -> T) -> Vec<T> {
            values.iter().map(|&v| f(v)).collect()
        }

        match kind {
            ArrayKind::Int8Array => Self::Int8(map(values, to_int8)),
            ArrayKind::Uint8Array => Self::Uint8(map(values, to_uint8)),
            ArrayKind::Uint8ClampedArray => Self::Uint8Clamped(map(values, to_uint8_clamped)),
            ArrayKind::Int16Array => Self::Int16(map(values, to_int16)),
            ArrayKind::Uint16Array => Self::Uint16(map(values, to_uint16)),
            ArrayKind::Int32Array => Self::Int32(map(values, to_int32)),
            ArrayKind::Uint32Array => Self::Uint32(map(values, to_uint32)),
            ArrayKind::BigInt64Array => Self::Int64(map(values, to_int64)),
            ArrayKind::BigUint64Array => Self::Uint64(map(values, to_uint64)),
            ArrayKind::Float32Array => Self::Float32(map(values, to_float32)),
            ArrayKind::Float64Array => Self::Float64(values.to_vec()),
        }
    }

    /// Zero-filled buffer of the given kind and length.
    #[must_use]
    pub fn zeros(kind: ArrayKind, len: usize) -> Self {
        match kind {
            ArrayKind::Int8Array => Self::Int8(vec![0; len]),
            ArrayKind::Uint8Array => Self::Uint8(vec![0; len]),
            ArrayKind::Uint8ClampedArray => Self::Uint8Clamped(vec![0; len]),
            ArrayKind::Int16Array => Self::Int16(vec![0; len]),
            ArrayKind::Uint16Array => Self::Uint16(vec![0; len]),
            ArrayKind::Int32Array => Self::Int32(vec![0; len]),
            ArrayKind::Uint32Array => Self::Uint32(vec![0; len]),
            ArrayKind::BigInt64Array => Self::Int64(vec![0; len]),
            ArrayKind::BigUint64Array => Self::Uint64(vec![0; len]),
            ArrayKind::Float32Array => Self::Float32(vec![0.0; len]),
            ArrayKind::Float64Array => Self::Float64(vec![0.0; len]),
        }
    }

    /// Copy this buffer into a new buffer of `kind`.
    ///
    /// Same-kind copies and 64-bit integer reinterpretation are exact; every
    /// other conversion goes through the JS number value of each element.
    #[must_use]
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub fn convert(&self, kind: ArrayKind) -> Self {
        match (self, kind) {
            (data, kind) if data.kind() == kind => data.clone(),
            (Self::Uint8(v) | Self::Uint8Clamped(v), ArrayKind::Uint8Array) => {
                Self::Uint8(v.clone())
            }
            (Self::Uint8(v) | Self::Uint8Clamped(v), ArrayKind::Uint8ClampedArray) => {
                Self::Uint8Clamped(v.clone())
            }
            (Self::Int64(v), ArrayKind::BigUint64Array) => {
                Self::Uint64(v.iter().map(|&x| x as u64).collect())
            }
            (Self::Uint64(v), ArrayKind::BigInt64Array) => {
                Self::Int64(v.iter().map(|&x| x as i64).collect())
            }
            (data, kind) => Self::from_numbers(kind, &data.to_f64_vec()),
        }
    }

    /// Typed array kind of this buffer.
    #[must_use]
    pub fn kind(&self) -> ArrayKind {
        match self {
            Self::Int8(_) => ArrayKind::Int8Array,
            Self::Uint8(_) => ArrayKind::Uint8Array,
            Self::Uint8Clamped(_) => ArrayKind::Uint8ClampedArray,
            Self::Int16(_) => ArrayKind::Int16Array,
            Self::Uint16(_) => ArrayKind::Uint16Array,
            Self::Int32(_) => ArrayKind::Int32Array,
            Self::Uint32(_) => ArrayKind::Uint32Array,
            Self::Int64(_) => ArrayKind::BigInt64Array,
            Self::Uint64(_) => ArrayKind::BigUint64Array,
            Self::Float32(_) => ArrayKind::Float32Array,
            Self::Float64(_) => ArrayKind::Float64Array,
        }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        with_buffer!(self, buf => buf.len())
    }

    /// Whether the buffer has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the buffer in bytes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.len() * self.kind().bytes_per_element()
    }

    /// Every element as a JS number.
    ///
    /// 64-bit integers above 2^53 lose precision, as they would in JS.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            Self::Int8(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::Uint8(v) | Self::Uint8Clamped(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::Int16(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::Uint16(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::Int32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::Uint32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::Int64(v) => v.iter().map(|&x| x as f64).collect(),
            Self::Uint64(v) => v.iter().map(|&x| x as f64).collect(),
            Self::Float32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::Float64(v) => v.clone(),
        }
    }
}

/// Tensor data as handed to [`Tensor::new`].
#[derive(Debug, Clone, Copy)]
pub enum TensorSource<'a> {
    /// Loosely-typed JS numbers.
    Numbers(&'a [f64]),
    /// An existing typed buffer.
    Typed(&'a TensorData),
}

impl<'a> From<&'a [f64]> for TensorSource<'a> {
    fn from(values: &'a [f64]) -> Self {
        Self::Numbers(values)
    }
}

impl<'a> From<&'a Vec<f64>> for TensorSource<'a> {
    fn from(values: &'a Vec<f64>) -> Self {
        Self::Numbers(values)
    }
}

impl<'a> From<&'a TensorData> for TensorSource<'a> {
    fn from(data: &'a TensorData) -> Self {
        Self::Typed(data)
    }
}

/// Shape as handed to [`Tensor::new`]: an existing shape or raw dimensions.
#[derive(Debug, Clone)]
pub enum ShapeSource {
    /// A constructed shape.
    Shape(Shape),
    /// Raw JS numbers, validated by [`Shape::new`].
    Dims(Vec<f64>),
}

impl ShapeSource {
    /// Resolve into a [`Shape`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDimension`] for unusable raw dimensions.
    pub fn into_shape(self) -> Result<Shape> {
        match self {
            Self::Shape(shape) => Ok(shape),
            Self::Dims(dims) => Shape::new(&dims),
        }
    }
}

impl From<Shape> for ShapeSource {
    fn from(shape: Shape) -> Self {
        Self::Shape(shape)
    }
}

impl From<&Shape> for ShapeSource {
    fn from(shape: &Shape) -> Self {
        Self::Shape(shape.clone())
    }
}

impl From<&[u32]> for ShapeSource {
    fn from(dims: &[u32]) -> Self {
        Self::Shape(Shape::from_dims(dims))
    }
}

impl<const N: usize> From<[u32; N]> for ShapeSource {
    fn from(dims: [u32; N]) -> Self {
        Self::Shape(Shape::from_dims(&dims))
    }
}

impl From<Vec<f64>> for ShapeSource {
    fn from(dims: Vec<f64>) -> Self {
        Self::Dims(dims)
    }
}

impl From<&[f64]> for ShapeSource {
    fn from(dims: &[f64]) -> Self {
        Self::Dims(dims.to_vec())
    }
}

/// An immutable tensor: precision, owned buffer and shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    precision: Precision,
    data: TensorData,
    shape: Shape,
}

impl Tensor {
    /// Create a tensor, copying `data` into the precision's element kind.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidDimension`] if raw dimensions are unusable
    /// - [`CoreError::ShapeMismatch`] if the data length differs from the
    ///   shape's element count
    ///
    /// # Example
    ///
    /// ```rust
    /// use openvinojs_core::{Precision, Tensor};
    ///
    /// let pixels = vec![0.0; 150_528];
    /// let tensor = Tensor::new(Precision::Float32, &pixels, [1, 3, 224, 224]).unwrap();
    /// assert_eq!(tensor.len(), 150_528);
    ///
    /// let short = vec![0.0; 10];
    /// assert!(Tensor::new(Precision::Float32, &short, [1, 3, 224, 224]).is_err());
    /// ```
    pub fn new<'a>(
        precision: Precision,
        data: impl Into<TensorSource<'a>>,
        shape: impl Into<ShapeSource>,
    ) -> Result<Self> {
        let shape = ShapeSource::into_shape(shape.into())?;
        let kind = precision.array_kind();
        let data: TensorSource<'a> = data.into();
        let data = match data {
            TensorSource::Numbers(values) => TensorData::from_numbers(kind, values),
            TensorSource::Typed(typed) => typed.convert(kind),
        };
        Self::from_parts(precision, data, shape)
    }

    /// Assemble a tensor from an owned buffer without copying.
    ///
    /// The buffer is converted only if its kind differs from the precision's.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidDimension`] if the shape's element count overflows
    /// - [`CoreError::ShapeMismatch`] on a length mismatch
    pub fn from_parts(precision: Precision, data: TensorData, shape: Shape) -> Result<Self> {
        let kind = precision.array_kind();
        let data = if data.kind() == kind {
            data
        } else {
            data.convert(kind)
        };

        let expected = shape.try_element_count()?;
        if data.len() != expected {
            return Err(CoreError::shape_mismatch(
                shape.data(),
                expected,
                data.len(),
            ));
        }

        Ok(Self {
            precision,
            data,
            shape,
        })
    }

    /// Precision tag.
    #[must_use]
    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Flat data buffer.
    #[must_use]
    pub fn data(&self) -> &TensorData {
        &self.data
    }

    /// Shape.
    #[must_use]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the tensor has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size of the data buffer in bytes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.data.byte_len()
    }

    /// Decompose into precision, buffer and shape.
    #[must_use]
    pub fn into_parts(self) -> (Precision, TensorData, Shape) {
        (self.precision, self.data, self.shape)
    }
}
