// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Tensor dimension sequences.
//!
//! A [`Shape`] stores its dimensions as `u32`, the element kind of a
//! `Uint32Array`. That is also the kind written to native memory through the
//! `HEAPU32` segment when a shape crosses the boundary.
//!
//! ## Loose Input
//!
//! JavaScript hands over dimensions as plain numbers. Fractional values are
//! truncated toward zero (`224.8` becomes `224`). Values that are not numbers
//! at all, or could never be a dimension (NaN, infinite, negative, wider than
//! `u32`), are rejected with [`CoreError::InvalidDimension`].

use std::fmt;

use crate::error::{CoreError, Result};
use crate::precision::{ArrayKind, HeapSegment};

/// Storage element kind of a shape.
pub const SHAPE_ARRAY_KIND: ArrayKind = ArrayKind::Uint32Array;

/// Heap segment used to marshal shape dimensions.
pub const SHAPE_SEGMENT: HeapSegment = HeapSegment::HeapU32;

/// A single loosely-typed dimension value as received from a dynamic caller.
#[derive(Debug, Clone, PartialEq)]
pub enum DimensionValue {
    /// A JS number.
    Number(f64),
    /// A JS string. Never coerced, even when it looks numeric.
    Text(String),
    /// A JS boolean.
    Bool(bool),
    /// `null` / `undefined`.
    Null,
}

impl From<f64> for DimensionValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<u32> for DimensionValue {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for DimensionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Ordered, immutable sequence of dimension extents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Shape {
    dims: Vec<u32>,
}

impl Shape {
    /// Build a shape from JS numbers, truncating fractional values.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDimension`] for NaN, infinite, negative
    /// or out-of-range values.
    ///
    /// # Example
    ///
    /// ```rust
    /// use openvinojs_core::Shape;
    ///
    /// let shape = Shape::new(&[1.0, 3.0, 224.8, 224.4]).unwrap();
    /// assert_eq!(shape.data(), &[1, 3, 224, 224]);
    /// ```
    pub fn new(dims: &[f64]) -> Result<Self> {
        let dims = dims
            .iter()
            .enumerate()
            .map(|(index, &value)| coerce_dimension(index, value))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { dims })
    }

    /// Build a shape from an existing typed integer sequence.
    #[must_use]
    pub fn from_dims(dims: &[u32]) -> Self {
        Self {
            dims: dims.to_vec(),
        }
    }

    /// Build a shape from dynamically-typed values.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDimension`] if any value is not a number,
    /// or is a number [`Shape::new`] would reject.
    pub fn from_values(values: &[DimensionValue]) -> Result<Self> {
        let dims = values
            .iter()
            .enumerate()
            .map(|(index, value)| match value {
                DimensionValue::Number(n) => coerce_dimension(index, *n),
                other => Err(CoreError::invalid_dimension(
                    index,
                    format!("passed array must contain only numbers, got {other:?}"),
                )),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { dims })
    }

    /// Number of dimensions.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dims.len()
    }

    /// The dimension sequence.
    #[must_use]
    pub fn data(&self) -> &[u32] {
        &self.dims
    }

    /// Product of all dimensions, saturating at `usize::MAX`.
    ///
    /// An empty shape yields 1 (a scalar). Callers that consider a
    /// zero-rank shape invalid must check [`Shape::dim`] themselves.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.checked_element_count().unwrap_or(usize::MAX)
    }

    /// Product of all dimensions, or `None` if it overflows `usize`.
    #[must_use]
    pub fn checked_element_count(&self) -> Option<usize> {
        self.dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d as usize))
    }

    /// Product of all dimensions as a [`Result`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDimension`] naming the first dimension at
    /// which the product overflows.
    pub fn try_element_count(&self) -> Result<usize> {
        let mut count = 1usize;
        for (index, &d) in self.dims.iter().enumerate() {
            count = count.checked_mul(d as usize).ok_or_else(|| {
                CoreError::invalid_dimension(index, "element count overflows")
            })?;
        }
        Ok(count)
    }

    /// Consume the shape and return its dimensions.
    #[must_use]
    pub fn into_dims(self) -> Vec<u32> {
        self.dims
    }
}

fn coerce_dimension(index: usize, value: f64) -> Result<u32> {
    if !value.is_finite() {
        return Err(CoreError::invalid_dimension(
            index,
            format!("{value} is not a finite number"),
        ));
    }
    let truncated = value.trunc();
    if truncated < 0.0 {
        return Err(CoreError::invalid_dimension(
            index,
            format!("{value} is negative"),
        ));
    }
    if truncated > f64::from(u32::MAX) {
        return Err(CoreError::invalid_dimension(
            index,
            format!("{value} exceeds the maximum dimension {}", u32::MAX),
        ));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let dim = truncated as u32;
    Ok(dim)
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.dims)
    }
}

impl From<Vec<u32>> for Shape {
    fn from(dims: Vec<u32>) -> Self {
        Self { dims }
    }
}
