// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Common helpers for the TypeScript bindings.
//!
//! Everything here returns `Result<_, String>` so that each binding can wrap
//! the message in its own error type.

// JavaScript numbers and typed-array lengths fit in u32 in practice
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_errors_doc)] // Errors documented in JS docstrings

use crate::error::CoreError;
use crate::logging::LogLevel;
use crate::memory;
use crate::precision::{self, Precision};
use crate::shape::{DimensionValue, Shape};
use crate::tensor::Tensor;

/// Render a core error for JavaScript.
#[must_use]
pub fn js_message(err: &CoreError) -> String {
    err.to_string()
}

/// Parse a JS precision name such as `"float32"`.
pub fn parse_precision(name: &str) -> Result<Precision, String> {
    name.parse::<Precision>().map_err(|e| js_message(&e))
}

/// Build a shape from plain JS numbers.
pub fn shape_from_numbers(dims: &[f64]) -> Result<Shape, String> {
    Shape::new(dims).map_err(|e| js_message(&e))
}

/// Build a shape from loosely-typed JS values.
pub fn shape_from_values(values: &[DimensionValue]) -> Result<Shape, String> {
    Shape::from_values(values).map_err(|e| js_message(&e))
}

/// Build a tensor from a precision name, JS numbers and a shape.
pub fn tensor_from_numbers(precision: &str, data: &[f64], shape: Shape) -> Result<Tensor, String> {
    let precision = parse_precision(precision)?;
    Tensor::new(precision, data, shape).map_err(|e| js_message(&e))
}

/// `BYTES_PER_ELEMENT` of the typed array backing `precision`.
pub fn bytes_per_element(precision: &str) -> Result<u32, String> {
    Ok(parse_precision(precision)?.bytes_per_element() as u32)
}

/// Heap segment label (`"HEAPF32"`, ...) used for `precision`.
pub fn heap_segment(precision: &str) -> Result<&'static str, String> {
    Ok(parse_precision(precision)?.segment().label())
}

/// JS precision name for a native element tag such as `"float"`.
pub fn precision_for_native_type(tag: &str) -> Result<&'static str, String> {
    Precision::from_native_tag(tag)
        .map(Precision::name)
        .map_err(|e| js_message(&e))
}

/// All JS precision names.
#[must_use]
pub fn supported_precisions() -> Vec<&'static str> {
    precision::supported_precisions()
}

/// Bytes a tensor of `shape` and `precision` occupies in native memory.
pub fn estimate_tensor_bytes(shape: &[u32], precision: &str) -> Result<u32, String> {
    let precision = parse_precision(precision)?;
    memory::estimate_tensor_bytes(shape, precision)
        .and_then(|bytes| u32::try_from(bytes).ok())
        .ok_or_else(|| format!("Tensor of shape {shape:?} does not fit in native memory"))
}

/// Parse an optional log level, defaulting to `info`.
pub fn parse_log_level(level: Option<&str>) -> Result<LogLevel, String> {
    let level = level.unwrap_or("info");
    LogLevel::parse(level).ok_or_else(|| {
        format!("Invalid log level: {level}. Use: trace, debug, info, warn, error")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precision_helpers() {
        assert_eq!(bytes_per_element("float64").unwrap(), 8);
        assert_eq!(bytes_per_element("uint8c").unwrap(), 1);
        assert_eq!(heap_segment("int16").unwrap(), "HEAP16");
        assert_eq!(heap_segment("float32").unwrap(), "HEAPF32");
        assert_eq!(precision_for_native_type("uint64_t").unwrap(), "uint64");
        assert!(precision_for_native_type("bfloat16").is_err());
        assert!(bytes_per_element("complex64").is_err());
        assert_eq!(supported_precisions().len(), 11);
    }

    #[test]
    fn test_tensor_from_numbers() {
        let shape = shape_from_numbers(&[2.0, 2.0]).unwrap();
        let tensor = tensor_from_numbers("int8", &[1.0, 2.0, 3.0, 200.0], shape).unwrap();
        assert_eq!(tensor.data().to_f64_vec(), vec![1.0, 2.0, 3.0, -56.0]);

        let shape = shape_from_numbers(&[3.0]).unwrap();
        let err = tensor_from_numbers("int8", &[1.0], shape).unwrap_err();
        assert!(err.contains("shape mismatch"));
    }

    #[test]
    fn test_loose_shape_values() {
        let err = shape_from_values(&[DimensionValue::from("1"), DimensionValue::from(3.0)])
            .unwrap_err();
        assert!(err.contains("passed array must contain only numbers"));
    }

    #[test]
    fn test_estimate_and_log_level() {
        assert_eq!(estimate_tensor_bytes(&[32, 32], "float32").unwrap(), 4096);
        assert!(estimate_tensor_bytes(&[65_536, 65_536], "uint8")
            .unwrap_err()
            .contains("does not fit"));
        assert_eq!(parse_log_level(None).unwrap(), LogLevel::Info);
        assert!(parse_log_level(Some("loud")).is_err());
    }
}
