// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Node.js native bindings via napi-rs.

#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::redundant_closure)]

use napi::bindgen_prelude::*;
use napi_derive::napi;

use super::common;
use crate::logging::{init_logging as rust_init_logging, LogConfig};
use crate::shape::Shape;
use crate::tensor::Tensor;

/// Tensor dimensions, exposed to JavaScript as `Shape`.
#[napi(js_name = "Shape")]
#[derive(Clone)]
pub struct JsShape {
    inner: Shape,
}

#[napi]
impl JsShape {
    #[napi(constructor)]
    pub fn new(dims: Vec<f64>) -> Result<Self> {
        let inner = common::shape_from_numbers(&dims).map_err(|e| Error::from_reason(e))?;
        Ok(Self { inner })
    }

    #[napi(getter)]
    pub fn dim(&self) -> u32 {
        self.inner.dim() as u32
    }

    #[napi(getter)]
    pub fn data(&self) -> Uint32Array {
        Uint32Array::new(self.inner.data().to_vec())
    }

    #[napi(js_name = "elementCount")]
    pub fn element_count(&self) -> f64 {
        self.inner.element_count() as f64
    }

    #[napi(js_name = "toString")]
    pub fn to_js_string(&self) -> String {
        self.inner.to_string()
    }
}

/// Precision-tagged tensor, exposed to JavaScript as `Tensor`.
#[napi(js_name = "Tensor")]
pub struct JsTensor {
    inner: Tensor,
}

#[napi]
impl JsTensor {
    /// `new Tensor(precision, data, dims)` with plain-number dimensions.
    #[napi(constructor)]
    pub fn new(precision: String, data: Vec<f64>, dims: Vec<f64>) -> Result<Self> {
        let shape = common::shape_from_numbers(&dims).map_err(|e| Error::from_reason(e))?;
        Self::build(&precision, &data, shape)
    }

    /// `Tensor.withShape(precision, data, shape)` with an existing `Shape`.
    #[napi(factory, js_name = "withShape")]
    pub fn with_shape(precision: String, data: Vec<f64>, shape: &JsShape) -> Result<Self> {
        Self::build(&precision, &data, shape.inner.clone())
    }

    fn build(precision: &str, data: &[f64], shape: Shape) -> Result<Self> {
        let inner =
            common::tensor_from_numbers(precision, data, shape).map_err(|e| Error::from_reason(e))?;
        Ok(Self { inner })
    }

    #[napi(getter)]
    pub fn precision(&self) -> String {
        self.inner.precision().name().to_string()
    }

    #[napi(getter)]
    pub fn data(&self) -> Vec<f64> {
        self.inner.data().to_f64_vec()
    }

    #[napi(getter)]
    pub fn shape(&self) -> JsShape {
        JsShape {
            inner: self.inner.shape().clone(),
        }
    }

    #[napi(getter, js_name = "byteLength")]
    pub fn byte_length(&self) -> u32 {
        self.inner.byte_len() as u32
    }
}

#[napi]
pub fn supported_precisions() -> Vec<String> {
    common::supported_precisions()
        .into_iter()
        .map(String::from)
        .collect()
}

#[napi]
pub fn bytes_per_element(precision: String) -> Result<u32> {
    common::bytes_per_element(&precision).map_err(|e| Error::from_reason(e))
}

#[napi]
pub fn heap_segment(precision: String) -> Result<String> {
    common::heap_segment(&precision)
        .map(String::from)
        .map_err(|e| Error::from_reason(e))
}

#[napi]
pub fn precision_for_native_type(tag: String) -> Result<String> {
    common::precision_for_native_type(&tag)
        .map(String::from)
        .map_err(|e| Error::from_reason(e))
}

#[napi]
pub fn estimate_tensor_bytes(shape: Vec<u32>, precision: Option<String>) -> Result<u32> {
    let precision = precision.as_deref().unwrap_or("uint8");
    common::estimate_tensor_bytes(&shape, precision).map_err(|e| Error::from_reason(e))
}

#[napi]
pub fn init_logging(
    level: Option<String>,
    timestamps: Option<bool>,
    ansi: Option<bool>,
) -> Result<()> {
    let log_level = common::parse_log_level(level.as_deref()).map_err(|e| Error::from_reason(e))?;

    let config = LogConfig::new()
        .with_level(log_level)
        .with_timestamps(timestamps.unwrap_or(true))
        .with_ansi(ansi.unwrap_or(true));

    rust_init_logging(&config);
    Ok(())
}

#[napi]
pub fn version() -> &'static str {
    crate::VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_napi() {
        let shape = JsShape::new(vec![1.0, 3.0, 224.9, 224.0]).unwrap();
        assert_eq!(shape.dim(), 4);
        assert_eq!(shape.element_count(), 150_528.0);
        assert_eq!(shape.to_js_string(), "[1, 3, 224, 224]");
    }

    #[test]
    fn test_tensor_napi() {
        let tensor = JsTensor::new("uint16".to_string(), vec![1.0, 70_000.0], vec![2.0]).unwrap();
        assert_eq!(tensor.precision(), "uint16");
        assert_eq!(tensor.data(), vec![1.0, 4464.0]);
        assert_eq!(tensor.byte_length(), 4);
        assert!(JsTensor::new("uint16".to_string(), vec![1.0], vec![2.0]).is_err());
    }

    #[test]
    fn test_precision_napi() {
        assert_eq!(bytes_per_element("int64".to_string()).unwrap(), 8);
        assert_eq!(heap_segment("uint8".to_string()).unwrap(), "HEAPU8");
        assert_eq!(precision_for_native_type("float".to_string()).unwrap(), "float32");
        assert_eq!(estimate_tensor_bytes(vec![32, 32], None).unwrap(), 1024);
    }
}
