// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! WebAssembly bindings via wasm-bindgen.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_pass_by_value)]

use wasm_bindgen::prelude::*;

use super::common;
use crate::logging::{init_logging, LogConfig};
use crate::shape::{DimensionValue, Shape};
use crate::tensor::Tensor;

/// Tensor dimensions (WASM version).
#[wasm_bindgen]
#[derive(Clone)]
pub struct ShapeWasm {
    inner: Shape,
}

#[wasm_bindgen]
impl ShapeWasm {
    /// Accepts any JS array; every element must be a number.
    #[wasm_bindgen(constructor)]
    pub fn create(dims: js_sys::Array) -> Result<ShapeWasm, JsError> {
        let values: Vec<DimensionValue> =
            dims.iter().map(|value| dimension_value(&value)).collect();
        let inner = common::shape_from_values(&values).map_err(|e| JsError::new(&e))?;
        Ok(Self { inner })
    }

    #[wasm_bindgen(getter)]
    pub fn dim(&self) -> u32 {
        self.inner.dim() as u32
    }

    #[wasm_bindgen(getter)]
    pub fn data(&self) -> Vec<u32> {
        self.inner.data().to_vec()
    }

    #[wasm_bindgen(js_name = toString)]
    pub fn to_js_string(&self) -> String {
        self.inner.to_string()
    }
}

fn dimension_value(value: &JsValue) -> DimensionValue {
    if let Some(number) = value.as_f64() {
        DimensionValue::Number(number)
    } else if let Some(text) = value.as_string() {
        DimensionValue::Text(text)
    } else if let Some(flag) = value.as_bool() {
        DimensionValue::Bool(flag)
    } else {
        DimensionValue::Null
    }
}

/// Precision-tagged tensor (WASM version).
#[wasm_bindgen]
pub struct TensorWasm {
    inner: Tensor,
}

#[wasm_bindgen]
impl TensorWasm {
    #[wasm_bindgen(constructor)]
    pub fn create(
        precision: String,
        data: &[f64],
        shape: &ShapeWasm,
    ) -> Result<TensorWasm, JsError> {
        let inner = common::tensor_from_numbers(&precision, data, shape.inner.clone())
            .map_err(|e| JsError::new(&e))?;
        Ok(Self { inner })
    }

    #[wasm_bindgen(getter)]
    pub fn precision(&self) -> String {
        self.inner.precision().name().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn data(&self) -> Vec<f64> {
        self.inner.data().to_f64_vec()
    }

    #[wasm_bindgen(getter)]
    pub fn shape(&self) -> ShapeWasm {
        ShapeWasm {
            inner: self.inner.shape().clone(),
        }
    }

    #[wasm_bindgen(getter, js_name = byteLength)]
    pub fn byte_length(&self) -> u32 {
        self.inner.byte_len() as u32
    }
}

#[wasm_bindgen(js_name = supportedPrecisionsWasm)]
pub fn supported_precisions_wasm() -> js_sys::Array {
    let arr = js_sys::Array::new();
    for precision in common::supported_precisions() {
        arr.push(&JsValue::from_str(precision));
    }
    arr
}

#[wasm_bindgen(js_name = bytesPerElementWasm)]
pub fn bytes_per_element_wasm(precision: String) -> Result<u32, JsError> {
    common::bytes_per_element(&precision).map_err(|e| JsError::new(&e))
}

#[wasm_bindgen(js_name = heapSegmentWasm)]
pub fn heap_segment_wasm(precision: String) -> Result<String, JsError> {
    common::heap_segment(&precision)
        .map(String::from)
        .map_err(|e| JsError::new(&e))
}

#[wasm_bindgen(js_name = precisionForNativeTypeWasm)]
pub fn precision_for_native_type_wasm(tag: String) -> Result<String, JsError> {
    common::precision_for_native_type(&tag)
        .map(String::from)
        .map_err(|e| JsError::new(&e))
}

#[wasm_bindgen(js_name = estimateTensorBytesWasm)]
pub fn estimate_tensor_bytes_wasm(
    shape: &[u32],
    precision: Option<String>,
) -> Result<u32, JsError> {
    let precision = precision.as_deref().unwrap_or("uint8");
    common::estimate_tensor_bytes(shape, precision).map_err(|e| JsError::new(&e))
}

#[wasm_bindgen(js_name = versionWasm)]
pub fn version_wasm() -> String {
    crate::VERSION.to_string()
}

/// Browsers have no wall clock for the formatter; timestamps and colors are off.
#[wasm_bindgen(js_name = initLoggingWasm)]
pub fn init_logging_wasm(level: Option<String>) -> Result<(), JsError> {
    let log_level = common::parse_log_level(level.as_deref()).map_err(|e| JsError::new(&e))?;
    let config = LogConfig::new()
        .with_level(log_level)
        .with_timestamps(false)
        .with_ansi(false);
    init_logging(&config);
    Ok(())
}
