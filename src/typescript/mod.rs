// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

// Allow missing docs for macro-generated code in submodules
#![allow(missing_docs)]

//! TypeScript/JavaScript bindings.
//!
//! | Approach | Runtime | Feature |
//! |----------|---------|---------|
//! | **napi-rs** | Node.js native addon | `napi` |
//! | **wasm-bindgen** | Browser / any wasm host | `wasm` |
//!
//! ## API Surface
//!
//! Both bindings expose the same data model and lookups. The wasm names carry
//! a `Wasm` suffix (`ShapeWasm`, `bytesPerElementWasm`, ...).
//!
//! | Item | Description |
//! |------|-------------|
//! | `Shape` class | `dim` and `data` getters; `new Shape([1, 3, 224, 224])` |
//! | `Tensor` class | `precision`, `data`, `shape` getters |
//! | `supportedPrecisions()` | All precision names |
//! | `bytesPerElement(precision)` | Typed-array element size |
//! | `heapSegment(precision)` | Native heap segment label |
//! | `precisionForNativeType(tag)` | `"float"` → `"float32"` |
//! | `estimateTensorBytes(shape, precision?)` | Native memory needed for a tensor |
//! | `initLogging(level?, ...)` | Install the tracing subscriber |
//! | `version()` | Crate version |
//!
//! The wasm `Shape` constructor takes any JS array and rejects non-number
//! elements with "passed array must contain only numbers".
//!
//! ## Not Exposed
//!
//! Model loading and inference (`Runtime::load_model`, `Model::infer`,
//! `Runtime::version` / `Runtime::description`) are only available from Rust.
//! They need an [`crate::InferenceBackend`], which is a Rust trait and no
//! binding constructs one. An addon that links an engine wraps its `Runtime`
//! itself and reuses the `Shape` and `Tensor` classes here for values.

pub mod common;

#[cfg(feature = "napi")]
pub mod napi;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use common::*;
