// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! # openvinojs-core
//!
//! Boundary-marshaling layer between JavaScript-style tensors and a native
//! inference engine's linear memory.
//!
//! A caller builds a [`Tensor`] from a precision tag, plain numbers or a typed
//! buffer, and a [`Shape`]. [`Model::infer`] copies it into the native heap,
//! hands the engine a [`NativeTensor`] pointing at that memory, frees the
//! input again and reads the engine's output back into a [`Tensor`].
//!
//! ## Modules
//!
//! - [`precision`] - Precision tags, typed-array kinds, heap segments
//! - [`shape`] / [`tensor`] - The JS-side data model
//! - [`memory`] - Linear memory, allocator, allocation tracking
//! - [`marshal`] - Shape and tensor conversion to and from native memory
//! - [`fs`] - Virtual filesystem for uploaded model files
//! - [`runtime`] / [`model`] - Backend traits, runtime, model handle
//! - [`error`] - [`CoreError`] and [`Result`]
//! - [`logging`] - Subscriber setup and structured helpers
//! - `interop` - Candle tensor conversion (feature `candle`)
//! - `typescript` - Node.js and browser bindings (features `napi`, `wasm`)
//!
//! ## Quick Start
//!
//! ```rust
//! use openvinojs_core::{marshal, Heap, Precision, Result, Shape, Tensor};
//!
//! fn main() -> Result<()> {
//!     let heap = Heap::default();
//!     let shape = Shape::new(&[1.0, 3.0, 2.0, 2.0])?;
//!     let pixels: Vec<f64> = (0..12u8).map(f64::from).collect();
//!     let tensor = Tensor::new(Precision::Float32, &pixels, shape)?;
//!
//!     let native = marshal::tensor_to_native(&heap, &tensor)?;
//!     assert_eq!(native.native().element_type(), "float");
//!     native.release()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `candle` - Conversion to and from `candle_core::Tensor`
//! - `napi` - Node.js native addon bindings
//! - `wasm` - `wasm-bindgen` browser bindings

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod fs;
pub mod logging;
pub mod marshal;
pub mod memory;
pub mod model;
pub mod precision;
pub mod runtime;
pub mod shape;
pub mod tensor;
pub mod traits;

#[cfg(feature = "candle")]
pub mod interop;

#[cfg(any(feature = "napi", feature = "wasm"))]
pub mod typescript;

pub use error::{CoreError, Result};
pub use fs::VirtualFs;
pub use logging::{init_logging, LogConfig, LogLevel};
pub use marshal::{
    native_to_shape, native_to_tensor, shape_to_native, tensor_to_native, with_native_tensor,
    NativeShape, NativeShapeHandle, NativeTensor, NativeTensorHandle,
};
pub use memory::{estimate_tensor_bytes, Allocation, Heap, HeapTracker, LinearMemory};
pub use model::{InferInput, Model};
pub use precision::{supported_precisions, ArrayKind, HeapSegment, Precision, DEFAULT_PRECISION};
pub use runtime::{CompileRequest, CompiledModel, InferenceBackend, Runtime, RuntimeConfig};
pub use shape::{DimensionValue, Shape};
pub use tensor::{ShapeSource, Tensor, TensorData, TensorSource};
pub use traits::ValidatableConfig;

#[cfg(feature = "candle")]
pub use interop::{from_candle, to_candle};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
