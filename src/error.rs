// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Error types for the marshaling layer.
//!
//! Every fallible operation in this crate returns [`CoreError`]. Errors are
//! always surfaced to the immediate caller; nothing here retries or swallows
//! a failure.
//!
//! ## Error Hierarchy
//!
//! ```text
//! CoreError
//! ├── InvalidDimension   - Shape input that is not a non-negative number
//! ├── ShapeMismatch      - Buffer length disagrees with the shape's element count
//! ├── UnknownType        - Unrecognized native element tag or precision name
//! ├── InferenceFailed    - Native call produced no output tensor
//! ├── AllocationFailed   - Native linear memory exhausted
//! ├── InvalidFree        - Release of a pointer that is not a live allocation
//! ├── OutOfBounds        - Segment access past the end of linear memory
//! ├── SegmentMismatch    - Typed view used against the wrong heap segment
//! ├── InvalidConfig      - Runtime configuration rejected
//! ├── Poisoned           - Shared heap lock poisoned by a panicking holder
//! ├── Backend            - Failure reported by the inference backend
//! ├── Io                 - Host file I/O errors
//! └── Candle             - Candle interop errors (feature `candle`)
//! ```
//!
//! ## Wrapping
//!
//! Backends built on top of this crate can wrap `CoreError` in their own types:
//!
//! ```rust
//! use openvinojs_core::CoreError;
//! use thiserror::Error;
//!
//! #[derive(Error, Debug)]
//! pub enum BackendError {
//!     #[error("device lost: {0}")]
//!     DeviceLost(String),
//!
//!     #[error(transparent)]
//!     Core(#[from] CoreError),
//! }
//! ```

use thiserror::Error;

/// Result type alias for marshaling operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while building tensors or moving them across the native boundary.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CoreError {
    /// A shape dimension could not be coerced to a non-negative integer.
    #[error("invalid dimension at index {index}: {reason}")]
    InvalidDimension {
        /// Position of the offending value.
        index: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// Data length does not match the shape's element count.
    #[error("shape mismatch: shape {shape:?} holds {expected} elements, data has {actual}")]
    ShapeMismatch {
        /// Dimensions of the shape.
        shape: Vec<u32>,
        /// Element count implied by the shape.
        expected: usize,
        /// Length of the supplied data.
        actual: usize,
    },

    /// Unrecognized native element tag or precision name.
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// The native inference call returned no output.
    #[error("inference failed: {0}")]
    InferenceFailed(String),

    /// Native linear memory could not satisfy an allocation.
    ///
    /// Not recovered from; the caller decides what to do.
    #[error("allocation failed: {message}")]
    AllocationFailed {
        /// Descriptive error message.
        message: String,
    },

    /// A pointer was released that is not a live allocation.
    #[error("invalid free of pointer {ptr:#x}")]
    InvalidFree {
        /// The offending heap address.
        ptr: usize,
    },

    /// A heap segment was indexed past the end of linear memory.
    #[error("out of bounds access to {segment}[{index}] ({len} elements, memory is {memory_bytes} bytes)")]
    OutOfBounds {
        /// Segment label, e.g. `HEAPF32`.
        segment: &'static str,
        /// First element index of the access.
        index: usize,
        /// Number of elements accessed.
        len: usize,
        /// Current size of linear memory.
        memory_bytes: usize,
    },

    /// Elements of one kind were read or written through another segment.
    #[error("segment mismatch: {element} elements cannot be accessed through {segment}")]
    SegmentMismatch {
        /// Segment label requested.
        segment: &'static str,
        /// Rust element type actually used.
        element: &'static str,
    },

    /// Invalid configuration parameter.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The shared heap lock was poisoned.
    #[error("heap lock poisoned: {0}")]
    Poisoned(String),

    /// Failure inside the external inference backend.
    #[error("backend error: {0}")]
    Backend(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Underlying Candle error.
    #[cfg(feature = "candle")]
    #[error("candle error: {0}")]
    Candle(#[from] candle_core::Error),
}

impl CoreError {
    /// Create an invalid dimension error.
    pub fn invalid_dimension(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidDimension {
            index,
            reason: reason.into(),
        }
    }

    /// Create a shape mismatch error.
    pub fn shape_mismatch(shape: impl Into<Vec<u32>>, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            shape: shape.into(),
            expected,
            actual,
        }
    }

    /// Create an unknown type error.
    pub fn unknown_type(tag: impl Into<String>) -> Self {
        Self::UnknownType(tag.into())
    }

    /// Create an inference failed error.
    pub fn inference_failed(msg: impl Into<String>) -> Self {
        Self::InferenceFailed(msg.into())
    }

    /// Create an allocation failed error.
    pub fn allocation_failed(msg: impl Into<String>) -> Self {
        Self::AllocationFailed {
            message: msg.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a backend error.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create an I/O error.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for CoreError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Poisoned(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::shape_mismatch(vec![1, 3, 224, 224], 150_528, 10);
        let msg = err.to_string();
        assert!(msg.contains("shape mismatch"));
        assert!(msg.contains("150528"));
        assert!(msg.contains("10"));

        let err = CoreError::unknown_type("bfloat16_t");
        assert_eq!(err.to_string(), "unknown type: bfloat16_t");

        let err = CoreError::InvalidFree { ptr: 0x40 };
        assert_eq!(err.to_string(), "invalid free of pointer 0x40");

        let err = CoreError::invalid_dimension(0, "not a number");
        assert!(err.to_string().contains("index 0"));
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "model.xml");
        let core_err: CoreError = io_err.into();
        assert!(matches!(core_err, CoreError::Io(_)));
    }
}
