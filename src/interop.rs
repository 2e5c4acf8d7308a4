// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Candle ↔ [`Tensor`] conversion.
//!
//! Handy for pre- and post-processing around inference: build inputs with
//! Candle ops, convert, infer, convert the output back.
//!
//! Only precisions with a Candle dtype of the same width convert:
//!
//! | Precision | `DType` |
//! |-----------|---------|
//! | `uint8`, `uint8c` | `U8` |
//! | `uint32` | `U32` |
//! | `int64` | `I64` |
//! | `float32` | `F32` |
//! | `float64` | `F64` |
//!
//! Everything else fails with [`CoreError::UnknownType`] instead of being
//! widened silently.

use candle_core::{DType, Device};

use crate::error::{CoreError, Result};
use crate::precision::Precision;
use crate::shape::Shape;
use crate::tensor::{Tensor, TensorData};

/// Copy a tensor into a Candle tensor on `device`.
///
/// # Errors
///
/// - [`CoreError::UnknownType`] if the precision has no Candle dtype
/// - [`CoreError::Candle`] if Candle rejects the buffer
///
/// # Example
///
/// ```rust
/// use candle_core::Device;
/// use openvinojs_core::{to_candle, Precision, Tensor};
///
/// let tensor = Tensor::new(Precision::Float32, &vec![1.0, 2.0, 3.0, 4.0], [2, 2])?;
/// let candle = to_candle(&tensor, &Device::Cpu)?;
/// assert_eq!(candle.dims(), &[2, 2]);
/// # Ok::<(), openvinojs_core::CoreError>(())
/// ```
pub fn to_candle(tensor: &Tensor, device: &Device) -> Result<candle_core::Tensor> {
    let dims: Vec<usize> = tensor.shape().data().iter().map(|&d| d as usize).collect();

    let converted = match tensor.data() {
        TensorData::Uint8(values) | TensorData::Uint8Clamped(values) => {
            candle_core::Tensor::from_slice(values.as_slice(), dims, device)?
        }
        TensorData::Uint32(values) => {
            candle_core::Tensor::from_slice(values.as_slice(), dims, device)?
        }
        TensorData::Int64(values) => {
            candle_core::Tensor::from_slice(values.as_slice(), dims, device)?
        }
        TensorData::Float32(values) => {
            candle_core::Tensor::from_slice(values.as_slice(), dims, device)?
        }
        TensorData::Float64(values) => {
            candle_core::Tensor::from_slice(values.as_slice(), dims, device)?
        }
        _ => {
            return Err(CoreError::unknown_type(format!(
                "precision '{}' has no candle dtype",
                tensor.precision()
            )));
        }
    };

    Ok(converted)
}

/// Copy a Candle tensor into a [`Tensor`].
///
/// The result lives in host memory regardless of the source device.
///
/// # Errors
///
/// - [`CoreError::UnknownType`] for dtypes without a precision
/// - [`CoreError::InvalidDimension`] for dimensions wider than `u32`
/// - [`CoreError::Candle`] if reading the tensor fails
pub fn from_candle(tensor: &candle_core::Tensor) -> Result<Tensor> {
    let dims = tensor
        .dims()
        .iter()
        .enumerate()
        .map(|(index, &dim)| {
            u32::try_from(dim)
                .map_err(|_| CoreError::invalid_dimension(index, format!("{dim} exceeds u32")))
        })
        .collect::<Result<Vec<_>>>()?;

    let flat = tensor.flatten_all()?;
    let (precision, data) = match tensor.dtype() {
        DType::U8 => (Precision::Uint8, TensorData::Uint8(flat.to_vec1()?)),
        DType::U32 => (Precision::Uint32, TensorData::Uint32(flat.to_vec1()?)),
        DType::I64 => (Precision::Int64, TensorData::Int64(flat.to_vec1()?)),
        DType::F32 => (Precision::Float32, TensorData::Float32(flat.to_vec1()?)),
        DType::F64 => (Precision::Float64, TensorData::Float64(flat.to_vec1()?)),
        other => {
            return Err(CoreError::unknown_type(format!(
                "candle dtype {other:?} has no precision"
            )));
        }
    };

    Tensor::from_parts(precision, data, Shape::from(dims))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_float32() {
        let values: Vec<f64> = (0..6u8).map(f64::from).collect();
        let tensor = Tensor::new(Precision::Float32, &values, [2, 3]).unwrap();

        let candle = to_candle(&tensor, &Device::Cpu).unwrap();
        assert_eq!(candle.dtype(), DType::F32);
        assert_eq!(candle.dims(), &[2, 3]);

        let back = from_candle(&candle).unwrap();
        assert_eq!(back, tensor);
    }

    #[test]
    fn test_clamped_maps_to_u8() {
        let tensor = Tensor::new(Precision::Uint8Clamped, &vec![-5.0, 300.0], [2]).unwrap();
        let candle = to_candle(&tensor, &Device::Cpu).unwrap();
        assert_eq!(candle.to_vec1::<u8>().unwrap(), vec![0, 255]);
        assert_eq!(from_candle(&candle).unwrap().precision(), Precision::Uint8);
    }

    #[test]
    fn test_unsupported_precision() {
        let tensor = Tensor::new(Precision::Int16, &vec![1.0], [1]).unwrap();
        assert!(matches!(
            to_candle(&tensor, &Device::Cpu),
            Err(CoreError::UnknownType(_))
        ));
    }

    #[test]
    fn test_int64_from_candle() {
        let candle =
            candle_core::Tensor::from_vec(vec![-1i64, 2, -3, 4], (2, 2), &Device::Cpu).unwrap();
        let tensor = from_candle(&candle).unwrap();
        assert_eq!(tensor.precision(), Precision::Int64);
        assert_eq!(tensor.shape().data(), &[2, 2]);
        assert_eq!(tensor.data(), &TensorData::Int64(vec![-1, 2, -3, 4]));
    }
}
