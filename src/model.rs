// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Compiled model handle.

use std::time::Instant;

use crate::error::{CoreError, Result};
use crate::logging::log_inference;
use crate::marshal::{native_to_tensor, with_native_tensor};
use crate::memory::Heap;
use crate::precision::DEFAULT_PRECISION;
use crate::runtime::CompiledModel;
use crate::shape::Shape;
use crate::tensor::{ShapeSource, Tensor};

/// Input to [`Model::infer`]: a ready tensor or raw numbers plus a shape.
///
/// Raw input is built into a tensor of precision
/// [`DEFAULT_PRECISION`] (`uint8`).
#[derive(Debug, Clone)]
pub enum InferInput {
    /// An existing tensor, used as is.
    Tensor(Tensor),
    /// Plain numbers to wrap in a default-precision tensor.
    Raw {
        /// Element values.
        values: Vec<f64>,
        /// Shape of the tensor to build.
        shape: ShapeSource,
    },
}

impl InferInput {
    /// Normalize into a tensor.
    ///
    /// # Errors
    ///
    /// Returns the [`Tensor::new`] error for raw input.
    pub fn into_tensor(self) -> Result<Tensor> {
        match self {
            Self::Tensor(tensor) => Ok(tensor),
            Self::Raw { values, shape } => Tensor::new(DEFAULT_PRECISION, &values, shape),
        }
    }
}

impl From<Tensor> for InferInput {
    fn from(tensor: Tensor) -> Self {
        Self::Tensor(tensor)
    }
}

impl From<&Tensor> for InferInput {
    fn from(tensor: &Tensor) -> Self {
        Self::Tensor(tensor.clone())
    }
}

impl<S: Into<ShapeSource>> From<(Vec<f64>, S)> for InferInput {
    fn from((values, shape): (Vec<f64>, S)) -> Self {
        Self::Raw {
            values,
            shape: shape.into(),
        }
    }
}

/// A model compiled for one input shape.
///
/// Created by [`crate::Runtime::load_model`]. Every [`Model::infer`] call
/// marshals its input, runs the backend and frees the input before
/// returning, so no native memory is held between calls.
pub struct Model {
    heap: Heap,
    compiled: Box<dyn CompiledModel>,
    input_shape: Shape,
    xml_filename: String,
    bin_filename: String,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("input_shape", &self.input_shape)
            .field("xml_filename", &self.xml_filename)
            .field("bin_filename", &self.bin_filename)
            .finish_non_exhaustive()
    }
}

impl Model {
    pub(crate) fn new(
        heap: Heap,
        compiled: Box<dyn CompiledModel>,
        input_shape: Shape,
        xml_filename: String,
        bin_filename: String,
    ) -> Self {
        Self {
            heap,
            compiled,
            input_shape,
            xml_filename,
            bin_filename,
        }
    }

    /// Shape the model was compiled for.
    #[must_use]
    pub fn input_shape(&self) -> &Shape {
        &self.input_shape
    }

    /// Virtual filesystem name of the uploaded topology.
    #[must_use]
    pub fn xml_filename(&self) -> &str {
        &self.xml_filename
    }

    /// Virtual filesystem name of the uploaded weights.
    #[must_use]
    pub fn bin_filename(&self) -> &str {
        &self.bin_filename
    }

    /// Run one inference.
    ///
    /// # Errors
    ///
    /// - [`CoreError::ShapeMismatch`] / [`CoreError::InvalidDimension`] for
    ///   raw input that does not form a tensor
    /// - [`CoreError::AllocationFailed`] if the input cannot be marshaled
    /// - the backend's error
    /// - [`CoreError::InferenceFailed`] if the backend produced no output
    /// - [`CoreError::UnknownType`] if the output's element tag is unmapped
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let output = model.infer(&tensor)?;
    /// let output = model.infer((pixels, vec![1.0, 224.0, 224.0, 3.0]))?;
    /// ```
    pub fn infer(&self, input: impl Into<InferInput>) -> Result<Tensor> {
        let tensor = InferInput::into_tensor(input.into())?;

        let output = with_native_tensor(&self.heap, &tensor, |native| {
            let started = Instant::now();
            let output = self.compiled.infer(&self.heap, native);
            log_inference(
                native.precision(),
                tensor.shape(),
                started.elapsed(),
                matches!(output, Ok(Some(_))),
            );
            output
        })?;

        let output =
            output.ok_or_else(|| CoreError::inference_failed("Error on model inference"))?;
        native_to_tensor(&self.heap, &output)
    }

    /// Run one inference on raw numbers, wrapped as a `uint8` tensor.
    ///
    /// # Errors
    ///
    /// Same as [`Model::infer`].
    pub fn infer_raw(&self, values: Vec<f64>, shape: impl Into<ShapeSource>) -> Result<Tensor> {
        self.infer(InferInput::Raw {
            values,
            shape: shape.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshal::NativeTensor;
    use crate::memory::{LinearMemory, PAGE_SIZE};
    use crate::precision::Precision;

    /// Returns its input unchanged, or nothing.
    struct EchoModel {
        produce: bool,
    }

    impl CompiledModel for EchoModel {
        fn infer(&self, _heap: &Heap, input: &NativeTensor) -> Result<Option<NativeTensor>> {
            Ok(self.produce.then(|| input.clone()))
        }
    }

    fn model(produce: bool) -> Model {
        let heap = Heap::new(LinearMemory::new(PAGE_SIZE, 4 * PAGE_SIZE));
        Model::new(
            heap,
            Box::new(EchoModel { produce }),
            Shape::from_dims(&[2]),
            "m1.xml".to_string(),
            "m1.bin".to_string(),
        )
    }

    #[test]
    fn test_raw_input_defaults_to_uint8() {
        let input = InferInput::from((vec![1.0, 300.0], [2u32]));
        let tensor = input.into_tensor().unwrap();
        assert_eq!(tensor.precision(), Precision::Uint8);
        // 300 wraps modulo 256
        assert_eq!(tensor.data().to_f64_vec(), vec![1.0, 44.0]);
    }

    #[test]
    fn test_no_output_is_inference_failure() {
        let model = model(false);
        let err = model.infer_raw(vec![1.0, 2.0], [2u32]).unwrap_err();
        assert!(matches!(err, CoreError::InferenceFailed(_)));
        assert_eq!(model.heap.live_allocations().unwrap(), 0);
    }

    #[test]
    fn test_raw_shape_mismatch_allocates_nothing() {
        let model = model(true);
        let err = model.infer_raw(vec![1.0, 2.0, 3.0], [2u32]).unwrap_err();
        assert!(matches!(err, CoreError::ShapeMismatch { .. }));
        let memory = model.heap.lock().unwrap();
        assert_eq!(memory.tracker().total_allocations(), 0);
    }

    #[test]
    fn test_debug_hides_backend() {
        let rendered = format!("{:?}", model(true));
        assert!(rendered.contains("m1.xml"));
    }
}
