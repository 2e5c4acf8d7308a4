// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Conversion of shapes and tensors to and from native linear memory.
//!
//! ## Address Arithmetic
//!
//! Linear memory is exposed as fixed-width segments. The same byte address
//! names a different element in each of them: byte 64 is `HEAPU8[64]`,
//! `HEAPF32[16]` and `HEAPF64[8]`. Every address therefore goes through
//! [`HeapSegment::index_of`] for the segment that matches the data being
//! moved, never a hardcoded one.
//!
//! ## Lifetimes
//!
//! [`shape_to_native`] and [`tensor_to_native`] allocate. The handles they
//! return own their regions and free them exactly once, either through
//! `release(self)` or on drop. [`native_to_shape`] and [`native_to_tensor`]
//! only read and never take ownership of native memory.
//!
//! ```rust
//! use openvinojs_core::{marshal, Heap, Precision, Tensor};
//!
//! let heap = Heap::default();
//! let values = vec![0.5, 1.5, 2.5, 3.5];
//! let tensor = Tensor::new(Precision::Float32, &values, [2, 2])?;
//!
//! let handle = marshal::tensor_to_native(&heap, &tensor)?;
//! let copy = marshal::native_to_tensor(&heap, handle.native())?;
//! handle.release()?;
//!
//! assert_eq!(copy, tensor);
//! assert_eq!(heap.live_allocations()?, 0);
//! # Ok::<(), openvinojs_core::CoreError>(())
//! ```

use crate::error::{CoreError, Result};
use crate::memory::{Allocation, Heap, HeapElement, LinearMemory};
use crate::precision::{ArrayKind, HeapSegment, Precision};
use crate::shape::{Shape, SHAPE_SEGMENT};
use crate::tensor::{with_buffer, Tensor, TensorData};

/// Native shape object: a pointer to `dim` `u32` dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeShape {
    data: usize,
    dim: usize,
}

impl NativeShape {
    /// Describe `dim` dimensions stored at byte address `data`.
    #[must_use]
    pub fn new(data: usize, dim: usize) -> Self {
        Self { data, dim }
    }

    /// Byte address of the dimension array.
    #[must_use]
    pub fn data(&self) -> usize {
        self.data
    }

    /// Number of dimensions.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }
}

/// Native tensor object: element tag, data pointer and shape.
///
/// `precision` is the JS-side name the tensor was created with. It is
/// informational; reading a tensor back only trusts `element_type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeTensor {
    element_type: String,
    precision: String,
    data: usize,
    shape: NativeShape,
}

impl NativeTensor {
    /// Describe a tensor whose elements of `element_type` start at `data`.
    ///
    /// The precision name is derived from the tag, empty if it is unmapped.
    #[must_use]
    pub fn new(element_type: impl Into<String>, data: usize, shape: NativeShape) -> Self {
        let element_type = element_type.into();
        let precision = Precision::from_native_tag(&element_type)
            .map(|p| p.name().to_string())
            .unwrap_or_default();
        Self {
            element_type,
            precision,
            data,
            shape,
        }
    }

    fn for_precision(precision: Precision, data: usize, shape: NativeShape) -> Self {
        Self {
            element_type: precision.native_tag().to_string(),
            precision: precision.name().to_string(),
            data,
            shape,
        }
    }

    /// Native element tag, e.g. `"float"`.
    #[must_use]
    pub fn element_type(&self) -> &str {
        &self.element_type
    }

    /// JS precision name, e.g. `"float32"`.
    #[must_use]
    pub fn precision(&self) -> &str {
        &self.precision
    }

    /// Byte address of the first element.
    #[must_use]
    pub fn data(&self) -> usize {
        self.data
    }

    /// Shape object.
    #[must_use]
    pub fn shape(&self) -> &NativeShape {
        &self.shape
    }
}

/// A native shape together with the allocation backing its dimensions.
#[derive(Debug)]
pub struct NativeShapeHandle {
    native: NativeShape,
    allocation: Allocation,
}

impl NativeShapeHandle {
    /// The native shape object.
    #[must_use]
    pub fn native(&self) -> &NativeShape {
        &self.native
    }

    /// Free the dimension array.
    ///
    /// # Errors
    ///
    /// Propagates the heap's free error.
    pub fn release(self) -> Result<()> {
        self.allocation.release()
    }
}

/// A native tensor together with its data and shape allocations.
#[derive(Debug)]
pub struct NativeTensorHandle {
    native: NativeTensor,
    data: Allocation,
    shape: NativeShapeHandle,
}

impl NativeTensorHandle {
    /// The native tensor object.
    #[must_use]
    pub fn native(&self) -> &NativeTensor {
        &self.native
    }

    /// Free the data region and the nested shape.
    ///
    /// Both frees are always attempted; the first error is returned.
    ///
    /// # Errors
    ///
    /// Propagates the heap's free error.
    pub fn release(self) -> Result<()> {
        let data = self.data.release();
        let shape = self.shape.release();
        data.and(shape)
    }
}

/// Copy a shape into native memory.
///
/// Allocates `dim * 4` bytes and writes the dimensions through `HEAPU32`
/// starting at `ptr >> 2`.
///
/// # Errors
///
/// Returns [`crate::CoreError::AllocationFailed`] when memory is exhausted.
pub fn shape_to_native(heap: &Heap, shape: &Shape) -> Result<NativeShapeHandle> {
    let dims = shape.data();
    let allocation = heap.allocate(dims.len() * SHAPE_SEGMENT.element_size())?;
    let index = SHAPE_SEGMENT.index_of(allocation.ptr());

    // The lock is released inside the closure, before `allocation` can drop
    heap.lock()
        .and_then(|mut memory| memory.store::<u32>(SHAPE_SEGMENT, index, dims))?;

    Ok(NativeShapeHandle {
        native: NativeShape::new(allocation.ptr(), dims.len()),
        allocation,
    })
}

/// Copy a tensor, including its shape, into native memory.
///
/// The data is re-materialized in the precision's element kind and written
/// through that precision's segment. If any step after the shape allocation
/// fails, everything allocated so far is freed before the error returns.
///
/// # Errors
///
/// Returns [`crate::CoreError::AllocationFailed`] when memory is exhausted.
pub fn tensor_to_native(heap: &Heap, tensor: &Tensor) -> Result<NativeTensorHandle> {
    let precision = tensor.precision();
    let segment = precision.segment();
    let shape = shape_to_native(heap, tensor.shape())?;

    let data = tensor.data().convert(precision.array_kind());
    let allocation = heap.allocate(data.byte_len())?;
    let index = segment.index_of(allocation.ptr());

    heap.lock()
        .and_then(|mut memory| store_data(&mut memory, segment, index, &data))?;

    tracing::trace!(
        target: "openvinojs::marshal",
        precision = %precision,
        segment = %segment,
        ptr = allocation.ptr(),
        elements = data.len(),
        "tensor copied to native memory"
    );

    Ok(NativeTensorHandle {
        native: NativeTensor::for_precision(precision, allocation.ptr(), *shape.native()),
        data: allocation,
        shape,
    })
}

/// Read a native shape back into a [`Shape`].
///
/// # Errors
///
/// Returns [`crate::CoreError::OutOfBounds`] if the dimension array lies
/// outside linear memory.
pub fn native_to_shape(heap: &Heap, native: &NativeShape) -> Result<Shape> {
    let memory = heap.lock()?;
    let base = SHAPE_SEGMENT.index_of(native.data());
    let dims = read_elements::<u32>(&memory, SHAPE_SEGMENT, base, native.dim())?;
    Ok(Shape::from(dims))
}

/// Read a native tensor back into a [`Tensor`].
///
/// # Errors
///
/// - [`crate::CoreError::UnknownType`] if the element tag is not mapped
/// - [`crate::CoreError::OutOfBounds`] if the data lies outside linear memory,
///   or the shape's element count overflows
pub fn native_to_tensor(heap: &Heap, native: &NativeTensor) -> Result<Tensor> {
    let precision = Precision::from_native_tag(native.element_type())?;
    let shape = native_to_shape(heap, native.shape())?;

    let data = {
        let memory = heap.lock()?;
        let count = shape.checked_element_count().ok_or_else(|| {
            let segment = precision.segment();
            CoreError::OutOfBounds {
                segment: segment.label(),
                index: segment.index_of(native.data()),
                len: usize::MAX,
                memory_bytes: memory.size(),
            }
        })?;
        load_data(&memory, precision, native.data(), count)?
    };

    Tensor::from_parts(precision, data, shape)
}

/// Run `f` with a native copy of `tensor`, releasing it on every exit path.
///
/// The copy is released after `f` returns, whether it succeeded or not, and
/// by drop if `f` panics. An error from `f` takes precedence over a release
/// error.
///
/// # Errors
///
/// Returns the marshaling error, the error from `f`, or the release error.
pub fn with_native_tensor<R>(
    heap: &Heap,
    tensor: &Tensor,
    f: impl FnOnce(&NativeTensor) -> Result<R>,
) -> Result<R> {
    let handle = tensor_to_native(heap, tensor)?;
    let outcome = f(handle.native());
    let released = handle.release();
    let value = outcome?;
    released?;
    Ok(value)
}

fn store_data(
    memory: &mut LinearMemory,
    segment: HeapSegment,
    index: usize,
    data: &TensorData,
) -> Result<()> {
    with_buffer!(data, buf => memory.store(segment, index, buf.as_slice()))
}

fn load_data(
    memory: &LinearMemory,
    precision: Precision,
    ptr: usize,
    count: usize,
) -> Result<TensorData> {
    let segment = precision.segment();
    let base = segment.index_of(ptr);
    Ok(match precision.array_kind() {
        ArrayKind::Int8Array => TensorData::Int8(read_elements(memory, segment, base, count)?),
        ArrayKind::Uint8Array => TensorData::Uint8(read_elements(memory, segment, base, count)?),
        ArrayKind::Uint8ClampedArray => {
            TensorData::Uint8Clamped(read_elements(memory, segment, base, count)?)
        }
        ArrayKind::Int16Array => TensorData::Int16(read_elements(memory, segment, base, count)?),
        ArrayKind::Uint16Array => TensorData::Uint16(read_elements(memory, segment, base, count)?),
        ArrayKind::Int32Array => TensorData::Int32(read_elements(memory, segment, base, count)?),
        ArrayKind::Uint32Array => TensorData::Uint32(read_elements(memory, segment, base, count)?),
        ArrayKind::BigInt64Array => TensorData::Int64(read_elements(memory, segment, base, count)?),
        ArrayKind::BigUint64Array => {
            TensorData::Uint64(read_elements(memory, segment, base, count)?)
        }
        ArrayKind::Float32Array => {
            TensorData::Float32(read_elements(memory, segment, base, count)?)
        }
        ArrayKind::Float64Array => {
            TensorData::Float64(read_elements(memory, segment, base, count)?)
        }
    })
}

/// Read `count` elements one by one from `segment[base..]`.
fn read_elements<T: HeapElement>(
    memory: &LinearMemory,
    segment: HeapSegment,
    base: usize,
    count: usize,
) -> Result<Vec<T>> {
    (0..count)
        .map(|i| memory.load::<T>(segment, base + i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{LinearMemory, PAGE_SIZE};

    fn small_heap() -> Heap {
        Heap::new(LinearMemory::new(PAGE_SIZE, 4 * PAGE_SIZE))
    }

    #[test]
    fn test_shape_layout_in_heap() {
        let heap = small_heap();
        let shape = Shape::from_dims(&[1, 3, 224, 224]);
        let handle = shape_to_native(&heap, &shape).unwrap();

        let native = *handle.native();
        assert_eq!(native.dim(), 4);
        {
            let memory = heap.lock().unwrap();
            let base = native.data() >> 2;
            assert_eq!(memory.load::<u32>(HeapSegment::HeapU32, base + 2).unwrap(), 224);
            // Byte view: dimension 1 starts four bytes in
            assert_eq!(memory.read_bytes(native.data() + 4, 4).unwrap(), &3u32.to_le_bytes());
        }

        assert_eq!(native_to_shape(&heap, &native).unwrap(), shape);
        handle.release().unwrap();
        assert_eq!(heap.live_allocations().unwrap(), 0);
    }

    #[test]
    fn test_tensor_uses_precision_segment() {
        let heap = small_heap();
        let tensor = Tensor::new(Precision::Float64, &vec![1.25, -8.5], [2]).unwrap();
        let handle = tensor_to_native(&heap, &tensor).unwrap();
        let native = handle.native().clone();
        assert_eq!(native.element_type(), "double");
        assert_eq!(native.precision(), "float64");

        {
            let memory = heap.lock().unwrap();
            let index = native.data() >> 3;
            assert_eq!(memory.load::<f64>(HeapSegment::HeapF64, index + 1).unwrap(), -8.5);
        }

        // Two live regions: data and dimensions
        assert_eq!(heap.live_allocations().unwrap(), 2);
        handle.release().unwrap();
        assert_eq!(heap.live_allocations().unwrap(), 0);
    }

    #[test]
    fn test_round_trip_every_precision() {
        let heap = small_heap();
        let values = vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        for precision in crate::precision::ALL_PRECISIONS {
            let tensor = Tensor::new(precision, &values, [2, 3]).unwrap();
            let copy = with_native_tensor(&heap, &tensor, |native| native_to_tensor(&heap, native))
                .unwrap();

            // Clamped data comes back as plain uint8, the only tag native reports
            let expected = if precision == Precision::Uint8Clamped {
                Precision::Uint8
            } else {
                precision
            };
            assert_eq!(copy.precision(), expected);
            assert_eq!(copy.shape(), tensor.shape());
            assert_eq!(copy.data().to_f64_vec(), values);
        }
        assert_eq!(heap.live_allocations().unwrap(), 0);
    }

    #[test]
    fn test_unknown_native_type() {
        let heap = small_heap();
        let shape = shape_to_native(&heap, &Shape::from_dims(&[1])).unwrap();
        let native = NativeTensor::new("bfloat16", 8, *shape.native());
        assert_eq!(native.precision(), "");
        assert!(matches!(
            native_to_tensor(&heap, &native),
            Err(CoreError::UnknownType(_))
        ));
    }

    #[test]
    fn test_overflowing_native_shape_is_out_of_bounds() {
        let heap = small_heap();
        let shape = shape_to_native(&heap, &Shape::from_dims(&[u32::MAX; 3])).unwrap();
        let native = NativeTensor::new("float", 8, *shape.native());
        assert!(matches!(
            native_to_tensor(&heap, &native),
            Err(CoreError::OutOfBounds { .. })
        ));
        shape.release().unwrap();
    }

    #[test]
    fn test_failed_data_allocation_frees_shape() {
        // Room for the dimensions but not for the data
        let heap = Heap::new(LinearMemory::new(PAGE_SIZE, PAGE_SIZE));
        let values = vec![0.0; PAGE_SIZE];
        let tensor = Tensor::new(Precision::Float32, &values, [PAGE_SIZE as u32]).unwrap();

        let err = tensor_to_native(&heap, &tensor).unwrap_err();
        assert!(matches!(err, CoreError::AllocationFailed { .. }));
        assert_eq!(heap.live_allocations().unwrap(), 0);
    }

    #[test]
    fn test_with_native_tensor_releases_on_error() {
        let heap = small_heap();
        let tensor = Tensor::new(Precision::Uint8, &vec![1.0, 2.0], [2]).unwrap();
        let result: Result<()> = with_native_tensor(&heap, &tensor, |_| {
            Err(CoreError::backend("device lost"))
        });
        assert!(matches!(result, Err(CoreError::Backend(_))));
        assert_eq!(heap.live_allocations().unwrap(), 0);
    }
}
