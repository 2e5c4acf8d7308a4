// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Native linear memory, allocation tracking and scoped release.
//!
//! ## Why This Module Exists
//!
//! Native memory is never garbage-collected. Every region the marshaling layer
//! allocates must be freed exactly once, on every exit path. This module
//! provides:
//!
//! 1. **Linear memory**: a byte-addressed heap with typed segment views
//!    (`HEAPU8`, `HEAPF32`, ...) and a `malloc`/`free` allocator
//! 2. **Tracking**: live allocation count, live and peak bytes, optional limit
//! 3. **Scoped release**: [`Allocation`] frees its region when released or dropped
//!
//! ## Design Decisions
//!
//! - **Segments are indexed in elements**: `store`/`load` take an element
//!   index, never a byte address. Callers convert with
//!   [`HeapSegment::index_of`], which is where the shift lives.
//!
//! - **8-byte alignment**: every block starts on an 8-byte boundary so any
//!   segment, including `HEAPF64`, indexes it exactly.
//!
//! - **Double free is an error**: freeing a pointer that is not live returns
//!   [`CoreError::InvalidFree`] and leaves the allocator untouched.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{CoreError, Result};
use crate::precision::{HeapSegment, Precision};

/// Size of one linear memory page (WebAssembly page size).
pub const PAGE_SIZE: usize = 64 * 1024;

/// Alignment of every allocation.
pub const ALIGNMENT: usize = 8;

/// Default initial size of linear memory.
pub const DEFAULT_INITIAL_MEMORY: usize = 16 * 1024 * 1024;

/// Default upper bound for memory growth.
pub const DEFAULT_MAXIMUM_MEMORY: usize = 2 * 1024 * 1024 * 1024;

/// Estimate the bytes needed to hold a tensor of the given shape and precision.
///
/// Returns `None` if the size does not fit in `usize`.
///
/// # Example
///
/// ```rust
/// use openvinojs_core::{estimate_tensor_bytes, Precision};
///
/// assert_eq!(
///     estimate_tensor_bytes(&[1, 3, 224, 224], Precision::Float32),
///     Some(602_112)
/// );
/// assert_eq!(estimate_tensor_bytes(&[u32::MAX; 3], Precision::Uint8), None);
/// ```
#[must_use]
pub fn estimate_tensor_bytes(shape: &[u32], precision: Precision) -> Option<usize> {
    shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d as usize))?
        .checked_mul(precision.bytes_per_element())
}

/// Element type that can be stored in a heap segment.
pub trait HeapElement: Copy + Send + 'static {
    /// Segment whose view has this element type.
    const SEGMENT: HeapSegment;
    /// Rust type name, for error messages.
    const NAME: &'static str;

    /// Write `self` little-endian into `dst` (exactly `size_of::<Self>()` bytes).
    fn store_le(self, dst: &mut [u8]);

    /// Read a value little-endian from `src` (exactly `size_of::<Self>()` bytes).
    fn load_le(src: &[u8]) -> Self;
}

macro_rules! impl_heap_element {
    ($($ty:ty => $segment:ident),+ $(,)?) => {
        $(
            impl HeapElement for $ty {
                const SEGMENT: HeapSegment = HeapSegment::$segment;
                const NAME: &'static str = stringify!($ty);

                fn store_le(self, dst: &mut [u8]) {
                    dst.copy_from_slice(&self.to_le_bytes());
                }

                fn load_le(src: &[u8]) -> Self {
                    let mut bytes = [0u8; std::mem::size_of::<$ty>()];
                    bytes.copy_from_slice(src);
                    <$ty>::from_le_bytes(bytes)
                }
            }
        )+
    };
}

impl_heap_element! {
    i8 => Heap8,
    u8 => HeapU8,
    i16 => Heap16,
    u16 => HeapU16,
    i32 => Heap32,
    u32 => HeapU32,
    i64 => Heap64,
    u64 => HeapU64,
    f32 => HeapF32,
    f64 => HeapF64,
}

/// Allocation statistics for a native heap.
///
/// Thread-safe via atomics, like the counters a test harness reads while the
/// heap is in use.
#[derive(Debug)]
pub struct HeapTracker {
    /// Live allocations.
    live: AtomicUsize,
    /// Bytes currently allocated.
    allocated: AtomicUsize,
    /// Peak of `allocated`.
    peak: AtomicUsize,
    /// Allocations ever made.
    total_allocations: AtomicUsize,
    /// Frees ever made.
    total_frees: AtomicUsize,
    /// Optional byte limit (0 = unlimited).
    limit: AtomicUsize,
}

impl Default for HeapTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl HeapTracker {
    /// Create a tracker with no limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(0)
    }

    /// Create a tracker that rejects allocations beyond `limit_bytes`.
    #[must_use]
    pub fn with_limit(limit_bytes: usize) -> Self {
        Self {
            live: AtomicUsize::new(0),
            allocated: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            total_allocations: AtomicUsize::new(0),
            total_frees: AtomicUsize::new(0),
            limit: AtomicUsize::new(limit_bytes),
        }
    }

    /// Record an allocation.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AllocationFailed`] if the limit would be exceeded.
    pub fn allocate(&self, bytes: usize) -> Result<()> {
        // Check limit BEFORE updating state to avoid partial updates on failure
        let limit = self.limit.load(Ordering::SeqCst);
        let current = self.allocated.load(Ordering::SeqCst);
        if limit > 0 && current + bytes > limit {
            return Err(CoreError::allocation_failed(format!(
                "allocation of {bytes} bytes would exceed limit of {limit} bytes \
                 (current: {current} bytes)"
            )));
        }

        let actual_new = self.allocated.fetch_add(bytes, Ordering::SeqCst) + bytes;
        self.live.fetch_add(1, Ordering::SeqCst);
        self.total_allocations.fetch_add(1, Ordering::SeqCst);
        self.peak.fetch_max(actual_new, Ordering::SeqCst);
        Ok(())
    }

    /// Record a free.
    pub fn deallocate(&self, bytes: usize) {
        self.allocated.fetch_sub(bytes, Ordering::SeqCst);
        self.live.fetch_sub(1, Ordering::SeqCst);
        self.total_frees.fetch_add(1, Ordering::SeqCst);
    }

    /// Undo an [`HeapTracker::allocate`] whose block could not be placed.
    fn rollback(&self, bytes: usize) {
        self.allocated.fetch_sub(bytes, Ordering::SeqCst);
        self.live.fetch_sub(1, Ordering::SeqCst);
        self.total_allocations.fetch_sub(1, Ordering::SeqCst);
    }

    /// Number of allocations not yet freed.
    #[must_use]
    pub fn live_allocations(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Bytes currently allocated.
    #[must_use]
    pub fn allocated_bytes(&self) -> usize {
        self.allocated.load(Ordering::SeqCst)
    }

    /// High-water mark of allocated bytes.
    #[must_use]
    pub fn peak_bytes(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Allocations made over the tracker's lifetime.
    #[must_use]
    pub fn total_allocations(&self) -> usize {
        self.total_allocations.load(Ordering::SeqCst)
    }

    /// Frees made over the tracker's lifetime.
    #[must_use]
    pub fn total_frees(&self) -> usize {
        self.total_frees.load(Ordering::SeqCst)
    }

    /// Configured limit (0 = unlimited).
    #[must_use]
    pub fn limit_bytes(&self) -> usize {
        self.limit.load(Ordering::SeqCst)
    }
}

/// Byte-addressed native linear memory with a first-fit allocator.
#[derive(Debug)]
pub struct LinearMemory {
    bytes: Vec<u8>,
    maximum: usize,
    /// Start of never-allocated space.
    top: usize,
    /// Live blocks: address -> reserved size.
    live: BTreeMap<usize, usize>,
    /// Free blocks below `top`: address -> size.
    free_blocks: BTreeMap<usize, usize>,
    tracker: HeapTracker,
}

impl LinearMemory {
    /// Create linear memory of `initial` bytes that may grow to `maximum`.
    ///
    /// Both sizes are rounded up to whole pages.
    #[must_use]
    pub fn new(initial: usize, maximum: usize) -> Self {
        Self::with_tracker(initial, maximum, HeapTracker::new())
    }

    /// Create linear memory with a custom tracker (e.g. one with a byte limit).
    #[must_use]
    pub fn with_tracker(initial: usize, maximum: usize, tracker: HeapTracker) -> Self {
        let initial = round_up(initial.max(PAGE_SIZE), PAGE_SIZE);
        let maximum = round_up(maximum.max(initial), PAGE_SIZE);
        Self {
            bytes: vec![0; initial],
            maximum,
            // Address 0 is null and never handed out
            top: ALIGNMENT,
            live: BTreeMap::new(),
            free_blocks: BTreeMap::new(),
            tracker,
        }
    }

    /// Current memory size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Allocation statistics.
    #[must_use]
    pub fn tracker(&self) -> &HeapTracker {
        &self.tracker
    }

    /// Reserved size of the live block at `ptr`, if any.
    #[must_use]
    pub fn block_size(&self, ptr: usize) -> Option<usize> {
        self.live.get(&ptr).copied()
    }

    /// Allocate `bytes` and return the address of the block.
    ///
    /// Zero-byte requests still get a unique, non-null block.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AllocationFailed`] if the request cannot be met
    /// within the maximum memory size or the tracker's limit.
    pub fn malloc(&mut self, bytes: usize) -> Result<usize> {
        let size = round_up(bytes.max(1), ALIGNMENT);
        self.tracker.allocate(size)?;

        let ptr = match self.take_free_block(size) {
            Some(ptr) => ptr,
            None => match self.bump(size) {
                Ok(ptr) => ptr,
                Err(err) => {
                    self.tracker.rollback(size);
                    return Err(err);
                }
            },
        };

        self.live.insert(ptr, size);
        tracing::trace!(target: "openvinojs::memory", ptr, size, "malloc");
        Ok(ptr)
    }

    /// Free the block at `ptr`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidFree`] if `ptr` is not a live allocation.
    pub fn free(&mut self, ptr: usize) -> Result<()> {
        let size = self.live.remove(&ptr).ok_or(CoreError::InvalidFree { ptr })?;
        self.tracker.deallocate(size);
        self.release_block(ptr, size);
        tracing::trace!(target: "openvinojs::memory", ptr, size, "free");
        Ok(())
    }

    /// Write `values` into `segment` starting at element `index`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::SegmentMismatch`] if `T` is not the segment's element type
    /// - [`CoreError::OutOfBounds`] if the write runs past the end of memory
    pub fn store<T: HeapElement>(
        &mut self,
        segment: HeapSegment,
        index: usize,
        values: &[T],
    ) -> Result<()> {
        let width = std::mem::size_of::<T>();
        let range = self.segment_range::<T>(segment, index, values.len())?;
        for (chunk, &value) in self.bytes[range].chunks_exact_mut(width).zip(values) {
            value.store_le(chunk);
        }
        Ok(())
    }

    /// Read the element at `index` of `segment`.
    ///
    /// # Errors
    ///
    /// Same as [`LinearMemory::store`].
    pub fn load<T: HeapElement>(&self, segment: HeapSegment, index: usize) -> Result<T> {
        let range = self.segment_range::<T>(segment, index, 1)?;
        Ok(T::load_le(&self.bytes[range]))
    }

    /// Copy raw bytes into memory at a byte address.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OutOfBounds`] if the write runs past the end of memory.
    pub fn write_bytes(&mut self, ptr: usize, data: &[u8]) -> Result<()> {
        let range = self.segment_range::<u8>(HeapSegment::HeapU8, ptr, data.len())?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }

    /// Borrow raw bytes at a byte address.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OutOfBounds`] if the range runs past the end of memory.
    pub fn read_bytes(&self, ptr: usize, len: usize) -> Result<&[u8]> {
        let range = self.segment_range::<u8>(HeapSegment::HeapU8, ptr, len)?;
        Ok(&self.bytes[range])
    }

    fn segment_range<T: HeapElement>(
        &self,
        segment: HeapSegment,
        index: usize,
        len: usize,
    ) -> Result<std::ops::Range<usize>> {
        if T::SEGMENT != segment {
            return Err(CoreError::SegmentMismatch {
                segment: segment.label(),
                element: T::NAME,
            });
        }
        let width = segment.element_size();
        let out_of_bounds = || CoreError::OutOfBounds {
            segment: segment.label(),
            index,
            len,
            memory_bytes: self.bytes.len(),
        };
        let start = index.checked_mul(width).ok_or_else(out_of_bounds)?;
        let end = len
            .checked_mul(width)
            .and_then(|n| start.checked_add(n))
            .ok_or_else(out_of_bounds)?;
        if end > self.bytes.len() {
            return Err(out_of_bounds());
        }
        Ok(start..end)
    }

    fn take_free_block(&mut self, size: usize) -> Option<usize> {
        let (ptr, block) = self
            .free_blocks
            .iter()
            .find(|&(_, &block)| block >= size)
            .map(|(&ptr, &block)| (ptr, block))?;
        self.free_blocks.remove(&ptr);
        if block > size {
            self.free_blocks.insert(ptr + size, block - size);
        }
        Some(ptr)
    }

    fn bump(&mut self, size: usize) -> Result<usize> {
        let ptr = self.top;
        let end = ptr
            .checked_add(size)
            .ok_or_else(|| CoreError::allocation_failed(format!("{size} bytes overflows")))?;
        if end > self.bytes.len() {
            self.grow_to(end)?;
        }
        self.top = end;
        Ok(ptr)
    }

    fn grow_to(&mut self, required: usize) -> Result<()> {
        let new_size = round_up(required, PAGE_SIZE);
        if new_size > self.maximum {
            return Err(CoreError::allocation_failed(format!(
                "linear memory would need {new_size} bytes, maximum is {} bytes",
                self.maximum
            )));
        }
        tracing::debug!(
            target: "openvinojs::memory",
            from = self.bytes.len(),
            to = new_size,
            "growing linear memory"
        );
        self.bytes.resize(new_size, 0);
        Ok(())
    }

    fn release_block(&mut self, mut ptr: usize, mut size: usize) {
        // Coalesce with the following free block
        if let Some(next) = self.free_blocks.remove(&(ptr + size)) {
            size += next;
        }
        // Coalesce with the preceding free block
        let preceding = self
            .free_blocks
            .range(..ptr)
            .next_back()
            .map(|(&prev, &prev_size)| (prev, prev_size));
        if let Some((prev, prev_size)) = preceding {
            if prev + prev_size == ptr {
                self.free_blocks.remove(&prev);
                ptr = prev;
                size += prev_size;
            }
        }
        if ptr + size == self.top {
            self.top = ptr;
        } else {
            self.free_blocks.insert(ptr, size);
        }
    }
}

impl Default for LinearMemory {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_MEMORY, DEFAULT_MAXIMUM_MEMORY)
    }
}

fn round_up(value: usize, multiple: usize) -> usize {
    value.div_ceil(multiple) * multiple
}

/// Shared handle to a [`LinearMemory`].
///
/// Cloning is cheap; all clones refer to the same memory. Every method takes
/// the lock for the duration of one operation only.
#[derive(Debug, Clone, Default)]
pub struct Heap {
    inner: Arc<Mutex<LinearMemory>>,
}

impl Heap {
    /// Wrap an existing linear memory.
    #[must_use]
    pub fn new(memory: LinearMemory) -> Self {
        Self {
            inner: Arc::new(Mutex::new(memory)),
        }
    }

    /// Lock the memory for a sequence of operations.
    ///
    /// A lock poisoned by a panicking holder is recovered and the poison
    /// cleared. [`LinearMemory`] methods never panic part way through an
    /// update, so the allocator bookkeeping is intact.
    ///
    /// # Errors
    ///
    /// Does not fail at present; poisoning is recovered rather than reported.
    pub fn lock(&self) -> Result<MutexGuard<'_, LinearMemory>> {
        Ok(self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::warn!(
                target: "openvinojs::memory",
                "recovering heap lock poisoned by a panicking holder"
            );
            self.inner.clear_poison();
            poisoned.into_inner()
        }))
    }

    /// Allocate a block and wrap it in a guard that frees it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AllocationFailed`] when memory is exhausted.
    pub fn allocate(&self, bytes: usize) -> Result<Allocation> {
        let ptr = self.lock()?.malloc(bytes)?;
        Ok(Allocation {
            heap: self.clone(),
            ptr,
            len: bytes,
            released: false,
        })
    }

    /// Free a raw pointer obtained from [`LinearMemory::malloc`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidFree`] if `ptr` is not live.
    pub fn free(&self, ptr: usize) -> Result<()> {
        self.lock()?.free(ptr)
    }

    /// Number of live allocations.
    ///
    /// # Errors
    ///
    /// See [`Heap::lock`].
    pub fn live_allocations(&self) -> Result<usize> {
        Ok(self.lock()?.tracker().live_allocations())
    }

    /// Bytes currently allocated.
    ///
    /// # Errors
    ///
    /// See [`Heap::lock`].
    pub fn allocated_bytes(&self) -> Result<usize> {
        Ok(self.lock()?.tracker().allocated_bytes())
    }
}

/// Scoped ownership of one heap block.
///
/// The block is freed exactly once: by [`Allocation::release`], which
/// consumes the guard, or by `Drop` on any other exit path.
#[derive(Debug)]
pub struct Allocation {
    heap: Heap,
    ptr: usize,
    len: usize,
    released: bool,
}

impl Allocation {
    /// Byte address of the block.
    #[must_use]
    pub fn ptr(&self) -> usize {
        self.ptr
    }

    /// Requested length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether zero bytes were requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Free the block and report the outcome.
    ///
    /// # Errors
    ///
    /// Propagates the error from [`LinearMemory::free`].
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.heap.free(self.ptr)
    }
}

impl Drop for Allocation {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = self.heap.free(self.ptr) {
            tracing::warn!(
                target: "openvinojs::memory",
                ptr = self.ptr,
                error = %err,
                "failed to free native allocation on drop"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tensor_bytes() {
        assert_eq!(estimate_tensor_bytes(&[10, 100], Precision::Float32), Some(4000));
        assert_eq!(estimate_tensor_bytes(&[10, 100], Precision::Int16), Some(2000));
        assert_eq!(estimate_tensor_bytes(&[0], Precision::Float64), Some(0));
        assert_eq!(estimate_tensor_bytes(&[65_536; 4], Precision::Uint8), None);
    }

    #[test]
    fn test_malloc_is_aligned_and_non_null() {
        let mut memory = LinearMemory::new(PAGE_SIZE, PAGE_SIZE);
        let a = memory.malloc(3).unwrap();
        let b = memory.malloc(0).unwrap();
        let c = memory.malloc(17).unwrap();
        assert_ne!(a, 0);
        assert_ne!(a, b);
        for ptr in [a, b, c] {
            assert_eq!(ptr % ALIGNMENT, 0);
        }
        assert_eq!(memory.tracker().live_allocations(), 3);
    }

    #[test]
    fn test_free_reuses_and_coalesces() {
        let mut memory = LinearMemory::new(PAGE_SIZE, PAGE_SIZE);
        let a = memory.malloc(64).unwrap();
        let b = memory.malloc(64).unwrap();
        let _guard = memory.malloc(8).unwrap();

        memory.free(a).unwrap();
        memory.free(b).unwrap();

        // The two freed neighbours form one 128-byte block
        let c = memory.malloc(128).unwrap();
        assert_eq!(c, a);
        assert_eq!(memory.tracker().live_allocations(), 2);
    }

    #[test]
    fn test_double_free_is_rejected() {
        let mut memory = LinearMemory::new(PAGE_SIZE, PAGE_SIZE);
        let ptr = memory.malloc(16).unwrap();
        memory.free(ptr).unwrap();
        assert!(matches!(memory.free(ptr), Err(CoreError::InvalidFree { .. })));
        assert!(matches!(memory.free(12_345), Err(CoreError::InvalidFree { .. })));
        assert_eq!(memory.tracker().live_allocations(), 0);
        assert_eq!(memory.tracker().total_frees(), 1);
    }

    #[test]
    fn test_growth_and_exhaustion() {
        let mut memory = LinearMemory::new(PAGE_SIZE, 2 * PAGE_SIZE);
        memory.malloc(PAGE_SIZE).unwrap();
        assert_eq!(memory.size(), 2 * PAGE_SIZE);

        let err = memory.malloc(PAGE_SIZE).unwrap_err();
        assert!(matches!(err, CoreError::AllocationFailed { .. }));
        // A failed request leaves the statistics untouched
        assert_eq!(memory.tracker().live_allocations(), 1);
        assert_eq!(memory.tracker().total_allocations(), 1);
        assert_eq!(memory.tracker().total_frees(), 0);
    }

    #[test]
    fn test_tracker_limit() {
        let tracker = HeapTracker::with_limit(64);
        let mut memory = LinearMemory::with_tracker(PAGE_SIZE, PAGE_SIZE, tracker);
        memory.malloc(48).unwrap();
        assert!(memory.malloc(24).is_err());
        assert_eq!(memory.tracker().allocated_bytes(), 48);
        assert_eq!(memory.tracker().peak_bytes(), 48);
    }

    #[test]
    fn test_segment_store_and_load() {
        let mut memory = LinearMemory::new(PAGE_SIZE, PAGE_SIZE);
        let ptr = memory.malloc(3 * 4).unwrap();
        let index = HeapSegment::HeapF32.index_of(ptr);
        memory
            .store::<f32>(HeapSegment::HeapF32, index, &[1.5, -2.0, 3.25])
            .unwrap();
        let second: f32 = memory.load(HeapSegment::HeapF32, index + 1).unwrap();
        assert!((second + 2.0).abs() < f32::EPSILON);

        // The same bytes seen through HEAPU8 are the little-endian encoding
        let bytes = memory.read_bytes(ptr, 4).unwrap();
        assert_eq!(bytes, &1.5f32.to_le_bytes());
    }

    #[test]
    fn test_segment_mismatch_and_bounds() {
        let mut memory = LinearMemory::new(PAGE_SIZE, PAGE_SIZE);
        assert!(matches!(
            memory.store::<f32>(HeapSegment::HeapU32, 0, &[1.0]),
            Err(CoreError::SegmentMismatch { .. })
        ));
        let last = PAGE_SIZE / 8;
        assert!(matches!(
            memory.load::<f64>(HeapSegment::HeapF64, last),
            Err(CoreError::OutOfBounds { .. })
        ));
        assert!(memory.load::<f64>(HeapSegment::HeapF64, last - 1).is_ok());
    }

    #[test]
    fn test_allocation_guard_frees_once() {
        let heap = Heap::new(LinearMemory::new(PAGE_SIZE, PAGE_SIZE));
        {
            let _scoped = heap.allocate(32).unwrap();
            assert_eq!(heap.live_allocations().unwrap(), 1);
        }
        assert_eq!(heap.live_allocations().unwrap(), 0);

        let explicit = heap.allocate(32).unwrap();
        explicit.release().unwrap();
        assert_eq!(heap.live_allocations().unwrap(), 0);

        let tracker_frees = heap.lock().unwrap().tracker().total_frees();
        assert_eq!(tracker_frees, 2);
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let heap = Heap::new(LinearMemory::new(PAGE_SIZE, PAGE_SIZE));
        let block = heap.allocate(64).unwrap();

        let holder = heap.clone();
        let joined = std::thread::spawn(move || {
            let _memory = holder.lock().unwrap();
            panic!("holder panicked");
        })
        .join();
        assert!(joined.is_err());

        // The guard still frees, and the heap keeps serving requests
        drop(block);
        assert_eq!(heap.live_allocations().unwrap(), 0);
        heap.allocate(64).unwrap().release().unwrap();
        assert!(!heap.inner.is_poisoned());
    }
}
