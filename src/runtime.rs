// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Runtime: one native heap, one virtual filesystem and one inference backend.
//!
//! The inference engine itself is external. It plugs in through two traits:
//!
//! - [`InferenceBackend`] compiles uploaded model files for a fixed input
//!   shape and layout
//! - [`CompiledModel`] runs one inference against a native input tensor
//!
//! Both receive the [`Heap`] so they can read inputs and place outputs in the
//! same linear memory the marshaling layer writes to.
//!
//! ## Configuration
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `OPENVINOJS_INITIAL_MEMORY` | `initial_memory` | 16 MiB |
//! | `OPENVINOJS_MAXIMUM_MEMORY` | `maximum_memory` | 2 GiB |
//! | `OPENVINOJS_MEMORY_LIMIT` | `memory_limit` | 0 (unlimited) |
//!
//! All values are in bytes.

use std::path::Path;
use std::sync::Arc;

use crate::error::{CoreError, Result};
use crate::fs::VirtualFs;
use crate::logging::log_heap_usage;
use crate::marshal::{shape_to_native, NativeShape, NativeTensor};
use crate::memory::{
    Heap, HeapTracker, LinearMemory, DEFAULT_INITIAL_MEMORY, DEFAULT_MAXIMUM_MEMORY,
};
use crate::model::Model;
use crate::shape::Shape;
use crate::tensor::ShapeSource;
use crate::traits::ValidatableConfig;

/// Inputs to a model compilation.
///
/// Everything is borrowed for the duration of [`InferenceBackend::compile`];
/// the backend copies whatever it needs to keep. In particular the shape
/// memory is freed as soon as `compile` returns.
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    /// Virtual filesystem path of the model topology.
    pub xml_path: &'a str,
    /// Virtual filesystem path of the weights.
    pub bin_path: &'a str,
    /// Input shape, already in native memory.
    pub shape: &'a NativeShape,
    /// Input layout string, e.g. `"NHWC"`. Opaque to this crate.
    pub layout: &'a str,
    /// Heap holding `shape`.
    pub heap: &'a Heap,
    /// Filesystem holding the model files.
    pub fs: &'a VirtualFs,
}

/// An external inference engine.
pub trait InferenceBackend: Send + Sync {
    /// Engine version string.
    fn version(&self) -> String;

    /// Human-readable engine description.
    fn description(&self) -> String;

    /// Compile the model files named in `request`.
    ///
    /// # Errors
    ///
    /// Implementations return [`CoreError::Backend`] for engine failures.
    fn compile(&self, request: &CompileRequest<'_>) -> Result<Box<dyn CompiledModel>>;
}

/// A compiled model ready to run inference.
pub trait CompiledModel: Send + Sync {
    /// Run one inference on a native input tensor.
    ///
    /// The input is owned by the caller and freed after this returns. The
    /// output, if any, stays owned by the implementation; the caller only
    /// reads it. `Ok(None)` means the engine produced no output.
    ///
    /// # Errors
    ///
    /// Implementations return [`CoreError::Backend`] for engine failures.
    fn infer(&self, heap: &Heap, input: &NativeTensor) -> Result<Option<NativeTensor>>;
}

/// Sizing of the native heap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Bytes of linear memory reserved up front.
    pub initial_memory: usize,
    /// Bytes linear memory may grow to.
    pub maximum_memory: usize,
    /// Cap on live allocated bytes (0 = no cap beyond `maximum_memory`).
    pub memory_limit: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            initial_memory: DEFAULT_INITIAL_MEMORY,
            maximum_memory: DEFAULT_MAXIMUM_MEMORY,
            memory_limit: 0,
        }
    }
}

impl RuntimeConfig {
    /// Create a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial linear memory size.
    #[must_use]
    pub fn with_initial_memory(mut self, bytes: usize) -> Self {
        self.initial_memory = bytes;
        self
    }

    /// Set the maximum linear memory size.
    #[must_use]
    pub fn with_maximum_memory(mut self, bytes: usize) -> Self {
        self.maximum_memory = bytes;
        self
    }

    /// Set the live-allocation byte cap.
    #[must_use]
    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = bytes;
        self
    }

    /// Build configuration from environment variables.
    ///
    /// Unset or unparseable variables keep their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let read = |var: &str| lookup(var).and_then(|val| val.trim().parse::<usize>().ok());

        if let Some(bytes) = read("OPENVINOJS_INITIAL_MEMORY") {
            config.initial_memory = bytes;
        }
        if let Some(bytes) = read("OPENVINOJS_MAXIMUM_MEMORY") {
            config.maximum_memory = bytes;
        }
        if let Some(bytes) = read("OPENVINOJS_MEMORY_LIMIT") {
            config.memory_limit = bytes;
        }

        config
    }
}

impl ValidatableConfig for RuntimeConfig {
    fn validate(&self) -> Result<()> {
        if self.maximum_memory == 0 {
            return Err(CoreError::invalid_config("maximum_memory must be > 0"));
        }
        if self.initial_memory > self.maximum_memory {
            return Err(CoreError::invalid_config(format!(
                "initial_memory ({}) exceeds maximum_memory ({})",
                self.initial_memory, self.maximum_memory
            )));
        }
        Ok(())
    }
}

/// Entry point: owns the heap and filesystem a backend works against.
///
/// ## Example
///
/// ```rust,ignore
/// use openvinojs_core::{Runtime, RuntimeConfig};
///
/// let runtime = Runtime::new(RuntimeConfig::from_env(), MyBackend::default())?;
/// let model = runtime.load_model("model.xml", "model.bin", [1, 224, 224, 3], "NHWC")?;
/// let output = model.infer_raw(pixels, [1, 224, 224, 3])?;
/// ```
pub struct Runtime {
    config: RuntimeConfig,
    heap: Heap,
    fs: VirtualFs,
    backend: Arc<dyn InferenceBackend>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config)
            .field("heap", &self.heap)
            .field("fs", &self.fs)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    /// Create a runtime with a fresh heap sized by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: RuntimeConfig, backend: impl InferenceBackend + 'static) -> Result<Self> {
        config.validate()?;

        let tracker = HeapTracker::with_limit(config.memory_limit);
        let memory =
            LinearMemory::with_tracker(config.initial_memory, config.maximum_memory, tracker);

        tracing::info!(
            target: "openvinojs::runtime",
            initial_memory = config.initial_memory,
            maximum_memory = config.maximum_memory,
            memory_limit = config.memory_limit,
            backend = %backend.description(),
            "runtime initialized"
        );

        Ok(Self {
            config,
            heap: Heap::new(memory),
            fs: VirtualFs::new(),
            backend: Arc::new(backend),
        })
    }

    /// Native heap shared with the backend.
    #[must_use]
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Virtual filesystem shared with the backend.
    #[must_use]
    pub fn fs(&self) -> &VirtualFs {
        &self.fs
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Backend version string.
    #[must_use]
    pub fn version(&self) -> String {
        self.backend.version()
    }

    /// Backend description string.
    #[must_use]
    pub fn description(&self) -> String {
        self.backend.description()
    }

    /// Read model files from the host and load them.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidConfig`] if either path is empty
    /// - [`CoreError::Io`] if either file cannot be read
    /// - anything [`Runtime::load_model_from_bytes`] returns
    pub fn load_model(
        &self,
        xml_path: impl AsRef<Path>,
        bin_path: impl AsRef<Path>,
        shape: impl Into<ShapeSource>,
        layout: &str,
    ) -> Result<Model> {
        let xml_path = xml_path.as_ref();
        let bin_path = bin_path.as_ref();
        if xml_path.as_os_str().is_empty() || bin_path.as_os_str().is_empty() {
            return Err(CoreError::invalid_config(
                "parameters 'xml_path' and 'bin_path' must be non-empty paths",
            ));
        }

        let xml = std::fs::read(xml_path)
            .map_err(|err| CoreError::io(format!("{}: {err}", xml_path.display())))?;
        let bin = std::fs::read(bin_path)
            .map_err(|err| CoreError::io(format!("{}: {err}", bin_path.display())))?;

        self.load_model_from_bytes(&xml, &bin, shape, layout)
    }

    /// Upload model bytes, compile them and return a [`Model`].
    ///
    /// The input shape is marshaled for the compile call only and freed
    /// afterwards, whether compilation succeeded or not. If compilation
    /// fails the uploaded files are removed again.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidDimension`] if the shape is unusable
    /// - [`CoreError::AllocationFailed`] if the shape cannot be marshaled
    /// - the backend's compile error
    pub fn load_model_from_bytes(
        &self,
        xml: &[u8],
        bin: &[u8],
        shape: impl Into<ShapeSource>,
        layout: &str,
    ) -> Result<Model> {
        let shape = ShapeSource::into_shape(shape.into())?;

        let (xml_name, bin_name) = self.fs.upload_model(xml, bin)?;

        let compiled = self.compile(&xml_name, &bin_name, &shape, layout);
        let compiled = match compiled {
            Ok(compiled) => compiled,
            Err(err) => {
                self.discard_upload(&xml_name, &bin_name);
                return Err(err);
            }
        };

        tracing::info!(
            target: "openvinojs::runtime",
            xml = %xml_name,
            bin = %bin_name,
            shape = %shape,
            layout,
            "model loaded"
        );
        if let Ok(memory) = self.heap.lock() {
            let tracker = memory.tracker();
            log_heap_usage(
                tracker.allocated_bytes(),
                tracker.peak_bytes(),
                tracker.live_allocations(),
                "after model load",
            );
        }

        Ok(Model::new(
            self.heap.clone(),
            compiled,
            shape,
            xml_name,
            bin_name,
        ))
    }

    fn compile(
        &self,
        xml_name: &str,
        bin_name: &str,
        shape: &Shape,
        layout: &str,
    ) -> Result<Box<dyn CompiledModel>> {
        let native_shape = shape_to_native(&self.heap, shape)?;
        let request = CompileRequest {
            xml_path: xml_name,
            bin_path: bin_name,
            shape: native_shape.native(),
            layout,
            heap: &self.heap,
            fs: &self.fs,
        };
        let compiled = self.backend.compile(&request);
        let released = native_shape.release();
        let compiled = compiled?;
        released?;
        Ok(compiled)
    }

    fn discard_upload(&self, xml_name: &str, bin_name: &str) {
        for name in [xml_name, bin_name] {
            if let Err(err) = self.fs.remove(name) {
                tracing::warn!(
                    target: "openvinojs::runtime",
                    name,
                    error = %err,
                    "failed to remove model file after compile error"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::marshal::native_to_shape;
    use crate::memory::PAGE_SIZE;

    /// Records what it was asked to compile.
    #[derive(Default)]
    struct RecordingBackend {
        seen: Arc<Mutex<Vec<(String, Shape, String)>>>,
        fail: bool,
    }

    struct NoopModel;

    impl CompiledModel for NoopModel {
        fn infer(&self, _heap: &Heap, _input: &NativeTensor) -> Result<Option<NativeTensor>> {
            Ok(None)
        }
    }

    impl InferenceBackend for RecordingBackend {
        fn version(&self) -> String {
            "2023.0.0-test".to_string()
        }

        fn description(&self) -> String {
            "recording backend".to_string()
        }

        fn compile(&self, request: &CompileRequest<'_>) -> Result<Box<dyn CompiledModel>> {
            assert!(request.fs.exists(request.xml_path)?);
            assert!(request.fs.exists(request.bin_path)?);
            let shape = native_to_shape(request.heap, request.shape)?;
            self.seen.lock()?.push((
                request.xml_path.to_string(),
                shape,
                request.layout.to_string(),
            ));
            if self.fail {
                return Err(CoreError::backend("unsupported opset"));
            }
            Ok(Box::new(NoopModel))
        }
    }

    fn small_config() -> RuntimeConfig {
        RuntimeConfig::new()
            .with_initial_memory(PAGE_SIZE)
            .with_maximum_memory(16 * PAGE_SIZE)
    }

    #[test]
    fn test_config_defaults_and_validation() {
        let config = RuntimeConfig::default();
        assert_eq!(config.initial_memory, DEFAULT_INITIAL_MEMORY);
        assert_eq!(config.memory_limit, 0);
        assert!(config.validate().is_ok());

        let inverted = RuntimeConfig::new()
            .with_initial_memory(2 * PAGE_SIZE)
            .with_maximum_memory(PAGE_SIZE);
        assert!(matches!(inverted.validate(), Err(CoreError::InvalidConfig(_))));

        let zero = RuntimeConfig::new().with_initial_memory(0).with_maximum_memory(0);
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("OPENVINOJS_INITIAL_MEMORY", "131072"),
            ("OPENVINOJS_MAXIMUM_MEMORY", "not-a-number"),
            ("OPENVINOJS_MEMORY_LIMIT", " 4096 "),
        ]
        .into_iter()
        .collect();
        let config = RuntimeConfig::from_lookup(|var| vars.get(var).map(ToString::to_string));

        assert_eq!(config.initial_memory, 131_072);
        assert_eq!(config.maximum_memory, DEFAULT_MAXIMUM_MEMORY);
        assert_eq!(config.memory_limit, 4096);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = RuntimeConfig::new().with_maximum_memory(0);
        let err = Runtime::new(config, RecordingBackend::default()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig(_)));
    }

    #[test]
    fn test_load_from_bytes_compiles_and_frees_shape() {
        let backend = RecordingBackend::default();
        let seen = Arc::clone(&backend.seen);
        let runtime = Runtime::new(small_config(), backend).unwrap();
        assert_eq!(runtime.version(), "2023.0.0-test");

        let model = runtime
            .load_model_from_bytes(b"<net/>", &[0u8; 16], vec![1.0, 224.0, 224.0, 3.0], "NHWC")
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1.data(), &[1, 224, 224, 3]);
        assert_eq!(seen[0].2, "NHWC");
        assert_eq!(model.input_shape().data(), &[1, 224, 224, 3]);
        assert_eq!(runtime.fs().read(model.xml_filename()).unwrap(), b"<net/>");
        assert_eq!(runtime.heap().live_allocations().unwrap(), 0);
    }

    #[test]
    fn test_failed_compile_frees_shape() {
        let backend = RecordingBackend {
            fail: true,
            ..RecordingBackend::default()
        };
        let runtime = Runtime::new(small_config(), backend).unwrap();
        let err = runtime
            .load_model_from_bytes(b"<net/>", b"", [1, 3], "NC")
            .unwrap_err();
        assert!(matches!(err, CoreError::Backend(_)));
        assert_eq!(runtime.heap().live_allocations().unwrap(), 0);
        assert!(runtime.fs().is_empty().unwrap());
    }

    #[test]
    fn test_load_model_paths() {
        let runtime = Runtime::new(small_config(), RecordingBackend::default()).unwrap();
        assert!(matches!(
            runtime.load_model("", "model.bin", [1], "N"),
            Err(CoreError::InvalidConfig(_))
        ));
        assert!(matches!(
            runtime.load_model("/nonexistent/model.xml", "/nonexistent/model.bin", [1], "N"),
            Err(CoreError::Io(_))
        ));
    }
}
