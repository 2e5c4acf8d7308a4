// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Shared trait interfaces.
//!
//! - [`ValidatableConfig`] - Configuration validation interface
//!
//! The backend seams ([`crate::InferenceBackend`], [`crate::CompiledModel`])
//! live in [`crate::runtime`] next to the code that drives them.

use crate::error::Result;

/// Configuration validation trait.
///
/// Constructors that accept a configuration call `validate()` before using
/// it.
///
/// # Example
///
/// ```rust
/// use openvinojs_core::{CoreError, Result, ValidatableConfig};
///
/// #[derive(Clone)]
/// struct PoolConfig {
///     slots: usize,
/// }
///
/// impl ValidatableConfig for PoolConfig {
///     fn validate(&self) -> Result<()> {
///         if self.slots == 0 {
///             return Err(CoreError::invalid_config("slots must be > 0"));
///         }
///         Ok(())
///     }
/// }
///
/// assert!(PoolConfig { slots: 0 }.validate().is_err());
/// ```
pub trait ValidatableConfig: Clone + Send + Sync {
    /// Validate the configuration parameters.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidConfig` if validation fails.
    fn validate(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[derive(Clone)]
    struct TestConfig {
        value: i32,
    }

    impl ValidatableConfig for TestConfig {
        fn validate(&self) -> Result<()> {
            if self.value < 0 {
                return Err(CoreError::invalid_config("value must be non-negative"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_validatable_config() {
        let valid = TestConfig { value: 10 };
        assert!(valid.validate().is_ok());

        let invalid = TestConfig { value: -1 };
        assert!(matches!(invalid.validate(), Err(CoreError::InvalidConfig(_))));
    }
}
