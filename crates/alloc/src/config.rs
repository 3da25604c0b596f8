//! Configuration for nebula-alloc allocators
//!
//! Both concrete allocators take the same small configuration. The presets
//! follow the usual split: `production()` turns every debugging aid off,
//! `debug()` turns them all on, and `Default` picks based on
//! `debug_assertions`.

use crate::error::{MemoryError, MemoryResult};

/// Byte written over fresh allocations in debug builds
pub const DEFAULT_ALLOC_PATTERN: u8 = 0xAA;

/// Byte written over released memory in debug builds
pub const DEFAULT_DEALLOC_PATTERN: u8 = 0xDD;

/// Allocator configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorConfig {
    /// Fill pattern for newly allocated memory
    pub alloc_pattern: Option<u8>,

    /// Fill pattern for freed heap blocks and cleared arenas
    pub dealloc_pattern: Option<u8>,

    /// Emit a warning event when an allocation fails
    pub log_failures: bool,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            alloc_pattern: if cfg!(debug_assertions) {
                Some(DEFAULT_ALLOC_PATTERN)
            } else {
                None
            },
            dealloc_pattern: if cfg!(debug_assertions) {
                Some(DEFAULT_DEALLOC_PATTERN)
            } else {
                None
            },
            log_failures: true,
        }
    }
}

impl AllocatorConfig {
    /// Production configuration - no fill patterns
    pub const fn production() -> Self {
        Self {
            alloc_pattern: None,
            dealloc_pattern: None,
            log_failures: true,
        }
    }

    /// Debug configuration - poison fresh and released memory
    pub const fn debug() -> Self {
        Self {
            alloc_pattern: Some(DEFAULT_ALLOC_PATTERN),
            dealloc_pattern: Some(DEFAULT_DEALLOC_PATTERN),
            log_failures: true,
        }
    }

    /// Quiet configuration for tests and benchmarks that exhaust allocators on purpose
    pub const fn silent() -> Self {
        Self {
            log_failures: false,
            ..Self::production()
        }
    }

    /// Validate the configuration
    ///
    /// Identical patterns would make freed memory indistinguishable from
    /// fresh memory in a debugger, which defeats the point of setting both.
    pub fn validate(&self) -> MemoryResult<()> {
        if let (Some(alloc), Some(dealloc)) = (self.alloc_pattern, self.dealloc_pattern)
            && alloc == dealloc
        {
            return Err(MemoryError::invalid_config(
                "alloc_pattern and dealloc_pattern must differ",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        assert!(AllocatorConfig::default().validate().is_ok());
        assert!(AllocatorConfig::production().validate().is_ok());
        assert!(AllocatorConfig::debug().validate().is_ok());
        assert!(AllocatorConfig::silent().validate().is_ok());
    }

    #[test]
    fn test_identical_patterns_rejected() {
        let config = AllocatorConfig {
            alloc_pattern: Some(0x11),
            dealloc_pattern: Some(0x11),
            log_failures: true,
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), "MEM:CONFIG:INVALID");
    }

    #[test]
    fn test_debug_preset_poisons() {
        let config = AllocatorConfig::debug();
        assert_eq!(config.alloc_pattern, Some(DEFAULT_ALLOC_PATTERN));
        assert_eq!(config.dealloc_pattern, Some(DEFAULT_DEALLOC_PATTERN));
    }
}
