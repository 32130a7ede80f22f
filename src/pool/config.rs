//! Pool configuration

/// Configuration for a [`TypedPool`](super::TypedPool).
///
/// The defaults match the eager-reclamation behavior: a block is returned to
/// the host allocator the moment its last slot is freed, nothing is filled
/// with debug patterns and no counters are recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolConfig {
    /// Keep at most one fully free block in the chain instead of releasing
    /// it, so an allocate/free cycle sitting on a block boundary does not
    /// thrash the host allocator.
    pub leave_free_block: bool,

    /// Byte pattern written over a slot when it is handed out. Debug aid
    /// for spotting reads of never-initialized memory.
    pub alloc_pattern: Option<u8>,

    /// Byte pattern written over a slot when it is returned. Debug aid for
    /// spotting use-after-free. The first pointer-sized bytes are
    /// subsequently overwritten by the free-list link.
    pub dealloc_pattern: Option<u8>,

    /// Record allocation and block-traffic counters, observable through
    /// [`TypedPool::stats`](super::TypedPool::stats).
    pub track_stats: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            leave_free_block: false,
            alloc_pattern: None,
            dealloc_pattern: None,
            track_stats: false,
        }
    }
}

impl PoolConfig {
    /// Configuration for production use: eager reclamation, no overhead.
    pub fn production() -> Self {
        Self::default()
    }

    /// Configuration for debugging: fill patterns on both transitions and
    /// counter tracking enabled.
    pub fn debug() -> Self {
        Self {
            leave_free_block: false,
            alloc_pattern: Some(0xAB),
            dealloc_pattern: Some(0xDD),
            track_stats: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_eager_and_silent() {
        let config = PoolConfig::default();
        assert!(!config.leave_free_block);
        assert!(config.alloc_pattern.is_none());
        assert!(config.dealloc_pattern.is_none());
        assert!(!config.track_stats);
        assert_eq!(config, PoolConfig::production());
    }

    #[test]
    fn test_debug_preset_enables_diagnostics() {
        let config = PoolConfig::debug();
        assert!(config.alloc_pattern.is_some());
        assert!(config.dealloc_pattern.is_some());
        assert!(config.track_stats);
    }
}
