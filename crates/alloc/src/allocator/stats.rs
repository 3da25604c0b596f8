//! Allocator statistics tracking
//!
//! Provides structures for collecting allocation counters. The recorder is
//! atomic so that an allocator embedding it can live in a `static` (the
//! default heap does); every update uses relaxed ordering because the
//! counters are diagnostics, not synchronization.

use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Statistics for memory allocators
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocatorStats {
    /// Total bytes currently allocated
    pub allocated_bytes: usize,
    /// Peak bytes allocated (high-water mark)
    pub peak_allocated_bytes: usize,
    /// Total number of successful allocations
    pub allocation_count: usize,
    /// Total number of deallocations
    pub deallocation_count: usize,
    /// Number of failed allocations
    pub failed_allocations: usize,
    /// Number of bulk resets (arena clears)
    pub reset_count: usize,
    /// Total bytes ever allocated (cumulative)
    pub total_bytes_allocated: usize,
}

impl AllocatorStats {
    /// Calculate the average allocation size
    pub fn average_allocation_size(&self) -> Option<f64> {
        if self.allocation_count > 0 {
            Some(self.total_bytes_allocated as f64 / self.allocation_count as f64)
        } else {
            None
        }
    }

    /// Allocations not yet matched by a deallocation
    pub fn live_allocations(&self) -> usize {
        self.allocation_count.saturating_sub(self.deallocation_count)
    }

    /// Fraction of allocation attempts that succeeded (0.0 to 1.0)
    pub fn allocation_efficiency(&self) -> f64 {
        let total_attempts = self.allocation_count + self.failed_allocations;
        if total_attempts > 0 {
            self.allocation_count as f64 / total_attempts as f64
        } else {
            1.0
        }
    }
}

impl fmt::Display for AllocatorStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Allocator Statistics:")?;
        writeln!(f, "  Current allocated: {} bytes", self.allocated_bytes)?;
        writeln!(f, "  Peak allocated: {} bytes", self.peak_allocated_bytes)?;
        writeln!(f, "  Allocations: {}", self.allocation_count)?;
        writeln!(f, "  Deallocations: {}", self.deallocation_count)?;
        writeln!(f, "  Failed allocations: {}", self.failed_allocations)?;
        writeln!(f, "  Resets: {}", self.reset_count)?;

        if let Some(avg) = self.average_allocation_size() {
            writeln!(f, "  Average allocation size: {avg:.2} bytes")?;
        }

        writeln!(
            f,
            "  Allocation efficiency: {:.2}%",
            self.allocation_efficiency() * 100.0
        )
    }
}

/// Atomic recorder behind [`AllocatorStats`]
pub struct AtomicAllocatorStats {
    allocated_bytes: AtomicUsize,
    peak_allocated_bytes: AtomicUsize,
    allocation_count: AtomicUsize,
    deallocation_count: AtomicUsize,
    failed_allocations: AtomicUsize,
    reset_count: AtomicUsize,
    total_bytes_allocated: AtomicUsize,
}

impl AtomicAllocatorStats {
    /// Creates a new empty atomic stats object
    pub const fn new() -> Self {
        Self {
            allocated_bytes: AtomicUsize::new(0),
            peak_allocated_bytes: AtomicUsize::new(0),
            allocation_count: AtomicUsize::new(0),
            deallocation_count: AtomicUsize::new(0),
            failed_allocations: AtomicUsize::new(0),
            reset_count: AtomicUsize::new(0),
            total_bytes_allocated: AtomicUsize::new(0),
        }
    }

    /// Record a successful allocation of `size` bytes
    pub fn record_allocation(&self, size: usize) {
        self.allocation_count.fetch_add(1, Ordering::Relaxed);
        self.total_bytes_allocated
            .fetch_add(size, Ordering::Relaxed);
        let current = self.allocated_bytes.fetch_add(size, Ordering::Relaxed) + size;
        self.peak_allocated_bytes
            .fetch_max(current, Ordering::Relaxed);
    }

    /// Record a deallocation of `size` bytes
    pub fn record_deallocation(&self, size: usize) {
        self.deallocation_count.fetch_add(1, Ordering::Relaxed);
        let previous = self.allocated_bytes.fetch_sub(size, Ordering::Relaxed);
        debug_assert!(previous >= size, "deallocated more bytes than allocated");
    }

    /// Record a failed allocation
    pub fn record_allocation_failure(&self) {
        self.failed_allocations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a bulk reset that released every live byte at once
    pub fn record_reset(&self) {
        self.reset_count.fetch_add(1, Ordering::Relaxed);
        self.allocated_bytes.store(0, Ordering::Relaxed);
    }

    /// Get a snapshot of the current statistics
    pub fn snapshot(&self) -> AllocatorStats {
        AllocatorStats {
            allocated_bytes: self.allocated_bytes.load(Ordering::Relaxed),
            peak_allocated_bytes: self.peak_allocated_bytes.load(Ordering::Relaxed),
            allocation_count: self.allocation_count.load(Ordering::Relaxed),
            deallocation_count: self.deallocation_count.load(Ordering::Relaxed),
            failed_allocations: self.failed_allocations.load(Ordering::Relaxed),
            reset_count: self.reset_count.load(Ordering::Relaxed),
            total_bytes_allocated: self.total_bytes_allocated.load(Ordering::Relaxed),
        }
    }

    /// Get current allocated bytes
    #[inline]
    pub fn current_allocated(&self) -> usize {
        self.allocated_bytes.load(Ordering::Relaxed)
    }

    /// Get peak allocated bytes
    #[inline]
    pub fn peak_allocated(&self) -> usize {
        self.peak_allocated_bytes.load(Ordering::Relaxed)
    }
}

impl Default for AtomicAllocatorStats {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AtomicAllocatorStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.snapshot(), f)
    }
}

/// Trait for allocators that support statistics collection
pub trait StatisticsProvider {
    /// Get current statistics
    fn statistics(&self) -> AllocatorStats;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_is_monotonic() {
        let stats = AtomicAllocatorStats::new();
        stats.record_allocation(100);
        stats.record_allocation(50);
        stats.record_deallocation(100);
        stats.record_allocation(20);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.allocated_bytes, 70);
        assert_eq!(snapshot.peak_allocated_bytes, 150);
        assert_eq!(snapshot.live_allocations(), 2);
        assert_eq!(snapshot.total_bytes_allocated, 170);
    }

    #[test]
    fn test_reset_keeps_peak() {
        let stats = AtomicAllocatorStats::new();
        stats.record_allocation(64);
        stats.record_reset();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.allocated_bytes, 0);
        assert_eq!(snapshot.peak_allocated_bytes, 64);
        assert_eq!(snapshot.reset_count, 1);
    }

    #[test]
    fn test_efficiency() {
        let stats = AtomicAllocatorStats::new();
        assert!((stats.snapshot().allocation_efficiency() - 1.0).abs() < f64::EPSILON);

        stats.record_allocation(8);
        stats.record_allocation_failure();
        assert!((stats.snapshot().allocation_efficiency() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_display() {
        let stats = AtomicAllocatorStats::new();
        stats.record_allocation(16);
        let text = stats.snapshot().to_string();
        assert!(text.contains("Current allocated: 16 bytes"));
        assert!(text.contains("Average allocation size: 16.00 bytes"));
    }
}
