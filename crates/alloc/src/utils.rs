//! Small helpers shared by the allocators and containers
//!
//! - Human-readable byte formatting for diagnostics
//! - Alignment arithmetic

/// Format bytes as human-readable string
///
/// Converts byte counts to human-readable format with appropriate units.
///
/// # Examples
///
/// ```
/// use nebula_alloc::utils::format_bytes;
///
/// assert_eq!(format_bytes(1024), "1.00 KB");
/// assert_eq!(format_bytes(1536), "1.50 KB");
/// assert_eq!(format_bytes(1048576), "1.00 MB");
/// ```
#[inline]
#[must_use]
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Returns `true` if `value` is a power of two (zero is not)
#[inline(always)]
#[must_use]
pub const fn is_power_of_two(value: usize) -> bool {
    value != 0 && value & (value - 1) == 0
}

/// Rounds `value` up to the next multiple of `align`
///
/// Returns `None` on overflow. `align` must be a power of two.
#[inline(always)]
#[must_use]
pub const fn align_up(value: usize, align: usize) -> Option<usize> {
    debug_assert!(is_power_of_two(align));
    match value.checked_add(align - 1) {
        Some(bumped) => Some(bumped & !(align - 1)),
        None => None,
    }
}
