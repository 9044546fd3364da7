/*!
 * Allocator Limits
 * Default capacities and diagnostic thresholds
 */

// =============================================================================
// ARENA LIMITS
// =============================================================================

/// Suggested arena capacity for general-purpose use (64MB)
pub const DEFAULT_ARENA_SIZE: usize = 64 * 1024 * 1024;

/// Minimum number of freelist node entries, so tiny arenas still get a
/// usable pool
pub const MIN_FREELIST_ENTRIES: usize = 8;

// =============================================================================
// MEMORY PRESSURE THRESHOLDS
// =============================================================================

/// Usage ratio above which pressure is reported as medium
pub const PRESSURE_MEDIUM: f64 = 0.60;

/// Usage ratio above which allocations log a warning
pub const PRESSURE_WARNING: f64 = 0.80;

/// Usage ratio above which pressure is critical
pub const PRESSURE_CRITICAL: f64 = 0.95;
