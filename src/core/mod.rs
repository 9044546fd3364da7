/*!
 * Core Primitives
 * Shared types and tunables for the allocator
 */

pub mod limits;
pub mod types;
