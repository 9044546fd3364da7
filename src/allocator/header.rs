/*!
 * Allocation Metadata
 * Size prefix and trailing header packed around each payload
 *
 * Layout of one reservation, starting at the unaligned base offset the
 * freelist handed out:
 *
 * ```text
 * base .. aligned-4   alignment slack (unused)
 * aligned-4 .. aligned    u32 LE size prefix
 * aligned .. aligned+size payload (caller-owned bytes)
 * aligned+size .. +8      u64 LE base offset
 * +8 .. +12               u32 LE alignment
 * ```
 *
 * The prefix lets `free` find the trailing header by adding the payload
 * size, without any external lookup structure. All encode/decode is plain
 * byte-slice math; callers bounds-check before reaching here.
 */

use crate::core::types::{Address, Size};

/// Bytes of the u32 size prefix stored before the payload
pub const SIZE_PREFIX_LEN: usize = 4;

/// Bytes of the trailing header: u64 base offset + u32 alignment
pub const HEADER_LEN: usize = 12;

/// Fixed per-allocation metadata beyond alignment slack
pub const METADATA_LEN: usize = SIZE_PREFIX_LEN + HEADER_LEN;

/// Trailing header contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct AllocHeader {
    /// Unaligned offset of the reservation as handed out by the freelist
    pub base_offset: Address,
    /// Alignment the caller requested
    pub alignment: Size,
}

/// Write the size prefix for the payload starting at `aligned`.
pub(super) fn write_prefix(arena: &mut [u8], aligned: Address, size: Size) {
    let at = aligned - SIZE_PREFIX_LEN;
    arena[at..aligned].copy_from_slice(&(size as u32).to_le_bytes());
}

/// Read back the payload size for the allocation at `aligned`.
pub(super) fn read_prefix(arena: &[u8], aligned: Address) -> Size {
    let at = aligned - SIZE_PREFIX_LEN;
    let mut raw = [0u8; SIZE_PREFIX_LEN];
    raw.copy_from_slice(&arena[at..aligned]);
    u32::from_le_bytes(raw) as Size
}

/// Write the trailing header after the `size`-byte payload at `aligned`.
pub(super) fn write_header(arena: &mut [u8], aligned: Address, size: Size, header: AllocHeader) {
    let at = aligned + size;
    arena[at..at + 8].copy_from_slice(&(header.base_offset as u64).to_le_bytes());
    arena[at + 8..at + HEADER_LEN].copy_from_slice(&(header.alignment as u32).to_le_bytes());
}

/// Read the trailing header after the `size`-byte payload at `aligned`.
pub(super) fn read_header(arena: &[u8], aligned: Address, size: Size) -> AllocHeader {
    let at = aligned + size;
    let mut base = [0u8; 8];
    base.copy_from_slice(&arena[at..at + 8]);
    let mut alignment = [0u8; 4];
    alignment.copy_from_slice(&arena[at + 8..at + HEADER_LEN]);
    AllocHeader {
        base_offset: u64::from_le_bytes(base) as Address,
        alignment: u32::from_le_bytes(alignment) as Size,
    }
}

/// Zero the prefix and trailing header of a freed allocation so a second
/// free of the same address reads an impossible (zero) size and is rejected
/// instead of corrupting the freelist.
pub(super) fn scrub(arena: &mut [u8], aligned: Address, size: Size) {
    arena[aligned - SIZE_PREFIX_LEN..aligned].fill(0);
    let at = aligned + size;
    arena[at..at + HEADER_LEN].fill(0);
}
