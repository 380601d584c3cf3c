//! Block tables used by zone and placement files
//!
//! ```text
//! 0x00: block_count u32
//! 0x04: block_count × (block_type u32, offset u32)
//! ```
//!
//! Offsets are absolute. Blocks are parsed by seeking, never by file order.

use rose_shared::{AssetResult, ByteReader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockEntry {
    pub kind: u32,
    pub offset: usize,
}

pub(crate) fn read_block_table(reader: &mut ByteReader<'_>) -> AssetResult<Vec<BlockEntry>> {
    let count = reader.read_u32()? as usize;
    reader.ensure_available("block table", count, 8)?;

    let mut blocks = Vec::with_capacity(count);
    for _ in 0..count {
        let kind = reader.read_u32()?;
        let offset = reader.read_u32()? as usize;
        blocks.push(BlockEntry { kind, offset });
    }
    Ok(blocks)
}
