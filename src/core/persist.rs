//! Snapshot and restore of a grid through caller-supplied readers and writers.
//!
//! Layout:
//! - magic: `CORTEX01`
//! - version: u32 LE
//! - chunks: tag `[u8; 4]`, payload length u32 LE, payload
//!
//! Chunks written today are `CNST` (constants), `MEMS` (memories per cell) and the `END!`
//! terminator. Payloads are bincode. Readers skip chunk tags they do not know, so newer writers
//! can add chunks without breaking older readers; a newer format version is refused.
//! Scratch fields (activity, super-activity, energy) are not stored.

use super::{
    constants::Constants,
    error::{CortexError, Result},
    grid::Grid,
    memory::Memory,
};
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use tracing::debug;

pub const MAGIC: &[u8; 8] = b"CORTEX01";
pub const VERSION_V1: u32 = 1;
pub const VERSION_CURRENT: u32 = VERSION_V1;

pub const TAG_CONSTANTS: [u8; 4] = *b"CNST";
pub const TAG_MEMORIES: [u8; 4] = *b"MEMS";
pub const TAG_END: [u8; 4] = *b"END!";

/// Memories of every non-empty cell, keyed by linear cell index.
#[derive(Debug, Serialize, Deserialize)]
struct MemorySnapshot {
    vector_len: Option<usize>,
    cells: Vec<(u32, Vec<Memory>)>,
}

pub fn write_u32_le<W: Write>(w: &mut W, v: u32) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

pub fn read_u32_le<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub fn write_chunk<W: Write>(w: &mut W, tag: [u8; 4], payload: &[u8]) -> io::Result<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "chunk too large"))?;
    w.write_all(&tag)?;
    write_u32_le(w, len)?;
    w.write_all(payload)
}

pub fn read_chunk_header<R: Read>(r: &mut R) -> io::Result<([u8; 4], u32)> {
    let mut tag = [0u8; 4];
    r.read_exact(&mut tag)?;
    let len = read_u32_le(r)?;
    Ok((tag, len))
}

/// Reads a `len`-byte chunk body. The buffer grows with the bytes actually present, so a corrupt
/// length cannot force a large up-front allocation.
fn read_payload<R: Read>(r: &mut R, len: u32) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    r.take(u64::from(len)).read_to_end(&mut buf)?;
    if buf.len() != len as usize {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "chunk shorter than its header",
        ));
    }
    Ok(buf)
}

/// Writes a snapshot of `grid` to `w`.
pub fn save_grid<W: Write>(grid: &Grid, mut w: W) -> Result<()> {
    w.write_all(MAGIC)?;
    write_u32_le(&mut w, VERSION_CURRENT)?;

    write_chunk(&mut w, TAG_CONSTANTS, &bincode::serialize(&*grid.constants)?)?;

    let snapshot = MemorySnapshot {
        vector_len: grid.vector_len,
        cells: grid
            .cells
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_ref().map(|c| (i, c)))
            .filter(|(_, c)| !c.store.is_empty())
            .map(|(i, c)| (i as u32, c.store.iter().cloned().collect()))
            .collect(),
    };
    write_chunk(&mut w, TAG_MEMORIES, &bincode::serialize(&snapshot)?)?;

    write_chunk(&mut w, TAG_END, &[])?;
    w.flush()?;
    Ok(())
}

/// Rebuilds a grid from a snapshot written by [`save_grid`].
pub fn load_grid<R: Read>(mut r: R) -> Result<Grid> {
    let mut magic = [0u8; 8];
    r.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(CortexError::BadMagic);
    }
    let version = read_u32_le(&mut r)?;
    if version > VERSION_CURRENT {
        return Err(CortexError::UnsupportedVersion(version));
    }

    let mut constants: Option<Constants> = None;
    let mut memories: Option<MemorySnapshot> = None;

    loop {
        let (tag, len) = read_chunk_header(&mut r)?;
        match tag {
            TAG_CONSTANTS => constants = Some(bincode::deserialize(&read_payload(&mut r, len)?)?),
            TAG_MEMORIES => memories = Some(bincode::deserialize(&read_payload(&mut r, len)?)?),
            TAG_END => break,
            other => {
                debug!(tag = %String::from_utf8_lossy(&other), len, "skipping unknown chunk");
                io::copy(&mut (&mut r).take(u64::from(len)), &mut io::sink())?;
            }
        }
    }

    let constants = constants.ok_or(CortexError::MissingChunk(TAG_CONSTANTS))?;
    let memories = memories.ok_or(CortexError::MissingChunk(TAG_MEMORIES))?;

    let mut grid = Grid::build(constants)?;
    grid.vector_len = memories.vector_len;
    for (index, stored) in memories.cells {
        let coords = grid.topology.coordinates(index as usize);
        for memory in stored {
            grid.insert(coords, memory)?;
        }
    }
    Ok(grid)
}
