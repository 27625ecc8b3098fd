//! Id-list payload stored under each index key.
//!
//! ```text
//! [count u32][id u64][id u64]...     little-endian, ids ascending
//! ```

use std::collections::BTreeSet;

use crate::common::DocumentId;

/// Encode a set of ids.
pub fn encode(ids: &BTreeSet<DocumentId>) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + ids.len() * 8);
    buf.extend_from_slice(&(ids.len() as u32).to_le_bytes());
    for id in ids {
        buf.extend_from_slice(&id.0.to_le_bytes());
    }
    buf
}

/// Decode a payload produced by [`encode`].
///
/// Returns a description of the problem when the length prefix disagrees
/// with the payload size.
pub fn decode(bytes: &[u8]) -> Result<BTreeSet<DocumentId>, String> {
    if bytes.len() < 4 {
        return Err(format!("id list too short ({} bytes)", bytes.len()));
    }
    let mut count = [0u8; 4];
    count.copy_from_slice(&bytes[..4]);
    let count = u32::from_le_bytes(count) as usize;

    let body = &bytes[4..];
    if body.len() != count * 8 {
        return Err(format!(
            "id list declares {} ids but carries {} bytes",
            count,
            body.len()
        ));
    }

    Ok(body
        .chunks_exact(8)
        .map(|chunk| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            DocumentId(u64::from_le_bytes(raw))
        })
        .collect())
}
