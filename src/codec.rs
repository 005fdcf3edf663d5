//! Identifier codec
//!
//! Record ids are stored as fixed-width 8-byte little-endian keys. The id
//! allocator's counter uses the same encoding for its value, stored under
//! [`NEXT_ID_KEY`], which is 10 bytes long and so can never equal a record key.

use crate::error::{Result, VaultError};

/// Width of an encoded id
pub const ID_SIZE: usize = 8;

/// Reserved key holding the allocator counter
pub const NEXT_ID_KEY: &[u8] = b"__nextID__";

/// Encode an id as 8 little-endian bytes
pub fn encode_id(id: i64) -> [u8; ID_SIZE] {
    id.to_le_bytes()
}

/// Decode 8 little-endian bytes into an id
///
/// Anything other than exactly [`ID_SIZE`] bytes is rejected.
pub fn decode_id(bytes: &[u8]) -> Result<i64> {
    let raw: [u8; ID_SIZE] = bytes.try_into().map_err(|_| {
        VaultError::Storage(format!(
            "encoded id must be {} bytes, got {}",
            ID_SIZE,
            bytes.len()
        ))
    })?;
    Ok(i64::from_le_bytes(raw))
}
