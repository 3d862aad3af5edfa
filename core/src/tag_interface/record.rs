use crate::prelude::{LocalizerError, LocalizerResult};
use serde::{Deserialize, Serialize};

/// Size of the serialized position record in bytes.
pub const RECORD_LEN: usize = 34;

const RESERVED_LEN: usize = 6;

/// Outbound record carrying both candidate positions.
///
/// Layout (little-endian):
/// ```text
/// [0..6)   reserved, zero
/// [6..10)  group id (i32)
/// [10..34) x1 y1 z1 x2 y2 z2 (f32 each)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub group_id: i32,
    pub first: [f32; 3],
    pub second: [f32; 3],
}

impl PositionRecord {
    pub fn new(group_id: i32, first: [f32; 3], second: [f32; 3]) -> Self {
        Self {
            group_id,
            first,
            second,
        }
    }

    pub fn to_bytes(&self) -> [u8; RECORD_LEN] {
        let mut buf = [0u8; RECORD_LEN];
        buf[RESERVED_LEN..RESERVED_LEN + 4].copy_from_slice(&self.group_id.to_le_bytes());
        let coords = self.first.iter().chain(self.second.iter());
        for (slot, value) in buf[RESERVED_LEN + 4..].chunks_exact_mut(4).zip(coords) {
            slot.copy_from_slice(&value.to_le_bytes());
        }
        buf
    }

    pub fn from_bytes(data: &[u8]) -> LocalizerResult<Self> {
        if data.len() != RECORD_LEN {
            return Err(LocalizerError::DimensionMismatch {
                what: "position record",
                expected: RECORD_LEN,
                actual: data.len(),
            });
        }
        let word = |offset: usize| {
            [
                data[offset],
                data[offset + 1],
                data[offset + 2],
                data[offset + 3],
            ]
        };
        let coord = |index: usize| f32::from_le_bytes(word(RESERVED_LEN + 4 + 4 * index));
        Ok(Self {
            group_id: i32::from_le_bytes(word(RESERVED_LEN)),
            first: [coord(0), coord(1), coord(2)],
            second: [coord(3), coord(4), coord(5)],
        })
    }
}
