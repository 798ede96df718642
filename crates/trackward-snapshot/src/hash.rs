//! FNV-1a hashing of world records.
//!
//! Hashes are used to check that a restored dispatcher replays to the same
//! state as the one it was saved from. They are not cryptographically
//! secure.

use std::io::{self, Write};

use crate::codec::encode_world;
use crate::types::WorldRecord;

/// FNV-1a offset basis for 64-bit.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x00000100000001B3;

#[inline]
fn fnv1a_byte(hash: u64, byte: u8) -> u64 {
    (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
}

/// FNV-1a hash of `bytes`.
pub fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |h, &b| fnv1a_byte(h, b))
}

/// A `Write` sink that folds everything written into an FNV-1a state.
struct FnvWriter {
    hash: u64,
}

impl Write for FnvWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &b in buf {
            self.hash = fnv1a_byte(self.hash, b);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Hash of the encoded form of `world`.
///
/// Equal records hash equal; any field change, including float bit
/// patterns, changes the hash.
pub fn world_hash(world: &WorldRecord) -> u64 {
    let mut sink = FnvWriter { hash: FNV_OFFSET };
    // FnvWriter never fails, so neither does encoding into it.
    let _ = encode_world(&mut sink, world);
    sink.hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::to_bytes;
    use trackward_core::{TickId, TrainId};

    #[test]
    fn empty_input_is_offset_basis() {
        assert_eq!(fnv1a(&[]), FNV_OFFSET);
    }

    #[test]
    fn known_vector() {
        // Reference value for "a" from the FNV test suite.
        assert_eq!(fnv1a(b"a"), 0xaf63dc4c8601ec8c);
    }

    #[test]
    fn world_hash_matches_encoded_bytes() {
        let world = WorldRecord {
            tick: TickId(12),
            ..WorldRecord::default()
        };
        let bytes = to_bytes(&world).unwrap();
        assert_eq!(world_hash(&world), fnv1a(&bytes));
    }

    #[test]
    fn tick_changes_hash() {
        let a = WorldRecord::default();
        let b = WorldRecord {
            tick: TickId(1),
            ..WorldRecord::default()
        };
        assert_ne!(world_hash(&a), world_hash(&b));
    }

    #[test]
    fn claim_order_changes_hash() {
        use crate::types::SectionRecord;
        let mk = |claims: Vec<TrainId>| WorldRecord {
            sections: vec![SectionRecord {
                claims,
                ..SectionRecord::default()
            }],
            ..WorldRecord::default()
        };
        assert_ne!(
            world_hash(&mk(vec![TrainId(1), TrainId(2)])),
            world_hash(&mk(vec![TrainId(2), TrainId(1)]))
        );
    }
}
