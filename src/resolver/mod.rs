//! Resolution of object ids to the indexes their objects are filed under.
//!
//! The current store keeps one index per id in a random-access file. The
//! attic side is sparser: most ids have no history (zero record), some
//! have exactly one extra index, and ids that moved across many buckets
//! overflow into a per-id index-list store marked by an all-`0xff`
//! sentinel record.

pub mod random_file;

pub use random_file::{overflow_sentinel, RandomFile};

use crate::encoding::FixedDiskIndex;
use crate::error::Result;
use crate::model::{Timestamp, NOW};
use crate::stream::{IndexedStream, MemoryBackend};

/// For a sorted list of object ids, produces the sorted, deduplicated
/// list of indexes under which those ids may live. Attic indexes are
/// consulted for historical queries or when `attic_idxs` is set.
pub fn indexes_for_ids<I: FixedDiskIndex>(
    ids: &[u64],
    current: &mut RandomFile<I>,
    attic: &mut RandomFile<I>,
    idx_lists: &MemoryBackend<u64, I>,
    timestamp: Timestamp,
    attic_idxs: bool,
) -> Result<Vec<I>> {
    let mut result = Vec::with_capacity(ids.len());
    for &id in ids {
        result.push(current.get(id)?);
    }
    result.sort();
    result.dedup();

    if timestamp != NOW || attic_idxs {
        let overflow: I = overflow_sentinel()?;
        let mut idx_list_ids = Vec::new();
        for &id in ids {
            let value = attic.get(id)?;
            if value == I::default() {
                // No attic presence for this id.
            } else if value == overflow {
                idx_list_ids.push(id);
            } else {
                result.push(value);
            }
        }

        let mut stream = idx_lists.discrete(idx_list_ids);
        while let Some((_, index)) = stream.advance() {
            result.push(index);
        }

        result.sort();
        result.dedup();
    }

    Ok(result)
}
