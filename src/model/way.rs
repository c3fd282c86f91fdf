use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::node::NodeId;
use super::{Expandable, ExpandError, Skeleton, TemporalItem, Timestamp, NOW};

/// Way id; 0 is the void sentinel.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct WayId(pub u64);

impl Display for WayId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A way's live form: its id and the ordered node references.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WaySkeleton {
    pub id: WayId,
    pub nds: Vec<NodeId>,
}

impl WaySkeleton {
    pub fn new(id: WayId, nds: Vec<NodeId>) -> Self {
        Self { id, nds }
    }
}

/// A differential encoding of a way state. Either a full replacement or a
/// patch of removed base positions and inserted `(position, node)` pairs,
/// positions referring to the patched sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WayDelta {
    pub id: WayId,
    pub full: bool,
    pub nds: Vec<NodeId>,
    pub nds_removed: Vec<u32>,
    pub nds_added: Vec<(u32, NodeId)>,
}

impl WayDelta {
    /// A delta carrying the complete next state.
    pub fn full(id: WayId, nds: Vec<NodeId>) -> Self {
        Self {
            id,
            full: true,
            nds,
            nds_removed: Vec::new(),
            nds_added: Vec::new(),
        }
    }

    /// A differential delta against the previous state.
    pub fn diff(id: WayId, nds_removed: Vec<u32>, nds_added: Vec<(u32, NodeId)>) -> Self {
        Self {
            id,
            full: false,
            nds: Vec::new(),
            nds_removed,
            nds_added,
        }
    }
}

impl Skeleton for WaySkeleton {
    type Id = WayId;

    fn id(&self) -> WayId {
        self.id
    }

    fn is_void(&self) -> bool {
        self.id.0 == 0
    }

    fn void() -> Self {
        Self::default()
    }

    fn kind_name() -> &'static str {
        "Way"
    }
}

impl TemporalItem for WaySkeleton {
    type Id = WayId;

    fn item_id(&self) -> WayId {
        self.id
    }

    fn item_timestamp(&self) -> Timestamp {
        NOW
    }
}

impl Expandable for WaySkeleton {
    type Delta = WayDelta;

    fn delta_id(delta: &WayDelta) -> WayId {
        delta.id
    }

    fn expand(delta: &WayDelta, base: &Self) -> Result<Self, ExpandError> {
        if delta.full {
            return Ok(WaySkeleton::new(delta.id, delta.nds.clone()));
        }
        if base.is_void() || base.id != delta.id {
            return Err(ExpandError::MissingBase);
        }

        let mut nds = Vec::with_capacity(base.nds.len() + delta.nds_added.len());
        let mut removed = delta.nds_removed.iter().peekable();
        for (pos, nd) in base.nds.iter().enumerate() {
            if removed.next_if(|&&r| r as usize == pos).is_some() {
                continue;
            }
            nds.push(*nd);
        }
        if let Some(&&r) = removed.peek() {
            return Err(ExpandError::InvalidDiff(format!(
                "removal position {r} beyond {} base references",
                base.nds.len()
            )));
        }

        for &(pos, nd) in &delta.nds_added {
            if pos as usize > nds.len() {
                return Err(ExpandError::InvalidDiff(format!(
                    "insert position {pos} beyond {} references",
                    nds.len()
                )));
            }
            nds.insert(pos as usize, nd);
        }

        Ok(WaySkeleton::new(delta.id, nds))
    }
}
