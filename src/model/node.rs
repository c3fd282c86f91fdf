use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::{Skeleton, TemporalItem, Timestamp, NOW};

/// Node id; 0 is the void sentinel.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NodeId(pub u64);

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node's live form: its id and the lower coordinate bits. The upper
/// bits are the spatial bucket index the node is filed under.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeSkeleton {
    pub id: NodeId,
    pub ll_lower: u32,
}

impl NodeSkeleton {
    pub fn new(id: NodeId, ll_lower: u32) -> Self {
        Self { id, ll_lower }
    }
}

impl Skeleton for NodeSkeleton {
    type Id = NodeId;

    fn id(&self) -> NodeId {
        self.id
    }

    fn is_void(&self) -> bool {
        self.id.0 == 0
    }

    fn void() -> Self {
        Self::default()
    }

    fn kind_name() -> &'static str {
        "Node"
    }
}

impl TemporalItem for NodeSkeleton {
    type Id = NodeId;

    fn item_id(&self) -> NodeId {
        self.id
    }

    fn item_timestamp(&self) -> Timestamp {
        NOW
    }
}
