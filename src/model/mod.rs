//! Object kinds of the geodata model.
//!
//! A *skeleton* is the live form of an object: its id plus geometry or
//! topology, no metadata. The attic store keeps past states, either as
//! full skeletons wrapped in [`Attic`] (nodes) or as deltas against the
//! live form (ways, relations) that are expanded back into skeletons at
//! query time.

pub mod node;
pub mod relation;
pub mod way;

use std::fmt::Display;
use std::ops::Deref;

pub use node::{NodeId, NodeSkeleton};
pub use relation::{MemberType, RelationDelta, RelationId, RelationMember, RelationSkeleton};
pub use way::{WayDelta, WayId, WaySkeleton};

/// Seconds since the Unix epoch.
pub type Timestamp = u64;

/// The sentinel timestamp denoting "present", greater than any real past
/// timestamp.
pub const NOW: Timestamp = u64::MAX;

/// A value paired with the timestamp bounding its validity. For skeletons
/// the timestamp is the instant the object changed away from this state;
/// for deltas it is the instant the patch applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attic<T> {
    pub elem: T,
    pub timestamp: Timestamp,
}

impl<T> Attic<T> {
    pub fn new(elem: T, timestamp: Timestamp) -> Self {
        Self { elem, timestamp }
    }
}

impl<T> Deref for Attic<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.elem
    }
}

/// Why a delta could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpandError {
    /// The delta is differential but no base skeleton with its id exists
    /// in the bucket: an orphan delta, unrecoverable for that record.
    MissingBase,
    /// The delta references element positions the base does not have.
    InvalidDiff(String),
}

impl Display for ExpandError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ExpandError::MissingBase => write!(f, "no base skeleton to expand against"),
            ExpandError::InvalidDiff(msg) => write!(f, "inconsistent diff: {msg}"),
        }
    }
}

/// The live form of an object.
pub trait Skeleton: Clone + Ord {
    type Id: Copy + Ord + std::fmt::Debug + Display;

    fn id(&self) -> Self::Id;

    /// The reserved id value meaning "not present".
    fn is_void(&self) -> bool;

    /// The skeleton with the void id, used as the expansion base when no
    /// real base exists.
    fn void() -> Self;

    /// Kind name for log messages.
    fn kind_name() -> &'static str;
}

/// A skeleton kind whose attic store carries deltas rather than full
/// skeletons.
pub trait Expandable: Skeleton {
    type Delta: Clone;

    fn delta_id(delta: &Self::Delta) -> Self::Id;

    /// Applies `delta` to `base`, yielding the object's next state.
    fn expand(delta: &Self::Delta, base: &Self) -> Result<Self, ExpandError>;
}

/// An object as the temporal engine sees it: an id plus the timestamp of
/// the state it represents. Live skeletons report [`NOW`].
pub trait TemporalItem {
    type Id: Copy + Ord + std::fmt::Debug;

    fn item_id(&self) -> Self::Id;
    fn item_timestamp(&self) -> Timestamp;
}

impl<T: TemporalItem> TemporalItem for Attic<T> {
    type Id = T::Id;

    fn item_id(&self) -> T::Id {
        self.elem.item_id()
    }

    fn item_timestamp(&self) -> Timestamp {
        self.timestamp
    }
}
