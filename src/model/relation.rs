use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::{Expandable, ExpandError, Skeleton, TemporalItem, Timestamp, NOW};

/// Relation id; 0 is the void sentinel.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RelationId(pub u64);

impl Display for RelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum MemberType {
    Node,
    Way,
    Relation,
}

/// One membership line: the referenced object, its kind, and the role
/// (an id into the role dictionary, which lives outside the skeleton).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationMember {
    pub member_type: MemberType,
    pub ref_id: u64,
    pub role: u32,
}

/// A relation's live form: its id and the ordered member list.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationSkeleton {
    pub id: RelationId,
    pub members: Vec<RelationMember>,
}

impl RelationSkeleton {
    pub fn new(id: RelationId, members: Vec<RelationMember>) -> Self {
        Self { id, members }
    }
}

/// A differential encoding of a relation state, same shape as the way
/// delta: full replacement or removed/inserted member positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDelta {
    pub id: RelationId,
    pub full: bool,
    pub members: Vec<RelationMember>,
    pub members_removed: Vec<u32>,
    pub members_added: Vec<(u32, RelationMember)>,
}

impl RelationDelta {
    pub fn full(id: RelationId, members: Vec<RelationMember>) -> Self {
        Self {
            id,
            full: true,
            members,
            members_removed: Vec::new(),
            members_added: Vec::new(),
        }
    }

    pub fn diff(
        id: RelationId,
        members_removed: Vec<u32>,
        members_added: Vec<(u32, RelationMember)>,
    ) -> Self {
        Self {
            id,
            full: false,
            members: Vec::new(),
            members_removed,
            members_added,
        }
    }
}

impl Skeleton for RelationSkeleton {
    type Id = RelationId;

    fn id(&self) -> RelationId {
        self.id
    }

    fn is_void(&self) -> bool {
        self.id.0 == 0
    }

    fn void() -> Self {
        Self::default()
    }

    fn kind_name() -> &'static str {
        "Relation"
    }
}

impl TemporalItem for RelationSkeleton {
    type Id = RelationId;

    fn item_id(&self) -> RelationId {
        self.id
    }

    fn item_timestamp(&self) -> Timestamp {
        NOW
    }
}

impl Expandable for RelationSkeleton {
    type Delta = RelationDelta;

    fn delta_id(delta: &RelationDelta) -> RelationId {
        delta.id
    }

    fn expand(delta: &RelationDelta, base: &Self) -> Result<Self, ExpandError> {
        if delta.full {
            return Ok(RelationSkeleton::new(delta.id, delta.members.clone()));
        }
        if base.is_void() || base.id != delta.id {
            return Err(ExpandError::MissingBase);
        }

        let mut members = Vec::with_capacity(base.members.len() + delta.members_added.len());
        let mut removed = delta.members_removed.iter().peekable();
        for (pos, member) in base.members.iter().enumerate() {
            if removed.next_if(|&&r| r as usize == pos).is_some() {
                continue;
            }
            members.push(*member);
        }
        if let Some(&&r) = removed.peek() {
            return Err(ExpandError::InvalidDiff(format!(
                "removal position {r} beyond {} base members",
                base.members.len()
            )));
        }

        for &(pos, member) in &delta.members_added {
            if pos as usize > members.len() {
                return Err(ExpandError::InvalidDiff(format!(
                    "insert position {pos} beyond {} members",
                    members.len()
                )));
            }
            members.insert(pos as usize, member);
        }

        Ok(RelationSkeleton::new(delta.id, members))
    }
}
