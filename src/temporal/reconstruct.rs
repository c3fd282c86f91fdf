use tracing::error;

use crate::model::{Attic, Expandable, ExpandError, Skeleton, TemporalItem, Timestamp, NOW};
use crate::stream::{IndexedStream, Predicate};

/// Consumes one bucket of a stream whose items carry their own validity
/// timestamp, recording every version seen and keeping those the predicate
/// admits. An item is a version candidate when it is live, or when its
/// timestamp lies strictly after the query timestamp: equality means the
/// object had already changed *to* that state by then.
pub(super) fn consume_bucket<S>(
    stream: &mut S,
    idx: &S::Idx,
    timestamp: Timestamp,
    result: &mut Vec<S::Obj>,
    timestamp_by_id: &mut Vec<(<S::Obj as TemporalItem>::Id, Timestamp)>,
    count: &mut u32,
    admit: impl Fn(&S::Obj) -> bool,
) where
    S: IndexedStream,
    S::Obj: TemporalItem,
{
    while stream.index() == Some(idx) {
        *count += 1;
        let ts = match stream.handle() {
            Some(object) => object.item_timestamp(),
            None => break,
        };
        let Some((_, object)) = stream.advance() else {
            break;
        };
        if ts == NOW || timestamp < ts {
            timestamp_by_id.push((object.item_id(), ts));
            if admit(&object) {
                result.push(object);
            }
        }
    }
}

/// Consumes one bucket of lockstepped current and attic streams for a
/// delta-encoded kind, reconstructing every attic version by expansion.
///
/// Each delta is a backward diff against the version that replaced it, so
/// the chain walks newest to oldest: the newest kept delta of an id
/// expands against the live skeleton, each older one against the version
/// the previous expansion produced. Only the version whose timestamp is
/// the bucket-smallest for its id is emitted; the rest exist to keep the
/// chain walkable.
#[allow(clippy::too_many_arguments)]
pub(super) fn reconstruct_expanded_bucket<O, CS, AS, P>(
    current: &mut CS,
    attic: &mut AS,
    idx: &CS::Idx,
    predicate: &P,
    timestamp: Timestamp,
    result: &mut Vec<O>,
    attic_result: &mut Vec<Attic<O>>,
    timestamp_by_id: &mut Vec<(<O as Skeleton>::Id, Timestamp)>,
) where
    O: Expandable,
    CS: IndexedStream<Obj = O>,
    AS: IndexedStream<Idx = CS::Idx, Obj = Attic<O::Delta>>,
    P: Predicate<O>,
{
    let mut skels: Vec<O> = Vec::new();
    let mut deltas: Vec<Attic<O::Delta>> = Vec::new();
    let mut local_timestamp_by_id: Vec<(O::Id, Timestamp)> = Vec::new();

    while current.index() == Some(idx) {
        let Some((_, object)) = current.advance() else {
            break;
        };
        timestamp_by_id.push((object.id(), NOW));
        local_timestamp_by_id.push((object.id(), NOW));
        skels.push(object);
    }

    while attic.index() == Some(idx) {
        let keep = attic
            .handle()
            .map_or(false, |delta| timestamp < delta.timestamp);
        let Some((_, delta)) = attic.advance() else {
            break;
        };
        if keep {
            let id = O::delta_id(&delta.elem);
            timestamp_by_id.push((id, delta.timestamp));
            local_timestamp_by_id.push((id, delta.timestamp));
            deltas.push(delta);
        }
    }

    skels.sort();
    let mut delta_refs: Vec<&Attic<O::Delta>> = deltas.iter().collect();
    delta_refs.sort_by(|a, b| {
        O::delta_id(&a.elem)
            .cmp(&O::delta_id(&b.elem))
            .then(b.timestamp.cmp(&a.timestamp))
    });
    local_timestamp_by_id.sort();

    let mut attics: Vec<Attic<O>> = Vec::new();
    let mut skels_it = skels.iter().peekable();
    let mut reference = O::void();
    for delta in delta_refs {
        let id = O::delta_id(&delta.elem);
        if reference.id() != id {
            while skels_it.peek().map_or(false, |skel| skel.id() < id) {
                skels_it.next();
            }
            reference = match skels_it.peek() {
                Some(skel) if skel.id() == id => (*skel).clone(),
                _ => O::void(),
            };
        }
        match O::expand(&delta.elem, &reference) {
            Ok(expanded) => {
                reference = expanded.clone();
                let pos = local_timestamp_by_id.partition_point(|pair| *pair < (id, 0));
                if local_timestamp_by_id.get(pos) == Some(&(id, delta.timestamp)) {
                    attics.push(Attic::new(expanded, delta.timestamp));
                }
            }
            Err(ExpandError::MissingBase) => {
                error!(
                    "{} {} cannot be expanded at timestamp {}.",
                    O::kind_name(),
                    id,
                    delta.timestamp
                );
            }
            Err(cause) => {
                error!(
                    "{} {} cannot be expanded at timestamp {}: {}",
                    O::kind_name(),
                    id,
                    delta.timestamp,
                    cause
                );
            }
        }
    }

    for attic_obj in attics {
        if predicate.matches(&attic_obj.elem) {
            attic_result.push(attic_obj);
        }
    }
    for skel in skels {
        if predicate.matches(&skel) {
            result.push(skel);
        }
    }
}

/// Keeps only the items whose version is the chosen one for their id: the
/// first (smallest-timestamp) entry recorded for the id must be exactly
/// this item's timestamp.
pub(super) fn filter_by_timestamp<T: TemporalItem>(
    timestamp_by_id: &[(T::Id, Timestamp)],
    items: &mut Vec<T>,
) {
    items.retain(|item| {
        let id = item.item_id();
        let pos = timestamp_by_id.partition_point(|pair| *pair < (id, 0));
        timestamp_by_id.get(pos) == Some(&(id, item.item_timestamp()))
    });
}

/// Flags duplicated `(id, timestamp)` pairs in a sorted record. Duplicates
/// indicate an upstream bug; the query continues.
pub(super) fn audit_duplicates<O: Skeleton>(timestamp_by_id: &[(O::Id, Timestamp)]) {
    for pair in timestamp_by_id.windows(2) {
        if pair[0] == pair[1] {
            error!(
                "{} {} appears multiple times at timestamp {}",
                O::kind_name(),
                pair[0].0,
                pair[0].1
            );
        }
    }
}
