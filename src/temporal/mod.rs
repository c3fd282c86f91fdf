//! Temporal reconstruction of object sets.
//!
//! The by-timestamp drivers walk a current stream and an attic stream in
//! lockstep by ascending index, rebuild the version of every object that
//! was in force at the query timestamp, and split the output into live
//! objects and attic (historical) objects keyed by index.
//!
//! # Version selection
//!
//! For each object id the *chosen timestamp* is the smallest recorded
//! timestamp strictly greater than the query timestamp, or `NOW` when no
//! attic record supersedes the live version. An object lands in the live
//! result iff its chosen timestamp is `NOW`, and in the attic result iff
//! its reconstructed validity timestamp is the chosen one. Every
//! `(id, chosen timestamp)` pair appears at most once across both results
//! for one walk; violations are logged and kept.
//!
//! # Cooperative checkpoints
//!
//! The drivers call [`ProgressSink::progress_tick`] on a fixed cadence.
//! When the sink reports stop and the caller supplied a cursor, the
//! driver records the first unprocessed index and returns `true`; the
//! caller may resume with a request clipped by [`shortened_ranges`].
//! Without a cursor the tick is advisory only, matching the discrete and
//! flat collection paths.

pub mod progress;
mod reconstruct;

use std::collections::BTreeMap;

use crate::model::{Attic, Expandable, Skeleton, TemporalItem, Timestamp};
use crate::stream::{IndexedStream, Predicate};

pub use progress::{
    LoadLevel, OnTick, ProgressSink, ResourceGuard, Tick, Unbounded,
    CURRENT_CHECKPOINT_INTERVAL, TIMESTAMP_CHECKPOINT_INTERVAL,
};

use reconstruct::{audit_duplicates, consume_bucket, filter_by_timestamp};

/// Collects the objects of a delta-encoded kind (ways, relations) as they
/// existed at `timestamp`. Returns `true` when the sink stopped the walk
/// early; the first unprocessed index is then stored in `cursor`.
#[allow(clippy::too_many_arguments)]
pub fn collect_by_timestamp<I, O, CS, AS, P, G>(
    mut current: CS,
    mut attic: AS,
    predicate: &P,
    progress: &mut G,
    mut cursor: Option<&mut I>,
    timestamp: Timestamp,
    result: &mut BTreeMap<I, Vec<O>>,
    attic_result: &mut BTreeMap<I, Vec<Attic<O>>>,
) -> bool
where
    I: Ord + Clone,
    O: Expandable + TemporalItem<Id = <O as Skeleton>::Id>,
    CS: IndexedStream<Idx = I, Obj = O>,
    AS: IndexedStream<Idx = I, Obj = Attic<O::Delta>>,
    P: Predicate<O>,
    G: ProgressSink,
{
    let mut count: u32 = 0;
    while current.index().is_some() || attic.index().is_some() {
        let mut timestamp_by_id = Vec::new();

        count += 1;
        let mut stop = false;
        if count >= TIMESTAMP_CHECKPOINT_INTERVAL {
            count = 0;
            let load = LoadLevel::of_map(result).plus(LoadLevel::of_map(attic_result));
            stop = progress.progress_tick(load) == Tick::Stop;
        }
        let idx = next_index(current.index(), attic.index());
        if stop {
            if let Some(cur) = cursor.as_deref_mut() {
                *cur = idx;
                return true;
            }
        }

        let live_bucket = result.entry(idx.clone()).or_default();
        let attic_bucket = attic_result.entry(idx.clone()).or_default();
        reconstruct::reconstruct_expanded_bucket(
            &mut current,
            &mut attic,
            &idx,
            predicate,
            timestamp,
            live_bucket,
            attic_bucket,
            &mut timestamp_by_id,
        );

        timestamp_by_id.sort();
        filter_by_timestamp(&timestamp_by_id, live_bucket);
        filter_by_timestamp(&timestamp_by_id, attic_bucket);
        audit_duplicates::<O>(&timestamp_by_id);
    }
    false
}

/// Collects the objects of a kind whose attic store carries full
/// skeletons (nodes): no delta expansion, otherwise the same selection
/// and checkpointing as [`collect_by_timestamp`].
#[allow(clippy::too_many_arguments)]
pub fn collect_simple_by_timestamp<I, O, CS, AS, P, G>(
    mut current: CS,
    mut attic: AS,
    predicate: &P,
    progress: &mut G,
    mut cursor: Option<&mut I>,
    timestamp: Timestamp,
    result: &mut BTreeMap<I, Vec<O>>,
    attic_result: &mut BTreeMap<I, Vec<Attic<O>>>,
) -> bool
where
    I: Ord + Clone,
    O: Skeleton + TemporalItem<Id = <O as Skeleton>::Id>,
    CS: IndexedStream<Idx = I, Obj = O>,
    AS: IndexedStream<Idx = I, Obj = Attic<O>>,
    P: Predicate<O>,
    G: ProgressSink,
{
    let mut count: u32 = 0;
    while current.index().is_some() || attic.index().is_some() {
        let mut timestamp_by_id = Vec::new();

        count += 1;
        let mut stop = false;
        if count >= TIMESTAMP_CHECKPOINT_INTERVAL {
            count = 0;
            let load = LoadLevel::of_map(result).plus(LoadLevel::of_map(attic_result));
            stop = progress.progress_tick(load) == Tick::Stop;
        }
        let idx = next_index(current.index(), attic.index());
        if stop {
            if let Some(cur) = cursor.as_deref_mut() {
                *cur = idx;
                return true;
            }
        }

        let live_bucket = result.entry(idx.clone()).or_default();
        let attic_bucket = attic_result.entry(idx.clone()).or_default();
        consume_bucket(
            &mut current,
            &idx,
            timestamp,
            live_bucket,
            &mut timestamp_by_id,
            &mut count,
            |object| predicate.matches(object),
        );
        consume_bucket(
            &mut attic,
            &idx,
            timestamp,
            attic_bucket,
            &mut timestamp_by_id,
            &mut count,
            |attic_obj| predicate.matches(&attic_obj.elem),
        );

        timestamp_by_id.sort();
        filter_by_timestamp(&timestamp_by_id, live_bucket);
        filter_by_timestamp(&timestamp_by_id, attic_bucket);
        audit_duplicates::<O>(&timestamp_by_id);
    }
    false
}

/// Collects present-day objects from a discrete or flat stream. The
/// checkpoint reports load but this path never exits early.
pub fn collect_current<I, O, S, P, G>(
    mut stream: S,
    predicate: &P,
    progress: &mut G,
    result: &mut BTreeMap<I, Vec<O>>,
) where
    I: Ord + Clone,
    S: IndexedStream<Idx = I, Obj = O>,
    P: Predicate<O>,
    G: ProgressSink,
{
    let mut count: u32 = 0;
    loop {
        let Some(keep) = stream.handle().map(|handle| predicate.matches(handle)) else {
            break;
        };
        count += 1;
        if count >= CURRENT_CHECKPOINT_INTERVAL {
            count = 0;
            let _ = progress.progress_tick(LoadLevel::of_map(result));
        }
        if let Some((idx, object)) = stream.advance() {
            if keep {
                result.entry(idx).or_default().push(object);
            }
        }
    }
}

/// Collects present-day objects from a range stream with early-exit
/// support. When the sink reports stop, the current bucket is finished,
/// `cur_idx` receives the first unprocessed index and the call returns
/// `true`; resume with the request clipped by [`shortened_ranges`].
pub fn collect_current_range<I, O, S, P, G>(
    mut stream: S,
    predicate: &P,
    progress: &mut G,
    cur_idx: &mut I,
    result: &mut BTreeMap<I, Vec<O>>,
) -> bool
where
    I: Ord + Clone,
    S: IndexedStream<Idx = I, Obj = O>,
    P: Predicate<O>,
    G: ProgressSink,
{
    let mut count: u32 = 0;
    let mut too_much_data = false;
    loop {
        let Some(idx_now) = stream.index().cloned() else {
            break;
        };
        if too_much_data && *cur_idx != idx_now {
            *cur_idx = idx_now;
            return true;
        }
        count += 1;
        if count >= CURRENT_CHECKPOINT_INTERVAL {
            count = 0;
            too_much_data = progress.progress_tick(LoadLevel::of_map(result)) == Tick::Stop;
            *cur_idx = idx_now;
        }
        let keep = stream.handle().map_or(false, |handle| predicate.matches(handle));
        if let Some((idx, object)) = stream.advance() {
            if keep {
                result.entry(idx).or_default().push(object);
            }
        }
    }
    false
}

/// Clips a sorted range request so that a resumed walk restarts at
/// `cur_idx`: ranges wholly below the cursor are dropped, the range
/// containing it is shortened to begin there.
pub fn shortened_ranges<I: Ord + Clone>(req: &[(I, I)], cur_idx: &I) -> Vec<(I, I)> {
    let mut shortened = Vec::new();
    for (lo, hi) in req {
        if hi <= cur_idx {
            continue;
        }
        if lo < cur_idx {
            shortened.push((cur_idx.clone(), hi.clone()));
        } else {
            shortened.push((lo.clone(), hi.clone()));
        }
    }
    shortened
}

fn next_index<I: Ord + Clone>(current: Option<&I>, attic: Option<&I>) -> I {
    match (current, attic) {
        (Some(c), Some(a)) => {
            if c < a {
                c.clone()
            } else {
                a.clone()
            }
        }
        (Some(c), None) => c.clone(),
        (None, Some(a)) => a.clone(),
        (None, None) => unreachable!("both streams exhausted"),
    }
}
