//! Iterator contract between block stores and the temporal engine.
//!
//! A store serves `(index, object)` pairs in strictly ascending index
//! order, driven by one of three request shapes: a discrete set of index
//! keys, a set of half-open index ranges, or the whole store. The engine
//! walks streams in lockstep by comparing `index()` without consuming, and
//! predicates inspect the `handle()` view before an object is taken.

pub mod iterator;

pub use iterator::{MemStream, MemoryBackend};

/// A positioned stream of `(index, object)` pairs in ascending index order.
pub trait IndexedStream {
    type Idx: Ord + Clone;
    type Obj;

    /// Index of the item the stream is positioned on, `None` once
    /// exhausted.
    fn index(&self) -> Option<&Self::Idx>;

    /// Cheap view of the current object, for predicates that can decide
    /// without taking ownership.
    fn handle(&self) -> Option<&Self::Obj>;

    /// Takes the current item and positions on the next.
    fn advance(&mut self) -> Option<(Self::Idx, Self::Obj)>;
}

/// Decides which objects a collection keeps.
pub trait Predicate<O> {
    fn matches(&self, object: &O) -> bool;
}

/// Keeps everything.
pub struct MatchAll;

impl<O> Predicate<O> for MatchAll {
    fn matches(&self, _object: &O) -> bool {
        true
    }
}

/// Adapts a closure into a predicate.
pub struct Filter<F>(pub F);

impl<O, F> Predicate<O> for Filter<F>
where
    F: Fn(&O) -> bool,
{
    fn matches(&self, object: &O) -> bool {
        (self.0)(object)
    }
}
