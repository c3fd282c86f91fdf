use std::collections::BTreeMap;

use super::IndexedStream;

/// An ordered in-memory `(index, object)` source implementing the storage
/// side of the stream contract. Stands in for a packed-block reader, whose
/// decoding is outside this crate.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend<I: Ord, O> {
    buckets: BTreeMap<I, Vec<O>>,
}

impl<I: Ord + Clone, O> MemoryBackend<I, O> {
    pub fn new() -> Self {
        Self {
            buckets: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, index: I, object: O) {
        self.buckets.entry(index).or_default().push(object);
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Stream of the buckets whose index appears in `req`, ascending.
    pub fn discrete(&self, mut req: Vec<I>) -> MemStream<'_, I, O> {
        req.sort();
        req.dedup();
        let buckets = &self.buckets;
        MemStream::new(Box::new(
            req.into_iter()
                .filter_map(move |key| buckets.get_key_value(&key))
                .flat_map(|(index, objects)| objects.iter().map(move |o| (index, o))),
        ))
    }

    /// Stream of the buckets falling in any of the half-open `[lo, hi)`
    /// ranges, which must be sorted and disjoint. Ascending.
    pub fn range(&self, ranges: Vec<(I, I)>) -> MemStream<'_, I, O> {
        let buckets = &self.buckets;
        MemStream::new(Box::new(
            ranges
                .into_iter()
                .flat_map(move |(lo, hi)| buckets.range(lo..hi))
                .flat_map(|(index, objects)| objects.iter().map(move |o| (index, o))),
        ))
    }

    /// Stream of every pair in the store, ascending.
    pub fn flat(&self) -> MemStream<'_, I, O> {
        MemStream::new(Box::new(
            self.buckets
                .iter()
                .flat_map(|(index, objects)| objects.iter().map(move |o| (index, o))),
        ))
    }
}

impl<I: Ord + Clone, O> FromIterator<(I, O)> for MemoryBackend<I, O> {
    fn from_iter<T: IntoIterator<Item = (I, O)>>(iter: T) -> Self {
        let mut backend = Self::new();
        for (index, object) in iter {
            backend.insert(index, object);
        }
        backend
    }
}

/// Type-erased cursor over borrowed pairs, with a one-item lookahead so
/// `index()` and `handle()` observe without consuming.
pub struct MemStream<'a, I, O> {
    iter: Box<dyn Iterator<Item = (&'a I, &'a O)> + 'a>,
    current: Option<(&'a I, &'a O)>,
}

impl<'a, I, O> MemStream<'a, I, O> {
    fn new(mut iter: Box<dyn Iterator<Item = (&'a I, &'a O)> + 'a>) -> Self {
        let current = iter.next();
        Self { iter, current }
    }
}

impl<I: Ord + Clone, O: Clone> IndexedStream for MemStream<'_, I, O> {
    type Idx = I;
    type Obj = O;

    fn index(&self) -> Option<&I> {
        self.current.map(|(index, _)| index)
    }

    fn handle(&self) -> Option<&O> {
        self.current.map(|(_, object)| object)
    }

    fn advance(&mut self) -> Option<(I, O)> {
        let (index, object) = self.current?;
        self.current = self.iter.next();
        Some((index.clone(), object.clone()))
    }
}
