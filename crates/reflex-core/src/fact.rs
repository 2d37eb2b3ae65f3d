use std::collections::BTreeMap;

use crate::Value;

/// A typed, immutable-after-creation record of sensed world state.
///
/// Facts are owned by [`WorkingMemory`]; sensors update the world picture
/// with remove+insert rather than mutating a fact in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Fact {
    tag: &'static str,
    fields: BTreeMap<&'static str, Value>,
}

impl Fact {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter, used by sensors when producing facts.
    pub fn with(mut self, field: &'static str, value: impl Into<Value>) -> Self {
        self.fields.insert(field, value.into());
        self
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.fields.iter().map(|(k, v)| (*k, v))
    }
}

/// Stable handle returned by [`WorkingMemory::insert`], used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FactHandle(u64);

/// Mutable, type-indexed store of facts.
///
/// Lookups by type tag never include facts of a different tag, and
/// iteration order within a tag is insertion order; precondition matching
/// relies on both for deterministic tie-breaking. Mutation is only
/// permitted between scheduler ticks or from a leaf-action step.
#[derive(Debug, Default)]
pub struct WorkingMemory {
    facts: BTreeMap<&'static str, Vec<(FactHandle, Fact)>>,
    tags: BTreeMap<FactHandle, &'static str>,
    next_id: u64,
}

impl WorkingMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, fact: Fact) -> FactHandle {
        let handle = FactHandle(self.next_id);
        self.next_id += 1;
        self.tags.insert(handle, fact.tag());
        self.facts.entry(fact.tag()).or_default().push((handle, fact));
        handle
    }

    /// Remove a fact by handle. Returns the fact if it was still present.
    pub fn remove(&mut self, handle: FactHandle) -> Option<Fact> {
        let tag = self.tags.remove(&handle)?;
        let bucket = self.facts.get_mut(tag)?;
        let index = bucket.iter().position(|(h, _)| *h == handle)?;
        Some(bucket.remove(index).1)
    }

    /// All facts with the given type tag, in insertion order.
    pub fn query(&self, tag: &str) -> impl Iterator<Item = &Fact> {
        self.facts
            .get(tag)
            .into_iter()
            .flat_map(|bucket| bucket.iter().map(|(_, fact)| fact))
    }

    /// Like [`query`], but paired with each fact's handle so callers can
    /// remove what they find.
    ///
    /// [`query`]: WorkingMemory::query
    pub fn entries(&self, tag: &str) -> impl Iterator<Item = (FactHandle, &Fact)> {
        self.facts
            .get(tag)
            .into_iter()
            .flat_map(|bucket| bucket.iter().map(|(handle, fact)| (*handle, fact)))
    }

    pub fn count(&self, tag: &str) -> usize {
        self.facts.get(tag).map_or(0, |bucket| bucket.len())
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn clear(&mut self) {
        self.facts.clear();
        self.tags.clear();
    }
}
