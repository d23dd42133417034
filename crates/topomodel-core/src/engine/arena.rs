use crate::core::models::ids::{Handle, OwnerToken};
use slotmap::{Key, SecondaryMap, SlotMap};

/// A `SlotMap` that also remembers insertion order.
///
/// Handles stay valid for the lifetime of the arena (there is no removal),
/// and every handle maps to its insertion position in constant time. Handles
/// carry the arena's owner token; a handle issued under another token is
/// never resolved, even when its slot index exists here.
#[derive(Debug, Clone)]
pub struct OrderedArena<K: Key, V> {
    owner: OwnerToken,
    items: SlotMap<K, V>,
    order: Vec<Handle<K>>,
    positions: SecondaryMap<K, usize>,
}

impl<K: Key, V> OrderedArena<K, V> {
    pub fn new(owner: OwnerToken) -> Self {
        Self {
            owner,
            items: SlotMap::with_key(),
            order: Vec::new(),
            positions: SecondaryMap::new(),
        }
    }

    pub fn owner(&self) -> OwnerToken {
        self.owner
    }

    pub fn insert(&mut self, value: V) -> Handle<K> {
        let key = self.items.insert(value);
        self.positions.insert(key, self.order.len());
        let id = Handle::new(self.owner, key);
        self.order.push(id);
        id
    }

    fn local(&self, id: Handle<K>) -> Option<K> {
        (id.owner() == self.owner).then(|| id.key())
    }

    pub fn get(&self, id: Handle<K>) -> Option<&V> {
        self.local(id).and_then(|key| self.items.get(key))
    }

    pub fn get_mut(&mut self, id: Handle<K>) -> Option<&mut V> {
        let key = self.local(id)?;
        self.items.get_mut(key)
    }

    pub fn contains(&self, id: Handle<K>) -> bool {
        self.local(id).is_some_and(|key| self.items.contains_key(key))
    }

    /// Insertion position of `id`.
    pub fn position(&self, id: Handle<K>) -> Option<usize> {
        self.local(id).and_then(|key| self.positions.get(key).copied())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn ids(&self) -> &[Handle<K>] {
        &self.order
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<K>, &V)> {
        self.order.iter().map(move |&id| (id, &self.items[id.key()]))
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.order.iter().map(move |&id| &self.items[id.key()])
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        // slot order, not insertion order
        self.items.values_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::new_key_type;

    new_key_type! {
        struct TestKey;
    }

    #[test]
    fn positions_follow_insertion_order() {
        let mut arena: OrderedArena<TestKey, &str> = OrderedArena::new(OwnerToken::fresh());
        let a = arena.insert("a");
        let b = arena.insert("b");
        let c = arena.insert("c");
        assert_eq!(arena.position(a), Some(0));
        assert_eq!(arena.position(c), Some(2));
        assert_eq!(arena.ids(), &[a, b, c]);
        assert_eq!(arena.values().copied().collect::<Vec<_>>(), ["a", "b", "c"]);
        assert_eq!(arena.len(), 3);
        assert!(arena.ids().iter().all(|id| id.owner() == arena.owner()));
    }

    #[test]
    fn handles_from_another_arena_with_the_same_slots_are_absent() {
        let mut other: OrderedArena<TestKey, i32> = OrderedArena::new(OwnerToken::fresh());
        let foreign = other.insert(1);
        let mut arena: OrderedArena<TestKey, i32> = OrderedArena::new(OwnerToken::fresh());
        let mine = arena.insert(10);

        assert_eq!(foreign.key(), mine.key());
        assert!(!arena.contains(foreign));
        assert!(arena.get(foreign).is_none());
        assert!(arena.position(foreign).is_none());
        assert!(arena.get_mut(foreign).is_none());
        assert_eq!(arena.get(mine), Some(&10));
    }

    #[test]
    fn clones_share_the_owner() {
        let mut arena: OrderedArena<TestKey, i32> = OrderedArena::new(OwnerToken::fresh());
        let id = arena.insert(7);
        let copy = arena.clone();
        assert_eq!(copy.get(id), Some(&7));
    }
}
