use crate::core::potentials::PotentialKey;
use tracing::trace;

#[derive(Debug, Clone)]
struct Entry<K> {
    key: PotentialKey,
    representative: K,
}

/// Ordered, de-duplicated view of the types in use by a topology.
///
/// Each entry remembers the key it was registered under and the pooled
/// handle that represents it. Lookups compare keys linearly: keys hold
/// floating-point quantities compared with a tolerance, so they cannot be
/// hashed.
#[derive(Debug, Clone)]
pub struct TypeRegistry<K: Copy> {
    entries: Vec<Entry<K>>,
}

impl<K: Copy> Default for TypeRegistry<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: Copy> TypeRegistry<K> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn position(&self, key: &PotentialKey) -> Option<usize> {
        self.entries.iter().position(|e| e.key == *key)
    }

    /// The handle registered for `key`, if any.
    pub fn representative(&self, key: &PotentialKey) -> Option<K> {
        self.entries
            .iter()
            .find(|e| e.key == *key)
            .map(|e| e.representative)
    }

    pub fn representatives(&self) -> impl Iterator<Item = K> + '_ {
        self.entries.iter().map(|e| e.representative)
    }

    /// Registers `key` unless an equal key is present.
    ///
    /// Returns the handle now representing the key: `id` for a new entry,
    /// the earlier handle otherwise.
    pub fn fold(&mut self, id: K, key: PotentialKey) -> K {
        if let Some(existing) = self.representative(&key) {
            return existing;
        }
        trace!(name = %key.name, position = self.entries.len(), "Registering new type");
        self.entries.push(Entry {
            key,
            representative: id,
        });
        id
    }

    /// Replaces the registry with the unique keys of `scan`.
    ///
    /// Keys already registered keep their relative order; keys seen for the
    /// first time are appended in scan order. Keys absent from the scan are
    /// dropped.
    pub fn rebuild(&mut self, scan: impl IntoIterator<Item = (K, PotentialKey)>) {
        let mut fresh: Vec<Entry<K>> = Vec::new();
        for (id, key) in scan {
            if !fresh.iter().any(|e| e.key == key) {
                fresh.push(Entry {
                    key,
                    representative: id,
                });
            }
        }

        let previous = std::mem::take(&mut self.entries);
        let mut placed = vec![false; fresh.len()];
        for old in &previous {
            if let Some(i) = fresh.iter().position(|e| e.key == old.key) {
                if !placed[i] {
                    placed[i] = true;
                    self.entries.push(fresh[i].clone());
                }
            }
        }
        let retained = self.entries.len();
        for (entry, was_placed) in fresh.into_iter().zip(placed) {
            if !was_placed {
                self.entries.push(entry);
            }
        }
        trace!(
            retained,
            added = self.entries.len() - retained,
            dropped = previous.len() - retained,
            "Rebuilt type registry"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::potentials::{AtomType, ParametricPotential};
    use slotmap::{KeyData, new_key_type};

    new_key_type! {
        struct TestId;
    }

    fn id(n: u64) -> TestId {
        TestId::from(KeyData::from_ffi(n))
    }

    fn key(name: &str) -> PotentialKey {
        AtomType::named(name).key()
    }

    #[test]
    fn fold_deduplicates_by_key() {
        let mut registry = TypeRegistry::default();
        assert_eq!(registry.fold(id(1), key("a")), id(1));
        assert_eq!(registry.fold(id(2), key("a")), id(1));
        assert_eq!(registry.fold(id(3), key("b")), id(3));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.position(&key("b")), Some(1));
    }

    #[test]
    fn value_equal_types_with_different_names_are_distinct() {
        let mut registry = TypeRegistry::default();
        for i in 0..100u64 {
            registry.fold(id(i + 1), key(&format!("type{}", i % 10)));
        }
        assert_eq!(registry.len(), 10);
    }

    #[test]
    fn rebuild_appends_new_keys_after_survivors() {
        let mut registry = TypeRegistry::default();
        registry.rebuild([(id(1), key("O")), (id(2), key("H")), (id(3), key("H"))]);
        assert_eq!(registry.position(&key("O")), Some(0));
        assert_eq!(registry.position(&key("H")), Some(1));

        registry.rebuild([(id(1), key("O2")), (id(2), key("H"))]);
        assert_eq!(registry.position(&key("H")), Some(0));
        assert_eq!(registry.position(&key("O2")), Some(1));
        assert_eq!(registry.position(&key("O")), None);
    }

    #[test]
    fn rebuild_preserves_order_of_unchanged_keys() {
        let mut registry = TypeRegistry::default();
        registry.rebuild([(id(1), key("a")), (id(2), key("b")), (id(3), key("c"))]);
        registry.rebuild([(id(3), key("c")), (id(1), key("a")), (id(2), key("b"))]);
        let order: Vec<_> = registry.representatives().collect();
        assert_eq!(order, [id(1), id(2), id(3)]);
    }

    #[test]
    fn rebuild_from_empty_scan_clears() {
        let mut registry = TypeRegistry::default();
        registry.fold(id(1), key("a"));
        registry.rebuild(std::iter::empty());
        assert!(registry.is_empty());
    }
}
