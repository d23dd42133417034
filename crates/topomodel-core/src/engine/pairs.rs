use super::error::TopologyError;
use crate::core::models::ids::AtomTypeId;
use crate::core::potentials::{PairPotentialType, PotentialKey, PotentialKind};
use tracing::debug;

/// Explicit pair interactions, at most one per unordered pair of atom-type
/// keys.
///
/// Member handles are resolved to their current keys on every lookup, so
/// two distinct but equal atom types address the same entry.
#[derive(Debug, Clone, Default)]
pub struct PairPotentialTable {
    entries: Vec<PairPotentialType>,
}

impl PairPotentialTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PairPotentialType> {
        self.entries.iter()
    }

    /// Inserts `pair`, replacing and returning any entry for the same
    /// unordered pair of keys.
    pub(crate) fn insert<F>(
        &mut self,
        pair: PairPotentialType,
        key_of: F,
    ) -> Result<Option<PairPotentialType>, TopologyError>
    where
        F: Fn(AtomTypeId) -> Option<PotentialKey>,
    {
        let members = pair.member_types().ok_or_else(|| {
            TopologyError::MalformedPairPotential(format!(
                "'{}' has no member atom types",
                pair.name()
            ))
        })?;
        let keys = resolve(members, &key_of)?;
        match self.locate(&keys, &key_of) {
            Some(index) => {
                debug!(name = pair.name(), "Replacing pair potential for existing atom-type pair");
                Ok(Some(std::mem::replace(&mut self.entries[index], pair)))
            }
            None => {
                self.entries.push(pair);
                Ok(None)
            }
        }
    }

    /// Removes and returns the entry for the unordered pair, if any.
    ///
    /// Only member handles the resolver does not know are an error; an
    /// absent pair is `Ok(None)`.
    pub(crate) fn remove<F>(
        &mut self,
        members: [AtomTypeId; 2],
        key_of: F,
    ) -> Result<Option<PairPotentialType>, TopologyError>
    where
        F: Fn(AtomTypeId) -> Option<PotentialKey>,
    {
        let keys = resolve(members, &key_of)?;
        match self.locate(&keys, &key_of) {
            Some(index) => Ok(Some(self.entries.remove(index))),
            None => {
                debug!(
                    first = %keys[0].name,
                    second = %keys[1].name,
                    "No pair potential to remove"
                );
                Ok(None)
            }
        }
    }

    pub(crate) fn get<F>(
        &self,
        members: [AtomTypeId; 2],
        key_of: F,
    ) -> Result<Option<&PairPotentialType>, TopologyError>
    where
        F: Fn(AtomTypeId) -> Option<PotentialKey>,
    {
        let keys = resolve(members, &key_of)?;
        Ok(self.locate(&keys, &key_of).map(|i| &self.entries[i]))
    }

    fn locate<F>(&self, keys: &[PotentialKey; 2], key_of: &F) -> Option<usize>
    where
        F: Fn(AtomTypeId) -> Option<PotentialKey>,
    {
        self.entries.iter().position(|entry| {
            entry
                .member_types()
                .and_then(|members| resolve(members, key_of).ok())
                .is_some_and(|existing| same_pair(&existing, keys))
        })
    }
}

fn resolve<F>(members: [AtomTypeId; 2], key_of: &F) -> Result<[PotentialKey; 2], TopologyError>
where
    F: Fn(AtomTypeId) -> Option<PotentialKey>,
{
    let unknown = || TopologyError::UnknownType {
        kind: PotentialKind::Atom,
    };
    let first = key_of(members[0]).ok_or_else(unknown)?;
    let second = key_of(members[1]).ok_or_else(unknown)?;
    Ok([first, second])
}

fn same_pair(a: &[PotentialKey; 2], b: &[PotentialKey; 2]) -> bool {
    (a[0] == b[0] && a[1] == b[1]) || (a[0] == b[1] && a[1] == b[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ids::{AtomTypeKey, OwnerToken};
    use crate::core::potentials::{AtomType, ParametricPotential, Potential};
    use crate::engine::arena::OrderedArena;
    use std::collections::BTreeMap;

    struct Fixture {
        pool: OrderedArena<AtomTypeKey, AtomType>,
        a: AtomTypeId,
        a_twin: AtomTypeId,
        b: AtomTypeId,
    }

    fn fixture() -> Fixture {
        let mut pool = OrderedArena::new(OwnerToken::fresh());
        let a = pool.insert(AtomType::named("a"));
        let a_twin = pool.insert(AtomType::named("a"));
        let b = pool.insert(AtomType::named("b"));
        Fixture { pool, a, a_twin, b }
    }

    fn offset_pair(members: [AtomTypeId; 2], offset: &str) -> PairPotentialType {
        let potential =
            Potential::new("pp", &format!("r + {}", offset), BTreeMap::new(), ["r"]).unwrap();
        PairPotentialType::new(potential, Some(members))
    }

    #[test]
    fn equal_unordered_pair_replaces_entry() {
        let f = fixture();
        let key_of = |id| f.pool.get(id).map(|t: &AtomType| t.key());
        let mut table = PairPotentialTable::default();

        assert!(table.insert(offset_pair([f.a, f.b], "1"), key_of).unwrap().is_none());
        let replaced = table
            .insert(offset_pair([f.b, f.a_twin], "2"), key_of)
            .unwrap();
        assert_eq!(replaced, Some(offset_pair([f.a, f.b], "1")));
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.get([f.a, f.b], key_of).unwrap(),
            Some(&offset_pair([f.a, f.b], "2"))
        );
    }

    #[test]
    fn remove_empties_table_and_absent_pair_is_not_an_error() {
        let f = fixture();
        let key_of = |id| f.pool.get(id).map(|t: &AtomType| t.key());
        let mut table = PairPotentialTable::default();
        table.insert(offset_pair([f.a, f.b], "1"), key_of).unwrap();
        assert_eq!(
            table.remove([f.b, f.a], key_of).unwrap(),
            Some(offset_pair([f.a, f.b], "1"))
        );
        assert!(table.is_empty());
        assert_eq!(table.remove([f.a, f.b], key_of), Ok(None));
    }

    #[test]
    fn pair_without_members_is_rejected() {
        let f = fixture();
        let key_of = |id| f.pool.get(id).map(|t: &AtomType| t.key());
        let mut table = PairPotentialTable::default();
        assert!(matches!(
            table.insert(PairPotentialType::default(), key_of),
            Err(TopologyError::MalformedPairPotential(_))
        ));
    }

    #[test]
    fn handles_from_another_pool_are_rejected() {
        let f = fixture();
        let mut other_pool = OrderedArena::new(OwnerToken::fresh());
        let foreign = other_pool.insert(AtomType::named("a"));
        assert_eq!(foreign.key(), f.a.key());

        let key_of = |id| f.pool.get(id).map(|t: &AtomType| t.key());
        let mut table = PairPotentialTable::default();
        let unknown = Err(TopologyError::UnknownType {
            kind: PotentialKind::Atom,
        });
        assert_eq!(
            table.insert(PairPotentialType::between(f.a, foreign), key_of),
            unknown
        );
        assert_eq!(table.remove([foreign, f.b], key_of), unknown);
    }
}
