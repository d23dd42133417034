use slotmap::{Key, new_key_type};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

new_key_type! {
    pub struct SiteKey;
    pub struct BondKey;
    pub struct AngleKey;
    pub struct DihedralKey;
    pub struct ImproperKey;
    pub struct SubTopologyKey;
    pub struct AtomTypeKey;
    pub struct BondTypeKey;
    pub struct AngleTypeKey;
    pub struct DihedralTypeKey;
    pub struct ImproperTypeKey;
}

/// Identifies the topology that issued a handle.
///
/// Every topology draws a fresh token at construction; clones keep it, so a
/// handle stays valid in every copy of the topology that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OwnerToken(u64);

impl OwnerToken {
    pub(crate) fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A slot-map key tagged with the token of the topology that issued it.
///
/// Arenas and pools only resolve handles carrying their own token, so a
/// handle from another topology is never mistaken for a local slot with the
/// same index.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Handle<K> {
    owner: OwnerToken,
    key: K,
}

impl<K: Key> Handle<K> {
    pub(crate) fn new(owner: OwnerToken, key: K) -> Self {
        Self { owner, key }
    }

    pub fn owner(&self) -> OwnerToken {
        self.owner
    }

    pub(crate) fn key(&self) -> K {
        self.key
    }

    /// A handle owned by no topology, for unit tests of the plain models.
    #[cfg(test)]
    pub(crate) fn detached(n: u64) -> Self {
        Self::new(OwnerToken::default(), K::from(slotmap::KeyData::from_ffi(n)))
    }
}

impl<K: Key> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{}", self.key, self.owner.0)
    }
}

pub type SiteId = Handle<SiteKey>;
pub type BondId = Handle<BondKey>;
pub type AngleId = Handle<AngleKey>;
pub type DihedralId = Handle<DihedralKey>;
pub type ImproperId = Handle<ImproperKey>;
pub type SubTopologyId = Handle<SubTopologyKey>;
pub type AtomTypeId = Handle<AtomTypeKey>;
pub type BondTypeId = Handle<BondTypeKey>;
pub type AngleTypeId = Handle<AngleTypeKey>;
pub type DihedralTypeId = Handle<DihedralTypeKey>;
pub type ImproperTypeId = Handle<ImproperTypeKey>;

/// Handle to a stored connection of any kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionId {
    Bond(BondId),
    Angle(AngleId),
    Dihedral(DihedralId),
    Improper(ImproperId),
}

/// Handle to a pooled connection type of any kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionTypeId {
    Bond(BondTypeId),
    Angle(AngleTypeId),
    Dihedral(DihedralTypeId),
    Improper(ImproperTypeId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_tokens_are_distinct() {
        assert_ne!(OwnerToken::fresh(), OwnerToken::fresh());
        assert_ne!(OwnerToken::fresh(), OwnerToken::default());
    }

    #[test]
    fn handles_with_equal_keys_but_different_owners_differ() {
        let key = SiteKey::from(slotmap::KeyData::from_ffi(1));
        let a = SiteId::new(OwnerToken::fresh(), key);
        let b = SiteId::new(OwnerToken::fresh(), key);
        assert_ne!(a, b);
        assert_eq!(a.key(), b.key());
    }
}
