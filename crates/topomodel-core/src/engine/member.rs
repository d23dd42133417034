use crate::core::models::ids::{
    AngleId, AngleTypeId, AtomTypeId, BondId, BondTypeId, ConnectionId, DihedralId,
    DihedralTypeId, ImproperId, ImproperTypeId, SiteId, SubTopologyId,
};

/// Anything a caller may ask a topology to locate.
///
/// Subtopologies and pair potentials are representable so they can be passed
/// in, but `Topology::get_index` rejects them: they have no index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopologyMember {
    Site(SiteId),
    Bond(BondId),
    Angle(AngleId),
    Dihedral(DihedralId),
    Improper(ImproperId),
    AtomType(AtomTypeId),
    BondType(BondTypeId),
    AngleType(AngleTypeId),
    DihedralType(DihedralTypeId),
    ImproperType(ImproperTypeId),
    SubTopology(SubTopologyId),
    PairPotentialType([AtomTypeId; 2]),
}

impl TopologyMember {
    pub fn label(&self) -> &'static str {
        match self {
            TopologyMember::Site(_) => "site",
            TopologyMember::Bond(_) => "bond",
            TopologyMember::Angle(_) => "angle",
            TopologyMember::Dihedral(_) => "dihedral",
            TopologyMember::Improper(_) => "improper",
            TopologyMember::AtomType(_) => "atom type",
            TopologyMember::BondType(_) => "bond type",
            TopologyMember::AngleType(_) => "angle type",
            TopologyMember::DihedralType(_) => "dihedral type",
            TopologyMember::ImproperType(_) => "improper type",
            TopologyMember::SubTopology(_) => "subtopology",
            TopologyMember::PairPotentialType(_) => "pair potential type",
        }
    }
}

macro_rules! member_from {
    ($($id:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$id> for TopologyMember {
                fn from(value: $id) -> Self {
                    TopologyMember::$variant(value)
                }
            }
        )*
    };
}

member_from! {
    SiteId => Site,
    BondId => Bond,
    AngleId => Angle,
    DihedralId => Dihedral,
    ImproperId => Improper,
    AtomTypeId => AtomType,
    BondTypeId => BondType,
    AngleTypeId => AngleType,
    DihedralTypeId => DihedralType,
    ImproperTypeId => ImproperType,
    SubTopologyId => SubTopology,
}

impl From<ConnectionId> for TopologyMember {
    fn from(value: ConnectionId) -> Self {
        match value {
            ConnectionId::Bond(id) => TopologyMember::Bond(id),
            ConnectionId::Angle(id) => TopologyMember::Angle(id),
            ConnectionId::Dihedral(id) => TopologyMember::Dihedral(id),
            ConnectionId::Improper(id) => TopologyMember::Improper(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_ids_map_to_their_kind() {
        let bond = BondId::detached(1);
        assert_eq!(
            TopologyMember::from(ConnectionId::Bond(bond)),
            TopologyMember::Bond(bond)
        );
        assert_eq!(TopologyMember::from(bond).label(), "bond");
    }
}
