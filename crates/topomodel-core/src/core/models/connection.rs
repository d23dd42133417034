use super::ids::{AngleTypeId, BondTypeId, DihedralTypeId, ImproperTypeId, SiteId};
use std::fmt::Debug;
use std::hash::Hash;

/// A connection-type handle, tying each connection kind to its type pool.
pub trait ConnectionTypeKey: Copy + Eq + Hash + Debug {
    /// Name given to connections of this kind when none is supplied.
    const CONNECTION_NAME: &'static str;
}

impl ConnectionTypeKey for BondTypeId {
    const CONNECTION_NAME: &'static str = "Bond";
}

impl ConnectionTypeKey for AngleTypeId {
    const CONNECTION_NAME: &'static str = "Angle";
}

impl ConnectionTypeKey for DihedralTypeId {
    const CONNECTION_NAME: &'static str = "Dihedral";
}

impl ConnectionTypeKey for ImproperTypeId {
    const CONNECTION_NAME: &'static str = "Improper";
}

/// An ordered tuple of `N` sites with an optional shared type.
///
/// A connection owns neither its member sites nor its type; both are handles
/// into the owning topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection<const N: usize, T: ConnectionTypeKey> {
    pub name: String,
    members: [SiteId; N],
    pub connection_type: Option<T>,
}

pub type Bond = Connection<2, BondTypeId>;
pub type Angle = Connection<3, AngleTypeId>;
pub type Dihedral = Connection<4, DihedralTypeId>;
/// Four sites with the central atom first.
pub type Improper = Connection<4, ImproperTypeId>;

impl<const N: usize, T: ConnectionTypeKey> Connection<N, T> {
    pub fn new(members: [SiteId; N]) -> Self {
        Self {
            name: T::CONNECTION_NAME.to_string(),
            members,
            connection_type: None,
        }
    }

    pub fn with_type(mut self, connection_type: T) -> Self {
        self.connection_type = Some(connection_type);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn members(&self) -> &[SiteId; N] {
        &self.members
    }

    pub fn contains(&self, site: SiteId) -> bool {
        self.members.contains(&site)
    }

    pub fn is_typed(&self) -> bool {
        self.connection_type.is_some()
    }
}

/// A connection of any kind, as accepted by `Topology::add_connection`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnyConnection {
    Bond(Bond),
    Angle(Angle),
    Dihedral(Dihedral),
    Improper(Improper),
}

impl AnyConnection {
    pub fn name(&self) -> &str {
        match self {
            AnyConnection::Bond(c) => &c.name,
            AnyConnection::Angle(c) => &c.name,
            AnyConnection::Dihedral(c) => &c.name,
            AnyConnection::Improper(c) => &c.name,
        }
    }

    pub fn members(&self) -> &[SiteId] {
        match self {
            AnyConnection::Bond(c) => c.members(),
            AnyConnection::Angle(c) => c.members(),
            AnyConnection::Dihedral(c) => c.members(),
            AnyConnection::Improper(c) => c.members(),
        }
    }
}

impl From<Bond> for AnyConnection {
    fn from(value: Bond) -> Self {
        AnyConnection::Bond(value)
    }
}

impl From<Angle> for AnyConnection {
    fn from(value: Angle) -> Self {
        AnyConnection::Angle(value)
    }
}

impl From<Dihedral> for AnyConnection {
    fn from(value: Dihedral) -> Self {
        AnyConnection::Dihedral(value)
    }
}

impl From<Improper> for AnyConnection {
    fn from(value: Improper) -> Self {
        AnyConnection::Improper(value)
    }
}
