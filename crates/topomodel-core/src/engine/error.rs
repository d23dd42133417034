use thiserror::Error;

use crate::core::models::ids::{SiteId, SubTopologyId};
use crate::core::potentials::{InvalidCombiningRule, PotentialKind};
use crate::core::units::unit::UnitError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TopologyError {
    #[error(transparent)]
    InvalidCombiningRule(#[from] InvalidCombiningRule),

    #[error("Cannot index a {0} member of a topology")]
    UnsupportedMember(&'static str),

    #[error("{0} is not part of this topology")]
    MemberNotFound(String),

    #[error("Site {0:?} does not belong to this topology")]
    UnknownSite(SiteId),

    #[error("Subtopology {0:?} does not belong to this topology")]
    UnknownSubTopology(SubTopologyId),

    #[error("Unknown {kind} handle: it was not issued by this topology's pool")]
    UnknownType { kind: PotentialKind },

    #[error("Malformed pair potential: {0}")]
    MalformedPairPotential(String),

    #[error("Unit conversion failed: {0}")]
    Unit(#[from] UnitError),
}
