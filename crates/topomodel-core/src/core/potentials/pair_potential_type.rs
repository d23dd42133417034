use super::{Potential, PotentialKind, parametric_potential};
use crate::core::models::ids::AtomTypeId;

pub const DEFAULT_NAME: &str = "PairPotentialType";
pub const DEFAULT_EXPRESSION: &str = "4 * eps * ((sigma / r)**12 - (sigma / r)**6)";

/// An explicit nonbonded interaction between two atom types that overrides
/// the combining rule.
///
/// The member pair is order-insensitive: `[a, b]` and `[b, a]` address the
/// same interaction.
#[derive(Debug, Clone)]
pub struct PairPotentialType {
    potential: Potential,
    member_types: Option<[AtomTypeId; 2]>,
}

impl PairPotentialType {
    pub fn new(potential: Potential, member_types: Option<[AtomTypeId; 2]>) -> Self {
        Self {
            potential,
            member_types,
        }
    }

    /// Default Lennard-Jones form between two atom types.
    pub fn between(a: AtomTypeId, b: AtomTypeId) -> Self {
        let mut pair = Self::default();
        pair.member_types = Some([a, b]);
        pair
    }
}

impl Default for PairPotentialType {
    fn default() -> Self {
        Self::new(
            Potential::builtin(
                DEFAULT_NAME,
                DEFAULT_EXPRESSION,
                &[("eps", 1.0, "kJ/mol"), ("sigma", 1.0, "nm")],
                &["r"],
            ),
            None,
        )
    }
}

parametric_potential!(PairPotentialType, PotentialKind::PairPotential);
