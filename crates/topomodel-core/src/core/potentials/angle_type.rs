use super::{Potential, PotentialKind, parametric_potential};
use crate::core::models::ids::AtomTypeId;

pub const DEFAULT_NAME: &str = "AngleType";
pub const DEFAULT_EXPRESSION: &str = "0.5 * k * (theta-theta_eq)**2";

/// Parameters of a three-site angle interaction.
///
/// `member_types` holds the outer pair of atom types used as a lookup key,
/// not the full three-site connectivity.
#[derive(Debug, Clone)]
pub struct AngleType {
    potential: Potential,
    member_types: Option<[AtomTypeId; 2]>,
}

impl AngleType {
    pub fn new(potential: Potential) -> Self {
        Self {
            potential,
            member_types: None,
        }
    }
}

impl Default for AngleType {
    fn default() -> Self {
        Self::new(Potential::builtin(
            DEFAULT_NAME,
            DEFAULT_EXPRESSION,
            &[("k", 1000.0, "kJ/(mol*rad**2)"), ("theta_eq", 180.0, "degree")],
            &["theta"],
        ))
    }
}

parametric_potential!(AngleType, PotentialKind::Angle);
