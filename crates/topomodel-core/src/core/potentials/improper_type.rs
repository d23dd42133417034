use super::{Potential, PotentialKind, parametric_potential};
use crate::core::models::ids::AtomTypeId;

pub const DEFAULT_NAME: &str = "ImproperType";
pub const DEFAULT_EXPRESSION: &str = "0.5 * k * ((phi - phi_eq))**2";

/// Parameters of an improper (out-of-plane) torsion over four sites.
#[derive(Debug, Clone)]
pub struct ImproperType {
    potential: Potential,
    member_types: Option<[AtomTypeId; 2]>,
}

impl ImproperType {
    pub fn new(potential: Potential) -> Self {
        Self {
            potential,
            member_types: None,
        }
    }
}

impl Default for ImproperType {
    fn default() -> Self {
        Self::new(Potential::builtin(
            DEFAULT_NAME,
            DEFAULT_EXPRESSION,
            &[("k", 1000.0, "kJ/(mol*deg**2)"), ("phi_eq", 0.0, "degree")],
            &["phi"],
        ))
    }
}

parametric_potential!(ImproperType, PotentialKind::Improper);
