use super::{Potential, PotentialKind, parametric_potential};
use crate::core::models::ids::AtomTypeId;

pub const DEFAULT_NAME: &str = "DihedralType";
pub const DEFAULT_EXPRESSION: &str = "k * (1 + cos(n * phi - phi_eq))**2";

/// Parameters of a proper torsion over four sites.
#[derive(Debug, Clone)]
pub struct DihedralType {
    potential: Potential,
    member_types: Option<[AtomTypeId; 2]>,
}

impl DihedralType {
    pub fn new(potential: Potential) -> Self {
        Self {
            potential,
            member_types: None,
        }
    }
}

impl Default for DihedralType {
    fn default() -> Self {
        Self::new(Potential::builtin(
            DEFAULT_NAME,
            DEFAULT_EXPRESSION,
            &[
                ("k", 1000.0, "kJ/mol"),
                ("phi_eq", 180.0, "degree"),
                ("n", 1.0, "dimensionless"),
            ],
            &["phi"],
        ))
    }
}

parametric_potential!(DihedralType, PotentialKind::Dihedral);
