use super::{Potential, PotentialError, PotentialKind, parametric_potential};
use crate::core::models::ids::AtomTypeId;
use crate::core::units::quantity::Quantity;
use std::collections::BTreeMap;

pub const DEFAULT_NAME: &str = "BondType";
pub const DEFAULT_EXPRESSION: &str = "0.5 * k * (r-r_eq)**2";

/// Parameters of a two-site bonded interaction; harmonic by default.
#[derive(Debug, Clone)]
pub struct BondType {
    potential: Potential,
    member_types: Option<[AtomTypeId; 2]>,
}

impl BondType {
    pub fn new(potential: Potential) -> Self {
        Self {
            potential,
            member_types: None,
        }
    }

    /// Default harmonic form with the given parameters.
    pub fn harmonic(
        name: impl Into<String>,
        parameters: BTreeMap<String, Quantity>,
    ) -> Result<Self, PotentialError> {
        Ok(Self::new(Potential::new(
            name,
            DEFAULT_EXPRESSION,
            parameters,
            ["r"],
        )?))
    }
}

impl Default for BondType {
    fn default() -> Self {
        Self::new(Potential::builtin(
            DEFAULT_NAME,
            DEFAULT_EXPRESSION,
            &[("k", 1000.0, "kJ/(mol*nm**2)"), ("r_eq", 0.14, "nm")],
            &["r"],
        ))
    }
}

parametric_potential!(BondType, PotentialKind::Bond);
