use crate::core::units::quantity::Quantity;
use crate::core::units::unit::UnitError;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid combining rule '{0}': expected 'lorentz' or 'geometric'")]
pub struct InvalidCombiningRule(pub String);

/// Mixing policy for nonbonded parameters between unlike atom types.
///
/// Both rules take the geometric mean of the well depths; they differ in how
/// the size parameter is mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombiningRule {
    /// Arithmetic mean of sigma (Lorentz–Berthelot).
    #[default]
    Lorentz,
    /// Geometric mean of sigma.
    Geometric,
}

impl CombiningRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            CombiningRule::Lorentz => "lorentz",
            CombiningRule::Geometric => "geometric",
        }
    }

    /// Mixes two size parameters; the result is in the unit of `a`.
    pub fn combine_sigma(&self, a: &Quantity, b: &Quantity) -> Result<Quantity, UnitError> {
        let b = *b.to(a.unit())?.value();
        let a_value = *a.value();
        let mixed = match self {
            CombiningRule::Lorentz => 0.5 * (a_value + b),
            CombiningRule::Geometric => (a_value * b).sqrt(),
        };
        Ok(Quantity::new(mixed, a.unit().clone()))
    }

    /// Mixes two well depths; the result is in the unit of `a`.
    pub fn combine_epsilon(&self, a: &Quantity, b: &Quantity) -> Result<Quantity, UnitError> {
        let b = *b.to(a.unit())?.value();
        Ok(Quantity::new((a.value() * b).sqrt(), a.unit().clone()))
    }
}

impl fmt::Display for CombiningRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CombiningRule {
    type Err = InvalidCombiningRule;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lorentz" => Ok(CombiningRule::Lorentz),
            "geometric" => Ok(CombiningRule::Geometric),
            other => Err(InvalidCombiningRule(other.to_string())),
        }
    }
}
