//! Parameter types: potentials with domain defaults.
//!
//! Every concrete type wraps a validated [`Potential`] and adds the data its
//! kind needs. Atom types carry mass, charge and provenance fields; the
//! connection and pair types carry an optional pair of member atom types.
//! The common surface is the [`ParametricPotential`] trait.

pub mod angle_type;
pub mod atom_type;
pub mod bond_type;
pub mod combining;
pub mod dihedral_type;
pub mod improper_type;
pub mod pair_potential_type;
pub mod potential;

pub use angle_type::AngleType;
pub use atom_type::AtomType;
pub use bond_type::BondType;
pub use combining::{CombiningRule, InvalidCombiningRule};
pub use dihedral_type::DihedralType;
pub use improper_type::ImproperType;
pub use pair_potential_type::PairPotentialType;
pub use potential::{Potential, PotentialError};

use crate::core::models::ids::AtomTypeId;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PotentialKind {
    Atom,
    Bond,
    Angle,
    Dihedral,
    Improper,
    PairPotential,
}

impl fmt::Display for PotentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PotentialKind::Atom => "atom type",
            PotentialKind::Bond => "bond type",
            PotentialKind::Angle => "angle type",
            PotentialKind::Dihedral => "dihedral type",
            PotentialKind::Improper => "improper type",
            PotentialKind::PairPotential => "pair potential type",
        };
        f.write_str(label)
    }
}

/// Identity under which registries de-duplicate types: the type's name
/// together with its potential value.
///
/// Two value-equal types with different names are distinct keys, while
/// value-equal types sharing a name collapse into one.
#[derive(Debug, Clone, PartialEq)]
pub struct PotentialKey {
    pub name: String,
    pub potential: Potential,
}

impl PotentialKey {
    pub fn of(potential: &Potential) -> Self {
        Self {
            name: potential.name().to_string(),
            potential: potential.clone(),
        }
    }
}

/// Behaviour shared by every parameter type.
pub trait ParametricPotential: Clone + PartialEq + fmt::Debug {
    const KIND: PotentialKind;

    fn potential(&self) -> &Potential;

    fn potential_mut(&mut self) -> &mut Potential;

    /// The pair of atom types this type applies to, if recorded.
    ///
    /// Handles are issued by the pool of the topology owning the type and
    /// mean nothing outside it.
    fn member_types(&self) -> Option<[AtomTypeId; 2]> {
        None
    }

    fn key(&self) -> PotentialKey {
        PotentialKey::of(self.potential())
    }
}

/// Inherent accessors that forward to the wrapped [`Potential`], plus the
/// [`ParametricPotential`] impl.
macro_rules! parametric_potential {
    ($ty:ident, $kind:expr) => {
        impl $crate::core::potentials::ParametricPotential for $ty {
            const KIND: $crate::core::potentials::PotentialKind = $kind;

            fn potential(&self) -> &$crate::core::potentials::Potential {
                &self.potential
            }

            fn potential_mut(&mut self) -> &mut $crate::core::potentials::Potential {
                &mut self.potential
            }

            fn member_types(&self) -> Option<[$crate::core::models::ids::AtomTypeId; 2]> {
                self.member_types
            }
        }

        impl $ty {
            pub fn name(&self) -> &str {
                self.potential.name()
            }

            pub fn set_name(&mut self, name: impl Into<String>) {
                self.potential.set_name(name);
            }

            pub fn expression(&self) -> &$crate::core::expression::Expression {
                self.potential.expression()
            }

            pub fn parameters(
                &self,
            ) -> &std::collections::BTreeMap<String, $crate::core::units::quantity::Quantity> {
                self.potential.parameters()
            }

            pub fn parameter(
                &self,
                name: &str,
            ) -> Option<&$crate::core::units::quantity::Quantity> {
                self.potential.parameter(name)
            }

            pub fn independent_variables(&self) -> &std::collections::BTreeSet<String> {
                self.potential.independent_variables()
            }

            pub fn set_expression(
                &mut self,
                expression: &str,
            ) -> Result<(), $crate::core::potentials::PotentialError> {
                self.potential.set_expression(expression)
            }

            pub fn set_parameters(
                &mut self,
                parameters: std::collections::BTreeMap<
                    String,
                    $crate::core::units::quantity::Quantity,
                >,
            ) -> Result<(), $crate::core::potentials::PotentialError> {
                self.potential.set_parameters(parameters)
            }

            pub fn set_parameter(
                &mut self,
                name: &str,
                value: $crate::core::units::quantity::Quantity,
            ) -> Result<(), $crate::core::potentials::PotentialError> {
                self.potential.set_parameter(name, value)
            }

            pub fn member_types(&self) -> Option<[$crate::core::models::ids::AtomTypeId; 2]> {
                self.member_types
            }

            pub fn set_member_types(
                &mut self,
                member_types: Option<[$crate::core::models::ids::AtomTypeId; 2]>,
            ) {
                self.member_types = member_types;
            }
        }

        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.potential == other.potential
            }
        }

        impl<'a> From<&'a $ty> for $crate::core::potentials::AnyPotential<'a> {
            fn from(value: &'a $ty) -> Self {
                $crate::core::potentials::AnyPotential::$ty(value)
            }
        }
    };
}

pub(crate) use parametric_potential;

/// A borrowed view over any parameter type.
///
/// Comparing views of different kinds is never an error; it is simply
/// unequal.
#[derive(Debug, Clone, Copy)]
pub enum AnyPotential<'a> {
    AtomType(&'a AtomType),
    BondType(&'a BondType),
    AngleType(&'a AngleType),
    DihedralType(&'a DihedralType),
    ImproperType(&'a ImproperType),
    PairPotentialType(&'a PairPotentialType),
}

impl<'a> AnyPotential<'a> {
    pub fn kind(&self) -> PotentialKind {
        match self {
            AnyPotential::AtomType(_) => PotentialKind::Atom,
            AnyPotential::BondType(_) => PotentialKind::Bond,
            AnyPotential::AngleType(_) => PotentialKind::Angle,
            AnyPotential::DihedralType(_) => PotentialKind::Dihedral,
            AnyPotential::ImproperType(_) => PotentialKind::Improper,
            AnyPotential::PairPotentialType(_) => PotentialKind::PairPotential,
        }
    }

    pub fn potential(&self) -> &'a Potential {
        match *self {
            AnyPotential::AtomType(t) => t.potential(),
            AnyPotential::BondType(t) => t.potential(),
            AnyPotential::AngleType(t) => t.potential(),
            AnyPotential::DihedralType(t) => t.potential(),
            AnyPotential::ImproperType(t) => t.potential(),
            AnyPotential::PairPotentialType(t) => t.potential(),
        }
    }

    pub fn name(&self) -> &'a str {
        self.potential().name()
    }
}

impl PartialEq for AnyPotential<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.potential() == other.potential()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn views_of_different_kinds_are_never_equal() {
        let bond = BondType::default();
        let angle = AngleType::default();
        assert_ne!(AnyPotential::from(&bond), AnyPotential::from(&angle));
    }

    #[test]
    fn views_of_equal_types_are_equal_regardless_of_name() {
        let a = BondType::default();
        let mut b = BondType::default();
        b.set_name("renamed");
        assert_eq!(AnyPotential::from(&a), AnyPotential::from(&b));
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn key_distinguishes_names_but_not_member_types() {
        let a = BondType::default();
        let mut b = BondType::default();
        b.set_member_types(Some([AtomTypeId::default(), AtomTypeId::default()]));
        assert_eq!(a.key(), b.key());
        assert_eq!(a, b);
    }

    #[test]
    fn kinds_display_human_labels() {
        assert_eq!(PotentialKind::PairPotential.to_string(), "pair potential type");
        assert_eq!(AnyPotential::from(&AtomType::default()).kind(), PotentialKind::Atom);
    }
}
