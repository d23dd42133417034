use super::{AnyPotential, ParametricPotential, Potential, PotentialError, PotentialKind};
use crate::core::expression::Expression;
use crate::core::units::quantity::Quantity;
use crate::core::units::unit::Unit;
use std::collections::{BTreeMap, BTreeSet};

pub const DEFAULT_NAME: &str = "AtomType";
pub const DEFAULT_EXPRESSION: &str = "4*epsilon*((sigma/r)**12 - (sigma/r)**6)";

/// Nonbonded parameters of an atom, plus the bookkeeping a force field
/// attaches to it.
///
/// Only the wrapped potential takes part in equality. Mass, charge, and the
/// descriptive fields (`atomclass`, `doi`, `overrides`, `definition`,
/// `description`) are carried along but never compared.
#[derive(Debug, Clone)]
pub struct AtomType {
    potential: Potential,
    mass: Quantity,
    charge: Quantity,
    atomclass: String,
    doi: String,
    overrides: BTreeSet<String>,
    definition: String,
    description: String,
}

impl AtomType {
    pub fn new(potential: Potential) -> Self {
        Self {
            potential,
            mass: Quantity::new(0.0, Unit::amu()),
            charge: Quantity::new(0.0, Unit::elementary_charge()),
            atomclass: String::new(),
            doi: String::new(),
            overrides: BTreeSet::new(),
            definition: String::new(),
            description: String::new(),
        }
    }

    /// A default Lennard-Jones atom type under a different name.
    pub fn named(name: impl Into<String>) -> Self {
        let mut atom_type = Self::default();
        atom_type.set_name(name);
        atom_type
    }

    pub fn name(&self) -> &str {
        self.potential.name()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.potential.set_name(name);
    }

    pub fn expression(&self) -> &Expression {
        self.potential.expression()
    }

    pub fn parameters(&self) -> &BTreeMap<String, Quantity> {
        self.potential.parameters()
    }

    pub fn parameter(&self, name: &str) -> Option<&Quantity> {
        self.potential.parameter(name)
    }

    pub fn independent_variables(&self) -> &BTreeSet<String> {
        self.potential.independent_variables()
    }

    pub fn set_expression(&mut self, expression: &str) -> Result<(), PotentialError> {
        self.potential.set_expression(expression)
    }

    pub fn set_parameters(
        &mut self,
        parameters: BTreeMap<String, Quantity>,
    ) -> Result<(), PotentialError> {
        self.potential.set_parameters(parameters)
    }

    pub fn set_parameter(&mut self, name: &str, value: Quantity) -> Result<(), PotentialError> {
        self.potential.set_parameter(name, value)
    }

    pub fn mass(&self) -> &Quantity {
        &self.mass
    }

    pub fn set_mass(&mut self, mass: Quantity) {
        self.mass = mass;
    }

    pub fn charge(&self) -> &Quantity {
        &self.charge
    }

    pub fn set_charge(&mut self, charge: Quantity) {
        self.charge = charge;
    }

    pub fn atomclass(&self) -> &str {
        &self.atomclass
    }

    pub fn set_atomclass(&mut self, atomclass: impl Into<String>) {
        self.atomclass = atomclass.into();
    }

    pub fn doi(&self) -> &str {
        &self.doi
    }

    pub fn set_doi(&mut self, doi: impl Into<String>) {
        self.doi = doi.into();
    }

    /// Names of the atom types this one takes precedence over when typing.
    pub fn overrides(&self) -> &BTreeSet<String> {
        &self.overrides
    }

    pub fn set_overrides(&mut self, overrides: BTreeSet<String>) {
        self.overrides = overrides;
    }

    /// Chemical-environment pattern that selects this type.
    pub fn definition(&self) -> &str {
        &self.definition
    }

    pub fn set_definition(&mut self, definition: impl Into<String>) {
        self.definition = definition.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }
}

impl Default for AtomType {
    fn default() -> Self {
        Self::new(Potential::builtin(
            DEFAULT_NAME,
            DEFAULT_EXPRESSION,
            &[("sigma", 0.3, "nm"), ("epsilon", 0.3, "kJ/mol")],
            &["r"],
        ))
    }
}

impl ParametricPotential for AtomType {
    const KIND: PotentialKind = PotentialKind::Atom;

    fn potential(&self) -> &Potential {
        &self.potential
    }

    fn potential_mut(&mut self) -> &mut Potential {
        &mut self.potential
    }
}

impl PartialEq for AtomType {
    fn eq(&self, other: &Self) -> bool {
        self.potential == other.potential
    }
}

impl<'a> From<&'a AtomType> for AnyPotential<'a> {
    fn from(value: &'a AtomType) -> Self {
        AnyPotential::AtomType(value)
    }
}
