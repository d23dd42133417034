//! # Force Field Module
//!
//! Named collections of parameter types read from TOML libraries.
//!
//! ## Overview
//!
//! A [`ForceField`] is the source topologies draw their types from. It holds
//! atom types keyed by name, plus bonded and pair types keyed by the names of
//! their member atom types. Every entry is validated on load: quantities must
//! parse with known units and each expression must match its parameters.
//!
//! ## Key Components
//!
//! - [`params`] - Raw serde layout of a library file and the load error type
//! - [`ForceField`] - The validated library with name-based lookups
//!
//! ## Lookup Semantics
//!
//! Bond and pair lookups accept their two names in either order. Angle and
//! dihedral lookups match the member list forward or reversed. Improper
//! lookups match forward only: the central atom comes first, and reversing
//! the list would move it to the end.
//! Assigning library types to a topology (atom typing) is left to callers.

pub mod params;

use crate::core::potentials::{
    AngleType, AtomType, BondType, CombiningRule, DihedralType, ImproperType, PairPotentialType,
    Potential, angle_type, atom_type, bond_type, dihedral_type, improper_type,
    pair_potential_type,
};
use crate::core::units::quantity::Quantity;
use params::{AtomTypeEntry, ConnectionTypeEntry, ForceFieldFile, ForceFieldLoadError};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, instrument};

/// A library type together with the names of the atom types it applies to.
#[derive(Debug, Clone)]
pub struct LibraryEntry<T, const N: usize> {
    members: [String; N],
    value: T,
}

impl<T, const N: usize> LibraryEntry<T, N> {
    pub fn members(&self) -> &[String; N] {
        &self.members
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    fn matches(&self, query: &[&str; N], reversible: bool) -> bool {
        let forward = self.members.iter().zip(query).all(|(m, q)| m == q);
        forward || (reversible && self.members.iter().rev().zip(query).all(|(m, q)| m == q))
    }
}

#[derive(Debug, Clone)]
pub struct ForceField {
    pub name: String,
    pub version: String,
    pub combining_rule: CombiningRule,
    atom_types: BTreeMap<String, AtomType>,
    bond_types: Vec<LibraryEntry<BondType, 2>>,
    angle_types: Vec<LibraryEntry<AngleType, 3>>,
    dihedral_types: Vec<LibraryEntry<DihedralType, 4>>,
    improper_types: Vec<LibraryEntry<ImproperType, 4>>,
    pairpotential_types: Vec<LibraryEntry<PairPotentialType, 2>>,
}

impl ForceField {
    /// Reads and validates a library file.
    ///
    /// # Errors
    ///
    /// Returns [`ForceFieldLoadError`] if the file cannot be read, is not valid
    /// TOML of the expected shape, or defines a type that fails validation.
    #[instrument(skip_all, name = "forcefield_load")]
    pub fn load(path: &Path) -> Result<Self, ForceFieldLoadError> {
        let raw = ForceFieldFile::read(path)?;
        let forcefield = Self::from_file(raw)?;
        debug!(path = %path.display(), name = %forcefield.name, "Force field loaded");
        Ok(forcefield)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ForceFieldLoadError> {
        Self::from_file(ForceFieldFile::parse(content, "<string>")?)
    }

    fn from_file(raw: ForceFieldFile) -> Result<Self, ForceFieldLoadError> {
        let atom_types = raw
            .atom_types
            .into_iter()
            .map(|(name, entry)| Ok((name.clone(), build_atom_type(name, entry)?)))
            .collect::<Result<BTreeMap<_, _>, ForceFieldLoadError>>()?;

        let forcefield = Self {
            name: raw.name.unwrap_or_else(|| "ForceField".to_string()),
            version: raw.version.unwrap_or_else(|| "1.0.0".to_string()),
            combining_rule: raw.combining_rule,
            atom_types,
            bond_types: build_entries(raw.bond_types)?,
            angle_types: build_entries(raw.angle_types)?,
            dihedral_types: build_entries(raw.dihedral_types)?,
            improper_types: build_entries(raw.improper_types)?,
            pairpotential_types: build_entries(raw.pairpotential_types)?,
        };
        debug!(
            atom_types = forcefield.atom_types.len(),
            bond_types = forcefield.bond_types.len(),
            angle_types = forcefield.angle_types.len(),
            dihedral_types = forcefield.dihedral_types.len(),
            improper_types = forcefield.improper_types.len(),
            pairpotential_types = forcefield.pairpotential_types.len(),
            "Force field types validated"
        );
        Ok(forcefield)
    }

    pub fn atom_type(&self, name: &str) -> Option<&AtomType> {
        self.atom_types.get(name)
    }

    /// Atom types, sorted by name.
    pub fn atom_types(&self) -> impl Iterator<Item = (&str, &AtomType)> {
        self.atom_types.iter().map(|(name, t)| (name.as_str(), t))
    }

    pub fn bond_type(&self, a: &str, b: &str) -> Option<&BondType> {
        find(&self.bond_types, &[a, b], true)
    }

    pub fn angle_type(&self, a: &str, b: &str, c: &str) -> Option<&AngleType> {
        find(&self.angle_types, &[a, b, c], true)
    }

    pub fn dihedral_type(&self, a: &str, b: &str, c: &str, d: &str) -> Option<&DihedralType> {
        find(&self.dihedral_types, &[a, b, c, d], true)
    }

    /// Improper type for `central` bonded to `b`, `c` and `d`, matched in
    /// that exact order.
    pub fn improper_type(&self, central: &str, b: &str, c: &str, d: &str) -> Option<&ImproperType> {
        find(&self.improper_types, &[central, b, c, d], false)
    }

    pub fn pairpotential_type(&self, a: &str, b: &str) -> Option<&PairPotentialType> {
        find(&self.pairpotential_types, &[a, b], true)
    }

    pub fn bond_types(&self) -> &[LibraryEntry<BondType, 2>] {
        &self.bond_types
    }

    pub fn angle_types(&self) -> &[LibraryEntry<AngleType, 3>] {
        &self.angle_types
    }

    pub fn dihedral_types(&self) -> &[LibraryEntry<DihedralType, 4>] {
        &self.dihedral_types
    }

    pub fn improper_types(&self) -> &[LibraryEntry<ImproperType, 4>] {
        &self.improper_types
    }

    pub fn pairpotential_types(&self) -> &[LibraryEntry<PairPotentialType, 2>] {
        &self.pairpotential_types
    }

    pub fn n_atom_types(&self) -> usize {
        self.atom_types.len()
    }
}

fn find<'a, T, const N: usize>(
    entries: &'a [LibraryEntry<T, N>],
    query: &[&str; N],
    reversible: bool,
) -> Option<&'a T> {
    entries
        .iter()
        .find(|e| e.matches(query, reversible))
        .map(LibraryEntry::value)
}

/// Kind defaults a library entry falls back to.
trait LibraryType: Sized {
    const LABEL: &'static str;
    const DEFAULT_EXPRESSION: &'static str;
    const VARIABLES: &'static [&'static str];

    fn from_potential(potential: Potential) -> Self;
}

macro_rules! library_type {
    ($ty:ty, $label:literal, $module:ident, [$($var:literal),*], $ctor:expr) => {
        impl LibraryType for $ty {
            const LABEL: &'static str = $label;
            const DEFAULT_EXPRESSION: &'static str = $module::DEFAULT_EXPRESSION;
            const VARIABLES: &'static [&'static str] = &[$($var),*];

            fn from_potential(potential: Potential) -> Self {
                $ctor(potential)
            }
        }
    };
}

library_type!(BondType, "bond type", bond_type, ["r"], BondType::new);
library_type!(AngleType, "angle type", angle_type, ["theta"], AngleType::new);
library_type!(DihedralType, "dihedral type", dihedral_type, ["phi"], DihedralType::new);
library_type!(ImproperType, "improper type", improper_type, ["phi"], ImproperType::new);
library_type!(
    PairPotentialType,
    "pair potential type",
    pair_potential_type,
    ["r"],
    |p| PairPotentialType::new(p, None)
);

fn invalid(kind: &'static str, name: &str, reason: impl Into<String>) -> ForceFieldLoadError {
    ForceFieldLoadError::InvalidDefinition {
        kind,
        name: name.to_string(),
        reason: reason.into(),
    }
}

fn parse_quantity(kind: &'static str, name: &str, field: &str, text: &str) -> Result<Quantity, ForceFieldLoadError> {
    text.parse()
        .map_err(|e| invalid(kind, name, format!("{}: {}", field, e)))
}

fn build_potential(
    kind: &'static str,
    name: &str,
    expression: Option<&str>,
    variables: Option<Vec<String>>,
    parameters: &BTreeMap<String, String>,
    defaults: (&str, &[&str]),
) -> Result<Potential, ForceFieldLoadError> {
    let parameters = parameters
        .iter()
        .map(|(key, text)| Ok((key.clone(), parse_quantity(kind, name, key, text)?)))
        .collect::<Result<BTreeMap<_, _>, ForceFieldLoadError>>()?;
    let variables =
        variables.unwrap_or_else(|| defaults.1.iter().map(|v| v.to_string()).collect());
    Potential::new(name, expression.unwrap_or(defaults.0), parameters, variables)
        .map_err(|e| invalid(kind, name, e.to_string()))
}

fn build_atom_type(name: String, entry: AtomTypeEntry) -> Result<AtomType, ForceFieldLoadError> {
    const KIND: &str = "atom type";
    let potential = build_potential(
        KIND,
        &name,
        entry.expression.as_deref(),
        entry.independent_variables,
        &entry.parameters,
        (atom_type::DEFAULT_EXPRESSION, &["r"]),
    )?;
    let mut atom_type = AtomType::new(potential);
    if let Some(mass) = &entry.mass {
        atom_type.set_mass(parse_quantity(KIND, &name, "mass", mass)?);
    }
    if let Some(charge) = &entry.charge {
        atom_type.set_charge(parse_quantity(KIND, &name, "charge", charge)?);
    }
    atom_type.set_atomclass(entry.atomclass);
    atom_type.set_doi(entry.doi);
    atom_type.set_overrides(entry.overrides.into_iter().collect());
    atom_type.set_definition(entry.definition);
    atom_type.set_description(entry.description);
    Ok(atom_type)
}

fn build_entries<T: LibraryType, const N: usize>(
    raw: Vec<ConnectionTypeEntry>,
) -> Result<Vec<LibraryEntry<T, N>>, ForceFieldLoadError> {
    raw.into_iter()
        .map(|entry| {
            let name = entry
                .name
                .clone()
                .unwrap_or_else(|| entry.member_types.join("~"));
            let members: [String; N] = entry.member_types.try_into().map_err(|found: Vec<String>| {
                invalid(
                    T::LABEL,
                    &name,
                    format!("expected {} member types, found {}", N, found.len()),
                )
            })?;
            let potential = build_potential(
                T::LABEL,
                &name,
                entry.expression.as_deref(),
                entry.independent_variables,
                &entry.parameters,
                (T::DEFAULT_EXPRESSION, T::VARIABLES),
            )?;
            Ok(LibraryEntry {
                members,
                value: T::from_potential(potential),
            })
        })
        .collect()
}
