use crate::core::potentials::AtomType;
use crate::core::units::quantity::Quantity;
use crate::core::units::unit::Unit;
use phf::{Map, phf_map};
use std::fmt;

/// A chemical element from the static periodic table.
#[derive(Debug, PartialEq)]
pub struct Element {
    pub atomic_number: u8,
    pub name: &'static str,
    pub symbol: &'static str,
    /// Standard atomic weight in amu.
    pub mass: f64,
}

impl Element {
    pub fn mass_quantity(&self) -> Quantity {
        Quantity::new(self.mass, Unit::amu())
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.symbol)
    }
}

const fn el(atomic_number: u8, name: &'static str, symbol: &'static str, mass: f64) -> Element {
    Element {
        atomic_number,
        name,
        symbol,
        mass,
    }
}

static ELEMENTS: [Element; 37] = [
    el(1, "hydrogen", "H", 1.008),
    el(2, "helium", "He", 4.0026),
    el(3, "lithium", "Li", 6.94),
    el(4, "beryllium", "Be", 9.0122),
    el(5, "boron", "B", 10.81),
    el(6, "carbon", "C", 12.011),
    el(7, "nitrogen", "N", 14.007),
    el(8, "oxygen", "O", 15.999),
    el(9, "fluorine", "F", 18.998),
    el(10, "neon", "Ne", 20.180),
    el(11, "sodium", "Na", 22.990),
    el(12, "magnesium", "Mg", 24.305),
    el(13, "aluminum", "Al", 26.982),
    el(14, "silicon", "Si", 28.085),
    el(15, "phosphorus", "P", 30.974),
    el(16, "sulfur", "S", 32.06),
    el(17, "chlorine", "Cl", 35.45),
    el(18, "argon", "Ar", 39.948),
    el(19, "potassium", "K", 39.098),
    el(20, "calcium", "Ca", 40.078),
    el(21, "scandium", "Sc", 44.956),
    el(22, "titanium", "Ti", 47.867),
    el(23, "vanadium", "V", 50.942),
    el(24, "chromium", "Cr", 51.996),
    el(25, "manganese", "Mn", 54.938),
    el(26, "iron", "Fe", 55.845),
    el(27, "cobalt", "Co", 58.933),
    el(28, "nickel", "Ni", 58.693),
    el(29, "copper", "Cu", 63.546),
    el(30, "zinc", "Zn", 65.38),
    el(31, "gallium", "Ga", 69.723),
    el(32, "germanium", "Ge", 72.630),
    el(33, "arsenic", "As", 74.922),
    el(34, "selenium", "Se", 78.971),
    el(35, "bromine", "Br", 79.904),
    el(36, "krypton", "Kr", 83.798),
    el(53, "iodine", "I", 126.90),
];

static BY_SYMBOL: Map<&'static str, usize> = phf_map! {
    "h" => 0, "he" => 1, "li" => 2, "be" => 3, "b" => 4, "c" => 5, "n" => 6, "o" => 7,
    "f" => 8, "ne" => 9, "na" => 10, "mg" => 11, "al" => 12, "si" => 13, "p" => 14,
    "s" => 15, "cl" => 16, "ar" => 17, "k" => 18, "ca" => 19, "sc" => 20, "ti" => 21,
    "v" => 22, "cr" => 23, "mn" => 24, "fe" => 25, "co" => 26, "ni" => 27, "cu" => 28,
    "zn" => 29, "ga" => 30, "ge" => 31, "as" => 32, "se" => 33, "br" => 34, "kr" => 35,
    "i" => 36,
};

static BY_NAME: Map<&'static str, usize> = phf_map! {
    "hydrogen" => 0, "helium" => 1, "lithium" => 2, "beryllium" => 3, "boron" => 4,
    "carbon" => 5, "nitrogen" => 6, "oxygen" => 7, "fluorine" => 8, "neon" => 9,
    "sodium" => 10, "magnesium" => 11, "aluminum" => 12, "aluminium" => 12, "silicon" => 13,
    "phosphorus" => 14, "sulfur" => 15, "sulphur" => 15, "chlorine" => 16, "argon" => 17,
    "potassium" => 18, "calcium" => 19, "scandium" => 20, "titanium" => 21, "vanadium" => 22,
    "chromium" => 23, "manganese" => 24, "iron" => 25, "cobalt" => 26, "nickel" => 27,
    "copper" => 28, "zinc" => 29, "gallium" => 30, "germanium" => 31, "arsenic" => 32,
    "selenium" => 33, "bromine" => 34, "krypton" => 35, "iodine" => 36,
};

/// Masses within this many amu of a table entry match it in exact mode.
const EXACT_MASS_TOLERANCE: f64 = 0.01;

/// Case-insensitive lookup by element symbol.
pub fn element_by_symbol(symbol: &str) -> Option<&'static Element> {
    BY_SYMBOL
        .get(symbol.trim().to_ascii_lowercase().as_str())
        .map(|&i| &ELEMENTS[i])
}

/// Case-insensitive lookup by element name.
pub fn element_by_name(name: &str) -> Option<&'static Element> {
    BY_NAME
        .get(name.trim().to_ascii_lowercase().as_str())
        .map(|&i| &ELEMENTS[i])
}

pub fn element_by_atomic_number(atomic_number: u8) -> Option<&'static Element> {
    ELEMENTS.iter().find(|e| e.atomic_number == atomic_number)
}

/// Lookup by mass.
///
/// With `exact` the mass must agree with a table entry to within 0.01 amu;
/// otherwise the element with the nearest mass is returned. Masses that are
/// not mass-dimensioned, or are non-positive, match nothing.
pub fn element_by_mass(mass: &Quantity, exact: bool) -> Option<&'static Element> {
    let amu = mass.to(&Unit::amu()).ok()?;
    let value = *amu.value();
    if value <= 0.0 {
        return None;
    }
    let nearest = ELEMENTS
        .iter()
        .min_by(|a, b| (a.mass - value).abs().total_cmp(&(b.mass - value).abs()))?;
    if exact && (nearest.mass - value).abs() > EXACT_MASS_TOLERANCE {
        return None;
    }
    Some(nearest)
}

/// Guesses the element of an atom type: by name, then by symbol, then by mass.
pub fn element_by_atom_type(atom_type: &AtomType) -> Option<&'static Element> {
    element_by_name(atom_type.name())
        .or_else(|| element_by_symbol(atom_type.name()))
        .or_else(|| element_by_mass(atom_type.mass(), true))
}
