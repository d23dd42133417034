//! # Units Module
//!
//! Physical units and unit-tagged quantities.
//!
//! Force-field parameters, site positions, charges and masses are all carried
//! as [`quantity::Quantity`] values. A quantity knows its [`unit::Unit`], can be
//! converted to any compatible unit, and compares equal to another quantity
//! when both describe the same physical magnitude.
//!
//! Units are parsed from the compact notation used by force-field files,
//! e.g. `"nm"`, `"kJ/mol"` or `"kcal / (nm**2 * mol)"`.

pub mod quantity;
pub mod unit;
