//! # Core Module
//!
//! The stateless foundation of topomodel: physical quantities, symbolic
//! expressions, chemical elements, parameter types, the plain data models a
//! topology stores, and the force-field libraries types are drawn from.
//!
//! ## Architecture
//!
//! - **Units** ([`units`]) - Dimensioned units and the [`Quantity`](units::quantity::Quantity) value type
//! - **Expressions** ([`expression`]) - Parsing, canonical comparison and evaluation of potential forms
//! - **Elements** ([`element`]) - Static periodic-table data with lookups by symbol, name, number and mass
//! - **Potentials** ([`potentials`]) - Validated potentials and the atom, bonded and pair types built on them
//! - **Models** ([`models`]) - Sites, connections, subtopologies, the simulation box and handle types
//! - **Force Fields** ([`forcefield`]) - TOML type libraries with name-based lookups
//!
//! Nothing here owns shared state. Pooling, de-duplication and indexing live
//! in [`crate::engine`].

pub mod element;
pub mod expression;
pub mod forcefield;
pub mod models;
pub mod potentials;
pub mod units;
