//! # topomodel
//!
//! Bookkeeping for molecular topologies: sites, the bonds, angles, dihedrals
//! and impropers between them, and the parametrized types that describe both.
//!
//! ## Architectural Philosophy
//!
//! The library is split into layers with a clear separation of concerns.
//!
//! - **[`core`]: The Foundation.** Stateless values: units and quantities,
//!   symbolic expressions, elements, potentials and parameter types, the data
//!   models stored in a topology, and TOML force-field libraries.
//!
//! - **[`engine`]: The Logic Core.** The stateful [`Topology`](engine::Topology)
//!   aggregate. It pools types so they can be shared by many members, keeps
//!   de-duplicated registries of the types in use, and answers index queries
//!   against them.
//!
//! - **[`external`]: Adapters.** Conversions between a topology and other
//!   in-memory representations, currently an undirected `petgraph` graph.

pub mod core;
pub mod engine;
pub mod external;
