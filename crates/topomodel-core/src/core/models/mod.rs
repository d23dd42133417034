//! # Core Models Module
//!
//! Plain data structures the topology engine stores and hands out.
//!
//! ## Key Components
//!
//! - [`site`] - Point particles with position, optional charge/mass/element and an atom-type handle
//! - [`connection`] - Bonds, angles, dihedrals and impropers as ordered tuples of site handles
//! - [`subtopology`] - Named groupings of sites, such as individual molecules
//! - [`simulation_box`] - The periodic cell and its lattice vectors
//! - [`ids`] - Handle types issued by the topology's arenas and type pools
//!
//! None of these types carries a back-reference to its topology. Everything
//! shared (sites referenced by connections, types referenced by sites and
//! connections) is addressed through `slotmap` handles tagged with the owning
//! topology's token, which keeps ownership in one place: the
//! [`Topology`](crate::engine::topology::Topology).

pub mod connection;
pub mod ids;
pub mod simulation_box;
pub mod site;
pub mod subtopology;
