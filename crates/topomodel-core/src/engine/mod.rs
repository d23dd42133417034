//! # Engine Module
//!
//! The stateful layer of topomodel: the [`Topology`](topology::Topology)
//! aggregate and the bookkeeping structures it is built from.
//!
//! ## Overview
//!
//! A topology owns its sites, connections, subtopologies and parameter types.
//! Types are pooled per kind and referenced by handle, so editing a pooled type
//! is visible through every member that holds it. Registries layered over the
//! pools list the distinct types in use, in first-occurrence order, and give
//! each one a stable index until the next rescan.
//!
//! ## Architecture
//!
//! - **Ordered storage** ([`arena`]) - Slot-map storage that also remembers insertion order
//! - **Type registries** ([`registry`]) - De-duplicated, order-preserving lists of type handles
//! - **Pair potentials** ([`pairs`]) - Explicit pair overrides keyed by unordered atom-type pairs
//! - **Member handles** ([`member`]) - A single enum naming anything a topology can index
//! - **Error Handling** ([`error`]) - The [`TopologyError`](error::TopologyError) type
//! - **Aggregate** ([`topology`]) - The [`Topology`](topology::Topology) itself

pub mod arena;
pub mod error;
pub mod member;
pub(crate) mod pairs;
pub mod registry;
pub mod topology;

pub use error::TopologyError;
pub use member::TopologyMember;
pub use topology::Topology;
