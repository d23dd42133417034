//! Adapters between a [`Topology`](crate::engine::topology::Topology) and
//! other in-memory representations.

pub mod graph;
