//! Topomirror - HA cluster topology mirror
//!
//! Maintains a consistent, queryable in-memory mirror of a running
//! high-availability cluster's topology (nodes, resources, resource groups
//! and the relations between them), rebuilds it from the cluster engine on
//! every change notification, and emits add/modify/delete events for the
//! differences between consecutive snapshots.

pub mod adapter;
pub mod builder;
pub mod config;
pub mod diff;
pub mod filter;
pub mod interfaces;
pub mod model;
pub mod store;
pub mod sync;
pub mod test_utils;
pub mod translate;
