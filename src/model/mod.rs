//! Topology data model.
//!
//! This module contains:
//! - `Domain`: administrative identity and health summary of the cluster
//! - `Resource`: polymorphic managed entity (node, native resource, group)
//! - `Relation`: typed directed edge between two resources
//! - `Constraint`: raw policy record, translated into at most one relation

mod constraint;
mod domain;
mod relation;
mod resource;

pub use constraint::{Constraint, ConstraintKind, LocationRule, OrderAction};
pub use domain::{CommunicationState, Domain, DomainState, PolicyInfo};
pub use relation::{Relation, RelationCategory, RelationKind};
pub use resource::{
    ActivationState, CompoundState, OperationalState, Resource, ResourceKey, ResourceKind,
    ResourceType, GROUP_CLASS_COLLECTION,
};
