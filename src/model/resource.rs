//! Resource records and their state model.

use serde::{Deserialize, Serialize};

/// Resource class assigned to resource groups.
pub const GROUP_CLASS_COLLECTION: &str = "collection";

/// Desired or observed activation state of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationState {
    Online,
    Offline,
}

impl ActivationState {
    /// `Online` when the condition holds, `Offline` otherwise.
    pub fn from_online(online: bool) -> Self {
        if online {
            Self::Online
        } else {
            Self::Offline
        }
    }

    pub fn is_online(self) -> bool {
        self == Self::Online
    }
}

/// Whether the automation layer can currently operate the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationalState {
    Ok,
    Error,
}

/// Compound health state: observed state judged against the desired state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompoundState {
    Ok,
    Warning,
    Error,
}

/// Coarse resource category, used by filter criteria and event payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Node,
    Resource,
    ResourceGroup,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Node => "NODE",
            Self::Resource => "RESOURCE",
            Self::ResourceGroup => "RESOURCE_GROUP",
        }
    }
}

/// Composite lookup key: a resource name is unique within
/// (domain, node, name, class).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ResourceKey {
    pub domain: String,
    pub node: String,
    pub name: String,
    pub class: String,
}

impl ResourceKey {
    pub fn new(
        domain: impl Into<String>,
        node: impl Into<String>,
        name: impl Into<String>,
        class: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            node: node.into(),
            name: name.into(),
            class: class.into(),
        }
    }
}

/// Variant-specific attributes of a resource.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceKind {
    /// A cluster node.
    Node {
        online: bool,
        standby: bool,
        dc: bool,
    },
    /// An individually managed resource.
    Native {
        /// Raw status string reported by the engine ("running", "stopped", ...).
        status: String,
        /// Configured target role ("started", "stopped", or empty when unset).
        target_role: String,
        /// Node the resource is placed on by a location constraint, if any.
        hosting_node: Option<String>,
    },
    /// A named collection of native resources. Its activation states are
    /// aggregates over the current members, never set directly.
    Group { group_class: String },
}

/// A managed entity in the cluster topology.
///
/// Identity for lookup and diffing is the resource name alone; the composite
/// `ResourceKey` exists for key-based enumeration only.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub name: String,
    pub domain: String,
    /// Node the resource lives on; empty while unassigned.
    pub node: String,
    pub class: String,
    pub desired: ActivationState,
    pub observed: ActivationState,
    pub operational: OperationalState,
    pub compound: CompoundState,
    /// Whether the automation layer should manage this resource.
    pub included: bool,
    /// True for nodes, groups and ungrouped resources; false for group members.
    pub top_level: bool,
    pub subscribed: bool,
    pub kind: ResourceKind,
}

impl Resource {
    /// Create a node resource from its raw engine attributes.
    /// Domain name and completion happen during the rebuild that adds it.
    pub fn node(name: impl Into<String>, online: bool, standby: bool, dc: bool) -> Self {
        let name = name.into();
        Self {
            node: name.clone(),
            name,
            domain: String::new(),
            class: String::new(),
            desired: ActivationState::Offline,
            observed: ActivationState::Offline,
            operational: OperationalState::Ok,
            compound: CompoundState::Ok,
            included: true,
            top_level: true,
            subscribed: false,
            kind: ResourceKind::Node {
                online,
                standby,
                dc,
            },
        }
    }

    /// Create a native resource from its raw status and target role.
    pub fn native(
        name: impl Into<String>,
        status: impl Into<String>,
        target_role: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            domain: String::new(),
            node: String::new(),
            class: String::new(),
            desired: ActivationState::Offline,
            observed: ActivationState::Offline,
            operational: OperationalState::Ok,
            compound: CompoundState::Ok,
            included: true,
            top_level: true,
            subscribed: false,
            kind: ResourceKind::Native {
                status: status.into(),
                target_role: target_role.into(),
                hosting_node: None,
            },
        }
    }

    /// Create a resource group shell; its states are aggregated later.
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: String::new(),
            node: String::new(),
            class: GROUP_CLASS_COLLECTION.to_string(),
            desired: ActivationState::Offline,
            observed: ActivationState::Offline,
            operational: OperationalState::Ok,
            compound: CompoundState::Ok,
            included: true,
            top_level: true,
            subscribed: false,
            kind: ResourceKind::Group {
                group_class: GROUP_CLASS_COLLECTION.to_string(),
            },
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        match self.kind {
            ResourceKind::Node { .. } => ResourceType::Node,
            ResourceKind::Native { .. } => ResourceType::Resource,
            ResourceKind::Group { .. } => ResourceType::ResourceGroup,
        }
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey {
            domain: self.domain.clone(),
            node: self.node.clone(),
            name: self.name.clone(),
            class: self.class.clone(),
        }
    }

    /// Fill in the derived attributes from the variant-specific raw state.
    ///
    /// - Node: observed mirrors the engine's online flag, desired mirrors
    ///   observed (nodes have no independent desired state), included iff
    ///   not standby.
    /// - Native: observed online iff the status string is "running", desired
    ///   offline iff the target role is "stopped".
    /// - Group: desired/observed were aggregated from the members beforehand
    ///   and are left untouched.
    ///
    /// All variants derive operational and compound health from the resulting
    /// desired/observed pair.
    pub fn complete(&mut self) {
        match &self.kind {
            ResourceKind::Node {
                online, standby, ..
            } => {
                self.observed = ActivationState::from_online(*online);
                self.desired = self.observed;
                self.included = !*standby;
            }
            ResourceKind::Native {
                status,
                target_role,
                ..
            } => {
                self.observed = ActivationState::from_online(status == "running");
                self.desired = ActivationState::from_online(target_role != "stopped");
            }
            ResourceKind::Group { .. } => {}
        }

        self.operational = if self.observed == self.desired {
            OperationalState::Ok
        } else {
            OperationalState::Error
        };
        self.compound = match (self.observed, self.desired) {
            (o, d) if o == d => CompoundState::Ok,
            (ActivationState::Online, ActivationState::Offline) => CompoundState::Warning,
            _ => CompoundState::Error,
        };
    }
}
