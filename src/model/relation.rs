//! Typed directed relations between resources.

use super::resource::ResourceKey;

/// Relation kind: names the edge semantics.
///
/// A relation's identity for diffing is the kind name alone, not its
/// endpoints. That undercounts changes when several relations share a kind;
/// see `diff::relation_identity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Group to member.
    HasMember,
    /// Native resource to the node a location constraint places it on.
    HostedBy,
    /// Two resources that must run together.
    Collocated,
    /// Two resources that must not run together.
    AntiCollocated,
    /// Start-order edge: the source starts after the target.
    StartsAfter,
}

impl RelationKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::HasMember => "HAS_MEMBER",
            Self::HostedBy => "HOSTED_BY",
            Self::Collocated => "COLLOCATED",
            Self::AntiCollocated => "ANTI_COLLOCATED",
            Self::StartsAfter => "STARTS_AFTER",
        }
    }

    pub fn category(self) -> RelationCategory {
        match self {
            Self::HasMember => RelationCategory::GroupMembership,
            Self::HostedBy => RelationCategory::HostingNode,
            Self::Collocated | Self::AntiCollocated | Self::StartsAfter => {
                RelationCategory::ResourceToResource
            }
        }
    }
}

/// Broad relation category, the "relation type" of filter criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationCategory {
    GroupMembership,
    HostingNode,
    ResourceToResource,
}

impl RelationCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GroupMembership => "GROUP_MEMBERSHIP",
            Self::HostingNode => "HOSTING_NODE",
            Self::ResourceToResource => "RESOURCE_TO_RESOURCE",
        }
    }
}

/// A directed typed edge between two resource identities.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub kind: RelationKind,
    pub source: ResourceKey,
    pub target: ResourceKey,
}

impl Relation {
    pub fn new(kind: RelationKind, source: ResourceKey, target: ResourceKey) -> Self {
        Self {
            kind,
            source,
            target,
        }
    }
}
