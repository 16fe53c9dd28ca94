//! Constraint translator: raw constraints into typed relations.
//!
//! Every constraint yields zero or one relation. A constraint referencing a
//! resource identity absent from the current build pass is dropped with a
//! warning, never escalated.

use tracing::warn;

use crate::model::{Constraint, OrderAction, Relation, RelationKind, Resource};

/// Rule attribute naming the hosting node.
pub const NODE_NAME_ATTRIBUTE: &str = "#uname";
/// Rule operation for equality tests.
pub const OPERATION_EQUAL: &str = "eq";

/// Colocation score requiring co-location.
pub const SCORE_INFINITY: &str = "INFINITY";
/// Colocation score forbidding co-location.
pub const SCORE_NEG_INFINITY: &str = "-INFINITY";

/// Non-fatal translation findings, surfaced to the caller instead of being
/// silently dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum TranslationWarning {
    /// A colocation score other than INFINITY/-INFINITY; the engine supports
    /// graded scores but this adapter has no relation to map them onto.
    UnsupportedScore {
        id: String,
        from: String,
        to: String,
        score: String,
    },
}

/// Output of one translation pass.
#[derive(Debug, Default)]
pub struct Translation {
    pub relations: Vec<Relation>,
    pub warnings: Vec<TranslationWarning>,
}

fn find<'a>(resources: &'a [Resource], name: &str) -> Option<&'a Resource> {
    resources.iter().find(|r| r.name == name)
}

fn find_mut<'a>(resources: &'a mut [Resource], name: &str) -> Option<&'a mut Resource> {
    resources.iter_mut().find(|r| r.name == name)
}

/// Translate a location constraint.
///
/// Only the first rule is honored, and only when it tests the node-name
/// attribute for equality: the named native resource is rewritten to live on
/// that node and a HOSTED_BY relation is emitted. Any other first-rule shape
/// yields no relation.
fn translate_location(
    resources: &mut [Resource],
    resource: &str,
    rules: &[crate::model::LocationRule],
) -> Option<Relation> {
    let rule = rules.first()?;
    if rule.attribute != NODE_NAME_ATTRIBUTE || rule.operation != OPERATION_EQUAL {
        return None;
    }

    let node_key = match find(resources, &rule.value) {
        Some(node) => node.key(),
        None => {
            warn!(resource = %resource, node = %rule.value, "Location constraint names unknown node; dropped");
            return None;
        }
    };
    let native = match find_mut(resources, resource) {
        Some(native) => native,
        None => {
            warn!(resource = %resource, "Location constraint names unknown resource; dropped");
            return None;
        }
    };

    native.node = rule.value.clone();
    if let crate::model::ResourceKind::Native { hosting_node, .. } = &mut native.kind {
        *hosting_node = Some(rule.value.clone());
    }
    Some(Relation::new(RelationKind::HostedBy, native.key(), node_key))
}

fn endpoint_keys(
    resources: &[Resource],
    from: &str,
    to: &str,
) -> Option<(crate::model::ResourceKey, crate::model::ResourceKey)> {
    match (find(resources, from), find(resources, to)) {
        (Some(from), Some(to)) => Some((from.key(), to.key())),
        _ => {
            warn!(from = %from, to = %to, "Constraint endpoint unresolved; dropped");
            None
        }
    }
}

/// Translate all constraints against the resources of the current build
/// pass. Location constraints rewrite the hosted resource's node name, so
/// the resource list is taken mutably.
pub fn translate(constraints: &[Constraint], resources: &mut [Resource]) -> Translation {
    let mut out = Translation::default();

    for constraint in constraints {
        match constraint {
            Constraint::Location {
                resource, rules, ..
            } => {
                if let Some(rel) = translate_location(resources, resource, rules) {
                    out.relations.push(rel);
                }
            }
            Constraint::Colocation {
                id,
                from,
                to,
                score,
            } => {
                let kind = match score.as_str() {
                    SCORE_INFINITY => RelationKind::Collocated,
                    SCORE_NEG_INFINITY => RelationKind::AntiCollocated,
                    other => {
                        warn!(id = %id, score = %other, "Unsupported colocation score");
                        out.warnings.push(TranslationWarning::UnsupportedScore {
                            id: id.clone(),
                            from: from.clone(),
                            to: to.clone(),
                            score: other.to_string(),
                        });
                        continue;
                    }
                };
                if let Some((from, to)) = endpoint_keys(resources, from, to) {
                    out.relations.push(Relation::new(kind, from, to));
                }
            }
            Constraint::Order {
                from, to, action, ..
            } => {
                if let Some((from, to)) = endpoint_keys(resources, from, to) {
                    let rel = match action {
                        OrderAction::After => Relation::new(RelationKind::StartsAfter, from, to),
                        OrderAction::Before => Relation::new(RelationKind::StartsAfter, to, from),
                    };
                    out.relations.push(rel);
                }
            }
        }
    }

    out
}
