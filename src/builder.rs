//! Resource builder: raw engine query records into typed resources.
//!
//! Field offsets below index into the reply record with the status sentinel
//! already stripped (see `Reply`); they follow the engine's documented record
//! layouts.

use tracing::{debug, warn};

use crate::interfaces::cluster_query::{ClusterQuery, Reply, Result};
use crate::model::{
    ActivationState, Constraint, ConstraintKind, LocationRule, OrderAction, Resource,
};

/// Offset of the automation version in the cluster config record.
const F_AUTOMATION_VERSION: usize = 7;
/// Offset of the cluster name in the cluster config record.
const F_CLUSTER_NAME: usize = 21;

/// Offsets in the node config record.
const F_NODE_ONLINE: usize = 1;
const F_NODE_STANDBY: usize = 2;
const F_NODE_IS_DC: usize = 6;

/// Resource parameter consulted for the desired state.
const PARAM_TARGET_ROLE: &str = "target_role";

fn flag(field: &str) -> bool {
    field.eq_ignore_ascii_case("true")
}

/// Engine-derived domain attributes: (cluster name, automation version).
pub async fn fetch_domain_attributes(query: &dyn ClusterQuery) -> Result<(String, String)> {
    let reply = query.cluster_config().await?;
    Ok((
        reply.field(F_CLUSTER_NAME).to_string(),
        reply.field(F_AUTOMATION_VERSION).to_string(),
    ))
}

/// Build one node resource from its config record. The caller assigns the
/// domain name and runs `complete()`.
pub fn make_node(name: &str, config: &Reply) -> Resource {
    Resource::node(
        name,
        flag(config.field(F_NODE_ONLINE)),
        flag(config.field(F_NODE_STANDBY)),
        flag(config.field(F_NODE_IS_DC)),
    )
}

/// Build one native resource from its status and parameter records.
pub fn make_native(name: &str, status: &Reply, params: &Reply) -> Resource {
    let target_role = params
        .fields()
        .chunks_exact(3)
        .find(|triple| triple[1] == PARAM_TARGET_ROLE)
        .map(|triple| triple[2].clone())
        .unwrap_or_default();
    Resource::native(name, status.field(0), target_role)
}

/// All configured nodes as node resources.
pub async fn node_resources(query: &dyn ClusterQuery) -> Result<Vec<Resource>> {
    let names = query.all_nodes().await?;
    let mut list = Vec::with_capacity(names.fields().len());
    for name in names.fields() {
        let config = query.node_config(name).await?;
        list.push(make_node(name, &config));
    }
    Ok(list)
}

async fn fetch_native(query: &dyn ClusterQuery, name: &str) -> Result<Resource> {
    let status = query.resource_status(name).await?;
    let params = query.resource_params(name).await?;
    Ok(make_native(name, &status, &params))
}

/// All top-level native resources.
pub async fn native_resources(query: &dyn ClusterQuery) -> Result<Vec<Resource>> {
    let names = query.all_resources().await?;
    let mut list = Vec::new();
    for name in names.fields() {
        let kind = query.resource_type(name).await?;
        if kind.field(0) == "native" {
            list.push(fetch_native(query, name).await?);
        }
    }
    Ok(list)
}

/// Names of all resource groups.
pub async fn group_names(query: &dyn ClusterQuery) -> Result<Vec<String>> {
    let names = query.all_resources().await?;
    let mut list = Vec::new();
    for name in names.fields() {
        let kind = query.resource_type(name).await?;
        if kind.field(0) == "group" {
            list.push(name.clone());
        }
    }
    Ok(list)
}

/// Native member resources of a group.
pub async fn group_members(query: &dyn ClusterQuery, group: &str) -> Result<Vec<Resource>> {
    let names = query.sub_resources(group).await?;
    let mut list = Vec::new();
    for name in names.fields() {
        let kind = query.resource_type(name).await?;
        if kind.field(0) == "native" {
            list.push(fetch_native(query, name).await?);
        }
    }
    Ok(list)
}

/// Aggregate a group's states from its completed members.
///
/// Observed/desired are online iff ALL members report online. An empty group
/// aggregates to online/online: the all-quantifier is vacuously true, and
/// that policy is intentional. The group's node name is taken from the
/// members, which are expected (but not verified) to share one node.
pub fn aggregate_group(group: &mut Resource, members: &[Resource]) {
    let mut node = String::new();
    let mut all_observed_online = true;
    let mut all_desired_online = true;

    for member in members {
        node = member.node.clone();
        if !member.observed.is_online() {
            all_observed_online = false;
        }
        if !member.desired.is_online() {
            all_desired_online = false;
        }
    }

    group.node = node;
    group.observed = ActivationState::from_online(all_observed_online);
    group.desired = ActivationState::from_online(all_desired_online);
}

fn parse_constraint(kind: ConstraintKind, reply: &Reply) -> Option<Constraint> {
    let f = reply.fields();
    match kind {
        ConstraintKind::Location => {
            let rules = f
                .get(3..)
                .unwrap_or(&[])
                .chunks_exact(4)
                .map(|chunk| LocationRule {
                    attribute: chunk[1].clone(),
                    operation: chunk[2].clone(),
                    value: chunk[3].clone(),
                })
                .collect();
            Some(Constraint::Location {
                id: reply.field(0).to_string(),
                resource: reply.field(1).to_string(),
                score: reply.field(2).to_string(),
                rules,
            })
        }
        ConstraintKind::Colocation => Some(Constraint::Colocation {
            id: reply.field(0).to_string(),
            from: reply.field(1).to_string(),
            to: reply.field(2).to_string(),
            score: reply.field(3).to_string(),
        }),
        ConstraintKind::Order => {
            let action = reply.field(2);
            let Some(action) = OrderAction::parse(action) else {
                warn!(
                    id = %reply.field(0),
                    action = %action,
                    "Dropping order constraint with unknown action"
                );
                return None;
            };
            Some(Constraint::Order {
                id: reply.field(0).to_string(),
                from: reply.field(1).to_string(),
                to: reply.field(3).to_string(),
                action,
            })
        }
    }
}

/// All constraints of one kind.
pub async fn constraints(
    query: &dyn ClusterQuery,
    kind: ConstraintKind,
) -> Result<Vec<Constraint>> {
    let ids = query.constraint_ids(kind).await?;
    let mut list = Vec::new();
    for id in ids.fields() {
        let detail = query.constraint_detail(kind, id).await?;
        if detail == Reply::NoData {
            debug!(kind = %kind.engine_name(), id = %id, "Constraint detail unavailable");
            continue;
        }
        if let Some(constraint) = parse_constraint(kind, &detail) {
            list.push(constraint);
        }
    }
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceKind;

    #[test]
    fn make_node_reads_config_flags() {
        let config = Reply::ok(["n1", "True", "False", "False", "False", "True", "True", "member"]);
        let rsc = make_node("n1", &config);
        assert_eq!(
            rsc.kind,
            ResourceKind::Node {
                online: true,
                standby: false,
                dc: true,
            }
        );
        assert_eq!(rsc.node, "n1");
        assert!(rsc.top_level);
    }

    #[test]
    fn make_native_finds_target_role_triple() {
        let status = Reply::ok(["running"]);
        let params = Reply::ok(["p1", "ip", "10.0.0.1", "p2", "target_role", "stopped"]);
        let rsc = make_native("rA", &status, &params);
        assert_eq!(
            rsc.kind,
            ResourceKind::Native {
                status: "running".into(),
                target_role: "stopped".into(),
                hosting_node: None,
            }
        );
    }

    #[test]
    fn make_native_tolerates_missing_target_role() {
        let rsc = make_native("rA", &Reply::ok(["stopped"]), &Reply::NoData);
        match rsc.kind {
            ResourceKind::Native { target_role, .. } => assert_eq!(target_role, ""),
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn group_aggregation_requires_all_members_online() {
        let mut online = Resource::native("rA", "running", "started");
        online.node = "n1".into();
        online.complete();
        let mut offline = Resource::native("rB", "stopped", "started");
        offline.node = "n1".into();
        offline.complete();

        let mut group = Resource::group("g1");
        aggregate_group(&mut group, &[online.clone(), offline.clone()]);
        assert_eq!(group.observed, ActivationState::Offline);
        assert_eq!(group.desired, ActivationState::Online);
        assert_eq!(group.node, "n1");

        let mut group = Resource::group("g1");
        aggregate_group(&mut group, &[online]);
        assert_eq!(group.observed, ActivationState::Online);
        assert_eq!(group.desired, ActivationState::Online);
    }

    #[test]
    fn empty_group_aggregates_to_online_by_vacuous_truth() {
        let mut group = Resource::group("g-empty");
        aggregate_group(&mut group, &[]);
        assert_eq!(group.observed, ActivationState::Online);
        assert_eq!(group.desired, ActivationState::Online);
        assert_eq!(group.node, "");
    }

    #[test]
    fn location_constraint_parses_rule_chunks() {
        let detail = Reply::ok([
            "loc1", "rA", "100", "expr1", "#uname", "eq", "n1", "expr2", "#uname", "eq", "n2",
        ]);
        let parsed = parse_constraint(ConstraintKind::Location, &detail);
        assert_eq!(
            parsed,
            Some(Constraint::Location {
                id: "loc1".into(),
                resource: "rA".into(),
                score: "100".into(),
                rules: vec![
                    LocationRule {
                        attribute: "#uname".into(),
                        operation: "eq".into(),
                        value: "n1".into(),
                    },
                    LocationRule {
                        attribute: "#uname".into(),
                        operation: "eq".into(),
                        value: "n2".into(),
                    },
                ],
            })
        );
    }

    #[test]
    fn order_constraint_with_unknown_action_is_dropped() {
        let detail = Reply::ok(["ord1", "rA", "sideways", "rB"]);
        assert_eq!(parse_constraint(ConstraintKind::Order, &detail), None);

        let detail = Reply::ok(["ord1", "rA", "before", "rB"]);
        assert_eq!(
            parse_constraint(ConstraintKind::Order, &detail),
            Some(Constraint::Order {
                id: "ord1".into(),
                from: "rA".into(),
                to: "rB".into(),
                action: OrderAction::Before,
            })
        );
    }
}
