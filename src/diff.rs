//! Change diff engine: old snapshot vs. new snapshot into ordered events.

use std::sync::Arc;

use tracing::{debug, info};

use crate::interfaces::event_sink::{EventReason, EventSink, Result, SinkError, TopologyEvent};
use crate::model::{Relation, Resource};

/// Diff identity of a resource: the resource name alone, not the composite
/// key.
pub fn resource_identity(rsc: &Resource) -> &str {
    &rsc.name
}

/// Diff identity of a relation: the kind name only, not the endpoints.
///
/// This undercounts changes when several relations share a kind with
/// different endpoints; it is the adapter's historical contract. Pass a
/// stronger key to `diff_events` to change it.
pub fn relation_identity(rel: &Relation) -> &str {
    rel.kind.name()
}

/// Single-pass identity-matching diff.
///
/// Every new-list entry with a same-identity match in the old list yields
/// `Modified` when its attributes differ from the match, and nothing when
/// they are equal; without a match it yields `Added`. Old-list entries left
/// unmatched yield `Deleted`. Rebuilding from an unchanged engine state
/// therefore diffs to an empty event list. Modified/added events come in
/// new-list iteration order, deleted events in old-list iteration order.
pub fn diff_events<T: Clone + PartialEq>(
    old: &[T],
    new: &[T],
    identity: impl Fn(&T) -> &str,
) -> Vec<(EventReason, T)> {
    let mut events = Vec::new();
    let mut remaining: Vec<&T> = old.iter().collect();

    for entry in new {
        let id = identity(entry);
        match remaining.iter().position(|prior| identity(prior) == id) {
            Some(pos) => {
                let prior = remaining.remove(pos);
                if prior != entry {
                    events.push((EventReason::Modified, entry.clone()));
                }
            }
            None => events.push((EventReason::Added, entry.clone())),
        }
    }
    for prior in remaining {
        events.push((EventReason::Deleted, prior.clone()));
    }

    events
}

/// Compares consecutive snapshots and pushes one event per difference to
/// the configured sink.
pub struct ChangeDiffEngine {
    sink: Option<Arc<dyn EventSink>>,
}

impl ChangeDiffEngine {
    pub fn new(sink: Option<Arc<dyn EventSink>>) -> Self {
        Self { sink }
    }

    fn sink(&self) -> Result<&Arc<dyn EventSink>> {
        self.sink.as_ref().ok_or(SinkError::NotConfigured)
    }

    /// Diff two snapshots and deliver the events: all resource events first,
    /// then all relation events.
    pub async fn publish_changes(
        &self,
        domain: &str,
        old_resources: &[Resource],
        old_relations: &[Relation],
        new_resources: &[Resource],
        new_relations: &[Relation],
    ) -> Result<()> {
        let sink = self.sink()?;

        let resource_events = diff_events(old_resources, new_resources, resource_identity);
        let relation_events = diff_events(old_relations, new_relations, relation_identity);
        info!(
            resource_events = resource_events.len(),
            relation_events = relation_events.len(),
            "Publishing topology changes"
        );

        for (reason, resource) in resource_events {
            debug!(reason = reason.as_str(), resource = %resource.name, "Resource event");
            sink.emit(TopologyEvent::Resource { reason, resource }).await?;
        }
        for (reason, relation) in relation_events {
            debug!(reason = reason.as_str(), relation = relation.kind.name(), "Relation event");
            sink.emit(TopologyEvent::Relation {
                reason,
                domain: domain.to_string(),
                relation,
            })
            .await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(&str, i32)]) -> Vec<(String, i32)> {
        pairs.iter().map(|(n, v)| ((*n).to_string(), *v)).collect()
    }

    fn ident(entry: &(String, i32)) -> &str {
        entry.0.as_str()
    }

    #[test]
    fn unchanged_lists_diff_to_nothing() {
        let old = entries(&[("a", 1), ("b", 2)]);
        assert!(diff_events(&old, &old, ident).is_empty());
    }

    #[test]
    fn additions_deletions_and_attribute_changes_are_detected() {
        let old = entries(&[("a", 1), ("b", 2)]);
        let new = entries(&[("b", 3), ("c", 1)]);
        let events = diff_events(&old, &new, ident);
        assert_eq!(
            events,
            vec![
                (EventReason::Modified, ("b".to_string(), 3)),
                (EventReason::Added, ("c".to_string(), 1)),
                (EventReason::Deleted, ("a".to_string(), 1)),
            ]
        );
    }

    #[test]
    fn surviving_identity_is_never_added_and_deleted() {
        let old = entries(&[("a", 1)]);
        let new = entries(&[("a", 2)]);
        let events = diff_events(&old, &new, ident);
        let reasons: Vec<_> = events.iter().map(|(r, _)| *r).collect();
        assert_eq!(reasons, vec![EventReason::Modified]);
    }

    #[test]
    fn duplicate_identities_pair_off_one_by_one() {
        // Two relations sharing a kind: one survives unchanged, the extra
        // old one is deleted.
        let old = entries(&[("HAS_MEMBER", 1), ("HAS_MEMBER", 2)]);
        let new = entries(&[("HAS_MEMBER", 1)]);
        let events = diff_events(&old, &new, ident);
        let reasons: Vec<_> = events.iter().map(|(r, _)| *r).collect();
        assert_eq!(reasons, vec![EventReason::Deleted]);
    }

    #[tokio::test]
    async fn publishing_without_a_sink_is_a_precondition_violation() {
        let engine = ChangeDiffEngine::new(None);
        let result = engine.publish_changes("cluster1", &[], &[], &[], &[]).await;
        assert!(matches!(result, Err(SinkError::NotConfigured)));
    }
}
