//! Filter/query engine for ad-hoc enumeration.
//!
//! A criterion matches a resource or relation field against one or more
//! candidate values, each possibly containing `*` wildcards. For both EQUAL
//! and NOT_EQUAL the candidates combine with OR: the criterion matches when
//! ANY candidate equals (respectively, does not equal) the field. That makes
//! NOT_EQUAL with two distinct candidates match everything; the behavior is
//! part of the adapter's contract and must not be "fixed" here. A list of
//! criteria is a conjunction.

use regex::Regex;

use crate::model::{Relation, Resource};

/// Criterion operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Equal,
    NotEqual,
}

/// Resource fields a criterion can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceField {
    Name,
    Class,
    Node,
    Type,
}

/// Relation fields a criterion can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationField {
    /// The kind name (HAS_MEMBER, HOSTED_BY, ...).
    Name,
    /// The category (GROUP_MEMBERSHIP, ...).
    Type,
}

/// Direction for relation enumeration relative to a matched resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelationDirection {
    #[default]
    Forward,
    Backward,
}

/// One filter criterion over resources or relations.
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    /// Reserved: top-level resources only.
    TopLevel,
    /// Reserved: all resources unconditionally.
    All,
    Resource {
        field: ResourceField,
        op: FilterOp,
        values: Vec<String>,
    },
    Relation {
        field: RelationField,
        op: FilterOp,
        values: Vec<String>,
    },
    /// Relation enumeration direction; EQUAL carries the direction, any
    /// other shape falls back to forward.
    Direction { op: FilterOp, value: RelationDirection },
}

impl Criterion {
    pub fn resource(field: ResourceField, op: FilterOp, values: &[&str]) -> Self {
        Self::Resource {
            field,
            op,
            values: values.iter().map(|v| (*v).to_string()).collect(),
        }
    }

    pub fn relation(field: RelationField, op: FilterOp, values: &[&str]) -> Self {
        Self::Relation {
            field,
            op,
            values: values.iter().map(|v| (*v).to_string()).collect(),
        }
    }
}

/// Full-string wildcard match: `*` stands for any substring, everything
/// else is literal.
pub fn wildcard_match(value: &str, pattern: &str) -> bool {
    let anchored = format!("^{}$", regex::escape(pattern).replace("\\*", ".*"));
    match Regex::new(&anchored) {
        Ok(re) => re.is_match(value),
        // Unreachable after escaping; fall back to literal comparison.
        Err(_) => value == pattern,
    }
}

/// OR-across-values matching for one field value.
pub fn matches_values(actual: &str, op: FilterOp, values: &[String]) -> bool {
    values.iter().any(|candidate| match op {
        FilterOp::Equal => wildcard_match(actual, candidate),
        FilterOp::NotEqual => !wildcard_match(actual, candidate),
    })
}

/// Whether one resource criterion accepts a resource. Reserved and
/// relation-side criteria accept everything.
pub fn matches_resource(rsc: &Resource, criterion: &Criterion) -> bool {
    match criterion {
        Criterion::Resource { field, op, values } => {
            let actual = match field {
                ResourceField::Name => rsc.name.as_str(),
                ResourceField::Class => rsc.class.as_str(),
                ResourceField::Node => rsc.node.as_str(),
                ResourceField::Type => rsc.resource_type().as_str(),
            };
            matches_values(actual, *op, values)
        }
        _ => true,
    }
}

/// Whether one relation criterion accepts a relation.
pub fn matches_relation(rel: &Relation, criterion: &Criterion) -> bool {
    match criterion {
        Criterion::Relation { field, op, values } => {
            let actual = match field {
                RelationField::Name => rel.kind.name(),
                RelationField::Type => rel.kind.category().as_str(),
            };
            matches_values(actual, *op, values)
        }
        _ => true,
    }
}

/// Apply a conjunction of criteria to a resource list: each criterion
/// independently narrows the candidate set.
pub fn filter_resources(mut resources: Vec<Resource>, criteria: &[Criterion]) -> Vec<Resource> {
    for criterion in criteria {
        resources.retain(|rsc| matches_resource(rsc, criterion));
    }
    resources
}

/// Apply a conjunction of criteria to a relation list.
pub fn filter_relations(mut relations: Vec<Relation>, criteria: &[Criterion]) -> Vec<Relation> {
    for criterion in criteria {
        relations.retain(|rel| matches_relation(rel, criterion));
    }
    relations
}
