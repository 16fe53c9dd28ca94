//! Raw constraint records, used only during translation and never stored.

/// Constraint kind as known to the cluster engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Location,
    Colocation,
    Order,
}

impl ConstraintKind {
    /// The engine's query name for this kind.
    pub fn engine_name(self) -> &'static str {
        match self {
            Self::Location => "rsc_location",
            Self::Colocation => "rsc_colocation",
            Self::Order => "rsc_order",
        }
    }
}

/// One rule of a location constraint: (attribute, operation, value).
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRule {
    pub attribute: String,
    pub operation: String,
    pub value: String,
}

/// Start-order direction of an order constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    Before,
    After,
}

impl OrderAction {
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "before" => Some(Self::Before),
            "after" => Some(Self::After),
            _ => None,
        }
    }
}

/// An external, unprocessed policy record. Each constraint is translated
/// into zero or one relation.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Location {
        id: String,
        resource: String,
        score: String,
        rules: Vec<LocationRule>,
    },
    Colocation {
        id: String,
        from: String,
        to: String,
        score: String,
    },
    Order {
        id: String,
        from: String,
        to: String,
        action: OrderAction,
    },
}
