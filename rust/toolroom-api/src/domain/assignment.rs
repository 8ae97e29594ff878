//! PPE delivery specs and resolution types.
//!
//! A PPE schedule's payload deserializes into a [`DeliverySpec`]: which item
//! kinds, in what quantities, for which assignees. Resolution of a spec line
//! to a concrete allocatable stock item is delegated to the pluggable
//! resolver supplied by the surrounding application.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One line of a delivery spec: an item kind and quantity per assignee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependentItemSpec {
    /// Item kind to deliver (e.g. "gloves", "safety-boots").
    pub item_kind: String,
    /// Units per assignee.
    pub quantity: u32,
}

/// A person the delivery is for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
    /// Assignee id.
    pub id: Uuid,
    /// Display name for logs and error records.
    pub name: String,
    /// Size profile used for size-matched resolution, when known.
    #[serde(default)]
    pub size: Option<String>,
}

/// What a PPE schedule materializes, per occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverySpec {
    /// Item lines delivered to every assignee.
    pub items: Vec<DependentItemSpec>,
    /// People covered by this schedule.
    pub assignees: Vec<Assignee>,
}

/// A concrete allocatable stock item matched to an assignee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedResource {
    /// Stock item id.
    pub stock_item_id: Uuid,
    /// Item kind the resolution was for.
    pub item_kind: String,
    /// Matched size, when the item is sized.
    #[serde(default)]
    pub size: Option<String>,
    /// Units allocated.
    pub quantity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_spec_round_trip() {
        let spec = DeliverySpec {
            items: vec![DependentItemSpec {
                item_kind: "gloves".to_string(),
                quantity: 2,
            }],
            assignees: vec![Assignee {
                id: Uuid::new_v4(),
                name: "ana".to_string(),
                size: Some("M".to_string()),
            }],
        };
        let value = serde_json::to_value(&spec).unwrap();
        let back: DeliverySpec = serde_json::from_value(value).unwrap();
        assert_eq!(back, spec);
    }
}
