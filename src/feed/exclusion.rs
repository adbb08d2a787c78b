use super::types::{ContentItem, EntityId};
use std::collections::HashSet;

/// Ids of the lead items, which the paginated extension must never repeat.
///
/// Built once per context initialization and reused verbatim for every
/// later page of that context. Lead order is kept so the wire body lists ids
/// in the order they are displayed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    ordered: Vec<EntityId>,
    index: HashSet<EntityId>,
}

impl ExclusionSet {
    pub fn build(lead_items: &[ContentItem]) -> Self {
        let mut set = Self {
            ordered: Vec::with_capacity(lead_items.len()),
            index: HashSet::with_capacity(lead_items.len()),
        };
        for item in lead_items {
            if set.index.insert(item.id.clone()) {
                set.ordered.push(item.id.clone());
            }
        }
        set
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.index.contains(id)
    }

    pub fn ids(&self) -> &[EntityId] {
        &self.ordered
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Drops items whose id is excluded, returning how many were removed.
    pub fn retain_unseen(&self, items: &mut Vec<ContentItem>) -> usize {
        if self.is_empty() {
            return 0;
        }
        let before = items.len();
        items.retain(|item| !self.contains(&item.id));
        before - items.len()
    }
}
