// fanwatch-core/src/services/grouping.rs
//
// Collapses the registration list into one work item per upstream entity, so an entity
// watched by many guilds is polled once per cycle.

use std::collections::HashMap;

use tracing::warn;

use fanwatch_common::models::{NotificationKind, WatchRegistration};

/// Every registration watching one entity in the current cycle. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityWorkItem {
    pub entity_id: String,
    pub registrations: Vec<WatchRegistration>,
}

impl EntityWorkItem {
    /// Returns `None` for an empty list or if the registrations disagree on the entity.
    pub fn new(registrations: Vec<WatchRegistration>) -> Option<Self> {
        let entity_id = registrations.first()?.entity_id.clone();
        if registrations.iter().any(|r| r.entity_id != entity_id) {
            return None;
        }
        Some(Self { entity_id, registrations })
    }

    /// Stable representative for per-entity work such as the avatar check.
    pub fn primary(&self) -> &WatchRegistration {
        &self.registrations[0]
    }

    pub fn enabled_for(&self, kind: NotificationKind) -> Vec<&WatchRegistration> {
        self.registrations
            .iter()
            .filter(|r| r.is_enabled_for(kind))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

/// Groups registrations by entity id. Entity order and the order inside each group follow
/// the input order (creation order, as listed by the repository).
///
/// A second row for the same `(guild, entity)` pair is a data-integrity problem: it is logged
/// and replaces the earlier one in place.
pub fn group_by_entity(registrations: Vec<WatchRegistration>) -> Vec<EntityWorkItem> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<WatchRegistration>> = Vec::new();

    for reg in registrations {
        match index.get(&reg.entity_id) {
            Some(&i) => {
                let group = &mut groups[i];
                if let Some(pos) = group.iter().position(|r| r.guild_id == reg.guild_id) {
                    warn!(
                        "Duplicate registration for guild={} entity={}; keeping the later row",
                        reg.guild_id, reg.entity_id
                    );
                    group[pos] = reg;
                } else {
                    group.push(reg);
                }
            }
            None => {
                index.insert(reg.entity_id.clone(), groups.len());
                groups.push(vec![reg]);
            }
        }
    }

    groups.into_iter().filter_map(EntityWorkItem::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg(guild: &str, entity: &str) -> WatchRegistration {
        WatchRegistration::new(guild, entity, &format!("user_{entity}"), "chan")
    }

    #[test]
    fn test_groups_by_entity_in_first_seen_order() {
        let items = group_by_entity(vec![
            reg("g1", "e1"),
            reg("g1", "e2"),
            reg("g2", "e1"),
            reg("g3", "e1"),
        ]);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].entity_id, "e1");
        assert_eq!(items[0].len(), 3);
        assert_eq!(items[0].primary().guild_id, "g1");
        assert_eq!(items[1].entity_id, "e2");
        assert_eq!(items[1].len(), 1);
    }

    #[test]
    fn test_duplicate_pair_keeps_later_row() {
        let mut later = reg("g1", "e1");
        later.username = "renamed".into();

        let items = group_by_entity(vec![reg("g1", "e1"), reg("g2", "e1"), later]);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].len(), 2);
        assert_eq!(items[0].registrations[0].username, "renamed");
        assert_eq!(items[0].registrations[1].guild_id, "g2");
    }

    #[test]
    fn test_empty_input_yields_no_items() {
        assert!(group_by_entity(vec![]).is_empty());
        assert!(EntityWorkItem::new(vec![]).is_none());
    }

    #[test]
    fn test_mixed_entities_rejected() {
        assert!(EntityWorkItem::new(vec![reg("g1", "e1"), reg("g1", "e2")]).is_none());
    }

    #[test]
    fn test_enabled_for_filters_by_kind() {
        let mut posts_only = reg("g1", "e1");
        posts_only.live_enabled = false;
        let both = reg("g2", "e1");

        let item = EntityWorkItem::new(vec![posts_only, both]).unwrap();
        assert_eq!(item.enabled_for(NotificationKind::Post).len(), 2);
        let live: Vec<_> = item.enabled_for(NotificationKind::Live).iter().map(|r| r.guild_id.clone()).collect();
        assert_eq!(live, vec!["g2".to_string()]);
    }
}
