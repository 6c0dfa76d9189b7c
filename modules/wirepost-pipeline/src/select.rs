use std::collections::HashMap;

use rand::Rng;
use tracing::info;

use wirepost_common::TopicGroup;

/// Singleton groups are usually noise; a post needs at least two related
/// items to say something.
pub const MIN_GROUP_SIZE: usize = 2;

/// Pick one eligible topic uniformly at random. Groups below
/// `MIN_GROUP_SIZE` are excluded; `None` when nothing qualifies.
pub fn select_topic<R: Rng>(
    groups: &HashMap<String, TopicGroup>,
    rng: &mut R,
) -> Option<(String, TopicGroup)> {
    let mut eligible: Vec<&String> = groups
        .iter()
        .filter(|(_, group)| group.items.len() >= MIN_GROUP_SIZE)
        .map(|(label, _)| label)
        .collect();
    if eligible.is_empty() {
        return None;
    }

    // Stable ordering so the draw depends only on the rng, not on map
    // iteration order.
    eligible.sort();
    let label = eligible[rng.random_range(0..eligible.len())].clone();
    let group = groups[&label].clone();
    info!(
        topic = label.as_str(),
        items = group.items.len(),
        candidates = eligible.len(),
        "Selected topic"
    );
    Some((label, group))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::news_item;

    fn group(label: &str, size: usize) -> (String, TopicGroup) {
        let mut group = TopicGroup::new(label.to_string());
        group.extend_unique(
            (0..size).map(|i| news_item(&format!("https://example.com/{label}/{i}"))),
        );
        (label.to_string(), group)
    }

    #[test]
    fn sole_eligible_group_is_always_chosen() {
        let groups: HashMap<_, _> =
            [group("Solo", 3), group("Tiny", 1)].into_iter().collect();
        let mut rng = rand::rng();
        for _ in 0..20 {
            let (label, chosen) = select_topic(&groups, &mut rng).unwrap();
            assert_eq!(label, "Solo");
            assert_eq!(chosen.items.len(), 3);
        }
    }

    #[test]
    fn nothing_eligible_yields_none() {
        let groups: HashMap<_, _> = [group("A", 1), group("B", 1)].into_iter().collect();
        assert!(select_topic(&groups, &mut rand::rng()).is_none());
    }

    #[test]
    fn empty_map_yields_none() {
        let groups = HashMap::new();
        assert!(select_topic(&groups, &mut rand::rng()).is_none());
    }

    #[test]
    fn only_eligible_groups_are_drawn() {
        let groups: HashMap<_, _> = [group("Big", 4), group("AlsoBig", 2), group("Small", 1)]
            .into_iter()
            .collect();
        let mut rng = rand::rng();
        for _ in 0..50 {
            let (label, _) = select_topic(&groups, &mut rng).unwrap();
            assert_ne!(label, "Small");
        }
    }
}
