use std::collections::{BTreeMap, BTreeSet};

use crate::requirement::Requirement;
use crate::world::World;
use crate::{Result, WorldError};

/// Fails with [`WorldError::InconsistentWorld`] listing every problem found.
pub fn validate(world: &World) -> Result<()> {
    let problems = find_problems(world);
    if problems.is_empty() {
        Ok(())
    } else {
        Err(WorldError::InconsistentWorld(problems))
    }
}

/// Cross-reference checks over a finished world.
pub fn find_problems(world: &World) -> Vec<String> {
    let mut problems = Vec::new();

    let mut item_names = BTreeSet::new();
    let mut tags = BTreeSet::new();
    let mut copies: BTreeMap<&str, u64> = BTreeMap::new();
    let mut values: BTreeMap<&str, u64> = BTreeMap::new();

    for item in &world.items {
        if !item_names.insert(item.name.as_str()) {
            problems.push(format!("duplicate item name '{}'", item.name));
        }
        if item.count == 0 {
            problems.push(format!("item '{}' has a zero count", item.name));
        }
        if item.progression && item.trap {
            problems.push(format!("item '{}' is both progression and trap", item.name));
        }
        tags.extend(item.tags.iter());
        *copies.entry(item.name.as_str()).or_default() += u64::from(item.count);
        for (key, value) in &item.value {
            *values.entry(key.as_str()).or_default() += u64::from(*value) * u64::from(item.count);
        }
    }

    let mut location_names = BTreeSet::new();
    for location in &world.locations {
        if !location_names.insert(location.name.as_str()) {
            problems.push(format!("duplicate location name '{}'", location.name));
        }

        for placed in &location.place_item {
            if !item_names.contains(placed.as_str()) {
                problems.push(format!(
                    "location '{}' places unknown item '{placed}'",
                    location.name
                ));
            }
        }
        for placed in &location.place_item_category {
            if !tags.contains(placed.as_str()) {
                problems.push(format!(
                    "location '{}' places from empty category '{placed}'",
                    location.name
                ));
            }
        }

        let Some(requires) = &location.requires else {
            continue;
        };
        if !requires.is_well_formed() {
            problems.push(format!(
                "location '{}' has a malformed requirement '{requires}'",
                location.name
            ));
        }
        // The text form is what gets shipped; it has to read back as the same tree.
        let rendered = requires.to_string();
        if Requirement::parse(&rendered).as_ref() != Ok(requires) {
            problems.push(format!(
                "location '{}' requirement '{rendered}' does not read back unchanged",
                location.name
            ));
        }
        for leaf in requires.leaves() {
            let resolved = match leaf {
                Requirement::HasItem(name) => copies.contains_key(name.as_str()),
                Requirement::HasCategory(name) => tags.contains(name.as_str()),
                Requirement::HasTier { item, count } => {
                    copies
                        .get(item.as_str())
                        .is_some_and(|held| *held >= u64::from(*count))
                }
                Requirement::ValueAtLeast { key, threshold } => {
                    values.get(key.as_str()).is_some_and(|sum| *sum >= u64::from(*threshold))
                }
                Requirement::And(_) | Requirement::Or(_) => true,
            };
            if !resolved {
                problems.push(format!(
                    "location '{}' requires {leaf} which no item satisfies",
                    location.name
                ));
            }
        }
    }

    let victories = world.victory_locations().count();
    if victories != 1 {
        problems.push(format!("expected one victory location, found {victories}"));
    }

    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Item, Location, Tags};

    fn minimal_world() -> World {
        World {
            items: vec![
                Item::new("CHAIN", Tags::new("CHAIN"))
                    .progression()
                    .with_count(20)
                    .with_value("chain", 1),
                Item::new("Progressive Gauge", Tags::new("Progressive Gauge"))
                    .progression()
                    .with_count(2),
            ],
            locations: vec![
                Location::new("Goal", Tags::new("((Victory))"))
                    .requires(Requirement::value_at_least("chain", 20))
                    .victory(),
                Location::new("Gauge", Tags::new("((Helpers)) Progressive Gauge"))
                    .requires(Requirement::tier("Progressive Gauge", 2)),
            ],
            categories: Default::default(),
        }
    }

    #[test]
    fn accepts_consistent_world() {
        assert!(validate(&minimal_world()).is_ok());
    }

    #[test]
    fn flags_dangling_references() {
        let mut world = minimal_world();
        world.locations.push(
            Location::new("Locked", Tags::new("Goals"))
                .requires(Requirement::any([
                    Requirement::category("Song Number 9"),
                    Requirement::tier("Progressive Gauge", 3),
                    Requirement::value_at_least("chain", 21),
                    Requirement::item("Nothing"),
                ])),
        );
        let problems = find_problems(&world);
        assert_eq!(problems.len(), 4, "{problems:?}");
    }

    #[test]
    fn flags_victory_count_and_duplicates() {
        let mut world = minimal_world();
        world.locations[0].victory = false;
        world.items.push(Item::new("CHAIN", Tags::new("CHAIN")));
        world.items.push(Item::new("Oops", Tags::new("Traps")).progression().trap());

        let problems = find_problems(&world);
        assert!(problems.iter().any(|p| p.contains("duplicate item name 'CHAIN'")));
        assert!(problems.iter().any(|p| p.contains("both progression and trap")));
        assert!(problems.iter().any(|p| p.contains("found 0")));
        assert!(matches!(validate(&world), Err(WorldError::InconsistentWorld(_))));
    }

    #[test]
    fn huge_item_counts_do_not_overflow() {
        let mut world = minimal_world();
        world.items.push(Item::new("Filler", Tags::new("Filler")).with_count(u32::MAX));
        world.items.push(Item::new("Filler", Tags::new("Filler")).with_count(u32::MAX));

        let problems = find_problems(&world);
        assert_eq!(problems, vec!["duplicate item name 'Filler'".to_string()]);
    }

    #[test]
    fn flags_requirements_that_do_not_read_back() {
        let mut world = minimal_world();
        world.items.push(Item::new("A|B", Tags::new("Odd")));
        world.items.push(Item::new("Rank:3", Tags::new("Odd")));
        world.locations.push(
            Location::new("Pipe", Tags::new("Goals")).requires(Requirement::item("A|B")),
        );
        world.locations.push(
            Location::new("Colon", Tags::new("Goals")).requires(Requirement::item("Rank:3")),
        );

        let problems = find_problems(&world);
        assert!(problems.iter().any(|p| p.contains("'Pipe'") && p.contains("read back")));
        assert!(problems.iter().any(|p| p.contains("'Colon'") && p.contains("read back")));
    }

    #[test]
    fn flags_unknown_placements() {
        let mut world = minimal_world();
        world
            .locations
            .push(Location::new("Boss", Tags::new("Goals")).placing("Missing (Completion)"));
        let problems = find_problems(&world);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("Missing (Completion)"));
    }
}
