use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::requirement::Requirement;

/// Coarse group of a purchasable song item.
pub const SONGS_GROUP: &str = "Songs";
/// Coarse group of every per-song goal location (and boss items).
pub const GOALS_GROUP: &str = "Goals";

/// Category tags of an item or location.
///
/// Serialized as a flat list: `group` first, then `song` when present, then
/// `extra`. The enablement hooks read the song back from position 1, so the
/// order is part of the output format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags {
    pub group: String,
    pub song: Option<String>,
    pub extra: Vec<String>,
}

impl Tags {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            song: None,
            extra: Vec::new(),
        }
    }

    pub fn for_song(group: impl Into<String>, song: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            song: Some(song.into()),
            extra: Vec::new(),
        }
    }

    pub fn with(mut self, tag: impl Into<String>) -> Self {
        self.extra.push(tag.into());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.group.as_str())
            .chain(self.song.as_deref())
            .chain(self.extra.iter().map(String::as_str))
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.iter().any(|t| t == tag)
    }

    pub fn to_list(&self) -> Vec<String> {
        self.iter().map(str::to_string).collect()
    }

    /// Inverse of [`Tags::to_list`]. Position 1 is only treated as a song for
    /// the `Songs` and `Goals` groups.
    pub fn from_list(list: Vec<String>) -> Self {
        let mut rest = list.into_iter();
        let group = rest.next().unwrap_or_default();
        let song = if group == SONGS_GROUP || group == GOALS_GROUP {
            rest.next()
        } else {
            None
        };
        Self {
            group,
            song,
            extra: rest.collect(),
        }
    }
}

impl Serialize for Tags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for Tags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<String>::deserialize(deserializer).map(Tags::from_list)
    }
}

fn default_count() -> u32 {
    1
}

fn is_one(count: &u32) -> bool {
    *count == 1
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    #[serde(rename = "category")]
    pub tags: Tags,
    #[serde(default = "default_count", skip_serializing_if = "is_one")]
    pub count: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub value: BTreeMap<String, u32>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub progression: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub useful: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub trap: bool,
}

impl Item {
    pub fn new(name: impl Into<String>, tags: Tags) -> Self {
        Self {
            name: name.into(),
            tags,
            count: 1,
            value: BTreeMap::new(),
            progression: false,
            useful: false,
            trap: false,
        }
    }

    pub fn progression(mut self) -> Self {
        self.progression = true;
        self
    }

    pub fn useful(mut self) -> Self {
        self.useful = true;
        self
    }

    pub fn trap(mut self) -> Self {
        self.trap = true;
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: u32) -> Self {
        self.value.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(rename = "category")]
    pub tags: Tags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires: Option<Requirement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub place_item: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub place_item_category: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub victory: bool,
}

impl Location {
    pub fn new(name: impl Into<String>, tags: Tags) -> Self {
        Self {
            name: name.into(),
            tags,
            requires: None,
            place_item: Vec::new(),
            place_item_category: Vec::new(),
            victory: false,
        }
    }

    pub fn requires(mut self, requirement: Requirement) -> Self {
        self.requires = Some(requirement);
        self
    }

    pub fn placing(mut self, item: impl Into<String>) -> Self {
        self.place_item.push(item.into());
        self
    }

    pub fn victory(mut self) -> Self {
        self.victory = true;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub yaml_option: Vec<String>,
}

impl Category {
    pub fn hidden() -> Self {
        Self {
            hidden: true,
            yaml_option: Vec::new(),
        }
    }
}

/// The generated world definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct World {
    pub items: Vec<Item>,
    pub locations: Vec<Location>,
    pub categories: BTreeMap<String, Category>,
}

impl World {
    /// Total item copies, i.e. the number of slots the items will fill.
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.count)).sum()
    }

    pub fn item(&self, name: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.name == name)
    }

    pub fn location(&self, name: &str) -> Option<&Location> {
        self.locations.iter().find(|location| location.name == name)
    }

    pub fn items_tagged<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Item> + 'a {
        self.items.iter().filter(move |item| item.tags.contains(tag))
    }

    pub fn victory_locations(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter().filter(|location| location.victory)
    }
}

/// Accumulator threaded through generation; [`WorldBuilder::finish`] hands
/// the collections over to the caller.
#[derive(Debug, Default)]
pub(crate) struct WorldBuilder {
    items: Vec<Item>,
    locations: Vec<Location>,
    categories: BTreeMap<String, Category>,
}

impl WorldBuilder {
    pub(crate) fn item(&mut self, item: Item) {
        self.items.push(item);
    }

    pub(crate) fn location(&mut self, location: Location) {
        self.locations.push(location);
    }

    pub(crate) fn hidden_category(&mut self, name: impl Into<String>) {
        self.categories.insert(name.into(), Category::hidden());
    }

    pub(crate) fn finish(self) -> World {
        World {
            items: self.items,
            locations: self.locations,
            categories: self.categories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tags_flatten_in_positional_order() {
        let tags = Tags::for_song(SONGS_GROUP, "Foo by Bar").with("Song Number 0");
        assert_eq!(
            serde_json::to_value(&tags).unwrap(),
            json!(["Songs", "Foo by Bar", "Song Number 0"])
        );
    }

    #[test]
    fn tags_from_list_only_reads_song_for_song_groups() {
        let goal = Tags::from_list(vec!["Goals".into(), "Foo by Bar".into(), "(Goal) Pass".into()]);
        assert_eq!(goal.song.as_deref(), Some("Foo by Bar"));
        assert_eq!(goal.extra, vec!["(Goal) Pass".to_string()]);

        let key = Tags::from_list(vec![
            "Navigator Keys".into(),
            "Navigator Access for Rasis".into(),
        ]);
        assert_eq!(key.song, None);
        assert!(key.contains("Navigator Access for Rasis"));
    }

    #[test]
    fn item_skips_default_fields() {
        let item = Item::new("CHAIN", Tags::new("CHAIN"))
            .progression()
            .with_count(20)
            .with_value("chain", 1);
        assert_eq!(
            serde_json::to_value(&item).unwrap(),
            json!({
                "name": "CHAIN",
                "category": ["CHAIN"],
                "count": 20,
                "value": {"chain": 1},
                "progression": true
            })
        );

        let single = Item::new("Cancel Trap", Tags::new("Helpers"));
        let value = serde_json::to_value(&single).unwrap();
        assert!(value.get("count").is_none());
        let back: Item = serde_json::from_value(value).unwrap();
        assert_eq!(back.count, 1);
    }

    #[test]
    fn location_serializes_requirement_as_text() {
        let location = Location::new("PERFECT ULTIMATE CHAIN", Tags::new("((Victory))"))
            .requires(Requirement::category("Boss Clear"))
            .victory();
        assert_eq!(
            serde_json::to_value(&location).unwrap(),
            json!({
                "name": "PERFECT ULTIMATE CHAIN",
                "category": ["((Victory))"],
                "requires": "|@Boss Clear|",
                "victory": true
            })
        );
    }

    #[test]
    fn item_count_sums_copies() {
        let mut builder = WorldBuilder::default();
        builder.item(Item::new("CHAIN", Tags::new("CHAIN")).with_count(20));
        builder.item(Item::new("Downlevel", Tags::new("Helpers")).with_count(12));
        builder.hidden_category("Goals");
        let world = builder.finish();
        assert_eq!(world.item_count(), 32);
        assert!(world.categories["Goals"].hidden);
    }
}
