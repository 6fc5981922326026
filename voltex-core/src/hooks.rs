//! Per-player enablement rules and the song selection they consume.
//!
//! Each `*_enabled` function returns `None` to leave the default behaviour in
//! place, or `Some(enabled)` to force a decision.

use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};
use std::collections::BTreeSet;

use crate::catalog::Song;
use crate::world::{Item, Location, Tags, World, GOALS_GROUP, SONGS_GROUP};

pub fn category_enabled(_category: &str) -> Option<bool> {
    None
}

fn song_chosen(tags: &Tags, group: &str, chosen: &BTreeSet<String>) -> Option<bool> {
    if tags.group != group {
        return None;
    }
    tags.song.as_ref().map(|song| chosen.contains(song))
}

/// Song items are only kept for songs the player picked. Boss access and
/// completion items live in the goals group and follow their song too.
pub fn item_enabled(item: &Item, chosen: &BTreeSet<String>) -> Option<bool> {
    song_chosen(&item.tags, SONGS_GROUP, chosen)
        .or_else(|| song_chosen(&item.tags, GOALS_GROUP, chosen))
}

/// Goal locations are only kept for songs the player picked.
pub fn location_enabled(location: &Location, chosen: &BTreeSet<String>) -> Option<bool> {
    song_chosen(&location.tags, GOALS_GROUP, chosen)
}

/// Pick `count` song identifiers for a player. The same seed always picks
/// the same songs; asking for more songs than exist picks all of them.
pub fn choose_songs(songs: &[Song], count: usize, seed: u64) -> BTreeSet<String> {
    let mut identifiers: Vec<&str> = songs.iter().map(|song| song.identifier.as_str()).collect();
    let mut rng = StdRng::seed_from_u64(seed ^ 0x5D5C_0C7A_u64);
    identifiers.shuffle(&mut rng);
    identifiers
        .into_iter()
        .take(count)
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnabledCounts {
    /// Item copies, counting each `count` in full.
    pub items: u64,
    pub locations: usize,
}

/// How much of `world` a player with this song selection keeps.
pub fn enabled_counts(world: &World, chosen: &BTreeSet<String>) -> EnabledCounts {
    let items = world
        .items
        .iter()
        .filter(|item| item_enabled(item, chosen).unwrap_or(true))
        .map(|item| u64::from(item.count))
        .sum();
    let locations = world
        .locations
        .iter()
        .filter(|location| location_enabled(location, chosen).unwrap_or(true))
        .count();
    EnabledCounts { items, locations }
}
