use tracing::{debug, info, warn};

use crate::catalog::Song;
use crate::navigators::{navigator_access_category, NavigatorTable};
use crate::requirement::Requirement;
use crate::tables::WorldTables;
use crate::validate::validate;
use crate::world::{Item, Location, Tags, World, WorldBuilder, GOALS_GROUP, SONGS_GROUP};
use crate::{Result, WorldError};

pub const VICTORY_LOCATION: &str = "PERFECT ULTIMATE CHAIN";
pub const BOSS_ACCESS: &str = "Boss Access";
pub const BOSS_CLEAR: &str = "Boss Clear";
pub const CHAIN_KEY: &str = "chain";
pub const PROGRESSIVE_GAUGE: &str = "Progressive Gauge";

pub fn song_number_category(index: usize) -> String {
    format!("Song Number {index}")
}

pub fn completion_item_name(identifier: &str) -> String {
    format!("{identifier} (Completion)")
}

pub fn goal_location_name(identifier: &str, goal: &str) -> String {
    format!("{identifier} ({goal})")
}

/// Structural class of a song; every song lands in exactly one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SongClass<'a> {
    Boss,
    /// Goals unlocked by any of these navigators.
    Navigator(Vec<&'a str>),
    Plain,
}

/// Songs without any chart level are rejected: boss detection has nothing to
/// look at, and silently demoting them would hide a scraping problem.
pub fn classify<'a>(
    song: &Song,
    navigators: &'a NavigatorTable,
    tables: &WorldTables,
) -> Result<SongClass<'a>> {
    let max_level = song
        .max_level()
        .ok_or_else(|| WorldError::InvalidCatalogEntry {
            identifier: song.identifier.clone(),
            reason: "song has no chart levels".to_string(),
        })?;

    if max_level >= tables.boss_level {
        return Ok(SongClass::Boss);
    }

    let song_navigators = navigators.navigators_for(&song.title);
    if song_navigators.is_empty() {
        Ok(SongClass::Plain)
    } else {
        Ok(SongClass::Navigator(song_navigators))
    }
}

#[derive(Debug, Default)]
struct ClassCounts {
    boss: usize,
    navigator: usize,
    plain: usize,
}

/// Generate a world from the catalog using the built-in tables.
pub fn generate(songs: &[Song], navigators: &NavigatorTable) -> Result<World> {
    generate_with(songs, navigators, &WorldTables::default())
}

/// Expand the catalog, navigator table and static tables into a world.
///
/// Either the whole world is returned or nothing: the first invalid song
/// aborts generation, and the finished world must pass [`validate`].
pub fn generate_with(
    songs: &[Song],
    navigators: &NavigatorTable,
    tables: &WorldTables,
) -> Result<World> {
    tables.check()?;
    let gauge_copies = tables.gauge_copies().ok_or_else(|| {
        WorldError::Config("tables: gauge item count does not fit".to_string())
    })?;

    let mut builder = WorldBuilder::default();

    for (navigator, title) in navigators.unknown_titles(songs) {
        warn!(navigator, title, "navigator lists a song that is not in the catalog");
    }

    let classes = songs
        .iter()
        .map(|song| classify(song, navigators, tables))
        .collect::<Result<Vec<_>>>()?;
    let has_boss = classes.contains(&SongClass::Boss);

    add_seed_content(&mut builder, tables, has_boss);
    add_navigator_gates(&mut builder, navigators);

    let mut counts = ClassCounts::default();
    for (index, (song, class)) in songs.iter().zip(classes).enumerate() {
        debug!(song = %song.identifier, ?class, "classified song");

        builder.hidden_category(song.identifier.clone());
        builder.hidden_category(song_number_category(index));

        match class {
            SongClass::Boss => {
                add_boss_song(&mut builder, index, song, tables);
                counts.boss += 1;
            }
            SongClass::Navigator(song_navigators) => {
                add_navigator_song(&mut builder, song, &song_navigators, tables);
                counts.navigator += 1;
            }
            SongClass::Plain => {
                add_plain_song(&mut builder, index, song, tables);
                counts.plain += 1;
            }
        }
    }

    add_item_pools(&mut builder, tables);
    add_progressive_gauge(&mut builder, tables, gauge_copies);

    let world = builder.finish();
    validate(&world)?;

    info!(
        bosses = counts.boss,
        navigator_songs = counts.navigator,
        plain_songs = counts.plain,
        items = world.item_count(),
        locations = world.locations.len(),
        categories = world.categories.len(),
        "generated world"
    );

    Ok(world)
}

/// Without any boss song nothing carries `Boss Clear`, so victory falls back
/// to the chain total the bosses would have asked for.
fn add_seed_content(builder: &mut WorldBuilder, tables: &WorldTables, has_boss: bool) {
    let victory = if has_boss {
        Requirement::category(BOSS_CLEAR)
    } else {
        Requirement::value_at_least(CHAIN_KEY, tables.boss_chain_requirement)
    };
    builder.location(
        Location::new(VICTORY_LOCATION, Tags::new("((Victory))"))
            .requires(victory)
            .victory(),
    );

    for tier in &tables.chain_tiers {
        builder.item(
            Item::new(tier.item_name(), Tags::new("CHAIN"))
                .progression()
                .with_count(tier.count)
                .with_value(CHAIN_KEY, tier.denomination),
        );
    }

    builder.hidden_category(GOALS_GROUP);
    builder.hidden_category("Consumables");
}

fn add_navigator_gates(builder: &mut WorldBuilder, navigators: &NavigatorTable) {
    for navigator in navigators.names() {
        let access = navigator_access_category(navigator);
        builder.hidden_category(access.clone());
        builder.item(
            Item::new(
                format!("{navigator} [ACCESS]"),
                Tags::new("Navigator Keys").with(access.clone()),
            )
            .progression(),
        );
        builder.location(
            Location::new(
                format!("{navigator} [RESCUE]"),
                Tags::new("((Navigator Rescue))"),
            )
            .requires(Requirement::category(access)),
        );
    }
}

fn add_boss_song(builder: &mut WorldBuilder, index: usize, song: &Song, tables: &WorldTables) {
    let id = &song.identifier;
    let number = song_number_category(index);
    let completion = completion_item_name(id);

    builder.item(
        Item::new(
            id.clone(),
            Tags::for_song(GOALS_GROUP, id.clone())
                .with(number.clone())
                .with(BOSS_ACCESS),
        )
        .progression(),
    );
    builder.location(
        Location::new(
            id.clone(),
            Tags::for_song(GOALS_GROUP, id.clone()).with(format!("(Boss) {id}")),
        )
        .requires(Requirement::all([
            Requirement::value_at_least(CHAIN_KEY, tables.boss_chain_requirement),
            Requirement::category(number),
        ]))
        .placing(completion.clone()),
    );
    builder.item(
        Item::new(
            completion,
            Tags::for_song(GOALS_GROUP, id.clone()).with(BOSS_CLEAR),
        )
        .progression(),
    );
}

fn add_navigator_song(
    builder: &mut WorldBuilder,
    song: &Song,
    song_navigators: &[&str],
    tables: &WorldTables,
) {
    let id = &song.identifier;
    let access = Requirement::any(
        song_navigators
            .iter()
            .map(|navigator| Requirement::category(navigator_access_category(navigator))),
    );

    for goal in &tables.goals {
        let mut tags = Tags::for_song(GOALS_GROUP, id.clone())
            .with(format!("(Song) {id}"))
            .with(format!("(Goal) {goal}"));
        for navigator in song_navigators {
            tags = tags.with(format!("(Navigator) {navigator}"));
        }
        builder.location(
            Location::new(goal_location_name(id, goal), tags).requires(access.clone()),
        );
    }
}

fn add_plain_song(builder: &mut WorldBuilder, index: usize, song: &Song, tables: &WorldTables) {
    let id = &song.identifier;
    let number = song_number_category(index);

    builder.item(
        Item::new(
            id.clone(),
            Tags::for_song(SONGS_GROUP, id.clone()).with(number.clone()),
        )
        .progression(),
    );

    for goal in &tables.goals {
        builder.location(
            Location::new(
                goal_location_name(id, goal),
                Tags::for_song(GOALS_GROUP, id.clone())
                    .with(format!("(Song) {id}"))
                    .with(format!("(Goal) {goal}")),
            )
            .requires(Requirement::category(number.clone())),
        );
    }
}

fn add_item_pools(builder: &mut WorldBuilder, tables: &WorldTables) {
    for trap in &tables.traps {
        builder.item(
            Item::new(trap.name.clone(), Tags::new("Traps"))
                .trap()
                .with_count(trap.count),
        );
    }
    for helper in &tables.helpers {
        builder.item(
            Item::new(helper.name.clone(), Tags::new("Helpers"))
                .useful()
                .with_count(helper.count),
        );
    }
}

fn add_progressive_gauge(builder: &mut WorldBuilder, tables: &WorldTables, copies: u32) {
    builder.item(
        Item::new(PROGRESSIVE_GAUGE, Tags::new(PROGRESSIVE_GAUGE))
            .progression()
            .with_count(copies),
    );

    for (index, rate) in tables.gauge_tiers.iter().enumerate() {
        builder.location(
            Location::new(
                format!("{PROGRESSIVE_GAUGE} ({rate})"),
                Tags::new(format!("((Helpers)) {PROGRESSIVE_GAUGE}")),
            )
            .requires(Requirement::tier(PROGRESSIVE_GAUGE, index as u32 + 1)),
        );
    }
}
