use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

pub mod catalog;
pub mod generate;
pub mod hooks;
pub mod navigators;
pub mod package;
pub mod requirement;
pub mod tables;
pub mod validate;
pub mod world;

pub use catalog::{load_catalog, parse_catalog, Song};
pub use generate::{generate, generate_with, SongClass};
pub use navigators::NavigatorTable;
pub use package::GameInfo;
pub use requirement::Requirement;
pub use tables::WorldTables;
pub use world::{Category, Item, Location, Tags, World};

use hooks::{choose_songs, enabled_counts, EnabledCounts};
use package::{build_apworld, write_world_data};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewSettings {
    pub song_count: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSettings {
    pub songs_path: PathBuf,
    pub navigators_path: Option<PathBuf>,
    pub tables_path: Option<PathBuf>,
    /// The manual's `src` tree; data files go to its `data` folder and the
    /// whole tree is packed into the apworld.
    pub manual_src: PathBuf,
    pub output_path: PathBuf,
    pub creator: String,
    pub dev: bool,
    /// Generate and validate only; nothing is written.
    pub dry_run: bool,
    pub debug: bool,
    pub preview: Option<PreviewSettings>,
}

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("malformed song catalog: {0}")]
    MalformedCatalog(String),
    #[error("song '{0}' appears more than once in the catalog")]
    DuplicateSong(String),
    #[error("invalid catalog entry '{identifier}': {reason}")]
    InvalidCatalogEntry { identifier: String, reason: String },
    #[error("generated world is inconsistent: {}", .0.join("; "))]
    InconsistentWorld(Vec<String>),
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, WorldError>;

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub game: GameInfo,
    pub item_count: u64,
    pub location_count: usize,
    pub category_count: usize,
    /// `None` for dry runs.
    pub apworld_path: Option<PathBuf>,
    pub preview: Option<EnabledCounts>,
}

fn world_summary(game: &GameInfo, world: &World) -> String {
    let mut log = format!("Game: {}\nCreator: {}\n", game.game, game.creator);
    let _ = writeln!(log, "items: {}", world.item_count());
    let _ = writeln!(log, "locations: {}", world.locations.len());
    let _ = writeln!(log, "categories: {}", world.categories.len());

    log.push_str("items:\n");
    for item in &world.items {
        let _ = writeln!(
            log,
            "  {} x{} [{}]",
            item.name,
            item.count,
            item.tags.to_list().join(", ")
        );
    }

    log.push_str("locations:\n");
    for location in &world.locations {
        match &location.requires {
            Some(requires) => {
                let _ = writeln!(log, "  {} <- {}", location.name, requires);
            }
            None => {
                let _ = writeln!(log, "  {}", location.name);
            }
        }
    }
    log
}

pub fn run(settings: BuildSettings) -> Result<BuildReport> {
    if !settings.songs_path.exists() {
        return Err(WorldError::Config(format!(
            "Song catalog does not exist: {}",
            settings.songs_path.display()
        )));
    }

    let songs = load_catalog(&settings.songs_path)?;
    let navigators = match &settings.navigators_path {
        Some(path) => NavigatorTable::load(path)?,
        None => NavigatorTable::new(),
    };
    let tables = match &settings.tables_path {
        Some(path) => WorldTables::load(path)?,
        None => WorldTables::default(),
    };

    let world = generate_with(&songs, &navigators, &tables)?;
    let game = GameInfo::new(settings.creator.clone(), settings.dev);

    let preview = settings.preview.as_ref().map(|preview| {
        let chosen = choose_songs(&songs, preview.song_count, preview.seed);
        enabled_counts(&world, &chosen)
    });

    let mut report = BuildReport {
        item_count: world.item_count(),
        location_count: world.locations.len(),
        category_count: world.categories.len(),
        game,
        apworld_path: None,
        preview,
    };

    if settings.dry_run {
        info!("dry run, nothing written");
        return Ok(report);
    }

    if settings.dev {
        warn!("building a development world suffixed with '_dev'");
    }

    write_world_data(
        &settings.manual_src.join("data"),
        &report.game,
        &world,
        settings.dev,
    )?;

    if !settings.output_path.exists() {
        fs::create_dir_all(&settings.output_path)?;
    }

    let world_file_name = report.game.world_file_name();
    let zip_path = settings
        .output_path
        .join(format!("{world_file_name}.apworld"));
    build_apworld(&settings.manual_src, &zip_path, &world_file_name)?;

    if settings.debug {
        let log_path = settings
            .output_path
            .join(format!("{world_file_name}_summary.txt"));
        fs::write(log_path, world_summary(&report.game, &world))?;
    }

    report.apworld_path = Some(zip_path);
    Ok(report)
}
