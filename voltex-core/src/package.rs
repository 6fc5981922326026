use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

use crate::world::{World, SONGS_GROUP};
use crate::{Result, WorldError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartingItemInfo {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub item_categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random: Option<u32>,
}

/// Contents of `game.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameInfo {
    pub game: String,
    pub creator: String,
    pub filler_item_name: String,
    pub death_link: bool,
    pub starting_items: Vec<StartingItemInfo>,
}

impl GameInfo {
    /// Development builds get a `_dev` suffix so they can be installed next
    /// to a release build.
    pub fn new(creator: impl Into<String>, dev: bool) -> Self {
        let suffix = if dev { "_dev" } else { "" };
        Self {
            game: format!("SDVX{suffix}"),
            creator: creator.into(),
            filler_item_name: "you tried (Score +0.1000)".to_string(),
            death_link: false,
            starting_items: vec![StartingItemInfo {
                item_categories: vec![SONGS_GROUP.to_string()],
                random: Some(5),
                ..StartingItemInfo::default()
            }],
        }
    }

    pub fn world_file_name(&self) -> String {
        format!("manual_{}_{}", self.game, self.creator)
    }
}

/// Serialize `value`, tab-indented when `pretty`. Non-ASCII text is kept as-is.
pub fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<Vec<u8>> {
    if !pretty {
        return Ok(serde_json::to_vec(value)?);
    }
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}

fn write_json<T: Serialize>(path: &Path, value: &T, pretty: bool) -> Result<()> {
    fs::write(path, to_json(value, pretty)?)?;
    debug!(path = %path.display(), "wrote json");
    Ok(())
}

/// Write `game.json`, `items.json`, `locations.json` and `categories.json`
/// into `data_dir`, returning the written paths.
pub fn write_world_data(
    data_dir: &Path,
    game: &GameInfo,
    world: &World,
    pretty: bool,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(data_dir)?;

    let game_path = data_dir.join("game.json");
    let items_path = data_dir.join("items.json");
    let locations_path = data_dir.join("locations.json");
    let categories_path = data_dir.join("categories.json");

    write_json(&game_path, game, pretty)?;
    write_json(&items_path, &world.items, pretty)?;
    write_json(&locations_path, &world.locations, pretty)?;
    write_json(&categories_path, &world.categories, pretty)?;

    Ok(vec![game_path, items_path, locations_path, categories_path])
}

/// Zip every file under `manual_src` into `zip_path`, each stored below a
/// top-level `world_file_name/` folder. Returns the number of files packed.
pub fn build_apworld(manual_src: &Path, zip_path: &Path, world_file_name: &str) -> Result<usize> {
    if !manual_src.is_dir() {
        return Err(WorldError::Config(format!(
            "manual source folder does not exist: {}",
            manual_src.display()
        )));
    }

    if let Some(parent) = zip_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(zip_path)?;
    // The archive may live inside the tree it packs.
    let own_path = fs::canonicalize(zip_path)?;

    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut packed = 0usize;

    for entry in WalkDir::new(manual_src).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if fs::canonicalize(entry.path())? == own_path {
            continue;
        }

        let relative = entry.path().strip_prefix(manual_src).map_err(|_| {
            WorldError::Config(format!(
                "{} is outside {}",
                entry.path().display(),
                manual_src.display()
            ))
        })?;

        let mut name = world_file_name.to_string();
        for part in relative.iter() {
            name.push('/');
            name.push_str(&part.to_string_lossy());
        }

        zip.start_file(name, options)?;
        zip.write_all(&fs::read(entry.path())?)?;
        packed += 1;
    }

    zip.finish()?;
    info!(path = %zip_path.display(), files = packed, "built apworld");
    Ok(packed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Item, Tags};
    use std::io::Read;

    #[test]
    fn game_info_names() {
        let dev = GameInfo::new("MapleLeaf", true);
        assert_eq!(dev.game, "SDVX_dev");
        assert_eq!(dev.world_file_name(), "manual_SDVX_dev_MapleLeaf");
        assert_eq!(GameInfo::new("MapleLeaf", false).world_file_name(), "manual_SDVX_MapleLeaf");

        let json: serde_json::Value = serde_json::from_slice(&to_json(&dev, false).unwrap()).unwrap();
        assert_eq!(
            json["starting_items"],
            serde_json::json!([{"item_categories": ["Songs"], "random": 5}])
        );
    }

    #[test]
    fn pretty_json_uses_tabs_and_keeps_unicode() {
        let items = vec![Item::new("ニルヴァーナ by 某", Tags::new("Songs"))];
        let text = String::from_utf8(to_json(&items, true).unwrap()).unwrap();
        assert!(text.contains("\n\t{"));
        assert!(text.contains("ニルヴァーナ"));
        let compact = String::from_utf8(to_json(&items, false).unwrap()).unwrap();
        assert!(!compact.contains('\n'));
    }

    #[test]
    fn packs_tree_under_world_folder() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("data")).unwrap();
        fs::create_dir_all(src.join("hooks")).unwrap();
        fs::write(src.join("__init__.py"), "").unwrap();
        fs::write(src.join("data").join("items.json"), "[]").unwrap();
        fs::write(src.join("hooks").join("Helpers.py"), "# hooks").unwrap();

        let zip_path = dir.path().join("dist").join("manual_SDVX_MapleLeaf.apworld");
        let packed = build_apworld(&src, &zip_path, "manual_SDVX_MapleLeaf").unwrap();
        assert_eq!(packed, 3);

        let mut archive = zip::ZipArchive::new(fs::File::open(&zip_path).unwrap()).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "manual_SDVX_MapleLeaf/__init__.py",
                "manual_SDVX_MapleLeaf/data/items.json",
                "manual_SDVX_MapleLeaf/hooks/Helpers.py",
            ]
        );

        let mut contents = String::new();
        archive
            .by_name("manual_SDVX_MapleLeaf/hooks/Helpers.py")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "# hooks");
    }

    #[test]
    fn missing_manual_source_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = build_apworld(&dir.path().join("nope"), &dir.path().join("x.apworld"), "x")
            .unwrap_err();
        assert!(matches!(err, WorldError::Config(_)));
    }
}
