use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use crate::{Result, WorldError};

/// Group assigned when the listing had no genre for a song.
pub const UNKNOWN_GROUP: &str = "Unknown Group";

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// One song from the scraped catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Song {
    pub identifier: String,
    pub title: String,
    pub artist: String,
    pub groups: Vec<String>,
    pub charts: BTreeMap<String, u32>,
}

impl Song {
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        groups: Vec<String>,
        charts: BTreeMap<String, u32>,
    ) -> Self {
        let title = title.into();
        let artist = artist.into();
        let groups = if groups.is_empty() {
            vec![UNKNOWN_GROUP.to_string()]
        } else {
            groups
        };
        Self {
            identifier: identifier_for(&title, &artist),
            title,
            artist,
            groups,
            charts,
        }
    }

    pub fn max_level(&self) -> Option<u32> {
        self.charts.values().copied().max()
    }
}

pub fn identifier_for(title: &str, artist: &str) -> String {
    format!("{title} by {artist}")
}

#[derive(Debug, Deserialize)]
struct SongRecord {
    #[serde(default)]
    identifier: Option<String>,
    title: String,
    artist: String,
    #[serde(default)]
    groups: Vec<String>,
    charts: BTreeMap<String, u32>,
}

/// Read a catalog file written by the song fetcher. Gzip-compressed files are
/// detected by their header.
pub fn load_catalog(path: &Path) -> Result<Vec<Song>> {
    let raw = fs::read(path)?;
    let text = if raw.starts_with(&GZIP_MAGIC) {
        let mut decoder = GzDecoder::new(raw.as_slice());
        let mut text = String::new();
        decoder.read_to_string(&mut text).map_err(|e| {
            WorldError::MalformedCatalog(format!("{}: {e}", path.display()))
        })?;
        text
    } else {
        String::from_utf8(raw).map_err(|e| {
            WorldError::MalformedCatalog(format!("{}: {e}", path.display()))
        })?
    };

    let songs = parse_catalog(&text)?;
    debug!(path = %path.display(), songs = songs.len(), "loaded song catalog");
    Ok(songs)
}

/// Parse a JSON array of song records, keeping catalog order.
pub fn parse_catalog(text: &str) -> Result<Vec<Song>> {
    let records: Vec<SongRecord> =
        serde_json::from_str(text).map_err(|e| WorldError::MalformedCatalog(e.to_string()))?;

    let mut seen = BTreeSet::new();
    let mut songs = Vec::with_capacity(records.len());

    for record in records {
        let song = Song::new(record.title, record.artist, record.groups, record.charts);

        if let Some(given) = record.identifier {
            if given != song.identifier {
                return Err(WorldError::MalformedCatalog(format!(
                    "identifier '{given}' does not match '{}'",
                    song.identifier
                )));
            }
        }

        if !seen.insert(song.identifier.clone()) {
            return Err(WorldError::DuplicateSong(song.identifier));
        }

        songs.push(song);
    }

    Ok(songs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;

    const CATALOG: &str = r#"[
        {
            "identifier": "Foo by Bar",
            "title": "Foo",
            "artist": "Bar",
            "groups": ["SDVXオリジナル"],
            "charts": {"NOV": 5, "ADV": 12, "EXH": 18}
        },
        {
            "title": "Baz",
            "artist": "Qux",
            "groups": [],
            "charts": {}
        }
    ]"#;

    #[test]
    fn parses_records_in_order() {
        let songs = parse_catalog(CATALOG).unwrap();
        assert_eq!(songs.len(), 2);
        assert_eq!(songs[0].identifier, "Foo by Bar");
        assert_eq!(songs[0].groups, vec!["SDVXオリジナル".to_string()]);
        assert_eq!(songs[0].max_level(), Some(18));
        assert_eq!(songs[1].identifier, "Baz by Qux");
        assert_eq!(songs[1].groups, vec![UNKNOWN_GROUP.to_string()]);
        assert_eq!(songs[1].max_level(), None);
    }

    #[test]
    fn rejects_non_integer_levels() {
        let err = parse_catalog(
            r#"[{"title": "Foo", "artist": "Bar", "groups": [], "charts": {"EXH": "18+"}}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, WorldError::MalformedCatalog(_)));
    }

    #[test]
    fn rejects_missing_fields() {
        let err = parse_catalog(r#"[{"title": "Foo", "charts": {}}]"#).unwrap_err();
        assert!(matches!(err, WorldError::MalformedCatalog(_)));
    }

    #[test]
    fn rejects_mismatched_identifier() {
        let err = parse_catalog(
            r#"[{"identifier": "Foo by Someone", "title": "Foo", "artist": "Bar", "groups": [], "charts": {}}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, WorldError::MalformedCatalog(_)));
    }

    #[test]
    fn rejects_duplicate_songs() {
        let err = parse_catalog(
            r#"[
                {"title": "Foo", "artist": "Bar", "groups": [], "charts": {"EXH": 1}},
                {"title": "Foo", "artist": "Bar", "groups": [], "charts": {"EXH": 2}}
            ]"#,
        )
        .unwrap_err();
        assert!(matches!(err, WorldError::DuplicateSong(id) if id == "Foo by Bar"));
    }

    #[test]
    fn loads_gzip_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("songs.json.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(CATALOG.as_bytes()).unwrap();
        fs::write(&path, encoder.finish().unwrap()).unwrap();

        let songs = load_catalog(&path).unwrap();
        assert_eq!(songs.len(), 2);
    }

    #[test]
    fn truncated_gzip_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("songs.json.gz");
        fs::write(&path, [0x1f, 0x8b, 0x08, 0x00, 0xde, 0xad]).unwrap();

        let err = load_catalog(&path).unwrap_err();
        assert!(matches!(err, WorldError::MalformedCatalog(_)), "{err}");
    }
}
