use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::catalog::Song;
use crate::{Result, WorldError};

pub fn navigator_access_category(navigator: &str) -> String {
    format!("Navigator Access for {navigator}")
}

/// Navigator name -> titles of the songs that navigator unlocks.
///
/// Navigators are iterated by name, so generation order does not depend on
/// how the source file was written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NavigatorTable {
    navigators: BTreeMap<String, BTreeSet<String>>,
}

impl NavigatorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|e| {
            WorldError::Config(format!("navigator table {}: {e}", path.display()))
        })
    }

    pub fn insert<I, S>(&mut self, navigator: impl Into<String>, titles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.navigators
            .entry(navigator.into())
            .or_default()
            .extend(titles.into_iter().map(Into::into));
    }

    pub fn len(&self) -> usize {
        self.navigators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.navigators.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.navigators.keys().map(String::as_str)
    }

    /// Navigators listing `title`, by name.
    pub fn navigators_for(&self, title: &str) -> Vec<&str> {
        self.navigators
            .iter()
            .filter(|(_, titles)| titles.contains(title))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// (navigator, title) pairs naming a title that is not in `songs`.
    pub fn unknown_titles<'a>(&'a self, songs: &[Song]) -> Vec<(&'a str, &'a str)> {
        let known: BTreeSet<&str> = songs.iter().map(|song| song.title.as_str()).collect();
        self.navigators
            .iter()
            .flat_map(|(name, titles)| titles.iter().map(move |title| (name.as_str(), title.as_str())))
            .filter(|(_, title)| !known.contains(title))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn lookup_by_title_is_sorted_by_navigator() {
        let mut table = NavigatorTable::new();
        table.insert("Rasis", ["Foo", "Bar"]);
        table.insert("Grace", ["Foo"]);
        table.insert("Maxima", ["Baz"]);

        assert_eq!(table.navigators_for("Foo"), vec!["Grace", "Rasis"]);
        assert_eq!(table.navigators_for("Baz"), vec!["Maxima"]);
        assert!(table.navigators_for("Nope").is_empty());
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["Grace", "Maxima", "Rasis"]);
    }

    #[test]
    fn reports_unknown_titles() {
        let mut table = NavigatorTable::new();
        table.insert("Rasis", ["Foo", "Missing"]);
        let songs = vec![Song::new("Foo", "Bar", Vec::new(), BTreeMap::new())];
        assert_eq!(table.unknown_titles(&songs), vec![("Rasis", "Missing")]);
    }

    #[test]
    fn deserializes_from_plain_object() {
        let table: NavigatorTable =
            serde_json::from_str(r#"{"Rasis": ["Foo"], "Grace": []}"#).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(navigator_access_category("Rasis"), "Navigator Access for Rasis");
    }
}
