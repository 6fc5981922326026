use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::{Result, WorldError};

/// Goal locations created for every non-boss song.
pub(crate) const GOAL_TIERS: &[&str] = &["Pass", "AA Rank", "AAA Rank", "S Rank"];

/// (denomination, copies) of the CHAIN item family. 41 items, 380 chain.
pub(crate) const CHAIN_TIERS: &[(u32, u32)] = &[(1, 20), (5, 10), (10, 5), (20, 3), (50, 2), (100, 1)];

pub(crate) const TRAP_ITEMS: &[(&str, u32)] = &[
    ("Swap Lazer Colors", 3),
    ("Hard Timing Window", 3),
    ("Rate +1.1", 3),
    ("Random", 3),
    ("Pass a 20", 3),
    ("Slowjam (Speed 3.0)", 3),
    ("Speedjam (Speed 9.0)", 3),
];

pub(crate) const HELPER_ITEMS: &[(&str, u32)] = &[
    ("Score +5.0000", 20),
    ("Score +10.0000", 10),
    ("Score +20.0000", 5),
    ("Score +50.0000", 3),
    ("Score +100.0000", 1),
    ("Cancel Trap", 12),
    ("Downlevel", 12),
];

pub(crate) const GAUGE_TIERS: &[&str] = &[
    // start at Blastive 2.5
    "Blastive 2.0",
    "Blastive 1.5",
    "Blastive 1.0",
    "Blastive 0.5",
    "Effective",
];

pub(crate) const BOSS_LEVEL: u32 = 20;
pub(crate) const BOSS_CHAIN_REQUIREMENT: u32 = 300;
pub(crate) const GAUGE_PADDING: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTier {
    pub denomination: u32,
    pub count: u32,
}

impl ChainTier {
    pub fn item_name(&self) -> String {
        if self.denomination == 1 {
            "CHAIN".to_string()
        } else {
            format!("{} CHAIN", self.denomination)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolEntry {
    pub name: String,
    pub count: u32,
}

/// Static content the generator expands alongside the catalog. Every field
/// can be overridden from a JSON file; missing fields keep the built-in table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldTables {
    pub goals: Vec<String>,
    pub chain_tiers: Vec<ChainTier>,
    pub traps: Vec<PoolEntry>,
    pub helpers: Vec<PoolEntry>,
    pub gauge_tiers: Vec<String>,
    /// Copies of the gauge item beyond the number of tiers.
    pub gauge_padding: u32,
    /// Any chart at or above this level makes the song a boss.
    pub boss_level: u32,
    pub boss_chain_requirement: u32,
}

fn pool(entries: &[(&str, u32)]) -> Vec<PoolEntry> {
    entries
        .iter()
        .map(|&(name, count)| PoolEntry {
            name: name.to_string(),
            count,
        })
        .collect()
}

impl Default for WorldTables {
    fn default() -> Self {
        Self {
            goals: GOAL_TIERS.iter().map(|g| g.to_string()).collect(),
            chain_tiers: CHAIN_TIERS
                .iter()
                .map(|&(denomination, count)| ChainTier {
                    denomination,
                    count,
                })
                .collect(),
            traps: pool(TRAP_ITEMS),
            helpers: pool(HELPER_ITEMS),
            gauge_tiers: GAUGE_TIERS.iter().map(|g| g.to_string()).collect(),
            gauge_padding: GAUGE_PADDING,
            boss_level: BOSS_LEVEL,
            boss_chain_requirement: BOSS_CHAIN_REQUIREMENT,
        }
    }
}

impl WorldTables {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let tables: WorldTables = serde_json::from_str(&data).map_err(|e| {
            WorldError::Config(format!("tables file {}: {e}", path.display()))
        })?;
        tables.check()?;
        Ok(tables)
    }

    /// Total chain value the CHAIN family can provide.
    pub fn chain_total(&self) -> u64 {
        self.chain_tiers
            .iter()
            .map(|tier| u64::from(tier.denomination) * u64::from(tier.count))
            .sum()
    }

    /// Copies of the gauge item: one per tier plus the padding. `None` when
    /// that does not fit a `u32`.
    pub fn gauge_copies(&self) -> Option<u32> {
        u32::try_from(self.gauge_tiers.len())
            .ok()?
            .checked_add(self.gauge_padding)
    }

    pub fn check(&self) -> Result<()> {
        if self.goals.is_empty() {
            return Err(WorldError::Config("tables: goals must not be empty".to_string()));
        }
        if self.boss_level == 0 {
            return Err(WorldError::Config("tables: boss_level must be positive".to_string()));
        }

        let mut denominations = BTreeSet::new();
        for tier in &self.chain_tiers {
            if tier.denomination == 0 || tier.count == 0 {
                return Err(WorldError::Config(format!(
                    "tables: chain tier {} x{} must be positive",
                    tier.denomination, tier.count
                )));
            }
            if !denominations.insert(tier.denomination) {
                return Err(WorldError::Config(format!(
                    "tables: chain denomination {} listed twice",
                    tier.denomination
                )));
            }
        }

        if self.chain_total() < u64::from(self.boss_chain_requirement) {
            return Err(WorldError::Config(format!(
                "tables: chain items only add up to {}, bosses need {}",
                self.chain_total(),
                self.boss_chain_requirement
            )));
        }

        for entry in self.traps.iter().chain(&self.helpers) {
            if entry.count == 0 {
                return Err(WorldError::Config(format!(
                    "tables: pool item '{}' has a zero count",
                    entry.name
                )));
            }
        }

        if self.gauge_copies().is_none() {
            return Err(WorldError::Config(format!(
                "tables: {} gauge tiers plus {} padding copies is too many",
                self.gauge_tiers.len(),
                self.gauge_padding
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chain_family() {
        let tables = WorldTables::default();
        let copies: u32 = tables.chain_tiers.iter().map(|t| t.count).sum();
        assert_eq!(copies, 41);
        assert_eq!(tables.chain_total(), 380);
        assert_eq!(tables.chain_tiers[0].item_name(), "CHAIN");
        assert_eq!(tables.chain_tiers[4].item_name(), "50 CHAIN");
        assert!(tables.check().is_ok());
    }

    #[test]
    fn partial_override_keeps_defaults() {
        let tables: WorldTables =
            serde_json::from_str(r#"{"goals": ["Track Clear", "AA Rank", "AAA Rank"]}"#).unwrap();
        assert_eq!(tables.goals.len(), 3);
        assert_eq!(tables.gauge_tiers.len(), 5);
        assert_eq!(tables.boss_level, 20);
    }

    #[test]
    fn check_rejects_unreachable_boss_gate() {
        let tables = WorldTables {
            boss_chain_requirement: 1000,
            ..WorldTables::default()
        };
        assert!(matches!(tables.check(), Err(WorldError::Config(_))));
    }

    #[test]
    fn check_rejects_gauge_padding_overflow() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tables.json");
        fs::write(&path, r#"{"gauge_padding": 4294967295}"#).unwrap();
        assert!(matches!(WorldTables::load(&path), Err(WorldError::Config(_))));
        assert_eq!(WorldTables::default().gauge_copies(), Some(8));
    }

    #[test]
    fn check_rejects_duplicate_denominations() {
        let mut tables = WorldTables::default();
        tables.chain_tiers.push(ChainTier {
            denomination: 5,
            count: 1,
        });
        assert!(tables.check().is_err());
    }

    #[test]
    fn load_reports_bad_json_as_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tables.json");
        fs::write(&path, "{\"goals\": 3}").unwrap();
        assert!(matches!(WorldTables::load(&path), Err(WorldError::Config(_))));
    }
}
