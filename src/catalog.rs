//! Catalog of known models
//!
//! Two disjoint namespaces:
//! - core models: a small fixed table of `name -> description`, each stored
//!   as `<name>_model.rds` under the `core-models` release tag
//! - stat models: one file per statistic, `<stat>.rds` under `stat-models`
//!
//! The catalog is an immutable value built once and shared by `Arc`, so tests
//! can inject their own without touching process-wide state.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

/// Core model definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoreModel {
    /// Short alias, e.g. `ep`
    pub name: String,
    /// File stem of the release asset, e.g. `ep_model`
    pub file_stem: String,
    pub description: String,
}

impl CoreModel {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            file_stem: format!("{}_model", name),
            description: description.to_string(),
        }
    }

    pub fn filename(&self) -> String {
        format!("{}.rds", self.file_stem)
    }
}

/// Immutable model catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    core: Vec<CoreModel>,
    stats: Vec<String>,
}

/// Listing returned by `list_available_models`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableModels {
    pub core_models: BTreeMap<String, String>,
    pub stat_models: Vec<String>,
}

const CORE_MODELS: &[(&str, &str)] = &[
    ("ep", "Expected points model (next-score value of a possession state)"),
    ("wp", "Win probability model (in-game chance of the home side winning)"),
    ("shot", "Shot outcome model (goal / behind / miss probabilities)"),
    ("match", "Match prediction model (pre-game margin and win chance)"),
];

const STAT_MODELS: &[&str] = &[
    "bounces",
    "behinds",
    "clangers",
    "clearances",
    "contested_marks",
    "contested_possessions",
    "disposal_efficiency",
    "disposals",
    "frees_against",
    "frees_for",
    "goal_assists",
    "goals",
    "ground_ball_gets",
    "handballs",
    "hitouts",
    "inside_fifties",
    "intercepts",
    "kicks",
    "marks",
    "marks_inside_fifty",
    "metres_gained",
    "one_percenters",
    "pressure_acts",
    "rebound_fifties",
    "score_involvements",
    "shots_at_goal",
    "spoils",
    "tackles",
    "tackles_inside_fifty",
    "turnovers",
    "uncontested_possessions",
];

impl Catalog {
    /// Build a catalog from explicit core models and stat names
    pub fn new(core: Vec<CoreModel>, stats: Vec<String>) -> Self {
        let mut stats = stats;
        stats.sort();
        stats.dedup();
        Self { core, stats }
    }

    /// The built-in catalog, constructed once per process
    pub fn builtin() -> Arc<Catalog> {
        static BUILTIN: OnceLock<Arc<Catalog>> = OnceLock::new();
        BUILTIN
            .get_or_init(|| {
                Arc::new(Catalog::new(
                    CORE_MODELS
                        .iter()
                        .map(|(name, desc)| CoreModel::new(name, desc))
                        .collect(),
                    STAT_MODELS.iter().map(|s| s.to_string()).collect(),
                ))
            })
            .clone()
    }

    pub fn core_models(&self) -> &[CoreModel] {
        &self.core
    }

    /// Stat model names, sorted
    pub fn stat_models(&self) -> &[String] {
        &self.stats
    }

    /// Find a core model by alias or file stem (case-insensitive)
    pub fn find_core(&self, name: &str) -> Option<&CoreModel> {
        let lower = name.to_ascii_lowercase();
        self.core
            .iter()
            .find(|m| m.name == lower || m.file_stem == lower)
    }

    pub fn is_stat(&self, name: &str) -> bool {
        self.stats.binary_search_by(|s| s.as_str().cmp(name)).is_ok()
    }

    /// Names accepted for core models, used in error messages
    pub fn core_names(&self) -> Vec<String> {
        self.core.iter().map(|m| m.name.clone()).collect()
    }

    pub fn available(&self) -> AvailableModels {
        AvailableModels {
            core_models: self
                .core
                .iter()
                .map(|m| (m.name.clone(), m.description.clone()))
                .collect(),
            stat_models: self.stats.clone(),
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        (*Catalog::builtin()).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_four_core_models() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.core_models().len(), 4);
        assert_eq!(catalog.core_names(), vec!["ep", "wp", "shot", "match"]);
    }

    #[test]
    fn test_core_filename() {
        let model = CoreModel::new("ep", "Expected points");
        assert_eq!(model.file_stem, "ep_model");
        assert_eq!(model.filename(), "ep_model.rds");
    }

    #[test]
    fn test_find_core_by_alias_and_stem() {
        let catalog = Catalog::builtin();
        let by_alias = catalog.find_core("EP").unwrap();
        let by_stem = catalog.find_core("ep_model").unwrap();
        assert_eq!(by_alias, by_stem);
        assert!(catalog.find_core("xp").is_none());
    }

    #[test]
    fn test_stat_names_are_well_formed() {
        let catalog = Catalog::builtin();
        for name in catalog.stat_models() {
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "bad stat name {}",
                name
            );
        }
    }

    #[test]
    fn test_stat_lookup() {
        let catalog = Catalog::builtin();
        assert!(catalog.is_stat("goals"));
        assert!(catalog.is_stat("contested_marks"));
        assert!(!catalog.is_stat("touchdowns"));
    }

    #[test]
    fn test_custom_catalog_sorts_and_dedups_stats() {
        let catalog = Catalog::new(
            vec![CoreModel::new("ep", "test")],
            vec!["marks".to_string(), "goals".to_string(), "marks".to_string()],
        );
        assert_eq!(catalog.stat_models(), &["goals", "marks"]);
        assert!(catalog.is_stat("marks"));
    }

    #[test]
    fn test_available_listing() {
        let available = Catalog::builtin().available();
        assert_eq!(available.core_models.len(), 4);
        assert!(available.core_models.contains_key("wp"));
        assert!(available.stat_models.contains(&"tackles".to_string()));
    }
}
