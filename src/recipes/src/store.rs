//! Loads a directory of recipe documents into an in-memory catalog (spec
//! §4.C, §6 `reload_catalog`).

use crate::model::Recipe;
use crate::validate::{validate_raw, validate_recipe, ValidationError};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::{fs, io};

/// The loaded catalog, keyed by `work_order_type`.
#[derive(Debug, Default)]
pub struct RecipeStore {
    recipes: IndexMap<String, Recipe>,
}

impl RecipeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the catalog with the recipes found under `dir`.
    ///
    /// Every `.json` file directly inside `dir` is a candidate except files
    /// named `schema.json` (or anything starting with `schema`), which are
    /// reserved for editor/IDE tooling and never treated as recipes. A file
    /// that fails to parse or validate is omitted from the catalog and
    /// recorded in the returned [`CatalogStatus`]; its siblings still load.
    pub fn load_directory(&mut self, dir: &Path) -> CatalogStatus {
        let mut loaded = IndexMap::new();
        let mut errors = Vec::new();

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                errors.push(LoadError { file: dir.to_path_buf(), reason: err.to_string() });
                self.recipes = loaded;
                return CatalogStatus { loaded: 0, errors };
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter(|path| !is_schema_file(path))
            .collect();
        paths.sort();

        for path in paths {
            match load_one(&path) {
                Ok(recipe) => {
                    if let Some(existing) = loaded.get(&recipe.work_order_type) {
                        let _: &Recipe = existing;
                        errors.push(LoadError {
                            file: path,
                            reason: format!("duplicate work_order_type: {}", recipe.work_order_type),
                        });
                    } else {
                        loaded.insert(recipe.work_order_type.clone(), recipe);
                    }
                }
                Err(reason) => errors.push(LoadError { file: path, reason }),
            }
        }

        let status = CatalogStatus { loaded: loaded.len(), errors };
        self.recipes = loaded;
        status
    }

    #[must_use]
    pub fn get(&self, work_order_type: &str) -> Option<&Recipe> {
        self.recipes.get(work_order_type)
    }

    #[must_use]
    pub fn list_all(&self) -> Vec<&Recipe> {
        self.recipes.values().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

fn is_schema_file(path: &Path) -> bool {
    path.file_stem().and_then(|stem| stem.to_str()).is_some_and(|stem| stem.starts_with("schema"))
}

fn load_one(path: &Path) -> Result<Recipe, String> {
    let text = fs::read_to_string(path).map_err(|err: io::Error| err.to_string())?;
    let raw: serde_json::Value = serde_json::from_str(&text).map_err(|err| ValidationError::from(err).to_string())?;
    validate_raw(&raw).map_err(|err| err.to_string())?;
    let recipe: Recipe = serde_json::from_value(raw).map_err(|err| ValidationError::from(err).to_string())?;
    validate_recipe(&recipe).map_err(|err| err.to_string())?;
    Ok(recipe)
}

/// The result of a [`RecipeStore::load_directory`] call (spec §6
/// `reload_catalog`).
#[derive(Clone, Debug, Default)]
pub struct CatalogStatus {
    /// How many recipes were loaded successfully.
    pub loaded: usize,
    /// One entry per file that failed to load or validate.
    pub errors: Vec<LoadError>,
}

/// A single recipe file that failed to load, and why.
#[derive(Clone, Debug)]
pub struct LoadError {
    pub file: PathBuf,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    const VALID_RECIPE: &str = r#"{
        "work_order_type": "cancel_marine_order",
        "description": "Cancels a marine order",
        "steps": [
            {
                "step": 0,
                "operation": "RETURN_SUCCESS",
                "message": "cancelled"
            }
        ]
    }"#;

    #[test]
    fn test_loads_valid_recipes_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "cancel_marine_order.json", VALID_RECIPE);

        let mut store = RecipeStore::new();
        let status = store.load_directory(dir.path());

        assert_eq!(status.loaded, 1);
        assert!(status.errors.is_empty());
        assert!(store.get("cancel_marine_order").is_some());
    }

    #[test]
    fn test_skips_schema_files_by_name() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "schema.json", "{ this is not even valid json }");
        write(dir.path(), "cancel_marine_order.json", VALID_RECIPE);

        let mut store = RecipeStore::new();
        let status = store.load_directory(dir.path());

        assert_eq!(status.loaded, 1);
        assert!(status.errors.is_empty());
    }

    #[test]
    fn test_invalid_recipe_is_omitted_but_siblings_still_load() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "broken.json", r#"{"work_order_type": "", "description": "d", "steps": []}"#);
        write(dir.path(), "cancel_marine_order.json", VALID_RECIPE);

        let mut store = RecipeStore::new();
        let status = store.load_directory(dir.path());

        assert_eq!(status.loaded, 1);
        assert_eq!(status.errors.len(), 1);
        assert!(store.get("cancel_marine_order").is_some());
    }

    #[test]
    fn test_jump_to_nonexistent_step_caught_at_load_not_run() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "bad_jump.json",
            r#"{
                "work_order_type": "bad_jump",
                "description": "d",
                "steps": [{
                    "step": 0,
                    "operation": "GENERATE_DML",
                    "table": "t",
                    "type": "DELETE",
                    "where": "1=1",
                    "next_step": 7
                }]
            }"#,
        );

        let mut store = RecipeStore::new();
        let status = store.load_directory(dir.path());

        assert_eq!(status.loaded, 0);
        assert_eq!(status.errors.len(), 1);
        assert!(store.get("bad_jump").is_none());
    }

    #[test]
    fn test_unknown_top_level_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "typo.json",
            r#"{
                "work_order_type": "cancel_marine_order",
                "description": "d",
                "steps": [{"step": 0, "operation": "RETURN_SUCCESS"}],
                "priority": "high"
            }"#,
        );

        let mut store = RecipeStore::new();
        let status = store.load_directory(dir.path());

        assert_eq!(status.loaded, 0);
        assert_eq!(status.errors.len(), 1);
    }

    #[test]
    fn test_duplicate_work_order_type_across_files_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.json", VALID_RECIPE);
        write(dir.path(), "b.json", VALID_RECIPE);

        let mut store = RecipeStore::new();
        let status = store.load_directory(dir.path());

        assert_eq!(status.loaded, 1);
        assert_eq!(status.errors.len(), 1);
    }
}
