//! Scenario discovery.
//!
//! A source yields `(id, JSON text)` pairs; ids are file names for a
//! directory. One malformed file is reported and skipped without affecting
//! the others.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::{
    definitions::Scenario,
    errors::{DefinitionError, LoadError},
};

/// Parsed scenarios keyed by source id, in id order.
#[derive(Clone, Debug, Default)]
pub struct ScenarioRegistry {
    scenarios: BTreeMap<String, Scenario>,
}

impl ScenarioRegistry {
    pub fn insert(&mut self, id: impl Into<String>, scenario: Scenario) {
        self.scenarios.insert(id.into(), scenario);
    }

    pub fn get(&self, id: &str) -> Option<&Scenario> {
        self.scenarios.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scenario)> {
        self.scenarios.iter().map(|(id, scenario)| (id.as_str(), scenario))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.scenarios.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub registry: ScenarioRegistry,
    /// Files that could not be parsed, in id order.
    pub failures: Vec<DefinitionError>,
}

pub trait ScenarioSource {
    /// Every `(id, text)` pair the source holds, in id order.
    fn read_all(&self) -> Result<Vec<(String, String)>, LoadError>;

    /// Parses the selected entries. An empty selection selects everything.
    fn load(&self, selection: &BTreeSet<String>) -> Result<LoadReport, LoadError> {
        let mut report = LoadReport::default();

        for (id, text) in self.read_all()? {
            if !is_selected(selection, &id) {
                log::debug!("skipping unselected scenario {id}");
                continue;
            }
            match Scenario::from_json(&id, &text) {
                Ok(scenario) => report.registry.insert(id, scenario),
                Err(error) => {
                    log::error!("{error}");
                    report.failures.push(error);
                },
            }
        }

        log::info!(
            "loaded {} scenario(s), {} malformed",
            report.registry.len(),
            report.failures.len()
        );
        Ok(report)
    }
}

/// `*.json` files directly inside one directory.
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirectorySource { dir: dir.into() }
    }

    fn scenario_files(&self) -> Result<Vec<PathBuf>, LoadError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|error| LoadError::UnreadableDirectory {
            path: self.dir.clone(),
            error,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|error| LoadError::UnreadableDirectory {
                path: self.dir.clone(),
                error,
            })?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl ScenarioSource for DirectorySource {
    fn read_all(&self) -> Result<Vec<(String, String)>, LoadError> {
        self.scenario_files()?
            .into_iter()
            .map(|path| {
                let text = std::fs::read_to_string(&path).map_err(|error| LoadError::UnreadableFile {
                    path: path.clone(),
                    error,
                })?;
                Ok((source_id(&path), text))
            })
            .collect()
    }
}

/// Scenarios held in memory, mostly for tests.
#[derive(Default)]
pub struct EmbeddedSource {
    entries: BTreeMap<String, String>,
}

impl EmbeddedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: impl Into<String>, text: impl Into<String>) -> Self {
        self.entries.insert(id.into(), text.into());
        self
    }
}

impl ScenarioSource for EmbeddedSource {
    fn read_all(&self) -> Result<Vec<(String, String)>, LoadError> {
        Ok(self
            .entries
            .iter()
            .map(|(id, text)| (id.clone(), text.clone()))
            .collect())
    }
}

fn source_id(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Matches a selection entry against the id with or without its `.json` suffix.
fn is_selected(selection: &BTreeSet<String>, id: &str) -> bool {
    if selection.is_empty() {
        return true;
    }
    let stem = id.strip_suffix(".json").unwrap_or(id);
    selection.contains(id) || selection.contains(stem)
}
